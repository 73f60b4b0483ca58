use super::backend::{FaerSolver, MatrixSolver, SparseSolver};
use crate::error::{LcaError, LcaResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Simple registry of available solvers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Faer,
    Sparse,
}

impl FromStr for SolverKind {
    type Err = LcaError;

    fn from_str(input: &str) -> LcaResult<Self> {
        match input.to_ascii_lowercase().as_str() {
            "faer" | "dense" | "default" => Ok(SolverKind::Faer),
            "sparse" => Ok(SolverKind::Sparse),
            other => Err(LcaError::UnknownSolver(other.to_string())),
        }
    }
}

impl SolverKind {
    pub fn build_solver(self) -> Arc<dyn MatrixSolver> {
        match self {
            SolverKind::Faer => Arc::new(FaerSolver),
            SolverKind::Sparse => Arc::new(SparseSolver::default()),
        }
    }

    /// Like [`SolverKind::build_solver`], with the density threshold used
    /// by backends that choose between sparse and dense matrices.
    pub fn build_solver_with_threshold(self, density_threshold: f64) -> Arc<dyn MatrixSolver> {
        match self {
            SolverKind::Faer => Arc::new(FaerSolver),
            SolverKind::Sparse => Arc::new(SparseSolver::with_density_threshold(density_threshold)),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["faer", "sparse"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Faer => "faer",
            SolverKind::Sparse => "sparse",
        }
    }
}
