//! # lca-core: Linear Technology Model Core
//!
//! Provides the index structures, matrix types and linear solver backends
//! used by matrix-based life cycle calculations.
//!
//! ## Design Philosophy
//!
//! A product system is modeled as a square **technology matrix** `A` and a
//! rectangular **intervention matrix** `B`:
//! - **Columns** of both matrices: technology entries (process/product pairs)
//! - **Rows** of `A`: the same technology entries (product outputs and inputs)
//! - **Rows** of `B`: elementary flows (emissions, resource extractions)
//!
//! An optional **impact matrix** `C` maps flows to impact categories and an
//! optional cost vector assigns a cost to each technology entry.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lca_core::*;
//!
//! let steel = TechFlow::new(ProcessId::new(1), FlowId::new(10));
//! let power = TechFlow::new(ProcessId::new(2), FlowId::new(20));
//!
//! let mut tech_index = TechIndex::new(steel, 10.0);
//! tech_index.put(power);
//!
//! let mut flow_index = FlowIndex::new();
//! flow_index.put_output(FlowId::new(100)); // CO2
//! flow_index.put_input(FlowId::new(101)); // crude oil
//!
//! let a = Matrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 0, -0.5), (1, 1, 1.0)], false);
//! let b = Matrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 1, 2.0)], false);
//!
//! let model = LinearModel::new(tech_index, flow_index, a, b).unwrap();
//! let solver = SolverKind::Faer.build_solver();
//! let s = solver
//!     .solve(model.tech_matrix(), model.tech_index().reference_position(), 10.0)
//!     .unwrap();
//! assert_eq!(s.len(), 2);
//! ```
//!
//! ## ID System
//!
//! Every domain record is referenced by a newtype ID around `u64`, so a
//! process ID can never be passed where a flow ID is expected. Results are
//! always addressed by these IDs, never by raw matrix positions.
//!
//! ## Modules
//!
//! - [`index`] - Bidirectional key/position indices
//! - [`matrix`] - Dense (faer) and sparse (sprs) matrix storage
//! - [`model`] - The assembled linear model and its compression step
//! - [`solver`] - The `MatrixSolver` contract and its backends

use serde::{Deserialize, Serialize};

pub mod error;
pub mod index;
pub mod matrix;
pub mod model;
pub mod solver;

pub use error::{LcaError, LcaResult};
pub use index::{FlowIndex, ImpactIndex, Index, TechIndex};
pub use matrix::{DenseMatrix, Matrix, SparseMatrix};
pub use model::LinearModel;
pub use solver::*;

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImpactId(u64);

impl ProcessId {
    #[inline]
    pub const fn new(value: u64) -> Self {
        ProcessId(value)
    }
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl FlowId {
    #[inline]
    pub const fn new(value: u64) -> Self {
        FlowId(value)
    }
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl ImpactId {
    #[inline]
    pub const fn new(value: u64) -> Self {
        ImpactId(value)
    }
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

/// A technology entry: a process together with the product it provides
/// (or the waste it treats). Occupies one row and one column of `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TechFlow {
    pub process: ProcessId,
    pub flow: FlowId,
}

impl TechFlow {
    #[inline]
    pub const fn new(process: ProcessId, flow: FlowId) -> Self {
        Self { process, flow }
    }
}

impl std::fmt::Display for TechFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Process#{}/Flow#{}", self.process.0, self.flow.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_their_values() {
        assert_eq!(ProcessId::new(7).value(), 7);
        assert_eq!(FlowId::new(8).value(), 8);
        assert_eq!(ImpactId::new(9).value(), 9);
    }

    #[test]
    fn tech_flow_serializes_transparent_ids() {
        let tf = TechFlow::new(ProcessId::new(1), FlowId::new(2));
        let json = serde_json::to_string(&tf).unwrap();
        assert_eq!(json, r#"{"process":1,"flow":2}"#);
        assert_eq!(tf.to_string(), "Process#1/Flow#2");
    }
}
