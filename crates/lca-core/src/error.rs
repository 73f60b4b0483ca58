//! Unified error type for the calculation engine.
//!
//! Every fallible operation in `lca-core` and `lca-algo` returns
//! [`LcaResult`]. Only [`LcaError::SingularMatrix`] is expected at runtime
//! for a well-formed model; the other variants indicate that something
//! upstream assembled inconsistent data.
//!
//! # Example
//!
//! ```ignore
//! use lca_core::{LcaError, LcaResult};
//!
//! fn scaling(model: &LinearModel, solver: &dyn MatrixSolver) -> LcaResult<Vec<f64>> {
//!     let idx = model.tech_index().reference_position();
//!     solver.solve(model.tech_matrix(), idx, model.tech_index().demand())
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LcaError {
    /// The technology matrix cannot be solved for the given demand.
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// Inconsistent shapes passed across the solver contract.
    #[error("Dimension mismatch in {operation}: expected {expected}, got {got}")]
    DimensionMismatch {
        operation: &'static str,
        expected: usize,
        got: usize,
    },

    /// The assembled linear model violates a structural invariant.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Unknown solver '{0}'; supported values: faer, sparse")]
    UnknownSolver(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LcaResult<T> = Result<T, LcaError>;

impl LcaError {
    /// Shorthand for a [`LcaError::DimensionMismatch`].
    pub fn mismatch(operation: &'static str, expected: usize, got: usize) -> Self {
        LcaError::DimensionMismatch {
            operation,
            expected,
            got,
        }
    }

    pub fn is_singular(&self) -> bool {
        matches!(self, LcaError::SingularMatrix(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LcaError::SingularMatrix("zero pivot in column 1".into());
        assert!(err.to_string().contains("Singular matrix"));
        assert!(err.to_string().contains("column 1"));
        assert!(err.is_singular());
    }

    #[test]
    fn test_mismatch_display() {
        let err = LcaError::mismatch("multiply", 3, 2);
        assert_eq!(
            err.to_string(),
            "Dimension mismatch in multiply: expected 3, got 2"
        );
        assert!(!err.is_singular());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LcaError = io_err.into();
        assert!(matches!(err, LcaError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> LcaResult<()> {
            Err(LcaError::InvalidModel("test".into()))
        }

        fn outer() -> LcaResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
