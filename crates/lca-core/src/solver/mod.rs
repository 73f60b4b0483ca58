//! Linear algebra backends.
//!
//! - [`MatrixSolver`]: the numeric contract used by the calculators
//! - [`FaerSolver`]: dense LU decomposition from faer
//! - [`SparseSolver`]: sparse elimination over sprs-backed matrices
//! - [`SolverKind`]: name-based selection of a backend

pub mod backend;
pub mod registry;

pub use backend::{FaerSolver, MatrixSolver, SparseSolver, SINGULAR_PIVOT_TOLERANCE};
pub use registry::SolverKind;
