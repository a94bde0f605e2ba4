//! Solver and preconditioner selection.

pub mod options;
pub use options::{KspOptions, PcKind, SolverKind};
