//! Convergence bookkeeping and small containers shared by the solvers.

pub mod convergence;
pub mod sbuffer;

pub use convergence::{Convergence, SolveStats};
pub use sbuffer::SBuffer;
