//! Matrix and vector capabilities shared by all solvers.

pub mod traits;
pub mod vector;
pub mod wrappers;

pub use traits::{MatShape, MatTransVec, MatVec, MatrixId, Real, SparseMatrix, real};
