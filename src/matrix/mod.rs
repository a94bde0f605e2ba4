//! Matrix module: sparse storage and row-level helpers.

pub mod sparse;
pub use sparse::{CsrMatrix, SparseMatDiag, add_row_to_vec, bbt_diag, mul_row};
