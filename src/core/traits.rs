//! Core linear-algebra traits for krysolve.

use num_traits::{Float, FromPrimitive, NumCast};
use std::fmt::{Debug, Display};

/// Real scalar type the solvers are generic over (`f32`, `f64`).
pub trait Real: Float + FromPrimitive + Debug + Display + Send + Sync + 'static {}

impl<T> Real for T where T: Float + FromPrimitive + Debug + Display + Send + Sync + 'static {}

/// Convert an `f64` literal into the working scalar type.
#[inline]
pub fn real<T: Real>(v: f64) -> T {
    <T as NumCast>::from(v).unwrap_or_else(T::nan)
}

/// Row/column extent of a linear operator.
pub trait MatShape {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
}

/// Matrix–vector product: y ← A x.
pub trait MatVec<T> {
    /// Compute y = A · x. `x.len() == ncols`, `y.len() == nrows`.
    fn matvec(&self, x: &[T], y: &mut [T]);
}

/// Transposed matrix–vector product: y ← Aᵗ x.
pub trait MatTransVec<T> {
    /// Compute y = Aᵗ · x. `x.len() == nrows`, `y.len() == ncols`.
    fn mattransvec(&self, x: &[T], y: &mut [T]);
}

/// Identity token of a matrix instance.
///
/// Caching preconditioners remember the id together with the matrix
/// version to detect that the operator they were derived from changed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MatrixId(pub(crate) u64);

/// Row-compressed sparse access.
///
/// Column indices of each row are strictly increasing.
pub trait SparseMatrix<T>: MatShape + MatVec<T> {
    /// Column indices and values of row `i`.
    fn row(&self, i: usize) -> (&[usize], &[T]);
    /// Identity of this matrix instance.
    fn matrix_id(&self) -> MatrixId;
    /// Counter bumped on every mutation of the stored values.
    fn version(&self) -> u64;

    /// Number of stored entries in row `i`.
    fn row_nnz(&self, i: usize) -> usize {
        self.row(i).0.len()
    }

    /// Position of the diagonal entry inside row `i`, if stored.
    fn diag_position(&self, i: usize) -> Option<usize> {
        self.row(i).0.binary_search(&i).ok()
    }
}
