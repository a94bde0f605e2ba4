//! Wrappers for faer dense matrix types.
//!
//! This module implements the core operator traits for `faer::Mat` and `faer::MatRef`, so
//! small dense systems (test fixtures, local blocks) can be handed to the same generic
//! Krylov engines as assembled sparse matrices.
//!
//! # References
//! - [faer crate documentation](https://docs.rs/faer)

use crate::core::traits::{MatShape, MatTransVec, MatVec, Real};
use faer::{Mat, MatRef};

/// Implements matrix-vector multiplication for `faer::Mat`.
///
/// Computes `y = A * x` where `A` is a dense matrix, `x` and `y` are vectors.
impl<T: Real> MatVec<T> for Mat<T> {
    fn matvec(&self, x: &[T], y: &mut [T]) {
        self.as_ref().matvec(x, y)
    }
}

/// Implements matrix-vector multiplication for a matrix reference (`faer::MatRef`).
impl<'a, T: Real> MatVec<T> for MatRef<'a, T> {
    fn matvec(&self, x: &[T], y: &mut [T]) {
        assert_eq!(self.nrows(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.ncols(), x.len(), "Input vector x has incorrect length");
        for i in 0..self.nrows() {
            let mut sum = T::zero();
            for j in 0..self.ncols() {
                sum = sum + self[(i, j)] * x[j];
            }
            y[i] = sum;
        }
    }
}

/// Implements matrix-transpose-vector multiplication for `faer::Mat`.
///
/// Computes `y = A^T * x` where `A` is a dense matrix, `x` and `y` are vectors.
impl<T: Real> MatTransVec<T> for Mat<T> {
    fn mattransvec(&self, x: &[T], y: &mut [T]) {
        self.as_ref().mattransvec(x, y)
    }
}

impl<'a, T: Real> MatTransVec<T> for MatRef<'a, T> {
    fn mattransvec(&self, x: &[T], y: &mut [T]) {
        assert_eq!(self.ncols(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.nrows(), x.len(), "Input vector x has incorrect length");
        for j in 0..self.ncols() {
            let mut sum = T::zero();
            for i in 0..self.nrows() {
                sum = sum + self[(i, j)] * x[i];
            }
            y[j] = sum;
        }
    }
}

impl<T> MatShape for Mat<T> {
    fn nrows(&self) -> usize {
        Mat::nrows(self)
    }
    fn ncols(&self) -> usize {
        Mat::ncols(self)
    }
}

impl<'a, T> MatShape for MatRef<'a, T> {
    fn nrows(&self) -> usize {
        MatRef::nrows(self)
    }
    fn ncols(&self) -> usize {
        MatRef::ncols(self)
    }
}
