//! Dense vector kernels used by every Krylov engine.
//!
//! Vectors are plain `[T]` slices. Reductions run on rayon's global pool
//! when the `rayon` feature is enabled and fall back to sequential folds
//! otherwise.

use crate::core::traits::{MatVec, Real};

/// Compute the dot product `xᵗ y`.
pub fn dot<T: Real>(x: &[T], y: &[T]) -> T {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        x.par_iter()
            .zip(y.par_iter())
            .map(|(xi, yi)| *xi * *yi)
            .reduce(|| T::zero(), |acc, v| acc + v)
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter()
            .zip(y.iter())
            .map(|(xi, yi)| *xi * *yi)
            .fold(T::zero(), |acc, v| acc + v)
    }
}

/// Squared Euclidean norm `‖x‖₂²`.
pub fn norm_sq<T: Real>(x: &[T]) -> T {
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        x.par_iter()
            .map(|xi| *xi * *xi)
            .reduce(|| T::zero(), |acc, v| acc + v)
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter().map(|xi| *xi * *xi).fold(T::zero(), |acc, v| acc + v)
    }
}

/// Euclidean norm `‖x‖₂`.
pub fn norm<T: Real>(x: &[T]) -> T {
    norm_sq(x).sqrt()
}

/// y ← y + α x
pub fn axpy<T: Real>(alpha: T, x: &[T], y: &mut [T]) {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi = *yi + alpha * *xi;
    }
}

/// y ← x + β y
pub fn xpay<T: Real>(x: &[T], beta: T, y: &mut [T]) {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi = *xi + beta * *yi;
    }
}

/// x ← α x
pub fn scale<T: Real>(alpha: T, x: &mut [T]) {
    x.iter_mut().for_each(|xi| *xi = alpha * *xi);
}

/// y ← x
pub fn copy<T: Real>(x: &[T], y: &mut [T]) {
    y.copy_from_slice(x);
}

/// Set every entry of `x` to `v`.
pub fn fill<T: Real>(x: &mut [T], v: T) {
    x.iter_mut().for_each(|xi| *xi = v);
}

/// r ← b − A x
pub fn residual<M, T>(a: &M, x: &[T], b: &[T], r: &mut [T])
where
    M: MatVec<T> + ?Sized,
    T: Real,
{
    a.matvec(x, r);
    for (ri, bi) in r.iter_mut().zip(b) {
        *ri = *bi - *ri;
    }
}

/// Allocate a zero vector of length `n`.
pub fn zeros<T: Real>(n: usize) -> Vec<T> {
    vec![T::zero(); n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn dot_and_norm() {
        let x = vec![1.0, 2.0, 3.0];
        let y = vec![4.0, -5.0, 6.0];
        assert_abs_diff_eq!(dot(&x, &y), 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(norm(&x), 14.0f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(norm_sq(&y), 77.0, epsilon = 1e-12);
    }

    #[test]
    fn axpy_and_xpay() {
        let x = vec![1.0, 1.0];
        let mut y = vec![2.0, 3.0];
        axpy(2.0, &x, &mut y);
        assert_eq!(y, vec![4.0, 5.0]);
        xpay(&x, 0.5, &mut y);
        assert_eq!(y, vec![3.0, 3.5]);
        scale(2.0, &mut y);
        assert_eq!(y, vec![6.0, 7.0]);
    }
}
