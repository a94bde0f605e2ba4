//! Dense Gaussian elimination with row partial pivoting.
//!
//! Meant for small auxiliary systems (local dense blocks, projected
//! problems); the factorization is not kept.

use faer::Mat;
use log::debug;

use crate::core::traits::Real;
use crate::error::KError;
use crate::solver::LinearSolver;
use crate::utils::convergence::SolveStats;

/// Solve `a·x = b` in place: `a` is destroyed, `b` receives the solution.
///
/// Rows are swapped logically through a permutation vector. A column whose
/// largest remaining candidate is exactly zero is reported as
/// [`KError::SingularMatrix`].
pub fn gauss_pivot<T: Real>(a: &mut Mat<T>, b: &mut [T]) -> Result<(), KError> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(KError::DimensionMismatch { expected: n, found: a.ncols() });
    }
    if b.len() != n {
        return Err(KError::DimensionMismatch { expected: n, found: b.len() });
    }
    let mut perm: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let (piv, max) = (k..n)
            .map(|i| (i, a[(perm[i], k)].abs()))
            .fold((k, T::zero()), |best, cand| if cand.1 > best.1 { cand } else { best });
        if max == T::zero() {
            return Err(KError::SingularMatrix { context: "gauss_pivot", index: k });
        }
        perm.swap(k, piv);
        let pk = perm[k];
        let pivot = a[(pk, k)];
        for &pi in &perm[k + 1..] {
            let l = a[(pi, k)] / pivot;
            if l == T::zero() {
                continue;
            }
            a[(pi, k)] = l;
            for j in k + 1..n {
                let v = a[(pk, j)];
                a[(pi, j)] = a[(pi, j)] - l * v;
            }
            b[pi] = b[pi] - l * b[pk];
        }
    }

    let mut x = vec![T::zero(); n];
    for k in (0..n).rev() {
        let pk = perm[k];
        let mut s = b[pk];
        for j in k + 1..n {
            s = s - a[(pk, j)] * x[j];
        }
        x[k] = s / a[(pk, k)];
    }
    b.copy_from_slice(&x);
    Ok(())
}

/// [`gauss_pivot`] behind the [`LinearSolver`] interface; works on a copy of `a`.
#[derive(Clone, Debug, Default)]
pub struct GaussSolver;

impl GaussSolver {
    pub fn new() -> Self {
        GaussSolver
    }
}

impl<T: Real> LinearSolver<Mat<T>, T> for GaussSolver {
    fn solve(&mut self, a: &Mat<T>, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        if x.len() != b.len() {
            return Err(KError::DimensionMismatch { expected: b.len(), found: x.len() });
        }
        let mut lu = a.clone();
        x.copy_from_slice(b);
        gauss_pivot(&mut lu, x)?;
        debug!("GaussSolver: solved dense {}x{} system", a.nrows(), a.ncols());
        Ok(SolveStats { iterations: 1, final_residual: T::zero(), converged: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn solves_system_needing_pivoting() {
        // 3x3 system: [[2,1,1],[1,3,2],[1,0,0]] x = [4,5,6], x = [6,15,-23]
        let a = Mat::from_fn(3, 3, |i, j| [[2.0, 1.0, 1.0], [1.0, 3.0, 2.0], [1.0, 0.0, 0.0]][i][j]);
        let b = vec![4.0, 5.0, 6.0];
        let mut x = vec![0.0; 3];
        let stats = GaussSolver::new().solve(&a, &b, &mut x).unwrap();
        assert!(stats.converged);
        for (xi, ei) in x.iter().zip(&[6.0, 15.0, -23.0]) {
            assert_abs_diff_eq!(*xi, *ei, epsilon = 1e-10);
        }
    }

    #[test]
    fn zero_leading_entry_is_pivoted_away() {
        let mut a = Mat::from_fn(2, 2, |i, j| [[0.0, 1.0], [1.0, 0.0]][i][j]);
        let mut b = vec![3.0, 4.0];
        gauss_pivot(&mut a, &mut b).unwrap();
        assert_eq!(b, vec![4.0, 3.0]);
    }

    #[test]
    fn zero_column_is_singular() {
        let mut a = Mat::from_fn(2, 2, |i, j| [[0.0, 1.0], [0.0, 2.0]][i][j]);
        let mut b = vec![1.0, 1.0];
        let err = gauss_pivot(&mut a, &mut b).unwrap_err();
        assert_eq!(err, KError::SingularMatrix { context: "gauss_pivot", index: 0 });
    }

    #[test]
    fn non_square_input_is_rejected() {
        let mut a = Mat::from_fn(2, 3, |_, _| 1.0);
        let mut b = vec![1.0, 1.0];
        assert!(matches!(gauss_pivot(&mut a, &mut b), Err(KError::DimensionMismatch { .. })));
    }
}
