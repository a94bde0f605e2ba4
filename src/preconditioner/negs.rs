//! Gauss-Seidel with start vector zero for the normal equations A·Aᵗ.
//!
//! Works on A itself; A·Aᵗ is never formed. The diagonal of A·Aᵗ is derived
//! lazily and recomputed whenever a different matrix (or a newer version of
//! the same matrix) is passed in.

use log::trace;

use crate::core::traits::{MatrixId, Real, SparseMatrix};
use crate::error::KError;
use crate::matrix::{add_row_to_vec, bbt_diag, mul_row};
use crate::preconditioner::Preconditioner;

#[derive(Clone, Debug)]
pub struct NegsPc<T> {
    symmetric: bool,
    built_for: Option<(MatrixId, u64)>,
    /// diagonal of A·Aᵗ
    d: Vec<T>,
    /// scratch: Aᵗ x
    y: Vec<T>,
}

impl<T: Real> Default for NegsPc<T> {
    fn default() -> Self {
        Self::new(true)
    }
}

impl<T: Real> NegsPc<T> {
    /// With `symmetric` a forward and a backward sweep are done, otherwise
    /// only the forward sweep.
    pub fn new(symmetric: bool) -> Self {
        Self { symmetric, built_for: None, d: Vec::new(), y: Vec::new() }
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    fn update<M>(&mut self, a: &M) -> Result<(), KError>
    where
        M: SparseMatrix<T> + ?Sized,
    {
        let key = (a.matrix_id(), a.version());
        if self.built_for == Some(key) {
            return Ok(());
        }
        trace!("NegsPc: rebuilding diag(A·Aᵗ) for {} rows", a.nrows());
        let d = bbt_diag(a);
        if let Some(i) = d.iter().position(|&di| di == T::zero()) {
            self.built_for = None;
            return Err(KError::ZeroPivot(i));
        }
        self.d = d;
        self.y = vec![T::zero(); a.ncols()];
        self.built_for = Some(key);
        Ok(())
    }

    fn check_len(&self, b: &[T], x: &[T]) -> Result<(), KError> {
        let n = self.d.len();
        if b.len() != n {
            return Err(KError::DimensionMismatch { expected: n, found: b.len() });
        }
        if x.len() != n {
            return Err(KError::DimensionMismatch { expected: n, found: x.len() });
        }
        Ok(())
    }

    fn forward_gs<M>(&mut self, a: &M, x: &mut [T], b: &[T])
    where
        M: SparseMatrix<T> + ?Sized,
    {
        self.y.iter_mut().for_each(|v| *v = T::zero());
        for i in 0..b.len() {
            let t = (b[i] - mul_row(a, &self.y, i)) / self.d[i];
            x[i] = t;
            add_row_to_vec(a, t, &mut self.y, i);
        }
    }

    fn backward_gs<M>(&mut self, a: &M, x: &mut [T], b: &[T])
    where
        M: SparseMatrix<T> + ?Sized,
    {
        self.y.iter_mut().for_each(|v| *v = T::zero());
        for i in (0..b.len()).rev() {
            let t = (b[i] - mul_row(a, &self.y, i)) / self.d[i];
            x[i] = t;
            add_row_to_vec(a, t, &mut self.y, i);
        }
    }

    // Inverse of forward_gs.
    fn forward_mul_gs<M>(&mut self, a: &M, x: &mut [T], b: &[T])
    where
        M: SparseMatrix<T> + ?Sized,
    {
        self.y.iter_mut().for_each(|v| *v = T::zero());
        for i in 0..b.len() {
            add_row_to_vec(a, b[i], &mut self.y, i);
            x[i] = mul_row(a, &self.y, i);
        }
    }

    // Inverse of backward_gs.
    fn backward_mul_gs<M>(&mut self, a: &M, x: &mut [T], b: &[T])
    where
        M: SparseMatrix<T> + ?Sized,
    {
        self.y.iter_mut().for_each(|v| *v = T::zero());
        for i in (0..b.len()).rev() {
            add_row_to_vec(a, b[i], &mut self.y, i);
            x[i] = mul_row(a, &self.y, i);
        }
    }

    fn scaled_by_diag(&self, x: &[T]) -> Vec<T> {
        x.iter().zip(&self.d).map(|(&xi, &di)| di * xi).collect()
    }

    fn divided_by_diag(&self, x: &[T]) -> Vec<T> {
        x.iter().zip(&self.d).map(|(&xi, &di)| xi / di).collect()
    }

    /// Transposed preconditioning step: backward sweep first.
    pub fn apply_transpose<M>(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<(), KError>
    where
        M: SparseMatrix<T> + ?Sized,
    {
        self.update(a)?;
        self.check_len(b, x)?;
        self.backward_gs(a, x, b);
        if self.symmetric {
            let b2 = self.scaled_by_diag(x);
            self.forward_gs(a, x, &b2);
        }
        Ok(())
    }

    /// Multiply with the preconditioning matrix, undoing `apply`.
    pub fn mul<M>(&mut self, a: &M, b: &[T]) -> Result<Vec<T>, KError>
    where
        M: SparseMatrix<T> + ?Sized,
    {
        self.update(a)?;
        let mut x = vec![T::zero(); a.nrows()];
        self.check_len(b, &x)?;
        let b2 = if self.symmetric {
            self.backward_mul_gs(a, &mut x, b);
            self.divided_by_diag(&x)
        } else {
            b.to_vec()
        };
        self.forward_mul_gs(a, &mut x, &b2);
        Ok(x)
    }

    /// Multiply with the transposed preconditioning matrix, undoing `apply_transpose`.
    pub fn transp_mul<M>(&mut self, a: &M, b: &[T]) -> Result<Vec<T>, KError>
    where
        M: SparseMatrix<T> + ?Sized,
    {
        self.update(a)?;
        let mut x = vec![T::zero(); a.nrows()];
        self.check_len(b, &x)?;
        let b2 = if self.symmetric {
            self.forward_mul_gs(a, &mut x, b);
            self.divided_by_diag(&x)
        } else {
            b.to_vec()
        };
        self.backward_mul_gs(a, &mut x, &b2);
        Ok(x)
    }
}

impl<M, T> Preconditioner<M, T> for NegsPc<T>
where
    M: SparseMatrix<T> + ?Sized,
    T: Real,
{
    fn setup(&mut self, a: &M) -> Result<(), KError> {
        self.update(a)
    }

    fn apply(&mut self, a: &M, r: &[T], z: &mut [T]) -> Result<(), KError> {
        self.update(a)?;
        self.check_len(r, z)?;
        self.forward_gs(a, z, r);
        if self.symmetric {
            let b2 = self.scaled_by_diag(z);
            self.backward_gs(a, z, &b2);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{MatShape, MatTransVec, MatVec};
    use crate::matrix::CsrMatrix;
    use approx::assert_abs_diff_eq;

    fn rect() -> CsrMatrix<f64> {
        // 3×4, full row rank
        CsrMatrix::from_triplets(
            3,
            4,
            &[(0, 0, 1.0), (0, 1, 2.0), (1, 1, -1.0), (1, 2, 3.0), (2, 0, 0.5), (2, 3, 2.0)],
        )
        .unwrap()
    }

    fn aat(a: &CsrMatrix<f64>, x: &[f64]) -> Vec<f64> {
        let mut t = vec![0.0; a.ncols()];
        a.mattransvec(x, &mut t);
        let mut y = vec![0.0; a.nrows()];
        a.matvec(&t, &mut y);
        y
    }

    #[test]
    fn forward_sweep_is_gauss_seidel_on_normal_equations() {
        let a = rect();
        let b = vec![1.0, -2.0, 0.5];
        let mut pc = NegsPc::new(false);
        let mut x = vec![0.0; 3];
        pc.apply(&a, &b, &mut x).unwrap();
        // (D + L) x = b with L the strict lower part of A·Aᵗ
        let aat_dense: Vec<Vec<f64>> = (0..3)
            .map(|i| {
                let mut e = vec![0.0; 3];
                e[i] = 1.0;
                aat(&a, &e)
            })
            .collect();
        for i in 0..3 {
            let mut lhs = 0.0;
            for j in 0..=i {
                lhs += aat_dense[j][i] * x[j];
            }
            assert_abs_diff_eq!(lhs, b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn mul_inverts_apply() {
        let a = rect();
        let b = vec![1.0, -2.0, 0.5];
        for symmetric in [true, false] {
            let mut pc = NegsPc::new(symmetric);
            let mut x = vec![0.0; 3];
            pc.apply(&a, &b, &mut x).unwrap();
            let back = pc.mul(&a, &x).unwrap();
            for (u, v) in back.iter().zip(&b) {
                assert_abs_diff_eq!(*u, *v, epsilon = 1e-12);
            }

            pc.apply_transpose(&a, &b, &mut x).unwrap();
            let back = pc.transp_mul(&a, &x).unwrap();
            for (u, v) in back.iter().zip(&b) {
                assert_abs_diff_eq!(*u, *v, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn symmetric_apply_is_self_adjoint() {
        let a = rect();
        let mut pc = NegsPc::new(true);
        let u = vec![1.0, 0.0, -1.0];
        let v = vec![0.5, 2.0, 1.0];
        let mut mu = vec![0.0; 3];
        let mut mv = vec![0.0; 3];
        pc.apply(&a, &u, &mut mu).unwrap();
        pc.apply(&a, &v, &mut mv).unwrap();
        let lhs: f64 = mu.iter().zip(&v).map(|(p, q)| p * q).sum();
        let rhs: f64 = u.iter().zip(&mv).map(|(p, q)| p * q).sum();
        assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-12);
    }

    #[test]
    fn cache_follows_matrix_changes() {
        let mut a = rect();
        let b = vec![1.0, 1.0, 1.0];
        let mut pc = NegsPc::new(true);
        let mut before = vec![0.0; 3];
        pc.apply(&a, &b, &mut before).unwrap();
        a.values_mut()[0] = 4.0;
        let mut after = vec![0.0; 3];
        pc.apply(&a, &b, &mut after).unwrap();
        let mut fresh = vec![0.0; 3];
        NegsPc::new(true).apply(&a, &b, &mut fresh).unwrap();
        assert_eq!(after, fresh);
        assert_ne!(before, after);
    }

    #[test]
    fn zero_row_is_rejected() {
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0)]).unwrap();
        let mut z = vec![0.0; 2];
        let err = NegsPc::new(true).apply(&a, &[1.0, 1.0], &mut z).unwrap_err();
        assert_eq!(err, KError::ZeroPivot(1));
    }
}
