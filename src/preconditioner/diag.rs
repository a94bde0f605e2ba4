//! Identity and diagonal scaling preconditioners.

use crate::core::traits::{Real, SparseMatrix};
use crate::error::KError;
use crate::preconditioner::Preconditioner;

/// Identity preconditioner: z = r.
#[derive(Clone, Copy, Debug, Default)]
pub struct DummyPc;

impl DummyPc {
    /// The identity is its own transpose.
    pub fn apply_transpose<T: Real>(&self, r: &[T], z: &mut [T]) -> Result<(), KError> {
        if r.len() != z.len() {
            return Err(KError::DimensionMismatch { expected: r.len(), found: z.len() });
        }
        z.copy_from_slice(r);
        Ok(())
    }

    /// Multiply with the preconditioning matrix (the identity).
    pub fn mul<M: ?Sized, T: Real>(&self, _a: &M, b: &[T]) -> Vec<T> {
        b.to_vec()
    }

    pub fn transp_mul<M: ?Sized, T: Real>(&self, _a: &M, b: &[T]) -> Vec<T> {
        b.to_vec()
    }
}

impl<M: ?Sized, T: Real> Preconditioner<M, T> for DummyPc {
    fn apply(&mut self, _a: &M, r: &[T], z: &mut [T]) -> Result<(), KError> {
        if r.len() != z.len() {
            return Err(KError::DimensionMismatch { expected: r.len(), found: z.len() });
        }
        z.copy_from_slice(r);
        Ok(())
    }
}

/// Diagonal scaling: z = D ⊙ r for a fixed vector D.
///
/// The matrix passed to `apply` is ignored, so D may come from anywhere
/// (a lumped mass matrix, the inverse diagonal of A, ...).
#[derive(Clone, Debug)]
pub struct DiagPc<T> {
    d: Vec<T>,
}

impl<T: Real> DiagPc<T> {
    pub fn new(d: Vec<T>) -> Self {
        Self { d }
    }

    /// Jacobi scaling: D = diag(A)⁻¹.
    pub fn inverse_diagonal<M>(a: &M) -> Result<Self, KError>
    where
        M: SparseMatrix<T> + ?Sized,
    {
        let d = (0..a.nrows())
            .map(|i| {
                let pos = a.diag_position(i).ok_or(KError::ZeroPivot(i))?;
                let aii = a.row(i).1[pos];
                if aii == T::zero() { Err(KError::ZeroPivot(i)) } else { Ok(T::one() / aii) }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { d })
    }

    pub fn diag(&self) -> &[T] {
        &self.d
    }
}

impl<M: ?Sized, T: Real> Preconditioner<M, T> for DiagPc<T> {
    fn apply(&mut self, _a: &M, r: &[T], z: &mut [T]) -> Result<(), KError> {
        if r.len() != self.d.len() {
            return Err(KError::DimensionMismatch { expected: self.d.len(), found: r.len() });
        }
        if z.len() != self.d.len() {
            return Err(KError::DimensionMismatch { expected: self.d.len(), found: z.len() });
        }
        for ((zi, &ri), &di) in z.iter_mut().zip(r).zip(&self.d) {
            *zi = di * ri;
        }
        Ok(())
    }
}
