//! Preconditioner bound to a matrix of its own.

use crate::error::KError;
use crate::preconditioner::Preconditioner;

/// Applies `pc` with the stored matrix instead of the system matrix.
///
/// Used when the preconditioner is built from an approximation of the
/// operator, e.g. a mass or Laplace matrix standing in for a Schur
/// complement.
#[derive(Clone, Debug)]
pub struct OwnMatrixPc<P, A> {
    pc: P,
    mat: A,
}

impl<P, A> OwnMatrixPc<P, A> {
    pub fn new(pc: P, mat: A) -> Self {
        Self { pc, mat }
    }

    pub fn matrix(&self) -> &A {
        &self.mat
    }

    pub fn pc_mut(&mut self) -> &mut P {
        &mut self.pc
    }

    pub fn into_inner(self) -> (P, A) {
        (self.pc, self.mat)
    }
}

impl<M, T, P, A> Preconditioner<M, T> for OwnMatrixPc<P, A>
where
    M: ?Sized,
    P: Preconditioner<A, T>,
{
    fn apply(&mut self, _a: &M, r: &[T], z: &mut [T]) -> Result<(), KError> {
        self.pc.apply(&self.mat, r, z)
    }

    fn setup(&mut self, _a: &M) -> Result<(), KError> {
        self.pc.setup(&self.mat)
    }
}
