//! Preconditioners for linear solvers.
//!
//! This module defines the Preconditioner trait and includes the relaxation
//! sweeps (Jacobi, Gauss-Seidel, SSOR and their start-from-zero variants),
//! identity and diagonal scaling, normal-equations Gauss-Seidel, and adapters
//! that turn a whole solver or a foreign matrix into a preconditioner.

use crate::error::KError;

/// A preconditioner M ≈ A⁻¹.
///
/// `apply` receives the system matrix, so a preconditioner can be derived
/// lazily from it (and re-derived when the matrix changes).
pub trait Preconditioner<M: ?Sized, T> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&mut self, a: &M, r: &[T], z: &mut [T]) -> Result<(), KError>;
    /// Optionally: setup/factorize from A
    fn setup(&mut self, _a: &M) -> Result<(), KError> {
        Ok(())
    }
}

impl<M, T, P> Preconditioner<M, T> for Box<P>
where
    M: ?Sized,
    P: Preconditioner<M, T> + ?Sized,
{
    fn apply(&mut self, a: &M, r: &[T], z: &mut [T]) -> Result<(), KError> {
        (**self).apply(a, r, z)
    }
    fn setup(&mut self, a: &M) -> Result<(), KError> {
        (**self).setup(a)
    }
}

impl<M, T, P> Preconditioner<M, T> for &mut P
where
    M: ?Sized,
    P: Preconditioner<M, T> + ?Sized,
{
    fn apply(&mut self, a: &M, r: &[T], z: &mut [T]) -> Result<(), KError> {
        (**self).apply(a, r, z)
    }
    fn setup(&mut self, a: &M) -> Result<(), KError> {
        (**self).setup(a)
    }
}

// Submodules for various preconditioners
pub mod diag;
pub mod negs;
pub mod own_matrix;
pub mod relaxation;
pub mod solver_as_pc;

// Re-exports for convenience
pub use diag::{DiagPc, DummyPc};
pub use negs::NegsPc;
pub use own_matrix::OwnMatrixPc;
pub use relaxation::{MultiSsorPc, Relaxation, RelaxationMethod, SweepType, relax_step};
pub use solver_as_pc::SolverAsPc;
