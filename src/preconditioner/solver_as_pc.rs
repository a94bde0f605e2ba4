//! Use an iterative solver as a preconditioner.

use log::debug;

use crate::core::traits::Real;
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{IterativeSolver, LinearSolver};

/// Computes z ≈ A⁻¹ r by running `solver` on A z = r from z = 0.
///
/// Inner iterations of all applications are summed up until
/// [`reset_iter`](Self::reset_iter). An inner solve that does not converge
/// is not an error: the preconditioner is whatever it produced.
#[derive(Clone, Debug)]
pub struct SolverAsPc<S> {
    solver: S,
    total_iter: usize,
}

impl<S> SolverAsPc<S> {
    pub fn new(solver: S) -> Self {
        Self { solver, total_iter: 0 }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut S {
        &mut self.solver
    }

    /// Inner iterations accumulated since the last reset.
    pub fn total_iter(&self) -> usize {
        self.total_iter
    }

    pub fn reset_iter(&mut self) {
        self.total_iter = 0;
    }
}

impl<M, T, S> Preconditioner<M, T> for SolverAsPc<S>
where
    M: ?Sized,
    T: Real,
    S: LinearSolver<M, T> + IterativeSolver<T>,
{
    fn apply(&mut self, a: &M, r: &[T], z: &mut [T]) -> Result<(), KError> {
        z.iter_mut().for_each(|zi| *zi = T::zero());
        let stats = self.solver.solve(a, r, z)?;
        self.total_iter += stats.iterations;
        debug!(
            "SolverAsPc: iterations {} residual {} (total {})",
            stats.iterations, stats.final_residual, self.total_iter
        );
        Ok(())
    }
}
