//! Krylov & direct solver interfaces.
//!
//! Every method exists twice: as a free function (`cg`, `gmres`, ...) that
//! runs the iteration on caller-provided data, and as a driver struct
//! (`CgSolver`, `GmresSolver`, ...) that stores a preconditioner, the
//! stopping criteria and the statistics of the last solve.

use crate::core::traits::Real;
use crate::error::KError;
use crate::utils::convergence::{Convergence, SolveStats};

/// Common interface for any direct or iterative solver.
pub trait LinearSolver<M: ?Sized, T> {
    /// Solve A·x = b, writing result into `x`.
    /// Returns iteration stats (including convergence info).
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError>;
}

/// Stopping criteria and last-run statistics of an iterative driver.
pub trait IterativeSolver<T: Real> {
    fn convergence(&self) -> &Convergence<T>;
    fn convergence_mut(&mut self) -> &mut Convergence<T>;
    /// Statistics of the most recent `solve`.
    fn stats(&self) -> &SolveStats<T>;

    fn set_tol(&mut self, tol: T) {
        self.convergence_mut().tol = tol;
    }
    fn set_max_iter(&mut self, max_iter: usize) {
        self.convergence_mut().max_iters = max_iter;
    }
    fn set_rel_error(&mut self, relative: bool) {
        self.convergence_mut().relative = relative;
    }
    fn tol(&self) -> T {
        self.convergence().tol
    }
    fn max_iter(&self) -> usize {
        self.convergence().max_iters
    }
    fn rel_error(&self) -> bool {
        self.convergence().relative
    }
    fn iter(&self) -> usize {
        self.stats().iterations
    }
    fn resid(&self) -> T {
        self.stats().final_residual
    }
    fn converged(&self) -> bool {
        self.stats().converged
    }
}

/// An iterative driver usable behind `Box<dyn KrylovSolver<M, T>>`.
pub trait KrylovSolver<M: ?Sized, T: Real>: LinearSolver<M, T> + IterativeSolver<T> {}

impl<M, T, S> KrylovSolver<M, T> for S
where
    M: ?Sized,
    T: Real,
    S: LinearSolver<M, T> + IterativeSolver<T> + ?Sized,
{
}

impl<M: ?Sized, T, S: LinearSolver<M, T> + ?Sized> LinearSolver<M, T> for Box<S> {
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        (**self).solve(a, b, x)
    }
}

impl<T: Real, S: IterativeSolver<T> + ?Sized> IterativeSolver<T> for Box<S> {
    fn convergence(&self) -> &Convergence<T> {
        (**self).convergence()
    }
    fn convergence_mut(&mut self) -> &mut Convergence<T> {
        (**self).convergence_mut()
    }
    fn stats(&self) -> &SolveStats<T> {
        (**self).stats()
    }
}

/// Side on which GMRES applies the preconditioner.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Preconditioning {
    /// Solve M⁻¹A x = M⁻¹b; the preconditioned residual is monitored.
    #[default]
    Left,
    /// Solve A M⁻¹ y = b, x = M⁻¹y; the true residual is monitored.
    Right,
}

fn check_dims(n: usize, b: &[impl Copy], x: &[impl Copy]) -> Result<(), KError> {
    if b.len() != n {
        return Err(KError::DimensionMismatch { expected: n, found: b.len() });
    }
    if x.len() != n {
        return Err(KError::DimensionMismatch { expected: n, found: x.len() });
    }
    Ok(())
}

pub mod bicgstab;
pub mod cg;
pub mod direct;
pub mod gcr;
pub mod gmres;
pub mod gmresr;
pub mod idrs;
pub mod lanczos;
pub mod minres;
pub mod pcg;
pub mod pcgne;

pub use bicgstab::{BiCgStabSolver, bicgstab};
pub use cg::{CgSolver, cg};
pub use direct::{GaussSolver, gauss_pivot};
pub use gcr::{GcrSolver, gcr};
pub use gmres::{GmresParams, GmresSolver, gmres};
pub use gmresr::{GmresrParams, GmresrSolver, gmresr};
pub use idrs::{IdrsParams, IdrsSolver, idrs};
pub use lanczos::{Lanczos, LanczosBasis, LanczosWindow, PLanczos};
pub use minres::{MinresSolver, PminresSolver, minres, pminres};
pub use pcg::{PcgSolver, pcg};
pub use pcgne::{PcgneSolver, pcgne};
