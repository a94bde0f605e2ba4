//! Preconditioned Conjugate Gradient.

use log::{debug, trace};

use crate::core::traits::{MatShape, MatVec, Real};
use crate::core::vector::{axpy, dot, norm, residual, xpay};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{IterativeSolver, LinearSolver, check_dims};
use crate::utils::convergence::{Convergence, SolveStats};

/// PCG for symmetric positive definite `a` and a symmetric positive
/// definite preconditioner `pc`. The stopping test uses the unpreconditioned
/// residual `‖b − A x‖`.
pub fn pcg<M, P, T>(
    a: &M,
    x: &mut [T],
    b: &[T],
    pc: &mut P,
    conv: &Convergence<T>,
) -> Result<SolveStats<T>, KError>
where
    M: MatVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T> + ?Sized,
    T: Real,
{
    let n = a.nrows();
    check_dims(n, b, x)?;
    let mut r = vec![T::zero(); n];
    residual(a, x, b, &mut r);
    let mut z = vec![T::zero(); n];
    let mut q = vec![T::zero(); n];
    let normb = conv.reference_norm(norm(b));

    let (ok, mut stats) = conv.check(norm(&r) / normb, 0);
    if ok {
        return Ok(stats);
    }

    pc.apply(a, &r, &mut z)?;
    let mut p = z.clone();
    let mut rho = dot(&r, &z);
    for i in 1..=conv.max_iters {
        a.matvec(&p, &mut q);
        let alpha = rho / dot(&p, &q);
        axpy(alpha, &p, x);
        axpy(-alpha, &q, &mut r);

        let (ok, s) = conv.check(norm(&r) / normb, i);
        trace!("pcg: iter {i} resid {}", s.final_residual);
        stats = s;
        if ok {
            return Ok(stats);
        }

        pc.apply(a, &r, &mut z)?;
        let rho_1 = rho;
        rho = dot(&r, &z);
        // p = z + (rho/rho_1) p
        xpay(&z, rho / rho_1, &mut p);
    }
    Ok(conv.exhausted(stats.final_residual, conv.max_iters))
}

/// Driver for [`pcg`]. Absolute stopping criterion by default.
#[derive(Clone, Debug)]
pub struct PcgSolver<P, T> {
    pub conv: Convergence<T>,
    pc: P,
    stats: SolveStats<T>,
}

impl<P, T: Real> PcgSolver<P, T> {
    pub fn new(pc: P, tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters, false), pc, stats: SolveStats::unset() }
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.conv.relative = relative;
        self
    }

    pub fn pc(&self) -> &P {
        &self.pc
    }

    pub fn pc_mut(&mut self) -> &mut P {
        &mut self.pc
    }
}

impl<M, P, T> LinearSolver<M, T> for PcgSolver<P, T>
where
    M: MatVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T>,
    T: Real,
{
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        let stats = pcg(a, x, b, &mut self.pc, &self.conv)?;
        debug!(
            "PcgSolver: iterations {} residual {} converged {}",
            stats.iterations, stats.final_residual, stats.converged
        );
        self.stats = stats.clone();
        Ok(stats)
    }
}

impl<P, T: Real> IterativeSolver<T> for PcgSolver<P, T> {
    fn convergence(&self) -> &Convergence<T> {
        &self.conv
    }
    fn convergence_mut(&mut self) -> &mut Convergence<T> {
        &mut self.conv
    }
    fn stats(&self) -> &SolveStats<T> {
        &self.stats
    }
}
