//! Preconditioned CG on the normal equations A·Aᵗ u = b (error minimization).
//!
//! `A` may be rectangular; A·Aᵗ is never formed. The preconditioner is handed
//! `A` (not A·Aᵗ), which is what [`NegsPc`](crate::preconditioner::NegsPc)
//! expects.

use log::{debug, trace};

use crate::core::traits::{MatShape, MatTransVec, MatVec, Real};
use crate::core::vector::{axpy, dot, norm, norm_sq, xpay};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{IterativeSolver, LinearSolver, check_dims};
use crate::utils::convergence::{Convergence, SolveStats};

pub fn pcgne<M, P, T>(
    a: &M,
    u: &mut [T],
    b: &[T],
    pc: &mut P,
    conv: &Convergence<T>,
) -> Result<SolveStats<T>, KError>
where
    M: MatVec<T> + MatTransVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T> + ?Sized,
    T: Real,
{
    let (n, num_cols) = (a.nrows(), a.ncols());
    check_dims(n, b, u)?;
    let mut pt = vec![T::zero(); num_cols];
    let mut apt = vec![T::zero(); n];
    // r = b - A Aᵗ u
    a.mattransvec(u, &mut pt);
    a.matvec(&pt, &mut apt);
    let mut r: Vec<T> = b.iter().zip(&apt).map(|(&bi, &ai)| bi - ai).collect();
    let normb = conv.reference_norm(norm(b));

    let (ok, mut stats) = conv.check(norm(&r) / normb, 0);
    if ok {
        return Ok(stats);
    }

    let mut z = vec![T::zero(); n];
    pc.apply(a, &r, &mut z)?;
    let mut qt = z.clone();
    let mut rho = dot(&z, &r);

    for i in 1..=conv.max_iters {
        a.mattransvec(&qt, &mut pt);
        let alpha = rho / norm_sq(&pt);
        axpy(alpha, &qt, u);
        a.matvec(&pt, &mut apt);
        axpy(-alpha, &apt, &mut r);
        pc.apply(a, &r, &mut z)?;

        let (ok, s) = conv.check(norm(&r) / normb, i);
        trace!("pcgne: iter {i} resid {}", s.final_residual);
        stats = s;
        if ok {
            return Ok(stats);
        }
        let rho_1 = rho;
        rho = dot(&z, &r);
        xpay(&z, rho / rho_1, &mut qt);
    }
    Ok(conv.exhausted(stats.final_residual, conv.max_iters))
}

/// Driver for [`pcgne`]. Absolute stopping criterion by default.
#[derive(Clone, Debug)]
pub struct PcgneSolver<P, T> {
    pub conv: Convergence<T>,
    pc: P,
    stats: SolveStats<T>,
}

impl<P, T: Real> PcgneSolver<P, T> {
    pub fn new(pc: P, tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters, false), pc, stats: SolveStats::unset() }
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.conv.relative = relative;
        self
    }

    pub fn pc_mut(&mut self) -> &mut P {
        &mut self.pc
    }
}

impl<M, P, T> LinearSolver<M, T> for PcgneSolver<P, T>
where
    M: MatVec<T> + MatTransVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T>,
    T: Real,
{
    /// Solves A·Aᵗ x = b.
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        let stats = pcgne(a, x, b, &mut self.pc, &self.conv)?;
        debug!(
            "PcgneSolver: iterations {} residual {} converged {}",
            stats.iterations, stats.final_residual, stats.converged
        );
        self.stats = stats.clone();
        Ok(stats)
    }
}

impl<P, T: Real> IterativeSolver<T> for PcgneSolver<P, T> {
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
