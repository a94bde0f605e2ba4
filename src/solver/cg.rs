//! Conjugate Gradient (unpreconditioned) per Saad §6.1.

use log::{debug, trace};

use crate::core::traits::{MatShape, MatVec, Real};
use crate::core::vector::{axpy, dot, norm, norm_sq};
use crate::error::KError;
use crate::solver::{IterativeSolver, LinearSolver, check_dims};
use crate::utils::convergence::{Convergence, SolveStats};

/// CG for symmetric positive definite `a`.
///
/// Stops as soon as `‖b − A x‖ / ‖b‖ ≤ tol` (or `‖b − A x‖ ≤ tol` for an
/// absolute criterion). `x` holds the initial guess on entry.
pub fn cg<M, T>(a: &M, x: &mut [T], b: &[T], conv: &Convergence<T>) -> Result<SolveStats<T>, KError>
where
    M: MatVec<T> + MatShape + ?Sized,
    T: Real,
{
    let n = a.nrows();
    check_dims(n, b, x)?;
    // r = A x - b, d = -r
    let mut r = vec![T::zero(); n];
    a.matvec(x, &mut r);
    for (ri, &bi) in r.iter_mut().zip(b) {
        *ri = *ri - bi;
    }
    let mut d: Vec<T> = r.iter().map(|&ri| -ri).collect();
    let mut ad = vec![T::zero(); n];
    let normb = conv.reference_norm(norm(b));
    let mut rsq = norm_sq(&r);

    let (ok, mut stats) = conv.check(rsq.sqrt() / normb, 0);
    if ok {
        return Ok(stats);
    }

    for i in 1..=conv.max_iters {
        a.matvec(&d, &mut ad);
        let alpha = rsq / dot(&ad, &d);
        axpy(alpha, &d, x);
        axpy(alpha, &ad, &mut r);

        let rsq_new = norm_sq(&r);
        let (ok, s) = conv.check(rsq_new.sqrt() / normb, i);
        trace!("cg: iter {i} resid {}", s.final_residual);
        stats = s;
        if ok {
            return Ok(stats);
        }
        let beta = rsq_new / rsq;
        // d = beta*d - r
        for (di, &ri) in d.iter_mut().zip(&r) {
            *di = beta * *di - ri;
        }
        rsq = rsq_new;
    }
    Ok(conv.exhausted(stats.final_residual, conv.max_iters))
}

/// Driver for [`cg`]. Absolute stopping criterion by default.
#[derive(Clone, Debug)]
pub struct CgSolver<T> {
    pub conv: Convergence<T>,
    stats: SolveStats<T>,
}

impl<T: Real> CgSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters, false), stats: SolveStats::unset() }
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.conv.relative = relative;
        self
    }
}

impl<M, T> LinearSolver<M, T> for CgSolver<T>
where
    M: MatVec<T> + MatShape + ?Sized,
    T: Real,
{
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        let stats = cg(a, x, b, &self.conv)?;
        debug!(
            "CgSolver: iterations {} residual {} converged {}",
            stats.iterations, stats.final_residual, stats.converged
        );
        self.stats = stats.clone();
        Ok(stats)
    }
}

impl<T: Real> IterativeSolver<T> for CgSolver<T> {
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
