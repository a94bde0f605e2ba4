//! Preconditioned BiCGStab solver (Saad §7.4.2, van der Vorst 1992)

use log::{debug, trace, warn};

use crate::core::traits::{MatShape, MatVec, Real};
use crate::core::vector::{axpy, dot, norm, residual};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{IterativeSolver, LinearSolver, check_dims};
use crate::utils::convergence::{Convergence, SolveStats};

/// Preconditioned BiCGStab.
///
/// `shadow` is the fixed shadow residual r̃; it defaults to the initial
/// residual. A vanishing ρ = r̃·r (or r̃·A p̂) and a vanishing stabilization
/// factor ω end the iteration without convergence.
pub fn bicgstab<M, P, T>(
    a: &M,
    x: &mut [T],
    b: &[T],
    pc: &mut P,
    conv: &Convergence<T>,
    shadow: Option<&[T]>,
) -> Result<SolveStats<T>, KError>
where
    M: MatVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T> + ?Sized,
    T: Real,
{
    let n = a.nrows();
    check_dims(n, b, x)?;
    let normb = conv.reference_norm(norm(b));
    let mut r = vec![T::zero(); n];
    residual(a, x, b, &mut r);
    let rtilde = match shadow {
        Some(s) if s.len() != n => {
            return Err(KError::DimensionMismatch { expected: n, found: s.len() });
        }
        Some(s) => s.to_vec(),
        None => r.clone(),
    };

    let (ok, mut stats) = conv.check(norm(&r) / normb, 0);
    if ok {
        return Ok(stats);
    }

    let mut p = vec![T::zero(); n];
    let mut phat = vec![T::zero(); n];
    let mut v = vec![T::zero(); n];
    let mut s = vec![T::zero(); n];
    let mut shat = vec![T::zero(); n];
    let mut t = vec![T::zero(); n];
    let (mut rho_2, mut alpha, mut omega) = (T::zero(), T::zero(), T::zero());

    for i in 1..=conv.max_iters {
        let rho_1 = dot(&rtilde, &r);
        if rho_1 == T::zero() {
            warn!("bicgstab: rho == 0 at iteration {i}");
            return Ok(conv.exhausted(norm(&r) / normb, i));
        }
        if i == 1 {
            p.copy_from_slice(&r);
        } else {
            let beta = (rho_1 / rho_2) * (alpha / omega);
            for ((pj, &rj), &vj) in p.iter_mut().zip(&r).zip(&v) {
                *pj = rj + beta * (*pj - omega * vj);
            }
        }
        pc.apply(a, &p, &mut phat)?;
        a.matvec(&phat, &mut v);
        let rv = dot(&rtilde, &v);
        if rv == T::zero() {
            warn!("bicgstab: shadow residual orthogonal to A p at iteration {i}");
            return Ok(conv.exhausted(norm(&r) / normb, i));
        }
        alpha = rho_1 / rv;
        for ((sj, &rj), &vj) in s.iter_mut().zip(&r).zip(&v) {
            *sj = rj - alpha * vj;
        }
        let (ok, st) = conv.check(norm(&s) / normb, i);
        if ok {
            axpy(alpha, &phat, x);
            return Ok(st);
        }

        pc.apply(a, &s, &mut shat)?;
        a.matvec(&shat, &mut t);
        let tt = dot(&t, &t);
        omega = if tt == T::zero() { T::zero() } else { dot(&t, &s) / tt };
        axpy(alpha, &phat, x);
        axpy(omega, &shat, x);
        for ((rj, &sj), &tj) in r.iter_mut().zip(&s).zip(&t) {
            *rj = sj - omega * tj;
        }
        rho_2 = rho_1;

        let (ok, st) = conv.check(norm(&r) / normb, i);
        trace!("bicgstab: iter {i} resid {}", st.final_residual);
        stats = st;
        if ok {
            return Ok(stats);
        }
        if omega == T::zero() {
            warn!("bicgstab: omega == 0 at iteration {i}");
            return Ok(conv.exhausted(stats.final_residual, i));
        }
    }
    Ok(conv.exhausted(stats.final_residual, conv.max_iters))
}

/// Driver for [`bicgstab`]. Relative stopping criterion by default.
#[derive(Clone, Debug)]
pub struct BiCgStabSolver<P, T> {
    pub conv: Convergence<T>,
    pc: P,
    shadow: Option<Vec<T>>,
    stats: SolveStats<T>,
}

impl<P, T: Real> BiCgStabSolver<P, T> {
    pub fn new(pc: P, tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters, true), pc, shadow: None, stats: SolveStats::unset() }
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.conv.relative = relative;
        self
    }

    /// Use a fixed shadow residual instead of the initial residual.
    pub fn with_shadow(mut self, shadow: Vec<T>) -> Self {
        self.shadow = Some(shadow);
        self
    }

    pub fn pc_mut(&mut self) -> &mut P {
        &mut self.pc
    }
}

impl<M, P, T> LinearSolver<M, T> for BiCgStabSolver<P, T>
where
    M: MatVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T>,
    T: Real,
{
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        let stats = bicgstab(a, x, b, &mut self.pc, &self.conv, self.shadow.as_deref())?;
        debug!(
            "BiCgStabSolver: iterations {} residual {} converged {}",
            stats.iterations, stats.final_residual, stats.converged
        );
        self.stats = stats.clone();
        Ok(stats)
    }
}

impl<P, T: Real> IterativeSolver<T> for BiCgStabSolver<P, T> {
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
