//! GMRESR: GCR outer iteration with an inner GMRES solve per step
//! (van der Vorst & Vuik, 1994).
//!
//! The inner solve approximates A u = r. When it stagnates completely
//! (`‖A u − r‖ > 0.999 ‖r‖` with a tiny `u`), the direction is replaced by
//! the LSQR direction `u = Aᵗ r`.

use log::{debug, trace, warn};

use crate::core::traits::{MatShape, MatTransVec, MatVec, Real, real};
use crate::core::vector::{axpy, dot, norm, residual, scale};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::gmres::{GmresParams, gmres};
use crate::solver::{IterativeSolver, LinearSolver, Preconditioning, check_dims};
use crate::utils::convergence::{Convergence, SolveStats};

const STAGNATION_RATIO: f64 = 0.999;
const TINY_DIRECTION: f64 = 1e-3;

/// Inner GMRES settings of [`gmresr`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GmresrParams<T> {
    /// Restart length of the inner GMRES
    pub restart: usize,
    pub inner_max_iter: usize,
    /// Relative tolerance of the inner GMRES
    pub inner_tol: T,
    pub preconditioning: Preconditioning,
}

impl<T: Real> Default for GmresrParams<T> {
    fn default() -> Self {
        Self { restart: 20, inner_max_iter: 20, inner_tol: real(1e-2), preconditioning: Preconditioning::Right }
    }
}

pub fn gmresr<M, P, T>(
    a: &M,
    x: &mut [T],
    b: &[T],
    pc: &mut P,
    params: &GmresrParams<T>,
    conv: &Convergence<T>,
) -> Result<SolveStats<T>, KError>
where
    M: MatVec<T> + MatTransVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T> + ?Sized,
    T: Real,
{
    let n = a.nrows();
    check_dims(n, b, x)?;
    let inner_params =
        GmresParams { restart: params.restart, preconditioning: params.preconditioning, calculate_true_residual: false };
    let inner_conv = Convergence::new(params.inner_tol, params.inner_max_iter, true);

    let mut r = vec![T::zero(); n];
    residual(a, x, b, &mut r);
    let normb = conv.reference_norm(norm(b));
    let mut resid = norm(&r) / normb;
    let mut us: Vec<Vec<T>> = Vec::new();
    let mut cs: Vec<Vec<T>> = Vec::new();
    let mut diff = vec![T::zero(); n];

    for k in 0..conv.max_iters {
        let (ok, stats) = conv.check(resid, k);
        if ok {
            return Ok(stats);
        }
        let mut u = vec![T::zero(); n];
        let inner = gmres(a, &mut u, &r, pc, &inner_params, &inner_conv, None)?;
        trace!(
            "gmresr: outer {k} resid {resid}, inner {} step(s) resid {}",
            inner.iterations, inner.final_residual
        );

        let mut c = vec![T::zero(); n];
        a.matvec(&u, &mut c);
        diff.iter_mut().zip(&c).zip(&r).for_each(|((d, &ci), &ri)| *d = ci - ri);
        if norm(&diff) > real::<T>(STAGNATION_RATIO) * norm(&r) && norm(&u) < real(TINY_DIRECTION) {
            warn!("gmresr: inner solve stagnated at outer step {k}, LSQR switch");
            a.mattransvec(&r, &mut u);
            a.matvec(&u, &mut c);
        }
        for (ui, ci) in us.iter().zip(&cs) {
            let alpha = dot(&c, ci);
            axpy(-alpha, ci, &mut c);
            axpy(-alpha, ui, &mut u);
        }
        let beta = norm(&c);
        if beta == T::zero() {
            warn!("gmresr: search direction collapsed at outer step {k}");
            return Ok(conv.exhausted(resid, k));
        }
        scale(T::one() / beta, &mut c);
        scale(T::one() / beta, &mut u);
        let gamma = dot(&r, &c);
        axpy(gamma, &u, x);
        axpy(-gamma, &c, &mut r);
        resid = norm(&r) / normb;
        us.push(u);
        cs.push(c);
    }
    let (ok, stats) = conv.check(resid, conv.max_iters);
    if ok { Ok(stats) } else { Ok(conv.exhausted(resid, conv.max_iters)) }
}

/// Driver for [`gmresr`]. Relative stopping criterion by default.
#[derive(Clone, Debug)]
pub struct GmresrSolver<P, T> {
    pub conv: Convergence<T>,
    pub params: GmresrParams<T>,
    pc: P,
    stats: SolveStats<T>,
}

impl<P, T: Real> GmresrSolver<P, T> {
    pub fn new(pc: P, params: GmresrParams<T>, tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters, true), params, pc, stats: SolveStats::unset() }
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.conv.relative = relative;
        self
    }

    pub fn pc_mut(&mut self) -> &mut P {
        &mut self.pc
    }
}

impl<M, P, T> LinearSolver<M, T> for GmresrSolver<P, T>
where
    M: MatVec<T> + MatTransVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T>,
    T: Real,
{
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        let stats = gmresr(a, x, b, &mut self.pc, &self.params, &self.conv)?;
        debug!(
            "GmresrSolver(m={}, inner={}): iterations {} residual {} converged {}",
            self.params.restart, self.params.inner_max_iter, stats.iterations, stats.final_residual, stats.converged
        );
        self.stats = stats.clone();
        Ok(stats)
    }
}

impl<P, T: Real> IterativeSolver<T> for GmresrSolver<P, T> {
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
