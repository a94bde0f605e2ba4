//! Truncated, preconditioned GCR (generalized conjugate residual).
//!
//! Keeps at most `m` search directions. Once the store is full, the new
//! direction replaces the stored one whose projection coefficient had the
//! smallest magnitude in the current step.

use log::{debug, trace, warn};

use crate::core::traits::{MatShape, MatVec, Real};
use crate::core::vector::{axpy, dot, norm, residual, scale};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{IterativeSolver, LinearSolver, check_dims};
use crate::utils::convergence::{Convergence, SolveStats};

pub fn gcr<M, P, T>(
    a: &M,
    x: &mut [T],
    b: &[T],
    pc: &mut P,
    m: usize,
    conv: &Convergence<T>,
) -> Result<SolveStats<T>, KError>
where
    M: MatVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T> + ?Sized,
    T: Real,
{
    if m == 0 {
        return Err(KError::InvalidParameter("gcr: truncation length must be positive".into()));
    }
    let n = a.nrows();
    check_dims(n, b, x)?;
    let m = m.min(conv.max_iters).max(1);

    let mut r = vec![T::zero(); n];
    residual(a, x, b, &mut r);
    let normb = conv.reference_norm(norm(b));
    let mut resid = norm(&r) / normb;

    let mut s: Vec<Vec<T>> = Vec::with_capacity(m);
    let mut v: Vec<Vec<T>> = Vec::with_capacity(m);
    let mut coeff = vec![T::zero(); m];
    let mut sn = vec![T::zero(); n];
    let mut vn = vec![T::zero(); n];

    for k in 0..conv.max_iters {
        let (ok, stats) = conv.check(resid, k);
        if ok {
            return Ok(stats);
        }
        pc.apply(a, &r, &mut sn)?;
        a.matvec(&sn, &mut vn);
        let stored = k.min(m);
        for i in 0..stored {
            let alpha = dot(&vn, &v[i]);
            coeff[i] = alpha;
            axpy(-alpha, &v[i], &mut vn);
            axpy(-alpha, &s[i], &mut sn);
        }
        let beta = norm(&vn);
        if beta == T::zero() {
            warn!("gcr: search direction collapsed at iteration {k}");
            return Ok(conv.exhausted(resid, k));
        }
        scale(T::one() / beta, &mut vn);
        scale(T::one() / beta, &mut sn);
        let gamma = dot(&r, &vn);
        axpy(gamma, &sn, x);
        axpy(-gamma, &vn, &mut r);
        resid = norm(&r) / normb;
        trace!("gcr: iter {} resid {resid}", k + 1);

        if k < m {
            s.push(sn.clone());
            v.push(vn.clone());
        } else {
            let min_idx = (1..stored).fold(0, |best, i| if coeff[i].abs() < coeff[best].abs() { i } else { best });
            s[min_idx].copy_from_slice(&sn);
            v[min_idx].copy_from_slice(&vn);
        }
    }
    let (ok, stats) = conv.check(resid, conv.max_iters);
    if ok { Ok(stats) } else { Ok(conv.exhausted(resid, conv.max_iters)) }
}

/// Driver for [`gcr`]. Relative stopping criterion by default.
#[derive(Clone, Debug)]
pub struct GcrSolver<P, T> {
    pub conv: Convergence<T>,
    pc: P,
    truncation: usize,
    stats: SolveStats<T>,
}

impl<P, T: Real> GcrSolver<P, T> {
    pub fn new(pc: P, truncation: usize, tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters, true), pc, truncation, stats: SolveStats::unset() }
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.conv.relative = relative;
        self
    }

    /// Maximal number of stored search directions.
    pub fn truncation(&self) -> usize {
        self.truncation
    }

    pub fn set_truncation(&mut self, m: usize) {
        self.truncation = m;
    }

    pub fn pc_mut(&mut self) -> &mut P {
        &mut self.pc
    }
}

impl<M, P, T> LinearSolver<M, T> for GcrSolver<P, T>
where
    M: MatVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T>,
    T: Real,
{
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        let stats = gcr(a, x, b, &mut self.pc, self.truncation, &self.conv)?;
        debug!(
            "GcrSolver(m={}): iterations {} residual {} converged {}",
            self.truncation, stats.iterations, stats.final_residual, stats.converged
        );
        self.stats = stats.clone();
        Ok(stats)
    }
}

impl<P, T: Real> IterativeSolver<T> for GcrSolver<P, T> {
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
