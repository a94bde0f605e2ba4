//! IDR(s) with bi-orthogonalization (van Gijzen & Sonneveld, "An elegant
//! IDR(s) variant that efficiently exploits bi-orthogonality properties",
//! TU Delft report 10-16, 2010).
//!
//! Every update of `x` (the `s` steps inside a space Gⱼ and the step into
//! Gⱼ₊₁) counts as one iteration. The shadow space is drawn from a seeded
//! generator, so runs are reproducible.

use faer::Mat;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::traits::{MatShape, MatVec, Real, real};
use crate::core::vector::{axpy, dot, norm, residual, scale};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{IterativeSolver, LinearSolver, check_dims};
use crate::utils::convergence::{Convergence, SolveStats};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IdrsParams<T> {
    /// Dimension of the shadow space
    pub s: usize,
    /// Lower bound for the angle safeguard of ω ("maintaining the convergence")
    pub omega_bound: T,
    pub seed: u64,
}

impl<T: Real> Default for IdrsParams<T> {
    fn default() -> Self {
        Self { s: 4, omega_bound: real(0.7), seed: 0x1d2_5eed }
    }
}

/// `s` random vectors in [-1, 1)ⁿ, orthonormalized by modified Gram-Schmidt.
fn shadow_space<T: Real>(n: usize, s: usize, seed: u64) -> Result<Vec<Vec<T>>, KError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut p: Vec<Vec<T>> =
        (0..s).map(|_| (0..n).map(|_| real(rng.gen_range(-1.0..1.0))).collect()).collect();
    for k in 0..s {
        let (done, rest) = p.split_at_mut(k);
        let pk = &mut rest[0];
        for pj in done.iter() {
            let sm = dot(pj, pk);
            axpy(-sm, pj, pk);
        }
        let nk = norm(pk);
        if nk == T::zero() {
            return Err(KError::SingularMatrix { context: "idrs shadow space", index: k });
        }
        scale(T::one() / nk, pk);
    }
    Ok(p)
}

pub fn idrs<M, P, T>(
    a: &M,
    x: &mut [T],
    b: &[T],
    pc: &mut P,
    params: &IdrsParams<T>,
    conv: &Convergence<T>,
) -> Result<SolveStats<T>, KError>
where
    M: MatVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T> + ?Sized,
    T: Real,
{
    let n = a.nrows();
    check_dims(n, b, x)?;
    let s = params.s;
    if s == 0 || s > n {
        return Err(KError::InvalidParameter(format!("idrs: shadow dimension {s} not in 1..={n}")));
    }
    let normb = conv.reference_norm(norm(b));
    let mut r = vec![T::zero(); n];
    residual(a, x, b, &mut r);
    let mut normres = norm(&r);
    let (ok, stats) = conv.check(normres / normb, 0);
    if ok {
        return Ok(stats);
    }

    let p = shadow_space::<T>(n, s, params.seed)?;
    let mut g = vec![vec![T::zero(); n]; s];
    let mut u = vec![vec![T::zero(); n]; s];
    let mut proj = Mat::from_fn(s, s, |i, j| if i == j { T::one() } else { T::zero() });
    let mut f = vec![T::zero(); s];
    let mut c = vec![T::zero(); s];
    let mut v = vec![T::zero(); n];
    let mut w = vec![T::zero(); n];
    let mut t = vec![T::zero(); n];
    let mut omega = T::one();
    let mut it = 0;
    let done = |normres: T, it: usize| normres / normb <= conv.tol || it >= conv.max_iters;

    while !done(normres, it) {
        for (fi, pi) in f.iter_mut().zip(&p) {
            *fi = dot(pi, &r);
        }
        for k in 0..s {
            // Lower triangular solve proj[k.., k..] c = f[k..]
            for j in 0..s - k {
                let mut cs = f[k + j];
                for l in 0..j {
                    cs = cs - proj[(k + j, k + l)] * c[l];
                }
                c[j] = cs / proj[(k + j, k + j)];
            }
            w.copy_from_slice(&r);
            for j in 0..s - k {
                axpy(-c[j], &g[k + j], &mut w);
            }
            pc.apply(a, &w, &mut v)?;

            // New U(:,k), G(:,k) in Gⱼ
            {
                let (head, tail) = u.split_at_mut(k + 1);
                let uk = &mut head[k];
                scale(c[0], uk);
                axpy(omega, &v, uk);
                for j in 1..s - k {
                    axpy(c[j], &tail[j - 1], uk);
                }
            }
            a.matvec(&u[k], &mut g[k]);
            {
                let (gd, gt) = g.split_at_mut(k);
                let (ud, ut) = u.split_at_mut(k);
                for i in 0..k {
                    let alpha = dot(&p[i], &gt[0]) / proj[(i, i)];
                    axpy(-alpha, &gd[i], &mut gt[0]);
                    axpy(-alpha, &ud[i], &mut ut[0]);
                }
            }
            for j in 0..s - k {
                proj[(k + j, k)] = dot(&p[k + j], &g[k]);
            }
            if proj[(k, k)] == T::zero() {
                return Err(KError::SingularMatrix { context: "idrs", index: k });
            }

            // Make r orthogonal to p_0..p_k
            let beta = f[k] / proj[(k, k)];
            axpy(-beta, &g[k], &mut r);
            axpy(beta, &u[k], x);
            normres = norm(&r);
            it += 1;
            trace!("idrs: iter {it} resid {}", normres / normb);
            if done(normres, it) {
                break;
            }
            for j in 1..s - k {
                f[k + j] = f[k + j] - beta * proj[(k + j, k)];
            }
        }
        if done(normres, it) {
            break;
        }

        // Step into Gⱼ₊₁
        pc.apply(a, &r, &mut v)?;
        a.matvec(&v, &mut t);
        let tn = norm(&t);
        let tr = dot(&t, &r);
        omega = if tn == T::zero() { T::zero() } else { tr / (tn * tn) };
        if omega == T::zero() {
            return Err(KError::StabilizationBreakdown { context: "idrs", iteration: it });
        }
        let rho = tr.abs() / (tn * normres);
        if rho < params.omega_bound {
            omega = omega * params.omega_bound / rho;
        }
        axpy(-omega, &t, &mut r);
        axpy(omega, &v, x);
        normres = norm(&r);
        it += 1;
        trace!("idrs: iter {it} resid {}", normres / normb);
    }
    let (ok, stats) = conv.check(normres / normb, it);
    if ok { Ok(stats) } else { Ok(conv.exhausted(normres / normb, it)) }
}

/// Driver for [`idrs`]. Relative stopping criterion by default.
#[derive(Clone, Debug)]
pub struct IdrsSolver<P, T> {
    pub conv: Convergence<T>,
    pub params: IdrsParams<T>,
    pc: P,
    stats: SolveStats<T>,
}

impl<P, T: Real> IdrsSolver<P, T> {
    pub fn new(pc: P, s: usize, tol: T, max_iters: usize) -> Self {
        Self {
            conv: Convergence::new(tol, max_iters, true),
            params: IdrsParams { s, ..IdrsParams::default() },
            pc,
            stats: SolveStats::unset(),
        }
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.conv.relative = relative;
        self
    }

    pub fn with_omega_bound(mut self, bound: T) -> Self {
        self.params.omega_bound = bound;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    pub fn pc_mut(&mut self) -> &mut P {
        &mut self.pc
    }
}

impl<M, P, T> LinearSolver<M, T> for IdrsSolver<P, T>
where
    M: MatVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T>,
    T: Real,
{
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        let stats = idrs(a, x, b, &mut self.pc, &self.params, &self.conv)?;
        debug!(
            "IdrsSolver(s={}): iterations {} residual {} converged {}",
            self.params.s, stats.iterations, stats.final_residual, stats.converged
        );
        self.stats = stats.clone();
        Ok(stats)
    }
}

impl<P, T: Real> IterativeSolver<T> for IdrsSolver<P, T> {
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
