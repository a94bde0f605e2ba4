//! MINRES and preconditioned MINRES for symmetric (possibly indefinite) systems.
//!
//! The tridiagonal matrix produced by a Lanczos recursion is reduced to upper
//! triangular form by Givens rotations as it grows, so the iterate is updated
//! with one rank-1 correction per step and no basis has to be stored. See
//! A. Reusken, "Numerical methods for elliptic partial differential
//! equations", pp. 149-154.
//!
//! The residual is measured in the preconditioner's inner product; the
//! relative criterion compares against the norm of the initial residual.

use log::{debug, trace, warn};

use crate::core::traits::{MatShape, MatVec, Real};
use crate::core::vector::{axpy, residual};
use crate::error::KError;
use crate::solver::gmres::{apply_plane_rotation, generate_plane_rotation};
use crate::solver::lanczos::{Lanczos, LanczosBasis};
use crate::solver::{IterativeSolver, LinearSolver, check_dims};
use crate::utils::convergence::{Convergence, SolveStats};
use crate::utils::sbuffer::SBuffer;

/// Rotate `v` in place: v = G(c, s) v.
fn rotate_pair<T: Real>(v: &mut [T; 2], c: T, s: T) {
    let [mut x, mut y] = *v;
    apply_plane_rotation(&mut x, &mut y, c, s);
    *v = [x, y];
}

/// PMINRES on top of a Lanczos recursion `q` already started with
/// `q.new_basis(a, b - A x)`.
pub fn pminres<M, L, T>(
    a: &M,
    x: &mut [T],
    q: &mut L,
    conv: &Convergence<T>,
) -> Result<SolveStats<T>, KError>
where
    M: ?Sized,
    L: LanczosBasis<M, T> + ?Sized,
    T: Real,
{
    let n = x.len();
    let norm_r0 = q.norm_r0();
    let normb = conv.reference_norm(norm_r0.abs());
    let mut lucky = q.breakdown();

    let (ok, mut stats) = conv.check(norm_r0 / normb, 0);
    trace!("pminres: k 0 resid {}", stats.final_residual);
    if ok {
        return Ok(stats);
    }
    if q.q0().len() != n {
        return Err(KError::DimensionMismatch { expected: n, found: q.q0().len() });
    }

    let mut c: SBuffer<T, 3> = SBuffer::filled(T::zero());
    let mut s: SBuffer<T, 3> = SBuffer::filled(T::zero());
    let mut r: SBuffer<[T; 3], 3> = SBuffer::filled([T::zero(); 3]);
    let mut p: SBuffer<Vec<T>, 3> = SBuffer::filled(vec![T::zero(); n]);
    let mut bb: SBuffer<[T; 2], 2> = SBuffer::filled([T::zero(); 2]);

    for k in 1..=conv.max_iters {
        let q0 = q.q0();
        match k {
            1 => {
                let (a0, b0) = (q.a0(), q.b(0));
                let (ck, sk) = generate_plane_rotation(a0, b0);
                c[0] = ck;
                s[0] = sk;
                // sqrt(a0² + b0²), carrying the sign of a0 when no rotation happens
                r[0][0] = ck * a0 + sk * b0;
                let inv = T::one() / r[0][0];
                for (pi, &qi) in p[0].iter_mut().zip(q0) {
                    *pi = qi * inv;
                }
                bb[0] = [T::one(), T::zero()];
                rotate_pair(&mut bb[0], c[0], s[0]);
            }
            2 => {
                let mut rk = [q.b(-1), q.a0(), q.b(0)];
                apply_plane_rotation_at(&mut rk, 0, c[-1], s[-1]);
                let (ck, sk) = generate_plane_rotation(rk[1], rk[2]);
                c[0] = ck;
                s[0] = sk;
                apply_plane_rotation_at(&mut rk, 1, ck, sk);
                r[0] = rk;
                let inv = T::one() / rk[1];
                let (p0, pm1) = p.pair_mut(0, -1);
                for ((pi, &qi), &pm) in p0.iter_mut().zip(q0).zip(pm1.iter()) {
                    *pi = (qi - rk[0] * pm) * inv;
                }
                bb[0] = [bb[-1][1], T::zero()];
                rotate_pair(&mut bb[0], ck, sk);
            }
            _ => {
                let mut rk = [T::zero(), q.b(-1), q.a0()];
                let mut tmp = q.b(0);
                apply_plane_rotation_at(&mut rk, 0, c[-2], s[-2]);
                apply_plane_rotation_at(&mut rk, 1, c[-1], s[-1]);
                let (ck, sk) = generate_plane_rotation(rk[2], tmp);
                c[0] = ck;
                s[0] = sk;
                apply_plane_rotation(&mut rk[2], &mut tmp, ck, sk);
                r[0] = rk;
                let inv = T::one() / rk[2];
                let p0: Vec<T> = (0..n)
                    .map(|j| (q0[j] - rk[0] * p[-2][j] - rk[1] * p[-1][j]) * inv)
                    .collect();
                p[0] = p0;
                bb[0] = [bb[-1][1], T::zero()];
                rotate_pair(&mut bb[0], ck, sk);
            }
        }
        // x += norm_r0 * b[0][0] * p[0]
        axpy(norm_r0 * bb[0][0], &p[0], x);

        let res = (norm_r0 * bb[0][1]).abs() / normb;
        trace!("pminres: k {k} resid {res}");
        let (ok, st) = conv.check(res, k);
        stats = st;
        if ok || lucky {
            stats.converged = true;
            return Ok(stats);
        }
        if !q.next(a)? {
            lucky = true;
            warn!("pminres: lucky breakdown at step {k}");
        }
        c.rotate();
        s.rotate();
        r.rotate();
        p.rotate();
        bb.rotate();
    }
    Ok(conv.exhausted(stats.final_residual, conv.max_iters))
}

/// Apply the rotation to entries `i` and `i + 1` of `v`.
fn apply_plane_rotation_at<T: Real>(v: &mut [T; 3], i: usize, c: T, s: T) {
    let (mut x, mut y) = (v[i], v[i + 1]);
    apply_plane_rotation(&mut x, &mut y, c, s);
    v[i] = x;
    v[i + 1] = y;
}

/// Unpreconditioned MINRES.
pub fn minres<M, T>(a: &M, x: &mut [T], b: &[T], conv: &Convergence<T>) -> Result<SolveStats<T>, KError>
where
    M: MatVec<T> + MatShape + ?Sized,
    T: Real,
{
    let n = a.nrows();
    check_dims(n, b, x)?;
    let mut r0 = vec![T::zero(); n];
    residual(a, x, b, &mut r0);
    let mut q = Lanczos::new();
    q.new_basis(a, &r0)?;
    pminres(a, x, &mut q, conv)
}

/// Driver for [`minres`]. Absolute stopping criterion by default.
#[derive(Clone, Debug)]
pub struct MinresSolver<T> {
    pub conv: Convergence<T>,
    stats: SolveStats<T>,
}

impl<T: Real> MinresSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters, false), stats: SolveStats::unset() }
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.conv.relative = relative;
        self
    }
}

impl<M, T> LinearSolver<M, T> for MinresSolver<T>
where
    M: MatVec<T> + MatShape + ?Sized,
    T: Real,
{
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        let stats = minres(a, x, b, &self.conv)?;
        debug!(
            "MinresSolver: iterations {} residual {} converged {}",
            stats.iterations, stats.final_residual, stats.converged
        );
        self.stats = stats.clone();
        Ok(stats)
    }
}

impl<T: Real> IterativeSolver<T> for MinresSolver<T> {
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

/// Driver for [`pminres`] with an owned Lanczos recursion, typically
/// [`PLanczos`](crate::solver::PLanczos). Absolute stopping criterion by default.
#[derive(Clone, Debug)]
pub struct PminresSolver<L, T> {
    pub conv: Convergence<T>,
    lanczos: L,
    stats: SolveStats<T>,
}

impl<L, T: Real> PminresSolver<L, T> {
    pub fn new(lanczos: L, tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters, false), lanczos, stats: SolveStats::unset() }
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.conv.relative = relative;
        self
    }

    pub fn lanczos_mut(&mut self) -> &mut L {
        &mut self.lanczos
    }
}

impl<M, L, T> LinearSolver<M, T> for PminresSolver<L, T>
where
    M: MatVec<T> + MatShape + ?Sized,
    L: LanczosBasis<M, T>,
    T: Real,
{
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        let n = a.nrows();
        check_dims(n, b, x)?;
        let mut r0 = vec![T::zero(); n];
        residual(a, x, b, &mut r0);
        self.lanczos.new_basis(a, &r0)?;
        let stats = pminres(a, x, &mut self.lanczos, &self.conv)?;
        debug!(
            "PminresSolver: iterations {} residual {} converged {}",
            stats.iterations, stats.final_residual, stats.converged
        );
        self.stats = stats.clone();
        Ok(stats)
    }
}

impl<L, T: Real> IterativeSolver<T> for PminresSolver<L, T> {
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
