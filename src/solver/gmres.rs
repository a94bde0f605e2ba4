//! Generalized Minimal Residual (GMRES) solver with fixed restart (Saad §6.4)
//!
//! This module implements the restarted GMRES algorithm for solving large, sparse, and possibly nonsymmetric
//! linear systems Ax = b. GMRES minimizes the residual over a Krylov subspace and supports both left and right
//! preconditioning.
//!
//! # Features
//! - Left preconditioning monitors `‖M⁻¹(b − Ax)‖ / ‖M⁻¹b‖`, right preconditioning monitors `‖b − Ax‖ / ‖b‖`
//! - Modified Gram-Schmidt orthogonalization, Hessenberg matrix stored in a `faer::Mat`
//! - Givens rotations for the least-squares update, so the residual norm is known without forming `x`
//! - Happy breakdown detection for early termination
//! - Optional residual history and true-residual trace for debugging
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.4
//! - https://en.wikipedia.org/wiki/Generalized_minimal_residual_method

use faer::Mat;
use log::{debug, trace};

use crate::core::traits::{MatShape, MatVec, Real};
use crate::core::vector::{axpy, dot, norm, residual, scale};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{IterativeSolver, LinearSolver, Preconditioning, check_dims};
use crate::utils::convergence::{Convergence, SolveStats};

/// Tuning knobs of [`gmres`] besides the stopping criteria.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GmresParams {
    /// Arnoldi steps per restart cycle
    pub restart: usize,
    pub preconditioning: Preconditioning,
    /// Compute and log the unpreconditioned residual after every step (expensive).
    pub calculate_true_residual: bool,
}

impl Default for GmresParams {
    fn default() -> Self {
        Self { restart: 30, preconditioning: Preconditioning::Left, calculate_true_residual: false }
    }
}

/// Givens rotation annihilating `dy` against `dx`.
pub(crate) fn generate_plane_rotation<T: Real>(dx: T, dy: T) -> (T, T) {
    if dy == T::zero() {
        (T::one(), T::zero())
    } else {
        let r = (dx * dx + dy * dy).sqrt();
        (dx / r, dy / r)
    }
}

pub(crate) fn apply_plane_rotation<T: Real>(dx: &mut T, dy: &mut T, cs: T, sn: T) {
    let tmp = cs * *dx + sn * *dy;
    *dy = -sn * *dx + cs * *dy;
    *dx = tmp;
}

/// y = H(0..k,0..k)⁻¹ s(0..k), then out += Σ y_i v_i
fn update<T: Real>(out: &mut [T], k: usize, h: &Mat<T>, s: &[T], v: &[Vec<T>]) {
    let mut y = s[..k].to_vec();
    for i in (0..k).rev() {
        y[i] = y[i] / h[(i, i)];
        for j in 0..i {
            y[j] = y[j] - h[(j, i)] * y[i];
        }
    }
    for (yi, vi) in y.iter().zip(v) {
        axpy(*yi, vi, out);
    }
}

/// Correction to `x` from the first `k` basis vectors.
#[allow(clippy::too_many_arguments)]
fn apply_correction<M, P, T>(
    a: &M,
    pc: &mut P,
    mode: Preconditioning,
    x: &mut [T],
    k: usize,
    h: &Mat<T>,
    s: &[T],
    v: &[Vec<T>],
) -> Result<(), KError>
where
    M: MatVec<T> + ?Sized,
    P: Preconditioner<M, T> + ?Sized,
    T: Real,
{
    match mode {
        Preconditioning::Left => update(x, k, h, s, v),
        Preconditioning::Right => {
            let mut z = vec![T::zero(); x.len()];
            update(&mut z, k, h, s, v);
            let mut t = vec![T::zero(); x.len()];
            pc.apply(a, &z, &mut t)?;
            axpy(T::one(), &t, x);
        }
    }
    Ok(())
}

/// The residual GMRES monitors: `M⁻¹(b − Ax)` (left) or `b − Ax` (right).
fn monitored_residual<M, P, T>(
    a: &M,
    pc: &mut P,
    mode: Preconditioning,
    x: &[T],
    b: &[T],
    r: &mut [T],
) -> Result<(), KError>
where
    M: MatVec<T> + ?Sized,
    P: Preconditioner<M, T> + ?Sized,
    T: Real,
{
    match mode {
        Preconditioning::Right => residual(a, x, b, r),
        Preconditioning::Left => {
            let mut t = vec![T::zero(); b.len()];
            residual(a, x, b, &mut t);
            pc.apply(a, &t, r)?;
        }
    }
    Ok(())
}

/// Restarted GMRES.
///
/// `max_iters` bounds the total number of Arnoldi steps over all cycles. If
/// `history` is given, the monitored residual after every step is appended.
pub fn gmres<M, P, T>(
    a: &M,
    x: &mut [T],
    b: &[T],
    pc: &mut P,
    params: &GmresParams,
    conv: &Convergence<T>,
    mut history: Option<&mut Vec<T>>,
) -> Result<SolveStats<T>, KError>
where
    M: MatVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T> + ?Sized,
    T: Real,
{
    if params.restart == 0 {
        return Err(KError::InvalidParameter("gmres: restart must be positive".into()));
    }
    let n = a.nrows();
    check_dims(n, b, x)?;
    let mode = params.preconditioning;
    // More steps than the budget would only waste memory.
    let m = params.restart.min(conv.max_iters).max(1);

    let mut h = Mat::from_fn(m + 1, m, |_, _| T::zero());
    let mut s = vec![T::zero(); m + 1];
    let mut cs = vec![T::zero(); m];
    let mut sn = vec![T::zero(); m];
    let mut v: Vec<Vec<T>> = (0..=m).map(|_| vec![T::zero(); n]).collect();
    let mut w = vec![T::zero(); n];
    let mut t = vec![T::zero(); n];
    let mut r = vec![T::zero(); n];

    monitored_residual(a, pc, mode, x, b, &mut r)?;
    let mut beta = norm(&r);
    let normb = match mode {
        Preconditioning::Right => norm(b),
        Preconditioning::Left => {
            pc.apply(a, b, &mut w)?;
            norm(&w)
        }
    };
    let normb = conv.reference_norm(normb);

    let (ok, mut stats) = conv.check(beta / normb, 0);
    if ok {
        return Ok(stats);
    }

    let mut steps = 0;
    while steps < conv.max_iters {
        v[0].copy_from_slice(&r);
        scale(T::one() / beta, &mut v[0]);
        s.iter_mut().for_each(|si| *si = T::zero());
        s[0] = beta;

        let mut i = 0;
        while i < m && steps < conv.max_iters {
            steps += 1;
            match mode {
                Preconditioning::Right => {
                    pc.apply(a, &v[i], &mut t)?;
                    a.matvec(&t, &mut w);
                }
                Preconditioning::Left => {
                    a.matvec(&v[i], &mut t);
                    pc.apply(a, &t, &mut w)?;
                }
            }
            for k in 0..=i {
                let hk = dot(&w, &v[k]);
                h[(k, i)] = hk;
                axpy(-hk, &v[k], &mut w);
            }
            let hn = norm(&w);
            h[(i + 1, i)] = hn;
            let lucky = hn == T::zero();
            if !lucky {
                v[i + 1].copy_from_slice(&w);
                scale(T::one() / hn, &mut v[i + 1]);
            }

            for k in 0..i {
                let (mut hk, mut hk1) = (h[(k, i)], h[(k + 1, i)]);
                apply_plane_rotation(&mut hk, &mut hk1, cs[k], sn[k]);
                h[(k, i)] = hk;
                h[(k + 1, i)] = hk1;
            }
            let (c, sv) = generate_plane_rotation(h[(i, i)], h[(i + 1, i)]);
            cs[i] = c;
            sn[i] = sv;
            let (mut hii, mut hi1) = (h[(i, i)], h[(i + 1, i)]);
            apply_plane_rotation(&mut hii, &mut hi1, c, sv);
            h[(i, i)] = hii;
            h[(i + 1, i)] = hi1;
            let (mut si, mut si1) = (s[i], s[i + 1]);
            apply_plane_rotation(&mut si, &mut si1, c, sv);
            s[i] = si;
            s[i + 1] = si1;

            let resid = s[i + 1].abs() / normb;
            trace!("gmres: step {steps} resid {resid}");
            if let Some(hist) = history.as_deref_mut() {
                hist.push(resid);
            }
            if params.calculate_true_residual {
                let mut y = x.to_vec();
                apply_correction(a, pc, mode, &mut y, i + 1, &h, &s, &v)?;
                residual(a, &y, b, &mut t);
                trace!(
                    "gmres: absolute residual 2-norm {} absolute preconditioned residual {}",
                    norm(&t),
                    s[i + 1].abs()
                );
            }
            let (ok, st) = conv.check(resid, steps);
            stats = st;
            i += 1;
            if ok {
                apply_correction(a, pc, mode, x, i, &h, &s, &v)?;
                return Ok(stats);
            }
            if lucky {
                break;
            }
        }

        apply_correction(a, pc, mode, x, i, &h, &s, &v)?;
        monitored_residual(a, pc, mode, x, b, &mut r)?;
        beta = norm(&r);
        let (ok, st) = conv.check(beta / normb, steps);
        trace!("gmres: restart after {steps} steps, resid {}", st.final_residual);
        stats = st;
        if ok {
            return Ok(stats);
        }
        if beta == T::zero() {
            break;
        }
    }
    Ok(conv.exhausted(stats.final_residual, steps))
}

/// Driver for [`gmres`]. Relative stopping criterion by default.
#[derive(Clone, Debug)]
pub struct GmresSolver<P, T> {
    pub conv: Convergence<T>,
    pub params: GmresParams,
    pc: P,
    stats: SolveStats<T>,
    record_history: bool,
    history: Vec<T>,
}

impl<P, T: Real> GmresSolver<P, T> {
    /// Create a new GMRES solver with restart, tolerance, and max iterations.
    pub fn new(pc: P, restart: usize, tol: T, max_iters: usize) -> Self {
        Self {
            conv: Convergence::new(tol, max_iters, true),
            params: GmresParams { restart, ..GmresParams::default() },
            pc,
            stats: SolveStats::unset(),
            record_history: false,
            history: Vec::new(),
        }
    }

    /// Set the preconditioning side.
    pub fn with_preconditioning(mut self, mode: Preconditioning) -> Self {
        self.params.preconditioning = mode;
        self
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.conv.relative = relative;
        self
    }

    /// Record the monitored residual after every Arnoldi step.
    pub fn with_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    pub fn with_true_residual(mut self, on: bool) -> Self {
        self.params.calculate_true_residual = on;
        self
    }

    pub fn restart(&self) -> usize {
        self.params.restart
    }

    pub fn set_restart(&mut self, restart: usize) {
        self.params.restart = restart;
    }

    /// Residuals of the last solve (empty unless `with_history(true)`).
    pub fn history(&self) -> &[T] {
        &self.history
    }

    pub fn pc_mut(&mut self) -> &mut P {
        &mut self.pc
    }
}

impl<M, P, T> LinearSolver<M, T> for GmresSolver<P, T>
where
    M: MatVec<T> + MatShape + ?Sized,
    P: Preconditioner<M, T>,
    T: Real,
{
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        self.history.clear();
        let hist = if self.record_history { Some(&mut self.history) } else { None };
        let stats = gmres(a, x, b, &mut self.pc, &self.params, &self.conv, hist)?;
        debug!(
            "GmresSolver({:?}, m={}): iterations {} residual {} converged {}",
            self.params.preconditioning,
            self.params.restart,
            stats.iterations,
            stats.final_residual,
            stats.converged
        );
        self.stats = stats.clone();
        Ok(stats)
    }
}

impl<P, T: Real> IterativeSolver<T> for GmresSolver<P, T> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::CsrMatrix;
    use crate::preconditioner::{DummyPc, Relaxation};
    use approx::assert_abs_diff_eq;

    // Convection-diffusion stencil: nonsymmetric, diagonally dominant.
    fn convection_diffusion(n: usize) -> CsrMatrix<f64> {
        let mut t = Vec::new();
        for i in 0..n {
            if i > 0 {
                t.push((i, i - 1, -1.5));
            }
            t.push((i, i, 3.0));
            if i + 1 < n {
                t.push((i, i + 1, -0.5));
            }
        }
        CsrMatrix::from_triplets(n, n, &t).unwrap()
    }

    fn true_residual(a: &CsrMatrix<f64>, x: &[f64], b: &[f64]) -> f64 {
        let mut r = vec![0.0; b.len()];
        residual(a, x, b, &mut r);
        norm(&r)
    }

    #[test]
    fn plane_rotation_annihilates() {
        let (c, s) = generate_plane_rotation(3.0, 4.0);
        let (mut dx, mut dy) = (3.0, 4.0);
        apply_plane_rotation(&mut dx, &mut dy, c, s);
        assert_abs_diff_eq!(dx, 5.0, epsilon = 1e-14);
        assert_abs_diff_eq!(dy, 0.0, epsilon = 1e-14);
        assert_eq!(generate_plane_rotation(2.0, 0.0), (1.0, 0.0));
    }

    #[test]
    fn full_gmres_solves_nonsymmetric_system() {
        let n = 20;
        let a = convection_diffusion(n);
        let b: Vec<f64> = (0..n).map(|i| 1.0 + i as f64 * 0.1).collect();
        let mut x = vec![0.0; n];
        let mut solver = GmresSolver::new(DummyPc, n, 1e-10, 100);
        let stats = solver.solve(&a, &b, &mut x).unwrap();
        assert!(stats.converged);
        assert!(stats.iterations <= n);
        assert!(true_residual(&a, &x, &b) / norm(&b) <= 1e-9);
    }

    #[test]
    fn residual_history_is_monotone() {
        let n = 30;
        let a = convection_diffusion(n);
        let b = vec![1.0; n];
        let mut x = vec![0.0; n];
        let mut solver = GmresSolver::new(DummyPc, 40, 1e-12, 40).with_history(true);
        let stats = solver.solve(&a, &b, &mut x).unwrap();
        assert!(stats.converged);
        let hist = solver.history();
        assert_eq!(hist.len(), stats.iterations);
        for w in hist.windows(2) {
            assert!(w[1] <= w[0] * (1.0 + 1e-12), "history not monotone: {w:?}");
        }
    }

    #[test]
    fn restarted_gmres_converges() {
        let n = 40;
        let a = convection_diffusion(n);
        let b: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
        let mut x = vec![0.0; n];
        let conv = Convergence::new(1e-8, 500, true);
        let params = GmresParams { restart: 5, ..GmresParams::default() };
        let stats = gmres(&a, &mut x, &b, &mut DummyPc, &params, &conv, None).unwrap();
        assert!(stats.converged);
        assert!(true_residual(&a, &x, &b) / norm(&b) <= 1e-7);
    }

    #[test]
    fn right_preconditioning_reports_true_residual() {
        let n = 25;
        let a = convection_diffusion(n);
        let b = vec![1.0; n];
        let mut x = vec![0.0; n];
        let mut solver = GmresSolver::new(Relaxation::gs_pc(1.0), 10, 1e-10, 200)
            .with_preconditioning(Preconditioning::Right)
            .with_true_residual(true);
        let stats = solver.solve(&a, &b, &mut x).unwrap();
        assert!(stats.converged);
        let rel = true_residual(&a, &x, &b) / norm(&b);
        assert!(rel <= 1e-9, "true relative residual {rel}");
    }

    #[test]
    fn left_preconditioning_converges() {
        let n = 25;
        let a = convection_diffusion(n);
        let b = vec![1.0; n];
        let mut x = vec![0.0; n];
        let mut solver = GmresSolver::new(Relaxation::ssor_pc(1.0), 10, 1e-10, 200);
        let stats = solver.solve(&a, &b, &mut x).unwrap();
        assert!(stats.converged);
        assert!(true_residual(&a, &x, &b) / norm(&b) <= 1e-7);
    }

    #[test]
    fn identity_converges_in_one_step() {
        let a = CsrMatrix::from_triplets(3, 3, &[(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)]).unwrap();
        let b = vec![1.0, 2.0, 3.0];
        let mut x = vec![0.0; 3];
        let conv = Convergence::new(1e-12, 10, true);
        let stats = gmres(&a, &mut x, &b, &mut DummyPc, &GmresParams::default(), &conv, None).unwrap();
        assert!(stats.converged);
        assert_eq!(stats.iterations, 1);
        for (xi, bi) in x.iter().zip(&b) {
            assert_abs_diff_eq!(*xi, *bi, epsilon = 1e-14);
        }
    }

    #[test]
    fn zero_restart_is_rejected() {
        let a = CsrMatrix::from_triplets(1, 1, &[(0, 0, 1.0)]).unwrap();
        let params = GmresParams { restart: 0, ..GmresParams::default() };
        let mut x = vec![0.0];
        let err = gmres(&a, &mut x, &[1.0], &mut DummyPc, &params, &Convergence::new(1e-8, 5, true), None);
        assert!(matches!(err, Err(KError::InvalidParameter(_))));
    }
}
