//! Factory for Krylov Subspace Methods (KSP).
//!
//! `KspContext` turns a [`KspOptions`] into a ready-to-run driver for
//! `CsrMatrix<T>` systems: the preconditioner is built by
//! [`build_preconditioner`], wrapped into the selected driver, and the
//! driver is kept behind `Box<dyn KrylovSolver>` so that repeated solves
//! reuse its caches and report their statistics through one interface.
//!
//! # Usage
//!
//! 1. Fill a `KspOptions` (or parse the kinds from parameter-file strings).
//! 2. `KspContext::new(opts, &a)?`
//! 3. `ctx.solve(&a, &b, &mut x)?`, then query `ctx.solver().resid()` etc.

use log::{debug, info};

use crate::config::{KspOptions, PcKind, SolverKind};
use crate::context::pc_context::{BoxedPc, build_preconditioner};
use crate::core::traits::Real;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::solver::{
    BiCgStabSolver, CgSolver, GcrSolver, GmresSolver, GmresrParams, GmresrSolver, IdrsParams, IdrsSolver,
    IterativeSolver, KrylovSolver, MinresSolver, PLanczos, PcgSolver, PcgneSolver, PminresSolver,
};
use crate::utils::convergence::SolveStats;

/// Type-erased driver for `CsrMatrix<T>` systems.
pub type BoxedSolver<T> = Box<dyn KrylovSolver<CsrMatrix<T>, T>>;

/// Assemble the driver described by `opts` around `pc`.
pub fn build_solver<T: Real>(opts: &KspOptions<T>, pc: BoxedPc<T>) -> Result<BoxedSolver<T>, KError> {
    opts.validate()?;
    let (tol, max) = (opts.tol, opts.max_iter);
    let mut solver: BoxedSolver<T> = match opts.solver {
        SolverKind::Cg => Box::new(CgSolver::new(tol, max)),
        SolverKind::Pcg => Box::new(PcgSolver::new(pc, tol, max)),
        SolverKind::Pcgne => Box::new(PcgneSolver::new(pc, tol, max)),
        SolverKind::Gmres => {
            Box::new(GmresSolver::new(pc, opts.restart, tol, max).with_preconditioning(opts.preconditioning))
        }
        SolverKind::BiCgStab => Box::new(BiCgStabSolver::new(pc, tol, max)),
        SolverKind::Gcr => Box::new(GcrSolver::new(pc, opts.restart, tol, max)),
        SolverKind::Gmresr => {
            let params = GmresrParams {
                restart: opts.restart,
                inner_max_iter: opts.inner_max_iter,
                inner_tol: opts.inner_tol,
                preconditioning: opts.preconditioning,
            };
            Box::new(GmresrSolver::new(pc, params, tol, max))
        }
        SolverKind::Idrs => {
            let mut s = IdrsSolver::new(pc, opts.idrs_s, tol, max);
            s.params = IdrsParams { s: opts.idrs_s, omega_bound: opts.omega_bound, seed: opts.seed };
            Box::new(s)
        }
        SolverKind::Minres => Box::new(MinresSolver::new(tol, max)),
        SolverKind::Pminres => Box::new(PminresSolver::new(PLanczos::new(pc), tol, max)),
    };
    solver.set_rel_error(opts.effective_relative());
    Ok(solver)
}

/// A configured solver pipeline.
pub struct KspContext<T: Real> {
    opts: KspOptions<T>,
    solver: BoxedSolver<T>,
}

impl<T: Real> KspContext<T> {
    /// Build preconditioner and driver for systems with matrix `a`.
    pub fn new(opts: KspOptions<T>, a: &CsrMatrix<T>) -> Result<Self, KError> {
        opts.validate()?;
        if matches!(opts.solver, SolverKind::Cg | SolverKind::Minres) && opts.pc != PcKind::None {
            debug!("KspContext: {} ignores the {} preconditioner", opts.solver, opts.pc);
        }
        let pc = build_preconditioner(&opts, a)?;
        let solver = build_solver(&opts, pc)?;
        Ok(Self { opts, solver })
    }

    pub fn options(&self) -> &KspOptions<T> {
        &self.opts
    }

    pub fn solver(&self) -> &dyn KrylovSolver<CsrMatrix<T>, T> {
        self.solver.as_ref()
    }

    pub fn solver_mut(&mut self) -> &mut dyn KrylovSolver<CsrMatrix<T>, T> {
        self.solver.as_mut()
    }

    /// Solve `a x = b` with `x` as initial guess.
    pub fn solve(&mut self, a: &CsrMatrix<T>, b: &[T], x: &mut [T]) -> Result<SolveStats<T>, KError> {
        let stats = self.solver.solve(a, b, x)?;
        info!(
            "KspContext({}/{}): {} after {} iterations, residual {}",
            self.opts.solver,
            self.opts.pc,
            if stats.converged { "converged" } else { "not converged" },
            stats.iterations,
            stats.final_residual
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::MatVec;
    use crate::core::vector::{norm, residual};

    fn laplace_1d(n: usize) -> CsrMatrix<f64> {
        let mut t = Vec::new();
        for i in 0..n {
            if i > 0 {
                t.push((i, i - 1, -1.0));
            }
            t.push((i, i, 2.0));
            if i + 1 < n {
                t.push((i, i + 1, -1.0));
            }
        }
        CsrMatrix::from_triplets(n, n, &t).unwrap()
    }

    #[test]
    fn every_square_solver_solves_the_laplacian() {
        let n = 16;
        let a = laplace_1d(n);
        let b = vec![1.0; n];
        for kind in SolverKind::ALL.into_iter().filter(|k| *k != SolverKind::Pcgne) {
            let opts = KspOptions::new(kind, PcKind::Ssor).with_tol(1e-10).with_max_iter(500).with_relative(true);
            let mut ctx = KspContext::new(opts, &a).unwrap();
            let mut x = vec![0.0; n];
            let stats = ctx.solve(&a, &b, &mut x).unwrap();
            assert!(stats.converged, "{kind}: {stats:?}");
            assert_eq!(ctx.solver().iter(), stats.iterations);
            let mut r = vec![0.0; n];
            residual(&a, &x, &b, &mut r);
            assert!(norm(&r) / norm(&b) < 1e-8, "{kind}");
        }
    }

    #[test]
    fn cg_and_minres_ignore_the_configured_preconditioner() {
        let n = 12;
        let a = laplace_1d(n);
        let b: Vec<f64> = (0..n).map(|i| 1.0 + i as f64).collect();
        for kind in [SolverKind::Cg, SolverKind::Minres] {
            let run = |pc: PcKind| {
                let opts = KspOptions::new(kind, pc).with_tol(1e-10).with_max_iter(100);
                let mut ctx = KspContext::new(opts, &a).unwrap();
                let mut x = vec![0.0; n];
                let stats = ctx.solve(&a, &b, &mut x).unwrap();
                (stats, x)
            };
            let (plain, x_plain) = run(PcKind::None);
            let (with_pc, x_pc) = run(PcKind::Ssor);
            assert_eq!(plain.iterations, with_pc.iterations, "{kind}");
            assert!(with_pc.converged, "{kind}");
            for (u, v) in x_plain.iter().zip(&x_pc) {
                assert!((u - v).abs() < 1e-12, "{kind}");
            }
        }
    }

    #[test]
    fn pcgne_context_solves_normal_equations() {
        let a = laplace_1d(6);
        let u_true = vec![1.0, 0.0, -1.0, 2.0, 0.5, 0.25];
        let mut t = vec![0.0; 6];
        a.matvec(&u_true, &mut t);
        let mut b = vec![0.0; 6];
        a.matvec(&t, &mut b);
        let opts = KspOptions::new(SolverKind::Pcgne, PcKind::Negs).with_tol(1e-12).with_max_iter(100);
        let mut ctx = KspContext::new(opts, &a).unwrap();
        let mut u = vec![0.0; 6];
        assert!(ctx.solve(&a, &b, &mut u).unwrap().converged);
        for (ui, ei) in u.iter().zip(&u_true) {
            assert!((ui - ei).abs() < 1e-8);
        }
    }

    #[test]
    fn driver_defaults_for_relative_flag() {
        let a = laplace_1d(4);
        let ctx = KspContext::new(KspOptions::<f64>::new(SolverKind::Gmres, PcKind::None), &a).unwrap();
        assert!(ctx.solver().rel_error());
        let ctx = KspContext::new(KspOptions::<f64>::new(SolverKind::Pminres, PcKind::Jacobi), &a).unwrap();
        assert!(!ctx.solver().rel_error());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let a = laplace_1d(4);
        let opts = KspOptions::<f64>::new(SolverKind::Gcr, PcKind::None).with_restart(0);
        assert!(matches!(KspContext::new(opts, &a), Err(KError::InvalidParameter(_))));
    }
}
