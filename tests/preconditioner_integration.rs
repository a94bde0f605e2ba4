//! Preconditioners plugged into the Krylov drivers.
//!
//! Checks that every preconditioner reduces the iteration count of its
//! natural partner solver on model problems, and that the caching
//! preconditioners notice matrix updates.

mod common;

use approx::assert_abs_diff_eq;
use krysolve::config::{KspOptions, PcKind, SolverKind};
use krysolve::context::KspContext;
use krysolve::core::traits::MatShape;
use krysolve::matrix::CsrMatrix;
use krysolve::preconditioner::{
    DiagPc, DummyPc, MultiSsorPc, NegsPc, OwnMatrixPc, Preconditioner, Relaxation, SolverAsPc,
};
use krysolve::solver::{CgSolver, GmresSolver, IterativeSolver, LinearSolver, PcgSolver, PcgneSolver};

use common::{convection_diffusion_2d, init_logger, laplace_2d, relative_residual};

fn pcg_iterations<P: Preconditioner<CsrMatrix<f64>, f64>>(a: &CsrMatrix<f64>, pc: P) -> usize {
    let b = vec![1.0; a.nrows()];
    let mut x = vec![0.0; b.len()];
    let mut solver = PcgSolver::new(pc, 1e-8, 1000).with_relative(true);
    let stats = solver.solve(a, &b, &mut x).unwrap();
    assert!(stats.converged);
    assert!(relative_residual(a, &x, &b) < 1e-7);
    stats.iterations
}

#[test]
fn symmetric_preconditioners_accelerate_pcg() {
    init_logger();
    let a = laplace_2d(12);
    let plain = pcg_iterations(&a, DummyPc);
    let ssor = pcg_iterations(&a, Relaxation::ssor_pc(1.5));
    let sgs = pcg_iterations(&a, Relaxation::sgs_pc());
    let multi = pcg_iterations(&a, MultiSsorPc::new(1.0, 3));
    assert!(ssor < plain, "ssor {ssor} vs {plain}");
    assert!(sgs < plain, "sgs {sgs} vs {plain}");
    assert!(multi < sgs, "multi {multi} vs sgs {sgs}");
    // Jacobi on a constant diagonal is a scaling and leaves CG unchanged.
    let jac = pcg_iterations(&a, DiagPc::inverse_diagonal(&a).unwrap());
    assert!(jac.abs_diff(plain) <= 1);
}

#[test]
fn identity_preconditioner_is_idempotent() {
    let a = laplace_2d(3);
    let r: Vec<f64> = (0..9).map(|i| i as f64 - 4.0).collect();
    let mut z = vec![f64::NAN; 9];
    DummyPc.apply(&a, &r, &mut z).unwrap();
    assert_eq!(z, r);
    DummyPc.apply(&a, &r, &mut z).unwrap();
    assert_eq!(z, r);
}

#[test]
fn ssor_diag_cache_follows_matrix_updates() {
    init_logger();
    let mut a = laplace_2d(4);
    let b = vec![1.0; 16];
    let mut pc = Relaxation::ssor_diag_pc(1.0);
    let mut z1 = vec![0.0; 16];
    pc.apply(&a, &b, &mut z1).unwrap();

    // Scaling A scales M⁻¹ by the inverse factor.
    a.values_mut().iter_mut().for_each(|v| *v *= 2.0);
    let mut z2 = vec![0.0; 16];
    pc.apply(&a, &b, &mut z2).unwrap();
    for (u, v) in z1.iter().zip(&z2) {
        assert_abs_diff_eq!(*u, 2.0 * *v, epsilon = 1e-14);
    }
}

#[test]
fn negs_inverts_its_own_multiplication() {
    let a = convection_diffusion_2d(3, 1.0);
    let mut pc = NegsPc::new(true);
    let r: Vec<f64> = (0..9).map(|i| (i as f64).cos()).collect();
    let mut z = vec![0.0; 9];
    pc.apply(&a, &r, &mut z).unwrap();
    let back = pc.mul(&a, &z).unwrap();
    for (x, y) in back.iter().zip(&r) {
        assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
    }
}

#[test]
fn pcgne_with_negs_beats_unpreconditioned() {
    init_logger();
    let a = convection_diffusion_2d(6, 3.0);
    let b = vec![1.0; 36];
    let mut u = vec![0.0; 36];
    let mut plain = PcgneSolver::new(DummyPc, 1e-10, 2000).with_relative(true);
    plain.solve(&a, &b, &mut u).unwrap();
    let mut u = vec![0.0; 36];
    let mut negs = PcgneSolver::new(NegsPc::new(true), 1e-10, 2000).with_relative(true);
    negs.solve(&a, &b, &mut u).unwrap();
    assert!(plain.converged() && negs.converged());
    assert!(negs.iter() < plain.iter(), "{} vs {}", negs.iter(), plain.iter());
}

#[test]
fn inner_solver_and_own_matrix_preconditioners() {
    init_logger();
    let a = convection_diffusion_2d(6, 2.0);
    let lap = laplace_2d(6);
    let b = vec![1.0; 36];

    // Exact Laplace solves as a preconditioner for the convection-diffusion operator.
    let inner = SolverAsPc::new(CgSolver::new(1e-12, 200));
    let mut solver = GmresSolver::new(OwnMatrixPc::new(inner, lap), 36, 1e-10, 200);
    let mut x = vec![0.0; 36];
    let stats = solver.solve(&a, &b, &mut x).unwrap();
    assert!(stats.converged);
    assert!(relative_residual(&a, &x, &b) < 1e-8);

    let mut plain = GmresSolver::new(DummyPc, 36, 1e-10, 200);
    let mut x = vec![0.0; 36];
    plain.solve(&a, &b, &mut x).unwrap();
    assert!(solver.iter() < plain.iter());
    let inner_iters = solver.pc_mut().pc_mut().total_iter();
    assert!(inner_iters > 0);
}

#[test]
fn context_runs_ssor_pcg_on_poisson() {
    init_logger();
    let a = laplace_2d(10);
    let opts = KspOptions::new(SolverKind::Pcg, "ssor".parse::<PcKind>().unwrap())
        .with_omega(1.4)
        .with_tol(1e-9)
        .with_relative(true);
    let mut ctx = KspContext::new(opts, &a).unwrap();
    let b = vec![1.0; 100];
    let mut x = vec![0.0; 100];
    let stats = ctx.solve(&a, &b, &mut x).unwrap();
    assert!(stats.converged);
    assert_eq!(ctx.solver().resid(), stats.final_residual);
    assert!(relative_residual(&a, &x, &b) < 1e-8);
}
