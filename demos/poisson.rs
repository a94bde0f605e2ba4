//! Solve a 2D Poisson problem with every preconditioned Krylov method.
//!
//! Run with `RUST_LOG=debug cargo run --example poisson` to see the driver logs.

use krysolve::config::{KspOptions, PcKind, SolverKind};
use krysolve::context::KspContext;
use krysolve::core::vector::{norm, residual};
use krysolve::error::KError;

mod grid;

use grid::laplace_2d;

fn main() -> Result<(), KError> {
    env_logger::init();

    let m = 24;
    let a = laplace_2d(m)?;
    let n = m * m;
    let h = 1.0 / (m as f64 + 1.0);
    let b = vec![h * h; n];

    let solvers = [
        SolverKind::Cg,
        SolverKind::Pcg,
        SolverKind::Gmres,
        SolverKind::BiCgStab,
        SolverKind::Gcr,
        SolverKind::Gmresr,
        SolverKind::Idrs,
        SolverKind::Minres,
        SolverKind::Pminres,
    ];
    for kind in solvers {
        let opts = KspOptions::new(kind, PcKind::Ssor).with_tol(1e-10).with_max_iter(2000).with_relative(true);
        let mut ctx = KspContext::new(opts, &a)?;
        let mut x = vec![0.0; n];
        let stats = ctx.solve(&a, &b, &mut x)?;

        let mut r = vec![0.0; n];
        residual(&a, &x, &b, &mut r);
        println!(
            "{:>9}: iterations {:>4}  converged {:>5}  true relative residual {:.3e}",
            kind,
            stats.iterations,
            stats.converged,
            norm(&r) / norm(&b)
        );
    }
    Ok(())
}
