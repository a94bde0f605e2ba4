//! Relaxation sweeps through the public API: closed-form values, smoothing
//! behaviour of every continue-variant, and symmetry of the symmetric
//! start-from-zero preconditioners.

mod common;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use krysolve::core::vector::{dot, norm};
use krysolve::matrix::CsrMatrix;
use krysolve::preconditioner::{Preconditioner, Relaxation, RelaxationMethod, SweepType, relax_step};

use common::{init_logger, laplace_2d};

#[test]
fn ssor0_sweep_closed_form() {
    // A = [[2,-1],[-1,2]], b = (1,1), omega = 1:
    // forward: x0 = 1/2, x1 = (1 + 1/2)/2 = 3/4
    // backward: x1 = 3/4, x0 = (1 + 3/4)/2 = 7/8
    let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 2.0), (0, 1, -1.0), (1, 0, -1.0), (1, 1, 2.0)]).unwrap();
    let mut x = vec![0.0; 2];
    relax_step(&a, &mut x, &[1.0, 1.0], RelaxationMethod::Ssor0.sweep_type(), 1.0, None).unwrap();
    assert_eq!(x, vec![0.875, 0.75]);

    let mut z = vec![0.0; 2];
    Relaxation::sgs_pc().apply(&a, &[1.0, 1.0], &mut z).unwrap();
    assert_eq!(z, x);
}

#[test]
fn continue_variants_reduce_the_error() {
    init_logger();
    let a = laplace_2d(6);
    let n = 36;
    let x_true: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64 / 11.0).collect();
    let mut b = vec![0.0; n];
    krysolve::core::traits::MatVec::matvec(&a, &x_true, &mut b);
    let methods = [
        (RelaxationMethod::Jacobi, 1.0),
        (RelaxationMethod::Jor, 0.8),
        (RelaxationMethod::GaussSeidel, 1.0),
        (RelaxationMethod::Sor, 1.5),
        (RelaxationMethod::SymmetricGaussSeidel, 1.0),
        (RelaxationMethod::Ssor, 1.3),
    ];
    for (method, omega) in methods {
        let mut smoother = Relaxation::new(method, omega);
        let mut x = vec![0.0; n];
        let err0 = norm(&x_true);
        smoother.smooth(&a, &mut x, &b, 20).unwrap();
        let e: Vec<f64> = x.iter().zip(&x_true).map(|(p, q)| p - q).collect();
        assert!(norm(&e) < 0.9 * err0, "{smoother}: {} vs {err0}", norm(&e));
    }
}

#[test]
fn symmetric_zero_start_preconditioners_are_symmetric() {
    let a = laplace_2d(4);
    let n = 16;
    let u: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
    let v: Vec<f64> = (0..n).map(|i| (i as f64 * 0.5).cos()).collect();
    for mut pc in [Relaxation::sgs_pc(), Relaxation::ssor_pc(1.3), Relaxation::ssor_diag_pc(0.7)] {
        let (mut mu, mut mv) = (vec![0.0; n], vec![0.0; n]);
        pc.apply(&a, &u, &mut mu).unwrap();
        pc.apply(&a, &v, &mut mv).unwrap();
        assert_relative_eq!(dot(&mu, &v), dot(&u, &mv), max_relative = 1e-12);
        assert!(dot(&mu, &u) > 0.0);
    }
}

#[test]
fn empty_sweep_copies_rhs() {
    let a = laplace_2d(2);
    let mut x = vec![5.0; 4];
    relax_step(&a, &mut x, &[1.0, 2.0, 3.0, 4.0], SweepType::empty(), 1.0, None).unwrap();
    assert_eq!(x, vec![1.0, 2.0, 3.0, 4.0]);
    let mut z = vec![0.0; 4];
    Relaxation::new(RelaxationMethod::Dummy, 1.0).apply(&a, &[1.0, 2.0, 3.0, 4.0], &mut z).unwrap();
    for (zi, ei) in z.iter().zip([1.0, 2.0, 3.0, 4.0]) {
        assert_abs_diff_eq!(*zi, ei);
    }
}
