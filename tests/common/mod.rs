//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use faer::Mat;
use krysolve::core::vector::{norm, residual};
use krysolve::matrix::CsrMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Install `env_logger`, filtered by the `KRYSOLVE_LOG` variable (e.g. `KRYSOLVE_LOG=trace`).
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::new().filter("KRYSOLVE_LOG"))
        .is_test(true)
        .try_init();
}

/// 5-point Laplacian on an `m × m` grid (SPD, n = m²).
pub fn laplace_2d(m: usize) -> CsrMatrix<f64> {
    let n = m * m;
    let mut t = Vec::with_capacity(5 * n);
    for i in 0..m {
        for j in 0..m {
            let row = i * m + j;
            if i > 0 {
                t.push((row, row - m, -1.0));
            }
            if j > 0 {
                t.push((row, row - 1, -1.0));
            }
            t.push((row, row, 4.0));
            if j + 1 < m {
                t.push((row, row + 1, -1.0));
            }
            if i + 1 < m {
                t.push((row, row + m, -1.0));
            }
        }
    }
    CsrMatrix::from_triplets(n, n, &t).unwrap()
}

/// Upwind convection-diffusion on an `m × m` grid (nonsymmetric, M-matrix).
pub fn convection_diffusion_2d(m: usize, peclet: f64) -> CsrMatrix<f64> {
    let n = m * m;
    let mut t = Vec::with_capacity(5 * n);
    for i in 0..m {
        for j in 0..m {
            let row = i * m + j;
            if i > 0 {
                t.push((row, row - m, -1.0));
            }
            if j > 0 {
                t.push((row, row - 1, -1.0 - peclet));
            }
            t.push((row, row, 4.0 + peclet));
            if j + 1 < m {
                t.push((row, row + 1, -1.0));
            }
            if i + 1 < m {
                t.push((row, row + m, -1.0));
            }
        }
    }
    CsrMatrix::from_triplets(n, n, &t).unwrap()
}

/// Random SPD matrix `Bᵗ B + n I` and right-hand side.
pub fn random_spd(n: usize, seed: u64) -> (Mat<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..n * n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let a = Mat::from_fn(n, n, |i, j| {
        let s: f64 = (0..n).map(|k| data[k * n + i] * data[k * n + j]).sum();
        if i == j { s + n as f64 } else { s }
    });
    let rhs = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    (a, rhs)
}

/// Random diagonally dominant nonsymmetric matrix and right-hand side.
pub fn random_nonsymmetric(n: usize, seed: u64) -> (Mat<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..n * n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let a = Mat::from_fn(n, n, |i, j| {
        let v = data[j * n + i];
        if i == j { v + n as f64 } else { v }
    });
    let rhs = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    (a, rhs)
}

pub fn relative_residual(a: &CsrMatrix<f64>, x: &[f64], b: &[f64]) -> f64 {
    let mut r = vec![0.0; b.len()];
    residual(a, x, b, &mut r);
    norm(&r) / norm(b)
}
