//! Model problems shared by the demo and the benchmarks.

use krysolve::error::KError;
use krysolve::matrix::CsrMatrix;

/// 5-point Laplacian on an `m × m` grid (SPD, n = m²).
pub fn laplace_2d(m: usize) -> Result<CsrMatrix<f64>, KError> {
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
    CsrMatrix::from_triplets(n, n, &t)
}
