//! Compressed sparse row storage.
//!
//! `CsrMatrix` is the assembled-system type the relaxation sweeps and caching
//! preconditioners work on. Every instance carries a unique `MatrixId` and a
//! version counter that is bumped whenever values are changed through
//! `values_mut`/`set`, so caches derived from the matrix can detect staleness
//! without comparing addresses.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::traits::{MatShape, MatTransVec, MatVec, MatrixId, Real, SparseMatrix};
use crate::error::KError;
use faer::Mat;

static NEXT_MATRIX_ID: AtomicU64 = AtomicU64::new(1);

fn fresh_id() -> MatrixId {
    MatrixId(NEXT_MATRIX_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug)]
pub struct CsrMatrix<T> {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
    id: MatrixId,
    version: u64,
}

impl<T: Real> CsrMatrix<T> {
    /// Build a CSR from raw row-ptr, col-idx, and values.
    ///
    /// Column indices must be strictly increasing inside each row.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, KError> {
        if row_ptr.len() != nrows + 1 {
            return Err(KError::DimensionMismatch { expected: nrows + 1, found: row_ptr.len() });
        }
        if col_idx.len() != values.len() || row_ptr[nrows] != values.len() {
            return Err(KError::DimensionMismatch { expected: row_ptr[nrows], found: values.len() });
        }
        for i in 0..nrows {
            let (beg, end) = (row_ptr[i], row_ptr[i + 1]);
            if beg > end {
                return Err(KError::InvalidParameter(format!("row_ptr not monotone at row {i}")));
            }
            let cols = &col_idx[beg..end];
            if cols.windows(2).any(|w| w[0] >= w[1]) || cols.iter().any(|&j| j >= ncols) {
                return Err(KError::InvalidParameter(format!("invalid column pattern in row {i}")));
            }
        }
        Ok(Self { nrows, ncols, row_ptr, col_idx, values, id: fresh_id(), version: 0 })
    }

    /// Assemble from (row, col, value) triplets; duplicates are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self, KError> {
        let mut sorted: Vec<(usize, usize, T)> = triplets.to_vec();
        for &(i, j, _) in &sorted {
            if i >= nrows || j >= ncols {
                return Err(KError::InvalidParameter(format!("triplet ({i}, {j}) out of range")));
            }
        }
        sorted.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        let mut row_ptr = vec![0; nrows + 1];
        let mut col_idx = Vec::with_capacity(sorted.len());
        let mut values: Vec<T> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for (i, j, v) in sorted {
            if last == Some((i, j)) {
                if let Some(tail) = values.last_mut() {
                    *tail = *tail + v;
                }
                continue;
            }
            col_idx.push(j);
            values.push(v);
            row_ptr[i + 1] += 1;
            last = Some((i, j));
        }
        for i in 0..nrows {
            row_ptr[i + 1] += row_ptr[i];
        }
        Self::from_csr(nrows, ncols, row_ptr, col_idx, values)
    }

    /// Copy the nonzero entries of a dense matrix.
    pub fn from_dense(a: &Mat<T>) -> Self {
        let (nrows, ncols) = (a.nrows(), a.ncols());
        let mut row_ptr = vec![0; nrows + 1];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        for i in 0..nrows {
            for j in 0..ncols {
                let v = a[(i, j)];
                if v != T::zero() {
                    col_idx.push(j);
                    values.push(v);
                }
            }
            row_ptr[i + 1] = col_idx.len();
        }
        Self { nrows, ncols, row_ptr, col_idx, values, id: fresh_id(), version: 0 }
    }

    /// Dense copy, mainly for tests and small auxiliary systems.
    pub fn to_dense(&self) -> Mat<T> {
        Mat::from_fn(self.nrows, self.ncols, |i, j| self.get(i, j))
    }

    /// Entry (i, j), zero if not stored.
    pub fn get(&self, i: usize, j: usize) -> T {
        let (cols, vals) = self.row(i);
        match cols.binary_search(&j) {
            Ok(k) => vals[k],
            Err(_) => T::zero(),
        }
    }

    /// Overwrite a stored entry. Changing the pattern is not supported.
    pub fn set(&mut self, i: usize, j: usize, v: T) -> Result<(), KError> {
        let (beg, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
        match self.col_idx[beg..end].binary_search(&j) {
            Ok(k) => {
                self.values[beg + k] = v;
                self.version += 1;
                Ok(())
            }
            Err(_) => Err(KError::Unsupported("CsrMatrix::set outside the sparsity pattern")),
        }
    }

    /// Mutable access to the value array; bumps the version.
    pub fn values_mut(&mut self) -> &mut [T] {
        self.version += 1;
        &mut self.values
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

impl<T: Clone> Clone for CsrMatrix<T> {
    /// A clone is a distinct matrix and gets its own identity.
    fn clone(&self) -> Self {
        Self {
            nrows: self.nrows,
            ncols: self.ncols,
            row_ptr: self.row_ptr.clone(),
            col_idx: self.col_idx.clone(),
            values: self.values.clone(),
            id: fresh_id(),
            version: 0,
        }
    }
}

impl<T> MatShape for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.nrows
    }
    fn ncols(&self) -> usize {
        self.ncols
    }
}

impl<T: Real> MatVec<T> for CsrMatrix<T> {
    fn matvec(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols, "Input vector x has incorrect length");
        assert_eq!(y.len(), self.nrows, "Output vector y has incorrect length");
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            y.par_iter_mut().enumerate().for_each(|(i, yi)| {
                *yi = mul_row(self, x, i);
            });
        }
        #[cfg(not(feature = "rayon"))]
        {
            for (i, yi) in y.iter_mut().enumerate() {
                *yi = mul_row(self, x, i);
            }
        }
    }
}

impl<T: Real> MatTransVec<T> for CsrMatrix<T> {
    fn mattransvec(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.nrows, "Input vector x has incorrect length");
        assert_eq!(y.len(), self.ncols, "Output vector y has incorrect length");
        y.iter_mut().for_each(|yi| *yi = T::zero());
        for (i, &xi) in x.iter().enumerate() {
            add_row_to_vec(self, xi, y, i);
        }
    }
}

impl<T: Real> SparseMatrix<T> for CsrMatrix<T> {
    fn row(&self, i: usize) -> (&[usize], &[T]) {
        let (beg, end) = (self.row_ptr[i], self.row_ptr[i + 1]);
        (&self.col_idx[beg..end], &self.values[beg..end])
    }
    fn matrix_id(&self) -> MatrixId {
        self.id
    }
    fn version(&self) -> u64 {
        self.version
    }
    fn row_nnz(&self, i: usize) -> usize {
        self.row_ptr[i + 1] - self.row_ptr[i]
    }
}

/// Dot product of row `i` of `a` with `x`.
pub fn mul_row<M, T>(a: &M, x: &[T], i: usize) -> T
where
    M: SparseMatrix<T> + ?Sized,
    T: Real,
{
    let (cols, vals) = a.row(i);
    cols.iter().zip(vals).fold(T::zero(), |acc, (&j, &v)| acc + v * x[j])
}

/// y ← y + t · (row `i` of `a`)
pub fn add_row_to_vec<M, T>(a: &M, t: T, y: &mut [T], i: usize)
where
    M: SparseMatrix<T> + ?Sized,
    T: Real,
{
    let (cols, vals) = a.row(i);
    for (&j, &v) in cols.iter().zip(vals) {
        y[j] = y[j] + t * v;
    }
}

/// Diagonal of A·Aᵗ, i.e. the squared Euclidean norms of the rows of `a`.
pub fn bbt_diag<M, T>(a: &M) -> Vec<T>
where
    M: SparseMatrix<T> + ?Sized,
    T: Real,
{
    (0..a.nrows())
        .map(|i| a.row(i).1.iter().fold(T::zero(), |acc, &v| acc + v * v))
        .collect()
}

/// Cached positions of the diagonal entries of a sparse matrix.
///
/// Remembers which matrix (id and version) it was built for.
#[derive(Clone, Debug)]
pub struct SparseMatDiag {
    pos: Vec<usize>,
    id: MatrixId,
    version: u64,
}

impl SparseMatDiag {
    pub fn new<M, T>(a: &M) -> Result<Self, KError>
    where
        M: SparseMatrix<T> + ?Sized,
        T: Real,
    {
        let pos = (0..a.nrows())
            .map(|i| a.diag_position(i).ok_or(KError::ZeroPivot(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { pos, id: a.matrix_id(), version: a.version() })
    }

    /// True if the cache was built for this matrix in its current state.
    pub fn is_valid_for<M, T>(&self, a: &M) -> bool
    where
        M: SparseMatrix<T> + ?Sized,
        T: Real,
    {
        self.id == a.matrix_id() && self.version == a.version()
    }

    /// Position of the diagonal entry inside row `i`.
    pub fn position(&self, i: usize) -> usize {
        self.pos[i]
    }
}
