//! Dense and sparse matrix storage.
//!
//! Technology matrices of real product systems are extremely sparse: a
//! database with 20,000 processes typically has fewer than 10 inputs per
//! process, i.e. a density far below 0.1%. Small foreground systems on the
//! other hand are best handled densely.
//!
//! ## Representations
//!
//! | Variant | Storage | Best for |
//! |---------|---------|----------|
//! | [`Matrix::Dense`] | faer `Mat<f64>` | inverses, small systems, dense products |
//! | [`Matrix::Sparse`] | sprs `CsMat<f64>` (CSC) | assembled technology / intervention matrices |
//!
//! Both variants answer the same read/write API so that callers never need
//! to know which one they hold. Column-oriented operations (column scaling,
//! column scans) are cheap for both because the sparse variant is stored
//! column-compressed.

use faer::Mat;
use sprs::{CsMat, TriMat};

use crate::error::{LcaError, LcaResult};

/// Dense column-major matrix backed by faer.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    inner: Mat<f64>,
}

impl DenseMatrix {
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self {
            inner: Mat::zeros(rows, columns),
        }
    }

    pub fn from_fn(rows: usize, columns: usize, f: impl FnMut(usize, usize) -> f64) -> Self {
        Self {
            inner: Mat::from_fn(rows, columns, f),
        }
    }

    pub fn from_mat(inner: Mat<f64>) -> Self {
        Self { inner }
    }

    pub fn as_mat(&self) -> &Mat<f64> {
        &self.inner
    }

    pub fn rows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn columns(&self) -> usize {
        self.inner.ncols()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.inner.read(row, col)
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.inner.write(row, col, value);
    }
}

/// Sparse matrix in compressed sparse column format.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    inner: CsMat<f64>,
}

impl SparseMatrix {
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self {
            inner: TriMat::new((rows, columns)).to_csc(),
        }
    }

    /// Builds the matrix from `(row, col, value)` triplets. Duplicate
    /// positions are summed.
    pub fn from_triplets(rows: usize, columns: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut tri = TriMat::new((rows, columns));
        for &(row, col, value) in triplets {
            tri.add_triplet(row, col, value);
        }
        Self {
            inner: tri.to_csc(),
        }
    }

    pub fn from_csmat(inner: CsMat<f64>) -> Self {
        let inner = if inner.is_csc() { inner } else { inner.to_csc() };
        Self { inner }
    }

    pub fn as_csmat(&self) -> &CsMat<f64> {
        &self.inner
    }

    pub fn rows(&self) -> usize {
        self.inner.rows()
    }

    pub fn columns(&self) -> usize {
        self.inner.cols()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.inner.get(row, col).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        if value == 0.0 && self.inner.get(row, col).is_none() {
            return;
        }
        self.inner.insert(row, col, value);
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.inner.nnz()
    }

    /// Iterate over stored `(row, col, value)` entries.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.inner.iter().map(|(&v, (i, j))| (i, j, v))
    }

    /// Stored entries of column `col` as `(row, value)` pairs.
    pub fn column_iter(&self, col: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.inner
            .outer_view(col)
            .map(|column| column.iter().map(|(i, &v)| (i, v)).collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter()
    }
}

/// A matrix that is either dense or sparse.
#[derive(Debug, Clone)]
pub enum Matrix {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl Matrix {
    pub fn dense(rows: usize, columns: usize) -> Self {
        Matrix::Dense(DenseMatrix::zeros(rows, columns))
    }

    pub fn sparse(rows: usize, columns: usize) -> Self {
        Matrix::Sparse(SparseMatrix::zeros(rows, columns))
    }

    /// Builds a matrix from `(row, col, value)` triplets; duplicates are summed.
    pub fn from_triplets(
        rows: usize,
        columns: usize,
        triplets: &[(usize, usize, f64)],
        sparse: bool,
    ) -> Self {
        if sparse {
            return Matrix::Sparse(SparseMatrix::from_triplets(rows, columns, triplets));
        }
        let mut m = DenseMatrix::zeros(rows, columns);
        for &(row, col, value) in triplets {
            let current = m.get(row, col);
            m.set(row, col, current + value);
        }
        Matrix::Dense(m)
    }

    /// Dense matrix from row slices. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let n_rows = rows.len();
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        Matrix::Dense(DenseMatrix::from_fn(n_rows, n_cols, |i, j| rows[i][j]))
    }

    pub fn identity(n: usize) -> Self {
        Matrix::Dense(DenseMatrix::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 }))
    }

    pub fn rows(&self) -> usize {
        match self {
            Matrix::Dense(m) => m.rows(),
            Matrix::Sparse(m) => m.rows(),
        }
    }

    pub fn columns(&self) -> usize {
        match self {
            Matrix::Dense(m) => m.columns(),
            Matrix::Sparse(m) => m.columns(),
        }
    }

    pub fn is_square(&self) -> bool {
        self.rows() == self.columns()
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Matrix::Sparse(_))
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        match self {
            Matrix::Dense(m) => m.get(row, col),
            Matrix::Sparse(m) => m.get(row, col),
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        match self {
            Matrix::Dense(m) => m.set(row, col, value),
            Matrix::Sparse(m) => m.set(row, col, value),
        }
    }

    /// Number of non-zero values.
    pub fn nnz(&self) -> usize {
        match self {
            Matrix::Dense(m) => {
                let mut count = 0;
                for j in 0..m.columns() {
                    for i in 0..m.rows() {
                        if m.get(i, j) != 0.0 {
                            count += 1;
                        }
                    }
                }
                count
            }
            Matrix::Sparse(m) => m.triplets().filter(|&(_, _, v)| v != 0.0).count(),
        }
    }

    /// Fraction of non-zero values (nnz / (rows × columns)).
    pub fn density(&self) -> f64 {
        let size = self.rows() * self.columns();
        if size == 0 {
            return 0.0;
        }
        self.nnz() as f64 / size as f64
    }

    /// All non-zero values as `(row, col, value)`.
    pub fn nonzeros(&self) -> Vec<(usize, usize, f64)> {
        match self {
            Matrix::Dense(m) => {
                let mut entries = Vec::new();
                for j in 0..m.columns() {
                    for i in 0..m.rows() {
                        let v = m.get(i, j);
                        if v != 0.0 {
                            entries.push((i, j, v));
                        }
                    }
                }
                entries
            }
            Matrix::Sparse(m) => m.triplets().filter(|&(_, _, v)| v != 0.0).collect(),
        }
    }

    /// Non-zero values of column `col` as `(row, value)`.
    pub fn column_entries(&self, col: usize) -> Vec<(usize, f64)> {
        match self {
            Matrix::Dense(m) => (0..m.rows())
                .map(|i| (i, m.get(i, col)))
                .filter(|&(_, v)| v != 0.0)
                .collect(),
            Matrix::Sparse(m) => m.column_iter(col).filter(|&(_, v)| v != 0.0).collect(),
        }
    }

    /// Column `col` as a dense vector.
    pub fn column(&self, col: usize) -> Vec<f64> {
        match self {
            Matrix::Dense(m) => (0..m.rows()).map(|i| m.get(i, col)).collect(),
            Matrix::Sparse(m) => {
                let mut values = vec![0.0; m.rows()];
                for (i, v) in m.column_iter(col) {
                    values[i] = v;
                }
                values
            }
        }
    }

    /// Row `row` as a dense vector.
    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.columns()).map(|j| self.get(row, j)).collect()
    }

    pub fn diagonal(&self) -> Vec<f64> {
        let n = self.rows().min(self.columns());
        (0..n).map(|i| self.get(i, i)).collect()
    }

    /// Multiplies every column `j` with `factors[j]`.
    pub fn scale_columns(&mut self, factors: &[f64]) {
        match self {
            Matrix::Dense(m) => {
                for j in 0..m.columns() {
                    let f = factors.get(j).copied().unwrap_or(0.0);
                    for i in 0..m.rows() {
                        let v = m.get(i, j);
                        m.set(i, j, v * f);
                    }
                }
            }
            Matrix::Sparse(m) => {
                let mut tri = TriMat::new((m.rows(), m.columns()));
                for (i, j, v) in m.triplets() {
                    let f = factors.get(j).copied().unwrap_or(0.0);
                    let scaled = v * f;
                    if scaled != 0.0 {
                        tri.add_triplet(i, j, scaled);
                    }
                }
                m.inner = tri.to_csc();
            }
        }
    }

    /// Sub-matrix of the given rows and columns, in the given order. Keeps
    /// the representation of `self`.
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Matrix {
        match self {
            Matrix::Dense(m) => Matrix::Dense(DenseMatrix::from_fn(rows.len(), cols.len(), |i, j| {
                m.get(rows[i], cols[j])
            })),
            Matrix::Sparse(m) => {
                let mut row_map = vec![usize::MAX; m.rows()];
                for (new, &old) in rows.iter().enumerate() {
                    row_map[old] = new;
                }
                let mut tri = TriMat::new((rows.len(), cols.len()));
                for (new_col, &old_col) in cols.iter().enumerate() {
                    for (old_row, v) in m.column_iter(old_col) {
                        let new_row = row_map[old_row];
                        if new_row != usize::MAX && v != 0.0 {
                            tri.add_triplet(new_row, new_col, v);
                        }
                    }
                }
                Matrix::Sparse(SparseMatrix {
                    inner: tri.to_csc(),
                })
            }
        }
    }

    pub fn to_dense(&self) -> DenseMatrix {
        match self {
            Matrix::Dense(m) => m.clone(),
            Matrix::Sparse(m) => {
                let mut d = DenseMatrix::zeros(m.rows(), m.columns());
                for (i, j, v) in m.triplets() {
                    d.set(i, j, d.get(i, j) + v);
                }
                d
            }
        }
    }

    pub fn to_sparse(&self) -> SparseMatrix {
        match self {
            Matrix::Sparse(m) => m.clone(),
            Matrix::Dense(_) => {
                SparseMatrix::from_triplets(self.rows(), self.columns(), &self.nonzeros())
            }
        }
    }

    /// Matrix-vector product `self · v`.
    pub fn mul_vec(&self, v: &[f64]) -> LcaResult<Vec<f64>> {
        if self.columns() != v.len() {
            return Err(LcaError::mismatch("matrix-vector product", self.columns(), v.len()));
        }
        let mut out = vec![0.0; self.rows()];
        match self {
            Matrix::Dense(m) => {
                for (j, &vj) in v.iter().enumerate() {
                    if vj == 0.0 {
                        continue;
                    }
                    for (i, target) in out.iter_mut().enumerate() {
                        *target += m.get(i, j) * vj;
                    }
                }
            }
            Matrix::Sparse(m) => {
                for (i, j, value) in m.triplets() {
                    out[i] += value * v[j];
                }
            }
        }
        Ok(out)
    }

    /// Matrix product `self · other`.
    ///
    /// Dense × dense runs through faer, sparse × sparse through sprs; mixed
    /// products iterate the non-zeros of the sparse side into a dense result.
    pub fn mul(&self, other: &Matrix) -> LcaResult<Matrix> {
        if self.columns() != other.rows() {
            return Err(LcaError::mismatch("matrix product", self.columns(), other.rows()));
        }
        let product = match (self, other) {
            (Matrix::Dense(a), Matrix::Dense(b)) => {
                Matrix::Dense(DenseMatrix::from_mat(a.as_mat() * b.as_mat()))
            }
            (Matrix::Sparse(a), Matrix::Sparse(b)) => {
                let c: CsMat<f64> = a.as_csmat() * b.as_csmat();
                Matrix::Sparse(SparseMatrix::from_csmat(c))
            }
            (Matrix::Sparse(a), Matrix::Dense(b)) => {
                let mut r = DenseMatrix::zeros(a.rows(), b.columns());
                for (i, l, v) in a.triplets() {
                    for j in 0..b.columns() {
                        r.set(i, j, r.get(i, j) + v * b.get(l, j));
                    }
                }
                Matrix::Dense(r)
            }
            (Matrix::Dense(a), Matrix::Sparse(b)) => {
                let mut r = DenseMatrix::zeros(a.rows(), b.columns());
                for (l, j, v) in b.triplets() {
                    for i in 0..a.rows() {
                        r.set(i, j, r.get(i, j) + a.get(i, l) * v);
                    }
                }
                Matrix::Dense(r)
            }
        };
        Ok(product)
    }
}
