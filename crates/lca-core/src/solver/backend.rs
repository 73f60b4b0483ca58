use faer::{prelude::*, solvers::PartialPivLu, Mat};
use hashbrown::{HashMap, HashSet};
use tracing::debug;

use crate::error::{LcaError, LcaResult};
use crate::matrix::{DenseMatrix, Matrix};

/// Pivots with a smaller magnitude are treated as zero.
pub const SINGULAR_PIVOT_TOLERANCE: f64 = 1e-12;

/// Numeric contract shared by all linear algebra backends.
///
/// Backends differ only in performance: for the same input every backend
/// must return the same scaling vectors, inverses and products within
/// floating point tolerance.
pub trait MatrixSolver: Send + Sync {
    /// Unique identifier (e.g., "faer", "sparse")
    fn id(&self) -> &str;

    /// Creates a zero matrix of the default type of this backend.
    fn matrix(&self, rows: usize, columns: usize) -> Matrix;

    /// Creates a zero matrix whose representation may depend on the expected
    /// density (non-zeros / size).
    fn matrix_with_density(&self, rows: usize, columns: usize, _density: f64) -> Matrix {
        self.matrix(rows, columns)
    }

    /// Solves `A · s = d` where `d` is zero except `d[idx] = demand`.
    fn solve(&self, a: &Matrix, idx: usize, demand: f64) -> LcaResult<Vec<f64>>;

    /// Full inverse of `A`.
    fn invert(&self, a: &Matrix) -> LcaResult<Matrix>;

    /// Matrix product `a · b`.
    fn multiply(&self, a: &Matrix, b: &Matrix) -> LcaResult<Matrix> {
        a.mul(b)
    }

    /// Matrix-vector product `m · v`.
    fn multiply_vec(&self, m: &Matrix, v: &[f64]) -> LcaResult<Vec<f64>> {
        m.mul_vec(v)
    }
}

fn check_system(a: &Matrix, idx: usize) -> LcaResult<usize> {
    if !a.is_square() {
        return Err(LcaError::mismatch("solve", a.rows(), a.columns()));
    }
    let n = a.rows();
    if idx >= n {
        return Err(LcaError::mismatch("solve", n, idx + 1));
    }
    Ok(n)
}

/// Dense backend using faer's LU decomposition with partial pivoting.
#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

impl FaerSolver {
    /// LU factorization of `a`; fails when a pivot of `U` falls below
    /// [`SINGULAR_PIVOT_TOLERANCE`], the same bound the sparse backend uses.
    fn factorize(a: &Matrix) -> LcaResult<(PartialPivLu<f64>, usize)> {
        let dense = a.to_dense();
        let n = dense.rows();
        let mat = Mat::from_fn(n, n, |i, j| dense.get(i, j));
        let lu = PartialPivLu::new(mat.as_ref());

        let u = lu.compute_u();
        for k in 0..n {
            let pivot = u.read(k, k);
            if !pivot.is_finite() || pivot.abs() < SINGULAR_PIVOT_TOLERANCE {
                debug!(column = k, pivot, "rejecting near-zero LU pivot");
                return Err(LcaError::SingularMatrix(format!(
                    "no usable pivot for column {k} (faer solver)"
                )));
            }
        }
        Ok((lu, n))
    }
}

impl MatrixSolver for FaerSolver {
    fn id(&self) -> &str {
        "faer"
    }

    fn matrix(&self, rows: usize, columns: usize) -> Matrix {
        Matrix::dense(rows, columns)
    }

    fn solve(&self, a: &Matrix, idx: usize, demand: f64) -> LcaResult<Vec<f64>> {
        check_system(a, idx)?;
        let (lu, n) = Self::factorize(a)?;
        let rhs = Mat::from_fn(n, 1, |i, _| if i == idx { demand } else { 0.0 });
        let sol = lu.solve(&rhs);

        let mut solution = Vec::with_capacity(n);
        for i in 0..n {
            solution.push(sol.read(i, 0));
        }

        // Check for NaN/Inf (indicates singular matrix)
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(LcaError::SingularMatrix(format!(
                "technology matrix ({n}x{n}) has no unique solution (faer solver)"
            )));
        }
        Ok(solution)
    }

    fn invert(&self, a: &Matrix) -> LcaResult<Matrix> {
        if !a.is_square() {
            return Err(LcaError::mismatch("invert", a.rows(), a.columns()));
        }
        let (lu, n) = Self::factorize(a)?;
        let identity = Mat::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 });
        let inverse = lu.solve(&identity);

        for j in 0..n {
            for i in 0..n {
                if !inverse.read(i, j).is_finite() {
                    return Err(LcaError::SingularMatrix(format!(
                        "matrix ({n}x{n}) is not invertible (faer solver)"
                    )));
                }
            }
        }
        Ok(Matrix::Dense(DenseMatrix::from_mat(inverse)))
    }
}

/// Sparse backend: Gaussian elimination with partial pivoting on hashed
/// rows, so fill-in is the only extra memory a solve needs.
///
/// [`MatrixSolver::matrix_with_density`] hands out sparse matrices below
/// the configured density threshold and dense ones above it.
#[derive(Debug, Clone)]
pub struct SparseSolver {
    density_threshold: f64,
}

impl Default for SparseSolver {
    fn default() -> Self {
        Self {
            density_threshold: 0.25,
        }
    }
}

impl SparseSolver {
    pub fn with_density_threshold(density_threshold: f64) -> Self {
        Self { density_threshold }
    }

    pub fn density_threshold(&self) -> f64 {
        self.density_threshold
    }

    /// Forward elimination of `a` applied to every right-hand side, followed
    /// by back substitution. Returns one solution per right-hand side.
    fn eliminate(a: &Matrix, mut rhs: Vec<Vec<f64>>) -> LcaResult<Vec<Vec<f64>>> {
        let n = a.rows();
        let mut rows: Vec<HashMap<usize, f64>> = vec![HashMap::new(); n];
        let mut cols: Vec<HashSet<usize>> = vec![HashSet::new(); n];
        for (i, j, v) in a.nonzeros() {
            *rows[i].entry(j).or_insert(0.0) += v;
            cols[j].insert(i);
        }

        let mut done = vec![false; n];
        let mut pivots = Vec::with_capacity(n);
        let mut fill_in = 0usize;

        for k in 0..n {
            let mut pivot: Option<(usize, f64)> = None;
            for &r in cols[k].iter() {
                if done[r] {
                    continue;
                }
                let v = rows[r].get(&k).copied().unwrap_or(0.0);
                if pivot.map_or(true, |(_, best)| v.abs() > best.abs()) {
                    pivot = Some((r, v));
                }
            }
            let (p, pv) = match pivot {
                Some((p, pv)) if pv.abs() >= SINGULAR_PIVOT_TOLERANCE => (p, pv),
                _ => {
                    return Err(LcaError::SingularMatrix(format!(
                        "no usable pivot for column {k} (sparse solver)"
                    )))
                }
            };
            done[p] = true;
            pivots.push(p);

            let pivot_row: Vec<(usize, f64)> = rows[p]
                .iter()
                .filter(|(&c, _)| c != k)
                .map(|(&c, &v)| (c, v))
                .collect();
            let targets: Vec<usize> = cols[k]
                .iter()
                .copied()
                .filter(|&r| !done[r])
                .collect();

            for r in targets {
                let factor = match rows[r].remove(&k) {
                    Some(v) => v / pv,
                    None => continue,
                };
                cols[k].remove(&r);
                for &(c, v) in &pivot_row {
                    let entry = rows[r].entry(c).or_insert_with(|| {
                        fill_in += 1;
                        0.0
                    });
                    *entry -= factor * v;
                    cols[c].insert(r);
                }
                for b in rhs.iter_mut() {
                    b[r] -= factor * b[p];
                }
            }
        }

        debug!(n, fill_in, "sparse elimination finished");

        let mut solutions = Vec::with_capacity(rhs.len());
        for b in &rhs {
            let mut x = vec![0.0; n];
            for k in (0..n).rev() {
                let p = pivots[k];
                let mut sum = b[p];
                let mut diag = 0.0;
                for (&c, &v) in rows[p].iter() {
                    if c == k {
                        diag = v;
                    } else {
                        sum -= v * x[c];
                    }
                }
                x[k] = sum / diag;
            }
            solutions.push(x);
        }
        Ok(solutions)
    }
}

impl MatrixSolver for SparseSolver {
    fn id(&self) -> &str {
        "sparse"
    }

    fn matrix(&self, rows: usize, columns: usize) -> Matrix {
        Matrix::sparse(rows, columns)
    }

    fn matrix_with_density(&self, rows: usize, columns: usize, density: f64) -> Matrix {
        if density < self.density_threshold {
            Matrix::sparse(rows, columns)
        } else {
            Matrix::dense(rows, columns)
        }
    }

    fn solve(&self, a: &Matrix, idx: usize, demand: f64) -> LcaResult<Vec<f64>> {
        let n = check_system(a, idx)?;
        let mut d = vec![0.0; n];
        d[idx] = demand;
        let mut solutions = Self::eliminate(a, vec![d])?;
        Ok(solutions.pop().unwrap_or_default())
    }

    fn invert(&self, a: &Matrix) -> LcaResult<Matrix> {
        if !a.is_square() {
            return Err(LcaError::mismatch("invert", a.rows(), a.columns()));
        }
        let n = a.rows();
        let units: Vec<Vec<f64>> = (0..n)
            .map(|j| {
                let mut e = vec![0.0; n];
                e[j] = 1.0;
                e
            })
            .collect();
        let columns = Self::eliminate(a, units)?;
        Ok(Matrix::Dense(DenseMatrix::from_fn(n, n, |i, j| columns[j][i])))
    }
}
