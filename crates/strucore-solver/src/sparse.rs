//! Sparse matrix utilities shared by the assembler and the solvers.
//!
//! Global operators are accumulated in COO form (duplicate entries sum on
//! conversion) and stored as CSR. Direct solves go through the sparse
//! Cholesky factorization in `nalgebra-sparse`; the helpers here cover the
//! small pieces that the solvers need on top of that: matrix-vector products,
//! scaled sums, diagonal extraction, and a dense view for the eigen solvers.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};

use crate::error::{Result, SolverError};

/// Incremental COO builder for square sparse matrices.
pub struct SparseBuilder {
    size: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl SparseBuilder {
    /// Create a builder for an `size` × `size` matrix.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            rows: Vec::new(),
            cols: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Accumulate a value; duplicate (row, col) entries sum on build.
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if value != 0.0 {
            self.rows.push(row);
            self.cols.push(col);
            self.values.push(value);
        }
    }

    /// Number of accumulated entries (pre-dedup).
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Build the CSR matrix, summing duplicates.
    pub fn build(self) -> Result<CsrMatrix<f64>> {
        let coo = CooMatrix::try_from_triplets(self.size, self.size, self.rows, self.cols, self.values)
            .map_err(|e| SolverError::AssemblyFailed(format!("triplet assembly: {e}")))?;
        Ok(CsrMatrix::from(&coo))
    }
}

/// Sparse matrix-vector product y = A·x.
pub fn spmv(a: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let mut y = DVector::zeros(a.nrows());
    for (row_idx, row) in a.row_iter().enumerate() {
        let mut acc = 0.0;
        for (&col, &val) in row.col_indices().iter().zip(row.values()) {
            acc += val * x[col];
        }
        y[row_idx] = acc;
    }
    y
}

/// Linear combination Σ cᵢ·Aᵢ of equally sized square CSR matrices.
pub fn linear_combination(terms: &[(f64, &CsrMatrix<f64>)]) -> Result<CsrMatrix<f64>> {
    let size = terms
        .first()
        .map(|(_, a)| a.nrows())
        .ok_or_else(|| SolverError::AssemblyFailed("empty linear combination".into()))?;
    let mut builder = SparseBuilder::new(size);
    for (coeff, matrix) in terms {
        for (i, j, v) in matrix.triplet_iter() {
            builder.add(i, j, coeff * v);
        }
    }
    builder.build()
}

/// Add a diagonal vector to a CSR matrix.
pub fn add_diagonal(a: &CsrMatrix<f64>, diag: &DVector<f64>) -> Result<CsrMatrix<f64>> {
    let mut builder = SparseBuilder::new(a.nrows());
    for (i, j, v) in a.triplet_iter() {
        builder.add(i, j, *v);
    }
    for (i, v) in diag.iter().enumerate() {
        builder.add(i, i, *v);
    }
    builder.build()
}

/// Extract the diagonal of a CSR matrix.
pub fn diagonal(a: &CsrMatrix<f64>) -> DVector<f64> {
    let mut diag = DVector::zeros(a.nrows());
    for (i, j, v) in a.triplet_iter() {
        if i == j {
            diag[i] += v;
        }
    }
    diag
}

/// Densify a CSR matrix (used by the eigen solvers, which reduce to dense
/// symmetric problems).
pub fn to_dense(a: &CsrMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(a.nrows(), a.ncols());
    for (i, j, v) in a.triplet_iter() {
        dense[(i, j)] += v;
    }
    dense
}

/// Sparse symmetric positive definite direct factorization.
pub struct SparseFactor {
    cholesky: CscCholesky<f64>,
}

impl SparseFactor {
    /// Factor a symmetric positive definite matrix.
    ///
    /// Fails with `linear_solve_failed: singular` when the matrix is
    /// singular or indefinite.
    pub fn factor(a: &CsrMatrix<f64>) -> Result<Self> {
        let csc = CscMatrix::from(a);
        let cholesky = CscCholesky::factor(&csc)
            .map_err(|_| SolverError::LinearSolveFailed("singular".into()))?;
        Ok(Self { cholesky })
    }

    /// Solve A·x = b for a single right-hand side.
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let rhs = DMatrix::from_column_slice(b.len(), 1, b.as_slice());
        let x = self.cholesky.solve(&rhs);
        DVector::from_iterator(b.len(), x.column(0).iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn builder_sums_duplicate_entries() {
        let mut builder = SparseBuilder::new(2);
        builder.add(0, 0, 1.0);
        builder.add(0, 0, 2.5);
        builder.add(1, 1, 1.0);
        let a = builder.build().unwrap();
        let dense = to_dense(&a);
        assert_relative_eq!(dense[(0, 0)], 3.5);
        assert_relative_eq!(dense[(1, 1)], 1.0);
        assert_relative_eq!(dense[(0, 1)], 0.0);
    }

    #[test]
    fn spmv_matches_dense_product() {
        let mut builder = SparseBuilder::new(3);
        builder.add(0, 0, 2.0);
        builder.add(0, 2, -1.0);
        builder.add(1, 1, 3.0);
        builder.add(2, 0, -1.0);
        builder.add(2, 2, 4.0);
        let a = builder.build().unwrap();

        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let y = spmv(&a, &x);
        let y_dense = to_dense(&a) * &x;
        assert_relative_eq!((y - y_dense).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn linear_combination_scales_and_sums() {
        let mut b1 = SparseBuilder::new(2);
        b1.add(0, 0, 1.0);
        b1.add(1, 1, 1.0);
        let a = b1.build().unwrap();

        let mut b2 = SparseBuilder::new(2);
        b2.add(0, 1, 1.0);
        b2.add(1, 0, 1.0);
        let b = b2.build().unwrap();

        let c = linear_combination(&[(2.0, &a), (3.0, &b)]).unwrap();
        let dense = to_dense(&c);
        assert_relative_eq!(dense[(0, 0)], 2.0);
        assert_relative_eq!(dense[(0, 1)], 3.0);
        assert_relative_eq!(dense[(1, 0)], 3.0);
    }

    #[test]
    fn cholesky_solves_spd_system() {
        // [[4, 1], [1, 3]] x = [1, 2]
        let mut builder = SparseBuilder::new(2);
        builder.add(0, 0, 4.0);
        builder.add(0, 1, 1.0);
        builder.add(1, 0, 1.0);
        builder.add(1, 1, 3.0);
        let a = builder.build().unwrap();

        let factor = SparseFactor::factor(&a).unwrap();
        let x = factor.solve(&DVector::from_vec(vec![1.0, 2.0]));
        assert_relative_eq!(x[0], 1.0 / 11.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 7.0 / 11.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let mut builder = SparseBuilder::new(2);
        builder.add(0, 0, 1.0);
        builder.add(0, 1, 1.0);
        builder.add(1, 0, 1.0);
        builder.add(1, 1, 1.0);
        let a = builder.build().unwrap();

        let result = SparseFactor::factor(&a);
        assert!(matches!(result, Err(SolverError::LinearSolveFailed(_))));
    }

    #[test]
    fn diagonal_extraction() {
        let mut builder = SparseBuilder::new(3);
        builder.add(0, 0, 5.0);
        builder.add(1, 2, 7.0);
        builder.add(2, 2, -2.0);
        let a = builder.build().unwrap();
        let d = diagonal(&a);
        assert_eq!(d.as_slice(), &[5.0, 0.0, -2.0]);
    }
}
