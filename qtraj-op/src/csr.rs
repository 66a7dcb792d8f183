//! Compressed sparse row matrices over complex values
//!
//! This is the storage behind [`crate::SparseOp`]: a plain CSR triple
//! (row pointers, column indices, values) with the algebra the operator
//! layer composes with (sum, difference, product, scalar multiply,
//! Kronecker product) and the matrix-vector kernels the apply paths
//! dispatch to. Column indices are kept sorted within every row; all
//! constructors and combinators preserve that invariant.

use crate::error::{OpError, Result};
use num_complex::Complex64;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// A complex matrix in compressed sparse row form
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    row_ptr: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<Complex64>,
}

impl CsrMatrix {
    /// The empty matrix of the given shape
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_ptr: vec![0; rows + 1],
            col_indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// The n x n identity
    pub fn identity(n: usize) -> Self {
        Self {
            rows: n,
            cols: n,
            row_ptr: (0..=n).collect(),
            col_indices: (0..n).collect(),
            values: vec![Complex64::new(1.0, 0.0); n],
        }
    }

    /// Build from (row, col, value) triplets
    ///
    /// Duplicates are summed; entries that cancel to exactly zero are
    /// dropped.
    ///
    /// # Errors
    /// Returns an error if a triplet is outside the shape.
    pub fn from_triplets(
        rows: usize,
        cols: usize,
        triplets: &[(usize, usize, Complex64)],
    ) -> Result<Self> {
        for &(r, c, _) in triplets {
            if r >= rows || c >= cols {
                return Err(OpError::EntryOutOfBounds {
                    row: r,
                    col: c,
                    rows,
                    cols,
                });
            }
        }

        let mut sorted: Vec<(usize, usize, Complex64)> = triplets.to_vec();
        sorted.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut mat = Self::zeros(rows, cols);
        let mut counts = vec![0usize; rows];
        let mut i = 0;
        while i < sorted.len() {
            let (r, c, mut v) = sorted[i];
            i += 1;
            while i < sorted.len() && sorted[i].0 == r && sorted[i].1 == c {
                v += sorted[i].2;
                i += 1;
            }
            if v != ZERO {
                counts[r] += 1;
                mat.col_indices.push(c);
                mat.values.push(v);
            }
        }
        for r in 0..rows {
            mat.row_ptr[r + 1] = mat.row_ptr[r] + counts[r];
        }
        Ok(mat)
    }

    /// Build from a dense row-major buffer, dropping exact zeros
    ///
    /// # Panics
    /// Panics if the buffer length is not `rows * cols`.
    pub fn from_dense(rows: usize, cols: usize, dense: &[Complex64]) -> Self {
        assert_eq!(dense.len(), rows * cols, "dense buffer length mismatch");
        let mut mat = Self::zeros(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                let v = dense[r * cols + c];
                if v != ZERO {
                    mat.col_indices.push(c);
                    mat.values.push(v);
                }
            }
            mat.row_ptr[r + 1] = mat.values.len();
        }
        mat
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored entries of row `r` as parallel (columns, values) slices
    #[inline]
    pub fn row(&self, r: usize) -> (&[usize], &[Complex64]) {
        let span = self.row_ptr[r]..self.row_ptr[r + 1];
        (&self.col_indices[span.clone()], &self.values[span])
    }

    /// Entry at (r, c), zero when not stored
    pub fn get(&self, r: usize, c: usize) -> Complex64 {
        let (cols, vals) = self.row(r);
        match cols.binary_search(&c) {
            Ok(i) => vals[i],
            Err(_) => ZERO,
        }
    }

    /// Dense row-major copy (for tests and small inspections)
    pub fn to_dense(&self) -> Vec<Complex64> {
        let mut out = vec![ZERO; self.rows * self.cols];
        for r in 0..self.rows {
            let (cols, vals) = self.row(r);
            for (&c, &v) in cols.iter().zip(vals) {
                out[r * self.cols + c] = v;
            }
        }
        out
    }

    /// The dense main diagonal, length `min(rows, cols)`
    pub fn diagonal(&self) -> Vec<Complex64> {
        (0..self.rows.min(self.cols)).map(|i| self.get(i, i)).collect()
    }

    /// Scale every entry in place
    pub fn scale(&mut self, a: Complex64) {
        for v in self.values.iter_mut() {
            *v *= a;
        }
    }

    /// Entrywise combination `self + a * other` over the union sparsity
    /// pattern
    ///
    /// # Errors
    /// Returns an error if the shapes differ.
    pub fn add_scaled(&self, other: &CsrMatrix, a: Complex64) -> Result<CsrMatrix> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(OpError::MatrixShape {
                a_rows: self.rows,
                a_cols: self.cols,
                b_rows: other.rows,
                b_cols: other.cols,
            });
        }

        let mut out = Self::zeros(self.rows, self.cols);
        for r in 0..self.rows {
            let (lc, lv) = self.row(r);
            let (rc, rv) = other.row(r);
            let (mut i, mut j) = (0, 0);
            while i < lc.len() || j < rc.len() {
                let (c, v) = if j >= rc.len() || (i < lc.len() && lc[i] < rc[j]) {
                    let e = (lc[i], lv[i]);
                    i += 1;
                    e
                } else if i >= lc.len() || rc[j] < lc[i] {
                    let e = (rc[j], a * rv[j]);
                    j += 1;
                    e
                } else {
                    let e = (lc[i], lv[i] + a * rv[j]);
                    i += 1;
                    j += 1;
                    e
                };
                if v != ZERO {
                    out.col_indices.push(c);
                    out.values.push(v);
                }
            }
            out.row_ptr[r + 1] = out.values.len();
        }
        Ok(out)
    }

    /// Matrix product `self * other`
    ///
    /// Row-by-row expansion with a dense accumulator per row.
    ///
    /// # Errors
    /// Returns an error if the inner dimensions differ.
    pub fn matmul(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        if self.cols != other.rows {
            return Err(OpError::MatrixShape {
                a_rows: self.rows,
                a_cols: self.cols,
                b_rows: other.rows,
                b_cols: other.cols,
            });
        }

        let mut out = Self::zeros(self.rows, other.cols);
        let mut acc = vec![ZERO; other.cols];
        let mut touched: Vec<usize> = Vec::new();

        for r in 0..self.rows {
            let (ac, av) = self.row(r);
            for (&k, &v) in ac.iter().zip(av) {
                let (bc, bv) = other.row(k);
                for (&c, &w) in bc.iter().zip(bv) {
                    if acc[c] == ZERO {
                        touched.push(c);
                    }
                    acc[c] += v * w;
                }
            }
            touched.sort_unstable();
            for &c in &touched {
                if acc[c] != ZERO {
                    out.col_indices.push(c);
                    out.values.push(acc[c]);
                }
                acc[c] = ZERO;
            }
            touched.clear();
            out.row_ptr[r + 1] = out.values.len();
        }
        Ok(out)
    }

    /// Kronecker product `self ⊗ other`
    pub fn kron(&self, other: &CsrMatrix) -> CsrMatrix {
        let rows = self.rows * other.rows;
        let cols = self.cols * other.cols;
        let mut out = Self::zeros(rows, cols);
        out.col_indices.reserve(self.nnz() * other.nnz());
        out.values.reserve(self.nnz() * other.nnz());

        for ra in 0..self.rows {
            let (ac, av) = self.row(ra);
            for rb in 0..other.rows {
                let (bc, bv) = other.row(rb);
                for (&ca, &va) in ac.iter().zip(av) {
                    for (&cb, &vb) in bc.iter().zip(bv) {
                        out.col_indices.push(ca * other.cols + cb);
                        out.values.push(va * vb);
                    }
                }
                out.row_ptr[ra * other.rows + rb + 1] = out.values.len();
            }
        }
        out
    }

    /// `y = A x`
    ///
    /// # Panics
    /// Panics if the vector lengths do not match the shape.
    pub fn spmv(&self, y: &mut [Complex64], x: &[Complex64]) {
        assert_eq!(x.len(), self.cols, "spmv input length mismatch");
        assert_eq!(y.len(), self.rows, "spmv output length mismatch");
        for r in 0..self.rows {
            let (cols, vals) = self.row(r);
            y[r] = cols.iter().zip(vals).map(|(&c, &v)| v * x[c]).sum();
        }
    }

    /// `y += a A x`
    pub fn axpy_spmv(&self, y: &mut [Complex64], a: Complex64, x: &[Complex64]) {
        assert_eq!(x.len(), self.cols, "spmv input length mismatch");
        assert_eq!(y.len(), self.rows, "spmv output length mismatch");
        for r in 0..self.rows {
            let (cols, vals) = self.row(r);
            let dot: Complex64 = cols.iter().zip(vals).map(|(&c, &v)| v * x[c]).sum();
            y[r] += a * dot;
        }
    }

    /// `y = a A x + b y`
    pub fn axpby_spmv(&self, y: &mut [Complex64], a: Complex64, x: &[Complex64], b: Complex64) {
        assert_eq!(x.len(), self.cols, "spmv input length mismatch");
        assert_eq!(y.len(), self.rows, "spmv output length mismatch");
        for r in 0..self.rows {
            let (cols, vals) = self.row(r);
            let dot: Complex64 = cols.iter().zip(vals).map(|(&c, &v)| v * x[c]).sum();
            y[r] = a * dot + b * y[r];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn pauli_x() -> CsrMatrix {
        CsrMatrix::from_dense(2, 2, &[ZERO, c(1.0, 0.0), c(1.0, 0.0), ZERO])
    }

    fn pauli_z() -> CsrMatrix {
        CsrMatrix::from_dense(2, 2, &[c(1.0, 0.0), ZERO, ZERO, c(-1.0, 0.0)])
    }

    #[test]
    fn test_identity_and_zeros() {
        let id = CsrMatrix::identity(3);
        assert_eq!(id.nnz(), 3);
        assert_eq!(id.get(1, 1), c(1.0, 0.0));
        assert_eq!(id.get(0, 1), ZERO);

        let z = CsrMatrix::zeros(2, 4);
        assert_eq!(z.nnz(), 0);
        assert_eq!(z.rows(), 2);
        assert_eq!(z.cols(), 4);
    }

    #[test]
    fn test_from_triplets_sums_duplicates() {
        let m = CsrMatrix::from_triplets(
            2,
            2,
            &[
                (0, 1, c(1.0, 0.0)),
                (0, 1, c(2.0, 0.0)),
                (1, 0, c(1.0, 0.0)),
                (1, 0, c(-1.0, 0.0)),
            ],
        )
        .unwrap();
        assert_eq!(m.get(0, 1), c(3.0, 0.0));
        // Cancelled entry is dropped entirely
        assert_eq!(m.nnz(), 1);
    }

    #[test]
    fn test_from_triplets_bounds() {
        assert!(CsrMatrix::from_triplets(2, 2, &[(2, 0, c(1.0, 0.0))]).is_err());
    }

    #[test]
    fn test_add_scaled() {
        let x = pauli_x();
        let z = pauli_z();
        let s = x.add_scaled(&z, c(2.0, 0.0)).unwrap();
        assert_eq!(s.get(0, 0), c(2.0, 0.0));
        assert_eq!(s.get(0, 1), c(1.0, 0.0));
        assert_eq!(s.get(1, 1), c(-2.0, 0.0));

        // x - x cancels to the empty matrix
        let d = x.add_scaled(&x, c(-1.0, 0.0)).unwrap();
        assert_eq!(d.nnz(), 0);
    }

    #[test]
    fn test_matmul_matches_dense() {
        let x = pauli_x();
        let z = pauli_z();

        // XZ = [[0, -1], [1, 0]]
        let xz = x.matmul(&z).unwrap();
        assert_eq!(
            xz.to_dense(),
            vec![ZERO, c(-1.0, 0.0), c(1.0, 0.0), ZERO]
        );

        // X² = I
        let xx = x.matmul(&x).unwrap();
        assert_eq!(xx.to_dense(), CsrMatrix::identity(2).to_dense());
    }

    #[test]
    fn test_matmul_shape_check() {
        let x = pauli_x();
        let wide = CsrMatrix::zeros(3, 2);
        assert!(x.matmul(&wide).is_err());
    }

    #[test]
    fn test_kron_block_structure() {
        let x = pauli_x();
        let id = CsrMatrix::identity(2);

        // X ⊗ I: swaps the two 2-blocks
        let m = x.kron(&id);
        assert_eq!(m.rows(), 4);
        assert_eq!(m.get(0, 2), c(1.0, 0.0));
        assert_eq!(m.get(1, 3), c(1.0, 0.0));
        assert_eq!(m.get(2, 0), c(1.0, 0.0));
        assert_eq!(m.get(0, 1), ZERO);

        // I ⊗ X: swaps within each block
        let m = id.kron(&x);
        assert_eq!(m.get(0, 1), c(1.0, 0.0));
        assert_eq!(m.get(2, 3), c(1.0, 0.0));
        assert_eq!(m.get(0, 2), ZERO);
    }

    #[test]
    fn test_kron_associative() {
        let x = pauli_x();
        let z = pauli_z();
        let y = CsrMatrix::from_dense(2, 2, &[ZERO, c(0.0, -1.0), c(0.0, 1.0), ZERO]);

        let left = x.kron(&y).kron(&z);
        let right = x.kron(&y.kron(&z));
        assert_eq!(left.to_dense(), right.to_dense());
    }

    #[test]
    fn test_spmv_family() {
        let x = pauli_x();
        let v = [c(1.0, 0.0), c(0.0, 2.0)];

        let mut y = [ZERO; 2];
        x.spmv(&mut y, &v);
        assert_eq!(y, [c(0.0, 2.0), c(1.0, 0.0)]);

        x.axpy_spmv(&mut y, c(1.0, 0.0), &v);
        assert_eq!(y, [c(0.0, 4.0), c(2.0, 0.0)]);

        x.axpby_spmv(&mut y, c(1.0, 0.0), &v, c(0.5, 0.0));
        assert_eq!(y, [c(0.0, 4.0), c(2.0, 0.0)]);
    }

    #[test]
    fn test_diagonal() {
        let z = pauli_z();
        assert_eq!(z.diagonal(), vec![c(1.0, 0.0), c(-1.0, 0.0)]);
        let x = pauli_x();
        assert_eq!(x.diagonal(), vec![ZERO, ZERO]);
    }

    #[test]
    fn test_scale() {
        let mut x = pauli_x();
        x.scale(c(0.0, 2.0));
        assert_eq!(x.get(0, 1), c(0.0, 2.0));
    }
}
