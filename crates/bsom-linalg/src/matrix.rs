// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Matrix
// ─────────────────────────────────────────────────────────────────────
//! Dense row-major matrix with the primitives the EM step needs.
//!
//! Shape is fixed at construction. Operations that combine two operands
//! check shapes and fail with `BsomError::DimensionMismatch`.

use std::ops::Index;

use serde::{Deserialize, Serialize};

use bsom_types::{BsomError, BsomResult};

use crate::banded::BandedSystem;
use crate::jacobi::{jacobi_eigenvalues, Eigenvalues};

/// Dense `rows × cols` matrix, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Zero-filled `rows × cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap a row-major buffer. `data.len()` must equal `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> BsomResult<Self> {
        if data.len() != rows * cols {
            return Err(BsomError::dimension("from_vec", (rows, cols), (data.len(), 1)));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from equally long rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> BsomResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(BsomError::dimension("from_rows", (rows.len(), cols), (1, row.len())));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Build an `n × k` matrix from k equally long columns.
    pub fn from_columns(columns: &[&[f64]]) -> BsomResult<Self> {
        let rows = columns.first().map_or(0, |c| c.len());
        let cols = columns.len();
        let mut m = Self::new(rows, cols);
        for (j, column) in columns.iter().enumerate() {
            if column.len() != rows {
                return Err(BsomError::dimension(
                    "from_columns",
                    (rows, cols),
                    (column.len(), 1),
                ));
            }
            for (i, &v) in column.iter().enumerate() {
                m.data[i * cols + j] = v;
            }
        }
        Ok(m)
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// `n × 1` matrix.
    pub fn column_vector(values: &[f64]) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    /// `1 × n` matrix.
    pub fn row_vector(values: &[f64]) -> Self {
        Self {
            rows: 1,
            cols: values.len(),
            data: values.to_vec(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn set_row(&mut self, row: usize, values: &[f64]) -> BsomResult<()> {
        if values.len() != self.cols {
            return Err(BsomError::dimension("set_row", self.shape(), (1, values.len())));
        }
        self.data[row * self.cols..(row + 1) * self.cols].copy_from_slice(values);
        Ok(())
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.get(i, col)).collect()
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    fn require_same_shape(&self, other: &Matrix, op: &'static str) -> BsomResult<()> {
        if self.shape() != other.shape() {
            return Err(BsomError::dimension(op, self.shape(), other.shape()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structural
    // ------------------------------------------------------------------

    pub fn transpose(&self) -> Matrix {
        let mut t = Matrix::new(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                t.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        t
    }

    /// Diagonal extraction or construction, depending on shape.
    ///
    /// A row or column vector becomes the square matrix with those values on
    /// its diagonal. Any other matrix yields its main diagonal as a column
    /// vector of length `min(rows, cols)`.
    pub fn diagonal(&self) -> Matrix {
        if self.rows == 1 || self.cols == 1 {
            let n = self.data.len();
            let mut d = Matrix::new(n, n);
            for (i, &v) in self.data.iter().enumerate() {
                d.data[i * n + i] = v;
            }
            d
        } else {
            let n = self.rows.min(self.cols);
            let values: Vec<f64> = (0..n).map(|i| self.get(i, i)).collect();
            Matrix::column_vector(&values)
        }
    }

    // ------------------------------------------------------------------
    // Linear combinations
    // ------------------------------------------------------------------

    /// `a·self + b·y` as a new matrix.
    pub fn linear_conv(&self, a: f64, b: f64, y: &Matrix) -> BsomResult<Matrix> {
        self.require_same_shape(y, "linear_conv")?;
        let data = self
            .data
            .iter()
            .zip(&y.data)
            .map(|(&x, &yv)| a * x + b * yv)
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// In-place `self ← a·self + b·y`.
    pub fn update_linear_conv(&mut self, a: f64, b: f64, y: &Matrix) -> BsomResult<()> {
        self.require_same_shape(y, "update_linear_conv")?;
        for (x, &yv) in self.data.iter_mut().zip(&y.data) {
            *x = a * *x + b * yv;
        }
        Ok(())
    }

    pub fn scaled(&self, k: f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| k * v).collect(),
        }
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    /// Standard matrix product `self · y`.
    pub fn product(&self, y: &Matrix) -> BsomResult<Matrix> {
        if self.cols != y.rows {
            return Err(BsomError::dimension("product", self.shape(), y.shape()));
        }
        let mut out = Matrix::new(self.rows, y.cols);
        for i in 0..self.rows {
            let out_row = &mut out.data[i * y.cols..(i + 1) * y.cols];
            for k in 0..self.cols {
                let aik = self.data[i * self.cols + k];
                if aik == 0.0 {
                    continue;
                }
                let y_row = &y.data[k * y.cols..(k + 1) * y.cols];
                for (o, &ykj) in out_row.iter_mut().zip(y_row) {
                    *o += aik * ykj;
                }
            }
        }
        Ok(out)
    }

    pub fn elementwise_product(&self, y: &Matrix) -> BsomResult<Matrix> {
        self.require_same_shape(y, "elementwise_product")?;
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&y.data).map(|(a, b)| a * b).collect(),
        })
    }

    /// Solve `self · Z = y` for Z by elimination inside `half_bandwidth`.
    ///
    /// Entries of `self` farther than `half_bandwidth` from the diagonal are
    /// ignored. Fails with `SingularSystem` on a pivot below
    /// [`SINGULAR_PIVOT`](crate::banded::SINGULAR_PIVOT).
    pub fn divide(&self, y: &Matrix, half_bandwidth: usize) -> BsomResult<Matrix> {
        BandedSystem::from_dense(self, half_bandwidth)?.solve(y)
    }

    /// Pairwise squared Euclidean distances between the rows of `self`
    /// and the rows of `y`: a `self.rows × y.rows` matrix.
    pub fn cross_sq_distance(&self, y: &Matrix) -> BsomResult<Matrix> {
        if self.cols != y.cols {
            return Err(BsomError::dimension("cross_sq_distance", self.shape(), y.shape()));
        }
        let mut out = Matrix::new(self.rows, y.rows);
        for i in 0..self.rows {
            let a = self.row(i);
            for j in 0..y.rows {
                let b = y.row(j);
                out.data[i * y.rows + j] = a
                    .iter()
                    .zip(b)
                    .map(|(p, q)| (p - q) * (p - q))
                    .sum();
            }
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Element-wise and reductions
    // ------------------------------------------------------------------

    /// In-place element-wise exponential.
    pub fn exp_in_place(&mut self) {
        for v in self.data.iter_mut() {
            *v = v.exp();
        }
    }

    /// Column sums as a `1 × cols` row vector.
    pub fn vertical_sum(&self) -> Matrix {
        let mut out = Matrix::new(1, self.cols);
        for i in 0..self.rows {
            for (o, &v) in out.data.iter_mut().zip(self.row(i)) {
                *o += v;
            }
        }
        out
    }

    /// Row sums as a `rows × 1` column vector.
    pub fn horizontal_sum(&self) -> Matrix {
        let data = (0..self.rows).map(|i| self.row(i).iter().sum()).collect();
        Matrix {
            rows: self.rows,
            cols: 1,
            data,
        }
    }

    pub fn sum_entries(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn sum_squared_entries(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum()
    }

    /// Largest entry, or `None` for an empty matrix.
    pub fn max_entry(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::max)
    }

    /// Divide column j by `v[j]`; `v` must be `1 × cols`.
    pub fn divide_by_row_vector(&self, v: &Matrix) -> BsomResult<Matrix> {
        if v.rows != 1 || v.cols != self.cols {
            return Err(BsomError::dimension("divide_by_row_vector", self.shape(), v.shape()));
        }
        let mut out = self.clone();
        for i in 0..self.rows {
            let row = &mut out.data[i * self.cols..(i + 1) * self.cols];
            for (x, &d) in row.iter_mut().zip(&v.data) {
                *x /= d;
            }
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Spectrum
    // ------------------------------------------------------------------

    /// Eigenvalues of a symmetric matrix by largest-element Jacobi rotation.
    ///
    /// Stops when the largest off-diagonal magnitude is `<= eps` or after
    /// `max_rotations` rotations. Hitting the cap is reported through
    /// `Eigenvalues::converged`, not as an error.
    pub fn eigenvalues(&self, eps: f64, max_rotations: usize) -> BsomResult<Eigenvalues> {
        jacobi_eigenvalues(self, eps, max_rotations)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.cols + col]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn sample() -> Matrix {
        Matrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap()
    }

    #[test]
    fn test_new_zero_filled() {
        let m = Matrix::new(3, 4);
        assert_eq!(m.shape(), (3, 4));
        assert!(m.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_from_vec_length_checked() {
        assert!(matches!(
            Matrix::from_vec(2, 2, vec![1.0; 3]),
            Err(BsomError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_transpose_round_trip() {
        let m = sample();
        let t = m.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t[(2, 1)], 6.0);
        assert_eq!(t.transpose(), m);

        let col = Matrix::column_vector(&[1.0, -2.0, 3.5]);
        assert_eq!(col.transpose().transpose(), col);
    }

    #[test]
    fn test_linear_conv_identity_laws() {
        let x = sample();
        let y = x.scaled(-3.0);
        assert_eq!(x.linear_conv(1.0, 0.0, &y).unwrap(), x);

        let mut z = x.clone();
        z.update_linear_conv(0.0, 1.0, &y).unwrap();
        assert_eq!(z, y);
    }

    #[test]
    fn test_linear_conv_shape_mismatch() {
        let x = sample();
        let y = Matrix::new(3, 2);
        assert!(matches!(
            x.linear_conv(1.0, 1.0, &y),
            Err(BsomError::DimensionMismatch {
                op: "linear_conv",
                ..
            })
        ));
        let mut z = x.clone();
        assert!(z.update_linear_conv(1.0, 1.0, &y).is_err());
        assert_eq!(z, x, "failed in-place update must not touch the receiver");
    }

    #[test]
    fn test_product() {
        let a = sample();
        let b = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let p = a.product(&b).unwrap();
        assert_eq!(p, Matrix::from_rows(&[vec![4.0, 5.0], vec![10.0, 11.0]]).unwrap());
        assert!(matches!(
            a.product(&a),
            Err(BsomError::DimensionMismatch { op: "product", .. })
        ));
    }

    #[test]
    fn test_product_identity() {
        let a = sample();
        assert_eq!(a.product(&Matrix::identity(3)).unwrap(), a);
        assert_eq!(Matrix::identity(2).product(&a).unwrap(), a);
    }

    #[test]
    fn test_cross_sq_distance() {
        let w = Matrix::from_rows(&[vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
        let x = Matrix::from_rows(&[vec![3.0, 4.0], vec![1.0, 0.0], vec![0.0, 0.0]]).unwrap();
        let d = w.cross_sq_distance(&x).unwrap();
        assert_eq!(d.shape(), (2, 3));
        assert_eq!(d.row(0), &[25.0, 1.0, 0.0]);
        assert_eq!(d.row(1), &[13.0, 1.0, 2.0]);
        assert!(w.cross_sq_distance(&sample()).is_err());
    }

    #[test]
    fn test_sums() {
        let m = sample();
        assert_eq!(m.vertical_sum(), Matrix::row_vector(&[5.0, 7.0, 9.0]));
        assert_eq!(m.horizontal_sum(), Matrix::column_vector(&[6.0, 15.0]));
        assert_eq!(m.sum_entries(), 21.0);
        assert_eq!(m.sum_squared_entries(), 91.0);
        assert_eq!(m.max_entry(), Some(6.0));
        assert_eq!(Matrix::new(0, 0).max_entry(), None);
    }

    #[test]
    fn test_exp_in_place() {
        let mut m = Matrix::row_vector(&[0.0, 1.0, -1000.0]);
        m.exp_in_place();
        assert_eq!(m[(0, 0)], 1.0);
        assert_relative_eq!(m[(0, 1)], std::f64::consts::E, epsilon = 1e-15);
        assert_eq!(m[(0, 2)], 0.0);
    }

    #[test]
    fn test_divide_by_row_vector() {
        let m = sample();
        let d = m
            .divide_by_row_vector(&Matrix::row_vector(&[1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(d, Matrix::from_rows(&[vec![1.0, 1.0, 1.0], vec![4.0, 2.5, 2.0]]).unwrap());
        assert!(m
            .divide_by_row_vector(&Matrix::column_vector(&[1.0, 2.0, 3.0]))
            .is_err());
    }

    #[test]
    fn test_diagonal_extract_and_build() {
        let v = Matrix::column_vector(&[1.0, 2.0, 3.0]);
        let d = v.diagonal();
        assert_eq!(d.shape(), (3, 3));
        assert_eq!(d[(1, 1)], 2.0);
        assert_eq!(d[(0, 1)], 0.0);
        assert_eq!(d.diagonal(), v);

        let rect = sample().diagonal();
        assert_eq!(rect, Matrix::column_vector(&[1.0, 5.0]));
    }

    #[test]
    fn test_elementwise_product() {
        let m = sample();
        let sq = m.elementwise_product(&m).unwrap();
        assert_eq!(sq.sum_entries(), m.sum_squared_entries());
        assert!(m.elementwise_product(&m.transpose()).is_err());
    }

    #[test]
    fn test_set_row_checked() {
        let mut m = Matrix::new(2, 2);
        m.set_row(1, &[3.0, 4.0]).unwrap();
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert!(m.set_row(0, &[1.0]).is_err());
    }

    #[test]
    fn test_from_columns() {
        let xs = [1.0, 2.0];
        let ys = [3.0, 4.0];
        let m = Matrix::from_columns(&[&xs, &ys]).unwrap();
        assert_eq!(m.row(0), &[1.0, 3.0]);
        assert_eq!(m.column(1), vec![3.0, 4.0]);
        assert!(Matrix::from_columns(&[&xs, &[1.0]]).is_err());
    }
}
