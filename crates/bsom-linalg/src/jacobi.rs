// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Jacobi Eigensolver
// ─────────────────────────────────────────────────────────────────────
//! Classic Jacobi eigenvalues for symmetric matrices.
//!
//! Each rotation annihilates the off-diagonal entry of largest magnitude.
//! Row maxima of the strict upper triangle are cached, so locating the
//! pivot costs O(n) instead of O(n²) per rotation.
//!
//! The rotation count is always capped. A capped run returns the current
//! diagonal with `converged == false`; callers decide whether the residual
//! off-diagonal magnitude is acceptable.

use serde::{Deserialize, Serialize};

use bsom_types::{BsomError, BsomResult};

use crate::matrix::Matrix;

/// Eigenvalues plus a report on how the solve ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eigenvalues {
    /// Unordered eigenvalues (diagonal after the last rotation).
    pub values: Vec<f64>,
    /// Rotations performed.
    pub rotations: usize,
    /// Largest off-diagonal magnitude left behind.
    pub off_diagonal: f64,
    /// True when `off_diagonal <= eps` was reached before the cap.
    pub converged: bool,
}

impl Eigenvalues {
    /// Values sorted ascending (NaN-tolerant).
    pub fn sorted(&self) -> Vec<f64> {
        let mut v = self.values.clone();
        v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        v
    }
}

/// Jacobi eigenvalues of the symmetric matrix `a`.
///
/// `a` is symmetrised as `(a + aᵗ)/2` before rotating; it is not modified.
pub fn jacobi_eigenvalues(a: &Matrix, eps: f64, max_rotations: usize) -> BsomResult<Eigenvalues> {
    if !a.is_square() {
        return Err(BsomError::dimension("eigenvalues", a.shape(), (a.cols(), a.rows())));
    }
    let n = a.rows();
    let mut m = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            m[i * n + j] = 0.5 * (a.get(i, j) + a.get(j, i));
        }
    }

    if n < 2 {
        return Ok(Eigenvalues {
            values: m,
            rotations: 0,
            off_diagonal: 0.0,
            converged: true,
        });
    }

    // row_max[p] = argmax_{q > p} |m[p][q]|, for p in 0..n-1
    let mut row_max: Vec<usize> = (0..n - 1).map(|p| scan_row(&m, n, p)).collect();
    let mut rotations = 0;
    let mut converged = false;
    let mut off_diagonal;

    loop {
        let (p, q) = largest_off_diagonal(&m, n, &row_max);
        off_diagonal = m[p * n + q].abs();
        if off_diagonal <= eps {
            converged = true;
            break;
        }
        if rotations >= max_rotations {
            break;
        }

        rotate(&mut m, n, p, q);
        rotations += 1;

        for r in 0..n - 1 {
            if r == p || r == q || row_max[r] == p || row_max[r] == q {
                row_max[r] = scan_row(&m, n, r);
                continue;
            }
            let best = m[r * n + row_max[r]].abs();
            for c in [p, q] {
                if c > r && m[r * n + c].abs() > best {
                    row_max[r] = c;
                }
            }
        }
    }

    if !converged {
        log::warn!(
            "jacobi: rotation cap {max_rotations} reached with off-diagonal {off_diagonal:.3e} > {eps:.3e}"
        );
    }

    Ok(Eigenvalues {
        values: (0..n).map(|i| m[i * n + i]).collect(),
        rotations,
        off_diagonal,
        converged,
    })
}

fn scan_row(m: &[f64], n: usize, p: usize) -> usize {
    let mut best = p + 1;
    for q in (p + 2)..n {
        if m[p * n + q].abs() > m[p * n + best].abs() {
            best = q;
        }
    }
    best
}

fn largest_off_diagonal(m: &[f64], n: usize, row_max: &[usize]) -> (usize, usize) {
    let mut best = (0, row_max[0]);
    for (p, &q) in row_max.iter().enumerate().skip(1) {
        if m[p * n + q].abs() > m[best.0 * n + best.1].abs() {
            best = (p, q);
        }
    }
    best
}

/// Annihilate m[p][q] (p < q) with one Givens rotation, Rutishauser form.
fn rotate(m: &mut [f64], n: usize, p: usize, q: usize) {
    let apq = m[p * n + q];
    let app = m[p * n + p];
    let aqq = m[q * n + q];
    let diff = aqq - app;

    let t = if diff.abs() < 1e-300 {
        if apq > 0.0 {
            1.0
        } else {
            -1.0
        }
    } else {
        let theta = diff / (2.0 * apq);
        // Smaller root
        if theta >= 0.0 {
            1.0 / (theta + (1.0 + theta * theta).sqrt())
        } else {
            -1.0 / (-theta + (1.0 + theta * theta).sqrt())
        }
    };

    let c = 1.0 / (1.0 + t * t).sqrt();
    let s = t * c;
    let tau = s / (1.0 + c);

    m[p * n + p] = app - t * apq;
    m[q * n + q] = aqq + t * apq;
    m[p * n + q] = 0.0;
    m[q * n + p] = 0.0;

    for r in 0..n {
        if r == p || r == q {
            continue;
        }
        let arp = m[r * n + p];
        let arq = m[r * n + q];
        let new_rp = arp - s * (arq + tau * arp);
        let new_rq = arq + s * (arp - tau * arq);
        m[r * n + p] = new_rp;
        m[p * n + r] = new_rp;
        m[r * n + q] = new_rq;
        m[q * n + r] = new_rq;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_diagonal_matrix_needs_no_rotation() {
        let a = Matrix::column_vector(&[3.0, 1.0, 2.0]).diagonal();
        let eig = a.eigenvalues(1e-12, 100).unwrap();
        assert_eq!(eig.values, vec![3.0, 1.0, 2.0]);
        assert_eq!(eig.rotations, 0);
        assert!(eig.converged);
    }

    #[test]
    fn test_two_by_two() {
        let a = Matrix::from_rows(&[vec![2.0, 1.0], vec![1.0, 2.0]]).unwrap();
        let eig = a.eigenvalues(1e-14, 10).unwrap();
        let v = eig.sorted();
        assert_relative_eq!(v[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(v[1], 3.0, epsilon = 1e-12);
        assert_eq!(eig.rotations, 1);
    }

    #[test]
    fn test_symmetric_four_by_four_trace_and_frobenius() {
        let a = Matrix::from_rows(&[
            vec![4.0, 1.0, 0.5, 0.2],
            vec![1.0, 3.0, 0.8, 0.3],
            vec![0.5, 0.8, 2.0, 0.1],
            vec![0.2, 0.3, 0.1, 1.0],
        ])
        .unwrap();
        let eig = a.eigenvalues(1e-13, 1000).unwrap();
        assert!(eig.converged);
        let trace: f64 = (0..4).map(|i| a[(i, i)]).sum();
        assert_relative_eq!(eig.values.iter().sum::<f64>(), trace, epsilon = 1e-10);
        // Frobenius norm is rotation invariant
        let frob: f64 = eig.values.iter().map(|v| v * v).sum();
        assert_relative_eq!(frob, a.sum_squared_entries(), epsilon = 1e-9);
    }

    #[test]
    fn test_second_difference_spectrum() {
        // tridiag(-1, 2, -1): eigenvalues 2 - 2cos(kπ/(n+1))
        let n = 12;
        let mut a = Matrix::new(n, n);
        for i in 0..n {
            a.set(i, i, 2.0);
            if i + 1 < n {
                a.set(i, i + 1, -1.0);
                a.set(i + 1, i, -1.0);
            }
        }
        let eig = a.eigenvalues(1e-13, 10_000).unwrap();
        assert!(eig.converged);
        let got = eig.sorted();
        for (k, v) in got.iter().enumerate() {
            let expected =
                2.0 - 2.0 * ((k + 1) as f64 * std::f64::consts::PI / (n + 1) as f64).cos();
            assert_relative_eq!(*v, expected, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_rotation_cap_is_reduced_precision_not_error() {
        let a = Matrix::from_rows(&[
            vec![4.0, 1.0, 0.5],
            vec![1.0, 3.0, 0.8],
            vec![0.5, 0.8, 2.0],
        ])
        .unwrap();
        let eig = a.eigenvalues(1e-14, 1).unwrap();
        assert!(!eig.converged);
        assert_eq!(eig.rotations, 1);
        assert!(eig.off_diagonal > 1e-14);
        assert_eq!(eig.values.len(), 3);
    }

    #[test]
    fn test_repeatable() {
        let a = Matrix::from_rows(&[
            vec![5.0, -4.0, 1.0],
            vec![-4.0, 6.0, -4.0],
            vec![1.0, -4.0, 5.0],
        ])
        .unwrap();
        let first = a.eigenvalues(1e-12, 500).unwrap();
        let second = a.eigenvalues(1e-12, 500).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_square_rejected() {
        assert!(matches!(
            Matrix::new(2, 3).eigenvalues(1e-12, 10),
            Err(BsomError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_scalar_matrix() {
        let eig = Matrix::column_vector(&[7.0]).eigenvalues(1e-12, 10).unwrap();
        assert_eq!(eig.values, vec![7.0]);
        assert!(eig.converged);
    }
}
