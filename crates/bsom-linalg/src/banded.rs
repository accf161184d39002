// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Banded Solver
// ─────────────────────────────────────────────────────────────────────
//! Gaussian elimination restricted to a known half-bandwidth.
//!
//! The M-step system `(α/β·M + N)` is pentadiagonal (half-bandwidth 2)
//! and symmetric positive definite whenever it is solvable, so elimination
//! proceeds without pivoting and produces no fill-in outside the band.
//! Cost: O(n·k²) for the factorisation plus O(n·k) per right-hand side.

use bsom_types::{BsomError, BsomResult};

use crate::matrix::Matrix;

/// Pivots with magnitude below this are treated as singular.
pub const SINGULAR_PIVOT: f64 = 1e-8;

/// Square system stored as its band: `band[i][j - i + k]` for `|i - j| <= k`.
#[derive(Debug, Clone)]
pub struct BandedSystem {
    n: usize,
    k: usize,
    band: Vec<f64>,
}

impl BandedSystem {
    /// Copy the band of a dense square matrix. Out-of-band entries are dropped.
    pub fn from_dense(a: &Matrix, half_bandwidth: usize) -> BsomResult<Self> {
        if !a.is_square() {
            return Err(BsomError::dimension("banded", a.shape(), (a.cols(), a.rows())));
        }
        let n = a.rows();
        let k = half_bandwidth.min(n.saturating_sub(1));
        let width = 2 * k + 1;
        let mut band = vec![0.0; n * width];
        for i in 0..n {
            let lo = i.saturating_sub(k);
            let hi = (i + k).min(n - 1);
            for j in lo..=hi {
                band[i * width + (j + k - i)] = a.get(i, j);
            }
        }
        Ok(Self { n, k, band })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn half_bandwidth(&self) -> usize {
        self.k
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> f64 {
        self.band[i * (2 * self.k + 1) + (j + self.k - i)]
    }

    #[inline]
    fn at_mut(&mut self, i: usize, j: usize) -> &mut f64 {
        let width = 2 * self.k + 1;
        &mut self.band[i * width + (j + self.k - i)]
    }

    /// Solve `A · Z = rhs` for every column of `rhs`.
    ///
    /// The system is factored on a scratch copy, so `self` can be reused.
    pub fn solve(&self, rhs: &Matrix) -> BsomResult<Matrix> {
        if rhs.rows() != self.n {
            return Err(BsomError::dimension("divide", (self.n, self.n), rhs.shape()));
        }
        let n = self.n;
        let k = self.k;
        let m = rhs.cols();
        let mut lu = self.clone();
        let mut x = rhs.clone();

        // Forward elimination
        for col in 0..n {
            let pivot = lu.at(col, col);
            // NaN pivots fail here too
            if !(pivot.abs() >= SINGULAR_PIVOT) {
                return Err(BsomError::SingularSystem { row: col, pivot });
            }
            let last = (col + k).min(n - 1);
            for row in (col + 1)..=last {
                let factor = lu.at(row, col) / pivot;
                if factor == 0.0 {
                    continue;
                }
                for j in col..=last {
                    let v = lu.at(col, j);
                    *lu.at_mut(row, j) -= factor * v;
                }
                for c in 0..m {
                    let v = x.get(col, c);
                    x.set(row, c, x.get(row, c) - factor * v);
                }
            }
        }

        // Back substitution
        for row in (0..n).rev() {
            let last = (row + k).min(n - 1);
            let diag = lu.at(row, row);
            for c in 0..m {
                let mut s = x.get(row, c);
                for j in (row + 1)..=last {
                    s -= lu.at(row, j) * x.get(j, c);
                }
                x.set(row, c, s / diag);
            }
        }

        Ok(x)
    }
}
