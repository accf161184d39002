// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Prior Model
// ─────────────────────────────────────────────────────────────────────
//! Second-difference smoothness prior over a chain of r centroids.
//!
//!   D  ((r−2)×r):  row i = [… 1 −2 1 …] at columns i, i+1, i+2
//!   M  = DᵗD      (r×r, pentadiagonal, rank r−2)
//!
//! The spectrum of M feeds the evidence updates. M cannot see a constant
//! offset or a linear drift along the chain, so exactly two eigenvalues are
//! structurally null; they are forced to 0 after the Jacobi solve.

use bsom_linalg::{Eigenvalues, Matrix};
use bsom_types::{BsomError, BsomResult, LearnerConfig};

/// Half-bandwidth of M, used by the M-step banded solve.
pub const HALF_BANDWIDTH: usize = 2;

/// Fixed penalty operator and its eigen-spectrum for a given r.
#[derive(Debug, Clone)]
pub struct PriorModel {
    d: Matrix,
    m: Matrix,
    report: Eigenvalues,
    eigenvalues: Vec<f64>,
}

impl PriorModel {
    /// Build D, M = DᵗD and the nulled spectrum of M.
    pub fn new(units: usize, eps: f64, max_rotations: usize) -> BsomResult<Self> {
        if units < 3 {
            return Err(BsomError::InvalidUnitCount {
                units,
                min: 3,
                max: usize::MAX,
            });
        }
        let d = difference_operator(units);
        let m = d.transpose().product(&d)?;
        let report = m.eigenvalues(eps, max_rotations)?;
        let mut eigenvalues = report.values.clone();
        null_structural_modes(&mut eigenvalues);

        Ok(Self {
            d,
            m,
            report,
            eigenvalues,
        })
    }

    pub fn from_config(units: usize, config: &LearnerConfig) -> BsomResult<Self> {
        Self::new(units, config.eigen_tolerance, config.eigen_max_rotations)
    }

    pub fn units(&self) -> usize {
        self.m.rows()
    }

    /// Second-difference operator D.
    pub fn d(&self) -> &Matrix {
        &self.d
    }

    /// Gram matrix M = DᵗD.
    pub fn m(&self) -> &Matrix {
        &self.m
    }

    /// Spectrum of M with the two null modes set to exactly 0 (unordered).
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Raw Jacobi result, including rotation count and convergence flag.
    pub fn solver_report(&self) -> &Eigenvalues {
        &self.report
    }

    /// Roughness ‖D·W‖² of a chain of positions.
    pub fn penalty(&self, w: &Matrix) -> BsomResult<f64> {
        Ok(self.d.product(w)?.sum_squared_entries())
    }
}

/// Second-difference operator for `units` chain positions.
pub fn difference_operator(units: usize) -> Matrix {
    let rows = units.saturating_sub(2);
    let mut d = Matrix::new(rows, units);
    for i in 0..rows {
        d.set(i, i, 1.0);
        d.set(i, i + 1, -2.0);
        d.set(i, i + 2, 1.0);
    }
    d
}

/// Zero the two smallest eigenvalues by value.
///
/// The constant and linear modes lie in the kernel of D, so they are the two
/// smallest eigenvalues of the positive semi-definite M whatever sign the
/// round-off gives them. Ties are irrelevant because both are cleared.
fn null_structural_modes(values: &mut [f64]) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for &i in order.iter().take(2) {
        values[i] = 0.0;
    }
}
