// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Kernel Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all BSOM kernel failures.
///
/// Degenerate responsibility columns are not represented here: the EM
/// step repairs them in place and only counts them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BsomError {
    /// Operand shapes are incompatible for the requested operation.
    #[error("dimension mismatch in {op}: {left:?} vs {right:?}")]
    DimensionMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// Banded elimination met a pivot below the singularity threshold.
    #[error("singular system: pivot {pivot:e} at row {row}")]
    SingularSystem { row: usize, pivot: f64 },

    /// Centroid count outside the accepted range.
    #[error("invalid unit count {units}: expected {min}..={max}")]
    InvalidUnitCount { units: usize, min: usize, max: usize },

    /// Invalid input data (coordinates, positions, operation on wrong variant).
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Numerical error (NaN/Inf or a vanishing denominator).
    #[error("numerical error: {0}")]
    Numerical(String),
}

impl BsomError {
    pub fn dimension(op: &'static str, left: (usize, usize), right: (usize, usize)) -> Self {
        Self::DimensionMismatch { op, left, right }
    }
}

pub type BsomResult<T> = Result<T, BsomError>;
