// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Iteration Types
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{BsomError, BsomResult};

/// Prior precision (alpha) and noise precision (beta).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub alpha: f64,
    pub beta: f64,
}

impl Hyperparameters {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Both precisions must be finite and strictly positive.
    pub fn validate(&self) -> BsomResult<()> {
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(BsomError::Validation(format!(
                "alpha must be finite and > 0, got {}",
                self.alpha
            )));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(BsomError::Validation(format!(
                "beta must be finite and > 0, got {}",
                self.beta
            )));
        }
        Ok(())
    }

    /// Prior-to-noise ratio alpha/beta weighting the penalty in the M-step.
    pub fn ratio(&self) -> f64 {
        self.alpha / self.beta
    }
}

/// Log entry for one learner iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationLog {
    pub step: usize,
    /// False when the learner was idle or in density view.
    pub updated: bool,
    /// Hyperparameters in effect after the iteration.
    pub alpha: f64,
    pub beta: f64,
    /// Effective number of parameters, present only on auto-tuned steps.
    pub gamma: Option<f64>,
    /// Points whose partition sum underflowed and were hard-assigned.
    pub degenerate_points: usize,
    /// Σ P ⊙ Ds of the E-step.
    pub distortion: f64,
}

/// Outcome of a synchronous batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub iterations: usize,
    /// True when auto-tuning met the gamma tolerance.
    pub converged: bool,
    pub gamma: Option<f64>,
    pub alpha: f64,
    pub beta: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyperparameters_ratio() {
        let h = Hyperparameters::new(1e5, 2.0);
        assert!((h.ratio() - 5e4).abs() < 1e-9);
    }

    #[test]
    fn test_hyperparameters_reject_nan() {
        assert!(Hyperparameters::new(f64::NAN, 1.0).validate().is_err());
        assert!(Hyperparameters::new(1.0, -1.0).validate().is_err());
        assert!(Hyperparameters::new(1.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_iteration_log_serde() {
        let log = IterationLog {
            step: 3,
            updated: true,
            alpha: 2.0,
            beta: 0.5,
            gamma: Some(1.25),
            degenerate_points: 0,
            distortion: 4.0,
        };
        let json = serde_json::to_string(&log).unwrap();
        let back: IterationLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }
}
