// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Kernel Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{BsomError, BsomResult};
use crate::iteration::Hyperparameters;

/// Runtime configuration for a BSOM learner.
///
/// `alpha` and `beta` are the construction-time hyperparameters; the
/// learner returns to them whenever the unit count changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Number of centroids r in the chain.
    /// Default: 10.
    pub units: usize,

    /// Prior precision.
    /// Default: 1e5.
    pub alpha: f64,

    /// Noise precision.
    /// Default: 1.0.
    pub beta: f64,

    /// Standard deviation of the Gaussian used to seed centroid positions.
    /// Default: 0.5.
    pub init_level: f64,

    /// Seed for centroid initialization. Advanced on every re-initialization.
    /// Default: 42.
    pub seed: u64,

    /// Blend coefficient c in W ← (1−c)·W + c·W_new. 1.0 is exact EM.
    /// Default: 1.0.
    pub step_rate: f64,

    /// Batch auto-tuning stops once |Δgamma| falls below this.
    /// Default: 1e-6.
    pub gamma_tolerance: f64,

    /// Iteration cap for batch runs.
    /// Default: 5000.
    pub max_batch_iterations: usize,

    /// Delay between iterations of the animated loop.
    /// Default: 30.
    pub frame_interval_ms: u64,

    /// Jacobi stops when the largest off-diagonal magnitude is at or below this.
    /// Default: 1e-12.
    pub eigen_tolerance: f64,

    /// Cap on Jacobi rotations.
    /// Default: 200_000.
    pub eigen_max_rotations: usize,

    /// Smallest accepted unit count.
    /// Default: 3 (the second-difference operator needs three units).
    pub min_units: usize,

    /// Largest accepted unit count.
    /// Default: 100.
    pub max_units: usize,

    /// Number of iteration logs retained by the learner.
    /// Default: 256.
    pub history_window: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            units: 10,
            alpha: 1e5,
            beta: 1.0,
            init_level: 0.5,
            seed: 42,
            step_rate: 1.0,
            gamma_tolerance: 1e-6,
            max_batch_iterations: 5000,
            frame_interval_ms: 30,
            eigen_tolerance: 1e-12,
            eigen_max_rotations: 200_000,
            min_units: 3,
            max_units: 100,
            history_window: 256,
        }
    }
}

impl LearnerConfig {
    /// Construction-time hyperparameters.
    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters::new(self.alpha, self.beta)
    }

    /// Reject a unit count outside `min_units..=max_units`.
    pub fn check_units(&self, units: usize) -> BsomResult<()> {
        if units < self.min_units || units > self.max_units {
            return Err(BsomError::InvalidUnitCount {
                units,
                min: self.min_units,
                max: self.max_units,
            });
        }
        Ok(())
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> BsomResult<()> {
        if self.min_units < 3 {
            return Err(BsomError::Config(format!(
                "min_units must be >= 3, got {}",
                self.min_units
            )));
        }
        if self.max_units < self.min_units {
            return Err(BsomError::Config(format!(
                "max_units ({}) must be >= min_units ({})",
                self.max_units, self.min_units
            )));
        }
        self.check_units(self.units)
            .map_err(|e| BsomError::Config(e.to_string()))?;
        self.hyperparameters()
            .validate()
            .map_err(|e| BsomError::Config(e.to_string()))?;
        if !(self.init_level.is_finite() && self.init_level >= 0.0) {
            return Err(BsomError::Config(format!(
                "init_level must be finite and >= 0, got {}",
                self.init_level
            )));
        }
        if !(self.step_rate > 0.0 && self.step_rate <= 1.0) {
            return Err(BsomError::Config(format!(
                "step_rate must be in (0, 1], got {}",
                self.step_rate
            )));
        }
        if !(self.gamma_tolerance > 0.0) {
            return Err(BsomError::Config(format!(
                "gamma_tolerance must be > 0, got {}",
                self.gamma_tolerance
            )));
        }
        if self.max_batch_iterations == 0 {
            return Err(BsomError::Config(
                "max_batch_iterations must be > 0".to_string(),
            ));
        }
        if !(self.eigen_tolerance > 0.0) {
            return Err(BsomError::Config(format!(
                "eigen_tolerance must be > 0, got {}",
                self.eigen_tolerance
            )));
        }
        if self.eigen_max_rotations == 0 {
            return Err(BsomError::Config(
                "eigen_max_rotations must be > 0".to_string(),
            ));
        }
        if self.history_window == 0 {
            return Err(BsomError::Config("history_window must be > 0".to_string()));
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> BsomResult<Self> {
        serde_json::from_str(json).map_err(|e| BsomError::Config(format!("JSON parse error: {e}")))
    }
}

/// Parameters of the synthetic sine-curve data set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveParams {
    /// Number of points n.
    pub count: usize,
    /// Horizontal extent; x spans [-width/2, width/2].
    pub width: f64,
    /// Peak-to-peak amplitude of the sine.
    pub height: f64,
    /// Phase offset of the sine (rad).
    pub phase: f64,
    /// Scale applied to the fixed Gaussian perturbation buffer.
    pub noise: f64,
    /// Seed of the perturbation buffer.
    pub seed: u64,
}

impl Default for CurveParams {
    fn default() -> Self {
        Self {
            count: 100,
            width: 6.0,
            height: 2.0,
            phase: 0.0,
            noise: 0.0,
            seed: 7,
        }
    }
}

impl CurveParams {
    pub fn validate(&self) -> BsomResult<()> {
        if self.count == 0 {
            return Err(BsomError::Config("count must be > 0".to_string()));
        }
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("phase", self.phase),
        ] {
            if !value.is_finite() {
                return Err(BsomError::Config(format!("{name} must be finite, got {value}")));
            }
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(BsomError::Config(format!(
                "noise must be finite and >= 0, got {}",
                self.noise
            )));
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> BsomResult<Self> {
        serde_json::from_str(json).map_err(|e| BsomError::Config(format!("JSON parse error: {e}")))
    }
}
