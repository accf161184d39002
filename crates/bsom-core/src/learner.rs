// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Learner (Iteration Loop)
// ─────────────────────────────────────────────────────────────────────
//! One learner iteration:
//!   1. Apply queued commands (unit-count change, centroid drags)
//!   2. Snapshot hyperparameters, mode and pinned index
//!   3. Learning: one EM step on W
//!   4. Auto-tuning: γ = ngp, α ← update_alpha, β ← update_beta
//!   5. Publish centroids and (if still current) the tuned α, β
//!   6. Log step
//!
//! A numeric failure at any point halts the learner (mode → Idle) and is
//! returned; W is never left in a NaN state.

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use bsom_linalg::Matrix;
use bsom_types::{BatchReport, BsomError, BsomResult, Hyperparameters, IterationLog, LearnerConfig};

use crate::control::{ControlSnapshot, LearnerHandle};
use crate::points::PointSet;
use crate::prior::PriorModel;
use crate::weight::Weight;

/// BSOM learner: data, prior, centroid chain and the control handle.
pub struct Learner {
    cfg: LearnerConfig,
    points: PointSet,
    prior: PriorModel,
    weight: Weight,
    handle: LearnerHandle,
    step_count: usize,
    last_gamma: Option<f64>,
    history: VecDeque<IterationLog>,
}

impl Learner {
    /// Validate `config`, build the prior for `config.units` and seed W.
    ///
    /// The learner starts idle.
    pub fn new(points: PointSet, config: LearnerConfig) -> BsomResult<Self> {
        config.validate()?;
        let prior = PriorModel::from_config(config.units, &config)?;
        let weight = Weight::new(config.units, config.init_level, config.seed);
        let handle = LearnerHandle::new(&config, weight.positions().clone());
        log::info!(
            "learner: {} units, {} points, alpha={:.3e}, beta={:.3e}",
            config.units,
            points.len(),
            config.alpha,
            config.beta
        );

        Ok(Self {
            history: VecDeque::with_capacity(config.history_window),
            cfg: config,
            points,
            prior,
            weight,
            handle,
            step_count: 0,
            last_gamma: None,
        })
    }

    /// Handle for controls running on other threads.
    pub fn handle(&self) -> LearnerHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.cfg
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    /// Live point set; after editing synthetic parameters call `remake()`.
    pub fn points_mut(&mut self) -> &mut PointSet {
        &mut self.points
    }

    pub fn prior(&self) -> &PriorModel {
        &self.prior
    }

    pub fn weight(&self) -> &Weight {
        &self.weight
    }

    pub fn units(&self) -> usize {
        self.weight.units()
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// γ of the most recent auto-tuned step.
    pub fn last_gamma(&self) -> Option<f64> {
        self.last_gamma
    }

    /// Most recent iteration logs, oldest first.
    pub fn history(&self) -> &VecDeque<IterationLog> {
        &self.history
    }

    /// Centroids in normalized coordinates.
    pub fn centroids(&self) -> &Matrix {
        self.weight.positions()
    }

    /// Centroids mapped back to the coordinates the data came in.
    pub fn centroids_original(&self) -> BsomResult<Matrix> {
        self.points.to_original(self.weight.positions())
    }

    /// Density of the current chain at `query` (normalized coordinates).
    pub fn density(&self, query: &Matrix) -> BsomResult<Vec<f64>> {
        self.weight
            .make_density(query, self.handle.hyperparameters().beta)
    }

    // ------------------------------------------------------------------
    // Structural changes
    // ------------------------------------------------------------------

    /// Rebuild W and the prior for `units` centroids.
    ///
    /// Hyperparameters return to the configured values and the pin is
    /// released. The mode is kept.
    pub fn set_unit_count(&mut self, units: usize) -> BsomResult<()> {
        self.cfg.check_units(units)?;
        let prior = PriorModel::from_config(units, &self.cfg)?;
        let weight = Weight::new(units, self.cfg.init_level, self.weight.seed());
        self.prior = prior;
        self.weight = weight;
        self.last_gamma = None;
        self.handle
            .reset(self.cfg.hyperparameters(), self.weight.positions());
        log::info!(
            "learner: rebuilt with {units} units, alpha={:.3e}, beta={:.3e}",
            self.cfg.alpha,
            self.cfg.beta
        );
        Ok(())
    }

    /// Swap in a new point set; centroids and hyperparameters are kept.
    pub fn reload_points(&mut self, points: PointSet) {
        log::info!("learner: reloaded {} points", points.len());
        self.points = points;
        self.last_gamma = None;
    }

    /// Reseed centroid positions (next seed in the sequence).
    pub fn reinitialize(&mut self) {
        self.weight.init();
        self.last_gamma = None;
        let revision = self.handle.snapshot().revision;
        self.handle.publish(revision, None, self.weight.positions());
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// One iteration. Idle and density-view steps only apply commands.
    pub fn step(&mut self) -> BsomResult<IterationLog> {
        match self.advance() {
            Ok(entry) => {
                if self.history.len() == self.cfg.history_window {
                    self.history.pop_front();
                }
                self.history.push_back(entry.clone());
                Ok(entry)
            }
            Err(e) => {
                log::error!("learner halted at step {}: {e}", self.step_count);
                self.handle.halt();
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> BsomResult<IterationLog> {
        self.apply_commands()?;
        let ControlSnapshot {
            hyper,
            mode,
            pinned,
            revision,
        } = self.handle.snapshot();

        self.step_count += 1;
        let mut entry = IterationLog {
            step: self.step_count,
            alpha: hyper.alpha,
            beta: hyper.beta,
            ..IterationLog::default()
        };

        if !mode.is_learning() {
            self.handle.publish(revision, None, self.weight.positions());
            return Ok(entry);
        }

        let stats = self.weight.update(
            self.points.points(),
            self.prior.m(),
            hyper.alpha,
            hyper.beta,
            pinned,
            self.cfg.step_rate,
        )?;
        entry.updated = true;
        entry.degenerate_points = stats.degenerate_points;
        entry.distortion = stats.distortion;

        let tuned = if mode.is_auto_tuning() {
            let n = self.points.len();
            let gamma = self
                .weight
                .ngp(n, hyper.alpha, hyper.beta, self.prior.eigenvalues());
            let evidence = self
                .weight
                .update_alpha(self.prior.d(), gamma)
                .and_then(|alpha| {
                    self.weight
                        .update_beta(n, gamma)
                        .map(|beta| (alpha, beta))
                });
            let (alpha, beta) = match evidence {
                Ok(tuned) => tuned,
                Err(e) => {
                    // Positions are already committed; readers see them
                    self.handle.publish(revision, None, self.weight.positions());
                    return Err(e);
                }
            };
            self.last_gamma = Some(gamma);
            entry.gamma = Some(gamma);
            Some(Hyperparameters::new(alpha, beta))
        } else {
            None
        };

        self.handle
            .publish(revision, tuned, self.weight.positions());
        let current = self.handle.hyperparameters();
        entry.alpha = current.alpha;
        entry.beta = current.beta;
        Ok(entry)
    }

    fn apply_commands(&mut self) -> BsomResult<()> {
        let commands = self.handle.take_commands();
        if let Some(units) = commands.units {
            // Drags queued against the old chain no longer apply
            return self.set_unit_count(units);
        }
        for (index, position) in commands.drags {
            self.weight.set_position(index, position)?;
        }
        Ok(())
    }

    /// Synchronous loop of at most `max_iterations` steps.
    ///
    /// With auto-tuning the run ends once |γ − γ_prev| drops below
    /// `gamma_tolerance`. It also ends early if the mode leaves learning.
    pub fn run_batch(&mut self, max_iterations: usize) -> BsomResult<BatchReport> {
        if !self.handle.mode().is_learning() {
            return Err(BsomError::Validation(format!(
                "batch run needs learning or auto_tuning mode, got {}",
                self.handle.mode()
            )));
        }

        let mut iterations = 0;
        let mut converged = false;
        let mut previous: Option<f64> = None;
        while iterations < max_iterations {
            let entry = self.step()?;
            iterations += 1;
            if !entry.updated {
                break;
            }
            if let Some(gamma) = entry.gamma {
                if previous.is_some_and(|p| (gamma - p).abs() < self.cfg.gamma_tolerance) {
                    converged = true;
                    break;
                }
                previous = Some(gamma);
            }
        }

        let hyper = self.handle.hyperparameters();
        if converged {
            log::info!(
                "batch: gamma converged after {iterations} iterations (gamma={:.6}, alpha={:.3e}, beta={:.3e})",
                self.last_gamma.unwrap_or_default(),
                hyper.alpha,
                hyper.beta
            );
        }
        Ok(BatchReport {
            iterations,
            converged,
            gamma: self.last_gamma,
            alpha: hyper.alpha,
            beta: hyper.beta,
        })
    }

    /// Animated loop: step, then sleep `interval`, until the handle's stop
    /// signal is seen between iterations. Returns the number of steps run.
    pub fn run_animated(&mut self, interval: Duration) -> BsomResult<usize> {
        let mut steps = 0;
        while !self.handle.take_stop() {
            self.step()?;
            steps += 1;
            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }
        log::info!("animated loop stopped after {steps} steps");
        Ok(steps)
    }

    /// [`Learner::run_animated`] with the configured frame interval.
    pub fn run_animated_default(&mut self) -> BsomResult<usize> {
        self.run_animated(Duration::from_millis(self.cfg.frame_interval_ms))
    }
}
