// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Control Handle
// ─────────────────────────────────────────────────────────────────────
//! Command interface between interactive controls and the iteration loop.
//!
//! The loop owns the centroid buffer; everything an outside writer may touch
//! (hyperparameters, mode, pinned index, structural requests) lives behind
//! one `parking_lot::Mutex` per learner. The loop locks only to apply
//! pending commands, to snapshot, and to publish a finished step.
//!
//! Auto-tuned hyperparameters are written back only if no external write
//! happened while the step ran: every `set_hyperparameters` bumps a
//! revision counter and a stale write-back is dropped.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use bsom_linalg::Matrix;
use bsom_types::{BsomError, BsomResult, Hyperparameters, LearnerConfig};

use crate::weight::mixture_density;

/// Learner mode. `AutoTuning` implies learning; `DensityView` pauses it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Idle,
    Learning,
    AutoTuning,
    DensityView,
}

impl Mode {
    /// True when each iteration runs an EM step.
    pub fn is_learning(self) -> bool {
        matches!(self, Mode::Learning | Mode::AutoTuning)
    }

    pub fn is_auto_tuning(self) -> bool {
        self == Mode::AutoTuning
    }

    pub fn is_density_view(self) -> bool {
        self == Mode::DensityView
    }

    /// Toggle the learning flag. Clearing it also clears auto-tuning;
    /// setting it leaves density view.
    pub fn with_learning(self, on: bool) -> Mode {
        match (self, on) {
            (Mode::Idle | Mode::DensityView, true) => Mode::Learning,
            (Mode::Learning | Mode::AutoTuning, false) => Mode::Idle,
            (mode, _) => mode,
        }
    }

    /// Toggle auto-tuning. Setting it turns learning on.
    pub fn with_auto_tuning(self, on: bool) -> Mode {
        match (self, on) {
            (_, true) => Mode::AutoTuning,
            (Mode::AutoTuning, false) => Mode::Learning,
            (mode, false) => mode,
        }
    }

    /// Toggle density view. Entering it pauses learning; leaving it idles.
    pub fn with_density_view(self, on: bool) -> Mode {
        match (self, on) {
            (_, true) => Mode::DensityView,
            (Mode::DensityView, false) => Mode::Idle,
            (mode, false) => mode,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Learning => "learning",
            Mode::AutoTuning => "auto_tuning",
            Mode::DensityView => "density_view",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = BsomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Mode::Idle),
            "learning" => Ok(Mode::Learning),
            "auto_tuning" => Ok(Mode::AutoTuning),
            "density_view" => Ok(Mode::DensityView),
            other => Err(BsomError::Validation(format!("unknown mode '{other}'"))),
        }
    }
}

/// Control values read by the loop at the start of a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ControlSnapshot {
    pub hyper: Hyperparameters,
    pub mode: Mode,
    pub pinned: Option<usize>,
    pub revision: u64,
}

/// Structural commands queued since the last step.
#[derive(Debug, Default)]
pub(crate) struct Commands {
    pub units: Option<usize>,
    pub drags: Vec<(usize, [f64; 2])>,
}

#[derive(Debug)]
struct ControlState {
    hyper: Hyperparameters,
    mode: Mode,
    pinned: Option<usize>,
    units: usize,
    revision: u64,
    pending: Commands,
    /// Centroids of the last published step (normalized coordinates).
    frame: Matrix,
}

/// Cloneable handle for driving a learner from another thread.
#[derive(Debug, Clone)]
pub struct LearnerHandle {
    state: Arc<Mutex<ControlState>>,
    stop: Arc<AtomicBool>,
    min_units: usize,
    max_units: usize,
}

impl LearnerHandle {
    pub(crate) fn new(config: &LearnerConfig, frame: Matrix) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControlState {
                hyper: config.hyperparameters(),
                mode: Mode::Idle,
                pinned: None,
                units: frame.rows(),
                revision: 0,
                pending: Commands::default(),
                frame,
            })),
            stop: Arc::new(AtomicBool::new(false)),
            min_units: config.min_units,
            max_units: config.max_units,
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Replace alpha and beta. Switches auto-tuning off, keeping learning on.
    pub fn set_hyperparameters(&self, hyper: Hyperparameters) -> BsomResult<()> {
        hyper.validate()?;
        let mut state = self.state.lock();
        state.hyper = hyper;
        state.revision += 1;
        state.mode = state.mode.with_auto_tuning(false);
        Ok(())
    }

    /// Exclude one centroid from the fit, or release the pin with `None`.
    pub fn set_pinned_centroid(&self, index: Option<usize>) -> BsomResult<()> {
        let mut state = self.state.lock();
        if let Some(i) = index {
            if i >= state.units {
                return Err(BsomError::Validation(format!(
                    "pinned centroid {i} out of range for {} units",
                    state.units
                )));
            }
        }
        state.pinned = index;
        Ok(())
    }

    pub fn set_mode(&self, mode: Mode) {
        self.state.lock().mode = mode;
    }

    pub fn set_learning(&self, on: bool) {
        let mut state = self.state.lock();
        state.mode = state.mode.with_learning(on);
    }

    pub fn set_auto_tuning(&self, on: bool) {
        let mut state = self.state.lock();
        state.mode = state.mode.with_auto_tuning(on);
    }

    pub fn set_density_view(&self, on: bool) {
        let mut state = self.state.lock();
        state.mode = state.mode.with_density_view(on);
    }

    /// Queue a chain rebuild with `units` centroids, applied before the next step.
    pub fn request_unit_count(&self, units: usize) -> BsomResult<()> {
        if units < self.min_units || units > self.max_units {
            return Err(BsomError::InvalidUnitCount {
                units,
                min: self.min_units,
                max: self.max_units,
            });
        }
        self.state.lock().pending.units = Some(units);
        Ok(())
    }

    /// Move a centroid and pin it until released.
    pub fn drag_centroid(&self, index: usize, position: [f64; 2]) -> BsomResult<()> {
        if !position.iter().all(|v| v.is_finite()) {
            return Err(BsomError::Validation(
                "centroid position must be finite".to_string(),
            ));
        }
        let mut state = self.state.lock();
        if index >= state.units {
            return Err(BsomError::Validation(format!(
                "centroid {index} out of range for {} units",
                state.units
            )));
        }
        state.pinned = Some(index);
        state.pending.drags.push((index, position));
        Ok(())
    }

    /// Ask an animated loop to exit after its current iteration.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    pub fn hyperparameters(&self) -> Hyperparameters {
        self.state.lock().hyper
    }

    pub fn mode(&self) -> Mode {
        self.state.lock().mode
    }

    pub fn pinned_centroid(&self) -> Option<usize> {
        self.state.lock().pinned
    }

    pub fn units(&self) -> usize {
        self.state.lock().units
    }

    /// Centroids of the last published step, normalized coordinates.
    pub fn centroids(&self) -> Matrix {
        self.state.lock().frame.clone()
    }

    /// Peak-normalized density of the last published centroids at `query`.
    pub fn density(&self, query: &Matrix) -> BsomResult<Vec<f64>> {
        let (frame, beta) = {
            let state = self.state.lock();
            (state.frame.clone(), state.hyper.beta)
        };
        mixture_density(&frame, query, beta)
    }

    // ------------------------------------------------------------------
    // Loop side
    // ------------------------------------------------------------------

    pub(crate) fn take_stop(&self) -> bool {
        self.stop.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn take_commands(&self) -> Commands {
        std::mem::take(&mut self.state.lock().pending)
    }

    pub(crate) fn snapshot(&self) -> ControlSnapshot {
        let state = self.state.lock();
        ControlSnapshot {
            hyper: state.hyper,
            mode: state.mode,
            pinned: state.pinned,
            revision: state.revision,
        }
    }

    /// Publish a finished step. Returns false when `tuned` was discarded
    /// because hyperparameters were written externally since `revision`.
    pub(crate) fn publish(
        &self,
        revision: u64,
        tuned: Option<Hyperparameters>,
        frame: &Matrix,
    ) -> bool {
        let mut state = self.state.lock();
        state.frame = frame.clone();
        match tuned {
            Some(hyper) if state.revision == revision => {
                state.hyper = hyper;
                true
            }
            Some(_) => {
                log::warn!(
                    "auto-tuned hyperparameters discarded: external write (revision {} -> {})",
                    revision,
                    state.revision
                );
                false
            }
            None => true,
        }
    }

    /// New chain: hyperparameters back to `hyper`, pin released.
    pub(crate) fn reset(&self, hyper: Hyperparameters, frame: &Matrix) {
        let mut state = self.state.lock();
        state.hyper = hyper;
        state.revision += 1;
        state.pinned = None;
        state.units = frame.rows();
        state.pending.drags.clear();
        state.frame = frame.clone();
    }

    /// Stop learning after a numeric failure.
    pub(crate) fn halt(&self) {
        self.state.lock().mode = Mode::Idle;
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn handle() -> LearnerHandle {
        LearnerHandle::new(&LearnerConfig::default(), Matrix::new(10, 2))
    }

    #[test]
    fn test_mode_flags() {
        assert!(!Mode::Idle.is_learning());
        assert!(Mode::Learning.is_learning());
        assert!(Mode::AutoTuning.is_learning());
        assert!(Mode::AutoTuning.is_auto_tuning());
        assert!(!Mode::DensityView.is_learning());
        assert!(Mode::DensityView.is_density_view());
    }

    #[test]
    fn test_mode_transitions() {
        assert_eq!(Mode::Idle.with_learning(true), Mode::Learning);
        assert_eq!(Mode::Idle.with_auto_tuning(true), Mode::AutoTuning);
        assert_eq!(Mode::AutoTuning.with_learning(false), Mode::Idle);
        assert_eq!(Mode::AutoTuning.with_auto_tuning(false), Mode::Learning);
        assert_eq!(Mode::Learning.with_auto_tuning(false), Mode::Learning);
        assert_eq!(Mode::AutoTuning.with_density_view(true), Mode::DensityView);
        assert_eq!(Mode::DensityView.with_learning(true), Mode::Learning);
        assert_eq!(Mode::DensityView.with_density_view(false), Mode::Idle);
        assert_eq!(Mode::Learning.with_density_view(false), Mode::Learning);
        assert_eq!(Mode::DensityView.with_auto_tuning(true), Mode::AutoTuning);
    }

    #[test]
    fn test_mode_parse() {
        for mode in [Mode::Idle, Mode::Learning, Mode::AutoTuning, Mode::DensityView] {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
        assert!(matches!(
            "fast".parse::<Mode>(),
            Err(BsomError::Validation(_))
        ));
    }

    #[test]
    fn test_set_hyperparameters_validates_and_leaves_auto_tuning() {
        let h = handle();
        h.set_mode(Mode::AutoTuning);
        assert!(h.set_hyperparameters(Hyperparameters::new(-1.0, 1.0)).is_err());
        assert_eq!(h.mode(), Mode::AutoTuning);

        h.set_hyperparameters(Hyperparameters::new(10.0, 2.0)).unwrap();
        assert_eq!(h.hyperparameters(), Hyperparameters::new(10.0, 2.0));
        assert_eq!(h.mode(), Mode::Learning);
    }

    #[test]
    fn test_stale_write_back_discarded() {
        let h = handle();
        let snap = h.snapshot();
        h.set_hyperparameters(Hyperparameters::new(3.0, 4.0)).unwrap();
        let frame = Matrix::new(10, 2);
        assert!(!h.publish(snap.revision, Some(Hyperparameters::new(9.0, 9.0)), &frame));
        assert_eq!(h.hyperparameters(), Hyperparameters::new(3.0, 4.0));

        let snap = h.snapshot();
        assert!(h.publish(snap.revision, Some(Hyperparameters::new(9.0, 9.0)), &frame));
        assert_eq!(h.hyperparameters(), Hyperparameters::new(9.0, 9.0));
    }

    #[test]
    fn test_pin_and_drag_validation() {
        let h = handle();
        assert!(h.set_pinned_centroid(Some(10)).is_err());
        h.set_pinned_centroid(Some(9)).unwrap();
        assert_eq!(h.pinned_centroid(), Some(9));
        h.set_pinned_centroid(None).unwrap();
        assert_eq!(h.pinned_centroid(), None);

        assert!(h.drag_centroid(10, [0.0, 0.0]).is_err());
        assert!(h.drag_centroid(1, [f64::NAN, 0.0]).is_err());
        h.drag_centroid(2, [0.5, -0.5]).unwrap();
        assert_eq!(h.pinned_centroid(), Some(2));
        let commands = h.take_commands();
        assert_eq!(commands.drags, vec![(2, [0.5, -0.5])]);
        assert!(h.take_commands().drags.is_empty());
    }

    #[test]
    fn test_unit_count_request_bounds() {
        let h = handle();
        assert!(matches!(
            h.request_unit_count(2),
            Err(BsomError::InvalidUnitCount { units: 2, min: 3, max: 100 })
        ));
        assert!(h.request_unit_count(101).is_err());
        h.request_unit_count(7).unwrap();
        assert_eq!(h.take_commands().units, Some(7));
    }

    #[test]
    fn test_reset_releases_pin() {
        let h = handle();
        h.drag_centroid(3, [1.0, 1.0]).unwrap();
        h.reset(Hyperparameters::new(1e5, 1.0), &Matrix::new(4, 2));
        assert_eq!(h.pinned_centroid(), None);
        assert_eq!(h.units(), 4);
        assert!(h.take_commands().drags.is_empty());
        assert!(h.set_pinned_centroid(Some(4)).is_err());
    }

    #[test]
    fn test_stop_flag_consumed_once() {
        let h = handle();
        let remote = h.clone();
        thread::spawn(move || remote.stop()).join().unwrap();
        assert!(h.is_stop_requested());
        assert!(h.take_stop());
        assert!(!h.take_stop());
    }

    #[test]
    fn test_density_reads_published_frame() {
        let h = handle();
        let frame = Matrix::from_rows(&[vec![0.0, 0.0], vec![1.0, 0.0], vec![2.0, 0.0]]).unwrap();
        h.reset(Hyperparameters::new(1.0, 2.0), &frame);
        let query = Matrix::from_rows(&[vec![1.0, 0.0], vec![40.0, 0.0]]).unwrap();
        let density = h.density(&query).unwrap();
        assert_eq!(density[0], 1.0);
        assert_eq!(density[1], 0.0);
    }
}
