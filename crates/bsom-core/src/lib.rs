// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Learner Core
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Bayesian self-organizing map: a chain of r centroids fitted to 2-D
//! points by EM under a second-difference smoothness prior, with evidence
//! re-estimation of the prior precision α and the noise precision β.
//!
//! # Invariants
//!
//! 1. **No NaN reaches W**: a step that fails (singular M-step, non-finite
//!    centroids) leaves W untouched; a failing evidence update halts the
//!    learner before the bad α or β is stored.
//!
//! 2. **Responsibilities always normalize**: a point whose partition sum
//!    underflows is hard-assigned to its nearest centroid, so every column
//!    of P sums to exactly 1.
//!
//! 3. **The pinned centroid never moves during a step**: its row of the
//!    M-step solution is replaced by the pre-step position.
//!
//! 4. **External writes win**: hyperparameters set through the handle
//!    while a step runs are never overwritten by that step's auto-tune.

pub mod control;
pub mod learner;
pub mod points;
pub mod prior;
pub mod weight;

pub use control::{LearnerHandle, Mode};
pub use learner::Learner;
pub use points::{Normalization, PointSet, BOX_HALF_WIDTH};
pub use prior::{difference_operator, PriorModel, HALF_BANDWIDTH};
pub use weight::{e_step, mixture_density, EStep, UpdateStats, Weight};
