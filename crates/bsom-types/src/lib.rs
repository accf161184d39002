// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! BSOM kernel: shared types for the Bayesian self-organizing map learner.

pub mod config;
pub mod error;
pub mod iteration;

pub use config::{CurveParams, LearnerConfig};
pub use error::{BsomError, BsomResult};
pub use iteration::{BatchReport, Hyperparameters, IterationLog};
