// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Linear Algebra
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Dense linear algebra for the BSOM kernel.
//!
//! Architecture:
//!   - Matrix: fixed-shape row-major buffer with functional and in-place ops
//!   - BandedSystem: elimination restricted to a known half-bandwidth
//!   - Jacobi: largest-element rotation eigensolver with a rotation cap
//!
//! No internal parallelism. Functional ops allocate fresh results; the
//! in-place subset is `update_linear_conv`, `exp_in_place`, `set`, `set_row`.

pub mod banded;
pub mod jacobi;
pub mod matrix;

pub use banded::{BandedSystem, SINGULAR_PIVOT};
pub use jacobi::{jacobi_eigenvalues, Eigenvalues};
pub use matrix::Matrix;
