// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Kernel PyO3 FFI Bindings
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied — PyO3 proc macros generate
// unsafe blocks internally. All hand-written code in this crate is safe.
//! Python-callable wrappers around the BSOM learner.
//!
//! Exposes `LearnerConfig` and `BsomLearner` to the Python side, which
//! owns data loading and drawing. Coordinates crossing this boundary are
//! always in the caller's original units; normalization stays inside.
//!
//! Usage from Python:
//! ```python
//! from bsom_kernel import BsomLearner, LearnerConfig
//!
//! learner = BsomLearner.from_coordinates(xs, ys, LearnerConfig(units=8))
//! learner.set_mode("auto_tuning")
//! report = learner.run_batch()
//! chain = learner.centroids()
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use bsom_core::{Learner, Mode, PointSet};
use bsom_linalg::Matrix;
use bsom_types::{BsomError, CurveParams, Hyperparameters, IterationLog, LearnerConfig};

fn value_error(e: BsomError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

// ─── PyLearnerConfig ────────────────────────────────────────────────

/// Python-visible learner configuration.
#[pyclass(name = "LearnerConfig")]
#[derive(Clone)]
struct PyLearnerConfig {
    inner: LearnerConfig,
}

#[pymethods]
impl PyLearnerConfig {
    #[new]
    #[pyo3(signature = (
        units = 10,
        alpha = 1e5,
        beta = 1.0,
        init_level = 0.5,
        seed = 42,
        step_rate = 1.0,
        gamma_tolerance = 1e-6,
        max_batch_iterations = 5000,
        frame_interval_ms = 30,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        units: usize,
        alpha: f64,
        beta: f64,
        init_level: f64,
        seed: u64,
        step_rate: f64,
        gamma_tolerance: f64,
        max_batch_iterations: usize,
        frame_interval_ms: u64,
    ) -> PyResult<Self> {
        let config = LearnerConfig {
            units,
            alpha,
            beta,
            init_level,
            seed,
            step_rate,
            gamma_tolerance,
            max_batch_iterations,
            frame_interval_ms,
            ..LearnerConfig::default()
        };
        config.validate().map_err(value_error)?;
        Ok(Self { inner: config })
    }

    /// Construct from JSON string.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config = LearnerConfig::from_json(json).map_err(value_error)?;
        config.validate().map_err(value_error)?;
        Ok(Self { inner: config })
    }

    #[getter]
    fn units(&self) -> usize {
        self.inner.units
    }

    #[getter]
    fn alpha(&self) -> f64 {
        self.inner.alpha
    }

    #[getter]
    fn beta(&self) -> f64 {
        self.inner.beta
    }

    fn __repr__(&self) -> String {
        format!(
            "LearnerConfig(units={}, alpha={}, beta={}, seed={})",
            self.inner.units, self.inner.alpha, self.inner.beta, self.inner.seed
        )
    }
}

// ─── BsomLearner ────────────────────────────────────────────────────

/// BSOM learner over a synthetic curve or user-supplied points.
#[pyclass(name = "BsomLearner")]
struct PyBsomLearner {
    inner: Learner,
}

impl PyBsomLearner {
    fn build(points: PointSet, config: Option<PyLearnerConfig>) -> PyResult<Self> {
        let config = config.map(|c| c.inner).unwrap_or_default();
        Ok(Self {
            inner: Learner::new(points, config).map_err(value_error)?,
        })
    }

    /// Map caller coordinates into the learner's normalized frame.
    fn normalized(&self, xs: &[f64], ys: &[f64]) -> PyResult<Matrix> {
        let raw = Matrix::from_columns(&[xs, ys]).map_err(value_error)?;
        self.inner
            .points()
            .normalization()
            .to_normalized(&raw)
            .map_err(value_error)
    }
}

fn iteration_dict(py: Python<'_>, entry: &IterationLog) -> PyResult<PyObject> {
    let dict = PyDict::new_bound(py);
    dict.set_item("step", entry.step)?;
    dict.set_item("updated", entry.updated)?;
    dict.set_item("alpha", entry.alpha)?;
    dict.set_item("beta", entry.beta)?;
    dict.set_item("gamma", entry.gamma)?;
    dict.set_item("degenerate_points", entry.degenerate_points)?;
    dict.set_item("distortion", entry.distortion)?;
    Ok(dict.into_any().unbind())
}

#[pymethods]
impl PyBsomLearner {
    /// Learner over a synthetic sine curve.
    #[new]
    #[pyo3(signature = (
        config = None,
        count = 100,
        width = 6.0,
        height = 2.0,
        phase = 0.0,
        noise = 0.0,
        seed = 7,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        config: Option<PyLearnerConfig>,
        count: usize,
        width: f64,
        height: f64,
        phase: f64,
        noise: f64,
        seed: u64,
    ) -> PyResult<Self> {
        let params = CurveParams {
            count,
            width,
            height,
            phase,
            noise,
            seed,
        };
        let points = PointSet::synthetic(params).map_err(value_error)?;
        Self::build(points, config)
    }

    /// Learner over two parallel coordinate lists.
    #[staticmethod]
    #[pyo3(signature = (xs, ys, config = None))]
    fn from_coordinates(
        xs: Vec<f64>,
        ys: Vec<f64>,
        config: Option<PyLearnerConfig>,
    ) -> PyResult<Self> {
        let points = PointSet::from_coordinates(&xs, &ys).map_err(value_error)?;
        Self::build(points, config)
    }

    /// Run one iteration. Returns the iteration log as a dict.
    fn step(&mut self, py: Python<'_>) -> PyResult<PyObject> {
        let entry = self.inner.step().map_err(value_error)?;
        iteration_dict(py, &entry)
    }

    /// Synchronous batch run. Returns a report dict.
    #[pyo3(signature = (max_iterations = None))]
    fn run_batch(&mut self, py: Python<'_>, max_iterations: Option<usize>) -> PyResult<PyObject> {
        let max = max_iterations.unwrap_or(self.inner.config().max_batch_iterations);
        let report = self.inner.run_batch(max).map_err(value_error)?;
        let dict = PyDict::new_bound(py);
        dict.set_item("iterations", report.iterations)?;
        dict.set_item("converged", report.converged)?;
        dict.set_item("gamma", report.gamma)?;
        dict.set_item("alpha", report.alpha)?;
        dict.set_item("beta", report.beta)?;
        Ok(dict.into_any().unbind())
    }

    /// Centroid chain as `[[x, y], ...]` in original coordinates.
    fn centroids(&self) -> PyResult<Vec<Vec<f64>>> {
        let chain = self.inner.centroids_original().map_err(value_error)?;
        Ok((0..chain.rows()).map(|i| chain.row(i).to_vec()).collect())
    }

    /// Peak-normalized density at query points given in original coordinates.
    fn density(&self, xs: Vec<f64>, ys: Vec<f64>) -> PyResult<Vec<f64>> {
        if xs.len() != ys.len() {
            return Err(PyValueError::new_err(format!(
                "xs length {} != ys length {}",
                xs.len(),
                ys.len()
            )));
        }
        let query = self.normalized(&xs, &ys)?;
        self.inner.density(&query).map_err(value_error)
    }

    fn set_hyperparameters(&self, alpha: f64, beta: f64) -> PyResult<()> {
        self.inner
            .handle()
            .set_hyperparameters(Hyperparameters::new(alpha, beta))
            .map_err(value_error)
    }

    /// Pin a centroid; a negative index releases the pin.
    fn set_pinned_centroid(&self, index: i64) -> PyResult<()> {
        let index = usize::try_from(index).ok();
        self.inner
            .handle()
            .set_pinned_centroid(index)
            .map_err(value_error)
    }

    /// One of "idle", "learning", "auto_tuning", "density_view".
    fn set_mode(&self, mode: &str) -> PyResult<()> {
        let mode: Mode = mode.parse().map_err(value_error)?;
        self.inner.handle().set_mode(mode);
        Ok(())
    }

    /// Move a centroid to original-coordinate position (x, y) and pin it.
    fn drag_centroid(&self, index: usize, x: f64, y: f64) -> PyResult<()> {
        let p = self.normalized(&[x], &[y])?;
        self.inner
            .handle()
            .drag_centroid(index, [p.get(0, 0), p.get(0, 1)])
            .map_err(value_error)
    }

    /// Rebuild the chain; alpha and beta return to the configured values.
    fn set_unit_count(&mut self, units: usize) -> PyResult<()> {
        self.inner.set_unit_count(units).map_err(value_error)
    }

    /// Edit the synthetic curve and regenerate its points.
    #[pyo3(signature = (width = None, height = None, phase = None, noise = None))]
    fn set_curve(
        &mut self,
        width: Option<f64>,
        height: Option<f64>,
        phase: Option<f64>,
        noise: Option<f64>,
    ) -> PyResult<()> {
        let points = self.inner.points_mut();
        let params = points
            .params_mut()
            .ok_or_else(|| PyValueError::new_err("learner holds user data, not a curve"))?;
        if let Some(v) = width {
            params.width = v;
        }
        if let Some(v) = height {
            params.height = v;
        }
        if let Some(v) = phase {
            params.phase = v;
        }
        if let Some(v) = noise {
            params.noise = v;
        }
        points.remake().map_err(value_error)
    }

    /// Reseed the centroid positions.
    fn reinitialize(&mut self) {
        self.inner.reinitialize();
    }

    #[getter]
    fn mode(&self) -> String {
        self.inner.handle().mode().to_string()
    }

    #[getter]
    fn alpha(&self) -> f64 {
        self.inner.handle().hyperparameters().alpha
    }

    #[getter]
    fn beta(&self) -> f64 {
        self.inner.handle().hyperparameters().beta
    }

    #[getter]
    fn pinned_centroid(&self) -> Option<usize> {
        self.inner.handle().pinned_centroid()
    }

    #[getter]
    fn units(&self) -> usize {
        self.inner.units()
    }

    #[getter]
    fn step_count(&self) -> usize {
        self.inner.step_count()
    }

    #[getter]
    fn gamma(&self) -> Option<f64> {
        self.inner.last_gamma()
    }

    fn __repr__(&self) -> String {
        format!(
            "BsomLearner(units={}, points={}, mode={})",
            self.inner.units(),
            self.inner.points().len(),
            self.inner.handle().mode()
        )
    }
}

// ─── Module Registration ────────────────────────────────────────────

/// BSOM Kernel: Bayesian self-organizing map learner.
///
/// - `LearnerConfig`: configuration
/// - `BsomLearner`: learner over synthetic or user data
#[pymodule]
fn bsom_kernel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyLearnerConfig>()?;
    m.add_class::<PyBsomLearner>()?;
    Ok(())
}
