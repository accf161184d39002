// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Weight (EM Core)
// ─────────────────────────────────────────────────────────────────────
//! Centroid chain W (r×2) and its EM update under the smoothness prior.
//!
//! One EM step:
//!   1. E-step:  Ds = ‖wᵢ − xⱼ‖²,  P = exp(−β/2·Ds),  Z = Σᵢ P
//!   2. Columns with Z = 0 are hard-assigned to the nearest centroid
//!   3. P ← P / Z
//!   4. M-step:  (α/β·M + diag(Σⱼ P))·W_new = P·X   (banded solve)
//!   5. Pinned centroid keeps its pre-step position
//!   6. W ← (1−c)·W + c·W_new
//!
//! Evidence updates reuse the E-step quantities:
//!   γ = Σᵢ (βn/r)/(βn/r + αλᵢ) − 2
//!   α ← γ·d / ‖D·W‖²
//!   β ← (n − γ − 2)·d / Σ P⊙Ds

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use bsom_linalg::Matrix;
use bsom_types::{BsomError, BsomResult};

use crate::prior::HALF_BANDWIDTH;

/// Spatial dimension of centroids and points.
pub const DIM: usize = 2;

/// Result of the E-step for a fixed W, X and β.
#[derive(Debug, Clone)]
pub struct EStep {
    /// Squared distances, r×n.
    pub sq_distances: Matrix,
    /// Normalized responsibilities, r×n; every column sums to 1.
    pub responsibilities: Matrix,
    /// Columns whose partition sum underflowed to 0.
    pub degenerate_points: usize,
}

impl EStep {
    /// Σ P ⊙ Ds.
    pub fn distortion(&self) -> BsomResult<f64> {
        Ok(self
            .responsibilities
            .elementwise_product(&self.sq_distances)?
            .sum_entries())
    }
}

/// Posterior responsibilities of centroids `w` for points `x`.
pub fn e_step(w: &Matrix, x: &Matrix, beta: f64) -> BsomResult<EStep> {
    let sq_distances = w.cross_sq_distance(x)?;
    let mut p = sq_distances.scaled(-0.5 * beta);
    p.exp_in_place();
    let mut z = p.vertical_sum();

    let mut degenerate_points = 0;
    for j in 0..z.cols() {
        if z[(0, j)] != 0.0 {
            continue;
        }
        let nearest = (0..w.rows())
            .min_by(|&a, &b| {
                sq_distances[(a, j)]
                    .partial_cmp(&sq_distances[(b, j)])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(0);
        for i in 0..w.rows() {
            p.set(i, j, if i == nearest { 1.0 } else { 0.0 });
        }
        z.set(0, j, 1.0);
        degenerate_points += 1;
    }
    if degenerate_points > 0 {
        log::debug!("e_step: {degenerate_points} point(s) hard-assigned after underflow");
    }

    Ok(EStep {
        responsibilities: p.divide_by_row_vector(&z)?,
        sq_distances,
        degenerate_points,
    })
}

/// Peak-normalized mixture density Σᵢ exp(−β/2·‖q − wᵢ‖²) at each query row.
///
/// All zeros when every term underflows.
pub fn mixture_density(centroids: &Matrix, query: &Matrix, beta: f64) -> BsomResult<Vec<f64>> {
    if !(beta.is_finite() && beta > 0.0) {
        return Err(BsomError::Validation(format!(
            "density needs beta > 0, got {beta}"
        )));
    }
    let mut k = centroids.cross_sq_distance(query)?.scaled(-0.5 * beta);
    k.exp_in_place();
    let mut density = k.vertical_sum().into_vec();
    let peak = density.iter().copied().fold(0.0, f64::max);
    if peak > 0.0 {
        for v in density.iter_mut() {
            *v /= peak;
        }
    }
    Ok(density)
}

/// Outcome of one committed EM step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateStats {
    pub degenerate_points: usize,
    pub distortion: f64,
}

/// r centroid positions plus the transient quantities of the last E-step.
#[derive(Debug, Clone)]
pub struct Weight {
    positions: Matrix,
    init_level: f64,
    seed: u64,
    last: Option<EStep>,
}

impl Weight {
    /// New chain of `units` centroids, seeded by [`Weight::init`].
    pub fn new(units: usize, init_level: f64, seed: u64) -> Self {
        let mut weight = Self {
            positions: Matrix::new(units, DIM),
            init_level,
            seed,
            last: None,
        };
        weight.init();
        weight
    }

    /// Reseed positions from N(0, init_level²).
    ///
    /// The seed advances on every call: repeated calls are reproducible
    /// from the construction seed but differ from one another.
    pub fn init(&mut self) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.seed = self.seed.wrapping_add(1);
        for i in 0..self.positions.rows() {
            for j in 0..DIM {
                let v: f64 = rng.sample(StandardNormal);
                self.positions.set(i, j, self.init_level * v);
            }
        }
        self.last = None;
    }

    /// Take externally supplied positions (r×2, finite).
    pub fn init_from(&mut self, positions: &Matrix) -> BsomResult<()> {
        if positions.shape() != self.positions.shape() {
            return Err(BsomError::dimension(
                "init_from",
                self.positions.shape(),
                positions.shape(),
            ));
        }
        if !positions.is_finite() {
            return Err(BsomError::Validation(
                "centroid positions must be finite".to_string(),
            ));
        }
        self.positions = positions.clone();
        self.last = None;
        Ok(())
    }

    pub fn units(&self) -> usize {
        self.positions.rows()
    }

    pub fn positions(&self) -> &Matrix {
        &self.positions
    }

    /// Next seed `init` will use.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Move one centroid (interactive drag).
    pub fn set_position(&mut self, index: usize, position: [f64; 2]) -> BsomResult<()> {
        if index >= self.units() {
            return Err(BsomError::Validation(format!(
                "centroid {index} out of range for {} units",
                self.units()
            )));
        }
        if !position.iter().all(|v| v.is_finite()) {
            return Err(BsomError::Validation(
                "centroid position must be finite".to_string(),
            ));
        }
        self.positions.set_row(index, &position)
    }

    /// E-step of the last committed update.
    pub fn last_e_step(&self) -> Option<&EStep> {
        self.last.as_ref()
    }

    /// Σ P⊙Ds of the last committed E-step.
    pub fn distortion(&self) -> Option<f64> {
        self.last.as_ref().and_then(|e| e.distortion().ok())
    }

    /// One EM step. On error W and the stored E-step are left untouched.
    pub fn update(
        &mut self,
        points: &Matrix,
        m: &Matrix,
        alpha: f64,
        beta: f64,
        pinned: Option<usize>,
        step_rate: f64,
    ) -> BsomResult<UpdateStats> {
        let r = self.units();
        if m.shape() != (r, r) {
            return Err(BsomError::dimension("update", (r, r), m.shape()));
        }
        if let Some(index) = pinned {
            if index >= r {
                return Err(BsomError::Validation(format!(
                    "pinned centroid {index} out of range for {r} units"
                )));
            }
        }

        let e = e_step(&self.positions, points, beta)?;

        let counts = e.responsibilities.horizontal_sum().diagonal();
        let system = m.scaled(alpha / beta).linear_conv(1.0, 1.0, &counts)?;
        let rhs = e.responsibilities.product(points)?;
        let mut w_new = system.divide(&rhs, HALF_BANDWIDTH)?;

        if let Some(index) = pinned {
            w_new.set_row(index, self.positions.row(index))?;
        }
        if !w_new.is_finite() {
            return Err(BsomError::Numerical(
                "M-step produced non-finite centroids".to_string(),
            ));
        }

        self.positions
            .update_linear_conv(1.0 - step_rate, step_rate, &w_new)?;

        let stats = UpdateStats {
            degenerate_points: e.degenerate_points,
            distortion: e.distortion()?,
        };
        self.last = Some(e);
        Ok(stats)
    }

    /// Effective number of parameters γ over the nulled prior spectrum.
    pub fn ngp(&self, n: usize, alpha: f64, beta: f64, eigenvalues: &[f64]) -> f64 {
        let s = beta * n as f64 / self.units() as f64;
        eigenvalues.iter().map(|&l| s / (s + alpha * l)).sum::<f64>() - 2.0
    }

    /// Evidence re-estimate α = γ·d / ‖D·W‖².
    pub fn update_alpha(&self, d: &Matrix, gamma: f64) -> BsomResult<f64> {
        let roughness = d.product(&self.positions)?.sum_squared_entries();
        if !(roughness > 0.0) {
            return Err(BsomError::Numerical(format!(
                "alpha update: chain roughness {roughness} is not positive"
            )));
        }
        positive_finite("alpha", gamma * DIM as f64 / roughness)
    }

    /// Evidence re-estimate β = (n − γ − 2)·d / Σ P⊙Ds, from the last E-step.
    pub fn update_beta(&self, n: usize, gamma: f64) -> BsomResult<f64> {
        let e = self.last.as_ref().ok_or_else(|| {
            BsomError::Numerical("beta update before any EM step".to_string())
        })?;
        let distortion = e.distortion()?;
        if !(distortion > 0.0) {
            return Err(BsomError::Numerical(format!(
                "beta update: distortion {distortion} is not positive"
            )));
        }
        positive_finite("beta", (n as f64 - gamma - 2.0) * DIM as f64 / distortion)
    }

    /// Peak-normalized density of the current chain at `query` (m×2).
    pub fn make_density(&self, query: &Matrix, beta: f64) -> BsomResult<Vec<f64>> {
        mixture_density(&self.positions, query, beta)
    }
}

fn positive_finite(name: &str, value: f64) -> BsomResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(BsomError::Numerical(format!(
            "{name} update produced {value}"
        )))
    }
}
