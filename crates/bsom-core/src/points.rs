// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — BSOM Point Set
// ─────────────────────────────────────────────────────────────────────
//! Two-dimensional point clouds fed to the learner.
//!
//! Two variants:
//! - synthetic sine curve, regenerated from live parameters by `remake()`
//! - user coordinates, normalized once into `[-BOX_HALF_WIDTH, BOX_HALF_WIDTH]²`

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use bsom_linalg::Matrix;
use bsom_types::{BsomError, BsomResult, CurveParams};

/// Largest absolute coordinate of normalized user data.
pub const BOX_HALF_WIDTH: f64 = 3.0;

/// Affine map between caller coordinates and normalized coordinates:
/// `normalized = (original - mean) · scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub mean: [f64; 2],
    pub scale: f64,
}

impl Normalization {
    pub fn identity() -> Self {
        Self {
            mean: [0.0, 0.0],
            scale: 1.0,
        }
    }

    /// Map an `m × 2` matrix of normalized points back to caller coordinates.
    pub fn to_original(&self, m: &Matrix) -> BsomResult<Matrix> {
        self.map(m, "to_original", |v, mean| v / self.scale + mean)
    }

    /// Map an `m × 2` matrix of caller coordinates into normalized space.
    pub fn to_normalized(&self, m: &Matrix) -> BsomResult<Matrix> {
        self.map(m, "to_normalized", |v, mean| (v - mean) * self.scale)
    }

    fn map(
        &self,
        m: &Matrix,
        op: &'static str,
        f: impl Fn(f64, f64) -> f64,
    ) -> BsomResult<Matrix> {
        if m.cols() != 2 {
            return Err(BsomError::dimension(op, m.shape(), (m.rows(), 2)));
        }
        let data = m
            .as_slice()
            .chunks_exact(2)
            .flat_map(|p| [f(p[0], self.mean[0]), f(p[1], self.mean[1])])
            .collect();
        Matrix::from_vec(m.rows(), 2, data)
    }
}

#[derive(Debug, Clone)]
enum Source {
    Synthetic {
        params: CurveParams,
        /// Fixed N(0, 1) draws, `count × 2`, tied to (count, seed).
        perturbation: Matrix,
        drawn_for: (usize, u64),
    },
    User {
        normalization: Normalization,
    },
}

/// `n × 2` point cloud.
#[derive(Debug, Clone)]
pub struct PointSet {
    points: Matrix,
    source: Source,
}

impl PointSet {
    /// Synthetic sine curve built from `params`.
    pub fn synthetic(params: CurveParams) -> BsomResult<Self> {
        params.validate()?;
        let perturbation = draw_perturbation(params.count, params.seed);
        let mut set = Self {
            points: Matrix::new(params.count, 2),
            source: Source::Synthetic {
                drawn_for: (params.count, params.seed),
                params,
                perturbation,
            },
        };
        set.remake()?;
        Ok(set)
    }

    /// User data from two parallel coordinate arrays.
    ///
    /// The data are mean-centred and uniformly rescaled so the largest
    /// absolute coordinate equals [`BOX_HALF_WIDTH`]. The mapping is computed
    /// here once and kept for [`PointSet::to_original`].
    pub fn from_coordinates(xs: &[f64], ys: &[f64]) -> BsomResult<Self> {
        if xs.len() != ys.len() {
            return Err(BsomError::dimension(
                "from_coordinates",
                (xs.len(), 1),
                (ys.len(), 1),
            ));
        }
        if xs.is_empty() {
            return Err(BsomError::Validation("no points supplied".to_string()));
        }
        if xs.iter().chain(ys).any(|v| !v.is_finite()) {
            return Err(BsomError::Validation(
                "coordinates must be finite".to_string(),
            ));
        }

        let n = xs.len() as f64;
        let mean = [xs.iter().sum::<f64>() / n, ys.iter().sum::<f64>() / n];
        let max_abs = xs
            .iter()
            .map(|x| (x - mean[0]).abs())
            .chain(ys.iter().map(|y| (y - mean[1]).abs()))
            .fold(0.0, f64::max);
        let scale = if max_abs > 0.0 {
            BOX_HALF_WIDTH / max_abs
        } else {
            1.0
        };
        let normalization = Normalization { mean, scale };

        let raw = Matrix::from_columns(&[xs, ys])?;
        Ok(Self {
            points: normalization.to_normalized(&raw)?,
            source: Source::User { normalization },
        })
    }

    /// Regenerate a synthetic set from its current parameters.
    ///
    /// `x = width·(t − ½) + noise·ξx`, `y = (height/2)·sin(2πt + phase) + noise·ξy`
    /// with `t = i/(n−1)` and ξ the fixed perturbation buffer. The buffer is
    /// only redrawn when `count` or `seed` changed.
    pub fn remake(&mut self) -> BsomResult<()> {
        let Source::Synthetic {
            params,
            perturbation,
            drawn_for,
        } = &mut self.source
        else {
            return Err(BsomError::Validation(
                "remake applies to synthetic data only".to_string(),
            ));
        };
        params.validate()?;

        let n = params.count;
        if *drawn_for != (n, params.seed) {
            *perturbation = draw_perturbation(n, params.seed);
            *drawn_for = (n, params.seed);
        }

        let mut points = Matrix::new(n, 2);
        for i in 0..n {
            let t = if n > 1 {
                i as f64 / (n - 1) as f64
            } else {
                0.5
            };
            let x = params.width * (t - 0.5);
            let y = 0.5 * params.height * (std::f64::consts::TAU * t + params.phase).sin();
            points.set(i, 0, x + params.noise * perturbation.get(i, 0));
            points.set(i, 1, y + params.noise * perturbation.get(i, 1));
        }
        self.points = points;
        Ok(())
    }

    pub fn points(&self) -> &Matrix {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.rows() == 0
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, Source::Synthetic { .. })
    }

    pub fn params(&self) -> Option<&CurveParams> {
        match &self.source {
            Source::Synthetic { params, .. } => Some(params),
            Source::User { .. } => None,
        }
    }

    /// Live synthetic parameters; call [`PointSet::remake`] after editing.
    pub fn params_mut(&mut self) -> Option<&mut CurveParams> {
        match &mut self.source {
            Source::Synthetic { params, .. } => Some(params),
            Source::User { .. } => None,
        }
    }

    /// Normalization of user data; identity for synthetic data.
    pub fn normalization(&self) -> Normalization {
        match &self.source {
            Source::Synthetic { .. } => Normalization::identity(),
            Source::User { normalization } => *normalization,
        }
    }

    /// Map normalized results (e.g. centroids) back to caller coordinates.
    pub fn to_original(&self, m: &Matrix) -> BsomResult<Matrix> {
        self.normalization().to_original(m)
    }
}

fn draw_perturbation(n: usize, seed: u64) -> Matrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut draws = Matrix::new(n, 2);
    for i in 0..n {
        for j in 0..2 {
            draws.set(i, j, rng.sample::<f64, _>(StandardNormal));
        }
    }
    draws
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_synthetic_shape_and_extent() {
        let set = PointSet::synthetic(CurveParams::default()).unwrap();
        assert_eq!(set.len(), 100);
        assert!(set.is_synthetic());
        let p = set.points();
        assert_relative_eq!(p[(0, 0)], -3.0, epsilon = 1e-12);
        assert_relative_eq!(p[(99, 0)], 3.0, epsilon = 1e-12);
        assert!((0..100).all(|i| p[(i, 1)].abs() <= 1.0 + 1e-12));
    }

    #[test]
    fn test_remake_follows_parameters() {
        let mut set = PointSet::synthetic(CurveParams::default()).unwrap();
        set.params_mut().unwrap().width = 2.0;
        set.remake().unwrap();
        assert_relative_eq!(set.points()[(99, 0)], 1.0, epsilon = 1e-12);

        set.params_mut().unwrap().count = 10;
        set.remake().unwrap();
        assert_eq!(set.len(), 10);
    }

    #[test]
    fn test_noise_buffer_is_fixed() {
        let params = CurveParams {
            noise: 0.3,
            ..CurveParams::default()
        };
        let mut set = PointSet::synthetic(params).unwrap();
        let first = set.points().clone();
        set.remake().unwrap();
        assert_eq!(set.points(), &first, "same parameters must give the same points");

        set.params_mut().unwrap().noise = 0.6;
        set.remake().unwrap();
        // Offsets from the clean curve double
        let clean = PointSet::synthetic(CurveParams::default()).unwrap();
        let d1 = first.linear_conv(1.0, -1.0, clean.points()).unwrap();
        let d2 = set.points().linear_conv(1.0, -1.0, clean.points()).unwrap();
        for (a, b) in d1.as_slice().iter().zip(d2.as_slice()) {
            assert_relative_eq!(2.0 * a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_perturbation_is_standard_normal() {
        let draws = draw_perturbation(500, 3);
        assert_eq!(draws.shape(), (500, 2));
        let n = draws.as_slice().len() as f64;
        let mean = draws.sum_entries() / n;
        let var = draws.sum_squared_entries() / n - mean * mean;
        assert!(mean.abs() < 0.15, "mean = {mean}");
        assert!((var - 1.0).abs() < 0.2, "variance = {var}");
        assert_ne!(draws, draw_perturbation(500, 4));
        assert_eq!(draws, draw_perturbation(500, 3));
    }

    #[test]
    fn test_single_point_curve() {
        let params = CurveParams {
            count: 1,
            ..CurveParams::default()
        };
        let set = PointSet::synthetic(params).unwrap();
        assert_eq!(set.len(), 1);
        assert_relative_eq!(set.points()[(0, 0)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_user_normalization() {
        let xs = [10.0, 12.0, 14.0];
        let ys = [-1.0, 0.0, 4.0];
        let set = PointSet::from_coordinates(&xs, &ys).unwrap();
        let norm = set.normalization();
        assert_relative_eq!(norm.mean[0], 12.0, epsilon = 1e-12);
        assert_relative_eq!(norm.mean[1], 1.0, epsilon = 1e-12);
        // max |centred| = 3 (y = 4 − 1) → scale 1
        assert_relative_eq!(norm.scale, 1.0, epsilon = 1e-12);

        let p = set.points();
        let max_abs = p.as_slice().iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert_relative_eq!(max_abs, BOX_HALF_WIDTH, epsilon = 1e-12);
        assert_relative_eq!(p.column(0).iter().sum::<f64>(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_user_round_trip_to_original() {
        let xs = [100.0, 250.0, 175.0, 90.0];
        let ys = [5.0, 7.5, 6.0, 5.5];
        let set = PointSet::from_coordinates(&xs, &ys).unwrap();
        let back = set.to_original(set.points()).unwrap();
        for i in 0..4 {
            assert_relative_eq!(back[(i, 0)], xs[i], epsilon = 1e-9);
            assert_relative_eq!(back[(i, 1)], ys[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_user_data_rejects_bad_input() {
        assert!(matches!(
            PointSet::from_coordinates(&[1.0, 2.0], &[1.0]),
            Err(BsomError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            PointSet::from_coordinates(&[], &[]),
            Err(BsomError::Validation(_))
        ));
        assert!(matches!(
            PointSet::from_coordinates(&[1.0, f64::NAN], &[1.0, 2.0]),
            Err(BsomError::Validation(_))
        ));
    }

    #[test]
    fn test_identical_points_keep_unit_scale() {
        let set = PointSet::from_coordinates(&[2.0, 2.0], &[3.0, 3.0]).unwrap();
        assert_eq!(set.normalization().scale, 1.0);
        assert!(set.points().as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_remake_rejected_for_user_data() {
        let mut set = PointSet::from_coordinates(&[0.0, 1.0], &[0.0, 1.0]).unwrap();
        assert!(set.params_mut().is_none());
        assert!(matches!(set.remake(), Err(BsomError::Validation(_))));
    }
}
