//! Small-angle scattering form-factor models.
//!
//! Both models average the squared scattering amplitude over a lognormal size
//! distribution:
//!
//! ```text
//! I(q) = I0 · ΔSLD² · ∫ V(s)² · ⟨F(q, s)²⟩ · g(s; s0, σ) ds
//! ```
//!
//! where `ln s ~ N(ln s0, σ²)`. Substituting `s = s0·exp(√2·σ·t)` turns the
//! size integral into a Gauss–Hermite sum `(1/√π) Σ wᵢ h(sᵢ)`.
//!
//! Parameters arrive in physical units: lengths in Å, `q` in Å⁻¹, SLDs in Å⁻²
//! and the width `σ` as a fraction (the catalog displays it in %).

use std::f64::consts::{FRAC_PI_2, PI};

use crate::error::EngineFailure;
use crate::math::{QuadratureRule, gauss_hermite, gauss_legendre};

/// Upper bound on quadrature degrees accepted from parameters.
const MAX_DEGREE: usize = 200;

/// Below this argument the series expansions are used.
const SMALL_ARG: f64 = 1e-2;

/// Precomputed evaluation plan for the sphere model.
#[derive(Debug, Clone)]
pub struct Sphere {
    scale: f64,
    sizes: Vec<(f64, f64)>,
}

impl Sphere {
    /// Parameters: `[I0, R, σ_R, SLD_sphere, SLD_matrix, hermite_degree]`.
    pub fn new(p: &[f64]) -> Result<Self, EngineFailure> {
        let (i0, radius, width) = (p[0], p[1], p[2]);
        if !(radius > 0.0) {
            return Err(EngineFailure::InvalidParameters(format!("sphere radius must be > 0 (got {radius})")));
        }
        let contrast = p[3] - p[4];
        let rule = gauss_hermite(degree(p[5], "Gauss-Hermite degree")?);
        Ok(Self {
            scale: i0 * contrast * contrast,
            sizes: lognormal_sizes(radius, width, &rule)?,
        })
    }

    pub fn intensity(&self, q: f64) -> f64 {
        let sum: f64 = self
            .sizes
            .iter()
            .map(|&(r, w)| {
                let volume = 4.0 / 3.0 * PI * r.powi(3);
                let amp = sphere_amplitude(q * r);
                w * volume * volume * amp * amp
            })
            .sum();
        self.scale * sum
    }
}

/// Precomputed evaluation plan for the cube model.
#[derive(Debug, Clone)]
pub struct Cube {
    scale: f64,
    sizes: Vec<(f64, f64)>,
    angles: QuadratureRule,
}

impl Cube {
    /// Parameters: `[I0, a, σ_a, SLD_cube, SLD_matrix, legendre_degree, hermite_degree]`.
    pub fn new(p: &[f64]) -> Result<Self, EngineFailure> {
        let (i0, edge, width) = (p[0], p[1], p[2]);
        if !(edge > 0.0) {
            return Err(EngineFailure::InvalidParameters(format!("cube edge length must be > 0 (got {edge})")));
        }
        let contrast = p[3] - p[4];
        let angles = gauss_legendre(degree(p[5], "Gauss-Legendre degree")?).scaled_to(0.0, FRAC_PI_2);
        let rule = gauss_hermite(degree(p[6], "Gauss-Hermite degree")?);
        Ok(Self {
            scale: i0 * contrast * contrast,
            sizes: lognormal_sizes(edge, width, &rule)?,
            angles,
        })
    }

    pub fn intensity(&self, q: f64) -> f64 {
        let sum: f64 = self
            .sizes
            .iter()
            .map(|&(a, w)| {
                let volume = a.powi(3);
                w * volume * volume * self.orientation_average(q * a / 2.0)
            })
            .sum();
        self.scale * sum
    }

    /// `⟨F²⟩` over all orientations; by symmetry one octant suffices.
    fn orientation_average(&self, half_qa: f64) -> f64 {
        let mut acc = 0.0;
        for (&theta, &w_theta) in self.angles.nodes.iter().zip(self.angles.weights.iter()) {
            let (sin_t, cos_t) = theta.sin_cos();
            let fz = sinc(half_qa * cos_t);
            for (&phi, &w_phi) in self.angles.nodes.iter().zip(self.angles.weights.iter()) {
                let (sin_p, cos_p) = phi.sin_cos();
                let f = sinc(half_qa * sin_t * cos_p) * sinc(half_qa * sin_t * sin_p) * fz;
                acc += w_theta * w_phi * f * f * sin_t;
            }
        }
        acc * 2.0 / PI
    }
}

/// `3(sin x − x cos x)/x³`, the normalized sphere amplitude.
pub fn sphere_amplitude(x: f64) -> f64 {
    if x.abs() < SMALL_ARG {
        let x2 = x * x;
        return 1.0 - x2 / 10.0 + x2 * x2 / 280.0;
    }
    let (s, c) = x.sin_cos();
    3.0 * (s - x * c) / x.powi(3)
}

pub fn sinc(x: f64) -> f64 {
    if x.abs() < SMALL_ARG {
        let x2 = x * x;
        return 1.0 - x2 / 6.0 + x2 * x2 / 120.0;
    }
    x.sin() / x
}

/// Sizes and normalized weights of the lognormal average.
fn lognormal_sizes(median: f64, width: f64, rule: &QuadratureRule) -> Result<Vec<(f64, f64)>, EngineFailure> {
    if !(width >= 0.0) {
        return Err(EngineFailure::InvalidParameters(format!("size distribution width must be ≥ 0 (got {width})")));
    }
    if width == 0.0 {
        return Ok(vec![(median, 1.0)]);
    }
    let norm = PI.sqrt();
    Ok(rule
        .nodes
        .iter()
        .zip(rule.weights.iter())
        .map(|(&t, &w)| (median * (std::f64::consts::SQRT_2 * width * t).exp(), w / norm))
        .collect())
}

fn degree(value: f64, what: &str) -> Result<usize, EngineFailure> {
    let rounded = value.round();
    if !(rounded >= 1.0 && rounded <= MAX_DEGREE as f64) {
        return Err(EngineFailure::InvalidParameters(format!(
            "{what} must be between 1 and {MAX_DEGREE} (got {value})"
        )));
    }
    Ok(rounded as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere_params(radius: f64, width: f64) -> Vec<f64> {
        vec![1.0, radius, width, 40e-6, 10e-6, 20.0]
    }

    #[test]
    fn sphere_forward_scattering_is_contrast_times_volume_squared() {
        let sphere = Sphere::new(&sphere_params(50.0, 0.0)).unwrap();
        let volume = 4.0 / 3.0 * PI * 50f64.powi(3);
        let expected = (30e-6f64).powi(2) * volume * volume;
        let got = sphere.intensity(1e-8);
        assert!((got - expected).abs() / expected < 1e-9, "{got} vs {expected}");
    }

    #[test]
    fn sphere_intensity_decays_with_q() {
        let sphere = Sphere::new(&sphere_params(50.0, 0.1)).unwrap();
        let low = sphere.intensity(0.01);
        let high = sphere.intensity(0.3);
        assert!(low.is_finite() && high.is_finite());
        assert!(high < low);
    }

    #[test]
    fn sphere_rejects_non_positive_radius_and_bad_degree() {
        assert!(matches!(
            Sphere::new(&sphere_params(0.0, 0.1)),
            Err(EngineFailure::InvalidParameters(_))
        ));
        let mut p = sphere_params(50.0, 0.1);
        p[5] = 0.0;
        assert!(matches!(Sphere::new(&p), Err(EngineFailure::InvalidParameters(_))));
    }

    #[test]
    fn cube_forward_scattering_matches_volume() {
        let cube = Cube::new(&[1.0, 40.0, 0.0, 40e-6, 10e-6, 10.0, 10.0]).unwrap();
        let volume = 40f64.powi(3);
        let expected = (30e-6f64).powi(2) * volume * volume;
        let got = cube.intensity(1e-8);
        assert!((got - expected).abs() / expected < 1e-6, "{got} vs {expected}");
    }

    #[test]
    fn series_branches_agree_with_closed_forms_near_cutoff() {
        let x = SMALL_ARG * 0.999;
        let closed = 3.0 * (x.sin() - x * x.cos()) / x.powi(3);
        assert!((sphere_amplitude(x) - closed).abs() < 1e-10);
        assert!((sinc(x) - x.sin() / x).abs() < 1e-12);
    }
}
