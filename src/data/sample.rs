//! Synthetic datasets: a model curve plus seeded Gaussian noise.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{LinspaceRange, Model, SampleConfig};
use crate::engine::NumericEngine;
use crate::error::AppError;
use crate::io::ParsedColumns;
use crate::math::linspace;

/// Evaluate `model` (display-unit parameters) on `range` and add noise.
///
/// Each point gets `σ = noise_rel · |y| + noise_floor`, and `y` is drawn from
/// `N(y_model, σ²)`. Points where that σ would be 0 use `noise_rel · max|y|`.
/// The same seed always gives the same dataset.
pub fn generate_sample<E: NumericEngine + ?Sized>(
    engine: &E,
    model: &Model,
    range: &LinspaceRange,
    config: &SampleConfig,
) -> Result<ParsedColumns, AppError> {
    if !(config.noise_rel.is_finite() && config.noise_rel >= 0.0) {
        return Err(AppError::new(2, "Relative noise must be finite and >= 0."));
    }
    if !(config.noise_floor.is_finite() && config.noise_floor >= 0.0) {
        return Err(AppError::new(2, "Noise floor must be finite and >= 0."));
    }
    if config.noise_rel == 0.0 && config.noise_floor == 0.0 {
        return Err(AppError::new(2, "Noise settings give σ = 0; set --noise or --noise-floor."));
    }
    if !(range.x_min.is_finite() && range.x_max.is_finite() && range.x_max > range.x_min) {
        return Err(AppError::new(2, "Invalid x range for sample generation."));
    }

    let x = linspace(range)?;
    let clean = engine
        .evaluate(&model.name, &model.physical_values(), &x)
        .map_err(|e| AppError::new(4, format!("Model evaluation failed: {e}")))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    // Where the model is exactly 0 and there is no floor, use the curve's scale.
    let scale = clean.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let fallback = config.noise_rel * if scale > 0.0 { scale } else { 1.0 };

    let mut y = Vec::with_capacity(x.len());
    let mut sigma_y = Vec::with_capacity(x.len());
    for &value in &clean {
        let sigma = config.noise_rel * value.abs() + config.noise_floor;
        let sigma = if sigma > 0.0 { sigma } else { fallback };
        let z: f64 = normal.sample(&mut rng);
        y.push(value + sigma * z);
        sigma_y.push(sigma);
    }

    log::debug!(
        "generated {} points of `{}` (noise {} rel + {} abs, seed {})",
        x.len(),
        model.name,
        config.noise_rel,
        config.noise_floor,
        config.seed
    );
    Ok(ParsedColumns { x, y, sigma_y })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;
    use crate::models::ModelRegistry;

    fn config(seed: u64) -> SampleConfig {
        SampleConfig {
            noise_rel: 0.05,
            noise_floor: 0.01,
            seed,
        }
    }

    #[test]
    fn same_seed_same_sample() {
        let engine = LocalEngine::default();
        let model = ModelRegistry::global().instantiate("gaussian").unwrap();
        let range = LinspaceRange::new(0.0, 1.0, 50);

        let a = generate_sample(&engine, &model, &range, &config(3)).unwrap();
        let b = generate_sample(&engine, &model, &range, &config(3)).unwrap();
        let c = generate_sample(&engine, &model, &range, &config(4)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.y, c.y);
        assert_eq!(a.len(), 50);
        assert_eq!(a.sigma_y.len(), 50);
    }

    #[test]
    fn noise_stays_near_the_model() {
        let engine = LocalEngine::default();
        let model = ModelRegistry::global().instantiate("linear").unwrap();
        let range = LinspaceRange::new(1.0, 2.0, 200);
        let sample = generate_sample(&engine, &model, &range, &config(11)).unwrap();

        for ((x, y), s) in sample.x.iter().zip(sample.y.iter()).zip(sample.sigma_y.iter()) {
            assert!((s - (0.05 * x + 0.01)).abs() < 1e-12);
            assert!((y - x).abs() < 6.0 * s, "x={x} y={y} s={s}");
        }
    }

    #[test]
    fn zero_model_values_still_get_noise() {
        let engine = LocalEngine::default();
        let model = ModelRegistry::global().instantiate("linear").unwrap();
        let range = LinspaceRange::new(0.0, 1.0, 11);
        let cfg = SampleConfig {
            noise_rel: 0.1,
            noise_floor: 0.0,
            seed: 5,
        };
        let sample = generate_sample(&engine, &model, &range, &cfg).unwrap();
        // y = x, so x = 0 falls back to 0.1 * max|y| = 0.1.
        assert!((sample.sigma_y[0] - 0.1).abs() < 1e-12);
        assert!(sample.sigma_y.iter().all(|s| *s > 0.0));
    }

    #[test]
    fn rejects_zero_noise_and_bad_ranges() {
        let engine = LocalEngine::default();
        let model = ModelRegistry::global().instantiate("linear").unwrap();
        let range = LinspaceRange::new(0.0, 1.0, 10);
        let silent = SampleConfig {
            noise_rel: 0.0,
            noise_floor: 0.0,
            seed: 1,
        };
        assert_eq!(generate_sample(&engine, &model, &range, &silent).unwrap_err().exit_code(), 2);

        let inverted = LinspaceRange::new(1.0, 0.0, 10);
        assert!(generate_sample(&engine, &model, &inverted, &config(1)).is_err());
        let single = LinspaceRange::new(0.0, 1.0, 1);
        assert!(generate_sample(&engine, &model, &single, &config(1)).is_err());
    }
}
