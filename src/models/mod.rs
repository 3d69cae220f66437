//! Model catalog and model evaluation.
//!
//! Models are implemented as small, pure functions so that the engine and the
//! fitter can stay generic over the model name:
//! - `registry`: catalog metadata (names, parameters, units, bounds)
//! - `functions`: generic family (linear, parabola, Gaussian)
//! - `sas`: small-angle scattering form factors

pub mod functions;
pub mod registry;
pub mod sas;

pub use registry::*;

use rayon::prelude::*;

use crate::error::EngineFailure;

/// Evaluate model `name` at every `x`, parameters in physical units.
pub fn evaluate(name: &str, params: &[f64], x: &[f64]) -> Result<Vec<f64>, EngineFailure> {
    let expected = ModelRegistry::global()
        .get(name)
        .map(|m| m.parameters.len())
        .ok_or_else(|| EngineFailure::UnknownModel(name.to_string()))?;
    if params.len() != expected {
        return Err(EngineFailure::InvalidParameters(format!(
            "model `{name}` takes {expected} parameters, got {}",
            params.len()
        )));
    }
    if let Some(bad) = params.iter().position(|v| !v.is_finite()) {
        return Err(EngineFailure::InvalidParameters(format!(
            "parameter {bad} of model `{name}` is not finite"
        )));
    }

    let y = match name {
        "linear" => x.iter().map(|&xi| functions::linear(params, xi)).collect(),
        "parabola" => x.iter().map(|&xi| functions::parabola(params, xi)).collect(),
        "gaussian" => x.iter().map(|&xi| functions::gaussian(params, xi)).collect(),
        "sas_sphere" => {
            let sphere = sas::Sphere::new(params)?;
            x.par_iter().map(|&q| sphere.intensity(q)).collect()
        }
        "sas_cube" => {
            let cube = sas::Cube::new(params)?;
            x.par_iter().map(|&q| cube.intensity(q)).collect()
        }
        other => return Err(EngineFailure::UnknownModel(other.to_string())),
    };
    Ok(y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_every_catalog_model_at_defaults() {
        let x = [0.01, 0.1, 0.25, 0.5];
        for model in ModelRegistry::global().models() {
            let y = evaluate(&model.name, &model.physical_values(), &x).unwrap();
            assert_eq!(y.len(), x.len(), "{}", model.name);
            assert!(y.iter().all(|v| v.is_finite()), "{}: {y:?}", model.name);
        }
    }

    #[test]
    fn evaluate_rejects_unknown_model_and_wrong_arity() {
        assert_eq!(
            evaluate("lorentzian", &[1.0], &[0.0]),
            Err(EngineFailure::UnknownModel("lorentzian".to_string()))
        );
        assert!(matches!(
            evaluate("linear", &[1.0], &[0.0]),
            Err(EngineFailure::InvalidParameters(_))
        ));
        assert!(matches!(
            evaluate("linear", &[f64::NAN, 0.0], &[0.0]),
            Err(EngineFailure::InvalidParameters(_))
        ));
    }
}
