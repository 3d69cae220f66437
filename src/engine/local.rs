//! Built-in engine: catalog models evaluated in-process, fits by
//! Levenberg–Marquardt.

use crate::engine::{EngineFitResult, FitRequest, NumericEngine};
use crate::error::EngineFailure;
use crate::fit::{LmOptions, levenberg_marquardt};
use crate::models::{ModelRegistry, evaluate};

#[derive(Debug, Clone, Default)]
pub struct LocalEngine {
    options: LmOptions,
}

impl LocalEngine {
    pub fn new(options: LmOptions) -> Self {
        Self { options }
    }
}

impl NumericEngine for LocalEngine {
    fn evaluate(&self, model_name: &str, params: &[f64], x: &[f64]) -> Result<Vec<f64>, EngineFailure> {
        evaluate(model_name, params, x)
    }

    fn fit(&self, request: &FitRequest) -> Result<EngineFitResult, EngineFailure> {
        if ModelRegistry::global().get(&request.model_name).is_none() {
            return Err(EngineFailure::UnknownModel(request.model_name.clone()));
        }
        let x = &request.x;
        levenberg_marquardt(|p| evaluate(&request.model_name, p, x), request, &self.options)
    }
}
