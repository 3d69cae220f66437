//! Numeric engine boundary.
//!
//! The orchestrator never evaluates models itself. It talks to a
//! [`NumericEngine`] through typed requests:
//!
//! - [`EngineRequest`] / [`EngineResponse`]: what travels over the bridge
//! - [`bridge`]: worker-thread transport with correlation ids
//! - [`local`]: the built-in engine (catalog models + Levenberg–Marquardt)

pub mod bridge;
pub mod local;

pub use bridge::*;
pub use local::*;

use serde::{Deserialize, Serialize};

use crate::domain::{RequestId, RequestKind};
use crate::error::EngineFailure;

/// Inputs of a least-squares fit, all in physical units.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRequest {
    pub model_name: String,
    pub p_init: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub sigma_y: Vec<f64>,
    pub vary_mask: Vec<bool>,
}

/// Raw fit output as reported by the engine (physical units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineFitResult {
    pub params: Vec<f64>,
    /// Standard errors, `0.0` for fixed parameters.
    pub errors: Vec<f64>,
    pub chi2: f64,
    pub redchi2: f64,
    pub r_squared: f64,
    pub fitted_model: Vec<f64>,
    pub num_function_evaluations: usize,
    pub convergence_message: String,
}

/// A numeric engine: evaluates models and fits them.
pub trait NumericEngine {
    /// Evaluate `model_name` at `x`; the result has the same length as `x`.
    fn evaluate(&self, model_name: &str, params: &[f64], x: &[f64]) -> Result<Vec<f64>, EngineFailure>;

    /// Fit the varying parameters of `request.model_name` to `(x, y, σy)`.
    fn fit(&self, request: &FitRequest) -> Result<EngineFitResult, EngineFailure>;
}

/// A unit of work for the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineRequest {
    Model {
        model_name: String,
        params: Vec<f64>,
        x: Vec<f64>,
    },
    Fit(FitRequest),
}

impl EngineRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            EngineRequest::Model { .. } => RequestKind::Model,
            EngineRequest::Fit(_) => RequestKind::Fit,
        }
    }

    /// Run the request against `engine`.
    pub fn execute<E: NumericEngine + ?Sized>(&self, engine: &E) -> Result<EnginePayload, EngineFailure> {
        match self {
            EngineRequest::Model { model_name, params, x } => {
                engine.evaluate(model_name, params, x).map(EnginePayload::Model)
            }
            EngineRequest::Fit(request) => engine.fit(request).map(EnginePayload::Fit),
        }
    }
}

/// Successful engine output.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePayload {
    Model(Vec<f64>),
    Fit(EngineFitResult),
}

/// One delivery per request, tagged with the request's kind and id.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResponse {
    pub kind: RequestKind,
    pub id: RequestId,
    pub outcome: Result<EnginePayload, EngineFailure>,
}
