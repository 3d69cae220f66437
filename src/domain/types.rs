//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - held by the orchestrator as the single source of truth
//! - lent out read-only to reports and exporters
//! - written to (and read back from) JSON reports

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::float_serde;

/// A single model parameter.
///
/// `value`, `min`, `max` and `std_error` are in display units. The engine works
/// in physical units: `physical = value * unit_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    pub vary: bool,
    pub unit_name: String,
    pub unit_value: f64,
    #[serde(with = "float_serde::lower_bound")]
    pub min: f64,
    #[serde(with = "float_serde::upper_bound")]
    pub max: f64,
    pub std_error: Option<f64>,
}

impl Parameter {
    /// Parameter with unit factor 1 and no unit label.
    pub fn new(name: &str, value: f64, vary: bool, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            vary,
            unit_name: String::new(),
            unit_value: 1.0,
            min,
            max,
            std_error: None,
        }
    }

    /// Attach a display unit and its factor to physical units.
    pub fn with_unit(mut self, unit_name: &str, unit_value: f64) -> Self {
        self.unit_name = unit_name.to_string();
        self.unit_value = unit_value;
        self
    }

    /// Value in the units the engine expects.
    pub fn physical_value(&self) -> f64 {
        self.value * self.unit_value
    }

    /// Convert an engine-side (physical) quantity back to display units.
    pub fn display_from_physical(&self, physical: f64) -> f64 {
        physical / self.unit_value
    }

    /// `true` if `value` lies inside `[min, max]` (NaN never does).
    pub fn accepts(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Which catalog a model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Elementary functions (linear, parabola, Gaussian).
    Generic,
    /// Small-angle scattering form factors.
    Sas,
}

impl ModelFamily {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelFamily::Generic => "Generic functions",
            ModelFamily::Sas => "Small-angle scattering",
        }
    }

    /// Range used for the model preview until a dataset is loaded.
    pub fn default_range(self) -> LinspaceRange {
        match self {
            ModelFamily::Generic => LinspaceRange::new(0.0, 1.0, 100),
            ModelFamily::Sas => LinspaceRange::new(0.01, 0.5, 100),
        }
    }
}

/// A parametric model: catalog entry or the orchestrator's working copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Identifier understood by the numeric engine.
    pub name: String,
    pub display_name: String,
    pub family: ModelFamily,
    pub parameters: Vec<Parameter>,
    pub info_text: String,
}

impl Model {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn physical_values(&self) -> Vec<f64> {
        self.parameters.iter().map(Parameter::physical_value).collect()
    }

    pub fn vary_mask(&self) -> Vec<bool> {
        self.parameters.iter().map(|p| p.vary).collect()
    }
}

/// Evenly spaced preview grid used while no dataset is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinspaceRange {
    pub x_min: f64,
    pub x_max: f64,
    pub points: usize,
}

impl LinspaceRange {
    pub fn new(x_min: f64, x_max: f64, points: usize) -> Self {
        Self { x_min, x_max, points }
    }
}

/// Observed data plus the current model curve.
///
/// If any of `x`, `y_observed`, `sigma_y` is non-empty all three have equal
/// length and `x` is ascending. Without loaded data, `x` is the preview grid
/// that `y_model` was computed on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub x: Vec<f64>,
    pub y_observed: Vec<f64>,
    pub sigma_y: Vec<f64>,
    /// `false` when σy was filled with 1.0 because the source had no error column.
    pub sigma_measured: bool,
    pub y_model: Vec<f64>,
}

impl Dataset {
    /// `true` once observed data has been loaded.
    pub fn is_loaded(&self) -> bool {
        !self.y_observed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Outcome of a completed fit, in display units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitStatistics {
    #[serde(with = "float_serde::nan_as_null")]
    pub chi2: f64,
    #[serde(with = "float_serde::nan_as_null")]
    pub reduced_chi2: f64,
    /// NaN when the observed data is constant.
    #[serde(with = "float_serde::nan_as_null")]
    pub r_squared: f64,
    /// Parameters after the fit; varying ones carry `std_error`.
    pub fitted_parameters: Vec<Parameter>,
    /// Snapshot of the parameters the fit started from.
    pub initial_parameters: Vec<Parameter>,
    pub fitted_model: Vec<f64>,
    pub num_function_evaluations: usize,
    pub execution_time: Duration,
    pub convergence_message: String,
}

/// Kind of engine request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Model,
    Fit,
}

/// Correlation id of an engine request. Strictly increasing per bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The single in-flight request the orchestrator is waiting for.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub kind: RequestKind,
    pub id: RequestId,
    pub issued_at: Instant,
    /// The x-array a model request was issued with.
    pub x: Vec<f64>,
}

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitState {
    Idle,
    AwaitingModelEval,
    AwaitingFit,
}

/// Where the observed data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// No data: the model is previewed on a linspace.
    None,
    Path(PathBuf),
    Url(String),
    /// The dataset bundled with the binary.
    Example,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model: String,
    /// Parameter overrides in display units, applied in order.
    pub params: Vec<(String, f64)>,
    pub fix: Vec<String>,
    pub vary: Vec<String>,
    /// Preview range; `None` means the model family's default.
    pub range: Option<LinspaceRange>,
    pub data: DataSource,
    pub export_text: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

/// Noise settings for synthetic datasets.
///
/// Each point gets `σ = noise_rel * |y| + noise_floor` and a Gaussian draw
/// with that standard deviation.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub noise_rel: f64,
    pub noise_floor: f64,
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversion_round_trips() {
        for &(value, unit) in &[(10.0, 1e-2), (40.0, 1e-6), (-3.25, 1.0), (1e-3, 1e4)] {
            let p = Parameter::new("p", value, true, f64::NEG_INFINITY, f64::INFINITY).with_unit("", unit);
            let back = p.display_from_physical(p.physical_value());
            assert!((back - value).abs() <= 1e-12 * value.abs().max(1.0), "{value} -> {back}");
        }
    }

    #[test]
    fn accepts_rejects_nan_and_out_of_bounds() {
        let p = Parameter::new("σ", 0.1, true, 0.0, f64::INFINITY);
        assert!(p.accepts(0.0));
        assert!(p.accepts(1e300));
        assert!(!p.accepts(-1e-9));
        assert!(!p.accepts(f64::NAN));
    }
}
