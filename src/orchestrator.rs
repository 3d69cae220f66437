//! Fitting orchestrator.
//!
//! Owns everything that changes while a user works:
//!
//! - the selected model (working copy, display units)
//! - the dataset and the current model curve
//! - the preview range used while no data is loaded
//! - the single pending engine request
//! - the statistics of the last completed fit
//!
//! Every mutation runs to completion and, when the curve may have changed,
//! issues a new engine request that supersedes whatever was pending. Engine
//! results come back through [`FittingOrchestrator::deliver`]; anything that
//! does not answer the current pending request is dropped.
//!
//! Parameters are edited in display units and always sent to the engine in
//! physical units. This module is the only place that converts between them.

use std::time::Instant;

use crate::domain::{
    Dataset, FitState, FitStatistics, LinspaceRange, Model, ModelFamily, Parameter, PendingRequest, RequestKind,
};
use crate::engine::{Dispatch, EngineFitResult, EnginePayload, EngineRequest, EngineResponse, FitRequest};
use crate::error::{EngineFailure, FitError, ParseError};
use crate::io::ParsedColumns;
use crate::math::linspace;

/// What a delivered engine response did to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A model curve was accepted.
    ModelUpdated,
    /// A fit was accepted; statistics are available.
    FitCompleted,
    /// The response answered a superseded request and was dropped.
    Stale,
}

pub struct FittingOrchestrator<D: Dispatch> {
    dispatcher: D,
    model: Option<Model>,
    /// Catalog default of each parameter's `vary` flag.
    fittable: Vec<bool>,
    dataset: Dataset,
    range: LinspaceRange,
    fit_statistics: Option<FitStatistics>,
    pending: Option<PendingRequest>,
    /// Parameters as they were when the pending fit was issued.
    fit_snapshot: Vec<Parameter>,
}

impl<D: Dispatch> FittingOrchestrator<D> {
    /// Empty orchestrator previewing on the generic family's default range.
    pub fn new(dispatcher: D) -> Self {
        Self {
            dispatcher,
            model: None,
            fittable: Vec::new(),
            dataset: Dataset::default(),
            range: ModelFamily::Generic.default_range(),
            fit_statistics: None,
            pending: None,
            fit_snapshot: Vec::new(),
        }
    }

    pub fn state(&self) -> FitState {
        match self.pending.as_ref().map(|p| p.kind) {
            None => FitState::Idle,
            Some(RequestKind::Model) => FitState::AwaitingModelEval,
            Some(RequestKind::Fit) => FitState::AwaitingFit,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn range(&self) -> LinspaceRange {
        self.range
    }

    pub fn fit_statistics(&self) -> Option<&FitStatistics> {
        self.fit_statistics.as_ref()
    }

    /// `true` while no dataset is loaded.
    pub fn range_editable(&self) -> bool {
        !self.dataset.is_loaded()
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    /// Make `model` the working model and preview it.
    ///
    /// Switching to a different family while no data is loaded also resets
    /// the preview range to that family's default.
    pub fn select_model(&mut self, model: Model) -> Result<(), FitError> {
        let family_changed = self.model.as_ref().is_none_or(|m| m.family != model.family);
        let range = if family_changed && !self.dataset.is_loaded() {
            model.family.default_range()
        } else {
            self.range
        };

        log::debug!("selecting model `{}`", model.name);
        let (request, x) = Self::curve_request(&model, &self.dataset, &range)?;
        self.issue(request, x)?;

        self.range = range;
        self.fittable = model.vary_mask();
        self.model = Some(model);
        self.clear_fit();
        Ok(())
    }

    /// Apply `(name, value)` edits in display units.
    ///
    /// All edits are validated before any is applied: an unknown name or a
    /// value outside `[min, max]` rejects the whole batch.
    pub fn edit_parameters<I, S>(&mut self, edits: I) -> Result<(), FitError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut updated = self
            .model
            .clone()
            .ok_or_else(|| FitError::validation("no model selected"))?;

        for (name, value) in edits {
            let name = name.as_ref();
            let param = updated
                .parameters
                .iter_mut()
                .find(|p| p.name == name)
                .ok_or_else(|| FitError::validation(format!("model `{}` has no parameter `{name}`", updated.name)))?;
            if !param.accepts(value) {
                return Err(FitError::validation(format!(
                    "{name} = {value} is outside [{}, {}]",
                    param.min, param.max
                )));
            }
            param.value = value;
        }

        let (request, x) = Self::curve_request(&updated, &self.dataset, &self.range)?;
        self.issue(request, x)?;

        self.model = Some(updated);
        self.clear_fit();
        Ok(())
    }

    /// Allow or forbid a parameter to vary during fits.
    pub fn set_vary(&mut self, name: &str, vary: bool) -> Result<(), FitError> {
        let model = self
            .model
            .as_mut()
            .ok_or_else(|| FitError::validation("no model selected"))?;
        let idx = model
            .parameters
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| FitError::validation(format!("model `{}` has no parameter `{name}`", model.name)))?;
        if vary && !self.fittable.get(idx).copied().unwrap_or(false) {
            return Err(FitError::validation(format!("parameter `{name}` cannot be fitted")));
        }

        model.parameters[idx].vary = vary;
        self.clear_fit();
        Ok(())
    }

    /// Change the preview grid. Only allowed while no dataset is loaded.
    pub fn edit_range(&mut self, x_min: f64, x_max: f64, points: usize) -> Result<(), FitError> {
        if self.dataset.is_loaded() {
            return Err(FitError::validation("the range is fixed by the loaded dataset"));
        }
        if points < 2 {
            return Err(FitError::InvalidRange { count: points });
        }
        if !(x_min.is_finite() && x_max.is_finite()) || x_min >= x_max {
            return Err(FitError::validation(format!(
                "invalid range: need finite x_min < x_max (got {x_min}..{x_max})"
            )));
        }

        let range = LinspaceRange::new(x_min, x_max, points);
        if let Some(model) = self.model.as_ref() {
            let (request, x) = Self::curve_request(model, &self.dataset, &range)?;
            self.issue(request, x)?;
        }
        self.range = range;
        Ok(())
    }

    /// Replace the observed data.
    ///
    /// Rows are stable-sorted by x. Missing σy is filled with 1.0 and marked
    /// as not measured. On error the previous dataset is kept.
    pub fn load_dataset(&mut self, parsed: ParsedColumns) -> Result<(), FitError> {
        if parsed.is_empty() {
            return Err(ParseError::Empty.into());
        }
        for (row, (x, y)) in parsed.x.iter().zip(parsed.y.iter()).enumerate() {
            if !x.is_finite() {
                return Err(ParseError::NonNumeric { row: row + 1, column: "x" }.into());
            }
            if !y.is_finite() {
                return Err(ParseError::NonNumeric { row: row + 1, column: "y" }.into());
            }
        }

        let sigma_measured = parsed.has_sigma();
        let mut order: Vec<usize> = (0..parsed.len()).collect();
        order.sort_by(|&a, &b| parsed.x[a].total_cmp(&parsed.x[b]));

        let dataset = Dataset {
            x: order.iter().map(|&i| parsed.x[i]).collect(),
            y_observed: order.iter().map(|&i| parsed.y[i]).collect(),
            sigma_y: if sigma_measured {
                order.iter().map(|&i| parsed.sigma_y[i]).collect()
            } else {
                vec![1.0; parsed.len()]
            },
            sigma_measured,
            y_model: Vec::new(),
        };
        if let Some(model) = self.model.as_ref() {
            let (request, x) = Self::curve_request(model, &dataset, &self.range)?;
            self.issue(request, x)?;
        }

        log::info!(
            "loaded dataset: {} points, x in [{}, {}]",
            dataset.len(),
            dataset.x[0],
            dataset.x[dataset.len() - 1]
        );
        self.dataset = dataset;
        self.clear_fit();
        Ok(())
    }

    /// Drop the observed data and go back to previewing on the range.
    pub fn clear_dataset(&mut self) -> Result<(), FitError> {
        let dataset = Dataset::default();
        if let Some(model) = self.model.as_ref() {
            let (request, x) = Self::curve_request(model, &dataset, &self.range)?;
            self.issue(request, x)?;
        }
        self.dataset = dataset;
        self.clear_fit();
        Ok(())
    }

    /// Request a fresh model curve on the active x.
    ///
    /// No-op without a selected model.
    pub fn recompute(&mut self) -> Result<(), FitError> {
        let Some(model) = self.model.as_ref() else {
            return Ok(());
        };
        let (request, x) = Self::curve_request(model, &self.dataset, &self.range)?;
        self.issue(request, x)
    }

    /// Fit the varying parameters to the loaded data.
    pub fn run_fit(&mut self) -> Result<(), FitError> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| FitError::validation("no model selected"))?;
        if !self.dataset.is_loaded() {
            return Err(FitError::validation("no data loaded"));
        }
        if !model.parameters.iter().any(|p| p.vary) {
            return Err(FitError::validation("no parameter is allowed to vary"));
        }

        let n = self.dataset.len();
        let sigma_y = if self.dataset.sigma_y.len() == n {
            self.dataset.sigma_y.clone()
        } else {
            vec![1.0; n]
        };
        let request = EngineRequest::Fit(FitRequest {
            model_name: model.name.clone(),
            p_init: model.physical_values(),
            x: self.dataset.x.clone(),
            y: self.dataset.y_observed.clone(),
            sigma_y,
            vary_mask: model.vary_mask(),
        });
        let x = self.dataset.x.clone();
        self.issue(request, x)?;

        self.clear_fit();
        self.fit_snapshot = self.model.as_ref().map(|m| m.parameters.clone()).unwrap_or_default();
        Ok(())
    }

    /// Merge an engine response.
    ///
    /// Responses to superseded requests return `Ok(Delivery::Stale)` and
    /// change nothing. Engine failures return `Err` and leave the
    /// orchestrator idle with its dataset and model untouched.
    pub fn deliver(&mut self, response: EngineResponse) -> Result<Delivery, FitError> {
        let is_current = self.pending.as_ref().is_some_and(|p| p.id == response.id);
        if !is_current {
            log::debug!("discarding stale {:?} response {}", response.kind, response.id);
            return Ok(Delivery::Stale);
        }
        let Some(pending) = self.pending.take() else {
            return Ok(Delivery::Stale);
        };

        match response.outcome {
            Ok(EnginePayload::Model(y_model)) if pending.kind == RequestKind::Model => {
                self.accept_model(pending, y_model)
            }
            Ok(EnginePayload::Fit(result)) if pending.kind == RequestKind::Fit => self.accept_fit(pending, result),
            Ok(_) => Err(FitError::Engine(EngineFailure::InvalidInput(format!(
                "response {} does not match its {:?} request",
                pending.id, pending.kind
            )))),
            Err(failure) => {
                log::warn!("{:?} request {} failed: {failure}", pending.kind, pending.id);
                Err(failure.into())
            }
        }
    }

    /// Model request on the x the curve would be shown on: the dataset's x
    /// when data is loaded, the preview grid otherwise.
    fn curve_request(
        model: &Model,
        dataset: &Dataset,
        range: &LinspaceRange,
    ) -> Result<(EngineRequest, Vec<f64>), FitError> {
        let x = if dataset.is_loaded() {
            dataset.x.clone()
        } else {
            linspace(range)?
        };
        let request = EngineRequest::Model {
            model_name: model.name.clone(),
            params: model.physical_values(),
            x: x.clone(),
        };
        Ok((request, x))
    }

    /// Send `request` and make it the pending one. If sending fails the
    /// previous pending request stays current.
    fn issue(&mut self, request: EngineRequest, x: Vec<f64>) -> Result<(), FitError> {
        let kind = request.kind();
        let handle = self.dispatcher.dispatch(request)?;
        if let Some(previous) = self.pending.as_ref() {
            log::debug!("{kind:?} request supersedes pending {:?} request {}", previous.kind, previous.id);
        }
        log::debug!("issued {kind:?} request {}", handle.id);
        self.pending = Some(PendingRequest {
            kind,
            id: handle.id,
            issued_at: Instant::now(),
            x,
        });
        Ok(())
    }

    /// Forget the last fit: statistics and every parameter's standard error.
    fn clear_fit(&mut self) {
        self.fit_statistics = None;
        if let Some(model) = self.model.as_mut() {
            for param in &mut model.parameters {
                param.std_error = None;
            }
        }
    }

    fn accept_model(&mut self, pending: PendingRequest, y_model: Vec<f64>) -> Result<Delivery, FitError> {
        if y_model.len() != pending.x.len() {
            return Err(FitError::Engine(EngineFailure::InvalidInput(format!(
                "model returned {} values for {} points",
                y_model.len(),
                pending.x.len()
            ))));
        }
        if !self.dataset.is_loaded() {
            self.dataset.x = pending.x;
        }
        self.dataset.y_model = y_model;
        Ok(Delivery::ModelUpdated)
    }

    fn accept_fit(&mut self, pending: PendingRequest, result: EngineFitResult) -> Result<Delivery, FitError> {
        let Some(model) = self.model.as_mut() else {
            return Err(FitError::validation("model was removed while fitting"));
        };
        let m = model.parameters.len();
        if result.params.len() != m || result.errors.len() != m || result.fitted_model.len() != pending.x.len() {
            return Err(FitError::Engine(EngineFailure::InvalidInput(format!(
                "fit result has {} parameters, {} errors and {} model values (expected {m}, {m}, {})",
                result.params.len(),
                result.errors.len(),
                result.fitted_model.len(),
                pending.x.len()
            ))));
        }

        for (i, param) in model.parameters.iter_mut().enumerate() {
            if param.vary {
                param.value = param.display_from_physical(result.params[i]);
                param.std_error = Some(param.display_from_physical(result.errors[i]).abs());
            } else {
                param.std_error = None;
            }
        }

        let statistics = FitStatistics {
            chi2: result.chi2,
            reduced_chi2: result.redchi2,
            r_squared: result.r_squared,
            fitted_parameters: model.parameters.clone(),
            initial_parameters: std::mem::take(&mut self.fit_snapshot),
            fitted_model: result.fitted_model.clone(),
            num_function_evaluations: result.num_function_evaluations,
            execution_time: pending.issued_at.elapsed(),
            convergence_message: result.convergence_message,
        };
        log::info!(
            "fit {} finished: χ²={:.6e}, evaluations={}, {}",
            pending.id,
            statistics.chi2,
            statistics.num_function_evaluations,
            statistics.convergence_message
        );

        self.dataset.y_model = result.fitted_model;
        self.fit_statistics = Some(statistics);
        Ok(Delivery::FitCompleted)
    }
}
