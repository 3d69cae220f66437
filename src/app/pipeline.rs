//! Shared run logic for the `eval`, `fit` and `generate` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! engine bridge -> model selection -> data/range -> parameter edits -> settle -> fit -> settle
//!
//! The command handlers in `app` then focus on presentation and exports.

use crate::data::{example_dataset, fetch_columns, is_url};
use crate::domain::{DataSource, Dataset, FitStatistics, Model, RunConfig};
use crate::engine::{EngineBridge, LocalEngine};
use crate::error::{AppError, FitError};
use crate::io::{ParsedColumns, read_columns_file};
use crate::models::ModelRegistry;
use crate::orchestrator::FittingOrchestrator;

/// Orchestrator wired to a local engine on a worker thread.
pub type Session = FittingOrchestrator<EngineBridge>;

/// Final state of a run, copied out of the orchestrator.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub model: Model,
    pub dataset: Dataset,
    pub fit: Option<FitStatistics>,
}

impl RunOutput {
    fn from_session(session: &Session) -> Result<Self, AppError> {
        let model = session
            .model()
            .cloned()
            .ok_or_else(|| AppError::new(2, "No model selected."))?;
        Ok(Self {
            model,
            dataset: session.dataset().clone(),
            fit: session.fit_statistics().cloned(),
        })
    }
}

/// Classify the `--data` / `--example` flags.
pub fn data_source(data: Option<&str>, example: bool) -> DataSource {
    match data {
        Some(s) if is_url(s) => DataSource::Url(s.to_string()),
        Some(s) => DataSource::Path(s.into()),
        None if example => DataSource::Example,
        None => DataSource::None,
    }
}

/// Read the configured data source, if any.
pub fn load_source(source: &DataSource) -> Result<Option<ParsedColumns>, AppError> {
    match source {
        DataSource::None => Ok(None),
        DataSource::Path(path) => read_columns_file(path).map(Some),
        DataSource::Url(url) => fetch_columns(url).map(Some),
        DataSource::Example => example_dataset().map(Some),
    }
}

/// Block until every pending engine request has been answered.
pub fn settle(session: &mut Session) -> Result<(), FitError> {
    while session.is_busy() {
        let response = session.dispatcher().recv()?;
        session.deliver(response)?;
    }
    Ok(())
}

/// Build a session with the model, data, range and parameter edits of `config`
/// applied, and wait for the resulting model curve.
pub fn prepare(config: &RunConfig) -> Result<Session, AppError> {
    // 1) Resolve the model.
    let registry = ModelRegistry::global();
    let model = registry.instantiate(&config.model).ok_or_else(|| {
        AppError::new(
            2,
            format!(
                "Unknown model '{}'. Available: {}.",
                config.model,
                registry.names().join(", ")
            ),
        )
    })?;

    // 2) Start the engine and select the model.
    let bridge = EngineBridge::spawn(LocalEngine::default())?;
    let mut session = FittingOrchestrator::new(bridge);
    session.select_model(model)?;

    // 3) Data or preview range.
    if let Some(parsed) = load_source(&config.data)? {
        session.load_dataset(parsed)?;
    } else if let Some(range) = config.range {
        session.edit_range(range.x_min, range.x_max, range.points)?;
    }

    // 4) Parameter edits and vary flags.
    if !config.params.is_empty() {
        session.edit_parameters(config.params.iter().map(|(name, value)| (name.as_str(), *value)))?;
    }
    for name in &config.fix {
        session.set_vary(name, false)?;
    }
    for name in &config.vary {
        session.set_vary(name, true)?;
    }

    // 5) Wait for the preview/model curve.
    settle(&mut session)?;
    Ok(session)
}

/// Evaluate the configured model without fitting.
pub fn run_eval(config: &RunConfig) -> Result<RunOutput, AppError> {
    let session = prepare(config)?;
    RunOutput::from_session(&session)
}

/// Fit the configured model to the configured data.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    if config.data == DataSource::None {
        return Err(AppError::new(2, "Fitting needs data: pass --data PATH|URL or --example."));
    }

    let mut session = prepare(config)?;
    session.run_fit()?;
    settle(&mut session)?;
    RunOutput::from_session(&session)
}
