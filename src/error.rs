//! Error types.
//!
//! - `ParseError`, `EngineFailure` and `FitError` are the typed library errors
//!   surfaced by ingestion, the numeric engine and the orchestrator.
//! - `AppError` is what the binary reports: a message plus a process exit code.

use thiserror::Error;

/// Failure while turning column text into a dataset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A file classified as 3-column has a row with fewer than 3 fields.
    #[error("line {line}: expected 3 columns (x, y, sy) but found {found}")]
    MalformedRow { line: usize, found: usize },
    /// A required value (x or y) is not a finite number.
    #[error("row {row}: column `{column}` is not a finite number")]
    NonNumeric { row: usize, column: &'static str },
    /// No data rows were found.
    #[error("no data rows found")]
    Empty,
}

/// Failure reported by (or while reaching) the numeric engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineFailure {
    #[error("unknown model `{0}`")]
    UnknownModel(String),
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("fit did not converge: {0}")]
    ConvergenceFailure(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("engine unreachable: {0}")]
    Unreachable(String),
}

/// Errors reported by the fitting orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid range: at least 2 points are required (got {count})")]
    InvalidRange { count: usize },
    #[error("engine error: {0}")]
    Engine(#[from] EngineFailure),
}

impl FitError {
    pub fn validation(message: impl Into<String>) -> Self {
        FitError::Validation(message.into())
    }
}

/// Error reported by the `funcfit` binary.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err {
            FitError::Engine(_) => 4,
            FitError::Parse(_) | FitError::Validation(_) | FitError::InvalidRange { .. } => 2,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl From<EngineFailure> for AppError {
    fn from(err: EngineFailure) -> Self {
        FitError::from(err).into()
    }
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        FitError::from(err).into()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
