//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model metadata (`Parameter`, `Model`, `ModelFamily`)
//! - the orchestrator's owned state (`Dataset`, `FitStatistics`, `PendingRequest`)
//! - run configuration derived from the CLI (`RunConfig`, `SampleConfig`)

pub mod float_serde;
pub mod types;

pub use types::*;
