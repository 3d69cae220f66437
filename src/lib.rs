//! `funcfit` library crate.
//!
//! The binary (`funcfit`) is a thin wrapper around this library so that:
//!
//! - the orchestrator and engine are testable without spawning processes
//! - other front-ends can drive the same `FittingOrchestrator`
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod orchestrator;
pub mod report;

pub use orchestrator::{Delivery, FittingOrchestrator};
