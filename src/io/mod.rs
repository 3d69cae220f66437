//! Input/output helpers.
//!
//! - column text ingest (`ingest`)
//! - plain-text result export (`export`)
//! - JSON result reports (`fit_report`)

pub mod export;
pub mod fit_report;
pub mod ingest;

pub use export::*;
pub use fit_report::*;
pub use ingest::*;
