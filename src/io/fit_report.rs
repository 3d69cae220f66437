//! Read/write JSON result reports.
//!
//! A report is the machine-readable twin of the text export:
//! - the model as it was when the report was written (display units)
//! - the dataset and model curve
//! - fit statistics, when a fit has completed
//!
//! `funcfit show` reads these back.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Dataset, FitStatistics, Model};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub tool: String,
    pub version: String,
    pub generated_at: String,
    pub model: Option<Model>,
    pub dataset: Dataset,
    pub fit: Option<FitStatistics>,
}

impl FitReport {
    pub fn new(dataset: &Dataset, model: Option<&Model>, fit: Option<&FitStatistics>, generated_at: &str) -> Self {
        Self {
            tool: "funcfit".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: generated_at.to_string(),
            model: model.cloned(),
            dataset: dataset.clone(),
            fit: fit.cloned(),
        }
    }
}

/// Write a report JSON file.
pub fn write_report_json(path: &Path, report: &FitReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;
    log::info!("wrote report {}", path.display());
    Ok(())
}

/// Read a report JSON file.
pub fn read_report_json(path: &Path) -> Result<FitReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: FitReport =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelRegistry;

    #[test]
    fn report_reads_back_what_was_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let model = ModelRegistry::global().instantiate("gaussian").unwrap();
        let dataset = Dataset {
            x: vec![0.0, 0.5, 1.0],
            y_observed: vec![0.1, 1.0, 0.1],
            sigma_y: vec![1.0; 3],
            sigma_measured: false,
            y_model: vec![0.2, 0.9, 0.2],
        };
        let report = FitReport::new(&dataset, Some(&model), None, "2024-05-01 12:00:00 +0000");
        write_report_json(&path, &report).unwrap();

        let back = read_report_json(&path).unwrap();
        assert_eq!(back.tool, "funcfit");
        assert_eq!(back.dataset, dataset);
        assert_eq!(back.model.as_ref().map(|m| m.name.as_str()), Some("gaussian"));
        assert!(back.fit.is_none());
    }

    #[test]
    fn garbage_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(read_report_json(&path).unwrap_err().exit_code(), 2);
    }
}
