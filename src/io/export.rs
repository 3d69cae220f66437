//! Plain-text result export.
//!
//! The layout is a `#`-commented header (model, fit statistics, parameters)
//! followed by a tab-separated table of the data and model curve, so the file
//! can be read back by any column reader, including ours.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{Dataset, FitStatistics, Model};
use crate::error::AppError;
use crate::io::ParsedColumns;

/// File name used when the user does not pick one.
pub const DEFAULT_EXPORT_FILE: &str = "fit_result.dat";

/// Local time formatted for report headers.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string()
}

/// Render the result report. Pure formatting: nothing is recomputed.
pub fn format_result_text(
    dataset: &Dataset,
    model: Option<&Model>,
    statistics: Option<&FitStatistics>,
    generated_at: &str,
) -> String {
    let data_present = dataset.is_loaded() && dataset.y_observed.len() == dataset.len();
    let sigma_present = data_present && dataset.sigma_measured && dataset.sigma_y.len() == dataset.len();
    let model_present = model.is_some() && !dataset.y_model.is_empty() && dataset.y_model.len() == dataset.len();

    let mut out = String::new();
    out.push_str(&format!("# File generated on {generated_at}\n"));
    if let (true, Some(model)) = (model_present, model) {
        out.push_str(&format!("# Used model: {}\n", model.display_name));
    }

    if let Some(stats) = statistics {
        out.push_str(&format!("# Χ²: {}\n", stats.chi2));
        out.push_str(&format!("# Red. Χ²: {}\n", stats.reduced_chi2));
        out.push_str(&format!("# R²: {}\n", stats.r_squared));
        out.push_str(&format!("# Func. Eval.: {}\n", stats.num_function_evaluations));
        out.push_str(&format!(
            "# Execution Time: {:.3} ms\n",
            stats.execution_time.as_secs_f64() * 1e3
        ));
        out.push_str(&format!("# Algorithm ended with: {}\n", stats.convergence_message));

        out.push_str("# Fitted parameters:\n");
        for (i, p) in stats.fitted_parameters.iter().enumerate().filter(|(_, p)| p.vary) {
            let std = p.std_error.unwrap_or(f64::NAN);
            let initial = stats.initial_parameters.get(i).map(|q| q.value).unwrap_or(f64::NAN);
            out.push_str(&format!(
                "# {}\t=\t{} ± {} {} ({} %) [init: {}]\n",
                p.name,
                p.value,
                std,
                p.unit_name,
                relative_percent(std, p.value),
                initial
            ));
        }
        out.push_str("# Fixed parameters:\n");
        for p in stats.fitted_parameters.iter().filter(|p| !p.vary) {
            out.push_str(&format!("# {}\t=\t{} {}\n", p.name, p.value, p.unit_name));
        }
    } else if let (true, Some(model)) = (model_present, model) {
        out.push_str("# Parameters:\n");
        for p in &model.parameters {
            out.push_str(&format!("# {}\t=\t{} {}\n", p.name, p.value, p.unit_name));
        }
    }

    out.push('\n');
    if dataset.is_empty() {
        return out;
    }

    out.push_str("# x");
    if data_present {
        out.push_str("\ty_data");
        if sigma_present {
            out.push_str("\tsy_data");
        }
    }
    if model_present {
        out.push_str("\ty_model");
    }
    out.push('\n');

    for i in 0..dataset.len() {
        out.push_str(&dataset.x[i].to_string());
        if data_present {
            out.push_str(&format!("\t{}", dataset.y_observed[i]));
            if sigma_present {
                out.push_str(&format!("\t{}", dataset.sigma_y[i]));
            }
        }
        if model_present {
            out.push_str(&format!("\t{}", dataset.y_model[i]));
        }
        out.push('\n');
    }
    out
}

/// Write the result report to `path`.
pub fn write_result_text(
    path: &Path,
    dataset: &Dataset,
    model: Option<&Model>,
    statistics: Option<&FitStatistics>,
) -> Result<(), AppError> {
    let text = format_result_text(dataset, model, statistics, &timestamp_now());
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export file '{}': {e}", path.display())))?;
    file.write_all(text.as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write export file '{}': {e}", path.display())))?;
    log::info!("wrote result file {}", path.display());
    Ok(())
}

/// Write raw columns (`x y [sy]`) in the format `parse_columns` reads.
pub fn write_columns_file(path: &Path, columns: &ParsedColumns, header: &str) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create data file '{}': {e}", path.display())))?;

    for line in header.lines() {
        writeln!(file, "# {line}").map_err(|e| AppError::new(2, format!("Failed to write data header: {e}")))?;
    }
    writeln!(file, "# x\ty{}", if columns.has_sigma() { "\tsy" } else { "" })
        .map_err(|e| AppError::new(2, format!("Failed to write data header: {e}")))?;

    for i in 0..columns.len() {
        let row = match columns.sigma_y.get(i) {
            Some(s) => format!("{}\t{}\t{}", columns.x[i], columns.y[i], s),
            None => format!("{}\t{}", columns.x[i], columns.y[i]),
        };
        writeln!(file, "{row}").map_err(|e| AppError::new(2, format!("Failed to write data row: {e}")))?;
    }
    Ok(())
}

fn relative_percent(std: f64, value: f64) -> f64 {
    std / value * 100.0
}
