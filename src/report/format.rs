//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the orchestrator and engine stay free of presentation concerns
//! - output changes are localized

use crate::domain::{Dataset, FitStatistics, Model, ModelFamily, Parameter};
use crate::io::FitReport;
use crate::report::residual_summary;

/// Catalog listing, grouped by family.
pub fn format_model_list<'a>(models: impl IntoIterator<Item = &'a Model>) -> String {
    let mut out = String::new();
    let mut current: Option<ModelFamily> = None;

    for model in models {
        if current != Some(model.family) {
            if current.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("{}:\n", model.family.display_name()));
            current = Some(model.family);
        }
        let names: Vec<&str> = model.parameters.iter().map(|p| p.name.as_str()).collect();
        out.push_str(&format!("  {:<12} {:<10} [{}]\n", model.name, model.display_name, names.join(", ")));
    }
    out
}

/// Parameter table of a model in display units.
pub fn format_parameter_table(model: &Model) -> String {
    let mut out = String::new();
    out.push_str(&format!("Model: {} ({})\n", model.display_name, model.name));
    out.push_str(&format!(
        "  {:<22} {:>14} {:>12} {:<10} {:>10} {:>10}  vary\n",
        "name", "value", "± std", "unit", "min", "max"
    ));
    for p in &model.parameters {
        out.push_str(&format_parameter_row(p));
    }
    out
}

fn format_parameter_row(p: &Parameter) -> String {
    let std = p.std_error.map(|s| format!("{s:.4e}")).unwrap_or_else(|| "-".to_string());
    format!(
        "  {:<22} {:>14.6e} {:>12} {:<10} {:>10} {:>10}  {}\n",
        p.name,
        p.value,
        std,
        p.unit_name,
        format_bound(p.min),
        format_bound(p.max),
        if p.vary { "yes" } else { "no" }
    )
}

fn format_bound(v: f64) -> String {
    if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        format!("{v}")
    }
}

/// Fit diagnostics and parameter comparison.
pub fn format_fit_summary(stats: &FitStatistics) -> String {
    let mut out = String::new();
    out.push_str("Fit statistics:\n");
    out.push_str(&format!("  χ²            {:.6e}\n", stats.chi2));
    out.push_str(&format!("  reduced χ²    {:.6e}\n", stats.reduced_chi2));
    out.push_str(&format!("  R²            {:.6}\n", stats.r_squared));
    out.push_str(&format!("  evaluations   {}\n", stats.num_function_evaluations));
    out.push_str(&format!(
        "  time          {:.1} ms\n",
        stats.execution_time.as_secs_f64() * 1e3
    ));
    out.push_str(&format!("  stopped       {}\n", stats.convergence_message));

    out.push_str("\nParameters:\n");
    for (i, p) in stats.fitted_parameters.iter().enumerate() {
        let initial = stats.initial_parameters.get(i).map(|q| q.value);
        match (p.vary, p.std_error) {
            (true, Some(std)) => out.push_str(&format!(
                "  {:<22} {:>14.6e} ± {:<12.4e} {:<10} (init {})\n",
                p.name,
                p.value,
                std,
                p.unit_name,
                initial.map(|v| format!("{v}")).unwrap_or_else(|| "-".to_string())
            )),
            _ => out.push_str(&format!("  {:<22} {:>14.6e}   fixed        {}\n", p.name, p.value, p.unit_name)),
        }
    }
    out
}

/// Short description of the dataset and the model curve.
pub fn format_dataset_summary(dataset: &Dataset) -> String {
    let mut out = String::new();
    if dataset.is_empty() {
        out.push_str("Data: none\n");
        return out;
    }

    let x_min = dataset.x[0];
    let x_max = dataset.x[dataset.len() - 1];
    if dataset.is_loaded() {
        out.push_str(&format!(
            "Data: n={} | x=[{x_min}, {x_max}] | σy {}\n",
            dataset.len(),
            if dataset.sigma_measured { "from file" } else { "= 1 (not measured)" }
        ));
    } else {
        out.push_str(&format!("Preview grid: n={} | x=[{x_min}, {x_max}]\n", dataset.len()));
    }

    if let Some(r) = residual_summary(dataset) {
        out.push_str(&format!(
            "Residuals: rms(r/σ)={:.4} | max |r/σ|={:.4} at x={}\n",
            r.rms_weighted, r.max_weighted, r.x_at_max
        ));
    }
    out
}

/// A few evenly spaced rows of the model curve.
pub fn format_curve_preview(dataset: &Dataset, max_rows: usize) -> String {
    let mut out = String::new();
    let n = dataset.y_model.len().min(dataset.len());
    if n == 0 || max_rows == 0 {
        return out;
    }

    out.push_str(&format!("  {:>14} {:>14}\n", "x", "y_model"));
    let step = n.div_ceil(max_rows).max(1);
    let mut rows: Vec<usize> = (0..n).step_by(step).collect();
    if rows.last() != Some(&(n - 1)) {
        rows.push(n - 1);
    }
    for i in rows {
        out.push_str(&format!("  {:>14.6e} {:>14.6e}\n", dataset.x[i], dataset.y_model[i]));
    }
    out
}

/// Everything `funcfit show` prints for a saved report.
pub fn format_saved_report(report: &FitReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== {} {} report ({}) ===\n",
        report.tool, report.version, report.generated_at
    ));
    out.push_str(&format_dataset_summary(&report.dataset));

    if let Some(model) = &report.model {
        out.push('\n');
        out.push_str(&format_parameter_table(model));
    }
    if let Some(stats) = &report.fit {
        out.push('\n');
        out.push_str(&format_fit_summary(stats));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelRegistry;

    #[test]
    fn model_list_groups_by_family() {
        let text = format_model_list(ModelRegistry::global().models());
        let generic = text.find("Generic functions:").unwrap();
        let sas = text.find("Small-angle scattering:").unwrap();
        assert!(generic < sas);
        assert!(text.contains("gaussian"));
        assert!(text.contains("[I0, R, σ_R, SLD_sphere, SLD_matrix, Gauss-Hermite Degree]"));
    }

    #[test]
    fn parameter_table_marks_fixed_and_infinite_bounds() {
        let model = ModelRegistry::global().instantiate("sas_sphere").unwrap();
        let text = format_parameter_table(&model);
        assert!(text.starts_with("Model: Sphere (sas_sphere)\n"));
        let r_row = text.lines().find(|l| l.trim_start().starts_with("R ")).unwrap();
        assert!(r_row.contains("inf"));
        assert!(r_row.ends_with("yes"));
        let sld_row = text.lines().find(|l| l.contains("SLD_sphere")).unwrap();
        assert!(sld_row.ends_with("no"));
    }

    #[test]
    fn curve_preview_includes_last_point() {
        let ds = Dataset {
            x: (0..10).map(|i| i as f64).collect(),
            y_model: (0..10).map(|i| (i * i) as f64).collect(),
            ..Dataset::default()
        };
        let text = format_curve_preview(&ds, 4);
        let rows: Vec<&str> = text.lines().skip(1).collect();
        // Every third row: 0, 3, 6, 9.
        assert_eq!(rows.len(), 4);
        assert!(rows[3].contains("9.000000e0"));
        assert!(format_curve_preview(&Dataset::default(), 4).is_empty());
    }

    #[test]
    fn dataset_summary_distinguishes_preview_and_data() {
        let preview = Dataset {
            x: vec![0.0, 1.0],
            y_model: vec![0.0, 1.0],
            ..Dataset::default()
        };
        assert!(format_dataset_summary(&preview).starts_with("Preview grid: n=2"));
        assert_eq!(format_dataset_summary(&Dataset::default()), "Data: none\n");
    }
}
