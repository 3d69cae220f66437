//! Reporting utilities: residual summaries and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::Dataset;

/// Weighted residual summary of the model curve against observed data.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualSummary {
    pub n_points: usize,
    /// Root mean square of `(y − y_model) / σ`.
    pub rms_weighted: f64,
    /// Largest `|y − y_model| / σ` and the x where it occurs.
    pub max_weighted: f64,
    pub x_at_max: f64,
}

/// `None` unless the dataset has observed data and a matching model curve.
pub fn residual_summary(dataset: &Dataset) -> Option<ResidualSummary> {
    let n = dataset.len();
    if !dataset.is_loaded() || dataset.y_model.len() != n || dataset.sigma_y.len() != n {
        return None;
    }

    let mut sum_sq = 0.0;
    let mut max_weighted = 0.0;
    let mut x_at_max = dataset.x[0];
    for i in 0..n {
        let r = (dataset.y_observed[i] - dataset.y_model[i]) / dataset.sigma_y[i];
        sum_sq += r * r;
        if r.abs() > max_weighted {
            max_weighted = r.abs();
            x_at_max = dataset.x[i];
        }
    }

    Some(ResidualSummary {
        n_points: n,
        rms_weighted: (sum_sq / n as f64).sqrt(),
        max_weighted,
        x_at_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_needs_data_and_curve() {
        let mut ds = Dataset {
            x: vec![0.0, 1.0, 2.0],
            y_observed: vec![1.0, 2.0, 3.0],
            sigma_y: vec![1.0, 0.5, 1.0],
            sigma_measured: true,
            y_model: vec![],
        };
        assert!(residual_summary(&ds).is_none());

        ds.y_model = vec![1.0, 1.0, 3.0];
        let s = residual_summary(&ds).unwrap();
        assert_eq!(s.n_points, 3);
        assert_eq!(s.max_weighted, 2.0);
        assert_eq!(s.x_at_max, 1.0);
        assert!((s.rms_weighted - (4.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }
}
