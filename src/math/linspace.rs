//! Evenly spaced preview grids.

use crate::domain::LinspaceRange;
use crate::error::FitError;

/// Generate `range.points` values from `x_min` to `x_max` inclusive.
///
/// The step is `(x_max - x_min) / (points - 1)`; the last value is pinned to
/// `x_max` so accumulated rounding never moves the end of the grid.
pub fn linspace(range: &LinspaceRange) -> Result<Vec<f64>, FitError> {
    let n = range.points;
    if n < 2 {
        return Err(FitError::InvalidRange { count: n });
    }

    let step = (range.x_max - range.x_min) / (n as f64 - 1.0);
    let mut out: Vec<f64> = (0..n).map(|i| range.x_min + i as f64 * step).collect();
    out[n - 1] = range.x_max;
    Ok(out)
}
