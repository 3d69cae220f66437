//! Linear least squares via SVD.
//!
//! The Levenberg–Marquardt step is posed as the augmented problem
//!
//! ```text
//! minimize ‖ [J; √λ·D] δ − [r; 0] ‖²
//! ```
//!
//! which is always tall. SVD handles tall and near-rank-deficient systems
//! without forming `JᵀJ` explicitly. (Nalgebra's `QR::solve` is intended for
//! square systems and will panic for non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

/// Moore–Penrose pseudo-inverse of a square (normal-equation) matrix.
///
/// Used for the parameter covariance `(JᵀJ)⁺`; singular directions (e.g.
/// parameters the data cannot constrain) get zero variance instead of `inf`.
pub fn pseudo_inverse(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let scale = m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(f64::MIN_POSITIVE);
    m.clone().pseudo_inverse(scale * 1e-14).ok()
}
