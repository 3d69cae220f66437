//! Levenberg–Marquardt least squares for a single model.
//!
//! Given:
//! - observations `(x_i, y_i, σ_i)`
//! - a model `f(x; p)` available as a closure over the full parameter vector
//! - a mask of which parameters may vary
//!
//! we minimize `χ² = Σ ((y_i − f_i) / σ_i)²` over the varying parameters.
//!
//! Each iteration:
//! - builds a forward-difference Jacobian of the weighted model (columns in parallel)
//! - solves the damped step `[J; √λ·D] δ ≈ [r; 0]` by SVD
//! - accepts the step if χ² decreases (λ shrinks), otherwise grows λ and retries
//!
//! Standard errors come from `pinv(JᵀJ) · χ²_red` at the solution.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::engine::{EngineFitResult, FitRequest};
use crate::error::EngineFailure;
use crate::math::{pseudo_inverse, solve_least_squares};

/// `√ε`, the forward-difference step scale.
const EPS_SQRT: f64 = 1.4901161193847656e-8;

const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;

/// Solver tolerances and budget.
#[derive(Debug, Clone)]
pub struct LmOptions {
    /// Stop when an accepted step reduces χ² by less than this fraction.
    pub ftol: f64,
    /// Stop when an accepted step is this small relative to the parameters.
    pub xtol: f64,
    /// Initial damping.
    pub initial_lambda: f64,
    /// Model evaluation budget; `None` means `200 · (m + 1)` for `m` varying parameters.
    pub max_evaluations: Option<usize>,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            ftol: 1e-10,
            xtol: 1e-10,
            initial_lambda: 1e-3,
            max_evaluations: None,
        }
    }
}

/// Fit `request` with `model`, which maps a full parameter vector to model
/// values at `request.x`.
pub fn levenberg_marquardt<F>(model: F, request: &FitRequest, opts: &LmOptions) -> Result<EngineFitResult, EngineFailure>
where
    F: Fn(&[f64]) -> Result<Vec<f64>, EngineFailure> + Sync,
{
    validate(request)?;

    let n = request.x.len();
    let free: Vec<usize> = (0..request.p_init.len()).filter(|&i| request.vary_mask[i]).collect();
    let m = free.len();
    let max_evaluations = opts.max_evaluations.unwrap_or(200 * (m + 1));

    let mut p = request.p_init.clone();
    let mut f = eval_checked(&model, &p, n)?;
    let mut evaluations = 1usize;
    let mut r = weighted_residuals(&request.y, &f, &request.sigma_y);
    let mut chi2 = sum_sq(&r);
    if !chi2.is_finite() {
        return Err(EngineFailure::ConvergenceFailure(
            "model is not finite at the initial parameters".to_string(),
        ));
    }

    let mut lambda = opts.initial_lambda;
    let mut message: Option<&'static str> = None;

    while message.is_none() {
        if chi2 == 0.0 {
            message = Some("χ² is zero");
            break;
        }

        let jac = jacobian(&model, &p, &f, &free, &request.sigma_y)?;
        evaluations += m;
        let scales: Vec<f64> = (0..m)
            .map(|j| jac.column(j).norm().max(f64::MIN_POSITIVE.sqrt()))
            .collect();
        let rhs = augmented_rhs(&r, m);

        loop {
            if evaluations >= max_evaluations {
                message = Some("maximum number of function evaluations reached");
                break;
            }

            let a = augmented_matrix(&jac, &scales, lambda);
            let delta = solve_least_squares(&a, &rhs).ok_or_else(|| {
                EngineFailure::ConvergenceFailure("damped step could not be solved".to_string())
            })?;

            let mut p_trial = p.clone();
            for (j, &idx) in free.iter().enumerate() {
                p_trial[idx] += delta[j];
            }

            evaluations += 1;
            let trial = match eval_checked(&model, &p_trial, n) {
                Ok(values) => Some(values),
                // Steps that leave the model's domain count as failed steps.
                Err(EngineFailure::InvalidParameters(_)) => None,
                Err(e) => return Err(e),
            };
            let trial = trial.map(|values| {
                let r_trial = weighted_residuals(&request.y, &values, &request.sigma_y);
                let chi2_trial = sum_sq(&r_trial);
                (values, r_trial, chi2_trial)
            });

            match trial {
                Some((values, r_trial, chi2_trial)) if chi2_trial.is_finite() && chi2_trial < chi2 => {
                    let reduction = (chi2 - chi2_trial) / chi2;
                    let step_small = free
                        .iter()
                        .enumerate()
                        .all(|(j, &idx)| delta[j].abs() <= opts.xtol * (p[idx].abs() + opts.xtol));

                    p = p_trial;
                    f = values;
                    r = r_trial;
                    chi2 = chi2_trial;
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);

                    if reduction < opts.ftol {
                        message = Some("relative reduction of χ² below tolerance");
                    } else if step_small {
                        message = Some("relative step size below tolerance");
                    }
                    break;
                }
                _ => {
                    lambda *= 10.0;
                    if lambda > LAMBDA_MAX {
                        message = Some("no further reduction of χ² possible");
                        break;
                    }
                }
            }
        }
    }

    // Covariance at the solution.
    let jac = jacobian(&model, &p, &f, &free, &request.sigma_y)?;
    evaluations += m;
    let dof = (n - m) as f64;
    let redchi2 = chi2 / dof;
    let covariance = pseudo_inverse(&(jac.transpose() * &jac)).ok_or_else(|| {
        EngineFailure::ConvergenceFailure("covariance matrix could not be computed".to_string())
    })?;

    let mut errors = vec![0.0; p.len()];
    for (j, &idx) in free.iter().enumerate() {
        errors[idx] = (covariance[(j, j)] * redchi2).max(0.0).sqrt();
    }

    Ok(EngineFitResult {
        params: p,
        errors,
        chi2,
        redchi2,
        r_squared: r_squared(&request.y, &f),
        fitted_model: f,
        num_function_evaluations: evaluations,
        convergence_message: message.unwrap_or("stopped").to_string(),
    })
}

fn validate(request: &FitRequest) -> Result<(), EngineFailure> {
    let n = request.x.len();
    if request.y.len() != n || request.sigma_y.len() != n {
        return Err(EngineFailure::InvalidInput(format!(
            "array lengths differ: x={n}, y={}, sigma_y={}",
            request.y.len(),
            request.sigma_y.len()
        )));
    }
    if request.vary_mask.len() != request.p_init.len() {
        return Err(EngineFailure::InvalidInput(format!(
            "vary mask has {} entries for {} parameters",
            request.vary_mask.len(),
            request.p_init.len()
        )));
    }
    if request.x.iter().chain(request.y.iter()).any(|v| !v.is_finite()) {
        return Err(EngineFailure::InvalidInput("x and y must be finite".to_string()));
    }
    if request.sigma_y.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
        return Err(EngineFailure::InvalidInput("sigma_y must be finite and > 0".to_string()));
    }

    let m = request.vary_mask.iter().filter(|&&v| v).count();
    if m == 0 {
        return Err(EngineFailure::InvalidInput("no parameter is allowed to vary".to_string()));
    }
    if n <= m {
        return Err(EngineFailure::InvalidInput(format!(
            "{n} data points are not enough to fit {m} parameters"
        )));
    }
    Ok(())
}

fn eval_checked<F>(model: &F, p: &[f64], n: usize) -> Result<Vec<f64>, EngineFailure>
where
    F: Fn(&[f64]) -> Result<Vec<f64>, EngineFailure>,
{
    let values = model(p)?;
    if values.len() != n {
        return Err(EngineFailure::ConvergenceFailure(format!(
            "model returned {} values for {n} points",
            values.len()
        )));
    }
    Ok(values)
}

/// Jacobian of `f/σ` with respect to the varying parameters (`n × m`).
fn jacobian<F>(model: &F, p: &[f64], f: &[f64], free: &[usize], sigma: &[f64]) -> Result<DMatrix<f64>, EngineFailure>
where
    F: Fn(&[f64]) -> Result<Vec<f64>, EngineFailure> + Sync,
{
    let n = f.len();
    let columns: Vec<Vec<f64>> = free
        .par_iter()
        .map(|&idx| -> Result<Vec<f64>, EngineFailure> {
            let h = if p[idx] == 0.0 { EPS_SQRT } else { EPS_SQRT * p[idx].abs() };
            let mut shifted = p.to_vec();
            shifted[idx] += h;
            // Fall back to a backward difference at the edge of the model's domain.
            let (values, step) = match eval_checked(model, &shifted, n) {
                Ok(values) => (values, h),
                Err(EngineFailure::InvalidParameters(_)) => {
                    shifted[idx] = p[idx] - h;
                    (eval_checked(model, &shifted, n)?, -h)
                }
                Err(e) => return Err(e),
            };
            Ok(values
                .iter()
                .zip(f.iter())
                .zip(sigma.iter())
                .map(|((v, f0), s)| (v - f0) / (step * s))
                .collect())
        })
        .collect::<Result<_, EngineFailure>>()?;

    let mut jac = DMatrix::<f64>::zeros(n, free.len());
    for (j, column) in columns.iter().enumerate() {
        for (i, v) in column.iter().enumerate() {
            jac[(i, j)] = *v;
        }
    }
    if jac.iter().any(|v| !v.is_finite()) {
        return Err(EngineFailure::ConvergenceFailure("Jacobian is not finite".to_string()));
    }
    Ok(jac)
}

fn augmented_matrix(jac: &DMatrix<f64>, scales: &[f64], lambda: f64) -> DMatrix<f64> {
    let (n, m) = jac.shape();
    let mut a = DMatrix::<f64>::zeros(n + m, m);
    a.view_mut((0, 0), (n, m)).copy_from(jac);
    let damping = lambda.sqrt();
    for (j, s) in scales.iter().enumerate() {
        a[(n + j, j)] = damping * s;
    }
    a
}

fn augmented_rhs(r: &[f64], m: usize) -> DVector<f64> {
    DVector::from_iterator(r.len() + m, r.iter().copied().chain(std::iter::repeat_n(0.0, m)))
}

fn weighted_residuals(y: &[f64], f: &[f64], sigma: &[f64]) -> Vec<f64> {
    y.iter()
        .zip(f.iter())
        .zip(sigma.iter())
        .map(|((yi, fi), si)| (yi - fi) / si)
        .collect()
}

fn sum_sq(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// `1 − SS_res / SS_tot` on unweighted residuals; NaN for constant data.
fn r_squared(y: &[f64], f: &[f64]) -> f64 {
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let ss_tot: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    let ss_res: f64 = y.iter().zip(f.iter()).map(|(a, b)| (a - b).powi(2)).sum();
    if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { f64::NAN }
}
