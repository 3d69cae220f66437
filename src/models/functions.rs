//! Elementary model functions (generic family).
//!
//! All functions take parameters in physical units, in catalog order.

/// `a*x + b`
pub fn linear(p: &[f64], x: f64) -> f64 {
    p[0] * x + p[1]
}

/// `a*x² + b*x + c`
pub fn parabola(p: &[f64], x: f64) -> f64 {
    (p[0] * x + p[1]) * x + p[2]
}

/// `A*exp(-½((x - μ)/σ)²) + c`
///
/// A zero width degenerates to a spike of height `A` at `μ` (and `c` elsewhere)
/// rather than producing NaN.
pub fn gaussian(p: &[f64], x: f64) -> f64 {
    let (amplitude, center, sigma, offset) = (p[0], p[1], p[2], p[3]);
    if sigma == 0.0 {
        return if x == center { amplitude + offset } else { offset };
    }
    let z = (x - center) / sigma;
    amplitude * (-0.5 * z * z).exp() + offset
}
