//! Gauss quadrature rules via the Golub–Welsch algorithm.
//!
//! Nodes are the eigenvalues of the symmetric tridiagonal Jacobi matrix of the
//! orthogonal polynomial family; weights are `μ0 · v0²` where `v0` is the first
//! component of each normalized eigenvector and `μ0` the integral of the
//! weight function.
//!
//! - Gauss–Hermite (physicists'): `∫ f(t) e^{-t²} dt`, `μ0 = √π`
//! - Gauss–Legendre: `∫_{-1}^{1} f(t) dt`, `μ0 = 2`

use nalgebra::{DMatrix, SymmetricEigen};

/// Quadrature nodes and weights, nodes ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureRule {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

impl QuadratureRule {
    /// Apply the rule to `f`.
    pub fn integrate(&self, mut f: impl FnMut(f64) -> f64) -> f64 {
        self.nodes
            .iter()
            .zip(self.weights.iter())
            .map(|(&t, &w)| w * f(t))
            .sum()
    }

    /// Map a Gauss–Legendre rule from `[-1, 1]` onto `[a, b]`.
    pub fn scaled_to(&self, a: f64, b: f64) -> QuadratureRule {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (a + b);
        QuadratureRule {
            nodes: self.nodes.iter().map(|t| mid + half * t).collect(),
            weights: self.weights.iter().map(|w| w * half).collect(),
        }
    }
}

/// Gauss–Hermite rule with `n` nodes (`n ≥ 1`).
pub fn gauss_hermite(n: usize) -> QuadratureRule {
    golub_welsch(n, std::f64::consts::PI.sqrt(), |k| (k as f64 / 2.0).sqrt())
}

/// Gauss–Legendre rule with `n` nodes (`n ≥ 1`) on `[-1, 1]`.
pub fn gauss_legendre(n: usize) -> QuadratureRule {
    golub_welsch(n, 2.0, |k| {
        let k = k as f64;
        k / (4.0 * k * k - 1.0).sqrt()
    })
}

/// Build a rule from the off-diagonal recurrence coefficients `beta(k)`,
/// `k = 1..n-1` (all families used here have a zero diagonal).
fn golub_welsch(n: usize, mu0: f64, beta: impl Fn(usize) -> f64) -> QuadratureRule {
    let n = n.max(1);
    let mut jacobi = DMatrix::<f64>::zeros(n, n);
    for k in 1..n {
        let b = beta(k);
        jacobi[(k - 1, k)] = b;
        jacobi[(k, k - 1)] = b;
    }

    let eigen = SymmetricEigen::new(jacobi);
    let mut pairs: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let v0 = eigen.eigenvectors[(0, i)];
            (eigen.eigenvalues[i], mu0 * v0 * v0)
        })
        .collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    QuadratureRule {
        nodes: pairs.iter().map(|p| p.0).collect(),
        weights: pairs.iter().map(|p| p.1).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hermite_weights_sum_to_sqrt_pi() {
        for n in [1, 2, 5, 20] {
            let rule = gauss_hermite(n);
            let sum: f64 = rule.weights.iter().sum();
            assert!((sum - std::f64::consts::PI.sqrt()).abs() < 1e-10, "n={n}: {sum}");
        }
    }

    #[test]
    fn hermite_integrates_second_moment() {
        // ∫ t² e^{-t²} dt = √π / 2
        let rule = gauss_hermite(10);
        let v = rule.integrate(|t| t * t);
        assert!((v - std::f64::consts::PI.sqrt() / 2.0).abs() < 1e-10);
    }

    #[test]
    fn legendre_is_exact_for_low_degree_polynomials() {
        let rule = gauss_legendre(4);
        let sum: f64 = rule.weights.iter().sum();
        assert!((sum - 2.0).abs() < 1e-12);
        // ∫_{-1}^{1} t⁶ dt = 2/7, exact for n = 4 (degree ≤ 7)
        assert!((rule.integrate(|t| t.powi(6)) - 2.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn scaled_legendre_integrates_sine_on_half_period() {
        let rule = gauss_legendre(12).scaled_to(0.0, std::f64::consts::PI);
        assert!((rule.integrate(f64::sin) - 2.0).abs() < 1e-10);
    }
}
