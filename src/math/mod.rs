//! Mathematical utilities: preview grids, least squares and quadrature.

pub mod linspace;
pub mod ols;
pub mod quadrature;

pub use linspace::*;
pub use ols::*;
pub use quadrature::*;
