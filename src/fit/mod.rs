//! Nonlinear least squares.
//!
//! The engine fits by Levenberg–Marquardt over the varying parameters,
//! with a parallel finite-difference Jacobian.

pub mod fitter;

pub use fitter::*;
