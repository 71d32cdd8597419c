//! Nonlinear least-squares fitting of the rod model.
//!
//! Responsibilities:
//!
//! - bounded Levenberg–Marquardt minimization (`lm`)
//! - per-run fits with covariance and confidence-interval errors (`fitter`)
//! - fitting many runs in parallel (`batch`)

pub mod batch;
pub mod fitter;
pub mod lm;

pub use batch::*;
pub use fitter::*;
pub use lm::*;

use thiserror::Error;

use crate::symbolic::{ExprError, Param};

/// Errors from setting up or running a fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("no data points to fit")]
    EmptyData,

    #[error("length mismatch: {x} positions, {y} values, {errors} errors")]
    DimensionMismatch { x: usize, y: usize, errors: usize },

    #[error("measurement errors must be positive and finite, got {0}")]
    InvalidSigma(f64),

    #[error("no initial guess for free parameter `{0}`")]
    MissingGuess(Param),

    #[error("bounds for `{param}` are infeasible: [{lower}, {upper}]")]
    InfeasibleBounds { param: Param, lower: f64, upper: f64 },

    #[error("no convergence after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error(transparent)]
    Model(#[from] ExprError),
}
