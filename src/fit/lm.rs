//! Bounded Levenberg–Marquardt.
//!
//! Minimizes `½‖r(p)‖²` for a residual vector `r` with an analytic Jacobian.
//! Each trial step solves the damped normal equations
//!
//! ```text
//! (JᵀJ + λ D) δ = -Jᵀr,   D = diag(JᵀJ)
//! ```
//!
//! and is projected back onto the box bounds. Accepted steps shrink `λ` by ten,
//! rejected ones grow it by ten.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::fit::FitError;
use crate::math::solve_least_squares;
use crate::symbolic::ExprError;

/// A residual vector and its Jacobian as functions of the parameters.
pub trait LeastSquaresProblem {
    /// Number of parameters.
    fn params(&self) -> usize;

    fn residuals(&self, p: &[f64]) -> Result<DVector<f64>, ExprError>;

    /// `∂r_i/∂p_j`, one row per residual.
    fn jacobian(&self, p: &[f64]) -> Result<DMatrix<f64>, ExprError>;
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Gradient vanished.
    Gradient,
    /// Relative reduction of the cost fell below `ftol`.
    Cost,
    /// Step length fell below `xtol` relative to the parameters.
    Step,
    /// No improving step exists at any damping; the point is a (bounded) minimum.
    Stalled,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub params: Vec<f64>,
    /// `½‖r‖²` at `params`.
    pub cost: f64,
    pub iterations: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    pub max_iters: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub initial_lambda: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iters: 200,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-10,
            initial_lambda: 1e-3,
        }
    }
}

const MIN_LAMBDA: f64 = 1e-15;
const MAX_LAMBDA: f64 = 1e16;

fn half_norm_sq(r: &DVector<f64>) -> f64 {
    0.5 * r.norm_squared()
}

fn project(p: &mut [f64], lower: &[f64], upper: &[f64]) {
    for ((v, &lo), &hi) in p.iter_mut().zip(lower).zip(upper) {
        *v = v.max(lo).min(hi);
    }
}

impl LevenbergMarquardt {
    /// Minimize from `start`, keeping every parameter within `[lower, upper]`.
    pub fn minimize<P: LeastSquaresProblem>(
        &self,
        problem: &P,
        start: &[f64],
        lower: &[f64],
        upper: &[f64],
    ) -> Result<Report, FitError> {
        let n = problem.params();
        let mut p = start.to_vec();
        project(&mut p, lower, upper);

        let mut r = problem.residuals(&p)?;
        let mut cost = half_norm_sq(&r);
        let mut lambda = self.initial_lambda;

        for iter in 1..=self.max_iters {
            let j = problem.jacobian(&p)?;
            let g = j.transpose() * &r;
            let a = j.transpose() * &j;

            if g.amax() <= self.gtol {
                return Ok(self.report(p, cost, iter, Termination::Gradient));
            }

            loop {
                let mut damped = a.clone();
                for i in 0..n {
                    let d = if a[(i, i)] > 0.0 { a[(i, i)] } else { 1.0 };
                    damped[(i, i)] += lambda * d;
                }

                let accepted = match solve_least_squares(&damped, &(-&g)) {
                    Some(delta) => {
                        let mut trial: Vec<f64> = p.iter().zip(delta.iter()).map(|(a, b)| a + b).collect();
                        project(&mut trial, lower, upper);
                        let r_trial = problem.residuals(&trial)?;
                        let c_trial = half_norm_sq(&r_trial);
                        (c_trial.is_finite() && c_trial < cost).then_some((trial, r_trial, c_trial))
                    }
                    None => None,
                };

                if let Some((trial, r_trial, c_trial)) = accepted {
                    let reduction = cost - c_trial;
                    let step = p
                        .iter()
                        .zip(&trial)
                        .map(|(a, b)| (a - b).powi(2))
                        .sum::<f64>()
                        .sqrt();
                    let old_cost = cost;
                    p = trial;
                    r = r_trial;
                    cost = c_trial;
                    lambda = (lambda / 10.0).max(MIN_LAMBDA);
                    debug!("lm iter {iter}: cost {cost:.6e}, lambda {lambda:.1e}, step {step:.3e}");

                    if reduction <= self.ftol * old_cost {
                        return Ok(self.report(p, cost, iter, Termination::Cost));
                    }
                    let norm = p.iter().map(|v| v * v).sum::<f64>().sqrt();
                    if step <= self.xtol * (self.xtol + norm) {
                        return Ok(self.report(p, cost, iter, Termination::Step));
                    }
                    break;
                }

                lambda *= 10.0;
                if lambda > MAX_LAMBDA {
                    return Ok(self.report(p, cost, iter, Termination::Stalled));
                }
            }
        }

        Err(FitError::NotConverged {
            iterations: self.max_iters,
        })
    }

    fn report(&self, params: Vec<f64>, cost: f64, iterations: usize, termination: Termination) -> Report {
        debug!("lm stopped after {iterations} iterations ({termination:?}), cost {cost:.6e}");
        Report {
            params,
            cost,
            iterations,
            termination,
        }
    }
}
