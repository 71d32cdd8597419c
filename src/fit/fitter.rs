//! Fitting the rod model to one run of measurements.
//!
//! Given:
//! - thermocouple positions `x_i`
//! - measured temperatures `y_i`
//! - optional measurement standard deviations `σ_i`
//!
//! we minimize `Σ ((T(x_i; p) - y_i) / σ_i)²` over the free parameters `p`
//! within their bounds, then estimate the parameter covariance from the
//! Jacobian at the solution.
//!
//! Fits that fail to converge, or whose errors cannot be estimated, are
//! reported as `NaN` rather than as errors.

use std::collections::BTreeMap;

use log::warn;
use nalgebra::{DMatrix, DVector};

use crate::domain::{Bound, FitParams, ParamFit};
use crate::fit::{FitError, LeastSquaresProblem, LevenbergMarquardt};
use crate::math::covariance_from_jacobian;
use crate::models::Model;
use crate::symbolic::{ExprError, Param};

/// Weighted residuals of the model against one run.
struct RunProblem<'a> {
    model: &'a Model,
    x: &'a [f64],
    y: &'a [f64],
    weights: Vec<f64>,
}

impl LeastSquaresProblem for RunProblem<'_> {
    fn params(&self) -> usize {
        self.model.free_params().len()
    }

    fn residuals(&self, p: &[f64]) -> Result<DVector<f64>, ExprError> {
        let mut r = DVector::zeros(self.x.len());
        for (i, (&x, &y)) in self.x.iter().zip(self.y).enumerate() {
            r[i] = (self.model.eval(x, p)? - y) * self.weights[i];
        }
        Ok(r)
    }

    fn jacobian(&self, p: &[f64]) -> Result<DMatrix<f64>, ExprError> {
        let n = self.params();
        let mut j = DMatrix::zeros(self.x.len(), n);
        let mut row = vec![0.0; n];
        for (i, &x) in self.x.iter().enumerate() {
            self.model.gradient(x, p, &mut row)?;
            for (k, v) in row.iter().enumerate() {
                j[(i, k)] = v * self.weights[i];
            }
        }
        Ok(j)
    }
}

/// Compose initial guesses in `free_params` order.
pub fn get_guesses(free_params: &[Param], values: &BTreeMap<Param, f64>) -> Result<Vec<f64>, FitError> {
    free_params
        .iter()
        .map(|p| values.get(p).copied().ok_or(FitError::MissingGuess(*p)))
        .collect()
}

/// Compose bounds in `free_params` order, unbounded where none is given.
pub fn get_bounds(free_params: &[Param], bounds: &BTreeMap<Param, Bound>) -> Result<Vec<Bound>, FitError> {
    free_params
        .iter()
        .map(|p| {
            let b = bounds.get(p).copied().unwrap_or(Bound::UNBOUNDED);
            if b.lower > b.upper || b.lower.is_nan() || b.upper.is_nan() {
                return Err(FitError::InfeasibleBounds {
                    param: *p,
                    lower: b.lower,
                    upper: b.upper,
                });
            }
            Ok(b)
        })
        .collect()
}

/// Fit the model's free parameters to `(x, y)`.
///
/// With `y_errors`, residuals are weighted by `1/σ` and the covariance is
/// taken as absolute. Without, the covariance is scaled by the residual
/// variance `SSE / (n - p)`, which is infinite when `n <= p`.
///
/// Returns `(fits, errors)` in the model's free parameter order, where
/// `errors = sqrt(diag(cov)) * confidence_interval`. Parameters whose error is
/// infinite are `NaN` in both.
pub fn fit(
    model: &Model,
    initial_values: &BTreeMap<Param, f64>,
    bounds: &BTreeMap<Param, Bound>,
    x: &[f64],
    y: &[f64],
    y_errors: Option<&[f64]>,
    confidence_interval: f64,
) -> Result<(Vec<f64>, Vec<f64>), FitError> {
    fit_with(
        &LevenbergMarquardt::default(),
        model,
        initial_values,
        bounds,
        x,
        y,
        y_errors,
        confidence_interval,
    )
}

/// [`fit`] with an explicitly configured solver.
///
/// A solver that runs out of iterations yields `NaN` fits and errors.
#[allow(clippy::too_many_arguments)]
pub fn fit_with(
    solver: &LevenbergMarquardt,
    model: &Model,
    initial_values: &BTreeMap<Param, f64>,
    bounds: &BTreeMap<Param, Bound>,
    x: &[f64],
    y: &[f64],
    y_errors: Option<&[f64]>,
    confidence_interval: f64,
) -> Result<(Vec<f64>, Vec<f64>), FitError> {
    let free = model.free_params();
    let n_free = free.len();

    if x.len() != y.len() || y_errors.is_some_and(|e| e.len() != y.len()) {
        return Err(FitError::DimensionMismatch {
            x: x.len(),
            y: y.len(),
            errors: y_errors.map_or(y.len(), <[f64]>::len),
        });
    }
    if x.is_empty() {
        return Err(FitError::EmptyData);
    }

    let weights = match y_errors {
        Some(errors) => {
            if let Some(&bad) = errors.iter().find(|e| !(e.is_finite() && **e > 0.0)) {
                return Err(FitError::InvalidSigma(bad));
            }
            errors.iter().map(|e| 1.0 / e).collect()
        }
        None => vec![1.0; y.len()],
    };

    let guesses = get_guesses(free, initial_values)?;
    let bounds = get_bounds(free, bounds)?;
    let lower: Vec<f64> = bounds.iter().map(|b| b.lower).collect();
    let upper: Vec<f64> = bounds.iter().map(|b| b.upper).collect();

    let problem = RunProblem {
        model,
        x,
        y,
        weights,
    };

    let report = match solver.minimize(&problem, &guesses, &lower, &upper) {
        Ok(report) => report,
        Err(FitError::NotConverged { iterations }) => {
            warn!("Fit did not converge after {iterations} iterations; reporting NaN.");
            return Ok((vec![f64::NAN; n_free], vec![f64::NAN; n_free]));
        }
        Err(e) => return Err(e),
    };

    let jacobian = problem.jacobian(&report.params)?;
    // A rank-deficient Jacobian leaves every variance infinite, not just the
    // degenerate directions, so all parameters of such a fit come back `NaN`.
    let mut cov = covariance_from_jacobian(&jacobian);
    if y_errors.is_none() {
        let dof = x.len().saturating_sub(n_free);
        if dof == 0 {
            cov.fill(f64::INFINITY);
        } else {
            cov *= 2.0 * report.cost / dof as f64;
        }
    }

    let mut fits = report.params;
    let mut errors: Vec<f64> = (0..n_free)
        .map(|i| cov[(i, i)].sqrt() * confidence_interval)
        .collect();
    for (fit, err) in fits.iter_mut().zip(errors.iter_mut()) {
        if err.is_infinite() {
            *fit = f64::NAN;
            *err = f64::NAN;
        }
    }
    if fits.iter().any(|v| v.is_nan()) {
        warn!("Fit errors could not be estimated for some parameters; reporting NaN.");
    }

    Ok((fits, errors))
}

/// [`fit`] with guesses, bounds and confidence interval taken from `params`.
pub fn fit_from_params(
    model: &Model,
    params: &FitParams,
    x: &[f64],
    y: &[f64],
    y_errors: Option<&[f64]>,
) -> Result<ParamFit, FitError> {
    let (fits, errors) = fit(
        model,
        &params.values,
        &params.bounds,
        x,
        y,
        y_errors,
        params.confidence_interval,
    )?;
    let free = model.free_params();
    Ok(ParamFit {
        fits: free.iter().copied().zip(fits).collect(),
        errors: free.iter().copied().zip(errors).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inches_to_metres;
    use crate::models::derive;
    use approx::assert_relative_eq;

    fn model() -> Model {
        Model::new(derive().model(), &FitParams::default()).unwrap()
    }

    /// Thermocouple positions of rod R without a coupon.
    fn positions() -> Vec<f64> {
        [4.1, 3.625, 3.15, 2.675, 0.95].map(inches_to_metres).to_vec()
    }

    fn sigma() -> Vec<f64> {
        [2.2, 2.2, 2.2, 2.2, 1.0].map(|s| s / 10f64.sqrt()).to_vec()
    }

    #[test]
    fn recovers_noiseless_parameters() {
        let m = model();
        let x = positions();
        let params = FitParams::default();
        for truth in [[100.0, 5e4, 20.0], [120.0, 1.5e5, 8.0]] {
            let y = m.eval_many(&x, &truth).unwrap();
            let fit = fit_from_params(&m, &params, &x, &y, Some(&sigma()[..])).unwrap();
            assert_relative_eq!(fit.fits[&Param::Ts], truth[0], max_relative = 1e-4);
            assert_relative_eq!(fit.fits[&Param::Qs], truth[1], max_relative = 1e-3);
            assert_relative_eq!(fit.fits[&Param::Ha], truth[2], max_relative = 1e-3);
            assert!(fit.is_finite());
        }
    }

    #[test]
    fn fits_measured_run() {
        let m = model();
        let y = [108.00, 106.20, 105.50, 104.40, 102.00];
        let fit = fit_from_params(&m, &FitParams::default(), &positions(), &y, Some(&sigma()[..])).unwrap();
        assert_relative_eq!(fit.fits[&Param::Ts], 100.98284, epsilon = 1e-2);
        assert_relative_eq!(fit.fits[&Param::Qs], 16908.035, max_relative = 1e-2);
        assert_relative_eq!(fit.fits[&Param::Ha], 13.63544, max_relative = 2e-2);

        let ci = FitParams::default().confidence_interval;
        assert_relative_eq!(fit.errors[&Param::Ts], 0.717 * ci, max_relative = 5e-2);
        assert_relative_eq!(fit.errors[&Param::Qs], 8820.5 * ci, max_relative = 5e-2);
    }

    /// `Σ ((T(x) - y) / σ)²` at the given free parameters.
    fn chi_squared(m: &Model, y: &[f64], free: &[f64]) -> f64 {
        positions()
            .iter()
            .zip(y)
            .zip(sigma())
            .map(|((&x, &y), s)| ((m.eval(x, free).unwrap() - y) / s).powi(2))
            .sum()
    }

    #[test]
    fn fits_improve_on_reference_parameters() {
        let m = model();
        let runs = [
            ([93.91, 93.28, 94.48, 94.84, 96.30], [97.74, -22269.14, 11.66]),
            ([108.00, 106.20, 105.50, 104.40, 102.00], [100.98, 16796.62, 13.80]),
            ([165.7, 156.8, 149.2, 141.1, 116.4], [105.00, 202199.76, 32.20]),
        ];
        for (y, reference) in runs {
            let fit = fit_from_params(&m, &FitParams::default(), &positions(), &y, Some(&sigma()[..])).unwrap();
            let fitted: Vec<f64> = m.free_params().iter().map(|p| fit.fits[p]).collect();
            assert!(fitted.iter().all(|v| v.is_finite()));
            assert!(chi_squared(&m, &y, &fitted) <= chi_squared(&m, &y, &reference));
        }
    }

    #[test]
    fn unconverged_fit_is_nan() {
        let m = model();
        let params = FitParams::default();
        let y = [108.00, 106.20, 105.50, 104.40, 102.00];
        let solver = LevenbergMarquardt {
            max_iters: 1,
            ..LevenbergMarquardt::default()
        };
        let (fits, errors) = fit_with(
            &solver,
            &m,
            &params.values,
            &params.bounds,
            &positions(),
            &y,
            Some(&sigma()[..]),
            params.confidence_interval,
        )
        .unwrap();
        assert_eq!(fits.len(), 3);
        assert!(fits.iter().all(|v| v.is_nan()));
        assert!(errors.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn hot_run_fits_within_bounds() {
        let m = model();
        let y = [165.7, 156.8, 149.2, 141.1, 116.4];
        let fit = fit_from_params(&m, &FitParams::default(), &positions(), &y, Some(&sigma()[..])).unwrap();
        assert_relative_eq!(fit.fits[&Param::Ts], 103.36511, epsilon = 5e-2);
        assert_relative_eq!(fit.fits[&Param::Qs], 216022.56, max_relative = 1e-2);
        assert!(fit.fits[&Param::Ha] >= 1e-3);
    }

    #[test]
    fn unweighted_covariance_scales_with_residuals() {
        let m = model();
        let x = positions();
        let y = [108.00, 106.20, 105.50, 104.40, 102.00];
        let params = FitParams::default();
        let unit = [1.0; 5];

        let (fits, errors) = fit(&m, &params.values, &params.bounds, &x, &y, None, 1.0).unwrap();
        let (abs_fits, abs_errors) =
            fit(&m, &params.values, &params.bounds, &x, &y, Some(&unit[..]), 1.0).unwrap();

        let sse: f64 = x
            .iter()
            .zip(&y)
            .map(|(&xi, &yi)| (m.eval(xi, &fits).unwrap() - yi).powi(2))
            .sum();
        let scale = (sse / (x.len() - fits.len()) as f64).sqrt();
        for i in 0..fits.len() {
            assert_relative_eq!(fits[i], abs_fits[i]);
            assert_relative_eq!(errors[i], abs_errors[i] * scale, max_relative = 1e-9);
        }
    }

    #[test]
    fn too_few_points_without_sigma_gives_nan() {
        let m = model();
        let x = &positions()[..3];
        let y = [108.0, 106.2, 105.5];
        let params = FitParams::default();
        let (fits, errors) = fit(&m, &params.values, &params.bounds, x, &y, None, 1.0).unwrap();
        assert!(fits.iter().all(|v| v.is_nan()));
        assert!(errors.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rejects_bad_input() {
        let m = model();
        let params = FitParams::default();
        let fit_xy = |x: &[f64], y: &[f64], e: Option<&[f64]>| {
            fit(&m, &params.values, &params.bounds, x, y, e, 1.0)
        };
        assert_eq!(fit_xy(&[], &[], None), Err(FitError::EmptyData));
        assert!(matches!(
            fit_xy(&[0.01, 0.02], &[100.0], None),
            Err(FitError::DimensionMismatch { .. })
        ));
        assert_eq!(
            fit_xy(&[0.01], &[100.0], Some(&[0.0][..])),
            Err(FitError::InvalidSigma(0.0))
        );
    }

    #[test]
    fn missing_guess_is_an_error() {
        let m = model();
        let mut params = FitParams::default();
        params.values.remove(&Param::Ha);
        assert_eq!(
            fit(&m, &params.values, &params.bounds, &positions(), &[100.0; 5], None, 1.0),
            Err(FitError::MissingGuess(Param::Ha))
        );
    }
}
