//! Reporting utilities: residuals, model error bands, and formatted output.

pub mod format;

pub use format::*;

use std::collections::BTreeMap;

use crate::domain::{Param, RunFit};
use crate::error::{AppError, EXIT_NUMERIC};
use crate::math::UFloat;
use crate::models::Model;
use crate::symbolic::ExprError;

/// Fitted temperature at one measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    pub x: f64,
    pub y_obs: f64,
    pub y_fit: f64,
    pub residual: f64,
}

/// Model evaluated over a grid with its one-standard-deviation band.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBand {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub y_min: Vec<f64>,
    pub y_max: Vec<f64>,
}

/// Parameters as uncertain values, each tagged with its own name.
///
/// Parameters without an entry in `errors` are exact.
pub fn combine_params_and_errors(
    params: &BTreeMap<Param, f64>,
    errors: &BTreeMap<Param, f64>,
) -> BTreeMap<Param, UFloat> {
    params
        .iter()
        .map(|(&p, &v)| {
            let err = errors.get(&p).copied().unwrap_or(0.0);
            (p, UFloat::new(v, err, p.name()))
        })
        .collect()
}

/// Evaluate the model over `xs` and return `y` with `y ± σ` bounds.
pub fn get_model_with_error(
    model: &Model,
    xs: &[f64],
    params: &BTreeMap<Param, f64>,
    errors: &BTreeMap<Param, f64>,
) -> Result<ModelBand, ExprError> {
    let values = combine_params_and_errors(params, errors);
    let mut band = ModelBand {
        x: xs.to_vec(),
        y: Vec::with_capacity(xs.len()),
        y_min: Vec::with_capacity(xs.len()),
        y_max: Vec::with_capacity(xs.len()),
    };
    for &x in xs {
        let u = model.eval_uncertain(UFloat::new(x, 0.0, Param::X.name()), &values)?;
        let (y, sd) = (u.nominal_value(), u.std_dev());
        band.y.push(y);
        band.y_min.push(y - sd);
        band.y_max.push(y + sd);
    }
    Ok(band)
}

/// Fitted values and residuals for each measurement of a run.
pub fn compute_residuals(model: &Model, fit: &RunFit) -> Result<Vec<Residual>, AppError> {
    let mut values = fit.fixed.clone();
    values.extend(fit.fit.fits.iter().map(|(&p, &v)| (p, v)));

    let mut out = Vec::with_capacity(fit.run.len());
    for (&x, &y_obs) in fit.run.x.iter().zip(&fit.run.y) {
        let y_fit = model.eval_with(x, &values)?;
        if !y_fit.is_finite() {
            return Err(AppError::new(
                EXIT_NUMERIC,
                format!("Non-finite model prediction at x = {x} for run '{}'.", fit.run.name),
            ));
        }
        out.push(Residual {
            x,
            y_obs,
            y_fit,
            residual: y_obs - y_fit,
        });
    }
    Ok(out)
}
