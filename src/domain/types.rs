//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - loaded from `params.toml`
//! - used in-memory during fitting
//! - exported to CSV/JSON

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::symbolic::Param;

/// Minimum positive value to avoid divide-by-zero for affected parameters.
pub const EPS: f64 = f64::EPSILON;
/// Minimum positive convection coefficient to avoid instability of exponents.
pub const MIN_CONVECTION_COEFF: f64 = 1e-3;
/// An initial guess not too close to zero to avoid iteration instability.
pub const INIT_CONVECTION_COEFF: f64 = 1.0;
/// Minimum temperature to avoid instability near absolute zero.
pub const MIN_TEMP: f64 = 1e-3;
/// Two-sided 95 % quantile of Student's t with one degree of freedom.
pub const CONFIDENCE_INTERVAL_95: f64 = 12.706_204_736_174_698;

/// Errors in fit configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("parameter `{0}` is both free and fixed")]
    Overlap(Param),

    #[error("parameter `{0}` is neither free, fixed, nor independent")]
    Unassigned(Param),

    #[error("no value given for parameter `{0}`")]
    MissingValue(Param),

    #[error("bounds for `{param}` are inverted: [{lower}, {upper}]")]
    InvertedBounds { param: Param, lower: f64, upper: f64 },

    #[error("invalid bound value '{0}'")]
    BoundValue(String),

    #[error("{0}")]
    Geometry(String),
}

/// One end of a bound as written in config: a number or `"inf"` / `"-inf"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundEnd {
    Num(f64),
    Text(String),
}

impl BoundEnd {
    fn resolve(&self) -> Result<f64, ParamsError> {
        match self {
            BoundEnd::Num(v) => Ok(*v),
            BoundEnd::Text(s) => match s.trim() {
                "inf" | "+inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => other.parse().map_err(|_| ParamsError::BoundValue(s.clone())),
            },
        }
    }

    fn from_f64(v: f64) -> Self {
        if v == f64::INFINITY {
            BoundEnd::Text("inf".into())
        } else if v == f64::NEG_INFINITY {
            BoundEnd::Text("-inf".into())
        } else {
            BoundEnd::Num(v)
        }
    }
}

/// Closed interval `[lower, upper]` a fitted parameter must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(BoundEnd, BoundEnd)", into = "(BoundEnd, BoundEnd)")]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    pub const UNBOUNDED: Bound = Bound {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn at_least(lower: f64) -> Self {
        Self::new(lower, f64::INFINITY)
    }
}

impl TryFrom<(BoundEnd, BoundEnd)> for Bound {
    type Error = ParamsError;

    fn try_from((lower, upper): (BoundEnd, BoundEnd)) -> Result<Self, Self::Error> {
        Ok(Bound::new(lower.resolve()?, upper.resolve()?))
    }
}

impl From<Bound> for (BoundEnd, BoundEnd) {
    fn from(b: Bound) -> Self {
        (BoundEnd::from_f64(b.lower), BoundEnd::from_f64(b.upper))
    }
}

/// Model fit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitParams {
    /// Independent parameters.
    pub independent_params: Vec<Param>,
    /// Free parameters.
    pub free_params: Vec<Param>,
    /// Parameters to fix. Evaluated before fitting, overridable in code.
    pub fixed_params: Vec<Param>,
    /// Bounds of model parameters. Only free parameter bounds are enforced.
    pub bounds: BTreeMap<Param, Bound>,
    /// Initial guesses for free parameters, constant values otherwise.
    pub values: BTreeMap<Param, f64>,
    /// Multiplier turning standard errors into reported errors.
    pub confidence_interval: f64,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            independent_params: vec![Param::X],
            free_params: vec![Param::Ts, Param::Qs, Param::Ha],
            fixed_params: vec![
                Param::Hw,
                Param::R,
                Param::TInfA,
                Param::TInfW,
                Param::Xs,
                Param::Xwa,
                Param::K,
            ],
            bounds: BTreeMap::from([
                (Param::Ts, Bound::at_least(MIN_TEMP)),
                (Param::Qs, Bound::UNBOUNDED),
                (Param::Hw, Bound::at_least(MIN_CONVECTION_COEFF)),
                (Param::Ha, Bound::at_least(MIN_CONVECTION_COEFF)),
                (Param::R, Bound::at_least(EPS)),
                (Param::TInfA, Bound::at_least(MIN_TEMP)),
                (Param::TInfW, Bound::at_least(MIN_TEMP)),
                (Param::Xs, Bound::UNBOUNDED),
                (Param::Xwa, Bound::UNBOUNDED),
                (Param::K, Bound::at_least(EPS)),
            ]),
            values: BTreeMap::from([
                (Param::Ts, 105.0),
                (Param::Qs, 2e5),
                (Param::Hw, INIT_CONVECTION_COEFF),
                (Param::Ha, INIT_CONVECTION_COEFF),
                (Param::R, 0.0047625),
                (Param::TInfA, 25.0),
                (Param::TInfW, 100.0),
                (Param::Xs, 0.0),
                // Distance from collar surface to chamber floor, plus protuberance
                (Param::Xwa, 0.0381),
                (Param::K, 400.0),
            ]),
            confidence_interval: CONFIDENCE_INTERVAL_95,
        }
    }
}

impl FitParams {
    /// Error names for each free parameter.
    pub fn errors(&self) -> Vec<String> {
        self.free_errors()
    }

    pub fn free_errors(&self) -> Vec<String> {
        self.free_params.iter().map(|p| p.error_name()).collect()
    }

    pub fn fixed_errors(&self) -> Vec<String> {
        self.fixed_params.iter().map(|p| p.error_name()).collect()
    }

    /// Fixed values for each fixed parameter.
    pub fn fixed_values(&self) -> BTreeMap<Param, f64> {
        self.values
            .iter()
            .filter(|(p, _)| self.fixed_params.contains(p))
            .map(|(&p, &v)| (p, v))
            .collect()
    }

    /// Model parameters and their errors.
    pub fn params_and_errors(&self) -> Vec<String> {
        self.free_params
            .iter()
            .chain(&self.fixed_params)
            .map(|p| p.name().to_string())
            .chain(self.free_errors())
            .chain(self.fixed_errors())
            .collect()
    }

    /// Check the configuration and nudge exact-zero initial guesses of free
    /// parameters to `EPS`.
    pub fn validated(mut self) -> Result<Self, ParamsError> {
        for p in &self.free_params {
            if self.fixed_params.contains(p) {
                return Err(ParamsError::Overlap(*p));
            }
        }
        for p in Param::ALL {
            let assigned = self.independent_params.contains(&p)
                || self.free_params.contains(&p)
                || self.fixed_params.contains(&p);
            if !assigned {
                return Err(ParamsError::Unassigned(p));
            }
        }
        for p in self.free_params.iter().chain(&self.fixed_params) {
            if !self.values.contains_key(p) {
                return Err(ParamsError::MissingValue(*p));
            }
        }
        for (&param, b) in &self.bounds {
            if b.lower > b.upper {
                return Err(ParamsError::InvertedBounds {
                    param,
                    lower: b.lower,
                    upper: b.upper,
                });
            }
        }
        for p in &self.free_params {
            if let Some(v) = self.values.get_mut(p) {
                if *v == 0.0 {
                    *v = EPS;
                }
            }
        }
        Ok(self)
    }
}

/// A single temperature measurement along the rod.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub run: String,
    /// (m) Position along the rod.
    pub x: f64,
    /// (C) Measured temperature.
    pub y: f64,
    /// (C) Standard deviation of the measurement, if known.
    pub y_err: Option<f64>,
}

/// All measurements of one run, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Present only when every measurement of the run carries an error.
    pub y_errors: Option<Vec<f64>>,
}

impl Run {
    /// Group measurements by run, keeping first-seen run order.
    pub fn group(measurements: &[Measurement]) -> Vec<Run> {
        let mut order: Vec<String> = Vec::new();
        let mut by_run: BTreeMap<String, Vec<&Measurement>> = BTreeMap::new();
        for m in measurements {
            if !by_run.contains_key(&m.run) {
                order.push(m.run.clone());
            }
            by_run.entry(m.run.clone()).or_default().push(m);
        }

        order
            .into_iter()
            .map(|name| {
                let rows = by_run.remove(&name).unwrap_or_default();
                let y_errors: Option<Vec<f64>> = rows.iter().map(|m| m.y_err).collect();
                Run {
                    x: rows.iter().map(|m| m.x).collect(),
                    y: rows.iter().map(|m| m.y).collect(),
                    y_errors,
                    name,
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Fitted values and errors of the free parameters.
///
/// Both maps are keyed by parameter; errors are reported under
/// `<param>_err` names on export. Failed fits hold `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamFit {
    pub fits: BTreeMap<Param, f64>,
    pub errors: BTreeMap<Param, f64>,
}

impl ParamFit {
    pub fn is_finite(&self) -> bool {
        self.fits.values().chain(self.errors.values()).all(|v| v.is_finite())
    }
}

/// Fit output for a single run.
#[derive(Debug, Clone)]
pub struct RunFit {
    pub run: Run,
    pub fit: ParamFit,
    /// Fixed values the model was evaluated with.
    pub fixed: BTreeMap<Param, f64>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags plus `params.toml`.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub data_path: PathBuf,
    pub models_dir: PathBuf,
    pub params: FitParams,
    /// Thermocouple name to position, for data with a `tc` column.
    pub positions: Option<BTreeMap<String, f64>>,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub show_residuals: bool,
    pub export_results: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        let params = FitParams::default().validated().unwrap();
        assert_eq!(params.errors(), vec!["T_s_err", "q_s_err", "h_a_err"]);
        assert_eq!(params.fixed_values().len(), 7);
        assert_eq!(params.params_and_errors().len(), 20);
        assert_eq!(params.params_and_errors()[0], "T_s");
        assert_eq!(params.params_and_errors()[10], "T_s_err");
    }

    #[test]
    fn overlapping_free_and_fixed_is_rejected() {
        let mut params = FitParams::default();
        params.fixed_params.push(Param::Ts);
        assert_eq!(params.validated(), Err(ParamsError::Overlap(Param::Ts)));
    }

    #[test]
    fn unassigned_parameter_is_rejected() {
        let mut params = FitParams::default();
        params.fixed_params.retain(|p| *p != Param::K);
        assert_eq!(params.validated(), Err(ParamsError::Unassigned(Param::K)));
    }

    #[test]
    fn zero_guess_is_nudged() {
        let mut params = FitParams::default();
        params.values.insert(Param::Qs, 0.0);
        let params = params.validated().unwrap();
        assert_eq!(params.values[&Param::Qs], EPS);
    }

    #[test]
    fn bounds_accept_infinity_strings() {
        let b: Bound = serde_json::from_str(r#"["-inf", 3.0]"#).unwrap();
        assert_eq!(b, Bound::new(f64::NEG_INFINITY, 3.0));
        let b: Bound = serde_json::from_str(r#"[0.001, "inf"]"#).unwrap();
        assert_eq!(b, Bound::at_least(0.001));
        assert!(serde_json::from_str::<Bound>(r#"["lots", 1.0]"#).is_err());
        assert_eq!(serde_json::to_string(&Bound::UNBOUNDED).unwrap(), r#"["-inf","inf"]"#);
    }

    #[test]
    fn runs_group_in_first_seen_order() {
        let m = |run: &str, x: f64, e: Option<f64>| Measurement {
            run: run.into(),
            x,
            y: 100.0 + x,
            y_err: e,
        };
        let runs = Run::group(&[
            m("b", 0.1, Some(1.0)),
            m("a", 0.2, None),
            m("b", 0.3, Some(1.0)),
            m("a", 0.4, Some(2.0)),
        ]);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].name, "b");
        assert_eq!(runs[0].x, vec![0.1, 0.3]);
        assert_eq!(runs[0].y_errors, Some(vec![1.0, 1.0]));
        // A run with any missing error is fit unweighted.
        assert_eq!(runs[1].y_errors, None);
    }
}
