//! Fitting many runs at once.
//!
//! Runs are independent, so they are fit in parallel. Output order always
//! matches input order.

use log::info;
use rayon::prelude::*;

use crate::domain::{FitParams, Run, RunFit};
use crate::fit::{FitError, fit_from_params};
use crate::models::Model;

/// Fit each run; a run that cannot be fit at all yields its error in place.
pub fn fit_runs(model: &Model, params: &FitParams, runs: &[Run]) -> Vec<Result<RunFit, FitError>> {
    let fixed = params.fixed_values();
    let results: Vec<Result<RunFit, FitError>> = runs
        .par_iter()
        .map(|run| {
            let fit = fit_from_params(model, params, &run.x, &run.y, run.y_errors.as_deref())?;
            Ok(RunFit {
                run: run.clone(),
                fit,
                fixed: fixed.clone(),
            })
        })
        .collect();

    let ok = results.iter().filter(|r| r.as_ref().is_ok_and(|f| f.fit.is_finite())).count();
    info!("Fit {ok} of {} runs with finite errors.", runs.len());
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Param;
    use crate::models::derive;
    use approx::assert_relative_eq;

    #[test]
    fn fits_runs_in_input_order() {
        let params = FitParams::default();
        let model = Model::new(derive().model(), &params).unwrap();
        let x: Vec<f64> = vec![0.02, 0.04, 0.06, 0.08, 0.10];
        let truths = [[100.0, 5e4, 20.0], [120.0, 1.5e5, 8.0], [110.0, 9e4, 12.0]];
        let mut runs: Vec<Run> = truths
            .iter()
            .enumerate()
            .map(|(i, t)| Run {
                name: format!("run-{i}"),
                x: x.clone(),
                y: model.eval_many(&x, t).unwrap(),
                y_errors: Some(vec![0.5; x.len()]),
            })
            .collect();
        runs.push(Run {
            name: "empty".into(),
            x: vec![],
            y: vec![],
            y_errors: None,
        });

        let results = fit_runs(&model, &params, &runs);
        assert_eq!(results.len(), 4);
        for (i, truth) in truths.iter().enumerate() {
            let fit = results[i].as_ref().unwrap();
            assert_eq!(fit.run.name, format!("run-{i}"));
            assert_relative_eq!(fit.fit.fits[&Param::Ts], truth[0], max_relative = 1e-4);
            assert_eq!(fit.fixed.len(), 7);
        }
        assert_eq!(results[3].as_ref().unwrap_err(), &FitError::EmptyData);
    }
}
