//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! measurements CSV -> runs -> model file -> per-run fits
//!
//! The command handlers can then focus on presentation.

use log::info;

use crate::domain::{FitConfig, RunFit};
use crate::error::AppError;
use crate::fit::{FitError, fit_runs};
use crate::io::{IngestedData, load_measurements};
use crate::models::Model;

/// All computed outputs of a single `boiler fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub model: Model,
    /// One entry per ingested run, in the same order.
    pub results: Vec<Result<RunFit, FitError>>,
}

impl RunOutput {
    /// Successful fits only.
    pub fn fits(&self) -> impl Iterator<Item = &RunFit> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    // 1) Load and group the measurements.
    let ingest = load_measurements(&config.data_path, config.positions.as_ref())?;

    // 2) Load the derived model with this configuration's fixed values bound.
    let model = config.params.get_models(&config.models_dir)?;

    // 3) Fit every run.
    info!("Fitting {} runs from {}", ingest.runs.len(), config.data_path.display());
    let results = fit_runs(&model, &config.params, &ingest.runs);

    Ok(RunOutput { ingest, model, results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitParams, Param};
    use crate::io::write_model;
    use crate::models::derive;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn fits_every_run_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let models_dir = dir.path().join("models");
        write_model(&models_dir, derive().model()).unwrap();

        let params = FitParams::default();
        let model = Model::new(derive().model(), &params).unwrap();
        let x = [0.02, 0.04, 0.06, 0.08, 0.10];
        let data_path = dir.path().join("data.csv");
        let mut file = std::fs::File::create(&data_path).unwrap();
        writeln!(file, "run,x,y,y_err").unwrap();
        for (run, truth) in [("a", [100.0, 5e4, 20.0]), ("b", [120.0, 1.5e5, 8.0])] {
            for &xi in &x {
                writeln!(file, "{run},{xi},{},0.5", model.eval(xi, &truth).unwrap()).unwrap();
            }
        }
        writeln!(file, "a,0.12,not-a-number,0.5").unwrap();
        drop(file);

        let config = FitConfig {
            data_path,
            models_dir,
            params,
            positions: None,
            plot: false,
            plot_width: 60,
            plot_height: 20,
            show_residuals: false,
            export_results: None,
        };
        let out = run_fit(&config).unwrap();
        assert_eq!(out.ingest.rows_used, 10);
        assert_eq!(out.ingest.row_errors.len(), 1);
        assert_eq!(out.results.len(), 2);

        let fits: Vec<&RunFit> = out.fits().collect();
        assert_eq!(fits[0].run.name, "a");
        assert_relative_eq!(fits[0].fit.fits[&Param::Ts], 100.0, max_relative = 1e-5);
        assert_relative_eq!(fits[1].fit.fits[&Param::Qs], 1.5e5, max_relative = 1e-5);
    }

    #[test]
    fn missing_model_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("data.csv");
        std::fs::write(&data_path, "x,y\n0.02,100\n0.04,99\n").unwrap();
        let config = FitConfig {
            data_path,
            models_dir: dir.path().join("models"),
            params: FitParams::default(),
            positions: None,
            plot: false,
            plot_width: 60,
            plot_height: 20,
            show_residuals: false,
            export_results: None,
        };
        assert_eq!(run_fit(&config).unwrap_err().exit_code(), 2);
    }
}
