//! Read/write the derived model file.
//!
//! The model file is the portable representation of the derived expression:
//! - file format version (also part of the file name)
//! - when it was derived
//! - the piecewise temperature expression `T(x)`
//!
//! Loading it back and compiling it for a fit configuration is
//! [`FitParams::get_models`].

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::domain::FitParams;
use crate::error::{AppError, EXIT_INPUT};
use crate::models::Model;
use crate::symbolic::Expr;

/// Version of the model file layout. Bumped when `Expr` serialization changes.
pub const MODEL_FORMAT: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub format: u32,
    pub derived_at: DateTime<Utc>,
    pub model: Expr,
}

/// `modelfun-v<FORMAT>.json`
pub fn model_file_name() -> String {
    format!("modelfun-v{MODEL_FORMAT}.json")
}

pub fn model_path(dir: &Path) -> PathBuf {
    dir.join(model_file_name())
}

/// Write the model expression into `dir`, returning the file path.
pub fn write_model(dir: &Path, expr: &Expr) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("Failed to create models directory '{}': {e}", dir.display()),
        )
    })?;

    let path = model_path(dir);
    let file = File::create(&path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create model file '{}': {e}", path.display())))?;

    let contents = ModelFile {
        tool: env!("CARGO_PKG_NAME").to_string(),
        format: MODEL_FORMAT,
        derived_at: Utc::now(),
        model: expr.clone(),
    };
    serde_json::to_writer_pretty(file, &contents)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write model file: {e}")))?;

    info!("Wrote model to {}", path.display());
    Ok(path)
}

/// Read the model expression from `dir`.
pub fn read_model(dir: &Path) -> Result<Expr, AppError> {
    let path = model_path(dir);
    let file = File::open(&path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open model file '{}': {e}", path.display())))?;
    let contents: ModelFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid model file '{}': {e}", path.display())))?;

    if contents.format != MODEL_FORMAT {
        return Err(AppError::new(
            EXIT_INPUT,
            format!(
                "Model file '{}' has format {}, expected {MODEL_FORMAT}. Re-run `boiler derive`.",
                path.display(),
                contents.format
            ),
        ));
    }
    debug!("Read model derived at {}", contents.derived_at);
    Ok(contents.model)
}

impl FitParams {
    /// Load the model for fitting data.
    ///
    /// The expression is compiled with arguments `[independent, free, fixed]`
    /// and the fixed values bound, so the returned model is called with `x` and
    /// the free parameters only. It evaluates on plain floats and on
    /// uncertain values alike.
    pub fn get_models(&self, dir: &Path) -> Result<Model, AppError> {
        let expr = read_model(dir)?;
        Ok(Model::new(&expr, self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::derive;
    use approx::assert_relative_eq;

    #[test]
    fn model_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let derived = derive();
        let path = write_model(dir.path(), derived.model()).unwrap();
        assert!(path.ends_with("modelfun-v1.json"));

        let expr = read_model(dir.path()).unwrap();
        assert_eq!(&expr, derived.model());
    }

    #[test]
    fn loaded_model_evaluates() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), derive().model()).unwrap();

        let params = FitParams::default();
        let model = params.get_models(dir.path()).unwrap();
        assert_relative_eq!(model.eval(0.1, &[105.0, 2e5, 1.0]).unwrap(), 155.264706054556, epsilon = 1e-8);
    }

    #[test]
    fn missing_model_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = FitParams::default().get_models(dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("modelfun-v1.json"));
    }

    #[test]
    fn stale_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let stale = ModelFile {
            tool: "boilercore".into(),
            format: MODEL_FORMAT + 1,
            derived_at: Utc::now(),
            model: Expr::num(1.0),
        };
        let file = File::create(model_path(dir.path())).unwrap();
        serde_json::to_writer(file, &stale).unwrap();
        assert!(read_model(dir.path()).is_err());
    }
}
