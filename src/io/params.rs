//! Project configuration files.
//!
//! - `params.toml`: `[fit]` (a [`FitParams`]) and `[geometry]` (a [`Geometry`])
//! - `trials.toml`: `[[trials]]` entries
//!
//! A missing or empty file yields defaults, so a fresh project runs without any
//! configuration.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::domain::{FitParams, Geometry, Trials};
use crate::error::{AppError, EXIT_INPUT};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectParams {
    pub fit: FitParams,
    pub geometry: Geometry,
}

fn read_optional(path: &Path) -> Result<Option<String>, AppError> {
    match fs::read_to_string(path) {
        Ok(s) if s.trim().is_empty() => Ok(None),
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No config at {}, using defaults.", path.display());
            Ok(None)
        }
        Err(e) => Err(AppError::new(
            EXIT_INPUT,
            format!("Failed to read '{}': {e}", path.display()),
        )),
    }
}

/// Load and validate `params.toml`.
pub fn load_params(path: &Path) -> Result<ProjectParams, AppError> {
    let params = match read_optional(path)? {
        Some(text) => toml::from_str::<ProjectParams>(&text)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid params file '{}': {e}", path.display())))?,
        None => ProjectParams::default(),
    };
    Ok(ProjectParams {
        fit: params.fit.validated()?,
        geometry: params.geometry,
    })
}

/// Load `trials.toml`.
pub fn load_trials(path: &Path) -> Result<Trials, AppError> {
    match read_optional(path)? {
        Some(text) => toml::from_str(&text)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid trials file '{}': {e}", path.display()))),
        None => Ok(Trials::default()),
    }
}
