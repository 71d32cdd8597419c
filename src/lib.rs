//! `boilercore` library crate.
//!
//! Models the temperature along a copper rod that is boiling water at one end
//! and cooled by air along the rest of it. The binary (`boiler`) is a thin
//! wrapper around this library so that:
//!
//! - the derivation, compiled model, and fitter are testable without spawning processes
//! - the model can be reused from other tools
//!
//! Workflow: [`models::derive`] the piecewise expression, store it with
//! [`io::write_model`], load it with [`domain::FitParams::get_models`], then fit
//! runs with [`fit::fit_runs`].

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod symbolic;
