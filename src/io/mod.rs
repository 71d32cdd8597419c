//! Input/output helpers.
//!
//! - measurement CSV ingest + validation (`ingest`)
//! - result exports (`export`)
//! - model file read/write (`model_file`)
//! - project configuration (`params`)

pub mod export;
pub mod ingest;
pub mod model_file;
pub mod params;

pub use export::*;
pub use ingest::*;
pub use model_file::*;
pub use params::*;
