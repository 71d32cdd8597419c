//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - fit configuration (`FitParams`, `Bound`) and its defaults
//! - measurements grouped into runs (`Measurement`, `Run`)
//! - fit outputs (`ParamFit`, `RunFit`)
//! - experiment layout (`Geometry`, `Trial`)

pub mod geometry;
pub mod trials;
pub mod types;

pub use geometry::*;
pub use trials::*;
pub use types::*;

pub use crate::symbolic::Param;
