//! The rod temperature model: symbolic derivation and compiled callables.

pub mod model;
pub mod modelfun;

pub use model::*;
pub use modelfun::*;
