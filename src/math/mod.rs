//! Numerical building blocks: scalar abstraction, uncertain numbers, and
//! dense least squares.

pub mod ols;
pub mod scalar;
pub mod uncertain;

pub use ols::*;
pub use scalar::*;
pub use uncertain::*;
