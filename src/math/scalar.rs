//! Numeric types that symbolic expressions can be evaluated over.
//!
//! Two implementations exist:
//! - `f64` for fitting and plain forward evaluation
//! - [`UFloat`](crate::math::UFloat) for first-order uncertainty propagation

use std::ops::{Add, Div, Mul, Neg, Sub};

/// A number supporting the operations an [`Expr`](crate::symbolic::Expr) can contain.
pub trait Scalar:
    Clone
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Lift an exact constant.
    fn from_f64(value: f64) -> Self;

    /// Nominal value, used for piecewise branch selection.
    fn value(&self) -> f64;

    fn powf(&self, exponent: &Self) -> Self;
    fn exp(&self) -> Self;
    fn ln(&self) -> Self;
    fn sqrt(&self) -> Self;
    fn sinh(&self) -> Self;
    fn cosh(&self) -> Self;
}

impl Scalar for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }

    fn value(&self) -> f64 {
        *self
    }

    fn powf(&self, exponent: &Self) -> Self {
        f64::powf(*self, *exponent)
    }

    fn exp(&self) -> Self {
        f64::exp(*self)
    }

    fn ln(&self) -> Self {
        f64::ln(*self)
    }

    fn sqrt(&self) -> Self {
        f64::sqrt(*self)
    }

    fn sinh(&self) -> Self {
        f64::sinh(*self)
    }

    fn cosh(&self) -> Self {
        f64::cosh(*self)
    }
}
