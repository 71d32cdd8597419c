//! Numbers with uncertainty and first-order (linear) error propagation.
//!
//! Each `UFloat` carries its nominal value and, for every independent source
//! variable (identified by a tag), the contribution `∂f/∂v · σ_v`. Combining two
//! values that share a tag therefore accounts for their correlation, and the
//! standard deviation is the quadrature sum of all contributions.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::math::Scalar;

#[derive(Debug, Clone, PartialEq)]
pub struct UFloat {
    nominal: f64,
    contributions: BTreeMap<String, f64>,
}

impl UFloat {
    /// An independent variable with standard deviation `std_dev`.
    pub fn new(nominal: f64, std_dev: f64, tag: impl Into<String>) -> Self {
        let mut contributions = BTreeMap::new();
        contributions.insert(tag.into(), std_dev);
        Self {
            nominal,
            contributions,
        }
    }

    /// A value without uncertainty.
    pub fn exact(nominal: f64) -> Self {
        Self {
            nominal,
            contributions: BTreeMap::new(),
        }
    }

    pub fn nominal_value(&self) -> f64 {
        self.nominal
    }

    pub fn std_dev(&self) -> f64 {
        self.contributions
            .values()
            .map(|c| c * c)
            .sum::<f64>()
            .sqrt()
    }

    /// Contribution of a single tagged source to the total uncertainty.
    pub fn contribution(&self, tag: &str) -> f64 {
        self.contributions.get(tag).copied().unwrap_or(0.0)
    }

    fn unary(&self, nominal: f64, derivative: f64) -> Self {
        Self {
            nominal,
            contributions: self
                .contributions
                .iter()
                .map(|(tag, c)| (tag.clone(), derivative * c))
                .collect(),
        }
    }

    fn binary(a: &Self, da: f64, b: &Self, db: f64, nominal: f64) -> Self {
        let mut contributions: BTreeMap<String, f64> = a
            .contributions
            .iter()
            .map(|(tag, c)| (tag.clone(), da * c))
            .collect();
        for (tag, c) in &b.contributions {
            *contributions.entry(tag.clone()).or_insert(0.0) += db * c;
        }
        Self {
            nominal,
            contributions,
        }
    }
}

impl fmt::Display for UFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+/-{}", self.nominal, self.std_dev())
    }
}

impl From<f64> for UFloat {
    fn from(value: f64) -> Self {
        UFloat::exact(value)
    }
}

impl Add for UFloat {
    type Output = UFloat;

    fn add(self, rhs: UFloat) -> UFloat {
        UFloat::binary(&self, 1.0, &rhs, 1.0, self.nominal + rhs.nominal)
    }
}

impl Sub for UFloat {
    type Output = UFloat;

    fn sub(self, rhs: UFloat) -> UFloat {
        UFloat::binary(&self, 1.0, &rhs, -1.0, self.nominal - rhs.nominal)
    }
}

impl Mul for UFloat {
    type Output = UFloat;

    fn mul(self, rhs: UFloat) -> UFloat {
        UFloat::binary(&self, rhs.nominal, &rhs, self.nominal, self.nominal * rhs.nominal)
    }
}

impl Div for UFloat {
    type Output = UFloat;

    fn div(self, rhs: UFloat) -> UFloat {
        let q = self.nominal / rhs.nominal;
        UFloat::binary(&self, 1.0 / rhs.nominal, &rhs, -q / rhs.nominal, q)
    }
}

impl Neg for UFloat {
    type Output = UFloat;

    fn neg(self) -> UFloat {
        self.unary(-self.nominal, -1.0)
    }
}

impl Scalar for UFloat {
    fn from_f64(value: f64) -> Self {
        UFloat::exact(value)
    }

    fn value(&self) -> f64 {
        self.nominal
    }

    fn powf(&self, exponent: &Self) -> Self {
        let v = self.nominal.powf(exponent.nominal);
        let da = exponent.nominal * self.nominal.powf(exponent.nominal - 1.0);
        // d/db a^b = a^b ln(a) only exists for positive bases.
        let db = if exponent.contributions.is_empty() || self.nominal <= 0.0 {
            0.0
        } else {
            v * self.nominal.ln()
        };
        UFloat::binary(self, da, exponent, db, v)
    }

    fn exp(&self) -> Self {
        let e = self.nominal.exp();
        self.unary(e, e)
    }

    fn ln(&self) -> Self {
        self.unary(self.nominal.ln(), 1.0 / self.nominal)
    }

    fn sqrt(&self) -> Self {
        let s = self.nominal.sqrt();
        self.unary(s, 0.5 / s)
    }

    fn sinh(&self) -> Self {
        self.unary(self.nominal.sinh(), self.nominal.cosh())
    }

    fn cosh(&self) -> Self {
        self.unary(self.nominal.cosh(), self.nominal.sinh())
    }
}
