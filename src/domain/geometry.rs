//! Rod and coupon geometry.
//!
//! Lengths are configured in inches and exposed in metres.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Inches per metre.
pub const INCHES_PER_METRE: f64 = 39.3701;

pub fn inches_to_metres(v: f64) -> f64 {
    v / INCHES_PER_METRE
}

/// The rod used in a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rod {
    W,
    X,
    Y,
    R,
}

/// The coupon attached to the rod in a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Coupon {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    A8,
    A9,
}

impl FromStr for Rod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "W" => Ok(Rod::W),
            "X" => Ok(Rod::X),
            "Y" => Ok(Rod::Y),
            "R" => Ok(Rod::R),
            other => Err(format!("unknown rod '{other}' (expected W, X, Y or R)")),
        }
    }
}

impl fmt::Display for Rod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FromStr for Coupon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            Coupon::A0,
            Coupon::A1,
            Coupon::A2,
            Coupon::A3,
            Coupon::A4,
            Coupon::A5,
            Coupon::A6,
            Coupon::A7,
            Coupon::A8,
            Coupon::A9,
        ];
        let key = s.trim().to_ascii_uppercase();
        all.into_iter()
            .find(|c| format!("{c:?}") == key)
            .ok_or_else(|| format!("unknown coupon '{s}' (expected A0..A9)"))
    }
}

impl fmt::Display for Coupon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

fn inches<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    f64::deserialize(d).map(inches_to_metres)
}

fn inches_map<'de, D, K>(d: D) -> Result<BTreeMap<K, f64>, D::Error>
where
    D: Deserializer<'de>,
    K: Deserialize<'de> + Ord,
{
    let raw = BTreeMap::<K, f64>::deserialize(d)?;
    Ok(raw.into_iter().map(|(k, v)| (k, inches_to_metres(v))).collect())
}

fn inches_vec_map<'de, D, K>(d: D) -> Result<BTreeMap<K, Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
    K: Deserialize<'de> + Ord,
{
    let raw = BTreeMap::<K, Vec<f64>>::deserialize(d)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| (k, v.into_iter().map(inches_to_metres).collect()))
        .collect())
}

/// Geometry of the test rods, in metres.
///
/// When deserialized (from `params.toml`), values are read in inches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Geometry {
    /// (m) Common diameter of all rods.
    #[serde(deserialize_with = "inches")]
    pub diameter: f64,
    /// (m) Distance of each thermocouple from the cool side of the rod,
    /// starting with TC1. The fifth thermocouple may be omitted.
    #[serde(deserialize_with = "inches_vec_map")]
    pub rods: BTreeMap<Rod, Vec<f64>>,
    /// (m) Length of each coupon.
    #[serde(deserialize_with = "inches_map")]
    pub coupons: BTreeMap<Coupon, f64>,
}

impl Default for Geometry {
    fn default() -> Self {
        let rods = [
            (Rod::X, [3.5253, 3.0500, 2.5756, 2.1006, 0.3754]),
            (Rod::Y, [3.5250, 3.0504, 2.5752, 2.1008, 0.3752]),
            (Rod::R, [4.1000, 3.6250, 3.1500, 2.6750, 0.9500]),
            (Rod::W, [3.5250, 3.0500, 2.5750, 2.1000, 0.3750]),
        ];
        let coupons = [
            (Coupon::A0, 0.000),
            (Coupon::A1, 0.766),
            (Coupon::A2, 0.770),
            (Coupon::A3, 0.769),
            (Coupon::A4, 0.746),
            (Coupon::A5, 0.734),
            (Coupon::A6, 0.750),
            (Coupon::A7, 0.753),
            (Coupon::A8, 0.753),
            (Coupon::A9, 0.553),
        ];
        Self {
            diameter: inches_to_metres(0.375),
            rods: rods
                .into_iter()
                .map(|(rod, pos)| (rod, pos.into_iter().map(inches_to_metres).collect()))
                .collect(),
            coupons: coupons
                .into_iter()
                .map(|(coupon, len)| (coupon, inches_to_metres(len)))
                .collect(),
        }
    }
}

impl Geometry {
    /// Radius of the rods, in metres.
    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    /// Thermocouple positions of a rod with a coupon attached.
    pub fn thermocouple_positions(&self, rod: Rod, coupon: Coupon) -> Option<Vec<f64>> {
        let pos = self.rods.get(&rod)?;
        let offset = self.coupons.get(&coupon)?;
        Some(pos.iter().map(|p| p + offset).collect())
    }
}
