//! Experimental trials and their thermocouple layout.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Coupon, Geometry, ParamsError, Rod};

/// The group that a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Control,
    Porous,
    Hybrid,
}

/// How parts of the sample are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Joint {
    Paste,
    Epoxy,
    Solder,
    None,
}

/// The sample attached to the coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sample {
    B3,
}

fn yes() -> bool {
    true
}

/// A trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub date: NaiveDate,
    pub group: Group,
    pub rod: Rod,
    pub coupon: Coupon,
    #[serde(default)]
    pub sample: Option<Sample>,
    pub joint: Joint,
    /// Whether the boiling curve is good.
    #[serde(default = "yes")]
    pub good: bool,
    /// Whether this trial should be plotted.
    #[serde(default)]
    pub plot: bool,
    #[serde(default)]
    pub comment: String,
}

impl Trial {
    /// Position of each named thermocouple, `rod[i] + coupon`.
    ///
    /// `names` must match the rod's thermocouple count exactly.
    pub fn thermocouple_pos(
        &self,
        geometry: &Geometry,
        names: &[&str],
    ) -> Result<BTreeMap<String, f64>, ParamsError> {
        let pos = geometry
            .thermocouple_positions(self.rod, self.coupon)
            .ok_or_else(|| {
                ParamsError::Geometry(format!(
                    "no geometry for rod {} with coupon {}",
                    self.rod, self.coupon
                ))
            })?;
        if pos.len() != names.len() {
            return Err(ParamsError::Geometry(format!(
                "rod {} has {} thermocouples, got {} names",
                self.rod,
                pos.len(),
                names.len()
            )));
        }
        Ok(names.iter().map(|n| n.to_string()).zip(pos).collect())
    }
}

/// The trials file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trials {
    #[serde(default)]
    pub trials: Vec<Trial>,
}

impl Trials {
    pub fn on(&self, date: NaiveDate) -> Option<&Trial> {
        self.trials.iter().find(|t| t.date == date)
    }
}

/// Default thermocouple names, TC1 first.
pub const COPPER_TEMPS: [&str; 5] = ["T_1", "T_2", "T_3", "T_4", "T_5"];
