//! Symbol groups for the rod heat-conduction model.
//!
//! `params` are the model's inputs, `intermediate_vars` only appear while the
//! model is being derived, and `functions` name the temperature profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::symbolic::{Expr, Symbol};

/// Model parameters, including the independent variable `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Param {
    /// (m) Independent variable.
    #[serde(rename = "x")]
    X,
    /// (C) Surface temperature of the sample rod at the boiling surface.
    #[serde(rename = "T_s")]
    Ts,
    /// (W/m^2) Heat flux at the water-side surface of the sample rod.
    #[serde(rename = "q_s")]
    Qs,
    /// (W/m^2-K) Radial convection heat transfer coefficient outside the water.
    #[serde(rename = "h_a")]
    Ha,
    /// (W/m^2-K) Radial convection heat transfer coefficient in the water.
    #[serde(rename = "h_w")]
    Hw,
    /// (m) Radius of the sample rod.
    #[serde(rename = "r")]
    R,
    /// (C) Ambient temperature.
    #[serde(rename = "T_infa")]
    TInfA,
    /// (C) Water-side ambient temperature.
    #[serde(rename = "T_infw")]
    TInfW,
    /// (m) Coordinate of the boiling surface of the sample rod.
    #[serde(rename = "x_s")]
    Xs,
    /// (m) Coordinate of the chamber floor, with water in the chamber and air outside.
    #[serde(rename = "x_wa")]
    Xwa,
    /// (W/m-K) Thermal conductivity of the sample rod.
    #[serde(rename = "k")]
    K,
}

impl Param {
    pub const ALL: [Param; 11] = [
        Param::X,
        Param::Ts,
        Param::Qs,
        Param::Ha,
        Param::Hw,
        Param::R,
        Param::TInfA,
        Param::TInfW,
        Param::Xs,
        Param::Xwa,
        Param::K,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Param::X => "x",
            Param::Ts => "T_s",
            Param::Qs => "q_s",
            Param::Ha => "h_a",
            Param::Hw => "h_w",
            Param::R => "r",
            Param::TInfA => "T_infa",
            Param::TInfW => "T_infw",
            Param::Xs => "x_s",
            Param::Xwa => "x_wa",
            Param::K => "k",
        }
    }

    /// Name of the matching error column, e.g. `T_s_err`.
    pub fn error_name(self) -> String {
        format!("{}_err", self.name())
    }

    pub fn unit(self) -> &'static str {
        match self {
            Param::X | Param::R | Param::Xs | Param::Xwa => "m",
            Param::Ts | Param::TInfA | Param::TInfW => "C",
            Param::Qs => "W/m^2",
            Param::Ha | Param::Hw => "W/m^2-K",
            Param::K => "W/m-K",
        }
    }

    pub fn symbol(self) -> Symbol {
        Symbol::new(self.name())
    }

    pub fn expr(self) -> Expr {
        Expr::Sym(self.symbol())
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Param {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Param::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown model parameter '{s}'"))
    }
}

/// Symbols that only exist during derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intermediate {
    /// (W/m^2-K) Convection heat transfer coefficient.
    H,
    /// (W/m^2) Heat flux at origin of a general domain.
    Q0,
    /// (W/m^2) Heat flux at the water-air domain interface.
    Qwa,
    /// (C) Temperature at origin of a general domain.
    T0,
    /// (C) Ambient temperature.
    TInf,
    /// (C) Temperature at water-air domain interface.
    Twa,
    /// (m) Origin of a general domain.
    X0,
}

impl Intermediate {
    pub const ALL: [Intermediate; 7] = [
        Intermediate::H,
        Intermediate::Q0,
        Intermediate::Qwa,
        Intermediate::T0,
        Intermediate::TInf,
        Intermediate::Twa,
        Intermediate::X0,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Intermediate::H => "h",
            Intermediate::Q0 => "q_0",
            Intermediate::Qwa => "q_wa",
            Intermediate::T0 => "T_0",
            Intermediate::TInf => "T_inf",
            Intermediate::Twa => "T_wa",
            Intermediate::X0 => "x_0",
        }
    }

    pub fn symbol(self) -> Symbol {
        Symbol::new(self.name())
    }

    pub fn expr(self) -> Expr {
        Expr::Sym(self.symbol())
    }
}

/// Named temperature profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// The general solution to the ODE.
    General,
    /// Solution in air.
    Air,
    /// Solution in water.
    Water,
    /// Piecewise combination of the water and air solutions.
    Piecewise,
}

impl Profile {
    pub const ALL: [Profile; 4] = [Profile::General, Profile::Air, Profile::Water, Profile::Piecewise];

    pub fn name(self) -> &'static str {
        match self {
            Profile::General => "T*",
            Profile::Air => "T_a",
            Profile::Water => "T_w",
            Profile::Piecewise => "T",
        }
    }
}

/// Declared names of each symbol group.
pub const PARAMS: [&str; 11] = [
    "x", "T_s", "q_s", "h_a", "h_w", "r", "T_infa", "T_infw", "x_s", "x_wa", "k",
];
pub const INTERMEDIATE_VARS: [&str; 7] = ["h", "q_0", "q_wa", "T_0", "T_inf", "T_wa", "x_0"];
pub const FUNCTIONS: [&str; 4] = ["T*", "T_a", "T_w", "T"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_match_declared_names() {
        let names: Vec<&str> = Param::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(names, PARAMS);
        for p in Param::ALL {
            assert_eq!(p.name().parse::<Param>().unwrap(), p);
            assert_eq!(p.symbol().name(), p.name());
        }
    }

    #[test]
    fn intermediate_vars_match_declared_names() {
        let names: Vec<&str> = Intermediate::ALL.iter().map(|v| v.name()).collect();
        assert_eq!(names, INTERMEDIATE_VARS);
    }

    #[test]
    fn functions_match_declared_names() {
        let names: Vec<&str> = Profile::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names, FUNCTIONS);
    }

    #[test]
    fn param_serde_uses_symbol_names() {
        let json = serde_json::to_string(&Param::TInfW).unwrap();
        assert_eq!(json, "\"T_infw\"");
        assert!("T_bogus".parse::<Param>().is_err());
        assert_eq!(Param::Qs.error_name(), "q_s_err");
    }
}
