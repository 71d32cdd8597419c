//! Command-line parsing for the rod model tools.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{Coupon, Param, Rod};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "boiler", version, about = "Rod heat-conduction model: derive, evaluate, and fit")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project parameters file.
    #[arg(long, global = true, default_value = "params.toml")]
    pub params: PathBuf,

    /// Directory holding the derived model file.
    #[arg(long, global = true, default_value = "models")]
    pub models: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Derive the piecewise model and write the model file.
    Derive(DeriveArgs),
    /// Evaluate the model over a range of positions.
    Eval(EvalArgs),
    /// Fit the model to measured temperatures, print fits, and optionally plot/export.
    Fit(FitArgs),
    /// Write synthetic measurements generated from the model.
    Sample(SampleArgs),
}

#[derive(Debug, Args, Clone)]
pub struct DeriveArgs {
    /// Print every intermediate expression of the derivation.
    #[arg(long)]
    pub print: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EvalArgs {
    /// Start of the position range (m).
    #[arg(long, default_value_t = 0.0)]
    pub from: f64,

    /// End of the position range (m).
    #[arg(long, default_value_t = 0.1)]
    pub to: f64,

    /// Number of positions.
    #[arg(short = 'n', long, default_value_t = 11)]
    pub points: usize,

    /// Override a parameter value, e.g. `--set h_a=20`. Repeatable.
    #[arg(long = "set", value_name = "PARAM=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(Param, f64)>,
}

/// Where thermocouple positions come from.
#[derive(Debug, Args, Clone)]
pub struct LayoutArgs {
    /// Rod the thermocouples are in.
    #[arg(long)]
    pub rod: Option<Rod>,

    /// Coupon attached to the rod.
    #[arg(long)]
    pub coupon: Option<Coupon>,

    /// Take rod and coupon from this trial's entry in the trials file.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub trial: Option<NaiveDate>,

    /// Trials file.
    #[arg(long, default_value = "trials.toml")]
    pub trials: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Measurement CSV (`run`, `x` or `tc`, `y`, optional `y_err`).
    #[arg(long, value_name = "CSV")]
    pub data: PathBuf,

    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Override an initial guess or fixed value, e.g. `--set k=390`. Repeatable.
    #[arg(long = "set", value_name = "PARAM=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(Param, f64)>,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Print measured vs fitted temperatures for each run.
    #[arg(long)]
    pub residuals: bool,

    /// Export per-run results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output CSV.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Set a true parameter value, e.g. `--set q_s=5e4`. Repeatable.
    #[arg(long = "set", value_name = "PARAM=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(Param, f64)>,

    /// Measurement noise standard deviation (C).
    #[arg(long, default_value_t = 0.5)]
    pub noise: f64,

    /// Number of runs to generate.
    #[arg(long, default_value_t = 3)]
    pub runs: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Parse `PARAM=VALUE`.
pub fn parse_assignment(s: &str) -> Result<(Param, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PARAM=VALUE, got '{s}'"))?;
    let param: Param = name.trim().parse()?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value for {param}: '{}'", value.trim()))?;
    Ok((param, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignments() {
        assert_eq!(parse_assignment("h_a=20").unwrap(), (Param::Ha, 20.0));
        assert_eq!(parse_assignment(" q_s = 5e4 ").unwrap(), (Param::Qs, 5e4));
        assert!(parse_assignment("h_a").is_err());
        assert!(parse_assignment("h_z=1").is_err());
        assert!(parse_assignment("h_a=warm").is_err());
    }

    #[test]
    fn parses_fit_command() {
        let cli = Cli::try_parse_from([
            "boiler", "-vv", "fit", "--data", "runs.csv", "--rod", "R", "--coupon", "a1", "--set", "k=390",
            "--no-plot",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit command");
        };
        assert_eq!(args.layout.rod, Some(Rod::R));
        assert_eq!(args.layout.coupon, Some(Coupon::A1));
        assert_eq!(args.set, vec![(Param::K, 390.0)]);
        assert!(args.no_plot);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
