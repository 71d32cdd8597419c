//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - derives and stores the model
//! - evaluates it or generates synthetic samples
//! - fits measured runs and prints reports/plots
//! - writes optional exports

use std::collections::BTreeMap;

use clap::Parser;
use log::{info, warn};

use crate::cli::{Cli, Command, DeriveArgs, EvalArgs, FitArgs, LayoutArgs, SampleArgs};
use crate::data::{SampleSpec, generate_sample};
use crate::domain::{COPPER_TEMPS, Coupon, FitConfig, FitParams, Geometry, Param, Rod};
use crate::error::{AppError, EXIT_INPUT};

pub mod pipeline;

/// Entry point for the `boiler` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match &cli.command {
        Command::Derive(args) => handle_derive(&cli, args),
        Command::Eval(args) => handle_eval(&cli, args),
        Command::Fit(args) => handle_fit(&cli, args),
        Command::Sample(args) => handle_sample(&cli, args),
    }
}

fn handle_derive(cli: &Cli, args: &DeriveArgs) -> Result<(), AppError> {
    let derived = crate::models::derive();
    if args.print {
        let steps = [
            ("T(x) general", &derived.t_int),
            ("T_w(x)", &derived.t_w),
            ("T_a(x)", &derived.t_a),
            ("T_w(x_wa)", &derived.t_wa_w),
            ("T_a(x_wa)", &derived.t_wa_a),
            ("q_w(x_wa)", &derived.q_wa_w),
            ("q_a(x_wa)", &derived.q_wa_a),
            ("T(x)", &derived.t),
        ];
        for (label, expr) in steps {
            println!("{label} = {expr}\n");
        }
    }
    let path = crate::io::write_model(&cli.models, derived.model())?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn handle_eval(cli: &Cli, args: &EvalArgs) -> Result<(), AppError> {
    if args.points == 0 {
        return Err(AppError::new(EXIT_INPUT, "Need at least one position (-n)."));
    }
    let project = crate::io::load_params(&cli.params)?;
    let params = with_overrides(project.fit, &args.set)?;
    let model = params.get_models(&cli.models)?;

    let step = if args.points > 1 {
        (args.to - args.from) / (args.points - 1) as f64
    } else {
        0.0
    };
    println!("{:>10} {:>12}", "x (m)", "T (C)");
    for i in 0..args.points {
        let x = args.from + step * i as f64;
        let t = model.eval_with(x, &params.values)?;
        println!("{x:>10.5} {t:>12.4}");
    }
    Ok(())
}

fn handle_fit(cli: &Cli, args: &FitArgs) -> Result<(), AppError> {
    let project = crate::io::load_params(&cli.params)?;
    let positions = resolve_positions(&project.geometry, &args.layout, None)?;
    let config = FitConfig {
        data_path: args.data.clone(),
        models_dir: cli.models.clone(),
        params: with_overrides(project.fit, &args.set)?,
        positions,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        show_residuals: args.residuals,
        export_results: args.export.clone(),
    };
    let run = pipeline::run_fit(&config)?;

    print!("{}", crate::report::format_run_summary(&run.ingest, &config.params));
    println!("{}", crate::report::format_fit_table(&run.ingest.runs, &run.results, &config.params));

    for (run_data, result) in run.ingest.runs.iter().zip(&run.results) {
        let fit = match result {
            Ok(fit) => fit,
            Err(e) => {
                warn!("Run '{}' could not be fit: {e}", run_data.name);
                continue;
            }
        };
        if config.plot {
            println!(
                "{}",
                crate::plot::render_fit_plot(&run.model, fit, config.plot_width, config.plot_height)?
            );
        }
        if config.show_residuals && fit.fit.is_finite() {
            let residuals = crate::report::compute_residuals(&run.model, fit)?;
            println!("Run {}:\n{}", fit.run.name, crate::report::format_residuals(&residuals));
        }
    }

    if let Some(path) = &config.export_results {
        let fits: Vec<_> = run.fits().cloned().collect();
        crate::io::write_results_csv(path, &fits, &config.params)?;
        info!("Exported {} fits to {}", fits.len(), path.display());
    }
    Ok(())
}

fn handle_sample(cli: &Cli, args: &SampleArgs) -> Result<(), AppError> {
    let project = crate::io::load_params(&cli.params)?;
    let positions = resolve_positions(&project.geometry, &args.layout, Some((Rod::R, Coupon::A0)))?
        .unwrap_or_default();
    let params = with_overrides(project.fit, &args.set)?;
    let model = params.get_models(&cli.models)?;

    let truth = model
        .free_params()
        .iter()
        .map(|p| {
            params
                .values
                .get(p)
                .copied()
                .ok_or_else(|| AppError::new(EXIT_INPUT, format!("No value for free parameter {p}.")))
        })
        .collect::<Result<Vec<f64>, AppError>>()?;

    let spec = SampleSpec {
        truth,
        x: positions.into_values().collect(),
        noise: args.noise,
        runs: args.runs,
        seed: args.seed,
    };
    let measurements = generate_sample(&model, &spec)?;
    crate::io::write_measurements_csv(&args.out, &measurements)?;
    println!("Wrote {} measurements to {}", measurements.len(), args.out.display());
    Ok(())
}

/// Apply `--set` overrides and re-validate.
fn with_overrides(mut params: FitParams, set: &[(Param, f64)]) -> Result<FitParams, AppError> {
    for &(param, value) in set {
        params.values.insert(param, value);
    }
    Ok(params.validated()?)
}

/// Thermocouple positions from a trial, an explicit rod/coupon, or `fallback`.
fn resolve_positions(
    geometry: &Geometry,
    layout: &LayoutArgs,
    fallback: Option<(Rod, Coupon)>,
) -> Result<Option<BTreeMap<String, f64>>, AppError> {
    if let Some(date) = layout.trial {
        let trials = crate::io::load_trials(&layout.trials)?;
        let trial = trials.on(date).ok_or_else(|| {
            AppError::new(
                EXIT_INPUT,
                format!("No trial on {date} in '{}'.", layout.trials.display()),
            )
        })?;
        if !trial.good {
            warn!("Trial {date} is marked as not good.");
        }
        return Ok(Some(trial.thermocouple_pos(geometry, &COPPER_TEMPS)?));
    }

    let layout = match (layout.rod, layout.coupon) {
        (Some(rod), Some(coupon)) => Some((rod, coupon)),
        (None, None) => fallback,
        _ => return Err(AppError::new(EXIT_INPUT, "--rod and --coupon must be given together.")),
    };
    let Some((rod, coupon)) = layout else {
        return Ok(None);
    };
    let pos = geometry
        .thermocouple_positions(rod, coupon)
        .ok_or_else(|| AppError::new(EXIT_INPUT, format!("No geometry for rod {rod} with coupon {coupon}.")))?;
    if pos.len() != COPPER_TEMPS.len() {
        return Err(AppError::new(
            EXIT_INPUT,
            format!("Rod {rod} has {} thermocouples, expected {}.", pos.len(), COPPER_TEMPS.len()),
        ));
    }
    Ok(Some(COPPER_TEMPS.iter().map(|n| n.to_string()).zip(pos).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    fn layout(rod: Option<Rod>, coupon: Option<Coupon>) -> LayoutArgs {
        LayoutArgs {
            rod,
            coupon,
            trial: None,
            trials: PathBuf::from("does-not-exist.toml"),
        }
    }

    #[test]
    fn positions_from_rod_and_coupon() {
        let g = Geometry::default();
        let pos = resolve_positions(&g, &layout(Some(Rod::R), Some(Coupon::A0)), None)
            .unwrap()
            .unwrap();
        assert_eq!(pos.len(), 5);
        assert_relative_eq!(pos["T_1"], g.rods[&Rod::R][0] + g.coupons[&Coupon::A0]);

        assert!(resolve_positions(&g, &layout(None, None), None).unwrap().is_none());
        assert!(resolve_positions(&g, &layout(None, None), Some((Rod::R, Coupon::A0)))
            .unwrap()
            .is_some());
        assert!(resolve_positions(&g, &layout(Some(Rod::R), None), None).is_err());
    }

    #[test]
    fn positions_from_trial() {
        let dir = tempfile::tempdir().unwrap();
        let trials = dir.path().join("trials.toml");
        std::fs::write(
            &trials,
            "[[trials]]\ndate = \"2022-09-14\"\ngroup = \"control\"\nrod = \"W\"\ncoupon = \"A1\"\njoint = \"paste\"\n",
        )
        .unwrap();
        let mut args = layout(None, None);
        args.trials = trials;
        args.trial = chrono::NaiveDate::from_ymd_opt(2022, 9, 14);

        let g = Geometry::default();
        let pos = resolve_positions(&g, &args, None).unwrap().unwrap();
        assert_relative_eq!(pos["T_5"], g.rods[&Rod::W][4] + g.coupons[&Coupon::A1]);

        args.trial = chrono::NaiveDate::from_ymd_opt(2022, 9, 15);
        assert_eq!(resolve_positions(&g, &args, None).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn overrides_are_validated() {
        let params = with_overrides(FitParams::default(), &[(Param::K, 390.0)]).unwrap();
        assert_eq!(params.values[&Param::K], 390.0);
        let params = with_overrides(FitParams::default(), &[(Param::Ha, 0.0)]).unwrap();
        assert_eq!(params.values[&Param::Ha], f64::EPSILON);
    }
}
