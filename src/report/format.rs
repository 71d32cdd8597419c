//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{FitParams, Param, Run, RunFit};
use crate::fit::FitError;
use crate::io::IngestedData;
use crate::report::Residual;

/// Format the run header (dataset stats + fit configuration).
pub fn format_run_summary(ingest: &IngestedData, params: &FitParams) -> String {
    let mut out = String::new();

    out.push_str("=== boiler - rod temperature model fit ===\n");
    out.push_str(&format!(
        "Rows: read={} used={} skipped={} | runs={}\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len(),
        ingest.runs.len()
    ));
    out.push_str(&format!("Free: {}\n", fmt_params(&params.free_params)));
    let fixed: Vec<String> = params
        .fixed_params
        .iter()
        .map(|p| format!("{p}={}", params.values.get(p).copied().unwrap_or(f64::NAN)))
        .collect();
    out.push_str(&format!("Fixed: {}\n", fixed.join(", ")));
    out.push_str(&format!("Error multiplier: {:.4}\n", params.confidence_interval));
    out.push('\n');

    out
}

/// Format one row per run: fitted values with their errors.
///
/// `runs` names the failed entries of `results`, which is in the same order.
pub fn format_fit_table(runs: &[Run], results: &[Result<RunFit, FitError>], params: &FitParams) -> String {
    let mut out = String::new();

    let mut header = format!("{:<16} {:>3}", "run", "n");
    let mut rule = format!("{:-<16} {:-<3}", "", "");
    for p in &params.free_params {
        let label = format!("{p} ({})", p.unit());
        header.push_str(&format!(" {label:>24}"));
        rule.push_str(&format!(" {:-<24}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(rule.trim_end());
    out.push('\n');

    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(r) => {
                let mut line = format!("{:<16} {:>3}", truncate(&r.run.name, 16), r.run.len());
                for p in &params.free_params {
                    let v = r.fit.fits.get(p).copied().unwrap_or(f64::NAN);
                    let e = r.fit.errors.get(p).copied().unwrap_or(f64::NAN);
                    line.push_str(&format!(" {:>24}", fmt_value_error(v, e)));
                }
                out.push_str(line.trim_end());
            }
            Err(e) => {
                let name = runs.get(i).map_or("?", |r| r.name.as_str());
                out.push_str(&format!("{:<16} failed: {e}", truncate(name, 16)));
            }
        }
        out.push('\n');
    }

    out
}

/// Format measured vs fitted temperatures for one run.
pub fn format_residuals(residuals: &[Residual]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>10} {:>10} {:>10} {:>10}\n", "x (m)", "y_obs", "y_fit", "residual"));
    for r in residuals {
        out.push_str(&format!(
            "{:>10.5} {:>10.3} {:>10.3} {:>10.3}\n",
            r.x, r.y_obs, r.y_fit, r.residual
        ));
    }
    out
}

fn fmt_params(params: &[Param]) -> String {
    let names: Vec<&str> = params.iter().map(|p| p.name()).collect();
    format!("[{}]", names.join(", "))
}

fn fmt_value_error(v: f64, e: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if e.abs() >= 1e3 || v.abs() >= 1e5 {
        format!("{v:.4e} ± {e:.2e}")
    } else {
        format!("{v:.3} ± {e:.3}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
