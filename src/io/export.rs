//! CSV exports.
//!
//! - fit results: one row per run with fitted free parameters, their errors
//!   (`<param>_err`), and the fixed values the model was evaluated with.
//!   Failed fits export as `NaN`.
//! - measurements: the long format read back by `io::ingest`.

use std::fs::File;
use std::path::Path;

use crate::domain::{FitParams, Measurement, RunFit};
use crate::error::{AppError, EXIT_INPUT};

/// Write per-run results to a CSV file.
pub fn write_results_csv(path: &Path, fits: &[RunFit], params: &FitParams) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);
    let write_err = |e: csv::Error| AppError::new(EXIT_INPUT, format!("Failed to write export CSV: {e}"));

    let mut header = vec!["run".to_string(), "n_points".to_string()];
    header.extend(params.free_params.iter().map(|p| p.name().to_string()));
    header.extend(params.free_errors());
    header.extend(params.fixed_params.iter().map(|p| p.name().to_string()));
    writer.write_record(&header).map_err(write_err)?;

    for r in fits {
        let mut row = vec![r.run.name.clone(), r.run.len().to_string()];
        let value = |v: Option<&f64>| v.copied().unwrap_or(f64::NAN).to_string();
        row.extend(params.free_params.iter().map(|p| value(r.fit.fits.get(p))));
        row.extend(params.free_params.iter().map(|p| value(r.fit.errors.get(p))));
        row.extend(params.fixed_params.iter().map(|p| value(r.fixed.get(p))));
        writer.write_record(&row).map_err(write_err)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write export CSV: {e}")))?;
    Ok(())
}

/// Write measurements in the long format `run,x,y,y_err`.
pub fn write_measurements_csv(path: &Path, measurements: &[Measurement]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);
    let write_err = |e: csv::Error| AppError::new(EXIT_INPUT, format!("Failed to write CSV: {e}"));

    writer.write_record(["run", "x", "y", "y_err"]).map_err(write_err)?;
    for m in measurements {
        let y_err = m.y_err.map(|v| v.to_string()).unwrap_or_default();
        writer
            .write_record([m.run.clone(), m.x.to_string(), m.y.to_string(), y_err])
            .map_err(write_err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Param, ParamFit, Run};
    use std::collections::BTreeMap;

    #[test]
    fn writes_one_row_per_run() {
        let params = FitParams::default();
        let fit = |name: &str, ts: f64| RunFit {
            run: Run {
                name: name.into(),
                x: vec![0.01, 0.02],
                y: vec![100.0, 101.0],
                y_errors: None,
            },
            fit: ParamFit {
                fits: BTreeMap::from([(Param::Ts, ts), (Param::Qs, 1e4), (Param::Ha, 10.0)]),
                errors: BTreeMap::from([(Param::Ts, 0.5), (Param::Qs, 1e3), (Param::Ha, 2.0)]),
            },
            fixed: params.fixed_values(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        write_results_csv(&path, &[fit("a, first", 101.5), fit("b", f64::NAN)], &params).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "run,n_points,T_s,q_s,h_a,T_s_err,q_s_err,h_a_err,h_w,r,T_infa,T_infw,x_s,x_wa,k"
        );
        assert!(lines[1].starts_with("\"a, first\",2,101.5,10000,10,0.5,1000,2,1,0.0047625,25,100,0,0.0381,400"));
        assert!(lines[2].starts_with("b,2,NaN,"));
    }

    #[test]
    fn measurements_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let measurements = vec![
            Measurement {
                run: "a".into(),
                x: 0.02,
                y: 110.25,
                y_err: Some(0.5),
            },
            Measurement {
                run: "b".into(),
                x: 0.04,
                y: 99.0,
                y_err: None,
            },
        ];
        write_measurements_csv(&path, &measurements).unwrap();

        let data = crate::io::load_measurements(&path, None).unwrap();
        assert_eq!(data.rows_used, 2);
        assert!(data.row_errors.is_empty());
        assert_eq!(data.runs[0].y, vec![110.25]);
        assert_eq!(data.runs[0].y_errors, Some(vec![0.5]));
        assert_eq!(data.runs[1].y_errors, None);
    }
}
