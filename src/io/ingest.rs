//! CSV ingest and normalization.
//!
//! This module turns a long-format measurement CSV into runs that are safe to
//! fit. Columns (case-insensitive, any order):
//!
//! - `run` (optional; defaults to `run`)
//! - `x` (m) or `tc` (thermocouple name, resolved through trial geometry)
//! - `y` (C)
//! - `y_err` (optional, C)
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (runs keep first-seen order)

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use log::warn;

use crate::domain::{Measurement, Run};
use crate::error::{AppError, EXIT_INPUT, EXIT_NO_DATA};

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub run: Option<String>,
    pub message: String,
}

/// Ingest output: measurements grouped into runs + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub runs: Vec<Run>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

const DEFAULT_RUN: &str = "run";

/// Load measurements from a CSV file.
///
/// `positions` maps thermocouple names to positions and is required when the
/// file has a `tc` column instead of `x`.
pub fn load_measurements(path: &Path, positions: Option<&BTreeMap<String, f64>>) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_measurements(file, positions)
}

/// Load measurements from any CSV source.
pub fn read_measurements<R: Read>(
    source: R,
    positions: Option<&BTreeMap<String, f64>>,
) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    let position_column = ensure_required_columns_exist(&header_map, positions)?;

    let mut measurements = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    run: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let run = get_optional(&record, &header_map, "run").unwrap_or(DEFAULT_RUN).to_string();
        match parse_row(&record, &header_map, position_column, positions) {
            Ok((x, y, y_err)) => measurements.push(Measurement {
                run,
                x,
                y,
                y_err,
            }),
            Err(message) => row_errors.push(RowError {
                line,
                run: Some(run),
                message,
            }),
        }
    }

    for e in &row_errors {
        warn!("Skipped line {}: {}", e.line, e.message);
    }

    let rows_used = measurements.len();
    if rows_used == 0 {
        return Err(AppError::new(EXIT_NO_DATA, "No valid measurements remain after validation."));
    }

    Ok(IngestedData {
        runs: Run::group(&measurements),
        row_errors,
        rows_read,
        rows_used,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PositionColumn {
    X,
    Thermocouple,
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Strip a UTF-8 BOM left by spreadsheet exports.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(
    header_map: &HashMap<String, usize>,
    positions: Option<&BTreeMap<String, f64>>,
) -> Result<PositionColumn, AppError> {
    if !header_map.contains_key("y") {
        return Err(AppError::new(EXIT_INPUT, "Missing required column: `y`"));
    }
    if header_map.contains_key("x") {
        return Ok(PositionColumn::X);
    }
    if header_map.contains_key("tc") {
        if positions.is_none() {
            return Err(AppError::new(
                EXIT_INPUT,
                "Column `tc` needs thermocouple positions: pass `--rod` and `--coupon`, or `--trial`.",
            ));
        }
        return Ok(PositionColumn::Thermocouple);
    }
    Err(AppError::new(EXIT_INPUT, "Missing required column: `x` or `tc`"))
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    position_column: PositionColumn,
    positions: Option<&BTreeMap<String, f64>>,
) -> Result<(f64, f64, Option<f64>), String> {
    let x = match (position_column, positions) {
        (PositionColumn::X, _) => parse_f64(get_required(record, header_map, "x")?, "x")?,
        (PositionColumn::Thermocouple, Some(positions)) => {
            let tc = get_required(record, header_map, "tc")?;
            *positions
                .get(tc)
                .ok_or_else(|| format!("Unknown thermocouple `{tc}`"))?
        }
        (PositionColumn::Thermocouple, None) => return Err("No thermocouple positions".to_string()),
    };
    let y = parse_f64(get_required(record, header_map, "y")?, "y")?;
    let y_err = match get_optional(record, header_map, "y_err") {
        Some(s) => {
            let v = parse_f64(s, "y_err")?;
            if v <= 0.0 {
                return Err(format!("`y_err` must be positive, got {v}"));
            }
            Some(v)
        }
        None => None,
    };
    Ok((x, y, y_err))
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    let v: f64 = s
        .parse()
        .map_err(|_| format!("Invalid number for `{name}`: '{s}'"))?;
    if !v.is_finite() {
        return Err(format!("Non-finite value for `{name}`: '{s}'"));
    }
    Ok(v)
}
