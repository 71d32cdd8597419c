//! ASCII plotting of a model fit for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - measurements: `o`
//! - model fit: `-` line
//! - confidence band: `:`
//! - extrapolated boiling surface temperature at `x = 0`: `X`

use std::collections::BTreeMap;

use log::warn;

use crate::domain::{Param, RunFit};
use crate::models::Model;
use crate::report::{ModelBand, get_model_with_error};
use crate::symbolic::ExprError;

/// Shown instead of a plot when the fit has `NaN` parameters.
pub const NAN_PLOT_MESSAGE: &str = "Cannot plot model fit with `nan` parameters.";

/// Render a run's measurements with the fitted model and its confidence band.
pub fn render_fit_plot(model: &Model, fit: &RunFit, width: usize, height: usize) -> Result<String, ExprError> {
    let mut params: BTreeMap<Param, f64> = fit.fixed.clone();
    params.extend(fit.fit.fits.iter().map(|(&p, &v)| (p, v)));
    if params.values().any(|v| v.is_nan()) {
        warn!("{NAN_PLOT_MESSAGE} (run '{}')", fit.run.name);
        return Ok(format!("{NAN_PLOT_MESSAGE}\n"));
    }

    let width = width.max(10);
    let height = height.max(5);

    let x_max = fit.run.x.iter().copied().fold(0.0, f64::max);
    let pad = 0.025 * x_max;
    let (x_lo, x_hi) = if x_max > 0.0 { (-pad, x_max + pad) } else { (-1.0, 1.0) };
    let xs: Vec<f64> = (0..width)
        .map(|i| x_lo + (x_hi - x_lo) * i as f64 / (width as f64 - 1.0))
        .collect();

    let band = get_model_with_error(model, &xs, &params, &fit.fit.errors)?;
    let points: Vec<(f64, f64)> = fit.run.x.iter().copied().zip(fit.run.y.iter().copied()).collect();
    let y_0 = params.get(&Param::Ts).copied().unwrap_or(f64::NAN);

    Ok(render_plot(&fit.run.name, &points, &band, y_0, (x_lo, x_hi), height))
}

fn render_plot(
    run: &str,
    points: &[(f64, f64)],
    band: &ModelBand,
    y_0: f64,
    (x_min, x_max): (f64, f64),
    height: usize,
) -> String {
    let width = band.x.len().max(2);

    let (y_min, y_max) = y_range(points, band, y_0).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Band first, then the curve over it, then the markers.
    for (i, (&lo, &hi)) in band.y_min.iter().zip(&band.y_max).enumerate() {
        if !(lo.is_finite() && hi.is_finite()) {
            continue;
        }
        let col = map_x(band.x[i], x_min, x_max, width);
        let top = map_y(hi, y_min, y_max, height);
        let bottom = map_y(lo, y_min, y_max, height);
        for row in grid.iter_mut().take(bottom + 1).skip(top) {
            row[col] = ':';
        }
    }

    let curve: Vec<(f64, f64)> = band.x.iter().copied().zip(band.y.iter().copied()).collect();
    draw_curve(&mut grid, &curve, x_min, x_max, y_min, y_max);

    for &(x, y) in points {
        grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = 'o';
    }
    if y_0.is_finite() {
        grid[map_y(y_0, y_min, y_max, height)][map_x(0.0, x_min, x_max, width)] = 'X';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: run={run} | x=[{x_min:.3}, {x_max:.3}] m | T=[{y_min:.2}, {y_max:.2}] C\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn y_range(points: &[(f64, f64)], band: &ModelBand, y_0: f64) -> Option<(f64, f64)> {
    let values = points
        .iter()
        .map(|&(_, y)| y)
        .chain(band.y_min.iter().copied())
        .chain(band.y_max.iter().copied())
        .chain(std::iter::once(y_0))
        .filter(|v| v.is_finite());

    let (min_y, max_y) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, '-'),
            None => grid[row][col] = '-',
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish). Overwrites blanks and band cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            let cell = &mut grid[y0 as usize][x0 as usize];
            if *cell == ' ' || *cell == ':' {
                *cell = ch;
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
