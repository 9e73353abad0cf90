//! ASCII plot of the test window: actual values against the best model.
//!
//! Fixed-size character grid, deterministic output:
//! - actual observations: `o`
//! - best model forecast: `-` line
//!
//! The x axis is the test-month index, so gaps never distort the spacing.

use crate::domain::ComparisonReport;

pub fn render_forecast_plot(report: &ComparisonReport, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);
    let best = report.best;

    let actual: Vec<f64> = report.predictions.iter().map(|r| r.actual).collect();
    let forecast: Vec<(usize, f64)> = report
        .predictions
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.predicted.get(&best).map(|&v| (i, v)))
        .collect();

    let (Some(first), Some(last)) = (report.predictions.first(), report.predictions.last()) else {
        return format!("Plot: no test predictions for {}\n", report.target);
    };

    let (y_min, y_max) = y_range(actual.iter().copied().chain(forecast.iter().map(|&(_, v)| v))).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
    let x_max = (actual.len() - 1).max(1) as f64;

    let mut grid = vec![vec![' '; width]; height];

    // Forecast first so observations overlay it.
    let mut prev = None;
    for &(i, v) in &forecast {
        let x = map_x(i as f64, x_max, width);
        let y = map_y(v, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, y, '-'),
            None => grid[y][x] = '-',
        }
        prev = Some((x, y));
    }

    for (i, &v) in actual.iter().enumerate() {
        let x = map_x(i as f64, x_max, width);
        let y = map_y(v, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} {}..{} | y=[{y_min:.2}, {y_max:.2}] | o actual, - {}\n",
        report.target,
        first.date.format("%Y-%m"),
        last.date.format("%Y-%m"),
        best.display_name()
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (min.is_finite() && max.is_finite()).then_some((min, max))
}

/// Widens by `frac` of the span; a flat series is padded by `frac` of its magnitude.
fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = max - min;
    let pad = if span > 0.0 { span * frac } else { min.abs().max(1.0) * frac };
    (min - pad, max + pad)
}

fn map_x(x: f64, x_max: f64, width: usize) -> usize {
    let u = (x / x_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham); never overwrites a non-blank cell.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let (mut x0, mut y0) = (x0 as isize, y0 as isize);
    let (x1, y1) = (x1 as isize, y1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid.get_mut(y0 as usize).and_then(|row| row.get_mut(x0 as usize)) {
            if *cell == ' ' {
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
