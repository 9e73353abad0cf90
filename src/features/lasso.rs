//! L1-penalized least squares with cross-validated penalty strength.
//!
//! Objective (per penalty `α`), on standardized predictors and a centered target:
//!
//! ```text
//! minimize (1 / 2n) ‖y − Xw‖² + α ‖w‖₁
//! ```
//!
//! solved by cyclic coordinate descent with an active set and warm starts along
//! a descending, log-spaced `α` path. Cross-validation uses contiguous, unshuffled folds, so
//! the whole procedure is deterministic for a given input.

use crate::features::scaler::{SCALE_FLOOR, column_moments};
use crate::math::{mean, std_dev};

/// Number of penalties on the path.
pub const N_ALPHAS: usize = 100;

/// Smallest penalty as a fraction of `alpha_max`.
pub const ALPHA_MIN_RATIO: f64 = 1e-3;

/// Number of cross-validation folds.
pub const CV_FOLDS: usize = 5;

const MAX_SWEEPS: usize = 1000;
const REL_TOL: f64 = 1e-4;

/// Outcome of `lasso_cv`.
#[derive(Debug, Clone, PartialEq)]
pub struct LassoCvFit {
    pub alpha: f64,
    /// Coefficients on the standardized scale, in input column order.
    pub coefficients: Vec<f64>,
    /// Mean CV MSE for each penalty on the path (same order as `alphas`).
    pub cv_mse: Vec<f64>,
    pub alphas: Vec<f64>,
}

/// Standardized design (column-major) plus the statistics used to build it.
struct Standardized {
    columns: Vec<Vec<f64>>,
    means: Vec<f64>,
    scales: Vec<f64>,
    /// Columns with zero training variance never enter the model.
    active: Vec<bool>,
    y_mean: f64,
    y_centered: Vec<f64>,
}

impl Standardized {
    fn fit(rows: &[Vec<f64>], y: &[f64]) -> Self {
        let p = rows.first().map_or(0, Vec::len);
        let mut columns = Vec::with_capacity(p);
        let mut means = Vec::with_capacity(p);
        let mut scales = Vec::with_capacity(p);
        let mut active = Vec::with_capacity(p);

        for j in 0..p {
            let raw: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            let (m, s) = column_moments(&raw);
            let is_active = std_dev(&raw) >= SCALE_FLOOR;
            columns.push(raw.iter().map(|v| if is_active { (v - m) / s } else { 0.0 }).collect());
            means.push(m);
            scales.push(s);
            active.push(is_active);
        }

        let y_mean = mean(y);
        let y_centered = y.iter().map(|v| v - y_mean).collect();
        Self {
            columns,
            means,
            scales,
            active,
            y_mean,
            y_centered,
        }
    }

    fn predict(&self, row: &[f64], w: &[f64]) -> f64 {
        let mut out = self.y_mean;
        for j in 0..w.len() {
            if self.active[j] {
                out += w[j] * (row[j] - self.means[j]) / self.scales[j];
            }
        }
        out
    }
}

/// `max_j |x_jᵀy| / n` on standardized data: the smallest penalty that zeroes every coefficient.
fn alpha_max(data: &Standardized) -> f64 {
    let n = data.y_centered.len() as f64;
    data.columns
        .iter()
        .map(|c| c.iter().zip(&data.y_centered).map(|(x, y)| x * y).sum::<f64>().abs() / n)
        .fold(0.0, f64::max)
}

/// Log-spaced penalties from `alpha_max` down to `alpha_max * ALPHA_MIN_RATIO`.
pub fn alpha_grid(alpha_max: f64) -> Vec<f64> {
    let hi = alpha_max.ln();
    let lo = (alpha_max * ALPHA_MIN_RATIO).ln();
    (0..N_ALPHAS)
        .map(|k| (hi + (lo - hi) * k as f64 / (N_ALPHAS - 1) as f64).exp())
        .collect()
}

/// Coordinate descent from `w` (warm start), updated in place.
///
/// Active-set iteration: after a full sweep, only the non-zero coordinates are
/// swept until they settle, then a full sweep verifies that no coordinate
/// enters or leaves. Convergence is relative: the largest coordinate change
/// must fall below `REL_TOL * max|w|`. Returns the number of sweeps.
fn coordinate_descent(data: &Standardized, alpha: f64, w: &mut [f64]) -> usize {
    let n = data.y_centered.len() as f64;
    let norms: Vec<f64> = data
        .columns
        .iter()
        .map(|c| c.iter().map(|v| v * v).sum::<f64>() / n)
        .collect();

    // residual r = y − Xw
    let mut r = data.y_centered.clone();
    for (j, col) in data.columns.iter().enumerate() {
        if w[j] != 0.0 {
            for (ri, x) in r.iter_mut().zip(col) {
                *ri -= w[j] * x;
            }
        }
    }

    let mut active_only = false;
    let mut sweeps = 0;
    while sweeps < MAX_SWEEPS {
        sweeps += 1;
        let mut max_delta: f64 = 0.0;
        let mut set_changed = false;

        for (j, col) in data.columns.iter().enumerate() {
            if !data.active[j] || norms[j] <= 0.0 || (active_only && w[j] == 0.0) {
                continue;
            }
            let rho = col.iter().zip(&r).map(|(x, ri)| x * ri).sum::<f64>() / n + norms[j] * w[j];
            let updated = soft_threshold(rho, alpha) / norms[j];
            let delta = updated - w[j];
            if delta != 0.0 {
                for (ri, x) in r.iter_mut().zip(col) {
                    *ri -= delta * x;
                }
                set_changed |= (w[j] == 0.0) != (updated == 0.0);
                w[j] = updated;
                max_delta = max_delta.max(delta.abs());
            }
        }

        let w_max = w.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let converged = max_delta <= REL_TOL * w_max;
        if active_only {
            if converged {
                active_only = false;
            }
        } else {
            if converged && !set_changed {
                break;
            }
            active_only = true;
        }
    }
    sweeps
}

fn soft_threshold(z: f64, t: f64) -> f64 {
    if z > t {
        z - t
    } else if z < -t {
        z + t
    } else {
        0.0
    }
}

/// Contiguous fold boundaries; the first `n % k` folds get one extra row.
pub fn fold_bounds(n: usize, k: usize) -> Vec<(usize, usize)> {
    let base = n / k;
    let extra = n % k;
    let mut out = Vec::with_capacity(k);
    let mut start = 0;
    for f in 0..k {
        let size = base + usize::from(f < extra);
        out.push((start, start + size));
        start += size;
    }
    out
}

/// Fit the full penalty path on one dataset.
fn fit_path(data: &Standardized, alphas: &[f64]) -> Vec<Vec<f64>> {
    let p = data.columns.len();
    let mut w = vec![0.0; p];
    alphas
        .iter()
        .map(|&alpha| {
            coordinate_descent(data, alpha, &mut w);
            w.clone()
        })
        .collect()
}

/// Index of the lowest CV error on a descending alpha path.
///
/// A strict `<` keeps the earlier (larger, sparser) alpha on exact ties.
fn best_alpha_index(cv_mse: &[f64]) -> usize {
    let mut best = 0;
    for k in 1..cv_mse.len() {
        if cv_mse[k] < cv_mse[best] {
            best = k;
        }
    }
    best
}

/// Cross-validated Lasso on row-major predictors.
///
/// The caller guarantees `rows.len() >= CV_FOLDS` and matching lengths.
pub fn lasso_cv(rows: &[Vec<f64>], y: &[f64]) -> LassoCvFit {
    let n = rows.len();
    let full = Standardized::fit(rows, y);
    let p = full.columns.len();

    let a_max = alpha_max(&full);
    if !(a_max.is_finite() && a_max > 0.0) {
        // Nothing correlates with the target: every coefficient is zero.
        return LassoCvFit {
            alpha: 0.0,
            coefficients: vec![0.0; p],
            cv_mse: Vec::new(),
            alphas: Vec::new(),
        };
    }
    let alphas = alpha_grid(a_max);

    let mut cv_mse = vec![0.0; alphas.len()];
    for &(start, end) in &fold_bounds(n, CV_FOLDS) {
        let train_rows: Vec<Vec<f64>> = rows[..start].iter().chain(&rows[end..]).cloned().collect();
        let train_y: Vec<f64> = y[..start].iter().chain(&y[end..]).copied().collect();
        let fold = Standardized::fit(&train_rows, &train_y);

        for (k, w) in fit_path(&fold, &alphas).iter().enumerate() {
            let sse: f64 = (start..end)
                .map(|i| {
                    let e = y[i] - fold.predict(&rows[i], w);
                    e * e
                })
                .sum();
            cv_mse[k] += sse / (end - start) as f64 / CV_FOLDS as f64;
        }
    }

    let alpha = alphas[best_alpha_index(&cv_mse)];
    let mut coefficients = vec![0.0; p];
    coordinate_descent(&full, alpha, &mut coefficients);

    LassoCvFit {
        alpha,
        coefficients,
        cv_mse,
        alphas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        // x0 drives y; x1 is an unrelated deterministic wiggle; x2 is constant.
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let t = i as f64;
                vec![t * 0.1, (t * 1.7).sin(), 3.0]
            })
            .collect();
        let y = rows.iter().map(|r| 2.0 + 1.5 * r[0]).collect();
        (rows, y)
    }

    #[test]
    fn folds_cover_all_rows_contiguously() {
        let bounds = fold_bounds(23, 5);
        assert_eq!(bounds, vec![(0, 5), (5, 10), (10, 15), (15, 19), (19, 23)]);
    }

    #[test]
    fn alpha_grid_is_descending_and_spans_ratio() {
        let grid = alpha_grid(2.0);
        assert_eq!(grid.len(), N_ALPHAS);
        assert!((grid[0] - 2.0).abs() < 1e-12);
        assert!((grid[N_ALPHAS - 1] - 2.0 * ALPHA_MIN_RATIO).abs() < 1e-12);
        assert!(grid.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn keeps_driver_and_drops_constant() {
        let (rows, y) = synthetic(80);
        let fit = lasso_cv(&rows, &y);
        assert!(fit.coefficients[0].abs() > 0.5);
        assert_eq!(fit.coefficients[2], 0.0);
        assert!(fit.alpha > 0.0);
    }

    #[test]
    fn penalty_at_alpha_max_zeroes_everything() {
        let (rows, y) = synthetic(40);
        let data = Standardized::fit(&rows, &y);
        let mut w = vec![0.0; 3];
        coordinate_descent(&data, alpha_max(&data) * 1.0001, &mut w);
        assert!(w.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn exact_cv_tie_keeps_larger_alpha() {
        assert_eq!(best_alpha_index(&[0.5, 0.2, 0.2, 0.3]), 1);
        assert_eq!(best_alpha_index(&[0.1, 0.1, 0.1]), 0);
        assert_eq!(best_alpha_index(&[0.4, 0.3, 0.1]), 2);
    }

    #[test]
    fn correlated_lags_converge_well_within_sweep_budget() {
        // Two co-moving series plus their lags, as with CPI variants.
        let n = 240;
        let x0: Vec<f64> = (0..n).map(|t| (t as f64 * 0.31).sin() + t as f64 * 0.01).collect();
        let x1: Vec<f64> = (0..n).map(|t| x0[t] + 0.3 * (t as f64 * 1.3).cos()).collect();
        let lag = |c: &[f64], k: usize| -> Vec<f64> { (0..n).map(|t| c[t.saturating_sub(k)]).collect() };
        let columns = [
            x0.clone(),
            x1.clone(),
            lag(&x0, 1),
            lag(&x0, 2),
            lag(&x1, 1),
            (0..n).map(|t| (t as f64 * 0.77).cos()).collect(),
        ];
        let rows: Vec<Vec<f64>> = (0..n).map(|i| columns.iter().map(|c| c[i]).collect()).collect();
        let y: Vec<f64> = (0..n)
            .map(|t| 1.0 + 2.0 * x0[t] - x1[t] + 0.05 * (t as f64 * 2.1).sin())
            .collect();

        let data = Standardized::fit(&rows, &y);
        let mut w = vec![0.0; columns.len()];
        let sweeps: Vec<usize> = alpha_grid(alpha_max(&data))
            .iter()
            .map(|&alpha| coordinate_descent(&data, alpha, &mut w))
            .collect();

        let worst = sweeps.iter().copied().max().unwrap();
        let total: usize = sweeps.iter().sum();
        assert!(worst < 200, "worst alpha took {worst} sweeps");
        assert!(total < 5_000, "path took {total} sweeps");
        assert!(w[0] > 0.0 && w[1] < 0.0, "{w:?}");
    }

    #[test]
    fn constant_target_selects_nothing() {
        let (rows, _) = synthetic(30);
        let y = vec![1.0; 30];
        let fit = lasso_cv(&rows, &y);
        assert!(fit.coefficients.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn lasso_cv_is_deterministic() {
        let (rows, y) = synthetic(60);
        assert_eq!(lasso_cv(&rows, &y), lasso_cv(&rows, &y));
    }
}
