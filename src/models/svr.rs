//! Epsilon-insensitive support vector regression with an RBF kernel.
//!
//! We solve the dual in terms of `β_i = α_i − α_i*`:
//!
//! ```text
//! minimize  ½ βᵀQβ − yᵀβ + ε Σ|β_i|    subject to  −C ≤ β_i ≤ C
//! ```
//!
//! with `Q = K + 1`. Folding the bias into the kernel (a constant feature) removes
//! the equality constraint of the classic formulation, so plain cyclic coordinate
//! descent applies: each coordinate update is a closed-form soft-threshold
//! followed by a box clip. Sweeps run in index order, so the fit is deterministic.

use serde::{Deserialize, Serialize};

use crate::domain::{ModelFamily, SvrParams};
use crate::error::PipelineError;
use crate::math::variance;
use crate::models::Regressor;

/// Dual coefficients at or below this magnitude are dropped from the model.
const SUPPORT_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvrModel {
    pub gamma: f64,
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coefs: Vec<f64>,
}

impl SvrModel {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &SvrParams) -> Result<Self, PipelineError> {
        let n = x.len();
        if n == 0 || n != y.len() {
            return Err(PipelineError::training(
                ModelFamily::Kernel,
                format!("{n} feature rows for {} targets", y.len()),
            ));
        }

        let gamma = params.gamma.unwrap_or_else(|| scale_gamma(x));

        // Q = K + 1, dense; n is at most a few hundred months.
        let mut q = vec![0.0; n * n];
        for i in 0..n {
            for j in i..n {
                let v = rbf(&x[i], &x[j], gamma) + 1.0;
                q[i * n + j] = v;
                q[j * n + i] = v;
            }
        }

        let mut beta = vec![0.0; n];
        // grad = Qβ − y
        let mut grad: Vec<f64> = y.iter().map(|v| -v).collect();

        for _ in 0..params.max_iter {
            let mut max_delta: f64 = 0.0;
            for i in 0..n {
                let qii = q[i * n + i];
                let unpenalized = beta[i] - grad[i] / qii;
                let shrunk = soft_threshold(unpenalized, params.epsilon / qii).clamp(-params.c, params.c);
                let delta = shrunk - beta[i];
                if delta == 0.0 {
                    continue;
                }
                beta[i] = shrunk;
                let row = &q[i * n..(i + 1) * n];
                for (g, qij) in grad.iter_mut().zip(row) {
                    *g += delta * qij;
                }
                max_delta = max_delta.max(delta.abs());
            }
            if max_delta < params.tol {
                break;
            }
        }

        let mut support_vectors = Vec::new();
        let mut dual_coefs = Vec::new();
        for (i, &b) in beta.iter().enumerate() {
            if b.abs() > SUPPORT_EPS {
                support_vectors.push(x[i].clone());
                dual_coefs.push(b);
            }
        }

        Ok(Self {
            gamma,
            support_vectors,
            dual_coefs,
        })
    }
}

impl Regressor for SvrModel {
    fn family(&self) -> ModelFamily {
        ModelFamily::Kernel
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.dual_coefs)
            .map(|(sv, b)| b * (rbf(sv, row, self.gamma) + 1.0))
            .sum()
    }
}

/// `1 / (n_features * var(X))` over all matrix entries; `1.0` for constant input.
pub fn scale_gamma(x: &[Vec<f64>]) -> f64 {
    let n_features = x.first().map_or(0, Vec::len);
    let flat: Vec<f64> = x.iter().flatten().copied().collect();
    let var = variance(&flat);
    if n_features == 0 || !(var.is_finite() && var > 0.0) {
        return 1.0;
    }
    1.0 / (n_features as f64 * var)
}

fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let d2: f64 = a.iter().zip(b).map(|(u, v)| (u - v) * (u - v)).sum();
    (-gamma * d2).exp()
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

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..60).map(|i| vec![-2.0 + 4.0 * i as f64 / 59.0]).collect();
        let y: Vec<f64> = x.iter().map(|r| r[0].sin()).collect();
        (x, y)
    }

    #[test]
    fn fits_smooth_function_within_tube() {
        let (x, y) = sine_data();
        let params = SvrParams {
            epsilon: 0.05,
            c: 10.0,
            ..SvrParams::default()
        };
        let model = SvrModel::fit(&x, &y, &params).unwrap();

        let max_err = x
            .iter()
            .zip(&y)
            .map(|(r, t)| (model.predict_row(r) - t).abs())
            .fold(0.0, f64::max);
        assert!(max_err < 0.2, "max training error {max_err}");
    }

    #[test]
    fn wide_tube_has_no_support_vectors() {
        // Every target lies within epsilon of zero: β = 0 is optimal.
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y = vec![0.01; 10];
        let model = SvrModel::fit(&x, &y, &SvrParams::default()).unwrap();
        assert!(model.dual_coefs.is_empty());
        assert_eq!(model.predict_row(&[3.0]), 0.0);
    }

    #[test]
    fn dual_coefficients_respect_box() {
        let (x, y) = sine_data();
        let y: Vec<f64> = y.iter().map(|v| v * 100.0).collect();
        let params = SvrParams::default();
        let model = SvrModel::fit(&x, &y, &params).unwrap();
        assert!(model.dual_coefs.iter().all(|b| b.abs() <= params.c + 1e-12));
    }

    #[test]
    fn gamma_scale_uses_feature_variance() {
        let x = vec![vec![-1.0, 1.0], vec![1.0, -1.0]];
        // var of [-1, 1, 1, -1] = 1
        assert!((scale_gamma(&x) - 0.5).abs() < 1e-12);
        assert_eq!(scale_gamma(&[vec![3.0], vec![3.0]]), 1.0);
    }
}
