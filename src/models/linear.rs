//! Multiple linear regression (OLS with intercept).

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::domain::ModelFamily;
use crate::error::PipelineError;
use crate::math::solve_stabilized;
use crate::models::Regressor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Deterministic least squares fit; no hyperparameters.
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Result<Self, PipelineError> {
        let n = x.len();
        let p = x.first().map_or(0, Vec::len);
        if n == 0 || n != y.len() {
            return Err(PipelineError::training(
                ModelFamily::Linear,
                format!("{n} feature rows for {} targets", y.len()),
            ));
        }

        // Intercept column first.
        let design = DMatrix::from_fn(n, p + 1, |i, j| if j == 0 { 1.0 } else { x[i][j - 1] });
        let target = DVector::from_column_slice(y);

        let beta = solve_stabilized(&design, &target).ok_or_else(|| {
            PipelineError::training(ModelFamily::Linear, "least squares system could not be solved")
        })?;

        Ok(Self {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
        })
    }
}

impl Regressor for LinearModel {
    fn family(&self) -> ModelFamily {
        ModelFamily::Linear
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept + self.coefficients.iter().zip(row).map(|(b, x)| b * x).sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_plane() {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 0.5 + 2.0 * r[0] - 3.0 * r[1]).collect();

        let model = LinearModel::fit(&x, &y).unwrap();
        assert!((model.intercept - 0.5).abs() < 1e-8);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-8);
        assert!((model.coefficients[1] + 3.0).abs() < 1e-8);
        assert!((model.predict_row(&[10.0, 1.0]) - 17.5).abs() < 1e-8);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = LinearModel::fit(&[vec![1.0]], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
