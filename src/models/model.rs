//! Family-generic model interface.
//!
//! The fitter relies on two primitive operations:
//! - fit a family on a row-major feature matrix + target
//! - predict one row
//!
//! These are dispatched here for each family.

use serde::{Deserialize, Serialize};

use crate::domain::{ModelFamily, PipelineConfig};
use crate::error::PipelineError;
use crate::models::{LinearModel, RandomForest, SvrModel};

/// Anything that can score a feature row.
pub trait Regressor {
    fn family(&self) -> ModelFamily;

    fn predict_row(&self, row: &[f64]) -> f64;

    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }
}

/// A fitted model of any family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum FittedModel {
    Linear(LinearModel),
    Ensemble(RandomForest),
    Kernel(SvrModel),
}

impl FittedModel {
    /// Fit the requested family with the hyperparameters from `config`.
    pub fn fit(
        family: ModelFamily,
        x: &[Vec<f64>],
        y: &[f64],
        config: &PipelineConfig,
    ) -> Result<Self, PipelineError> {
        Ok(match family {
            ModelFamily::Linear => FittedModel::Linear(LinearModel::fit(x, y)?),
            ModelFamily::Ensemble => {
                FittedModel::Ensemble(RandomForest::fit(x, y, &config.forest, config.seed)?)
            }
            ModelFamily::Kernel => FittedModel::Kernel(SvrModel::fit(x, y, &config.svr)?),
        })
    }
}

impl Regressor for FittedModel {
    fn family(&self) -> ModelFamily {
        match self {
            FittedModel::Linear(m) => m.family(),
            FittedModel::Ensemble(m) => m.family(),
            FittedModel::Kernel(m) => m.family(),
        }
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            FittedModel::Linear(m) => m.predict_row(row),
            FittedModel::Ensemble(m) => m.predict_row(row),
            FittedModel::Kernel(m) => m.predict_row(row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64 / 10.0 - 1.5]).collect();
        let y: Vec<f64> = x.iter().map(|r| 1.0 + 2.0 * r[0]).collect();
        (x, y)
    }

    #[test]
    fn fit_dispatches_to_each_family() {
        let (x, y) = line_data();
        let config = PipelineConfig {
            forest: crate::domain::ForestParams {
                n_trees: 5,
                ..Default::default()
            },
            ..PipelineConfig::default()
        };
        for family in ModelFamily::ALL {
            let model = FittedModel::fit(family, &x, &y, &config).unwrap();
            assert_eq!(model.family(), family);
            let preds = model.predict(&x);
            assert_eq!(preds.len(), x.len());
            assert!(preds.iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn fitted_model_json_is_tagged_by_family() {
        let (x, y) = line_data();
        let model = FittedModel::fit(ModelFamily::Linear, &x, &y, &PipelineConfig::default()).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"family\":\"linear\""), "{json}");
        let back: FittedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }
}
