//! Training of a single model family on the scaled training partition.
//!
//! Inputs are validated before any fitter runs: the partition must be
//! non-empty, have at least one feature, be rectangular and finite. Each
//! family then fits with its configured hyperparameters, which are recorded on
//! the `TrainedModel` alongside the feature names.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::domain::{ModelFamily, Partition, PipelineConfig, TrainedModel};
use crate::error::PipelineError;
use crate::math::RIDGE_LAMBDA;
use crate::models::FittedModel;

pub fn train(family: ModelFamily, train: &Partition, config: &PipelineConfig) -> Result<TrainedModel, PipelineError> {
    validate_training_input(family, train)?;

    debug!(%family, rows = train.len(), features = train.n_features(), "fitting model");
    let model = FittedModel::fit(family, &train.features, &train.target, config)?;
    let hyperparameters = hyperparameters(&model, config);
    let seed = matches!(model, FittedModel::Ensemble(_)).then_some(config.seed);

    info!(
        model = family.display_name(),
        rows = train.len(),
        features = train.n_features(),
        "trained model"
    );

    Ok(TrainedModel {
        family,
        feature_names: train.feature_names.clone(),
        hyperparameters,
        seed,
        n_train: train.len(),
        model,
    })
}

fn validate_training_input(family: ModelFamily, train: &Partition) -> Result<(), PipelineError> {
    if train.is_empty() {
        return Err(PipelineError::training(family, "training partition is empty"));
    }
    let p = train.n_features();
    if p == 0 {
        return Err(PipelineError::training(family, "training partition has no feature columns"));
    }
    if train.features.len() != train.len() || train.target.len() != train.len() {
        return Err(PipelineError::training(
            family,
            format!(
                "{} dates, {} feature rows and {} targets",
                train.len(),
                train.features.len(),
                train.target.len()
            ),
        ));
    }
    if let Some((i, row)) = train.features.iter().enumerate().find(|(_, row)| row.len() != p) {
        return Err(PipelineError::training(
            family,
            format!("row {i} has {} values, expected {p}", row.len()),
        ));
    }
    if train.features.iter().flatten().chain(&train.target).any(|v| !v.is_finite()) {
        return Err(PipelineError::training(family, "training data contains non-finite values"));
    }
    Ok(())
}

/// Hyperparameters actually used by the fitted model (resolved defaults included).
fn hyperparameters(model: &FittedModel, config: &PipelineConfig) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    let mut put = |k: &str, v: f64| {
        out.insert(k.to_string(), v);
    };
    match model {
        FittedModel::Linear(_) => {
            put("fit_intercept", 1.0);
            put("ridge_fallback_lambda", RIDGE_LAMBDA);
        }
        FittedModel::Ensemble(_) => {
            let f = &config.forest;
            put("n_trees", f.n_trees as f64);
            put("min_samples_split", f.min_samples_split as f64);
            put("min_samples_leaf", f.min_samples_leaf as f64);
            if let Some(depth) = f.max_depth {
                put("max_depth", depth as f64);
            }
        }
        FittedModel::Kernel(svr) => {
            let s = &config.svr;
            put("c", s.c);
            put("epsilon", s.epsilon);
            put("gamma", svr.gamma);
            put("max_iter", s.max_iter as f64);
            put("tol", s.tol);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ForestParams;
    use crate::models::Regressor;
    use chrono::{Months, NaiveDate};

    fn partition(rows: Vec<Vec<f64>>, target: Vec<f64>) -> Partition {
        let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        let p = rows.first().map_or(0, Vec::len);
        Partition {
            dates: (0..rows.len()).map(|i| start + Months::new(i as u32)).collect(),
            feature_names: (0..p).map(|j| format!("x{j}")).collect(),
            features: rows,
            target,
        }
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            forest: ForestParams {
                n_trees: 8,
                ..ForestParams::default()
            },
            ..PipelineConfig::default()
        }
    }

    fn plane() -> Partition {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i as f64 - 20.0) / 10.0, ((i * 7) % 9) as f64 / 4.0 - 1.0])
            .collect();
        let target = rows.iter().map(|r| 0.5 + 1.5 * r[0] - 0.7 * r[1]).collect();
        partition(rows, target)
    }

    #[test]
    fn trains_every_family_and_records_features() {
        let data = plane();
        for family in ModelFamily::ALL {
            let trained = train(family, &data, &small_config()).unwrap();
            assert_eq!(trained.family, family);
            assert_eq!(trained.model.family(), family);
            assert_eq!(trained.feature_names, vec!["x0", "x1"]);
            assert_eq!(trained.n_train, 40);
            assert!(!trained.hyperparameters.is_empty());
        }
    }

    #[test]
    fn kernel_records_resolved_gamma() {
        let trained = train(ModelFamily::Kernel, &plane(), &small_config()).unwrap();
        let gamma = trained.hyperparameters["gamma"];
        assert!(gamma.is_finite() && gamma > 0.0);
        assert_eq!(trained.hyperparameters["c"], 1.0);
        assert_eq!(trained.hyperparameters["epsilon"], 0.1);
    }

    #[test]
    fn forest_hyperparameters_are_sorted_and_complete() {
        let trained = train(ModelFamily::Ensemble, &plane(), &small_config()).unwrap();
        let keys: Vec<&str> = trained.hyperparameters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["min_samples_leaf", "min_samples_split", "n_trees"]);
        assert_eq!(trained.hyperparameters["n_trees"], 8.0);
    }

    #[test]
    fn large_forest_seed_survives_json_exactly() {
        let config = PipelineConfig {
            seed: u64::MAX - 1,
            ..small_config()
        };
        let trained = train(ModelFamily::Ensemble, &plane(), &config).unwrap();
        assert_eq!(trained.seed, Some(u64::MAX - 1));

        let json = serde_json::to_string(&trained).unwrap();
        let back: TrainedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seed, Some(u64::MAX - 1));

        let linear = train(ModelFamily::Linear, &plane(), &config).unwrap();
        assert_eq!(linear.seed, None);
    }

    #[test]
    fn rejects_empty_partition() {
        let err = train(ModelFamily::Linear, &partition(Vec::new(), Vec::new()), &small_config()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Training {
                family: ModelFamily::Linear,
                ..
            }
        ));
    }

    #[test]
    fn rejects_partition_without_features() {
        let data = partition(vec![Vec::new(); 5], vec![1.0; 5]);
        let err = train(ModelFamily::Kernel, &data, &small_config()).unwrap_err();
        assert!(err.to_string().contains("no feature columns"), "{err}");
    }

    #[test]
    fn rejects_ragged_rows() {
        let mut data = plane();
        data.features[3].pop();
        let err = train(ModelFamily::Ensemble, &data, &small_config()).unwrap_err();
        assert!(err.to_string().contains("row 3"), "{err}");
    }

    #[test]
    fn rejects_non_finite_values() {
        let mut data = plane();
        data.target[0] = f64::NAN;
        assert_eq!(train(ModelFamily::Linear, &data, &small_config()).unwrap_err().exit_code(), 4);

        let mut data = plane();
        data.features[1][1] = f64::INFINITY;
        assert!(train(ModelFamily::Kernel, &data, &small_config()).is_err());
    }
}
