//! Predictor selection via cross-validated Lasso.
//!
//! Only the training partition is read here; touching the test partition would
//! leak future information into the feature set.
//!
//! Selection rules:
//! 1. Fit `lasso_cv` on the training rows (standardized internally)
//! 2. Keep a predictor iff `|coef| > SELECTION_EPSILON` on the standardized scale
//! 3. Report survivors in original column order; fail if none survive

use tracing::{debug, info};

use crate::domain::{SelectedFeatureSet, TrainTestSplit};
use crate::error::PipelineError;
use crate::features::lasso::{CV_FOLDS, lasso_cv};

/// Coefficients at or below this magnitude count as zero.
pub const SELECTION_EPSILON: f64 = 1e-6;

pub fn select_features(split: &TrainTestSplit, seed: u64) -> Result<SelectedFeatureSet, PipelineError> {
    let train = &split.train;
    let candidates = train.n_features();
    if train.len() < CV_FOLDS {
        return Err(PipelineError::InsufficientData {
            required: CV_FOLDS,
            actual: train.len(),
        });
    }
    if candidates == 0 {
        return Err(PipelineError::NoFeaturesSelected { candidates });
    }

    let fit = lasso_cv(&train.features, &train.target);
    debug!(alpha = fit.alpha, path_len = fit.alphas.len(), "lasso cross-validation finished");

    let mut features = Vec::new();
    let mut coefficients = Vec::new();
    for (name, &coef) in train.feature_names.iter().zip(&fit.coefficients) {
        if coef.abs() > SELECTION_EPSILON {
            features.push(name.clone());
            coefficients.push(coef);
        }
    }

    if features.is_empty() {
        return Err(PipelineError::NoFeaturesSelected { candidates });
    }

    info!(
        selected = features.len(),
        candidates,
        alpha = fit.alpha,
        features = %features.join(","),
        "selected features"
    );

    Ok(SelectedFeatureSet {
        features,
        coefficients,
        alpha: fit.alpha,
        cv_folds: CV_FOLDS,
        epsilon: SELECTION_EPSILON,
        candidates,
        seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Partition;
    use chrono::NaiveDate;

    fn partition(rows: Vec<Vec<f64>>, target: Vec<f64>, names: &[&str]) -> Partition {
        let dates = (0..rows.len())
            .map(|i| NaiveDate::from_ymd_opt(1990 + (i / 12) as i32, (i % 12) as u32 + 1, 1).unwrap())
            .collect();
        Partition {
            dates,
            feature_names: names.iter().map(|s| s.to_string()).collect(),
            features: rows,
            target,
        }
    }

    fn split_with(train: Partition) -> TrainTestSplit {
        let test = Partition {
            dates: Vec::new(),
            feature_names: train.feature_names.clone(),
            features: Vec::new(),
            target: Vec::new(),
        };
        TrainTestSplit {
            target_name: "CPI".into(),
            train_fraction: 0.8,
            train,
            test,
        }
    }

    #[test]
    fn keeps_informative_predictor_in_column_order() {
        let rows: Vec<Vec<f64>> = (0..96)
            .map(|i| {
                let t = i as f64;
                vec![5.0, (t * 0.37).cos(), t * 0.05]
            })
            .collect();
        let target = rows.iter().map(|r| 1.0 + 0.8 * r[1] + 2.0 * r[2]).collect();
        let split = split_with(partition(rows, target, &["FLAT", "WAVE", "TREND"]));

        let selected = select_features(&split, 42).unwrap();
        assert_eq!(selected.features, vec!["WAVE", "TREND"]);
        assert_eq!(selected.coefficients.len(), 2);
        assert_eq!(selected.candidates, 3);
    }

    #[test]
    fn constant_target_fails_with_no_features() {
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 4) as f64]).collect();
        let split = split_with(partition(rows, vec![2.0; 40], &["a", "b"]));

        let err = select_features(&split, 42).unwrap_err();
        assert!(matches!(err, PipelineError::NoFeaturesSelected { candidates: 2 }));
    }

    #[test]
    fn too_few_rows_for_folds() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let split = split_with(partition(rows, vec![1.0, 2.0, 3.0], &["a"]));
        let err = select_features(&split, 42).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { .. }));
    }

    #[test]
    fn repeated_selection_is_identical() {
        let rows: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![i as f64, ((i * 31) % 11) as f64, ((i * 17) % 5) as f64])
            .collect();
        let target = rows.iter().map(|r| r[0] * 0.3 + r[1] * 0.01).collect();
        let split = split_with(partition(rows, target, &["a", "b", "c"]));

        let first = select_features(&split, 42).unwrap();
        let second = select_features(&split, 42).unwrap();
        assert_eq!(first, second);
    }
}
