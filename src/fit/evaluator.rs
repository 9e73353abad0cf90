//! Test-set scoring of a trained model.
//!
//! Predictions are keyed by test month and joined to the truth through a date
//! lookup, so a reordered or truncated partition can never be silently scored
//! against the wrong months.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::{DatedPrediction, EvaluationMetrics, Partition, TrainedModel};
use crate::error::PipelineError;
use crate::math::{mae, r_squared, rmse};
use crate::models::Regressor;

pub fn evaluate(model: &TrainedModel, test: &Partition) -> Result<EvaluationMetrics, PipelineError> {
    let family = model.family;
    if model.feature_names != test.feature_names {
        return Err(PipelineError::ShapeMismatch {
            context: format!(
                "{family} feature layout [{}] vs test [{}]",
                model.feature_names.join(","),
                test.feature_names.join(",")
            ),
            expected: model.feature_names.len(),
            actual: test.n_features(),
        });
    }
    if test.is_empty() {
        return Err(PipelineError::InsufficientData { required: 1, actual: 0 });
    }
    if let Some(row) = test.features.iter().find(|row| row.len() != model.feature_names.len()) {
        return Err(PipelineError::ShapeMismatch {
            context: format!("{family} test row width"),
            expected: model.feature_names.len(),
            actual: row.len(),
        });
    }

    let predicted = model.model.predict(&test.features);
    if predicted.len() != test.len() {
        return Err(PipelineError::ShapeMismatch {
            context: format!("{family} prediction count"),
            expected: test.len(),
            actual: predicted.len(),
        });
    }
    if predicted.iter().any(|p| !p.is_finite()) {
        return Err(PipelineError::training(family, "model produced non-finite predictions"));
    }

    let truth: BTreeMap<NaiveDate, f64> = test.dates.iter().copied().zip(test.target.iter().copied()).collect();
    let keyed: BTreeMap<NaiveDate, f64> = test.dates.iter().copied().zip(predicted).collect();
    if truth.len() != test.len() || keyed.len() != test.len() {
        return Err(PipelineError::ShapeMismatch {
            context: format!("{family} distinct test dates"),
            expected: test.len(),
            actual: keyed.len().min(truth.len()),
        });
    }

    let predictions = keyed
        .iter()
        .map(|(date, &predicted)| {
            let actual = *truth.get(date).ok_or_else(|| PipelineError::ShapeMismatch {
                context: format!("{family} actual value for {date}"),
                expected: 1,
                actual: 0,
            })?;
            Ok::<_, PipelineError>(DatedPrediction {
                date: *date,
                actual,
                predicted,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    let actual: Vec<f64> = predictions.iter().map(|p| p.actual).collect();
    let fitted: Vec<f64> = predictions.iter().map(|p| p.predicted).collect();
    let metrics = EvaluationMetrics {
        family,
        rmse: rmse(&actual, &fitted),
        mae: mae(&actual, &fitted),
        r_squared: r_squared(&actual, &fitted),
        n_test: predictions.len(),
        predictions,
    };

    info!(
        model = family.display_name(),
        rmse = metrics.rmse,
        mae = metrics.mae,
        r2 = metrics.r_squared,
        "evaluated model"
    );
    Ok(metrics)
}
