//! Result serialization: metrics from every family merged into one comparison.
//!
//! The report holds:
//! - one metrics row per family, in `ModelFamily::ALL` order
//! - the best family (lowest RMSE; ties go to the simpler family; NaN never wins)
//! - a predictions table, one row per test month with every family's forecast

pub mod format;

pub use format::*;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::{ComparisonReport, ComparisonRow, EvaluationMetrics, ModelFamily, PredictionRow};
use crate::error::PipelineError;

/// Build the comparison report from per-family metrics.
pub fn serialize(metrics: &[EvaluationMetrics], target: &str) -> Result<ComparisonReport, PipelineError> {
    if metrics.is_empty() {
        return Err(PipelineError::InsufficientData { required: 1, actual: 0 });
    }

    let mut by_family: BTreeMap<ModelFamily, &EvaluationMetrics> = BTreeMap::new();
    for m in metrics {
        if by_family.insert(m.family, m).is_some() {
            return Err(PipelineError::ShapeMismatch {
                context: format!("metrics records for {}", m.family),
                expected: 1,
                actual: 2,
            });
        }
    }

    // BTreeMap iterates in declaration order: linear, ensemble, kernel.
    let rows: Vec<ComparisonRow> = by_family
        .values()
        .map(|m| ComparisonRow {
            family: m.family,
            model: m.family.display_name().to_string(),
            rmse: m.rmse,
            mae: m.mae,
            r_squared: m.r_squared,
        })
        .collect();

    let best = select_best(&rows).ok_or_else(|| PipelineError::ShapeMismatch {
        context: "models with a finite RMSE".to_string(),
        expected: 1,
        actual: 0,
    })?;

    let predictions = merge_predictions(by_family.values().copied())?;

    info!(
        best = best.display_name(),
        models = rows.len(),
        test_months = predictions.len(),
        "serialized model comparison"
    );

    Ok(ComparisonReport {
        target: target.to_string(),
        rows,
        best,
        predictions,
    })
}

/// Lowest finite RMSE; rows are expected in family order so the first of a tie wins.
pub fn select_best(rows: &[ComparisonRow]) -> Option<ModelFamily> {
    let mut best: Option<&ComparisonRow> = None;
    for row in rows.iter().filter(|r| r.rmse.is_finite()) {
        let better = match best {
            None => true,
            Some(b) => row.rmse < b.rmse || (row.rmse == b.rmse && row.family < b.family),
        };
        if better {
            best = Some(row);
        }
    }
    best.map(|r| r.family)
}

fn merge_predictions<'a>(
    metrics: impl Iterator<Item = &'a EvaluationMetrics>,
) -> Result<Vec<PredictionRow>, PipelineError> {
    let mut table: BTreeMap<NaiveDate, PredictionRow> = BTreeMap::new();
    for m in metrics {
        for p in &m.predictions {
            let row = table.entry(p.date).or_insert_with(|| PredictionRow {
                date: p.date,
                actual: p.actual,
                predicted: BTreeMap::new(),
            });
            if row.actual != p.actual {
                return Err(PipelineError::ShapeMismatch {
                    context: format!("{} actual value at {} disagrees with other models", m.family, p.date),
                    expected: 1,
                    actual: 2,
                });
            }
            row.predicted.insert(m.family, p.predicted);
        }
    }
    Ok(table.into_values().collect())
}
