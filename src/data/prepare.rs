//! Supervised frame construction and the chronological train/test split.
//!
//! Predictor layout (column order is fixed and later drives selection order):
//!
//! 1. every non-target column at lag 0, in table order
//! 2. for each configured lag `k`, every column (target included) as `<col>_lag<k>`
//!
//! Rows with any missing value are dropped; nothing is imputed.

use tracing::{debug, info};

use crate::domain::{
    MIN_CLEAN_ROWS, Partition, PipelineConfig, SupervisedFrame, TrainTestSplit, TransformedSeriesTable,
};
use crate::error::PipelineError;

/// Name of the `k`-month lag of `column`.
pub fn lag_name(column: &str, k: usize) -> String {
    format!("{column}_lag{k}")
}

/// Build the cleaned supervised frame for the configured target and lags.
pub fn build_frame(table: &TransformedSeriesTable, config: &PipelineConfig) -> Result<SupervisedFrame, PipelineError> {
    let target_idx = table
        .column_index(&config.target)
        .ok_or_else(|| PipelineError::InvalidTable(format!("target column '{}' not found", config.target)))?;

    // (source column, lag) per predictor.
    let mut sources: Vec<(usize, usize)> = (0..table.columns.len())
        .filter(|&c| c != target_idx)
        .map(|c| (c, 0))
        .collect();
    let mut lags = config.lags.clone();
    lags.sort_unstable();
    lags.dedup();
    for &k in &lags {
        sources.extend((0..table.columns.len()).map(|c| (c, k)));
    }

    let predictor_names: Vec<String> = sources
        .iter()
        .map(|&(c, k)| {
            if k == 0 {
                table.columns[c].clone()
            } else {
                lag_name(&table.columns[c], k)
            }
        })
        .collect();

    let mut dates = Vec::new();
    let mut target = Vec::new();
    let mut predictors = Vec::new();
    let mut dropped = 0usize;

    for (i, date) in table.dates.iter().enumerate() {
        let y = table.values[i][target_idx];
        let row: Option<Vec<f64>> = sources
            .iter()
            .map(|&(c, k)| i.checked_sub(k).and_then(|src| table.values[src][c]))
            .collect();

        match (y, row) {
            (Some(y), Some(row)) => {
                dates.push(*date);
                target.push(y);
                predictors.push(row);
            }
            _ => dropped += 1,
        }
    }

    debug!(
        kept = dates.len(),
        dropped,
        predictors = predictor_names.len(),
        "built supervised frame"
    );

    Ok(SupervisedFrame {
        dates,
        target_name: config.target.clone(),
        target,
        predictor_names,
        predictors,
    })
}

/// Split a frame chronologically: the first `floor(n * fraction)` rows train.
pub fn split_frame(frame: &SupervisedFrame, train_fraction: f64) -> Result<TrainTestSplit, PipelineError> {
    if !(train_fraction.is_finite() && train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(PipelineError::Config(format!(
            "train_fraction must be in (0, 1), got {train_fraction}"
        )));
    }

    let n = frame.len();
    if n < MIN_CLEAN_ROWS {
        return Err(PipelineError::InsufficientData {
            required: MIN_CLEAN_ROWS,
            actual: n,
        });
    }

    // floor(n * f) < n for f < 1, so only the training side can come out empty.
    let n_train = (n as f64 * train_fraction).floor() as usize;
    if n_train == 0 {
        return Err(PipelineError::InsufficientData {
            required: (1.0 / train_fraction).ceil() as usize,
            actual: n,
        });
    }

    let part = |range: std::ops::Range<usize>| Partition {
        dates: frame.dates[range.clone()].to_vec(),
        feature_names: frame.predictor_names.clone(),
        features: frame.predictors[range.clone()].to_vec(),
        target: frame.target[range].to_vec(),
    };

    Ok(TrainTestSplit {
        target_name: frame.target_name.clone(),
        train_fraction,
        train: part(0..n_train),
        test: part(n_train..n),
    })
}

/// Data preparation stage: frame, clean, split.
pub fn prepare(table: &TransformedSeriesTable, config: &PipelineConfig) -> Result<TrainTestSplit, PipelineError> {
    let frame = build_frame(table, config)?;
    let split = split_frame(&frame, config.train_fraction)?;

    info!(
        target = %split.target_name,
        train = split.train.len(),
        test = split.test.len(),
        predictors = split.train.n_features(),
        "prepared train/test split"
    );
    Ok(split)
}
