//! Standardization of selected features.
//!
//! Mean and population standard deviation come from the training partition only;
//! the test partition is transformed with the same parameters so no test-set
//! statistics leak into training.
//!
//! Zero-variance policy: a training column with `std < SCALE_FLOOR` keeps a scale
//! of `1.0`. Its scaled values are `x - mean` (all zeros on the training rows),
//! and a warning is logged.

use tracing::{debug, warn};

use crate::domain::{Partition, ScaledPartitions, ScalingTransform, SelectedFeatureSet, TrainTestSplit};
use crate::error::PipelineError;
use crate::math::{mean, std_dev};

/// Standard deviations below this are treated as zero.
pub const SCALE_FLOOR: f64 = 1e-12;

/// `(mean, scale)` of one column under the zero-variance policy.
pub fn column_moments(values: &[f64]) -> (f64, f64) {
    let m = mean(values);
    let sd = std_dev(values);
    let scale = if sd.is_finite() && sd >= SCALE_FLOOR { sd } else { 1.0 };
    (m, scale)
}

impl ScalingTransform {
    /// Fit on every feature column of `train`.
    pub fn fit(train: &Partition) -> Result<Self, PipelineError> {
        if train.is_empty() {
            return Err(PipelineError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let mut means = Vec::with_capacity(train.n_features());
        let mut scales = Vec::with_capacity(train.n_features());
        for (j, name) in train.feature_names.iter().enumerate() {
            let column = train.column(j);
            let (m, s) = column_moments(&column);
            if !(std_dev(&column) >= SCALE_FLOOR) {
                warn!(feature = %name, "zero training variance; scaling with denominator 1.0");
            }
            means.push(m);
            scales.push(s);
        }

        Ok(Self {
            features: train.feature_names.clone(),
            means,
            scales,
        })
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    pub fn inverse_transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(z, (m, s))| z * s + m)
            .collect()
    }

    /// Scale a partition whose columns match this transform exactly.
    pub fn transform(&self, partition: &Partition) -> Result<Partition, PipelineError> {
        self.check_layout(partition)?;
        Ok(Partition {
            features: partition.features.iter().map(|r| self.transform_row(r)).collect(),
            ..partition.clone()
        })
    }

    pub fn inverse_transform(&self, partition: &Partition) -> Result<Partition, PipelineError> {
        self.check_layout(partition)?;
        Ok(Partition {
            features: partition
                .features
                .iter()
                .map(|r| self.inverse_transform_row(r))
                .collect(),
            ..partition.clone()
        })
    }

    fn check_layout(&self, partition: &Partition) -> Result<(), PipelineError> {
        if partition.feature_names != self.features {
            return Err(PipelineError::ShapeMismatch {
                context: "scaling transform feature layout".to_string(),
                expected: self.features.len(),
                actual: partition.n_features(),
            });
        }
        Ok(())
    }
}

/// Restrict both partitions to the selected features, fit on train, apply to both.
pub fn scale(
    split: &TrainTestSplit,
    selected: &SelectedFeatureSet,
) -> Result<(ScaledPartitions, ScalingTransform), PipelineError> {
    let train = split.train.select(&selected.features)?;
    let test = split.test.select(&selected.features)?;

    let transform = ScalingTransform::fit(&train)?;
    let scaled = ScaledPartitions {
        train: transform.transform(&train)?,
        test: transform.transform(&test)?,
    };
    debug!(
        features = transform.features.len(),
        train_rows = scaled.train.len(),
        test_rows = scaled.test.len(),
        "scaled selected features"
    );

    Ok((scaled, transform))
}
