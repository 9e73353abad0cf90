//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages as persisted artifacts
//! - exported to JSON/CSV
//! - reloaded later by a re-run of any downstream stage

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::FittedModel;

/// Default forecast target column.
pub const DEFAULT_TARGET: &str = "CPI";

/// Default chronological train fraction (80/20 split).
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/// Default seed for every randomized fitter.
pub const DEFAULT_SEED: u64 = 42;

/// Minimum clean rows (months) required before splitting.
///
/// Two years of monthly data leaves enough training rows for 5-fold CV.
pub const MIN_CLEAN_ROWS: usize = 24;

/// Regression model family.
///
/// The set is closed; every stage that fans out iterates `ModelFamily::ALL`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Linear,
    Ensemble,
    Kernel,
}

impl ModelFamily {
    /// All families, ordered from simplest to most complex.
    pub const ALL: [ModelFamily; 3] = [ModelFamily::Linear, ModelFamily::Ensemble, ModelFamily::Kernel];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::Linear => "linear",
            ModelFamily::Ensemble => "ensemble",
            ModelFamily::Kernel => "kernel",
        }
    }

    /// Human-readable label for reports.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelFamily::Linear => "MLR",
            ModelFamily::Ensemble => "RandomForest",
            ModelFamily::Kernel => "SVR",
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum StageName {
    Prepare,
    Select,
    Scale,
    Train,
    Evaluate,
    Serialize,
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// `None` grows trees until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_depth: None,
        }
    }
}

/// Epsilon-SVR hyperparameters (RBF kernel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvrParams {
    pub c: f64,
    pub epsilon: f64,
    /// Explicit RBF gamma; `None` means `1 / (n_features * var(X))`.
    pub gamma: Option<f64>,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for SvrParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.1,
            gamma: None,
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

/// Explicit configuration passed into every stage call.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub table_file: String,
    pub output_dir: PathBuf,
    pub target: String,
    /// Extra lags (in months) added for every column, target included.
    pub lags: Vec<usize>,
    pub train_fraction: f64,
    pub seed: u64,
    pub forest: ForestParams,
    pub svr: SvrParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            table_file: "transformed_data.csv".to_string(),
            output_dir: PathBuf::from("data").join("model_output"),
            target: DEFAULT_TARGET.to_string(),
            lags: Vec::new(),
            train_fraction: DEFAULT_TRAIN_FRACTION,
            seed: DEFAULT_SEED,
            forest: ForestParams::default(),
            svr: SvrParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Location of the transformed monthly table.
    pub fn table_path(&self) -> PathBuf {
        self.data_dir.join(&self.table_file)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.train_fraction.is_finite() && self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(PipelineError::Config(format!(
                "train_fraction must be in (0, 1), got {}",
                self.train_fraction
            )));
        }
        if self.target.trim().is_empty() {
            return Err(PipelineError::Config("target column name is empty".to_string()));
        }
        if self.lags.contains(&0) {
            return Err(PipelineError::Config("lags must be >= 1 month".to_string()));
        }
        if self.forest.n_trees == 0 {
            return Err(PipelineError::Config("forest needs at least one tree".to_string()));
        }
        if self.forest.min_samples_leaf == 0 || self.forest.min_samples_split < 2 {
            return Err(PipelineError::Config(
                "forest needs min_samples_leaf >= 1 and min_samples_split >= 2".to_string(),
            ));
        }
        if !(self.svr.c.is_finite() && self.svr.c > 0.0) {
            return Err(PipelineError::Config("svr C must be positive".to_string()));
        }
        if !(self.svr.epsilon.is_finite() && self.svr.epsilon >= 0.0) {
            return Err(PipelineError::Config("svr epsilon must be non-negative".to_string()));
        }
        if let Some(gamma) = self.svr.gamma {
            if !(gamma.is_finite() && gamma > 0.0) {
                return Err(PipelineError::Config("svr gamma must be positive".to_string()));
            }
        }
        Ok(())
    }
}

/// Monthly table produced by the (external) transform stage.
///
/// Row-major; `None` marks a missing observation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedSeriesTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl TransformedSeriesTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }
}

/// Target plus ordered predictor columns, missing rows already dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisedFrame {
    pub dates: Vec<NaiveDate>,
    pub target_name: String,
    pub target: Vec<f64>,
    pub predictor_names: Vec<String>,
    /// Row-major predictor values, `predictors[row][col]`.
    pub predictors: Vec<Vec<f64>>,
}

impl SupervisedFrame {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// A contiguous block of dated rows with named feature columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub dates: Vec<NaiveDate>,
    pub feature_names: Vec<String>,
    /// Row-major feature values, `features[row][col]`.
    pub features: Vec<Vec<f64>>,
    pub target: Vec<f64>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Copy of one feature column.
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.features.iter().map(|row| row[j]).collect()
    }

    /// Restrict to the named features, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Partition, PipelineError> {
        let idx = names
            .iter()
            .map(|name| {
                self.feature_names.iter().position(|f| f == name).ok_or_else(|| {
                    PipelineError::InvalidTable(format!("feature '{name}' not present in partition"))
                })
            })
            .collect::<Result<Vec<usize>, PipelineError>>()?;

        let features = self
            .features
            .iter()
            .map(|row| idx.iter().map(|&j| row[j]).collect())
            .collect();

        Ok(Partition {
            dates: self.dates.clone(),
            feature_names: names.to_vec(),
            features,
            target: self.target.clone(),
        })
    }
}

/// Chronological train/test partition of a `SupervisedFrame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub target_name: String,
    pub train_fraction: f64,
    pub train: Partition,
    pub test: Partition,
}

/// Predictors retained by L1 selection, in original column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedFeatureSet {
    pub features: Vec<String>,
    /// Standardized-scale coefficient of each retained feature.
    pub coefficients: Vec<f64>,
    /// Penalty strength chosen by cross-validation.
    pub alpha: f64,
    pub cv_folds: usize,
    pub epsilon: f64,
    pub candidates: usize,
    pub seed: u64,
}

/// Fitted standardization parameters, one entry per selected feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingTransform {
    pub features: Vec<String>,
    pub means: Vec<f64>,
    /// Standard deviation, or `1.0` where the training column was constant.
    pub scales: Vec<f64>,
}

/// Train/test partitions after scaling, restricted to selected features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledPartitions {
    pub train: Partition,
    pub test: Partition,
}

/// A fitted model together with its family and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub family: ModelFamily,
    pub feature_names: Vec<String>,
    pub hyperparameters: BTreeMap<String, f64>,
    /// RNG seed of randomized fitters, kept integral so every `u64` survives JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub n_train: usize,
    pub model: FittedModel,
}

/// One test-set prediction aligned to its month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedPrediction {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

/// Error metrics of one model on the test partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub family: ModelFamily,
    pub rmse: f64,
    pub mae: f64,
    /// `NaN` when the test target has zero variance.
    #[serde(with = "nan_as_null")]
    pub r_squared: f64,
    pub n_test: usize,
    pub predictions: Vec<DatedPrediction>,
}

/// One row of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub family: ModelFamily,
    pub model: String,
    pub rmse: f64,
    pub mae: f64,
    #[serde(with = "nan_as_null")]
    pub r_squared: f64,
}

/// One test month with the actual value and every model's prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: BTreeMap<ModelFamily, f64>,
}

/// Terminal artifact: metrics per model, the winner and aligned predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub target: String,
    pub rows: Vec<ComparisonRow>,
    pub best: ModelFamily,
    pub predictions: Vec<PredictionRow>,
}

impl ComparisonReport {
    pub fn row(&self, family: ModelFamily) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.family == family)
    }
}

/// JSON has no NaN; undefined metrics round-trip through `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
