//! Stage entry points with artifact handoff.
//!
//! Every stage takes the explicit `PipelineConfig` plus the locators of its
//! upstream artifacts, reads them from disk, runs the pure computation and
//! publishes its own artifact(s) atomically. Nothing is passed in memory across
//! a stage boundary, so any stage can be re-run on its own.

use tracing::info;

use crate::data::prepare;
use crate::domain::{
    EvaluationMetrics, ModelFamily, PipelineConfig, ScaledPartitions, SelectedFeatureSet, TrainTestSplit,
    TrainedModel,
};
use crate::error::PipelineError;
use crate::features::{scale, select_features};
use crate::fit::{evaluate, train};
use crate::io::artifact::{ArtifactKind, ArtifactLocator, ArtifactStore, read_json};
use crate::io::export::{comparison_csv, predictions_csv};
use crate::io::table::load_table;
use crate::report::serialize;

/// Artifacts published by the scaling stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleArtifacts {
    pub transform: ArtifactLocator,
    pub scaled: ArtifactLocator,
}

/// Artifacts published by the serialization stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifacts {
    pub comparison_json: ArtifactLocator,
    pub comparison_csv: ArtifactLocator,
    pub predictions_csv: ArtifactLocator,
}

pub fn store(config: &PipelineConfig) -> ArtifactStore {
    ArtifactStore::new(&config.output_dir)
}

/// Create the output directory; safe to call repeatedly.
pub fn ensure_output_dir(config: &PipelineConfig) -> Result<ArtifactStore, PipelineError> {
    let store = store(config);
    store.ensure_dir()?;
    Ok(store)
}

pub fn prepare_stage(config: &PipelineConfig) -> Result<ArtifactLocator, PipelineError> {
    let path = config.table_path();
    info!(stage = "prepare", table = %path.display(), "running stage");
    let table = load_table(&path)?;
    let split = prepare(&table, config)?;
    store(config).write_json(ArtifactKind::Split, &split)
}

pub fn select_stage(config: &PipelineConfig, split: &ArtifactLocator) -> Result<ArtifactLocator, PipelineError> {
    info!(stage = "select", "running stage");
    let split: TrainTestSplit = read_json(split)?;
    let selected = select_features(&split, config.seed)?;
    store(config).write_json(ArtifactKind::Selection, &selected)
}

pub fn scale_stage(
    config: &PipelineConfig,
    split: &ArtifactLocator,
    selection: &ArtifactLocator,
) -> Result<ScaleArtifacts, PipelineError> {
    info!(stage = "scale", "running stage");
    let split: TrainTestSplit = read_json(split)?;
    let selected: SelectedFeatureSet = read_json(selection)?;
    let (scaled, transform) = scale(&split, &selected)?;

    let store = store(config);
    Ok(ScaleArtifacts {
        transform: store.write_json(ArtifactKind::Scaler, &transform)?,
        scaled: store.write_json(ArtifactKind::ScaledFeatures, &scaled)?,
    })
}

pub fn train_stage(
    config: &PipelineConfig,
    family: ModelFamily,
    scaled: &ArtifactLocator,
) -> Result<ArtifactLocator, PipelineError> {
    info!(stage = "train", %family, "running stage");
    let scaled: ScaledPartitions = read_json(scaled)?;
    let model = train(family, &scaled.train, config)?;
    store(config).write_json(ArtifactKind::Model(family), &model)
}

pub fn evaluate_stage(
    config: &PipelineConfig,
    model: &ArtifactLocator,
    scaled: &ArtifactLocator,
) -> Result<ArtifactLocator, PipelineError> {
    let model: TrainedModel = read_json(model)?;
    info!(stage = "evaluate", family = %model.family, "running stage");
    let scaled: ScaledPartitions = read_json(scaled)?;
    let metrics = evaluate(&model, &scaled.test)?;
    store(config).write_json(ArtifactKind::Metrics(model.family), &metrics)
}

pub fn serialize_stage(config: &PipelineConfig, metrics: &[ArtifactLocator]) -> Result<ReportArtifacts, PipelineError> {
    info!(stage = "serialize", models = metrics.len(), "running stage");
    let metrics = metrics
        .iter()
        .map(read_json::<EvaluationMetrics>)
        .collect::<Result<Vec<_>, _>>()?;
    let report = serialize(&metrics, &config.target)?;

    let store = store(config);
    Ok(ReportArtifacts {
        comparison_csv: store.write_bytes(ArtifactKind::ComparisonCsv, &comparison_csv(&report)?)?,
        comparison_json: store.write_json(ArtifactKind::ComparisonJson, &report)?,
        predictions_csv: store.write_bytes(ArtifactKind::PredictionsCsv, &predictions_csv(&report)?)?,
    })
}
