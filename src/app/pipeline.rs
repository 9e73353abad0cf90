//! End-to-end pipeline shared by the `run` and `stage` commands.
//!
//! prepare -> select -> scale -> {train x3} -> {evaluate x3} -> serialize
//!
//! The three trainers and the three evaluators are independent and fan out
//! over `rayon`; results are collected in `ModelFamily::ALL` order.

use rayon::prelude::*;
use tracing::info;

use crate::app::stages::{
    ReportArtifacts, ScaleArtifacts, ensure_output_dir, evaluate_stage, prepare_stage, scale_stage, select_stage,
    serialize_stage, store, train_stage,
};
use crate::domain::{ComparisonReport, ModelFamily, PipelineConfig, StageName};
use crate::error::PipelineError;
use crate::io::artifact::{ArtifactKind, ArtifactLocator, read_json};

/// Locators of everything a full run published, plus the final report.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub split: ArtifactLocator,
    pub selection: ArtifactLocator,
    pub scaling: ScaleArtifacts,
    pub models: Vec<ArtifactLocator>,
    pub metrics: Vec<ArtifactLocator>,
    pub outputs: ReportArtifacts,
    pub report: ComparisonReport,
}

/// Run every stage in order.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunOutput, PipelineError> {
    config.validate()?;
    ensure_output_dir(config)?;

    let split = prepare_stage(config)?;
    let selection = select_stage(config, &split)?;
    let scaling = scale_stage(config, &split, &selection)?;
    let models = train_all(config, &ModelFamily::ALL, &scaling.scaled)?;
    let metrics = evaluate_all(config, &models, &scaling.scaled)?;
    let outputs = serialize_stage(config, &metrics)?;
    let report: ComparisonReport = read_json(&outputs.comparison_json)?;

    info!(best = report.best.display_name(), output = %config.output_dir.display(), "pipeline finished");

    Ok(RunOutput {
        split,
        selection,
        scaling,
        models,
        metrics,
        outputs,
        report,
    })
}

fn train_all(
    config: &PipelineConfig,
    families: &[ModelFamily],
    scaled: &ArtifactLocator,
) -> Result<Vec<ArtifactLocator>, PipelineError> {
    families
        .par_iter()
        .map(|&family| train_stage(config, family, scaled))
        .collect()
}

fn evaluate_all(
    config: &PipelineConfig,
    models: &[ArtifactLocator],
    scaled: &ArtifactLocator,
) -> Result<Vec<ArtifactLocator>, PipelineError> {
    models
        .par_iter()
        .map(|model| evaluate_stage(config, model, scaled))
        .collect()
}

/// Run one stage against the fixed upstream locators in the output directory.
///
/// `family` restricts `train` and `evaluate` to one model; `None` runs all three.
/// Returns the locators the stage published.
pub fn run_stage(
    config: &PipelineConfig,
    stage: StageName,
    family: Option<ModelFamily>,
) -> Result<Vec<ArtifactLocator>, PipelineError> {
    config.validate()?;
    let store = store(config);
    let families: Vec<ModelFamily> = family.map_or_else(|| ModelFamily::ALL.to_vec(), |f| vec![f]);

    match stage {
        StageName::Prepare => {
            ensure_output_dir(config)?;
            Ok(vec![prepare_stage(config)?])
        }
        StageName::Select => {
            let split = store.existing(ArtifactKind::Split)?;
            Ok(vec![select_stage(config, &split)?])
        }
        StageName::Scale => {
            let split = store.existing(ArtifactKind::Split)?;
            let selection = store.existing(ArtifactKind::Selection)?;
            let out = scale_stage(config, &split, &selection)?;
            Ok(vec![out.transform, out.scaled])
        }
        StageName::Train => {
            let scaled = store.existing(ArtifactKind::ScaledFeatures)?;
            train_all(config, &families, &scaled)
        }
        StageName::Evaluate => {
            let scaled = store.existing(ArtifactKind::ScaledFeatures)?;
            let models = families
                .iter()
                .map(|&f| store.existing(ArtifactKind::Model(f)))
                .collect::<Result<Vec<_>, _>>()?;
            evaluate_all(config, &models, &scaled)
        }
        StageName::Serialize => {
            let metrics = ModelFamily::ALL
                .iter()
                .map(|&f| store.existing(ArtifactKind::Metrics(f)))
                .collect::<Result<Vec<_>, _>>()?;
            let out = serialize_stage(config, &metrics)?;
            Ok(vec![out.comparison_csv, out.comparison_json, out.predictions_csv])
        }
    }
}

/// Load the published comparison report.
pub fn load_report(config: &PipelineConfig) -> Result<ComparisonReport, PipelineError> {
    let locator = store(config).existing(ArtifactKind::ComparisonJson)?;
    read_json(&locator)
}
