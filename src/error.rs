//! Pipeline error taxonomy.
//!
//! Every stage returns `Result<_, PipelineError>`. Nothing is recovered locally:
//! the caller (CLI driver or an external orchestrator) decides whether to retry.
//! Each variant maps to a process exit code so the binary can report failures
//! the same way regardless of which stage failed.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::ModelFamily;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The transformed series table is malformed (bad dates, missing target, ...).
    #[error("Invalid series table: {0}")]
    InvalidTable(String),

    /// Not enough clean rows to split or cross-validate.
    #[error("Insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// L1 regularization zeroed every coefficient.
    #[error("No features selected: all {candidates} candidate predictors were zeroed")]
    NoFeaturesSelected { candidates: usize },

    /// Malformed or non-finite input to a fitter.
    #[error("Training failed for {family}: {reason}")]
    Training { family: ModelFamily, reason: String },

    /// Prediction / row count or feature layout disagreement.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Read/write failure on a persisted artifact.
    #[error("Artifact I/O error at '{}': {reason}", path.display())]
    ArtifactIo { path: PathBuf, reason: String },
}

impl PipelineError {
    pub fn artifact_io(path: &Path, reason: impl std::fmt::Display) -> Self {
        PipelineError::ArtifactIo {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn training(family: ModelFamily, reason: impl Into<String>) -> Self {
        PipelineError::Training {
            family,
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Config(_) | PipelineError::InvalidTable(_) => 2,
            PipelineError::InsufficientData { .. } | PipelineError::NoFeaturesSelected { .. } => 3,
            PipelineError::Training { .. } | PipelineError::ShapeMismatch { .. } => 4,
            PipelineError::ArtifactIo { .. } => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message() {
        let err = PipelineError::InsufficientData {
            required: 24,
            actual: 10,
        };
        assert_eq!(err.to_string(), "Insufficient data: need at least 24 rows, got 10");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn artifact_io_includes_path() {
        let err = PipelineError::artifact_io(Path::new("/tmp/x.json"), "denied");
        assert!(err.to_string().contains("/tmp/x.json"));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn training_names_family() {
        let err = PipelineError::training(ModelFamily::Kernel, "empty partition");
        assert_eq!(err.to_string(), "Training failed for kernel: empty partition");
    }
}
