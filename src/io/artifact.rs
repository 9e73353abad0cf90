//! Durable, versioned stage artifacts.
//!
//! Every stage hands its output to the next one as an `ArtifactLocator` (kind +
//! path + schema version), never as in-memory data. JSON artifacts are wrapped
//! in a small envelope:
//!
//! ```json
//! { "schema_version": 1, "kind": "selected_features", "payload": { ... } }
//! ```
//!
//! Writes go to a hidden temp file in the same directory and are renamed into
//! place after `fsync`, so readers never observe a partially written artifact.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ModelFamily;
use crate::error::PipelineError;

/// Current envelope schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Every artifact the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Split,
    Selection,
    Scaler,
    ScaledFeatures,
    Model(ModelFamily),
    Metrics(ModelFamily),
    ComparisonJson,
    ComparisonCsv,
    PredictionsCsv,
}

impl ArtifactKind {
    /// Stable label stored in the envelope.
    pub fn label(self) -> String {
        match self {
            ArtifactKind::Split => "train_test_split".to_string(),
            ArtifactKind::Selection => "selected_features".to_string(),
            ArtifactKind::Scaler => "scaler".to_string(),
            ArtifactKind::ScaledFeatures => "scaled_features".to_string(),
            ArtifactKind::Model(f) => format!("model_{f}"),
            ArtifactKind::Metrics(f) => format!("metrics_{f}"),
            ArtifactKind::ComparisonJson | ArtifactKind::ComparisonCsv => "model_comparison".to_string(),
            ArtifactKind::PredictionsCsv => "model_predictions".to_string(),
        }
    }

    /// Fixed file name inside the output directory.
    pub fn file_name(self) -> String {
        match self {
            ArtifactKind::ComparisonCsv | ArtifactKind::PredictionsCsv => format!("{}.csv", self.label()),
            _ => format!("{}.json", self.label()),
        }
    }
}

/// Typed handle to a persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocator {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub schema_version: u32,
}

impl ArtifactLocator {
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    schema_version: u32,
    kind: String,
    payload: T,
}

/// Directory-backed artifact storage with fixed, per-kind paths.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the output directory if needed (idempotent).
    pub fn ensure_dir(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| PipelineError::artifact_io(&self.root, format!("failed to create output dir: {e}")))
    }

    pub fn locator(&self, kind: ArtifactKind) -> ArtifactLocator {
        ArtifactLocator {
            kind,
            path: self.root.join(kind.file_name()),
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Locator for an artifact that must already exist (upstream dependency).
    pub fn existing(&self, kind: ArtifactKind) -> Result<ArtifactLocator, PipelineError> {
        let locator = self.locator(kind);
        if !locator.exists() {
            return Err(PipelineError::artifact_io(
                &locator.path,
                format!("upstream artifact '{}' has not been produced yet", kind.label()),
            ));
        }
        Ok(locator)
    }

    pub fn write_json<T: Serialize>(&self, kind: ArtifactKind, payload: &T) -> Result<ArtifactLocator, PipelineError> {
        let locator = self.locator(kind);
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            kind: kind.label(),
            payload,
        };
        let bytes = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| PipelineError::artifact_io(&locator.path, format!("failed to serialize: {e}")))?;
        write_bytes_atomic(&locator.path, &bytes)?;
        debug!(artifact = %kind.label(), path = %locator.path.display(), "published artifact");
        Ok(locator)
    }

    pub fn write_bytes(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<ArtifactLocator, PipelineError> {
        let locator = self.locator(kind);
        write_bytes_atomic(&locator.path, bytes)?;
        debug!(artifact = %kind.label(), path = %locator.path.display(), "published artifact");
        Ok(locator)
    }
}

/// Read a JSON artifact, checking its kind and schema version.
pub fn read_json<T: DeserializeOwned>(locator: &ArtifactLocator) -> Result<T, PipelineError> {
    let path = &locator.path;
    let bytes = fs::read(path).map_err(|e| PipelineError::artifact_io(path, format!("failed to read: {e}")))?;
    let envelope: Envelope<T> =
        serde_json::from_slice(&bytes).map_err(|e| PipelineError::artifact_io(path, format!("invalid artifact JSON: {e}")))?;

    if envelope.schema_version != locator.schema_version {
        return Err(PipelineError::artifact_io(
            path,
            format!(
                "schema version {} does not match expected {}",
                envelope.schema_version, locator.schema_version
            ),
        ));
    }
    let expected = locator.kind.label();
    if envelope.kind != expected {
        return Err(PipelineError::artifact_io(
            path,
            format!("artifact kind '{}' does not match expected '{expected}'", envelope.kind),
        ));
    }
    Ok(envelope.payload)
}

/// Write `bytes` to `path` via temp file + fsync + rename.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| PipelineError::artifact_io(path, "artifact path has no file name"))?;
    let tmp = dir.join(format!(".{}.tmp-{}", file_name.to_string_lossy(), std::process::id()));

    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(PipelineError::artifact_io(path, format!("failed to write: {e}")));
    }
    Ok(())
}
