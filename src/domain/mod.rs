//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration (`PipelineConfig`, `ForestParams`, `SvrParams`)
//! - the closed set of model families (`ModelFamily`)
//! - every artifact payload passed between stages (`TrainTestSplit`, `TrainedModel`, ...)

pub mod types;

pub use types::*;
