//! Input data for the pipeline.
//!
//! - `prepare`: transformed table -> supervised frame -> chronological split
//! - `synthetic`: seeded monthly tables for local replay and tests

pub mod prepare;
pub mod synthetic;

pub use prepare::*;
pub use synthetic::*;
