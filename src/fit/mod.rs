//! Model fitting and scoring.
//!
//! Responsibilities:
//!
//! - validate a scaled training partition and fit one model family (`trainer`)
//! - score a trained model on the scaled test partition, aligned by date (`evaluator`)

pub mod evaluator;
pub mod trainer;

pub use evaluator::*;
pub use trainer::*;
