//! Regressor implementations for the three model families.
//!
//! Each family is a plain serializable struct with a `fit` constructor; the
//! `FittedModel` enum closes over them so the trainer and evaluator can stay
//! generic over the family.

pub mod forest;
pub mod linear;
pub mod model;
pub mod svr;

pub use forest::*;
pub use linear::*;
pub use model::*;
pub use svr::*;
