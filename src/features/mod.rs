//! Feature selection and scaling.
//!
//! Responsibilities:
//!
//! - cross-validated Lasso over the training partition (`lasso`)
//! - turning Lasso coefficients into an ordered feature set (`selection`)
//! - train-only standardization applied to both partitions (`scaler`)

pub mod lasso;
pub mod scaler;
pub mod selection;

pub use scaler::*;
pub use selection::*;
