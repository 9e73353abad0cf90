//! Input/output helpers.
//!
//! - monthly table CSV read/write + validation (`table`)
//! - atomic, versioned stage artifacts (`artifact`)
//! - comparison/prediction CSV exports (`export`)

pub mod artifact;
pub mod export;
pub mod table;

pub use artifact::*;
pub use export::*;
pub use table::*;
