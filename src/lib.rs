//! `inflation-forecast` library crate.
//!
//! The binary (`infl`) is a thin wrapper around this library so that:
//!
//! - every stage is testable without spawning processes
//! - an external orchestrator can call stages directly with artifact locators
//!
//! Stage order: `data` (prepare) -> `features` (select, scale) -> `fit` (train,
//! evaluate) -> `report` (serialize), with `io` handling all persistence.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
