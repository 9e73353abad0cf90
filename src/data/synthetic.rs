//! Seeded synthetic monthly tables.
//!
//! Shape of the generated series:
//!
//! - `FEDFUNDS`, `UNRATE`: mean-reverting AR(1) levels
//! - `CPI`: linear in `FEDFUNDS` and `UNRATE` plus small Gaussian noise
//! - `DCOILWTICO`: pure noise, missing for the first `OIL_LEADING_GAP` months
//!
//! The same seed always yields the same table.

use chrono::{Months, NaiveDate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::domain::TransformedSeriesTable;
use crate::error::PipelineError;

/// Months at the start of the table where the oil series has no value.
pub const OIL_LEADING_GAP: usize = 2;

/// Coefficients of the true CPI relation: `intercept + a * FEDFUNDS + b * UNRATE`.
pub const CPI_INTERCEPT: f64 = 0.2;
pub const CPI_FEDFUNDS: f64 = 0.6;
pub const CPI_UNRATE: f64 = -0.4;

const CPI_NOISE: f64 = 0.02;
const AR_PULL: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticParams {
    pub start: NaiveDate,
    pub months: usize,
    pub seed: u64,
}

impl SyntheticParams {
    pub fn new(months: usize, seed: u64) -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
            months,
            seed,
        }
    }
}

/// Generate a monthly table with columns `FEDFUNDS,CPI,DCOILWTICO,UNRATE`.
pub fn generate_table(params: &SyntheticParams) -> Result<TransformedSeriesTable, PipelineError> {
    if params.months == 0 {
        return Err(PipelineError::Config("synthetic table needs at least one month".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| PipelineError::Config(format!("noise distribution error: {e}")))?;

    let mut fed: f64 = 3.0;
    let mut unrate: f64 = 5.5;
    let mut dates = Vec::with_capacity(params.months);
    let mut values = Vec::with_capacity(params.months);

    for i in 0..params.months {
        let date = u32::try_from(i)
            .ok()
            .and_then(|m| params.start.checked_add_months(Months::new(m)))
            .ok_or_else(|| PipelineError::Config(format!("synthetic date overflow at month {i}")))?;

        fed += AR_PULL * (3.0 - fed) + 0.3 * normal.sample(&mut rng);
        fed = fed.max(0.0);
        unrate += AR_PULL * (5.5 - unrate) + 0.2 * normal.sample(&mut rng);

        let cpi = CPI_INTERCEPT + CPI_FEDFUNDS * fed + CPI_UNRATE * unrate + CPI_NOISE * normal.sample(&mut rng);
        let oil = 5.0 * normal.sample(&mut rng);

        dates.push(date);
        values.push(vec![
            Some(round4(fed)),
            Some(round4(cpi)),
            (i >= OIL_LEADING_GAP).then_some(round4(oil)),
            Some(round4(unrate)),
        ]);
    }

    Ok(TransformedSeriesTable {
        dates,
        columns: ["FEDFUNDS", "CPI", "DCOILWTICO", "UNRATE"].map(String::from).to_vec(),
        values,
    })
}

fn round4(v: f64) -> f64 {
    (v * 1e4).round() / 1e4
}
