//! Export the comparison report to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts:
//! - `model_comparison.csv`: `Model,RMSE,MAE,R_squared`, one row per model
//! - `model_predictions.csv`: `date,actual,<model>...`, one row per test month
//!
//! Floats use Rust's shortest round-trip formatting, so identical inputs give
//! byte-identical files. Undefined R² is written as `NaN`.

use crate::domain::{ComparisonReport, ModelFamily};
use crate::error::PipelineError;

pub fn comparison_csv(report: &ComparisonReport) -> Result<Vec<u8>, PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Model", "RMSE", "MAE", "R_squared"]).map_err(csv_err)?;
    for row in &report.rows {
        writer
            .write_record([
                row.model.clone(),
                fmt_f64(row.rmse),
                fmt_f64(row.mae),
                fmt_f64(row.r_squared),
            ])
            .map_err(csv_err)?;
    }
    finish(writer)
}

pub fn predictions_csv(report: &ComparisonReport) -> Result<Vec<u8>, PipelineError> {
    let families: Vec<ModelFamily> = report.rows.iter().map(|r| r.family).collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec!["date".to_string(), "actual".to_string()];
    header.extend(families.iter().map(|f| f.display_name().to_string()));
    writer.write_record(&header).map_err(csv_err)?;

    for row in &report.predictions {
        let mut record = vec![row.date.format("%Y-%m-%d").to_string(), fmt_f64(row.actual)];
        record.extend(
            families
                .iter()
                .map(|f| row.predicted.get(f).map(|v| fmt_f64(*v)).unwrap_or_default()),
        );
        writer.write_record(&record).map_err(csv_err)?;
    }
    finish(writer)
}

fn fmt_f64(v: f64) -> String {
    if v.is_nan() { "NaN".to_string() } else { v.to_string() }
}

fn csv_err(e: csv::Error) -> PipelineError {
    PipelineError::ArtifactIo {
        path: "<csv buffer>".into(),
        reason: e.to_string(),
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, PipelineError> {
    writer.into_inner().map_err(|e| PipelineError::ArtifactIo {
        path: "<csv buffer>".into(),
        reason: e.error().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComparisonRow, PredictionRow};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn report() -> ComparisonReport {
        let rows = vec![
            ComparisonRow {
                family: ModelFamily::Linear,
                model: "MLR".into(),
                rmse: 0.5,
                mae: 0.25,
                r_squared: f64::NAN,
            },
            ComparisonRow {
                family: ModelFamily::Kernel,
                model: "SVR".into(),
                rmse: 1.0,
                mae: 0.75,
                r_squared: 0.125,
            },
        ];
        let mut predicted = BTreeMap::new();
        predicted.insert(ModelFamily::Linear, 1.5);
        predicted.insert(ModelFamily::Kernel, 2.0);
        ComparisonReport {
            target: "CPI".into(),
            rows,
            best: ModelFamily::Linear,
            predictions: vec![PredictionRow {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                actual: 1.75,
                predicted,
            }],
        }
    }

    #[test]
    fn comparison_csv_layout() {
        let text = String::from_utf8(comparison_csv(&report()).unwrap()).unwrap();
        assert_eq!(text, "Model,RMSE,MAE,R_squared\nMLR,0.5,0.25,NaN\nSVR,1,0.75,0.125\n");
    }

    #[test]
    fn predictions_csv_has_one_column_per_model() {
        let text = String::from_utf8(predictions_csv(&report()).unwrap()).unwrap();
        assert_eq!(text, "date,actual,MLR,SVR\n2024-05-01,1.75,1.5,2\n");
    }
}
