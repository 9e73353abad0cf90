//! Terminal formatting of the comparison report.
//!
//! Formatting lives apart from the report builder so the numbers stay testable
//! and layout changes stay local.

use crate::domain::ComparisonReport;

/// Metrics table with the best model marked by `*`.
pub fn format_comparison(report: &ComparisonReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Model Comparison: {} ===\n", report.target));
    out.push_str(format!("  {:<14} {:>10} {:>10} {:>10}", "Model", "RMSE", "MAE", "R²").trim_end());
    out.push('\n');
    out.push_str(format!("  {:-<14} {:-<10} {:-<10} {:-<10}", "", "", "", "").trim_end());
    out.push('\n');

    for row in &report.rows {
        let chosen = if row.family == report.best { "*" } else { " " };
        out.push_str(
            format!(
                "{chosen} {:<14} {:>10.4} {:>10.4} {:>10}",
                row.model,
                row.rmse,
                row.mae,
                fmt_r2(row.r_squared)
            )
            .trim_end(),
        );
        out.push('\n');
    }

    let best = report.best;
    out.push_str(&format!("\nBest model: {} ({best})\n", best.display_name()));
    out
}

/// Last `max_rows` test months with the actual value and each model's forecast.
pub fn format_predictions(report: &ComparisonReport, max_rows: usize) -> String {
    let mut out = String::new();
    let families: Vec<_> = report.rows.iter().map(|r| r.family).collect();

    let mut header = format!("{:<10} {:>10}", "date", "actual");
    for f in &families {
        header.push_str(&format!(" {:>12}", f.display_name()));
    }
    out.push_str(&header);
    out.push('\n');

    let skip = report.predictions.len().saturating_sub(max_rows);
    for row in report.predictions.iter().skip(skip) {
        let mut line = format!("{:<10} {:>10.4}", row.date.format("%Y-%m"), row.actual);
        for f in &families {
            match row.predicted.get(f) {
                Some(v) => line.push_str(&format!(" {v:>12.4}")),
                None => line.push_str(&format!(" {:>12}", "-")),
            }
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn fmt_r2(v: f64) -> String {
    if v.is_nan() { "NaN".to_string() } else { format!("{v:.4}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComparisonRow, ModelFamily, PredictionRow};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn report() -> ComparisonReport {
        let rows = ModelFamily::ALL
            .iter()
            .zip([0.5, 0.25, 1.0])
            .map(|(&family, rmse)| ComparisonRow {
                family,
                model: family.display_name().to_string(),
                rmse,
                mae: rmse / 2.0,
                r_squared: if family == ModelFamily::Kernel { f64::NAN } else { 0.75 },
            })
            .collect();
        let predictions = (1..=3)
            .map(|m| PredictionRow {
                date: NaiveDate::from_ymd_opt(2024, m, 1).unwrap(),
                actual: m as f64,
                predicted: BTreeMap::from([(ModelFamily::Linear, m as f64 + 0.5)]),
            })
            .collect();
        ComparisonReport {
            target: "CPI".into(),
            rows,
            best: ModelFamily::Ensemble,
            predictions,
        }
    }

    #[test]
    fn comparison_table_marks_best() {
        let txt = format_comparison(&report());
        let expected = concat!(
            "=== Model Comparison: CPI ===\n",
            "  Model                RMSE        MAE         R²\n",
            "  -------------- ---------- ---------- ----------\n",
            "  MLR                0.5000     0.2500     0.7500\n",
            "* RandomForest       0.2500     0.1250     0.7500\n",
            "  SVR                1.0000     0.5000        NaN\n",
            "\n",
            "Best model: RandomForest (ensemble)\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn predictions_table_keeps_last_rows() {
        let txt = format_predictions(&report(), 2);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date"));
        assert!(lines[1].starts_with("2024-02"));
        assert!(lines[2].contains("3.5000"));
        assert!(lines[2].trim_end().ends_with('-'));
    }
}
