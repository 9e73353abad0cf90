//! CSV ingest for the transformed monthly series table.
//!
//! Expected layout (produced by the external transform stage):
//!
//! ```text
//! DATE,FEDFUNDS,CPI,DCOILWTICO,UNRATE
//! 1990-01-01,8.23,0.57,22.86,5.4
//! ```
//!
//! Design goals:
//! - **Strict schema**: first column is the date index, the rest are numeric
//! - **Missing values are kept** as `None` (`""`, `.`, `NaN`, `NA`, case-insensitive);
//!   the preparer drops them. Infinities and any other token are rejected
//! - **Monthly invariant**: consecutive rows are exactly one calendar month apart

use std::fs::File;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use tracing::debug;

use crate::domain::TransformedSeriesTable;
use crate::error::PipelineError;
use crate::io::artifact::write_bytes_atomic;

/// Cell spellings treated as a missing observation.
const MISSING_MARKERS: [&str; 4] = ["", ".", "nan", "na"];

/// Load and validate the monthly table.
pub fn load_table(path: &Path) -> Result<TransformedSeriesTable, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::artifact_io(path, format!("failed to open table: {e}")))?;
    read_table(file)
}

/// Parse a table from any reader (used by `load_table` and tests).
pub fn read_table<R: std::io::Read>(input: R) -> Result<TransformedSeriesTable, PipelineError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::InvalidTable(format!("failed to read CSV headers: {e}")))?
        .clone();
    if headers.len() < 2 {
        return Err(PipelineError::InvalidTable(
            "expected a date column followed by at least one indicator column".to_string(),
        ));
    }
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    ensure_unique_columns(&columns)?;

    let mut dates = Vec::new();
    let mut values = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based line numbers, header on line 1.
        let line = idx + 2;
        let record = result.map_err(|e| PipelineError::InvalidTable(format!("line {line}: CSV parse error: {e}")))?;
        let (date, row) = parse_row(&record, columns.len()).map_err(|msg| PipelineError::InvalidTable(format!("line {line}: {msg}")))?;
        dates.push(date);
        values.push(row);
    }

    ensure_monthly(&dates)?;
    debug!(rows = dates.len(), columns = columns.len(), "loaded series table");

    Ok(TransformedSeriesTable { dates, columns, values })
}

/// Write a table in the same layout `load_table` accepts.
pub fn write_table(path: &Path, table: &TransformedSeriesTable) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let io_err = |e: csv::Error| PipelineError::artifact_io(path, e);

    let mut header = vec!["DATE".to_string()];
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header).map_err(io_err)?;

    for (date, row) in table.dates.iter().zip(&table.values) {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(row.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
        writer.write_record(&record).map_err(io_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::artifact_io(path, e.error()))?;
    write_bytes_atomic(path, &bytes)
}

fn parse_row(record: &StringRecord, n_columns: usize) -> Result<(NaiveDate, Vec<Option<f64>>), String> {
    if record.len() != n_columns + 1 {
        return Err(format!("expected {} fields, found {}", n_columns + 1, record.len()));
    }
    let date = parse_date(record.get(0).unwrap_or_default())?;
    let row = record.iter().skip(1).map(parse_cell).collect::<Result<Vec<_>, String>>()?;
    Ok((date, row))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    // `YYYY-MM` is the first of the month.
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return Ok(d);
    }
    Err(format!("invalid date '{s}'. Expected YYYY-MM-DD or YYYY-MM."))
}

fn parse_cell(s: &str) -> Result<Option<f64>, String> {
    if MISSING_MARKERS.contains(&s.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    let v: f64 = s.parse().map_err(|_| format!("invalid numeric value '{s}'"))?;
    if !v.is_finite() {
        return Err(format!("non-finite value '{s}'"));
    }
    Ok(Some(v))
}

fn ensure_unique_columns(columns: &[String]) -> Result<(), PipelineError> {
    for (i, name) in columns.iter().enumerate() {
        if name.is_empty() {
            return Err(PipelineError::InvalidTable(format!("column {} has an empty name", i + 2)));
        }
        if columns[..i].contains(name) {
            return Err(PipelineError::InvalidTable(format!("duplicate column '{name}'")));
        }
    }
    Ok(())
}

/// Months since year 0; the day of month is irrelevant (month-start and
/// month-end indexes are both accepted).
fn month_index(d: NaiveDate) -> i64 {
    d.year() as i64 * 12 + d.month0() as i64
}

fn ensure_monthly(dates: &[NaiveDate]) -> Result<(), PipelineError> {
    for w in dates.windows(2) {
        let step = month_index(w[1]) - month_index(w[0]);
        if step != 1 {
            let reason = match step {
                0 => "duplicate month",
                s if s < 0 => "dates are not increasing",
                _ => "gap in monthly index",
            };
            return Err(PipelineError::InvalidTable(format!("{reason}: {} -> {}", w[0], w[1])));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_missing_markers_and_month_formats() {
        let csv = "DATE,FEDFUNDS,CPI\n2020-01,1.5,.\n2020-02-01,,0.3\n2020-03-31,NaN,0.4\n";
        let table = read_table(csv.as_bytes()).unwrap();

        assert_eq!(table.columns, vec!["FEDFUNDS", "CPI"]);
        assert_eq!(table.dates[0], NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(table.values[0], vec![Some(1.5), None]);
        assert_eq!(table.values[1], vec![None, Some(0.3)]);
        assert_eq!(table.values[2], vec![None, Some(0.4)]);
    }

    #[test]
    fn rejects_duplicate_month() {
        let csv = "DATE,CPI\n2020-01-01,1\n2020-01-31,2\n";
        let err = read_table(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("duplicate month"), "{err}");
    }

    #[test]
    fn rejects_decreasing_dates_and_gaps() {
        let back = "DATE,CPI\n2020-02-01,1\n2020-01-01,2\n";
        assert!(read_table(back.as_bytes()).unwrap_err().to_string().contains("not increasing"));

        let gap = "DATE,CPI\n2020-01-01,1\n2020-03-01,2\n";
        assert!(read_table(gap.as_bytes()).unwrap_err().to_string().contains("gap"));
    }

    #[test]
    fn rejects_non_numeric_cells_with_line_number() {
        let csv = "DATE,CPI\n2020-01-01,1\n2020-02-01,abc\n";
        let err = read_table(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn rejects_infinities_and_unknown_missing_tokens() {
        for bad in ["inf", "-Infinity", "null"] {
            let csv = format!("DATE,CPI\n2020-01-01,1\n2020-02-01,2\n2020-03-01,{bad}\n");
            let err = read_table(csv.as_bytes()).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidTable(_)), "{err}");
            assert!(err.to_string().contains("line 4"), "{bad}: {err}");
        }
    }

    #[test]
    fn write_then_load_preserves_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = TransformedSeriesTable {
            dates: vec![
                NaiveDate::from_ymd_opt(2001, 11, 1).unwrap(),
                NaiveDate::from_ymd_opt(2001, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2002, 1, 1).unwrap(),
            ],
            columns: vec!["A".into(), "B".into()],
            values: vec![vec![Some(1.25), None], vec![Some(-3.0), Some(0.1)], vec![None, Some(7.5)]],
        };
        write_table(&path, &table).unwrap();
        assert_eq!(load_table(&path).unwrap(), table);
    }

    #[test]
    fn missing_file_is_artifact_error() {
        let err = load_table(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }
}
