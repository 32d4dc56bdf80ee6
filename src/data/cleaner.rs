//! Spreadsheet Cleaner Module
//! One-shot ETL: raw point-of-sale spreadsheet -> tidy CSV.
//!
//! The raw export carries a multi-row preamble, composite comma-delimited
//! headers and a block of boilerplate rows before the actual records. All of
//! those offsets come from `RawLayout` so a changed vendor export only needs a
//! config edit.

use crate::config::RawLayout;
use calamine::{open_workbook, Data, DataType as _, Reader, Xlsx};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("failed to open spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),
    #[error("spreadsheet has no worksheets")]
    NoWorksheet,
    #[error("header row {0} is past the end of the sheet")]
    HeaderOutOfRange(usize),
    #[error("date column '{0}' not found in headers")]
    MissingDateColumn(String),
    #[error("treated unit column '{0}' not found in headers")]
    MissingTreatedColumn(String),
    #[error("failed to write tidy CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A spreadsheet cell reduced to the shapes the cleaner cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Empty,
}

impl From<&Data> for RawCell {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) | Data::DurationIso(_) => RawCell::Empty,
            Data::String(s) => RawCell::Text(s.clone()),
            Data::Float(f) => RawCell::Number(*f),
            Data::Int(i) => RawCell::Number(*i as f64),
            Data::Bool(b) => RawCell::Number(*b as i64 as f64),
            Data::DateTime(_) | Data::DateTimeIso(_) => cell
                .as_datetime()
                .map(|dt| RawCell::Date(dt.date()))
                .unwrap_or(RawCell::Empty),
        }
    }
}

impl RawCell {
    /// Header text for this cell.
    fn header_text(&self) -> String {
        match self {
            RawCell::Text(s) => s.clone(),
            RawCell::Number(v) => v.to_string(),
            RawCell::Date(d) => d.to_string(),
            RawCell::Empty => String::new(),
        }
    }

    /// Numeric value, with unparseable cells mapping to None instead of
    /// failing the row.
    fn as_number(&self) -> Option<f64> {
        match self {
            RawCell::Number(v) => Some(*v),
            RawCell::Text(s) => s.trim().replace(',', "").parse().ok(),
            _ => None,
        }
    }

    /// ISO date string for the tidy `Date` column.
    fn as_date_string(&self) -> String {
        match self {
            RawCell::Date(d) => d.format("%Y-%m-%d").to_string(),
            RawCell::Text(s) => {
                let s = s.trim();
                NaiveDate::parse_from_str(s, "%d/%m/%Y")
                    .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|_| s.to_string())
            }
            RawCell::Number(v) => v.to_string(),
            RawCell::Empty => String::new(),
        }
    }
}

/// Summary of a cleaning run.
#[derive(Debug, Clone, Copy)]
pub struct CleanReport {
    pub rows: usize,
    pub columns: usize,
}

/// Reshapes the raw spreadsheet into the tidy table.
pub struct Cleaner {
    layout: RawLayout,
}

impl Cleaner {
    pub fn new(layout: RawLayout) -> Self {
        Self { layout }
    }

    /// Clean a spreadsheet on disk and write the tidy CSV.
    pub fn clean_file(
        &self,
        raw_path: impl AsRef<Path>,
        tidy_path: impl AsRef<Path>,
    ) -> Result<CleanReport, CleanError> {
        let raw_path = raw_path.as_ref();
        tracing::info!(path = %raw_path.display(), "reading raw spreadsheet");

        let mut workbook: Xlsx<_> = open_workbook(raw_path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(CleanError::NoWorksheet)??;

        let rows: Vec<Vec<RawCell>> = range
            .rows()
            .map(|row| row.iter().map(RawCell::from).collect())
            .collect();

        let mut df = self.tidy_frame(&rows)?;
        Self::write_csv(&mut df, tidy_path)?;

        Ok(CleanReport {
            rows: df.height(),
            columns: df.width(),
        })
    }

    /// Reshape raw sheet rows into the tidy table:
    /// headers from `header_row` keeping the segment after the last comma,
    /// drop `skip_rows` boilerplate records, rename the date column, coerce
    /// values to numeric and move the treated unit to the first data column.
    pub fn tidy_frame(&self, rows: &[Vec<RawCell>]) -> Result<DataFrame, CleanError> {
        let header = rows
            .get(self.layout.header_row)
            .ok_or(CleanError::HeaderOutOfRange(self.layout.header_row))?;

        let names: Vec<String> = header
            .iter()
            .map(|cell| display_name(&cell.header_text()))
            .collect();

        let date_idx = names
            .iter()
            .position(|n| n == &self.layout.date_label)
            .ok_or_else(|| CleanError::MissingDateColumn(self.layout.date_label.clone()))?;

        let treated_idx = names
            .iter()
            .position(|n| n == &self.layout.treated_unit)
            .ok_or_else(|| CleanError::MissingTreatedColumn(self.layout.treated_unit.clone()))?;

        let data_start = self.layout.header_row + 1 + self.layout.skip_rows;
        let records = rows.get(data_start..).unwrap_or_default();

        let dates: Vec<String> = records
            .iter()
            .map(|row| {
                row.get(date_idx)
                    .map(RawCell::as_date_string)
                    .unwrap_or_default()
            })
            .collect();

        let mut columns = vec![Column::new("Date".into(), dates)];

        // Treated unit first, then the remaining units in sheet order.
        let mut unit_order = vec![treated_idx];
        unit_order.extend((0..names.len()).filter(|&i| i != date_idx && i != treated_idx));

        for idx in unit_order {
            let values: Vec<Option<f64>> = records
                .iter()
                .map(|row| row.get(idx).and_then(RawCell::as_number))
                .collect();
            columns.push(Column::new(names[idx].as_str().into(), values));
        }

        let df = DataFrame::new(columns)?;
        tracing::info!(rows = df.height(), columns = df.width(), "tidy frame built");
        Ok(df)
    }

    /// Write the tidy table as CSV, creating parent directories as needed.
    pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<(), CleanError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
        Ok(())
    }
}

/// Keep only the trailing segment of a composite comma-delimited header.
fn display_name(raw: &str) -> String {
    raw.rsplit(',').next().unwrap_or(raw).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn month(i: usize) -> String {
        // monthly dates starting 2011-04-01
        let total = 3 + i; // months since 2011-01
        format!("{}-{:02}-01", 2011 + total / 12, total % 12 + 1)
    }

    /// Raw grid matching the source export: preamble, composite header row,
    /// boilerplate rows, then monthly records.
    fn sample_grid(records: usize, units: usize) -> (Vec<Vec<RawCell>>, RawLayout) {
        let layout = RawLayout::default();
        let mut rows: Vec<Vec<RawCell>> = Vec::new();

        for _ in 0..layout.header_row {
            rows.push(vec![text("preamble")]);
        }

        let mut header = vec![text("SIE, Banco de México, Título")];
        for u in 0..units {
            let name = if u == 2 {
                "Transacciones, Acapulco de Juárez".to_string()
            } else {
                format!("Transacciones, Unidad {u}")
            };
            header.push(text(&name));
        }
        rows.push(header);

        for _ in 0..layout.skip_rows {
            let mut row = vec![text("N/E")];
            row.extend((0..units).map(|_| text("N/E")));
            rows.push(row);
        }

        for i in 0..records {
            let mut row = vec![text(&month(i))];
            row.extend((0..units).map(|u| RawCell::Number(1000.0 + (i * units + u) as f64)));
            rows.push(row);
        }

        (rows, layout)
    }

    #[test]
    fn scenario_170_records_yields_162_rows() {
        // header at row 10 and 8 boilerplate rows; boilerplate counts against
        // the record block, so 170 records shrink to 162 tidy rows
        let (mut rows, layout) = sample_grid(178, 9);
        rows.truncate(layout.header_row + 1 + 170);

        let df = Cleaner::new(layout).tidy_frame(&rows).expect("clean");
        assert_eq!(df.height(), 162);
        assert_eq!(df.width(), 10);
    }

    #[test]
    fn date_column_first_then_treated_unit() {
        let (rows, layout) = sample_grid(24, 5);
        let df = Cleaner::new(layout).tidy_frame(&rows).expect("clean");

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names[0], "Date");
        assert_eq!(names[1], "Acapulco de Juárez");
        assert_eq!(names.iter().filter(|n| n.as_str() == "Date").count(), 1);
    }

    #[test]
    fn dates_are_parseable() {
        let (rows, layout) = sample_grid(24, 4);
        let df = Cleaner::new(layout).tidy_frame(&rows).expect("clean");

        let dates = df.column("Date").unwrap().str().unwrap();
        for value in dates.into_iter().flatten() {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("parseable date");
        }
    }

    #[test]
    fn unparseable_cells_become_nulls() {
        let (mut rows, layout) = sample_grid(10, 4);
        let first_record = layout.header_row + 1 + layout.skip_rows;
        rows[first_record][2] = text("N/E");

        let df = Cleaner::new(layout).tidy_frame(&rows).expect("clean");
        let nulls: usize = df
            .get_columns()
            .iter()
            .skip(1)
            .map(|c| c.null_count())
            .sum();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn missing_treated_column_is_an_error() {
        let (rows, mut layout) = sample_grid(10, 4);
        layout.treated_unit = "Ciudad Inexistente".to_string();

        let err = Cleaner::new(layout).tidy_frame(&rows).unwrap_err();
        assert!(matches!(err, CleanError::MissingTreatedColumn(_)));
    }

    #[test]
    fn header_past_sheet_end_is_an_error() {
        let layout = RawLayout::default();
        let rows = vec![vec![text("too short")]];
        let err = Cleaner::new(layout).tidy_frame(&rows).unwrap_err();
        assert!(matches!(err, CleanError::HeaderOutOfRange(_)));
    }

    #[test]
    fn composite_headers_keep_trailing_segment() {
        assert_eq!(display_name("SIE, Banco, Título"), "Título");
        assert_eq!(display_name("  plain  "), "plain");
    }
}
