//! Tidy Table Loader Module
//! Loads the cleaned CSV with Polars and memoizes it against the file's
//! modification time.

use chrono::NaiveDate;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to load tidy CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tidy table has no 'Date' column")]
    MissingDateColumn,
    #[error("tidy table has no unit columns")]
    NoUnits,
    #[error("unparseable date '{0}' in tidy table")]
    BadDate(String),
    #[error("unknown unit column '{0}'")]
    UnknownUnit(String),
}

/// The cleaned monthly table: a `Date` index plus one numeric column per
/// geographic unit, treated unit first. Read-only after construction.
pub struct TidyTable {
    df: DataFrame,
    dates: Vec<NaiveDate>,
    units: Vec<String>,
}

impl TidyTable {
    /// Wrap a cleaned DataFrame, parsing and validating its date index.
    pub fn from_dataframe(df: DataFrame) -> Result<Self, LoadError> {
        let date_col = df
            .column("Date")
            .map_err(|_| LoadError::MissingDateColumn)?;

        let mut dates = Vec::with_capacity(df.height());
        for value in date_col.str()?.into_iter() {
            let value = value.ok_or_else(|| LoadError::BadDate("<null>".to_string()))?;
            let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
                .map_err(|_| LoadError::BadDate(value.to_string()))?;
            dates.push(date);
        }

        let units: Vec<String> = df
            .get_column_names()
            .iter()
            .filter(|name| name.as_str() != "Date")
            .map(|name| name.to_string())
            .collect();
        if units.is_empty() {
            return Err(LoadError::NoUnits);
        }

        Ok(Self { df, dates, units })
    }

    /// Load the tidy CSV from disk.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let df = LazyCsvReader::new(path)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        let table = Self::from_dataframe(df)?;
        tracing::info!(
            path = %path.display(),
            rows = table.len(),
            units = table.units.len(),
            "tidy table loaded"
        );
        Ok(table)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Unit columns in table order; the first one is the treated unit.
    pub fn units(&self) -> &[String] {
        &self.units
    }

    pub fn treated_unit(&self) -> &str {
        &self.units[0]
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_month(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_month(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Values for one unit, aligned with `dates()`; missing cells are None.
    pub fn values(&self, unit: &str) -> Result<Vec<Option<f64>>, LoadError> {
        if !self.units.iter().any(|u| u == unit) {
            return Err(LoadError::UnknownUnit(unit.to_string()));
        }
        let values = self
            .df
            .column(unit)?
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect();
        Ok(values)
    }
}

/// Memoizing handle to the tidy CSV: reloads only when the file's
/// modification time changes.
pub struct TidyStore {
    path: PathBuf,
    cached: Option<(SystemTime, Arc<TidyTable>)>,
}

impl TidyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current table, loading from disk only when the file changed.
    pub fn get(&mut self) -> Result<Arc<TidyTable>, LoadError> {
        let modified = std::fs::metadata(&self.path)?.modified()?;

        if let Some((cached_at, table)) = &self.cached {
            if *cached_at == modified {
                return Ok(Arc::clone(table));
            }
            tracing::info!(path = %self.path.display(), "tidy table changed on disk, reloading");
        }

        let table = Arc::new(TidyTable::load_csv(&self.path)?);
        self.cached = Some((modified, Arc::clone(&table)));
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                "Date".into(),
                vec!["2023-08-01", "2023-09-01", "2023-10-01"],
            ),
            Column::new("Acapulco de Juárez".into(), vec![Some(10.0), None, Some(4.0)]),
            Column::new("Cancún".into(), vec![Some(7.0), Some(8.0), Some(9.0)]),
        ])
        .expect("valid frame")
    }

    #[test]
    fn parses_dates_and_orders_units() {
        let table = TidyTable::from_dataframe(sample_df()).expect("load");
        assert_eq!(table.len(), 3);
        assert_eq!(table.treated_unit(), "Acapulco de Juárez");
        assert_eq!(table.units(), &["Acapulco de Juárez", "Cancún"]);
        assert_eq!(
            table.first_month(),
            NaiveDate::from_ymd_opt(2023, 8, 1)
        );
        assert_eq!(
            table.last_month(),
            NaiveDate::from_ymd_opt(2023, 10, 1)
        );
    }

    #[test]
    fn missing_values_stay_missing() {
        let table = TidyTable::from_dataframe(sample_df()).expect("load");
        let values = table.values("Acapulco de Juárez").expect("values");
        assert_eq!(values, vec![Some(10.0), None, Some(4.0)]);
    }

    #[test]
    fn unknown_unit_is_an_error() {
        let table = TidyTable::from_dataframe(sample_df()).expect("load");
        assert!(matches!(
            table.values("Tulum"),
            Err(LoadError::UnknownUnit(_))
        ));
    }

    #[test]
    fn bad_date_is_an_error() {
        let df = DataFrame::new(vec![
            Column::new("Date".into(), vec!["not-a-date"]),
            Column::new("Acapulco de Juárez".into(), vec![Some(1.0)]),
        ])
        .expect("valid frame");
        assert!(matches!(
            TidyTable::from_dataframe(df),
            Err(LoadError::BadDate(_))
        ));
    }

    #[test]
    fn store_returns_cached_table_for_unchanged_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tidy.csv");
        let mut df = sample_df();
        crate::data::Cleaner::write_csv(&mut df, &path).expect("write");

        let mut store = TidyStore::new(&path);
        let first = store.get().expect("first load");
        let second = store.get().expect("second load");
        assert!(Arc::ptr_eq(&first, &second));
    }
}
