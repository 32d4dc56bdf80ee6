//! Application configuration.
//!
//! The raw spreadsheet's row offsets are vendor-export artifacts that cannot be
//! derived from the data itself, so they live here instead of in code. A missing
//! config file falls back to the compiled defaults for the Banco de México
//! point-of-sale export this project was built around.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Input/output file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub raw_file: String,
    pub tidy_file: String,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            raw_file: "data/raw/transactions.xlsx".to_string(),
            tidy_file: "data/processed/transactions_clean.csv".to_string(),
        }
    }
}

/// Fixed layout of the raw spreadsheet export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLayout {
    /// 0-based row index carrying the composite column headers.
    pub header_row: usize,
    /// Number of boilerplate data rows to drop after the header.
    pub skip_rows: usize,
    /// Source label of the date column, renamed to `Date` in the tidy table.
    pub date_label: String,
    /// Treated unit, moved to the first data column of the tidy table.
    pub treated_unit: String,
}

impl Default for RawLayout {
    fn default() -> Self {
        Self {
            header_row: 9,
            skip_rows: 8,
            date_label: "Título".to_string(),
            treated_unit: "Acapulco de Juárez".to_string(),
        }
    }
}

/// Analysis constants and estimator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// First month of the fixed pre-period.
    pub pre_start: NaiveDate,
    /// Month the hurricane made landfall; first valid post-period start.
    pub event_month: NaiveDate,
    /// RNG seed so repeated runs with identical inputs are reproducible.
    pub seed: u64,
    /// Number of posterior draws.
    pub draws: usize,
    /// Credible interval mass, e.g. 0.95.
    pub credible_level: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            pre_start: NaiveDate::from_ymd_opt(2011, 4, 1).unwrap(),
            event_month: NaiveDate::from_ymd_opt(2023, 10, 1).unwrap(),
            seed: 0,
            draws: 1000,
            credible_level: 0.95,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: Paths,
    pub layout: RawLayout,
    pub analysis: AnalysisSettings,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Load configuration, falling back to defaults if the file is missing or
    /// malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "using default config");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_source_export_layout() {
        let config = AppConfig::default();
        assert_eq!(config.layout.header_row, 9);
        assert_eq!(config.layout.skip_rows, 8);
        assert_eq!(config.layout.treated_unit, "Acapulco de Juárez");
        assert!(config.analysis.pre_start < config.analysis.event_month);
    }

    #[test]
    fn partial_yaml_fills_missing_sections() {
        let config: AppConfig =
            serde_yaml::from_str("layout:\n  header_row: 4\n").expect("valid yaml");
        assert_eq!(config.layout.header_row, 4);
        // untouched sections keep their defaults
        assert_eq!(config.layout.skip_rows, 8);
        assert_eq!(config.analysis.draws, 1000);
    }
}
