//! ImpactView - Synthetic Control Impact Dashboard
//!
//! `impactview`        launches the interactive dashboard.
//! `impactview clean`  runs the one-shot spreadsheet cleaner and exits.

use anyhow::Context;
use eframe::egui;
use impactview::config::AppConfig;
use impactview::data::Cleaner;
use impactview::gui::ImpactApp;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "config/impactview.yaml";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load_or_default(CONFIG_PATH);

    // One-shot cleaner mode: spreadsheet -> tidy CSV, then exit
    if std::env::args().nth(1).as_deref() == Some("clean") {
        let report = Cleaner::new(config.layout.clone())
            .clean_file(&config.paths.raw_file, &config.paths.tidy_file)
            .context("cleaning raw spreadsheet")?;
        tracing::info!(
            rows = report.rows,
            columns = report.columns,
            path = %config.paths.tidy_file,
            "tidy table written"
        );
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("ImpactView"),
        ..Default::default()
    };

    eframe::run_native(
        "ImpactView",
        options,
        Box::new(move |cc| Ok(Box::new(ImpactApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to launch dashboard: {e}"))
}
