//! ImpactView Main Application
//! Main window wiring: tidy-table store, control panel, background model run
//! and report view.

use crate::config::AppConfig;
use crate::data::{TidyStore, TidyTable};
use crate::gui::{ControlPanel, ControlPanelAction, ReportView};
use crate::model::{AnalysisWindow, CausalImpact, ImpactOptions, ImpactResult, Period};
use egui::{Color32, RichText, SidePanel};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

/// Main application window.
pub struct ImpactApp {
    config: AppConfig,
    store: TidyStore,
    table: Option<Arc<TidyTable>>,
    load_error: Option<String>,

    control_panel: ControlPanel,
    report: ReportView,

    // Background model run
    run_rx: Option<Receiver<Result<ImpactResult, String>>>,
    is_running: bool,
}

impl ImpactApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let store = TidyStore::new(&config.paths.tidy_file);
        let control_panel = ControlPanel::new(&config.analysis);

        let mut app = Self {
            config,
            store,
            table: None,
            load_error: None,
            control_panel,
            report: ReportView::new(),
            run_rx: None,
            is_running: false,
        };
        app.refresh_table();
        app
    }

    /// (Re)load the tidy table; the store only touches disk when the file's
    /// modification time changed.
    fn refresh_table(&mut self) {
        match self.store.get() {
            Ok(table) => {
                self.control_panel.set_table_bounds(&table);
                self.table = Some(table);
                self.load_error = None;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load tidy table");
                self.load_error = Some(e.to_string());
                self.table = None;
            }
        }
    }

    /// Kick off a model run on a background thread.
    fn start_run(&mut self) {
        if self.is_running {
            return;
        }
        self.refresh_table();
        let Some(table) = self.table.clone() else {
            return;
        };

        let post = Period {
            start: self.control_panel.post_start,
            end: self.control_panel.post_end,
        };
        let analysis = self.config.analysis.clone();

        let (tx, rx) = channel();
        self.run_rx = Some(rx);
        self.is_running = true;

        thread::spawn(move || {
            let last_month = table.last_month().unwrap_or(post.end);
            let outcome =
                AnalysisWindow::new(analysis.pre_start, analysis.event_month, post, last_month)
                    .map_err(|e| e.to_string())
                    .and_then(|window| {
                        CausalImpact::new(ImpactOptions::from(&analysis))
                            .fit(&table, &window)
                            .map_err(|e| e.to_string())
                    });
            let _ = tx.send(outcome);
        });
    }

    /// Poll the background run, if any.
    fn check_run_result(&mut self) {
        let Some(rx) = self.run_rx.take() else {
            return;
        };

        match poll_run(&rx) {
            RunPoll::Finished(Ok(result)) => {
                self.report.set_result(result);
                self.is_running = false;
            }
            RunPoll::Finished(Err(error)) => {
                tracing::error!(error = %error, "model run failed");
                self.report.set_error(error);
                self.is_running = false;
            }
            RunPoll::Pending => {
                // still running; keep polling
                self.run_rx = Some(rx);
            }
        }
    }
}

/// Outcome of polling a background run.
enum RunPoll {
    Pending,
    Finished(Result<ImpactResult, String>),
}

fn poll_run(rx: &Receiver<Result<ImpactResult, String>>) -> RunPoll {
    match rx.try_recv() {
        Ok(outcome) => RunPoll::Finished(outcome),
        Err(TryRecvError::Empty) => RunPoll::Pending,
        // worker exited without reporting a result
        Err(TryRecvError::Disconnected) => {
            RunPoll::Finished(Err("the model run ended unexpectedly".to_string()))
        }
    }
}

impl eframe::App for ImpactApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_run_result();
        if self.is_running {
            ctx.request_repaint();
        }

        let mut action = ControlPanelAction::None;
        SidePanel::left("control_panel")
            .min_width(320.0)
            .max_width(380.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if self.load_error.is_none() {
                        action = self.control_panel.show(ui, self.is_running);
                    } else {
                        ui.add_space(10.0);
                        ui.label(
                            RichText::new("Data unavailable")
                                .size(16.0)
                                .color(Color32::from_rgb(220, 53, 69)),
                        );
                    }
                });
            });

        if action == ControlPanelAction::Run {
            self.start_run();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(error) = &self.load_error {
                ui.add_space(20.0);
                ui.label(
                    RichText::new(format!("Error loading data: {error}"))
                        .size(14.0)
                        .color(Color32::from_rgb(220, 53, 69)),
                );
                ui.label(
                    RichText::new(
                        "Run `impactview clean` to rebuild the tidy table from the raw \
                         spreadsheet, then restart.",
                    )
                    .size(12.0)
                    .color(Color32::GRAY),
                );
                return;
            }

            self.report
                .show(ui, self.is_running, self.config.analysis.event_month);
        });
    }
}
