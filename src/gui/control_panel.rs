//! Control Panel Widget
//! Left side panel: explainer sections, the post-period pickers and the run
//! button. The pickers only ever offer valid months, so the post-period
//! invariants hold by construction.

use crate::config::AnalysisSettings;
use crate::data::TidyTable;
use crate::model::{end_options, start_options};
use chrono::{Months, NaiveDate};
use egui::{Color32, ComboBox, RichText};

const ABOUT_TEXT: &str = "This app applies a synthetic control method to estimate the \
impact of Hurricane Otis on the economy of Acapulco. Otis was a powerful Category 5 \
hurricane that made landfall near Acapulco, Mexico, in October 2023. Select a \
post-hurricane period to analyze the impact over different time horizons.";

const METHOD_TEXT: &str = "A synthetic control is a weighted combination of control \
units (other locations not exposed to the event) chosen to closely track the treated \
unit before the intervention. Comparing the treated unit against its synthetic \
control after the event estimates the causal effect. The counterfactual here comes \
from a Bayesian regression of Acapulco on the control locations over the pre-period, \
with credible intervals from posterior-predictive sampling.";

const DATA_TEXT: &str = "Monthly transactions at point-of-sale terminals in Acapulco \
and other locations in Mexico, a proxy for formal economic activity in the region. \
Source: Banco de México.";

/// Left side control panel with period selection and run control.
pub struct ControlPanel {
    pub post_start: NaiveDate,
    pub post_end: NaiveDate,
    event_month: NaiveDate,
    pre_start: NaiveDate,
    last_month: NaiveDate,
    table_rows: usize,
    table_units: usize,
    run_enabled: bool,
}

impl ControlPanel {
    pub fn new(settings: &AnalysisSettings) -> Self {
        Self {
            post_start: settings.event_month,
            post_end: settings.event_month + Months::new(1),
            event_month: settings.event_month,
            pre_start: settings.pre_start,
            last_month: settings.event_month + Months::new(1),
            table_rows: 0,
            table_units: 0,
            run_enabled: false,
        }
    }

    /// Adopt the loaded table's date range. The post-period defaults to the
    /// full available range on first load or when the data's end month moved;
    /// otherwise the current selection is kept, clamped to the range.
    pub fn set_table_bounds(&mut self, table: &TidyTable) {
        if let Some(last) = table.last_month() {
            if self.table_rows == 0 || last != self.last_month {
                self.last_month = last;
                self.post_start = self.event_month;
                self.post_end = last;
            } else {
                let max_start = (last - Months::new(1)).max(self.event_month);
                self.post_start = self.post_start.clamp(self.event_month, max_start);
                if self.post_end <= self.post_start || self.post_end > last {
                    self.post_end = (self.post_start + Months::new(1)).min(last);
                }
            }
        }
        self.table_rows = table.len();
        self.table_units = table.units().len();
        self.run_enabled = self.last_month > self.event_month;
    }

    /// Draw the panel.
    pub fn show(&mut self, ui: &mut egui::Ui, busy: bool) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📊 ImpactView")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Impact of Hurricane Otis on Acapulco")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        egui::CollapsingHeader::new("ℹ About this app")
            .default_open(true)
            .show(ui, |ui| {
                ui.label(RichText::new(ABOUT_TEXT).size(12.0));
            });
        egui::CollapsingHeader::new("About the synthetic control method").show(ui, |ui| {
            ui.label(RichText::new(METHOD_TEXT).size(12.0));
        });
        egui::CollapsingHeader::new("Data overview").show(ui, |ui| {
            ui.label(RichText::new(DATA_TEXT).size(12.0));
            ui.add_space(4.0);
            ui.label(
                RichText::new(format!(
                    "{} monthly records, {} locations",
                    self.table_rows, self.table_units
                ))
                .size(12.0)
                .strong(),
            );
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Analysis Period Section =====
        ui.label(RichText::new("📅 Analysis Period").size(14.0).strong());
        ui.add_space(5.0);
        ui.label(
            RichText::new(format!(
                "The model fits on data from {} through {} and evaluates the \
                 selected post-hurricane period.",
                self.pre_start.format("%Y-%m"),
                (self.event_month - Months::new(1)).format("%Y-%m"),
            ))
            .size(11.0)
            .color(Color32::GRAY),
        );
        ui.add_space(8.0);

        let label_width = 110.0;
        let combo_width = 130.0;

        // Post-period start: event month up to the month before the last one
        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("Period start:"));
            ComboBox::from_id_salt("post_start")
                .width(combo_width)
                .selected_text(self.post_start.format("%Y-%m").to_string())
                .show_ui(ui, |ui| {
                    for month in start_options(self.event_month, self.last_month) {
                        let label = month.format("%Y-%m").to_string();
                        if ui
                            .selectable_label(self.post_start == month, label)
                            .clicked()
                        {
                            self.post_start = month;
                        }
                    }
                });
        });

        ui.add_space(5.0);

        // Post-period end: at least one month after the start
        ui.horizontal(|ui| {
            ui.add_sized([label_width, 20.0], egui::Label::new("Period end:"));
            ComboBox::from_id_salt("post_end")
                .width(combo_width)
                .selected_text(self.post_end.format("%Y-%m").to_string())
                .show_ui(ui, |ui| {
                    for month in end_options(self.post_start, self.last_month) {
                        let label = month.format("%Y-%m").to_string();
                        if ui.selectable_label(self.post_end == month, label).clicked() {
                            self.post_end = month;
                        }
                    }
                });
        });

        // keep the end valid after a start change
        if self.post_end <= self.post_start {
            self.post_end = (self.post_start + Months::new(1)).min(self.last_month);
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.run_enabled && !busy, |ui| {
                let button =
                    egui::Button::new(RichText::new("🚀 Run Synthetic Control").size(16.0))
                        .min_size(egui::vec2(220.0, 35.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::Run;
                }
            });
            if busy {
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(RichText::new("Running model...").size(11.0).color(Color32::GRAY));
                });
            }
        });

        action
    }
}

/// Actions triggered by the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPanelAction {
    None,
    Run,
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{Column, DataFrame};

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    /// Monthly table from 2023-01 through `last`.
    fn table_through(last: NaiveDate) -> TidyTable {
        let mut dates = Vec::new();
        let mut current = ymd(2023, 1);
        while current <= last {
            dates.push(current.format("%Y-%m-%d").to_string());
            current = current + Months::new(1);
        }
        let n = dates.len();
        let df = DataFrame::new(vec![
            Column::new("Date".into(), dates),
            Column::new("Acapulco de Juárez".into(), vec![Some(1.0); n]),
            Column::new("Cancún".into(), vec![Some(2.0); n]),
        ])
        .expect("valid frame");
        TidyTable::from_dataframe(df).expect("tidy table")
    }

    #[test]
    fn first_load_defaults_to_full_post_period() {
        let mut panel = ControlPanel::new(&AnalysisSettings::default());
        panel.set_table_bounds(&table_through(ymd(2025, 6)));

        assert_eq!(panel.post_start, ymd(2023, 10));
        assert_eq!(panel.post_end, ymd(2025, 6));
        assert!(panel.run_enabled);
    }

    #[test]
    fn reapplying_bounds_keeps_the_selected_period() {
        let mut panel = ControlPanel::new(&AnalysisSettings::default());
        let table = table_through(ymd(2025, 6));
        panel.set_table_bounds(&table);

        panel.post_start = ymd(2023, 12);
        panel.post_end = ymd(2024, 6);
        // every run refreshes the table, which re-applies the bounds
        panel.set_table_bounds(&table);

        assert_eq!(panel.post_start, ymd(2023, 12));
        assert_eq!(panel.post_end, ymd(2024, 6));
    }

    #[test]
    fn changed_data_range_resets_to_the_new_full_range() {
        let mut panel = ControlPanel::new(&AnalysisSettings::default());
        panel.set_table_bounds(&table_through(ymd(2025, 6)));
        panel.post_start = ymd(2024, 1);
        panel.post_end = ymd(2025, 6);

        panel.set_table_bounds(&table_through(ymd(2024, 12)));

        assert_eq!(panel.post_start, ymd(2023, 10));
        assert_eq!(panel.post_end, ymd(2024, 12));
    }

    #[test]
    fn stale_selection_is_clamped_into_the_range() {
        let mut panel = ControlPanel::new(&AnalysisSettings::default());
        let table = table_through(ymd(2025, 6));
        panel.set_table_bounds(&table);

        // an end at the start (stale after a start change) gets pushed forward
        panel.post_start = ymd(2024, 3);
        panel.post_end = ymd(2024, 3);
        panel.set_table_bounds(&table);

        assert_eq!(panel.post_start, ymd(2024, 3));
        assert_eq!(panel.post_end, ymd(2024, 4));
    }
}
