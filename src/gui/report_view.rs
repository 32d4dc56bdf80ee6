//! Report View Widget
//! Central panel: formatted summary metrics, conclusion banner and the three
//! impact charts.

use crate::charts::ChartPlotter;
use crate::model::ImpactResult;
use chrono::NaiveDate;
use egui::{Color32, RichText, ScrollArea};

const SIGNIFICANCE_THRESHOLD: f64 = 0.05;

const SUCCESS_COLOR: Color32 = Color32::from_rgb(40, 167, 69);
const WARNING_COLOR: Color32 = Color32::from_rgb(255, 193, 7);
const ERROR_COLOR: Color32 = Color32::from_rgb(220, 53, 69);

/// Holds and renders the latest modeling outcome.
pub struct ReportView {
    result: Option<ImpactResult>,
    error: Option<String>,
}

impl Default for ReportView {
    fn default() -> Self {
        Self {
            result: None,
            error: None,
        }
    }
}

impl ReportView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_result(&mut self, result: ImpactResult) {
        self.result = Some(result);
        self.error = None;
    }

    pub fn set_error(&mut self, error: String) {
        self.error = Some(error);
    }

    /// Draw the report area for the current state.
    pub fn show(&self, ui: &mut egui::Ui, busy: bool, event_month: NaiveDate) {
        if busy {
            ui.centered_and_justified(|ui| {
                ui.vertical_centered(|ui| {
                    ui.spinner();
                    ui.add_space(8.0);
                    ui.label(RichText::new("Running synthetic control model...").size(16.0));
                });
            });
            return;
        }

        if let Some(error) = &self.error {
            ui.add_space(20.0);
            ui.label(
                RichText::new(format!("An error occurred during modeling: {error}"))
                    .size(14.0)
                    .color(ERROR_COLOR),
            );
            ui.label(
                RichText::new("Adjust the dates in the sidebar and try again.")
                    .size(12.0)
                    .color(Color32::GRAY),
            );
            return;
        }

        let Some(result) = &self.result else {
            ui.centered_and_justified(|ui| {
                ui.label(
                    RichText::new(
                        "Adjust the dates in the sidebar and click \
                         'Run Synthetic Control' to start.",
                    )
                    .size(16.0)
                    .color(Color32::GRAY),
                );
            });
            return;
        };

        ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            Self::draw_metrics(ui, result);
            ui.add_space(10.0);
            Self::draw_conclusion(ui, result.summary.p_value);
            ui.add_space(10.0);
            ui.separator();
            ui.add_space(10.0);

            ui.label(RichText::new("1. Observed vs. Counterfactual").size(16.0).strong());
            ui.label(
                RichText::new(
                    "Observed transactions against the counterfactual predicted by the \
                     synthetic control. Red marks the hurricane month; yellow marks the \
                     analyzed post-period.",
                )
                .size(11.0)
                .color(Color32::GRAY),
            );
            ChartPlotter::draw_counterfactual_chart(ui, result, event_month);
            ui.add_space(15.0);

            ui.label(RichText::new("2. Impact per month").size(16.0).strong());
            ui.label(
                RichText::new("Estimated transaction loss per month in the post-period.")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
            ChartPlotter::draw_point_effect_chart(ui, result);
            ui.add_space(15.0);

            ui.label(RichText::new("3. Cumulative impact").size(16.0).strong());
            ui.label(
                RichText::new("Estimated running total of the transaction loss.")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
            ChartPlotter::draw_cumulative_chart(ui, result);
        });
    }

    fn draw_metrics(ui: &mut egui::Ui, result: &ImpactResult) {
        let average = result.summary.average;
        let cumulative = result.summary.cumulative;
        let months = result.post_series().count();

        ui.label(RichText::new("Key results").size(18.0).strong());
        ui.add_space(8.0);

        egui::Grid::new("key_results")
            .num_columns(3)
            .min_col_width(220.0)
            .spacing([20.0, 14.0])
            .show(ui, |ui| {
                metric(
                    ui,
                    "Monthly Average Observed",
                    fmt_millions(average.actual),
                    None,
                );
                metric(
                    ui,
                    "Monthly Average Counterfactual",
                    fmt_millions(average.predicted),
                    Some(interval_caption(
                        fmt_millions(average.predicted_lower),
                        fmt_millions(average.predicted_upper),
                    )),
                );
                metric(
                    ui,
                    "Monthly Average Impact",
                    fmt_millions(average.abs_effect),
                    Some(interval_caption(
                        fmt_millions(average.abs_effect_lower),
                        fmt_millions(average.abs_effect_upper),
                    )),
                );
                ui.end_row();

                metric(ui, "Total Observed", fmt_millions(cumulative.actual), None);
                metric(
                    ui,
                    "Total Counterfactual",
                    fmt_millions(cumulative.predicted),
                    Some(interval_caption(
                        fmt_millions(cumulative.predicted_lower),
                        fmt_millions(cumulative.predicted_upper),
                    )),
                );
                metric(
                    ui,
                    "Total Impact",
                    fmt_millions(cumulative.abs_effect),
                    Some(interval_caption(
                        fmt_millions(cumulative.abs_effect_lower),
                        fmt_millions(cumulative.abs_effect_upper),
                    )),
                );
                ui.end_row();

                metric(
                    ui,
                    "Relative Impact",
                    fmt_percent(cumulative.rel_effect),
                    Some(interval_caption(
                        fmt_percent(cumulative.rel_effect_lower),
                        fmt_percent(cumulative.rel_effect_upper),
                    )),
                );
                metric(
                    ui,
                    "P-value",
                    format!("{:.4}", result.summary.p_value),
                    Some("Posterior tail probability of no effect".to_string()),
                );
                metric(ui, "Analyzed Months", months.to_string(), None);
                ui.end_row();
            });
    }

    fn draw_conclusion(ui: &mut egui::Ui, p_value: f64) {
        let significant = p_value < SIGNIFICANCE_THRESHOLD;
        let (color, text) = if significant {
            (
                SUCCESS_COLOR,
                format!(
                    "✅ Strong evidence of a causal impact of Hurricane Otis on \
                     transactions in Acapulco during the selected period (p={p_value:.3})."
                ),
            )
        } else {
            (
                WARNING_COLOR,
                format!(
                    "⚠ No strong evidence of a causal impact during the selected period \
                     (p={p_value:.3}). The observed changes could be random fluctuations."
                ),
            )
        };

        egui::Frame::none()
            .rounding(6.0)
            .stroke(egui::Stroke::new(1.5, color))
            .inner_margin(10.0)
            .show(ui, |ui| {
                ui.label(RichText::new(text).size(13.0).color(color));
            });
    }
}

fn metric(ui: &mut egui::Ui, label: &str, value: String, caption: Option<String>) {
    ui.vertical(|ui| {
        ui.label(RichText::new(label).size(12.0).color(Color32::GRAY));
        ui.label(RichText::new(value).size(22.0).strong());
        if let Some(caption) = caption {
            ui.label(RichText::new(caption).size(10.0).color(Color32::DARK_GRAY));
        }
    });
}

fn interval_caption(lower: String, upper: String) -> String {
    format!("95% interval: ({lower}, {upper})")
}

fn fmt_millions(value: f64) -> String {
    format!("{:.2}M", value / 1e6)
}

fn fmt_percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_values_in_millions() {
        assert_eq!(fmt_millions(12_345_678.0), "12.35M");
        assert_eq!(fmt_millions(-2_500_000.0), "-2.50M");
    }

    #[test]
    fn formats_relative_effects_as_percent() {
        assert_eq!(fmt_percent(-0.3071), "-30.71%");
    }
}
