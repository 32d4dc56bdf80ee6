//! Chart Plotter Module
//! Draws the three impact charts with egui_plot: observed vs counterfactual,
//! monthly pointwise effect and cumulative effect, each with a credible band.

use crate::model::{ImpactPoint, ImpactResult};
use chrono::NaiveDate;
use egui::Color32;
use egui_plot::{GridMark, HLine, Legend, Line, LineStyle, Plot, PlotPoints, PlotUi, Polygon, VLine};

const CHART_HEIGHT: f32 = 320.0;

const OBSERVED_COLOR: Color32 = Color32::from_rgb(235, 235, 235);
const COUNTERFACTUAL_COLOR: Color32 = Color32::from_rgb(0, 123, 255);
const POINT_EFFECT_COLOR: Color32 = Color32::from_rgb(40, 167, 69);
const CUMULATIVE_COLOR: Color32 = Color32::from_rgb(255, 193, 7);
const EVENT_LINE_COLOR: Color32 = Color32::from_rgb(220, 53, 69);
const PERIOD_LINE_COLOR: Color32 = Color32::from_rgb(255, 255, 0);

/// One band sample: x, lower bound, upper bound.
type BandPoint = (f64, f64, f64);

/// Creates the impact visualizations using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Observed vs counterfactual over the full series, with the event month
    /// and the analyzed post-period marked by dashed vertical lines.
    pub fn draw_counterfactual_chart(
        ui: &mut egui::Ui,
        result: &ImpactResult,
        event_month: NaiveDate,
    ) {
        let series = &result.series;
        let band: Vec<BandPoint> = series
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.posterior_lower, p.posterior_upper))
            .collect();
        let mean: Vec<[f64; 2]> = series
            .iter()
            .enumerate()
            .map(|(i, p)| [i as f64, p.posterior_mean])
            .collect();
        let observed: Vec<[f64; 2]> = series
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.observed.map(|obs| [i as f64, obs]))
            .collect();

        let event_idx = series.iter().position(|p| p.date == event_month);
        let post_start = series.iter().position(|p| p.in_post);
        let post_end = series.iter().rposition(|p| p.in_post);

        let labels = date_labels(series);
        Plot::new("counterfactual")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label("Date")
            .y_axis_label("Transactions")
            .x_axis_formatter(move |mark: GridMark, _range| label_for(&labels, mark))
            .show(ui, |plot_ui| {
                Self::band(plot_ui, &band, band_fill(COUNTERFACTUAL_COLOR));
                plot_ui.line(
                    Line::new(PlotPoints::from(mean))
                        .color(COUNTERFACTUAL_COLOR)
                        .width(2.0)
                        .name("Counterfactual"),
                );
                plot_ui.line(
                    Line::new(PlotPoints::from(observed))
                        .color(OBSERVED_COLOR)
                        .width(2.0)
                        .name("Observed"),
                );

                if let Some(idx) = event_idx {
                    plot_ui.vline(dashed_vline(idx, EVENT_LINE_COLOR));
                }
                for idx in [post_start, post_end].into_iter().flatten() {
                    plot_ui.vline(dashed_vline(idx, PERIOD_LINE_COLOR));
                }
            });
    }

    /// Estimated monthly effect over the post-period only.
    pub fn draw_point_effect_chart(ui: &mut egui::Ui, result: &ImpactResult) {
        // shading outside the analyzed window would connect through the gap,
        // so only the post-period slice is plotted
        let post: Vec<_> = result
            .series
            .iter()
            .enumerate()
            .filter(|(_, p)| p.in_post)
            .collect();

        let band: Vec<BandPoint> = post
            .iter()
            .filter_map(|(i, p)| match (p.point_effect_lower, p.point_effect_upper) {
                (Some(lower), Some(upper)) => Some((*i as f64, lower, upper)),
                _ => None,
            })
            .collect();
        let mean: Vec<[f64; 2]> = post
            .iter()
            .filter_map(|(i, p)| p.point_effect.map(|e| [*i as f64, e]))
            .collect();

        let labels = date_labels(&result.series);
        Plot::new("point_effects")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label("Date")
            .y_axis_label("Effect Size")
            .x_axis_formatter(move |mark: GridMark, _range| label_for(&labels, mark))
            .show(ui, |plot_ui| {
                Self::band(plot_ui, &band, band_fill(POINT_EFFECT_COLOR));
                plot_ui.line(
                    Line::new(PlotPoints::from(mean))
                        .color(POINT_EFFECT_COLOR)
                        .width(2.0)
                        .name("Point Effect"),
                );
                plot_ui.hline(HLine::new(0.0).color(Color32::GRAY).width(1.0));
            });
    }

    /// Running cumulative effect over the post-period only.
    pub fn draw_cumulative_chart(ui: &mut egui::Ui, result: &ImpactResult) {
        let post: Vec<_> = result
            .series
            .iter()
            .enumerate()
            .filter(|(_, p)| p.in_post)
            .collect();

        let band: Vec<BandPoint> = post
            .iter()
            .map(|(i, p)| (*i as f64, p.cumulative_lower, p.cumulative_upper))
            .collect();
        let mean: Vec<[f64; 2]> = post
            .iter()
            .map(|(i, p)| [*i as f64, p.cumulative_effect])
            .collect();

        let labels = date_labels(&result.series);
        Plot::new("cumulative")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label("Date")
            .y_axis_label("Cumulative Effect")
            .x_axis_formatter(move |mark: GridMark, _range| label_for(&labels, mark))
            .show(ui, |plot_ui| {
                Self::band(plot_ui, &band, band_fill(CUMULATIVE_COLOR));
                plot_ui.line(
                    Line::new(PlotPoints::from(mean))
                        .color(CUMULATIVE_COLOR)
                        .width(2.0)
                        .name("Cumulative Effect"),
                );
                plot_ui.hline(HLine::new(0.0).color(Color32::GRAY).width(1.0));
            });
    }

    /// Credible band as a filled polygon: upper bound forward, lower bound
    /// reversed. Callers pre-filter `points` to the exact contiguous range
    /// they want shaded.
    fn band(plot_ui: &mut PlotUi, points: &[BandPoint], fill: Color32) {
        if points.len() < 2 {
            return;
        }
        let mut outline: Vec<[f64; 2]> = points.iter().map(|&(x, _, upper)| [x, upper]).collect();
        outline.extend(points.iter().rev().map(|&(x, lower, _)| [x, lower]));

        plot_ui.polygon(
            Polygon::new(PlotPoints::from(outline))
                .fill_color(fill)
                .stroke(egui::Stroke::new(0.0, Color32::TRANSPARENT)),
        );
    }
}

fn date_labels(series: &[ImpactPoint]) -> Vec<String> {
    series
        .iter()
        .map(|p| p.date.format("%Y-%m").to_string())
        .collect()
}

/// Snap a grid mark to the nearest series index; marks outside the series
/// get no label.
fn label_for(labels: &[String], mark: GridMark) -> String {
    let idx = mark.value.round();
    if idx >= 0.0 && (idx as usize) < labels.len() {
        labels[idx as usize].clone()
    } else {
        String::new()
    }
}

fn band_fill(color: Color32) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), 50)
}

fn dashed_vline(idx: usize, color: Color32) -> VLine {
    VLine::new(idx as f64)
        .color(color)
        .width(1.5)
        .style(LineStyle::Dashed { length: 8.0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(value: f64) -> GridMark {
        GridMark {
            value,
            step_size: 1.0,
        }
    }

    fn month_labels() -> Vec<String> {
        vec![
            "2023-10".to_string(),
            "2023-11".to_string(),
            "2023-12".to_string(),
        ]
    }

    #[test]
    fn fractional_marks_snap_to_the_nearest_month() {
        let labels = month_labels();
        assert_eq!(label_for(&labels, mark(0.0)), "2023-10");
        assert_eq!(label_for(&labels, mark(0.4)), "2023-10");
        assert_eq!(label_for(&labels, mark(1.6)), "2023-12");
    }

    #[test]
    fn marks_outside_the_series_get_no_label() {
        let labels = month_labels();
        assert_eq!(label_for(&labels, mark(-0.6)), "");
        assert_eq!(label_for(&labels, mark(2.6)), "");
    }
}
