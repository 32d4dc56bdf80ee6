//! Charts module - credible-band plotting with egui_plot

mod plotter;

pub use plotter::ChartPlotter;
