//! GUI module - dashboard user interface

mod app;
mod control_panel;
mod report_view;

pub use app::ImpactApp;
pub use control_panel::{ControlPanel, ControlPanelAction};
pub use report_view::ReportView;
