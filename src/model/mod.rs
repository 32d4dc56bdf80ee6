//! Model module - analysis windows and the causal impact estimator

mod estimator;
mod result;
mod window;

pub use estimator::{CausalImpact, ImpactOptions, ModelError};
pub use result::{ImpactPoint, ImpactResult, ImpactSummary, SummaryRow};
pub use window::{end_options, month_floor, start_options, AnalysisWindow, Period, WindowError};
