//! Data module - spreadsheet cleaning and tidy-table loading

mod cleaner;
mod loader;

pub use cleaner::{CleanError, CleanReport, Cleaner, RawCell};
pub use loader::{LoadError, TidyStore, TidyTable};
