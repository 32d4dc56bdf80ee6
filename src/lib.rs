//! ImpactView - Synthetic Control Impact Dashboard
//!
//! Cleans a spreadsheet of monthly point-of-sale transaction counts and
//! estimates the causal effect of Hurricane Otis (October 2023) on Acapulco,
//! using the other geographic units as untreated controls.

pub mod charts;
pub mod config;
pub mod data;
pub mod gui;
pub mod model;
