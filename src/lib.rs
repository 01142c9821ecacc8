//! EV Dashboard - Electric vehicle registration analysis
//!
//! Loads the vehicle population CSV, aggregates it into per-view summary
//! tables, fits an exponential adoption forecast and renders static charts.

pub mod charts;
pub mod config;
pub mod data;
pub mod forecast;
pub mod stats;
pub mod views;

pub use config::{ConfigError, DashboardConfig};
pub use views::{build_report, View, ViewReport};
