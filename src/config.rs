//! Dashboard Configuration
//! Limits, histogram bins and forecast window, loadable from JSON.

use crate::forecast::ForecastWindow;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings for every view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub top_counties: usize,
    pub top_cities: usize,
    pub top_makes: usize,
    /// Makes whose models are ranked in the manufacturer views.
    pub top_makes_for_models: usize,
    pub top_models: usize,
    pub histogram_bins: usize,
    pub forecast: ForecastWindow,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_counties: 3,
            top_cities: 10,
            top_makes: 10,
            top_makes_for_models: 3,
            top_models: 10,
            histogram_bins: 30,
            forecast: ForecastWindow::default(),
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config file; absent keys keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("top_counties", self.top_counties),
            ("top_cities", self.top_cities),
            ("top_makes", self.top_makes),
            ("top_makes_for_models", self.top_makes_for_models),
            ("top_models", self.top_models),
            ("histogram_bins", self.histogram_bins),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
        }

        let window = &self.forecast;
        if window.end < window.start {
            return Err(ConfigError::Invalid(format!(
                "forecast end {} is before start {}",
                window.end, window.start
            )));
        }
        if window.start <= window.fit_until {
            return Err(ConfigError::Invalid(format!(
                "forecast start {} must be after the fitting cutoff {}",
                window.start, window.fit_until
            )));
        }
        Ok(())
    }
}
