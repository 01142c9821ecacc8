//! Forecast module - exponential growth fitting and projection

mod fit;
mod forecaster;

pub use fit::{ExponentialFitter, ExponentialParams, FitError, LevenbergMarquardt};
pub use forecaster::{ForecastReport, ForecastSeries, ForecastWindow, Forecaster, ProjectedCount};
