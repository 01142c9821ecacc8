//! Adoption Forecaster
//! Fits exponential growth to yearly registrations and projects it forward.

use super::fit::{ExponentialFitter, ExponentialParams, FitError, LevenbergMarquardt};
use crate::stats::SummaryTable;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Historical cutoff and projected year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastWindow {
    /// Last year (inclusive) used for fitting.
    pub fit_until: i64,
    /// First projected year.
    pub start: i64,
    /// Last projected year (inclusive).
    pub end: i64,
}

impl Default for ForecastWindow {
    fn default() -> Self {
        Self {
            fit_until: 2023,
            start: 2024,
            end: 2029,
        }
    }
}

/// One projected year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectedCount {
    pub year: i64,
    pub projected_count: i64,
}

/// Projected counts, strictly ascending by year.
pub type ForecastSeries = Vec<ProjectedCount>;

/// A fitted model together with the data it was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub params: ExponentialParams,
    /// Year mapped to `x = 0` in the fitted model.
    pub base_year: i64,
    /// `(year, count)` observations used for the fit.
    pub observed: Vec<(i64, f64)>,
    pub projected: ForecastSeries,
}

impl ForecastReport {
    /// Unrounded model value for `year`.
    pub fn model_value(&self, year: i64) -> f64 {
        self.params.evaluate((year - self.base_year) as f64)
    }
}

impl fmt::Display for ForecastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Model: count = {:.2} * exp({:.4} * (year - {}))",
            self.params.a, self.params.b, self.base_year
        )?;
        writeln!(f, "Year  Projected Vehicles")?;
        for point in &self.projected {
            writeln!(f, "{:<4}  {}", point.year, point.projected_count)?;
        }
        Ok(())
    }
}

/// Exponential-growth forecaster over a yearly count table.
pub struct Forecaster<F = LevenbergMarquardt> {
    fitter: F,
    window: ForecastWindow,
}

impl Forecaster {
    pub fn new(window: ForecastWindow) -> Self {
        Self::with_fitter(LevenbergMarquardt::default(), window)
    }
}

impl<F: ExponentialFitter> Forecaster<F> {
    pub fn with_fitter(fitter: F, window: ForecastWindow) -> Self {
        Self { fitter, window }
    }

    /// Fit on the years up to the cutoff of `counts_by_year` and project the
    /// window.
    ///
    /// Years are re-centred on the earliest fitted year so `exp` stays in
    /// range for calendar-sized inputs.
    pub fn forecast(&self, counts_by_year: &SummaryTable) -> Result<ForecastReport, FitError> {
        let mut observed: Vec<(i64, f64)> = counts_by_year
            .year_points()
            .into_iter()
            .filter(|(year, _)| *year <= self.window.fit_until)
            .collect();
        observed.sort_by_key(|(year, _)| *year);

        let Some(&(base_year, _)) = observed.first() else {
            warn!("No yearly counts up to {}; skipping forecast", self.window.fit_until);
            return Err(FitError::InsufficientData {
                required: 2,
                actual: 0,
            });
        };

        let points: Vec<(f64, f64)> = observed
            .iter()
            .map(|&(year, count)| ((year - base_year) as f64, count))
            .collect();

        let params = self.fitter.fit(&points).inspect_err(|e| {
            warn!("Forecast fit failed: {e}");
        })?;
        debug!(
            "Fitted a = {:.4}, b = {:.6} on {} years from {}",
            params.a,
            params.b,
            points.len(),
            base_year
        );

        let projected = (self.window.start..=self.window.end)
            .map(|year| {
                let value = params.evaluate((year - base_year) as f64).round();
                // `as i64` saturates silently
                if !value.is_finite() || value >= i64::MAX as f64 || value < i64::MIN as f64 {
                    warn!("Projection for {year} is out of range: {value}");
                    return Err(FitError::Diverged(format!(
                        "projection for {year} is out of range"
                    )));
                }
                Ok(ProjectedCount {
                    year,
                    projected_count: value as i64,
                })
            })
            .collect::<Result<ForecastSeries, FitError>>()?;

        Ok(ForecastReport {
            params,
            base_year,
            observed,
            projected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GroupKey;
    use crate::stats::{SummaryRow, SummaryValue, COUNT_LABEL};

    fn yearly(points: &[(i64, u64)]) -> SummaryTable {
        SummaryTable::new(
            &["Model Year"],
            COUNT_LABEL,
            points
                .iter()
                .map(|&(year, count)| SummaryRow {
                    key: GroupKey::Year(year),
                    value: SummaryValue::Count(count),
                })
                .collect(),
        )
    }

    fn synthetic() -> SummaryTable {
        yearly(&[(2018, 100), (2019, 150), (2020, 225), (2021, 338)])
    }

    #[test]
    fn continues_growth_one_year_out() {
        let window = ForecastWindow {
            fit_until: 2021,
            start: 2022,
            end: 2022,
        };

        let report = Forecaster::new(window).forecast(&synthetic()).unwrap();

        assert_eq!(report.base_year, 2018);
        assert_eq!(report.projected.len(), 1);
        let projected = report.projected[0].projected_count as f64;
        assert!(((projected - 507.0) / 507.0).abs() < 0.05, "got {projected}");
        assert!(((report.model_value(2022) - 507.0) / 507.0).abs() < 0.05);
    }

    #[test]
    fn default_window_projects_2024_through_2029() {
        let report = Forecaster::new(ForecastWindow::default())
            .forecast(&synthetic())
            .unwrap();

        let years: Vec<_> = report.projected.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2024, 2025, 2026, 2027, 2028, 2029]);
        assert!(report
            .projected
            .windows(2)
            .all(|w| w[0].projected_count < w[1].projected_count));
    }

    #[test]
    fn years_after_cutoff_are_not_fitted() {
        let mut table = synthetic();
        table.rows.push(SummaryRow {
            key: GroupKey::Year(2024),
            value: SummaryValue::Count(3),
        });

        let report = Forecaster::new(ForecastWindow::default())
            .forecast(&table)
            .unwrap();

        assert_eq!(report.observed.len(), 4);
        assert_eq!(report.observed.last(), Some(&(2021, 338.0)));
    }

    #[test]
    fn single_year_fails_with_fit_error() {
        let err = Forecaster::new(ForecastWindow::default())
            .forecast(&yearly(&[(2020, 40)]))
            .unwrap_err();
        assert_eq!(err, FitError::InsufficientData { required: 2, actual: 1 });
    }

    #[test]
    fn no_historical_years_fails_with_fit_error() {
        let err = Forecaster::new(ForecastWindow::default())
            .forecast(&yearly(&[(2025, 40), (2026, 50)]))
            .unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { actual: 0, .. }));
    }

    struct Fixed(ExponentialParams);

    impl ExponentialFitter for Fixed {
        fn fit(&self, _points: &[(f64, f64)]) -> Result<ExponentialParams, FitError> {
            Ok(self.0)
        }
    }

    #[test]
    fn overflowing_projection_is_a_fit_error() {
        let fitter = Fixed(ExponentialParams { a: 1.0, b: 1.0 });
        let window = ForecastWindow {
            fit_until: 2023,
            start: 2024,
            end: 2100,
        };

        let err = Forecaster::with_fitter(fitter, window)
            .forecast(&synthetic())
            .unwrap_err();

        assert!(matches!(err, FitError::Diverged(ref msg) if msg.contains("2062")));
    }

    #[test]
    fn projection_uses_recentred_years() {
        let fitter = Fixed(ExponentialParams { a: 10.0, b: 0.0 });
        let window = ForecastWindow {
            fit_until: 2023,
            start: 2030,
            end: 2031,
        };

        let report = Forecaster::with_fitter(fitter, window)
            .forecast(&synthetic())
            .unwrap();

        assert_eq!(
            report.projected,
            vec![
                ProjectedCount { year: 2030, projected_count: 10 },
                ProjectedCount { year: 2031, projected_count: 10 },
            ]
        );
    }
}
