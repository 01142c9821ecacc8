//! Dashboard Views
//! Assembles the sections shown for each view selection.

use crate::config::DashboardConfig;
use crate::data::{Dataset, Field};
use crate::forecast::{ForecastReport, Forecaster};
use crate::stats::{
    average_range_by, count_by_year, restrict_to_top, top_cities_in_top_counties, top_entities,
    top_models_of_top_makes, AverageOrder, Grouping, RangeDistribution, SummaryTable,
};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

/// The view selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    AdoptionOverTime,
    GeographicDistribution,
    VehicleTypes,
    Manufacturers,
    Dashboard,
}

impl View {
    pub fn title(self) -> &'static str {
        match self {
            View::AdoptionOverTime => "EV Adoption Over Time",
            View::GeographicDistribution => "Geographical Distribution",
            View::VehicleTypes => "Electric Vehicle Types",
            View::Manufacturers => "EV Manufacturers",
            View::Dashboard => "Electric Vehicle Dashboard",
        }
    }
}

/// How a section is best drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Line,
    Histogram,
    Forecast,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionContent {
    Table { table: SummaryTable },
    Distribution { distribution: RangeDistribution },
    Forecast { report: ForecastReport },
    /// The section could not be computed; other sections are unaffected.
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub chart: ChartKind,
    pub content: SectionContent,
}

impl Section {
    fn table(title: &str, chart: ChartKind, table: SummaryTable) -> Self {
        Self {
            title: title.to_string(),
            chart,
            content: SectionContent::Table { table },
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.content, SectionContent::Unavailable { .. })
    }
}

/// Everything shown for one view selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewReport {
    pub view: View,
    pub title: String,
    pub record_count: usize,
    pub sections: Vec<Section>,
}

/// Build the report for `view` from a cleaned dataset.
pub fn build_report(view: View, dataset: &Dataset, config: &DashboardConfig) -> ViewReport {
    let sections = match view {
        View::AdoptionOverTime => vec![adoption_section(dataset)],
        View::GeographicDistribution => vec![geographic_section(dataset, config)],
        View::VehicleTypes => vec![vehicle_type_section(dataset)],
        View::Manufacturers => vec![
            manufacturer_section(dataset, config),
            top_models_section(dataset, config),
        ],
        View::Dashboard => vec![
            adoption_section(dataset),
            geographic_section(dataset, config),
            vehicle_type_section(dataset),
            manufacturer_section(dataset, config),
            top_models_section(dataset, config),
            range_distribution_section(dataset, config),
            range_by_year_section(dataset),
            top_range_models_section(dataset, config),
            forecast_section(dataset, config),
        ],
    };

    ViewReport {
        view,
        title: view.title().to_string(),
        record_count: dataset.len(),
        sections,
    }
}

fn adoption_section(dataset: &Dataset) -> Section {
    Section::table(
        "Registrations by Model Year",
        ChartKind::Bar,
        count_by_year(dataset),
    )
}

fn geographic_section(dataset: &Dataset, config: &DashboardConfig) -> Section {
    Section::table(
        &format!(
            "Top {} Cities in Top {} Counties",
            config.top_cities, config.top_counties
        ),
        ChartKind::HorizontalBar,
        top_cities_in_top_counties(dataset, config.top_counties, config.top_cities),
    )
}

fn vehicle_type_section(dataset: &Dataset) -> Section {
    Section::table(
        "Registrations by Vehicle Type",
        ChartKind::HorizontalBar,
        top_entities(dataset, Field::VehicleType, usize::MAX),
    )
}

fn manufacturer_section(dataset: &Dataset, config: &DashboardConfig) -> Section {
    Section::table(
        &format!("Top {} Manufacturers", config.top_makes),
        ChartKind::HorizontalBar,
        top_entities(dataset, Field::Make, config.top_makes),
    )
}

fn top_models_section(dataset: &Dataset, config: &DashboardConfig) -> Section {
    Section::table(
        &format!(
            "Top Models in Top {} Manufacturers",
            config.top_makes_for_models
        ),
        ChartKind::HorizontalBar,
        top_models_of_top_makes(dataset, config.top_makes_for_models, config.top_models),
    )
}

fn range_distribution_section(dataset: &Dataset, config: &DashboardConfig) -> Section {
    let content = match RangeDistribution::from_dataset(dataset, config.histogram_bins) {
        Some(distribution) => SectionContent::Distribution { distribution },
        None => SectionContent::Unavailable {
            reason: "No records".to_string(),
        },
    };
    Section {
        title: "Distribution of Electric Range".to_string(),
        chart: ChartKind::Histogram,
        content,
    }
}

fn range_by_year_section(dataset: &Dataset) -> Section {
    Section::table(
        "Average Electric Range by Model Year",
        ChartKind::Line,
        average_range_by(
            dataset,
            Grouping::Single(Field::ModelYear),
            AverageOrder::AscendingByKey,
        ),
    )
}

fn top_range_models_section(dataset: &Dataset, config: &DashboardConfig) -> Section {
    let top_makes = restrict_to_top(dataset, Field::Make, config.top_makes_for_models);
    Section::table(
        &format!(
            "Top {} Models by Average Electric Range in Top Manufacturers",
            config.top_models
        ),
        ChartKind::HorizontalBar,
        average_range_by(
            &top_makes,
            Grouping::Pair(Field::Make, Field::Model),
            AverageOrder::DescendingByMean {
                limit: Some(config.top_models),
            },
        ),
    )
}

fn forecast_section(dataset: &Dataset, config: &DashboardConfig) -> Section {
    let window = config.forecast;
    let content = match Forecaster::new(window).forecast(&count_by_year(dataset)) {
        Ok(report) => SectionContent::Forecast { report },
        Err(e) => SectionContent::Unavailable {
            reason: e.to_string(),
        },
    };
    Section {
        title: format!(
            "Estimated Registrations {}-{} (fitted through {})",
            window.start, window.end, window.fit_until
        ),
        chart: ChartKind::Forecast,
        content,
    }
}

impl fmt::Display for ViewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.chars().count()))?;
        writeln!(f, "{} vehicles after cleaning", self.record_count)?;
        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "{}", section.title)?;
            writeln!(f, "{}", "-".repeat(section.title.chars().count()))?;
            match &section.content {
                SectionContent::Table { table } => write!(f, "{table}")?,
                SectionContent::Distribution { distribution } => write!(f, "{distribution}")?,
                SectionContent::Forecast { report } => write!(f, "{report}")?,
                SectionContent::Unavailable { reason } => writeln!(f, "Unavailable: {reason}")?,
            }
        }
        Ok(())
    }
}
