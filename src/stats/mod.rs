//! Stats module - aggregations, summary tables and range statistics

mod aggregator;
mod distribution;
mod summary;

pub use aggregator::{
    average_range_by, count_by_year, restrict_to_top, top_cities_in_top_counties,
    top_entities, top_models_of_top_makes, top_pairs_within_top_groups, AverageOrder, Grouping,
};
pub use distribution::{HistogramBin, RangeDistribution};
pub use summary::{SummaryRow, SummaryTable, SummaryValue, AVERAGE_RANGE_LABEL, COUNT_LABEL};
