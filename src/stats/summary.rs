//! Summary Table Module
//! Keyed counts and averages ready for rendering.

use crate::data::GroupKey;
use serde::Serialize;
use std::fmt;

/// Column label for count tables.
pub const COUNT_LABEL: &str = "Number of Vehicles";
/// Column label for average range tables.
pub const AVERAGE_RANGE_LABEL: &str = "Average Electric Range (miles)";

/// Value of a summary row: an exact tally or a floating-point mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Count(u64),
    Mean(f64),
}

impl SummaryValue {
    pub fn as_f64(self) -> f64 {
        match self {
            SummaryValue::Count(count) => count as f64,
            SummaryValue::Mean(mean) => mean,
        }
    }

    pub fn as_count(self) -> Option<u64> {
        match self {
            SummaryValue::Count(count) => Some(count),
            SummaryValue::Mean(_) => None,
        }
    }
}

impl fmt::Display for SummaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryValue::Count(count) => write!(f, "{count}"),
            SummaryValue::Mean(mean) => write!(f, "{mean:.2}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: GroupKey,
    pub value: SummaryValue,
}

/// Keyed summary with labels for each column.
///
/// Keys are unique. Row order is the order the producing operation sorted
/// them in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub key_labels: Vec<String>,
    pub value_label: String,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn new(key_labels: &[&str], value_label: &str, rows: Vec<SummaryRow>) -> Self {
        Self {
            key_labels: key_labels.iter().map(|s| s.to_string()).collect(),
            value_label: value_label.to_string(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &GroupKey) -> Option<SummaryValue> {
        self.rows.iter().find(|row| &row.key == key).map(|row| row.value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.rows.iter().map(|row| &row.key)
    }

    /// Sum of all count rows; means contribute nothing.
    pub fn total_count(&self) -> u64 {
        self.rows.iter().filter_map(|row| row.value.as_count()).sum()
    }

    /// `(year, value)` points for tables keyed by year, in row order.
    pub fn year_points(&self) -> Vec<(i64, f64)> {
        self.rows
            .iter()
            .filter_map(|row| match row.key {
                GroupKey::Year(year) => Some((year, row.value.as_f64())),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key_header = self.key_labels.join(" / ");
        let key_width = self
            .rows
            .iter()
            .map(|row| row.key.to_string().chars().count())
            .chain(std::iter::once(key_header.chars().count()))
            .max()
            .unwrap_or(0);

        writeln!(f, "{key_header:<key_width$}  {}", self.value_label)?;
        for row in &self.rows {
            writeln!(f, "{:<key_width$}  {}", row.key.to_string(), row.value)?;
        }
        Ok(())
    }
}
