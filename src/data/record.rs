//! Vehicle Record Module
//! Typed registration records and the immutable dataset built from them.

use serde::Serialize;
use std::fmt;

/// Column names recognized in the source CSV (case-sensitive).
pub const MODEL_YEAR: &str = "Model Year";
pub const COUNTY: &str = "County";
pub const CITY: &str = "City";
pub const VEHICLE_TYPE: &str = "Electric Vehicle Type";
pub const MAKE: &str = "Make";
pub const MODEL: &str = "Model";
pub const ELECTRIC_RANGE: &str = "Electric Range";

/// Every column the aggregations depend on, in source order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    COUNTY,
    CITY,
    MODEL_YEAR,
    MAKE,
    MODEL,
    VEHICLE_TYPE,
    ELECTRIC_RANGE,
];

/// One registration row with the fields the core reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleRecord {
    pub model_year: i64,
    pub county: String,
    pub city: String,
    pub vehicle_type: String,
    pub make: String,
    pub model: String,
    /// Electric range in miles.
    pub electric_range: f64,
}

/// Categorical fields a dataset can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ModelYear,
    County,
    City,
    VehicleType,
    Make,
    Model,
}

impl Field {
    /// Source column name for this field.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::ModelYear => MODEL_YEAR,
            Field::County => COUNTY,
            Field::City => CITY,
            Field::VehicleType => VEHICLE_TYPE,
            Field::Make => MAKE,
            Field::Model => MODEL,
        }
    }

    /// Grouping key of `record` for this field.
    pub fn key_of(self, record: &VehicleRecord) -> GroupKey {
        match self {
            Field::ModelYear => GroupKey::Year(record.model_year),
            _ => GroupKey::Name(self.text_of(record).to_string()),
        }
    }

    /// Text value of `record` for this field. Years are rendered as digits.
    pub fn text_of(self, record: &VehicleRecord) -> std::borrow::Cow<'_, str> {
        match self {
            Field::ModelYear => record.model_year.to_string().into(),
            Field::County => record.county.as_str().into(),
            Field::City => record.city.as_str().into(),
            Field::VehicleType => record.vehicle_type.as_str().into(),
            Field::Make => record.make.as_str().into(),
            Field::Model => record.model.as_str().into(),
        }
    }
}

/// Key of one row in a summary table.
///
/// Variants are never mixed inside a single table, so the derived ordering
/// (numeric for years, lexical for names) is what ascending views use.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Year(i64),
    Name(String),
    Pair(String, String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Year(year) => write!(f, "{year}"),
            GroupKey::Name(name) => f.write_str(name),
            GroupKey::Pair(outer, inner) => write!(f, "{inner} ({outer})"),
        }
    }
}

/// Immutable, cleaned collection of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<VehicleRecord>,
}

impl Dataset {
    pub fn new(records: Vec<VehicleRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[VehicleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VehicleRecord> {
        self.records.iter()
    }

    /// New dataset holding the records that satisfy `predicate`, order kept.
    pub fn filter<P>(&self, mut predicate: P) -> Dataset
    where
        P: FnMut(&VehicleRecord) -> bool,
    {
        Dataset::new(
            self.records
                .iter()
                .filter(|record| predicate(record))
                .cloned()
                .collect(),
        )
    }
}

impl FromIterator<VehicleRecord> for Dataset {
    fn from_iter<I: IntoIterator<Item = VehicleRecord>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}
