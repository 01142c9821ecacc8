//! CSV Data Loader Module
//! Handles CSV loading, schema validation and cleaning using Polars.

use super::record::{
    Dataset, VehicleRecord, CITY, COUNTY, ELECTRIC_RANGE, MAKE, MODEL, MODEL_YEAR,
    REQUIRED_COLUMNS, VEHICLE_TYPE,
};
use log::{debug, info};
use polars::prelude::*;
use serde::Serialize;
use std::fmt;
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;

/// Rows used by Polars to infer column types.
const INFER_SCHEMA_ROWS: usize = 10000;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to parse CSV: {0}")]
    Parse(#[from] PolarsError),
    #[error("Input is empty")]
    EmptyInput,
    #[error("Header row is missing or has an empty column name")]
    EmptyHeader,
    #[error("Required column '{0}' is missing")]
    MissingColumn(String),
    #[error("Column '{column}' cannot be read as {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },
    #[error("Column '{column}' has a missing value at row {row}")]
    MissingValue { column: String, row: usize },
    #[error("Column '{column}' has an invalid value at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        reason: String,
    },
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Inferred kind of a source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Text,
    Other,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Name and inferred kind of a source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
}

/// Parsed table with every source column, before typed extraction.
#[derive(Debug, Clone)]
pub struct RawTable {
    df: DataFrame,
}

/// Reads CSV input into a [`RawTable`].
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file from disk.
    pub fn load_path(path: impl AsRef<Path>) -> Result<RawTable, LoaderError> {
        let path = path.as_ref();
        debug!("Reading {}", path.display());
        let bytes = std::fs::read(path)?;
        Self::load_bytes(bytes)
    }

    /// Load CSV from any reader, e.g. standard input or an upload.
    pub fn load_reader(mut reader: impl Read) -> Result<RawTable, LoaderError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::load_bytes(bytes)
    }

    /// Load CSV held in memory.
    pub fn load_bytes(bytes: Vec<u8>) -> Result<RawTable, LoaderError> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(LoaderError::EmptyInput);
        }

        let options = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS));
        let df = options
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;

        let table = RawTable { df };
        table.validate_schema()?;
        info!(
            "Loaded {} rows, {} columns",
            table.row_count(),
            table.df.width()
        );
        Ok(table)
    }
}

impl RawTable {
    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    /// Column names with their inferred kinds, in source order.
    pub fn columns(&self) -> Vec<ColumnInfo> {
        self.df
            .get_columns()
            .iter()
            .map(|col| ColumnInfo {
                name: col.name().to_string(),
                kind: column_kind(col.dtype()),
            })
            .collect()
    }

    /// New table without any row that has a missing value in any column.
    pub fn clean(&self) -> Result<RawTable, LoaderError> {
        let df = self.df.drop_nulls::<String>(None)?;
        let dropped = self.df.height() - df.height();
        if dropped > 0 {
            info!("Dropped {} rows with missing values", dropped);
        }
        Ok(RawTable { df })
    }

    /// Convert the recognized columns into typed records.
    pub fn to_dataset(&self) -> Result<Dataset, LoaderError> {
        let years = int_values(&self.df, MODEL_YEAR)?;
        let counties = text_values(&self.df, COUNTY)?;
        let cities = text_values(&self.df, CITY)?;
        let types = text_values(&self.df, VEHICLE_TYPE)?;
        let makes = text_values(&self.df, MAKE)?;
        let models = text_values(&self.df, MODEL)?;
        let ranges = float_values(&self.df, ELECTRIC_RANGE)?;

        if let Some(row) = ranges.iter().position(|r| *r < 0.0 || r.is_nan()) {
            return Err(LoaderError::InvalidValue {
                column: ELECTRIC_RANGE.to_string(),
                row,
                reason: format!("expected a non-negative range, got {}", ranges[row]),
            });
        }

        let records = years
            .into_iter()
            .zip(counties)
            .zip(cities)
            .zip(types)
            .zip(makes)
            .zip(models)
            .zip(ranges)
            .map(
                |((((((model_year, county), city), vehicle_type), make), model), electric_range)| {
                    VehicleRecord {
                        model_year,
                        county,
                        city,
                        vehicle_type,
                        make,
                        model,
                        electric_range,
                    }
                },
            )
            .collect::<Dataset>();

        debug!("Materialised {} vehicle records", records.len());
        Ok(records)
    }

    fn validate_schema(&self) -> Result<(), LoaderError> {
        let names = self.df.get_column_names();
        if names.is_empty() || names.iter().any(|name| name.trim().is_empty()) {
            return Err(LoaderError::EmptyHeader);
        }
        for required in REQUIRED_COLUMNS {
            if !names.iter().any(|name| name.as_str() == required) {
                return Err(LoaderError::MissingColumn(required.to_string()));
            }
        }
        Ok(())
    }
}

fn column_kind(dtype: &DataType) -> ColumnKind {
    match dtype {
        DataType::Float32
        | DataType::Float64
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => ColumnKind::Numeric,
        DataType::String => ColumnKind::Text,
        _ => ColumnKind::Other,
    }
}

fn typed_column(
    df: &DataFrame,
    name: &str,
    dtype: DataType,
    expected: &'static str,
) -> Result<Column, LoaderError> {
    let column = df
        .column(name)
        .map_err(|_| LoaderError::MissingColumn(name.to_string()))?;
    column
        .strict_cast(&dtype)
        .map_err(|_| LoaderError::ColumnType {
            column: name.to_string(),
            expected,
        })
}

fn require<T>(
    values: impl Iterator<Item = Option<T>>,
    name: &str,
) -> Result<Vec<T>, LoaderError> {
    values
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| LoaderError::MissingValue {
                column: name.to_string(),
                row,
            })
        })
        .collect()
}

fn int_values(df: &DataFrame, name: &str) -> Result<Vec<i64>, LoaderError> {
    // an integer cast truncates, so float columns must hold whole numbers
    let source = df
        .column(name)
        .map_err(|_| LoaderError::MissingColumn(name.to_string()))?;
    if source.dtype().is_float() {
        let values = float_values(df, name)?;
        if let Some(row) = values.iter().position(|v| v.fract() != 0.0) {
            return Err(LoaderError::InvalidValue {
                column: name.to_string(),
                row,
                reason: format!("expected a whole number, got {}", values[row]),
            });
        }
    }
    let column = typed_column(df, name, DataType::Int64, "an integer")?;
    require(column.i64()?.into_iter(), name)
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, LoaderError> {
    let column = typed_column(df, name, DataType::Float64, "a number")?;
    require(column.f64()?.into_iter(), name)
}

fn text_values(df: &DataFrame, name: &str) -> Result<Vec<String>, LoaderError> {
    let column = typed_column(df, name, DataType::String, "text")?;
    require(
        column.str()?.into_iter().map(|v| v.map(str::to_string)),
        name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str =
        "VIN (1-10),County,City,State,Model Year,Make,Model,Electric Vehicle Type,Electric Range";

    fn csv(rows: &[&str]) -> Vec<u8> {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.push('\n');
        text.into_bytes()
    }

    fn sample() -> Vec<u8> {
        csv(&[
            "5YJ3E1EA1J,King,Seattle,WA,2018,TESLA,MODEL 3,Battery Electric Vehicle (BEV),215",
            "1N4AZ0CP8D,King,Bellevue,WA,2013,NISSAN,LEAF,Battery Electric Vehicle (BEV),75",
            "KNDCC3LG6L,Snohomish,,WA,2020,KIA,NIRO,Battery Electric Vehicle (BEV),239",
            "1G1FW6S03H,Pierce,Tacoma,,2017,CHEVROLET,BOLT EV,Battery Electric Vehicle (BEV),238",
            "JTDKN3DP8D,Thurston,Olympia,WA,2013,TOYOTA,PRIUS PLUG-IN,Plug-in Hybrid Electric Vehicle (PHEV),6",
        ])
    }

    #[test]
    fn load_infers_column_kinds() {
        let table = DataLoader::load_bytes(sample()).unwrap();
        assert_eq!(table.row_count(), 5);

        let columns = table.columns();
        let kind = |name: &str| columns.iter().find(|c| c.name == name).unwrap().kind;
        assert_eq!(kind(MODEL_YEAR), ColumnKind::Numeric);
        assert_eq!(kind(ELECTRIC_RANGE), ColumnKind::Numeric);
        assert_eq!(kind(MAKE), ColumnKind::Text);
    }

    #[test]
    fn clean_drops_rows_with_any_gap() {
        let table = DataLoader::load_bytes(sample()).unwrap();
        let cleaned = table.clean().unwrap();

        // missing City and missing State (an unrecognized column) both count
        assert_eq!(cleaned.row_count(), 3);

        let dataset = cleaned.to_dataset().unwrap();
        let makes: Vec<_> = dataset.iter().map(|r| r.make.as_str()).collect();
        assert_eq!(makes, ["TESLA", "NISSAN", "TOYOTA"]);
    }

    #[test]
    fn clean_is_idempotent() {
        let cleaned = DataLoader::load_bytes(sample()).unwrap().clean().unwrap();
        let twice = cleaned.clean().unwrap();
        assert_eq!(cleaned.row_count(), twice.row_count());
        assert_eq!(cleaned.to_dataset().unwrap(), twice.to_dataset().unwrap());
    }

    #[test]
    fn uncleaned_table_reports_missing_value() {
        let table = DataLoader::load_bytes(sample()).unwrap();
        let err = table.to_dataset().unwrap_err();
        assert!(matches!(err, LoaderError::MissingValue { ref column, row: 2 } if column == CITY));
    }

    #[test]
    fn missing_required_column_fails_at_load() {
        let bytes = b"County,City,Model Year,Make,Model,Electric Range\nKing,Seattle,2018,TESLA,MODEL 3,215\n".to_vec();
        let err = DataLoader::load_bytes(bytes).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn(ref c) if c == VEHICLE_TYPE));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            DataLoader::load_bytes(Vec::new()),
            Err(LoaderError::EmptyInput)
        ));
        assert!(matches!(
            DataLoader::load_bytes(b"  \n\n".to_vec()),
            Err(LoaderError::EmptyInput)
        ));
    }

    #[test]
    fn non_numeric_year_is_a_type_error() {
        let bytes = csv(&["X,King,Seattle,WA,twenty,TESLA,MODEL 3,Battery Electric Vehicle (BEV),215"]);
        let table = DataLoader::load_bytes(bytes).unwrap().clean().unwrap();
        let err = table.to_dataset().unwrap_err();
        assert!(matches!(err, LoaderError::ColumnType { ref column, .. } if column == MODEL_YEAR));
    }

    #[test]
    fn fractional_year_is_rejected() {
        let bytes = csv(&[
            "X,King,Seattle,WA,2018,TESLA,MODEL 3,Battery Electric Vehicle (BEV),215",
            "Y,King,Seattle,WA,2020.5,TESLA,MODEL Y,Battery Electric Vehicle (BEV),330",
        ]);
        let table = DataLoader::load_bytes(bytes).unwrap().clean().unwrap();
        let err = table.to_dataset().unwrap_err();
        assert!(matches!(
            err,
            LoaderError::InvalidValue { ref column, row: 1, .. } if column == MODEL_YEAR
        ));
    }

    #[test]
    fn whole_float_year_is_accepted() {
        let bytes = csv(&["X,King,Seattle,WA,2018.0,TESLA,MODEL 3,Battery Electric Vehicle (BEV),215"]);
        let table = DataLoader::load_bytes(bytes).unwrap().clean().unwrap();
        let dataset = table.to_dataset().unwrap();
        assert_eq!(dataset.records()[0].model_year, 2018);
    }

    #[test]
    fn column_kinds_display_lowercase() {
        assert_eq!(ColumnKind::Numeric.to_string(), "numeric");
        assert_eq!(ColumnKind::Text.to_string(), "text");
    }

    #[test]
    fn negative_range_is_rejected() {
        let bytes = csv(&["X,King,Seattle,WA,2018,TESLA,MODEL 3,Battery Electric Vehicle (BEV),-5"]);
        let table = DataLoader::load_bytes(bytes).unwrap().clean().unwrap();
        assert!(matches!(
            table.to_dataset(),
            Err(LoaderError::InvalidValue { row: 0, .. })
        ));
    }

    #[test]
    fn load_from_path_and_reader() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&sample()).unwrap();
        file.flush().unwrap();

        let from_path = DataLoader::load_path(file.path()).unwrap();
        let from_reader = DataLoader::load_reader(Cursor::new(sample())).unwrap();
        assert_eq!(from_path.row_count(), from_reader.row_count());
    }
}
