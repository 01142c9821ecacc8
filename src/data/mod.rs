//! Data module - CSV loading, cleaning and typed records

mod loader;
pub(crate) mod record;

pub use loader::{ColumnInfo, ColumnKind, DataLoader, LoaderError, RawTable};
pub use record::{Dataset, Field, GroupKey, VehicleRecord, REQUIRED_COLUMNS};
