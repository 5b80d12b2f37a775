//! Durable contact table.
//!
//! The table is loaded whole and every field update rewrites the whole file,
//! so the persisted state always reflects the last completed transition.

mod csv_store;
mod store;
mod types;

pub use csv_store::CsvRowStore;
pub use store::{RowStore, StorageError};
pub use types::{ContactRow, RowField, REQUIRED_COLUMNS};
