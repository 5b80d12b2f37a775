//! Row storage trait and errors.

use std::path::PathBuf;

use thiserror::Error;

use super::{ContactRow, RowField};

/// Errors that can occur while reading or writing the contact table.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Table file does not exist.
    #[error("table not found: {0}")]
    NotFound(PathBuf),

    /// Table could not be parsed.
    #[error("malformed table: {0}")]
    Malformed(String),

    /// A required column is absent from the header.
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// Update targeted a row that does not exist.
    #[error("row {index} out of range (table has {rows} rows)")]
    RowOutOfRange { index: usize, rows: usize },

    /// I/O error while reading or replacing the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whole-table store with atomic single-field updates.
///
/// Implementations must be safe to call from many jobs at once: concurrent
/// updates to different rows must all persist.
pub trait RowStore: Send + Sync {
    /// Load every row in table order.
    fn load(&self) -> Result<Vec<ContactRow>, StorageError>;

    /// Set one field of the row at `index` and persist the table.
    fn update(&self, index: usize, field: RowField, value: &str) -> Result<(), StorageError>;
}
