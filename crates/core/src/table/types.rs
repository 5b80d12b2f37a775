//! Contact row types.

use serde::{Deserialize, Serialize};

pub const CONTACT_ID_COLUMN: &str = "contact_id";
pub const TELEPHONE_COLUMN: &str = "telephone";
pub const RECORDING_URL_COLUMN: &str = "recording_url";
pub const STATUS_COLUMN: &str = "status";

/// Columns every contact table must have.
pub const REQUIRED_COLUMNS: [&str; 4] = [
    CONTACT_ID_COLUMN,
    TELEPHONE_COLUMN,
    RECORDING_URL_COLUMN,
    STATUS_COLUMN,
];

/// One contact to call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRow {
    /// Zero-based position in the table (header excluded).
    pub index: usize,
    pub contact_id: String,
    /// Destination, possibly followed by a marker and extension digits.
    pub telephone: String,
    /// Playback URL of the call recording; `None` while pending.
    pub recording_url: Option<String>,
    pub status: String,
}

impl ContactRow {
    /// A row is pending until a recording URL has been stored,
    /// whatever its status says.
    pub fn is_pending(&self) -> bool {
        self.recording_url
            .as_deref()
            .map_or(true, |url| url.trim().is_empty())
    }
}

/// Fields the orchestrator is allowed to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowField {
    Status,
    RecordingUrl,
}

impl RowField {
    /// Header name of the backing column.
    pub fn column(&self) -> &'static str {
        match self {
            RowField::Status => STATUS_COLUMN,
            RowField::RecordingUrl => RECORDING_URL_COLUMN,
        }
    }
}
