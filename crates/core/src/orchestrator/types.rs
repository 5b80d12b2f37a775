//! Types for the call orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::poller::CallOutcome;
use crate::retry::RetryError;
use crate::table::StorageError;

/// Status written once the provider accepts a call.
pub const STATUS_INITIATED: &str = "Initiated";
/// Status written once the recording URL is stored.
pub const STATUS_COMPLETED: &str = "Completed";
pub const STATUS_RECORDING_TIMEOUT: &str = "Error: Timeout while fetching recording";
pub const STATUS_NO_PHONE: &str = "Error: No phone number";
pub const STATUS_MISSING_CONTACT_ID: &str = "Error: Missing contact ID";

/// Status for a job that failed with `message`.
pub fn error_status(message: impl std::fmt::Display) -> String {
    format!("Error: {}", message)
}

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The contact table could not be read.
    #[error("contact table error: {0}")]
    Storage(#[from] StorageError),

    /// A row write still failed after retrying.
    #[error("failed to update row {index}: {source}")]
    RowWrite {
        index: usize,
        #[source]
        source: RetryError<StorageError>,
    },
}

/// Why a pending row was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRow {
    MissingContactId,
    MissingPhone,
}

impl InvalidRow {
    /// Status written to the row.
    pub fn status(&self) -> &'static str {
        match self {
            InvalidRow::MissingContactId => STATUS_MISSING_CONTACT_ID,
            InvalidRow::MissingPhone => STATUS_NO_PHONE,
        }
    }
}

/// Terminal result of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Call completed. Carries the stored recording URL, or `None` when
    /// recording is disabled (the row then stays pending).
    Completed { recording_url: Option<String> },
    /// The row failed validation and no call was placed.
    Invalid { reason: InvalidRow },
    /// The call ended without completing (busy, failed, no answer,
    /// canceled, rejected or timed out).
    CallEnded { outcome: CallOutcome },
    /// The call completed but no recording appeared in time.
    RecordingTimedOut,
    /// The provider never accepted the call.
    PlacementFailed { message: String },
    /// A row write still failed after retrying, so the job stopped before
    /// recording a terminal status. The row stays pending.
    Aborted { message: String },
}

/// Result of one orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Rows in the table.
    pub total_rows: usize,
    /// Rows that already had a recording.
    pub skipped: usize,
    /// Pending rows that failed validation.
    pub invalid: usize,
    /// Rows a call job was spawned for.
    pub dispatched: usize,
    pub completed: usize,
    /// Calls that ended without completing or were never placed, plus jobs
    /// that panicked.
    pub failed: usize,
    /// Calls or recordings that did not finish within their ceiling.
    pub timed_out: usize,
    pub aborted: usize,
}

impl RunSummary {
    pub fn new(run_id: Uuid, total_rows: usize) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            total_rows,
            skipped: 0,
            invalid: 0,
            dispatched: 0,
            completed: 0,
            failed: 0,
            timed_out: 0,
            aborted: 0,
        }
    }

    /// Count a dispatched job's outcome.
    pub fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Completed { .. } => self.completed += 1,
            JobOutcome::Invalid { .. } => self.invalid += 1,
            JobOutcome::CallEnded {
                outcome: CallOutcome::TimedOut,
            }
            | JobOutcome::RecordingTimedOut => self.timed_out += 1,
            JobOutcome::CallEnded { .. } | JobOutcome::PlacementFailed { .. } => self.failed += 1,
            JobOutcome::Aborted { .. } => self.aborted += 1,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Jobs that reached a terminal status.
    pub fn finished_jobs(&self) -> usize {
        self.completed + self.failed + self.timed_out + self.aborted
    }
}
