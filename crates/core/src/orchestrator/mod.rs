//! Batch call orchestrator.
//!
//! Reads the pending rows of a contact table and runs one concurrent call
//! job per row:
//! - place the call (retried on transient provider errors)
//! - poll its status until terminal or timed out
//! - on completion, poll for the recording and store its URL
//!
//! Every transition is written back to the row as it happens.

mod config;
mod destination;
mod job;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use destination::Destination;
pub use job::CallJob;
pub use runner::CallOrchestrator;
pub use types::{
    error_status, InvalidRow, JobOutcome, OrchestratorError, RunSummary, STATUS_COMPLETED,
    STATUS_INITIATED, STATUS_MISSING_CONTACT_ID, STATUS_NO_PHONE, STATUS_RECORDING_TIMEOUT,
};
