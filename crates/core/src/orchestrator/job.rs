//! Per-row call job.
//!
//! A job owns one pending row from dispatch to its terminal status:
//! place the call, wait for it to end, wait for its recording, and write each
//! transition back to the row.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::PromptConfig;
use crate::poller::{CallOutcome, CallStatusPoller, RecordingOutcome, RecordingPoller};
use crate::provider::{CallClient, PlaceCallRequest, ProviderError};
use crate::retry::RetryPolicy;
use crate::script::VoiceScript;
use crate::table::{ContactRow, RowField, RowStore};

use super::destination::Destination;
use super::types::{
    error_status, InvalidRow, JobOutcome, OrchestratorError, STATUS_COMPLETED, STATUS_INITIATED,
    STATUS_RECORDING_TIMEOUT,
};

/// Everything a job needs besides its own row, shared by all jobs of a run.
pub(crate) struct JobContext {
    pub client: Arc<dyn CallClient>,
    pub store: Arc<dyn RowStore>,
    pub retry: RetryPolicy,
    pub status_poller: CallStatusPoller,
    pub recording_poller: RecordingPoller,
    pub from_number: String,
    pub record: bool,
}

impl JobContext {
    /// Write one field of a row, retrying transient storage failures.
    pub async fn write(
        &self,
        index: usize,
        field: RowField,
        value: &str,
    ) -> Result<(), OrchestratorError> {
        let store = &self.store;
        self.retry
            .execute(move || async move { store.update(index, field, value) })
            .await
            .map_err(|source| OrchestratorError::RowWrite { index, source })
    }
}

/// A validated pending row, ready to dial.
#[derive(Debug, Clone)]
pub struct CallJob {
    pub index: usize,
    pub contact_id: String,
    pub destination: Destination,
    /// Rendered call script.
    pub script: String,
}

impl CallJob {
    /// Validate a pending row and build its call script.
    pub fn from_row(row: &ContactRow, prompts: &PromptConfig) -> Result<Self, InvalidRow> {
        let contact_id = row.contact_id.trim();
        if contact_id.is_empty() {
            return Err(InvalidRow::MissingContactId);
        }

        let destination =
            Destination::parse(&row.telephone, prompts.dtmf_marker).ok_or(InvalidRow::MissingPhone)?;

        let script = VoiceScript::prompt(
            &prompts.intro_url,
            &prompts.outro_url,
            prompts.pause_secs,
            destination.digits.as_deref(),
        )
        .render();

        Ok(Self {
            index: row.index,
            contact_id: contact_id.to_string(),
            destination,
            script,
        })
    }

    /// Drive the row to a terminal outcome. Never fails; write failures end
    /// the job as [`JobOutcome::Aborted`] with the row left pending.
    pub(crate) async fn run(self, ctx: &JobContext) -> JobOutcome {
        match self.drive(ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "Row {} ({}): giving up, row stays pending: {}",
                    self.index, self.contact_id, e
                );
                JobOutcome::Aborted {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn drive(&self, ctx: &JobContext) -> Result<JobOutcome, OrchestratorError> {
        let request = PlaceCallRequest::new(
            ctx.from_number.as_str(),
            self.destination.number.as_str(),
            self.script.as_str(),
        )
        .with_record(ctx.record);

        let client = &ctx.client;
        let request = &request;
        let placed = ctx
            .retry
            .execute_when(ProviderError::is_retryable, move || async move {
                client.place_call(request).await
            })
            .await;

        let call_id = match placed {
            Ok(placed) => placed.call_id,
            Err(e) => {
                warn!(
                    "Row {} ({}): could not place call to {} after {} attempt(s): {}",
                    self.index,
                    self.contact_id,
                    self.destination.number,
                    e.attempts(),
                    e.last_error()
                );
                let message = e.into_last_error().to_string();
                ctx.write(self.index, RowField::Status, &error_status(&message))
                    .await?;
                return Ok(JobOutcome::PlacementFailed { message });
            }
        };

        info!(
            "Row {} ({}): call {} placed to {} via {}",
            self.index,
            self.contact_id,
            call_id,
            self.destination.number,
            ctx.client.name()
        );
        ctx.write(self.index, RowField::Status, STATUS_INITIATED)
            .await?;

        let outcome = ctx.status_poller.wait(&call_id).await;
        if outcome != CallOutcome::Completed {
            info!(
                "Row {} ({}): call {} ended {}",
                self.index,
                self.contact_id,
                call_id,
                outcome.label()
            );
            ctx.write(self.index, RowField::Status, outcome.label())
                .await?;
            return Ok(JobOutcome::CallEnded { outcome });
        }

        if !ctx.record {
            ctx.write(self.index, RowField::Status, STATUS_COMPLETED)
                .await?;
            return Ok(JobOutcome::Completed {
                recording_url: None,
            });
        }

        match ctx.recording_poller.wait(&call_id).await {
            RecordingOutcome::Available { url } => {
                ctx.write(self.index, RowField::RecordingUrl, &url).await?;
                ctx.write(self.index, RowField::Status, STATUS_COMPLETED)
                    .await?;
                info!(
                    "Row {} ({}): call {} completed, recording at {}",
                    self.index, self.contact_id, call_id, url
                );
                Ok(JobOutcome::Completed {
                    recording_url: Some(url),
                })
            }
            RecordingOutcome::TimedOut => {
                ctx.write(self.index, RowField::Status, STATUS_RECORDING_TIMEOUT)
                    .await?;
                Ok(JobOutcome::RecordingTimedOut)
            }
        }
    }
}
