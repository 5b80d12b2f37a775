//! Call orchestrator implementation.
//!
//! One run loads the table once, validates every pending row, spawns a call
//! job per valid row and waits for all of them. Rows already carrying a
//! recording are never touched, so running again resumes the rest.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{Config, PromptConfig};
use crate::poller::{CallStatusPoller, RecordingPoller};
use crate::provider::CallClient;
use crate::retry::RetryPolicy;
use crate::table::{RowField, RowStore};

use super::config::OrchestratorConfig;
use super::job::{CallJob, JobContext};
use super::types::{JobOutcome, OrchestratorError, RunSummary};

/// Dials every pending contact of a table and records the results in it.
pub struct CallOrchestrator {
    config: OrchestratorConfig,
    prompts: PromptConfig,
    context: Arc<JobContext>,
}

impl CallOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        prompts: PromptConfig,
        from_number: impl Into<String>,
        store: Arc<dyn RowStore>,
        client: Arc<dyn CallClient>,
        retry: RetryPolicy,
    ) -> Self {
        let status_poller = CallStatusPoller::new(
            Arc::clone(&client),
            config.status_poll_interval(),
            config.status_timeout(),
        );
        let recording_poller = RecordingPoller::new(
            Arc::clone(&client),
            config.recording_poll_interval(),
            config.recording_timeout(),
        );

        let context = Arc::new(JobContext {
            client,
            store,
            retry,
            status_poller,
            recording_poller,
            from_number: from_number.into(),
            record: config.record,
        });

        Self {
            config,
            prompts,
            context,
        }
    }

    /// Create an orchestrator from the application config.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn RowStore>,
        client: Arc<dyn CallClient>,
    ) -> Self {
        Self::new(
            config.orchestrator.clone(),
            config.prompts.clone(),
            config.provider.from_number.clone(),
            store,
            client,
            RetryPolicy::new(&config.retry),
        )
    }

    /// Run one batch to completion.
    ///
    /// Fails only if the table cannot be loaded. Per-row failures are written
    /// to the row and counted in the summary.
    pub async fn run(&self) -> Result<RunSummary, OrchestratorError> {
        let run_id = Uuid::new_v4();
        let rows = self.context.store.load()?;
        let mut summary = RunSummary::new(run_id, rows.len());

        let pending: Vec<_> = rows.into_iter().filter(|row| row.is_pending()).collect();
        summary.skipped = summary.total_rows - pending.len();

        if pending.is_empty() {
            info!(
                "Run {}: no pending rows among {}, nothing to do",
                run_id, summary.total_rows
            );
            summary.finish();
            return Ok(summary);
        }

        info!(
            "Run {}: {} pending of {} rows",
            run_id,
            pending.len(),
            summary.total_rows
        );

        let limiter = (self.config.max_concurrent_calls > 0)
            .then(|| Arc::new(Semaphore::new(self.config.max_concurrent_calls)));
        let mut jobs = JoinSet::new();

        for row in pending {
            let job = match CallJob::from_row(&row, &self.prompts) {
                Ok(job) => job,
                Err(reason) => {
                    warn!(
                        "Row {} ({:?}): not dialing, {}",
                        row.index,
                        row.contact_id,
                        reason.status()
                    );
                    if let Err(e) = self
                        .context
                        .write(row.index, RowField::Status, reason.status())
                        .await
                    {
                        error!("Row {}: {}", row.index, e);
                    }
                    summary.record(&JobOutcome::Invalid { reason });
                    continue;
                }
            };

            debug!(
                "Row {} ({}): dispatching call to {}",
                job.index, job.contact_id, job.destination.number
            );
            let context = Arc::clone(&self.context);
            let limiter = limiter.clone();
            jobs.spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                job.run(&context).await
            });
            summary.dispatched += 1;
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    error!("Run {}: call job panicked: {}", run_id, e);
                    summary.failed += 1;
                }
            }
        }

        summary.finish();
        info!(
            "Run {} finished: {} dispatched, {} completed, {} failed, {} timed out, {} aborted, {} invalid, {} skipped",
            run_id,
            summary.dispatched,
            summary.completed,
            summary.failed,
            summary.timed_out,
            summary.aborted,
            summary.invalid,
            summary.skipped
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CallStatus;
    use crate::table::{ContactRow, CsvRowStore, StorageError};
    use crate::testing::{fixtures, MockCallClient};
    use tempfile::TempDir;

    fn orchestrator(
        store: Arc<CsvRowStore>,
        client: Arc<MockCallClient>,
        config: OrchestratorConfig,
    ) -> CallOrchestrator {
        CallOrchestrator::new(
            config,
            fixtures::prompts(),
            "+15550001111",
            store,
            client,
            RetryPolicy::immediate(3),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_pending_set_has_no_side_effects() {
        let dir = TempDir::new().unwrap();
        let contents = "contact_id,telephone,recording_url,status\n\
                        c1,+15551230000,https://x/RE1.mp3,Completed\n";
        let path = fixtures::write_table(dir.path(), contents).unwrap();
        let store = Arc::new(CsvRowStore::open(&path).unwrap());
        let client = Arc::new(MockCallClient::new());

        let summary = orchestrator(store, client.clone(), OrchestratorConfig::default())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.dispatched, 0);
        assert_eq!(client.place_call_count().await, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap_still_finishes_every_row() {
        let dir = TempDir::new().unwrap();
        let mut contents = String::from("contact_id,telephone,recording_url,status\n");
        for i in 0..5 {
            contents.push_str(&format!("c{i},+1555123000{i},,\n"));
        }
        let path = fixtures::write_table(dir.path(), &contents).unwrap();
        let store = Arc::new(CsvRowStore::open(&path).unwrap());
        let client = Arc::new(MockCallClient::new());
        client
            .set_default_status_sequence(vec![CallStatus::InProgress, CallStatus::Completed])
            .await;
        client.set_recordings(vec![fixtures::recording("RE1")]).await;
        let config = OrchestratorConfig {
            max_concurrent_calls: 2,
            ..OrchestratorConfig::default()
        };

        let summary = orchestrator(store.clone(), client.clone(), config)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.dispatched, 5);
        assert_eq!(summary.completed, 5);
        assert_eq!(client.place_call_count().await, 5);
        assert!(store.load().unwrap().iter().all(|row| !row.is_pending()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecorded_run_marks_completed_without_url() {
        let dir = TempDir::new().unwrap();
        let path = fixtures::write_table(
            dir.path(),
            "contact_id,telephone,recording_url,status\nc1,+15551230000,,\n",
        )
        .unwrap();
        let store = Arc::new(CsvRowStore::open(&path).unwrap());
        let client = Arc::new(MockCallClient::new());
        let config = OrchestratorConfig {
            record: false,
            ..OrchestratorConfig::default()
        };

        let summary = orchestrator(store.clone(), client.clone(), config)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.completed, 1);
        assert!(!client.placed_calls().await[0].request.record);
        let rows = store.load().unwrap();
        assert_eq!(rows[0].status, "Completed");
        assert!(rows[0].is_pending());
    }

    /// Loads one dialable row and panics on every write.
    struct PanickingStore;

    impl RowStore for PanickingStore {
        fn load(&self) -> Result<Vec<ContactRow>, StorageError> {
            Ok(vec![ContactRow {
                index: 0,
                contact_id: "c1".to_string(),
                telephone: "+15551230000".to_string(),
                recording_url: None,
                status: String::new(),
            }])
        }

        fn update(&self, _index: usize, _field: RowField, _value: &str) -> Result<(), StorageError> {
            panic!("store exploded");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_job_counts_as_failed() {
        let client = Arc::new(MockCallClient::new());
        let orchestrator = CallOrchestrator::new(
            OrchestratorConfig::default(),
            fixtures::prompts(),
            "+15550001111",
            Arc::new(PanickingStore),
            client.clone(),
            RetryPolicy::immediate(3),
        );

        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.aborted, 0);
        assert_eq!(client.place_call_count().await, 1);
    }
}
