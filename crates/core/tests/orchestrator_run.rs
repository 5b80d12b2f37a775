//! Orchestrator run integration tests.
//!
//! These tests drive whole batches against a CSV table on disk and the mock
//! provider: pending -> Initiated -> {Completed | busy | timeout | Error: ...}

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use callbatch_core::{
    provider::CallStatus,
    testing::{fixtures, MockCallClient},
    CallOrchestrator, ContactRow, CsvRowStore, OrchestratorConfig, RetryPolicy, RowField,
    RowStore, RunSummary, StorageError,
};

const HEADER: &str = "contact_id,telephone,recording_url,status\n";

/// Test helper owning the table, the store and the mock provider.
struct TestHarness {
    path: PathBuf,
    store: Arc<CsvRowStore>,
    client: Arc<MockCallClient>,
    config: OrchestratorConfig,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new(table: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = fixtures::write_table(temp_dir.path(), table).expect("Failed to write table");
        let store = Arc::new(CsvRowStore::open(&path).expect("Failed to open table"));
        let client = Arc::new(MockCallClient::new());
        client.set_recordings(vec![fixtures::recording("RE1")]).await;

        Self {
            path,
            store,
            client,
            config: OrchestratorConfig::default(),
            _temp_dir: temp_dir,
        }
    }

    async fn run(&self) -> RunSummary {
        CallOrchestrator::new(
            self.config.clone(),
            fixtures::prompts(),
            "+15550001111",
            self.store.clone(),
            self.client.clone(),
            RetryPolicy::immediate(3),
        )
        .run()
        .await
        .expect("Run failed")
    }

    fn rows(&self) -> Vec<ContactRow> {
        self.store.load().expect("Failed to load table")
    }

    fn contents(&self) -> String {
        std::fs::read_to_string(&self.path).expect("Failed to read table")
    }
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_batch() {
    let harness = TestHarness::new(&format!(
        "{HEADER}c1,+15551230000,,\nc2,+15557770000W123,,\n"
    ))
    .await;

    let summary = harness.run().await;

    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.completed, 2);

    let rows = harness.rows();
    for row in &rows {
        assert_eq!(row.status, "Completed");
        assert!(row.recording_url.as_deref().unwrap().ends_with("RE1.mp3"));
        assert!(!row.is_pending());
    }

    let mut calls = harness.client.placed_calls().await;
    calls.sort_by(|a, b| a.request.to.cmp(&b.request.to));
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].request.to, "+15551230000");
    assert_eq!(calls[0].request.from, "+15550001111");
    assert!(!calls[0].request.script.contains("digits"));
    assert_eq!(calls[1].request.to, "+15557770000");
    assert!(calls[1].request.script.contains(r#"<Play digits="123"/>"#));
    assert!(calls.iter().all(|call| call.request.record));
}

#[tokio::test(start_paused = true)]
async fn test_finished_rows_are_never_touched() {
    let harness = TestHarness::new(
        "contact_id,telephone,notes,recording_url,status\n\
         c1,+15551230000,vip,https://x/RE0.mp3,Completed\n\
         c2,+15559990000,\"call after 5, ask for Sam\",,\n",
    )
    .await;

    let summary = harness.run().await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(harness.client.place_call_count().await, 1);
    assert_eq!(harness.client.placed_calls().await[0].request.to, "+15559990000");

    let contents = harness.contents();
    assert!(contents.contains("c1,+15551230000,vip,https://x/RE0.mp3,Completed\n"));
    assert!(contents.contains("\"call after 5, ask for Sam\""));
    assert_eq!(harness.rows()[1].status, "Completed");
}

#[tokio::test(start_paused = true)]
async fn test_invalid_rows_are_marked_and_not_dialed() {
    let harness = TestHarness::new(&format!("{HEADER}c1,   ,,\n,+15551230000,,\n")).await;

    let summary = harness.run().await;

    assert_eq!(summary.invalid, 2);
    assert_eq!(summary.dispatched, 0);
    assert_eq!(harness.client.place_call_count().await, 0);

    let rows = harness.rows();
    assert_eq!(rows[0].status, "Error: No phone number");
    assert_eq!(rows[1].status, "Error: Missing contact ID");
    assert!(rows.iter().all(ContactRow::is_pending));
}

#[tokio::test(start_paused = true)]
async fn test_second_run_resumes_pending_rows_only() {
    let harness = TestHarness::new(&format!(
        "{HEADER}c1,+15551230000,,\nc2,+15552220000,,\n"
    ))
    .await;
    harness
        .client
        .set_status_sequence("+15552220000", vec![CallStatus::Ringing, CallStatus::Busy])
        .await;

    let first = harness.run().await;
    assert_eq!(first.completed, 1);
    assert_eq!(first.failed, 1);
    let rows = harness.rows();
    assert_eq!(rows[0].status, "Completed");
    assert_eq!(rows[1].status, "busy");
    assert!(rows[1].is_pending());

    harness
        .client
        .set_status_sequence("+15552220000", vec![CallStatus::Completed])
        .await;
    let second = harness.run().await;

    assert_eq!(second.skipped, 1);
    assert_eq!(second.dispatched, 1);
    assert_eq!(second.completed, 1);
    let calls = harness.client.placed_calls().await;
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].request.to, "+15552220000");
    assert!(harness.rows().iter().all(|row| !row.is_pending()));

    let third = harness.run().await;
    assert_eq!(third.dispatched, 0);
    assert_eq!(harness.client.place_call_count().await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_call_that_never_ends_times_out() {
    let harness = TestHarness::new(&format!("{HEADER}c1,+15551230000,,\n")).await;
    harness
        .client
        .set_default_status_sequence(vec![CallStatus::InProgress])
        .await;

    let summary = harness.run().await;

    assert_eq!(summary.timed_out, 1);
    let rows = harness.rows();
    assert_eq!(rows[0].status, "timeout");
    assert!(rows[0].is_pending());
}

#[tokio::test(start_paused = true)]
async fn test_missing_recording_times_out() {
    let harness = TestHarness::new(&format!("{HEADER}c1,+15551230000,,\n")).await;
    harness.client.set_recordings(Vec::new()).await;

    let summary = harness.run().await;

    assert_eq!(summary.timed_out, 1);
    let rows = harness.rows();
    assert_eq!(rows[0].status, "Error: Timeout while fetching recording");
    assert!(rows[0].is_pending());
}

#[tokio::test(start_paused = true)]
async fn test_transient_placement_failures_are_retried() {
    let harness = TestHarness::new(&format!("{HEADER}c1,+15551230000,,\n")).await;
    harness.client.fail_place_calls(2, true).await;

    let summary = harness.run().await;

    assert_eq!(summary.completed, 1);
    assert_eq!(harness.client.place_call_attempts().await, 3);
    assert_eq!(harness.rows()[0].status, "Completed");
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_placement_records_error() {
    let harness = TestHarness::new(&format!("{HEADER}c1,+15551230000,,\n")).await;
    harness.client.fail_place_calls(3, true).await;

    let summary = harness.run().await;

    assert_eq!(summary.failed, 1);
    assert_eq!(harness.client.place_call_count().await, 0);
    assert_eq!(harness.client.place_call_attempts().await, 3);
    assert_eq!(
        harness.rows()[0].status,
        "Error: Connection failed: mock connection reset"
    );
}

#[tokio::test(start_paused = true)]
async fn test_rejected_number_is_not_resubmitted() {
    let harness = TestHarness::new(&format!(
        "{HEADER}c1,+15550000000,,\nc2,+15551230000,,\n"
    ))
    .await;
    harness.client.reject_number("+15550000000").await;

    let summary = harness.run().await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(harness.client.place_call_attempts().await, 2);
    let rows = harness.rows();
    assert!(rows[0].status.starts_with("Error: Invalid request"));
    assert_eq!(rows[1].status, "Completed");
}

#[tokio::test(start_paused = true)]
async fn test_rejected_call_is_recorded_as_rejected() {
    let harness = TestHarness::new(&format!("{HEADER}c1,+15551230000,,\n")).await;
    harness
        .client
        .set_status_sequence(
            "+15551230000",
            vec![CallStatus::Ringing, CallStatus::Rejected],
        )
        .await;

    let summary = harness.run().await;

    assert_eq!(summary.failed, 1);
    let rows = harness.rows();
    assert_eq!(rows[0].status, "rejected");
    assert!(rows[0].is_pending());
}

/// In-memory store whose writes to one row always fail.
struct FailingRowStore {
    rows: Vec<ContactRow>,
    broken_row: usize,
    broken_writes: AtomicU32,
    writes: Mutex<HashMap<usize, Vec<(RowField, String)>>>,
}

impl FailingRowStore {
    fn new(rows: Vec<ContactRow>, broken_row: usize) -> Self {
        Self {
            rows,
            broken_row,
            broken_writes: AtomicU32::new(0),
            writes: Mutex::new(HashMap::new()),
        }
    }

    fn writes_to(&self, index: usize) -> Vec<(RowField, String)> {
        self.writes
            .lock()
            .unwrap()
            .get(&index)
            .cloned()
            .unwrap_or_default()
    }
}

impl RowStore for FailingRowStore {
    fn load(&self) -> Result<Vec<ContactRow>, StorageError> {
        Ok(self.rows.clone())
    }

    fn update(&self, index: usize, field: RowField, value: &str) -> Result<(), StorageError> {
        if index == self.broken_row {
            self.broken_writes.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.writes
            .lock()
            .unwrap()
            .entry(index)
            .or_default()
            .push((field, value.to_string()));
        Ok(())
    }
}

fn pending_row(index: usize, telephone: &str) -> ContactRow {
    ContactRow {
        index,
        contact_id: format!("c{index}"),
        telephone: telephone.to_string(),
        recording_url: None,
        status: String::new(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_unwritable_row_aborts_without_stopping_siblings() {
    let store = Arc::new(FailingRowStore::new(
        vec![pending_row(0, "+15551230000"), pending_row(1, "+15552220000")],
        0,
    ));
    let client = Arc::new(MockCallClient::new());
    client.set_recordings(vec![fixtures::recording("RE1")]).await;

    let summary = CallOrchestrator::new(
        OrchestratorConfig::default(),
        fixtures::prompts(),
        "+15550001111",
        store.clone(),
        client.clone(),
        RetryPolicy::immediate(3),
    )
    .run()
    .await
    .expect("Run failed");

    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.aborted, 1);
    assert_eq!(summary.completed, 1);
    // Only the Initiated write is attempted before the job gives up.
    assert_eq!(store.broken_writes.load(Ordering::SeqCst), 3);
    assert_eq!(client.place_call_count().await, 2);
    assert!(store.writes_to(0).is_empty());

    let sibling = store.writes_to(1);
    assert_eq!(sibling.first(), Some(&(RowField::Status, "Initiated".to_string())));
    let n = sibling.len();
    assert!(n >= 3);
    assert_eq!(sibling[n - 2].0, RowField::RecordingUrl);
    assert!(sibling[n - 2].1.ends_with("RE1.mp3"));
    assert_eq!(sibling[n - 1], (RowField::Status, "Completed".to_string()));
}

#[tokio::test]
async fn test_missing_table_fails_to_open() {
    let temp_dir = TempDir::new().unwrap();
    let result = CsvRowStore::open(temp_dir.path().join("absent.csv"));
    assert!(result.is_err());
}
