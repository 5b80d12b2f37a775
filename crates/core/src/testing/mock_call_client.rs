//! Mock telephony client for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::provider::{
    CallClient, CallStatus, PlaceCallRequest, PlacedCall, ProviderError, RecordingRef,
};

/// A recorded place_call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The request that was made.
    pub request: PlaceCallRequest,
    /// Call id handed back to the caller.
    pub call_id: String,
    /// When the request was made.
    pub timestamp: chrono::DateTime<Utc>,
}

/// Per-call state.
#[derive(Debug)]
struct MockCall {
    /// Remaining statuses; the last one repeats forever.
    statuses: VecDeque<CallStatus>,
    status_polls: u32,
    recording_polls: u32,
}

#[derive(Debug)]
struct MockState {
    placed: Vec<RecordedCall>,
    calls: HashMap<String, MockCall>,
    /// Status sequences keyed by destination number.
    sequences: HashMap<String, Vec<CallStatus>>,
    default_sequence: Vec<CallStatus>,
    recordings: Vec<RecordingRef>,
    /// Recording lists stay empty for this many polls of each call.
    recordings_ready_after: u32,
    rejected_numbers: Vec<String>,
    place_failures: u32,
    place_failures_retryable: bool,
    place_attempts: u32,
    status_failures: u32,
    recording_failures: u32,
    call_counter: u32,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            placed: Vec::new(),
            calls: HashMap::new(),
            sequences: HashMap::new(),
            default_sequence: vec![CallStatus::Completed],
            recordings: Vec::new(),
            recordings_ready_after: 0,
            rejected_numbers: Vec::new(),
            place_failures: 0,
            place_failures_retryable: true,
            place_attempts: 0,
            status_failures: 0,
            recording_failures: 0,
            call_counter: 0,
        }
    }
}

/// Mock implementation of the CallClient trait.
///
/// Provides controllable behavior for testing:
/// - Track placed calls for assertions
/// - Script the status sequence each destination goes through
/// - Simulate transport failures and rejected numbers
///
/// # Example
///
/// ```rust,ignore
/// let client = MockCallClient::new();
/// client
///     .set_status_sequence("+15551230000", vec![CallStatus::Ringing, CallStatus::Completed])
///     .await;
///
/// let placed = client.place_call(&request).await?;
/// assert_eq!(client.call_status(&placed.call_id).await?, CallStatus::Ringing);
/// assert_eq!(client.call_status(&placed.call_id).await?, CallStatus::Completed);
/// ```
#[derive(Debug, Default)]
pub struct MockCallClient {
    state: Arc<RwLock<MockState>>,
}

impl MockCallClient {
    /// Create a mock client where every call completes on the first poll and
    /// no recordings exist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses reported for calls to `to`, one per poll. The last status
    /// repeats once the sequence runs out.
    pub async fn set_status_sequence(&self, to: &str, statuses: Vec<CallStatus>) {
        self.state
            .write()
            .await
            .sequences
            .insert(to.to_string(), statuses);
    }

    /// Status sequence for destinations without their own.
    pub async fn set_default_status_sequence(&self, statuses: Vec<CallStatus>) {
        self.state.write().await.default_sequence = statuses;
    }

    /// Recordings listed for every call.
    pub async fn set_recordings(&self, recordings: Vec<RecordingRef>) {
        self.state.write().await.recordings = recordings;
    }

    /// Keep recording lists empty for the first `polls` polls of each call.
    pub async fn set_recordings_ready_after(&self, polls: u32) {
        self.state.write().await.recordings_ready_after = polls;
    }

    /// Refuse calls to `to` with a permanent error.
    pub async fn reject_number(&self, to: &str) {
        self.state.write().await.rejected_numbers.push(to.to_string());
    }

    /// Fail the next `count` place_call requests.
    pub async fn fail_place_calls(&self, count: u32, retryable: bool) {
        let mut state = self.state.write().await;
        state.place_failures = count;
        state.place_failures_retryable = retryable;
    }

    /// Fail the next `count` status polls with a transport error.
    pub async fn fail_status_polls(&self, count: u32) {
        self.state.write().await.status_failures = count;
    }

    /// Fail the next `count` recording polls with a transport error.
    pub async fn fail_recording_polls(&self, count: u32) {
        self.state.write().await.recording_failures = count;
    }

    /// Get all successfully placed calls.
    pub async fn placed_calls(&self) -> Vec<RecordedCall> {
        self.state.read().await.placed.clone()
    }

    /// Number of successfully placed calls.
    pub async fn place_call_count(&self) -> usize {
        self.state.read().await.placed.len()
    }

    /// Number of place_call invocations, failed ones included.
    pub async fn place_call_attempts(&self) -> u32 {
        self.state.read().await.place_attempts
    }

    /// Status polls made for a call, failed ones included.
    pub async fn status_poll_count(&self, call_id: &str) -> u32 {
        self.state
            .read()
            .await
            .calls
            .get(call_id)
            .map_or(0, |call| call.status_polls)
    }

    /// Recording polls made for a call, failed ones included.
    pub async fn recording_poll_count(&self, call_id: &str) -> u32 {
        self.state
            .read()
            .await
            .calls
            .get(call_id)
            .map_or(0, |call| call.recording_polls)
    }
}

fn take_failure(remaining: &mut u32) -> bool {
    if *remaining > 0 {
        *remaining -= 1;
        true
    } else {
        false
    }
}

fn unknown_call(call_id: &str) -> ProviderError {
    ProviderError::InvalidRequest(format!("unknown call {}", call_id))
}

#[async_trait]
impl CallClient for MockCallClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn place_call(&self, request: &PlaceCallRequest) -> Result<PlacedCall, ProviderError> {
        let mut state = self.state.write().await;
        state.place_attempts += 1;

        if state.rejected_numbers.contains(&request.to) {
            return Err(ProviderError::InvalidRequest(format!(
                "'{}' is not a valid phone number",
                request.to
            )));
        }
        if take_failure(&mut state.place_failures) {
            return Err(if state.place_failures_retryable {
                ProviderError::ConnectionFailed("mock connection reset".to_string())
            } else {
                ProviderError::AuthenticationFailed("mock credentials rejected".to_string())
            });
        }

        state.call_counter += 1;
        let call_id = format!("CA{:032x}", state.call_counter);
        let statuses = state
            .sequences
            .get(&request.to)
            .unwrap_or(&state.default_sequence)
            .iter()
            .cloned()
            .collect();

        state.calls.insert(
            call_id.clone(),
            MockCall {
                statuses,
                status_polls: 0,
                recording_polls: 0,
            },
        );
        state.placed.push(RecordedCall {
            request: request.clone(),
            call_id: call_id.clone(),
            timestamp: Utc::now(),
        });

        Ok(PlacedCall {
            call_id,
            status: CallStatus::Queued,
        })
    }

    async fn call_status(&self, call_id: &str) -> Result<CallStatus, ProviderError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let call = state
            .calls
            .get_mut(call_id)
            .ok_or_else(|| unknown_call(call_id))?;
        call.status_polls += 1;

        if take_failure(&mut state.status_failures) {
            return Err(ProviderError::Timeout);
        }

        let status = if call.statuses.len() > 1 {
            call.statuses.pop_front()
        } else {
            call.statuses.front().cloned()
        };
        Ok(status.unwrap_or(CallStatus::InProgress))
    }

    async fn list_recordings(&self, call_id: &str) -> Result<Vec<RecordingRef>, ProviderError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let call = state
            .calls
            .get_mut(call_id)
            .ok_or_else(|| unknown_call(call_id))?;
        call.recording_polls += 1;

        if take_failure(&mut state.recording_failures) {
            return Err(ProviderError::ConnectionFailed(
                "mock connection reset".to_string(),
            ));
        }

        if call.recording_polls <= state.recordings_ready_after {
            return Ok(Vec::new());
        }
        Ok(state.recordings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(to: &str) -> PlaceCallRequest {
        PlaceCallRequest::new("+15550001111", to, "<Response/>")
    }

    #[tokio::test]
    async fn test_place_call_records_request() {
        let client = MockCallClient::new();

        let placed = client.place_call(&request("+15551230000")).await.unwrap();

        assert!(placed.call_id.starts_with("CA"));
        let calls = client.placed_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].call_id, placed.call_id);
        assert_eq!(calls[0].request.to, "+15551230000");
    }

    #[tokio::test]
    async fn test_status_sequence_repeats_last() {
        let client = MockCallClient::new();
        client
            .set_status_sequence(
                "+15551230000",
                vec![CallStatus::Ringing, CallStatus::NoAnswer],
            )
            .await;
        let call_id = client.place_call(&request("+15551230000")).await.unwrap().call_id;

        assert_eq!(client.call_status(&call_id).await.unwrap(), CallStatus::Ringing);
        assert_eq!(client.call_status(&call_id).await.unwrap(), CallStatus::NoAnswer);
        assert_eq!(client.call_status(&call_id).await.unwrap(), CallStatus::NoAnswer);
        assert_eq!(client.status_poll_count(&call_id).await, 3);
    }

    #[tokio::test]
    async fn test_unknown_call_is_invalid_request() {
        let client = MockCallClient::new();
        let err = client.call_status("CAmissing").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_injected_place_failures() {
        let client = MockCallClient::new();
        client.fail_place_calls(1, false).await;

        let err = client.place_call(&request("+15551230000")).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(client.place_call(&request("+15551230000")).await.is_ok());
        assert_eq!(client.place_call_count().await, 1);
        assert_eq!(client.place_call_attempts().await, 2);
    }

    #[tokio::test]
    async fn test_rejected_number() {
        let client = MockCallClient::new();
        client.reject_number("+15550000000").await;

        let err = client.place_call(&request("+15550000000")).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
        assert_eq!(client.place_call_count().await, 0);
    }
}
