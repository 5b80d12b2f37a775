//! Recording availability poller.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::provider::CallClient;

use super::poll_until;

/// Result of waiting for a call's recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingOutcome {
    /// Public playback URL of the first recording listed.
    Available { url: String },
    /// No recording appeared within the ceiling.
    TimedOut,
}

/// Polls a completed call until the provider lists a recording.
#[derive(Clone)]
pub struct RecordingPoller {
    client: Arc<dyn CallClient>,
    interval: Duration,
    ceiling: Duration,
}

impl RecordingPoller {
    pub fn new(client: Arc<dyn CallClient>, interval: Duration, ceiling: Duration) -> Self {
        Self {
            client,
            interval,
            ceiling,
        }
    }

    /// Block until a recording is listed or the ceiling elapses.
    pub async fn wait(&self, call_id: &str) -> RecordingOutcome {
        let client = &self.client;
        let found = poll_until(self.interval, self.ceiling, move || async move {
            match client.list_recordings(call_id).await {
                Ok(recordings) => {
                    let first = recordings.into_iter().next();
                    if first.is_none() {
                        debug!("No recording yet for call {}", call_id);
                    }
                    first
                }
                Err(e) => {
                    warn!("Failed to list recordings of call {}: {}", call_id, e);
                    None
                }
            }
        })
        .await;

        match found {
            Some(recording) => {
                let url = recording.playback_url();
                debug!(
                    "Recording {} available for call {}",
                    recording.recording_id, call_id
                );
                RecordingOutcome::Available { url }
            }
            None => {
                warn!(
                    "No recording for call {} within {:?}",
                    call_id, self.ceiling
                );
                RecordingOutcome::TimedOut
            }
        }
    }
}
