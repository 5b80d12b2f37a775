//! Types for telephony provider operations.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether retrying the same request can reasonably succeed.
    ///
    /// Rejected credentials and malformed requests (e.g. an invalid
    /// destination number) fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::AuthenticationFailed(_) | Self::InvalidRequest(_)
        )
    }
}

/// Provider-side state of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Busy,
    Failed,
    NoAnswer,
    /// Cancelled while queued or ringing.
    Canceled,
    /// Refused by the callee's network or handset.
    Rejected,
    /// Anything the provider reports that we do not know about.
    #[serde(untagged)]
    Unknown(String),
}

impl CallStatus {
    /// Parse a provider status string. Never fails; unrecognized values map
    /// to [`CallStatus::Unknown`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => Self::Queued,
            "initiated" => Self::Initiated,
            "ringing" => Self::Ringing,
            "in-progress" | "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "busy" => Self::Busy,
            "failed" => Self::Failed,
            "no-answer" | "no_answer" => Self::NoAnswer,
            "canceled" | "cancelled" => Self::Canceled,
            "rejected" => Self::Rejected,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the provider wording for this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Initiated => "initiated",
            Self::Ringing => "ringing",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Busy => "busy",
            Self::Failed => "failed",
            Self::NoAnswer => "no-answer",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
            Self::Unknown(s) => s,
        }
    }

    /// Whether the provider will never move this call to another state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::Busy
                | Self::Failed
                | Self::NoAnswer
                | Self::Canceled
                | Self::Rejected
        )
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to place an outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceCallRequest {
    /// Provider-owned caller number.
    pub from: String,
    /// Destination number.
    pub to: String,
    /// Call script markup, passed to the provider verbatim.
    pub script: String,
    /// Whether the provider should record the call.
    pub record: bool,
}

impl PlaceCallRequest {
    /// Create a recorded call request.
    pub fn new(from: impl Into<String>, to: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            script: script.into(),
            record: true,
        }
    }

    /// Set whether the call is recorded.
    pub fn with_record(mut self, record: bool) -> Self {
        self.record = record;
        self
    }
}

/// Result of placing a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedCall {
    /// Provider call identifier.
    pub call_id: String,
    /// Status reported at creation time.
    pub status: CallStatus,
}

/// A recording attached to a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingRef {
    /// Provider recording identifier.
    pub recording_id: String,
    /// Provider metadata URI, e.g. `https://api.../Recordings/RE1.json`.
    pub uri: String,
}

impl RecordingRef {
    /// Public playback URL: the metadata suffix swapped for the media one.
    pub fn playback_url(&self) -> String {
        match self.uri.strip_suffix(".json") {
            Some(stem) => format!("{}.mp3", stem),
            None => self.uri.clone(),
        }
    }
}

/// Trait for telephony provider backends.
#[async_trait]
pub trait CallClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Place an outbound call.
    async fn place_call(&self, request: &PlaceCallRequest) -> Result<PlacedCall, ProviderError>;

    /// Fetch the current status of a call.
    async fn call_status(&self, call_id: &str) -> Result<CallStatus, ProviderError>;

    /// List recordings for a call, oldest first. Empty until the provider
    /// has finished processing the audio.
    async fn list_recordings(&self, call_id: &str) -> Result<Vec<RecordingRef>, ProviderError>;
}
