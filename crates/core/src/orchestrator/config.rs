//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a call batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// How often to poll call status (seconds).
    #[serde(default = "default_poll_interval")]
    pub status_poll_interval_secs: u64,

    /// Give up on a call that is not terminal after this long (seconds).
    /// The row is marked `timeout`.
    #[serde(default = "default_timeout")]
    pub status_timeout_secs: u64,

    /// How often to look for the recording of a completed call (seconds).
    #[serde(default = "default_poll_interval")]
    pub recording_poll_interval_secs: u64,

    /// Give up on a recording that has not appeared after this long (seconds).
    #[serde(default = "default_timeout")]
    pub recording_timeout_secs: u64,

    /// Ask the provider to record calls.
    #[serde(default = "default_record")]
    pub record: bool,

    /// Maximum calls in flight at once (0 = unlimited).
    #[serde(default)]
    pub max_concurrent_calls: usize,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_record() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            status_poll_interval_secs: default_poll_interval(),
            status_timeout_secs: default_timeout(),
            recording_poll_interval_secs: default_poll_interval(),
            recording_timeout_secs: default_timeout(),
            record: default_record(),
            max_concurrent_calls: 0,
        }
    }
}

impl OrchestratorConfig {
    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_interval_secs)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    pub fn recording_poll_interval(&self) -> Duration {
        Duration::from_secs(self.recording_poll_interval_secs)
    }

    pub fn recording_timeout(&self) -> Duration {
        Duration::from_secs(self.recording_timeout_secs)
    }
}
