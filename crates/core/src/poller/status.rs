//! Call progress poller.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::provider::{CallClient, CallStatus};

use super::poll_until;

/// Terminal result of watching one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Completed,
    Busy,
    Failed,
    NoAnswer,
    /// Cancelled before it connected.
    Canceled,
    /// Refused by the callee.
    Rejected,
    /// The provider never reported a terminal status within the ceiling.
    TimedOut,
}

impl CallOutcome {
    /// Outcome for a terminal provider status; `None` while the call is live.
    pub fn from_status(status: &CallStatus) -> Option<Self> {
        match status {
            CallStatus::Completed => Some(Self::Completed),
            CallStatus::Busy => Some(Self::Busy),
            CallStatus::Failed => Some(Self::Failed),
            CallStatus::NoAnswer => Some(Self::NoAnswer),
            CallStatus::Canceled => Some(Self::Canceled),
            CallStatus::Rejected => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Label written to the contact's status column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Busy => "busy",
            Self::Failed => "failed",
            Self::NoAnswer => "no-answer",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
            Self::TimedOut => "timeout",
        }
    }
}

/// Polls a call until the provider reports a terminal status.
#[derive(Clone)]
pub struct CallStatusPoller {
    client: Arc<dyn CallClient>,
    interval: Duration,
    ceiling: Duration,
}

impl CallStatusPoller {
    pub fn new(client: Arc<dyn CallClient>, interval: Duration, ceiling: Duration) -> Self {
        Self {
            client,
            interval,
            ceiling,
        }
    }

    /// Block until the call ends or the ceiling elapses.
    pub async fn wait(&self, call_id: &str) -> CallOutcome {
        let client = &self.client;
        let outcome = poll_until(self.interval, self.ceiling, move || async move {
            match client.call_status(call_id).await {
                Ok(status) => {
                    let outcome = CallOutcome::from_status(&status);
                    if outcome.is_none() {
                        debug!("Call {} is {}", call_id, status);
                    }
                    outcome
                }
                Err(e) => {
                    warn!("Failed to fetch status of call {}: {}", call_id, e);
                    None
                }
            }
        })
        .await;

        match outcome {
            Some(outcome) => {
                debug!("Call {} ended: {}", call_id, outcome.label());
                outcome
            }
            None => {
                warn!(
                    "Call {} did not finish within {:?}, giving up",
                    call_id, self.ceiling
                );
                CallOutcome::TimedOut
            }
        }
    }
}
