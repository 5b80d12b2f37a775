//! Testing utilities and mock implementations.
//!
//! Provides an in-memory [`MockCallClient`] so orchestrator runs can be
//! exercised end to end without talking to a telephony provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use callbatch_core::testing::MockCallClient;
//!
//! let client = MockCallClient::new();
//! client.set_status_sequence("+15551230000", vec![CallStatus::Ringing, CallStatus::Busy]).await;
//! client.set_recordings(vec![fixtures::recording("RE1")]).await;
//! ```

mod mock_call_client;

pub use mock_call_client::{MockCallClient, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::config::PromptConfig;
    use crate::provider::RecordingRef;

    /// Recording whose metadata URI follows the provider's layout.
    pub fn recording(recording_id: &str) -> RecordingRef {
        RecordingRef {
            recording_id: recording_id.to_string(),
            uri: format!(
                "https://api.mock/2010-04-01/Accounts/ACmock/Recordings/{}.json",
                recording_id
            ),
        }
    }

    /// Prompt settings pointing at placeholder audio.
    pub fn prompts() -> PromptConfig {
        PromptConfig {
            intro_url: "https://cdn.mock/intro.mp3".to_string(),
            outro_url: "https://cdn.mock/outro.mp3".to_string(),
            pause_secs: 1,
            dtmf_marker: 'W',
        }
    }

    /// Write a contact table into `dir` and return its path.
    pub fn write_table(dir: &Path, contents: &str) -> std::io::Result<PathBuf> {
        let path = dir.join("contacts.csv");
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}
