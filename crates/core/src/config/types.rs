use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;
use crate::retry::RetryConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub table: TableConfig,
    pub prompts: PromptConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Telephony provider credentials and endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Provider account identifier (e.g. "AC...").
    pub account_sid: String,
    /// Provider auth secret.
    pub auth_token: String,
    /// Provider-owned number calls are placed from.
    pub from_number: String,
    /// REST API base URL (default: "https://api.twilio.com")
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Contact table location.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TableConfig {
    #[serde(default = "default_table_path")]
    pub path: PathBuf,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            path: default_table_path(),
        }
    }
}

fn default_table_path() -> PathBuf {
    PathBuf::from("contacts.csv")
}

/// Audio prompts played once the callee picks up.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptConfig {
    /// Publicly reachable URL of the intro audio.
    pub intro_url: String,
    /// Publicly reachable URL of the outro audio.
    pub outro_url: String,
    /// Pause before each prompt, in seconds.
    #[serde(default = "default_pause")]
    pub pause_secs: u32,
    /// Character separating the number from post-connect DTMF digits.
    #[serde(default = "default_dtmf_marker")]
    pub dtmf_marker: char,
}

fn default_pause() -> u32 {
    1
}

fn default_dtmf_marker() -> char {
    'W'
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub provider: SanitizedProviderConfig,
    pub table: TableConfig,
    pub prompts: PromptConfig,
    pub orchestrator: OrchestratorConfig,
    pub retry: RetryConfig,
}

/// Sanitized provider config (auth token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub account_sid: String,
    pub auth_token_configured: bool,
    pub from_number: String,
    pub api_base: String,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            provider: SanitizedProviderConfig {
                account_sid: config.provider.account_sid.clone(),
                auth_token_configured: !config.provider.auth_token.is_empty(),
                from_number: config.provider.from_number.clone(),
                api_base: config.provider.api_base.clone(),
                timeout_secs: config.provider.timeout_secs,
            },
            table: config.table.clone(),
            prompts: config.prompts.clone(),
            orchestrator: config.orchestrator.clone(),
            retry: config.retry.clone(),
        }
    }
}
