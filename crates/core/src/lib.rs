pub mod config;
pub mod orchestrator;
pub mod poller;
pub mod provider;
pub mod retry;
pub mod script;
pub mod table;
pub mod testing;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use orchestrator::{CallOrchestrator, JobOutcome, OrchestratorConfig, OrchestratorError, RunSummary};
pub use poller::{CallOutcome, CallStatusPoller, RecordingOutcome, RecordingPoller};
pub use provider::{CallClient, CallStatus, PlaceCallRequest, ProviderError, TwilioClient};
pub use retry::{RetryConfig, RetryError, RetryPolicy};
pub use script::VoiceScript;
pub use table::{ContactRow, CsvRowStore, RowField, RowStore, StorageError};
