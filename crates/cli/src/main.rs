use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use callbatch_core::{
    load_config, load_config_from_env, validate_config, CallClient, CallOrchestrator, Config,
    CsvRowStore, RowStore, SanitizedConfig, TwilioClient,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file used when `CALLBATCH_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "callbatch.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("callbatch {}", VERSION);

    let config = load()?;
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Configuration loaded: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    let client: Arc<dyn CallClient> = Arc::new(
        TwilioClient::new(config.provider.clone()).context("Failed to create provider client")?,
    );
    info!("Using provider {} at {}", client.name(), config.provider.api_base);

    let table = CsvRowStore::open(&config.table.path)
        .with_context(|| format!("Failed to open contact table {:?}", config.table.path))?;
    info!("Contact table: {:?}", table.path());
    let store: Arc<dyn RowStore> = Arc::new(table);

    let orchestrator = CallOrchestrator::from_config(&config, store, client);

    tokio::select! {
        result = orchestrator.run() => {
            let summary = result.context("Call batch failed")?;
            info!(
                "Batch {} done: {} of {} dispatched calls completed",
                summary.run_id, summary.completed, summary.dispatched
            );
        }
        _ = shutdown_signal() => {
            warn!("Interrupted, exiting without waiting for calls in flight");
        }
    }

    Ok(())
}

/// Load the config file named by `CALLBATCH_CONFIG`, else `callbatch.toml`
/// if present, else the environment alone.
fn load() -> Result<Config> {
    match std::env::var("CALLBATCH_CONFIG") {
        Ok(path) => load_file(PathBuf::from(path)),
        Err(_) => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if path.exists() {
                load_file(path)
            } else {
                info!("No {} found, configuring from environment", DEFAULT_CONFIG_PATH);
                load_config_from_env().context("Failed to load config from environment")
            }
        }
    }
}

fn load_file(path: PathBuf) -> Result<Config> {
    info!("Loading configuration from {:?}", path);
    load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
