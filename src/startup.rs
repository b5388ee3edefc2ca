use quickcal::attempt_log::AttemptLog;
use quickcal::config::Config;
use quickcal::error::Error;
use quickcal::extraction::GeminiClient;
use quickcal::orchestrator::Orchestrator;
use quickcal::server::{self, AppState};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::shutdown;

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,hyper=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Wire the pipeline together and serve HTTP until a shutdown signal arrives
pub async fn start_server(config: Config) -> miette::Result<()> {
    let client = GeminiClient::new(&config.backend)?;

    if config.validate_key_on_start {
        if client.validate_key().await {
            info!("Backend accepted the configured API key");
        } else {
            warn!("Backend rejected the configured API key, requests will fail");
        }
    }

    let log = AttemptLog::from_config(&config);
    let orchestrator = Orchestrator::new(Arc::new(client), log, config.default_timezone.clone());
    let state = AppState::new(orchestrator, config.request_deadline);

    server::serve(&config, state, shutdown::wait_for_signal()).await?;

    info!("QuickCal shut down");
    Ok(())
}
