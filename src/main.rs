//! # LLM Inference Gateway
//!
//! Binary entry point: loads configuration, initializes logging, builds
//! the `AppState` (Router + Dispatcher + Metrics), and serves the HTTP
//! front door until a shutdown signal arrives.

use std::path::PathBuf;

use gateway_config::{load_config, GatewayConfig};
use gateway_server::{AppState, Server, ServerConfig};
use gateway_telemetry::logging::{self, LoggingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = load_config(config_path().as_deref()).unwrap_or_else(|e| {
        eprintln!("failed to load configuration: {e}, falling back to defaults");
        GatewayConfig::default()
    });

    let logging_config = LoggingConfig::new("gateway", config.logging.level.clone())
        .with_json(config.logging.json);
    if let Err(e) = logging::init(&logging_config) {
        eprintln!("failed to initialize logging: {e}");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        providers = config.providers.len(),
        "starting inference gateway"
    );

    if let Err(e) = run(config).await {
        error!(error = %e, "gateway exited with an error");
        std::process::exit(1);
    }
}

/// Optional config file path from `GATEWAY_CONFIG_PATH`, used only if it
/// exists (`load_config` falls back to built-in defaults otherwise).
fn config_path() -> Option<PathBuf> {
    std::env::var("GATEWAY_CONFIG_PATH").ok().map(PathBuf::from)
}

async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let server_config = ServerConfig::from_settings(&config.server);
    let state = AppState::builder().config(config).build();

    let server = Server::new(server_config, state);
    server.run().await
}
