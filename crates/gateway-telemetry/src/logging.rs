//! Structured logging setup, in the shape of the teacher's
//! `tracing_setup::init_tracing` but trimmed to the `tracing`/
//! `tracing-subscriber` fmt layer — no OpenTelemetry span export.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Service name, attached as a static field on every event.
    pub service_name: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit newline-delimited JSON instead of the human-readable format.
    pub json: bool,
}

impl LoggingConfig {
    /// A config for `service_name` at the given level, human-readable
    /// output.
    #[must_use]
    pub fn new(service_name: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            level: level.into(),
            json: false,
        }
    }

    /// Switch to newline-delimited JSON output.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// Errors initializing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install the global `tracing` subscriber. Safe to call once per
/// process; a second call returns [`LoggingError::Init`].
///
/// # Errors
/// Returns [`LoggingError::Init`] if a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init()
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))?;
    tracing::info!(service = %config.service_name, "logging initialized");
    Ok(())
}
