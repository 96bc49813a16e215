//! Typed, validated gateway configuration: built-in defaults, overridden
//! by an optional TOML/YAML file, overridden again by `GATEWAY_*`
//! environment variables.

use std::path::Path;
use std::time::Duration;

use gateway_core::ProviderConfig;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ConfigError, ConfigResult};

/// Router-specific settings backing `gateway_routing::RouterConfig`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RouterSettings {
    /// Maximum number of entries the response cache retains.
    #[validate(range(min = 1))]
    pub cache_max_size: usize,
    /// Cache entry time-to-live.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
    /// Duration an open circuit stays open before a self-heal probe.
    #[serde(with = "humantime_serde")]
    pub circuit_reset_window: Duration,
    /// Interval between background self-heal sweeps.
    #[serde(with = "humantime_serde")]
    pub self_heal_interval: Duration,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            cache_max_size: 150,
            cache_ttl: Duration::from_secs(3600),
            circuit_reset_window: Duration::from_secs(60),
            self_heal_interval: Duration::from_secs(300),
        }
    }
}

/// Webhook dispatcher settings backing `gateway_webhooks::DispatcherConfig`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WebhookSettings {
    /// Default per-attempt HTTP timeout for subscriptions that don't
    /// set their own.
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP front door settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind.
    pub bind_addr: String,
    /// Port to listen on.
    #[validate(range(min = 1))]
    pub port: u16,
    /// Grace period allowed for in-flight requests during shutdown.
    #[serde(with = "humantime_serde")]
    pub shutdown_grace_period: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_grace_period: Duration::from_secs(30),
        }
    }
}

/// Logging settings, consumed by `gateway_telemetry::logging::init`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `"info"` or
    /// `"gateway_routing=debug,info"`.
    pub level: String,
    /// Emit newline-delimited JSON instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// The gateway's full configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GatewayConfig {
    /// Sent as `User-Agent`/referer headers and in offline/driver text.
    pub product_name: String,
    /// Configured upstream providers. The Router appends the Offline
    /// provider automatically if none is present.
    pub providers: Vec<ProviderConfig>,
    /// Provider Router settings.
    #[validate(nested)]
    pub router: RouterSettings,
    /// Webhook Dispatcher settings.
    #[validate(nested)]
    pub webhooks: WebhookSettings,
    /// HTTP front door settings.
    #[validate(nested)]
    pub server: ServerSettings,
    /// Logging settings.
    #[validate(nested)]
    pub logging: LoggingSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            product_name: "gateway".to_string(),
            providers: Vec::new(),
            router: RouterSettings::default(),
            webhooks: WebhookSettings::default(),
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

fn parse_file(path: &Path, contents: &str) -> ConfigResult<GatewayConfig> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(toml::from_str(contents)?),
        Some("yaml" | "yml") => Ok(serde_yaml::from_str(contents)?),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn env_override<T: std::str::FromStr>(config: &mut T, name: &str) -> ConfigResult<()>
where
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *config = value
            .parse()
            .map_err(|e| ConfigError::InvalidEnvValue {
                name: name.to_string(),
                value: format!("{value} ({e})"),
            })?;
    }
    Ok(())
}

fn apply_env_overrides(config: &mut GatewayConfig) -> ConfigResult<()> {
    if let Ok(name) = std::env::var("GATEWAY_PRODUCT_NAME") {
        config.product_name = name;
    }
    env_override(&mut config.server.bind_addr, "GATEWAY_BIND_ADDR")?;
    env_override(&mut config.server.port, "GATEWAY_PORT")?;
    env_override(&mut config.router.cache_max_size, "GATEWAY_CACHE_MAX_SIZE")?;
    env_override(&mut config.logging.level, "GATEWAY_LOG_LEVEL")?;
    if let Ok(raw) = std::env::var("GATEWAY_CACHE_TTL_SECS") {
        let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidEnvValue {
            name: "GATEWAY_CACHE_TTL_SECS".to_string(),
            value: raw.clone(),
        })?;
        config.router.cache_ttl = Duration::from_secs(secs);
    }
    if let Ok(raw) = std::env::var("GATEWAY_LOG_JSON") {
        config.logging.json = matches!(raw.as_str(), "1" | "true" | "yes");
    }
    Ok(())
}

/// Load configuration: built-in defaults, overridden by `path` (if
/// given and the file exists), overridden again by `GATEWAY_*`
/// environment variables, then validated.
///
/// # Errors
/// Returns [`ConfigError`] if the file can't be read, its extension
/// isn't `.toml`/`.yaml`/`.yml`, it fails to parse, an environment
/// override fails to parse, or the resulting configuration fails
/// validation.
pub fn load_config(path: Option<&Path>) -> ConfigResult<GatewayConfig> {
    let mut config = match path {
        Some(path) if path.exists() => {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            parse_file(path, &contents)?
        }
        _ => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config)?;

    config
        .validate()
        .map_err(|e| ConfigError::Validation(e.to_string()))?;

    Ok(config)
}
