//! # Gateway Config
//!
//! Typed, validated configuration for the inference gateway: built-in
//! defaults, an optional TOML/YAML file, `GATEWAY_*` environment
//! overrides, and an optional filesystem-watch hot-reload.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credential;
pub mod error;
pub mod watch;

pub use config::{
    load_config, GatewayConfig, LoggingSettings, RouterSettings, ServerSettings, WebhookSettings,
};
pub use credential::EnvCredentialProvider;
pub use error::{ConfigError, ConfigResult};
pub use watch::watch_config;
