//! Error type for configuration loading and validation.

use thiserror::Error;

/// Errors raised while loading or validating [`crate::GatewayConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file's extension wasn't `.toml`/`.yaml`/`.yml`.
    #[error("unsupported config file extension: {0}")]
    UnsupportedFormat(String),

    /// The file parsed but failed schema validation.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// TOML parsing failed.
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parsing failed.
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An environment variable override had an unparsable value.
    #[error("invalid value for environment variable {name}: {value}")]
    InvalidEnvValue {
        /// Variable name.
        name: String,
        /// Raw value that failed to parse.
        value: String,
    },
}

/// Convenience alias.
pub type ConfigResult<T> = Result<T, ConfigError>;
