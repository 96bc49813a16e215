//! Gateway error type.
//!
//! One enum, one variant per failure kind named in the specification
//! (`CredentialMissing`, `Unreachable`, `BadStatus`, `BadResponse`,
//! `Cancelled`, `DriverTimeout`), plus the ambient `Internal`/`Config`
//! variants every crate in this workspace carries.

use std::time::Duration;

/// Result type alias used throughout the gateway.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Errors produced while selecting, probing, or streaming from a provider.
#[derive(Debug, thiserror::Error, Clone)]
pub enum GatewayError {
    /// The provider requires a credential and none was available.
    #[error("missing credential for provider {0}")]
    CredentialMissing(String),

    /// DNS, connect, or transport-level failure reaching the provider.
    #[error("provider {provider} unreachable: {message}")]
    Unreachable {
        /// Provider id.
        provider: String,
        /// Underlying transport error text.
        message: String,
    },

    /// The provider responded with a non-success HTTP status.
    #[error("provider {provider} returned status {code}")]
    BadStatus {
        /// Provider id.
        provider: String,
        /// HTTP status code.
        code: u16,
    },

    /// The response body was malformed or matched a known sentinel of
    /// failure (e.g. an HTML error page returned by a text endpoint).
    #[error("provider {provider} returned a malformed response: {message}")]
    BadResponse {
        /// Provider id.
        provider: String,
        /// Description of what was wrong with the body.
        message: String,
    },

    /// The caller cancelled the in-flight request.
    #[error("request cancelled")]
    Cancelled,

    /// The provider did not respond within its configured timeout.
    #[error("provider {provider} timed out after {timeout:?}")]
    DriverTimeout {
        /// Provider id.
        provider: String,
        /// Configured timeout that elapsed.
        timeout: Duration,
    },

    /// No provider candidates were available (all excluded, breakers
    /// open, or missing credentials) and no Offline provider is
    /// configured to fall through to.
    #[error("no provider candidates available")]
    NoProvidersAvailable,

    /// Configuration was invalid or incomplete.
    #[error("configuration error: {0}")]
    Config(String),

    /// Catch-all for invariants that should be unreachable in practice.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Construct an [`GatewayError::Unreachable`].
    #[must_use]
    pub fn unreachable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Construct a [`GatewayError::BadStatus`].
    #[must_use]
    pub fn bad_status(provider: impl Into<String>, code: u16) -> Self {
        Self::BadStatus {
            provider: provider.into(),
            code,
        }
    }

    /// Construct a [`GatewayError::BadResponse`].
    #[must_use]
    pub fn bad_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Construct a [`GatewayError::DriverTimeout`].
    #[must_use]
    pub fn driver_timeout(provider: impl Into<String>, timeout: Duration) -> Self {
        Self::DriverTimeout {
            provider: provider.into(),
            timeout,
        }
    }

    /// Construct an [`GatewayError::Internal`].
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Construct a [`GatewayError::Config`].
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error should count as a provider failure for the
    /// purposes of `Health::record_failure` and the circuit breaker.
    /// `Cancelled` is deliberately excluded per spec.md §7: cancellation
    /// is not a provider failure.
    #[must_use]
    pub fn counts_as_failure(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Whether this is a cancellation, which short-circuits the Router's
    /// attempt loop instead of falling through to the next provider.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
