//! Error type for the webhook dispatcher (spec.md §7).

use thiserror::Error;

/// Errors the dispatcher's management API can return. Delivery-attempt
/// failures are not represented here; they live on `Delivery::error`
/// since a failed attempt is an expected, recorded outcome rather than
/// an error to propagate.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No subscription exists with the given id.
    #[error("subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// No delivery exists with the given id.
    #[error("delivery not found: {0}")]
    DeliveryNotFound(String),

    /// The subscription URL failed validation (not http/https, or
    /// otherwise unparsable).
    #[error("invalid subscription url: {0}")]
    InvalidUrl(String),

    /// The requested event-type set was empty.
    #[error("subscription must include at least one event type")]
    NoEventTypes,

    /// A delivery was asked to retry or cancel, but isn't in a state
    /// where that is meaningful (e.g. already delivered).
    #[error("delivery {0} is not retryable in its current state")]
    NotRetryable(String),

    /// An internal invariant was violated.
    #[error("internal webhook dispatcher error: {0}")]
    Internal(String),
}

/// Convenience alias.
pub type DispatchResult<T> = Result<T, DispatchError>;

impl DispatchError {
    /// Build an [`DispatchError::Internal`] from any displayable error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
