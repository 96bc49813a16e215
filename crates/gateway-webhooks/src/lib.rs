//! # Gateway Webhooks
//!
//! The Webhook Dispatcher (spec.md §4.3): signed, at-least-once event
//! delivery with exponential-backoff retries, per-subscription event
//! and integration filtering, and per-subscription statistics.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod signing;
pub mod stats;
pub mod subscription;

pub use delivery::{Delivery, DeliveryFilter, DeliveryResponse, DeliveryStatus};
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{DispatchError, DispatchResult};
pub use event::Event;
pub use signing::{current_timestamp_millis, generate_signature, verify_signature, DEFAULT_TOLERANCE_SECONDS};
pub use stats::{AggregateStats, SubscriptionStats, SubscriptionStatsSnapshot};
pub use subscription::{
    RegisterOptions, RetryPolicy, Subscription, SubscriptionFilter, SubscriptionUpdate,
    WILDCARD_EVENT,
};
