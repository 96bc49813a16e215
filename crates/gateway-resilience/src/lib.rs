//! # Gateway Resilience
//!
//! Resilience primitives shared across the workspace:
//! - Exponential backoff with jitter, used by both the Router's
//!   per-attempt retry loop and the webhook Dispatcher's retry schedule.
//! - The in-memory response cache: exact and similarity lookups, LRU
//!   eviction, TTL expiry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod retry;

pub use cache::{dice_similarity, fingerprint_key, CacheStats, ResponseCache};
pub use retry::{RetryConfig, RetryPolicy, RetryPolicyBuilder};
