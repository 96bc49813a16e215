//! The cache entry domain type. Cache *logic* (eviction, TTL, similarity)
//! lives in `gateway_resilience::cache::ResponseCache`; this crate only
//! owns the record shape so both the Router and the cache implementation
//! can share it without a circular dependency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A previously produced completion, stored keyed by request fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Fingerprint key this entry is stored under.
    pub key: String,
    /// The cached response text.
    pub content: String,
    /// Provider id that produced the response.
    pub provider: String,
    /// Model name/hint used to produce the response.
    pub model: String,
    /// When this entry was inserted.
    pub stored_at: DateTime<Utc>,
    /// Quality score of the cached response.
    pub quality: f64,
    /// Number of times this entry has been read (seeded at 1 on insert).
    pub access_count: u64,
    /// Most recent read (or insert) time; the LRU eviction key.
    pub last_accessed_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Construct a freshly-inserted entry: `access_count` starts at 1 and
    /// `last_accessed_at` equals `stored_at`.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        content: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        quality: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            content: content.into(),
            provider: provider.into(),
            model: model.into(),
            stored_at: now,
            quality,
            access_count: 1,
            last_accessed_at: now,
        }
    }
}
