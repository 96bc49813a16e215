//! Results returned to callers of `Router::chat`/`Router::complete`.

use serde::{Deserialize, Serialize};

/// The outcome of a single chat completion, whether served live or from
/// the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    /// The assembled response text.
    pub content: String,
    /// Provider id that produced (or originally produced) the response.
    pub provider: String,
    /// Model name/hint used.
    pub model: String,
    /// Estimated tokens used (`estimate_tokens` over content).
    pub tokens_used: usize,
    /// Wall-clock latency of the attempt, in milliseconds. `0` for a
    /// cache hit per spec.md S1.
    pub latency_ms: u64,
    /// Whether this result was served from the response cache.
    pub from_cache: bool,
    /// Heuristic quality score in `0..=100`.
    pub quality_score: f64,
}

/// Aggregate counters surfaced by `Router::status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Number of configured providers, excluding Offline.
    pub provider_count: usize,
    /// Number of providers currently considered healthy.
    pub healthy_provider_count: usize,
    /// Cache hit rate in `0.0..=1.0`.
    pub cache_hit_rate: f64,
    /// Mean latency across recorded completions, in milliseconds.
    pub average_latency_ms: f64,
    /// Mean success rate across all tracked providers.
    pub success_rate: f64,
    /// Total chat requests served since construction.
    pub total_requests: u64,
}
