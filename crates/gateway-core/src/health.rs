//! Per-provider health tracking and the embedded circuit breaker.
//!
//! Grounded on the teacher's `circuit_breaker.rs` state-transition style
//! (atomic-friendly state, a single lock guarding any transition that
//! touches more than one field) but the state machine itself — three
//! consecutive successes to close, two to degrade, three to open — is
//! spec.md §3/§4.1's, not the teacher's generic failure-rate breaker.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Coarse health classification surfaced to callers and used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No outcome recorded yet.
    Unknown,
    /// Recent attempts have mostly succeeded.
    Healthy,
    /// At least two consecutive failures recorded.
    Degraded,
    /// At least three consecutive failures recorded; breaker is open.
    Unhealthy,
}

const LATENCY_CAPACITY: usize = 50;
const QUALITY_CAPACITY: usize = 20;
const SEED_QUALITY: f64 = 70.0;

struct HealthInner {
    status: HealthStatus,
    consecutive_failures: u32,
    consecutive_successes: u32,
    total_requests: u64,
    total_failures: u64,
    latencies_ms: VecDeque<u64>,
    qualities: VecDeque<f64>,
    circuit_open: bool,
    opened_at: Option<DateTime<Utc>>,
}

impl HealthInner {
    fn new() -> Self {
        Self {
            status: HealthStatus::Unknown,
            consecutive_failures: 0,
            consecutive_successes: 0,
            total_requests: 0,
            total_failures: 0,
            latencies_ms: VecDeque::with_capacity(LATENCY_CAPACITY),
            qualities: {
                let mut q = VecDeque::with_capacity(QUALITY_CAPACITY);
                q.push_back(SEED_QUALITY);
                q
            },
            circuit_open: false,
            opened_at: None,
        }
    }

    fn average_latency_ms(&self) -> f64 {
        if self.latencies_ms.is_empty() {
            return 0.0;
        }
        self.latencies_ms.iter().sum::<u64>() as f64 / self.latencies_ms.len() as f64
    }

    fn average_quality(&self) -> f64 {
        if self.qualities.is_empty() {
            return SEED_QUALITY;
        }
        self.qualities.iter().sum::<f64>() / self.qualities.len() as f64
    }

    fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 1.0;
        }
        (self.total_requests - self.total_failures) as f64 / self.total_requests as f64
    }
}

/// Mutable per-provider health record. Created once at startup per
/// provider and mutated only through [`Health::record_success`] /
/// [`Health::record_failure`]; all reads go through [`Health::snapshot`].
pub struct Health {
    provider_id: String,
    inner: Mutex<HealthInner>,
}

impl Health {
    /// Create a fresh, `unknown`-status health record.
    #[must_use]
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            inner: Mutex::new(HealthInner::new()),
        }
    }

    /// Record a successful completion. Three consecutive successes
    /// transitions `status` to `healthy` and closes the breaker; a lone
    /// success from `unknown` also transitions to `healthy`.
    pub fn record_success(&self, latency_ms: u64, quality: f64) {
        let mut inner = self.inner.lock();
        inner.total_requests += 1;
        inner.consecutive_failures = 0;
        inner.consecutive_successes += 1;

        push_bounded(&mut inner.latencies_ms, latency_ms, LATENCY_CAPACITY);
        push_bounded(&mut inner.qualities, quality, QUALITY_CAPACITY);

        if inner.consecutive_successes >= 3 {
            inner.status = HealthStatus::Healthy;
            inner.circuit_open = false;
            inner.opened_at = None;
        } else if inner.status == HealthStatus::Unknown {
            inner.status = HealthStatus::Healthy;
        }
    }

    /// Record a failed completion. Two consecutive failures degrades the
    /// provider; three opens the breaker and marks it unhealthy.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.total_requests += 1;
        inner.total_failures += 1;
        inner.consecutive_successes = 0;
        inner.consecutive_failures += 1;

        if inner.consecutive_failures >= 3 {
            inner.status = HealthStatus::Unhealthy;
            inner.circuit_open = true;
            inner.opened_at = Some(Utc::now());
        } else if inner.consecutive_failures >= 2 {
            inner.status = HealthStatus::Degraded;
        }
    }

    /// Whether the provider should be considered for selection: the
    /// breaker is closed, or it has been open longer than `reset_window`
    /// (admitting exactly one half-open attempt).
    #[must_use]
    pub fn is_available(&self, reset_window: Duration) -> bool {
        let inner = self.inner.lock();
        if !inner.circuit_open {
            return true;
        }
        match inner.opened_at {
            Some(opened_at) => {
                let elapsed = Utc::now().signed_duration_since(opened_at);
                elapsed
                    .to_std()
                    .map(|d| d > reset_window)
                    .unwrap_or(false)
            }
            None => true,
        }
    }

    /// Forcibly reset to `unknown`/closed, used by `SelfHeal` once a
    /// reachability probe of a previously unhealthy provider succeeds.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.circuit_open = false;
        inner.opened_at = None;
        inner.consecutive_failures = 0;
        inner.status = HealthStatus::Unknown;
    }

    /// Provider id this record belongs to.
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// `40*successRate + max(0, 30 - avgLatency/1000) + 30*(avgQuality/100)`,
    /// the score spec.md's selection algorithm sorts candidates by after
    /// priority.
    #[must_use]
    pub fn score(&self) -> f64 {
        let inner = self.inner.lock();
        let success_component = 40.0 * inner.success_rate();
        let latency_component = (30.0 - inner.average_latency_ms() / 1000.0).max(0.0);
        let quality_component = 30.0 * (inner.average_quality() / 100.0);
        success_component + latency_component + quality_component
    }

    /// Whether the breaker is currently tripped.
    #[must_use]
    pub fn circuit_open(&self) -> bool {
        self.inner.lock().circuit_open
    }

    /// Snapshot the record for reporting via `Router::provider_health`.
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        let inner = self.inner.lock();
        HealthSnapshot {
            provider_id: self.provider_id.clone(),
            status: inner.status,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            total_requests: inner.total_requests,
            total_failures: inner.total_failures,
            average_latency_ms: inner.average_latency_ms(),
            average_quality: inner.average_quality(),
            success_rate: inner.success_rate(),
            circuit_open: inner.circuit_open,
            opened_at: inner.opened_at,
        }
    }
}

fn push_bounded<T>(ring: &mut VecDeque<T>, value: T, capacity: usize) {
    if ring.len() >= capacity {
        ring.pop_front();
    }
    ring.push_back(value);
}

/// Point-in-time, read-only copy of a [`Health`] record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Provider this snapshot describes.
    pub provider_id: String,
    /// Coarse status.
    pub status: HealthStatus,
    /// Current consecutive-failure streak.
    pub consecutive_failures: u32,
    /// Current consecutive-success streak.
    pub consecutive_successes: u32,
    /// Lifetime request count.
    pub total_requests: u64,
    /// Lifetime failure count.
    pub total_failures: u64,
    /// Mean of the last 50 recorded latencies, in milliseconds.
    pub average_latency_ms: f64,
    /// Mean of the last 20 recorded quality scores.
    pub average_quality: f64,
    /// `(total_requests - total_failures) / total_requests`, or 1.0 if no
    /// requests have been recorded yet.
    pub success_rate: f64,
    /// Whether the breaker is currently tripped.
    pub circuit_open: bool,
    /// When the breaker was last tripped, if it is currently open.
    pub opened_at: Option<DateTime<Utc>>,
}
