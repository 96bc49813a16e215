//! Per-subscription delivery statistics, tracked the way
//! `gateway_core::Health` tracks provider health: a small mutex-guarded
//! running aggregate rather than a replayable log.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
struct Inner {
    total: u64,
    successful: u64,
    failed: u64,
    total_latency_ms: u64,
    last_delivery_at: Option<DateTime<Utc>>,
    last_success_at: Option<DateTime<Utc>>,
    last_failure_at: Option<DateTime<Utc>>,
}

/// Running delivery statistics for one subscription.
#[derive(Debug, Default)]
pub struct SubscriptionStats {
    inner: Mutex<Inner>,
}

/// Point-in-time read of [`SubscriptionStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionStatsSnapshot {
    /// Total attempts recorded, successful or not.
    pub total: u64,
    /// Attempts that received a 2xx response.
    pub successful: u64,
    /// Attempts that did not.
    pub failed: u64,
    /// Mean attempt latency across all attempts.
    pub average_latency_ms: f64,
    /// Timestamp of the most recent attempt.
    pub last_delivery_at: Option<DateTime<Utc>>,
    /// Timestamp of the most recent successful attempt.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Timestamp of the most recent failed attempt.
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl SubscriptionStats {
    /// A fresh, empty counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one delivery attempt's outcome.
    pub fn record(&self, success: bool, latency_ms: u64) {
        let mut inner = self.inner.lock();
        let now = Utc::now();
        inner.total += 1;
        inner.total_latency_ms = inner.total_latency_ms.saturating_add(latency_ms);
        inner.last_delivery_at = Some(now);
        if success {
            inner.successful += 1;
            inner.last_success_at = Some(now);
        } else {
            inner.failed += 1;
            inner.last_failure_at = Some(now);
        }
    }

    /// Snapshot the current counters.
    #[must_use]
    pub fn snapshot(&self) -> SubscriptionStatsSnapshot {
        let inner = self.inner.lock();
        let average_latency_ms = if inner.total == 0 {
            0.0
        } else {
            inner.total_latency_ms as f64 / inner.total as f64
        };
        SubscriptionStatsSnapshot {
            total: inner.total,
            successful: inner.successful,
            failed: inner.failed,
            average_latency_ms,
            last_delivery_at: inner.last_delivery_at,
            last_success_at: inner.last_success_at,
            last_failure_at: inner.last_failure_at,
        }
    }
}

/// Fleet-wide statistics across every subscription, returned by
/// `Dispatcher::aggregate_stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Number of subscriptions registered.
    pub total_subscriptions: usize,
    /// Number of subscriptions with `active == true`.
    pub active_subscriptions: usize,
    /// Total delivery attempts across every subscription.
    pub total_deliveries: u64,
    /// Fraction of attempts that received a 2xx response, `0.0` when
    /// there have been no attempts yet.
    pub success_rate: f64,
    /// Mean attempt latency across every subscription.
    pub average_latency_ms: f64,
    /// Retry timers currently scheduled.
    pub pending_retries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_running_counts_and_mean_latency() {
        let stats = SubscriptionStats::new();
        stats.record(true, 100);
        stats.record(false, 300);
        let snap = stats.snapshot();
        assert_eq!(snap.total, 2);
        assert_eq!(snap.successful, 1);
        assert_eq!(snap.failed, 1);
        assert!((snap.average_latency_ms - 200.0).abs() < f64::EPSILON);
        assert!(snap.last_success_at.is_some());
        assert!(snap.last_failure_at.is_some());
    }

    #[test]
    fn a_fresh_counter_set_reports_zero_average_latency() {
        let stats = SubscriptionStats::new();
        assert_eq!(stats.snapshot().average_latency_ms, 0.0);
    }
}
