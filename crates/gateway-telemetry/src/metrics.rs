//! Minimal `prometheus`-backed counters and histograms: one registry
//! shared by the Router, Cache, and Dispatcher so `gateway-server` can
//! expose them all under a single `/metrics` endpoint.

use prometheus::{HistogramVec, IntCounterVec, Opts, Registry};

/// Request/outcome counters and latency histograms for the gateway's
/// three subsystems.
pub struct Metrics {
    registry: Registry,
    /// Chat completions by provider id and outcome (`success`/`failure`).
    pub chat_requests: IntCounterVec,
    /// Chat completion latency in seconds, by provider id.
    pub chat_latency_seconds: HistogramVec,
    /// Response cache lookups by outcome (`hit`/`miss`/`similar`).
    pub cache_lookups: IntCounterVec,
    /// Webhook delivery attempts by outcome (`delivered`/`failed`/`retrying`).
    pub webhook_deliveries: IntCounterVec,
    /// Webhook delivery attempt latency in seconds.
    pub webhook_latency_seconds: HistogramVec,
}

impl Metrics {
    /// Build a fresh metrics set and register every collector into a
    /// new `Registry`.
    ///
    /// # Panics
    /// Panics if a collector with a duplicate name is registered, which
    /// can only happen if this constructor is called more than once
    /// against the same `Registry` — it always builds its own.
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::new();

        let chat_requests = IntCounterVec::new(
            Opts::new("gateway_chat_requests_total", "Chat completions by provider and outcome"),
            &["provider", "outcome"],
        )
        .expect("valid metric definition");
        let chat_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "gateway_chat_latency_seconds",
                "Chat completion latency by provider",
            ),
            &["provider"],
        )
        .expect("valid metric definition");
        let cache_lookups = IntCounterVec::new(
            Opts::new("gateway_cache_lookups_total", "Response cache lookups by outcome"),
            &["outcome"],
        )
        .expect("valid metric definition");
        let webhook_deliveries = IntCounterVec::new(
            Opts::new("gateway_webhook_deliveries_total", "Webhook delivery attempts by outcome"),
            &["outcome"],
        )
        .expect("valid metric definition");
        let webhook_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "gateway_webhook_latency_seconds",
                "Webhook delivery attempt latency",
            ),
            &[],
        )
        .expect("valid metric definition");

        for collector in [
            Box::new(chat_requests.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(chat_latency_seconds.clone()),
            Box::new(cache_lookups.clone()),
            Box::new(webhook_deliveries.clone()),
            Box::new(webhook_latency_seconds.clone()),
        ] {
            registry
                .register(collector)
                .expect("no duplicate collector names");
        }

        Self {
            registry,
            chat_requests,
            chat_latency_seconds,
            cache_lookups,
            webhook_deliveries,
            webhook_latency_seconds,
        }
    }

    /// Render every registered collector in the Prometheus text
    /// exposition format.
    #[must_use]
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .expect("text encoding never fails for well-formed metrics");
        String::from_utf8(buffer).expect("prometheus text encoding is always valid UTF-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
