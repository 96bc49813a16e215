//! The dispatch engine: fans events out to matching subscriptions,
//! signs and sends each delivery, and retries failed attempts on an
//! exponential backoff schedule until the subscription's retry budget
//! is exhausted (spec.md §4.3).

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use gateway_security::crypto::generate_token;
use reqwest::StatusCode;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::delivery::{Delivery, DeliveryFilter, DeliveryResponse, DeliveryStatus};
use crate::error::{DispatchError, DispatchResult};
use crate::event::Event;
use crate::signing::{current_timestamp_millis, generate_signature};
use crate::stats::{AggregateStats, SubscriptionStats, SubscriptionStatsSnapshot};
use crate::subscription::{
    filter_subscriptions, generate_subscription_id, RegisterOptions, Subscription,
    SubscriptionFilter, SubscriptionUpdate,
};

/// Secret length (raw bytes, hex-rendered) generated when a caller
/// registers a subscription without supplying one.
const GENERATED_SECRET_BYTES: usize = 32;

/// Dispatcher-wide defaults; per-subscription fields override these.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// HTTP timeout applied when a subscription doesn't set its own.
    pub default_timeout: Duration,
    /// Sent as `User-Agent` on every delivery request.
    pub product_name: String,
}

impl DispatcherConfig {
    /// Default config: a 30s timeout (spec.md §4.3) under the given
    /// product name.
    #[must_use]
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            product_name: product_name.into(),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new("gateway")
    }
}

struct Shared {
    subscriptions: DashMap<String, Subscription>,
    deliveries: DashMap<String, Delivery>,
    stats: DashMap<String, SubscriptionStats>,
    pending_retries: DashMap<String, JoinHandle<()>>,
    http: reqwest::Client,
    config: DispatcherConfig,
}

/// Signed, at-least-once webhook delivery engine. Cheap to clone: every
/// clone shares the same subscription/delivery state and background
/// retry timers.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Shared>,
}

impl Dispatcher {
    /// Build a dispatcher with the given configuration and a dedicated
    /// HTTP client.
    #[must_use]
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            inner: Arc::new(Shared {
                subscriptions: DashMap::new(),
                deliveries: DashMap::new(),
                stats: DashMap::new(),
                pending_retries: DashMap::new(),
                http: reqwest::Client::new(),
                config,
            }),
        }
    }

    /// Register a new subscription.
    ///
    /// # Errors
    /// Returns [`DispatchError::NoEventTypes`] if `opts.events` is empty,
    /// or [`DispatchError::InvalidUrl`] if the URL doesn't parse as
    /// `http(s)`.
    pub fn register(&self, opts: RegisterOptions) -> DispatchResult<Subscription> {
        if opts.events.is_empty() {
            return Err(DispatchError::NoEventTypes);
        }
        validate_url(&opts.url)?;
        let secret = opts
            .secret
            .unwrap_or_else(|| generate_token(GENERATED_SECRET_BYTES));
        let subscription = Subscription {
            id: generate_subscription_id(),
            url: opts.url,
            secret,
            events: opts.events,
            integration_filter: opts.integration_filter,
            active: true,
            retry_policy: opts.retry_policy.unwrap_or_default(),
            headers: opts.headers,
            timeout: opts.timeout,
            created_at: Utc::now(),
            metadata: opts.metadata,
        };
        self.inner
            .stats
            .insert(subscription.id.clone(), SubscriptionStats::new());
        self.inner
            .subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        Ok(subscription)
    }

    /// Apply a partial update to an existing subscription.
    ///
    /// # Errors
    /// Returns [`DispatchError::SubscriptionNotFound`] if `id` doesn't
    /// exist, or [`DispatchError::InvalidUrl`]/[`DispatchError::NoEventTypes`]
    /// if the update would leave it invalid.
    pub fn update(&self, id: &str, update: SubscriptionUpdate) -> DispatchResult<Subscription> {
        let mut entry = self
            .inner
            .subscriptions
            .get_mut(id)
            .ok_or_else(|| DispatchError::SubscriptionNotFound(id.to_string()))?;
        if let Some(url) = update.url {
            validate_url(&url)?;
            entry.url = url;
        }
        if let Some(events) = update.events {
            if events.is_empty() {
                return Err(DispatchError::NoEventTypes);
            }
            entry.events = events;
        }
        if let Some(filter) = update.integration_filter {
            entry.integration_filter = filter;
        }
        if let Some(active) = update.active {
            entry.active = active;
        }
        if let Some(retry_policy) = update.retry_policy {
            entry.retry_policy = retry_policy;
        }
        if let Some(headers) = update.headers {
            entry.headers = headers;
        }
        if let Some(timeout) = update.timeout {
            entry.timeout = timeout;
        }
        if let Some(metadata) = update.metadata {
            entry.metadata = metadata;
        }
        Ok(entry.clone())
    }

    /// Delete a subscription, cancelling any retry timers for its
    /// pending deliveries. Returns `false` if `id` was unknown.
    pub fn delete(&self, id: &str) -> bool {
        let Some((_, _)) = self.inner.subscriptions.remove(id) else {
            return false;
        };
        self.inner.stats.remove(id);
        let pending: Vec<String> = self
            .inner
            .deliveries
            .iter()
            .filter(|d| d.subscription_id == id)
            .map(|d| d.id.clone())
            .collect();
        for delivery_id in pending {
            if let Some((_, handle)) = self.inner.pending_retries.remove(&delivery_id) {
                handle.abort();
            }
        }
        true
    }

    /// Replace a subscription's signing secret with a freshly generated
    /// one, returning the new value. Returns `None` if `id` is unknown.
    pub fn rotate_secret(&self, id: &str) -> Option<String> {
        let mut entry = self.inner.subscriptions.get_mut(id)?;
        let secret = generate_token(GENERATED_SECRET_BYTES);
        entry.secret.clone_from(&secret);
        Some(secret)
    }

    /// List subscriptions matching `filter`.
    #[must_use]
    pub fn list(&self, filter: &SubscriptionFilter) -> Vec<Subscription> {
        let all = self
            .inner
            .subscriptions
            .iter()
            .map(|e| e.value().clone());
        filter_subscriptions(all, filter).collect()
    }

    /// Look up one subscription by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Subscription> {
        self.inner.subscriptions.get(id).map(|e| e.clone())
    }

    /// Fan `event` out to every matching, active subscription. Each
    /// delivery runs as an independent background task; `dispatch`
    /// itself returns the queued delivery ids without waiting on any
    /// of them.
    pub fn dispatch(&self, event: Event) -> Vec<String> {
        let matching: Vec<Subscription> = self
            .inner
            .subscriptions
            .iter()
            .map(|e| e.value().clone())
            .filter(|sub| sub.matches(&event))
            .collect();

        let mut delivery_ids = Vec::with_capacity(matching.len());
        for subscription in matching {
            let delivery = Delivery::new(subscription.id.clone(), event.clone());
            let delivery_id = delivery.id.clone();
            self.inner
                .deliveries
                .insert(delivery_id.clone(), delivery);
            delivery_ids.push(delivery_id.clone());

            let dispatcher = self.clone();
            tokio::spawn(async move {
                dispatcher.run_delivery(subscription, delivery_id).await;
            });
        }
        delivery_ids
    }

    /// Send a one-off delivery outside the normal retry-tracked flow,
    /// for subscribers to validate their endpoint. Never retried, and
    /// not recorded in `stats`.
    ///
    /// # Errors
    /// Returns [`DispatchError::SubscriptionNotFound`] if `id` is
    /// unknown.
    pub async fn test_delivery(&self, id: &str) -> DispatchResult<DeliveryResponse> {
        let subscription = self
            .get(id)
            .ok_or_else(|| DispatchError::SubscriptionNotFound(id.to_string()))?;
        let event = Event::new(
            "webhook.test",
            serde_json::json!({ "message": "this is a test delivery" }),
            None,
            None,
            None,
        );
        self.send_once(&subscription, &event)
            .await
            .map(|(response, _error)| response)
            .ok_or_else(|| DispatchError::internal("test delivery produced no response"))
    }

    /// Force an immediate retry of a delivery that is `Failed` or
    /// `Retrying`, resetting its attempt counter.
    ///
    /// # Errors
    /// Returns [`DispatchError::DeliveryNotFound`] if `id` is unknown,
    /// or [`DispatchError::NotRetryable`] if it is `Delivered`.
    pub fn retry_delivery(&self, id: &str) -> DispatchResult<()> {
        let subscription = {
            let mut delivery = self
                .inner
                .deliveries
                .get_mut(id)
                .ok_or_else(|| DispatchError::DeliveryNotFound(id.to_string()))?;
            if delivery.status == DeliveryStatus::Delivered {
                return Err(DispatchError::NotRetryable(id.to_string()));
            }
            delivery.attempts = 0;
            delivery.next_retry_at = None;
            self.inner
                .subscriptions
                .get(&delivery.subscription_id)
                .map(|e| e.clone())
                .ok_or_else(|| DispatchError::SubscriptionNotFound(delivery.subscription_id.clone()))?
        };
        if let Some((_, handle)) = self.inner.pending_retries.remove(id) {
            handle.abort();
        }
        let dispatcher = self.clone();
        let delivery_id = id.to_string();
        tokio::spawn(async move {
            dispatcher.run_delivery(subscription, delivery_id).await;
        });
        Ok(())
    }

    /// Cancel a pending retry timer, marking the delivery `Failed`
    /// with `error = "Retry cancelled"`.
    ///
    /// # Errors
    /// Returns [`DispatchError::DeliveryNotFound`] if `id` is unknown.
    pub fn cancel_retry(&self, id: &str) -> DispatchResult<()> {
        let mut delivery = self
            .inner
            .deliveries
            .get_mut(id)
            .ok_or_else(|| DispatchError::DeliveryNotFound(id.to_string()))?;
        if let Some((_, handle)) = self.inner.pending_retries.remove(id) {
            handle.abort();
        }
        delivery.status = DeliveryStatus::Failed;
        delivery.next_retry_at = None;
        delivery.error = Some("Retry cancelled".to_string());
        Ok(())
    }

    /// Remove deliveries matching `filter` from the in-memory history.
    /// Returns the number removed.
    pub fn purge_deliveries(&self, filter: &DeliveryFilter) -> usize {
        let ids: Vec<String> = self
            .inner
            .deliveries
            .iter()
            .filter(|d| filter.matches(d.value()))
            .map(|d| d.id.clone())
            .collect();
        for id in &ids {
            self.inner.deliveries.remove(id);
            if let Some((_, handle)) = self.inner.pending_retries.remove(id) {
                handle.abort();
            }
        }
        ids.len()
    }

    /// Look up a delivery by id.
    #[must_use]
    pub fn get_delivery(&self, id: &str) -> Option<Delivery> {
        self.inner.deliveries.get(id).map(|e| e.clone())
    }

    /// Delivery statistics for one subscription.
    #[must_use]
    pub fn stats(&self, id: &str) -> Option<SubscriptionStatsSnapshot> {
        self.inner.stats.get(id).map(|s| s.snapshot())
    }

    /// Fleet-wide statistics across every subscription.
    #[must_use]
    pub fn aggregate_stats(&self) -> AggregateStats {
        let total_subscriptions = self.inner.subscriptions.len();
        let active_subscriptions = self
            .inner
            .subscriptions
            .iter()
            .filter(|e| e.active)
            .count();
        let mut total_deliveries = 0u64;
        let mut total_successful = 0u64;
        let mut weighted_latency = 0.0f64;
        for entry in &self.inner.stats {
            let snap = entry.value().snapshot();
            total_deliveries += snap.total;
            total_successful += snap.successful;
            weighted_latency += snap.average_latency_ms * snap.total as f64;
        }
        let success_rate = if total_deliveries == 0 {
            0.0
        } else {
            total_successful as f64 / total_deliveries as f64
        };
        let average_latency_ms = if total_deliveries == 0 {
            0.0
        } else {
            weighted_latency / total_deliveries as f64
        };
        AggregateStats {
            total_subscriptions,
            active_subscriptions,
            total_deliveries,
            success_rate,
            average_latency_ms,
            pending_retries: self.inner.pending_retries.len(),
        }
    }

    /// Drive one delivery through attempts and, on failure, scheduled
    /// retries, until it is `Delivered` or its retry budget is spent.
    async fn run_delivery(&self, subscription: Subscription, delivery_id: String) {
        let Some(event) = self.inner.deliveries.get(&delivery_id).map(|d| d.event.clone()) else {
            return;
        };

        match self.inner.deliveries.get_mut(&delivery_id) {
            Some(mut delivery) => delivery.attempts += 1,
            None => return,
        }

        let (response, error) = match self.send_once(&subscription, &event).await {
            Some((response, error)) => (Some(response), error),
            None => (None, Some("request did not complete".to_string())),
        };
        let success = response
            .as_ref()
            .is_some_and(|r| (200..300).contains(&r.status_code));
        let latency_ms = response.as_ref().map_or(0, |r| r.duration_ms);

        if let Some(stats) = self.inner.stats.get(&subscription.id) {
            stats.record(success, latency_ms);
        }

        let Some(mut delivery) = self.inner.deliveries.get_mut(&delivery_id) else {
            return;
        };
        delivery.last_attempt_at = Some(Utc::now());
        delivery.response = response;
        delivery.error = error.clone();

        if success {
            delivery.status = DeliveryStatus::Delivered;
            delivery.next_retry_at = None;
            self.inner.pending_retries.remove(&delivery_id);
            debug!(subscription_id = %subscription.id, %delivery_id, "webhook delivered");
            return;
        }

        if !subscription
            .retry_policy
            .backoff()
            .should_retry(delivery.attempts)
        {
            delivery.status = DeliveryStatus::Failed;
            delivery.next_retry_at = None;
            self.inner.pending_retries.remove(&delivery_id);
            warn!(subscription_id = %subscription.id, %delivery_id, "webhook delivery exhausted retries");
            return;
        }

        let delay = subscription
            .retry_policy
            .backoff()
            .delay_for_attempt(delivery.attempts - 1);
        delivery.status = DeliveryStatus::Retrying;
        delivery.next_retry_at =
            Some(Utc::now() + chrono::Duration::milliseconds(delay.as_millis() as i64));
        drop(delivery);

        let dispatcher = self.clone();
        let sub_for_retry = subscription.clone();
        let retry_delivery_id = delivery_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            dispatcher
                .continue_after_sleep(sub_for_retry, retry_delivery_id)
                .await;
        });
        self.inner.pending_retries.insert(delivery_id, handle);
    }

    /// Re-entry point for a scheduled retry: removes its own timer
    /// handle (it already fired) and resumes the attempt loop.
    async fn continue_after_sleep(&self, subscription: Subscription, delivery_id: String) {
        self.inner.pending_retries.remove(&delivery_id);
        if self.inner.deliveries.get(&delivery_id).is_none() {
            return;
        }
        self.run_delivery(subscription, delivery_id).await;
    }

    /// Sign and send one HTTP attempt, returning its status/latency and
    /// an error description when the attempt didn't produce a usable
    /// response at all (connect failure, timeout).
    async fn send_once(
        &self,
        subscription: &Subscription,
        event: &Event,
    ) -> Option<(DeliveryResponse, Option<String>)> {
        let body = serde_json::to_string(event).ok()?;
        let ts = current_timestamp_millis();
        let signature = generate_signature(&body, &subscription.secret, ts);
        let timeout = subscription.timeout.unwrap_or(self.inner.config.default_timeout);

        let mut request = self
            .inner
            .http
            .post(&subscription.url)
            .timeout(timeout)
            .header("Content-Type", "application/json")
            .header("X-Webhook-Id", subscription.id.as_str())
            .header("X-Webhook-Signature", signature)
            .header("X-Webhook-Timestamp", ts.to_string())
            .header("X-Event-Type", event.event_type.as_str())
            .header("User-Agent", self.inner.config.product_name.as_str())
            .body(body);

        if let Some(extra_headers) = &subscription.headers {
            for (key, value) in extra_headers {
                request = request.header(key, value);
            }
        }

        let started = Instant::now();
        match request.send().await {
            Ok(response) => {
                let status_code = response.status().as_u16();
                let duration_ms = started.elapsed().as_millis() as u64;
                let error = if StatusCode::from_u16(status_code)
                    .is_ok_and(|s| (200..300).contains(&s.as_u16()))
                {
                    None
                } else {
                    Some(format!("endpoint returned status {status_code}"))
                };
                Some((
                    DeliveryResponse {
                        status_code,
                        duration_ms,
                    },
                    error,
                ))
            }
            Err(err) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                Some((
                    DeliveryResponse {
                        status_code: 0,
                        duration_ms,
                    },
                    Some(err.to_string()),
                ))
            }
        }
    }
}

fn validate_url(url: &str) -> DispatchResult<()> {
    let parsed = url::Url::parse(url).map_err(|e| DispatchError::InvalidUrl(e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(DispatchError::InvalidUrl(format!(
            "unsupported scheme: {}",
            parsed.scheme()
        )));
    }
    Ok(())
}
