//! Subscriptions: who gets told about which events, and how delivery
//! to them should behave (spec.md §3 `Subscription`).

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use gateway_resilience::retry::{RetryConfig, RetryPolicy as BackoffPolicy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::event::Event;

/// Event-type filter value that admits every event type.
pub const WILDCARD_EVENT: &str = "*";

/// Per-subscription retry schedule, independent of a subscriber's HTTP
/// timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum delivery attempts beyond the first.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Delay ceiling; backoff never exceeds this.
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 1_000,
            max_delay_ms: 300_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Build the backoff calculator this policy describes, with the
    /// one-sided `[0, 0.1*delay)` jitter spec.md's retry schedule uses.
    #[must_use]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(RetryConfig {
            max_retries: self.max_retries,
            base_delay: std::time::Duration::from_millis(self.initial_delay_ms),
            max_delay: std::time::Duration::from_millis(self.max_delay_ms),
            multiplier: self.backoff_multiplier,
            jitter_factor: 0.1,
        })
    }
}

/// A registered webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Stable subscription id.
    pub id: String,
    /// Destination URL for delivery POSTs.
    pub url: String,
    /// Shared secret used to sign deliveries. Never serialized back out
    /// over the wire by `gateway-server`; kept here in plaintext since
    /// at-rest secret storage is out of scope (see SPEC_FULL.md Non-goals).
    pub secret: String,
    /// Event types this subscription wants. `WILDCARD_EVENT` admits all.
    pub events: HashSet<String>,
    /// When set, only events whose `integration_id` is in this set are
    /// delivered; `None` means no integration filtering.
    pub integration_filter: Option<HashSet<String>>,
    /// Whether deliveries are currently attempted at all.
    pub active: bool,
    /// Retry schedule for this subscription's deliveries.
    pub retry_policy: RetryPolicy,
    /// Extra headers sent with every delivery request.
    pub headers: Option<HashMap<String, String>>,
    /// Per-attempt HTTP timeout; falls back to the dispatcher default.
    pub timeout: Option<Duration>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Caller-supplied opaque metadata.
    pub metadata: Option<Value>,
}

impl Subscription {
    /// Whether `event` should be delivered to this subscription: it
    /// must be active, its type must be subscribed (directly or via
    /// wildcard), and it must pass the integration filter if one is set.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if !self.active {
            return false;
        }
        let type_matches =
            self.events.contains(WILDCARD_EVENT) || self.events.contains(&event.event_type);
        if !type_matches {
            return false;
        }
        match &self.integration_filter {
            None => true,
            Some(filter) => event
                .integration_id
                .as_ref()
                .is_some_and(|id| filter.contains(id)),
        }
    }
}

/// Inputs to `Dispatcher::register`.
#[derive(Debug, Clone)]
pub struct RegisterOptions {
    /// Destination URL.
    pub url: String,
    /// Event types to subscribe to.
    pub events: HashSet<String>,
    /// Optional integration allowlist.
    pub integration_filter: Option<HashSet<String>>,
    /// Signing secret; a random one is generated when omitted.
    pub secret: Option<String>,
    /// Retry schedule; defaults when omitted.
    pub retry_policy: Option<RetryPolicy>,
    /// Extra delivery headers.
    pub headers: Option<HashMap<String, String>>,
    /// Per-attempt timeout override.
    pub timeout: Option<Duration>,
    /// Opaque metadata to store alongside the subscription.
    pub metadata: Option<Value>,
}

impl RegisterOptions {
    /// Minimal options: a URL and an event-type set, everything else
    /// defaulted.
    #[must_use]
    pub fn new(url: impl Into<String>, events: HashSet<String>) -> Self {
        Self {
            url: url.into(),
            events,
            integration_filter: None,
            secret: None,
            retry_policy: None,
            headers: None,
            timeout: None,
            metadata: None,
        }
    }
}

/// Partial update applied by `Dispatcher::update`; `None` fields are
/// left unchanged.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    /// New destination URL.
    pub url: Option<String>,
    /// New event-type set.
    pub events: Option<HashSet<String>>,
    /// New integration filter (`Some(None)` clears an existing filter).
    pub integration_filter: Option<Option<HashSet<String>>>,
    /// New active flag.
    pub active: Option<bool>,
    /// New retry policy.
    pub retry_policy: Option<RetryPolicy>,
    /// New extra headers.
    pub headers: Option<Option<HashMap<String, String>>>,
    /// New per-attempt timeout.
    pub timeout: Option<Option<Duration>>,
    /// New metadata.
    pub metadata: Option<Option<Value>>,
}

/// Filter used by `Dispatcher::list` (spec.md §4.3:
/// `filter by {active, eventType, integrationId}`).
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    /// Only subscriptions watching this event type (directly or via
    /// wildcard).
    pub event_type: Option<String>,
    /// Only subscriptions with this active flag.
    pub active: Option<bool>,
    /// Only subscriptions whose `integration_filter` would admit this
    /// integration id (absent filter ⇒ matches all).
    pub integration_id: Option<String>,
}

impl SubscriptionFilter {
    fn matches(&self, sub: &Subscription) -> bool {
        if let Some(active) = self.active {
            if sub.active != active {
                return false;
            }
        }
        if let Some(event_type) = &self.event_type {
            if !(sub.events.contains(WILDCARD_EVENT) || sub.events.contains(event_type)) {
                return false;
            }
        }
        if let Some(integration_id) = &self.integration_id {
            if let Some(allowed) = &sub.integration_filter {
                if !allowed.contains(integration_id) {
                    return false;
                }
            }
        }
        true
    }
}

pub(crate) fn generate_subscription_id() -> String {
    format!("sub_{}", Uuid::new_v4())
}

pub(crate) fn filter_subscriptions<'a>(
    subs: impl Iterator<Item = Subscription> + 'a,
    filter: &'a SubscriptionFilter,
) -> impl Iterator<Item = Subscription> + 'a {
    subs.filter(move |s| filter.matches(s))
}
