//! Deliveries: the record of one event being sent to one subscription,
//! across however many attempts it takes (spec.md §3 `Delivery`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Event;

/// Lifecycle state of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Queued, no attempt made yet.
    Pending,
    /// A 2xx response was received.
    Delivered,
    /// Retries exhausted without a 2xx response.
    Failed,
    /// An attempt failed but a retry is scheduled.
    Retrying,
}

/// The HTTP outcome of the most recent attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResponse {
    /// HTTP status code received.
    pub status_code: u16,
    /// Wall-clock time the attempt took.
    pub duration_ms: u64,
}

/// One event's delivery history to one subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    /// Stable delivery id.
    pub id: String,
    /// Owning subscription.
    pub subscription_id: String,
    /// The event being delivered.
    pub event: Event,
    /// Current lifecycle state.
    pub status: DeliveryStatus,
    /// Attempts made so far (incremented before each HTTP send).
    pub attempts: u32,
    /// When the most recent attempt was made.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// When the next retry is scheduled, if any.
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Response from the most recent attempt, if one was made.
    pub response: Option<DeliveryResponse>,
    /// Error from the most recent attempt, if it failed before or
    /// without a response (connect failure, timeout, non-2xx).
    pub error: Option<String>,
}

impl Delivery {
    pub(crate) fn new(subscription_id: String, event: Event) -> Self {
        Self {
            id: format!("del_{}", Uuid::new_v4()),
            subscription_id,
            event,
            status: DeliveryStatus::Pending,
            attempts: 0,
            last_attempt_at: None,
            next_retry_at: None,
            response: None,
            error: None,
        }
    }
}

/// Filter used by `Dispatcher::purge_deliveries`.
#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    /// Only deliveries for this subscription.
    pub subscription_id: Option<String>,
    /// Only deliveries in this terminal/non-terminal state.
    pub status: Option<DeliveryStatus>,
    /// Only deliveries last attempted at or before this time.
    pub older_than: Option<DateTime<Utc>>,
}

impl DeliveryFilter {
    pub(crate) fn matches(&self, delivery: &Delivery) -> bool {
        if let Some(sub_id) = &self.subscription_id {
            if &delivery.subscription_id != sub_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if delivery.status != status {
                return false;
            }
        }
        if let Some(cutoff) = self.older_than {
            match delivery.last_attempt_at {
                Some(at) if at <= cutoff => {}
                _ => return false,
            }
        }
        true
    }
}
