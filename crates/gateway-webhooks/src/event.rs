//! Events: the payload `Dispatcher::dispatch` fans out to matching
//! subscriptions (spec.md §3 `Event`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single occurrence fanned out to every matching subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Stable event id.
    pub id: String,
    /// The event type string; `Subscription::events` matches against
    /// this, or admits it via the `*` wildcard.
    #[serde(rename = "type")]
    pub event_type: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Originating integration, if any; used by `integration_filter`.
    pub integration_id: Option<String>,
    /// Human-readable integration name, if any.
    pub integration_name: Option<String>,
    /// Originating user, if any.
    pub user_id: Option<String>,
    /// Arbitrary event payload.
    pub data: Value,
}

impl Event {
    /// Construct a new event, stamping `id` and `timestamp`.
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        data: Value,
        integration_id: Option<String>,
        integration_name: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            id: format!("evt_{}", Uuid::new_v4()),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            integration_id,
            integration_name,
            user_id,
            data,
        }
    }
}
