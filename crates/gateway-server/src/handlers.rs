//! HTTP request handlers for the gateway API: OpenAI-compatible chat
//! completions backed by the Provider Router, and the admin surface for
//! Router introspection and Webhook Dispatcher management.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event as SseEvent, Sse},
        IntoResponse, Response,
    },
    Json,
};
use gateway_core::{CompletionResult, GatewayError, HealthSnapshot, Message, SystemStatus};
use gateway_routing::ChatCallbacks;
use gateway_webhooks::{
    DeliveryFilter, DeliveryStatus, Event as WebhookEvent, RegisterOptions, Subscription,
    SubscriptionFilter, SubscriptionUpdate,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

// =============================================================================
// Health / metrics
// =============================================================================

/// `GET /health`, `/healthz` — shallow liveness-style check.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = state
        .health()
        .check_deep(vec![])
        .await;
    let status = if response.status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// `GET /ready`, `/readyz` — ready once at least one provider (possibly
/// just Offline) is configured and startup has completed.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let snapshots = state.router().provider_health();
    let healthy = snapshots
        .iter()
        .filter(|s| s.status == gateway_core::HealthStatus::Healthy)
        .count();
    let response = state
        .health()
        .check_readiness(snapshots.len(), healthy)
        .await;
    let status = if response.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// `GET /live`, `/livez` — process is up and not draining for shutdown.
pub async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.health().check_liveness())
}

/// `GET /metrics` — Prometheus text exposition format.
pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let rendered = state.metrics().gather();
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], rendered)
}

// =============================================================================
// OpenAI-compatible chat completions
// =============================================================================

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model hint; informational only, the Router ignores it and
    /// selects a provider by priority/health/score.
    #[serde(default)]
    pub model: Option<String>,
    /// Conversation history.
    pub messages: Vec<Message>,
    /// Whether to stream tokens back as server-sent events.
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ChatMessageOut {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatChoice {
    index: u32,
    message: ChatMessageOut,
    finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

/// Response body for a non-streaming chat completion.
#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    id: String,
    object: &'static str,
    model: String,
    provider: String,
    choices: Vec<ChatChoice>,
    usage: ChatUsage,
    from_cache: bool,
    quality_score: f64,
    latency_ms: u64,
}

impl ChatCompletionResponse {
    fn from_result(requested_model: &str, result: CompletionResult) -> Self {
        let model = if result.model.is_empty() {
            requested_model.to_string()
        } else {
            result.model.clone()
        };
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4()),
            object: "chat.completion",
            usage: ChatUsage {
                prompt_tokens: 0,
                completion_tokens: result.tokens_used,
                total_tokens: result.tokens_used,
            },
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessageOut {
                    role: "assistant",
                    content: result.content,
                },
                finish_reason: "stop",
            }],
            from_cache: result.from_cache,
            quality_score: result.quality_score,
            latency_ms: result.latency_ms,
            provider: result.provider,
            model,
        }
    }
}

enum StreamSignal {
    Token(String),
    Complete(Option<CompletionResult>),
    Error(GatewayError),
}

struct StreamCallbacks {
    tx: tokio::sync::mpsc::UnboundedSender<StreamSignal>,
}

impl ChatCallbacks for StreamCallbacks {
    fn on_token(&mut self, token: &str) {
        let _ = self.tx.send(StreamSignal::Token(token.to_string()));
    }

    fn on_complete(&mut self, result: Option<CompletionResult>) {
        let _ = self.tx.send(StreamSignal::Complete(result));
    }

    fn on_error(&mut self, error: GatewayError) {
        let _ = self.tx.send(StreamSignal::Error(error));
    }
}

fn sse_chunk(id: &str, model: &str, content: Option<&str>, finish_reason: Option<&str>) -> String {
    serde_json::json!({
        "id": id,
        "object": "chat.completion.chunk",
        "model": model,
        "choices": [{
            "index": 0,
            "delta": content.map_or_else(|| serde_json::json!({}), |c| serde_json::json!({"content": c})),
            "finish_reason": finish_reason,
        }],
    })
    .to_string()
}

/// `POST /v1/chat/completions` — stream or collect a completion from
/// the Provider Router, falling through providers and ultimately to
/// Offline so this endpoint always produces a response (spec.md §8
/// property 1).
#[instrument(skip(state, request), fields(streaming = request.stream.unwrap_or(false)))]
pub async fn chat_completion(
    State(state): State<AppState>,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    if request.messages.is_empty() {
        return Err(ApiError::BadRequest(
            "messages must not be empty".to_string(),
        ));
    }

    let model = request.model.clone().unwrap_or_else(|| "gateway".to_string());

    if request.stream.unwrap_or(false) {
        return Ok(stream_chat_completion(state, request.messages, model).await);
    }

    let started = Instant::now();
    match state.router().complete(request.messages).await {
        Ok(result) => {
            state
                .metrics()
                .chat_requests
                .with_label_values(&[result.provider.as_str(), "success"])
                .inc();
            state
                .metrics()
                .chat_latency_seconds
                .with_label_values(&[result.provider.as_str()])
                .observe(started.elapsed().as_secs_f64());
            info!(provider = %result.provider, from_cache = result.from_cache, "chat completion served");
            Ok(Json(ChatCompletionResponse::from_result(&model, result)).into_response())
        }
        Err(err) => {
            state
                .metrics()
                .chat_requests
                .with_label_values(&["none", "failure"])
                .inc();
            error!(error = %err, "chat completion failed on every provider");
            Err(ApiError::from(err))
        }
    }
}

async fn stream_chat_completion(state: AppState, messages: Vec<Message>, model: String) -> Response {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<StreamSignal>();
    let router = Arc::clone(state.router());
    let metrics = Arc::clone(state.metrics());
    let completion_id = format!("chatcmpl-{}", Uuid::new_v4());

    tokio::spawn(async move {
        let mut callbacks = StreamCallbacks { tx };
        router.chat(messages, &mut callbacks).await;
    });

    let stream = async_stream::stream! {
        while let Some(signal) = rx.recv().await {
            match signal {
                StreamSignal::Token(token) => {
                    let chunk = sse_chunk(&completion_id, &model, Some(&token), None);
                    yield Ok::<_, Infallible>(SseEvent::default().data(chunk));
                }
                StreamSignal::Complete(result) => {
                    let provider = result.as_ref().map_or("none", |r| r.provider.as_str());
                    metrics
                        .chat_requests
                        .with_label_values(&[provider, "success"])
                        .inc();
                    let chunk = sse_chunk(&completion_id, &model, None, Some("stop"));
                    yield Ok(SseEvent::default().data(chunk));
                    yield Ok(SseEvent::default().data("[DONE]"));
                    break;
                }
                StreamSignal::Error(err) => {
                    metrics
                        .chat_requests
                        .with_label_values(&["none", "failure"])
                        .inc();
                    let payload = serde_json::json!({
                        "error": { "message": err.to_string(), "type": "gateway_error" },
                    });
                    yield Ok(SseEvent::default().data(payload.to_string()));
                    break;
                }
            }
        }
    };

    Sse::new(stream)
        .keep_alive(axum::response::sse::KeepAlive::default())
        .into_response()
}

// =============================================================================
// OpenAI-compatible models listing
// =============================================================================

#[derive(Debug, Serialize)]
struct ModelObject {
    id: String,
    object: &'static str,
    owned_by: String,
}

/// `GET /v1/models` — the configured providers, OpenAI-model-shaped.
pub async fn list_models(State(state): State<AppState>) -> Json<Value> {
    let data: Vec<ModelObject> = state
        .config()
        .providers
        .iter()
        .map(|p| ModelObject {
            id: p.model_hint.clone().unwrap_or_else(|| p.id.clone()),
            object: "model",
            owned_by: p.id.clone(),
        })
        .collect();
    Json(serde_json::json!({ "object": "list", "data": data }))
}

/// `GET /v1/models/:model_id`.
pub async fn get_model(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<ModelObject>, ApiError> {
    state
        .config()
        .providers
        .iter()
        .find(|p| p.id == model_id || p.model_hint.as_deref() == Some(model_id.as_str()))
        .map(|p| {
            Json(ModelObject {
                id: model_id.clone(),
                object: "model",
                owned_by: p.id.clone(),
            })
        })
        .ok_or_else(|| ApiError::not_found(format!("model not found: {model_id}")))
}

// =============================================================================
// Router admin endpoints
// =============================================================================

/// `GET /admin/providers` — per-provider health snapshots.
pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<HealthSnapshot>> {
    Json(state.router().provider_health())
}

/// `GET /admin/stats` — aggregate Router status.
pub async fn gateway_stats(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(state.router().status())
}

/// `POST /admin/cache/clear` — drop every cached response.
pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.router().clear_cache();
    StatusCode::NO_CONTENT
}

/// `POST /admin/self-heal` — re-probe every unhealthy provider.
pub async fn self_heal(State(state): State<AppState>) -> StatusCode {
    state.router().self_heal().await;
    StatusCode::ACCEPTED
}

// =============================================================================
// Webhook admin endpoints
// =============================================================================

/// A subscription as returned over HTTP. Never carries `secret` — the
/// signing secret is surfaced only once, at registration or rotation
/// time (spec.md §1's credential-handling Non-goals extend to this:
/// secrets are round-tripped through the API exactly once).
#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    id: String,
    url: String,
    events: Vec<String>,
    integration_filter: Option<Vec<String>>,
    active: bool,
    retry_policy: gateway_webhooks::RetryPolicy,
    headers: Option<std::collections::HashMap<String, String>>,
    timeout_ms: Option<u64>,
    created_at: chrono::DateTime<chrono::Utc>,
    metadata: Option<Value>,
}

impl From<Subscription> for SubscriptionView {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id,
            url: sub.url,
            events: sub.events.into_iter().collect(),
            integration_filter: sub.integration_filter.map(|f| f.into_iter().collect()),
            active: sub.active,
            retry_policy: sub.retry_policy,
            headers: sub.headers,
            timeout_ms: sub.timeout.map(|d| d.as_millis() as u64),
            created_at: sub.created_at,
            metadata: sub.metadata,
        }
    }
}

/// A subscription as returned immediately after registration, the one
/// time the secret is surfaced.
#[derive(Debug, Serialize)]
pub struct RegisteredSubscription {
    #[serde(flatten)]
    view: SubscriptionView,
    secret: String,
}

/// Request body for `POST /webhooks/subscriptions`.
#[derive(Debug, Deserialize)]
pub struct RegisterSubscriptionRequest {
    url: String,
    events: Vec<String>,
    #[serde(default)]
    integration_filter: Option<Vec<String>>,
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    retry_policy: Option<gateway_webhooks::RetryPolicy>,
    #[serde(default)]
    headers: Option<std::collections::HashMap<String, String>>,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    metadata: Option<Value>,
}

/// `POST /webhooks/subscriptions` — register a new subscription.
pub async fn register_subscription(
    State(state): State<AppState>,
    Json(request): Json<RegisterSubscriptionRequest>,
) -> Result<Json<RegisteredSubscription>, ApiError> {
    let opts = RegisterOptions {
        url: request.url,
        events: request.events.into_iter().collect(),
        integration_filter: request
            .integration_filter
            .map(|f| f.into_iter().collect()),
        secret: request.secret,
        retry_policy: request.retry_policy,
        headers: request.headers,
        timeout: request.timeout_ms.map(std::time::Duration::from_millis),
        metadata: request.metadata,
    };
    let subscription = state.dispatcher().register(opts)?;
    let secret = subscription.secret.clone();
    Ok(Json(RegisteredSubscription {
        view: subscription.into(),
        secret,
    }))
}

/// Query params for `GET /webhooks/subscriptions`.
#[derive(Debug, Deserialize, Default)]
pub struct ListSubscriptionsQuery {
    event_type: Option<String>,
    active: Option<bool>,
    integration_id: Option<String>,
}

/// `GET /webhooks/subscriptions`.
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(query): Query<ListSubscriptionsQuery>,
) -> Json<Vec<SubscriptionView>> {
    let filter = SubscriptionFilter {
        event_type: query.event_type,
        active: query.active,
        integration_id: query.integration_id,
    };
    Json(
        state
            .dispatcher()
            .list(&filter)
            .into_iter()
            .map(SubscriptionView::from)
            .collect(),
    )
}

/// `GET /webhooks/subscriptions/:id`.
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionView>, ApiError> {
    state
        .dispatcher()
        .get(&id)
        .map(|sub| Json(SubscriptionView::from(sub)))
        .ok_or_else(|| ApiError::not_found(format!("subscription not found: {id}")))
}

/// Request body for `PATCH /webhooks/subscriptions/:id`.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateSubscriptionRequest {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    events: Option<Vec<String>>,
    #[serde(default)]
    integration_filter: Option<Option<Vec<String>>>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default)]
    retry_policy: Option<gateway_webhooks::RetryPolicy>,
    #[serde(default)]
    headers: Option<Option<std::collections::HashMap<String, String>>>,
    #[serde(default)]
    timeout_ms: Option<Option<u64>>,
    #[serde(default)]
    metadata: Option<Option<Value>>,
}

/// `PATCH /webhooks/subscriptions/:id`.
pub async fn update_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateSubscriptionRequest>,
) -> Result<Json<SubscriptionView>, ApiError> {
    let update = SubscriptionUpdate {
        url: request.url,
        events: request.events.map(|e| e.into_iter().collect()),
        integration_filter: request
            .integration_filter
            .map(|f| f.map(|s| s.into_iter().collect())),
        active: request.active,
        retry_policy: request.retry_policy,
        headers: request.headers,
        timeout: request
            .timeout_ms
            .map(|t| t.map(std::time::Duration::from_millis)),
        metadata: request.metadata,
    };
    let subscription = state.dispatcher().update(&id, update)?;
    Ok(Json(subscription.into()))
}

/// `DELETE /webhooks/subscriptions/:id`.
pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.dispatcher().delete(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("subscription not found: {id}")))
    }
}

#[derive(Debug, Serialize)]
pub struct RotatedSecret {
    secret: String,
}

/// `POST /webhooks/subscriptions/:id/rotate-secret`.
pub async fn rotate_secret(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RotatedSecret>, ApiError> {
    state
        .dispatcher()
        .rotate_secret(&id)
        .map(|secret| Json(RotatedSecret { secret }))
        .ok_or_else(|| ApiError::not_found(format!("subscription not found: {id}")))
}

/// `POST /webhooks/subscriptions/:id/test` — synchronous one-shot probe
/// delivery, not recorded as a `Delivery`.
pub async fn test_delivery(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<gateway_webhooks::DeliveryResponse>, ApiError> {
    let response = state.dispatcher().test_delivery(&id).await?;
    Ok(Json(response))
}

/// `GET /webhooks/subscriptions/:id/stats`.
pub async fn subscription_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<gateway_webhooks::SubscriptionStatsSnapshot>, ApiError> {
    state
        .dispatcher()
        .stats(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("subscription not found: {id}")))
}

/// `GET /webhooks/stats` — fleet-wide delivery statistics.
pub async fn aggregate_stats(State(state): State<AppState>) -> Json<gateway_webhooks::AggregateStats> {
    Json(state.dispatcher().aggregate_stats())
}

/// Request body for `POST /webhooks/events`.
#[derive(Debug, Deserialize)]
pub struct DispatchEventRequest {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    integration_id: Option<String>,
    #[serde(default)]
    integration_name: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DispatchedEvent {
    delivery_ids: Vec<String>,
}

/// `POST /webhooks/events` — fan an event out to every matching,
/// active subscription.
pub async fn dispatch_event(
    State(state): State<AppState>,
    Json(request): Json<DispatchEventRequest>,
) -> Json<DispatchedEvent> {
    let event = WebhookEvent::new(
        request.event_type,
        request.data,
        request.integration_id,
        request.integration_name,
        request.user_id,
    );
    let delivery_ids = state.dispatcher().dispatch(event);
    debug!(count = delivery_ids.len(), "event fanned out to subscriptions");
    Json(DispatchedEvent { delivery_ids })
}

/// `GET /webhooks/deliveries/:id`.
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<gateway_webhooks::Delivery>, ApiError> {
    state
        .dispatcher()
        .get_delivery(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("delivery not found: {id}")))
}

/// `POST /webhooks/deliveries/:id/retry` — reset attempts and retry now.
pub async fn retry_delivery(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.dispatcher().retry_delivery(&id)?;
    Ok(StatusCode::ACCEPTED)
}

/// `POST /webhooks/deliveries/:id/cancel` — cancel a pending retry timer.
pub async fn cancel_retry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.dispatcher().cancel_retry(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query params for `DELETE /webhooks/deliveries`.
#[derive(Debug, Deserialize, Default)]
pub struct PurgeDeliveriesQuery {
    subscription_id: Option<String>,
    status: Option<DeliveryStatus>,
}

#[derive(Debug, Serialize)]
pub struct PurgedDeliveries {
    purged: usize,
}

/// `DELETE /webhooks/deliveries` — explicit retention sweep, purging
/// deliveries matching the given subscription/status filter.
pub async fn purge_deliveries(
    State(state): State<AppState>,
    Query(query): Query<PurgeDeliveriesQuery>,
) -> Json<PurgedDeliveries> {
    let filter = DeliveryFilter {
        subscription_id: query.subscription_id,
        status: query.status,
        older_than: None,
    };
    Json(PurgedDeliveries {
        purged: state.dispatcher().purge_deliveries(&filter),
    })
}
