//! Route definitions for the gateway API.

use std::time::Duration;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{handlers, state::AppState};

/// Build the full Axum [`Router`], wired to `state` and carrying the
/// standard tower-http middleware stack (tracing, CORS, compression,
/// request timeout).
#[must_use]
pub fn create_router(state: AppState) -> Router {
    let request_timeout = state.config().server.shutdown_grace_period;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/healthz", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/readyz", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        .route("/livez", get(handlers::liveness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/v1", openai_routes())
        .nest("/admin", admin_routes())
        .nest("/webhooks", webhook_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout.max(Duration::from_secs(1))))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// OpenAI-compatible API routes.
fn openai_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/completions", post(handlers::chat_completion))
        .route("/models", get(handlers::list_models))
        .route("/models/:model_id", get(handlers::get_model))
}

/// Router introspection and maintenance routes.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/providers", get(handlers::list_providers))
        .route("/stats", get(handlers::gateway_stats))
        .route("/cache/clear", post(handlers::clear_cache))
        .route("/self-heal", post(handlers::self_heal))
}

/// Webhook subscription management and event dispatch routes.
fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/subscriptions",
            get(handlers::list_subscriptions).post(handlers::register_subscription),
        )
        .route(
            "/subscriptions/:id",
            get(handlers::get_subscription)
                .patch(handlers::update_subscription)
                .delete(handlers::delete_subscription),
        )
        .route(
            "/subscriptions/:id/rotate-secret",
            post(handlers::rotate_secret),
        )
        .route("/subscriptions/:id/test", post(handlers::test_delivery))
        .route(
            "/subscriptions/:id/stats",
            get(handlers::subscription_stats),
        )
        .route("/events", post(handlers::dispatch_event))
        .route("/deliveries", delete(handlers::purge_deliveries))
        .route("/deliveries/:id", get(handlers::get_delivery))
        .route(
            "/deliveries/:id/retry",
            post(handlers::retry_delivery),
        )
        .route(
            "/deliveries/:id/cancel",
            post(handlers::cancel_retry),
        )
        .route("/stats", get(handlers::aggregate_stats))
}
