//! HTTP-level integration tests: health/readiness, the OpenAI-compatible
//! chat surface, admin introspection, and webhook subscription CRUD,
//! all driven through a real bound `TestServer`.

use serde_json::json;

use crate::fixtures::{local_chat_provider, openai_free_provider};
use crate::helpers::{assert_status, init_tracing, TestServer};
use crate::mock_providers::{MockLocalChat, MockOpenAiCompatible, MockWebhookSink};
use gateway_config::GatewayConfig;

#[tokio::test]
async fn health_ready_and_live_all_report_ok_with_offline_only_config() {
    init_tracing();
    let server = TestServer::with_default_config().await;

    assert_status(&server.get("/health").await, 200);
    assert_status(&server.get("/healthz").await, 200);
    assert_status(&server.get("/ready").await, 200);
    assert_status(&server.get("/readyz").await, 200);
    assert_status(&server.get("/live").await, 200);
    assert_status(&server.get("/livez").await, 200);
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text_format() {
    let server = TestServer::with_default_config().await;
    let response = server.get("/metrics").await;
    assert_status(&response, 200);
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn models_endpoint_lists_configured_providers() {
    let mock = MockLocalChat::start("llama3.2", &["hi"]).await;
    let mut config = GatewayConfig::default();
    config.providers.push(local_chat_provider("local", &mock.url(), 0));
    let server = TestServer::with_config(config).await;

    let response = server.get("/v1/models").await;
    assert_status(&response, 200);
    let body = TestServer::json_body(response).await;
    let ids: Vec<&str> = body["data"].as_array().unwrap().iter().map(|m| m["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&"local"));
}

#[tokio::test]
async fn chat_completions_rejects_an_empty_message_list() {
    let server = TestServer::with_default_config().await;
    let response = server.post_json("/v1/chat/completions", &json!({"messages": []})).await;
    assert_status(&response, 400);
}

#[tokio::test]
async fn chat_completions_falls_through_to_offline_with_no_providers_configured() {
    let server = TestServer::with_default_config().await;
    let response = server
        .post_json(
            "/v1/chat/completions",
            &json!({"messages": [{"role": "user", "content": "hello"}]}),
        )
        .await;
    assert_status(&response, 200);
    let body = TestServer::json_body(response).await;
    assert_eq!(body["provider"], "offline");
    assert!(!body["choices"][0]["message"]["content"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn chat_completions_uses_a_configured_provider_when_reachable() {
    let mock = MockOpenAiCompatible::start_non_streaming("a configured-provider response").await;
    let mut config = GatewayConfig::default();
    let mut provider = openai_free_provider("openai-free", &mock.url(), 0);
    provider.supports_streaming = false;
    config.providers.push(provider);
    let server = TestServer::with_config(config).await;

    let response = server
        .post_json(
            "/v1/chat/completions",
            &json!({"messages": [{"role": "user", "content": "hi"}]}),
        )
        .await;
    assert_status(&response, 200);
    let body = TestServer::json_body(response).await;
    assert_eq!(body["provider"], "openai-free");
}

#[tokio::test]
async fn chat_completions_streams_sse_when_requested() {
    let mock = MockOpenAiCompatible::start_streaming(&["hello", " world"]).await;
    let mut config = GatewayConfig::default();
    config.providers.push(openai_free_provider("openai-free", &mock.url(), 0));
    let server = TestServer::with_config(config).await;

    let response = server
        .post_json(
            "/v1/chat/completions",
            &json!({"messages": [{"role": "user", "content": "hi"}], "stream": true}),
        )
        .await;
    assert_status(&response, 200);
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));
    let body = response.text().await.unwrap();
    assert!(body.contains("data:"));
    assert!(body.contains("[DONE]"));
}

#[tokio::test]
async fn admin_providers_reports_health_snapshots() {
    let mock = MockLocalChat::start("llama3.2", &["hi"]).await;
    let mut config = GatewayConfig::default();
    config.providers.push(local_chat_provider("local", &mock.url(), 0));
    let server = TestServer::with_config(config).await;

    let response = server.get("/admin/providers").await;
    assert_status(&response, 200);
    let body = TestServer::json_body(response).await;
    assert!(body.as_array().unwrap().iter().any(|s| s["provider_id"] == "local"));
}

#[tokio::test]
async fn admin_stats_reports_system_status() {
    let server = TestServer::with_default_config().await;
    let response = server.get("/admin/stats").await;
    assert_status(&response, 200);
}

#[tokio::test]
async fn admin_cache_clear_returns_no_content() {
    let server = TestServer::with_default_config().await;
    assert_status(&server.post_json("/admin/cache/clear", &json!({})).await, 204);
}

#[tokio::test]
async fn admin_self_heal_returns_accepted() {
    let server = TestServer::with_default_config().await;
    assert_status(&server.post_json("/admin/self-heal", &json!({})).await, 202);
}

#[tokio::test]
async fn webhook_subscription_lifecycle_register_list_get_update_delete() {
    let sink = MockWebhookSink::start(200).await;
    let server = TestServer::with_default_config().await;

    let register = server
        .post_json(
            "/webhooks/subscriptions",
            &json!({"url": sink.url(), "events": ["order.created"]}),
        )
        .await;
    assert_status(&register, 200);
    let registered = TestServer::json_body(register).await;
    let id = registered["id"].as_str().unwrap().to_string();
    assert!(!registered["secret"].as_str().unwrap().is_empty());

    let list = TestServer::json_body(server.get("/webhooks/subscriptions").await).await;
    assert!(list.as_array().unwrap().iter().any(|s| s["id"] == id));
    assert!(list.as_array().unwrap()[0].get("secret").is_none());

    let fetched = server.get(&format!("/webhooks/subscriptions/{id}")).await;
    assert_status(&fetched, 200);

    let updated = server
        .patch_json(&format!("/webhooks/subscriptions/{id}"), &json!({"active": false}))
        .await;
    assert_status(&updated, 200);
    let updated_body = TestServer::json_body(updated).await;
    assert_eq!(updated_body["active"], false);

    let deleted = server.delete(&format!("/webhooks/subscriptions/{id}")).await;
    assert_status(&deleted, 204);

    let missing = server.get(&format!("/webhooks/subscriptions/{id}")).await;
    assert_status(&missing, 404);
}

#[tokio::test]
async fn webhook_rotate_secret_returns_a_fresh_secret() {
    let sink = MockWebhookSink::start(200).await;
    let server = TestServer::with_default_config().await;

    let registered = TestServer::json_body(
        server
            .post_json("/webhooks/subscriptions", &json!({"url": sink.url(), "events": ["*"]}))
            .await,
    )
    .await;
    let id = registered["id"].as_str().unwrap().to_string();
    let original_secret = registered["secret"].as_str().unwrap().to_string();

    let rotated = TestServer::json_body(
        server
            .post_json(&format!("/webhooks/subscriptions/{id}/rotate-secret"), &json!({}))
            .await,
    )
    .await;
    let new_secret = rotated["secret"].as_str().unwrap().to_string();
    assert_ne!(new_secret, original_secret);
}

#[tokio::test]
async fn webhook_test_delivery_reaches_the_sink() {
    let sink = MockWebhookSink::start(200).await;
    let server = TestServer::with_default_config().await;

    let registered = TestServer::json_body(
        server
            .post_json("/webhooks/subscriptions", &json!({"url": sink.url(), "events": ["*"]}))
            .await,
    )
    .await;
    let id = registered["id"].as_str().unwrap().to_string();

    let response = server.post_json(&format!("/webhooks/subscriptions/{id}/test"), &json!({})).await;
    assert_status(&response, 200);
    let body = TestServer::json_body(response).await;
    assert_eq!(body["status_code"], 200);
}

#[tokio::test]
async fn dispatching_an_event_creates_a_retrievable_delivery() {
    let sink = MockWebhookSink::start(200).await;
    let server = TestServer::with_default_config().await;

    let registered = TestServer::json_body(
        server
            .post_json(
                "/webhooks/subscriptions",
                &json!({"url": sink.url(), "events": ["payment.succeeded"]}),
            )
            .await,
    )
    .await;
    assert!(registered["id"].as_str().is_some());

    let dispatch = server
        .post_json(
            "/webhooks/events",
            &json!({"type": "payment.succeeded", "data": {"amount": 4200}}),
        )
        .await;
    assert_status(&dispatch, 200);
    let dispatched = TestServer::json_body(dispatch).await;
    let delivery_ids = dispatched["delivery_ids"].as_array().unwrap();
    assert_eq!(delivery_ids.len(), 1);

    let delivery_id = delivery_ids[0].as_str().unwrap();
    let delivery = server.get(&format!("/webhooks/deliveries/{delivery_id}")).await;
    assert_status(&delivery, 200);
}

#[tokio::test]
async fn dispatching_an_event_with_no_matching_subscriptions_yields_no_deliveries() {
    let server = TestServer::with_default_config().await;
    let response = server
        .post_json("/webhooks/events", &json!({"type": "nothing.listens", "data": {}}))
        .await;
    assert_status(&response, 200);
    let body = TestServer::json_body(response).await;
    assert!(body["delivery_ids"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn aggregate_stats_endpoint_is_reachable() {
    let server = TestServer::with_default_config().await;
    assert_status(&server.get("/webhooks/stats").await, 200);
}

#[tokio::test]
async fn purge_deliveries_returns_a_purged_count() {
    let server = TestServer::with_default_config().await;
    let response = server.delete("/webhooks/deliveries").await;
    assert_status(&response, 200);
    let body = TestServer::json_body(response).await;
    assert_eq!(body["purged"], 0);
}
