//! End-to-end scenarios exercising more than one subsystem at once:
//! a chat completion that warms the cache, and a webhook round trip
//! with signature verification against the real dispatcher.

use serde_json::json;

use crate::fixtures::{local_chat_provider, openai_free_provider};
use crate::helpers::{assert_status, TestServer};
use crate::mock_providers::{MockLocalChat, MockOpenAiCompatible, MockWebhookSink};
use gateway_config::GatewayConfig;
use gateway_webhooks::verify_signature;

#[tokio::test]
async fn a_second_identical_chat_request_over_http_is_served_from_cache() {
    let mock = MockOpenAiCompatible::start_non_streaming(
        "an end-to-end response long enough to clear the cacheable length floor",
    )
    .await;
    let mut config = GatewayConfig::default();
    let mut provider = openai_free_provider("openai-free", &mock.url(), 0);
    provider.supports_streaming = false;
    config.providers.push(provider);
    let server = TestServer::with_config(config).await;

    let request = json!({"messages": [{"role": "user", "content": "describe the gateway's caching layer"}]});

    let first = server.post_json("/v1/chat/completions", &request).await;
    assert_status(&first, 200);
    let first_body = TestServer::json_body(first).await;
    assert_eq!(first_body["from_cache"], false);

    let second = server.post_json("/v1/chat/completions", &request).await;
    assert_status(&second, 200);
    let second_body = TestServer::json_body(second).await;
    assert_eq!(second_body["from_cache"], true);
    assert_eq!(second_body["choices"][0]["message"]["content"], first_body["choices"][0]["message"]["content"]);
}

#[tokio::test]
async fn chat_completion_falls_through_a_dead_provider_to_a_healthy_one_over_http() {
    let dead = MockLocalChat::start_failing().await;
    let healthy = MockOpenAiCompatible::start_non_streaming("served by the backup provider").await;

    let mut config = GatewayConfig::default();
    config.providers.push(local_chat_provider("primary", &dead.url(), 0));
    let mut backup = openai_free_provider("backup", &healthy.url(), 1);
    backup.supports_streaming = false;
    config.providers.push(backup);
    let server = TestServer::with_config(config).await;

    let response = server
        .post_json(
            "/v1/chat/completions",
            &json!({"messages": [{"role": "user", "content": "hi"}]}),
        )
        .await;
    assert_status(&response, 200);
    let body = TestServer::json_body(response).await;
    assert_eq!(body["provider"], "backup");
}

#[tokio::test]
async fn webhook_round_trip_delivers_a_correctly_signed_request_to_the_sink() {
    let sink = MockWebhookSink::start(200).await;
    let server = TestServer::with_default_config().await;

    let registered = TestServer::json_body(
        server
            .post_json(
                "/webhooks/subscriptions",
                &json!({"url": sink.url(), "events": ["order.created"]}),
            )
            .await,
    )
    .await;
    let secret = registered["secret"].as_str().unwrap().to_string();

    let dispatch = server
        .post_json(
            "/webhooks/events",
            &json!({"type": "order.created", "data": {"order_id": "ord_123"}}),
        )
        .await;
    assert_status(&dispatch, 200);

    // The dispatch is fire-and-forget; give the spawned delivery task a
    // moment to reach the mock sink before asserting on it.
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;

    let received = sink.received_requests().await;
    assert_eq!(received.len(), 1);

    let request = &received[0];
    let body = String::from_utf8(request.body.clone()).expect("utf8 body");
    let signature_header = request
        .headers
        .get("x-webhook-signature")
        .expect("signature header present")
        .to_str()
        .unwrap();

    assert!(verify_signature(&body, signature_header, &secret, 300));
    assert!(!verify_signature(&body, signature_header, "wrong-secret", 300));
}

#[tokio::test]
async fn an_inactive_subscription_receives_no_deliveries() {
    let sink = MockWebhookSink::start(200).await;
    let server = TestServer::with_default_config().await;

    let registered = TestServer::json_body(
        server
            .post_json(
                "/webhooks/subscriptions",
                &json!({"url": sink.url(), "events": ["order.created"]}),
            )
            .await,
    )
    .await;
    let id = registered["id"].as_str().unwrap().to_string();

    server
        .patch_json(&format!("/webhooks/subscriptions/{id}"), &json!({"active": false}))
        .await;

    let dispatch = server
        .post_json(
            "/webhooks/events",
            &json!({"type": "order.created", "data": {}}),
        )
        .await;
    let dispatched = TestServer::json_body(dispatch).await;
    assert!(dispatched["delivery_ids"].as_array().unwrap().is_empty());

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(sink.received_requests().await.is_empty());
}
