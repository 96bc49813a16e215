//! Driver-level integration tests: each `ProviderDriver` exercised
//! directly against a wiremock double speaking its real wire protocol.

use gateway_core::{GatewayError, ProviderConfig};
use gateway_providers::{LocalChatDriver, OfflineDriver, OpenAiChatDriver, OpenAiChatFreeDriver, ProviderDriver, TokenSink};
use reqwest::Client;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use crate::fixtures::{local_chat_provider, openai_free_non_streaming_provider, openai_free_provider, openai_provider, user_turn};
use crate::mock_providers::{MockLocalChat, MockOpenAiCompatible};

fn ctx() -> gateway_providers::DriverContext {
    gateway_providers::DriverContext {
        http: Client::new(),
        credential: None,
        cancellation: CancellationToken::new(),
        product_name: "gateway-under-test".to_string(),
    }
}

fn ctx_with_credential(secret: &str) -> gateway_providers::DriverContext {
    gateway_providers::DriverContext {
        credential: Some(SecretString::from(secret.to_string())),
        ..ctx()
    }
}

#[derive(Default)]
struct CollectingSink {
    tokens: Vec<String>,
    statuses: Vec<String>,
}

impl TokenSink for CollectingSink {
    fn on_token(&mut self, token: &str) {
        self.tokens.push(token.to_string());
    }

    fn on_status(&mut self, status: &str) {
        self.statuses.push(status.to_string());
    }
}

impl CollectingSink {
    fn joined(&self) -> String {
        self.tokens.concat()
    }
}

#[tokio::test]
async fn local_chat_driver_streams_ndjson_tokens_in_order() {
    let mock = MockLocalChat::start("llama3.2", &["hello", " there", "!"]).await;
    let config = local_chat_provider("local", &mock.url(), 0);
    let driver = LocalChatDriver;
    let context = ctx();
    let mut sink = CollectingSink::default();

    let result = driver.stream(&context, &config, &user_turn("hi"), &mut sink).await;
    assert!(result.is_ok());
    assert_eq!(sink.joined(), "hello there!");
    assert!(!sink.statuses.is_empty());
}

#[tokio::test]
async fn local_chat_driver_reports_bad_status_on_chat_failure() {
    let mock = MockLocalChat::start_failing().await;
    let config = local_chat_provider("flaky", &mock.url(), 0);
    let driver = LocalChatDriver;
    let context = ctx();
    let mut sink = CollectingSink::default();

    let result = driver.stream(&context, &config, &user_turn("hi"), &mut sink).await;
    assert!(matches!(result, Err(GatewayError::BadStatus { .. })));
}

#[tokio::test]
async fn local_chat_driver_probe_succeeds_when_tags_reachable() {
    let mock = MockLocalChat::start("llama3.2", &["ok"]).await;
    let config = local_chat_provider("local", &mock.url(), 0);
    let driver = LocalChatDriver;
    assert!(driver.probe(&ctx(), &config).await);
}

#[tokio::test]
async fn local_chat_driver_probe_fails_when_unreachable() {
    let config = local_chat_provider("unreachable", "http://127.0.0.1:1", 0);
    let driver = LocalChatDriver;
    assert!(!driver.probe(&ctx(), &config).await);
}

#[tokio::test]
async fn openai_chat_driver_requires_a_credential() {
    let config = openai_provider("openai", "http://127.0.0.1:1", 0);
    let driver = OpenAiChatDriver;
    let mut sink = CollectingSink::default();

    let result = driver.stream(&ctx(), &config, &user_turn("hi"), &mut sink).await;
    assert!(matches!(result, Err(GatewayError::CredentialMissing(_))));
}

#[tokio::test]
async fn openai_chat_driver_streams_sse_deltas() {
    let mock = MockOpenAiCompatible::start_streaming(&["The answer", " is", " 4."]).await;
    let config = openai_provider("openai", &mock.url(), 0);
    let driver = OpenAiChatDriver;
    let context = ctx_with_credential("sk-test-key");
    let mut sink = CollectingSink::default();

    let result = driver.stream(&context, &config, &user_turn("what is 2+2"), &mut sink).await;
    assert!(result.is_ok());
    assert_eq!(sink.joined(), "The answer is 4.");
}

#[tokio::test]
async fn openai_chat_free_driver_streams_without_a_credential() {
    let mock = MockOpenAiCompatible::start_streaming(&["free", " tier"]).await;
    let config = openai_free_provider("openai-free", &mock.url(), 0);
    let driver = OpenAiChatFreeDriver;
    let mut sink = CollectingSink::default();

    let result = driver.stream(&ctx(), &config, &user_turn("hi"), &mut sink).await;
    assert!(result.is_ok());
    assert_eq!(sink.joined(), "free tier");
}

#[tokio::test]
async fn openai_chat_free_driver_falls_back_to_synthetic_replay_when_non_streaming() {
    let mock = MockOpenAiCompatible::start_non_streaming("a reply typed out as synthetic tokens").await;
    let config = openai_free_non_streaming_provider("openai-free-sync", &mock.url(), 0);
    let driver = OpenAiChatFreeDriver;
    let mut sink = CollectingSink::default();

    let result = driver.stream(&ctx(), &config, &user_turn("hi"), &mut sink).await;
    assert!(result.is_ok());
    assert_eq!(sink.joined(), "a reply typed out as synthetic tokens");
    assert!(sink.tokens.len() > 1, "synthetic replay should emit more than one token chunk");
}

#[tokio::test]
async fn openai_chat_free_driver_reports_failure_on_bad_status() {
    let mock = MockOpenAiCompatible::start_failing(500).await;
    let config = openai_free_provider("openai-free", &mock.url(), 0);
    let driver = OpenAiChatFreeDriver;
    let mut sink = CollectingSink::default();

    let result = driver.stream(&ctx(), &config, &user_turn("hi"), &mut sink).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn offline_driver_always_answers() {
    let driver = OfflineDriver;
    let config = ProviderConfig::offline();
    let mut sink = CollectingSink::default();

    let result = driver.stream(&ctx(), &config, &user_turn("hello"), &mut sink).await;
    assert!(result.is_ok());
    assert!(!sink.joined().is_empty());
    assert!(driver.probe(&ctx(), &config).await);
}

#[tokio::test]
async fn offline_driver_mentions_offline_mode_in_its_reply() {
    let driver = OfflineDriver;
    let config = ProviderConfig::offline();
    let mut sink = CollectingSink::default();

    driver.stream(&ctx(), &config, &user_turn("hello"), &mut sink).await.unwrap();
    assert!(sink.joined().to_lowercase().contains("offline"));
}

#[tokio::test]
async fn cancellation_stops_a_local_chat_stream_mid_flight() {
    let mock = MockLocalChat::start("llama3.2", &["a", "b", "c", "d", "e"]).await;
    let config = local_chat_provider("local", &mock.url(), 0);
    let driver = LocalChatDriver;
    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let context = gateway_providers::DriverContext {
        http: Client::new(),
        credential: None,
        cancellation,
        product_name: "gateway-under-test".to_string(),
    };
    let mut sink = CollectingSink::default();

    let result = driver.stream(&context, &config, &user_turn("hi"), &mut sink).await;
    assert!(matches!(result, Err(GatewayError::Cancelled)));
}
