//! Response cache integration tests: observable through `Router::chat`
//! rather than `ResponseCache` directly, since the cache's own hashing
//! and eviction semantics already have thorough unit coverage.

use std::sync::Arc;
use std::time::Duration;

use gateway_core::{CompletionResult, GatewayError, NoCredentials};
use gateway_routing::{ChatCallbacks, Router, RouterConfig};

use crate::fixtures::{local_chat_provider, user_turn};
use crate::mock_providers::MockLocalChat;

#[derive(Default)]
struct RecordingCallbacks {
    result: Option<Option<CompletionResult>>,
}

impl ChatCallbacks for RecordingCallbacks {
    fn on_token(&mut self, _token: &str) {}

    fn on_complete(&mut self, result: Option<CompletionResult>) {
        self.result = Some(result);
    }

    fn on_error(&mut self, _error: GatewayError) {}
}

async fn run(router: &Router, prompt: &str) -> CompletionResult {
    let mut callbacks = RecordingCallbacks::default();
    router.chat(user_turn(prompt), &mut callbacks).await;
    callbacks.result.expect("on_complete was not called").expect("result present")
}

#[tokio::test]
async fn a_cached_response_is_served_without_calling_the_provider_again() {
    let mock = MockLocalChat::start("llama3.2", &["a sufficiently long cached answer about rust ownership"]).await;
    let provider = local_chat_provider("local", &mock.url(), 0);
    let router = Router::new(RouterConfig::new(vec![provider], Arc::new(NoCredentials)));

    let first = run(&router, "what is ownership in rust").await;
    assert!(!first.from_cache);

    let second = run(&router, "what is ownership in rust").await;
    assert!(second.from_cache);
    assert_eq!(second.content, first.content);
    assert_eq!(second.provider, first.provider);
}

#[tokio::test]
async fn short_responses_are_not_cached() {
    let mock = MockLocalChat::start("llama3.2", &["ok"]).await;
    let provider = local_chat_provider("local", &mock.url(), 0);
    let router = Router::new(RouterConfig::new(vec![provider], Arc::new(NoCredentials)));

    let first = run(&router, "hi").await;
    assert!(!first.from_cache);

    let second = run(&router, "hi").await;
    assert!(!second.from_cache, "short replies fall under the cacheable length floor");
}

#[tokio::test]
async fn a_near_duplicate_prompt_is_served_from_the_similarity_cache() {
    let mock = MockLocalChat::start(
        "llama3.2",
        &["the borrow checker enforces aliasing xor mutability at compile time"],
    )
    .await;
    let provider = local_chat_provider("local", &mock.url(), 0);
    let router = Router::new(RouterConfig::new(vec![provider], Arc::new(NoCredentials)));

    let first = run(&router, "please explain the rust borrow checker to me in detail").await;
    assert!(!first.from_cache);

    let second = run(&router, "please explain the rust borrow checker to me please").await;
    assert!(second.from_cache, "near-duplicate phrasing should hit the 0.9-threshold similarity lookup");
    assert_eq!(second.content, first.content);
}

#[tokio::test]
async fn clear_cache_forces_the_next_identical_request_back_to_the_provider() {
    let mock = MockLocalChat::start("llama3.2", &["a long enough answer to be cached by the gateway router"]).await;
    let provider = local_chat_provider("local", &mock.url(), 0);
    let router = Router::new(RouterConfig::new(vec![provider], Arc::new(NoCredentials)));

    let first = run(&router, "tell me about caching").await;
    assert!(!first.from_cache);

    let cached = run(&router, "tell me about caching").await;
    assert!(cached.from_cache);

    router.clear_cache();

    let after_clear = run(&router, "tell me about caching").await;
    assert!(!after_clear.from_cache, "clear_cache should evict the prior entry");
}

#[tokio::test]
async fn cache_hits_report_zero_latency_and_no_token_usage() {
    let mock = MockLocalChat::start("llama3.2", &["a long enough answer so it gets cached for the next lookup"]).await;
    let provider = local_chat_provider("local", &mock.url(), 0);
    let router = Router::new(RouterConfig::new(vec![provider], Arc::new(NoCredentials)));

    run(&router, "describe the caching layer").await;
    let cached = run(&router, "describe the caching layer").await;

    assert!(cached.from_cache);
    assert_eq!(cached.latency_ms, 0);
    assert_eq!(cached.tokens_used, 0);
}

#[tokio::test]
async fn cache_is_scoped_per_router_instance() {
    let mock_a = MockLocalChat::start("llama3.2", &["a response long enough to be cached across routers too"]).await;
    let mock_b = MockLocalChat::start("llama3.2", &["a response long enough to be cached across routers too"]).await;

    let router_a = Router::new(RouterConfig::new(
        vec![local_chat_provider("local", &mock_a.url(), 0)],
        Arc::new(NoCredentials),
    ));
    let router_b = Router::new(RouterConfig::new(
        vec![local_chat_provider("local", &mock_b.url(), 0)],
        Arc::new(NoCredentials),
    ));

    run(&router_a, "shared prompt text").await;
    let second_router_first_call = run(&router_b, "shared prompt text").await;
    assert!(!second_router_first_call.from_cache);
}

#[tokio::test]
async fn cache_ttl_expiry_forces_a_fresh_call() {
    let mock = MockLocalChat::start("llama3.2", &["a long enough reply for the gateway to consider caching it"]).await;
    let provider = local_chat_provider("local", &mock.url(), 0);
    let mut config = RouterConfig::new(vec![provider], Arc::new(NoCredentials));
    config.cache_ttl = Duration::from_millis(1);
    let router = Router::new(config);

    let first = run(&router, "how long does a cache entry live").await;
    assert!(!first.from_cache);

    tokio::time::sleep(Duration::from_millis(20)).await;

    let after_expiry = run(&router, "how long does a cache entry live").await;
    assert!(!after_expiry.from_cache, "entry should have expired under a 1ms ttl");
}
