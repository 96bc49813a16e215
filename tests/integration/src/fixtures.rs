//! Sample messages, provider configs, and OpenAI-shaped JSON bodies
//! shared across the integration suite.

use std::time::Duration;

use gateway_core::{Message, ProviderConfig, ProviderKind};
use serde_json::{json, Value};

/// A single user turn.
#[must_use]
pub fn user_turn(content: &str) -> Vec<Message> {
    vec![Message::user(content)]
}

/// System + user turn.
#[must_use]
pub fn system_and_user(system: &str, user: &str) -> Vec<Message> {
    vec![Message::system(system), Message::user(user)]
}

/// A multi-turn conversation ending on a fresh user question.
#[must_use]
pub fn multi_turn() -> Vec<Message> {
    vec![
        Message::user("what is 2 + 2?"),
        Message::assistant("2 + 2 equals 4."),
        Message::user("and multiplied by 3?"),
    ]
}

/// A `LocalChat` provider pointed at `endpoint` (no trailing slash), not
/// requiring a credential.
#[must_use]
pub fn local_chat_provider(id: &str, endpoint: &str, priority: i32) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        display_name: id.to_string(),
        kind: ProviderKind::LocalChat,
        endpoint: endpoint.to_string(),
        model_hint: None,
        priority,
        context_tokens: 4096,
        max_output_tokens: 512,
        timeout: Duration::from_secs(5),
        requires_key: false,
        supports_streaming: true,
    }
}

/// A keyless `OpenAiChatFree` provider, streaming by default.
#[must_use]
pub fn openai_free_provider(id: &str, endpoint: &str, priority: i32) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        display_name: id.to_string(),
        kind: ProviderKind::OpenAiChatFree,
        endpoint: endpoint.to_string(),
        model_hint: Some("gpt-3.5-turbo".to_string()),
        priority,
        context_tokens: 4096,
        max_output_tokens: 512,
        timeout: Duration::from_secs(5),
        requires_key: false,
        supports_streaming: true,
    }
}

/// A non-streaming `OpenAiChatFree` provider (synthetic-replay path).
#[must_use]
pub fn openai_free_non_streaming_provider(id: &str, endpoint: &str, priority: i32) -> ProviderConfig {
    let mut config = openai_free_provider(id, endpoint, priority);
    config.supports_streaming = false;
    config
}

/// A bearer-token `OpenAiChat` provider.
#[must_use]
pub fn openai_provider(id: &str, endpoint: &str, priority: i32) -> ProviderConfig {
    let mut config = openai_free_provider(id, endpoint, priority);
    config.id = id.to_string();
    config.display_name = id.to_string();
    config.kind = ProviderKind::OpenAiChat;
    config.requires_key = true;
    config
}

/// An OpenAI-compatible chat completion request body.
#[must_use]
pub fn openai_json_request(model: &str, message: &str) -> Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": message}],
    })
}

/// An OpenAI-compatible non-streaming chat completion response body.
#[must_use]
pub fn openai_json_response(content: &str) -> Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}],
    })
}

/// A single OpenAI-compatible SSE `data:` chunk carrying a content delta.
#[must_use]
pub fn openai_sse_chunk(content: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"choices": [{"delta": {"content": content}}]})
    )
}

/// The terminal `[DONE]` SSE sentinel.
#[must_use]
pub fn openai_sse_done() -> &'static str {
    "data: [DONE]\n\n"
}

/// An Ollama-style `/api/tags` response listing one model.
#[must_use]
pub fn ollama_tags_response(model: &str) -> Value {
    json!({"models": [{"name": model}]})
}

/// One NDJSON line from Ollama's `/api/chat`, optionally the final one.
#[must_use]
pub fn ollama_chat_line(content: &str, done: bool) -> String {
    json!({"message": {"role": "assistant", "content": content}, "done": done}).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_turn_has_one_message() {
        assert_eq!(user_turn("hi").len(), 1);
    }

    #[test]
    fn local_chat_provider_does_not_require_a_key() {
        let config = local_chat_provider("ollama", "http://localhost:11434", 10);
        assert!(!config.requires_key);
        assert_eq!(config.kind, ProviderKind::LocalChat);
    }

    #[test]
    fn openai_provider_requires_a_key() {
        let config = openai_provider("openai", "http://localhost:0", 0);
        assert!(config.requires_key);
    }
}
