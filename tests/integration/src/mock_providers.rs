//! Wiremock-backed fake upstreams matching the wire protocol each real
//! driver speaks: Ollama-style NDJSON for `LocalChat`, OpenAI-shaped
//! JSON/SSE for `OpenAiChat`/`OpenAiChatFree`.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::fixtures::{ollama_chat_line, ollama_tags_response, openai_json_response, openai_sse_chunk, openai_sse_done};

/// A fake Ollama-style local server: `GET /api/tags` then
/// `POST /api/chat` streaming NDJSON lines.
pub struct MockLocalChat {
    server: MockServer,
}

impl MockLocalChat {
    /// Start the server and mount a single-model `/api/tags` response
    /// plus a `/api/chat` stream that replays `chunks` then signals `done`.
    pub async fn start(model: &str, chunks: &[&str]) -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ollama_tags_response(model)))
            .mount(&server)
            .await;

        let mut body = String::new();
        for chunk in chunks {
            body.push_str(&ollama_chat_line(chunk, false));
            body.push('\n');
        }
        body.push_str(&ollama_chat_line("", true));
        body.push('\n');

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .append_header("Content-Type", "application/x-ndjson"),
            )
            .mount(&server)
            .await;

        Self { server }
    }

    /// Start a server whose `/api/tags` is reachable but whose
    /// `/api/chat` always fails, for failover tests.
    pub async fn start_failing() -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ollama_tags_response("llama3")))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        Self { server }
    }

    /// Base URL to configure as a provider's `endpoint`.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.uri()
    }
}

/// A fake OpenAI-compatible endpoint speaking either non-streaming JSON
/// or SSE, matching `OpenAiChatFreeDriver`/`OpenAiChatDriver`'s request
/// shape (a bare `POST` to the configured `endpoint`, no sub-path).
pub struct MockOpenAiCompatible {
    server: MockServer,
}

impl MockOpenAiCompatible {
    /// Start a server that answers every POST with a non-streaming
    /// completion.
    pub async fn start_non_streaming(content: &str) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(openai_json_response(content)))
            .mount(&server)
            .await;
        Self { server }
    }

    /// Start a server that answers every POST with an SSE stream
    /// replaying `chunks` then `[DONE]`.
    pub async fn start_streaming(chunks: &[&str]) -> Self {
        let server = MockServer::start().await;
        let mut body = String::new();
        for chunk in chunks {
            body.push_str(&openai_sse_chunk(chunk));
        }
        body.push_str(openai_sse_done());

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .append_header("Content-Type", "text/event-stream"),
            )
            .mount(&server)
            .await;
        Self { server }
    }

    /// Start a server that answers every POST with `status`.
    pub async fn start_failing(status: u16) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        Self { server }
    }

    /// Base URL to configure as a provider's `endpoint`.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.uri()
    }
}

/// A fake webhook sink recording every delivery it receives, for
/// asserting on signature headers and retry counts.
pub struct MockWebhookSink {
    server: MockServer,
}

impl MockWebhookSink {
    /// Start a sink that accepts every delivery with `status`.
    pub async fn start(status: u16) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        Self { server }
    }

    /// Base URL to register as a subscription's `url`.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Every request this sink has received so far.
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_chat_mock_answers_tags_and_chat() {
        let mock = MockLocalChat::start("llama3.2", &["hi", " there"]).await;
        let client = reqwest::Client::new();

        let tags = client
            .get(format!("{}/api/tags", mock.url()))
            .send()
            .await
            .unwrap();
        assert_eq!(tags.status(), 200);

        let chat = client
            .post(format!("{}/api/chat", mock.url()))
            .json(&serde_json::json!({"model": "llama3.2", "messages": [], "stream": true}))
            .send()
            .await
            .unwrap();
        assert_eq!(chat.status(), 200);
    }

    #[tokio::test]
    async fn webhook_sink_records_received_requests() {
        let sink = MockWebhookSink::start(200).await;
        let client = reqwest::Client::new();
        client.post(sink.url()).json(&serde_json::json!({"a": 1})).send().await.unwrap();
        assert_eq!(sink.received_requests().await.len(), 1);
    }
}
