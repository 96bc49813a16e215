//! OpenAI-shaped chat drivers: a bearer-token variant (`OpenAiChat`) and
//! a keyless variant (`OpenAiChatFree`) that can additionally fall back
//! to non-streaming + synthetic replay.
//!
//! Grounded on the teacher's `azure.rs` SSE-over-`reqwest-eventsource`
//! loop, trimmed to the wire shape spec.md §6 actually names
//! (`choices[0].delta.content`, `data: [DONE]` terminator).

use crate::driver::{DriverContext, ProviderDriver, TokenSink};
use crate::synthetic::synthetic_replay;
use async_trait::async_trait;
use futures_util::StreamExt;
use gateway_core::{GatewayError, GatewayResult, Message, ProviderConfig};
use reqwest::RequestBuilder;
use reqwest_eventsource::{Event, EventSource};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    max_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NonStreamResponse {
    choices: Vec<NonStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct NonStreamChoice {
    message: NonStreamMessage,
}

#[derive(Debug, Deserialize)]
struct NonStreamMessage {
    #[serde(default)]
    content: String,
}

fn model_name(config: &ProviderConfig) -> &str {
    config.model_hint.as_deref().unwrap_or("gpt-3.5-turbo")
}

async fn run_sse(
    request: RequestBuilder,
    ctx: &DriverContext,
    config: &ProviderConfig,
    sink: &mut dyn TokenSink,
) -> GatewayResult<()> {
    sink.on_status(&format!("Connecting to {}…", config.display_name));

    let mut stream = EventSource::new(request)
        .map_err(|e| GatewayError::unreachable(&config.id, e.to_string()))?;

    while let Some(event) = stream.next().await {
        if ctx.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        match event {
            Ok(Event::Open) => {}
            Ok(Event::Message(msg)) => {
                let data = msg.data.trim();
                if data == "[DONE]" {
                    break;
                }
                let chunk: StreamChunk = match serde_json::from_str(data) {
                    Ok(c) => c,
                    Err(_) => continue,
                };
                if let Some(content) = chunk.choices.first().and_then(|c| c.delta.content.as_deref()) {
                    if !content.is_empty() {
                        sink.on_token(content);
                    }
                }
            }
            Err(reqwest_eventsource::Error::StreamEnded) => break,
            Err(e) => return Err(GatewayError::unreachable(&config.id, e.to_string())),
        }
    }

    Ok(())
}

/// OpenAI-compatible chat API requiring a bearer token.
#[derive(Debug, Default)]
pub struct OpenAiChatDriver;

#[async_trait]
impl ProviderDriver for OpenAiChatDriver {
    async fn stream(
        &self,
        ctx: &DriverContext,
        config: &ProviderConfig,
        messages: &[Message],
        sink: &mut dyn TokenSink,
    ) -> GatewayResult<()> {
        let credential = ctx
            .credential
            .as_ref()
            .ok_or_else(|| GatewayError::CredentialMissing(config.id.clone()))?;

        let body = ChatRequest {
            model: model_name(config),
            messages,
            stream: true,
            max_tokens: config.max_output_tokens,
        };

        let request = ctx
            .http
            .post(&config.endpoint)
            .bearer_auth(credential.expose_secret())
            .json(&body);

        run_sse(request, ctx, config, sink).await
    }

    async fn probe(&self, ctx: &DriverContext, config: &ProviderConfig) -> bool {
        let Some(credential) = ctx.credential.as_ref() else {
            return false;
        };
        ctx.http
            .head(&config.endpoint)
            .bearer_auth(credential.expose_secret())
            .send()
            .await
            .is_ok()
    }
}

/// OpenAI-compatible chat API that requires no credential. Can operate
/// non-streaming + synthetic replay when `supports_streaming` is false.
#[derive(Debug, Default)]
pub struct OpenAiChatFreeDriver;

impl OpenAiChatFreeDriver {
    async fn stream_non_blocking(
        &self,
        ctx: &DriverContext,
        config: &ProviderConfig,
        messages: &[Message],
        sink: &mut dyn TokenSink,
    ) -> GatewayResult<()> {
        sink.on_status(&format!("Connecting to {}…", config.display_name));

        let body = ChatRequest {
            model: model_name(config),
            messages,
            stream: false,
            max_tokens: config.max_output_tokens,
        };

        let response = ctx
            .http
            .post(&config.endpoint)
            .header("HTTP-Referer", "https://github.com/example/llm-inference-gateway")
            .header("X-Title", &ctx.product_name)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::unreachable(&config.id, e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::bad_status(&config.id, response.status().as_u16()));
        }

        let parsed: NonStreamResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::bad_response(&config.id, e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        synthetic_replay(&content, sink, ctx).await
    }
}

#[async_trait]
impl ProviderDriver for OpenAiChatFreeDriver {
    async fn stream(
        &self,
        ctx: &DriverContext,
        config: &ProviderConfig,
        messages: &[Message],
        sink: &mut dyn TokenSink,
    ) -> GatewayResult<()> {
        if !config.supports_streaming {
            return self.stream_non_blocking(ctx, config, messages, sink).await;
        }

        sink.on_status(&format!("Connecting to {}…", config.display_name));

        let body = ChatRequest {
            model: model_name(config),
            messages,
            stream: true,
            max_tokens: config.max_output_tokens,
        };

        let request = ctx
            .http
            .post(&config.endpoint)
            .header("HTTP-Referer", "https://github.com/example/llm-inference-gateway")
            .header("X-Title", &ctx.product_name)
            .json(&body);

        run_sse(request, ctx, config, sink).await
    }

    async fn probe(&self, ctx: &DriverContext, config: &ProviderConfig) -> bool {
        ctx.http.head(&config.endpoint).send().await.is_ok()
    }
}
