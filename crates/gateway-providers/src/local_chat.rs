//! LocalChat driver: an Ollama-style local server speaking
//! newline-delimited JSON over `/api/chat`.

use crate::driver::{DriverContext, ProviderDriver, TokenSink};
use async_trait::async_trait;
use futures_util::StreamExt;
use gateway_core::{GatewayError, GatewayResult, Message, ProviderConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reachability/model-listing timeout, per spec.md §5.
const TAGS_TIMEOUT: Duration = Duration::from_secs(3);

/// Model name prefixes preferred when picking from `/api/tags`, in
/// priority order, matched case-insensitively.
const PREFERRED_PREFIXES: &[&str] = &["llama3.2", "llama3.1", "llama3", "mistral", "codellama", "phi3"];

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagsModel>,
}

#[derive(Debug, Deserialize)]
struct TagsModel {
    name: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct ChatLine {
    #[serde(default)]
    message: Option<ChatLineMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct ChatLineMessage {
    #[serde(default)]
    content: String,
}

/// The local Ollama-style chat driver.
#[derive(Debug, Default)]
pub struct LocalChatDriver;

impl LocalChatDriver {
    async fn list_models(&self, ctx: &DriverContext, config: &ProviderConfig) -> GatewayResult<Vec<String>> {
        let url = format!("{}/api/tags", config.endpoint);
        let response = ctx
            .http
            .get(&url)
            .timeout(TAGS_TIMEOUT)
            .send()
            .await
            .map_err(|e| GatewayError::unreachable(&config.id, e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::bad_status(&config.id, response.status().as_u16()));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::bad_response(&config.id, e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn pick_model(&self, models: &[String], hint: Option<&str>) -> Option<String> {
        if let Some(hint) = hint {
            if models.iter().any(|m| m == hint) {
                return Some(hint.to_string());
            }
        }
        for prefix in PREFERRED_PREFIXES {
            if let Some(m) = models
                .iter()
                .find(|m| m.to_lowercase().starts_with(prefix))
            {
                return Some(m.clone());
            }
        }
        models.first().cloned()
    }
}

#[async_trait]
impl ProviderDriver for LocalChatDriver {
    async fn stream(
        &self,
        ctx: &DriverContext,
        config: &ProviderConfig,
        messages: &[Message],
        sink: &mut dyn TokenSink,
    ) -> GatewayResult<()> {
        let models = self.list_models(ctx, config).await?;
        let model = self
            .pick_model(&models, config.model_hint.as_deref())
            .ok_or_else(|| GatewayError::bad_response(&config.id, "no models available"))?;

        sink.on_status(&format!("Connecting to {}…", config.display_name));

        let url = format!("{}/api/chat", config.endpoint);
        let body = ChatRequest {
            model: &model,
            messages,
            stream: true,
            options: ChatOptions {
                temperature: 0.7,
                num_predict: config.max_output_tokens,
            },
        };

        let response = ctx
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::unreachable(&config.id, e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::bad_status(&config.id, response.status().as_u16()));
        }

        let mut byte_stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = byte_stream.next().await {
            if ctx.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            let chunk = chunk.map_err(|e| GatewayError::unreachable(&config.id, e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].trim().to_string();
                buffer.drain(..=pos);
                if line.is_empty() {
                    continue;
                }

                let parsed: ChatLine = serde_json::from_str(&line)
                    .map_err(|e| GatewayError::bad_response(&config.id, e.to_string()))?;

                if let Some(msg) = parsed.message {
                    if !msg.content.is_empty() {
                        sink.on_token(&msg.content);
                    }
                }
                if parsed.done {
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    async fn probe(&self, ctx: &DriverContext, config: &ProviderConfig) -> bool {
        self.list_models(ctx, config).await.is_ok()
    }
}
