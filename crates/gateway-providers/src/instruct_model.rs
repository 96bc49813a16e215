//! InstructModel driver: a single-turn instruction-tuned completion
//! endpoint using the `[INST] ... [/INST]` prompt convention.

use crate::driver::{DriverContext, ProviderDriver, TokenSink};
use crate::synthetic::synthetic_replay;
use async_trait::async_trait;
use gateway_core::{GatewayError, GatewayResult, Message, MessageRole, ProviderConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
struct InstructRequest {
    inputs: String,
    parameters: InstructParameters,
}

#[derive(Debug, Serialize)]
struct InstructParameters {
    max_new_tokens: usize,
    temperature: f64,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedTextObject {
    generated_text: String,
}

fn build_prompt(messages: &[Message]) -> String {
    let system = messages
        .iter()
        .find(|m| m.role == MessageRole::System)
        .map(|m| m.content.as_str());
    let last_user = messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .map(|m| m.content.as_str())
        .unwrap_or("");

    match system {
        Some(system) if !system.is_empty() => {
            format!("<s>[INST] {system}\n\n{last_user} [/INST]")
        }
        _ => format!("<s>[INST] {last_user} [/INST]"),
    }
}

/// Extract `generated_text` from either `[{generated_text}]` or
/// `{generated_text}` response shapes, then trim any echoed prompt up to
/// the last `[/INST]` marker.
fn extract_generated_text(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let raw = if let Some(arr) = value.as_array() {
        arr.first()
            .and_then(|v| serde_json::from_value::<GeneratedTextObject>(v.clone()).ok())
            .map(|o| o.generated_text)
    } else {
        serde_json::from_value::<GeneratedTextObject>(value)
            .ok()
            .map(|o| o.generated_text)
    }?;

    Some(match raw.rfind("[/INST]") {
        Some(idx) => raw[idx + "[/INST]".len()..].trim_start().to_string(),
        None => raw,
    })
}

/// An instruction-tuned single-turn completion endpoint.
#[derive(Debug, Default)]
pub struct InstructModelDriver;

#[async_trait]
impl ProviderDriver for InstructModelDriver {
    async fn stream(
        &self,
        ctx: &DriverContext,
        config: &ProviderConfig,
        messages: &[Message],
        sink: &mut dyn TokenSink,
    ) -> GatewayResult<()> {
        sink.on_status(&format!("Connecting to {}…", config.display_name));

        let body = InstructRequest {
            inputs: build_prompt(messages),
            parameters: InstructParameters {
                max_new_tokens: config.max_output_tokens,
                temperature: 0.7,
                do_sample: true,
            },
        };

        let response = ctx
            .http
            .post(&config.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::unreachable(&config.id, e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::bad_status(&config.id, response.status().as_u16()));
        }

        let raw_body = response
            .text()
            .await
            .map_err(|e| GatewayError::bad_response(&config.id, e.to_string()))?;

        let text = extract_generated_text(&raw_body)
            .ok_or_else(|| GatewayError::bad_response(&config.id, "missing generated_text"))?;

        synthetic_replay(&text, sink, ctx).await
    }

    async fn probe(&self, ctx: &DriverContext, config: &ProviderConfig) -> bool {
        ctx.http.head(&config.endpoint).send().await.is_ok()
    }
}
