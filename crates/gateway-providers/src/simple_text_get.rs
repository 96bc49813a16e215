//! SimpleTextGet driver: encodes the whole conversation into a single
//! URL path segment and GETs it — the simplest possible upstream shape.

use crate::driver::{DriverContext, ProviderDriver, TokenSink};
use crate::synthetic::synthetic_replay;
use async_trait::async_trait;
use gateway_core::{GatewayError, GatewayResult, Message, ProviderConfig};

/// Responses shorter than this are treated as malformed (spec.md §4.1).
const MIN_RESPONSE_LEN: usize = 10;

fn encode_conversation(messages: &[Message]) -> String {
    let joined = messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");
    url::form_urlencoded::byte_serialize(joined.as_bytes()).collect()
}

/// A bare GET-based text completion endpoint.
#[derive(Debug, Default)]
pub struct SimpleTextGetDriver;

#[async_trait]
impl ProviderDriver for SimpleTextGetDriver {
    async fn stream(
        &self,
        ctx: &DriverContext,
        config: &ProviderConfig,
        messages: &[Message],
        sink: &mut dyn TokenSink,
    ) -> GatewayResult<()> {
        sink.on_status(&format!("Connecting to {}…", config.display_name));

        let encoded = encode_conversation(messages);
        let url = format!("{}/{}", config.endpoint, encoded);

        let response = ctx
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::unreachable(&config.id, e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::bad_status(&config.id, response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::bad_response(&config.id, e.to_string()))?;

        if body.starts_with("<!DOCTYPE") || body.len() < MIN_RESPONSE_LEN {
            return Err(GatewayError::bad_response(
                &config.id,
                "response body looks like an error page or is too short",
            ));
        }

        synthetic_replay(&body, sink, ctx).await
    }

    async fn probe(&self, ctx: &DriverContext, config: &ProviderConfig) -> bool {
        ctx.http.get(&config.endpoint).send().await.is_ok()
    }
}
