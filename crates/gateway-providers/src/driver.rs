//! The driver seam: one `stream` operation per provider protocol.
//!
//! Grounded on the teacher's `#[async_trait] impl LLMProvider for
//! AzureOpenAIProvider` shape (`azure.rs`), narrowed to the single
//! operation spec.md's driver interface names.

use async_trait::async_trait;
use gateway_core::{GatewayResult, Message, ProviderConfig};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

/// Receives tokens and optional status updates as a driver streams a
/// response. The Router supplies an implementation that both forwards to
/// the caller's callbacks and accumulates the full response string.
pub trait TokenSink: Send {
    /// A chunk of generated text.
    fn on_token(&mut self, token: &str);

    /// An optional human-readable status update (e.g. `"Connecting to
    /// Ollama..."`). Default is a no-op, matching spec.md's "optional"
    /// callback.
    fn on_status(&mut self, _status: &str) {}
}

/// Per-attempt context a driver needs beyond its own `ProviderConfig`:
/// the shared HTTP client, the resolved credential (if any), and the
/// cancellation signal for this chat.
pub struct DriverContext {
    /// Shared HTTP client (connection pooling across attempts/providers).
    pub http: reqwest::Client,
    /// Resolved credential for this provider, if `ProviderConfig::requires_key`.
    pub credential: Option<SecretString>,
    /// Tripped by `Router::cancel`; checked at every suspension point.
    pub cancellation: CancellationToken,
    /// Product name sent in `User-Agent`/`X-Title` headers.
    pub product_name: String,
}

impl DriverContext {
    /// Whether cancellation has been observed; drivers check this between
    /// network suspension points and between synthetic-replay tokens.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// One upstream protocol's streaming behavior (spec.md §4.1 "Driver
/// interface"). A driver never decides *whether* to be tried — the
/// Router's selection algorithm does that — it only knows how to talk to
/// one upstream.
#[async_trait]
pub trait ProviderDriver: Send + Sync {
    /// Stream a completion for `messages` into `sink`, observing
    /// `ctx.cancellation` at every suspension point. Returns `Ok(())` once
    /// the driver is done producing tokens (including via synthetic
    /// replay); any failure is returned as a `GatewayError`, never panics.
    async fn stream(
        &self,
        ctx: &DriverContext,
        config: &ProviderConfig,
        messages: &[Message],
        sink: &mut dyn TokenSink,
    ) -> GatewayResult<()>;

    /// Cheap reachability check used at Router initialization and by
    /// `SelfHeal`. Default: attempt a `stream` with no messages is too
    /// heavy, so each driver implements its own cheap probe.
    async fn probe(&self, ctx: &DriverContext, config: &ProviderConfig) -> bool;
}
