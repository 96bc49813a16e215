//! Provider configuration: the immutable descriptor for one upstream.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which upstream protocol a provider speaks. Resolves to a concrete
/// `ProviderDriver` at Router construction time (see `gateway-providers`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// A local Ollama-style chat server.
    LocalChat,
    /// An OpenAI-compatible chat API requiring a bearer token.
    OpenAiChat,
    /// An OpenAI-compatible chat API that requires no credential.
    OpenAiChatFree,
    /// A bare GET-based text completion endpoint.
    SimpleTextGet,
    /// An instruction-tuned single-turn completion endpoint.
    InstructModel,
    /// The always-available offline template responder.
    Offline,
}

impl ProviderKind {
    /// Whether this kind ever requires a credential. `Offline` never does.
    #[must_use]
    pub fn can_require_key(&self) -> bool {
        !matches!(self, Self::Offline)
    }
}

/// Immutable descriptor for one upstream provider. Created at startup and
/// never mutated afterwards; mutable runtime state lives in [`crate::Health`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Stable, unique identifier.
    pub id: String,
    /// Human-readable name used in status messages and switch events.
    pub display_name: String,
    /// Upstream protocol kind.
    pub kind: ProviderKind,
    /// Base URL of the upstream.
    pub endpoint: String,
    /// Preferred model name/hint, where the protocol supports selection.
    pub model_hint: Option<String>,
    /// Selection priority; lower sorts first.
    pub priority: i32,
    /// Context window budget, in estimated tokens.
    pub context_tokens: usize,
    /// Maximum tokens the provider is asked to generate.
    pub max_output_tokens: usize,
    /// Per-attempt timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Whether a credential must be present for this provider to be a
    /// selection candidate.
    pub requires_key: bool,
    /// Whether the driver streams tokens incrementally (as opposed to
    /// requiring synthetic replay of one aggregate response).
    pub supports_streaming: bool,
}

/// Priority value reserved for the Offline provider: always sorts last,
/// and is always considered available regardless of health or credentials.
pub const OFFLINE_PRIORITY: i32 = i32::MAX;

impl ProviderConfig {
    /// Build the canonical Offline provider descriptor.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            id: "offline".to_string(),
            display_name: "Offline".to_string(),
            kind: ProviderKind::Offline,
            endpoint: String::new(),
            model_hint: None,
            priority: OFFLINE_PRIORITY,
            context_tokens: 8192,
            max_output_tokens: 1024,
            timeout: Duration::from_secs(5),
            requires_key: false,
            supports_streaming: false,
        }
    }
}
