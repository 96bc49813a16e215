//! Maps each `ProviderKind` to its driver instance. Drivers are
//! stateless beyond their own internal defaults, so one instance per
//! kind is shared across every configured provider of that kind.

use crate::driver::ProviderDriver;
use crate::instruct_model::InstructModelDriver;
use crate::local_chat::LocalChatDriver;
use crate::offline::OfflineDriver;
use crate::openai::{OpenAiChatDriver, OpenAiChatFreeDriver};
use crate::simple_text_get::SimpleTextGetDriver;
use gateway_core::ProviderKind;
use std::sync::Arc;

/// Resolves a `ProviderKind` to its `Arc<dyn ProviderDriver>`.
#[derive(Clone)]
pub struct DriverRegistry {
    local_chat: Arc<dyn ProviderDriver>,
    openai_chat: Arc<dyn ProviderDriver>,
    openai_chat_free: Arc<dyn ProviderDriver>,
    simple_text_get: Arc<dyn ProviderDriver>,
    instruct_model: Arc<dyn ProviderDriver>,
    offline: Arc<dyn ProviderDriver>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self {
            local_chat: Arc::new(LocalChatDriver),
            openai_chat: Arc::new(OpenAiChatDriver),
            openai_chat_free: Arc::new(OpenAiChatFreeDriver),
            simple_text_get: Arc::new(SimpleTextGetDriver),
            instruct_model: Arc::new(InstructModelDriver),
            offline: Arc::new(OfflineDriver),
        }
    }
}

impl DriverRegistry {
    /// Build the registry of built-in drivers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `kind` to its shared driver instance.
    #[must_use]
    pub fn resolve(&self, kind: ProviderKind) -> Arc<dyn ProviderDriver> {
        match kind {
            ProviderKind::LocalChat => self.local_chat.clone(),
            ProviderKind::OpenAiChat => self.openai_chat.clone(),
            ProviderKind::OpenAiChatFree => self.openai_chat_free.clone(),
            ProviderKind::SimpleTextGet => self.simple_text_get.clone(),
            ProviderKind::InstructModel => self.instruct_model.clone(),
            ProviderKind::Offline => self.offline.clone(),
        }
    }
}
