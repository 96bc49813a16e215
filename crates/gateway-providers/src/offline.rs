//! The always-available Offline driver: a canned template responder
//! selected by keyword match, replayed synthetically. Scored quality 50
//! unconditionally per spec.md §4.1 ("Offline is scored quality 50").

use crate::driver::{DriverContext, ProviderDriver, TokenSink};
use crate::synthetic::synthetic_replay;
use async_trait::async_trait;
use gateway_core::{GatewayResult, Message, ProviderConfig};

const LANDING_PAGE_TEMPLATE: &str = "Here's a starting point for a landing page: a hero section with a clear headline and call-to-action, a features grid, social proof, and a footer with contact details. I can flesh out any section in more depth once a provider is reachable.";

const DASHBOARD_TEMPLATE: &str = "For an admin dashboard, start with a left-hand navigation rail, a top bar with the current scope/tenant selector, and a content area organized into cards: key metrics up top, a detail table below, with a reusable `DataTable` component backing search/sort/paginate.";

const CODE_TEMPLATE: &str = "Here's a React + TypeScript component sketch:\n\n```tsx\ninterface Props {\n  title: string;\n}\n\nexport function Panel({ title }: Props) {\n  return <div className=\"panel\"><h2>{title}</h2></div>;\n}\n```\n";

const GREETING_TEMPLATE: &str = "Hello! I'm currently running in offline mode because no upstream provider was reachable, but I can still help sketch out ideas, outline code, or talk through a plan.";

const DEFAULT_TEMPLATE: &str = "I'm running in offline mode right now, so I can't reach a live model, but here's a general outline I can offer based on your message. Let me know if you'd like me to go deeper on any part once connectivity is restored.";

/// Pick a canned response by simple keyword match against the last user
/// message, per spec.md §4.1.
fn select_template(messages: &[Message]) -> &'static str {
    let last_user = messages
        .iter()
        .rev()
        .find(|m| m.role == gateway_core::MessageRole::User)
        .map(|m| m.content.to_lowercase())
        .unwrap_or_default();

    if ["landing page", "website", "homepage"]
        .iter()
        .any(|kw| last_user.contains(kw))
    {
        LANDING_PAGE_TEMPLATE
    } else if ["dashboard", "admin", "analytics"]
        .iter()
        .any(|kw| last_user.contains(kw))
    {
        DASHBOARD_TEMPLATE
    } else if ["react", "component", "typescript"]
        .iter()
        .any(|kw| last_user.contains(kw))
    {
        CODE_TEMPLATE
    } else if last_user.contains("help")
        || ["hi", "hello", "hey"].iter().any(|kw| last_user == *kw)
    {
        GREETING_TEMPLATE
    } else {
        DEFAULT_TEMPLATE
    }
}

/// Quality score always assigned to Offline responses (spec.md §4.1).
pub const OFFLINE_QUALITY: f64 = 50.0;

/// The offline template responder.
#[derive(Debug, Default)]
pub struct OfflineDriver;

#[async_trait]
impl ProviderDriver for OfflineDriver {
    async fn stream(
        &self,
        ctx: &DriverContext,
        _config: &ProviderConfig,
        messages: &[Message],
        sink: &mut dyn TokenSink,
    ) -> GatewayResult<()> {
        let template = select_template(messages);
        synthetic_replay(template, sink, ctx).await
    }

    async fn probe(&self, _ctx: &DriverContext, _config: &ProviderConfig) -> bool {
        true
    }
}
