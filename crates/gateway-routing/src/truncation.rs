//! Context-window truncation (spec.md §4.1 "Context truncation").
//!
//! No teacher analog — the teacher's own `gateway-routing` crate ships no
//! retrieved body for this concern — so this is written fresh against
//! spec.md, following the token-estimate convention (`ceil(len/4)`)
//! already established in `gateway_core::message::estimate_tokens`.

use gateway_core::{estimate_tokens, Message, MessageRole};

/// Suffix appended when the newest user message alone exceeds budget and
/// must be hard-truncated.
const TRUNCATION_SUFFIX: &str = "\n...[truncated]";

/// Fraction of `context_tokens` the truncated history is allowed to use.
const BUDGET_FRACTION: f64 = 0.8;

/// Truncate `messages` to fit within `context_tokens`, per spec.md:
/// - the `system` message, if any, is always kept;
/// - remaining messages are added newest-to-oldest while the running
///   estimate stays below `0.8 * context_tokens`;
/// - the newest `user` message is always included, truncated by
///   character length (treating 4 chars ≈ 1 token) with a
///   `"\n...[truncated]"` suffix if it alone would exceed the budget.
#[must_use]
pub fn truncate_for_context(messages: &[Message], context_tokens: usize) -> Vec<Message> {
    let budget = (context_tokens as f64 * BUDGET_FRACTION) as usize;

    let system = messages.iter().find(|m| m.role == MessageRole::System).cloned();
    let system_tokens = system.as_ref().map_or(0, |m| estimate_tokens(&m.content));

    let Some(newest_user_idx) = messages.iter().rposition(|m| m.role == MessageRole::User) else {
        // No user message at all: just keep system (if any) plus whatever
        // fits, newest-first.
        return fill_newest_first(messages, system, system_tokens, budget, None);
    };

    let newest_user = &messages[newest_user_idx];
    let newest_user_tokens = estimate_tokens(&newest_user.content);

    let remaining_for_user = budget.saturating_sub(system_tokens);
    let newest_user_fits = newest_user_tokens <= remaining_for_user;

    let truncated_newest_user = if newest_user_fits {
        newest_user.clone()
    } else {
        let remaining_chars = (remaining_for_user * 4).saturating_sub(TRUNCATION_SUFFIX.len());
        let mut content = truncate_chars(&newest_user.content, remaining_chars);
        content.push_str(TRUNCATION_SUFFIX);
        Message::new(newest_user.role, content)
    };

    fill_newest_first(
        messages,
        system,
        system_tokens,
        budget,
        Some((newest_user_idx, truncated_newest_user)),
    )
}

fn fill_newest_first(
    messages: &[Message],
    system: Option<Message>,
    system_tokens: usize,
    budget: usize,
    pinned_user: Option<(usize, Message)>,
) -> Vec<Message> {
    let mut used = system_tokens;
    let mut kept: Vec<(usize, Message)> = Vec::new();

    if let Some((idx, msg)) = &pinned_user {
        used += estimate_tokens(&msg.content);
        kept.push((*idx, msg.clone()));
    }

    for (idx, m) in messages.iter().enumerate().rev() {
        if m.role == MessageRole::System {
            continue;
        }
        if pinned_user.as_ref().is_some_and(|(pinned_idx, _)| *pinned_idx == idx) {
            continue;
        }
        let cost = estimate_tokens(&m.content);
        if used + cost >= budget {
            continue;
        }
        used += cost;
        kept.push((idx, m.clone()));
    }

    kept.sort_by_key(|(idx, _)| *idx);

    let mut out = Vec::with_capacity(kept.len() + 1);
    if let Some(system) = system {
        out.push(system);
    }
    out.extend(kept.into_iter().map(|(_, m)| m));
    out
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
