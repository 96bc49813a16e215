//! Synthetic streaming (spec.md §4.1.2): replay an already-complete
//! response at roughly word granularity so non-streaming upstreams still
//! feel like a stream to the caller.

use crate::driver::{DriverContext, TokenSink};
use gateway_core::{GatewayError, GatewayResult};
use std::time::Duration;

/// How often (in emitted pieces) the replay pauses. Spec.md calls this
/// "every fifth piece".
const PACE_EVERY: usize = 5;

/// The pacing delay itself. Exposed as a named constant (Open Question 4
/// in SPEC_FULL.md §9) rather than hardcoded inline, so deployments can
/// tune the UX without touching driver logic.
pub const PACE_DELAY: Duration = Duration::from_millis(15);

/// Split `text` into alternating whitespace/non-whitespace runs — the
/// Rust equivalent of `text.split(/(\s+)/)` with separators kept.
fn tokenize_with_separators(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut current_is_ws: Option<bool> = None;

    for (i, c) in text.char_indices() {
        let is_ws = c.is_whitespace();
        match current_is_ws {
            None => current_is_ws = Some(is_ws),
            Some(prev) if prev != is_ws => {
                pieces.push(&text[start..i]);
                start = i;
                current_is_ws = Some(is_ws);
            }
            _ => {}
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Emit `text` piece by piece via `sink.on_token`, pausing `PACE_DELAY`
/// every `PACE_EVERY` pieces. Returns `GatewayError::Cancelled` the
/// moment cancellation is observed, matching spec.md's "abort
/// immediately when cancellation is observed".
pub async fn synthetic_replay(
    text: &str,
    sink: &mut dyn TokenSink,
    ctx: &DriverContext,
) -> GatewayResult<()> {
    for (i, piece) in tokenize_with_separators(text).into_iter().enumerate() {
        if ctx.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        sink.on_token(piece);

        if (i + 1) % PACE_EVERY == 0 {
            tokio::time::sleep(PACE_DELAY).await;
            if ctx.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }
        }
    }
    Ok(())
}
