//! Provider selection: spec.md §4.1's per-attempt candidate filter and
//! scoring sort.

use gateway_core::{CredentialKind, CredentialProvider, Health, ProviderConfig, ProviderKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Which credential kind a provider kind needs, for the narrow
/// `CredentialProvider::get` lookup. Only `OpenAiChat` maps to a
/// well-known kind; every other key-requiring provider uses `Generic`.
#[must_use]
pub fn credential_kind_for(kind: ProviderKind) -> CredentialKind {
    match kind {
        ProviderKind::OpenAiChat => CredentialKind::OpenAi,
        _ => CredentialKind::Generic,
    }
}

/// Filters and scores provider candidates per spec.md §4.1.
pub struct ProviderSelector;

impl ProviderSelector {
    /// Select the best candidate not in `excluded`, admissible per
    /// circuit-breaker state and credential availability, sorted by
    /// priority ascending then by descending health score.
    #[must_use]
    pub fn select<'a>(
        providers: &'a [ProviderConfig],
        health: &HashMap<String, Arc<Health>>,
        excluded: &HashSet<String>,
        circuit_reset_window: Duration,
        credential_provider: &dyn CredentialProvider,
    ) -> Option<&'a ProviderConfig> {
        let mut candidates: Vec<&ProviderConfig> = providers
            .iter()
            .filter(|p| !excluded.contains(&p.id))
            .filter(|p| {
                health
                    .get(&p.id)
                    .map(|h| h.is_available(circuit_reset_window))
                    .unwrap_or(true)
            })
            .filter(|p| {
                if !p.requires_key {
                    return true;
                }
                credential_provider
                    .get(credential_kind_for(p.kind))
                    .is_some()
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.priority.cmp(&b.priority).then_with(|| {
                let score_a = health.get(&a.id).map(Health::score).unwrap_or(0.0);
                let score_b = health.get(&b.id).map(Health::score).unwrap_or(0.0);
                score_b
                    .partial_cmp(&score_a)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });

        candidates.into_iter().next()
    }
}
