//! `Router`: the orchestration loop spec.md §4.1 describes — select a
//! provider, stream a completion through it, record the outcome, and
//! fall through on failure until something (ultimately Offline) answers.
//!
//! The teacher's own `gateway-routing` crate ships only a 26-line
//! `lib.rs` declaring modules whose bodies were not retrieved, so this
//! orchestration loop is written fresh against spec.md §4.1/§5/§7, using
//! the async-orchestration idiom visible elsewhere in the teacher
//! (acquire state, `.await` the operation, map errors, `tracing::instrument`)
//! and the `ProviderSelector`/`Health`/`ResponseCache` building blocks
//! this crate and its siblings already provide.

use crate::selector::{credential_kind_for, ProviderSelector};
use crate::truncation::truncate_for_context;
use gateway_core::{
    CacheEntry, CompletionResult, CredentialProvider, GatewayError, GatewayResult, Health,
    HealthSnapshot, Message, ProviderConfig, SystemStatus,
};
use gateway_providers::{DriverContext, DriverRegistry, ProviderDriver, TokenSink};
use gateway_resilience::ResponseCache;
use parking_lot::Mutex as SyncMutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Maximum number of attempts in the fall-through loop, including the
/// final Offline attempt (spec.md §4.1: "bounded (e.g. 6 tries including
/// Offline)").
const MAX_ATTEMPTS: usize = 6;

/// Reachability-probe deadline used at initialization and by `self_heal`.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Similarity threshold the Router itself uses for its secondary
/// near-duplicate cache lookup (spec.md §4.2: "Router uses 0.9").
const ROUTER_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Minimum response length to be worth caching (spec.md §3 "Lifecycles").
const CACHEABLE_MIN_LEN: usize = 50;

/// Callbacks a caller supplies to [`Router::chat`]. Only `on_token`,
/// `on_complete`, and `on_error` are required; the rest default to
/// no-ops, matching spec.md's "optional" callbacks.
pub trait ChatCallbacks: Send {
    /// A chunk of generated text, in wire/source order.
    fn on_token(&mut self, token: &str);

    /// A human-readable status update (e.g. `"Connecting to Ollama…"`).
    fn on_status(&mut self, _status: &str) {}

    /// Fired when the Router falls through from one provider to another.
    fn on_provider_switch(&mut self, _from: &str, _to: &str) {}

    /// The terminal, successful callback. `None` means the caller
    /// cancelled before a result was produced.
    fn on_complete(&mut self, result: Option<CompletionResult>);

    /// The terminal failure callback: every provider, including Offline,
    /// failed. Never called after a cancellation.
    fn on_error(&mut self, error: GatewayError);
}

/// Construction-time configuration for a [`Router`] (spec.md §6
/// `RouterConfig`).
pub struct RouterConfig {
    /// Configured upstream providers. The canonical Offline provider is
    /// appended automatically if the caller didn't include one, so
    /// "always respond" (spec.md §8 property 1) holds unconditionally.
    pub providers: Vec<ProviderConfig>,
    /// Cache capacity (spec.md: 150 when embedded in the Router).
    pub cache_max_size: usize,
    /// Cache entry TTL (spec.md: 60 minutes when embedded in the Router).
    pub cache_ttl: Duration,
    /// Circuit breaker reset window (spec.md §5: default 60s).
    pub circuit_reset_window: Duration,
    /// Self-heal sweep interval (spec.md §4.1: default 5 minutes). Not
    /// driven by the Router itself — `self_heal` is caller-invoked per
    /// spec.md §6 ("a timer owned by the caller").
    pub self_heal_interval: Duration,
    /// Credential capability used to resolve per-provider secrets.
    pub credential_provider: Arc<dyn CredentialProvider>,
    /// Sent as `User-Agent`/`X-Title` by drivers that need a product name.
    pub product_name: String,
}

impl RouterConfig {
    /// Construct a config with spec.md's Router-embedded cache defaults
    /// (150 entries, 60 minute TTL) and a 60s breaker reset window.
    #[must_use]
    pub fn new(providers: Vec<ProviderConfig>, credential_provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            providers,
            cache_max_size: 150,
            cache_ttl: Duration::from_secs(3600),
            circuit_reset_window: Duration::from_secs(60),
            self_heal_interval: Duration::from_secs(300),
            credential_provider,
            product_name: "gateway".to_string(),
        }
    }
}

/// Accumulates the full response while forwarding each token to the
/// caller's callback, per spec.md §8 property 2 ("concatenating the
/// arguments of `OnToken` calls in order yields exactly `result.content`").
struct AccumulatingSink<'a> {
    callbacks: &'a mut dyn ChatCallbacks,
    accumulated: String,
}

impl TokenSink for AccumulatingSink<'_> {
    fn on_token(&mut self, token: &str) {
        self.accumulated.push_str(token);
        self.callbacks.on_token(token);
    }

    fn on_status(&mut self, status: &str) {
        self.callbacks.on_status(status);
    }
}

/// Selects among configured providers, streams a completion, tracks
/// health, and always produces a response (falling through to Offline).
/// An explicit value the caller constructs — spec.md §9 rejects the
/// reference's module-level singleton in favor of this.
pub struct Router {
    providers: Vec<ProviderConfig>,
    health: HashMap<String, Arc<Health>>,
    cache: ResponseCache,
    drivers: DriverRegistry,
    http: reqwest::Client,
    credential_provider: Arc<dyn CredentialProvider>,
    circuit_reset_window: Duration,
    product_name: String,
    active_cancellation: SyncMutex<Option<CancellationToken>>,
    initialized: OnceCell<()>,
    total_requests: AtomicU64,
}

impl Router {
    /// Construct a Router. Does not perform any I/O; call
    /// [`Router::initialize`] (or simply [`Router::chat`], which calls it
    /// implicitly) to run the initial reachability probe.
    #[must_use]
    pub fn new(mut config: RouterConfig) -> Self {
        if !config.providers.iter().any(|p| p.kind == gateway_core::ProviderKind::Offline) {
            config.providers.push(ProviderConfig::offline());
        }

        let health = config
            .providers
            .iter()
            .map(|p| (p.id.clone(), Arc::new(Health::new(p.id.clone()))))
            .collect();

        Self {
            providers: config.providers,
            health,
            cache: ResponseCache::new(config.cache_max_size, config.cache_ttl),
            drivers: DriverRegistry::new(),
            http: reqwest::Client::new(),
            credential_provider: config.credential_provider,
            circuit_reset_window: config.circuit_reset_window,
            product_name: config.product_name,
            active_cancellation: SyncMutex::new(None),
            initialized: OnceCell::new(),
            total_requests: AtomicU64::new(0),
        }
    }

    /// Probe every non-Offline provider once. Idempotent: concurrent
    /// callers share a single probe pass (spec.md §4.1 "Initialization").
    pub async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async {
                for provider in &self.providers {
                    if provider.kind == gateway_core::ProviderKind::Offline {
                        continue;
                    }
                    self.probe_provider(provider).await;
                }
            })
            .await;
    }

    async fn probe_provider(&self, provider: &ProviderConfig) -> bool {
        let ctx = self.driver_context(provider);
        let driver = self.drivers.resolve(provider.kind);
        let reachable = tokio::time::timeout(PROBE_TIMEOUT, driver.probe(&ctx, provider))
            .await
            .unwrap_or(false);

        if let Some(health) = self.health.get(&provider.id) {
            if reachable {
                health.record_success(0, 100.0);
            } else {
                health.record_failure();
            }
        }
        reachable
    }

    fn driver_context(&self, provider: &ProviderConfig) -> DriverContext {
        let credential = if provider.requires_key {
            self.credential_provider.get(credential_kind_for(provider.kind))
        } else {
            None
        };
        DriverContext {
            http: self.http.clone(),
            credential,
            cancellation: CancellationToken::new(),
            product_name: self.product_name.clone(),
        }
    }

    /// Re-probe every currently-unhealthy non-Offline provider; a
    /// reachable response resets its breaker (spec.md §4.1 "Self-heal").
    pub async fn self_heal(&self) {
        for provider in &self.providers {
            if provider.kind == gateway_core::ProviderKind::Offline {
                continue;
            }
            let Some(health) = self.health.get(&provider.id) else {
                continue;
            };
            if health.snapshot().status != gateway_core::HealthStatus::Unhealthy {
                continue;
            }
            if self.probe_provider(provider).await {
                health.reset();
                info!(provider = %provider.id, "self-heal: provider reachable again");
            }
        }
    }

    /// Drop every cached response and reset hit/miss counters.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Trip the cancellation handle for the currently in-flight request,
    /// if any (spec.md §4.1 `Cancel()`).
    pub fn cancel(&self) {
        if let Some(token) = self.active_cancellation.lock().as_ref() {
            token.cancel();
        }
    }

    /// Current per-provider health snapshots (spec.md `ProviderHealth()`).
    #[must_use]
    pub fn provider_health(&self) -> Vec<HealthSnapshot> {
        self.providers
            .iter()
            .filter_map(|p| self.health.get(&p.id))
            .map(|h| h.snapshot())
            .collect()
    }

    /// Aggregate system status (spec.md `Status()`).
    #[must_use]
    pub fn status(&self) -> SystemStatus {
        let snapshots = self.provider_health();
        let non_offline: Vec<_> = self
            .providers
            .iter()
            .filter(|p| p.kind != gateway_core::ProviderKind::Offline)
            .collect();

        let healthy_count = snapshots
            .iter()
            .filter(|s| s.status == gateway_core::HealthStatus::Healthy)
            .count();
        let average_latency_ms = if snapshots.is_empty() {
            0.0
        } else {
            snapshots.iter().map(|s| s.average_latency_ms).sum::<f64>() / snapshots.len() as f64
        };
        let success_rate = if snapshots.is_empty() {
            1.0
        } else {
            snapshots.iter().map(|s| s.success_rate).sum::<f64>() / snapshots.len() as f64
        };

        SystemStatus {
            provider_count: non_offline.len(),
            healthy_provider_count: healthy_count,
            cache_hit_rate: self.cache.stats().hit_rate,
            average_latency_ms,
            success_rate,
            total_requests: self.total_requests.load(Ordering::Relaxed),
        }
    }

    fn check_cache(&self, messages: &[Message]) -> Option<CacheEntry> {
        let key = ResponseCache::fingerprint(messages);
        if self.cache.contains_fresh(&key) {
            self.cache.get(&key)
        } else {
            self.cache.get_similar(messages, ROUTER_SIMILARITY_THRESHOLD)
        }
    }

    /// Non-streaming convenience: collect the full completion. Resolves
    /// with the result (possibly offline content) unless the Router
    /// itself errors out (spec.md §7 "`Complete` rejects only if `Chat`
    /// emits `OnError`").
    pub async fn complete(&self, messages: Vec<Message>) -> GatewayResult<CompletionResult> {
        struct Collector {
            result: Option<GatewayResult<Option<CompletionResult>>>,
        }
        impl ChatCallbacks for Collector {
            fn on_token(&mut self, _token: &str) {}
            fn on_complete(&mut self, result: Option<CompletionResult>) {
                self.result = Some(Ok(result));
            }
            fn on_error(&mut self, error: GatewayError) {
                self.result = Some(Err(error));
            }
        }

        let mut collector = Collector { result: None };
        self.chat(messages, &mut collector).await;

        match collector.result {
            Some(Ok(Some(result))) => Ok(result),
            Some(Ok(None)) => Err(GatewayError::Cancelled),
            Some(Err(e)) => Err(e),
            None => Err(GatewayError::internal("chat completed without a terminal callback")),
        }
    }

    /// Stream a completion (spec.md §4.1 `Chat()`). Exactly one of
    /// `on_complete`/`on_error` fires, unless the caller cancels, in
    /// which case `on_complete(None)` fires and `on_error` never does.
    #[instrument(skip(self, messages, callbacks))]
    pub async fn chat(&self, messages: Vec<Message>, callbacks: &mut dyn ChatCallbacks) {
        self.initialize().await;
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if let Some(entry) = self.check_cache(&messages) {
            callbacks.on_complete(Some(CompletionResult {
                content: entry.content,
                provider: entry.provider,
                model: entry.model,
                tokens_used: 0,
                latency_ms: 0,
                from_cache: true,
                quality_score: entry.quality,
            }));
            return;
        }

        let cancellation = CancellationToken::new();
        *self.active_cancellation.lock() = Some(cancellation.clone());

        let primary_context_tokens = ProviderSelector::select(
            &self.providers,
            &self.health,
            &HashSet::new(),
            self.circuit_reset_window,
            self.credential_provider.as_ref(),
        )
        .map_or(4096, |p| p.context_tokens);
        let messages = truncate_for_context(&messages, primary_context_tokens);

        let mut excluded: HashSet<String> = HashSet::new();
        let mut previous_provider_name: Option<String> = None;
        let mut last_error: Option<GatewayError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if cancellation.is_cancelled() {
                callbacks.on_complete(None);
                *self.active_cancellation.lock() = None;
                return;
            }

            let Some(provider) = ProviderSelector::select(
                &self.providers,
                &self.health,
                &excluded,
                self.circuit_reset_window,
                self.credential_provider.as_ref(),
            ) else {
                break;
            };
            let provider = provider.clone();

            if let Some(prev) = &previous_provider_name {
                if *prev != provider.display_name {
                    callbacks.on_provider_switch(prev, &provider.display_name);
                }
            }
            previous_provider_name = Some(provider.display_name.clone());

            callbacks.on_status(&format!("Connecting to {}…", provider.display_name));

            let mut ctx = self.driver_context(&provider);
            ctx.cancellation = cancellation.clone();
            let driver = self.drivers.resolve(provider.kind);

            let started = Instant::now();
            let mut sink = AccumulatingSink {
                callbacks,
                accumulated: String::new(),
            };

            let attempt_result = tokio::time::timeout(
                provider.timeout,
                driver.stream(&ctx, &provider, &messages, &mut sink),
            )
            .await;

            let accumulated = sink.accumulated;

            let outcome = match attempt_result {
                Ok(result) => result,
                Err(_) => Err(GatewayError::driver_timeout(&provider.id, provider.timeout)),
            };

            match outcome {
                Ok(()) => {
                    let latency_ms = started.elapsed().as_millis() as u64;
                    let quality = gateway_providers::score_quality(&accumulated);
                    if let Some(health) = self.health.get(&provider.id) {
                        health.record_success(latency_ms, quality);
                    }
                    if accumulated.len() > CACHEABLE_MIN_LEN {
                        self.cache.set(&messages, accumulated.clone(), provider.id.clone(), provider.model_hint.clone().unwrap_or_default(), quality);
                    }
                    callbacks.on_complete(Some(CompletionResult {
                        content: accumulated,
                        provider: provider.id.clone(),
                        model: provider.model_hint.clone().unwrap_or_default(),
                        tokens_used: gateway_core::estimate_tokens(&messages.iter().map(|m| m.content.clone()).collect::<Vec<_>>().join(" ")),
                        latency_ms,
                        from_cache: false,
                        quality_score: quality,
                    }));
                    *self.active_cancellation.lock() = None;
                    return;
                }
                Err(err) if err.is_cancelled() => {
                    callbacks.on_complete(None);
                    *self.active_cancellation.lock() = None;
                    return;
                }
                Err(err) => {
                    warn!(provider = %provider.id, error = %err, "provider attempt failed");
                    if let Some(health) = self.health.get(&provider.id) {
                        health.record_failure();
                    }
                    last_error = Some(err);
                    excluded.insert(provider.id.clone());
                    let backoff = Duration::from_millis(u64::min(500 * (attempt as u64 + 1), 2000));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        *self.active_cancellation.lock() = None;
        callbacks.on_error(last_error.unwrap_or(GatewayError::NoProvidersAvailable));
    }
}
