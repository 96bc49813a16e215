//! Shared application state handed to every Axum handler.
//!
//! Grounded on the teacher's `AppState::builder()` construction style
//! (seen referenced from `routes.rs`'s own tests) but rebuilt around
//! this workspace's own `Router`/`Dispatcher` rather than the teacher's
//! `ProviderRegistry`/`CircuitBreaker` pair — spec.md §9 rejects
//! module-level singletons in favor of an explicit value the caller
//! constructs, and this is that value for the HTTP front door.

use std::sync::Arc;
use std::time::Instant;

use gateway_config::{EnvCredentialProvider, GatewayConfig};
use gateway_core::CredentialProvider;
use gateway_routing::{Router, RouterConfig};
use gateway_telemetry::Metrics;
use gateway_webhooks::{Dispatcher, DispatcherConfig};

use crate::health::HealthChecker;

/// Everything a handler needs: the Router, the Dispatcher, metrics, and
/// the health checker, plus the configuration they were built from.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    config: GatewayConfig,
    router: Arc<Router>,
    dispatcher: Dispatcher,
    metrics: Arc<Metrics>,
    health: Arc<HealthChecker>,
    started_at: Instant,
}

impl AppState {
    /// Start building an [`AppState`].
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }

    /// The configuration this state was built from.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// The Provider Router.
    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.inner.router
    }

    /// The Webhook Dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// The shared Prometheus registry.
    #[must_use]
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// The health checker backing `/health`, `/ready`, and `/live`.
    #[must_use]
    pub fn health(&self) -> &Arc<HealthChecker> {
        &self.inner.health
    }

    /// Wall-clock time since this state (and its Router/Dispatcher) was
    /// constructed.
    #[must_use]
    pub fn uptime(&self) -> std::time::Duration {
        self.inner.started_at.elapsed()
    }
}

/// Builder for [`AppState`]. `config()` is the only input most callers
/// need to supply; everything else defaults sensibly for tests and
/// simple deployments.
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<GatewayConfig>,
    credential_provider: Option<Arc<dyn CredentialProvider>>,
    metrics: Option<Arc<Metrics>>,
}

impl AppStateBuilder {
    /// Use this configuration to build the Router and Dispatcher.
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the credential provider the Router resolves secrets
    /// through. Defaults to [`EnvCredentialProvider`].
    #[must_use]
    pub fn credential_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credential_provider = Some(provider);
        self
    }

    /// Share an existing `Metrics` registry instead of building a fresh
    /// one (useful so multiple `AppState`s in tests don't each try to
    /// register the same Prometheus collector names).
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Construct the `AppState`. Does not perform any I/O: the Router's
    /// reachability probe runs lazily on first `chat`/`complete` call
    /// (or an explicit `initialize()`).
    #[must_use]
    pub fn build(self) -> AppState {
        let config = self.config.unwrap_or_default();
        let credential_provider = self
            .credential_provider
            .unwrap_or_else(|| Arc::new(EnvCredentialProvider) as Arc<dyn CredentialProvider>);

        let mut router_config =
            RouterConfig::new(config.providers.clone(), credential_provider);
        router_config.cache_max_size = config.router.cache_max_size;
        router_config.cache_ttl = config.router.cache_ttl;
        router_config.circuit_reset_window = config.router.circuit_reset_window;
        router_config.self_heal_interval = config.router.self_heal_interval;
        router_config.product_name.clone_from(&config.product_name);

        let mut dispatcher_config = DispatcherConfig::new(config.product_name.clone());
        dispatcher_config.default_timeout = config.webhooks.default_timeout;

        AppState {
            inner: Arc::new(Inner {
                router: Arc::new(Router::new(router_config)),
                dispatcher: Dispatcher::new(dispatcher_config),
                metrics: self.metrics.unwrap_or_else(|| Arc::new(Metrics::new())),
                health: Arc::new(HealthChecker::with_defaults()),
                config,
                started_at: Instant::now(),
            }),
        }
    }
}
