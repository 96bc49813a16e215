//! Binds a listener and serves the Axum app with graceful shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::info;

use crate::{
    routes::create_router,
    shutdown::{GracefulServer, ShutdownConfig},
    state::AppState,
};

/// Server bind/shutdown configuration, built from [`gateway_config::ServerSettings`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub bind_addr: String,
    /// Port to bind the listener to.
    pub port: u16,
    /// How long to wait for in-flight requests to drain on shutdown.
    pub shutdown_grace_period: Duration,
}

impl ServerConfig {
    /// Build a [`ServerConfig`] from the loaded [`gateway_config::GatewayConfig`]'s
    /// `server` settings.
    #[must_use]
    pub fn from_settings(settings: &gateway_config::ServerSettings) -> Self {
        Self {
            bind_addr: settings.bind_addr.clone(),
            port: settings.port,
            shutdown_grace_period: settings.shutdown_grace_period,
        }
    }

    fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind_addr, self.port).parse()
    }
}

/// Owns the bound listener and the [`AppState`] it serves.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Build a server that will bind and serve `state` once [`Server::run`]
    /// is called.
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Bind the configured address and serve until a shutdown signal
    /// (SIGTERM/SIGINT/ctrl-c) arrives, draining in-flight requests for
    /// up to `shutdown_grace_period` before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the address fails to parse or the listener
    /// fails to bind.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.socket_addr()?;
        let app = create_router(self.state.clone());

        let shutdown_config = ShutdownConfig::new()
            .with_graceful_timeout(self.config.shutdown_grace_period);
        let graceful = GracefulServer::new(shutdown_config);

        self.state.health().mark_initialized("config").await;
        self.state.health().mark_initialized("providers").await;
        self.state.health().mark_initialized("router").await;
        self.state.health().mark_initialized("metrics").await;

        let health = self.state.health().clone();
        let self_heal_interval = self.state.config().router.self_heal_interval;
        let self_heal_router = self.state.router().clone();
        graceful
            .run_until_shutdown(|coordinator| async move {
                info!(%addr, "binding gateway listener");
                let listener = tokio::net::TcpListener::bind(addr).await?;

                // The Router's self-heal sweep is opt-in and caller-driven
                // (spec.md §6): this is the timer that drives it while the
                // server is up. Cancelled alongside every other background
                // task on shutdown.
                let self_heal_task = tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(self_heal_interval);
                    ticker.tick().await; // first tick fires immediately
                    loop {
                        ticker.tick().await;
                        self_heal_router.self_heal().await;
                    }
                });
                coordinator.register_task(self_heal_task).await;

                let shutdown_signal = coordinator.shutdown_signal();
                axum::serve(listener, app.into_make_service())
                    .with_graceful_shutdown(async move {
                        shutdown_signal.await;
                        health.mark_shutting_down();
                    })
                    .await?;
                Ok(())
            })
            .await;

        Ok(())
    }
}
