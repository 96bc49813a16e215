//! Bind-and-serve test server wrapping the real gateway router, plus
//! small request/assertion helpers shared across the suite.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use gateway_config::GatewayConfig;
use gateway_server::AppState;
use once_cell::sync::Lazy;
use reqwest::{Client, Response};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

static PORT_COUNTER: AtomicU16 = AtomicU16::new(18080);

static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Install the tracing subscriber once, gated on `TEST_LOG` so normal
/// test runs stay quiet.
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A real gateway HTTP server bound to a loopback port for the
/// lifetime of the test, serving `gateway_server::create_router`.
pub struct TestServer {
    /// The client, reusable across requests.
    pub client: Client,
    base_url: String,
    state: AppState,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Bind and serve `state` on a fresh loopback port.
    pub async fn start(state: AppState) -> Self {
        let port = next_port();
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr).await.expect("bind test listener");
        let actual_addr = listener.local_addr().expect("local_addr");

        let router = gateway_server::create_router(state.clone());
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("test server crashed");
        });

        tokio::time::sleep(Duration::from_millis(30)).await;

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("build reqwest client"),
            base_url: format!("http://{actual_addr}"),
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Start a server built from the given configuration.
    pub async fn with_config(config: GatewayConfig) -> Self {
        Self::start(AppState::builder().config(config).build()).await
    }

    /// Start a server over an offline-only default configuration.
    pub async fn with_default_config() -> Self {
        Self::with_config(GatewayConfig::default()).await
    }

    /// The `AppState` this server is serving, for inspecting the Router
    /// or Dispatcher directly alongside HTTP assertions.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET path`.
    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.expect("GET request failed")
    }

    /// `POST path` with a JSON body.
    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    /// `PATCH path` with a JSON body.
    pub async fn patch_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PATCH request failed")
    }

    /// `DELETE path`.
    pub async fn delete(&self, path: &str) -> Response {
        self.client.delete(self.url(path)).send().await.expect("DELETE request failed")
    }

    /// Parse `response` as JSON.
    pub async fn json_body(response: Response) -> Value {
        response.json().await.expect("response was not valid JSON")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Assert `response` carries `expected` as its status code.
pub fn assert_status(response: &Response, expected: u16) {
    assert_eq!(
        response.status().as_u16(),
        expected,
        "expected status {expected}, got {}",
        response.status()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        init_tracing();
        let server = TestServer::with_default_config().await;
        let response = server.get("/health").await;
        assert_status(&response, 200);
    }

    #[tokio::test]
    async fn models_endpoint_starts_empty_with_no_configured_providers() {
        let server = TestServer::with_default_config().await;
        let response = server.get("/v1/models").await;
        assert_status(&response, 200);
    }
}
