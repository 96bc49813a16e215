//! # Gateway Server
//!
//! HTTP front door for the inference gateway.
//!
//! This crate provides:
//! - An Axum-based HTTP server exposing an OpenAI-compatible chat
//!   completions endpoint backed by the Provider Router
//! - A management API for the Webhook Dispatcher
//! - Enterprise health check system (liveness/readiness/startup/deep)
//! - Graceful shutdown handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handlers;
pub mod health;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

pub use error::ApiError;
pub use health::{
    ComponentHealth, HealthChecker, HealthConfig, HealthResponse, HealthStatus, LivenessResponse,
    ProviderHealthResult, ReadinessResponse, StartupResponse,
};
pub use routes::create_router;
pub use server::{Server, ServerConfig};
pub use shutdown::{
    GracefulServer, RequestGuard, ShutdownConfig, ShutdownCoordinator, ShutdownEvent,
    ShutdownPhase, ShutdownStats,
};
pub use state::{AppState, AppStateBuilder};
