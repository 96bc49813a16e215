//! # Gateway Telemetry
//!
//! Structured logging (`tracing` + `tracing-subscriber`) and a small
//! `prometheus`-backed metrics surface shared by the Router, Cache, and
//! Dispatcher.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;

pub use logging::{init, LoggingConfig, LoggingError};
pub use metrics::Metrics;
