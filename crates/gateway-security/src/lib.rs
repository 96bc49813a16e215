//! # Gateway Security
//!
//! Cryptographic primitives shared by the rest of the workspace —
//! currently SHA-256/512 hashing and constant-time HMAC-SHA256, which
//! `gateway-webhooks` uses to sign and verify delivery payloads.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod crypto;
pub mod error;

pub use crypto::{generate_token, HashingService};
pub use error::{Result, SecurityError};
