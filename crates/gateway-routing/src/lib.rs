//! # Gateway Routing
//!
//! The Provider Router (spec.md §4.1): candidate selection and scoring,
//! context-window truncation, and the `Router` orchestration loop that
//! streams a completion through a chosen provider, falls through on
//! failure, and always produces a response.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod router;
pub mod selector;
pub mod truncation;

pub use router::{ChatCallbacks, Router, RouterConfig};
pub use selector::{credential_kind_for, ProviderSelector};
pub use truncation::truncate_for_context;
