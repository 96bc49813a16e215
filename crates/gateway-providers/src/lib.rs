//! # Gateway Providers
//!
//! Driver implementations for each upstream protocol the Router can
//! speak (spec.md §4.1 "Driver interface"):
//! - `LocalChat` — an Ollama-style local server.
//! - `OpenAiChat` / `OpenAiChatFree` — OpenAI-compatible chat APIs, with
//!   and without a bearer token.
//! - `SimpleTextGet` — a bare GET-based text endpoint.
//! - `InstructModel` — an instruction-tuned single-turn endpoint.
//! - `Offline` — the always-available canned-template fallback.
//!
//! Plus the shared quality-scoring heuristic and synthetic-streaming
//! replay every non-natively-streaming driver falls back to.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod driver;
pub mod instruct_model;
pub mod local_chat;
pub mod offline;
pub mod openai;
pub mod quality;
pub mod registry;
pub mod simple_text_get;
pub mod synthetic;

pub use driver::{DriverContext, ProviderDriver, TokenSink};
pub use instruct_model::InstructModelDriver;
pub use local_chat::LocalChatDriver;
pub use offline::{OfflineDriver, OFFLINE_QUALITY};
pub use openai::{OpenAiChatDriver, OpenAiChatFreeDriver};
pub use quality::score_quality;
pub use registry::DriverRegistry;
pub use simple_text_get::SimpleTextGetDriver;
pub use synthetic::{synthetic_replay, PACE_DELAY};
