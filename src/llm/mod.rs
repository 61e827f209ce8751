//! LLM provider clients and abstractions.

pub mod client;
#[cfg(feature = "ollama")]
pub mod ollama;

pub use client::{classify_provider_error, LlmClient, Provider};
