//! Ollama - Local Ollama API provider
//!
//! Local inference keeps operational questions on-premises; the planning
//! backend talks to `/api/chat` with JSON output mode.

#![allow(missing_docs)]

pub mod convert;
pub mod provider;
pub mod security;
pub mod types;

#[cfg(test)]
mod tests;

pub use provider::OllamaProvider;
pub use types::{OllamaConfig, DEFAULT_MODEL};
