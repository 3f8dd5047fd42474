//! Opspilot LLM - Planning backend transport
//!
//! This crate provides the LLM plumbing the planning backend talks through:
//! - Provider: the `LlmProvider` trait every transport implements
//! - Message/Completion: request and response types
//! - Mock: queue-driven provider for tests and offline runs
//! - Ollama: local Ollama HTTP provider

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod provider;
pub mod providers;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use provider::LlmProvider;
pub use providers::ollama::{OllamaConfig, OllamaProvider};
