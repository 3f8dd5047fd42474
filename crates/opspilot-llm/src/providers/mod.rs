//! Concrete LLM transports

pub mod ollama;
