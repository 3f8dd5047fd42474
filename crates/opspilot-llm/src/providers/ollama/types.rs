use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Ollama model (instruction-tuned, good at JSON output)
pub const DEFAULT_MODEL: &str = "qwen2.5:7b";

/// Default Ollama API URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

// ============================================================================
// API Types
// ============================================================================

/// Request for the Ollama chat endpoint
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest {
    /// The model name to use
    pub model: String,
    /// List of messages in the conversation
    pub messages: Vec<OllamaMessage>,
    /// Additional model options (temperature, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
    /// Whether to stream the response
    pub stream: bool,
    /// Output format constraint ("json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Message format for Ollama chat
#[derive(Debug, Serialize)]
pub struct OllamaMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Model configuration options for Ollama
#[derive(Debug, Serialize)]
pub struct OllamaOptions {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Response from the Ollama chat endpoint
#[derive(Debug, Deserialize)]
pub struct OllamaChatResponse {
    /// The model used to generate the response
    pub model: String,
    /// The generated message
    pub message: OllamaResponseMessage,
    /// Why generation stopped
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Number of tokens in the prompt
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    /// Number of tokens generated
    #[serde(default)]
    pub eval_count: Option<u32>,
}

/// Message format in Ollama responses
#[derive(Debug, Deserialize)]
pub struct OllamaResponseMessage {
    /// Content of the message
    pub content: String,
}

/// Error response from Ollama API
#[derive(Debug, Deserialize)]
pub struct OllamaError {
    /// Error message
    pub error: String,
}

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL (default: http://localhost:11434)
    pub base_url: String,
    /// Default model
    pub default_model: String,
    /// Default max tokens
    pub default_max_tokens: u32,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_max_tokens: 2048,
            timeout: Duration::from_secs(120),
        }
    }
}

impl OllamaConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let base_url = std::env::var("OLLAMA_BASE_URL")
            .or_else(|_| std::env::var("OLLAMA_HOST"))
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let default_model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Self {
            base_url,
            default_model,
            ..Self::default()
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the default max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
