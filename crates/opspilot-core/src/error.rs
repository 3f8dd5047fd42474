//! Error types for opspilot-core
//!
//! This module provides error types and user-friendly error formatting.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// A required configuration asset has no usable version
    #[error("asset missing: {key}{}", version_suffix(.version))]
    AssetMissing {
        /// Logical asset key
        key: String,
        /// Requested version, `None` when the published version was asked for
        version: Option<String>,
    },

    /// Configuration store failed to answer
    #[error("configuration store error: {0}")]
    ConfigStore(String),

    /// Planning backend failed or returned something unusable
    #[error("planning error: {0}")]
    Planning(String),

    /// A routing decision violated the kind/payload contract
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// Invalid configuration
    #[error("invalid configuration: {field}")]
    InvalidConfig {
        /// Config field name
        field: String,
        /// Detailed message
        message: String,
    },

    /// A plan patch could not be applied
    #[error("patch error: {0}")]
    Patch(String),

    /// An operation exceeded its time budget
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// What timed out
        operation: String,
        /// Budget in seconds
        seconds: u64,
    },

    /// The caller cancelled the request
    #[error("request cancelled")]
    Cancelled,

    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] opspilot_llm::Error),

    /// Trace store error
    #[error("replay error: {0}")]
    Replay(#[from] opspilot_replay::Error),

    /// Internal error (serialization, etc.)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

fn version_suffix(version: &Option<String>) -> String {
    version
        .as_deref()
        .map(|v| format!(" (version {v})"))
        .unwrap_or_default()
}

impl Error {
    /// Whether this error is a broken internal contract that must fail the request
    #[must_use]
    pub fn is_internal_fault(&self) -> bool {
        matches!(self, Error::Consistency(_) | Error::Patch(_))
    }

    /// Raw trigger string reported in stage diagnostics when this error is recoverable
    #[must_use]
    pub fn trigger_code(&self) -> String {
        match self {
            Error::AssetMissing { .. } => "asset_missing".to_string(),
            Error::ConfigStore(_) => "config_store_unavailable".to_string(),
            Error::Planning(_) => "planning_failed".to_string(),
            Error::InvalidConfig { .. } => "invalid_config".to_string(),
            Error::Timeout { .. } => "timeout".to_string(),
            Error::Cancelled => "cancelled".to_string(),
            Error::Llm(opspilot_llm::Error::Timeout(_)) => "timeout".to_string(),
            Error::Llm(e) if e.is_transient() => "tool_error_retryable".to_string(),
            Error::Llm(_) => "planning_failed".to_string(),
            Error::Replay(_) => "trace_store_error".to_string(),
            Error::Consistency(_) | Error::Patch(_) | Error::Internal(_) => {
                "internal_error".to_string()
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(format!("serialization: {e}"))
    }
}

/// Trait for user-friendly error messages
///
/// Provides human-readable error messages and suggestions for fixing.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::AssetMissing { key, version } => match version {
                Some(v) => format!("📦 Asset '{}' has no version '{}'.", key, v),
                None => format!("📦 Asset '{}' has no published version.", key),
            },
            Error::ConfigStore(msg) => format!("🗄️ Configuration store unavailable: {}", msg),
            Error::Planning(msg) => format!("📋 Planning failed: {}", msg),
            Error::Consistency(msg) => format!("❌ Routing contract violated: {}", msg),
            Error::InvalidConfig { field, message } => {
                format!("⚙️ Configuration error in '{}': {}", field, message)
            }
            Error::Patch(msg) => format!("🩹 Could not apply plan patch: {}", msg),
            Error::Timeout { operation, seconds } => {
                format!("⏳ {} did not finish within {} seconds.", operation, seconds)
            }
            Error::Cancelled => "🛑 The request was cancelled.".to_string(),
            Error::Llm(e) => format!("🤖 LLM error: {}", e),
            Error::Replay(e) => format!("📼 Trace store error: {}", e),
            Error::Internal(msg) => format!("❌ Internal error: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::AssetMissing { key, .. } => Some(format!(
                "💡 Publish a version of '{}' in the asset manifest, or drop the override.",
                key
            )),
            Error::ConfigStore(_) => {
                Some("💡 Check that the asset manifest path in [assets] is readable.".to_string())
            }
            Error::Planning(_) => Some("💡 Try rephrasing the question.".to_string()),
            Error::InvalidConfig { field, .. } => Some(format!(
                "💡 Check the '{}' setting in config/default.toml or .env file.",
                field
            )),
            Error::Timeout { .. } => {
                Some("💡 Raise the timeout in [pipeline] or narrow the question.".to_string())
            }
            Error::Llm(_) => Some(
                "💡 Check that the LLM endpoint in [llm] is reachable and the model is pulled."
                    .to_string(),
            ),
            Error::Consistency(_) | Error::Patch(_) | Error::Internal(_) => {
                Some("💡 This is a bug. Please report it with the trace id.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = String::new();

    output.push_str(&error.user_message());
    output.push_str("\n\n");

    if let Some(suggestion) = error.suggestion() {
        output.push_str(&suggestion);
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_fault_classification() {
        assert!(Error::Consistency("kind mismatch".into()).is_internal_fault());
        assert!(Error::Patch("missing field".into()).is_internal_fault());
        assert!(!Error::Planning("bad json".into()).is_internal_fault());
        assert!(!Error::AssetMissing {
            key: "planning_prompt".into(),
            version: None
        }
        .is_internal_fault());
    }

    #[test]
    fn test_trigger_codes() {
        assert_eq!(
            Error::Timeout {
                operation: "routing".into(),
                seconds: 60
            }
            .trigger_code(),
            "timeout"
        );
        assert_eq!(
            Error::Llm(opspilot_llm::Error::Network("refused".into())).trigger_code(),
            "tool_error_retryable"
        );
        assert_eq!(
            Error::Llm(opspilot_llm::Error::InvalidResponse("nope".into())).trigger_code(),
            "planning_failed"
        );
    }

    #[test]
    fn test_asset_missing_display() {
        let err = Error::AssetMissing {
            key: "result_shaping".into(),
            version: Some("v9".into()),
        };
        assert_eq!(err.to_string(), "asset missing: result_shaping (version v9)");
    }

    #[test]
    fn test_format_error_for_cli() {
        let err = Error::InvalidConfig {
            field: "pipeline.max_replans".into(),
            message: "too large".into(),
        };
        let formatted = format_error_for_cli(&err);
        assert!(formatted.contains("pipeline.max_replans"));
        assert!(formatted.contains("💡"));
    }
}
