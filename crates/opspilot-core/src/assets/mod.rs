//! Assets - Versioned configuration lookups
//!
//! Stages and the router never read configuration directly. They ask the
//! [`AssetResolver`] for a logical key; the resolver returns the version
//! pinned by the request's overrides, or the published version otherwise.

mod resolver;
mod store;


pub use resolver::AssetResolver;
pub use store::{AssetManifest, ConfigStore, InMemoryConfigStore, ManifestEntry};

#[cfg(test)]
pub use store::MockConfigStore;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Logical asset keys used by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKey {
    /// Router instructions
    PlanningPrompt,
    /// Router constraints (allowed sources, limits)
    PlanningConstraints,
    /// Validate stage rules
    ValidationRules,
    /// Compose stage rules
    ResultShaping,
    /// Present stage policy
    PresentationPolicy,
}

impl AssetKey {
    /// All keys the core knows about
    pub const ALL: [AssetKey; 5] = [
        AssetKey::PlanningPrompt,
        AssetKey::PlanningConstraints,
        AssetKey::ValidationRules,
        AssetKey::ResultShaping,
        AssetKey::PresentationPolicy,
    ];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanningPrompt => "planning_prompt",
            Self::PlanningConstraints => "planning_constraints",
            Self::ValidationRules => "validation_rules",
            Self::ResultShaping => "result_shaping",
            Self::PresentationPolicy => "presentation_policy",
        }
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AssetKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown asset key: {s}"))
    }
}

/// A concrete version of a configuration asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetVersion {
    /// Logical key
    pub key: String,
    /// Version identifier
    pub version_id: String,
    /// Asset payload
    pub payload: Value,
    /// Whether this is the published version
    pub published: bool,
}

impl AssetVersion {
    /// Create an asset version
    #[must_use]
    pub fn new(key: impl Into<String>, version_id: impl Into<String>, payload: Value) -> Self {
        Self {
            key: key.into(),
            version_id: version_id.into(),
            payload,
            published: false,
        }
    }

    /// Mark as published
    #[must_use]
    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }

    /// Text body of the asset (`payload.text`, or the payload itself when it is a string)
    #[must_use]
    pub fn text(&self) -> &str {
        match &self.payload {
            Value::String(s) => s,
            other => other.get("text").and_then(Value::as_str).unwrap_or(""),
        }
    }

    /// Unsigned integer field of the payload
    #[must_use]
    pub fn u64_field(&self, field: &str) -> Option<u64> {
        self.payload.get(field).and_then(Value::as_u64)
    }

    /// String field of the payload
    #[must_use]
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }

    /// List-of-strings field of the payload (non-strings are skipped)
    #[must_use]
    pub fn str_list(&self, field: &str) -> Vec<String> {
        self.payload
            .get(field)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
