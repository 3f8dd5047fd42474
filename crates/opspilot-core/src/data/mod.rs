//! Data - Lookup capability consumed by the execute stage
//!
//! The core does not define how relational or graph stores are queried. It
//! hands a [`LookupQuery`] to a [`DataSource`] and reads back a
//! `{status, rows, error}` shaped [`LookupResult`].

mod fixture;

#[cfg(test)]
mod tests;

pub use fixture::{FixtureEntry, StaticDataSource};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One lookup derived from a plan step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupQuery {
    /// Plan step id
    pub step_id: String,
    /// Data source name
    pub source: String,
    /// Operation on that source
    pub operation: String,
    /// Operation parameters
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Lookback window in hours
    pub time_window_hours: u32,
    /// Maximum rows requested
    pub max_rows: u32,
}

/// Lookup status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    /// Lookup succeeded (possibly with zero rows)
    Ok,
    /// Lookup failed
    Error,
}

/// Error reported by a lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupError {
    /// Raw error code, later normalized into a replan trigger
    pub code: String,
    /// Human-readable message
    pub message: String,
}

/// Result of one lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    /// Status
    pub status: LookupStatus,
    /// Returned rows
    #[serde(default)]
    pub rows: Vec<Value>,
    /// Error details when `status` is `error`
    #[serde(default)]
    pub error: Option<LookupError>,
}

impl LookupResult {
    /// Successful lookup
    #[must_use]
    pub fn ok(rows: Vec<Value>) -> Self {
        Self {
            status: LookupStatus::Ok,
            rows,
            error: None,
        }
    }

    /// Failed lookup
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: LookupStatus::Error,
            rows: Vec::new(),
            error: Some(LookupError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    /// Whether the lookup failed
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == LookupStatus::Error
    }
}

/// Data lookup capability
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Run one lookup; failures are reported in the result, not raised
    async fn lookup(&self, query: &LookupQuery) -> LookupResult;
}
