//! Fixture-backed data source
//!
//! Serves canned rows per `source.operation`. Entries can require a
//! minimum lookback window, cap the requested row count, or always fail,
//! which is enough to drive every replan path offline.

use super::{DataSource, LookupError, LookupQuery, LookupResult};
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Canned response for one `source.operation`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureEntry {
    /// Rows returned on success
    #[serde(default)]
    pub rows: Vec<Value>,
    /// Rows are only visible when the lookback window is at least this wide
    #[serde(default)]
    pub min_window_hours: Option<u32>,
    /// Requests for more rows than this fail with `limit_exceeded`
    #[serde(default)]
    pub max_rows_ceiling: Option<u32>,
    /// Always fail with this error
    #[serde(default)]
    pub error: Option<LookupError>,
}

/// Data source answering from fixtures
#[derive(Debug, Clone, Default)]
pub struct StaticDataSource {
    entries: HashMap<String, FixtureEntry>,
}

impl StaticDataSource {
    /// Create an empty data source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fixture for `source.operation`
    #[must_use]
    pub fn with_entry(mut self, source: &str, operation: &str, entry: FixtureEntry) -> Self {
        self.entries.insert(format!("{source}.{operation}"), entry);
        self
    }

    /// Add a fixture returning fixed rows
    #[must_use]
    pub fn with_rows(self, source: &str, operation: &str, rows: Vec<Value>) -> Self {
        self.with_entry(
            source,
            operation,
            FixtureEntry {
                rows,
                ..Default::default()
            },
        )
    }

    /// Number of fixtures
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no fixtures
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load fixtures from JSON: `{"metrics.cpu_usage": {"rows": [...]}, ...}`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: HashMap<String, FixtureEntry> = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig {
                field: "data.fixtures".to_string(),
                message: e.to_string(),
            })?;
        debug!(fixtures = entries.len(), "Loaded data fixtures");
        Ok(Self { entries })
    }

    /// Load fixtures from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
            field: "data.fixtures".to_string(),
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let source = Self::from_json_str(&text)?;
        info!("Loaded {} data fixtures from {}", source.len(), path.display());
        Ok(source)
    }
}

#[async_trait::async_trait]
impl DataSource for StaticDataSource {
    async fn lookup(&self, query: &LookupQuery) -> LookupResult {
        let key = format!("{}.{}", query.source, query.operation);
        let Some(entry) = self.entries.get(&key) else {
            return LookupResult::error(
                "unsupported_operation",
                format!("no handler for {key}"),
            );
        };

        if let Some(error) = &entry.error {
            return LookupResult::error(error.code.clone(), error.message.clone());
        }
        if let Some(ceiling) = entry.max_rows_ceiling {
            if query.max_rows > ceiling {
                return LookupResult::error(
                    "limit_exceeded",
                    format!("{key} serves at most {ceiling} rows, {} requested", query.max_rows),
                );
            }
        }
        if let Some(min_window) = entry.min_window_hours {
            if query.time_window_hours < min_window {
                return LookupResult::ok(Vec::new());
            }
        }

        LookupResult::ok(entry.rows.clone())
    }
}
