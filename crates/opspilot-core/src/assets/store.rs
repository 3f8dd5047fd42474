//! Configuration store seam and its in-memory implementation

use super::AssetVersion;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Read interface over the configuration store
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ConfigStore: Send + Sync {
    /// Currently published version of a key, if any
    async fn published(&self, key: &str) -> Result<Option<AssetVersion>>;

    /// A specific version of a key, if it exists
    async fn version(&self, key: &str, version_id: &str) -> Result<Option<AssetVersion>>;
}

/// One entry in an asset manifest file
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    /// Logical key
    pub key: String,
    /// Version identifier
    pub version: String,
    /// Whether this version is the published one
    #[serde(default)]
    pub published: bool,
    /// Asset payload
    #[serde(default)]
    pub payload: Value,
}

/// TOML asset manifest (`[[assets]]` tables)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetManifest {
    /// All asset versions
    #[serde(default)]
    pub assets: Vec<ManifestEntry>,
}

/// Configuration store held in memory
///
/// At most one version per key is published; publishing a new version
/// unpublishes the previous one.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigStore {
    assets: HashMap<String, Vec<AssetVersion>>,
}

impl InMemoryConfigStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a version (builder form)
    #[must_use]
    pub fn with_asset(mut self, asset: AssetVersion) -> Self {
        self.insert(asset);
        self
    }

    /// Add or replace a version
    pub fn insert(&mut self, asset: AssetVersion) {
        let versions = self.assets.entry(asset.key.clone()).or_default();
        if asset.published {
            for existing in versions.iter_mut() {
                existing.published = false;
            }
        }
        versions.retain(|v| v.version_id != asset.version_id);
        versions.push(asset);
    }

    /// Number of stored versions across all keys
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.assets.values().map(Vec::len).sum()
    }

    /// Keys with at least one version
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.assets.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Build a store from TOML manifest text
    pub fn from_toml_str(manifest: &str) -> Result<Self> {
        let manifest: AssetManifest = toml::from_str(manifest).map_err(|e| {
            Error::ConfigStore(format!("invalid asset manifest: {e}"))
        })?;

        let mut store = Self::new();
        for entry in manifest.assets {
            let mut asset = AssetVersion::new(entry.key, entry.version, entry.payload);
            asset.published = entry.published;
            store.insert(asset);
        }

        debug!(versions = store.version_count(), "Loaded asset manifest");
        Ok(store)
    }

    /// Build a store from a TOML manifest file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigStore(format!("failed to read {}: {e}", path.display()))
        })?;
        let store = Self::from_toml_str(&text)?;
        info!("Loaded {} asset versions from {}", store.version_count(), path.display());
        Ok(store)
    }
}

#[async_trait::async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn published(&self, key: &str) -> Result<Option<AssetVersion>> {
        Ok(self
            .assets
            .get(key)
            .and_then(|versions| versions.iter().rev().find(|v| v.published))
            .cloned())
    }

    async fn version(&self, key: &str, version_id: &str) -> Result<Option<AssetVersion>> {
        Ok(self
            .assets
            .get(key)
            .and_then(|versions| versions.iter().find(|v| v.version_id == version_id))
            .cloned())
    }
}
