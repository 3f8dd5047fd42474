//! Asset resolver

use super::{AssetKey, AssetVersion, ConfigStore};
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Resolves logical asset keys to concrete versions
#[derive(Clone)]
pub struct AssetResolver {
    store: Arc<dyn ConfigStore>,
}

impl AssetResolver {
    /// Create a resolver over a configuration store
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    /// Resolve one key for this request
    ///
    /// An override in `ctx.asset_overrides` wins over the published version.
    /// A key with no usable version is [`Error::AssetMissing`], never an
    /// empty default.
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn resolve(&self, key: &str, ctx: &ExecutionContext) -> Result<AssetVersion> {
        if let Some(version_id) = ctx.asset_overrides.get(key) {
            debug!(key, version_id = %version_id, "Resolving overridden asset");
            return self
                .store
                .version(key, version_id)
                .await?
                .ok_or_else(|| Error::AssetMissing {
                    key: key.to_string(),
                    version: Some(version_id.clone()),
                });
        }

        self.store
            .published(key)
            .await?
            .ok_or_else(|| Error::AssetMissing {
                key: key.to_string(),
                version: None,
            })
    }

    /// Resolve several keys; the first failure aborts
    pub async fn resolve_all(
        &self,
        keys: &[AssetKey],
        ctx: &ExecutionContext,
    ) -> Result<BTreeMap<String, AssetVersion>> {
        let mut resolved = BTreeMap::new();
        for key in keys {
            let asset = self.resolve(key.as_str(), ctx).await?;
            resolved.insert(key.as_str().to_string(), asset);
        }
        Ok(resolved)
    }

    /// Keys from `keys` that cannot be resolved without overrides
    pub async fn missing_published(&self, keys: &[AssetKey]) -> Result<Vec<AssetKey>> {
        let mut missing = Vec::new();
        for key in keys {
            if self.store.published(key.as_str()).await?.is_none() {
                missing.push(*key);
            }
        }
        Ok(missing)
    }
}
