//! `opspilot assets check` - verify the asset manifest

use crate::app::{init, AppConfig};
use anyhow::{bail, Result};
use opspilot_core::{AssetKey, AssetResolver};
use std::sync::Arc;

/// Report which asset keys lack a published version
pub async fn check(config: &AppConfig) -> Result<()> {
    let store = init::load_assets(config)?;
    println!(
        "Manifest {} ({} versions)\n",
        config.assets.manifest.display(),
        store.version_count()
    );

    let resolver = AssetResolver::new(Arc::new(store));
    let missing = resolver.missing_published(&AssetKey::ALL).await?;
    for key in AssetKey::ALL {
        if missing.contains(&key) {
            println!("❌ {key}: no published version");
        } else {
            println!("✅ {key}");
        }
    }

    if !missing.is_empty() {
        bail!("{} asset key(s) have no published version", missing.len());
    }
    println!("\nAll asset keys resolve.");
    Ok(())
}
