//! Wiring
//!
//! Builds the orchestrator and trace store from an [`AppConfig`].

use super::config::AppConfig;
use anyhow::{Context, Result};
use opspilot_core::{InMemoryConfigStore, LlmPlanningBackend, Orchestrator, StaticDataSource};
use opspilot_llm::{OllamaConfig, OllamaProvider};
use opspilot_replay::{TraceStore, TraceStoreTrait};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Load the configuration assets named by `[assets]`
pub fn load_assets(config: &AppConfig) -> Result<InMemoryConfigStore> {
    InMemoryConfigStore::from_file(&config.assets.manifest).with_context(|| {
        format!(
            "Failed to load asset manifest {}",
            config.assets.manifest.display()
        )
    })
}

/// Open the trace database named by `[replay]`
pub async fn open_trace_store(config: &AppConfig) -> Result<TraceStore> {
    let path = config.replay.db_path();
    TraceStore::from_path(&path)
        .await
        .with_context(|| format!("Failed to open trace store {}", path.display()))
}

/// Build an orchestrator over the Ollama planning backend and fixture data
pub async fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    let assets = load_assets(config)?;
    let data = StaticDataSource::from_file(&config.data.fixtures).with_context(|| {
        format!("Failed to load data fixtures {}", config.data.fixtures.display())
    })?;

    let ollama = OllamaConfig::new()
        .with_base_url(&config.llm.base_url)
        .with_model(&config.llm.model)
        .with_max_tokens(config.llm.max_tokens)
        .with_timeout(Duration::from_secs(config.llm.timeout_secs));
    let provider = OllamaProvider::new(ollama).context("Failed to create Ollama provider")?;
    let backend = LlmPlanningBackend::new(Arc::new(provider))
        .with_model(&config.llm.model)
        .with_max_tokens(config.llm.max_tokens);

    let mut orchestrator = Orchestrator::new(
        config.core_config(),
        Arc::new(assets),
        Arc::new(backend),
        Arc::new(data),
    )
    .context("Invalid pipeline configuration")?;

    if config.replay.enabled {
        let store: Arc<dyn TraceStoreTrait> = Arc::new(open_trace_store(config).await?);
        orchestrator = orchestrator.with_trace_store(store);
        info!(path = %config.replay.db_path().display(), "Trace persistence enabled");
    }

    Ok(orchestrator)
}
