//! Orchestrator core structure
//!
//! Contains the main `Orchestrator` struct and its builder methods.

use crate::assets::{AssetResolver, ConfigStore};
use crate::cache::{CacheBackend, CacheStats, RoutePlanCache};
use crate::config::CoreConfig;
use crate::control::ControlLoop;
use crate::data::DataSource;
use crate::error::Result;
use crate::pipeline::{Stage, StageExecutor};
use crate::router::{PlanRouter, PlanningBackend};
use opspilot_replay::TraceStoreTrait;
use std::sync::Arc;
use tracing::info;

/// Ties routing, the stage pipeline and the control loop together
pub struct Orchestrator {
    pub(crate) config: CoreConfig,
    pub(crate) backend: Arc<dyn PlanningBackend>,
    pub(crate) resolver: AssetResolver,
    pub(crate) router: PlanRouter,
    pub(crate) executor: StageExecutor,
    pub(crate) control: ControlLoop,
    pub(crate) trace_store: Option<Arc<dyn TraceStoreTrait>>,
}

impl Orchestrator {
    /// Create an orchestrator with the in-memory route cache
    ///
    /// Fails when `config` is out of range.
    pub fn new(
        config: CoreConfig,
        assets: Arc<dyn ConfigStore>,
        backend: Arc<dyn PlanningBackend>,
        data: Arc<dyn DataSource>,
    ) -> Result<Self> {
        config.validate()?;

        let resolver = AssetResolver::new(assets);
        let cache = Arc::new(RoutePlanCache::in_memory(
            config.cache_capacity,
            config.cache_ttl,
            config.cache_max_question_chars,
        ));
        let router = PlanRouter::new(
            backend.clone(),
            resolver.clone(),
            cache,
            config.routing_timeout,
        );
        let executor = StageExecutor::new(resolver.clone(), data, &config);
        let control = ControlLoop::new(config.max_replans);

        info!(
            backend = backend.name(),
            max_replans = config.max_replans,
            latency_ceiling_secs = config.latency_ceiling().as_secs(),
            "Orchestrator initialized"
        );

        Ok(Self {
            config,
            backend,
            resolver,
            router,
            executor,
            control,
            trace_store: None,
        })
    }

    /// Use a different route cache backend (e.g. a shared store)
    #[must_use]
    pub fn with_cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        let cache = Arc::new(RoutePlanCache::new(
            backend,
            self.config.cache_ttl,
            self.config.cache_max_question_chars,
        ));
        self.router = PlanRouter::new(
            self.backend.clone(),
            self.resolver.clone(),
            cache,
            self.config.routing_timeout,
        );
        self
    }

    /// Replace one pipeline stage
    #[must_use]
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.executor = self.executor.with_stage(stage);
        self
    }

    /// Persist every finished request to a trace store
    #[must_use]
    pub fn with_trace_store(mut self, store: Arc<dyn TraceStoreTrait>) -> Self {
        self.trace_store = Some(store);
        self
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Asset resolver shared by the router and the stages
    #[must_use]
    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// Route cache counters
    pub async fn cache_stats(&self) -> CacheStats {
        self.router.cache().stats().await
    }
}
