//! Shared fixtures for unit tests

use crate::assets::{AssetKey, AssetResolver, InMemoryConfigStore};
use crate::context::ExecutionContext;
use crate::pipeline::{Stage, StageCall, StageName, StageReport};
use crate::plan::{Plan, PlanOutput, PlanStep};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) const ASSETS: &str = r#"
[[assets]]
key = "planning_prompt"
version = "pp-1"
published = true
payload = { text = "Classify the question as direct, plan or reject." }

[[assets]]
key = "planning_constraints"
version = "pc-1"
published = true
payload = { sources = ["metrics", "logs"] }

[[assets]]
key = "validation_rules"
version = "vr-1"
published = true
payload = { max_steps = 4, max_rows_cap = 500, allowed_sources = ["metrics", "logs"], blocked_operations = ["logs.purge"] }

[[assets]]
key = "result_shaping"
version = "rs-1"
published = true
payload = { min_evidence = 1 }

[[assets]]
key = "result_shaping"
version = "rs-strict"
payload = { min_evidence = 2 }

[[assets]]
key = "presentation_policy"
version = "pr-1"
published = true
payload = { layout = "stack", references_policy = "footnote", hidden_block_types = [] }
"#;

pub(crate) fn asset_store() -> InMemoryConfigStore {
    match InMemoryConfigStore::from_toml_str(ASSETS) {
        Ok(store) => store,
        Err(e) => panic!("test manifest is invalid: {e}"),
    }
}

pub(crate) fn resolver() -> AssetResolver {
    AssetResolver::new(Arc::new(asset_store()))
}

pub(crate) fn cpu_plan() -> PlanOutput {
    PlanOutput::plan(Plan::new(vec![
        PlanStep::new("s1", "metrics", "cpu_usage").with_param("host", "web-1".into())
    ]))
    .with_reasoning("needs live metrics")
}

/// Wraps a stage and counts its calls
pub(crate) struct CountingStage {
    inner: Arc<dyn Stage>,
    calls: Arc<AtomicUsize>,
}

impl CountingStage {
    pub(crate) fn wrap(inner: Arc<dyn Stage>) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                inner,
                calls: calls.clone(),
            }),
            calls,
        )
    }
}

#[async_trait::async_trait]
impl Stage for CountingStage {
    fn name(&self) -> StageName {
        self.inner.name()
    }

    fn required_assets(&self) -> &[AssetKey] {
        self.inner.required_assets()
    }

    async fn run(&self, call: StageCall<'_>, ctx: &mut ExecutionContext) -> StageReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.run(call, ctx).await
    }
}
