use super::*;
use crate::cache::{CacheBackend, CachedRoute};
use crate::config::CoreConfig;
use crate::context::ExecutionContext;
use crate::control::{QueryOutcome, ReplanDecision, ReplanTrigger};
use crate::data::{FixtureEntry, StaticDataSource};
use crate::error::{Error, Result};
use crate::pipeline::StageName;
use crate::plan::{DirectAnswerPayload, PlanOutput, RouteKind};
use crate::router::{MockPlanningBackend, PlanningResponse};
use crate::test_support::asset_store;
use opspilot_replay::{MemoryTraceStore, TraceOutcome, TraceStoreTrait};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn data() -> StaticDataSource {
    StaticDataSource::new().with_entry(
        "metrics",
        "cpu_usage",
        FixtureEntry {
            rows: vec![json!({"host": "web-1", "cpu": 0.93}), json!({"host": "web-2", "cpu": 0.4})],
            min_window_hours: Some(48),
            ..Default::default()
        },
    )
}

fn backend(times: usize) -> MockPlanningBackend {
    let mut backend = MockPlanningBackend::new();
    backend.expect_name().return_const("mock".to_string());
    backend
        .expect_classify_and_plan()
        .times(times)
        .returning(|req| {
            if req.question.to_lowercase().starts_with("hello") {
                Ok(PlanningResponse {
                    kind: "direct".into(),
                    payload: json!({"answer_text": "Hello! Ask me about your services.", "confidence": 0.95}),
                    reasoning: "greeting".into(),
                })
            } else {
                Ok(PlanningResponse {
                    kind: "plan".into(),
                    payload: json!({"steps": [{"id": "s1", "source": "metrics", "operation": "cpu_usage"}]}),
                    reasoning: "needs metrics".into(),
                })
            }
        });
    backend
}

fn orchestrator(backend: MockPlanningBackend) -> Orchestrator {
    Orchestrator::new(
        CoreConfig::default(),
        Arc::new(asset_store()),
        Arc::new(backend),
        Arc::new(data()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_hello_is_answered_directly() {
    let store = Arc::new(MemoryTraceStore::new());
    let orch = orchestrator(backend(1)).with_trace_store(store.clone());

    let result = orch.process(QueryRequest::new("acme", "hello")).await.unwrap();

    assert_eq!(result.outcome, QueryOutcome::Success);
    assert!(result.is_answered());
    assert!(result.final_blocks.is_empty());
    assert_eq!(result.message, "Hello! Ask me about your services.");
    assert!(result.replan_events.is_empty());
    let stages: Vec<StageName> = result.stage_outputs.iter().map(|o| o.stage).collect();
    assert_eq!(stages, vec![StageName::RoutePlan, StageName::Present]);

    let record = store.get_trace(result.trace_id).await.unwrap();
    assert_eq!(record.route_kind.as_deref(), Some("direct"));
    assert_eq!(record.outcome, TraceOutcome::Success);
    assert_eq!(record.stages.len(), 2);
    assert_eq!(record.payload["message"], "Hello! Ask me about your services.");
}

#[tokio::test]
async fn test_repeated_greeting_hits_cache() {
    let orch = orchestrator(backend(1));

    orch.process(QueryRequest::new("acme", "hello")).await.unwrap();
    let second = orch.process(QueryRequest::new("acme", "  Hello  ")).await.unwrap();

    assert!(second.cache_hit);
    assert!(second.plan_output.unwrap().as_direct().unwrap().cache_hit);
    let stats = orch.cache_stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_empty_result_replanned_once() {
    let store = Arc::new(MemoryTraceStore::new());
    let orch = orchestrator(backend(1)).with_trace_store(store.clone());

    let result = orch
        .process(QueryRequest::new("acme", "cpu on web hosts").with_user("u-7"))
        .await
        .unwrap();

    assert_eq!(result.outcome, QueryOutcome::Success);
    assert_eq!(result.replan_events.len(), 1);
    assert_eq!(result.replan_events[0].trigger, ReplanTrigger::EmptyResult);
    assert_eq!(result.replan_events[0].decision, ReplanDecision::AutoRetry);
    assert_eq!(result.final_blocks.len(), 1);
    assert_eq!(result.final_references.len(), 1);
    assert_eq!(result.display_model.block_order, vec!["block-s1".to_string()]);

    let record = store.get_trace(result.trace_id).await.unwrap();
    assert_eq!(record.replan_count, 1);
    assert_eq!(record.user_id.as_deref(), Some("u-7"));
    assert_eq!(record.stage_runs("execute").count(), 2);
    assert_eq!(
        record.stage_runs("execute").next().unwrap().counts["rows"],
        0
    );
}

#[tokio::test]
async fn test_routing_failure_is_rendered() {
    let mut backend = MockPlanningBackend::new();
    backend.expect_name().return_const("mock".to_string());
    backend
        .expect_classify_and_plan()
        .returning(|_| Err(Error::Planning("reply was prose".into())));
    let orch = orchestrator(backend);

    let result = orch.process(QueryRequest::new("acme", "cpu")).await.unwrap();

    assert_eq!(result.outcome, QueryOutcome::Guidance);
    assert!(result.plan_output.is_none());
    assert!(!result.message.is_empty());
    assert_eq!(result.replan_events.len(), 1);
    assert_eq!(result.replan_events[0].stage, StageName::RoutePlan);
    assert_eq!(
        result.stage_outputs[0].diagnostics.errors[0].code,
        "planning_failed"
    );
}

struct CorruptCache;

#[async_trait::async_trait]
impl CacheBackend for CorruptCache {
    async fn get(&self, _key: &str) -> Result<Option<CachedRoute>> {
        Ok(Some(CachedRoute {
            kind: RouteKind::Reject,
            output: PlanOutput::direct(DirectAnswerPayload::new("hi", 1.0)),
        }))
    }

    async fn insert(&self, _key: String, _value: CachedRoute, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(1)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "corrupt"
    }
}

#[tokio::test]
async fn test_consistency_fault_fails_request() {
    let orch = orchestrator(backend(0)).with_cache_backend(Arc::new(CorruptCache));

    let err = orch.process(QueryRequest::new("acme", "hello")).await.unwrap_err();

    assert!(matches!(err, Error::Consistency(_)));
}

#[tokio::test]
async fn test_baseline_diff() {
    let store = Arc::new(MemoryTraceStore::new());
    let orch = orchestrator(backend(2)).with_trace_store(store.clone());

    let baseline = orch
        .process(QueryRequest::new("acme", "cpu on web hosts"))
        .await
        .unwrap();
    let rerun = orch
        .process(
            QueryRequest::new("acme", "cpu on web hosts")
                .with_test_mode(true)
                .with_asset_override("result_shaping", "rs-strict")
                .with_baseline(baseline.trace_id),
        )
        .await
        .unwrap();

    assert_eq!(rerun.outcome, QueryOutcome::ActionRequested);
    let diff = rerun.baseline_diff.unwrap();
    assert!(diff.question_same);
    assert!(!diff.outcome_same);
    assert_eq!(diff.replan_count_diff, 0);
    assert!(diff.has_stage_changes());

    let record = store.get_trace(rerun.trace_id).await.unwrap();
    assert!(record.test_mode);
    assert_eq!(record.baseline_trace_id, Some(baseline.trace_id));
}

#[tokio::test]
async fn test_missing_baseline_is_not_fatal() {
    let orch = orchestrator(backend(1)).with_trace_store(Arc::new(MemoryTraceStore::new()));

    let result = orch
        .process(QueryRequest::new("acme", "hello").with_baseline(uuid::Uuid::new_v4()))
        .await
        .unwrap();

    assert!(result.baseline_diff.is_none());
}

#[tokio::test]
async fn test_persistence_failure_is_not_fatal() {
    let store = Arc::new(MemoryTraceStore::new());
    let orch = orchestrator(backend(1)).with_trace_store(store.clone());
    let ctx = ExecutionContext::new("acme", "hello");

    orch.process_context(ctx.clone()).await.unwrap();
    // Same trace id again: the store rejects it, the request still succeeds.
    let again = orch.process_context(ctx).await.unwrap();

    assert_eq!(again.outcome, QueryOutcome::Success);
    assert_eq!(store.len().await, 1);
}

#[test]
fn test_invalid_config_rejected() {
    let result = Orchestrator::new(
        CoreConfig::default().with_cache_capacity(0),
        Arc::new(asset_store()),
        Arc::new(MockPlanningBackend::new()),
        Arc::new(data()),
    );
    assert!(matches!(result, Err(Error::InvalidConfig { .. })));
}

#[test]
fn test_request_into_context() {
    let baseline = uuid::Uuid::new_v4();
    let ctx = QueryRequest::new("acme", "cpu")
        .with_user("u-1")
        .with_test_mode(true)
        .with_asset_override("planning_prompt", "pp-2")
        .with_baseline(baseline)
        .into_context();

    assert_eq!(ctx.tenant_id, "acme");
    assert_eq!(ctx.user_id.as_deref(), Some("u-1"));
    assert!(ctx.test_mode);
    assert_eq!(ctx.asset_overrides["planning_prompt"], "pp-2");
    assert_eq!(ctx.baseline_trace_id, Some(baseline));
    assert_eq!(ctx.attempt, 1);
}
