use opspilot_core::control::{MAX_ROWS_PATH, TIME_WINDOW_PATH};
use opspilot_core::data::{FixtureEntry, LookupError};
use opspilot_core::{
    CoreConfig, DirectAnswerPayload, Error, InMemoryConfigStore, Orchestrator, PlanOutput,
    PlanningBackend, PlanningRequest, PlanningResponse, QueryOutcome, QueryRequest,
    ReplanDecision, ReplanTrigger, RoutePlanCache, RouteKind, StageName, StaticDataSource,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const MANIFEST: &str = r#"
[[assets]]
key = "planning_prompt"
version = "pp-1"
published = true
payload = { text = "Classify the question." }

[[assets]]
key = "planning_constraints"
version = "pc-1"
published = true
payload = { sources = ["metrics"] }

[[assets]]
key = "validation_rules"
version = "vr-1"
published = true
payload = { max_steps = 4, max_rows_cap = 500, allowed_sources = ["metrics"] }

[[assets]]
key = "result_shaping"
version = "rs-1"
published = true
payload = { min_evidence = 1 }

[[assets]]
key = "presentation_policy"
version = "pr-1"
published = true
payload = { layout = "stack", references_policy = "inline" }
"#;

/// Backend that answers "hello" directly and plans everything else
struct ScriptedBackend {
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl PlanningBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn classify_and_plan(
        &self,
        request: &PlanningRequest,
    ) -> opspilot_core::Result<PlanningResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.question.trim().eq_ignore_ascii_case("hello") {
            return Ok(PlanningResponse {
                kind: "direct".into(),
                payload: json!({"answer_text": "Hi! Ask me about your fleet.", "confidence": 0.9}),
                reasoning: "greeting".into(),
            });
        }
        Ok(PlanningResponse {
            kind: "plan".into(),
            payload: json!({
                "steps": [{"id": "s1", "source": "metrics", "operation": "cpu_usage"}]
            }),
            reasoning: "needs metrics".into(),
        })
    }
}

fn rows() -> Vec<Value> {
    vec![json!({"host": "web-1", "cpu": 0.91}), json!({"host": "web-2", "cpu": 0.35})]
}

fn build(backend: Arc<ScriptedBackend>, entry: FixtureEntry, max_replans: u32) -> Orchestrator {
    let assets = InMemoryConfigStore::from_toml_str(MANIFEST).unwrap();
    let data = StaticDataSource::new().with_entry("metrics", "cpu_usage", entry);
    Orchestrator::new(
        CoreConfig::default().with_max_replans(max_replans),
        Arc::new(assets),
        backend,
        Arc::new(data),
    )
    .unwrap()
}

#[tokio::test]
async fn test_greeting_gets_direct_answer() {
    let backend = ScriptedBackend::new();
    let orch = build(backend.clone(), FixtureEntry::default(), 2);

    let result = orch.process(QueryRequest::new("acme", "hello")).await.unwrap();

    assert_eq!(result.outcome, QueryOutcome::Success);
    assert_eq!(result.plan_output.as_ref().unwrap().kind(), RouteKind::Direct);
    assert_eq!(result.message, "Hi! Ask me about your fleet.");
    assert!(result.final_blocks.is_empty());
    assert!(result.replan_events.is_empty());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_twice_then_rows() {
    let entry = FixtureEntry {
        rows: rows(),
        min_window_hours: Some(200),
        ..Default::default()
    };
    let orch = build(ScriptedBackend::new(), entry, 2);

    let result = orch
        .process(QueryRequest::new("acme", "cpu on the web tier"))
        .await
        .unwrap();

    assert_eq!(result.outcome, QueryOutcome::Success);
    assert_eq!(result.replans_applied, 2);
    assert_eq!(result.replan_events.len(), 2);

    let windows: Vec<(Value, Value)> = result
        .replan_events
        .iter()
        .map(|event| {
            assert_eq!(event.trigger, ReplanTrigger::EmptyResult);
            assert_eq!(event.decision, ReplanDecision::AutoRetry);
            assert_eq!(event.scope, StageName::Execute);
            assert!(event.applied);
            let patch = event.patch.as_ref().unwrap();
            (
                patch.before[TIME_WINDOW_PATH].clone(),
                patch.after[TIME_WINDOW_PATH].clone(),
            )
        })
        .collect();
    assert_eq!(windows, vec![(json!(24), json!(72)), (json!(72), json!(216))]);

    let plan = result.plan_output.unwrap();
    assert_eq!(plan.as_plan().unwrap().view.time_window_hours, 216);
    assert_eq!(result.final_blocks.len(), 1);
    assert_eq!(result.final_blocks[0]["type"], "table");
}

#[tokio::test]
async fn test_replan_budget_exhausted() {
    let entry = FixtureEntry {
        rows: rows(),
        min_window_hours: Some(10_000),
        ..Default::default()
    };
    let orch = build(ScriptedBackend::new(), entry, 2);

    let result = orch.process(QueryRequest::new("acme", "cpu")).await.unwrap();

    assert_eq!(result.outcome, QueryOutcome::LimitExceeded);
    assert_eq!(result.replans_applied, 2);
    assert_eq!(result.replan_events.len(), 3);
    let last = result.replan_events.last().unwrap();
    assert!(!last.applied);
    assert_eq!(last.attempt, 3);
    assert_eq!(last.max_attempts, 3);
    assert!(!result.message.is_empty());
}

#[tokio::test]
async fn test_unrecognized_error_code_stops() {
    let entry = FixtureEntry {
        error: Some(LookupError {
            code: "Quota Melted".into(),
            message: "backend refused".into(),
        }),
        ..Default::default()
    };
    let orch = build(ScriptedBackend::new(), entry, 2);

    let result = orch.process(QueryRequest::new("acme", "cpu")).await.unwrap();

    assert_eq!(result.outcome, QueryOutcome::Guidance);
    assert_eq!(result.replan_events.len(), 1);
    assert_eq!(result.replan_events[0].trigger, ReplanTrigger::Unknown);
    assert_eq!(result.replan_events[0].trigger_raw, "Quota Melted");
    assert_eq!(result.replans_applied, 0);
}

#[tokio::test]
async fn test_row_ceiling_shrinks_max_rows() {
    let entry = FixtureEntry {
        rows: rows(),
        max_rows_ceiling: Some(60),
        ..Default::default()
    };
    let orch = build(ScriptedBackend::new(), entry, 2);

    let result = orch.process(QueryRequest::new("acme", "cpu")).await.unwrap();

    assert_eq!(result.outcome, QueryOutcome::Success);
    let event = &result.replan_events[0];
    assert_eq!(event.trigger, ReplanTrigger::LimitExceeded);
    let patch = event.patch.as_ref().unwrap();
    assert_eq!(patch.before[MAX_ROWS_PATH], json!(100));
    assert_eq!(patch.after[MAX_ROWS_PATH], json!(50));
}

#[test]
fn test_trigger_spellings_normalize() {
    for raw in ["empty_result", "Empty-Result", "  EMPTY RESULT ", "empty__result"] {
        assert_eq!(ReplanTrigger::parse(raw), ReplanTrigger::EmptyResult, "{raw}");
    }
    assert_eq!(ReplanTrigger::parse("no idea"), ReplanTrigger::Unknown);
}

#[tokio::test]
async fn test_cache_round_trip() {
    let cache = RoutePlanCache::in_memory(16, Duration::from_secs(60), 200);
    let direct = PlanOutput::direct(DirectAnswerPayload::new("Hi.", 0.9));

    cache.set("Hello?", "acme", RouteKind::Direct, &direct).await.unwrap();
    let (hit, _) = cache.get("hello", "acme").await.unwrap();
    let (other_tenant, _) = cache.get("hello", "globex").await.unwrap();

    assert_eq!(hit.unwrap().kind(), RouteKind::Direct);
    assert!(other_tenant.is_none());
    assert_eq!(cache.stats().await.hits, 1);
}

#[tokio::test]
async fn test_cache_kind_mismatch_raises() {
    let cache = RoutePlanCache::in_memory(16, Duration::from_secs(60), 200);
    let direct = PlanOutput::direct(DirectAnswerPayload::new("Hi.", 0.9));

    let err = cache
        .set("hello", "acme", RouteKind::Reject, &direct)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Consistency(_)));
    assert!(err.is_internal_fault());
}
