use super::llm::{extract_json, parse_decision};
use super::*;
use crate::assets::InMemoryConfigStore;
use crate::cache::RoutePlanCache;
use crate::context::ExecutionContext;
use crate::test_support::resolver;
use opspilot_llm::{MessageRole, MockProvider};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn cache() -> Arc<RoutePlanCache> {
    Arc::new(RoutePlanCache::in_memory(16, Duration::from_secs(300), 40))
}

fn router_with(backend: impl PlanningBackend + 'static) -> PlanRouter {
    PlanRouter::new(Arc::new(backend), resolver(), cache(), Duration::from_secs(60))
}

fn direct_reply() -> PlanningResponse {
    PlanningResponse {
        kind: "direct".into(),
        payload: json!({"answer_text": "Hello! Ask me about your services.", "confidence": 0.97}),
        reasoning: "greeting".into(),
    }
}

fn plan_reply() -> PlanningResponse {
    PlanningResponse {
        kind: "plan".into(),
        payload: json!({
            "steps": [{"id": "s1", "source": "metrics", "operation": "cpu_usage"}],
            "view": {"entity": "web", "time_window_hours": 6}
        }),
        reasoning: "needs metrics".into(),
    }
}

// ============================================================================
// Reply interpretation
// ============================================================================

#[test]
fn test_interpret_each_kind() {
    let direct = interpret(direct_reply()).unwrap();
    assert_eq!(direct.kind(), RouteKind::Direct);
    assert_eq!(direct.routing_reasoning, "greeting");

    let plan = interpret(plan_reply()).unwrap();
    let steps = &plan.as_plan().unwrap().steps;
    assert_eq!(steps.len(), 1);
    assert_eq!(plan.as_plan().unwrap().view.time_window_hours, 6);
    assert_eq!(plan.as_plan().unwrap().limits.max_rows, 100);

    let reject = interpret(PlanningResponse {
        kind: " Reject ".into(),
        payload: json!({"reason": "out of scope", "policy_id": "pol-7"}),
        reasoning: String::new(),
    })
    .unwrap();
    assert_eq!(reject.as_reject().unwrap().policy_id.as_deref(), Some("pol-7"));
}

#[test]
fn test_interpret_rejects_unknown_kind() {
    let err = interpret(PlanningResponse {
        kind: "maybe".into(),
        payload: json!({}),
        reasoning: String::new(),
    })
    .unwrap_err();
    assert!(matches!(err, Error::Planning(_)));
    assert!(!err.is_internal_fault());
}

#[test]
fn test_interpret_rejects_malformed_payload() {
    let err = interpret(PlanningResponse {
        kind: "direct".into(),
        payload: json!({"confidence": 0.4}),
        reasoning: String::new(),
    })
    .unwrap_err();
    assert_eq!(err.trigger_code(), "planning_failed");
}

#[test]
fn test_interpret_clamps_confidence() {
    let output = interpret(PlanningResponse {
        kind: "direct".into(),
        payload: json!({"answer_text": "ok", "confidence": 7.5}),
        reasoning: String::new(),
    })
    .unwrap();
    assert_eq!(output.as_direct().unwrap().confidence, 1.0);
}

#[test]
fn test_interpret_ignores_backend_cache_fields() {
    let output = interpret(PlanningResponse {
        kind: "direct".into(),
        payload: json!({
            "answer_text": "ok",
            "confidence": 0.8,
            "cache_hit": true,
            "references": [{"source": "metrics", "locator": "s1:cpu_usage", "row_count": 3}]
        }),
        reasoning: String::new(),
    })
    .unwrap();

    let direct = output.as_direct().unwrap();
    assert!(!direct.cache_hit);
    assert!(direct.references.is_empty());
}

#[test]
fn test_extract_json_fenced() {
    assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    assert_eq!(extract_json("```\n{}\n```  "), "{}");
    assert_eq!(extract_json("  {\"a\": 1} "), "{\"a\": 1}");
}

#[test]
fn test_parse_decision_payload_under_kind() {
    let decision =
        parse_decision(r#"{"kind": "reject", "reject": {"reason": "no"}, "reasoning": "r"}"#)
            .unwrap();
    assert_eq!(decision.kind, "reject");
    assert_eq!(decision.payload["reason"], "no");
    assert_eq!(decision.reasoning, "r");
}

#[test]
fn test_parse_decision_requires_object() {
    assert!(matches!(parse_decision("[1, 2]"), Err(Error::Planning(_))));
    assert!(matches!(parse_decision("I think it is a plan"), Err(Error::Planning(_))));
    assert!(matches!(parse_decision(r#"{"payload": {}}"#), Err(Error::Planning(_))));
}

// ============================================================================
// LLM backend
// ============================================================================

#[tokio::test]
async fn test_llm_backend_prompt_and_settings() {
    let provider = Arc::new(MockProvider::new());
    provider.add_response(
        "```json\n{\"kind\": \"direct\", \"payload\": {\"answer_text\": \"hi\"}, \"reasoning\": \"small talk\"}\n```",
    );
    let backend = LlmPlanningBackend::new(provider.clone()).with_model("planner-1");

    let request = PlanningRequest {
        question: "hello".into(),
        tenant_id: "acme".into(),
        instructions: "Classify the question.".into(),
        constraints: json!({"sources": ["metrics"]}),
    };
    let response = backend.classify_and_plan(&request).await.unwrap();
    assert_eq!(response.kind, "direct");
    assert_eq!(response.payload["answer_text"], "hi");

    let sent = provider.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].model, "planner-1");
    assert_eq!(sent[0].temperature, Some(0.0));
    assert!(sent[0].json_mode);
    assert_eq!(sent[0].messages[0].role, MessageRole::System);
    assert!(sent[0].messages[0].content.starts_with("Classify the question."));
    assert!(sent[0].messages[0].content.contains("\"metrics\""));
    assert_eq!(sent[0].messages[1].content, "hello");
}

#[tokio::test]
async fn test_llm_backend_provider_error_propagates() {
    let provider = Arc::new(MockProvider::new());
    provider.add_error(opspilot_llm::Error::RateLimit);
    let backend = LlmPlanningBackend::new(provider);

    let request = PlanningRequest {
        question: "cpu".into(),
        tenant_id: "acme".into(),
        instructions: String::new(),
        constraints: serde_json::Value::Null,
    };
    let err = backend.classify_and_plan(&request).await.unwrap_err();
    assert_eq!(err.trigger_code(), "tool_error_retryable");
}

// ============================================================================
// Router
// ============================================================================

#[tokio::test]
async fn test_direct_decision_is_cached() {
    let mut backend = MockPlanningBackend::new();
    backend.expect_name().return_const("mock".to_string());
    backend
        .expect_classify_and_plan()
        .times(1)
        .returning(|_| Ok(direct_reply()));
    let router = router_with(backend);

    let mut first = ExecutionContext::new("acme", "hello");
    let output = router.route("hello", "acme", &mut first).await.unwrap();
    assert!(!first.cache_hit);
    assert!(first.cache_key.is_some());
    assert_eq!(first.routing_assets["planning_prompt"], "pp-1");
    assert!(!output.as_direct().unwrap().cache_hit);

    let mut second = ExecutionContext::new("acme", "Hello?");
    let cached = router.route("Hello?", "acme", &mut second).await.unwrap();
    assert!(second.cache_hit);
    assert_eq!(second.cache_key, first.cache_key);
    assert!(cached.as_direct().unwrap().cache_hit);
    assert!(second.routing_assets.is_empty());

    let stats = router.cache().stats().await;
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
}

#[tokio::test]
async fn test_plan_decision_is_not_cached() {
    let mut backend = MockPlanningBackend::new();
    backend.expect_name().return_const("mock".to_string());
    backend
        .expect_classify_and_plan()
        .times(2)
        .returning(|_| Ok(plan_reply()));
    let router = router_with(backend);

    for _ in 0..2 {
        let mut ctx = ExecutionContext::new("acme", "cpu on web");
        let output = router.route("cpu on web", "acme", &mut ctx).await.unwrap();
        assert_eq!(output.kind(), RouteKind::Plan);
        assert!(!ctx.cache_hit);
    }
}

#[tokio::test]
async fn test_long_question_skips_cache() {
    let mut backend = MockPlanningBackend::new();
    backend.expect_name().return_const("mock".to_string());
    backend
        .expect_classify_and_plan()
        .times(2)
        .returning(|_| Ok(direct_reply()));
    let router = router_with(backend);
    let question = "please give me a very long and detailed overview of every service";

    for _ in 0..2 {
        let mut ctx = ExecutionContext::new("acme", question);
        router.route(question, "acme", &mut ctx).await.unwrap();
        assert!(ctx.cache_key.is_none());
        assert!(!ctx.cache_hit);
    }
}

#[tokio::test]
async fn test_backend_request_carries_assets() {
    let mut backend = MockPlanningBackend::new();
    backend.expect_name().return_const("mock".to_string());
    backend
        .expect_classify_and_plan()
        .withf(|req| {
            req.instructions.starts_with("Classify")
                && req.constraints["sources"] == json!(["metrics", "logs"])
                && req.tenant_id == "acme"
        })
        .returning(|_| Ok(plan_reply()));
    let router = router_with(backend);

    let mut ctx = ExecutionContext::new("acme", "cpu");
    router.route("cpu", "acme", &mut ctx).await.unwrap();
}

#[tokio::test]
async fn test_missing_routing_asset() {
    let mut backend = MockPlanningBackend::new();
    backend.expect_classify_and_plan().never();
    let router = PlanRouter::new(
        Arc::new(backend),
        AssetResolver::new(Arc::new(InMemoryConfigStore::new())),
        cache(),
        Duration::from_secs(60),
    );

    let mut ctx = ExecutionContext::new("acme", "cpu");
    let err = router.route("cpu", "acme", &mut ctx).await.unwrap_err();
    assert_eq!(err.trigger_code(), "asset_missing");
}

#[tokio::test]
async fn test_backend_error_passes_through() {
    let mut backend = MockPlanningBackend::new();
    backend.expect_name().return_const("mock".to_string());
    backend
        .expect_classify_and_plan()
        .returning(|_| Err(Error::Planning("garbled".into())));
    let router = router_with(backend);

    let mut ctx = ExecutionContext::new("acme", "cpu");
    let err = router.route("cpu", "acme", &mut ctx).await.unwrap_err();
    assert!(matches!(err, Error::Planning(_)));
    assert_eq!(router.cache().stats().await.entries, 0);
}

struct StalledBackend;

#[async_trait::async_trait]
impl PlanningBackend for StalledBackend {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn classify_and_plan(&self, _request: &PlanningRequest) -> Result<PlanningResponse> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(direct_reply())
    }
}

#[tokio::test(start_paused = true)]
async fn test_routing_timeout() {
    let router = router_with(StalledBackend);
    let mut ctx = ExecutionContext::new("acme", "cpu");

    let err = router.route("cpu", "acme", &mut ctx).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { seconds: 60, .. }));
    assert_eq!(err.trigger_code(), "timeout");
}

#[tokio::test]
async fn test_routing_cancelled() {
    let token = CancellationToken::new();
    let router = router_with(StalledBackend);
    let mut ctx = ExecutionContext::new("acme", "cpu").with_cancellation(token.clone());

    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });
    let err = router.route("cpu", "acme", &mut ctx).await.unwrap_err();
    cancel.await.unwrap();
    assert!(matches!(err, Error::Cancelled));
}
