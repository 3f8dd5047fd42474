use super::*;
use crate::error::Error;
use serde_json::json;

#[test]
fn test_from_parts_accepts_matching_payload() {
    let output = PlanOutput::from_parts(
        RouteKind::Direct,
        Some(DirectAnswerPayload::new("Hi there", 0.9)),
        None,
        None,
    )
    .unwrap();
    assert_eq!(output.kind(), RouteKind::Direct);
    assert_eq!(output.as_direct().unwrap().answer_text, "Hi there");
    assert!(output.as_plan().is_none());
}

#[test]
fn test_from_parts_rejects_missing_payload() {
    let err = PlanOutput::from_parts(RouteKind::Plan, None, None, None).unwrap_err();
    assert!(matches!(err, Error::Consistency(_)));
    assert!(err.is_internal_fault());
}

#[test]
fn test_from_parts_rejects_mismatched_payload() {
    let err = PlanOutput::from_parts(
        RouteKind::Reject,
        Some(DirectAnswerPayload::new("hello", 1.0)),
        None,
        None,
    )
    .unwrap_err();
    assert!(err.to_string().contains("kind=reject"));
    assert!(err.to_string().contains("direct"));
}

#[test]
fn test_from_parts_rejects_two_payloads() {
    let err = PlanOutput::from_parts(
        RouteKind::Plan,
        None,
        Some(Plan::default()),
        Some(RejectPayload::new("no")),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Consistency(_)));
}

#[test]
fn test_wire_decoding_enforces_consistency() {
    let bad = json!({
        "kind": "direct",
        "plan": {"steps": [{"id": "s1", "source": "metrics", "operation": "cpu"}]}
    });
    let decoded: Result<PlanOutput, _> = serde_json::from_value(bad);
    assert!(decoded.is_err());

    let good = json!({
        "kind": "plan",
        "plan": {"steps": [{"id": "s1", "source": "metrics", "operation": "cpu"}]},
        "routing_reasoning": "needs data"
    });
    let decoded: PlanOutput = serde_json::from_value(good).unwrap();
    let plan = decoded.as_plan().unwrap();
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.view.time_window_hours, DEFAULT_TIME_WINDOW_HOURS);
    assert_eq!(plan.limits.max_rows, DEFAULT_MAX_ROWS);
    assert_eq!(decoded.routing_reasoning, "needs data");
}

#[test]
fn test_wire_encoding_has_single_payload() {
    let output = PlanOutput::reject(RejectPayload::new("out of scope").with_policy("pol-7"));
    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(value["kind"], "reject");
    assert!(value["direct"].is_null());
    assert!(value["plan"].is_null());
    assert_eq!(value["reject"]["policy_id"], "pol-7");
}

#[test]
fn test_confidence_is_clamped() {
    let output = PlanOutput::direct(DirectAnswerPayload {
        answer_text: "sure".into(),
        confidence: 1.7,
        attributions: vec![],
        references: vec![],
        cache_hit: false,
    });
    assert_eq!(output.as_direct().unwrap().confidence, 1.0);
    assert_eq!(DirectAnswerPayload::new("x", -0.5).confidence, 0.0);
    assert_eq!(DirectAnswerPayload::new("x", f64::NAN).confidence, 0.0);
}

#[test]
fn test_with_plan_only_for_plan_kind() {
    let plan = Plan::new(vec![PlanStep::new("s1", "logs", "errors")]);
    let output = PlanOutput::plan(plan.clone()).with_reasoning("r");
    let rewritten = output.with_plan(plan.clone().with_time_window(72)).unwrap();
    assert_eq!(rewritten.as_plan().unwrap().view.time_window_hours, 72);
    assert_eq!(rewritten.routing_reasoning, "r");
    assert_eq!(output.as_plan().unwrap().view.time_window_hours, 24);

    let direct = PlanOutput::direct(DirectAnswerPayload::new("hi", 1.0));
    assert!(matches!(direct.with_plan(plan), Err(Error::Consistency(_))));
}

#[test]
fn test_route_result_has_mandatory_keys() {
    let output = PlanOutput::direct(DirectAnswerPayload::new("hi", 1.0)).with_elapsed_ms(5);
    let result = output.to_route_result(true);
    for key in ["kind", "routing_reasoning", "plan", "cache_hit", "elapsed_ms"] {
        assert!(result.contains_key(key), "missing {key}");
    }
    assert_eq!(result["plan"], json!({}));
    assert_eq!(result["cache_hit"], true);
}

#[test]
fn test_route_kind_parse() {
    assert_eq!("Direct".parse::<RouteKind>(), Ok(RouteKind::Direct));
    assert_eq!(" plan ".parse::<RouteKind>(), Ok(RouteKind::Plan));
    assert!("maybe".parse::<RouteKind>().is_err());
}
