use super::*;
use serde_json::json;

fn query(source: &str, operation: &str, window: u32, max_rows: u32) -> LookupQuery {
    LookupQuery {
        step_id: "s1".into(),
        source: source.into(),
        operation: operation.into(),
        params: Map::new(),
        time_window_hours: window,
        max_rows,
    }
}

const FIXTURES: &str = r#"{
    "metrics.cpu_usage": {"rows": [{"host": "web-1", "cpu": 0.93}]},
    "logs.errors": {"rows": [{"msg": "oom"}], "min_window_hours": 72},
    "traces.spans": {"rows": [], "max_rows_ceiling": 50},
    "billing.invoices": {"error": {"code": "policy_blocked", "message": "billing is restricted"}}
}"#;

#[tokio::test]
async fn test_fixture_rows() {
    let source = StaticDataSource::from_json_str(FIXTURES).unwrap();
    assert_eq!(source.len(), 4);

    let result = source.lookup(&query("metrics", "cpu_usage", 24, 100)).await;
    assert_eq!(result.status, LookupStatus::Ok);
    assert_eq!(result.rows, vec![json!({"host": "web-1", "cpu": 0.93})]);
}

#[tokio::test]
async fn test_min_window_hides_rows() {
    let source = StaticDataSource::from_json_str(FIXTURES).unwrap();

    let narrow = source.lookup(&query("logs", "errors", 24, 100)).await;
    assert!(!narrow.is_error());
    assert!(narrow.rows.is_empty());

    let wide = source.lookup(&query("logs", "errors", 72, 100)).await;
    assert_eq!(wide.rows.len(), 1);
}

#[tokio::test]
async fn test_row_ceiling_and_fixed_errors() {
    let source = StaticDataSource::from_json_str(FIXTURES).unwrap();

    let too_many = source.lookup(&query("traces", "spans", 24, 100)).await;
    assert_eq!(too_many.error.unwrap().code, "limit_exceeded");

    let blocked = source.lookup(&query("billing", "invoices", 24, 10)).await;
    assert!(blocked.is_error());
    assert_eq!(blocked.error.unwrap().code, "policy_blocked");

    let unknown = source.lookup(&query("crm", "accounts", 24, 10)).await;
    assert_eq!(unknown.error.unwrap().code, "unsupported_operation");
}

#[test]
fn test_invalid_fixture_json() {
    assert!(StaticDataSource::from_json_str("[1, 2]").is_err());
}
