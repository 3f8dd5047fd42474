use super::*;
use crate::error::Error;
use crate::trace::{StageSummary, TraceOutcome, TraceRecord};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn sample_trace(tenant: &str, outcome: TraceOutcome) -> TraceRecord {
    let mut record = TraceRecord::new(Uuid::new_v4(), tenant, "disk usage on web-1", outcome);
    record.route_kind = Some("plan".to_string());
    record.replan_count = 1;
    record.stages = vec![
        StageSummary::new("route_plan", 1, "ok").with_duration(12),
        StageSummary::new("execute", 1, "warning")
            .with_duration(40)
            .with_count("row_count", 0),
        StageSummary::new("execute", 2, "ok").with_count("row_count", 3),
    ];
    record.payload = serde_json::json!({"final_result": {"message": "done"}});
    record
}

#[tokio::test]
async fn test_sqlite_save_and_get() {
    let store = TraceStore::in_memory().await.unwrap();
    let record = sample_trace("acme", TraceOutcome::Success);

    store.save_trace(&record).await.unwrap();
    let loaded = store.get_trace(record.id).await.unwrap();

    assert_eq!(loaded.id, record.id);
    assert_eq!(loaded.tenant_id, "acme");
    assert_eq!(loaded.outcome, TraceOutcome::Success);
    assert_eq!(loaded.route_kind.as_deref(), Some("plan"));
    assert_eq!(loaded.replan_count, 1);
    assert_eq!(loaded.stages, record.stages);
    assert_eq!(loaded.payload["final_result"]["message"], "done");
}

#[tokio::test]
async fn test_sqlite_get_missing() {
    let store = TraceStore::in_memory().await.unwrap();
    let err = store.get_trace(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_sqlite_duplicate_id_rejected() {
    let store = TraceStore::in_memory().await.unwrap();
    let record = sample_trace("acme", TraceOutcome::Success);

    store.save_trace(&record).await.unwrap();
    let err = store.save_trace(&record).await.unwrap_err();
    assert!(matches!(err, Error::Database(_)));
}

#[tokio::test]
async fn test_sqlite_list_filters() {
    let store = TraceStore::in_memory().await.unwrap();
    store
        .save_trace(&sample_trace("acme", TraceOutcome::Success))
        .await
        .unwrap();
    store
        .save_trace(&sample_trace("acme", TraceOutcome::Guidance))
        .await
        .unwrap();
    store
        .save_trace(&sample_trace("globex", TraceOutcome::Success))
        .await
        .unwrap();

    let acme = store
        .list_traces(&TraceQuery::new().for_tenant("acme"))
        .await
        .unwrap();
    assert_eq!(acme.len(), 2);

    let acme_success = store
        .list_traces(
            &TraceQuery::new()
                .for_tenant("acme")
                .with_outcome(TraceOutcome::Success),
        )
        .await
        .unwrap();
    assert_eq!(acme_success.len(), 1);

    let paged = store
        .list_traces(&TraceQuery::new().paginate(1, 1))
        .await
        .unwrap();
    assert_eq!(paged.len(), 1);
}

#[tokio::test]
async fn test_sqlite_prune_before() {
    let store = TraceStore::in_memory().await.unwrap();
    let mut old = sample_trace("acme", TraceOutcome::Success);
    old.started_at = Utc::now() - Duration::days(30);
    store.save_trace(&old).await.unwrap();
    store
        .save_trace(&sample_trace("acme", TraceOutcome::Success))
        .await
        .unwrap();

    let removed = store
        .prune_before(Utc::now() - Duration::days(7))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(store.get_trace(old.id).await.is_err());
}

#[tokio::test]
async fn test_memory_store_matches_sqlite_semantics() {
    let store = MemoryTraceStore::new();
    let record = sample_trace("acme", TraceOutcome::LimitExceeded);

    store.save_trace(&record).await.unwrap();
    assert!(store.save_trace(&record).await.is_err());
    assert_eq!(store.len().await, 1);

    let loaded = store.get_trace(record.id).await.unwrap();
    assert_eq!(loaded.outcome, TraceOutcome::LimitExceeded);

    let none = store
        .list_traces(&TraceQuery::new().for_tenant("globex"))
        .await
        .unwrap();
    assert!(none.is_empty());
    assert!(matches!(
        store.get_trace(Uuid::new_v4()).await,
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_default_db_path() {
    let path = default_db_path();
    assert!(path.ends_with(".opspilot/traces.db"));
}
