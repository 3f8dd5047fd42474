//! `opspilot trace` - inspect recorded traces

use super::TraceCommands;
use crate::app::{init, AppConfig};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use opspilot_replay::{
    TraceDiff, TraceOutcome, TraceQuery, TraceRecord, TraceStore, TraceViewer,
};
use std::sync::Arc;
use uuid::Uuid;

/// Run a trace subcommand
pub async fn run(config: &AppConfig, cmd: TraceCommands) -> Result<()> {
    let store = Arc::new(init::open_trace_store(config).await?);
    let viewer = TraceViewer::new(store.clone());

    match cmd {
        TraceCommands::Show { id, json } => show(&viewer, id, json).await,
        TraceCommands::Diff { left, right } => diff(&viewer, left, right).await,
        TraceCommands::List {
            tenant,
            outcome,
            limit,
        } => list(&viewer, tenant, outcome, limit).await,
        TraceCommands::Prune { older_than_days } => prune(&store, older_than_days).await,
    }
}

async fn show(viewer: &TraceViewer, id: Uuid, json: bool) -> Result<()> {
    let record = viewer.get(id).await.context("Trace not found")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record.payload)?);
        return Ok(());
    }

    println!("{}", summary_line(&record));
    println!("Question: {}", record.question);
    println!(
        "Route:    {}{}",
        record.route_kind.as_deref().unwrap_or("none"),
        if record.cache_hit { " (cached)" } else { "" }
    );
    if let Some(baseline) = record.baseline_trace_id {
        println!("Baseline: {baseline}");
    }
    println!("\n{:<12} {:>7} {:<8} {:>8}  error", "stage", "attempt", "status", "ms");
    for stage in &record.stages {
        println!(
            "{:<12} {:>7} {:<8} {:>8}  {}",
            stage.stage,
            stage.attempt,
            stage.status,
            stage.duration_ms,
            stage.error_code.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn diff(viewer: &TraceViewer, left: Uuid, right: Uuid) -> Result<()> {
    let comparison = viewer.compare(left, right).await?;
    println!("Left:  {}", summary_line(&comparison.left));
    println!("Right: {}", summary_line(&comparison.right));
    print!("{}", render_diff(&comparison.diff));
    Ok(())
}

async fn list(
    viewer: &TraceViewer,
    tenant: Option<String>,
    outcome: Option<String>,
    limit: i64,
) -> Result<()> {
    let mut query = TraceQuery::new().paginate(limit, 0);
    if let Some(tenant) = &tenant {
        query = query.for_tenant(tenant);
    }
    if let Some(outcome) = outcome {
        let outcome: TraceOutcome = outcome.parse().map_err(anyhow::Error::msg)?;
        query = query.with_outcome(outcome);
    }

    let records = viewer.recent(&query).await?;
    if records.is_empty() {
        println!("No traces recorded.");
    }
    for record in &records {
        println!("{}  {}", summary_line(record), record.question);
    }
    Ok(())
}

async fn prune(store: &TraceStore, older_than_days: i64) -> Result<()> {
    if older_than_days < 0 {
        anyhow::bail!("--older-than-days must not be negative");
    }
    let cutoff = Utc::now() - Duration::days(older_than_days);
    let removed = store.prune_before(cutoff).await?;
    println!("Removed {removed} trace(s) started before {}", cutoff.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

fn summary_line(record: &TraceRecord) -> String {
    format!(
        "{} {} [{}] {} replan(s), {} ms",
        record.id,
        record.started_at.format("%Y-%m-%d %H:%M:%S"),
        record.outcome,
        record.replan_count,
        record.duration_ms()
    )
}

fn render_diff(diff: &TraceDiff) -> String {
    let same = |b: bool| if b { "same" } else { "changed" };
    let mut out = format!(
        "question {}, route {}, outcome {}, replans {:+}, duration {:+} ms\n",
        same(diff.question_same),
        same(diff.route_kind_same),
        same(diff.outcome_same),
        diff.replan_count_diff,
        diff.duration_diff_ms
    );
    for stage in diff.stages.iter().filter(|s| s.is_changed()) {
        out.push_str(&format!(
            "  {}: runs {} vs {}, status {} vs {}\n",
            stage.stage,
            stage.left_runs,
            stage.right_runs,
            stage.left_status.as_deref().unwrap_or("-"),
            stage.right_status.as_deref().unwrap_or("-")
        ));
        for (name, delta) in stage.count_diffs.iter().filter(|(_, d)| **d != 0) {
            out.push_str(&format!("    {name} {delta:+}\n"));
        }
    }
    out
}
