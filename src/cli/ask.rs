//! `opspilot ask` - answer one question

use super::AskArgs;
use crate::app::{init, AppConfig};
use anyhow::{Context, Result};
use opspilot_core::{QueryRequest, QueryResult};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Run the ask command
pub async fn run(config: &AppConfig, args: AskArgs) -> Result<()> {
    let orchestrator = init::build_orchestrator(config).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling the request");
            on_interrupt.cancel();
        }
    });

    let mut request = QueryRequest::new(&args.tenant, &args.question)
        .with_test_mode(args.test_mode)
        .with_cancellation(cancel);
    if let Some(user) = &args.user {
        request = request.with_user(user);
    }
    for (key, version) in &args.overrides {
        request = request.with_asset_override(key, version);
    }
    if let Some(baseline) = args.baseline {
        request = request.with_baseline(baseline);
    }

    let result = orchestrator
        .process(request)
        .await
        .map_err(|e| anyhow::anyhow!(opspilot_core::format_error_for_cli(&e)))?;

    if args.json {
        let text = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        println!("{text}");
    } else {
        print!("{}", render(&result));
    }

    if args.stats {
        let stats = orchestrator.cache_stats().await;
        println!(
            "\nCache: {} hits, {} misses, {} entries ({:.0}% hit rate)",
            stats.hits,
            stats.misses,
            stats.entries,
            stats.hit_rate * 100.0
        );
    }
    Ok(())
}

/// Plain-text rendering of a result
pub fn render(result: &QueryResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", result.message));

    for block in &result.final_blocks {
        out.push('\n');
        out.push_str(&render_block(block));
    }

    if !result.final_references.is_empty() && result.display_model.references_policy != "hidden" {
        out.push_str("\nReferences:\n");
        for (idx, reference) in result.final_references.iter().enumerate() {
            out.push_str(&format!(
                "  [{}] {} ({}, {} rows)\n",
                idx + 1,
                reference.title,
                reference.locator,
                reference.row_count
            ));
        }
    }

    for card in &result.action_cards {
        out.push_str(&format!("\n{}\n  {}\n", card.title, card.description));
        for option in &card.options {
            out.push_str(&format!("  - {} ({})\n", option.label, option.id));
        }
    }

    if !result.replan_events.is_empty() {
        out.push_str("\nReplans:\n");
        for event in &result.replan_events {
            out.push_str(&format!(
                "  attempt {}/{} at {}: {} -> {}{}\n",
                event.attempt,
                event.max_attempts,
                event.stage,
                event.trigger,
                event.decision,
                if event.applied { " (applied)" } else { "" }
            ));
        }
    }

    out.push_str(&format!(
        "\n[{}] trace {} in {} ms{}\n",
        result.outcome,
        result.trace_id,
        result.duration_ms,
        if result.cache_hit { ", cached route" } else { "" }
    ));

    if let Some(diff) = &result.baseline_diff {
        out.push_str(&format!(
            "Baseline: outcome {}, replans {:+}, {} stage(s) changed\n",
            if diff.outcome_same { "same" } else { "changed" },
            diff.replan_count_diff,
            diff.stages.iter().filter(|s| s.is_changed()).count()
        ));
    }
    out
}

fn render_block(block: &Value) -> String {
    let title = block.get("title").and_then(Value::as_str).unwrap_or("");
    match block.get("type").and_then(Value::as_str) {
        Some("metric") => format!(
            "{title}: {} = {}\n",
            block.get("label").and_then(Value::as_str).unwrap_or("value"),
            block.get("value").unwrap_or(&Value::Null)
        ),
        _ => {
            let mut out = format!("{title}\n");
            let columns: Vec<&str> = block
                .get("columns")
                .and_then(Value::as_array)
                .map(|c| c.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            out.push_str(&format!("  {}\n", columns.join(" | ")));
            let rows = block.get("rows").and_then(Value::as_array);
            for row in rows.into_iter().flatten() {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| match row.get(*c) {
                        Some(Value::String(s)) => s.clone(),
                        Some(v) => v.to_string(),
                        None => String::new(),
                    })
                    .collect();
                out.push_str(&format!("  {}\n", cells.join(" | ")));
            }
            out
        }
    }
}
