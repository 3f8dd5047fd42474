//! Request processing

use super::core::Orchestrator;
use super::request::QueryRequest;
use super::result::QueryResult;
use crate::context::ExecutionContext;
use crate::error::Result;
use chrono::Utc;
use opspilot_replay::{diff_traces, TraceDiff, TraceRecord};
use std::time::Instant;
use tracing::{info, instrument, warn};

impl Orchestrator {
    /// Answer one question
    ///
    /// Every stage anomaly and recoverable routing failure ends in a
    /// rendered result. Only internal consistency faults are returned as
    /// errors.
    #[instrument(skip(self, request), fields(tenant_id = %request.tenant_id))]
    pub async fn process(&self, request: QueryRequest) -> Result<QueryResult> {
        self.process_context(request.into_context()).await
    }

    /// Answer the question carried by an already-built context
    #[instrument(skip_all, fields(trace_id = %ctx.trace_id, tenant_id = %ctx.tenant_id))]
    pub async fn process_context(&self, mut ctx: ExecutionContext) -> Result<QueryResult> {
        let started = Instant::now();
        let started_at = Utc::now();
        info!(test_mode = ctx.test_mode, "Processing question");

        let question = ctx.question.clone();
        let tenant_id = ctx.tenant_id.clone();
        let run = match self.router.route(&question, &tenant_id, &mut ctx).await {
            Ok(plan_output) => self.control.run(&self.executor, plan_output, &mut ctx).await?,
            Err(e) if e.is_internal_fault() => return Err(e),
            Err(e) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                self.control
                    .run_route_failure(&self.executor, &e, elapsed_ms, &mut ctx)
                    .await?
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let mut result = QueryResult::assemble(&ctx, run, duration_ms);
        let record = result.to_trace_record(&ctx, started_at);
        self.persist(&record).await;
        if let Some(baseline) = ctx.baseline_trace_id {
            result.baseline_diff = self.compare_with_baseline(&record, baseline).await;
        }

        info!(
            outcome = %result.outcome,
            replans = result.replans_applied,
            cache_hit = result.cache_hit,
            duration_ms,
            "Question processed"
        );
        Ok(result)
    }

    async fn persist(&self, record: &TraceRecord) {
        let Some(store) = &self.trace_store else {
            return;
        };
        if let Err(e) = store.save_trace(record).await {
            warn!(store = store.name(), error = %e, "Failed to persist trace");
        }
    }

    async fn compare_with_baseline(
        &self,
        record: &TraceRecord,
        baseline: uuid::Uuid,
    ) -> Option<TraceDiff> {
        let store = self.trace_store.as_ref()?;
        match store.get_trace(baseline).await {
            Ok(baseline_record) => Some(diff_traces(record, &baseline_record)),
            Err(e) => {
                warn!(baseline = %baseline, error = %e, "Baseline trace unavailable");
                None
            }
        }
    }
}
