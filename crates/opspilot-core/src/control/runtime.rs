//! Control loop runtime

use super::action::{guidance_message, ActionCard, CANCELLED_MESSAGE, LIMIT_EXCEEDED_MESSAGE};
use super::event::ReplanEvent;
use super::outcome::QueryOutcome;
use super::policy::{self, Resolution};
use super::trigger::{ReplanDecision, ReplanTrigger};
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::pipeline::{
    PipelineRun, PresentNotice, StageExecutor, StageInput, StageName, StageOutput, StartPoint,
};
use crate::plan::{PlanOutput, RouteKind};
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Everything the control loop produced for one request
#[derive(Debug, Clone)]
pub struct LoopResult {
    /// Terminal outcome
    pub outcome: QueryOutcome,
    /// Routing decision as last executed (after any patches)
    pub plan_output: Option<PlanOutput>,
    /// Stage inputs across all attempts, in call order
    pub stage_inputs: Vec<StageInput>,
    /// Stage outputs across all attempts, paired with `stage_inputs`
    pub stage_outputs: Vec<StageOutput>,
    /// Replan events in arrival order
    pub replan_events: Vec<ReplanEvent>,
    /// Number of patches applied
    pub replans_applied: u32,
    /// Result of the final `present` call
    pub final_result: Map<String, Value>,
}

impl LoopResult {
    fn new(plan_output: Option<PlanOutput>) -> Self {
        Self {
            outcome: QueryOutcome::Success,
            plan_output,
            stage_inputs: Vec::new(),
            stage_outputs: Vec::new(),
            replan_events: Vec::new(),
            replans_applied: 0,
            final_result: StageName::Present.default_result(),
        }
    }

    fn record(&mut self, input: StageInput, output: StageOutput) {
        self.stage_inputs.push(input);
        self.stage_outputs.push(output);
    }

    fn absorb(&mut self, run: PipelineRun) {
        self.stage_inputs.extend(run.stage_inputs);
        self.stage_outputs.extend(run.stage_outputs);
        self.final_result = run.final_result;
    }

    /// Latest result produced by `stage`
    fn latest_result(&self, stage: StageName) -> Option<Map<String, Value>> {
        self.stage_outputs
            .iter()
            .rev()
            .find(|o| o.stage == stage)
            .map(|o| o.result.clone())
    }

    /// Latest data-side result, used as the partial result behind a notice
    fn partial_result(&self) -> Option<Map<String, Value>> {
        self.stage_outputs
            .iter()
            .rev()
            .find(|o| o.stage != StageName::Present)
            .map(|o| o.result.clone())
    }
}

/// Bounded replan loop around the [`StageExecutor`]
#[derive(Debug, Clone, Copy)]
pub struct ControlLoop {
    max_replans: u32,
}

impl ControlLoop {
    /// Create a loop allowing at most `max_replans` applied patches
    #[must_use]
    pub fn new(max_replans: u32) -> Self {
        Self { max_replans }
    }

    /// Replan ceiling
    #[must_use]
    pub fn max_replans(&self) -> u32 {
        self.max_replans
    }

    /// Run a routing decision to a terminal outcome
    ///
    /// Stage anomalies never surface as errors; only internal faults do.
    #[instrument(skip_all, fields(trace_id = %ctx.trace_id, max_replans = self.max_replans))]
    pub async fn run(
        &self,
        executor: &StageExecutor,
        plan_output: PlanOutput,
        ctx: &mut ExecutionContext,
    ) -> Result<LoopResult> {
        let mut current = plan_output;
        let mut result = LoopResult::new(Some(current.clone()));
        let mut start = StartPoint::Beginning;

        loop {
            let run = executor.run_pipeline(&current, ctx, start).await?;
            let halted_at = run.halted_at;
            let cancelled = run.cancelled;
            result.absorb(run);

            if cancelled {
                result.plan_output = Some(current);
                return Ok(self.cancelled(result));
            }

            let Some(stage) = halted_at else {
                result.outcome = match current.kind() {
                    RouteKind::Reject => QueryOutcome::Rejected,
                    RouteKind::Direct | RouteKind::Plan => QueryOutcome::Success,
                };
                info!(
                    outcome = %result.outcome,
                    replans = result.replans_applied,
                    "Request completed"
                );
                result.plan_output = Some(current);
                return Ok(result);
            };

            let Some(failing) = result.stage_outputs.last() else {
                return Err(Error::Internal(format!("{stage} halted without output")));
            };
            let trigger_raw = failing.diagnostics.trigger_code();
            let trigger = ReplanTrigger::parse(&trigger_raw);
            let resolution = policy::resolve(trigger, stage, current.as_plan());
            let mut event = self.event(trigger, trigger_raw, stage, &resolution, failing, ctx);

            warn!(
                stage = %stage,
                trigger = %trigger,
                decision = %resolution.decision,
                attempt = ctx.attempt,
                "Stage anomaly"
            );

            match resolution.decision {
                ReplanDecision::AutoRetry if result.replans_applied < self.max_replans => {
                    let Some(patch) = &resolution.patch else {
                        return Err(Error::Internal(format!(
                            "auto_retry for {trigger} carries no patch"
                        )));
                    };
                    let Some(plan) = current.as_plan() else {
                        return Err(Error::Consistency(format!(
                            "{trigger} patch targets a {} decision",
                            current.kind()
                        )));
                    };
                    let patched = patch.apply(plan)?;
                    current = current.with_plan(patched)?;

                    event.applied = true;
                    result.replan_events.push(event);
                    result.replans_applied += 1;
                    ctx.attempt += 1;

                    let prev_output = resolution
                        .scope
                        .previous()
                        .and_then(|p| result.latest_result(p));
                    start = StartPoint::Stage {
                        stage: resolution.scope,
                        prev_output,
                    };
                    info!(
                        scope = %resolution.scope,
                        attempt = ctx.attempt,
                        "Replanning"
                    );
                }
                ReplanDecision::AutoRetry => {
                    result.replan_events.push(event);
                    result.plan_output = Some(current);
                    return self
                        .conclude(
                            executor,
                            ctx,
                            result,
                            QueryOutcome::LimitExceeded,
                            LIMIT_EXCEEDED_MESSAGE.to_string(),
                        )
                        .await;
                }
                ReplanDecision::AskUser => {
                    let card = ActionCard::for_trigger(trigger);
                    let message = card.description.clone();
                    ctx.action_cards.push(card);
                    result.replan_events.push(event);
                    result.plan_output = Some(current);
                    return self
                        .conclude(executor, ctx, result, QueryOutcome::ActionRequested, message)
                        .await;
                }
                ReplanDecision::StopWithGuidance => {
                    result.replan_events.push(event);
                    result.plan_output = Some(current);
                    return self
                        .conclude(
                            executor,
                            ctx,
                            result,
                            QueryOutcome::Guidance,
                            guidance_message(trigger).to_string(),
                        )
                        .await;
                }
            }
        }
    }

    /// Turn a routing failure into a guidance result
    ///
    /// The failure is recorded as the `route_plan` output and as a
    /// `stop_with_guidance` event; `present` still renders a result.
    #[instrument(skip_all, fields(trace_id = %ctx.trace_id))]
    pub async fn run_route_failure(
        &self,
        executor: &StageExecutor,
        error: &Error,
        elapsed_ms: u64,
        ctx: &mut ExecutionContext,
    ) -> Result<LoopResult> {
        let mut result = LoopResult::new(None);
        let (input, output) = executor.route_plan_failure(error, ctx, elapsed_ms);

        if matches!(error, Error::Cancelled) {
            result.record(input, output);
            return Ok(self.cancelled(result));
        }

        let trigger_raw = output.diagnostics.trigger_code();
        let trigger = ReplanTrigger::parse(&trigger_raw);
        let resolution = policy::resolve(trigger, StageName::RoutePlan, None);
        let event = self.event(
            trigger,
            trigger_raw,
            StageName::RoutePlan,
            &resolution,
            &output,
            ctx,
        );
        warn!(error = %error, trigger = %trigger, "Routing failed");

        result.record(input, output);
        result.replan_events.push(event);
        if ctx.is_cancelled() {
            return Ok(self.cancelled(result));
        }
        self.conclude(
            executor,
            ctx,
            result,
            QueryOutcome::Guidance,
            guidance_message(trigger).to_string(),
        )
        .await
    }

    fn event(
        &self,
        trigger: ReplanTrigger,
        trigger_raw: String,
        stage: StageName,
        resolution: &Resolution,
        failing: &StageOutput,
        ctx: &ExecutionContext,
    ) -> ReplanEvent {
        ReplanEvent {
            event_id: Uuid::new_v4(),
            trigger,
            trigger_raw,
            scope: resolution.scope,
            decision: resolution.decision,
            patch: resolution.patch.clone(),
            attempt: ctx.attempt,
            max_attempts: self.max_replans + 1,
            stage,
            diagnostics_snapshot: failing.diagnostics.clone(),
            applied: false,
            created_at: Utc::now(),
        }
    }

    /// Render the terminal notice through `present`
    async fn conclude(
        &self,
        executor: &StageExecutor,
        ctx: &mut ExecutionContext,
        mut result: LoopResult,
        outcome: QueryOutcome,
        message: String,
    ) -> Result<LoopResult> {
        if ctx.is_cancelled() {
            return Ok(self.cancelled(result));
        }

        let (input, output) = executor
            .present_notice(
                result.plan_output.as_ref(),
                ctx,
                result.partial_result(),
                PresentNotice::new(outcome.as_str(), message.clone()),
            )
            .await?;
        if output.is_anomaly() {
            warn!(
                code = %output.diagnostics.trigger_code(),
                "Present failed while rendering notice, using bare notice"
            );
            let mut final_result = StageName::Present.default_result();
            final_result.insert("message".into(), message.into());
            final_result.insert("notice".into(), outcome.as_str().into());
            result.final_result = final_result;
        } else {
            result.final_result = output.result.clone();
        }
        result.record(input, output);
        result.outcome = outcome;

        info!(
            outcome = %outcome,
            replans = result.replans_applied,
            events = result.replan_events.len(),
            "Request concluded"
        );
        Ok(result)
    }

    /// Close out a cancelled request without further stage calls
    fn cancelled(&self, mut result: LoopResult) -> LoopResult {
        info!(stages = result.stage_outputs.len(), "Request cancelled");
        let mut final_result = StageName::Present.default_result();
        final_result.insert("message".into(), CANCELLED_MESSAGE.into());
        final_result.insert("notice".into(), QueryOutcome::Cancelled.as_str().into());
        result.final_result = final_result;
        result.outcome = QueryOutcome::Cancelled;
        result
    }
}
