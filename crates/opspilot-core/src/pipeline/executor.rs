//! Stage executor

use super::compose::ComposeStage;
use super::execute::ExecuteStage;
use super::present::{PresentNotice, PresentStage};
use super::stage::{
    Stage, StageAssets, StageCall, StageDiagnostics, StageInput, StageName, StageOutput,
    StageReport,
};
use super::validate::ValidateStage;
use crate::assets::AssetResolver;
use crate::config::CoreConfig;
use crate::context::ExecutionContext;
use crate::data::DataSource;
use crate::error::{Error, Result};
use crate::plan::{PlanOutput, RouteKind};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Where a pipeline run starts
#[derive(Debug, Clone, PartialEq)]
pub enum StartPoint {
    /// Record `route_plan`, then run everything after it
    Beginning,
    /// Re-enter at a stage with the given previous result
    Stage {
        /// First stage to run
        stage: StageName,
        /// Result the stage receives as `prev_output`
        prev_output: Option<Map<String, Value>>,
    },
}

/// Record of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    /// Stage inputs, in call order
    pub stage_inputs: Vec<StageInput>,
    /// Stage outputs, paired with `stage_inputs`
    pub stage_outputs: Vec<StageOutput>,
    /// Result of the last stage that ran
    pub final_result: Map<String, Value>,
    /// Stage whose diagnostics stopped the run, if any
    pub halted_at: Option<StageName>,
    /// Whether the caller cancelled the run
    pub cancelled: bool,
}

impl PipelineRun {
    /// Last output of the run
    #[must_use]
    pub fn last_output(&self) -> Option<&StageOutput> {
        self.stage_outputs.last()
    }

    fn push(&mut self, input: StageInput, output: StageOutput) {
        self.final_result = output.result.clone();
        self.stage_inputs.push(input);
        self.stage_outputs.push(output);
    }
}

/// Runs the fixed stage pipeline for one routing decision
pub struct StageExecutor {
    resolver: AssetResolver,
    stages: HashMap<StageName, Arc<dyn Stage>>,
    stage_timeout: std::time::Duration,
}

impl StageExecutor {
    /// Create an executor with the built-in stages
    #[must_use]
    pub fn new(resolver: AssetResolver, data: Arc<dyn DataSource>, config: &CoreConfig) -> Self {
        let mut stages: HashMap<StageName, Arc<dyn Stage>> = HashMap::new();
        stages.insert(StageName::Validate, Arc::new(ValidateStage));
        stages.insert(StageName::Execute, Arc::new(ExecuteStage::new(data)));
        stages.insert(StageName::Compose, Arc::new(ComposeStage));
        stages.insert(StageName::Present, Arc::new(PresentStage));

        Self {
            resolver,
            stages,
            stage_timeout: config.stage_timeout,
        }
    }

    /// Replace the implementation of one stage
    ///
    /// `route_plan` runs inside the router and cannot be replaced here.
    #[must_use]
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        if stage.name() != StageName::RoutePlan {
            self.stages.insert(stage.name(), stage);
        }
        self
    }

    /// The `route_plan` input/output pair for a routing decision
    #[must_use]
    pub fn route_plan_record(
        &self,
        plan_output: &PlanOutput,
        ctx: &ExecutionContext,
    ) -> (StageInput, StageOutput) {
        let input = StageInput {
            stage: StageName::RoutePlan,
            attempt: ctx.attempt,
            applied_assets: ctx.routing_assets.clone(),
            params: route_params(ctx),
            prev_output: None,
        };
        let report = StageReport {
            result: plan_output.to_route_result(ctx.cache_hit),
            ..Default::default()
        };
        let mut output =
            StageOutput::from_report(StageName::RoutePlan, ctx.attempt, report, plan_output.elapsed_ms);
        output.diagnostics.set_count("steps", plan_output.as_plan().map_or(0, |p| p.steps.len() as u64));
        (input, output)
    }

    /// The `route_plan` input/output pair for a routing failure
    #[must_use]
    pub fn route_plan_failure(
        &self,
        error: &Error,
        ctx: &ExecutionContext,
        elapsed_ms: u64,
    ) -> (StageInput, StageOutput) {
        let input = StageInput {
            stage: StageName::RoutePlan,
            attempt: ctx.attempt,
            applied_assets: ctx.routing_assets.clone(),
            params: route_params(ctx),
            prev_output: None,
        };
        let mut output = StageOutput::empty(StageName::RoutePlan, ctx.attempt);
        output.diagnostics = StageDiagnostics::failed(error.trigger_code(), error.to_string());
        output.duration_ms = elapsed_ms;
        (input, output)
    }

    /// Run the pipeline for a routing decision
    ///
    /// Direct and reject decisions go straight to `present`. Plan decisions
    /// run every stage from `start`, halting after the first stage whose
    /// diagnostics report an anomaly. Only internal faults are returned as
    /// errors; everything else ends up in the stage diagnostics.
    #[instrument(skip_all, fields(trace_id = %ctx.trace_id, kind = %plan_output.kind(), attempt = ctx.attempt))]
    pub async fn run_pipeline(
        &self,
        plan_output: &PlanOutput,
        ctx: &mut ExecutionContext,
        start: StartPoint,
    ) -> Result<PipelineRun> {
        let mut run = PipelineRun::default();

        let (first, mut prev_output) = match start {
            StartPoint::Beginning => {
                let (input, output) = self.route_plan_record(plan_output, ctx);
                let prev = output.result.clone();
                run.push(input, output);
                (StageName::Validate, Some(prev))
            }
            StartPoint::Stage { stage, prev_output } => (stage, prev_output),
        };

        let stages: &[StageName] = match plan_output.kind() {
            RouteKind::Direct | RouteKind::Reject => &[StageName::Present],
            RouteKind::Plan if first == StageName::RoutePlan => StageName::Validate.from_here(),
            RouteKind::Plan => first.from_here(),
        };

        for &stage in stages {
            if ctx.is_cancelled() {
                info!(stage = %stage, "Cancelled before stage call");
                run.cancelled = true;
                break;
            }

            let (input, output) = self
                .run_stage(stage, Some(plan_output), ctx, prev_output.take(), Map::new())
                .await?;
            let cancelled = output
                .diagnostics
                .errors
                .iter()
                .any(|e| e.code == "cancelled");
            let anomaly = output.is_anomaly();
            prev_output = Some(output.result.clone());
            run.push(input, output);

            if cancelled {
                run.cancelled = true;
                break;
            }
            if anomaly {
                debug!(stage = %stage, "Stage reported an anomaly, halting");
                run.halted_at = Some(stage);
                break;
            }
        }

        Ok(run)
    }

    /// Run `present` with a notice from the control loop
    pub async fn present_notice(
        &self,
        plan_output: Option<&PlanOutput>,
        ctx: &mut ExecutionContext,
        prev_output: Option<Map<String, Value>>,
        notice: PresentNotice,
    ) -> Result<(StageInput, StageOutput)> {
        self.run_stage(
            StageName::Present,
            plan_output,
            ctx,
            prev_output,
            notice.into_params(),
        )
        .await
    }

    async fn run_stage(
        &self,
        name: StageName,
        plan_output: Option<&PlanOutput>,
        ctx: &mut ExecutionContext,
        prev_output: Option<Map<String, Value>>,
        params: Map<String, Value>,
    ) -> Result<(StageInput, StageOutput)> {
        let attempt = ctx.attempt;
        let Some(stage) = self.stages.get(&name).cloned() else {
            return Err(Error::Internal(format!("no implementation for stage {name}")));
        };

        let mut input = StageInput {
            stage: name,
            attempt,
            applied_assets: Default::default(),
            params,
            prev_output,
        };

        let assets = match self.resolver.resolve_all(stage.required_assets(), ctx).await {
            Ok(resolved) => StageAssets::new(resolved),
            Err(e) if e.is_internal_fault() => return Err(e),
            Err(e) => {
                warn!(stage = %name, error = %e, "Stage assets unavailable");
                let mut output = StageOutput::empty(name, attempt);
                output.diagnostics = StageDiagnostics::failed(e.trigger_code(), e.to_string());
                return Ok((input, output));
            }
        };
        input.applied_assets = assets.version_map();

        let token = ctx.cancellation_token();
        let started = Instant::now();
        let call = StageCall {
            input: &input,
            plan_output,
            assets: &assets,
        };
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            res = tokio::time::timeout(self.stage_timeout, stage.run(call, ctx)) => Some(res),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let output = match outcome {
            Some(Ok(report)) => StageOutput::from_report(name, attempt, report, duration_ms),
            Some(Err(_)) => {
                warn!(stage = %name, timeout_secs = self.stage_timeout.as_secs(), "Stage timed out");
                let mut output = StageOutput::empty(name, attempt);
                output.diagnostics = StageDiagnostics::failed(
                    "timeout",
                    format!("{name} exceeded {}s", self.stage_timeout.as_secs()),
                );
                output.duration_ms = duration_ms;
                output
            }
            None => {
                let mut output = StageOutput::empty(name, attempt);
                output.diagnostics = StageDiagnostics::failed("cancelled", "request cancelled");
                output.duration_ms = duration_ms;
                output
            }
        };

        debug!(
            stage = %name,
            status = ?output.diagnostics.status,
            duration_ms,
            "Stage finished"
        );
        Ok((input, output))
    }
}

fn route_params(ctx: &ExecutionContext) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("question".into(), ctx.question.clone().into());
    params.insert("tenant_id".into(), ctx.tenant_id.clone().into());
    if let Some(key) = &ctx.cache_key {
        params.insert("cache_key".into(), key.clone().into());
    }
    params
}
