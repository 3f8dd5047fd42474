//! Router - Classifies a question and produces the routing decision
//!
//! The router checks the route cache first, then asks the planning backend
//! with the resolved `planning_prompt` and `planning_constraints` assets.
//! The backend's reply is interpreted into a [`PlanOutput`]; direct and
//! reject decisions are cached, plans never are.

mod backend;
mod llm;

#[cfg(test)]
mod tests;

pub use backend::{PlanningBackend, PlanningRequest, PlanningResponse};
pub use llm::LlmPlanningBackend;

#[cfg(test)]
pub use backend::MockPlanningBackend;

use crate::assets::{AssetKey, AssetResolver};
use crate::cache::RoutePlanCache;
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::plan::{DirectAnswerPayload, Plan, PlanOutput, RejectPayload, RouteKind};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

const ROUTING_ASSETS: [AssetKey; 2] = [AssetKey::PlanningPrompt, AssetKey::PlanningConstraints];

/// Classifies questions into direct, plan or reject decisions
pub struct PlanRouter {
    backend: Arc<dyn PlanningBackend>,
    resolver: AssetResolver,
    cache: Arc<RoutePlanCache>,
    timeout: Duration,
}

impl PlanRouter {
    /// Create a router
    #[must_use]
    pub fn new(
        backend: Arc<dyn PlanningBackend>,
        resolver: AssetResolver,
        cache: Arc<RoutePlanCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            resolver,
            cache,
            timeout,
        }
    }

    /// The route cache
    #[must_use]
    pub fn cache(&self) -> &RoutePlanCache {
        &self.cache
    }

    /// Route a question
    ///
    /// Sets `ctx.cache_key` when the question is cache-eligible and
    /// `ctx.cache_hit` when the decision came from the cache.
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id))]
    pub async fn route(
        &self,
        question: &str,
        tenant_id: &str,
        ctx: &mut ExecutionContext,
    ) -> Result<PlanOutput> {
        let started = Instant::now();
        let cacheable = self.cache.accepts(question);

        if cacheable {
            let (hit, key) = self.cache.get(question, tenant_id).await?;
            ctx.cache_key = Some(key);
            if let Some(output) = hit {
                ctx.cache_hit = true;
                info!(kind = %output.kind(), "Routing served from cache");
                return Ok(output.with_elapsed_ms(started.elapsed().as_millis() as u64));
            }
        }

        let assets = self.resolver.resolve_all(&ROUTING_ASSETS, ctx).await?;
        ctx.routing_assets = assets
            .iter()
            .map(|(key, asset)| (key.clone(), asset.version_id.clone()))
            .collect();
        let instructions = assets
            .get(AssetKey::PlanningPrompt.as_str())
            .map(|a| a.text().to_string())
            .unwrap_or_default();
        let constraints = assets
            .get(AssetKey::PlanningConstraints.as_str())
            .map(|a| a.payload.clone())
            .unwrap_or(Value::Null);

        let request = PlanningRequest {
            question: question.to_string(),
            tenant_id: tenant_id.to_string(),
            instructions,
            constraints,
        };

        let token = ctx.cancellation_token();
        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Error::Cancelled),
            res = tokio::time::timeout(self.timeout, self.backend.classify_and_plan(&request)) => {
                match res {
                    Ok(response) => response?,
                    Err(_) => {
                        return Err(Error::Timeout {
                            operation: format!("planning backend '{}'", self.backend.name()),
                            seconds: self.timeout.as_secs(),
                        })
                    }
                }
            }
        };

        let output = interpret(response)?.with_elapsed_ms(started.elapsed().as_millis() as u64);
        info!(
            kind = %output.kind(),
            elapsed_ms = output.elapsed_ms,
            "Question routed"
        );

        if cacheable && output.kind() != RouteKind::Plan {
            self.cache
                .set(question, tenant_id, output.kind(), &output)
                .await?;
        }
        Ok(output)
    }
}

fn payload<T: DeserializeOwned>(kind: RouteKind, payload: Value) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|e| Error::Planning(format!("malformed {kind} payload: {e}")))
}

/// Turn a backend reply into a routing decision
pub(crate) fn interpret(response: PlanningResponse) -> Result<PlanOutput> {
    let kind: RouteKind = response.kind.parse().map_err(Error::Planning)?;
    debug!(kind = %kind, "Interpreting planning reply");

    let output = match kind {
        RouteKind::Direct => {
            let mut direct = payload::<DirectAnswerPayload>(kind, response.payload)?;
            // Only a cache hit may carry references or the hit flag.
            direct.cache_hit = false;
            direct.references.clear();
            PlanOutput::from_parts(kind, Some(direct), None, None)?
        }
        RouteKind::Plan => {
            PlanOutput::from_parts(kind, None, Some(payload::<Plan>(kind, response.payload)?), None)?
        }
        RouteKind::Reject => PlanOutput::from_parts(
            kind,
            None,
            None,
            Some(payload::<RejectPayload>(kind, response.payload)?),
        )?,
    };
    Ok(output.with_reasoning(response.reasoning))
}
