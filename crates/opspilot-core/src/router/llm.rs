//! Planning backend over an LLM provider

use super::backend::{PlanningBackend, PlanningRequest, PlanningResponse};
use crate::error::{Error, Result};
use opspilot_llm::{CompletionRequest, LlmProvider, Message};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

const DEFAULT_MAX_TOKENS: u32 = 2048;

const OUTPUT_CONTRACT: &str = "Reply with a single JSON object and nothing else: \
{\"kind\": \"direct\" | \"plan\" | \"reject\", \"reasoning\": string, \"payload\": object}. \
direct payload: {\"answer_text\", \"confidence\", \"attributions\"}. \
plan payload: {\"steps\": [{\"id\", \"source\", \"operation\", \"params\"}], \
\"view\": {\"entity\", \"time_window_hours\"}, \"limits\": {\"max_rows\"}}. \
reject payload: {\"reason\", \"policy_id\", \"suggestion\"}.";

/// [`PlanningBackend`] that asks an LLM for a JSON decision
pub struct LlmPlanningBackend {
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
    max_tokens: u32,
}

impl LlmPlanningBackend {
    /// Create a backend using the provider's default model
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Use a specific model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the completion token budget
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn system_prompt(request: &PlanningRequest) -> String {
        let constraints = match &request.constraints {
            Value::Null => String::new(),
            other => serde_json::to_string_pretty(other).unwrap_or_default(),
        };
        let mut prompt = request.instructions.trim().to_string();
        if !constraints.is_empty() {
            prompt.push_str("\n\nConstraints:\n");
            prompt.push_str(&constraints);
        }
        prompt.push_str("\n\n");
        prompt.push_str(OUTPUT_CONTRACT);
        prompt
    }
}

/// Pull the JSON object out of a reply, tolerating a fenced block
pub(crate) fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"));
    match unfenced {
        Some(inner) => inner.trim(),
        None => trimmed,
    }
}

pub(crate) fn parse_decision(content: &str) -> Result<PlanningResponse> {
    let value: Value = serde_json::from_str(extract_json(content))
        .map_err(|e| Error::Planning(format!("reply is not JSON: {e}")))?;
    let Value::Object(mut obj) = value else {
        return Err(Error::Planning("reply is not a JSON object".into()));
    };

    let kind = obj
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Planning("reply has no 'kind'".into()))?
        .to_string();
    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    // Some models nest the payload under the kind name instead of "payload".
    let payload = obj
        .remove("payload")
        .or_else(|| obj.remove(kind.trim()))
        .unwrap_or(Value::Null);

    Ok(PlanningResponse {
        kind,
        payload,
        reasoning,
    })
}

#[async_trait::async_trait]
impl PlanningBackend for LlmPlanningBackend {
    fn name(&self) -> &str {
        self.provider.name()
    }

    #[instrument(skip_all, fields(provider = self.provider.name(), tenant_id = %request.tenant_id))]
    async fn classify_and_plan(&self, request: &PlanningRequest) -> Result<PlanningResponse> {
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());
        let completion = CompletionRequest::new(model)
            .with_message(Message::system(Self::system_prompt(request)))
            .with_message(Message::user(request.question.clone()))
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.0)
            .with_json_mode();

        let response = self.provider.complete(completion).await?;
        debug!(
            chars = response.content.len(),
            model = %response.model,
            "Planning reply received"
        );
        parse_decision(&response.content)
    }
}
