use crate::message::Message;
use crate::providers::ollama::types::OllamaMessage;

/// Convert messages to Ollama format
pub(crate) fn convert_messages(messages: &[Message]) -> Vec<OllamaMessage> {
    messages
        .iter()
        .map(|msg| OllamaMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        })
        .collect()
}
