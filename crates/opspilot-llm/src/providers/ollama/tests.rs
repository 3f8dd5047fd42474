use super::convert;
use super::provider::OllamaProvider;
use super::security::sanitize_api_error;
use super::types::{OllamaConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::completion::CompletionRequest;
use crate::message::Message;
use std::time::Duration;

#[test]
fn test_config_builder() {
    let config = OllamaConfig::new()
        .with_model("mistral")
        .with_base_url("http://10.0.0.7:11434")
        .with_max_tokens(1024)
        .with_timeout(Duration::from_secs(30));

    assert_eq!(config.default_model, "mistral");
    assert_eq!(config.base_url, "http://10.0.0.7:11434");
    assert_eq!(config.default_max_tokens, 1024);
    assert_eq!(config.timeout, Duration::from_secs(30));
}

#[test]
fn test_default_config() {
    let config = OllamaConfig::default();

    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.default_model, DEFAULT_MODEL);
}

#[test]
fn test_message_conversion() {
    let messages = vec![
        Message::system("Route the question"),
        Message::user("hello"),
        Message::assistant("{\"kind\":\"direct\"}"),
    ];

    let converted = convert::convert_messages(&messages);

    assert_eq!(converted.len(), 3);
    assert_eq!(converted[0].role, "system");
    assert_eq!(converted[1].role, "user");
    assert_eq!(converted[2].role, "assistant");
}

#[test]
fn test_json_mode_sets_format() {
    let provider = OllamaProvider::new(OllamaConfig::default()).unwrap();

    let request = CompletionRequest::new("")
        .with_message(Message::user("hello"))
        .with_json_mode();
    let built = provider.build_request(&request);
    assert_eq!(built.format.as_deref(), Some("json"));
    assert_eq!(built.model, DEFAULT_MODEL);

    let plain = provider.build_request(&CompletionRequest::new("llama3.1:8b"));
    assert!(plain.format.is_none());
    assert_eq!(plain.model, "llama3.1:8b");
}

#[test]
fn test_sanitize_api_error() {
    let sanitized = sanitize_api_error("Error loading model from /home/ops/.ollama/models");
    assert!(!sanitized.contains("/home"));
    assert!(sanitized.contains("installation"));

    let sanitized = sanitize_api_error("connection refused");
    assert!(sanitized.contains("Ollama running"));

    let sanitized = sanitize_api_error("model 'llama3' not found");
    assert!(sanitized.contains("pull"));
}
