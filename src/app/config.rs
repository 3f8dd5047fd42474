//! Application configuration types

use opspilot_core::CoreConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

impl AppConfig {
    /// Orchestration settings for the core
    pub fn core_config(&self) -> CoreConfig {
        CoreConfig::new()
            .with_max_replans(self.pipeline.max_replans)
            .with_stage_timeout(Duration::from_secs(self.pipeline.stage_timeout_secs))
            .with_routing_timeout(Duration::from_secs(self.pipeline.routing_timeout_secs))
            .with_cache_ttl(Duration::from_secs(self.cache.ttl_secs))
            .with_cache_capacity(self.cache.capacity)
            .with_cache_max_question_chars(self.cache.max_question_chars)
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_replans")]
    pub max_replans: u32,
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_secs: u64,
    #[serde(default = "default_routing_timeout")]
    pub routing_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_replans: default_max_replans(),
            stage_timeout_secs: default_stage_timeout(),
            routing_timeout_secs: default_routing_timeout(),
        }
    }
}

fn default_max_replans() -> u32 {
    2
}
fn default_stage_timeout() -> u64 {
    30
}
fn default_routing_timeout() -> u64 {
    60
}

/// Route cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Longer questions bypass the cache
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            capacity: default_cache_capacity(),
            max_question_chars: default_max_question_chars(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    300
}
fn default_cache_capacity() -> usize {
    1024
}
fn default_max_question_chars() -> usize {
    160
}

/// Planning backend (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.2".to_string()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_llm_timeout() -> u64 {
    120
}

/// Asset manifest location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
        }
    }
}

fn default_manifest() -> PathBuf {
    PathBuf::from("config/assets.toml")
}

/// Data source fixtures location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_fixtures")]
    pub fixtures: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            fixtures: default_fixtures(),
        }
    }
}

fn default_fixtures() -> PathBuf {
    PathBuf::from("config/fixtures.json")
}

/// Trace persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Defaults to `~/.opspilot/traces.db`
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: None,
        }
    }
}

impl ReplayConfig {
    /// Trace database location
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(opspilot_replay::store::default_db_path)
    }
}

fn default_true() -> bool {
    true
}
