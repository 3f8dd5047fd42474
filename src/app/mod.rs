//! Application wiring
//!
//! - `config`: `AppConfig` and its sections
//! - `loader`: layered configuration loading
//! - `init`: builds the orchestrator and trace store from configuration

pub mod config;
pub mod init;
pub mod loader;

pub use config::AppConfig;
pub use loader::load_config;
