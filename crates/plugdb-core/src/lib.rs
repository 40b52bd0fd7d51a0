//! Shared domain types and configuration for the plugin catalog crawler.

pub mod app_config;
pub mod config;
pub mod records;
pub mod slug;

use thiserror::Error;

pub use app_config::{AppConfig, CrawlerSettings, Environment, StoreCredential};
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{RawCandidateRecord, ValidatedRecord, DEFAULT_CURRENCY, UNKNOWN_DEVELOPER};
pub use slug::name_to_slug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
