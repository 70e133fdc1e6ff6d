//! Shared domain types and configuration for the Pain Radar workspace.

pub mod app_config;
pub mod config;
pub mod keywords;
pub mod pains;
pub mod platform;
pub mod posts;
pub mod scans;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use keywords::{
    load_keyword_seeds, validate_category, validate_keyword, KeywordSeed, KeywordsFile,
};
pub use pains::{PainCategory, PainSeverity};
pub use platform::Platform;
pub use posts::{calculate_engagement, EngagementMetrics, NormalizedPost};
pub use scans::ScanStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read keywords file {path}: {source}")]
    KeywordsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse keywords file: {0}")]
    KeywordsFileParse(#[source] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unknown pain category: {0}")]
    UnknownCategory(String),

    #[error("unknown pain severity: {0}")]
    UnknownSeverity(String),

    #[error("unknown scan status: {0}")]
    UnknownScanStatus(String),

    #[error("invalid keyword: {0}")]
    InvalidKeyword(String),
}
