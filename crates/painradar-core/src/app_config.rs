use std::net::SocketAddr;

use crate::Platform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// `None` disables post analysis (Stage 1 / Stage 2).
    pub openrouter_api_key: Option<String>,
    pub inference_base_url: String,
    pub filter_model: String,
    pub extract_model: String,
    pub inference_timeout_secs: u64,
    pub filter_batch_size: usize,
    pub inference_concurrency: usize,
    pub min_engagement: i64,
    pub scan_limit: usize,
    pub default_platforms: Vec<Platform>,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub scan_cron: Option<String>,
    pub scheduler_user_id: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "openrouter_api_key",
                &self.openrouter_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("inference_base_url", &self.inference_base_url)
            .field("filter_model", &self.filter_model)
            .field("extract_model", &self.extract_model)
            .field("inference_timeout_secs", &self.inference_timeout_secs)
            .field("filter_batch_size", &self.filter_batch_size)
            .field("inference_concurrency", &self.inference_concurrency)
            .field("min_engagement", &self.min_engagement)
            .field("scan_limit", &self.scan_limit)
            .field("default_platforms", &self.default_platforms)
            .field("user_agent", &self.user_agent)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("scan_cron", &self.scan_cron)
            .field("scheduler_user_id", &self.scheduler_user_id)
            .finish()
    }
}
