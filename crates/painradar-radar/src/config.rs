use std::time::Duration;

use painradar_core::{AppConfig, Platform};

/// Pipeline settings derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct RadarConfig {
    pub user_agent: String,
    pub http_timeout: Duration,
    /// Total attempts per adapter request, including the first.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub scan_limit: usize,
    pub min_engagement: i64,
    pub default_platforms: Vec<Platform>,
    pub filter_model: String,
    pub extract_model: String,
    pub filter_batch_size: usize,
    pub inference_concurrency: usize,
}

impl RadarConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            http_timeout: Duration::from_secs(config.http_timeout_secs),
            max_attempts: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            scan_limit: config.scan_limit,
            min_engagement: config.min_engagement,
            default_platforms: config.default_platforms.clone(),
            filter_model: config.filter_model.clone(),
            extract_model: config.extract_model.clone(),
            filter_batch_size: config.filter_batch_size,
            inference_concurrency: config.inference_concurrency,
        }
    }
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            user_agent: "painradar/0.1 (pain-signal-mining)".to_string(),
            http_timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff_base_ms: 1000,
            scan_limit: 50,
            min_engagement: 0,
            default_platforms: vec![Platform::HackerNews, Platform::Reddit, Platform::Habr],
            filter_model: "anthropic/claude-3-haiku".to_string(),
            extract_model: "openai/gpt-4-turbo".to_string(),
            filter_batch_size: 50,
            inference_concurrency: 2,
        }
    }
}
