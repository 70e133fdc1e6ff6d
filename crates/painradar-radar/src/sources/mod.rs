//! Platform adapters.
//!
//! Every adapter takes a [`RateLimiter`] slot before each request and wraps
//! the request in the retry helper, so callers never rate-limit themselves.

mod habr;
mod hackernews;
mod reddit;
mod rss_helpers;

use std::sync::Arc;

use async_trait::async_trait;
use painradar_core::{NormalizedPost, Platform};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;

use crate::config::RadarConfig;
use crate::error::RadarError;
use crate::rate_limit::{retry_with_backoff, RateLimiter};

pub use habr::HabrAdapter;
pub use hackernews::HackerNewsAdapter;
pub use reddit::RedditAdapter;

/// A searchable external content platform.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Return up to `limit` posts matching `keyword`, normalized.
    async fn search(&self, keyword: &str, limit: usize)
        -> Result<Vec<NormalizedPost>, RadarError>;
}

/// Build the in-tree adapters (Hacker News, Reddit, Habr) sharing one limiter.
///
/// # Errors
///
/// Returns [`RadarError::Http`] if the HTTP client cannot be built.
pub fn default_adapters(
    config: &RadarConfig,
    limiter: &RateLimiter,
) -> Result<Vec<Arc<dyn PlatformAdapter>>, RadarError> {
    let fetcher = Fetcher::new(config, limiter.clone())?;
    Ok(vec![
        Arc::new(HackerNewsAdapter::new(fetcher.clone())),
        Arc::new(RedditAdapter::new(fetcher.clone())),
        Arc::new(HabrAdapter::new(fetcher)),
    ])
}

/// Rate-limited, retrying HTTP GET shared by the adapters.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    limiter: RateLimiter,
    max_attempts: u32,
    backoff_base_ms: u64,
}

impl Fetcher {
    /// # Errors
    ///
    /// Returns [`RadarError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &RadarConfig, limiter: RateLimiter) -> Result<Self, RadarError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            client,
            limiter,
            max_attempts: config.max_attempts,
            backoff_base_ms: config.backoff_base_ms,
        })
    }

    async fn get_text(&self, platform: Platform, url: &str) -> Result<String, RadarError> {
        retry_with_backoff(self.max_attempts, self.backoff_base_ms, || async move {
            self.limiter.wait_for_slot(platform).await;
            tracing::debug!(%platform, url, "fetching");

            let response = self.client.get(url).send().await?;
            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(RadarError::RateLimited {
                    platform,
                    retry_after_secs,
                });
            }
            if !status.is_success() {
                return Err(RadarError::UnexpectedStatus {
                    platform,
                    status: status.as_u16(),
                });
            }
            Ok::<_, RadarError>(response.text().await?)
        })
        .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        platform: Platform,
        url: &str,
    ) -> Result<T, RadarError> {
        let body = self.get_text(platform, url).await?;
        serde_json::from_str(&body).map_err(|source| RadarError::Deserialize {
            context: format!("{platform} search response"),
            source,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_fetcher() -> Fetcher {
    let config = RadarConfig {
        max_attempts: 2,
        backoff_base_ms: 0,
        ..RadarConfig::default()
    };
    Fetcher::new(&config, RateLimiter::new()).expect("client builds")
}
