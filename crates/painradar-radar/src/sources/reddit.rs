//! Reddit search through the public (unauthenticated) JSON listing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use painradar_core::{calculate_engagement, EngagementMetrics, NormalizedPost, Platform};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;

use super::{Fetcher, PlatformAdapter};
use crate::error::RadarError;

const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    author: Option<String>,
    title: Option<String>,
    selftext: Option<String>,
    permalink: Option<String>,
    score: Option<i64>,
    num_comments: Option<i64>,
    created_utc: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RedditAdapter {
    fetcher: Fetcher,
    base_url: String,
}

impl RedditAdapter {
    #[must_use]
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PlatformAdapter for RedditAdapter {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    async fn search(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedPost>, RadarError> {
        let url = format!(
            "{}/search.json?q={}&limit={}&sort=relevance&t=week",
            self.base_url.trim_end_matches('/'),
            utf8_percent_encode(keyword, NON_ALPHANUMERIC),
            limit.clamp(1, MAX_PAGE_SIZE)
        );
        let listing: Listing = self.fetcher.get_json(Platform::Reddit, &url).await?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| normalize_post(child.data))
            .collect())
    }
}

fn normalize_post(post: PostData) -> NormalizedPost {
    let author = post.author.unwrap_or_else(|| "[deleted]".to_string());
    let title = post.title.unwrap_or_default();
    let content = post
        .selftext
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| title.clone());
    let metrics = EngagementMetrics {
        likes: post.score.unwrap_or(0),
        comments: post.num_comments.unwrap_or(0),
        shares: 0,
    };
    #[allow(clippy::cast_possible_truncation)]
    let published_at = post
        .created_utc
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
        .unwrap_or_else(Utc::now);

    NormalizedPost {
        platform: Platform::Reddit,
        url: format!("https://reddit.com{}", post.permalink.unwrap_or_default()),
        author_url: Some(format!("https://reddit.com/user/{author}")),
        platform_id: post.id,
        author,
        title,
        content,
        metrics,
        engagement: calculate_engagement(metrics),
        published_at,
    }
}
