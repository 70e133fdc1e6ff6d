//! Hacker News search via the Algolia API (Ask HN / Show HN only).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use painradar_core::{calculate_engagement, EngagementMetrics, NormalizedPost, Platform};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;

use super::rss_helpers::strip_html;
use super::{Fetcher, PlatformAdapter};
use crate::error::RadarError;

const DEFAULT_BASE_URL: &str = "https://hn.algolia.com/api/v1";
const MAX_HITS_PER_PAGE: usize = 100;
const TAGS: &str = "ask_hn,show_hn";
const NUMERIC_FILTERS: &str = "points>20,num_comments>5";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    author: Option<String>,
    title: Option<String>,
    story_title: Option<String>,
    story_text: Option<String>,
    comment_text: Option<String>,
    points: Option<i64>,
    num_comments: Option<i64>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct HackerNewsAdapter {
    fetcher: Fetcher,
    base_url: String,
}

impl HackerNewsAdapter {
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

    fn search_url(&self, keyword: &str, limit: usize) -> String {
        let enc = |s: &str| utf8_percent_encode(s, NON_ALPHANUMERIC).to_string();
        format!(
            "{}/search_by_date?query={}&tags={}&numericFilters={}&hitsPerPage={}",
            self.base_url.trim_end_matches('/'),
            enc(keyword),
            enc(TAGS),
            enc(NUMERIC_FILTERS),
            limit.clamp(1, MAX_HITS_PER_PAGE)
        )
    }
}

#[async_trait]
impl PlatformAdapter for HackerNewsAdapter {
    fn platform(&self) -> Platform {
        Platform::HackerNews
    }

    async fn search(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedPost>, RadarError> {
        let url = self.search_url(keyword, limit);
        let response: SearchResponse = self.fetcher.get_json(Platform::HackerNews, &url).await?;
        Ok(response.hits.into_iter().map(normalize_hit).collect())
    }
}

fn normalize_hit(hit: Hit) -> NormalizedPost {
    let author = hit.author.unwrap_or_else(|| "Unknown".to_string());
    let title = hit.title.or(hit.story_title).unwrap_or_default();
    let content = hit
        .story_text
        .or(hit.comment_text)
        .map(|html| strip_html(&html))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| title.clone());
    let metrics = EngagementMetrics {
        likes: hit.points.unwrap_or(0),
        comments: hit.num_comments.unwrap_or(0),
        shares: 0,
    };

    NormalizedPost {
        platform: Platform::HackerNews,
        url: format!("https://news.ycombinator.com/item?id={}", hit.object_id),
        author_url: Some(format!("https://news.ycombinator.com/user?id={author}")),
        platform_id: hit.object_id,
        author,
        title,
        content,
        metrics,
        engagement: calculate_engagement(metrics),
        published_at: hit.created_at.unwrap_or_else(Utc::now),
    }
}
