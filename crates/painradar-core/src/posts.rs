use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Platform;

/// Raw popularity counters reported by a platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

/// Weighted engagement: comments count triple, shares double, likes once.
#[must_use]
pub fn calculate_engagement(metrics: EngagementMetrics) -> i64 {
    metrics
        .comments
        .saturating_mul(3)
        .saturating_add(metrics.shares.saturating_mul(2))
        .saturating_add(metrics.likes)
}

/// A post as produced by any platform adapter.
///
/// `(platform, platform_id)` is the natural key used for dedup and upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPost {
    pub platform: Platform,
    pub platform_id: String,
    pub author: String,
    pub author_url: Option<String>,
    pub title: String,
    pub content: String,
    pub url: String,
    pub metrics: EngagementMetrics,
    pub engagement: i64,
    pub published_at: DateTime<Utc>,
}

impl NormalizedPost {
    /// Natural key borrowed from the post.
    #[must_use]
    pub fn key(&self) -> (Platform, &str) {
        (self.platform, self.platform_id.as_str())
    }

    /// Title and content joined for text matching.
    #[must_use]
    pub fn full_text(&self) -> String {
        if self.title.is_empty() || self.content.starts_with(&self.title) {
            self.content.clone()
        } else {
            format!("{} {}", self.title, self.content)
        }
    }
}
