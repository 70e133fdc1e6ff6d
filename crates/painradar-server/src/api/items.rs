//! Response shapes shared by several handlers, mapped from database rows.

use chrono::{DateTime, Utc};
use painradar_db::{PainRow, PostRow, ScanRow};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PainItem {
    id: Uuid,
    post_id: Uuid,
    pain_text: String,
    category: String,
    severity: String,
    sentiment: f64,
    confidence: f64,
    frequency: i32,
    trend: f64,
    keywords: Vec<String>,
    context: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PainRow> for PainItem {
    fn from(row: PainRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            pain_text: row.pain_text,
            category: row.category,
            severity: row.severity,
            sentiment: row.sentiment,
            confidence: row.confidence,
            frequency: row.frequency,
            trend: row.trend,
            keywords: row.keywords,
            context: row.context,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ScanItem {
    id: Uuid,
    keyword_id: Uuid,
    platforms: Vec<String>,
    status: String,
    posts_found: i32,
    posts_new: i32,
    error_message: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<ScanRow> for ScanItem {
    fn from(row: ScanRow) -> Self {
        Self {
            id: row.id,
            keyword_id: row.keyword_id,
            platforms: row
                .platforms
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            status: row.status,
            posts_found: row.posts_found,
            posts_new: row.posts_new,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PostItem {
    id: Uuid,
    keyword_id: Uuid,
    platform: String,
    platform_id: String,
    author: String,
    author_url: Option<String>,
    title: String,
    content: String,
    url: String,
    likes: i64,
    comments: i64,
    shares: i64,
    engagement: i64,
    published_at: DateTime<Utc>,
    fetched_at: DateTime<Utc>,
    filter_score: Option<i16>,
    is_analyzed: bool,
}

impl From<PostRow> for PostItem {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            keyword_id: row.keyword_id,
            platform: row.platform,
            platform_id: row.platform_id,
            author: row.author,
            author_url: row.author_url,
            title: row.title,
            content: row.content,
            url: row.url,
            likes: row.likes,
            comments: row.comments,
            shares: row.shares,
            engagement: row.engagement,
            published_at: row.published_at,
            fetched_at: row.fetched_at,
            filter_score: row.filter_score,
            is_analyzed: row.is_analyzed,
        }
    }
}
