//! Database operations for the `social_posts` table.
//!
//! `(platform, platform_id)` is unique; callers reconcile through
//! [`find_post_by_key`] before deciding between [`insert_post`] and
//! [`update_post_metrics`].

use chrono::{DateTime, Utc};
use painradar_core::{EngagementMetrics, NormalizedPost};
use sqlx::PgPool;
use uuid::Uuid;

use crate::pains::like_pattern;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `social_posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub keyword_id: Uuid,
    pub platform: String,
    pub platform_id: String,
    pub author: String,
    pub author_url: Option<String>,
    pub title: String,
    pub content: String,
    pub url: String,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub engagement: i64,
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    /// `NULL` until Stage 1 has scored the post.
    pub filter_score: Option<i16>,
    pub is_analyzed: bool,
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl PostRow {
    #[must_use]
    pub fn metrics(&self) -> EngagementMetrics {
        EngagementMetrics {
            likes: self.likes,
            comments: self.comments,
            shares: self.shares,
        }
    }
}

/// A post together with the category of the keyword that found it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisPostRow {
    #[sqlx(flatten)]
    pub post: PostRow,
    pub keyword_category: Option<String>,
}

/// Filters and paging for [`list_posts`].
#[derive(Debug, Clone, Default)]
pub struct PostFilters<'a> {
    pub keyword_id: Option<Uuid>,
    pub is_analyzed: Option<bool>,
    /// Case-insensitive substring match on title or content.
    pub search: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}

const POST_FILTER_CLAUSE: &str = "k.workspace_id = $1 \
       AND ($2::uuid IS NULL OR p.keyword_id = $2) \
       AND ($3::boolean IS NULL OR p.is_analyzed = $3) \
       AND ($4::TEXT IS NULL \
            OR p.title ILIKE $4 ESCAPE '\\' \
            OR p.content ILIKE $4 ESCAPE '\\')";

const POST_COLUMNS: &str = "id, keyword_id, platform, platform_id, author, author_url, title, \
     content, url, likes, comments, shares, engagement, published_at, fetched_at, \
     filter_score, is_analyzed, analyzed_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Look up a post by its natural key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_post_by_key(
    pool: &PgPool,
    platform: &str,
    platform_id: &str,
) -> Result<Option<PostRow>, DbError> {
    let sql = format!(
        "SELECT {POST_COLUMNS} FROM social_posts \
         WHERE platform = $1 AND platform_id = $2"
    );

    let row = sqlx::query_as::<_, PostRow>(&sql)
        .bind(platform)
        .bind(platform_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Insert a newly observed post under the keyword that found it.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if the natural key already exists (a
/// concurrent scan won the race), or [`DbError::Sqlx`] on any other failure.
pub async fn insert_post(
    pool: &PgPool,
    keyword_id: Uuid,
    post: &NormalizedPost,
) -> Result<PostRow, DbError> {
    let sql = format!(
        "INSERT INTO social_posts \
             (id, keyword_id, platform, platform_id, author, author_url, title, content, url, \
              likes, comments, shares, engagement, published_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         RETURNING {POST_COLUMNS}"
    );

    sqlx::query_as::<_, PostRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(keyword_id)
        .bind(post.platform.as_str())
        .bind(&post.platform_id)
        .bind(&post.author)
        .bind(post.author_url.as_deref())
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.url)
        .bind(post.metrics.likes)
        .bind(post.metrics.comments)
        .bind(post.metrics.shares)
        .bind(post.engagement)
        .bind(post.published_at)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            DbError::conflict_on_unique(
                e,
                format!("post {}:{} already exists", post.platform, post.platform_id),
            )
        })
}

/// Refresh a post's engagement counters in place.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the post no longer exists, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_post_metrics(
    pool: &PgPool,
    id: Uuid,
    metrics: EngagementMetrics,
    engagement: i64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE social_posts \
         SET likes = $1, comments = $2, shares = $3, engagement = $4, fetched_at = NOW() \
         WHERE id = $5",
    )
    .bind(metrics.likes)
    .bind(metrics.comments)
    .bind(metrics.shares)
    .bind(engagement)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Load the requested posts that belong to the workspace, in `published_at`
/// order. Ids from other workspaces are silently dropped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts_by_ids(
    pool: &PgPool,
    workspace_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<AnalysisPostRow>, DbError> {
    let rows = sqlx::query_as::<_, AnalysisPostRow>(
        "SELECT p.id, p.keyword_id, p.platform, p.platform_id, p.author, p.author_url, \
                p.title, p.content, p.url, p.likes, p.comments, p.shares, p.engagement, \
                p.published_at, p.fetched_at, p.filter_score, p.is_analyzed, p.analyzed_at, \
                k.category AS keyword_category \
         FROM social_posts p \
         JOIN pain_keywords k ON k.id = p.keyword_id \
         WHERE k.workspace_id = $1 AND p.id = ANY($2) \
         ORDER BY p.published_at DESC, p.id",
    )
    .bind(workspace_id)
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// One page of the workspace's stored posts, newest first, plus the total
/// matching the filters.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_posts(
    pool: &PgPool,
    workspace_id: Uuid,
    filters: &PostFilters<'_>,
) -> Result<(Vec<PostRow>, i64), DbError> {
    let pattern = filters.search.map(like_pattern);

    let sql = format!(
        "SELECT p.id, p.keyword_id, p.platform, p.platform_id, p.author, p.author_url, \
                p.title, p.content, p.url, p.likes, p.comments, p.shares, p.engagement, \
                p.published_at, p.fetched_at, p.filter_score, p.is_analyzed, p.analyzed_at \
         FROM social_posts p \
         JOIN pain_keywords k ON k.id = p.keyword_id \
         WHERE {POST_FILTER_CLAUSE} \
         ORDER BY p.published_at DESC, p.id \
         LIMIT $5 OFFSET $6"
    );

    let rows = sqlx::query_as::<_, PostRow>(&sql)
        .bind(workspace_id)
        .bind(filters.keyword_id)
        .bind(filters.is_analyzed)
        .bind(pattern.as_deref())
        .bind(filters.limit)
        .bind(filters.offset)
        .fetch_all(pool)
        .await?;

    let count_sql = format!(
        "SELECT COUNT(*) FROM social_posts p \
         JOIN pain_keywords k ON k.id = p.keyword_id \
         WHERE {POST_FILTER_CLAUSE}"
    );
    let total = sqlx::query_scalar::<_, i64>(&count_sql)
        .bind(workspace_id)
        .bind(filters.keyword_id)
        .bind(filters.is_analyzed)
        .bind(pattern.as_deref())
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

/// The keyword's most recently published posts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_posts_for_keyword(
    pool: &PgPool,
    keyword_id: Uuid,
    limit: i64,
) -> Result<Vec<PostRow>, DbError> {
    let sql = format!(
        "SELECT {POST_COLUMNS} FROM social_posts \
         WHERE keyword_id = $1 \
         ORDER BY published_at DESC, id \
         LIMIT $2"
    );

    let rows = sqlx::query_as::<_, PostRow>(&sql)
        .bind(keyword_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Number of posts fetched into the workspace since `since`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_posts_since(
    pool: &PgPool,
    workspace_id: Uuid,
    since: DateTime<Utc>,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM social_posts p \
         JOIN pain_keywords k ON k.id = p.keyword_id \
         WHERE k.workspace_id = $1 AND p.fetched_at >= $2",
    )
    .bind(workspace_id)
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
