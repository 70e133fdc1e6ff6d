//! Database operations for the `pain_keywords` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `pain_keywords` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub keyword: String,
    pub category: Option<String>,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A keyword with the number of posts and scans recorded against it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordWithCountsRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub keyword: String,
    pub category: Option<String>,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub post_count: i64,
    pub scan_count: i64,
}

/// Partial update applied by [`update_keyword`]. `None` leaves a column as is.
///
/// `category: Some(None)` clears the category.
#[derive(Debug, Clone, Default)]
pub struct KeywordUpdate<'a> {
    pub keyword: Option<&'a str>,
    pub category: Option<Option<&'a str>>,
    pub is_active: Option<bool>,
}

const KEYWORD_COLUMNS: &str =
    "id, workspace_id, keyword, category, is_active, created_by, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a new active keyword for a workspace.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if the workspace already tracks the same
/// keyword, or [`DbError::Sqlx`] on any other failure.
pub async fn create_keyword(
    pool: &PgPool,
    workspace_id: Uuid,
    keyword: &str,
    category: Option<&str>,
    created_by: Option<&str>,
) -> Result<KeywordRow, DbError> {
    let sql = format!(
        "INSERT INTO pain_keywords (id, workspace_id, keyword, category, created_by) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {KEYWORD_COLUMNS}"
    );

    sqlx::query_as::<_, KeywordRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(keyword)
        .bind(category)
        .bind(created_by)
        .fetch_one(pool)
        .await
        .map_err(|e| DbError::conflict_on_unique(e, format!("keyword '{keyword}' already exists")))
}

/// Fetch one keyword, scoped to its workspace.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the keyword does not exist in the
/// workspace, or [`DbError::Sqlx`] if the query fails.
pub async fn get_keyword(
    pool: &PgPool,
    workspace_id: Uuid,
    id: Uuid,
) -> Result<KeywordRow, DbError> {
    let sql = format!(
        "SELECT {KEYWORD_COLUMNS} FROM pain_keywords \
         WHERE id = $1 AND workspace_id = $2"
    );

    sqlx::query_as::<_, KeywordRow>(&sql)
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// List every keyword in a workspace with post and scan counts, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_keywords_with_counts(
    pool: &PgPool,
    workspace_id: Uuid,
) -> Result<Vec<KeywordWithCountsRow>, DbError> {
    let rows = sqlx::query_as::<_, KeywordWithCountsRow>(
        "SELECT k.id, k.workspace_id, k.keyword, k.category, k.is_active, k.created_by, \
                k.created_at, k.updated_at, \
                (SELECT COUNT(*) FROM social_posts p WHERE p.keyword_id = k.id) AS post_count, \
                (SELECT COUNT(*) FROM pain_scans s WHERE s.keyword_id = k.id) AS scan_count \
         FROM pain_keywords k \
         WHERE k.workspace_id = $1 \
         ORDER BY k.created_at DESC, k.keyword",
    )
    .bind(workspace_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All active keywords across every workspace; drives scheduled scans.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_keywords(pool: &PgPool) -> Result<Vec<KeywordRow>, DbError> {
    let sql = format!(
        "SELECT {KEYWORD_COLUMNS} FROM pain_keywords \
         WHERE is_active = true \
         ORDER BY workspace_id, keyword"
    );

    let rows = sqlx::query_as::<_, KeywordRow>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Apply a partial update to a keyword and return the new row.
///
/// Deactivation goes through here as well (`is_active: Some(false)`); rows
/// are never hard-deleted.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the keyword does not exist in the
/// workspace, [`DbError::Conflict`] if a rename collides with an existing
/// keyword, or [`DbError::Sqlx`] on any other failure.
pub async fn update_keyword(
    pool: &PgPool,
    workspace_id: Uuid,
    id: Uuid,
    update: KeywordUpdate<'_>,
) -> Result<KeywordRow, DbError> {
    let sql = format!(
        "UPDATE pain_keywords SET \
             keyword    = COALESCE($3, keyword), \
             category   = CASE WHEN $4 THEN $5 ELSE category END, \
             is_active  = COALESCE($6, is_active), \
             updated_at = NOW() \
         WHERE id = $1 AND workspace_id = $2 \
         RETURNING {KEYWORD_COLUMNS}"
    );

    sqlx::query_as::<_, KeywordRow>(&sql)
        .bind(id)
        .bind(workspace_id)
        .bind(update.keyword)
        .bind(update.category.is_some())
        .bind(update.category.flatten())
        .bind(update.is_active)
        .fetch_optional(pool)
        .await
        .map_err(|e| DbError::conflict_on_unique(e, "keyword already exists"))?
        .ok_or(DbError::NotFound)
}
