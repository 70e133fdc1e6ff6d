//! Database operations for the `pain_scans` table.
//!
//! A scan is inserted `RUNNING` and moved exactly once to `COMPLETED` or
//! `FAILED`; the terminal updates only match rows still in `RUNNING`.

use chrono::{DateTime, Utc};
use painradar_core::ScanStatus;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `pain_scans` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanRow {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub keyword_id: Uuid,
    /// Comma-separated platform identifiers the scan targeted.
    pub platforms: String,
    pub status: String,
    pub posts_found: i32,
    pub posts_new: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const SCAN_COLUMNS: &str = "id, workspace_id, keyword_id, platforms, status, posts_found, \
     posts_new, error_message, started_at, completed_at, created_at";

/// Insert a scan in `RUNNING` with `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_scan(
    pool: &PgPool,
    workspace_id: Uuid,
    keyword_id: Uuid,
    platforms: &str,
) -> Result<ScanRow, DbError> {
    let sql = format!(
        "INSERT INTO pain_scans (id, workspace_id, keyword_id, platforms, status) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {SCAN_COLUMNS}"
    );

    let row = sqlx::query_as::<_, ScanRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(workspace_id)
        .bind(keyword_id)
        .bind(platforms)
        .bind(ScanStatus::Running.as_str())
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Mark a running scan `COMPLETED` with its post counts.
///
/// # Errors
///
/// Returns [`DbError::InvalidScanTransition`] if the scan is not `RUNNING`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_scan(
    pool: &PgPool,
    id: Uuid,
    posts_found: i32,
    posts_new: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pain_scans \
         SET status = $1, completed_at = NOW(), posts_found = $2, posts_new = $3 \
         WHERE id = $4 AND status = $5",
    )
    .bind(ScanStatus::Completed.as_str())
    .bind(posts_found)
    .bind(posts_new)
    .bind(id)
    .bind(ScanStatus::Running.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidScanTransition {
            id,
            expected_status: "RUNNING",
        });
    }

    Ok(())
}

/// Mark a running scan `FAILED` with the error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidScanTransition`] if the scan is not `RUNNING`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_scan(pool: &PgPool, id: Uuid, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pain_scans \
         SET status = $1, completed_at = NOW(), error_message = $2 \
         WHERE id = $3 AND status = $4",
    )
    .bind(ScanStatus::Failed.as_str())
    .bind(error_message)
    .bind(id)
    .bind(ScanStatus::Running.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidScanTransition {
            id,
            expected_status: "RUNNING",
        });
    }

    Ok(())
}

/// Fetch one scan, scoped to its workspace.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such scan exists in the workspace, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_scan(pool: &PgPool, workspace_id: Uuid, id: Uuid) -> Result<ScanRow, DbError> {
    let sql = format!(
        "SELECT {SCAN_COLUMNS} FROM pain_scans \
         WHERE id = $1 AND workspace_id = $2"
    );

    sqlx::query_as::<_, ScanRow>(&sql)
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// The workspace's most recent `limit` scans, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_scans(
    pool: &PgPool,
    workspace_id: Uuid,
    limit: i64,
) -> Result<Vec<ScanRow>, DbError> {
    let sql = format!(
        "SELECT {SCAN_COLUMNS} FROM pain_scans \
         WHERE workspace_id = $1 \
         ORDER BY created_at DESC, id \
         LIMIT $2"
    );

    let rows = sqlx::query_as::<_, ScanRow>(&sql)
        .bind(workspace_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
