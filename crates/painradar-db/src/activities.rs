//! Append-only audit trail in the `activities` table.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// One audit record, e.g. `pain_scan` / `completed`.
#[derive(Debug, Clone)]
pub struct NewActivity<'a> {
    pub workspace_id: Uuid,
    pub user_id: Option<&'a str>,
    pub activity_type: &'a str,
    pub entity_type: &'a str,
    pub entity_id: String,
    pub action: &'a str,
    /// Stored as JSONB; should be a JSON object.
    pub new_value: Value,
}

/// Insert an activity record and return its generated id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_activity(pool: &PgPool, activity: &NewActivity<'_>) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO activities \
             (workspace_id, user_id, activity_type, entity_type, entity_id, action, new_value) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(activity.workspace_id)
    .bind(activity.user_id)
    .bind(activity.activity_type)
    .bind(activity.entity_type)
    .bind(&activity.entity_id)
    .bind(activity.action)
    .bind(&activity.new_value)
    .fetch_one(pool)
    .await?;

    Ok(id)
}
