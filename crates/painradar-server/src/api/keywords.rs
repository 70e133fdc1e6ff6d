//! Tracked keyword handlers: list, create, update, soft-disable.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use painradar_db::{KeywordRow, KeywordUpdate, KeywordWithCountsRow, NewActivity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, user_id, validation_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CreateKeywordRequest {
    pub keyword: String,
    pub category: Option<String>,
}

// Option<Option<T>> separates "not sent" from "cleared" for the category.
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateKeywordRequest {
    pub keyword: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[allow(clippy::option_option)]
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct KeywordItem {
    id: Uuid,
    keyword: String,
    category: Option<String>,
    is_active: bool,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scan_count: Option<i64>,
}

impl From<KeywordRow> for KeywordItem {
    fn from(row: KeywordRow) -> Self {
        Self {
            id: row.id,
            keyword: row.keyword,
            category: row.category,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            post_count: None,
            scan_count: None,
        }
    }
}

impl From<KeywordWithCountsRow> for KeywordItem {
    fn from(row: KeywordWithCountsRow) -> Self {
        Self {
            id: row.id,
            keyword: row.keyword,
            category: row.category,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            post_count: Some(row.post_count),
            scan_count: Some(row.scan_count),
        }
    }
}

/// GET /api/v1/workspaces/{workspace_id}/keywords
pub(super) async fn list_keywords(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<KeywordItem>>>, ApiError> {
    let rows = painradar_db::list_keywords_with_counts(&state.pool, workspace_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(KeywordItem::from).collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// POST /api/v1/workspaces/{workspace_id}/keywords
pub(super) async fn create_keyword(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(workspace_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<CreateKeywordRequest>,
) -> Result<(StatusCode, Json<ApiResponse<KeywordItem>>), ApiError> {
    let rid = &req_id.0;
    let keyword =
        painradar_core::validate_keyword(&body.keyword).map_err(|e| validation_error(rid, e.to_string()))?;
    let category = painradar_core::validate_category(body.category.as_deref())
        .map_err(|e| validation_error(rid, e.to_string()))?;
    let actor = user_id(&headers);

    let row = painradar_db::create_keyword(
        &state.pool,
        workspace_id,
        &keyword,
        category.as_deref(),
        actor.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    let activity = NewActivity {
        workspace_id,
        user_id: actor.as_deref(),
        activity_type: "CREATE",
        entity_type: "pain_keyword",
        entity_id: row.id.to_string(),
        action: "created",
        new_value: serde_json::json!({ "keyword": row.keyword }),
    };
    if let Err(e) = painradar_db::insert_activity(&state.pool, &activity).await {
        tracing::warn!(keyword_id = %row.id, error = %e, "failed to record keyword activity");
    }

    tracing::info!(workspace_id = %workspace_id, keyword = %row.keyword, "keyword created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, KeywordItem::from(row))),
    ))
}

/// PATCH /api/v1/workspaces/{workspace_id}/keywords/{keyword_id}
pub(super) async fn update_keyword(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((workspace_id, keyword_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateKeywordRequest>,
) -> Result<Json<ApiResponse<KeywordItem>>, ApiError> {
    let rid = &req_id.0;
    let keyword = body
        .keyword
        .as_deref()
        .map(painradar_core::validate_keyword)
        .transpose()
        .map_err(|e| validation_error(rid, e.to_string()))?;
    let category = body
        .category
        .as_ref()
        .map(|c| painradar_core::validate_category(c.as_deref()))
        .transpose()
        .map_err(|e| validation_error(rid, e.to_string()))?;

    let update = KeywordUpdate {
        keyword: keyword.as_deref(),
        category: category.as_ref().map(Option::as_deref),
        is_active: body.is_active,
    };
    let row = painradar_db::update_keyword(&state.pool, workspace_id, keyword_id, update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, KeywordItem::from(row))))
}

/// DELETE /api/v1/workspaces/{workspace_id}/keywords/{keyword_id}
///
/// Keywords are never removed while scans reference them; this only clears
/// the active flag so scheduled and manual scans skip it.
pub(super) async fn deactivate_keyword(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((workspace_id, keyword_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<KeywordItem>>, ApiError> {
    let update = KeywordUpdate {
        is_active: Some(false),
        ..KeywordUpdate::default()
    };
    let row = painradar_db::update_keyword(&state.pool, workspace_id, keyword_id, update)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(keyword_id = %keyword_id, "keyword deactivated");
    Ok(Json(ApiResponse::new(req_id.0, KeywordItem::from(row))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_cleared_category() {
        let cleared: UpdateKeywordRequest =
            serde_json::from_str(r#"{"category": null}"#).expect("parse");
        assert_eq!(cleared.category, Some(None));

        let absent: UpdateKeywordRequest =
            serde_json::from_str(r#"{"isActive": false}"#).expect("parse");
        assert_eq!(absent.category, None);
        assert_eq!(absent.is_active, Some(false));
    }
}
