use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use painradar_core::{PainCategory, PainSeverity};
use painradar_db::{NewActivity, PainFilters, PainSortField, PainUpdate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::items::PainItem;
use super::{
    map_db_error, normalize_limit, user_id, validation_error, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PainsQuery {
    pub category: Option<String>,
    pub severity: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct UpdatePainRequest {
    pub category: Option<String>,
    pub severity: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PainsPage {
    pains: Vec<PainItem>,
    total: i64,
    limit: i64,
    offset: i64,
    by_category: BTreeMap<String, i64>,
    by_severity: BTreeMap<String, i64>,
}

fn parse_sort(value: Option<&str>) -> Result<PainSortField, String> {
    match value.map(str::trim) {
        None | Some("" | "createdAt") => Ok(PainSortField::CreatedAt),
        Some("frequency") => Ok(PainSortField::Frequency),
        Some("trend") => Ok(PainSortField::Trend),
        Some("severity") => Ok(PainSortField::Severity),
        Some(other) => Err(format!(
            "sortBy must be one of frequency, trend, severity, createdAt; got '{other}'"
        )),
    }
}

fn build_filters<'a>(query: &'a PainsQuery) -> Result<PainFilters<'a>, String> {
    let category = query
        .category
        .as_deref()
        .map(str::parse::<PainCategory>)
        .transpose()
        .map_err(|e| e.to_string())?;
    let severity = query
        .severity
        .as_deref()
        .map(str::parse::<PainSeverity>)
        .transpose()
        .map_err(|e| e.to_string())?;

    Ok(PainFilters {
        category,
        severity,
        date_from: query.date_from,
        date_to: query.date_to,
        search: query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        sort: parse_sort(query.sort_by.as_deref())?,
        limit: normalize_limit(query.limit),
        offset: query.offset.unwrap_or(0).max(0),
    })
}

fn parse_update(body: &UpdatePainRequest) -> Result<PainUpdate, String> {
    let update = PainUpdate {
        category: body
            .category
            .as_deref()
            .map(str::parse::<PainCategory>)
            .transpose()
            .map_err(|e| e.to_string())?,
        severity: body
            .severity
            .as_deref()
            .map(str::parse::<PainSeverity>)
            .transpose()
            .map_err(|e| e.to_string())?,
    };
    if update.category.is_none() && update.severity.is_none() {
        return Err("category or severity is required".to_string());
    }
    Ok(update)
}

/// GET /api/v1/workspaces/{workspace_id}/pains
pub(super) async fn list_pains(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<PainsQuery>,
) -> Result<Json<ApiResponse<PainsPage>>, ApiError> {
    let filters = build_filters(&query).map_err(|msg| validation_error(&req_id.0, msg))?;

    let (rows, total) = painradar_db::list_pains(&state.pool, workspace_id, &filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let by_category = painradar_db::count_pains_by_category(&state.pool, workspace_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let by_severity = painradar_db::count_pains_by_severity(&state.pool, workspace_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = PainsPage {
        pains: rows.into_iter().map(PainItem::from).collect(),
        total,
        limit: filters.limit,
        offset: filters.offset,
        by_category: by_category.into_iter().collect(),
        by_severity: by_severity.into_iter().collect(),
    };
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// GET /api/v1/workspaces/{workspace_id}/pains/{pain_id}
pub(super) async fn get_pain(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((workspace_id, pain_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<PainItem>>, ApiError> {
    let row = painradar_db::get_pain(&state.pool, workspace_id, pain_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, PainItem::from(row))))
}

/// PATCH /api/v1/workspaces/{workspace_id}/pains/{pain_id}
///
/// Reviewer correction of a pain's category or severity. The previous and
/// new values go to the activity log.
pub(super) async fn update_pain(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((workspace_id, pain_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(body): Json<UpdatePainRequest>,
) -> Result<Json<ApiResponse<PainItem>>, ApiError> {
    let rid = &req_id.0;
    let update = parse_update(&body).map_err(|msg| validation_error(rid, msg))?;
    let actor = user_id(&headers);

    let change = painradar_db::update_pain(&state.pool, workspace_id, pain_id, update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let activity = NewActivity {
        workspace_id,
        user_id: actor.as_deref(),
        activity_type: "UPDATE",
        entity_type: "extracted_pain",
        entity_id: pain_id.to_string(),
        action: "updated",
        new_value: serde_json::json!({
            "before": {
                "category": change.before.category,
                "severity": change.before.severity,
            },
            "after": {
                "category": change.after.category,
                "severity": change.after.severity,
            },
        }),
    };
    if let Err(e) = painradar_db::insert_activity(&state.pool, &activity).await {
        tracing::warn!(pain_id = %pain_id, error = %e, "failed to record pain activity");
    }

    tracing::info!(pain_id = %pain_id, "pain updated");
    Ok(Json(ApiResponse::new(req_id.0, PainItem::from(change.after))))
}
