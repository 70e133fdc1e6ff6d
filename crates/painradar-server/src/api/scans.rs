use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use painradar_core::{Platform, ScanStatus};
use painradar_radar::{ScanRequest, ScanSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::items::{PostItem, ScanItem};
use super::{
    map_db_error, map_radar_error, normalize_limit, user_id, validation_error, ApiError,
    ApiResponse, AppState,
};

/// Posts attached to a completed scan's detail view.
const SCAN_DETAIL_POSTS: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RunScanRequest {
    pub keyword_id: Uuid,
    pub platforms: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ScansQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ScanDetail {
    #[serde(flatten)]
    scan: ScanItem,
    posts: Vec<PostItem>,
}

fn parse_platforms(request_id: &str, raw: Option<&[String]>) -> Result<Option<Vec<Platform>>, ApiError> {
    raw.map(|names| {
        names
            .iter()
            .map(|name| name.parse::<Platform>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| validation_error(request_id, e.to_string()))
    })
    .transpose()
}

/// POST /api/v1/workspaces/{workspace_id}/scans
///
/// A scan that fails after it started is still reported with `200` and
/// `status = FAILED`; only requests rejected before a scan row exists are
/// errors.
pub(super) async fn run_scan(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(workspace_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<RunScanRequest>,
) -> Result<Json<ApiResponse<ScanSummary>>, ApiError> {
    let platforms = parse_platforms(&req_id.0, body.platforms.as_deref())?;
    let request = ScanRequest {
        workspace_id,
        keyword_id: body.keyword_id,
        platforms,
        user_id: user_id(&headers),
    };

    let summary = state
        .radar
        .scans
        .run(&request)
        .await
        .map_err(|e| map_radar_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, summary)))
}

/// GET /api/v1/workspaces/{workspace_id}/scans
pub(super) async fn list_scans(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<ScansQuery>,
) -> Result<Json<ApiResponse<Vec<ScanItem>>>, ApiError> {
    let rows = painradar_db::list_recent_scans(&state.pool, workspace_id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(ScanItem::from).collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// GET /api/v1/workspaces/{workspace_id}/scans/{scan_id}
pub(super) async fn get_scan(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((workspace_id, scan_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ScanDetail>>, ApiError> {
    let scan = painradar_db::get_scan(&state.pool, workspace_id, scan_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let posts = if scan.status == ScanStatus::Completed.as_str() {
        painradar_db::list_recent_posts_for_keyword(&state.pool, scan.keyword_id, SCAN_DETAIL_POSTS)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?
    } else {
        Vec::new()
    };

    let data = ScanDetail {
        scan: ScanItem::from(scan),
        posts: posts.into_iter().map(PostItem::from).collect(),
    };
    Ok(Json(ApiResponse::new(req_id.0, data)))
}
