use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use painradar_radar::{AnalysisRequest, AnalysisResult, FilterResult, FilterStats};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::items::PainItem;
use super::{map_radar_error, user_id, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AnalyzeRequest {
    pub post_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AnalyzeResponse {
    analyzed: usize,
    filtered: usize,
    pains_extracted: usize,
    pains: Vec<PainItem>,
    filter_results: Vec<FilterResult>,
    filter_stats: FilterStats,
    failed_post_ids: Vec<Uuid>,
}

impl From<AnalysisResult> for AnalyzeResponse {
    fn from(result: AnalysisResult) -> Self {
        Self {
            analyzed: result.analyzed,
            filtered: result.filtered,
            pains_extracted: result.pains_extracted,
            pains: result.pains.into_iter().map(PainItem::from).collect(),
            filter_results: result.filter_results,
            filter_stats: result.filter_stats,
            failed_post_ids: result.failed_post_ids,
        }
    }
}

/// POST /api/v1/workspaces/{workspace_id}/analyze
pub(super) async fn analyze_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(workspace_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<AnalyzeResponse>>, ApiError> {
    let Some(analyzer) = state.radar.analyzer.as_ref() else {
        return Err(ApiError::new(
            req_id.0,
            "analysis_disabled",
            "post analysis requires OPENROUTER_API_KEY",
        ));
    };

    let request = AnalysisRequest {
        workspace_id,
        post_ids: body.post_ids,
        user_id: user_id(&headers),
    };
    let result = analyzer
        .analyze(&request)
        .await
        .map_err(|e| map_radar_error(req_id.0.clone(), &e))?;

    tracing::info!(
        workspace_id = %workspace_id,
        analyzed = result.analyzed,
        pains = result.pains_extracted,
        failed = result.failed_post_ids.len(),
        "analysis complete"
    );
    Ok(Json(ApiResponse::new(req_id.0, result.into())))
}
