use axum::{extract::State, Extension, Json};
use painradar_core::Platform;
use painradar_radar::{quick_search as run_quick_search, QuickSearchResult, SearchRequest};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{normalize_limit, validation_error, ApiError, ApiResponse, AppState};

fn default_dedupe() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct QuickSearchRequest {
    pub query: String,
    pub platforms: Option<Vec<Platform>>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub min_engagement: i64,
    #[serde(default = "default_dedupe")]
    pub dedupe: bool,
}

/// POST /api/v1/search
///
/// Searches and ranks posts without persisting anything.
pub(super) async fn quick_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<QuickSearchRequest>,
) -> Result<Json<ApiResponse<QuickSearchResult>>, ApiError> {
    let query = body.query.trim();
    if query.is_empty() {
        return Err(validation_error(&req_id.0, "query is required"));
    }
    let platforms = body
        .platforms
        .unwrap_or_else(|| state.radar.config.default_platforms.clone());
    if platforms.is_empty() {
        return Err(validation_error(&req_id.0, "at least one platform is required"));
    }

    let limit = usize::try_from(normalize_limit(body.limit)).unwrap_or(50);
    let request = SearchRequest {
        keyword: query,
        platforms: &platforms,
        limit,
        min_engagement: body.min_engagement,
        dedupe: body.dedupe,
    };
    let result = run_quick_search(&state.radar.aggregator, &request).await;

    tracing::info!(
        query,
        posts = result.posts.len(),
        errors = result.stats.errors.len(),
        "quick search complete"
    );
    Ok(Json(ApiResponse::new(req_id.0, result)))
}
