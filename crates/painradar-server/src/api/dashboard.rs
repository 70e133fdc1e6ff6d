use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use painradar_radar::{Dashboard, DashboardPeriod, Overview, SentimentDistribution, TrendPoint};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::items::{PainItem, ScanItem};
use super::{map_radar_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct DashboardQuery {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DashboardData {
    period: &'static str,
    overview: Overview,
    top_pains: Vec<PainItem>,
    trends: Vec<TrendPoint>,
    sentiment_distribution: SentimentDistribution,
    recent_scans: Vec<ScanItem>,
}

impl From<Dashboard> for DashboardData {
    fn from(dashboard: Dashboard) -> Self {
        Self {
            period: dashboard.period.as_str(),
            overview: dashboard.overview,
            top_pains: dashboard.top_pains.into_iter().map(PainItem::from).collect(),
            trends: dashboard.trends,
            sentiment_distribution: dashboard.sentiment_distribution,
            recent_scans: dashboard.recent_scans.into_iter().map(ScanItem::from).collect(),
        }
    }
}

/// GET /api/v1/workspaces/{workspace_id}/dashboard?period=7d|30d|90d
pub(super) async fn get_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<DashboardData>>, ApiError> {
    let period = match query.period.as_deref() {
        None => DashboardPeriod::default(),
        Some(raw) => raw
            .parse::<DashboardPeriod>()
            .map_err(|e| map_radar_error(req_id.0.clone(), &e))?,
    };

    let dashboard = state
        .radar
        .dashboard
        .read(workspace_id, period)
        .await
        .map_err(|e| map_radar_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, dashboard.into())))
}
