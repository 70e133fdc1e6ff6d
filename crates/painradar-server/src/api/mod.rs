mod analyze;
mod dashboard;
mod items;
mod keywords;
mod pains;
mod posts;
mod scans;
mod search;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use painradar_radar::RadarError;
use serde::Serialize;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

pub use crate::state::AppState;

const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    analysis: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "inference_error" => StatusCode::BAD_GATEWAY,
            "analysis_disabled" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 100)
}

pub(super) fn map_db_error(request_id: String, error: &painradar_db::DbError) -> ApiError {
    match error {
        painradar_db::DbError::NotFound => ApiError::new(request_id, "not_found", "record not found"),
        painradar_db::DbError::Conflict(message) => {
            ApiError::new(request_id, "conflict", message.clone())
        }
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

pub(super) fn map_radar_error(request_id: String, error: &RadarError) -> ApiError {
    match error {
        RadarError::KeywordNotFound | RadarError::NoPostsFound => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        RadarError::KeywordInactive | RadarError::Validation(_) => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        RadarError::Inference { .. } | RadarError::MalformedResponse(_) | RadarError::Http(_) => {
            tracing::error!(error = %error, "inference call failed");
            ApiError::new(request_id, "inference_error", "inference provider request failed")
        }
        RadarError::Store(_) => {
            tracing::error!(error = %error, "storage operation failed");
            ApiError::new(request_id, "internal_error", "storage operation failed")
        }
        RadarError::Xml(_)
        | RadarError::Deserialize { .. }
        | RadarError::UnexpectedStatus { .. }
        | RadarError::RateLimited { .. } => {
            tracing::error!(error = %error, "pipeline request failed");
            ApiError::new(request_id, "internal_error", error.to_string())
        }
    }
}

pub(super) fn validation_error(request_id: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(request_id, "validation_error", message)
}

/// Actor recorded on activity entries, taken from the `x-user-id` header.
pub(super) fn user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static(USER_ID_HEADER),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/search", post(search::quick_search))
        .route(
            "/api/v1/workspaces/{workspace_id}/keywords",
            get(keywords::list_keywords).post(keywords::create_keyword),
        )
        .route(
            "/api/v1/workspaces/{workspace_id}/keywords/{keyword_id}",
            patch(keywords::update_keyword).delete(keywords::deactivate_keyword),
        )
        .route(
            "/api/v1/workspaces/{workspace_id}/scans",
            get(scans::list_scans).post(scans::run_scan),
        )
        .route(
            "/api/v1/workspaces/{workspace_id}/scans/{scan_id}",
            get(scans::get_scan),
        )
        .route(
            "/api/v1/workspaces/{workspace_id}/analyze",
            post(analyze::analyze_posts),
        )
        .route("/api/v1/workspaces/{workspace_id}/posts", get(posts::list_posts))
        .route("/api/v1/workspaces/{workspace_id}/pains", get(pains::list_pains))
        .route(
            "/api/v1/workspaces/{workspace_id}/pains/{pain_id}",
            get(pains::get_pain).patch(pains::update_pain),
        )
        .route(
            "/api/v1/workspaces/{workspace_id}/dashboard",
            get(dashboard::get_dashboard),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);
    let analysis = if state.radar.analyzer.is_some() {
        "enabled"
    } else {
        "disabled"
    };

    match painradar_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                    analysis,
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                        analysis,
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
