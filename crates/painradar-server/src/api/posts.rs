use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use painradar_db::PostFilters;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::items::PostItem;
use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PostsQuery {
    pub keyword_id: Option<Uuid>,
    pub is_analyzed: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PostsPage {
    posts: Vec<PostItem>,
    total: i64,
    limit: i64,
    offset: i64,
}

fn build_filters(query: &PostsQuery) -> PostFilters<'_> {
    PostFilters {
        keyword_id: query.keyword_id,
        is_analyzed: query.is_analyzed,
        search: query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        limit: normalize_limit(query.limit),
        offset: query.offset.unwrap_or(0).max(0),
    }
}

/// GET /api/v1/workspaces/{workspace_id}/posts
pub(super) async fn list_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<ApiResponse<PostsPage>>, ApiError> {
    let filters = build_filters(&query);
    let (rows, total) = painradar_db::list_posts(&state.pool, workspace_id, &filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = PostsPage {
        posts: rows.into_iter().map(PostItem::from).collect(),
        total,
        limit: filters.limit,
        offset: filters.offset,
    };
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_query(raw: &str) -> PostsQuery {
        let uri: axum::http::Uri = format!("/posts?{raw}").parse().expect("uri");
        Query::<PostsQuery>::try_from_uri(&uri).expect("query").0
    }

    #[test]
    fn query_string_maps_to_filters() {
        let query = parse_query("isAnalyzed=false&search=%20invoice%20&limit=0");
        let filters = build_filters(&query);
        assert_eq!(filters.is_analyzed, Some(false));
        assert_eq!(filters.search, Some("invoice"));
        assert_eq!(filters.limit, 1);
        assert_eq!(filters.offset, 0);
        assert!(filters.keyword_id.is_none());
    }
}
