//! The storage contract the pipeline needs, and its Postgres implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use painradar_core::{EngagementMetrics, NormalizedPost};
use painradar_db::{
    AnalysisPostRow, AnalysisWrite, DbError, KeywordRow, NewActivity, PainRow, PostRow, ScanRow,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::RadarError;

/// Workspace-scoped persistence used by scans, analyses and the dashboard.
///
/// Errors are [`RadarError::Store`] except [`PainStore::get_keyword`], which
/// reports a missing keyword as [`RadarError::KeywordNotFound`].
#[async_trait]
pub trait PainStore: Send + Sync {
    async fn get_keyword(&self, workspace_id: Uuid, keyword_id: Uuid)
        -> Result<KeywordRow, RadarError>;

    async fn create_scan(
        &self,
        workspace_id: Uuid,
        keyword_id: Uuid,
        platforms: &str,
    ) -> Result<ScanRow, RadarError>;

    async fn complete_scan(&self, scan_id: Uuid, posts_found: i32, posts_new: i32)
        -> Result<(), RadarError>;

    async fn fail_scan(&self, scan_id: Uuid, error_message: &str) -> Result<(), RadarError>;

    async fn find_post(&self, platform: &str, platform_id: &str)
        -> Result<Option<PostRow>, RadarError>;

    /// Insert a new post; `None` when a row with the same natural key already
    /// exists (for example, inserted by a concurrent scan).
    async fn insert_post(&self, keyword_id: Uuid, post: &NormalizedPost)
        -> Result<Option<PostRow>, RadarError>;

    async fn update_post_metrics(
        &self,
        post_id: Uuid,
        metrics: EngagementMetrics,
        engagement: i64,
    ) -> Result<(), RadarError>;

    async fn load_posts(&self, workspace_id: Uuid, ids: &[Uuid])
        -> Result<Vec<AnalysisPostRow>, RadarError>;

    /// Commit an analysis run's scores, pains and analyzed flags as one
    /// unit. On error nothing from the run is visible.
    async fn persist_analysis(&self, write: &AnalysisWrite<'_>)
        -> Result<Vec<PainRow>, RadarError>;

    async fn record_activity(&self, activity: &NewActivity<'_>) -> Result<(), RadarError>;

    async fn pains_since(&self, workspace_id: Uuid, since: DateTime<Utc>)
        -> Result<Vec<PainRow>, RadarError>;

    async fn top_pains(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PainRow>, RadarError>;

    async fn count_posts_since(&self, workspace_id: Uuid, since: DateTime<Utc>)
        -> Result<i64, RadarError>;

    async fn recent_scans(&self, workspace_id: Uuid, limit: i64) -> Result<Vec<ScanRow>, RadarError>;
}

/// [`PainStore`] backed by the `painradar-db` queries.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PainStore for PgStore {
    async fn get_keyword(
        &self,
        workspace_id: Uuid,
        keyword_id: Uuid,
    ) -> Result<KeywordRow, RadarError> {
        match painradar_db::get_keyword(&self.pool, workspace_id, keyword_id).await {
            Ok(row) => Ok(row),
            Err(DbError::NotFound) => Err(RadarError::KeywordNotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_scan(
        &self,
        workspace_id: Uuid,
        keyword_id: Uuid,
        platforms: &str,
    ) -> Result<ScanRow, RadarError> {
        Ok(painradar_db::create_scan(&self.pool, workspace_id, keyword_id, platforms).await?)
    }

    async fn complete_scan(
        &self,
        scan_id: Uuid,
        posts_found: i32,
        posts_new: i32,
    ) -> Result<(), RadarError> {
        Ok(painradar_db::complete_scan(&self.pool, scan_id, posts_found, posts_new).await?)
    }

    async fn fail_scan(&self, scan_id: Uuid, error_message: &str) -> Result<(), RadarError> {
        Ok(painradar_db::fail_scan(&self.pool, scan_id, error_message).await?)
    }

    async fn find_post(
        &self,
        platform: &str,
        platform_id: &str,
    ) -> Result<Option<PostRow>, RadarError> {
        Ok(painradar_db::find_post_by_key(&self.pool, platform, platform_id).await?)
    }

    async fn insert_post(
        &self,
        keyword_id: Uuid,
        post: &NormalizedPost,
    ) -> Result<Option<PostRow>, RadarError> {
        match painradar_db::insert_post(&self.pool, keyword_id, post).await {
            Ok(row) => Ok(Some(row)),
            Err(DbError::Conflict(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_post_metrics(
        &self,
        post_id: Uuid,
        metrics: EngagementMetrics,
        engagement: i64,
    ) -> Result<(), RadarError> {
        Ok(painradar_db::update_post_metrics(&self.pool, post_id, metrics, engagement).await?)
    }

    async fn load_posts(
        &self,
        workspace_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<AnalysisPostRow>, RadarError> {
        Ok(painradar_db::list_posts_by_ids(&self.pool, workspace_id, ids).await?)
    }

    async fn persist_analysis(
        &self,
        write: &AnalysisWrite<'_>,
    ) -> Result<Vec<PainRow>, RadarError> {
        Ok(painradar_db::persist_analysis(&self.pool, write).await?)
    }

    async fn record_activity(&self, activity: &NewActivity<'_>) -> Result<(), RadarError> {
        painradar_db::insert_activity(&self.pool, activity).await?;
        Ok(())
    }

    async fn pains_since(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<PainRow>, RadarError> {
        Ok(painradar_db::list_pains_since(&self.pool, workspace_id, since).await?)
    }

    async fn top_pains(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PainRow>, RadarError> {
        Ok(painradar_db::list_top_pains(&self.pool, workspace_id, since, limit).await?)
    }

    async fn count_posts_since(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, RadarError> {
        Ok(painradar_db::count_posts_since(&self.pool, workspace_id, since).await?)
    }

    async fn recent_scans(
        &self,
        workspace_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ScanRow>, RadarError> {
        Ok(painradar_db::list_recent_scans(&self.pool, workspace_id, limit).await?)
    }
}
