//! In-memory [`PainStore`] for orchestrator tests.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use painradar_core::{EngagementMetrics, NormalizedPost, ScanStatus};
use painradar_db::{
    AnalysisPostRow, AnalysisWrite, KeywordRow, NewActivity, PainRow, PostRow, ScanRow,
};
use uuid::Uuid;

use crate::error::RadarError;
use crate::store::PainStore;

#[derive(Debug, Clone)]
pub(crate) struct RecordedActivity {
    pub(crate) activity_type: String,
    pub(crate) entity_type: String,
    pub(crate) action: String,
    pub(crate) new_value: serde_json::Value,
}

#[derive(Debug, Default)]
struct Inner {
    keywords: Vec<KeywordRow>,
    scans: Vec<ScanRow>,
    posts: Vec<PostRow>,
    pains: Vec<PainRow>,
    activities: Vec<RecordedActivity>,
    metric_updates: usize,
    fail_post_writes: bool,
    fail_activities: bool,
    fail_analysis_flags: bool,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    inner: Mutex<Inner>,
}

fn unavailable() -> RadarError {
    RadarError::Store("connection refused".to_string())
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock")
    }

    pub(crate) fn add_keyword(&self, workspace_id: Uuid, keyword: &str, is_active: bool) -> KeywordRow {
        let now = Utc::now();
        let row = KeywordRow {
            id: Uuid::new_v4(),
            workspace_id,
            keyword: keyword.to_string(),
            category: Some("saas".to_string()),
            is_active,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        self.lock().keywords.push(row.clone());
        row
    }

    pub(crate) fn add_pain(&self, pain: PainRow) {
        self.lock().pains.push(pain);
    }

    pub(crate) fn add_scan(&self, scan: ScanRow) {
        self.lock().scans.push(scan);
    }

    pub(crate) fn set_fail_post_writes(&self, fail: bool) {
        self.lock().fail_post_writes = fail;
    }

    pub(crate) fn set_fail_activities(&self, fail: bool) {
        self.lock().fail_activities = fail;
    }

    /// Make [`PainStore::persist_analysis`] fail at its last step, after the
    /// scores and pains have been staged.
    pub(crate) fn set_fail_analysis_flags(&self, fail: bool) {
        self.lock().fail_analysis_flags = fail;
    }

    pub(crate) fn scans(&self) -> Vec<ScanRow> {
        self.lock().scans.clone()
    }

    pub(crate) fn posts(&self) -> Vec<PostRow> {
        self.lock().posts.clone()
    }

    pub(crate) fn pains(&self) -> Vec<PainRow> {
        self.lock().pains.clone()
    }

    pub(crate) fn activities(&self) -> Vec<RecordedActivity> {
        self.lock().activities.clone()
    }

    pub(crate) fn metric_updates(&self) -> usize {
        self.lock().metric_updates
    }

    fn finish_scan(
        &self,
        scan_id: Uuid,
        apply: impl FnOnce(&mut ScanRow),
    ) -> Result<(), RadarError> {
        let mut inner = self.lock();
        let scan = inner
            .scans
            .iter_mut()
            .find(|s| s.id == scan_id && s.status == ScanStatus::Running.as_str())
            .ok_or_else(|| RadarError::Store(format!("scan {scan_id} is not RUNNING")))?;
        apply(scan);
        scan.completed_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl PainStore for MemoryStore {
    async fn get_keyword(
        &self,
        workspace_id: Uuid,
        keyword_id: Uuid,
    ) -> Result<KeywordRow, RadarError> {
        self.lock()
            .keywords
            .iter()
            .find(|k| k.id == keyword_id && k.workspace_id == workspace_id)
            .cloned()
            .ok_or(RadarError::KeywordNotFound)
    }

    async fn create_scan(
        &self,
        workspace_id: Uuid,
        keyword_id: Uuid,
        platforms: &str,
    ) -> Result<ScanRow, RadarError> {
        let now = Utc::now();
        let row = ScanRow {
            id: Uuid::new_v4(),
            workspace_id,
            keyword_id,
            platforms: platforms.to_string(),
            status: ScanStatus::Running.as_str().to_string(),
            posts_found: 0,
            posts_new: 0,
            error_message: None,
            started_at: now,
            completed_at: None,
            created_at: now,
        };
        self.lock().scans.push(row.clone());
        Ok(row)
    }

    async fn complete_scan(
        &self,
        scan_id: Uuid,
        posts_found: i32,
        posts_new: i32,
    ) -> Result<(), RadarError> {
        self.finish_scan(scan_id, |scan| {
            scan.status = ScanStatus::Completed.as_str().to_string();
            scan.posts_found = posts_found;
            scan.posts_new = posts_new;
        })
    }

    async fn fail_scan(&self, scan_id: Uuid, error_message: &str) -> Result<(), RadarError> {
        self.finish_scan(scan_id, |scan| {
            scan.status = ScanStatus::Failed.as_str().to_string();
            scan.error_message = Some(error_message.to_string());
        })
    }

    async fn find_post(
        &self,
        platform: &str,
        platform_id: &str,
    ) -> Result<Option<PostRow>, RadarError> {
        let inner = self.lock();
        if inner.fail_post_writes {
            return Err(unavailable());
        }
        Ok(inner
            .posts
            .iter()
            .find(|p| p.platform == platform && p.platform_id == platform_id)
            .cloned())
    }

    async fn insert_post(
        &self,
        keyword_id: Uuid,
        post: &NormalizedPost,
    ) -> Result<Option<PostRow>, RadarError> {
        let mut inner = self.lock();
        if inner.fail_post_writes {
            return Err(unavailable());
        }
        let platform = post.platform.as_str();
        if inner
            .posts
            .iter()
            .any(|p| p.platform == platform && p.platform_id == post.platform_id)
        {
            return Ok(None);
        }
        let row = PostRow {
            id: Uuid::new_v4(),
            keyword_id,
            platform: platform.to_string(),
            platform_id: post.platform_id.clone(),
            author: post.author.clone(),
            author_url: post.author_url.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            url: post.url.clone(),
            likes: post.metrics.likes,
            comments: post.metrics.comments,
            shares: post.metrics.shares,
            engagement: post.engagement,
            published_at: post.published_at,
            fetched_at: Utc::now(),
            filter_score: None,
            is_analyzed: false,
            analyzed_at: None,
        };
        inner.posts.push(row.clone());
        Ok(Some(row))
    }

    async fn update_post_metrics(
        &self,
        post_id: Uuid,
        metrics: EngagementMetrics,
        engagement: i64,
    ) -> Result<(), RadarError> {
        let mut inner = self.lock();
        let post = inner
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| RadarError::Store("record not found".to_string()))?;
        post.likes = metrics.likes;
        post.comments = metrics.comments;
        post.shares = metrics.shares;
        post.engagement = engagement;
        inner.metric_updates += 1;
        Ok(())
    }

    async fn load_posts(
        &self,
        workspace_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<AnalysisPostRow>, RadarError> {
        let inner = self.lock();
        Ok(inner
            .posts
            .iter()
            .filter(|p| ids.contains(&p.id))
            .filter_map(|p| {
                let keyword = inner
                    .keywords
                    .iter()
                    .find(|k| k.id == p.keyword_id && k.workspace_id == workspace_id)?;
                Some(AnalysisPostRow {
                    post: p.clone(),
                    keyword_category: keyword.category.clone(),
                })
            })
            .collect())
    }

    async fn persist_analysis(
        &self,
        write: &AnalysisWrite<'_>,
    ) -> Result<Vec<PainRow>, RadarError> {
        let mut inner = self.lock();

        // Stage on a copy and swap it in only once every step succeeded.
        let mut posts = inner.posts.clone();
        for (post_id, score) in write.filter_scores {
            if let Some(post) = posts.iter_mut().find(|p| p.id == *post_id) {
                post.filter_score = Some(*score);
            }
        }
        let rows: Vec<PainRow> = write
            .pains
            .iter()
            .map(|pain| PainRow {
                id: Uuid::new_v4(),
                workspace_id: write.workspace_id,
                post_id: pain.post_id,
                pain_text: pain.pain_text.clone(),
                category: pain.category.as_str().to_string(),
                severity: pain.severity.as_str().to_string(),
                severity_rank: pain.severity.rank(),
                sentiment: pain.sentiment,
                confidence: pain.confidence,
                frequency: 1,
                trend: 0.0,
                keywords: pain.keywords.clone(),
                context: pain.context.clone(),
                created_at: Utc::now(),
            })
            .collect();
        if inner.fail_analysis_flags {
            return Err(unavailable());
        }
        for post in posts
            .iter_mut()
            .filter(|p| write.analyzed_post_ids.contains(&p.id))
        {
            post.is_analyzed = true;
            post.analyzed_at = Some(write.analyzed_at);
        }

        inner.posts = posts;
        inner.pains.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn record_activity(&self, activity: &NewActivity<'_>) -> Result<(), RadarError> {
        let mut inner = self.lock();
        if inner.fail_activities {
            return Err(unavailable());
        }
        inner.activities.push(RecordedActivity {
            activity_type: activity.activity_type.to_string(),
            entity_type: activity.entity_type.to_string(),
            action: activity.action.to_string(),
            new_value: activity.new_value.clone(),
        });
        Ok(())
    }

    async fn pains_since(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<PainRow>, RadarError> {
        Ok(self
            .lock()
            .pains
            .iter()
            .filter(|p| p.workspace_id == workspace_id && p.created_at >= since)
            .cloned()
            .collect())
    }

    async fn top_pains(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PainRow>, RadarError> {
        let mut pains = self.pains_since(workspace_id, since).await?;
        pains.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then(b.severity_rank.cmp(&a.severity_rank))
        });
        pains.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(pains)
    }

    async fn count_posts_since(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, RadarError> {
        let inner = self.lock();
        let count = inner
            .posts
            .iter()
            .filter(|p| p.fetched_at >= since)
            .filter(|p| {
                inner
                    .keywords
                    .iter()
                    .any(|k| k.id == p.keyword_id && k.workspace_id == workspace_id)
            })
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn recent_scans(
        &self,
        workspace_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ScanRow>, RadarError> {
        let mut scans: Vec<ScanRow> = self
            .lock()
            .scans
            .iter()
            .filter(|s| s.workspace_id == workspace_id)
            .cloned()
            .collect();
        scans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        scans.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(scans)
    }
}
