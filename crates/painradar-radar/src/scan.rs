//! One scan: search a keyword across platforms and reconcile the results into
//! storage, leaving an auditable scan row behind.

use std::sync::Arc;

use painradar_core::{NormalizedPost, Platform, ScanStatus};
use painradar_db::NewActivity;
use serde::Serialize;
use uuid::Uuid;

use crate::config::RadarConfig;
use crate::error::RadarError;
use crate::search::{PlatformError, SearchAggregator, SearchRequest};
use crate::store::PainStore;

#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub workspace_id: Uuid,
    pub keyword_id: Uuid,
    /// Defaults to the configured platform set when `None`.
    pub platforms: Option<Vec<Platform>>,
    /// Actor recorded on the activity entry.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub scan_id: Uuid,
    pub status: ScanStatus,
    /// Posts returned by the aggregator after dedup and filtering.
    pub posts_found: usize,
    /// Posts inserted for the first time.
    pub posts_new: usize,
    /// Platforms that failed; they do not fail the scan.
    pub errors: Vec<PlatformError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Reconciled {
    found: usize,
    new: usize,
}

#[derive(Clone)]
pub struct ScanOrchestrator {
    store: Arc<dyn PainStore>,
    aggregator: SearchAggregator,
    default_platforms: Vec<Platform>,
    limit: usize,
    min_engagement: i64,
}

impl ScanOrchestrator {
    pub fn new(store: Arc<dyn PainStore>, aggregator: SearchAggregator, config: &RadarConfig) -> Self {
        Self {
            store,
            aggregator,
            default_platforms: config.default_platforms.clone(),
            limit: config.scan_limit,
            min_engagement: config.min_engagement,
        }
    }

    /// Run a scan to completion.
    ///
    /// Once the scan row exists, every failure is recorded on it and returned
    /// as a `FAILED` summary rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`RadarError::KeywordNotFound`], [`RadarError::KeywordInactive`]
    /// or [`RadarError::Validation`] before any scan row is created, and
    /// [`RadarError::Store`] if the scan row itself cannot be created.
    pub async fn run(&self, request: &ScanRequest) -> Result<ScanSummary, RadarError> {
        let keyword = self
            .store
            .get_keyword(request.workspace_id, request.keyword_id)
            .await?;
        if !keyword.is_active {
            return Err(RadarError::KeywordInactive);
        }

        let mut platforms = request
            .platforms
            .clone()
            .unwrap_or_else(|| self.default_platforms.clone());
        platforms.sort();
        platforms.dedup();
        if platforms.is_empty() {
            return Err(RadarError::Validation("at least one platform is required".into()));
        }
        let platform_list = platforms
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let scan = self
            .store
            .create_scan(request.workspace_id, keyword.id, &platform_list)
            .await?;
        tracing::info!(
            scan_id = %scan.id,
            keyword = %keyword.keyword,
            platforms = %platform_list,
            "scan started"
        );

        let outcome = self
            .aggregator
            .search(&SearchRequest {
                keyword: &keyword.keyword,
                platforms: &platforms,
                limit: self.limit,
                min_engagement: self.min_engagement,
                dedupe: true,
            })
            .await;
        let errors = outcome.stats.errors;

        let counts = match self.reconcile(keyword.id, &outcome.posts).await {
            Ok(counts) => counts,
            Err(e) => return Ok(self.fail(scan.id, &e, errors).await),
        };

        if let Err(e) = self
            .store
            .complete_scan(scan.id, to_i32(counts.found), to_i32(counts.new))
            .await
        {
            return Ok(self.fail(scan.id, &e, errors).await);
        }
        tracing::info!(
            scan_id = %scan.id,
            posts_found = counts.found,
            posts_new = counts.new,
            failed_platforms = errors.len(),
            "scan completed"
        );

        let activity = NewActivity {
            workspace_id: request.workspace_id,
            user_id: request.user_id.as_deref(),
            activity_type: "CREATE",
            entity_type: "pain_scan",
            entity_id: scan.id.to_string(),
            action: "completed",
            new_value: serde_json::json!({
                "keyword": keyword.keyword,
                "postsFound": counts.found,
                "postsNew": counts.new,
            }),
        };
        if let Err(e) = self.store.record_activity(&activity).await {
            tracing::warn!(scan_id = %scan.id, error = %e, "failed to record scan activity");
        }

        Ok(ScanSummary {
            scan_id: scan.id,
            status: ScanStatus::Completed,
            posts_found: counts.found,
            posts_new: counts.new,
            errors,
            error_message: None,
        })
    }

    /// Insert unseen posts and refresh metrics of known ones.
    async fn reconcile(
        &self,
        keyword_id: Uuid,
        posts: &[NormalizedPost],
    ) -> Result<Reconciled, RadarError> {
        let mut counts = Reconciled {
            found: posts.len(),
            new: 0,
        };
        for post in posts {
            match self
                .store
                .find_post(post.platform.as_str(), &post.platform_id)
                .await?
            {
                Some(existing) => {
                    if existing.metrics() != post.metrics || existing.engagement != post.engagement {
                        self.store
                            .update_post_metrics(existing.id, post.metrics, post.engagement)
                            .await?;
                    }
                }
                None => {
                    if self.store.insert_post(keyword_id, post).await?.is_some() {
                        counts.new += 1;
                    }
                }
            }
        }
        Ok(counts)
    }

    async fn fail(&self, scan_id: Uuid, err: &RadarError, errors: Vec<PlatformError>) -> ScanSummary {
        let message = err.to_string();
        tracing::error!(scan_id = %scan_id, error = %err, "scan failed");
        if let Err(e) = self.store.fail_scan(scan_id, &message).await {
            tracing::error!(scan_id = %scan_id, error = %e, "failed to mark scan FAILED");
        }
        ScanSummary {
            scan_id,
            status: ScanStatus::Failed,
            posts_found: 0,
            posts_new: 0,
            errors,
            error_message: Some(message),
        }
    }
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::search::tests::{aggregator, post, StaticAdapter};

    fn config() -> RadarConfig {
        RadarConfig {
            default_platforms: vec![Platform::HackerNews, Platform::Reddit],
            ..RadarConfig::default()
        }
    }

    fn orchestrator(store: &Arc<MemoryStore>, adapters: Vec<StaticAdapter>) -> ScanOrchestrator {
        ScanOrchestrator::new(
            Arc::clone(store) as Arc<dyn PainStore>,
            aggregator(adapters),
            &config(),
        )
    }

    fn hn(posts: Vec<NormalizedPost>) -> StaticAdapter {
        StaticAdapter {
            platform: Platform::HackerNews,
            result: Ok(posts),
        }
    }

    fn reddit(result: Result<Vec<NormalizedPost>, String>) -> StaticAdapter {
        StaticAdapter {
            platform: Platform::Reddit,
            result,
        }
    }

    fn request(workspace_id: Uuid, keyword_id: Uuid) -> ScanRequest {
        ScanRequest {
            workspace_id,
            keyword_id,
            ..ScanRequest::default()
        }
    }

    #[tokio::test]
    async fn zero_posts_is_a_completed_scan() {
        let store = Arc::new(MemoryStore::default());
        let ws = Uuid::new_v4();
        let keyword = store.add_keyword(ws, "slow onboarding", true);
        let scans = orchestrator(&store, vec![hn(vec![]), reddit(Ok(vec![]))]);

        let summary = scans.run(&request(ws, keyword.id)).await.expect("scan");

        assert_eq!(summary.status, ScanStatus::Completed);
        assert_eq!(summary.posts_found, 0);
        assert_eq!(summary.posts_new, 0);
        let rows = store.scans();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "COMPLETED");
        assert_eq!(rows[0].platforms, "REDDIT,HACKERNEWS");
        assert!(rows[0].completed_at.is_some());
        let activities = store.activities();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].entity_type, "pain_scan");
        assert_eq!(activities[0].action, "completed");
    }

    #[tokio::test]
    async fn rescan_with_unchanged_results_inserts_nothing() {
        let store = Arc::new(MemoryStore::default());
        let ws = Uuid::new_v4();
        let keyword = store.add_keyword(ws, "invoices", true);
        let posts = vec![
            post(Platform::HackerNews, "1", "invoices by hand", 1),
            post(Platform::HackerNews, "2", "invoice errors", 2),
        ];
        let scans = orchestrator(&store, vec![hn(posts)]);
        let req = ScanRequest {
            platforms: Some(vec![Platform::HackerNews]),
            ..request(ws, keyword.id)
        };

        let first = scans.run(&req).await.expect("first scan");
        let second = scans.run(&req).await.expect("second scan");

        assert_eq!((first.posts_found, first.posts_new), (2, 2));
        assert_eq!((second.posts_found, second.posts_new), (2, 0));
        assert_eq!(store.posts().len(), 2);
        assert_eq!(store.metric_updates(), 0);
    }

    #[tokio::test]
    async fn changed_metrics_update_existing_row_without_duplicating() {
        let store = Arc::new(MemoryStore::default());
        let ws = Uuid::new_v4();
        let keyword = store.add_keyword(ws, "invoices", true);
        let req = ScanRequest {
            platforms: Some(vec![Platform::HackerNews]),
            ..request(ws, keyword.id)
        };

        let original = post(Platform::HackerNews, "1", "invoices by hand", 1);
        orchestrator(&store, vec![hn(vec![original.clone()])])
            .run(&req)
            .await
            .expect("first scan");

        let mut popular = original;
        popular.metrics.comments = 50;
        popular.engagement = 160;
        let summary = orchestrator(&store, vec![hn(vec![popular])])
            .run(&req)
            .await
            .expect("second scan");

        assert_eq!(summary.posts_new, 0);
        assert_eq!(store.metric_updates(), 1);
        let rows = store.posts();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].comments, 50);
        assert_eq!(rows[0].engagement, 160);
    }

    #[tokio::test]
    async fn platform_failure_is_reported_but_scan_completes() {
        let store = Arc::new(MemoryStore::default());
        let ws = Uuid::new_v4();
        let keyword = store.add_keyword(ws, "invoices", true);
        let scans = orchestrator(
            &store,
            vec![
                hn(vec![post(Platform::HackerNews, "1", "a", 1)]),
                reddit(Err("reddit is down".to_string())),
            ],
        );

        let summary = scans.run(&request(ws, keyword.id)).await.expect("scan");

        assert_eq!(summary.status, ScanStatus::Completed);
        assert_eq!(summary.posts_new, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].platform, Platform::Reddit);
    }

    #[tokio::test]
    async fn storage_failure_marks_scan_failed() {
        let store = Arc::new(MemoryStore::default());
        let ws = Uuid::new_v4();
        let keyword = store.add_keyword(ws, "invoices", true);
        store.set_fail_post_writes(true);
        let scans = orchestrator(&store, vec![hn(vec![post(Platform::HackerNews, "1", "a", 1)])]);

        let summary = scans.run(&request(ws, keyword.id)).await.expect("summary");

        assert_eq!(summary.status, ScanStatus::Failed);
        assert!(summary
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("connection refused")));
        let rows = store.scans();
        assert_eq!(rows[0].status, "FAILED");
        assert_eq!(rows[0].id, summary.scan_id);
        assert!(rows[0].error_message.is_some());
        assert!(store.activities().is_empty());
    }

    #[tokio::test]
    async fn activity_failure_does_not_fail_the_scan() {
        let store = Arc::new(MemoryStore::default());
        let ws = Uuid::new_v4();
        let keyword = store.add_keyword(ws, "invoices", true);
        store.set_fail_activities(true);

        let summary = orchestrator(&store, vec![hn(vec![]), reddit(Ok(vec![]))])
            .run(&request(ws, keyword.id))
            .await
            .expect("scan");

        assert_eq!(summary.status, ScanStatus::Completed);
        assert_eq!(store.scans()[0].status, "COMPLETED");
    }

    #[tokio::test]
    async fn inactive_or_foreign_keyword_is_rejected_without_a_scan_row() {
        let store = Arc::new(MemoryStore::default());
        let ws = Uuid::new_v4();
        let inactive = store.add_keyword(ws, "paused", false);
        let scans = orchestrator(&store, vec![hn(vec![])]);

        let err = scans.run(&request(ws, inactive.id)).await.expect_err("inactive");
        assert!(matches!(err, RadarError::KeywordInactive));

        let err = scans
            .run(&request(Uuid::new_v4(), inactive.id))
            .await
            .expect_err("other workspace");
        assert!(matches!(err, RadarError::KeywordNotFound));

        assert!(store.scans().is_empty());
    }
}
