//! Background job scheduler.
//!
//! When `PAINRADAR_SCAN_CRON` is set, every active keyword is scanned over
//! the default platform set on that schedule.

use std::sync::Arc;

use painradar_core::{AppConfig, ScanStatus};
use painradar_radar::{ScanOrchestrator, ScanRequest};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    scans: ScanOrchestrator,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match config.scan_cron.as_deref() {
        Some(cron) => register_scan_job(&scheduler, cron, pool, scans, &config).await?,
        None => tracing::info!("scheduler: PAINRADAR_SCAN_CRON not set; scheduled scans disabled"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_scan_job(
    scheduler: &JobScheduler,
    cron: &str,
    pool: PgPool,
    scans: ScanOrchestrator,
    config: &AppConfig,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);
    let scans = Arc::new(scans);
    let user_id: Option<Arc<str>> = config.scheduler_user_id.as_deref().map(Into::into);

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let scans = Arc::clone(&scans);
        let user_id = user_id.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting keyword scan run");
            run_scan_job(&pool, &scans, user_id.as_deref()).await;
            tracing::info!("scheduler: keyword scan run complete");
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered keyword scan job");
    Ok(())
}

/// Scan every active keyword in turn. One keyword's failure never stops the
/// run.
async fn run_scan_job(pool: &PgPool, scans: &ScanOrchestrator, user_id: Option<&str>) {
    let keywords = match painradar_db::list_active_keywords(pool).await {
        Ok(k) => k,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to load active keywords");
            return;
        }
    };

    if keywords.is_empty() {
        tracing::info!("scheduler: no active keywords; skipping");
        return;
    }

    let mut failed = 0usize;
    for keyword in &keywords {
        let request = ScanRequest {
            workspace_id: keyword.workspace_id,
            keyword_id: keyword.id,
            platforms: None,
            user_id: user_id.map(ToOwned::to_owned),
        };
        match scans.run(&request).await {
            Ok(summary) if summary.status == ScanStatus::Completed => {
                tracing::info!(
                    keyword = %keyword.keyword,
                    scan_id = %summary.scan_id,
                    posts_found = summary.posts_found,
                    posts_new = summary.posts_new,
                    "scheduler: keyword scanned"
                );
            }
            Ok(summary) => {
                failed += 1;
                tracing::warn!(
                    keyword = %keyword.keyword,
                    scan_id = %summary.scan_id,
                    error = summary.error_message.as_deref().unwrap_or("unknown"),
                    "scheduler: keyword scan failed"
                );
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(keyword = %keyword.keyword, error = %e, "scheduler: keyword scan rejected");
            }
        }
    }

    tracing::info!(
        keywords = keywords.len(),
        failed,
        "scheduler: keyword scan summary"
    );
}
