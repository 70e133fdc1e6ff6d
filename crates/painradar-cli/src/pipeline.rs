//! Search, scan, analysis and dashboard command handlers.
//!
//! Each handler wires the same pipeline components the server uses and
//! prints a plain-text summary. Partial platform failures are reported on
//! stdout, never returned as errors.

use std::sync::Arc;

use painradar_core::{AppConfig, Platform, ScanStatus};
use painradar_radar::{
    default_adapters, quick_search, AnalysisRequest, Analyzer, DashboardPeriod, DashboardReader,
    OpenRouterClient, PgStore, PlatformError, RadarConfig, RateLimiter, ScanOrchestrator,
    ScanRequest, SearchAggregator, SearchRequest,
};
use uuid::Uuid;

use crate::keywords::truncate;

fn build_aggregator(config: &RadarConfig) -> anyhow::Result<SearchAggregator> {
    let limiter = RateLimiter::new();
    Ok(SearchAggregator::new(default_adapters(config, &limiter)?))
}

fn print_platform_errors(errors: &[PlatformError]) {
    for e in errors {
        println!("  warning: {} failed: {}", e.platform, e.error);
    }
}

/// Search and rank posts without touching the database.
///
/// # Errors
///
/// Returns an error if no platforms are selected or the adapters cannot be
/// built.
pub(crate) async fn run_search(
    app: &AppConfig,
    query: &str,
    platforms: &[Platform],
    limit: usize,
    min_engagement: i64,
    dedupe: bool,
) -> anyhow::Result<()> {
    let config = RadarConfig::from_app_config(app);
    let platforms = if platforms.is_empty() {
        config.default_platforms.as_slice()
    } else {
        platforms
    };
    if platforms.is_empty() {
        anyhow::bail!("at least one platform is required");
    }

    let aggregator = build_aggregator(&config)?;
    let request = SearchRequest {
        keyword: query,
        platforms,
        limit,
        min_engagement,
        dedupe,
    };
    let result = quick_search(&aggregator, &request).await;

    println!(
        "'{}': {} posts ({} before filtering), avg problem score {:.1}",
        result.query,
        result.posts.len(),
        result.stats.total,
        result.stats.avg_problem_score
    );
    print_platform_errors(&result.stats.errors);
    println!();
    println!("{:<12}{:>6}{:>9}{:>8}  TITLE", "PLATFORM", "SCORE", "PROBLEM", "ENGAGE");
    for scored in &result.posts {
        println!(
            "{:<12}{:>6}{:>9}{:>8}  {}",
            scored.post.platform,
            scored.total_score,
            scored.problem_score,
            scored.post.engagement,
            truncate(&scored.post.title, 60)
        );
    }
    Ok(())
}

/// Run one scan and print its summary. A failed scan is reported, not
/// returned as an error, because the scan record already holds the message.
///
/// # Errors
///
/// Returns an error if the keyword is unknown or inactive, or the scan record
/// cannot be created.
pub(crate) async fn run_scan(
    pool: &sqlx::PgPool,
    app: &AppConfig,
    workspace_id: Uuid,
    keyword_id: Uuid,
    platforms: Option<Vec<Platform>>,
) -> anyhow::Result<()> {
    let config = RadarConfig::from_app_config(app);
    let aggregator = build_aggregator(&config)?;
    let orchestrator =
        ScanOrchestrator::new(Arc::new(PgStore::new(pool.clone())), aggregator, &config);

    let summary = orchestrator
        .run(&ScanRequest {
            workspace_id,
            keyword_id,
            platforms,
            user_id: app.scheduler_user_id.clone(),
        })
        .await?;

    println!(
        "scan {} {}: {} posts found, {} new",
        summary.scan_id,
        summary.status.as_str(),
        summary.posts_found,
        summary.posts_new
    );
    print_platform_errors(&summary.errors);
    if summary.status == ScanStatus::Failed {
        println!(
            "  error: {}",
            summary.error_message.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}

/// Filter and extract pains from stored posts.
///
/// # Errors
///
/// Returns an error if `OPENROUTER_API_KEY` is not set, the post ids are out
/// of bounds, none of the posts exist, or every extraction fails.
pub(crate) async fn run_analyze(
    pool: &sqlx::PgPool,
    app: &AppConfig,
    workspace_id: Uuid,
    post_ids: Vec<Uuid>,
) -> anyhow::Result<()> {
    let client = OpenRouterClient::from_app_config(app)?
        .ok_or_else(|| anyhow::anyhow!("OPENROUTER_API_KEY is required for analysis"))?;
    let config = RadarConfig::from_app_config(app);
    let analyzer = Analyzer::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(client),
        &config,
    );

    let result = analyzer
        .analyze(&AnalysisRequest {
            workspace_id,
            post_ids,
            user_id: None,
        })
        .await?;

    println!(
        "analyzed {} posts: {} passed the filter (avg score {:.1}), {} pains extracted",
        result.analyzed, result.filtered, result.filter_stats.avg_score, result.pains_extracted
    );
    if !result.failed_post_ids.is_empty() {
        println!("  extraction failed for {} post(s):", result.failed_post_ids.len());
        for id in &result.failed_post_ids {
            println!("    {id}");
        }
    }
    for pain in &result.pains {
        println!(
            "  [{:<15} {:<8}] {}",
            pain.category,
            pain.severity,
            truncate(&pain.pain_text, 80)
        );
    }
    Ok(())
}

/// Print the dashboard rollup for a workspace.
///
/// # Errors
///
/// Returns an error if the period is not one of `7d`, `30d`, `90d` or a
/// query fails.
pub(crate) async fn run_dashboard(
    pool: &sqlx::PgPool,
    workspace_id: Uuid,
    period: &str,
) -> anyhow::Result<()> {
    let period: DashboardPeriod = period.parse()?;
    let reader = DashboardReader::new(Arc::new(PgStore::new(pool.clone())));
    let dashboard = reader.read(workspace_id, period).await?;

    let overview = &dashboard.overview;
    println!("Dashboard ({})", dashboard.period);
    println!("  pains:          {}", overview.total_pains);
    println!("  posts:          {}", overview.total_posts);
    println!(
        "  top category:   {}",
        overview.top_category.as_deref().unwrap_or("-")
    );
    println!("  avg sentiment:  {:.2}", overview.avg_sentiment);
    let dist = dashboard.sentiment_distribution;
    println!(
        "  sentiment:      {} positive / {} neutral / {} negative",
        dist.positive, dist.neutral, dist.negative
    );

    if !dashboard.trends.is_empty() {
        println!();
        println!("{:<12}{:>7}{:>11}", "DATE", "PAINS", "SENTIMENT");
        for point in &dashboard.trends {
            println!("{:<12}{:>7}{:>11.2}", point.date, point.count, point.sentiment);
        }
    }

    if !dashboard.top_pains.is_empty() {
        println!();
        println!("Top pains:");
        for pain in &dashboard.top_pains {
            println!(
                "  x{:<4}{:<10}{}",
                pain.frequency,
                pain.severity,
                truncate(&pain.pain_text, 70)
            );
        }
    }
    Ok(())
}
