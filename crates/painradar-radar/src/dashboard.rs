//! Read-only rollups over persisted pains for one workspace and time window.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use painradar_db::{PainRow, ScanRow};
use serde::Serialize;
use uuid::Uuid;

use crate::error::RadarError;
use crate::store::PainStore;

const TOP_PAINS: i64 = 10;
const RECENT_SCANS: i64 = 10;
const SENTIMENT_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DashboardPeriod {
    Days7,
    #[default]
    Days30,
    Days90,
}

impl DashboardPeriod {
    #[must_use]
    pub fn days(self) -> i64 {
        match self {
            Self::Days7 => 7,
            Self::Days30 => 30,
            Self::Days90 => 90,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Days7 => "7d",
            Self::Days30 => "30d",
            Self::Days90 => "90d",
        }
    }

    #[must_use]
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

impl fmt::Display for DashboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DashboardPeriod {
    type Err = RadarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "7d" => Ok(Self::Days7),
            "30d" => Ok(Self::Days30),
            "90d" => Ok(Self::Days90),
            other => Err(RadarError::Validation(format!(
                "unknown period '{other}' (expected 7d, 30d or 90d)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_pains: usize,
    pub total_posts: i64,
    pub top_category: Option<String>,
    pub avg_sentiment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub count: usize,
    pub sentiment: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub period: DashboardPeriod,
    pub overview: Overview,
    pub top_pains: Vec<PainRow>,
    pub trends: Vec<TrendPoint>,
    pub sentiment_distribution: SentimentDistribution,
    pub recent_scans: Vec<ScanRow>,
}

fn average(sum: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = count as f64;
    sum / n
}

/// Category with the most pains; ties go to the alphabetically first name.
fn top_category(pains: &[PainRow]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for pain in pains {
        *counts.entry(pain.category.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(a_name, a), (b_name, b)| a.cmp(b).then_with(|| b_name.cmp(a_name)))
        .map(|(name, _)| name.to_string())
}

fn daily_trends(pains: &[PainRow]) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, (usize, f64)> = BTreeMap::new();
    for pain in pains {
        let bucket = buckets.entry(pain.created_at.date_naive()).or_default();
        bucket.0 += 1;
        bucket.1 += pain.sentiment;
    }
    buckets
        .into_iter()
        .map(|(date, (count, sum))| TrendPoint {
            date,
            count,
            sentiment: average(sum, count),
        })
        .collect()
}

fn sentiment_distribution(pains: &[PainRow]) -> SentimentDistribution {
    pains
        .iter()
        .fold(SentimentDistribution::default(), |mut dist, pain| {
            if pain.sentiment >= SENTIMENT_THRESHOLD {
                dist.positive += 1;
            } else if pain.sentiment <= -SENTIMENT_THRESHOLD {
                dist.negative += 1;
            } else {
                dist.neutral += 1;
            }
            dist
        })
}

/// Assemble the dashboard from rows already scoped to the workspace and window.
#[must_use]
pub fn build_dashboard(
    period: DashboardPeriod,
    pains: &[PainRow],
    total_posts: i64,
    top_pains: Vec<PainRow>,
    recent_scans: Vec<ScanRow>,
) -> Dashboard {
    let sentiment_sum: f64 = pains.iter().map(|p| p.sentiment).sum();
    Dashboard {
        period,
        overview: Overview {
            total_pains: pains.len(),
            total_posts,
            top_category: top_category(pains),
            avg_sentiment: average(sentiment_sum, pains.len()),
        },
        top_pains,
        trends: daily_trends(pains),
        sentiment_distribution: sentiment_distribution(pains),
        recent_scans,
    }
}

#[derive(Clone)]
pub struct DashboardReader {
    store: Arc<dyn PainStore>,
}

impl DashboardReader {
    pub fn new(store: Arc<dyn PainStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns [`RadarError::Store`] when a read fails. An empty workspace is
    /// not an error.
    pub async fn read(
        &self,
        workspace_id: Uuid,
        period: DashboardPeriod,
    ) -> Result<Dashboard, RadarError> {
        self.read_at(workspace_id, period, Utc::now()).await
    }

    /// [`Self::read`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`RadarError::Store`] when a read fails.
    pub async fn read_at(
        &self,
        workspace_id: Uuid,
        period: DashboardPeriod,
        now: DateTime<Utc>,
    ) -> Result<Dashboard, RadarError> {
        let since = period.start(now);
        let (pains, total_posts, top_pains, recent_scans) = tokio::try_join!(
            self.store.pains_since(workspace_id, since),
            self.store.count_posts_since(workspace_id, since),
            self.store.top_pains(workspace_id, since, TOP_PAINS),
            self.store.recent_scans(workspace_id, RECENT_SCANS),
        )?;
        tracing::debug!(
            workspace_id = %workspace_id,
            period = %period,
            pains = pains.len(),
            "dashboard rollup"
        );
        Ok(build_dashboard(
            period,
            &pains,
            total_posts,
            top_pains,
            recent_scans,
        ))
    }
}
