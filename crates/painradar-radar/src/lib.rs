//! Pain-signal mining pipeline.
//!
//! Searches Hacker News, Reddit and Habr for keyword matches, reconciles the
//! posts into storage, and runs a two-stage inference pipeline (a cheap
//! relevance filter, then structured pain extraction) over selected posts.
//! Dashboard rollups read the persisted pains back out.

pub mod analyze;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod filter;
pub mod inference;
pub mod rate_limit;
pub mod response;
pub mod scan;
pub mod scoring;
pub mod search;
pub mod sources;
pub mod store;

#[cfg(test)]
mod memory;

pub use analyze::{AnalysisRequest, AnalysisResult, Analyzer, MAX_ANALYSIS_POSTS};
pub use config::RadarConfig;
pub use dashboard::{
    build_dashboard, Dashboard, DashboardPeriod, DashboardReader, Overview,
    SentimentDistribution, TrendPoint,
};
pub use error::RadarError;
pub use extract::{ExtractedPain, PainExtractor};
pub use filter::{FilterResult, FilterStats, RelevanceFilter};
pub use inference::{ChatMessage, InferenceClient, OpenRouterClient};
pub use rate_limit::{PlatformQuota, RateLimiter};
pub use scan::{ScanOrchestrator, ScanRequest, ScanSummary};
pub use scoring::{quick_search, QuickSearchResult, ScoredPost};
pub use search::{PlatformError, SearchAggregator, SearchOutcome, SearchRequest, SearchStats};
pub use sources::{default_adapters, PlatformAdapter};
pub use store::{PainStore, PgStore};
