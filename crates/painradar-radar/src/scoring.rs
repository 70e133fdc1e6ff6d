//! Heuristic scoring for quick search: no inference and nothing persisted.

use std::collections::BTreeMap;

use painradar_core::{NormalizedPost, Platform};
use serde::Serialize;

use crate::search::{PlatformError, SearchAggregator, SearchRequest};

/// Substrings (lower-case) that suggest a post describes a problem.
pub const PROBLEM_INDICATORS: &[&str] = &[
    "проблем",
    "ошибк",
    "не работа",
    "не могу",
    "помоги",
    "подскажи",
    "что делать",
    "как быть",
    "устал",
    "надоел",
    "бесит",
    "разочаров",
    "обман",
    "кину",
    "сломал",
    "испорти",
    "не получается",
    "не выходит",
    "застрял",
    "нужен совет",
    "кто сталкивался",
    "у кого было",
    "как решить",
    "как исправить",
    "косяк",
    "баг",
    "глюк",
    "фейл",
    "провал",
    "неудач",
    "problem",
    "issue",
    "error",
    "bug",
    "help",
    "stuck",
    "frustrated",
    "broken",
    "doesn't work",
    "can't",
    "failed",
];

/// Both sub-scores must reach this for a post to count as a top problem.
const TOP_PROBLEM_MIN_SCORE: u8 = 20;
const TOP_PROBLEMS_LIMIT: usize = 10;

/// `min(100, round(log10(e + 1) * 20))`, zero for non-positive engagement.
#[must_use]
pub fn engagement_score(engagement: i64) -> u8 {
    if engagement <= 0 {
        return 0;
    }
    #[allow(clippy::cast_precision_loss)]
    let raw = ((engagement as f64) + 1.0).log10() * 20.0;
    clamp_score(raw.round())
}

/// 20 points per distinct indicator found in `text`, capped at 100.
#[must_use]
pub fn problem_score(text: &str) -> u8 {
    let lower = text.to_lowercase();
    let matches = PROBLEM_INDICATORS
        .iter()
        .filter(|indicator| lower.contains(*indicator))
        .count();
    u8::try_from(matches.saturating_mul(20).min(100)).unwrap_or(100)
}

/// Weighted blend: 60% engagement, 40% problem signal.
#[must_use]
pub fn total_score(engagement_score: u8, problem_score: u8) -> u8 {
    clamp_score((0.6 * f64::from(engagement_score) + 0.4 * f64::from(problem_score)).round())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_score(value: f64) -> u8 {
    value.clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPost {
    #[serde(flatten)]
    pub post: NormalizedPost,
    pub engagement_score: u8,
    pub problem_score: u8,
    pub total_score: u8,
}

impl ScoredPost {
    #[must_use]
    pub fn score(post: NormalizedPost) -> Self {
        let engagement_score = engagement_score(post.engagement);
        let problem_score = problem_score(&post.full_text());
        Self {
            post,
            engagement_score,
            problem_score,
            total_score: total_score(engagement_score, problem_score),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickSearchStats {
    /// Posts returned by all platforms before dedup and filtering.
    pub total: usize,
    pub after_filter: usize,
    pub by_platform: BTreeMap<Platform, usize>,
    pub avg_engagement: f64,
    pub avg_problem_score: f64,
    pub errors: Vec<PlatformError>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickSearchResult {
    pub query: String,
    pub posts: Vec<ScoredPost>,
    pub top_problems: Vec<ScoredPost>,
    pub stats: QuickSearchStats,
}

/// Search, score and rank without touching storage.
///
/// Fetches twice `limit` per platform so that ranking by score has room to
/// pick, then keeps the best `limit` posts by total score.
pub async fn quick_search(
    aggregator: &SearchAggregator,
    request: &SearchRequest<'_>,
) -> QuickSearchResult {
    let limit = request.limit;
    let wide = SearchRequest {
        limit: limit.saturating_mul(2),
        ..request.clone()
    };
    let outcome = aggregator.search(&wide).await;
    let after_filter = outcome.posts.len();

    let mut posts: Vec<ScoredPost> = outcome.posts.into_iter().map(ScoredPost::score).collect();
    posts.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    posts.truncate(limit);

    let top_problems: Vec<ScoredPost> = posts
        .iter()
        .filter(|p| {
            p.engagement_score >= TOP_PROBLEM_MIN_SCORE && p.problem_score >= TOP_PROBLEM_MIN_SCORE
        })
        .take(TOP_PROBLEMS_LIMIT)
        .cloned()
        .collect();

    let stats = QuickSearchStats {
        total: outcome.stats.total_found,
        after_filter,
        by_platform: outcome.stats.by_platform,
        avg_engagement: mean(posts.iter().map(|p| p.post.engagement as f64)),
        avg_problem_score: mean(posts.iter().map(|p| f64::from(p.problem_score))),
        errors: outcome.stats.errors,
    };

    QuickSearchResult {
        query: request.keyword.to_string(),
        posts,
        top_problems,
        stats,
    }
}

/// Arithmetic mean rounded to one decimal; zero for an empty input.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64 * 10.0).round() / 10.0
}
