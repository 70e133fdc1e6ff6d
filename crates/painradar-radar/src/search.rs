//! Fan a keyword out to several platforms and merge the results.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use painradar_core::{NormalizedPost, Platform};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::sources::PlatformAdapter;

/// Characters of normalized content used for near-duplicate fingerprints.
const FINGERPRINT_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub keyword: &'a str,
    pub platforms: &'a [Platform],
    /// Per-platform fetch limit and cap on returned posts.
    pub limit: usize,
    pub min_engagement: i64,
    /// Coalesce posts whose content starts the same way.
    pub dedupe: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformError {
    pub platform: Platform,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    /// Every post returned by every adapter, before dedup and filtering.
    pub total_found: usize,
    /// Posts returned per adapter, before dedup and filtering.
    pub by_platform: BTreeMap<Platform, usize>,
    pub errors: Vec<PlatformError>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Unique posts, newest first, at most `limit`.
    pub posts: Vec<NormalizedPost>,
    pub stats: SearchStats,
}

#[derive(Clone)]
pub struct SearchAggregator {
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
}

impl SearchAggregator {
    /// One adapter per platform; a later adapter for the same platform wins.
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn PlatformAdapter>>) -> Self {
        Self {
            adapters: adapters.into_iter().map(|a| (a.platform(), a)).collect(),
        }
    }

    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<_> = self.adapters.keys().copied().collect();
        platforms.sort();
        platforms
    }

    /// Search every requested platform concurrently.
    ///
    /// A failing platform is recorded in `stats.errors` and never aborts the
    /// others; this function itself cannot fail.
    pub async fn search(&self, request: &SearchRequest<'_>) -> SearchOutcome {
        let mut stats = SearchStats::default();
        let mut requested: Vec<Platform> = request.platforms.to_vec();
        requested.sort();
        requested.dedup();

        let mut selected = Vec::with_capacity(requested.len());
        for platform in requested {
            match self.adapters.get(&platform) {
                Some(adapter) => selected.push(Arc::clone(adapter)),
                None => stats.errors.push(PlatformError {
                    platform,
                    error: "no adapter configured".to_string(),
                }),
            }
        }

        let results = join_all(
            selected
                .iter()
                .map(|adapter| adapter.search(request.keyword, request.limit)),
        )
        .await;

        let mut merged = Vec::new();
        for (adapter, result) in selected.iter().zip(results) {
            let platform = adapter.platform();
            match result {
                Ok(posts) => {
                    tracing::debug!(
                        %platform,
                        keyword = request.keyword,
                        count = posts.len(),
                        "platform search finished"
                    );
                    stats.by_platform.insert(platform, posts.len());
                    stats.total_found += posts.len();
                    merged.extend(posts);
                }
                Err(e) => {
                    tracing::warn!(
                        %platform,
                        keyword = request.keyword,
                        error = %e,
                        "platform search failed"
                    );
                    stats.errors.push(PlatformError {
                        platform,
                        error: e.to_string(),
                    });
                }
            }
        }

        let mut posts = dedupe_by_key(merged);
        if request.dedupe {
            posts = dedupe_by_fingerprint(posts);
        }
        posts = filter_by_engagement(posts, request.min_engagement);
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        posts.truncate(request.limit);

        SearchOutcome { posts, stats }
    }
}

/// Keep the first post for each `(platform, platform_id)`.
#[must_use]
pub fn dedupe_by_key(posts: Vec<NormalizedPost>) -> Vec<NormalizedPost> {
    let mut seen: HashSet<(Platform, String)> = HashSet::new();
    posts
        .into_iter()
        .filter(|post| seen.insert((post.platform, post.platform_id.clone())))
        .collect()
}

/// Keep the first post for each content fingerprint. Posts with no content
/// are never coalesced.
#[must_use]
pub fn dedupe_by_fingerprint(posts: Vec<NormalizedPost>) -> Vec<NormalizedPost> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|post| match content_fingerprint(&post.content) {
            Some(fp) => seen.insert(fp),
            None => true,
        })
        .collect()
}

#[must_use]
pub fn filter_by_engagement(posts: Vec<NormalizedPost>, min_engagement: i64) -> Vec<NormalizedPost> {
    posts
        .into_iter()
        .filter(|post| post.engagement >= min_engagement)
        .collect()
}

/// SHA-256 of the first 100 characters of lower-cased, whitespace-collapsed
/// content.
#[must_use]
pub fn content_fingerprint(content: &str) -> Option<[u8; 32]> {
    let normalized: String = content
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(FINGERPRINT_CHARS)
        .collect();
    if normalized.is_empty() {
        return None;
    }
    Some(Sha256::digest(normalized.as_bytes()).into())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::RadarError;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use painradar_core::{calculate_engagement, EngagementMetrics};

    pub(crate) fn post(platform: Platform, id: &str, content: &str, age_hours: i64) -> NormalizedPost {
        let metrics = EngagementMetrics {
            likes: 10,
            comments: 2,
            shares: 0,
        };
        NormalizedPost {
            platform,
            platform_id: id.to_string(),
            author: "author".to_string(),
            author_url: None,
            title: String::new(),
            content: content.to_string(),
            url: format!("https://example.com/{id}"),
            metrics,
            engagement: calculate_engagement(metrics),
            published_at: Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).single().expect("date")
                - Duration::hours(age_hours),
        }
    }

    /// Adapter returning a fixed result.
    pub(crate) struct StaticAdapter {
        pub(crate) platform: Platform,
        pub(crate) result: Result<Vec<NormalizedPost>, String>,
    }

    #[async_trait]
    impl PlatformAdapter for StaticAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn search(&self, _: &str, _: usize) -> Result<Vec<NormalizedPost>, RadarError> {
            self.result.clone().map_err(RadarError::Validation)
        }
    }

    pub(crate) fn aggregator(adapters: Vec<StaticAdapter>) -> SearchAggregator {
        SearchAggregator::new(
            adapters
                .into_iter()
                .map(|a| Arc::new(a) as Arc<dyn PlatformAdapter>)
                .collect(),
        )
    }

    fn request(platforms: &[Platform]) -> SearchRequest<'_> {
        SearchRequest {
            keyword: "slow onboarding",
            platforms,
            limit: 50,
            min_engagement: 0,
            dedupe: true,
        }
    }

    #[tokio::test]
    async fn duplicate_natural_key_across_adapters_is_collapsed() {
        let a = Platform::HackerNews;
        let b = Platform::Reddit;
        let agg = aggregator(vec![
            StaticAdapter {
                platform: a,
                result: Ok(vec![
                    post(a, "1", "first", 1),
                    post(a, "2", "second", 2),
                    post(a, "3", "third", 3),
                ]),
            },
            StaticAdapter {
                platform: b,
                // The second post is a repost carrying A's natural key.
                result: Ok(vec![post(b, "x", "fourth", 4), post(a, "2", "second copy", 5)]),
            },
        ]);

        let outcome = agg.search(&request(&[a, b])).await;

        assert_eq!(outcome.posts.len(), 4);
        assert_eq!(outcome.stats.total_found, 5);
        assert_eq!(outcome.stats.by_platform.get(&a), Some(&3));
        assert_eq!(outcome.stats.by_platform.get(&b), Some(&2));
        assert!(outcome.stats.errors.is_empty());
    }

    #[tokio::test]
    async fn failing_platform_is_reported_not_fatal() {
        let agg = aggregator(vec![
            StaticAdapter {
                platform: Platform::HackerNews,
                result: Ok(vec![post(Platform::HackerNews, "1", "a", 1)]),
            },
            StaticAdapter {
                platform: Platform::Reddit,
                result: Err("boom".to_string()),
            },
        ]);

        let outcome = agg
            .search(&request(&[Platform::HackerNews, Platform::Reddit, Platform::Habr]))
            .await;

        assert_eq!(outcome.posts.len(), 1);
        let failed: Vec<_> = outcome.stats.errors.iter().map(|e| e.platform).collect();
        assert_eq!(failed, vec![Platform::Reddit, Platform::Habr]);
        assert!(outcome.stats.errors[0].error.contains("boom"));
    }

    #[tokio::test]
    async fn sorts_newest_first_filters_engagement_and_limits() {
        let p = Platform::HackerNews;
        let mut quiet = post(p, "quiet", "nobody cares", 0);
        quiet.engagement = 1;
        let agg = aggregator(vec![StaticAdapter {
            platform: p,
            result: Ok(vec![
                post(p, "old", "old", 10),
                quiet,
                post(p, "new", "new", 1),
                post(p, "mid", "mid", 5),
            ]),
        }]);

        let outcome = agg
            .search(&SearchRequest {
                limit: 2,
                min_engagement: 5,
                ..request(&[p])
            })
            .await;

        let ids: Vec<_> = outcome.posts.iter().map(|p| p.platform_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid"]);
        assert_eq!(outcome.stats.total_found, 4);
    }

    #[tokio::test]
    async fn near_duplicates_coalesce_only_when_requested() {
        let agg = aggregator(vec![
            StaticAdapter {
                platform: Platform::Habr,
                result: Ok(vec![post(Platform::Habr, "h1", "Onboarding   takes FOREVER", 1)]),
            },
            StaticAdapter {
                platform: Platform::VcRu,
                result: Ok(vec![post(Platform::VcRu, "v1", "onboarding takes forever", 2)]),
            },
        ]);
        let platforms = [Platform::Habr, Platform::VcRu];

        let deduped = agg.search(&request(&platforms)).await;
        assert_eq!(deduped.posts.len(), 1);

        let raw = agg
            .search(&SearchRequest {
                dedupe: false,
                ..request(&platforms)
            })
            .await;
        assert_eq!(raw.posts.len(), 2);
    }

    #[test]
    fn fingerprint_ignores_case_whitespace_and_tail() {
        let head = "x".repeat(100);
        assert_eq!(
            content_fingerprint(&format!("{head} tail one")),
            content_fingerprint(&format!("{}  tail two", head.to_uppercase()))
        );
        assert_eq!(content_fingerprint("   "), None);
    }
}
