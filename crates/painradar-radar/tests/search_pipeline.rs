//! End-to-end quick search over mocked platform APIs.

use std::sync::Arc;

use painradar_core::Platform;
use painradar_radar::sources::{Fetcher, HackerNewsAdapter, RedditAdapter};
use painradar_radar::{
    quick_search, PlatformAdapter, RadarConfig, RateLimiter, SearchAggregator, SearchRequest,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> Fetcher {
    let config = RadarConfig {
        max_attempts: 2,
        backoff_base_ms: 0,
        ..RadarConfig::default()
    };
    Fetcher::new(&config, RateLimiter::new()).expect("client builds")
}

fn hn_hits() -> serde_json::Value {
    serde_json::json!({
        "hits": [
            {
                "objectID": "901",
                "author": "ops_anna",
                "title": "Ask HN: Invoice reconciliation is a manual nightmare",
                "story_text": "Every month we waste two days matching payments by hand. Frustrating and expensive.",
                "points": 80,
                "num_comments": 40,
                "created_at": "2026-10-10T09:00:00.000Z"
            },
            {
                "objectID": "902",
                "author": "builder",
                "title": "Show HN: A tiny invoice template",
                "points": 3,
                "num_comments": 0,
                "created_at": "2026-10-09T09:00:00.000Z"
            }
        ]
    })
}

#[tokio::test]
async fn quick_search_ranks_posts_and_reports_failed_platforms() {
    let hn = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search_by_date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hn_hits()))
        .mount(&hn)
        .await;

    let reddit = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&reddit)
        .await;

    let fetcher = fetcher();
    let adapters: Vec<Arc<dyn PlatformAdapter>> = vec![
        Arc::new(HackerNewsAdapter::new(fetcher.clone()).with_base_url(hn.uri())),
        Arc::new(RedditAdapter::new(fetcher).with_base_url(reddit.uri())),
    ];
    let aggregator = SearchAggregator::new(adapters);

    let platforms = [Platform::HackerNews, Platform::Reddit];
    let request = SearchRequest {
        keyword: "invoice reconciliation",
        platforms: &platforms,
        limit: 10,
        min_engagement: 0,
        dedupe: true,
    };
    let result = quick_search(&aggregator, &request).await;

    assert_eq!(result.query, "invoice reconciliation");
    assert_eq!(result.posts.len(), 2);
    assert!(result
        .posts
        .windows(2)
        .all(|w| w[0].total_score >= w[1].total_score));
    assert_eq!(result.posts[0].post.platform_id, "901");
    assert!(result.posts.iter().all(|p| p.post.platform == Platform::HackerNews));

    assert_eq!(result.stats.errors.len(), 1);
    assert_eq!(result.stats.errors[0].platform, Platform::Reddit);
}

#[tokio::test]
async fn quick_search_only_queries_requested_platforms() {
    let hn = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search_by_date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hn_hits()))
        .mount(&hn)
        .await;

    let reddit = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&reddit)
        .await;

    let fetcher = fetcher();
    let adapters: Vec<Arc<dyn PlatformAdapter>> = vec![
        Arc::new(HackerNewsAdapter::new(fetcher.clone()).with_base_url(hn.uri())),
        Arc::new(RedditAdapter::new(fetcher).with_base_url(reddit.uri())),
    ];
    let aggregator = SearchAggregator::new(adapters);

    let request = SearchRequest {
        keyword: "invoice",
        platforms: &[Platform::HackerNews],
        limit: 10,
        min_engagement: 50,
        dedupe: true,
    };
    let result = quick_search(&aggregator, &request).await;

    assert!(result.stats.errors.is_empty());
    assert_eq!(result.posts.len(), 1, "low-engagement post is dropped");
    assert_eq!(result.posts[0].post.platform_id, "901");
}
