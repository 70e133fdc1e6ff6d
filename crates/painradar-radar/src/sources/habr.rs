//! Habr articles from the public RSS feeds, filtered by keyword locally.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use painradar_core::{EngagementMetrics, NormalizedPost, Platform};

use super::rss_helpers::{parse_rss_items, strip_html, RssItem};
use super::{Fetcher, PlatformAdapter};
use crate::error::RadarError;

const DEFAULT_BASE_URL: &str = "https://habr.com";

#[derive(Debug, Clone)]
pub struct HabrAdapter {
    fetcher: Fetcher,
    base_url: String,
    hubs: Vec<String>,
}

impl HabrAdapter {
    /// Adapter reading the site-wide feed.
    #[must_use]
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            base_url: DEFAULT_BASE_URL.to_string(),
            hubs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Read the given hub feeds (e.g. `startups`, `management`) instead of
    /// the site-wide feed.
    #[must_use]
    pub fn with_hubs(mut self, hubs: Vec<String>) -> Self {
        self.hubs = hubs;
        self
    }

    fn feed_urls(&self) -> Vec<String> {
        let base = self.base_url.trim_end_matches('/');
        if self.hubs.is_empty() {
            return vec![format!("{base}/ru/rss/all/?fl=ru")];
        }
        self.hubs
            .iter()
            .map(|hub| format!("{base}/ru/rss/hub/{hub}/articles/all/?fl=ru"))
            .collect()
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<RssItem>, RadarError> {
        let xml = self.fetcher.get_text(Platform::Habr, url).await?;
        parse_rss_items(&xml)
    }
}

#[async_trait]
impl PlatformAdapter for HabrAdapter {
    fn platform(&self) -> Platform {
        Platform::Habr
    }

    /// Feeds that fail are skipped; the search only errors when every feed
    /// failed.
    async fn search(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedPost>, RadarError> {
        let urls = self.feed_urls();
        let results = join_all(urls.iter().map(|url| self.fetch_feed(url))).await;

        let mut items = Vec::new();
        let mut last_err = None;
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(feed) => items.extend(feed),
                Err(e) => {
                    tracing::warn!(platform = %Platform::Habr, url, error = %e, "feed fetch failed");
                    last_err = Some(e);
                }
            }
        }
        if items.is_empty() {
            if let Some(err) = last_err {
                return Err(err);
            }
        }

        let needle = keyword.to_lowercase();
        let mut posts: Vec<NormalizedPost> = items
            .into_iter()
            .filter_map(|item| normalize_item(item, &needle))
            .collect();
        posts.truncate(limit);
        Ok(posts)
    }
}

/// Normalize an item that mentions `needle` (already lower-cased).
fn normalize_item(item: RssItem, needle: &str) -> Option<NormalizedPost> {
    let content = strip_html(&item.description);
    let matches = item.title.to_lowercase().contains(needle)
        || content.to_lowercase().contains(needle);
    if !matches {
        return None;
    }

    let platform_id = if item.guid.is_empty() {
        item.link.clone()
    } else {
        item.guid
    };
    if platform_id.is_empty() {
        return None;
    }
    let author = if item.creator.trim().is_empty() {
        "Unknown".to_string()
    } else {
        item.creator.trim().to_string()
    };
    let published_at = DateTime::parse_from_rfc2822(item.pub_date.trim())
        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

    Some(NormalizedPost {
        platform: Platform::Habr,
        platform_id,
        author_url: Some(format!("https://habr.com/ru/users/{author}/")),
        author,
        content: if content.is_empty() {
            item.title.clone()
        } else {
            content
        },
        title: item.title,
        url: item.link,
        metrics: EngagementMetrics::default(),
        engagement: 0,
        published_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_fetcher;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed(items: &[(&str, &str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(guid, title, description)| {
                format!(
                    "<item><title>{title}</title><guid>{guid}</guid><link>{guid}</link>\
                     <description><![CDATA[{description}]]></description>\
                     <pubDate>Mon, 06 Jan 2025 10:00:00 GMT</pubDate>\
                     <dc:creator>bob</dc:creator></item>"
                )
            })
            .collect();
        format!(
            "<?xml version=\"1.0\"?><rss version=\"2.0\" \
             xmlns:dc=\"http://purl.org/dc/elements/1.1/\"><channel>{body}</channel></rss>"
        )
    }

    #[tokio::test]
    async fn keeps_only_items_mentioning_keyword() {
        let server = MockServer::start().await;
        let xml = feed(&[
            ("https://habr.com/1", "Долгий онбординг", "<p>Онбординг занимает месяц</p>"),
            ("https://habr.com/2", "Release notes", "<p>Nothing relevant</p>"),
        ]);
        Mock::given(method("GET"))
            .and(path("/ru/rss/all/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(xml))
            .mount(&server)
            .await;

        let adapter = HabrAdapter::new(test_fetcher()).with_base_url(server.uri());
        let posts = adapter.search("ОНБОРДИНГ", 10).await.expect("search");

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].platform_id, "https://habr.com/1");
        assert_eq!(posts[0].content, "Онбординг занимает месяц");
        assert_eq!(posts[0].author, "bob");
        assert_eq!(posts[0].published_at.timestamp(), 1_736_157_600);
    }

    #[tokio::test]
    async fn failing_hub_does_not_hide_working_hub() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ru/rss/hub/startups/articles/all/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed(&[(
                "https://habr.com/9",
                "Invoice pain",
                "invoices everywhere",
            )])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ru/rss/hub/management/articles/all/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = HabrAdapter::new(test_fetcher())
            .with_base_url(server.uri())
            .with_hubs(vec!["startups".to_string(), "management".to_string()]);
        let posts = adapter.search("invoice", 10).await.expect("search");
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn all_feeds_failing_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = HabrAdapter::new(test_fetcher()).with_base_url(server.uri());
        assert!(adapter.search("anything", 10).await.is_err());
    }
}
