use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

use super::classify::{classify, host_matches};
use super::error::{ProbeError, ProbeFailure};
use super::fetcher::{FeedFetcher, FEED_ACCEPT};
use super::github::{infer_topic, TrendingProvider};
use super::types::{SourceDescriptor, SourceKind};
use crate::feed::{dedupe_items, parse_feed_document, FeedItem, UNTITLED};
use crate::link::is_http_url;

/// Items requested when probing a source.
pub const PROBE_ITEM_LIMIT: usize = 3;
const COLLECT_CONCURRENCY: usize = 8;
const SOCIAL_HOSTS: &[&str] = &["reddit.com"];
const NO_DESCRIPTION: &str = "No description";

/// Result of a probe. A disabled source is trivially ok with zero items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub item_count: usize,
    #[serde(flatten)]
    pub failure: Option<ProbeFailure>,
}

impl ProbeOutcome {
    pub fn success(item_count: usize) -> Self {
        Self {
            ok: true,
            item_count,
            failure: None,
        }
    }

    pub fn failed(err: &ProbeError) -> Self {
        Self {
            ok: false,
            item_count: 0,
            failure: Some(ProbeFailure::from(err)),
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.error_code.as_str())
    }
}

/// Outcome of collecting one source in [`SourceProbe::collect_all`].
#[derive(Debug)]
pub struct CollectResult {
    pub url: String,
    pub result: Result<Vec<FeedItem>, ProbeError>,
}

/// Fetches a source with the strategy its classification selects and
/// reports whether it yields items.
#[derive(Clone)]
pub struct SourceProbe {
    fetcher: Arc<dyn FeedFetcher>,
    trending: Option<Arc<dyn TrendingProvider>>,
}

impl SourceProbe {
    pub fn new(fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            fetcher,
            trending: None,
        }
    }

    pub fn with_trending(mut self, provider: Arc<dyn TrendingProvider>) -> Self {
        self.trending = Some(provider);
        self
    }

    /// Validates that `source` currently yields at least one item.
    pub async fn probe(&self, source: &SourceDescriptor) -> ProbeOutcome {
        if !source.enabled {
            return ProbeOutcome::success(0);
        }

        match self.fetch_items(source, PROBE_ITEM_LIMIT).await {
            Ok(items) if items.is_empty() => ProbeOutcome::failed(&ProbeError::FeedEmpty),
            Ok(items) => {
                tracing::debug!(url = %source.url, items = items.len(), "Probe succeeded");
                ProbeOutcome::success(items.len())
            }
            Err(e) => {
                tracing::info!(
                    url = %source.url,
                    code = e.code(),
                    detail = %e,
                    "Probe failed"
                );
                ProbeOutcome::failed(&e)
            }
        }
    }

    /// Fetches up to `limit` items from `source`, deduplicated.
    pub async fn collect(
        &self,
        source: &SourceDescriptor,
        limit: usize,
    ) -> Result<Vec<FeedItem>, ProbeError> {
        if !source.enabled {
            return Ok(Vec::new());
        }
        let items = self.fetch_items(source, limit).await?;
        if items.is_empty() {
            return Err(ProbeError::FeedEmpty);
        }
        Ok(dedupe_items(items))
    }

    /// Collects many sources with bounded concurrency. Results keep input order.
    pub async fn collect_all(
        &self,
        sources: &[SourceDescriptor],
        limit: usize,
    ) -> Vec<CollectResult> {
        let mut results: Vec<(usize, CollectResult)> = stream::iter(sources.iter().enumerate())
            .map(|(index, source)| async move {
                let result = self.collect(source, limit).await;
                (
                    index,
                    CollectResult {
                        url: source.url.clone(),
                        result,
                    },
                )
            })
            .buffer_unordered(COLLECT_CONCURRENCY)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);

        let failed = results.iter().filter(|(_, r)| r.result.is_err()).count();
        tracing::info!(
            total = results.len(),
            failed = failed,
            "Source collection complete"
        );

        results.into_iter().map(|(_, r)| r).collect()
    }

    async fn fetch_items(
        &self,
        source: &SourceDescriptor,
        limit: usize,
    ) -> Result<Vec<FeedItem>, ProbeError> {
        let url = source.url.trim();
        match classify(source) {
            SourceKind::Github => self.fetch_github(source, limit).await,
            SourceKind::Feed => self.fetch_feed(url, limit).await,
            SourceKind::Social => {
                if !host_matches(url, SOCIAL_HOSTS) {
                    return Err(ProbeError::SocialUnsupported);
                }
                self.fetch_feed(&social_feed_url(url), limit).await
            }
            SourceKind::Unknown => Err(ProbeError::TypeUnsupported),
        }
    }

    async fn fetch_feed(&self, url: &str, limit: usize) -> Result<Vec<FeedItem>, ProbeError> {
        let doc = self.fetcher.fetch(url, Some(FEED_ACCEPT)).await?;
        if !doc.is_success() {
            return Err(ProbeError::HttpStatus(doc.status));
        }
        Ok(parse_feed_document(&doc.body, limit))
    }

    async fn fetch_github(
        &self,
        source: &SourceDescriptor,
        limit: usize,
    ) -> Result<Vec<FeedItem>, ProbeError> {
        let provider = self
            .trending
            .as_ref()
            .ok_or(ProbeError::GithubDependencyMissing)?;
        let keyword = infer_topic(source);
        let repos = provider.trending(&keyword, limit).await?;

        Ok(repos
            .into_iter()
            .filter(|repo| {
                let usable = is_http_url(&repo.url);
                if !usable {
                    tracing::trace!(url = %repo.url, "Dropping repository without absolute link");
                }
                usable
            })
            .take(limit)
            .map(|repo| FeedItem {
                title: if repo.title.trim().is_empty() {
                    UNTITLED.to_owned()
                } else {
                    repo.title
                },
                url: repo.url,
                summary: repo.summary.unwrap_or_else(|| NO_DESCRIPTION.to_owned()),
                published_at: repo.updated_at.unwrap_or_else(Utc::now),
            })
            .collect())
    }
}

/// Reddit pages serve a feed at the same path with `/.rss` appended.
fn social_feed_url(url: &str) -> String {
    if url.contains(".rss") {
        url.to_owned()
    } else {
        format!("{}/.rss", url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::error::FetchError;
    use crate::source::fetcher::FetchedDocument;
    use crate::source::github::TrendingRepo;
    use crate::source::types::SourceType;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const RSS: &str = r#"<rss><channel>
        <item><title>One</title><link>https://e.com/1</link></item>
        <item><title>Two</title><link>https://e.com/2</link></item>
        <item><title>Three</title><link>https://e.com/3</link></item>
        <item><title>Four</title><link>https://e.com/4</link></item>
        <item><title>One again</title><link>https://e.com/1</link></item>
    </channel></rss>"#;

    #[derive(Default)]
    struct FakeFetcher {
        responses: HashMap<String, Result<FetchedDocument, String>>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn with(mut self, url: &str, status: u16, body: &str) -> Self {
            self.responses.insert(
                url.to_owned(),
                Ok(FetchedDocument {
                    status,
                    body: body.to_owned(),
                }),
            );
            self
        }

        fn failing(mut self, url: &str) -> Self {
            self.responses.insert(url.to_owned(), Err(url.to_owned()));
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FeedFetcher for FakeFetcher {
        async fn fetch(
            &self,
            url: &str,
            accept: Option<&str>,
        ) -> Result<FetchedDocument, FetchError> {
            assert_eq!(accept, Some(FEED_ACCEPT));
            self.requested.lock().unwrap().push(url.to_owned());
            match self.responses.get(url) {
                Some(Ok(doc)) => Ok(doc.clone()),
                Some(Err(_)) | None => Err(FetchError::Timeout),
            }
        }
    }

    struct FakeTrending(Vec<TrendingRepo>, Mutex<Option<String>>);

    #[async_trait]
    impl TrendingProvider for FakeTrending {
        async fn trending(
            &self,
            keyword: &str,
            limit: usize,
        ) -> Result<Vec<TrendingRepo>, FetchError> {
            *self.1.lock().unwrap() = Some(keyword.to_owned());
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    fn probe_with(fetcher: FakeFetcher) -> (SourceProbe, Arc<FakeFetcher>) {
        let fetcher = Arc::new(fetcher);
        (SourceProbe::new(fetcher.clone()), fetcher)
    }

    fn rss(url: &str) -> SourceDescriptor {
        SourceDescriptor::new(url).with_type(SourceType::Rss)
    }

    #[tokio::test]
    async fn test_probe_feed_caps_at_probe_limit() {
        let (probe, _) = probe_with(FakeFetcher::default().with("https://e.com/rss", 200, RSS));
        let outcome = probe.probe(&rss("https://e.com/rss")).await;
        assert_eq!(outcome, ProbeOutcome::success(3));
    }

    #[tokio::test]
    async fn test_probe_empty_feed() {
        let (probe, _) = probe_with(FakeFetcher::default().with(
            "https://e.com/rss",
            200,
            "<rss><channel></channel></rss>",
        ));
        let outcome = probe.probe(&rss("https://e.com/rss")).await;

        assert!(!outcome.ok);
        assert_eq!(outcome.item_count, 0);
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.error_code, "source_probe_empty");
        assert_eq!(failure.detail, "feed_empty");
        assert!(failure.message.contains("没有可解析内容"));
    }

    #[tokio::test]
    async fn test_probe_http_status() {
        let (probe, _) = probe_with(FakeFetcher::default().with("https://e.com/rss", 403, ""));
        let outcome = probe.probe(&rss("https://e.com/rss")).await;

        assert_eq!(outcome.error_code(), Some("source_probe_http_failed"));
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.detail, "http_status_403");
        assert!(failure.hint.unwrap().contains("403"));
    }

    #[tokio::test]
    async fn test_probe_network_failure() {
        let (probe, _) = probe_with(FakeFetcher::default().failing("https://e.com/rss"));
        let outcome = probe.probe(&rss("https://e.com/rss")).await;
        assert_eq!(outcome.error_code(), Some("source_probe_network_failed"));
        assert!(outcome
            .failure
            .unwrap()
            .detail
            .starts_with("network_error:"));
    }

    #[tokio::test]
    async fn test_probe_unknown_type_makes_no_request() {
        let (probe, fetcher) = probe_with(FakeFetcher::default());
        let outcome = probe
            .probe(&SourceDescriptor::new("https://example.com/about"))
            .await;

        assert_eq!(outcome.error_code(), Some("source_probe_unsupported"));
        assert_eq!(outcome.failure.unwrap().detail, "source_type_unsupported");
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_probe_disabled_source_is_trivially_ok() {
        let (probe, fetcher) = probe_with(FakeFetcher::default());
        let outcome = probe
            .probe(&SourceDescriptor::new("https://example.com/about").disabled())
            .await;
        assert_eq!(outcome, ProbeOutcome::success(0));
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_probe_reddit_appends_rss_suffix() {
        let (probe, fetcher) = probe_with(FakeFetcher::default().with(
            "https://www.reddit.com/r/rust/.rss",
            200,
            RSS,
        ));
        let source =
            SourceDescriptor::new("https://www.reddit.com/r/rust/").with_type(SourceType::Social);
        let outcome = probe.probe(&source).await;

        assert!(outcome.ok);
        assert_eq!(fetcher.requested(), vec!["https://www.reddit.com/r/rust/.rss"]);
    }

    #[tokio::test]
    async fn test_probe_reddit_keeps_existing_rss_suffix() {
        let (probe, fetcher) = probe_with(FakeFetcher::default().with(
            "https://www.reddit.com/r/rust/.rss",
            200,
            RSS,
        ));
        let source = SourceDescriptor::new("https://www.reddit.com/r/rust/.rss")
            .with_type(SourceType::Social);
        assert!(probe.probe(&source).await.ok);
        assert_eq!(fetcher.requested(), vec!["https://www.reddit.com/r/rust/.rss"]);
    }

    #[tokio::test]
    async fn test_probe_other_social_unsupported() {
        let (probe, fetcher) = probe_with(FakeFetcher::default());
        let source =
            SourceDescriptor::new("https://twitter.com/someone").with_type(SourceType::Social);
        let outcome = probe.probe(&source).await;

        assert_eq!(outcome.error_code(), Some("source_probe_unsupported"));
        assert_eq!(outcome.failure.unwrap().detail, "social_source_unsupported");
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_probe_github_without_provider() {
        let (probe, _) = probe_with(FakeFetcher::default());
        let outcome = probe
            .probe(&SourceDescriptor::new("https://github.com/topics/ai"))
            .await;
        assert_eq!(outcome.error_code(), Some("github_dependency_missing"));
        assert!(outcome.failure.unwrap().message.contains("测试未通过"));
    }

    #[tokio::test]
    async fn test_collect_github_maps_repos() {
        let repos = vec![
            TrendingRepo {
                title: "a/one".into(),
                url: "https://github.com/a/one".into(),
                summary: None,
                updated_at: None,
            },
            TrendingRepo {
                title: "b/two".into(),
                url: "https://github.com/b/two".into(),
                summary: Some("Second".into()),
                updated_at: None,
            },
        ];
        let trending = Arc::new(FakeTrending(repos, Mutex::new(None)));
        let probe = SourceProbe::new(Arc::new(FakeFetcher::default())).with_trending(trending.clone());

        let items = probe
            .collect(&SourceDescriptor::new("https://github.com/topics/quant"), 10)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].summary, "No description");
        assert_eq!(items[1].summary, "Second");
        assert_eq!(trending.1.lock().unwrap().as_deref(), Some("quant"));
    }

    #[tokio::test]
    async fn test_collect_github_drops_relative_links() {
        let repos = vec![
            TrendingRepo {
                title: "org/repo".into(),
                url: "/org/repo".into(),
                summary: None,
                updated_at: None,
            },
            TrendingRepo {
                title: "c/three".into(),
                url: "https://github.com/c/three".into(),
                summary: None,
                updated_at: None,
            },
        ];
        let trending = Arc::new(FakeTrending(repos, Mutex::new(None)));
        let checker = SourceProbe::new(Arc::new(FakeFetcher::default())).with_trending(trending);
        let source = SourceDescriptor::new("https://github.com/topics/ai");

        let items = checker.collect(&source, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://github.com/c/three");
        assert_eq!(checker.probe(&source).await, ProbeOutcome::success(1));
    }

    #[tokio::test]
    async fn test_collect_dedupes() {
        let (probe, _) = probe_with(FakeFetcher::default().with("https://e.com/rss", 200, RSS));
        let items = probe.collect(&rss("https://e.com/rss"), 20).await.unwrap();
        assert_eq!(items.len(), 4);
    }

    #[tokio::test]
    async fn test_collect_all_keeps_input_order() {
        let (probe, _) = probe_with(
            FakeFetcher::default()
                .with("https://a.com/rss", 200, RSS)
                .with("https://b.com/rss", 404, "")
                .with("https://c.com/rss", 200, RSS),
        );
        let sources = vec![
            rss("https://a.com/rss"),
            rss("https://b.com/rss"),
            rss("https://c.com/rss"),
        ];
        let results = probe.collect_all(&sources, 2).await;

        let urls: Vec<_> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com/rss", "https://b.com/rss", "https://c.com/rss"]);
        assert_eq!(results[0].result.as_ref().unwrap().len(), 2);
        assert_eq!(results[1].result, Err(ProbeError::HttpStatus(404)));
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let json = serde_json::to_value(ProbeOutcome::failed(&ProbeError::FeedEmpty)).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error_code"], "source_probe_empty");
        assert_eq!(json["detail"], "feed_empty");

        let json = serde_json::to_value(ProbeOutcome::success(2)).unwrap();
        assert_eq!(json, serde_json::json!({"ok": true, "item_count": 2}));
    }
}
