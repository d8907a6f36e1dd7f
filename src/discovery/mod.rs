//! Source recommendations for a free-text query.
//!
//! An optional relay service is consulted first; when it is absent, fails,
//! or yields nothing usable, a built-in catalog plus query-specific search
//! feeds are ranked locally.

mod catalog;
mod rank;
mod relay;
mod tokens;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::source::{SourceDescriptor, SourceType};

pub use rank::candidate_key;
pub use relay::{DiscoveryRelay, HttpDiscoveryRelay, RelayError, RelayItem, DEFAULT_RELAY_TIMEOUT};
pub use tokens::{expand_tokens, infer_github_topic, tokenize};

pub const DEFAULT_DISCOVERY_LIMIT: usize = 8;
pub const MAX_DISCOVERY_LIMIT: usize = 50;
const DEFAULT_QUERY: &str = "ai";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Zh,
}

impl Lang {
    /// Maps a language tag such as `zh-CN` or `en` to a known language.
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "zh" => Some(Lang::Zh),
            "en" => Some(Lang::En),
            _ => None,
        }
    }
}

/// A recommended source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryCandidate {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub tags: Vec<String>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<Lang>,
}

impl DiscoveryCandidate {
    /// Descriptor suitable for probing or subscribing to this candidate.
    pub fn to_descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::new(self.url.clone())
            .with_type(self.source_type)
            .with_name(self.name.clone())
            .with_tags(self.tags.iter().cloned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    Relay,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryResult {
    pub mode: DiscoveryMode,
    pub items: Vec<DiscoveryCandidate>,
}

/// Produces ranked source recommendations. Never fails.
#[derive(Clone, Default)]
pub struct SourceDiscovery {
    relay: Option<Arc<dyn DiscoveryRelay>>,
}

impl SourceDiscovery {
    pub fn new(relay: Option<Arc<dyn DiscoveryRelay>>) -> Self {
        Self { relay }
    }

    /// Recommends up to `limit` sources (default 8, clamped to 1..=50).
    /// An empty query is treated as `"ai"`.
    pub async fn discover(&self, query: &str, limit: Option<usize>) -> DiscoveryResult {
        let query = match query.trim() {
            "" => DEFAULT_QUERY,
            q => q,
        };
        let limit = limit
            .unwrap_or(DEFAULT_DISCOVERY_LIMIT)
            .clamp(1, MAX_DISCOVERY_LIMIT);

        if let Some(items) = self.discover_via_relay(query, limit).await {
            return DiscoveryResult {
                mode: DiscoveryMode::Relay,
                items,
            };
        }

        let items = rank::rank_candidates(query, catalog::candidate_pool(query), limit);
        tracing::debug!(query = %query, results = items.len(), "Ranked fallback discovery");
        DiscoveryResult {
            mode: DiscoveryMode::Fallback,
            items,
        }
    }

    async fn discover_via_relay(&self, query: &str, limit: usize) -> Option<Vec<DiscoveryCandidate>> {
        let relay = self.relay.as_ref()?;

        let items = match relay.discover(query, limit).await {
            Ok(Some(items)) => items,
            Ok(None) => {
                tracing::debug!(query = %query, "Relay returned no item list");
                return None;
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Relay discovery failed, using fallback");
                return None;
            }
        };

        let mut candidates = rank::dedupe_and_validate(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| item.into_candidate(i, query))
                .collect(),
        );
        candidates.truncate(limit);

        if candidates.is_empty() {
            tracing::debug!(query = %query, "Relay items all invalid, using fallback");
            None
        } else {
            Some(candidates)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;

    enum FakeRelay {
        Items(Vec<RelayItem>),
        NoList,
        Fails,
    }

    #[async_trait]
    impl DiscoveryRelay for FakeRelay {
        async fn discover(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Option<Vec<RelayItem>>, RelayError> {
            match self {
                FakeRelay::Items(items) => Ok(Some(items.clone())),
                FakeRelay::NoList => Ok(None),
                FakeRelay::Fails => Err(RelayError::HttpStatus(500)),
            }
        }
    }

    fn item(url: &str) -> RelayItem {
        RelayItem {
            url: Some(url.to_owned()),
            ..Default::default()
        }
    }

    fn with_relay(relay: FakeRelay) -> SourceDiscovery {
        SourceDiscovery::new(Some(Arc::new(relay)))
    }

    #[tokio::test]
    async fn test_fallback_results_are_unique_http_and_bounded() {
        let discovery = SourceDiscovery::default();
        for (query, limit) in [("ai", 8), ("人工智能", 5), ("finance crypto", 50), ("x", 1)] {
            let result = discovery.discover(query, Some(limit)).await;
            assert_eq!(result.mode, DiscoveryMode::Fallback);
            assert!(result.items.len() <= limit);

            let keys: HashSet<_> = result.items.iter().map(|c| candidate_key(&c.url)).collect();
            assert_eq!(keys.len(), result.items.len());
            assert!(result
                .items
                .iter()
                .all(|c| c.url.starts_with("http://") || c.url.starts_with("https://")));
        }
    }

    #[tokio::test]
    async fn test_limit_clamped_and_defaulted() {
        let discovery = SourceDiscovery::default();
        assert_eq!(discovery.discover("ai", Some(0)).await.items.len(), 1);
        assert_eq!(discovery.discover("ai", None).await.items.len(), 8);
        assert!(discovery.discover("ai", Some(500)).await.items.len() <= 50);
    }

    #[tokio::test]
    async fn test_empty_query_defaults_to_ai() {
        let result = SourceDiscovery::default().discover("   ", None).await;
        assert!(!result.items.is_empty());
        assert!(result.items[0].reason.contains("\"ai\""));
    }

    #[tokio::test]
    async fn test_cjk_query_puts_zh_source_first() {
        let result = SourceDiscovery::default().discover("人工智能", Some(8)).await;
        assert_eq!(result.items[0].lang, Some(Lang::Zh));
        assert!(result.items[0].reason.contains("人工智能"));
    }

    #[tokio::test]
    async fn test_relay_items_used_when_valid() {
        let discovery = with_relay(FakeRelay::Items(vec![
            item("https://a.com/feed"),
            item("https://A.com/feed/"),
            item("javascript:alert(1)"),
            item("https://b.com/rss"),
        ]));
        let result = discovery.discover("rust", Some(8)).await;

        assert_eq!(result.mode, DiscoveryMode::Relay);
        let urls: Vec<_> = result.items.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com/feed", "https://b.com/rss"]);
        assert_eq!(result.items[1].name, "Source 4");
    }

    #[tokio::test]
    async fn test_relay_items_truncated_to_limit() {
        let discovery = with_relay(FakeRelay::Items(vec![
            item("https://a.com/1"),
            item("https://a.com/2"),
            item("https://a.com/3"),
        ]));
        let result = discovery.discover("rust", Some(2)).await;
        assert_eq!(result.items.len(), 2);
    }

    #[tokio::test]
    async fn test_relay_failure_falls_back() {
        for relay in [
            FakeRelay::Fails,
            FakeRelay::NoList,
            FakeRelay::Items(vec![]),
            FakeRelay::Items(vec![item("ftp://nope")]),
        ] {
            let result = with_relay(relay).discover("ai", Some(3)).await;
            assert_eq!(result.mode, DiscoveryMode::Fallback);
            assert_eq!(result.items.len(), 3);
        }
    }

    #[test]
    fn test_lang_from_code() {
        assert_eq!(Lang::from_code("zh-CN"), Some(Lang::Zh));
        assert_eq!(Lang::from_code("EN"), Some(Lang::En));
        assert_eq!(Lang::from_code("fr"), None);
        assert_eq!(Lang::from_code(""), None);
    }

    #[test]
    fn test_candidate_to_descriptor() {
        let candidate = DiscoveryCandidate {
            name: "Reddit /r/stocks".into(),
            url: "https://www.reddit.com/r/stocks/.rss".into(),
            source_type: SourceType::Social,
            tags: vec!["finance".into()],
            reason: String::new(),
            lang: Some(Lang::En),
        };
        let d = candidate.to_descriptor();
        assert_eq!(d.declared_type, SourceType::Social);
        assert_eq!(d.tags, vec!["finance"]);
        assert!(d.enabled);
    }
}
