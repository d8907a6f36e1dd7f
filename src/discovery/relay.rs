use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::{DiscoveryCandidate, Lang};
use crate::source::SourceType;

pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RELAY_RESPONSE: usize = 1024 * 1024; // 1MB

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Relay request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("relay_status_{0}")]
    HttpStatus(u16),
    #[error("Relay request timed out")]
    Timeout,
    #[error("Relay response too large")]
    ResponseTooLarge,
    #[error("Invalid relay response: {0}")]
    Decode(String),
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    task: &'static str,
    query: &'a str,
    limit: usize,
    format: &'static str,
}

/// One recommendation as returned by the relay. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelayItem {
    #[serde(default, rename = "type")]
    pub source_type: Option<SourceType>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub lang: Option<String>,
}

impl RelayItem {
    /// Fills defaults; `index` is zero-based.
    pub fn into_candidate(self, index: usize, query: &str) -> DiscoveryCandidate {
        DiscoveryCandidate {
            name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("Source {}", index + 1)),
            url: self.url.map(|u| u.trim().to_owned()).unwrap_or_default(),
            source_type: self.source_type.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            reason: self
                .reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| format!("根据“{query}”推荐")),
            lang: self.lang.as_deref().and_then(Lang::from_code),
        }
    }
}

/// External recommendation service. `Ok(None)` means the relay answered
/// without an item list.
#[async_trait]
pub trait DiscoveryRelay: Send + Sync {
    async fn discover(&self, query: &str, limit: usize)
        -> Result<Option<Vec<RelayItem>>, RelayError>;
}

/// [`DiscoveryRelay`] that POSTs a JSON task to a configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpDiscoveryRelay {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpDiscoveryRelay {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout: DEFAULT_RELAY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Option<Vec<RelayItem>>, RelayError> {
        let body = serde_json::to_vec(&RelayRequest {
            task: "discover_sources",
            query,
            limit,
            format: "json",
        })
        .map_err(|e| RelayError::Decode(e.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RelayError::HttpStatus(response.status().as_u16()));
        }
        if response
            .content_length()
            .is_some_and(|len| len > MAX_RELAY_RESPONSE as u64)
        {
            return Err(RelayError::ResponseTooLarge);
        }

        let bytes = response.bytes().await?;
        if bytes.len() > MAX_RELAY_RESPONSE {
            return Err(RelayError::ResponseTooLarge);
        }
        parse_relay_response(&bytes)
    }
}

#[async_trait]
impl DiscoveryRelay for HttpDiscoveryRelay {
    async fn discover(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Option<Vec<RelayItem>>, RelayError> {
        tokio::time::timeout(self.timeout, self.request(query, limit))
            .await
            .map_err(|_| RelayError::Timeout)?
    }
}

/// Accepts `{"items": [...]}`. A missing or non-array `items` yields `None`;
/// a malformed element fails the whole response.
pub(crate) fn parse_relay_response(bytes: &[u8]) -> Result<Option<Vec<RelayItem>>, RelayError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| RelayError::Decode(e.to_string()))?;

    match value.get("items") {
        Some(items) if items.is_array() => serde_json::from_value(items.clone())
            .map(Some)
            .map_err(|e| RelayError::Decode(e.to_string())),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_relay_response_shapes() {
        assert_eq!(parse_relay_response(br#"{"items": []}"#).unwrap(), Some(vec![]));
        assert_eq!(parse_relay_response(br#"{"ok": true}"#).unwrap(), None);
        assert_eq!(parse_relay_response(br#"{"items": "nope"}"#).unwrap(), None);
        assert!(parse_relay_response(b"<html>").is_err());
        assert!(parse_relay_response(br#"{"items": [42]}"#).is_err());
    }

    #[test]
    fn test_into_candidate_defaults() {
        let candidate = RelayItem {
            url: Some(" https://e.com/rss ".into()),
            ..Default::default()
        }
        .into_candidate(1, "量化");

        assert_eq!(candidate.name, "Source 2");
        assert_eq!(candidate.url, "https://e.com/rss");
        assert_eq!(candidate.source_type, SourceType::Custom);
        assert_eq!(candidate.reason, "根据“量化”推荐");
        assert!(candidate.tags.is_empty());
        assert_eq!(candidate.lang, None);
    }

    #[test]
    fn test_unknown_relay_type_is_custom() {
        let items = parse_relay_response(
            br#"{"items":[{"type":"newsletter","url":"https://e.com","lang":"zh-CN"}]}"#,
        )
        .unwrap()
        .unwrap();
        let candidate = items[0].clone().into_candidate(0, "q");
        assert_eq!(candidate.source_type, SourceType::Custom);
        assert_eq!(candidate.lang, Some(Lang::Zh));
    }

    #[tokio::test]
    async fn test_http_relay_posts_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "task": "discover_sources",
                "query": "rust",
                "limit": 4,
                "format": "json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "This Week in Rust", "url": "https://this-week-in-rust.org/rss.xml", "type": "rss"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let relay = HttpDiscoveryRelay::new(reqwest::Client::new(), server.uri());
        let items = relay.discover("rust", 4).await.unwrap().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_type, Some(SourceType::Rss));
    }

    #[tokio::test]
    async fn test_http_relay_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let relay = HttpDiscoveryRelay::new(reqwest::Client::new(), server.uri());
        let err = relay.discover("rust", 4).await.unwrap_err();
        assert_eq!(err.to_string(), "relay_status_502");
    }

    #[tokio::test]
    async fn test_http_relay_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let relay = HttpDiscoveryRelay::new(reqwest::Client::new(), server.uri())
            .with_timeout(Duration::from_millis(200));
        assert!(matches!(
            relay.discover("rust", 4).await,
            Err(RelayError::Timeout)
        ));
    }
}
