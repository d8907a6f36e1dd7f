use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::error::FetchError;
use super::fetcher::{read_limited_bytes, DEFAULT_FETCH_TIMEOUT, MAX_FEED_SIZE};
use super::types::SourceDescriptor;

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const DEFAULT_TOPIC: &str = "ai";

/// One repository from a trending/topic search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendingRepo {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Supplies trending repositories for a topic keyword.
#[async_trait]
pub trait TrendingProvider: Send + Sync {
    async fn trending(&self, keyword: &str, limit: usize) -> Result<Vec<TrendingRepo>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RepoRecord>,
}

#[derive(Debug, Deserialize)]
struct RepoRecord {
    full_name: String,
    html_url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// [`TrendingProvider`] backed by the GitHub repository search API, sorted by stars.
pub struct GithubSearchProvider {
    client: reqwest::Client,
    api_base: String,
    token: Option<SecretString>,
    timeout: Duration,
}

impl std::fmt::Debug for GithubSearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubSearchProvider")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GithubSearchProvider {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            token: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: Option<SecretString>) -> Self {
        self.token = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn search_url(&self, keyword: &str, limit: usize) -> Result<Url, FetchError> {
        let endpoint = format!(
            "{}/search/repositories",
            self.api_base.trim_end_matches('/')
        );
        Url::parse_with_params(
            &endpoint,
            &[
                ("q", format!("topic:{keyword} sort:stars-desc")),
                ("per_page", limit.clamp(1, 100).to_string()),
            ],
        )
        .map_err(|e| FetchError::Decode(format!("invalid GitHub API base: {e}")))
    }

    async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<TrendingRepo>, FetchError> {
        let url = self.search_url(keyword, limit)?;
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
        let parsed: SearchResponse =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(parsed
            .items
            .into_iter()
            .filter(|r| !r.html_url.trim().is_empty())
            .take(limit)
            .map(|r| TrendingRepo {
                title: r.full_name,
                url: r.html_url,
                summary: r.description.filter(|d| !d.trim().is_empty()),
                updated_at: r.updated_at,
            })
            .collect())
    }
}

#[async_trait]
impl TrendingProvider for GithubSearchProvider {
    async fn trending(&self, keyword: &str, limit: usize) -> Result<Vec<TrendingRepo>, FetchError> {
        tokio::time::timeout(self.timeout, self.search(keyword, limit))
            .await
            .map_err(|_| FetchError::Timeout)?
    }
}

/// Picks the topic keyword for a GitHub source: `/topics/<kw>` in the URL,
/// then the first tag, then the name, then `"ai"`.
pub fn infer_topic(source: &SourceDescriptor) -> String {
    if let Some(topic) = topic_from_url(&source.url) {
        return topic;
    }
    source
        .tags
        .iter()
        .map(|t| t.trim())
        .chain(source.name.as_deref().map(str::trim))
        .find(|s| !s.is_empty())
        .unwrap_or(DEFAULT_TOPIC)
        .to_owned()
}

fn topic_from_url(url: &str) -> Option<String> {
    let lower = url.to_ascii_lowercase();
    let start = lower.find("topics/")? + "topics/".len();
    let topic: String = url[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    (!topic.is_empty()).then_some(topic)
}
