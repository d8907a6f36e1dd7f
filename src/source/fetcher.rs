use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;

use super::error::FetchError;

/// Accept header sent when fetching feed documents.
pub const FEED_ACCEPT: &str =
    "application/atom+xml, application/rss+xml, application/xml, text/xml;q=0.9, */*;q=0.8";
/// Per-request timeout for probe and collection fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(8);
pub(crate) const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Status and body of a fetched document. Non-2xx responses carry an empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub status: u16,
    pub body: String,
}

impl FetchedDocument {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves a document by URL. Returns `Ok` for any HTTP status; only
/// transport failures are errors.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str, accept: Option<&str>) -> Result<FetchedDocument, FetchError>;
}

/// [`FeedFetcher`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_size: usize,
}

impl HttpFeedFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_size: MAX_FEED_SIZE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    async fn fetch_inner(
        &self,
        url: &str,
        accept: Option<&str>,
    ) -> Result<FetchedDocument, FetchError> {
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(reqwest::header::ACCEPT, accept);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();

        if !response.status().is_success() {
            return Ok(FetchedDocument {
                status,
                body: String::new(),
            });
        }

        let bytes = read_limited_bytes(response, self.max_size).await?;
        Ok(FetchedDocument {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str, accept: Option<&str>) -> Result<FetchedDocument, FetchError> {
        let doc = tokio::time::timeout(self.timeout, self.fetch_inner(url, accept))
            .await
            .map_err(|_| FetchError::Timeout)??;

        tracing::debug!(
            url = %url,
            status = doc.status,
            bytes = doc.body.len(),
            "Fetched source document"
        );
        Ok(doc)
    }
}

/// Reads a response body, failing once it exceeds `limit` bytes.
pub(crate) async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
