use async_trait::async_trait;
use reqwest::header::LOCATION;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

use super::normalizer::normalize;

/// Hard ceiling on followed redirects, independent of the time budget.
pub const MAX_REDIRECT_HOPS: usize = 5;

/// Query keys that tracking/sharing redirectors use to carry the real target.
pub const JUMP_PARAM_KEYS: &[&str] = &["url", "target", "u", "to", "redirect", "redirect_url"];

/// Errors that prevent redirect resolution from starting.
///
/// Once a valid seed exists, resolution itself never fails: transport errors,
/// timeouts, and hop exhaustion all degrade to the last reached URL.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The seed URL (after jump-link unwrapping) did not normalize.
    #[error("invalid link: {0}")]
    InvalidSeed(String),
    /// The non-following HTTP client could not be constructed.
    #[error("failed to build redirect client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Resolves a normalized URL to the location it finally redirects to.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, url: &str, timeout: Duration) -> Result<String, ResolveError>;
}

/// Redirect resolver that walks `Location` headers hop by hop.
///
/// Automatic redirect following is disabled at the transport level so every
/// hop is re-normalized before it is requested. Page content is never
/// interpreted.
pub struct HttpLinkResolver {
    client: reqwest::Client,
    max_hops: usize,
}

impl HttpLinkResolver {
    /// Builds a resolver with its own non-following client.
    pub fn new(user_agent: &str) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_hops: MAX_REDIRECT_HOPS,
        })
    }

    /// Lowers the hop ceiling. Values above [`MAX_REDIRECT_HOPS`] are clamped.
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops.min(MAX_REDIRECT_HOPS);
        self
    }
}

#[async_trait]
impl LinkResolver for HttpLinkResolver {
    async fn resolve(&self, url: &str, timeout: Duration) -> Result<String, ResolveError> {
        let seed = unwrap_jump_url(url);
        let mut current =
            normalize(&seed).ok_or_else(|| ResolveError::InvalidSeed(url.to_owned()))?;
        let mut reached = current.clone();
        let deadline = Instant::now() + timeout;

        for hop in 0..self.max_hops {
            let response =
                match tokio::time::timeout_at(deadline, self.client.get(&current).send()).await {
                    Ok(Ok(response)) => response,
                    Ok(Err(e)) => {
                        tracing::debug!(url = %current, hop, error = %e, "Redirect hop failed, keeping last reached URL");
                        return Ok(reached);
                    }
                    Err(_) => {
                        tracing::debug!(url = %current, hop, "Redirect resolution timed out, keeping last reached URL");
                        return Ok(reached);
                    }
                };
            reached = current.clone();

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned);
            let Some(location) = location else {
                return Ok(reached);
            };

            match normalize(&resolve_against(&current, &location)) {
                Some(next) => {
                    tracing::debug!(from = %current, to = %next, hop, status = %response.status(), "Following redirect");
                    current = next;
                }
                None => {
                    tracing::debug!(url = %current, location = %location, "Redirect target is not a web URL, stopping");
                    return Ok(reached);
                }
            }
        }

        tracing::debug!(url = %reached, hops = self.max_hops, "Redirect hop limit reached");
        Ok(reached)
    }
}

/// Extracts the real target from a tracking/sharing jump URL.
///
/// Returns the decoded value of the first query parameter named in
/// [`JUMP_PARAM_KEYS`] (case-insensitive) whose value normalizes to a web URL.
/// Anything else is returned unchanged.
pub fn unwrap_jump_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_owned();
    };

    let inner = parsed.query_pairs().find_map(|(key, value)| {
        let key = key.to_ascii_lowercase();
        if JUMP_PARAM_KEYS.contains(&key.as_str()) && normalize(&value).is_some() {
            Some(value.into_owned())
        } else {
            None
        }
    });

    match inner {
        Some(target) => {
            tracing::debug!(outer = %url, inner = %target, "Unwrapped jump link");
            target
        }
        None => url.to_owned(),
    }
}

/// Resolves a `Location` value (absolute, scheme-relative, or relative) against the current URL.
fn resolve_against(base: &str, location: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(location))
        .map(String::from)
        .unwrap_or_else(|_| location.to_owned())
}
