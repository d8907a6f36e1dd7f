use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::normalizer::normalize;
use super::resolver::LinkResolver;

/// Time budget for redirect resolution when opening a link.
pub const LINK_RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);

/// Extra time granted to a resolver before its result is abandoned.
const RESOLVER_GRACE: Duration = Duration::from_millis(500);

/// A link that is safe to hand to a browser, or the reason it is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreparedLink {
    /// `fallback_url` is always the normalized input. `final_url` is the
    /// resolved location and may be empty, in which case the fallback is used.
    Valid {
        final_url: String,
        fallback_url: String,
    },
    Invalid {
        message: String,
    },
}

impl PreparedLink {
    /// The URL to open: the resolved one when present, else the fallback.
    pub fn target(&self) -> Option<&str> {
        match self {
            PreparedLink::Valid {
                final_url,
                fallback_url,
            } => Some(if final_url.is_empty() {
                fallback_url
            } else {
                final_url
            }),
            PreparedLink::Invalid { .. } => None,
        }
    }
}

/// Normalizes, unwraps, and resolves outbound links before they are opened.
///
/// Resolution failures are invisible to the caller: the normalized URL is
/// used instead.
pub struct LinkPreparer {
    resolver: Arc<dyn LinkResolver>,
    timeout: Duration,
}

impl LinkPreparer {
    pub fn new(resolver: Arc<dyn LinkResolver>) -> Self {
        Self {
            resolver,
            timeout: LINK_RESOLVE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn prepare(&self, raw: &str) -> PreparedLink {
        let Some(normalized) = normalize(raw) else {
            tracing::debug!(raw = %raw, "Rejected invalid link");
            return PreparedLink::Invalid {
                message: format!("invalid link: {raw}"),
            };
        };

        let resolved = match tokio::time::timeout(
            self.timeout + RESOLVER_GRACE,
            self.resolver.resolve(&normalized, self.timeout),
        )
        .await
        {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                tracing::debug!(url = %normalized, error = %e, "Link resolution failed, using normalized URL");
                String::new()
            }
            Err(_) => {
                tracing::debug!(url = %normalized, "Link resolver exceeded its budget, using normalized URL");
                String::new()
            }
        };

        let final_url = normalize(&resolved).unwrap_or_else(|| normalized.clone());
        PreparedLink::Valid {
            final_url,
            fallback_url: normalized,
        }
    }
}
