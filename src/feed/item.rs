use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Placeholder title for items whose feed omitted one.
pub const UNTITLED: &str = "Untitled";

/// A normalized content item produced by a parse or collect call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Never empty; falls back to [`UNTITLED`].
    pub title: String,
    /// Absolute link to the item.
    pub url: String,
    /// Description text, or the title when the feed had none.
    pub summary: String,
    /// Publication time; the parse time when the feed date was missing or unparsable.
    pub published_at: DateTime<Utc>,
}

impl FeedItem {
    /// Stable identity for the item: hex SHA-256 of its URL.
    pub fn fingerprint(&self) -> String {
        format!("{:x}", Sha256::digest(self.url.trim().as_bytes()))
    }
}

/// Removes later items that repeat an earlier item's URL or headline.
///
/// Headlines compare case-insensitively with punctuation collapsed, so the same
/// story syndicated by two feeds keeps only its first appearance. Placeholder
/// titles never collide.
pub fn dedupe_items(items: Vec<FeedItem>) -> Vec<FeedItem> {
    let mut seen_urls = HashSet::new();
    let mut seen_titles = HashSet::new();
    let before = items.len();

    let kept: Vec<FeedItem> = items
        .into_iter()
        .filter(|item| {
            if !seen_urls.insert(item.fingerprint()) {
                return false;
            }
            if item.title == UNTITLED {
                return true;
            }
            let key = title_key(&item.title);
            key.is_empty() || seen_titles.insert(key)
        })
        .collect();

    if kept.len() < before {
        tracing::debug!(
            dropped = before - kept.len(),
            kept = kept.len(),
            "Removed duplicate items"
        );
    }
    kept
}

fn title_key(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
