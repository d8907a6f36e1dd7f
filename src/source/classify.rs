use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::types::{SourceDescriptor, SourceKind, SourceType};

/// Hosts whose every route serves a feed.
const AGGREGATOR_HOSTS: &[&str] = &["rsshub.app"];

/// Assigns a fetch strategy. The checks form a priority cascade: a GitHub URL
/// stays `Github` even when it also looks like a feed URL.
pub fn classify(source: &SourceDescriptor) -> SourceKind {
    let url = source.url.trim();

    if source.declared_type == SourceType::Github || host_matches(url, &["github.com"]) {
        SourceKind::Github
    } else if source.declared_type == SourceType::Social {
        SourceKind::Social
    } else if source.declared_type == SourceType::Rss || looks_like_feed_url(url) {
        SourceKind::Feed
    } else {
        SourceKind::Unknown
    }
}

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static FEED_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)rss|feed\.xml|\.xml(?:$|[?#])").unwrap());

/// `rss` anywhere, `feed.xml`, a `.xml` path (query allowed), or an aggregator host.
pub fn looks_like_feed_url(url: &str) -> bool {
    FEED_URL_RE.is_match(url) || host_matches(url, AGGREGATOR_HOSTS)
}

/// True when the URL host is one of `domains` or a subdomain of one.
pub(crate) fn host_matches(url: &str, domains: &[&str]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(url: &str, t: SourceType) -> SourceDescriptor {
        SourceDescriptor::new(url).with_type(t)
    }

    #[test]
    fn test_github_host_wins_over_feed_heuristic() {
        assert_eq!(
            classify(&src("https://github.com/topics/rss", SourceType::Rss)),
            SourceKind::Github
        );
        assert_eq!(
            classify(&src("https://www.github.com/trending", SourceType::Custom)),
            SourceKind::Github
        );
    }

    #[test]
    fn test_declared_github_type() {
        assert_eq!(
            classify(&src("https://example.com/x", SourceType::Github)),
            SourceKind::Github
        );
    }

    #[test]
    fn test_github_lookalike_host_is_not_github() {
        assert_eq!(
            classify(&src("https://notgithub.com/a", SourceType::Custom)),
            SourceKind::Unknown
        );
    }

    #[test]
    fn test_declared_social() {
        assert_eq!(
            classify(&src("https://www.reddit.com/r/rust", SourceType::Social)),
            SourceKind::Social
        );
    }

    #[test]
    fn test_feed_by_declared_type_or_url() {
        assert_eq!(
            classify(&src("https://example.com/blog", SourceType::Rss)),
            SourceKind::Feed
        );
        for url in [
            "https://www.jiqizhixin.com/rss",
            "https://huggingface.co/blog/feed.xml",
            "https://www.v2ex.com/index.xml",
            "https://example.com/atom.xml?lang=en",
            "https://rsshub.app/zhihu/hotlist",
        ] {
            assert_eq!(classify(&src(url, SourceType::Custom)), SourceKind::Feed, "{url}");
        }
    }

    #[test]
    fn test_unknown_when_nothing_matches() {
        assert_eq!(
            classify(&src("https://example.com/about", SourceType::Custom)),
            SourceKind::Unknown
        );
        assert_eq!(
            classify(&src("https://example.com/xml/page", SourceType::Custom)),
            SourceKind::Unknown
        );
    }
}
