//! Canonicalization of raw, possibly malformed link text into an absolute web URL.
//!
//! Inputs come from article bodies, titles, and third-party feeds, so the
//! recovery steps are permissive. The final scheme/host check is strict: only
//! `http` and `https` URLs with a non-empty host survive.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Quote characters trimmed from both ends of a raw link, ASCII and full-width.
const QUOTE_CHARS: &[char] = &['"', '\'', '“', '”', '‘', '’', '＂', '＇', '「', '」'];

/// `label(.label)+tld` optionally followed by a path, port, query, or fragment.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static BARE_HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^[A-Za-z0-9.-]+\.[A-Za-z]{2,}(?:[/:?#].*)?$").unwrap()
});

/// A web scheme and the slashes that follow it.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static WEB_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(https?):(/*)").unwrap());

/// Normalizes a raw link string into a percent-encoded `http`/`https` URL.
///
/// Returns `None` when nothing usable remains; callers treat that as an
/// invalid link.
///
/// # Examples
///
/// ```
/// use infopush::link::normalize;
///
/// assert_eq!(
///     normalize("  www.example.com/path  ").as_deref(),
///     Some("https://www.example.com/path")
/// );
/// assert_eq!(
///     normalize("//cdn.example.com/a").as_deref(),
///     Some("https://cdn.example.com/a")
/// );
/// assert!(normalize("javascript:alert(1)").is_none());
/// assert!(normalize("not a url").is_none());
/// ```
pub fn normalize(raw: &str) -> Option<String> {
    let is_noise = |c: char| c.is_whitespace() || c.is_control() || QUOTE_CHARS.contains(&c);
    let trimmed = raw.trim_matches(is_noise);
    if trimmed.is_empty() {
        return None;
    }

    let mut value = trimmed.replace('：', ":").replace('／', "/");

    if value.starts_with("//") {
        value.insert_str(0, "https:");
    }
    if !value.contains("://") && looks_like_bare_host(&value) {
        value.insert_str(0, "https://");
    }

    let value = collapse_scheme_slashes(&value)?;
    let url = Url::parse(&value).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if url.host_str().map_or(true, str::is_empty) {
        return None;
    }
    Some(url.into())
}

/// True when `raw` parses as an absolute `http`/`https` URL with a host.
///
/// Unlike [`normalize`], no recovery is attempted.
pub fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| {
            matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty())
        })
        .unwrap_or(false)
}

fn looks_like_bare_host(value: &str) -> bool {
    BARE_HOST_RE.is_match(value)
}

/// Rewrites `https:////x` as `https://x`. A web scheme with no slash after it
/// (`http:example.com`) is rejected; other schemes pass through untouched.
fn collapse_scheme_slashes(value: &str) -> Option<String> {
    let Some(caps) = WEB_SCHEME_RE.captures(value) else {
        return Some(value.to_owned());
    };
    let scheme = caps.get(1)?.as_str();
    let slashes = caps.get(2)?;
    if slashes.is_empty() {
        return None;
    }
    Some(format!("{scheme}://{}", &value[slashes.end()..]))
}
