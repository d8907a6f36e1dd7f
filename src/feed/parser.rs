//! Tolerant RSS/Atom item extraction.
//!
//! This is a pattern scanner, not a validating XML parser. Malformed fragments
//! never produce an error; fields that cannot be found are omitted and items
//! without a usable link are dropped.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

use super::item::{FeedItem, UNTITLED};
use crate::util::{decode_entities, strip_control_chars, strip_markup};

/// Item count used when a caller does not ask for a specific limit.
pub const DEFAULT_ITEM_LIMIT: usize = 20;

/// Element names the scanner looks up.
const ELEMENTS: &[&str] = &[
    "feed",
    "entry",
    "rss",
    "channel",
    "item",
    "title",
    "link",
    "id",
    "description",
    "summary",
    "content",
    "encoded",
    "pubdate",
    "published",
    "updated",
    "date",
];

/// Case-insensitive open and close tag patterns for one element name.
struct ElementPattern {
    open: Regex,
    close: Regex,
}

/// SAFETY: Patterns are built from the constant names above and are known to be valid.
#[allow(clippy::unwrap_used)]
static ELEMENT_PATTERNS: LazyLock<HashMap<&'static str, ElementPattern>> = LazyLock::new(|| {
    ELEMENTS
        .iter()
        .map(|name| {
            let pattern = ElementPattern {
                open: Regex::new(&format!(r"(?i)<{name}\b[^>]*>")).unwrap(),
                close: Regex::new(&format!(r"(?i)</{name}\s*>")).unwrap(),
            };
            (*name, pattern)
        })
        .collect()
});

/// Namespace prefix on an opening or closing element name.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static NS_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)\s*[A-Za-z_][A-Za-z0-9_.-]*:").unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static REL_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\srel\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static HREF_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\shref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Document family detected from the tags present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Atom,
    Rss,
}

/// Parses an RSS or Atom document into at most `limit` items.
///
/// Unrecognized documents yield an empty list.
///
/// # Examples
///
/// ```
/// use infopush::feed::parse_feed_document;
///
/// let xml = "<rss><channel><item><title>A</title>\
///            <link>https://example.com/a</link></item></channel></rss>";
/// let items = parse_feed_document(xml, 10);
/// assert_eq!(items.len(), 1);
/// assert_eq!(items[0].url, "https://example.com/a");
/// ```
pub fn parse_feed_document(xml: &str, limit: usize) -> Vec<FeedItem> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let doc = strip_namespace_prefixes(xml);

    match detect_format(&doc) {
        Some(FeedFormat::Atom) => blocks(&doc, "entry")
            .into_iter()
            .filter_map(parse_atom_entry)
            .take(limit)
            .collect(),
        Some(FeedFormat::Rss) => blocks(&doc, "item")
            .into_iter()
            .filter_map(parse_rss_item)
            .take(limit)
            .collect(),
        None => {
            tracing::debug!("Document is neither RSS nor Atom");
            Vec::new()
        }
    }
}

/// Atom wins when both families' tags appear.
pub fn detect_format(doc: &str) -> Option<FeedFormat> {
    let has = |name: &str| element(name).is_some_and(|p| p.open.is_match(doc));

    if has("feed") || has("entry") {
        Some(FeedFormat::Atom)
    } else if has("rss") || has("channel") || has("item") {
        Some(FeedFormat::Rss)
    } else {
        None
    }
}

fn parse_rss_item(block: &str) -> Option<FeedItem> {
    let url = accept_link(&extract_text(block, "link"))?;
    let title = non_empty(extract_text(block, "title")).unwrap_or_else(|| UNTITLED.to_owned());
    let summary = first_text(block, &["description", "content", "encoded"])
        .unwrap_or_else(|| title.clone());
    let published_at = first_text(block, &["pubdate", "published", "updated", "date"])
        .and_then(|raw| parse_date(&raw))
        .unwrap_or_else(Utc::now);

    Some(FeedItem {
        title,
        url,
        summary,
        published_at,
    })
}

fn parse_atom_entry(block: &str) -> Option<FeedItem> {
    let href = atom_link_href(block).unwrap_or_else(|| extract_text(block, "id"));
    let url = accept_link(&href)?;
    let title = non_empty(extract_text(block, "title")).unwrap_or_else(|| UNTITLED.to_owned());
    let summary = first_text(block, &["summary", "content"]).unwrap_or_else(|| title.clone());
    let published_at = first_text(block, &["published", "updated"])
        .and_then(|raw| parse_date(&raw))
        .unwrap_or_else(Utc::now);

    Some(FeedItem {
        title,
        url,
        summary,
        published_at,
    })
}

/// `rel="alternate"` link first, then any link carrying an `href`.
fn atom_link_href(block: &str) -> Option<String> {
    let tags: Vec<&str> = element("link")
        .map(|p| p.open.find_iter(block).map(|m| m.as_str()).collect())
        .unwrap_or_default();

    let alternate = tags.iter().find(|tag| {
        attr_value(tag, &REL_ATTR_RE)
            .is_some_and(|rel| rel.trim().eq_ignore_ascii_case("alternate"))
    });
    alternate
        .into_iter()
        .chain(tags.iter())
        .find_map(|tag| attr_value(tag, &HREF_ATTR_RE))
        .map(|href| decode_entities(href.trim()).into_owned())
        .filter(|href| !href.is_empty())
}

/// Keeps a link only if it is an absolute URL.
fn accept_link(raw: &str) -> Option<String> {
    let link = raw.trim();
    if link.is_empty() {
        return None;
    }
    match Url::parse(link) {
        Ok(_) => Some(link.to_owned()),
        Err(e) => {
            tracing::trace!(link = %link, error = %e, "Dropping item with unusable link");
            None
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn first_text(block: &str, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| non_empty(extract_text(block, name)))
}

fn element(name: &str) -> Option<&'static ElementPattern> {
    ELEMENT_PATTERNS.get(name)
}

/// Text content of the first non-self-closing `<name>` element, decoded and
/// stripped of markup. Empty when absent or unterminated.
fn extract_text(block: &str, name: &str) -> String {
    match element_bodies(block, name).next() {
        Some(raw) => {
            let text = strip_markup(&decode_entities(raw));
            strip_control_chars(&text).trim().to_owned()
        }
        None => String::new(),
    }
}

/// Inner content of every `<name ...>...</name>` element, in document order.
fn blocks<'a>(doc: &'a str, name: &str) -> Vec<&'a str> {
    element_bodies(doc, name).collect()
}

/// Walks `<name>` elements, skipping self-closing ones. Stops at the first
/// element with no closing tag.
fn element_bodies<'a>(doc: &'a str, name: &str) -> impl Iterator<Item = &'a str> + 'a {
    let pattern = element(name);
    let name = name.to_owned();
    let mut from = 0;

    std::iter::from_fn(move || {
        let pattern = pattern?;
        loop {
            let open = pattern.open.find_at(doc, from)?;
            if open.as_str().ends_with("/>") {
                from = open.end();
                continue;
            }
            let Some(close) = pattern.close.find_at(doc, open.end()) else {
                tracing::trace!(tag = %name, "Unterminated element, ignoring remainder");
                from = doc.len();
                return None;
            };
            from = close.end();
            return Some(&doc[open.end()..close.start()]);
        }
    })
}

/// Value of `name="..."` or `name='...'` inside a single tag.
fn attr_value<'a>(tag: &'a str, attr: &Regex) -> Option<&'a str> {
    let caps = attr.captures(tag)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Drops `prefix:` from element names (`<dc:date>` becomes `<date>`).
fn strip_namespace_prefixes(xml: &str) -> Cow<'_, str> {
    NS_PREFIX_RE.replace_all(xml, "<$1")
}

/// RFC 2822, RFC 3339, and a few zone-less forms (read as UTC).
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
