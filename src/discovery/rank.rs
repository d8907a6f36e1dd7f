use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::{Position, Url};

use super::tokens::{expand_tokens, tokenize};
use super::{DiscoveryCandidate, Lang};
use crate::link::is_http_url;
use crate::util::contains_cjk;

const RAW_MATCH_WEIGHT: usize = 40;
const EXPANDED_MATCH_WEIGHT: usize = 15;
const ZH_LANG_BONUS: usize = 35;
const ZH_TAG_BONUS: usize = 15;

/// Tags that mark a Chinese-language source.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ZH_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)中文|china|zh|cn").unwrap());

struct MatchStats {
    raw: usize,
    expanded: usize,
}

fn match_stats(candidate: &DiscoveryCandidate, raw: &[String], expanded: &[String]) -> MatchStats {
    let base = format!(
        "{} {} {}",
        candidate.name,
        candidate.url,
        candidate.tags.join(" ")
    )
    .to_lowercase();
    let count = |tokens: &[String]| tokens.iter().filter(|t| base.contains(t.as_str())).count();

    MatchStats {
        raw: count(raw),
        expanded: count(expanded),
    }
}

fn score(candidate: &DiscoveryCandidate, stats: &MatchStats, cjk_query: bool) -> usize {
    let mut score = stats.raw * RAW_MATCH_WEIGHT
        + stats.expanded.saturating_sub(stats.raw) * EXPANDED_MATCH_WEIGHT;

    if cjk_query && stats.expanded > 0 {
        if candidate.lang == Some(Lang::Zh) {
            score += ZH_LANG_BONUS;
        }
        let has_zh_tag = candidate.tags.iter().any(|tag| ZH_TAG_RE.is_match(tag));
        if has_zh_tag {
            score += ZH_TAG_BONUS;
        }
    }
    score
}

/// Scores `pool` against `query`, drops candidates with no match, and returns
/// the best `limit` in descending score order. Ties keep pool order.
pub(crate) fn rank_candidates(
    query: &str,
    pool: Vec<DiscoveryCandidate>,
    limit: usize,
) -> Vec<DiscoveryCandidate> {
    let raw = tokenize(query);
    let expanded = expand_tokens(&raw);
    let cjk_query = contains_cjk(query);

    let mut scored: Vec<(usize, DiscoveryCandidate)> = dedupe_and_validate(pool)
        .into_iter()
        .filter_map(|candidate| {
            let stats = match_stats(&candidate, &raw, &expanded);
            (stats.expanded > 0).then(|| (score(&candidate, &stats, cjk_query), candidate))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.truncate(limit);

    let reason = fallback_reason(query);
    scored
        .into_iter()
        .map(|(_, mut candidate)| {
            candidate.reason = reason.clone();
            candidate
        })
        .collect()
}

fn fallback_reason(query: &str) -> String {
    if contains_cjk(query) {
        format!("与“{query}”相关度较高")
    } else {
        format!("Closely related to \"{query}\"")
    }
}

/// Identity of a candidate URL: fragment and trailing slash dropped, lowercased.
pub fn candidate_key(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return url.trim().to_lowercase();
    };
    let authority = &parsed[Position::BeforeHost..Position::AfterPort];
    let path = parsed.path().strip_suffix('/').unwrap_or(parsed.path());
    let query = parsed.query().map(|q| format!("?{q}")).unwrap_or_default();
    format!("{}://{authority}{path}{query}", parsed.scheme()).to_lowercase()
}

/// Keeps the first candidate per [`candidate_key`], dropping non-web URLs.
pub(crate) fn dedupe_and_validate(candidates: Vec<DiscoveryCandidate>) -> Vec<DiscoveryCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| is_http_url(&c.url) && seen.insert(candidate_key(&c.url)))
        .collect()
}
