use url::Url;

use super::tokens::{infer_github_topic, tokenize};
use super::{DiscoveryCandidate, Lang};
use crate::source::SourceType;
use crate::source::SourceType::{Github, Rss, Social};
use crate::util::contains_cjk;

/// A built-in source recommendation.
pub(crate) struct CatalogEntry {
    pub source_type: SourceType,
    pub name: &'static str,
    pub url: &'static str,
    pub tags: &'static [&'static str],
    pub lang: Lang,
}

impl CatalogEntry {
    fn to_candidate(&self) -> DiscoveryCandidate {
        DiscoveryCandidate {
            name: self.name.to_owned(),
            url: self.url.to_owned(),
            source_type: self.source_type,
            tags: self.tags.iter().map(|t| (*t).to_owned()).collect(),
            reason: String::new(),
            lang: Some(self.lang),
        }
    }
}

const fn entry(
    source_type: SourceType,
    name: &'static str,
    url: &'static str,
    tags: &'static [&'static str],
    lang: Lang,
) -> CatalogEntry {
    CatalogEntry {
        source_type,
        name,
        url,
        tags,
        lang,
    }
}

pub(crate) const EN_SOURCES: &[CatalogEntry] = &[
    entry(Github, "GitHub Trending AI", "https://github.com/topics/ai", &["github", "ai", "trending"], Lang::En),
    entry(Github, "GitHub Trending Finance", "https://github.com/topics/finance", &["github", "finance", "fintech"], Lang::En),
    entry(Github, "GitHub Trending Crypto", "https://github.com/topics/crypto", &["github", "crypto", "blockchain"], Lang::En),
    entry(Github, "GitHub Trending Quant", "https://github.com/topics/quant", &["github", "quant", "finance"], Lang::En),
    entry(Rss, "Hugging Face Blog", "https://huggingface.co/blog/feed.xml", &["ai", "ml", "models"], Lang::En),
    entry(Rss, "OpenAI News", "https://openai.com/news/rss.xml", &["ai", "openai"], Lang::En),
    entry(Rss, "Google AI Blog", "https://blog.google/technology/ai/rss/", &["ai", "google"], Lang::En),
    entry(Rss, "CoinDesk RSS", "https://www.coindesk.com/arc/outboundfeeds/rss/", &["finance", "crypto", "market"], Lang::En),
    entry(Rss, "Cointelegraph RSS", "https://cointelegraph.com/rss", &["finance", "crypto", "market"], Lang::En),
    entry(Rss, "Reuters Business RSS", "https://feeds.reuters.com/reuters/businessNews", &["finance", "business", "market"], Lang::En),
    entry(Rss, "Reuters World News RSS", "https://feeds.reuters.com/Reuters/worldNews", &["macro", "market", "finance"], Lang::En),
    entry(Rss, "CNBC Top News RSS", "https://www.cnbc.com/id/100003114/device/rss/rss.html", &["finance", "market", "business"], Lang::En),
    entry(Rss, "MarketWatch Top Stories", "https://feeds.content.dowjones.io/public/rss/mw_topstories", &["finance", "market", "stock"], Lang::En),
    entry(Rss, "Yahoo Finance", "https://finance.yahoo.com/news/rssindex", &["finance", "market", "stock"], Lang::En),
    entry(Social, "Reddit /r/MachineLearning", "https://www.reddit.com/r/MachineLearning/.rss", &["ai", "research", "reddit"], Lang::En),
    entry(Social, "Reddit /r/investing", "https://www.reddit.com/r/investing/.rss", &["finance", "investing", "reddit"], Lang::En),
    entry(Social, "Reddit /r/stocks", "https://www.reddit.com/r/stocks/.rss", &["finance", "stocks", "reddit"], Lang::En),
    entry(Social, "Reddit /r/SecurityAnalysis", "https://www.reddit.com/r/SecurityAnalysis/.rss", &["finance", "analysis", "reddit"], Lang::En),
];

pub(crate) const ZH_SOURCES: &[CatalogEntry] = &[
    entry(Rss, "机器之心", "https://www.jiqizhixin.com/rss", &["中文", "ai", "人工智能", "科技"], Lang::Zh),
    entry(Rss, "量子位", "https://www.qbitai.com/feed", &["中文", "ai", "人工智能", "科技"], Lang::Zh),
    entry(Rss, "少数派", "https://sspai.com/feed", &["中文", "效率", "科技", "产品"], Lang::Zh),
    entry(Rss, "36Kr 科技", "https://36kr.com/feed", &["中文", "科技", "创业", "商业"], Lang::Zh),
    entry(Rss, "开源中国资讯", "https://www.oschina.net/news/rss", &["中文", "开源", "技术", "编程"], Lang::Zh),
    entry(Rss, "V2EX 热门", "https://www.v2ex.com/index.xml", &["中文", "社区", "开发", "技术"], Lang::Zh),
    entry(Rss, "掘金热门", "https://juejin.cn/rss", &["中文", "开发", "前端", "后端"], Lang::Zh),
    entry(Rss, "知乎热榜（RSSHub）", "https://rsshub.app/zhihu/hotlist", &["中文", "知乎", "热榜", "资讯"], Lang::Zh),
];

/// Query-specific sources: a GitHub topic page, search feeds, and for CJK
/// queries a Zhihu search feed.
pub(crate) fn dynamic_sources(query: &str) -> Vec<DiscoveryCandidate> {
    let topic = infer_github_topic(query);
    let tokens = tokenize(query);
    let tagged = |base: &[&str]| -> Vec<String> {
        base.iter()
            .map(|t| (*t).to_owned())
            .chain(tokens.iter().cloned())
            .collect()
    };
    let candidate = |source_type, name: String, url: Option<Url>, tags, lang| {
        url.map(|url| DiscoveryCandidate {
            name,
            url: url.into(),
            source_type,
            tags,
            reason: String::new(),
            lang: Some(lang),
        })
    };

    let mut dynamic = vec![
        candidate(
            Github,
            format!("GitHub Trending: {topic}"),
            Url::parse(&format!("https://github.com/topics/{topic}")).ok(),
            vec!["github".to_owned(), topic.to_owned(), "trending".to_owned()],
            Lang::En,
        ),
        candidate(
            Github,
            format!("GitHub Search: {query}"),
            Url::parse_with_params("https://github.com/search", &[("q", query)]).ok(),
            tagged(&["github"]),
            Lang::En,
        ),
        candidate(
            Rss,
            format!("Google News RSS: {query}"),
            Url::parse_with_params("https://news.google.com/rss/search", &[("q", query)]).ok(),
            tagged(&["news"]),
            Lang::En,
        ),
        candidate(
            Rss,
            format!("Google News CN RSS: {query}"),
            Url::parse_with_params(
                "https://news.google.com/rss/search",
                &[("q", query), ("hl", "zh-CN"), ("gl", "CN"), ("ceid", "CN:zh-Hans")],
            )
            .ok(),
            tagged(&["news", "cn"]),
            Lang::Zh,
        ),
        candidate(
            Social,
            format!("Reddit Search RSS: {query}"),
            Url::parse_with_params("https://www.reddit.com/search.rss", &[("q", query)]).ok(),
            tagged(&["reddit"]),
            Lang::En,
        ),
    ];

    if contains_cjk(query) {
        dynamic.push(candidate(
            Rss,
            format!("知乎搜索（RSSHub）: {query}"),
            zhihu_search_url(query),
            tagged(&["中文", "知乎"]),
            Lang::Zh,
        ));
    }

    dynamic.into_iter().flatten().collect()
}

fn zhihu_search_url(query: &str) -> Option<Url> {
    let mut url = Url::parse("https://rsshub.app/zhihu/search").ok()?;
    url.path_segments_mut().ok()?.push(query);
    Some(url)
}

/// Dynamic sources first, then the catalog in the query's language, then the other.
pub(crate) fn candidate_pool(query: &str) -> Vec<DiscoveryCandidate> {
    let (first, second) = if contains_cjk(query) {
        (ZH_SOURCES, EN_SOURCES)
    } else {
        (EN_SOURCES, ZH_SOURCES)
    };

    let mut pool = dynamic_sources(query);
    pool.extend(first.iter().chain(second).map(CatalogEntry::to_candidate));
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_sources_for_ascii_query() {
        let sources = dynamic_sources("rust async");
        assert_eq!(sources.len(), 5);
        assert_eq!(sources[0].url, "https://github.com/topics/ai");
        assert_eq!(sources[1].url, "https://github.com/search?q=rust+async");
        assert!(sources[2].tags.contains(&"async".to_owned()));
        assert_eq!(sources[4].source_type, SourceType::Social);
        assert!(sources[4].url.starts_with("https://www.reddit.com/search.rss?q="));
    }

    #[test]
    fn test_dynamic_sources_for_cjk_query_add_zhihu() {
        let sources = dynamic_sources("量化投资");
        assert_eq!(sources.len(), 6);
        assert_eq!(sources[0].url, "https://github.com/topics/finance");
        let zhihu = sources.last().unwrap();
        assert!(zhihu.url.starts_with("https://rsshub.app/zhihu/search/%E9%87%8F"));
        assert_eq!(zhihu.lang, Some(Lang::Zh));
    }

    #[test]
    fn test_pool_order_follows_query_language() {
        let zh = candidate_pool("人工智能");
        let first_catalog = &zh[6];
        assert_eq!(first_catalog.name, "机器之心");

        let en = candidate_pool("ai");
        assert_eq!(en[5].name, "GitHub Trending AI");
    }

    #[test]
    fn test_catalog_urls_are_http() {
        for e in EN_SOURCES.iter().chain(ZH_SOURCES) {
            assert!(crate::link::is_http_url(e.url), "{}", e.url);
        }
    }
}
