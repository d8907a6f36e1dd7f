use std::sync::LazyLock;

use regex::Regex;

/// A family of query cues that pulls in a fixed set of related terms.
struct TopicTrigger {
    cues: Regex,
    expansion: &'static [&'static str],
}

/// Cue patterns run against the joined lowercase query tokens, so a cue also
/// fires inside a longer token ("llms", "openai", "加密货币").
///
/// SAFETY: Patterns are compile-time constants that are known to be valid.
#[allow(clippy::unwrap_used)]
static TRIGGERS: LazyLock<Vec<TopicTrigger>> = LazyLock::new(|| {
    let trigger = |cues: &str, expansion: &'static [&'static str]| TopicTrigger {
        cues: Regex::new(cues).unwrap(),
        expansion,
    };
    vec![
        trigger(
            "财经|金融|投资|股市|market|finance|fintech|stock",
            &[
                "finance", "market", "investing", "fintech", "stock", "macro", "etf", "quant",
                "财经", "金融",
            ],
        ),
        trigger(
            "加密|区块链|币|crypto|web3|blockchain",
            &["crypto", "blockchain", "web3", "bitcoin", "ethereum", "币圈", "加密"],
        ),
        trigger(
            "ai|人工智能|模型|llm|agent",
            &[
                "ai",
                "llm",
                "agent",
                "machinelearning",
                "generativeai",
                "模型",
                "人工智能",
                "科技",
            ],
        ),
        trigger(
            "编程|开发|技术|程序员|开源|coding|programming|developer",
            &["开发", "编程", "技术", "开源", "programming", "developer"],
        ),
    ]
});

/// GitHub topics in priority order; the first pattern that matches wins.
///
/// SAFETY: Patterns are compile-time constants that are known to be valid.
#[allow(clippy::unwrap_used)]
static GITHUB_TOPICS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("财经|金融|投资|股|finance|fintech|stock|market", "finance"),
        ("加密|区块链|币|crypto|blockchain|web3", "crypto"),
        ("医疗|健康|health|medic|bio", "health"),
        ("教育|学习|edu|learn|study", "education"),
        ("智能体|agent", "agent"),
        ("大模型|llm", "llm"),
    ]
    .into_iter()
    .map(|(pattern, topic)| (Regex::new(pattern).unwrap(), topic))
    .collect()
});

/// Lowercases and splits on whitespace, punctuation, and symbols.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().map(str::to_owned).collect()
}

/// Query tokens followed by the expansions of every trigger they hit, without repeats.
pub fn expand_tokens(tokens: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    let mut push = |term: &str| {
        if !expanded.iter().any(|t| t == term) {
            expanded.push(term.to_owned());
        }
    };

    for token in tokens {
        push(token);
    }
    let joined = tokens.join(" ");
    for trigger in TRIGGERS.iter() {
        if trigger.cues.is_match(&joined) {
            for term in trigger.expansion {
                push(term);
            }
        }
    }
    expanded
}

/// Best GitHub topic for a free-text query.
pub fn infer_github_topic(query: &str) -> &'static str {
    let joined = tokenize(query).join(" ");
    GITHUB_TOPICS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&joined))
        .map_or("ai", |(_, topic)| *topic)
}
