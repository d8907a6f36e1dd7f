use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source type as declared by the user or a discovery result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Rss,
    Github,
    Social,
    #[default]
    #[serde(other)]
    Custom,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Rss => "rss",
            SourceType::Github => "github",
            SourceType::Social => "social",
            SourceType::Custom => "custom",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rss" | "atom" | "feed" => Ok(SourceType::Rss),
            "github" => Ok(SourceType::Github),
            "social" => Ok(SourceType::Social),
            "custom" => Ok(SourceType::Custom),
            other => Err(format!(
                "unknown source type '{other}' (expected rss, github, social, or custom)"
            )),
        }
    }
}

/// Fetch strategy assigned by [`classify`](super::classify).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Github,
    Social,
    Feed,
    Unknown,
}

/// A candidate or configured content source.
///
/// Constructed by the caller per operation. Tags keep insertion order because
/// the first tag doubles as the GitHub topic fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub url: String,
    #[serde(rename = "type", default)]
    pub declared_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl SourceDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            declared_type: SourceType::Custom,
            name: None,
            tags: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_type(mut self, declared_type: SourceType) -> Self {
        self.declared_type = declared_type;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds tags, skipping blanks and repeats.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into();
            let tag = tag.trim();
            if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
                self.tags.push(tag.to_owned());
            }
        }
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
