//! Configuration file parser for ~/.config/infopush/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though a warning is logged for each.
//! Environment variables are layered on top by [`Config::apply_env`].
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::discovery::{DEFAULT_DISCOVERY_LIMIT, MAX_DISCOVERY_LIMIT};
use crate::source::DEFAULT_GITHUB_API_BASE;

pub const DEFAULT_USER_AGENT: &str = "info-push-app/0.1";
pub const RELAY_URL_ENV: &str = "INFOPUSH_RELAY_URL";
pub const GITHUB_TOKEN_ENVS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Debug output masks `github_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User-Agent sent on every outbound request.
    pub user_agent: String,

    /// Timeout for probe and collection fetches, in seconds.
    pub probe_timeout_secs: u64,

    /// Redirect resolution budget when opening links, in milliseconds.
    pub link_timeout_ms: u64,

    /// Discovery relay endpoint. Unset means local ranking only.
    pub relay_url: Option<String>,

    pub relay_timeout_secs: u64,

    /// Base URL of the GitHub REST API.
    pub github_api_base: String,

    /// GitHub token (alternative to GITHUB_TOKEN / GH_TOKEN).
    /// Env var takes precedence over config file.
    pub github_token: Option<String>,

    /// Default number of discovery results.
    pub discovery_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            probe_timeout_secs: 8,
            link_timeout_ms: 2000,
            relay_url: None,
            relay_timeout_secs: 10,
            github_api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            github_token: None,
            discovery_limit: DEFAULT_DISCOVERY_LIMIT,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("user_agent", &self.user_agent)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("link_timeout_ms", &self.link_timeout_ms)
            .field("relay_url", &self.relay_url)
            .field("relay_timeout_secs", &self.relay_timeout_secs)
            .field("github_api_base", &self.github_api_base)
            .field(
                "github_token",
                &self.github_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("discovery_limit", &self.discovery_limit)
            .finish()
    }
}

const KNOWN_KEYS: &[&str] = &[
    "user_agent",
    "probe_timeout_secs",
    "link_timeout_ms",
    "relay_url",
    "relay_timeout_secs",
    "github_api_base",
    "github_token",
    "discovery_limit",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Zero timeouts or an empty user agent → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            relay = config.relay_url.is_some(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("user_agent must not be empty".into()));
        }
        for (key, value) in [
            ("probe_timeout_secs", self.probe_timeout_secs),
            ("link_timeout_ms", self.link_timeout_ms),
            ("relay_timeout_secs", self.relay_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{key} must be greater than 0")));
            }
        }
        Ok(())
    }

    /// Overlays `INFOPUSH_RELAY_URL` and `GITHUB_TOKEN`/`GH_TOKEN` from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(RELAY_URL_ENV) {
            self.relay_url = Some(url);
        }
        if let Some(token) = GITHUB_TOKEN_ENVS.iter().find_map(|key| non_empty(*key)) {
            self.github_token = Some(token);
        }
        self
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn link_timeout(&self) -> Duration {
        Duration::from_millis(self.link_timeout_ms)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }

    pub fn github_token(&self) -> Option<SecretString> {
        self.github_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| SecretString::from(t.to_owned()))
    }

    /// Relay endpoint when one is configured.
    pub fn relay_url(&self) -> Option<&str> {
        self.relay_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// Discovery limit clamped to the supported range.
    pub fn discovery_limit(&self) -> usize {
        self.discovery_limit.clamp(1, MAX_DISCOVERY_LIMIT)
    }
}

// ============================================================================
// Tests
// ============================================================================
