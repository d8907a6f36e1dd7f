use serde::Serialize;
use thiserror::Error;

/// Transport-level failures while fetching a source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

const MSG_NETWORK: &str = "添加失败：网络连接失败，请稍后重试";
const MSG_HTTP_STATUS: &str = "添加失败：信息源返回异常状态码";
const MSG_FEED_EMPTY: &str = "添加失败：该信息源当前没有可解析内容";
const MSG_UNSUPPORTED: &str = "添加失败：暂不支持该信息源格式";
const MSG_FAILED: &str = "添加失败：信息源测试未通过";

/// Why a probe or collection of a source failed.
///
/// Each variant maps to a stable machine code ([`code`](Self::code)), a
/// technical detail string ([`detail`](Self::detail), the `Display` form) and
/// a localized user-facing message with an optional remediation hint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Transport failure before any response was read.
    #[error("network_error:{0}")]
    Network(String),
    /// Source answered with a non-2xx status.
    #[error("http_status_{0}")]
    HttpStatus(u16),
    /// Response parsed but produced no items.
    #[error("feed_empty")]
    FeedEmpty,
    /// Social platform other than reddit.
    #[error("social_source_unsupported")]
    SocialUnsupported,
    /// Classification found no applicable fetch strategy.
    #[error("source_type_unsupported")]
    TypeUnsupported,
    /// GitHub source but no trending provider is wired in. A wiring error,
    /// so the user sees the generic failure message.
    #[error("github_dependency_missing")]
    GithubDependencyMissing,
    #[error("{0}")]
    Other(String),
}

impl ProbeError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ProbeError::Network(_) => "source_probe_network_failed",
            ProbeError::HttpStatus(_) => "source_probe_http_failed",
            ProbeError::FeedEmpty => "source_probe_empty",
            ProbeError::SocialUnsupported | ProbeError::TypeUnsupported => {
                "source_probe_unsupported"
            }
            ProbeError::GithubDependencyMissing => "github_dependency_missing",
            ProbeError::Other(_) => "source_probe_failed",
        }
    }

    pub fn detail(&self) -> String {
        self.to_string()
    }

    /// User-facing message (zh-CN).
    pub fn message(&self) -> &'static str {
        match self {
            ProbeError::Network(_) => MSG_NETWORK,
            ProbeError::HttpStatus(_) => MSG_HTTP_STATUS,
            ProbeError::FeedEmpty => MSG_FEED_EMPTY,
            ProbeError::SocialUnsupported | ProbeError::TypeUnsupported => MSG_UNSUPPORTED,
            ProbeError::GithubDependencyMissing | ProbeError::Other(_) => MSG_FAILED,
        }
    }

    /// Optional remediation hint shown below the message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ProbeError::Network(_) => Some("请检查网络连接后重试"),
            ProbeError::HttpStatus(403) => Some("该源拒绝访问(403)，可更换镜像或新的源地址后重试"),
            ProbeError::HttpStatus(404) => Some("源地址不存在(404)，请检查链接是否正确"),
            ProbeError::HttpStatus(_) => Some("请检查源地址或稍后重试"),
            ProbeError::FeedEmpty => Some("该源暂无可解析内容，可稍后重试，或切换到其他信息源"),
            ProbeError::SocialUnsupported | ProbeError::TypeUnsupported => {
                Some("请改用 RSS/Atom 等受支持的源地址")
            }
            ProbeError::GithubDependencyMissing | ProbeError::Other(_) => None,
        }
    }

    /// Returns true if retrying the same source later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProbeError::Network(_) | ProbeError::FeedEmpty => true,
            ProbeError::HttpStatus(status) => *status >= 500 || *status == 429,
            ProbeError::SocialUnsupported
            | ProbeError::TypeUnsupported
            | ProbeError::GithubDependencyMissing
            | ProbeError::Other(_) => false,
        }
    }
}

impl From<FetchError> for ProbeError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Network(e) => ProbeError::Network(e.to_string()),
            FetchError::Timeout => ProbeError::Network("request timed out".to_owned()),
            FetchError::IncompleteResponse { .. } => ProbeError::Network(err.to_string()),
            FetchError::HttpStatus(status) => ProbeError::HttpStatus(status),
            FetchError::ResponseTooLarge => ProbeError::Other("response_too_large".to_owned()),
            FetchError::Decode(msg) => ProbeError::Other(format!("decode_error:{msg}")),
        }
    }
}

/// Serializable failure record attached to a failed [`ProbeOutcome`](super::ProbeOutcome).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeFailure {
    pub error_code: String,
    pub detail: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&ProbeError> for ProbeFailure {
    fn from(err: &ProbeError) -> Self {
        Self {
            error_code: err.code().to_owned(),
            detail: err.detail(),
            message: err.message().to_owned(),
            hint: err.hint().map(str::to_owned),
        }
    }
}
