//! Source classification, probing and collection.

mod classify;
mod error;
mod fetcher;
mod github;
mod probe;
mod types;

pub use classify::{classify, looks_like_feed_url};
pub use error::{FetchError, ProbeError, ProbeFailure};
pub use fetcher::{FeedFetcher, FetchedDocument, HttpFeedFetcher, DEFAULT_FETCH_TIMEOUT, FEED_ACCEPT};
pub use github::{
    infer_topic, GithubSearchProvider, TrendingProvider, TrendingRepo, DEFAULT_GITHUB_API_BASE,
};
pub use probe::{CollectResult, ProbeOutcome, SourceProbe, PROBE_ITEM_LIMIT};
pub use types::{SourceDescriptor, SourceKind, SourceType};
