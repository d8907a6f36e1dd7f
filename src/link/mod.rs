//! Outbound link preparation: make an article link safe to open.
//!
//! - [`normalizer`] - Canonicalizes free-text links into strict `http`/`https` URLs
//! - [`resolver`] - Unwraps jump links and follows redirects with a hard hop bound
//! - [`preparer`] - Composes both with graceful degradation to the normalized URL
//!
//! # Example
//!
//! ```ignore
//! use infopush::link::{HttpLinkResolver, LinkPreparer};
//! use std::sync::Arc;
//!
//! let preparer = LinkPreparer::new(Arc::new(HttpLinkResolver::new("info-push-app/0.1")?));
//! let prepared = preparer.prepare("https://t.example.com/r?url=https%3A%2F%2Fexample.com").await;
//! ```

mod normalizer;
mod preparer;
mod resolver;

pub use normalizer::{is_http_url, normalize};
pub use preparer::{LinkPreparer, PreparedLink, LINK_RESOLVE_TIMEOUT};
pub use resolver::{
    unwrap_jump_url, HttpLinkResolver, LinkResolver, ResolveError, JUMP_PARAM_KEYS,
    MAX_REDIRECT_HOPS,
};
