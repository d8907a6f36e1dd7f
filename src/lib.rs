//! Source ingestion core for an information-push client.
//!
//! - [`link`]: normalize, unwrap and resolve outbound links before opening
//! - [`feed`]: tolerant RSS/Atom parsing into [`feed::FeedItem`]s
//! - [`source`]: classify, probe and collect content sources
//! - [`discovery`]: keyword-driven source recommendations

pub mod config;
pub mod discovery;
pub mod feed;
pub mod link;
pub mod source;
pub mod util;
