//! Feed documents and the items extracted from them.
//!
//! - [`parser`] - Tolerant, pattern-based RSS/Atom extraction (no schema validation)
//! - [`item`] - The normalized [`FeedItem`] plus identity and dedupe helpers
//!
//! Parsing is pure and synchronous; fetching lives in [`crate::source`].

mod item;
mod parser;

pub use item::{dedupe_items, FeedItem, UNTITLED};
pub use parser::{detect_format, parse_feed_document, FeedFormat, DEFAULT_ITEM_LIMIT};
