//! Text helpers shared by the feed parser, the discovery ranker, and the CLI.
//!
//! - **Markup**: entity decoding and tag/CDATA stripping for tolerant XML text extraction
//! - **Sanitizing**: terminal control character removal for feed-controlled text
//! - **Display**: Unicode-aware width truncation for terminal listings
//! - **Script detection**: CJK detection used for locale-aware weighting

mod text;

pub use text::{
    contains_cjk, decode_entities, display_width, strip_control_chars, strip_markup,
    truncate_to_width,
};
