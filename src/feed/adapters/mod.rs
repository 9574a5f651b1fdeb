//! Format-specific decoders producing the unified [`Feed`]/[`Item`] model.
//!
//! Every adapter decodes feed metadata and the item list in two independent
//! passes over the same buffer, so a caller that only wants the feed never pays
//! for item decoding.

mod atom;
mod json;
mod rss;
mod xml;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::model::{Feed, Item};
use super::query::QueryError;
use crate::util::strip_control_chars;

pub use atom::AtomAdapter;
pub use json::JsonFeedAdapter;
pub use rss::RssAdapter;

pub(crate) static RSS_ADAPTER: RssAdapter = RssAdapter;
pub(crate) static ATOM_ADAPTER: AtomAdapter = AtomAdapter;
pub(crate) static JSON_FEED_ADAPTER: JsonFeedAdapter = JsonFeedAdapter;

/// A parser for one feed format.
///
/// Implementations must tolerate missing optional fields and only fail with
/// [`QueryError::Parse`] when the input is not a document of their format.
pub trait FormatAdapter: Sync {
    /// Decodes feed-level metadata. Caching tokens are left unset.
    fn parse_feed(&self, bytes: &[u8]) -> Result<Feed, QueryError>;

    /// Decodes all items, preserving document order.
    fn parse_items(&self, bytes: &[u8]) -> Result<Vec<Item>, QueryError>;
}

/// Trims feed-supplied text, strips terminal control characters, and maps
/// blank values to `None`.
fn clean_text(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    // SEC-016: feed text is attacker-controlled and ends up on terminals
    Some(strip_control_chars(trimmed).into_owned())
}

/// Returns the document's own identifier, or a SHA-256 over link, title and
/// date when the document has none.
fn generate_guid(
    existing: Option<&str>,
    link: Option<&str>,
    title: Option<&str>,
    published: Option<DateTime<Utc>>,
) -> String {
    if let Some(guid) = existing {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        link.unwrap_or(""),
        title.unwrap_or(""),
        published.map(|p| p.timestamp().to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
