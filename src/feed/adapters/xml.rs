//! Shared plumbing for the XML adapters, built on `feed-rs`.

use feed_rs::model::{Entry, FeedType, Link};

use super::{clean_text, generate_guid};
use crate::feed::model::Item;
use crate::feed::query::QueryError;
use crate::feed::RssType;

/// Parses an XML feed document and checks it belongs to the expected family.
///
/// `feed-rs` detects the format itself; an Atom document handed to the RSS
/// adapter (or JSON handed to either) is rejected rather than silently decoded.
pub(super) fn parse_document(
    bytes: &[u8],
    expected: RssType,
) -> Result<feed_rs::model::Feed, QueryError> {
    // feed-rs fills missing entry ids with its own hash; leave them empty so
    // generate_guid applies the same fallback for every format
    let document = feed_rs::parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)
        .map_err(|e| QueryError::Parse(format!("Invalid {expected} document: {e}")))?;

    let actual = match document.feed_type {
        FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2 => RssType::Rss,
        FeedType::Atom => RssType::Atom,
        FeedType::JSON => RssType::JsonFeed,
    };
    if actual != expected {
        return Err(QueryError::Parse(format!(
            "Expected {expected} document, found {actual}"
        )));
    }

    Ok(document)
}

fn is_rel(link: &Link, rel: &str) -> bool {
    link.rel.as_deref().is_some_and(|r| r.eq_ignore_ascii_case(rel))
}

/// The `rel="self"` link: the URL of the feed document itself.
pub(super) fn self_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| is_rel(l, "self"))
        .and_then(|l| clean_text(Some(&l.href)))
}

/// The human-facing link: `rel="alternate"` or no `rel`, else the first
/// non-self link.
pub(super) fn alternate_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.is_none() || is_rel(l, "alternate"))
        .or_else(|| links.iter().find(|l| !is_rel(l, "self")))
        .and_then(|l| clean_text(Some(&l.href)))
}

/// First image attached through media thumbnails or image enclosures.
fn entry_image(entry: &Entry) -> Option<String> {
    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .next();

    thumbnail.or_else(|| {
        entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .find(|c| {
                c.content_type
                    .as_ref()
                    .is_some_and(|mime| mime.ty().as_str() == "image")
            })
            .and_then(|c| c.url.as_ref().map(|u| u.to_string()))
    })
}

/// Maps one `feed-rs` entry to an [`Item`].
pub(super) fn item_from_entry(entry: Entry) -> Item {
    let title = clean_text(entry.title.as_ref().map(|t| t.content.as_str()));
    let link = alternate_link(&entry.links);
    let pub_date = entry.published.or(entry.updated);
    let description = entry
        .summary
        .as_ref()
        .map(|s| s.content.clone())
        .filter(|s| !s.trim().is_empty());
    let content = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .filter(|s| !s.trim().is_empty());
    let author = entry
        .authors
        .iter()
        .find_map(|p| clean_text(Some(&p.name)));
    let image_link = entry_image(&entry);

    let guid = generate_guid(
        Some(&entry.id),
        link.as_deref(),
        title.as_deref(),
        pub_date,
    );

    Item {
        guid,
        title,
        link,
        pub_date,
        description,
        content,
        author,
        image_link,
    }
}
