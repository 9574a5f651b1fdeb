use super::xml::{alternate_link, item_from_entry, parse_document, self_link};
use super::{clean_text, FormatAdapter};
use crate::feed::model::{Feed, Item};
use crate::feed::query::QueryError;
use crate::feed::RssType;

/// Decodes Atom 1.0 documents: `<feed>` becomes the [`Feed`], each `<entry>`
/// an [`Item`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomAdapter;

impl FormatAdapter for AtomAdapter {
    fn parse_feed(&self, bytes: &[u8]) -> Result<Feed, QueryError> {
        let document = parse_document(bytes, RssType::Atom)?;

        Ok(Feed {
            title: clean_text(document.title.as_ref().map(|t| t.content.as_str())),
            url: self_link(&document.links),
            site_url: alternate_link(&document.links),
            // <subtitle>
            description: clean_text(document.description.as_ref().map(|d| d.content.as_str())),
            // <icon> is the square favicon-like image; <logo> the wide banner
            icon_url: document
                .icon
                .as_ref()
                .or(document.logo.as_ref())
                .and_then(|i| clean_text(Some(&i.uri))),
            etag: None,
            last_modified: None,
        })
    }

    fn parse_items(&self, bytes: &[u8]) -> Result<Vec<Item>, QueryError> {
        let document = parse_document(bytes, RssType::Atom)?;
        Ok(document.entries.into_iter().map(item_from_entry).collect())
    }
}
