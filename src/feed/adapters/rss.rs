use super::xml::{alternate_link, item_from_entry, parse_document, self_link};
use super::{clean_text, FormatAdapter};
use crate::feed::model::{Feed, Item};
use crate::feed::query::QueryError;
use crate::feed::RssType;

/// Decodes RSS documents (2.0, plus 0.9x and 1.0/RDF).
///
/// The channel becomes the [`Feed`]; each `<item>` becomes an [`Item`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RssAdapter;

impl FormatAdapter for RssAdapter {
    fn parse_feed(&self, bytes: &[u8]) -> Result<Feed, QueryError> {
        let channel = parse_document(bytes, RssType::Rss)?;

        Ok(Feed {
            title: clean_text(channel.title.as_ref().map(|t| t.content.as_str())),
            // <atom:link rel="self"> when the channel declares one
            url: self_link(&channel.links),
            site_url: alternate_link(&channel.links),
            description: clean_text(channel.description.as_ref().map(|d| d.content.as_str())),
            // RSS carries its icon in <image><url>
            icon_url: channel
                .logo
                .as_ref()
                .or(channel.icon.as_ref())
                .and_then(|i| clean_text(Some(&i.uri))),
            etag: None,
            last_modified: None,
        })
    }

    fn parse_items(&self, bytes: &[u8]) -> Result<Vec<Item>, QueryError> {
        let channel = parse_document(bytes, RssType::Rss)?;
        Ok(channel.entries.into_iter().map(item_from_entry).collect())
    }
}
