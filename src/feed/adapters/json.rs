use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::{clean_text, generate_guid, FormatAdapter};
use crate::feed::model::{Feed, Item};
use crate::feed::query::QueryError;

/// Decodes JSON Feed 1.0 and 1.1 documents.
///
/// Every member is optional on the way in; only a non-object root or invalid
/// JSON is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFeedAdapter;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonAuthor {
    name: Option<String>,
}

/// Top-level members. `items` is left out so feed-only parsing never
/// materializes them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonFeedHeader {
    title: Option<String>,
    home_page_url: Option<String>,
    feed_url: Option<String>,
    description: Option<String>,
    icon: Option<String>,
    favicon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonFeedItems {
    // explicit null reads as no items
    items: Option<Vec<JsonItem>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonItem {
    // 1.0 feeds in the wild use numbers here
    #[serde(deserialize_with = "string_or_number")]
    id: Option<String>,
    url: Option<String>,
    external_url: Option<String>,
    title: Option<String>,
    content_html: Option<String>,
    content_text: Option<String>,
    summary: Option<String>,
    image: Option<String>,
    banner_image: Option<String>,
    date_published: Option<String>,
    date_modified: Option<String>,
    // 1.0
    author: Option<JsonAuthor>,
    // 1.1
    authors: Option<Vec<JsonAuthor>>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, QueryError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    // serde would happily map a JSON array onto the struct fields positionally
    let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
    if first != Some(&b'{') {
        return Err(QueryError::Parse(
            "JSON Feed document root must be an object".to_string(),
        ));
    }

    serde_json::from_slice(bytes)
        .map_err(|e| QueryError::Parse(format!("Invalid JSON Feed document: {e}")))
}

fn parse_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    match DateTime::parse_from_rfc3339(raw) {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(date = raw, error = %e, "Ignoring unparsable JSON Feed date");
            None
        }
    }
}

impl JsonItem {
    fn into_item(self) -> Item {
        let title = clean_text(self.title.as_deref());
        let link = clean_text(self.url.as_deref().or(self.external_url.as_deref()));
        let pub_date = parse_date(
            self.date_published
                .as_deref()
                .or(self.date_modified.as_deref()),
        );
        let author = self
            .authors
            .iter()
            .flatten()
            .chain(self.author.as_ref())
            .find_map(|a| clean_text(a.name.as_deref()));
        let guid = generate_guid(self.id.as_deref(), link.as_deref(), title.as_deref(), pub_date);

        Item {
            guid,
            title,
            link,
            pub_date,
            description: self.summary.filter(|s| !s.trim().is_empty()),
            content: self
                .content_html
                .or(self.content_text)
                .filter(|s| !s.trim().is_empty()),
            author,
            image_link: clean_text(self.image.as_deref().or(self.banner_image.as_deref())),
        }
    }
}

impl FormatAdapter for JsonFeedAdapter {
    fn parse_feed(&self, bytes: &[u8]) -> Result<Feed, QueryError> {
        let header: JsonFeedHeader = decode(bytes)?;

        Ok(Feed {
            title: clean_text(header.title.as_deref()),
            url: clean_text(header.feed_url.as_deref()),
            site_url: clean_text(header.home_page_url.as_deref()),
            description: clean_text(header.description.as_deref()),
            icon_url: clean_text(header.icon.as_deref().or(header.favicon.as_deref())),
            etag: None,
            last_modified: None,
        })
    }

    fn parse_items(&self, bytes: &[u8]) -> Result<Vec<Item>, QueryError> {
        let document: JsonFeedItems = decode(bytes)?;
        Ok(document
            .items
            .unwrap_or_default()
            .into_iter()
            .map(JsonItem::into_item)
            .collect())
    }
}
