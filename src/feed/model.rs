use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Serialize;

use super::query::conditional_headers;

/// Feed metadata decoded from a document, plus the caching tokens of the
/// response that carried it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Feed {
    /// Feed title (e.g., "Hacker News")
    pub title: Option<String>,
    /// URL of the feed document itself
    pub url: Option<String>,
    /// URL of the associated website
    pub site_url: Option<String>,
    pub description: Option<String>,
    /// Icon or logo advertised by the feed
    pub icon_url: Option<String>,
    /// `ETag` of the response this feed was parsed from. Never read from the body.
    pub etag: Option<String>,
    /// `Last-Modified` of the response this feed was parsed from. Never read from the body.
    pub last_modified: Option<String>,
}

impl Feed {
    /// Builds `If-None-Match`/`If-Modified-Since` headers from this feed's
    /// caching tokens, for the next conditional query of the same URL.
    pub fn conditional_headers(&self) -> HeaderMap {
        conditional_headers(self.etag.as_deref(), self.last_modified.as_deref())
    }
}

/// A single entry of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Identifier used by downstream consumers for de-duplication
    pub guid: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
    /// Short summary (RSS `<description>`, Atom `<summary>`, JSON Feed `summary`)
    pub description: Option<String>,
    /// Full content, when the feed carries it
    pub content: Option<String>,
    pub author: Option<String>,
    pub image_link: Option<String>,
}

/// A successfully decoded feed and, if requested, its items in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedFeed {
    pub feed: Feed,
    pub items: Vec<Item>,
}

/// Outcome of [`FeedQuery::query_feed`](super::FeedQuery::query_feed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The resource was fetched and decoded.
    Parsed(ParsedFeed),
    /// The server answered 304: nothing changed since the cached tokens.
    NotModified,
}

impl QueryOutcome {
    /// Returns the parsed feed, or `None` for [`QueryOutcome::NotModified`].
    pub fn parsed(self) -> Option<ParsedFeed> {
        match self {
            QueryOutcome::Parsed(parsed) => Some(parsed),
            QueryOutcome::NotModified => None,
        }
    }

    pub fn is_not_modified(&self) -> bool {
        matches!(self, QueryOutcome::NotModified)
    }
}
