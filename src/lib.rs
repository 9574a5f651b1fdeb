//! Fetch a URL, work out whether it serves a syndication feed, and parse it.
//!
//! The pipeline is split into four pieces, leaf-first:
//!
//! - [`feed::sniffer`] - maps a `Content-Type` header, or failing that the first
//!   bytes of the body, to an [`RssType`]
//! - [`feed::adapters`] - one parser per format (RSS, Atom, JSON Feed), all
//!   producing the same [`Feed`]/[`Item`] model
//! - [`feed::fetcher`] - the HTTP collaborator, abstracted behind [`ResourceFetcher`]
//! - [`feed::query`] - [`FeedQuery`] composes the above and handles conditional
//!   requests (`ETag`/`Last-Modified`, HTTP 304)
//!
//! # Example
//!
//! ```ignore
//! use feedsniff::{FeedQuery, HttpFetcher, QueryOutcome};
//!
//! let query = FeedQuery::new(HttpFetcher::new(reqwest::Client::new()));
//! match query.query_feed("https://example.com/feed.xml", None, true).await? {
//!     QueryOutcome::Parsed(parsed) => println!("{} items", parsed.items.len()),
//!     QueryOutcome::NotModified => println!("unchanged"),
//! }
//! ```

pub mod config;
pub mod feed;
pub mod util;

pub use config::{Config, ConfigError};
pub use feed::{
    conditional_headers, FeedQuery, FetchError, FetchResponse, HttpFetcher, QueryError,
    QueryOutcome, ResourceFetcher, RssType,
};
pub use feed::{Feed, Item, ParsedFeed};
