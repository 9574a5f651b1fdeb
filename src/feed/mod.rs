//! Feed querying: fetch a URL, work out which feed format it serves, decode it.
//!
//! - **Fetching**: [`ResourceFetcher`] abstracts the transport; [`HttpFetcher`] is the reqwest one
//! - **Sniffing**: classify by `Content-Type`, then by body content when the header is generic
//! - **Decoding**: one [`adapters::FormatAdapter`] per format (RSS, Atom, JSON Feed)
//!
//! [`FeedQuery`] ties the three together and is the usual entry point.
//!
//! # Example
//!
//! ```ignore
//! use feedsniff::feed::{FeedQuery, HttpFetcher, QueryOutcome};
//!
//! let query = FeedQuery::new(HttpFetcher::new(reqwest::Client::new()));
//! if let QueryOutcome::Parsed(parsed) = query.query_feed(url, None, true).await? {
//!     // cache parsed.feed.etag / last_modified for the next poll
//!     let next = parsed.feed.conditional_headers();
//! }
//! ```

pub mod adapters;
pub mod fetcher;
mod model;
pub mod query;
pub mod sniffer;

pub use fetcher::{
    BodyStream, FetchError, FetchResponse, HttpFetcher, ResourceFetcher, DEFAULT_TIMEOUT,
    MAX_FEED_SIZE,
};
pub use model::{Feed, Item, ParsedFeed, QueryOutcome};
pub use query::{conditional_headers, FeedQuery, QueryError};
pub use sniffer::RssType;
