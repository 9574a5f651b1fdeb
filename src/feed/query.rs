use reqwest::header::{
    HeaderMap, HeaderValue, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use reqwest::StatusCode;
use thiserror::Error;

use super::fetcher::{FetchError, ResourceFetcher};
use super::model::{ParsedFeed, QueryOutcome};
use super::sniffer::{self, RssType, DEFAULT_SNIFF_LIMIT};

/// Why a feed query failed. A 304 is not a failure; see [`QueryOutcome::NotModified`].
#[derive(Debug, Error)]
pub enum QueryError {
    /// Content-Type missing or unparsable, or the body is malformed for its format
    #[error("Parse error: {0}")]
    Parse(String),
    /// Neither the Content-Type nor the body identify a known feed format
    #[error("Unable to guess {url} feed format")]
    UnknownFormat { url: String },
    /// The server answered with a status other than 2xx or 304
    #[error("{url} returned {status} code : {message}")]
    Network {
        url: String,
        status: u16,
        message: String,
    },
    /// Transport failure from the fetcher, passed through unchanged
    #[error(transparent)]
    Io(#[from] FetchError),
}

/// Builds conditional-request headers from cached tokens.
///
/// Tokens that are not valid header values are skipped rather than failing the
/// whole query; the server then simply answers with a full response.
pub fn conditional_headers(etag: Option<&str>, last_modified: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, token) in [(IF_NONE_MATCH, etag), (IF_MODIFIED_SINCE, last_modified)] {
        let Some(token) = token else { continue };
        match HeaderValue::from_str(token) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => {
                tracing::warn!(header = %name, token = token, "Skipping invalid cached token");
            }
        }
    }

    headers
}

/// Fetches a URL and decodes it as a feed, given any [`ResourceFetcher`].
///
/// Holds no per-query state, so a single instance can serve concurrent queries.
#[derive(Debug, Clone)]
pub struct FeedQuery<F> {
    fetcher: F,
    sniff_limit: usize,
}

impl<F: ResourceFetcher> FeedQuery<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            sniff_limit: DEFAULT_SNIFF_LIMIT,
        }
    }

    /// Sets how many body bytes content sniffing may inspect.
    pub fn with_sniff_limit(mut self, sniff_limit: usize) -> Self {
        self.sniff_limit = sniff_limit;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Queries `url` and decodes the feed, plus its items when `with_items` is set.
    ///
    /// `headers` are sent as-is; pass [`conditional_headers`] built from a previous
    /// result to get [`QueryOutcome::NotModified`] when nothing changed.
    ///
    /// # Errors
    ///
    /// - [`QueryError::Network`] - status other than 2xx or 304
    /// - [`QueryError::Parse`] - missing/unparsable `Content-Type`, or a malformed body
    /// - [`QueryError::UnknownFormat`] - neither sniffing pass recognized the resource
    /// - [`QueryError::Io`] - transport failure
    pub async fn query_feed(
        &self,
        url: &str,
        headers: Option<&HeaderMap>,
        with_items: bool,
    ) -> Result<QueryOutcome, QueryError> {
        tracing::trace!(url = %url, conditional = headers.is_some(), "Fetching feed");
        let response = self.fetcher.fetch(url, headers).await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!(url = %url, "Feed not modified");
            return Ok(QueryOutcome::NotModified);
        }

        if !status.is_success() {
            return Err(QueryError::Network {
                url: url.to_owned(),
                status: status.as_u16(),
                message: response.status_message().to_owned(),
            });
        }

        let header = response
            .header(CONTENT_TYPE.as_str())
            .ok_or_else(|| QueryError::Parse(format!("Unable to get {url} content-type")))?;
        let declared = sniffer::rss_type_from_content_type(header)
            .ok_or_else(|| QueryError::Parse(format!("Unable to parse {url} content-type")))?;

        let etag = response.header(ETAG.as_str()).map(str::to_owned);
        let last_modified = response.header(LAST_MODIFIED.as_str()).map(str::to_owned);

        // Buffered once: sniffing and both parsing passes read from the start
        let body = response.bytes().await?;

        let rss_type = if declared.is_known() {
            declared
        } else {
            let prefix = &body[..body.len().min(self.sniff_limit)];
            sniffer::rss_type_from_content(prefix)
        };
        tracing::debug!(url = %url, declared = %declared, detected = %rss_type, "Classified resource");

        let adapter = rss_type.adapter().ok_or_else(|| QueryError::UnknownFormat {
            url: url.to_owned(),
        })?;

        let mut feed = adapter.parse_feed(&body)?;
        feed.etag = etag;
        feed.last_modified = last_modified;
        if feed.url.is_none() {
            feed.url = Some(url.to_owned());
        }

        let items = if with_items {
            adapter.parse_items(&body)?
        } else {
            Vec::new()
        };

        tracing::debug!(
            url = %url,
            format = %rss_type,
            items = items.len(),
            "Parsed feed"
        );

        Ok(QueryOutcome::Parsed(ParsedFeed { feed, items }))
    }

    /// Returns whether `url` serves a feed in a known format.
    ///
    /// Any non-2xx status or a missing `Content-Type` answers `false`. Only as much
    /// of the body as sniffing needs is read. Transport failures still propagate.
    pub async fn is_feed_url(&self, url: &str) -> Result<bool, QueryError> {
        let mut response = self.fetcher.fetch(url, None).await?;

        if !response.status().is_success() {
            tracing::debug!(url = %url, status = %response.status(), "Not a feed: unsuccessful status");
            return Ok(false);
        }

        let Some(header) = response.header(CONTENT_TYPE.as_str()) else {
            tracing::debug!(url = %url, "Not a feed: no content-type");
            return Ok(false);
        };
        let declared = sniffer::rss_type_from_content_type(header).unwrap_or(RssType::Unknown);

        if declared.is_known() {
            return Ok(true);
        }

        let prefix = response.peek(self.sniff_limit).await?;
        let detected = sniffer::rss_type_from_content(prefix);
        tracing::debug!(url = %url, detected = %detected, "Sniffed resource content");

        Ok(detected.is_known())
    }
}
