use std::future::Future;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::time::Instant;

use crate::config::Config;
use crate::util::validate_url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Transport-level failures. These are surfaced to callers unchanged.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The request, body included, did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// The URL was refused before any request was made
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// A configured header name or value is not valid HTTP
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// The HTTP collaborator of the pipeline.
///
/// Implementations issue a single GET for `url`, applying `headers` on top of
/// whatever defaults they carry. Non-2xx statuses are NOT errors at this level:
/// they come back as a [`FetchResponse`] for the caller to interpret.
pub trait ResourceFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        headers: Option<&HeaderMap>,
    ) -> impl Future<Output = Result<FetchResponse, FetchError>> + Send;
}

/// Body chunks as produced by a [`ResourceFetcher`].
pub type BodyStream = BoxStream<'static, Result<Vec<u8>, FetchError>>;

/// Status, headers and a lazily-read body of one HTTP response.
///
/// The body can be peeked at (for sniffing) and then read in full; peeked bytes
/// are kept and returned again by [`FetchResponse::bytes`]. Dropping the value
/// releases the underlying connection.
pub struct FetchResponse {
    status: StatusCode,
    status_message: Option<String>,
    headers: HeaderMap,
    buffered: Vec<u8>,
    stream: Option<BodyStream>,
    expected_length: Option<u64>,
    limit: usize,
    deadline: Option<Instant>,
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("status_message", &self.status_message)
            .field("headers", &self.headers)
            .field("buffered", &self.buffered.len())
            .field("exhausted", &self.stream.is_none())
            .finish()
    }
}

impl FetchResponse {
    /// Wraps a streaming body. `expected_length` is the declared
    /// `Content-Length`, used to detect truncated transfers.
    pub fn from_stream(
        status: StatusCode,
        headers: HeaderMap,
        body: BodyStream,
        expected_length: Option<u64>,
    ) -> Self {
        Self {
            status,
            status_message: None,
            headers,
            buffered: Vec::new(),
            stream: Some(body),
            expected_length,
            limit: MAX_FEED_SIZE,
            deadline: None,
        }
    }

    /// Builds a response around an in-memory body, for custom fetchers and tests.
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        let expected = body.len() as u64;
        Self::from_stream(
            status,
            headers,
            stream::iter(vec![Ok::<_, FetchError>(body)]).boxed(),
            Some(expected),
        )
    }

    /// Caps how many body bytes [`FetchResponse::bytes`] accepts.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Records the reason phrase the server sent with the status line.
    pub fn with_status_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }

    /// Body reads still pending at `deadline` fail with [`FetchError::Timeout`].
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase of the response: the one supplied by the fetcher, else the
    /// canonical phrase for the code (e.g. "Not Found").
    pub fn status_message(&self) -> &str {
        self.status_message
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("Unknown Status")
    }

    /// Case-insensitive header lookup. Values that are not visible ASCII read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns up to `len` bytes from the start of the body without consuming it.
    ///
    /// Reads from the network only as far as needed. The size cap only bounds
    /// `len` here: a chunk straddling it is kept whole and the prefix is returned.
    pub async fn peek(&mut self, len: usize) -> Result<&[u8], FetchError> {
        let len = len.min(self.limit);
        while self.buffered.len() < len {
            if !self.read_chunk(false).await? {
                break;
            }
        }
        let end = len.min(self.buffered.len());
        Ok(&self.buffered[..end])
    }

    /// Reads the whole body (including anything already peeked) and releases the
    /// connection.
    pub async fn bytes(mut self) -> Result<Vec<u8>, FetchError> {
        // Fast path: reject on declared size before reading anything
        if let Some(len) = self.expected_length {
            if len > self.limit as u64 {
                return Err(FetchError::ResponseTooLarge);
            }
        }

        // a peek may already have buffered past the cap
        if self.buffered.len() > self.limit {
            return Err(FetchError::ResponseTooLarge);
        }

        while self.read_chunk(true).await? {}

        // EDGE-005: Check for incomplete response (received fewer bytes than Content-Length)
        if let Some(expected) = self.expected_length {
            if (self.buffered.len() as u64) < expected {
                return Err(FetchError::IncompleteResponse {
                    expected,
                    received: self.buffered.len(),
                });
            }
        }

        Ok(self.buffered)
    }

    /// Pulls one chunk into the buffer. Returns `false` once the body is exhausted.
    async fn read_chunk(&mut self, enforce_limit: bool) -> Result<bool, FetchError> {
        let deadline = self.deadline;
        let Some(stream) = self.stream.as_mut() else {
            return Ok(false);
        };

        let next = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, stream.next())
                .await
                .map_err(|_| FetchError::Timeout)?,
            None => stream.next().await,
        };

        match next {
            Some(chunk) => {
                let chunk = chunk?;
                if enforce_limit && self.buffered.len().saturating_add(chunk.len()) > self.limit {
                    return Err(FetchError::ResponseTooLarge);
                }
                self.buffered.extend_from_slice(&chunk);
                Ok(true)
            }
            None => {
                self.stream = None;
                Ok(false)
            }
        }
    }
}

/// [`ResourceFetcher`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_body_size: usize,
    default_headers: HeaderMap,
    auth_token: Option<SecretString>,
    allow_private_hosts: bool,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("timeout", &self.timeout)
            .field("max_body_size", &self.max_body_size)
            .field("default_headers", &self.default_headers)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("allow_private_hosts", &self.allow_private_hosts)
            .finish()
    }
}

impl HttpFetcher {
    /// Wraps an existing client with default limits (30s timeout, 10MB body).
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            max_body_size: MAX_FEED_SIZE,
            default_headers: HeaderMap::new(),
            auth_token: None,
            allow_private_hosts: false,
        }
    }

    /// Builds a client and fetcher from the user's configuration.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;

        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| FetchError::InvalidHeader(name.to_string()))?;
            default_headers.insert(name, value);
        }

        Ok(Self {
            client,
            timeout: Duration::from_secs(config.timeout_secs),
            max_body_size: config.max_feed_size,
            default_headers,
            auth_token: config.auth_token.clone().map(SecretString::from),
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Skips the localhost/private-network check. Needed for intranet feeds and
    /// local test servers.
    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }
}

impl ResourceFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: Option<&HeaderMap>,
    ) -> Result<FetchResponse, FetchError> {
        if !self.allow_private_hosts {
            validate_url(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        }

        // Caller headers go last so conditional headers override configured ones
        let mut request = self.client.get(url).headers(self.default_headers.clone());
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(headers) = headers {
            request = request.headers(headers.clone());
        }

        // One deadline covers the headers and every later body read
        let deadline = Instant::now() + self.timeout;
        let response = tokio::time::timeout_at(deadline, request.send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        tracing::debug!(
            url = %url,
            status = %response.status(),
            content_length = ?response.content_length(),
            "Fetched resource"
        );

        let status = response.status();
        let reason = response
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .and_then(|r| std::str::from_utf8(r.as_bytes()).ok())
            .map(str::to_owned);
        let response_headers = response.headers().clone();
        let expected_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(FetchError::Network))
            .boxed();

        let fetched = FetchResponse::from_stream(status, response_headers, body, expected_length)
            .with_limit(self.max_body_size)
            .with_deadline(deadline);
        Ok(match reason {
            Some(reason) => fetched.with_status_message(reason),
            None => fetched,
        })
    }
}
