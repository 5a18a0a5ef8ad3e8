//! HTTP client wrapper used for listing pages, detail pages and downloads.
//!
//! The fetcher is constructed once per run and passed to every component that
//! issues requests; there is no process-global client.

use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::FetchError;
use crate::user_agent;

/// A readable stream of response body chunks.
///
/// Read failures surface as [`std::io::Error`] so the storage layer can treat
/// the stream like any other byte source.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// HTTP fetcher that validates a `200 OK` status on every request.
///
/// Cloning is cheap; clones share the underlying connection pool.
///
/// # Example
///
/// ```no_run
/// use photoscrape_core::fetch::Fetcher;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = Fetcher::new()?;
/// let body = fetcher.fetch("https://example.com/search?query=dog").await?;
/// let html = body.bytes().await?;
/// println!("fetched {} bytes", html.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher with no whole-request deadline.
    ///
    /// Only the connect phase is bounded (30 seconds); a slow transfer is
    /// allowed to run to completion.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_request_timeout(None)
    }

    /// Creates a fetcher, optionally attaching a deadline to every request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    #[instrument(level = "debug")]
    pub fn with_request_timeout(request_timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .user_agent(user_agent::default_user_agent())
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .gzip(true);
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|source| FetchError::Client { source })?;
        Ok(Self { client })
    }

    /// Issues a GET request and returns the body if the server answered `200 OK`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if `url` does not parse
    /// - [`FetchError::Transport`] / [`FetchError::Timeout`] on network failure
    /// - [`FetchError::Status`] for any status other than 200
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(status = status.as_u16(), "rejecting non-200 response");
            return Err(FetchError::status(
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
            ));
        }

        debug!(
            content_length = response.content_length(),
            "response accepted"
        );
        Ok(FetchedBody {
            url: url.to_string(),
            response,
        })
    }
}

/// A successful response whose body has not been read yet.
///
/// Dropping the value releases the connection.
#[derive(Debug)]
pub struct FetchedBody {
    url: String,
    response: reqwest::Response,
}

impl FetchedBody {
    /// Content length advertised by the server, if any.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Reads the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] or [`FetchError::Timeout`] if the
    /// connection fails while the body is being read.
    pub async fn bytes(self) -> Result<Bytes, FetchError> {
        let url = self.url;
        self.response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(url, e))
    }

    /// Converts the body into a chunk stream for incremental copying.
    #[must_use]
    pub fn into_stream(self) -> ByteStream {
        self.response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed()
    }
}
