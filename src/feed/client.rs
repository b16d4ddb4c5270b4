use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Default per-fetch network timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Default cap on a feed body.
pub const DEFAULT_MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Transport-level failure fetching one feed. Scoped to that feed; the feed
/// is retried naturally on a later cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Response larger than {0} bytes")]
    ResponseTooLarge(usize),
}

/// Something that can fetch the raw bytes of a feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`FeedSource`] over HTTP(S) using a shared `reqwest::Client`.
///
/// The timeout covers the whole exchange: connect, headers and body.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: reqwest::Client,
    timeout: Duration,
    max_size: usize,
}

impl HttpFeedClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_size: DEFAULT_MAX_FEED_SIZE,
        }
    }

    /// Build a client with a custom `User-Agent`.
    pub fn with_user_agent(user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self::new(client))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_size).await
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tokio::time::timeout(self.timeout, self.get(url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
