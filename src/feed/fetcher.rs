use futures::stream::StreamExt;
use std::time::Duration;
use thiserror::Error;

use super::parser::{parse_rss, ParseError, RssChannel};

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Identifying client token sent with every feed request
pub const USER_AGENT: &str = concat!("gator/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while fetching a single feed.
///
/// All of these are scoped to one scheduler tick; none of them stop the loop.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request plus body read exceeded the fetch deadline
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not a usable RSS document
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Build the HTTP client shared by every fetch.
///
/// No overall request timeout is set on the client itself; each fetch gets
/// its own deadline from [`fetch_feed`].
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}

/// Fetch and parse one RSS feed.
///
/// Issues a GET with the gator user agent, reads the whole body (capped at
/// 10MB) and parses it. When `timeout` is set it bounds the request and the
/// body read together.
///
/// # Errors
///
/// - [`FetchError::Timeout`] - deadline elapsed
/// - [`FetchError::Network`] - connection, TLS or body stream errors
/// - [`FetchError::HttpStatus`] - non-2xx response
/// - [`FetchError::ResponseTooLarge`] - body over 10MB
/// - [`FetchError::Parse`] - malformed XML or not an RSS document
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    timeout: Option<Duration>,
) -> Result<RssChannel, FetchError> {
    let bytes = match timeout {
        Some(limit) => tokio::time::timeout(limit, fetch_body(client, url))
            .await
            .map_err(|_| FetchError::Timeout)??,
        None => fetch_body(client, url).await?,
    };

    tracing::debug!(feed = %url, bytes = bytes.len(), "Fetched feed body");
    Ok(parse_rss(&bytes)?)
}

async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    read_limited_bytes(response, MAX_FEED_SIZE).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
