//! Feed fetching and parsing.
//!
//! The UI depends on [`FeedSource`] only: give it a URL, get back a parsed
//! [`Feed`] with its items. [`HttpFeedSource`] is the production
//! implementation.
//!
//! - [`parser`] - RSS/Atom/JSON Feed parsing with `feed-rs`
//! - [`fetcher`] - HTTP retrieval with retry, timeout and size limits

mod fetcher;
mod parser;

use crate::storage::Feed;
use async_trait::async_trait;
use thiserror::Error;

pub use fetcher::HttpFeedSource;
pub use parser::{parse_bytes, FeedFormat, ParsedFeed};

/// Errors that can occur while fetching and parsing a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Body could not be parsed as RSS, Atom or JSON Feed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Resolves a feed URL into its current content.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn parse_feed(&self, url: &str) -> Result<Feed, FeedError>;
}
