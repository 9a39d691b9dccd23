//! Article text extraction.
//!
//! The UI only sees [`TextExtractor`]: give it an article URL, get back
//! display lines (possibly carrying SGR styling). [`ReaderExtractor`] is the
//! production implementation backed by a Markdown reader service.

mod markdown;
mod reader;

use async_trait::async_trait;
use thiserror::Error;

pub use markdown::markdown_to_lines;
pub use reader::{ReaderExtractor, DEFAULT_READER_BASE};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Request timed out after 20s")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("No readable text in article")]
    Empty,
}

impl ContentError {
    /// Returns true if this error is transient and the request should be retried.
    fn is_retryable(&self) -> bool {
        match self {
            ContentError::Timeout | ContentError::Network(_) => true,
            ContentError::HttpStatus(status) => *status >= 500,
            ContentError::ResponseTooLarge(_)
            | ContentError::InvalidUtf8
            | ContentError::InvalidUrl
            | ContentError::InsecureBaseUrl
            | ContentError::Empty => false,
        }
    }
}

/// Turns an article URL into readable lines.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, url: &str) -> Result<Vec<String>, ContentError>;
}
