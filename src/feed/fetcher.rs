use super::parser::{parse_bytes, ParsedFeed};
use super::{FeedError, FeedSource};
use crate::storage::Feed;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;

const MAX_RETRIES: u32 = 3;
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches feeds over HTTP and parses them with `feed-rs`.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Download a feed body with retry on rate limiting, server errors and
    /// truncated transfers.
    ///
    /// Backoff is exponential: 1s, 2s, 4s. 4xx responses other than 429
    /// fail immediately.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let mut retry_count = 0;

        loop {
            let response = tokio::time::timeout(REQUEST_TIMEOUT, self.client.get(url).send())
                .await
                .map_err(|_| FeedError::Timeout)?
                .map_err(FeedError::Network)?;

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if retry_count >= MAX_RETRIES {
                    return Err(if status.is_server_error() {
                        FeedError::HttpStatus(status.as_u16())
                    } else {
                        FeedError::RateLimited(MAX_RETRIES)
                    });
                }

                let delay_secs = 1u64 << retry_count;
                tracing::warn!(
                    feed = %url,
                    status = %status,
                    retry = retry_count,
                    delay_secs = delay_secs,
                    "Feed server refused request, backing off"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                return Err(FeedError::HttpStatus(status.as_u16()));
            }

            match read_limited_bytes(response, MAX_FEED_SIZE).await {
                Ok(bytes) => return Ok(bytes),
                Err(FeedError::IncompleteResponse { expected, received }) => {
                    if retry_count >= MAX_RETRIES {
                        return Err(FeedError::IncompleteResponse { expected, received });
                    }

                    let delay_secs = 1u64 << retry_count;
                    tracing::debug!(
                        feed = %url,
                        expected = expected,
                        received = received,
                        attempt = retry_count + 1,
                        delay_secs = delay_secs,
                        "Retrying incomplete download"
                    );
                    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn parse_feed(&self, url: &str) -> Result<Feed, FeedError> {
        let bytes = self.fetch_bytes(url).await?;
        let ParsedFeed {
            format,
            feed,
            skipped_links,
        } = parse_bytes(url, &bytes)?;

        if skipped_links > 0 {
            tracing::warn!(feed = %url, filtered = skipped_links, "Item links with unsupported schemes dropped");
        }
        tracing::debug!(feed = %url, format = ?format, items = feed.items.len(), "Parsed feed");
        Ok(feed)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FeedError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FeedError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FeedError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FeedError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    // A dropped connection can end the stream early without an error.
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FeedError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{any, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Test</title>
    <item><guid>1</guid><title>Test</title><link>https://example.com/1</link></item>
</channel></rss>"#;

    fn source() -> HttpFeedSource {
        HttpFeedSource::new(reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_parse_feed_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let url = format!("{}/feed", mock_server.uri());
        let feed = source().parse_feed(&url).await.unwrap();
        assert_eq!(feed.url, url);
        assert_eq!(feed.title, "Test");
        assert_eq!(feed.items.len(), 1);
    }

    #[tokio::test]
    async fn test_404_fails_without_retry() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = source()
            .parse_feed(&format!("{}/feed", mock_server.uri()))
            .await;
        match result {
            Err(FeedError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_503_retry_then_success() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let feed = source()
            .parse_feed(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(feed.items.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let result = source()
            .parse_feed(&format!("{}/feed", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(FeedError::Parse(_))));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b' '; MAX_FEED_SIZE + 1]))
            .mount(&mock_server)
            .await;

        let result = source()
            .parse_feed(&format!("{}/feed", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(FeedError::ResponseTooLarge)));
    }

    #[tokio::test]
    async fn test_empty_feed_success() {
        let empty_rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel></channel></rss>"#;

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(empty_rss))
            .mount(&mock_server)
            .await;

        let feed = source()
            .parse_feed(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert!(feed.items.is_empty());
    }
}
