use super::markdown::markdown_to_lines;
use super::{ContentError, TextExtractor};
use crate::util::validate_url_for_open;
use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

pub const DEFAULT_READER_BASE: &str = "https://r.jina.ai";

const MAX_CONTENT_SIZE: usize = 5 * 1024 * 1024; // 5MB
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_RETRIES: u32 = 3;

/// CSS selectors targeting main article content across common blog platforms.
/// Order matters: more specific selectors first, generic fallbacks last.
const TARGET_SELECTORS: &str =
    "article, .entry-content, .post-content, .article-content, .post-body, main .content, main";

/// If the selector-scoped extraction returns less than this many bytes, the
/// page is fetched again without a selector.
const MIN_CONTENT_LEN: usize = 200;

/// Extracts readable article text through a reader service that turns any
/// page into Markdown (`GET {base}/{article_url}`).
pub struct ReaderExtractor {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl ReaderExtractor {
    /// Build an extractor.
    ///
    /// HTTPS is required for the base URL; plain HTTP is accepted only for
    /// loopback hosts so the API key never travels in clear text.
    pub fn new(
        client: reqwest::Client,
        base_url: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, ContentError> {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_READER_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        if !base_url.starts_with("https://") {
            let is_localhost = base_url.starts_with("http://127.0.0.1")
                || base_url.starts_with("http://localhost");
            if !is_localhost {
                tracing::error!(base_url = %base_url, "Rejecting non-HTTPS reader base URL");
                return Err(ContentError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %base_url, "Using non-HTTPS reader base URL (localhost only)");
        }

        Ok(Self {
            client,
            base_url,
            api_key: api_key.map(SecretString::from),
        })
    }

    /// First try with the target selector for cleaner output, then fall back
    /// to the whole page when the selector matched too little.
    async fn fetch_markdown(&self, article_url: &str) -> Result<String, ContentError> {
        let parsed = validate_url_for_open(article_url).map_err(|_| ContentError::InvalidUrl)?;
        let reader_url = format!("{}/{}", self.base_url, parsed.as_str());

        let content = self.fetch_with_retry(&reader_url, true).await?;
        if content.len() >= MIN_CONTENT_LEN {
            return Ok(content);
        }

        tracing::debug!(
            content_len = content.len(),
            "Target selector returned minimal content, retrying without selector"
        );
        self.fetch_with_retry(&reader_url, false).await
    }

    /// Exponential backoff: 1s, 2s, 4s on retryable errors.
    async fn fetch_with_retry(
        &self,
        reader_url: &str,
        use_selector: bool,
    ) -> Result<String, ContentError> {
        let mut retry_count = 0;

        loop {
            match self.fetch_once(reader_url, use_selector).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() && retry_count < MAX_RETRIES => {
                    let delay = 1u64 << retry_count;
                    tracing::debug!(
                        error = %e,
                        retry = retry_count + 1,
                        delay_secs = delay,
                        "Retrying reader fetch after transient error"
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, reader_url: &str, use_selector: bool) -> Result<String, ContentError> {
        let mut request = self.client.get(reader_url);

        if use_selector {
            request = request.header("X-Target-Selector", TARGET_SELECTORS);
        }
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = tokio::time::timeout(REQUEST_TIMEOUT, request.send())
            .await
            .map_err(|_| ContentError::Timeout)?
            .map_err(ContentError::Network)?;

        if !response.status().is_success() {
            return Err(ContentError::HttpStatus(response.status().as_u16()));
        }

        read_limited_text(response, MAX_CONTENT_SIZE).await
    }
}

#[async_trait]
impl TextExtractor for ReaderExtractor {
    async fn extract_text(&self, url: &str) -> Result<Vec<String>, ContentError> {
        let markdown = self.fetch_markdown(url).await?;
        let lines = markdown_to_lines(&strip_boilerplate(&markdown));
        if lines.is_empty() {
            return Err(ContentError::Empty);
        }
        tracing::debug!(url = %url, lines = lines.len(), "Extracted article text");
        Ok(lines)
    }
}

/// Strip common boilerplate patterns the reader service leaves in.
///
/// Patterns targeted:
/// - "Skip to content" navigation links
/// - Comment section scaffolding (Loading Comments, form fields)
/// - WordPress "Powered by" footers
/// - Runs of 3+ consecutive archive links (`*   [Month Year](url)`)
fn strip_boilerplate(content: &str) -> String {
    let lines: Vec<&str> = content
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !(trimmed.starts_with("[Skip to content]")
                || trimmed == "Loading Comments..."
                || trimmed == "Write a Comment..."
                || trimmed.starts_with("Email (Required)")
                || trimmed == "%d"
                || trimmed.contains("Proudly powered by WordPress")
                || trimmed == "Menu")
        })
        .collect();

    let mut result: Vec<&str> = Vec::with_capacity(lines.len());
    let mut run_start: Option<usize> = None;

    for line in lines {
        if is_archive_link(line) {
            run_start.get_or_insert(result.len());
        } else {
            drop_archive_run(&mut result, run_start.take());
        }
        result.push(line);
    }
    drop_archive_run(&mut result, run_start);

    result.join("\n")
}

fn drop_archive_run(result: &mut Vec<&str>, run_start: Option<usize>) {
    if let Some(start) = run_start {
        if result.len() - start >= 3 {
            result.truncate(start);
        }
    }
}

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Matches `*   [Month Year](url)`.
fn is_archive_link(line: &str) -> bool {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('*') else {
        return false;
    };
    let Some(label) = rest.trim_start().strip_prefix('[') else {
        return false;
    };
    MONTHS.iter().any(|month| {
        label
            .strip_prefix(month)
            .and_then(|after| after.get(1..5))
            .is_some_and(|year| year.chars().all(|c| c.is_ascii_digit()))
    })
}

async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, ContentError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ContentError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ContentError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ContentError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| ContentError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor(base: &str) -> ReaderExtractor {
        ReaderExtractor::new(reqwest::Client::new(), Some(base.to_string()), None).unwrap()
    }

    fn long_body() -> String {
        format!("# Article Content\n\n{}", "Hello world. ".repeat(30))
    }

    #[tokio::test]
    async fn test_extract_text_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(".*example.com/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string(long_body()))
            .mount(&mock_server)
            .await;

        let lines = extractor(&mock_server.uri())
            .extract_text("https://example.com/article")
            .await
            .unwrap();

        assert_eq!(lines[0], "\x1b[1mArticle Content\x1b[0m");
        assert!(lines[2].starts_with("Hello world."));
    }

    #[tokio::test]
    async fn test_short_selector_result_falls_back_to_full_page() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("X-Target-Selector"))
            .respond_with(ResponseTemplate::new(200).set_body_string("tiny"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(long_body()))
            .mount(&mock_server)
            .await;

        let lines = extractor(&mock_server.uri())
            .extract_text("https://example.com/article")
            .await
            .unwrap();
        assert!(lines.len() > 1);
    }

    #[tokio::test]
    async fn test_api_key_sent_as_bearer() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Authorization", "Bearer secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(long_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let extractor = ReaderExtractor::new(
            reqwest::Client::new(),
            Some(mock_server.uri()),
            Some("secret-key".to_string()),
        )
        .unwrap();
        assert!(extractor
            .extract_text("https://example.com/article")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_invalid_article_url_rejected() {
        let result = extractor("http://127.0.0.1:1")
            .extract_text("not-a-valid-url")
            .await;
        assert!(matches!(result, Err(ContentError::InvalidUrl)));
    }

    #[tokio::test]
    async fn test_http_404_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = extractor(&mock_server.uri())
            .extract_text("https://example.com/article")
            .await;
        assert!(matches!(result, Err(ContentError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn test_empty_page_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&mock_server)
            .await;

        let result = extractor(&mock_server.uri())
            .extract_text("https://example.com/article")
            .await;
        assert!(matches!(result, Err(ContentError::Empty)));
    }

    #[test]
    fn test_http_base_url_rejected() {
        let result = ReaderExtractor::new(
            reqwest::Client::new(),
            Some("http://evil.com".to_string()),
            None,
        );
        assert!(matches!(result, Err(ContentError::InsecureBaseUrl)));
    }

    #[test]
    fn test_https_and_localhost_base_urls_allowed() {
        assert!(ReaderExtractor::new(reqwest::Client::new(), None, None).is_ok());
        assert!(ReaderExtractor::new(
            reqwest::Client::new(),
            Some("http://localhost:8080/".to_string()),
            None
        )
        .is_ok());
    }

    #[test]
    fn test_strip_skip_to_content_and_scaffolding() {
        let input = "[Skip to content](https://example.com/#content)\n\n# Article Title\n\nContent here.\n\nLoading Comments...\n\nProudly powered by WordPress";
        let result = strip_boilerplate(input);
        assert!(!result.contains("Skip to content"));
        assert!(!result.contains("Loading Comments"));
        assert!(!result.contains("WordPress"));
        assert!(result.contains("Article Title"));
        assert!(result.contains("Content here"));
    }

    #[test]
    fn test_strip_archive_run() {
        let input = "Article content\n\n*   [January 2024](https://example.com/2024/01/)\n*   [February 2024](https://example.com/2024/02/)\n*   [March 2024](https://example.com/2024/03/)\n\nFooter";
        let result = strip_boilerplate(input);
        assert!(!result.contains("January 2024"));
        assert!(!result.contains("March 2024"));
        assert!(result.contains("Article content"));
        assert!(result.contains("Footer"));
    }

    #[test]
    fn test_preserve_short_archive_list() {
        let input = "Related:\n\n*   [January 2024](https://example.com/2024/01/)\n*   [February 2024](https://example.com/2024/02/)\n\nMore content";
        assert_eq!(strip_boilerplate(input), input);
    }

    #[test]
    fn test_is_archive_link() {
        assert!(is_archive_link("*   [January 2024](https://example.com/)"));
        assert!(is_archive_link("  *   [March 2025](https://example.com/)"));
        assert!(!is_archive_link("*   [Some Article](https://example.com/)"));
        assert!(!is_archive_link("January 2024"));
        assert!(!is_archive_link("*   January 2024"));
    }
}
