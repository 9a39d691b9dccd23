use super::FeedError;
use crate::storage::{Feed, Item};
use crate::util::{single_line, validate_url_for_open};
use feed_rs::model::FeedType;

/// Syndication format detected while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
    Json,
}

impl From<&FeedType> for FeedFormat {
    fn from(kind: &FeedType) -> Self {
        match kind {
            FeedType::Atom => FeedFormat::Atom,
            FeedType::JSON => FeedFormat::Json,
            FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2 => FeedFormat::Rss,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub format: FeedFormat,
    pub feed: Feed,
    /// Links dropped because they were not http(s).
    pub skipped_links: usize,
}

/// Parse an RSS, Atom or JSON Feed document fetched from `url`.
///
/// Items come back sorted (dated newest first, undated after) and unread.
pub fn parse_bytes(url: &str, bytes: &[u8]) -> Result<ParsedFeed, FeedError> {
    let parsed = feed_rs::parser::parse(bytes).map_err(|e| FeedError::Parse(e.to_string()))?;
    let format = FeedFormat::from(&parsed.feed_type);

    let mut skipped_links = 0;
    let items = parsed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.trim().to_string());
            let url = match link {
                Some(href) if validate_url_for_open(&href).is_ok() => Some(href),
                Some(_) => {
                    skipped_links += 1;
                    None
                }
                None => None,
            };
            let title = entry
                .title
                .map(|t| single_line(&t.content))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());

            Item {
                title,
                url,
                published: entry.published.or(entry.updated),
                unread: true,
            }
        })
        .collect();

    let mut feed = Feed::empty(url, None);
    feed.title = parsed
        .title
        .map(|t| single_line(&t.content))
        .unwrap_or_default();
    feed.items = items;
    feed.sort_items();

    Ok(ParsedFeed {
        format,
        feed,
        skipped_links,
    })
}
