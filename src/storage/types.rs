use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by the subscription file and the feed cache.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache file: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither XDG variables nor HOME are set.
    #[error("Cannot locate home directory (HOME not set)")]
    NoHome,

    #[error("Feed already subscribed: {0}")]
    AlreadyPresent(String),

    #[error("Line {line} is not a valid subscription: {content}")]
    InvalidLine { line: usize, content: String },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

// ============================================================================
// Cached Feed Model
// ============================================================================

/// A feed as held in the cache.
///
/// `alias` comes from the subscription file and wins over `title` for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Feed {
    /// An entry for a subscription that has never been fetched.
    pub fn empty(url: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            alias,
            items: Vec::new(),
            fetched_at: None,
        }
    }

    /// Name shown in the feed list: alias, then title, then the URL itself.
    pub fn display_name(&self) -> &str {
        match &self.alias {
            Some(alias) if !alias.trim().is_empty() => alias,
            _ if !self.title.trim().is_empty() => &self.title,
            _ => &self.url,
        }
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|i| i.unread).count()
    }

    pub fn is_loaded(&self) -> bool {
        !self.items.is_empty()
    }

    /// Dated items newest first, undated items after them, ties by title.
    pub fn sort_items(&mut self) {
        self.items.sort_by(compare_items);
    }
}

/// A single article entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    #[serde(default = "default_unread")]
    pub unread: bool,
}

fn default_unread() -> bool {
    true
}

impl Item {
    /// Key used to carry read state across refetches.
    pub(crate) fn identity(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.title)
    }
}

pub(crate) fn compare_items(a: &Item, b: &Item) -> Ordering {
    match (a.published, b.published) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.title.cmp(&b.title)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.title.cmp(&b.title),
    }
}
