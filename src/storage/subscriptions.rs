//! The subscription file: one feed per line, `URL #"alias"`.
//!
//! Lines starting with `#` and blank lines are ignored. The alias part is
//! optional and only written when set.
use super::paths::atomic_write;
use super::StorageError;
use std::path::{Path, PathBuf};

/// One subscribed feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub url: String,
    pub alias: Option<String>,
}

impl Subscription {
    pub fn new(url: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            url: url.into(),
            alias,
        }
    }

    /// Render as a file line.
    pub fn to_line(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} #\"{}\"", self.url, alias.replace('"', "'")),
            None => self.url.clone(),
        }
    }
}

/// Parse a single non-comment line.
///
/// Returns `None` for lines that do not start with an http(s) URL or carry a
/// malformed alias.
pub fn parse_line(line: &str) -> Option<Subscription> {
    let line = line.trim();
    let (url, rest) = match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim()),
        None => (line, ""),
    };

    if !(url.starts_with("http://") || url.starts_with("https://")) || url.contains('"') {
        return None;
    }

    if rest.is_empty() {
        return Some(Subscription::new(url, None));
    }

    let quoted = rest.strip_prefix('#')?.trim_start();
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains('"') {
        return None;
    }
    let alias = (!inner.trim().is_empty()).then(|| inner.to_string());
    Some(Subscription::new(url, alias))
}

pub fn is_comment_or_blank(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Handle to the subscription file on disk.
#[derive(Debug, Clone)]
pub struct SubscriptionStore {
    path: PathBuf,
}

impl SubscriptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every valid subscription. A missing file yields an empty list.
    ///
    /// Invalid lines fail the whole load so the user can fix them with `--edit`.
    pub fn load(&self) -> Result<Vec<Subscription>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No subscription file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        let mut subs = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if is_comment_or_blank(line) {
                continue;
            }
            match parse_line(line) {
                Some(sub) => subs.push(sub),
                None => {
                    return Err(StorageError::InvalidLine {
                        line: idx + 1,
                        content: line.to_string(),
                    })
                }
            }
        }

        tracing::debug!(count = subs.len(), "Loaded subscriptions");
        Ok(subs)
    }

    /// Add a subscription at the end of the file. Existing lines, comments
    /// included, are kept as they are.
    pub fn append(&self, sub: Subscription) -> Result<(), StorageError> {
        let subs = self.load()?;
        if subs.iter().any(|s| s.url == sub.url) {
            return Err(StorageError::AlreadyPresent(sub.url));
        }

        let mut content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&sub.to_line());
        content.push('\n');
        atomic_write(&self.path, content.as_bytes())
    }
}
