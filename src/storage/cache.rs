//! The feed cache: fetched items and their read state, persisted as JSON.
//!
//! The in-memory cache is shared between the UI loop and fetch tasks behind
//! one coarse `std::sync::Mutex` ([`SharedCache`]). The lock is only held for
//! short synchronous sections and never across an `.await`.
use super::paths::atomic_write;
use super::subscriptions::Subscription;
use super::types::{Feed, Item};
use super::StorageError;
use crate::app::AppEvent;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type SharedCache = Arc<Mutex<FeedCache>>;

/// Lock the shared cache, recovering from a poisoned lock.
///
/// A panic inside a fetch task must not take the UI down with it; the data
/// is still structurally valid since every mutation is a plain assignment.
pub fn lock_cache(cache: &SharedCache) -> MutexGuard<'_, FeedCache> {
    cache.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Feed cache lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedCache {
    pub feeds: Vec<Feed>,
}

impl FeedCache {
    /// Load the cache file. A missing or empty file yields an empty cache.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No cache file yet");
                return Ok(Self::default());
            }
            Err(e) => return Err(StorageError::io(path, e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let cache: FeedCache = serde_json::from_slice(&bytes)?;
        tracing::debug!(feeds = cache.feeds.len(), "Loaded feed cache");
        Ok(cache)
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(self)?;
        atomic_write(path, &bytes)
    }

    /// Reconcile the cache with the subscription list.
    ///
    /// Subscription order wins. Cached feeds matched by URL take the
    /// subscription's alias; subscriptions without a cached entry become
    /// empty entries; cached feeds no longer subscribed are dropped.
    pub fn merge(mut self, subs: &[Subscription]) -> Self {
        let mut by_url: HashMap<String, Feed> = self
            .feeds
            .drain(..)
            .map(|f| (f.url.clone(), f))
            .collect();

        let mut seen = HashSet::new();
        let mut feeds = Vec::with_capacity(subs.len());
        for sub in subs {
            if !seen.insert(sub.url.as_str()) {
                continue;
            }
            let feed = match by_url.remove(&sub.url) {
                Some(mut cached) => {
                    cached.alias = sub.alias.clone();
                    cached
                }
                None => Feed::empty(&sub.url, sub.alias.clone()),
            };
            feeds.push(feed);
        }

        if !by_url.is_empty() {
            tracing::debug!(pruned = by_url.len(), "Dropped cached feeds without subscription");
        }
        Self { feeds }
    }

    pub fn find(&self, url: &str) -> Option<&Feed> {
        self.feeds.iter().find(|f| f.url == url)
    }

    pub fn find_mut(&mut self, url: &str) -> Option<&mut Feed> {
        self.feeds.iter_mut().find(|f| f.url == url)
    }

    pub fn urls(&self) -> Vec<String> {
        self.feeds.iter().map(|f| f.url.clone()).collect()
    }

    /// Replace a feed's items with a freshly fetched set.
    ///
    /// Read state is carried over by item URL (title when the URL is missing).
    /// Returns the number of items that were not cached before, or `None`
    /// when the feed is no longer in the cache.
    pub fn apply_fetched(&mut self, fetched: Feed) -> Option<usize> {
        let cached = self.find_mut(&fetched.url)?;

        let previous: HashMap<&str, bool> = cached
            .items
            .iter()
            .map(|i| (i.identity(), i.unread))
            .collect();

        let mut new_count = 0;
        let items: Vec<Item> = fetched
            .items
            .into_iter()
            .map(|mut item| {
                match previous.get(item.identity()) {
                    Some(unread) => item.unread = *unread,
                    None => new_count += 1,
                }
                item
            })
            .collect();

        cached.items = items;
        cached.title = fetched.title;
        cached.fetched_at = Some(Utc::now());
        cached.sort_items();
        Some(new_count)
    }

    /// Insert a feed at the end, or refresh it if already present.
    pub fn upsert_feed(&mut self, feed: Feed) {
        if self.find(&feed.url).is_some() {
            let alias = feed.alias.clone();
            let url = feed.url.clone();
            self.apply_fetched(feed);
            if let Some(cached) = self.find_mut(&url) {
                cached.alias = alias;
            }
            return;
        }
        let mut feed = feed;
        feed.fetched_at = Some(Utc::now());
        feed.sort_items();
        self.feeds.push(feed);
    }

    /// Flip an item to read. Returns true when the flag changed.
    pub fn mark_read(&mut self, feed_url: &str, item_url: &str) -> bool {
        let Some(feed) = self.find_mut(feed_url) else {
            return false;
        };
        match feed
            .items
            .iter_mut()
            .find(|i| i.url.as_deref() == Some(item_url))
        {
            Some(item) if item.unread => {
                item.unread = false;
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Background Writer
// ============================================================================

/// Fire-and-forget cache persistence.
///
/// Each save runs in its own task; an async mutex keeps at most one encode
/// and write in flight so concurrent saves cannot interleave on disk. The
/// snapshot is taken after the writer lock is acquired, so the last save to
/// run always writes the newest state.
#[derive(Debug, Clone)]
pub struct CacheWriter {
    path: PathBuf,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl CacheWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the cache in the background. Failures are reported as
    /// [`AppEvent::CacheSaveFailed`]; the in-memory cache is never touched.
    pub fn spawn_save(&self, cache: SharedCache, events: mpsc::Sender<AppEvent>) -> JoinHandle<()> {
        let writer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = writer.save_now(&cache).await {
                tracing::warn!(path = %writer.path.display(), error = %e, "Failed to save feed cache");
                let _ = events
                    .send(AppEvent::CacheSaveFailed {
                        error: e.to_string(),
                    })
                    .await;
            }
        })
    }

    /// Serialize and write the cache, waiting for any save already running.
    pub async fn save_now(&self, cache: &SharedCache) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let snapshot = lock_cache(cache).clone();
        let path = self.path.clone();

        match tokio::task::spawn_blocking(move || snapshot.save(&path)).await {
            Ok(result) => {
                if result.is_ok() {
                    tracing::debug!(path = %self.path.display(), "Feed cache saved");
                }
                result
            }
            Err(join_err) => Err(StorageError::io(
                &self.path,
                std::io::Error::other(join_err.to_string()),
            )),
        }
    }
}
