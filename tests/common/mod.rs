//! Fakes for the collaborators the display engine talks to.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use skiff::app::{AppEvent, Capabilities, Launcher, Services, EVENT_CHANNEL_CAPACITY};
use skiff::content::{ContentError, TextExtractor};
use skiff::feed::{FeedError, FeedSource};
use skiff::storage::{CacheWriter, Feed, FeedCache, Item, SharedCache, SubscriptionStore};
use skiff::ui::{DisplayEngine, EngineOptions};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn item(title: &str, url: &str, day: u32) -> Item {
    Item {
        title: title.to_string(),
        url: Some(url.to_string()),
        published: Some(Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()),
        unread: true,
    }
}

/// A fetched feed with `count` items, newest first.
pub fn feed_with_items(url: &str, title: &str, count: usize) -> Feed {
    let mut feed = Feed::empty(url, None);
    feed.title = title.to_string();
    feed.items = (0..count)
        .map(|i| {
            item(
                &format!("{} {}", title, i),
                &format!("{}/item/{}", url, i),
                28 - (i % 28) as u32,
            )
        })
        .collect();
    feed.fetched_at = Some(Utc::now());
    feed
}

enum Reply {
    Feed(Feed),
    Fail,
}

/// Answers each URL with a canned feed or a parse failure, optionally after
/// a delay. Tracks how many fetches run at once.
#[derive(Default)]
pub struct FakeFeeds {
    replies: Mutex<HashMap<String, (Reply, Duration)>>,
    running: AtomicUsize,
    pub max_running: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeFeeds {
    pub fn with_feed(self, feed: Feed) -> Self {
        self.with_delayed_feed(feed, Duration::ZERO)
    }

    pub fn with_delayed_feed(self, feed: Feed, delay: Duration) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(feed.url.clone(), (Reply::Feed(feed), delay));
        self
    }

    pub fn with_failure(self, url: &str, delay: Duration) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), (Reply::Fail, delay));
        self
    }
}

#[async_trait]
impl FeedSource for FakeFeeds {
    async fn parse_feed(&self, url: &str) -> Result<Feed, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        let reply = {
            let replies = self.replies.lock().unwrap();
            replies.get(url).map(|(reply, delay)| {
                let reply = match reply {
                    Reply::Feed(feed) => Ok(feed.clone()),
                    Reply::Fail => Err(()),
                };
                (reply, *delay)
            })
        };

        let result = match reply {
            Some((reply, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                reply.map_err(|_| FeedError::Parse(format!("not a feed: {}", url)))
            }
            None => Err(FeedError::HttpStatus(404)),
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Returns the same lines for every article, or fails for URLs containing
/// `broken`.
pub struct FakeExtractor {
    pub lines: Vec<String>,
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract_text(&self, url: &str) -> Result<Vec<String>, ContentError> {
        if url.contains("broken") {
            return Err(ContentError::Empty);
        }
        Ok(self.lines.clone())
    }
}

/// Records every URL it is asked to open.
#[derive(Default)]
pub struct RecordingLauncher {
    pub opened: Mutex<Vec<(String, String)>>,
}

impl Launcher for RecordingLauncher {
    fn open_in_browser(&self, url: &str) -> io::Result<()> {
        self.opened
            .lock()
            .unwrap()
            .push(("browser".to_string(), url.to_string()));
        Ok(())
    }

    fn open_in_pager(&self, url: &str) -> io::Result<()> {
        self.opened
            .lock()
            .unwrap()
            .push(("pager".to_string(), url.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub services: Services,
    pub events: mpsc::Receiver<AppEvent>,
    pub feeds: Arc<FakeFeeds>,
    pub launcher: Arc<RecordingLauncher>,
    pub subscriptions_path: PathBuf,
    pub cache_path: PathBuf,
}

impl Harness {
    /// Services over `dir`, with `cached` as the initial cache. The
    /// subscription file lists the cached feeds in order.
    pub fn new(dir: &Path, cached: Vec<Feed>, feeds: FakeFeeds) -> Self {
        let subscriptions_path = dir.join("urls");
        let cache_path = dir.join("feeds.json");

        let lines: String = cached.iter().map(|f| format!("{}\n", f.url)).collect();
        std::fs::write(&subscriptions_path, lines).unwrap();

        let cache: SharedCache = Arc::new(Mutex::new(FeedCache { feeds: cached }));
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let feeds = Arc::new(feeds);
        let launcher = Arc::new(RecordingLauncher::default());

        let services = Services {
            feeds: feeds.clone(),
            extractor: Arc::new(FakeExtractor {
                lines: vec![
                    "First paragraph of the article.".to_string(),
                    String::new(),
                    "Second paragraph.".to_string(),
                ],
            }),
            launcher: launcher.clone(),
            subscriptions: SubscriptionStore::new(&subscriptions_path),
            cache,
            writer: CacheWriter::new(&cache_path),
            events: tx,
            max_concurrent_fetches: 0,
        };

        Self {
            services,
            events: rx,
            feeds,
            launcher,
            subscriptions_path,
            cache_path,
        }
    }

    /// An engine sized `width` x `height` showing the feed list.
    pub fn engine(&self, caps: Capabilities, width: usize, height: usize) -> DisplayEngine {
        let mut engine =
            DisplayEngine::new(self.services.clone(), caps, EngineOptions::default());
        engine.set_window_size(width, height);
        engine.load_feed_list();
        engine
    }

    /// Wait for the next background event.
    pub async fn next_event(&mut self) -> AppEvent {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("no event within 5s")
            .expect("event channel closed")
    }
}
