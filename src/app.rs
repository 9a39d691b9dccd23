use crate::content::TextExtractor;
use crate::feed::FeedSource;
use crate::storage::{CacheWriter, SharedCache, SubscriptionStore};
use reqwest::redirect::Policy;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const APP_NAME: &str = "skiff";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capacity of the background event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Events
// ============================================================================

/// Messages from background tasks to the event loop, which owns the display.
#[derive(Debug)]
pub enum AppEvent {
    /// A transient status message timed out. Stale generations are ignored.
    StatusExpired { generation: u64 },
    /// A single-feed reload finished. The cache was already updated on
    /// success; `Ok` carries the number of new items.
    FeedReloaded {
        url: String,
        result: Result<usize, String>,
    },
    /// "Reload all" progress.
    ReloadProgress { done: usize, total: usize },
    /// "Reload all" finished; `error` is the first failure, if any.
    ReloadFinished {
        updated: usize,
        error: Option<String>,
    },
    /// A background cache save failed. In-memory state is untouched.
    CacheSaveFailed { error: String },
}

// ============================================================================
// Collaborators
// ============================================================================

/// Hands an article URL to a program outside the terminal UI.
pub trait Launcher: Send + Sync {
    fn open_in_browser(&self, url: &str) -> io::Result<()>;
    fn open_in_pager(&self, url: &str) -> io::Result<()>;
}

/// What the environment allows; decides which commands are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// No graphical session, so no browser.
    pub headless: bool,
    /// The text pager binary was found on `PATH`.
    pub pager: bool,
}

/// Everything the display engine and background tasks share.
#[derive(Clone)]
pub struct Services {
    pub feeds: Arc<dyn FeedSource>,
    pub extractor: Arc<dyn TextExtractor>,
    pub launcher: Arc<dyn Launcher>,
    pub subscriptions: SubscriptionStore,
    pub cache: SharedCache,
    pub writer: CacheWriter,
    pub events: mpsc::Sender<AppEvent>,
    /// Cap on parallel fetches during "reload all"; 0 means unbounded.
    pub max_concurrent_fetches: usize,
}

// ============================================================================
// HTTP Client Configuration
// ============================================================================

/// Redirect policy with loop detection and at most 3 hops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Shared client for feed fetches and text extraction.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("skiff/", env!("CARGO_PKG_VERSION")))
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(std::time::Duration::from_secs(30))
        .tcp_keepalive(std::time::Duration::from_secs(60))
        .timeout(std::time::Duration::from_secs(30))
        .build()
}
