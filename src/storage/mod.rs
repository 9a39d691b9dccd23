//! Durable state: the subscription file and the feed cache.
//!
//! - [`subscriptions`] - the user-edited `urls` file
//! - [`cache`] - fetched items and read flags, persisted as JSON
//! - [`paths`] - config/cache directory resolution and atomic writes

mod cache;
mod paths;
mod subscriptions;
mod types;

pub use cache::{lock_cache, CacheWriter, FeedCache, SharedCache};
pub use paths::{
    atomic_write, cache_dir, config_dir, ensure_dir, CACHE_FILE, LOG_FILE, SETTINGS_FILE,
    SUBSCRIPTIONS_FILE,
};
pub use subscriptions::{is_comment_or_blank, parse_line, Subscription, SubscriptionStore};
pub use types::{Feed, Item, StorageError};
