//! Background feed reloads.
//!
//! Results are written into the shared cache by the task itself (the lock is
//! held only for the synchronous update) and announced to the event loop,
//! which rebuilds whatever list is on screen.
use crate::app::{AppEvent, Services};
use crate::feed::FeedError;
use crate::storage::{lock_cache, Feed};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

/// Outcome of a "reload all" run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadSummary {
    pub updated: usize,
    /// First failure; remaining fetches were aborted when it happened.
    pub error: Option<String>,
}

/// Fetch one feed, apply it to the cache and save the cache.
pub fn spawn_reload_one(services: Services, url: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = match services.feeds.parse_feed(&url).await {
            Ok(feed) => {
                let new_items = apply(&services, feed);
                services
                    .writer
                    .spawn_save(services.cache.clone(), services.events.clone());
                Ok(new_items)
            }
            Err(e) => {
                tracing::warn!(feed = %url, error = %e, "Feed reload failed");
                Err(e.to_string())
            }
        };

        if services
            .events
            .send(AppEvent::FeedReloaded { url, result })
            .await
            .is_err()
        {
            tracing::debug!("Reload result dropped (receiver closed)");
        }
    })
}

/// Run [`reload_all`] in the background and report its summary.
pub fn spawn_reload_all(services: Services, urls: Vec<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let summary = reload_all(&services, urls).await;
        let event = AppEvent::ReloadFinished {
            updated: summary.updated,
            error: summary.error,
        };
        if services.events.send(event).await.is_err() {
            tracing::debug!("Reload summary dropped (receiver closed)");
        }
    })
}

/// Fetch every URL concurrently, at most `max_concurrent_fetches` at a time
/// (0 = unbounded).
///
/// Successes are applied to the cache as they complete. The first failure
/// aborts the fetches still running; successes already applied stay. The
/// cache is saved at the end either way.
pub async fn reload_all(services: &Services, urls: Vec<String>) -> ReloadSummary {
    let total = urls.len();
    let limiter = match services.max_concurrent_fetches {
        0 => None,
        n => Some(Arc::new(Semaphore::new(n))),
    };

    let mut set: JoinSet<(String, Result<Feed, FeedError>)> = JoinSet::new();
    for url in urls {
        let source = Arc::clone(&services.feeds);
        let limiter = limiter.clone();
        set.spawn(async move {
            let _permit = match &limiter {
                Some(sem) => sem.acquire().await.ok(),
                None => None,
            };
            let result = source.parse_feed(&url).await;
            (url, result)
        });
    }

    let mut done = 0;
    let mut updated = 0;
    let mut error = None;

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((url, Ok(feed))) => {
                apply(services, feed);
                updated += 1;
                done += 1;
                tracing::debug!(feed = %url, done, total, "Feed reloaded");
                let _ = services
                    .events
                    .send(AppEvent::ReloadProgress { done, total })
                    .await;
            }
            Ok((url, Err(e))) => {
                tracing::warn!(feed = %url, error = %e, "Reload all aborted");
                error = Some(format!("{}: {}", url, e));
                break;
            }
            Err(join_err) => {
                tracing::error!(error = %join_err, "Feed fetch task failed");
                error = Some(join_err.to_string());
                break;
            }
        }
    }
    set.abort_all();

    if let Err(e) = services.writer.save_now(&services.cache).await {
        tracing::warn!(error = %e, "Failed to save feed cache after reload");
        let _ = services
            .events
            .send(AppEvent::CacheSaveFailed {
                error: e.to_string(),
            })
            .await;
    }

    ReloadSummary { updated, error }
}

fn apply(services: &Services, feed: Feed) -> usize {
    let url = feed.url.clone();
    match lock_cache(&services.cache).apply_fetched(feed) {
        Some(new_items) => new_items,
        None => {
            tracing::debug!(feed = %url, "Fetched feed no longer subscribed");
            0
        }
    }
}
