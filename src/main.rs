use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use skiff::app::{self, AppEvent, Capabilities, Services, APP_NAME};
use skiff::config::Settings;
use skiff::content::ReaderExtractor;
use skiff::feed::HttpFeedSource;
use skiff::storage::{
    cache_dir, config_dir, ensure_dir, CacheWriter, FeedCache, SubscriptionStore, CACHE_FILE,
    LOG_FILE, SETTINGS_FILE, SUBSCRIPTIONS_FILE,
};
use skiff::terminal::{self, StdinPause, SystemLauncher};
use skiff::ui::{self, DisplayEngine, EngineOptions};
use skiff::{editor, storage};

#[derive(Parser, Debug)]
#[command(name = "skiff", version, about = "Terminal feed reader")]
struct Args {
    /// Show internal coordinates in the bottom bar and write a debug log
    #[arg(short, long)]
    debug: bool,

    /// Edit the subscription file with $EDITOR
    #[arg(short, long)]
    edit: bool,

    /// Remove the feed cache file
    #[arg(short, long)]
    clean: bool,
}

/// Logs go to a file in debug mode and nowhere otherwise: stdout is the UI.
fn init_logging(cache_dir: &Path) -> Result<()> {
    let log_path = cache_dir.join(LOG_FILE);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file '{}'", log_path.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("skiff=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = config_dir().context("Failed to locate config directory")?;
    let cache_dir = cache_dir().context("Failed to locate cache directory")?;
    ensure_dir(&config_dir).context("Failed to create config directory")?;
    ensure_dir(&cache_dir).context("Failed to create cache directory")?;

    if args.debug {
        init_logging(&cache_dir)?;
    }

    let subscriptions_path = config_dir.join(SUBSCRIPTIONS_FILE);
    let cache_path = cache_dir.join(CACHE_FILE);

    if args.edit {
        let editor = editor::editor_command();
        editor::edit_subscriptions(&subscriptions_path, &editor).with_context(|| {
            format!(
                "Failed to edit subscription file '{}'",
                subscriptions_path.display()
            )
        })?;
        return Ok(());
    }

    if args.clean {
        match std::fs::remove_file(&cache_path) {
            Ok(()) => println!("Removed {}", cache_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                println!("No cache file at {}", cache_path.display())
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to remove cache file '{}'", cache_path.display())
                })
            }
        }
        return Ok(());
    }

    let settings = Settings::load(&config_dir.join(SETTINGS_FILE))
        .context("Failed to load settings")?;
    tracing::debug!(settings = ?settings, "Settings");

    let store = SubscriptionStore::new(&subscriptions_path);
    let subscriptions = store.load().with_context(|| {
        format!(
            "Invalid subscription file '{}': fix it with `{} --edit`",
            subscriptions_path.display(),
            APP_NAME
        )
    })?;

    let cache = match FeedCache::load(&cache_path) {
        Ok(cache) => cache,
        Err(e @ storage::StorageError::Json(_)) => {
            tracing::warn!(error = %e, "Ignoring unreadable feed cache");
            FeedCache::default()
        }
        Err(e) => return Err(e).context("Failed to load feed cache"),
    };
    let cache = cache.merge(&subscriptions);
    tracing::info!(feeds = cache.feeds.len(), "Feed cache ready");

    let client = app::build_http_client().context("Failed to build HTTP client")?;
    let extractor = ReaderExtractor::new(
        client.clone(),
        settings.reader_base_url.clone(),
        settings.resolved_api_key(),
    )
    .context("Invalid reader service configuration")?;

    let pause = Arc::new(StdinPause::new());
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(app::EVENT_CHANNEL_CAPACITY);

    let services = Services {
        feeds: Arc::new(HttpFeedSource::new(client)),
        extractor: Arc::new(extractor),
        launcher: Arc::new(SystemLauncher::new(settings.pager.clone(), Arc::clone(&pause))),
        subscriptions: store,
        cache: Arc::new(Mutex::new(cache)),
        writer: CacheWriter::new(&cache_path),
        events: event_tx,
        max_concurrent_fetches: settings.max_concurrent_fetches,
    };

    let caps = Capabilities {
        headless: terminal::is_headless(),
        pager: terminal::program_available(&settings.pager),
    };
    tracing::debug!(headless = caps.headless, pager = caps.pager, "Capabilities");

    let options = EngineOptions {
        debug: args.debug,
        flash_ttl: settings.status_timeout(),
    };

    let mut engine = DisplayEngine::new(services, caps, options);
    engine.load_feed_list();

    let result = ui::run(&mut engine, event_rx, pause).await;
    terminal::restore();
    result
}
