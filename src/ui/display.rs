//! The display engine: sole owner of everything painted on screen.
//!
//! It lives on the event-loop task. Background work reaches it only through
//! [`AppEvent`](crate::app::AppEvent)s, and the feed cache it reads from is
//! locked for the duration of a single synchronous step, never across an
//! `.await`.
use super::ansi::{styled, BOLD};
use super::compositor::{Frame, CHROME_ROWS};
use super::edit::EditBuffer;
use super::reflow::{reflow, row_text, unwrapped, Grid, Layout};
use super::status::{StatusLine, Tone};
use super::tasks;
use super::viewport::{PositionStack, Screen, Viewport};
use crate::app::{Capabilities, Launcher, Services};
use crate::storage::{lock_cache, Feed, Item, StorageError, Subscription};
use crate::util::{rune_count, validate_url};
use std::sync::Arc;
use std::time::Duration;

pub const FEED_LIST_HELP: &str = "HELP: q = quit | r = reload | R = reload all | a = add a feed";
pub const ARTICLE_LIST_HELP: &str = "HELP: \u{21B5} = view article | \u{232B} = go back";
pub const ARTICLE_TEXT_HELP: &str =
    "HELP: \u{232B} = go back | \u{25B2} = scroll up | \u{25BC} = scroll down";
pub const NO_FEEDS: &str = "no feed url: type 'a' to add one now";

/// "editing aborted!" disappears faster than other messages.
const ABORT_FLASH: Duration = Duration::from_secs(1);

/// Viewport movements available from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Up,
    Down,
    PageUp,
    PageDown,
    Start,
    End,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub debug: bool,
    pub flash_ttl: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            debug: false,
            flash_ttl: Duration::from_secs(3),
        }
    }
}

pub struct DisplayEngine {
    pub(super) services: Services,
    pub(super) caps: Capabilities,
    pub(super) options: EngineOptions,

    pub(super) width: usize,
    pub(super) height: usize,

    pub(super) viewport: Viewport,
    pub(super) stack: PositionStack,

    /// Screen the current rows belong to; differs from the viewport's screen
    /// only in the middle of a transition.
    pub(super) content: Screen,
    pub(super) raw: Vec<String>,
    pub(super) grid: Grid,
    /// Row index to the URL it stands for (feed URL or article link).
    pub(super) row_urls: Vec<Option<String>>,

    pub(super) current_feed: Option<String>,
    pub(super) current_article: Option<String>,
    pub(super) title: String,

    pub(super) status: StatusLine,
    pub(super) edit: Option<EditBuffer>,
    pub(super) reload_all_running: bool,
}

impl DisplayEngine {
    pub fn new(services: Services, caps: Capabilities, options: EngineOptions) -> Self {
        Self {
            services,
            caps,
            options,
            width: 80,
            height: 24,
            viewport: Viewport::new(Screen::FeedList),
            stack: PositionStack::new(),
            content: Screen::FeedList,
            raw: Vec::new(),
            grid: Vec::new(),
            row_urls: Vec::new(),
            current_feed: None,
            current_article: None,
            title: String::new(),
            status: StatusLine::new(),
            edit: None,
            reload_all_running: false,
        }
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn screen(&self) -> Screen {
        self.viewport.screen
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Visible characters of every grid row.
    pub fn row_texts(&self) -> Vec<String> {
        self.grid.iter().map(|r| row_text(r)).collect()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Text currently shown on the left of the bottom bar.
    pub fn bottom_text(&self) -> String {
        match &self.edit {
            Some(buf) => buf.visible_text(self.edit_width()),
            None => self.status.current().0.into_owned(),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    pub fn edit_buffer(&self) -> Option<&EditBuffer> {
        self.edit.as_ref()
    }

    pub fn is_reloading_all(&self) -> bool {
        self.reload_all_running
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn content_height(&self) -> usize {
        self.height.saturating_sub(CHROME_ROWS).max(1)
    }

    /// URL behind the cursor row on a list screen.
    pub fn selected_url(&self) -> Option<&str> {
        if !self.viewport.screen.has_selection() {
            return None;
        }
        self.row_urls
            .get(self.viewport.absolute_row())
            .and_then(|u| u.as_deref())
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    /// Terminal resized: reflow the text screen and clamp the viewport.
    pub fn set_window_size(&mut self, width: usize, height: usize) {
        tracing::debug!(width, height, "Window size set");
        self.width = width.max(1);
        self.height = height;
        self.rebuild_grid();
        let len = self.grid.len();
        let content_height = self.content_height();
        self.viewport.resize(len, content_height);
    }

    pub fn scroll(&mut self, motion: Motion) {
        let len = self.grid.len();
        let h = self.content_height();
        let vp = &mut self.viewport;
        match motion {
            Motion::Up => vp.move_up(len, h),
            Motion::Down => vp.move_down(len, h),
            Motion::PageUp => vp.page_up(len, h),
            Motion::PageDown => vp.page_down(len, h),
            Motion::Start => vp.jump_start(len, h),
            Motion::End => vp.jump_end(len, h),
        }
    }

    fn clamp(&mut self) {
        let len = self.grid.len();
        let content_height = self.content_height();
        self.viewport.clamp(len, content_height);
    }

    fn rebuild_grid(&mut self) {
        self.grid = match self.content {
            Screen::ArticleText => reflow(&self.raw, Layout::for_width(self.width)),
            Screen::FeedList | Screen::ArticleList => unwrapped(&self.raw),
        };
    }

    // ========================================================================
    // Screen content
    // ========================================================================

    /// Rebuild the feed list from the cache. Does not move the viewport.
    pub fn load_feed_list(&mut self) {
        let rows: Vec<(String, Option<String>)> = {
            let cache = lock_cache(&self.services.cache);
            cache
                .feeds
                .iter()
                .map(|f| (feed_row(f), Some(f.url.clone())))
                .collect()
        };

        if rows.is_empty() {
            self.status.set_base(NO_FEEDS);
        } else {
            self.status.set_base(FEED_LIST_HELP);
        }
        let (raw, urls) = rows.into_iter().unzip();
        self.raw = raw;
        self.row_urls = urls;
        self.content = Screen::FeedList;
        self.title.clear();
        self.rebuild_grid();
    }

    /// Show the items of a cached feed. Refused (state untouched) when the
    /// feed has never been fetched.
    pub fn load_article_list(&mut self, url: &str) -> bool {
        let rows = {
            let cache = lock_cache(&self.services.cache);
            cache.find(url).map(|feed| {
                let rows: Vec<(String, Option<String>)> = feed
                    .items
                    .iter()
                    .map(|i| (article_row(i), i.url.clone()))
                    .collect();
                (feed.display_name().to_string(), rows)
            })
        };

        let Some((name, rows)) = rows.filter(|(_, rows)| !rows.is_empty()) else {
            tracing::debug!(feed = %url, "Feed has no cached items");
            self.flash("feed not yet loaded: press r!", Tone::Error);
            return false;
        };

        let (raw, urls) = rows.into_iter().unzip();
        self.raw = raw;
        self.row_urls = urls;
        self.content = Screen::ArticleList;
        self.current_feed = Some(url.to_string());
        self.title = format!("> {}", name);
        self.status.set_base(self.article_list_help());
        self.rebuild_grid();
        true
    }

    /// Fetch and show an article's text. On failure nothing changes.
    pub async fn load_article_text(&mut self, url: &str) -> bool {
        let Some(feed_url) = self.current_feed.clone() else {
            return false;
        };

        let lines = match self.services.extractor.extract_text(url).await {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(article = %url, error = %e, "Text extraction failed");
                self.flash(format!("cannot load article from url: {}", url), Tone::Error);
                return false;
            }
        };

        let (feed_name, item_title) = {
            let mut cache = lock_cache(&self.services.cache);
            cache.mark_read(&feed_url, url);
            let feed = cache.find(&feed_url);
            let item_title = feed
                .and_then(|f| f.items.iter().find(|i| i.url.as_deref() == Some(url)))
                .map(|i| i.title.clone())
                .unwrap_or_default();
            let feed_name = feed.map(|f| f.display_name().to_string()).unwrap_or_default();
            (feed_name, item_title)
        };
        self.save_cache();

        self.raw = lines;
        self.row_urls.clear();
        self.content = Screen::ArticleText;
        self.current_article = Some(url.to_string());
        self.title = format!("> {} > {}", feed_name, item_title);
        self.status.set_base(ARTICLE_TEXT_HELP);
        self.rebuild_grid();
        true
    }

    /// Rebuild the rows of a list screen after the cache changed, keeping the
    /// viewport where it is.
    pub fn refresh_rows(&mut self) {
        match self.content {
            Screen::FeedList => self.load_feed_list(),
            Screen::ArticleList => {
                let Some(url) = self.current_feed.clone() else {
                    return;
                };
                let rows: Option<Vec<(String, Option<String>)>> = {
                    let cache = lock_cache(&self.services.cache);
                    cache.find(&url).map(|feed| {
                        feed.items
                            .iter()
                            .map(|i| (article_row(i), i.url.clone()))
                            .collect()
                    })
                };
                if let Some(rows) = rows {
                    let (raw, urls) = rows.into_iter().unzip();
                    self.raw = raw;
                    self.row_urls = urls;
                    self.rebuild_grid();
                }
            }
            Screen::ArticleText => return,
        }
        self.clamp();
    }

    fn article_list_help(&self) -> String {
        let mut help = ARTICLE_LIST_HELP.to_string();
        if !self.caps.headless {
            help.push_str(" | o = open with browser");
        }
        if self.caps.pager {
            help.push_str(" | l = open with lynx");
        }
        help
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Drill down from the selected row. The current position is saved so
    /// [`back`](Self::back) can restore it.
    pub async fn enter(&mut self) {
        match self.viewport.screen {
            Screen::FeedList => {
                let Some(url) = self.selected_url().map(str::to_owned) else {
                    return;
                };
                let saved = self.viewport.clone();
                if self.load_article_list(&url) {
                    self.stack.push(saved);
                    self.viewport = Viewport::new(Screen::ArticleList);
                }
            }
            Screen::ArticleList => {
                let url = match self.row_urls.get(self.viewport.absolute_row()) {
                    Some(Some(url)) => url.clone(),
                    Some(None) => {
                        self.flash("cannot load article from url: N/A", Tone::Error);
                        return;
                    }
                    None => return,
                };
                let saved = self.viewport.clone();
                if self.load_article_text(&url).await {
                    self.stack.push(saved);
                    self.viewport = Viewport::new(Screen::ArticleText);
                }
            }
            Screen::ArticleText => return,
        }
        self.clamp();
    }

    /// Return to the previous screen at the saved position.
    pub fn back(&mut self) {
        match self.viewport.screen {
            Screen::FeedList => return,
            Screen::ArticleList => {
                self.current_feed = None;
                self.load_feed_list();
                self.viewport = self.stack.pop_or_default(Screen::FeedList);
            }
            Screen::ArticleText => {
                self.current_article = None;
                let loaded = match self.current_feed.clone() {
                    Some(url) => self.load_article_list(&url),
                    None => false,
                };
                if loaded {
                    self.viewport = self.stack.pop_or_default(Screen::ArticleList);
                } else {
                    self.stack.clear();
                    self.current_feed = None;
                    self.load_feed_list();
                    self.viewport = Viewport::new(Screen::FeedList);
                }
            }
        }
        self.clamp();
    }

    // ========================================================================
    // Background work
    // ========================================================================

    /// Reload the selected feed (feed list) or the open feed (article list).
    pub fn reload_current(&mut self) {
        let url = match self.viewport.screen {
            Screen::FeedList => self.selected_url().map(str::to_owned),
            Screen::ArticleList => self.current_feed.clone(),
            Screen::ArticleText => None,
        };
        if let Some(url) = url {
            tracing::info!(feed = %url, "Reloading feed");
            tasks::spawn_reload_one(self.services.clone(), url);
        }
    }

    /// Reload every subscribed feed concurrently. Ignored while a previous
    /// "reload all" is still running.
    pub fn reload_all(&mut self) {
        if self.reload_all_running {
            tracing::debug!("Reload all already running");
            return;
        }
        let urls = lock_cache(&self.services.cache).urls();
        if urls.is_empty() {
            return;
        }
        tracing::info!(feeds = urls.len(), "Reloading all feeds");
        self.reload_all_running = true;
        self.status.set_progress(0, urls.len());
        tasks::spawn_reload_all(self.services.clone(), urls);
    }

    pub(super) fn save_cache(&self) {
        self.services
            .writer
            .spawn_save(self.services.cache.clone(), self.services.events.clone());
    }

    pub fn flash(&mut self, text: impl Into<String>, tone: Tone) {
        let ttl = self.options.flash_ttl;
        self.flash_for(text, tone, ttl);
    }

    pub fn flash_for(&mut self, text: impl Into<String>, tone: Tone, ttl: Duration) {
        self.status.flash(text, tone, ttl, &self.services.events);
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Columns available to the edit buffer in the bottom bar, leaving room
    /// for the right-hand corner and one separating column.
    pub fn edit_width(&self) -> usize {
        let right = rune_count(&self.bottom_right());
        self.width.saturating_sub(right + 1).max(1)
    }

    pub fn start_editing(&mut self) {
        tracing::debug!("Live editing enabled");
        self.edit = Some(EditBuffer::new());
    }

    pub fn abort_editing(&mut self) {
        self.edit = None;
        self.flash_for("editing aborted!", Tone::Info, ABORT_FLASH);
    }

    pub(super) fn edit_mut(&mut self) -> Option<&mut EditBuffer> {
        self.edit.as_mut()
    }

    /// Validate the typed URL by fetching it, then persist it. On any failure
    /// the buffer stays open so the user can fix the URL.
    pub async fn commit_new_feed(&mut self) {
        let Some(buf) = self.edit.as_ref() else {
            return;
        };
        let url = buf.full_text().trim().to_string();

        if let Err(e) = validate_url(&url) {
            tracing::debug!(url = %url, error = %e, "Rejected typed feed URL");
            self.flash("feed url not valid!", Tone::Error);
            return;
        }

        let feed = match self.services.feeds.parse_feed(&url).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Typed feed URL does not parse");
                self.flash("feed url not valid!", Tone::Error);
                return;
            }
        };

        match self
            .services
            .subscriptions
            .append(Subscription::new(url.clone(), None))
        {
            Ok(()) => {}
            Err(e @ StorageError::AlreadyPresent(_)) => {
                self.flash(e.to_string(), Tone::Error);
                return;
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to append subscription");
                self.flash("cannot save url in config file!", Tone::Error);
                return;
            }
        }

        lock_cache(&self.services.cache).upsert_feed(feed);
        self.save_cache();
        tracing::info!(url = %url, "New feed saved");

        self.edit = None;
        self.load_feed_list();
        if let Some(index) = self
            .row_urls
            .iter()
            .position(|u| u.as_deref() == Some(url.as_str()))
        {
            let len = self.grid.len();
            let content_height = self.content_height();
            self.viewport.select(index, len, content_height);
        }
        self.flash("new feed saved!", Tone::Success);
    }

    // ========================================================================
    // Painting
    // ========================================================================

    /// Right-hand corner of the bottom bar: the coordinate tuple in debug
    /// mode, otherwise the row counter (nothing while editing).
    fn bottom_right(&self) -> String {
        let vp = &self.viewport;
        let len = self.grid.len();
        if self.options.debug {
            let x = self
                .edit
                .as_ref()
                .map_or(vp.cursor_col, |b| b.view_cursor());
            format!(
                "(y:{},x:{}) (soff:{}, eoff:{}) (h:{},w:{})",
                vp.cursor_row, x, vp.window_start, vp.window_end, self.height, self.width
            )
        } else if self.edit.is_some() {
            String::new()
        } else if len == 0 {
            "0/0".to_string()
        } else {
            format!("{}/{}", vp.absolute_row() + 1, len)
        }
    }

    /// Clamp the viewport to the grid and describe the frame to paint.
    pub fn frame(&mut self) -> Frame<'_> {
        self.clamp();
        let vp = &self.viewport;
        let len = self.grid.len();

        let rows = if len == 0 {
            &self.grid[..]
        } else {
            &self.grid[vp.window_start..=vp.window_end]
        };

        let highlight = (vp.screen.has_selection() && self.edit.is_none() && len > 0)
            .then(|| vp.cursor_row - 1);

        let caret = self.edit.as_ref().map(|b| b.view_cursor());
        let bottom_right = self.bottom_right();

        let (bottom_left, tone) = match &self.edit {
            Some(buf) => (buf.visible_text(self.edit_width()).into(), Tone::Info),
            None => self.status.current(),
        };

        Frame {
            width: self.width,
            height: self.height,
            title: &self.title,
            rows,
            highlight,
            bottom_left,
            tone,
            bottom_right,
            caret,
            cursor_row: vp.cursor_row,
        }
    }

    pub(super) fn launcher(&self) -> Arc<dyn Launcher> {
        Arc::clone(&self.services.launcher)
    }

    pub(super) fn status_mut(&mut self) -> &mut StatusLine {
        &mut self.status
    }
}

/// `(unread/total)` left-aligned in 20 columns, then the feed name. Bold when
/// anything is unread.
pub fn feed_row(feed: &Feed) -> String {
    let counts = format!("({}/{})", feed.unread_count(), feed.items.len());
    let line = format!("{:<20} {}", counts, feed.display_name());
    if feed.unread_count() > 0 {
        styled(&line, &[BOLD])
    } else {
        line
    }
}

/// Publish date (or `N/A`) left-aligned in 20 columns, then the title. Bold
/// while unread.
pub fn article_row(item: &Item) -> String {
    let date = item
        .published
        .map(|d| d.format("%Y-%B-%d").to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let line = format!("{:<20} {}", date, item.title);
    if item.unread {
        styled(&line, &[BOLD])
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str, unread: bool) -> Item {
        Item {
            title: title.to_string(),
            url: Some(format!("https://example.com/{}", title)),
            published: Some(chrono::Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap()),
            unread,
        }
    }

    #[test]
    fn test_feed_row_counts_and_bold() {
        let mut feed = Feed::empty("https://example.com/rss", Some("Example".into()));
        assert_eq!(feed_row(&feed), format!("{:<20} Example", "(0/0)"));

        feed.items = vec![item("a", true), item("b", false)];
        assert_eq!(
            feed_row(&feed),
            format!("\x1b[1m{:<20} Example\x1b[0m", "(1/2)")
        );
    }

    #[test]
    fn test_article_row_date_format() {
        assert_eq!(
            article_row(&item("hello", false)),
            format!("{:<20} hello", "2024-March-07")
        );

        let mut undated = item("x", false);
        undated.published = None;
        assert!(article_row(&undated).starts_with("N/A "));
    }
}
