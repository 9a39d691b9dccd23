//! Bottom bar message state.
//!
//! Three layers: the per-screen base text, a "reload all" progress line and
//! a transient flash. The flash wins over progress, progress over the base.
//! Each flash arms a one-shot timer task that reports back through the event
//! channel; arming a new flash aborts the pending timer and bumps the
//! generation so a late expiry for an older flash is ignored.
use crate::app::AppEvent;
use std::borrow::Cow;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Error,
}

#[derive(Debug)]
struct Flash {
    text: String,
    tone: Tone,
}

#[derive(Debug, Default)]
pub struct StatusLine {
    base: String,
    progress: Option<(usize, usize)>,
    flash: Option<Flash>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_base(&mut self, text: impl Into<String>) {
        self.base = text.into();
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn set_progress(&mut self, done: usize, total: usize) {
        self.progress = Some((done, total));
    }

    pub fn clear_progress(&mut self) {
        self.progress = None;
    }

    /// Show `text` for `ttl`, superseding any pending flash.
    pub fn flash(
        &mut self,
        text: impl Into<String>,
        tone: Tone,
        ttl: Duration,
        events: &mpsc::Sender<AppEvent>,
    ) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        self.flash = Some(Flash {
            text: text.into(),
            tone,
        });

        let tx = events.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if tx.send(AppEvent::StatusExpired { generation }).await.is_err() {
                tracing::debug!(generation, "Status expiry dropped (receiver closed)");
            }
        }));
    }

    /// Drop the flash if `generation` is the current one. Returns true when
    /// the visible text changed.
    pub fn expire(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.flash.is_none() {
            return false;
        }
        self.flash = None;
        self.timer = None;
        true
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Text to show now, with its tone.
    pub fn current(&self) -> (Cow<'_, str>, Tone) {
        if let Some(flash) = &self.flash {
            return (Cow::Borrowed(flash.text.as_str()), flash.tone);
        }
        if let Some((done, total)) = self.progress {
            return (
                Cow::Owned(format!(
                    "loading all feeds, please wait........{}/{}",
                    done, total
                )),
                Tone::Info,
            );
        }
        (Cow::Borrowed(self.base.as_str()), Tone::Info)
    }
}

impl Drop for StatusLine {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
