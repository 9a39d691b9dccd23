//! Application event handling.
//!
//! Applies results reported by background tasks (reloads, cache saves,
//! status timers) to the display engine.
use super::display::DisplayEngine;
use super::status::Tone;
use crate::app::AppEvent;

pub fn handle_app_event(engine: &mut DisplayEngine, event: AppEvent) {
    match event {
        AppEvent::StatusExpired { generation } => {
            engine.status_mut().expire(generation);
        }
        AppEvent::FeedReloaded { url, result } => match result {
            Ok(new_items) => {
                tracing::info!(feed = %url, new_items, "Feed reloaded");
                engine.refresh_rows();
            }
            Err(error) => {
                tracing::debug!(feed = %url, error = %error, "Reload failure reported");
                engine.flash("cannot parse feed!", Tone::Error);
            }
        },
        AppEvent::ReloadProgress { done, total } => {
            engine.status_mut().set_progress(done, total);
            engine.refresh_rows();
        }
        AppEvent::ReloadFinished { updated, error } => {
            engine.reload_all_running = false;
            engine.status_mut().clear_progress();
            engine.refresh_rows();
            match error {
                Some(error) => {
                    tracing::warn!(updated, error = %error, "Reload all finished with an error");
                    engine.flash("cannot reload all feeds!", Tone::Error);
                }
                None => tracing::info!(updated, "Reload all finished"),
            }
        }
        AppEvent::CacheSaveFailed { error } => {
            tracing::warn!(error = %error, "Cache save failure reported");
            engine.flash("cannot save cache!", Tone::Error);
        }
    }
}
