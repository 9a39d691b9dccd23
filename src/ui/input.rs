//! Key dispatch.
//!
//! One flag decides the route: while the edit buffer is open every key goes
//! to the editor, otherwise keys drive navigation and commands on the active
//! screen.
use super::display::{DisplayEngine, Motion};
use super::keys::{ctrl, Key};
use super::status::Tone;
use super::viewport::Screen;
use super::Action;
use crate::util::validate_url_for_open;
use std::time::Duration;

/// Launcher errors are shown briefly.
const LAUNCH_ERROR_FLASH: Duration = Duration::from_secs(1);

/// Characters allowed in a typed URL besides letters and digits.
const URL_RESERVED: &str = ";,/?:@&=+$-_.!~*'()#";

pub fn is_url_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || URL_RESERVED.as_bytes().contains(&b)
}

pub async fn handle_key(engine: &mut DisplayEngine, key: Key) -> Action {
    if engine.is_editing() {
        handle_editing(engine, key).await;
        Action::Continue
    } else {
        handle_reading(engine, key).await
    }
}

async fn handle_reading(engine: &mut DisplayEngine, key: Key) -> Action {
    let screen = engine.screen();
    match key {
        Key::Byte(b'q') => return Action::Quit,
        Key::Byte(b) if b == ctrl(b'q') => return Action::Quit,

        Key::Byte(b'r') if screen != Screen::ArticleText => engine.reload_current(),
        Key::Byte(b'R') if screen == Screen::FeedList => engine.reload_all(),
        Key::Byte(b'a') if screen == Screen::FeedList => engine.start_editing(),

        Key::Byte(b'o') if screen == Screen::ArticleList => {
            if engine.capabilities().headless {
                tracing::debug!("No browser in a headless session");
            } else {
                launch(engine, Launch::Browser);
            }
        }
        Key::Byte(b'l') if screen == Screen::ArticleList => {
            if engine.capabilities().pager {
                launch(engine, Launch::Pager);
            } else {
                tracing::debug!("Pager not installed");
            }
        }

        Key::ArrowUp => engine.scroll(Motion::Up),
        Key::ArrowDown => engine.scroll(Motion::Down),
        Key::PageUp => engine.scroll(Motion::PageUp),
        Key::PageDown => engine.scroll(Motion::PageDown),
        Key::Home => engine.scroll(Motion::Start),
        Key::End => engine.scroll(Motion::End),

        Key::Enter => engine.enter().await,
        Key::Backspace => engine.back(),

        other => tracing::debug!(key = ?other, screen = ?screen, "Unhandled key"),
    }
    Action::Continue
}

async fn handle_editing(engine: &mut DisplayEngine, key: Key) {
    let width = engine.edit_width();
    match key {
        Key::Enter => engine.commit_new_feed().await,
        Key::Quit => engine.abort_editing(),
        Key::Null => tracing::debug!("Paste marker"),
        key => {
            let Some(buf) = engine.edit_mut() else {
                return;
            };
            match key {
                Key::ArrowLeft => buf.cursor_left(),
                Key::ArrowRight => buf.cursor_right(width),
                Key::Home => buf.home(),
                Key::End => buf.end(width),
                Key::Backspace => {
                    buf.backspace();
                }
                Key::Delete => {
                    buf.delete_at_caret();
                }
                Key::Byte(b) if is_url_char(b) => {
                    buf.type_char(char::from(b), width);
                }
                other => tracing::debug!(key = ?other, "Unhandled key while editing"),
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Launch {
    Browser,
    Pager,
}

fn launch(engine: &mut DisplayEngine, target: Launch) {
    let Some(url) = engine.selected_url().map(str::to_owned) else {
        return;
    };
    if let Err(e) = validate_url_for_open(&url) {
        tracing::warn!(url = %url, error = %e, "Refusing to open article link");
        engine.flash_for(e.to_string(), Tone::Error, LAUNCH_ERROR_FLASH);
        return;
    }

    let launcher = engine.launcher();
    let result = match target {
        Launch::Browser => launcher.open_in_browser(&url),
        Launch::Pager => launcher.open_in_pager(&url),
    };
    if let Err(e) = result {
        tracing::warn!(url = %url, target = ?target, error = %e, "Failed to open article");
        engine.flash_for(e.to_string(), Tone::Error, LAUNCH_ERROR_FLASH);
    }
}
