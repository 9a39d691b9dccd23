//! Main event loop for the TUI.
//!
//! Keys are decoded on a dedicated blocking thread and forwarded over a
//! channel; the loop multiplexes them with OS signals and background task
//! events and repaints once per iteration.

use crate::app::AppEvent;
use crate::terminal::{self, RawModeGuard, StdinPause, StdinSource};
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use super::compositor::render;
use super::display::DisplayEngine;
use super::events::handle_app_event;
use super::input::handle_key;
use super::keys::{Key, KeyDecoder};

const KEY_CHANNEL_CAPACITY: usize = 64;

/// Result of handling a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// Run the UI until the user quits, stdin closes or a termination signal
/// arrives.
///
/// `pause` is shared with the launcher: while paused, the key thread leaves
/// stdin to an external program.
///
/// # Panic Safety
///
/// Installs a panic hook that restores the terminal before the default hook
/// prints, so a panic never leaves the terminal in raw mode.
pub async fn run(
    engine: &mut DisplayEngine,
    mut event_rx: mpsc::Receiver<AppEvent>,
    pause: Arc<StdinPause>,
) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        terminal::restore();
        original_hook(panic_info);
    }));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigquit = signal(SignalKind::quit())?;
    let mut sigwinch = signal(SignalKind::window_change())?;

    let _guard = RawModeGuard::enter().context("Failed to enter raw mode")?;

    let (cols, rows) = terminal::window_size().context("Failed to query window size")?;
    engine.set_window_size(cols, rows);

    let (key_tx, mut key_rx) = mpsc::channel::<Key>(KEY_CHANNEL_CAPACITY);
    spawn_key_reader(key_tx, pause).context("Failed to start key reader")?;

    let mut stdout = io::stdout();
    loop {
        // Apply everything already queued so a burst of keys cannot starve
        // background results.
        while let Ok(event) = event_rx.try_recv() {
            handle_app_event(engine, event);
        }

        paint(engine, &mut stdout)?;

        tokio::select! {
            biased;

            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, shutting down");
                break;
            }
            _ = sighup.recv() => {
                tracing::info!("Received SIGHUP, shutting down");
                break;
            }
            _ = sigquit.recv() => {
                tracing::info!("Received SIGQUIT, shutting down");
                break;
            }

            _ = sigwinch.recv() => {
                match terminal::window_size() {
                    Ok((cols, rows)) => engine.set_window_size(cols, rows),
                    Err(e) => tracing::warn!(error = %e, "Cannot read new window size"),
                }
            }

            maybe_key = key_rx.recv() => {
                match maybe_key {
                    Some(key) => {
                        if handle_key(engine, key).await == Action::Quit {
                            tracing::info!("Quit requested");
                            break;
                        }
                    }
                    None => {
                        tracing::info!("Input closed, shutting down");
                        break;
                    }
                }
            }

            Some(event) = event_rx.recv() => {
                handle_app_event(engine, event);
            }
        }
    }

    Ok(())
}

fn paint(engine: &mut DisplayEngine, stdout: &mut io::Stdout) -> Result<()> {
    let mut buf = Vec::with_capacity(16 * 1024);
    render(&engine.frame(), &mut buf)?;
    stdout.write_all(&buf)?;
    stdout.flush()?;
    Ok(())
}

fn spawn_key_reader(tx: mpsc::Sender<Key>, pause: Arc<StdinPause>) -> io::Result<()> {
    std::thread::Builder::new()
        .name("skiff-keys".to_string())
        .spawn(move || {
            let mut decoder = KeyDecoder::new(StdinSource::new(pause));
            loop {
                match decoder.next_key() {
                    Ok(key) => {
                        if tx.blocking_send(key).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::info!(error = %e, "Key reader stopped");
                        break;
                    }
                }
            }
        })?;
    Ok(())
}
