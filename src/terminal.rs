//! Raw terminal primitives: raw mode, window size, single-byte stdin reads
//! and handing the terminal to external programs.
use crate::app::Launcher;
use crate::ui::ansi::DISABLE_MOUSE;
use crate::ui::keys::ByteSource;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    style::Print,
    terminal::{self, Clear, ClearType},
};
use std::io::{self, Write};
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How long to wait for the rest of an escape sequence before treating the
/// ESC as a key of its own.
const ESCAPE_TIMEOUT: Duration = Duration::from_millis(100);
/// Poll interval while idle, so the reader notices a pause request.
const IDLE_POLL: Duration = Duration::from_millis(100);

// ============================================================================
// Raw mode
// ============================================================================

/// Raw mode plus the terminal modes the UI expects; restored on drop.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        if let Err(e) = execute!(out, Print(DISABLE_MOUSE), EnableBracketedPaste) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        restore();
    }
}

/// Put the terminal back: cursor shown, screen and scrollback cleared,
/// bracketed paste off, raw mode off. Errors are ignored; this also runs
/// from the panic hook.
pub fn restore() {
    let mut out = io::stdout();
    let _ = execute!(
        out,
        Show,
        MoveTo(0, 0),
        Clear(ClearType::All),
        Clear(ClearType::Purge),
        DisableBracketedPaste
    );
    let _ = out.flush();
    let _ = terminal::disable_raw_mode();
}

/// `(columns, rows)`.
pub fn window_size() -> io::Result<(usize, usize)> {
    let (cols, rows) = terminal::size()?;
    Ok((usize::from(cols), usize::from(rows)))
}

// ============================================================================
// Stdin
// ============================================================================

/// Hands stdin over to an external program.
///
/// The key thread holds `reading` for each poll and read. Pausing sets the
/// flag and then takes the same lock, so a poll already in flight finishes
/// before the program starts and its pending input is left unread.
#[derive(Debug, Default)]
pub struct StdinPause {
    paused: AtomicBool,
    reading: Mutex<()>,
}

impl StdinPause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Set the flag and wait for the key thread to leave stdin alone.
    fn pause(&self) -> MutexGuard<'_, ()> {
        self.paused.store(true, Ordering::Release);
        self.lock_reading()
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    fn lock_reading(&self) -> MutexGuard<'_, ()> {
        self.reading.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reads stdin one byte at a time with `poll(2)` + `read(2)`.
///
/// While paused (an external program owns the terminal) nothing is read.
pub struct StdinSource {
    pause: Arc<StdinPause>,
}

impl StdinSource {
    pub fn new(pause: Arc<StdinPause>) -> Self {
        Self { pause }
    }
}

impl ByteSource for StdinSource {
    fn read_byte(&mut self) -> io::Result<u8> {
        loop {
            if self.pause.is_paused() {
                std::thread::sleep(IDLE_POLL);
                continue;
            }
            let _reading = self.pause.lock_reading();
            // Input that arrives once paused belongs to the external program.
            if poll_stdin(IDLE_POLL)? && !self.pause.is_paused() {
                return read_one();
            }
        }
    }

    fn read_continuation(&mut self) -> io::Result<u8> {
        if poll_stdin(ESCAPE_TIMEOUT)? {
            read_one()
        } else {
            Err(io::Error::from(io::ErrorKind::TimedOut))
        }
    }
}

/// True once fd 0 has input, false if nothing arrived within `timeout`.
fn poll_stdin(timeout: Duration) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd: libc::STDIN_FILENO,
        events: libc::POLLIN,
        revents: 0,
    };
    let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

    // SAFETY: `pfd` is a single valid pollfd that outlives the call.
    let ready = unsafe { libc::poll(&mut pfd, 1, millis) };
    if ready < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ready > 0)
}

fn read_one() -> io::Result<u8> {
    let mut byte = 0u8;
    // SAFETY: reads at most one byte into a live, writable u8.
    let n = unsafe { libc::read(libc::STDIN_FILENO, (&mut byte as *mut u8).cast(), 1) };
    match n {
        1 => Ok(byte),
        0 => Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
        _ => Err(io::Error::last_os_error()),
    }
}

// ============================================================================
// External programs
// ============================================================================

/// No graphical session to open a browser in.
pub fn is_headless() -> bool {
    if cfg!(target_os = "macos") {
        return false;
    }
    let unset = |var: &str| std::env::var_os(var).map_or(true, |v| v.is_empty());
    unset("DISPLAY") && unset("WAYLAND_DISPLAY")
}

/// True if `program` is an executable file somewhere on `PATH`.
pub fn program_available(program: &str) -> bool {
    if program.contains('/') {
        return is_executable(Path::new(program));
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(program))))
        .unwrap_or(false)
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Opens links with the desktop browser (via `open`) or a text pager run in
/// the foreground.
pub struct SystemLauncher {
    pager: String,
    pause: Arc<StdinPause>,
}

impl SystemLauncher {
    pub fn new(pager: impl Into<String>, pause: Arc<StdinPause>) -> Self {
        Self {
            pager: pager.into(),
            pause,
        }
    }
}

/// Gives stdin back to the key thread even if the pager could not be started.
struct Resume<'a> {
    pause: &'a StdinPause,
    _reading: MutexGuard<'a, ()>,
}

impl Drop for Resume<'_> {
    fn drop(&mut self) {
        let mut out = io::stdout();
        let _ = terminal::enable_raw_mode();
        let _ = execute!(out, Print(DISABLE_MOUSE), EnableBracketedPaste, Hide);
        self.pause.resume();
    }
}

impl Launcher for SystemLauncher {
    fn open_in_browser(&self, url: &str) -> io::Result<()> {
        tracing::info!(url = %url, "Opening in browser");
        open::that_detached(url)
    }

    fn open_in_pager(&self, url: &str) -> io::Result<()> {
        tracing::info!(url = %url, pager = %self.pager, "Opening in pager");
        let _resume = Resume {
            pause: &self.pause,
            _reading: self.pause.pause(),
        };

        let mut out = io::stdout();
        execute!(out, DisableBracketedPaste, Show)?;
        terminal::disable_raw_mode()?;

        let status = Command::new(&self.pager).arg(url).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!("{} exited with {}", self.pager, status)))
        }
    }
}
