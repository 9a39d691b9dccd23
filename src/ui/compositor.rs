//! Paints one full frame into a byte buffer.
//!
//! Layout, top to bottom: top bar, rule, content window, rule, bottom bar.
//! The whole frame is queued into one writer and flushed by the caller in a
//! single write, so a slow terminal never shows half a frame.
use super::ansi::{is_reset, sgr, FG_GREEN, FG_RED, RESET, REVERSE};
use super::reflow::{Cell, Row};
use super::status::Tone;
use crate::app::{APP_NAME, APP_VERSION};
use crate::util::{pad_left, pad_right, rune_count, truncate_runes};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::borrow::Cow;
use std::io::{self, Write};

/// Rows taken by the bars and rules.
pub const CHROME_ROWS: usize = 4;

/// Below this width the top bar shows only the application name.
const NARROW_TERMINAL: usize = 50;

/// Everything needed to paint one frame.
#[derive(Debug)]
pub struct Frame<'a> {
    pub width: usize,
    pub height: usize,
    /// Context shown after the application name (feed / article).
    pub title: &'a str,
    /// Visible slice of the grid.
    pub rows: &'a [Row],
    /// Index into `rows` drawn in reverse video.
    pub highlight: Option<usize>,
    pub bottom_left: Cow<'a, str>,
    pub tone: Tone,
    pub bottom_right: String,
    /// Edit caret column (1-based) inside the bottom bar, while editing.
    pub caret: Option<usize>,
    /// Content cursor row (1-based, relative to the window).
    pub cursor_row: usize,
}

impl Frame<'_> {
    pub fn content_height(&self) -> usize {
        self.height.saturating_sub(CHROME_ROWS).max(1)
    }
}

pub fn render<W: Write>(frame: &Frame<'_>, out: &mut W) -> io::Result<()> {
    let width = frame.width.max(1);

    queue!(
        out,
        Hide,
        MoveTo(0, 0),
        Clear(ClearType::All),
        Clear(ClearType::Purge)
    )?;

    queue!(out, Print(top_bar(frame.title, width)), Print("\r\n"))?;
    queue!(out, Print("-".repeat(width)), Print("\r\n"))?;

    let content_height = frame.content_height();
    for (i, row) in frame.rows.iter().take(content_height).enumerate() {
        let line = render_row(row, width, frame.highlight == Some(i));
        queue!(out, Print(line), Print("\r\n"))?;
    }
    for _ in frame.rows.len().min(content_height)..content_height {
        queue!(out, Print("\r\n"))?;
    }

    queue!(out, Print("-".repeat(width)), Print("\r\n"))?;
    queue!(
        out,
        Print(bottom_bar(&frame.bottom_left, frame.tone, &frame.bottom_right, width))
    )?;

    match frame.caret {
        Some(col) => queue!(
            out,
            MoveTo(to_u16(col.saturating_sub(1)), to_u16(frame.height.saturating_sub(1))),
            Show
        )?,
        None => queue!(out, MoveTo(0, to_u16(frame.cursor_row + 1)))?,
    }
    Ok(())
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn top_bar(title: &str, width: usize) -> String {
    let left = if width < NARROW_TERMINAL || title.is_empty() {
        APP_NAME.to_string()
    } else {
        format!("{} {}", APP_NAME, title)
    };
    let version_len = rune_count(APP_VERSION);
    let field = width.saturating_sub(version_len);
    let left = truncate_runes(&left, field);
    let mut bar = format!("{}{}", sgr(&[REVERSE]), pad_right(&left, field));
    if width > version_len {
        bar.push_str(APP_VERSION);
    }
    bar.push_str(RESET);
    bar
}

/// Left and right text when both fit, right-aligned right text when only
/// it fits, otherwise a blank bar.
pub fn bar_text(left: &str, right: &str, width: usize) -> String {
    let right_len = rune_count(right);
    if width > rune_count(left) + right_len {
        format!("{}{}", pad_right(left, width - right_len), right)
    } else if right_len <= width {
        pad_left(right, width)
    } else {
        " ".repeat(width)
    }
}

fn bottom_bar(left: &str, tone: Tone, right: &str, width: usize) -> String {
    let mut codes = vec![REVERSE];
    match tone {
        Tone::Info => {}
        Tone::Success => codes.push(FG_GREEN),
        Tone::Error => codes.push(FG_RED),
    }
    format!("{}{}{}", sgr(&codes), bar_text(left, right, width), RESET)
}

/// One content row, truncated to `width` visible cells. A highlighted row
/// keeps reverse video across resets embedded in the row.
pub fn render_row(row: &Row, width: usize, highlight: bool) -> String {
    let reverse = sgr(&[REVERSE]);
    let mut line = String::new();
    let mut styled = false;
    if highlight {
        line.push_str(&reverse);
    }

    let mut visible = 0;
    for cell in row {
        match cell {
            Cell::Glyph(c) => {
                if visible == width {
                    tracing::debug!(width, "Row wider than terminal, truncated");
                    break;
                }
                line.push(*c);
                visible += 1;
            }
            Cell::Style(seq) => {
                line.push_str(seq);
                styled = true;
                if highlight && is_reset(seq) {
                    line.push_str(&reverse);
                }
            }
        }
    }

    if highlight {
        // Extend the bar to the full width.
        line.extend(std::iter::repeat(' ').take(width - visible));
    }
    if highlight || styled {
        line.push_str(RESET);
    }
    line
}
