//! ANSI-aware word wrap.
//!
//! Raw lines (possibly carrying SGR sequences copied from article content)
//! become a [`Grid`] of rows no wider than the wrap width. Escape sequences
//! are copied through whole and do not count toward the width. A style still
//! open when a row is cut is closed at the end of that row and reopened at
//! the start of the next one.
use super::ansi::{is_final_byte, is_reset, ESC, RESET};

/// One screen position, or a style change applying to the cells after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Glyph(char),
    Style(String),
}

pub type Row = Vec<Cell>;
pub type Grid = Vec<Row>;

const TAB_WIDTH: usize = 4;
const WIDE_TERMINAL: usize = 100;

/// Text column geometry for a terminal width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub wrap_width: usize,
    pub margin: usize,
}

impl Layout {
    /// Full width minus one column; on terminals wider than 100 columns the
    /// text narrows to about half the width and is centered.
    pub fn for_width(width: usize) -> Self {
        let usable = width.saturating_sub(1).max(1);
        if width > WIDE_TERMINAL {
            let wrap_width = usable / 4 * 2;
            Self {
                wrap_width,
                margin: (usable - wrap_width) / 2,
            }
        } else {
            Self {
                wrap_width: usable,
                margin: 0,
            }
        }
    }
}

/// Wrap every line to the layout. Empty lines yield empty rows.
pub fn reflow<S: AsRef<str>>(lines: &[S], layout: Layout) -> Grid {
    let mut wrapper = Wrapper::new(layout);
    for line in lines {
        wrapper.line(line.as_ref());
    }
    wrapper.grid
}

/// One row per line, no wrapping. Used by the list screens, where row index
/// must equal entry index.
pub fn unwrapped<S: AsRef<str>>(lines: &[S]) -> Grid {
    lines.iter().map(|l| parse_cells(l.as_ref())).collect()
}

/// Split a line into cells without any wrapping.
pub fn parse_cells(line: &str) -> Row {
    let mut row = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ESC {
            row.push(Cell::Style(read_sequence(&mut chars)));
        } else {
            row.push(Cell::Glyph(c));
        }
    }
    row
}

/// Count of visible cells in a row.
pub fn visible_len(row: &[Cell]) -> usize {
    row.iter().filter(|c| matches!(c, Cell::Glyph(_))).count()
}

/// Visible characters only.
pub fn row_text(row: &[Cell]) -> String {
    row.iter()
        .filter_map(|c| match c {
            Cell::Glyph(ch) => Some(*ch),
            Cell::Style(_) => None,
        })
        .collect()
}

/// Styles still in effect after the given cells: everything since the last
/// reset.
pub fn open_styles(row: &[Cell]) -> Vec<String> {
    let mut open: Vec<String> = Vec::new();
    for cell in row {
        if let Cell::Style(seq) = cell {
            if is_reset(seq) {
                open.clear();
            } else if seq.ends_with('m') {
                open.push(seq.clone());
            }
        }
    }
    open
}

fn read_sequence(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut seq = String::from(ESC);
    // The byte after ESC is the introducer (`[`), never the terminator.
    if let Some(intro) = chars.next() {
        seq.push(intro);
        if intro != '[' {
            return seq;
        }
    }
    for c in chars.by_ref() {
        seq.push(c);
        if is_final_byte(c) {
            break;
        }
    }
    seq
}

struct Wrapper {
    layout: Layout,
    grid: Grid,
    row: Row,
    visible: usize,
}

impl Wrapper {
    fn new(layout: Layout) -> Self {
        Self {
            layout,
            grid: Vec::new(),
            row: Vec::new(),
            visible: 0,
        }
    }

    fn line(&mut self, line: &str) {
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                ESC => {
                    let seq = read_sequence(&mut chars);
                    self.row.push(Cell::Style(seq));
                }
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    self.end_line();
                }
                '\n' => self.end_line(),
                '\t' => {
                    for _ in 0..TAB_WIDTH {
                        self.glyph(' ');
                    }
                }
                c => self.glyph(c),
            }
        }
        self.end_line();
    }

    fn glyph(&mut self, c: char) {
        if self.visible < self.layout.wrap_width {
            self.row.push(Cell::Glyph(c));
            self.visible += 1;
            return;
        }

        // Row is full.
        if !self.has_text_before(self.row.len()) {
            // Only indentation so far: drop it rather than emit a blank row.
            self.row.retain(|cell| matches!(cell, Cell::Style(_)));
            self.visible = 0;
        } else if c == ' ' {
            self.break_row(Vec::new());
            return;
        } else if self.ends_with_space() {
            self.break_row(Vec::new());
        } else {
            match self.last_space() {
                Some(idx) if self.has_text_before(idx) => {
                    let tail = self.row.split_off(idx + 1);
                    self.row.truncate(idx);
                    self.break_row(tail);
                }
                // A single word wider than the row: hard split.
                _ => self.break_row(Vec::new()),
            }
        }

        self.row.push(Cell::Glyph(c));
        self.visible += 1;
    }

    fn ends_with_space(&self) -> bool {
        self.row
            .iter()
            .rev()
            .find(|c| matches!(c, Cell::Glyph(_)))
            .is_some_and(|c| *c == Cell::Glyph(' '))
    }

    fn has_text_before(&self, end: usize) -> bool {
        self.row[..end]
            .iter()
            .any(|c| matches!(c, Cell::Glyph(g) if *g != ' '))
    }

    fn last_space(&self) -> Option<usize> {
        self.row.iter().rposition(|c| *c == Cell::Glyph(' '))
    }

    /// Emit the current row at a wrap point and start the continuation with
    /// the reopened styles followed by `tail`.
    fn break_row(&mut self, tail: Row) {
        while self.row.last() == Some(&Cell::Glyph(' ')) {
            self.row.pop();
        }
        let open = open_styles(&self.row);
        self.emit(&open);

        self.row = open.into_iter().map(Cell::Style).collect();
        self.visible = visible_len(&tail);
        self.row.extend(tail);
    }

    /// Source line finished: emit whatever is pending, even if empty.
    fn end_line(&mut self) {
        let open = open_styles(&self.row);
        self.emit(&open);
        self.row = Vec::new();
        self.visible = 0;
    }

    fn emit(&mut self, open: &[String]) {
        let mut row = std::mem::take(&mut self.row);
        if !open.is_empty() {
            row.push(Cell::Style(RESET.to_string()));
        }
        if self.layout.margin > 0 && visible_len(&row) > 0 {
            let mut padded: Row = std::iter::repeat(Cell::Glyph(' '))
                .take(self.layout.margin)
                .collect();
            padded.extend(row);
            row = padded;
        }
        self.grid.push(row);
    }
}
