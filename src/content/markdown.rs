//! Markdown to display lines with embedded SGR styling.
//!
//! Output lines are raw text for the reflow engine: unwrapped, possibly long,
//! with `ESC[..m` sequences marking bold, italic and underline runs. Every
//! line closes its own styles, so a line never leaks style into the next.
use crate::ui::ansi::{sgr, BOLD, ITALIC, RESET, UNDERLINE};
use crate::util::strip_control_chars;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Convert markdown into styled text lines.
pub fn markdown_to_lines(md: &str) -> Vec<String> {
    let mut r = LineBuilder::default();

    for event in Parser::new(md) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                r.flush();
                r.open(|s| s.bold += 1);
            }
            Event::End(TagEnd::Heading(_)) => {
                r.close(|s| s.bold -= 1);
                r.flush();
                r.blank();
            }
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                r.flush();
                if r.list_depth == 0 {
                    r.blank();
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                r.flush();
                r.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                r.in_code_block = false;
                r.blank();
            }
            Event::Start(Tag::List(_)) => {
                r.flush();
                r.list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                r.flush();
                r.list_depth = r.list_depth.saturating_sub(1);
                if r.list_depth == 0 {
                    r.blank();
                }
            }
            Event::Start(Tag::Item) => {
                r.flush();
                let indent = "  ".repeat(r.list_depth.saturating_sub(1));
                r.current.push_str(&indent);
                r.push_visible("  • ");
            }
            Event::End(TagEnd::Item) => r.flush(),
            Event::Start(Tag::BlockQuote(_)) => r.flush(),
            Event::End(TagEnd::BlockQuote(_)) => {
                r.flush();
                r.blank();
            }
            Event::Start(Tag::Emphasis) => r.open(|s| s.italic += 1),
            Event::End(TagEnd::Emphasis) => r.close(|s| s.italic -= 1),
            Event::Start(Tag::Strong) => r.open(|s| s.bold += 1),
            Event::End(TagEnd::Strong) => r.close(|s| s.bold -= 1),
            Event::Start(Tag::Link { .. }) => r.open(|s| s.underline += 1),
            Event::End(TagEnd::Link) => r.close(|s| s.underline -= 1),
            Event::Start(Tag::Image { dest_url, .. }) => {
                r.push_visible(&format!("[Image: {}]", strip_control_chars(&dest_url)));
            }
            Event::Text(text) => {
                let text = strip_control_chars(&text);
                if r.in_code_block {
                    for line in text.lines() {
                        r.lines.push(format!("    {}", line));
                    }
                } else {
                    r.push_visible(&text);
                }
            }
            Event::Code(code) => r.push_visible(&format!("`{}`", strip_control_chars(&code))),
            Event::SoftBreak => r.push_visible(" "),
            Event::HardBreak => r.flush(),
            Event::Rule => {
                r.flush();
                r.lines.push("----".to_string());
                r.blank();
            }
            _ => {}
        }
    }

    r.flush();
    while r.lines.last().is_some_and(|l| l.is_empty()) {
        r.lines.pop();
    }
    r.lines
}

#[derive(Default)]
struct Styles {
    bold: usize,
    italic: usize,
    underline: usize,
}

impl Styles {
    fn codes(&self) -> Vec<u8> {
        let mut codes = Vec::new();
        if self.bold > 0 {
            codes.push(BOLD);
        }
        if self.italic > 0 {
            codes.push(ITALIC);
        }
        if self.underline > 0 {
            codes.push(UNDERLINE);
        }
        codes
    }
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<String>,
    current: String,
    has_text: bool,
    styles: Styles,
    list_depth: usize,
    in_code_block: bool,
}

impl LineBuilder {
    fn push_visible(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.has_text {
            let codes = self.styles.codes();
            if !codes.is_empty() {
                self.current.push_str(&sgr(&codes));
            }
        }
        self.current.push_str(text);
        self.has_text = true;
    }

    fn open(&mut self, change: impl FnOnce(&mut Styles)) {
        change(&mut self.styles);
        if self.has_text {
            self.current.push_str(&sgr(&self.styles.codes()));
        }
    }

    fn close(&mut self, change: impl FnOnce(&mut Styles)) {
        change(&mut self.styles);
        if self.has_text {
            self.current.push_str(RESET);
            let codes = self.styles.codes();
            if !codes.is_empty() {
                self.current.push_str(&sgr(&codes));
            }
        }
    }

    /// End the current line, closing any style still open on it.
    fn flush(&mut self) {
        if !self.has_text {
            self.current.clear();
            return;
        }
        let mut line = std::mem::take(&mut self.current);
        if !self.styles.codes().is_empty() {
            line.push_str(RESET);
        }
        self.lines.push(line);
        self.has_text = false;
    }

    /// Paragraph separator; never doubled.
    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }
}
