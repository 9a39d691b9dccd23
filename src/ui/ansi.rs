//! ANSI escape sequence vocabulary shared by the reflow engine, the
//! compositor and the markdown renderer.

pub const ESC: char = '\x1b';

/// SGR reset. `ESC[m` is accepted as an alias when parsing.
pub const RESET: &str = "\x1b[0m";

pub const BOLD: u8 = 1;
pub const ITALIC: u8 = 3;
pub const UNDERLINE: u8 = 4;
pub const REVERSE: u8 = 7;
pub const FG_RED: u8 = 31;
pub const FG_GREEN: u8 = 32;

/// Terminal setup strings without a crossterm command.
pub const DISABLE_MOUSE: &str = "\x1b[?1000l\x1b[?1002l\x1b[?1003l\x1b[?1006l";

/// Build an SGR sequence from attribute codes: `sgr(&[1, 4])` is `ESC[1;4m`.
pub fn sgr(codes: &[u8]) -> String {
    let params: Vec<String> = codes.iter().map(u8::to_string).collect();
    format!("\x1b[{}m", params.join(";"))
}

/// Wrap `text` in the given attributes followed by a reset.
pub fn styled(text: &str, codes: &[u8]) -> String {
    format!("{}{}{}", sgr(codes), text, RESET)
}

/// SGR-terminating letter: `@`, `A..=Z` or `a..=z`.
pub fn is_final_byte(c: char) -> bool {
    matches!(c, '\x40'..='\x5a' | '\x61'..='\x7a')
}

/// True for `ESC[0m` and `ESC[m`.
pub fn is_reset(seq: &str) -> bool {
    seq == RESET || seq == "\x1b[m"
}
