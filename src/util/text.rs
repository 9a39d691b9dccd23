use std::borrow::Cow;

/// Number of runes in `s`.
///
/// The UI measures everything in runes: no grapheme clustering and no
/// double-width handling.
pub fn rune_count(s: &str) -> usize {
    s.chars().count()
}

/// Keep at most `max` runes of `s`.
///
/// Returns `Cow::Borrowed` when `s` already fits.
pub fn truncate_runes(s: &str, max: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => Cow::Owned(s[..byte_idx].to_string()),
        None => Cow::Borrowed(s),
    }
}

/// Left-align `s` in a field of `width` runes, padding with spaces.
pub fn pad_right(s: &str, width: usize) -> String {
    let len = rune_count(s);
    let mut out = String::with_capacity(s.len() + width.saturating_sub(len));
    out.push_str(s);
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(len)));
    out
}

/// Right-align `s` in a field of `width` runes, padding with spaces.
pub fn pad_left(s: &str, width: usize) -> String {
    let len = rune_count(s);
    let mut out = String::with_capacity(s.len() + width.saturating_sub(len));
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(len)));
    out.push_str(s);
    out
}

/// Sanitize feed-supplied text for a single display row.
///
/// Control characters and escape sequences are removed, then runs of
/// whitespace (including newlines and tabs) collapse to one space.
pub fn single_line(s: &str) -> String {
    strip_control_chars(s)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip terminal control characters and ANSI escape sequences from text.
///
/// Removes characters that could manipulate terminal behavior when rendering
/// feed-supplied text (titles, names).
///
/// Strips:
/// - ASCII control chars: 0x00-0x08, 0x0B-0x0C, 0x0E-0x1F, 0x7F
/// - ANSI CSI sequences: `\x1b[` ... (terminal byte 0x40-0x7E)
/// - ANSI OSC sequences: `\x1b]` ... (until BEL 0x07 or ST `\x1b\\`)
/// - Bare ESC (0x1b) not followed by `[` or `]`
///
/// Preserves: tab (0x09), newline (0x0A), carriage return (0x0D).
///
/// Returns `Cow::Borrowed` when the input contains no control characters.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let len = bytes.len();

    if !bytes.iter().any(|&b| is_stripped(b)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        let b = bytes[i];

        if b == 0x1b {
            match bytes.get(i + 1) {
                Some(b'[') => {
                    i += 2;
                    while i < len {
                        let c = bytes[i];
                        i += 1;
                        if (0x40..=0x7e).contains(&c) {
                            break;
                        }
                    }
                }
                Some(b']') => {
                    i += 2;
                    while i < len {
                        if bytes[i] == 0x07 {
                            i += 1;
                            break;
                        }
                        if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                            i += 2;
                            break;
                        }
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        } else if is_stripped(b) {
            i += 1;
        } else {
            let start = i;
            i += 1;
            while i < len && !is_stripped(bytes[i]) {
                i += 1;
            }
            // Only ASCII bytes end a run, so the slice is on a char boundary.
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}

fn is_stripped(b: u8) -> bool {
    b == 0x1b || b == 0x7f || (b < 0x20 && b != 0x09 && b != 0x0a && b != 0x0d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rune_count_counts_chars_not_bytes() {
        assert_eq!(rune_count("héllo"), 5);
        assert_eq!(rune_count("日本語"), 3);
        assert_eq!(rune_count(""), 0);
    }

    #[test]
    fn test_truncate_runes() {
        assert_eq!(truncate_runes("Hello World", 5), "Hello");
        assert_eq!(truncate_runes("日本語テスト", 2), "日本");
        assert!(matches!(truncate_runes("Short", 10), Cow::Borrowed(_)));
        assert_eq!(truncate_runes("abc", 0), "");
    }

    #[test]
    fn test_padding() {
        assert_eq!(pad_right("ab", 5), "ab   ");
        assert_eq!(pad_left("ab", 5), "   ab");
        assert_eq!(pad_right("abcdef", 3), "abcdef");
        assert_eq!(pad_left("é", 3), "  é");
    }

    #[test]
    fn test_single_line_collapses_whitespace() {
        assert_eq!(single_line("  Breaking\n\tnews\x07 today  "), "Breaking news today");
    }

    #[test]
    fn test_strip_clean_text_returns_borrowed() {
        let input = "Hello, world! This is clean text.";
        let result = strip_control_chars(input);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, input);
    }

    #[test]
    fn test_strip_control_chars_removes_controls() {
        let input = "he\x00ll\x07o\x08 w\x0bor\x0cld\x01!";
        assert_eq!(strip_control_chars(input), "hello world!");
    }

    #[test]
    fn test_strip_ansi_sequences() {
        assert_eq!(strip_control_chars("\x1b[31mRed text\x1b[0m"), "Red text");
        assert_eq!(strip_control_chars("before\x1b[2Aafter"), "beforeafter");
        assert_eq!(strip_control_chars("before\x1bafter"), "beforeafter");
    }

    #[test]
    fn test_strip_osc_terminators() {
        assert_eq!(
            strip_control_chars("\x1b]0;malicious title\x07safe text"),
            "safe text"
        );
        assert_eq!(
            strip_control_chars("\x1b]0;malicious title\x1b\\safe text"),
            "safe text"
        );
    }

    #[test]
    fn test_strip_unicode_preserved() {
        let input = "日本語 \x1b[31m赤い\x1b[0m テキスト";
        assert_eq!(strip_control_chars(input), "日本語 赤い テキスト");
    }
}
