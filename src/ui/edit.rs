//! Single-line editor used to type a new feed URL in the bottom bar.
//!
//! Columns are in view coordinates: 1-based, relative to the visible slice
//! that starts at `offset`. The raw operations report `false` instead of
//! failing when a column is out of bounds; callers only move the caret when
//! the operation succeeded.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    chars: Vec<char>,
    view_cursor: usize,
    offset: usize,
}

impl Default for EditBuffer {
    fn default() -> Self {
        Self {
            chars: Vec::new(),
            view_cursor: 1,
            offset: 0,
        }
    }
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Caret column inside the visible slice (1-based).
    pub fn view_cursor(&self) -> usize {
        self.view_cursor
    }

    /// Index of the first visible character.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn index(&self, at: usize) -> Option<usize> {
        (at + self.offset).checked_sub(1)
    }

    /// Insert `c` before view column `at`. Appending at `len + 1` is allowed.
    pub fn insert(&mut self, c: char, at: usize) -> bool {
        match self.index(at) {
            Some(i) if i <= self.chars.len() => {
                self.chars.insert(i, c);
                true
            }
            _ => false,
        }
    }

    /// Remove the character under view column `at`.
    pub fn delete(&mut self, at: usize) -> bool {
        match self.index(at) {
            Some(i) if i < self.chars.len() => {
                self.chars.remove(i);
                true
            }
            _ => false,
        }
    }

    pub fn cursor_left(&mut self) {
        if self.view_cursor > 1 {
            self.view_cursor -= 1;
        } else if self.offset > 0 {
            self.offset -= 1;
        }
    }

    /// Move right, scrolling when the caret sits on the last visible column.
    /// The caret may rest one past the last character.
    pub fn cursor_right(&mut self, width: usize) {
        let caret = self.offset + self.view_cursor - 1;
        if caret >= self.chars.len() {
            return;
        }
        if self.view_cursor < width.max(1) {
            self.view_cursor += 1;
        } else {
            self.offset += 1;
        }
    }

    pub fn home(&mut self) {
        self.view_cursor = 1;
        self.offset = 0;
    }

    pub fn end(&mut self, width: usize) {
        let width = width.max(1);
        let caret_col = self.chars.len() + 1;
        if caret_col <= width {
            self.offset = 0;
            self.view_cursor = caret_col;
        } else {
            self.offset = caret_col - width;
            self.view_cursor = width;
        }
    }

    /// Insert at the caret and step past the new character.
    pub fn type_char(&mut self, c: char, width: usize) -> bool {
        let inserted = self.insert(c, self.view_cursor);
        if inserted {
            self.cursor_right(width);
        }
        inserted
    }

    /// Delete the character left of the caret.
    pub fn backspace(&mut self) -> bool {
        let deleted = self.delete(self.view_cursor - 1);
        if deleted {
            if self.offset > 0 {
                self.offset -= 1;
            } else {
                self.view_cursor -= 1;
            }
        }
        deleted
    }

    /// Delete the character under the caret.
    pub fn delete_at_caret(&mut self) -> bool {
        self.delete(self.view_cursor)
    }

    pub fn visible_text(&self, width: usize) -> String {
        let start = self.offset.min(self.chars.len());
        let end = (self.offset + width).min(self.chars.len());
        self.chars[start..end].iter().collect()
    }

    pub fn full_text(&self) -> String {
        self.chars.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(s: &str, width: usize) -> EditBuffer {
        let mut buf = EditBuffer::new();
        for c in s.chars() {
            assert!(buf.type_char(c, width));
        }
        buf
    }

    #[test]
    fn test_typing_advances_caret() {
        let buf = typed("abc", 10);
        assert_eq!(buf.full_text(), "abc");
        assert_eq!(buf.view_cursor(), 4);
        assert_eq!(buf.offset(), 0);
    }

    #[test]
    fn test_typing_past_width_scrolls() {
        let buf = typed("abcdefgh", 5);
        assert_eq!(buf.view_cursor(), 5);
        assert_eq!(buf.offset(), 4);
        assert_eq!(buf.visible_text(5), "efgh");
        assert!(buf.offset() <= buf.view_cursor() + buf.offset() - 1);
    }

    #[test]
    fn test_insert_out_of_bounds_is_noop() {
        let mut buf = typed("ab", 10);
        assert!(!buf.insert('x', 5));
        assert!(!buf.insert('x', 0));
        assert_eq!(buf.full_text(), "ab");
        assert!(buf.insert('x', 3));
        assert_eq!(buf.full_text(), "abx");
    }

    #[test]
    fn test_delete_out_of_bounds_is_noop() {
        let mut buf = typed("ab", 10);
        assert!(!buf.delete(0));
        assert!(!buf.delete(3));
        assert!(buf.delete(1));
        assert_eq!(buf.full_text(), "b");
    }

    #[test]
    fn test_insert_then_delete_restores_state() {
        let mut buf = typed("https://example", 8);
        buf.cursor_left();
        buf.cursor_left();
        let before = buf.clone();

        let at = buf.view_cursor();
        assert!(buf.insert('z', at));
        assert!(buf.delete(at));
        assert_eq!(buf, before);
    }

    #[test]
    fn test_backspace_at_start_is_noop() {
        let mut buf = EditBuffer::new();
        assert!(!buf.backspace());
        assert_eq!(buf.view_cursor(), 1);
    }

    #[test]
    fn test_backspace_retreats_offset_first() {
        let mut buf = typed("abcdefgh", 5);
        assert!(buf.backspace());
        assert_eq!(buf.full_text(), "abcdefg");
        assert_eq!(buf.offset(), 3);
        assert_eq!(buf.view_cursor(), 5);
        assert_eq!(buf.visible_text(5), "defg");
    }

    #[test]
    fn test_backspace_without_offset_moves_caret() {
        let mut buf = typed("abc", 10);
        assert!(buf.backspace());
        assert_eq!(buf.full_text(), "ab");
        assert_eq!(buf.view_cursor(), 3);
    }

    #[test]
    fn test_cursor_moves_stay_in_bounds() {
        let mut buf = typed("abc", 10);
        buf.cursor_right(10);
        assert_eq!(buf.view_cursor(), 4, "caret stops one past the end");

        for _ in 0..10 {
            buf.cursor_left();
        }
        assert_eq!(buf.view_cursor(), 1);
        assert_eq!(buf.offset(), 0);
    }

    #[test]
    fn test_cursor_left_scrolls_back() {
        let mut buf = typed("abcdefgh", 5);
        for _ in 0..5 {
            buf.cursor_left();
        }
        assert_eq!(buf.view_cursor(), 1);
        assert_eq!(buf.offset(), 3);
    }

    #[test]
    fn test_home_and_end() {
        let mut buf = typed("abcdefgh", 5);
        buf.home();
        assert_eq!((buf.view_cursor(), buf.offset()), (1, 0));
        assert_eq!(buf.visible_text(5), "abcde");

        buf.end(5);
        assert_eq!((buf.view_cursor(), buf.offset()), (5, 4));

        let mut short = typed("ab", 5);
        short.home();
        short.end(5);
        assert_eq!((short.view_cursor(), short.offset()), (3, 0));
    }

    #[test]
    fn test_delete_at_caret() {
        let mut buf = typed("abc", 10);
        buf.home();
        assert!(buf.delete_at_caret());
        assert_eq!(buf.full_text(), "bc");
        buf.end(10);
        assert!(!buf.delete_at_caret());
    }

    #[test]
    fn test_multibyte_runes() {
        let mut buf = typed("héllo", 10);
        buf.home();
        buf.cursor_right(10);
        assert!(buf.delete_at_caret());
        assert_eq!(buf.full_text(), "hllo");
    }
}
