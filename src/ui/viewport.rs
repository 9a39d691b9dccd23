//! Cursor and scroll window over the active screen's grid.
//!
//! `window_start` and `window_end` are inclusive 0-based grid indices;
//! `cursor_row` and `cursor_col` are 1-based and relative to the window.
//! Every movement takes the current grid length and content height and
//! clamps before and after moving, so a stale viewport can never index
//! past the grid.

/// The three logical screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    FeedList,
    ArticleList,
    ArticleText,
}

impl Screen {
    /// Free-scrolling screens have no selectable row.
    pub fn has_selection(self) -> bool {
        !matches!(self, Screen::ArticleText)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    pub screen: Screen,
    pub cursor_row: usize,
    pub cursor_col: usize,
    pub window_start: usize,
    pub window_end: usize,
}

impl Viewport {
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            cursor_row: 1,
            cursor_col: 1,
            window_start: 0,
            window_end: 0,
        }
    }

    /// Grid index of the cursor row.
    pub fn absolute_row(&self) -> usize {
        self.window_start + self.cursor_row - 1
    }

    /// Rows currently visible.
    pub fn visible_rows(&self, grid_len: usize) -> usize {
        if grid_len == 0 {
            0
        } else {
            self.window_end - self.window_start + 1
        }
    }

    /// Recompute `window_end` and pull the cursor back inside the window.
    ///
    /// `window_start` only moves when it points past the end of the grid
    /// (content shrank under it).
    pub fn clamp(&mut self, grid_len: usize, height: usize) {
        let height = height.max(1);
        if grid_len == 0 {
            self.window_start = 0;
            self.window_end = 0;
            self.cursor_row = 1;
            return;
        }
        if self.window_start >= grid_len {
            self.window_start = grid_len.saturating_sub(height);
        }
        self.window_end = (self.window_start + height).min(grid_len) - 1;
        let visible = self.window_end - self.window_start + 1;
        self.cursor_row = self.cursor_row.clamp(1, visible);
    }

    /// Terminal height changed. Keeps `window_start`.
    pub fn resize(&mut self, grid_len: usize, height: usize) {
        self.clamp(grid_len, height);
    }

    pub fn move_down(&mut self, grid_len: usize, height: usize) {
        self.clamp(grid_len, height);
        if grid_len == 0 {
            return;
        }
        let last = grid_len - 1;
        if !self.screen.has_selection() {
            if self.window_end < last {
                self.slide(1, grid_len, height);
            }
            return;
        }
        if self.absolute_row() >= last {
            return;
        }
        if self.cursor_row < self.visible_rows(grid_len) {
            self.cursor_row += 1;
        } else {
            self.slide(1, grid_len, height);
        }
    }

    pub fn move_up(&mut self, grid_len: usize, height: usize) {
        self.clamp(grid_len, height);
        if !self.screen.has_selection() {
            if self.window_start > 0 {
                self.slide(-1, grid_len, height);
            }
            return;
        }
        if self.cursor_row > 1 {
            self.cursor_row -= 1;
        } else if self.window_start > 0 {
            self.slide(-1, grid_len, height);
        }
    }

    /// Jump one window forward, cursor on the bottom row of the new window.
    pub fn page_down(&mut self, grid_len: usize, height: usize) {
        self.clamp(grid_len, height);
        if grid_len == 0 {
            return;
        }
        let height = height.max(1);
        let max_start = grid_len.saturating_sub(height);
        self.window_start = (self.window_start + height).min(max_start);
        self.clamp(grid_len, height);
        self.cursor_row = self.visible_rows(grid_len);
    }

    /// Jump one window back, cursor on the top row of the new window.
    pub fn page_up(&mut self, grid_len: usize, height: usize) {
        self.window_start = self.window_start.saturating_sub(height.max(1));
        self.cursor_row = 1;
        self.clamp(grid_len, height);
    }

    pub fn jump_start(&mut self, grid_len: usize, height: usize) {
        self.window_start = 0;
        self.cursor_row = 1;
        self.clamp(grid_len, height);
    }

    pub fn jump_end(&mut self, grid_len: usize, height: usize) {
        self.window_start = grid_len.saturating_sub(height.max(1));
        self.clamp(grid_len, height);
        self.cursor_row = self.visible_rows(grid_len).max(1);
    }

    /// Place the cursor on a grid index, scrolling only if it is outside the
    /// window.
    pub fn select(&mut self, index: usize, grid_len: usize, height: usize) {
        if grid_len == 0 {
            self.clamp(grid_len, height);
            return;
        }
        let height = height.max(1);
        let index = index.min(grid_len - 1);
        if index < self.window_start {
            self.window_start = index;
        } else if index >= self.window_start + height {
            self.window_start = index + 1 - height;
        }
        self.clamp(grid_len, height);
        self.cursor_row = index - self.window_start + 1;
    }

    fn slide(&mut self, delta: isize, grid_len: usize, height: usize) {
        self.window_start = self.window_start.saturating_add_signed(delta);
        self.clamp(grid_len, height);
    }
}

/// Saved positions for "go back".
#[derive(Debug, Default)]
pub struct PositionStack {
    saved: Vec<Viewport>,
}

impl PositionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, viewport: Viewport) {
        self.saved.push(viewport);
    }

    /// Most recent saved position, or the default position for `screen` when
    /// nothing was saved.
    pub fn pop_or_default(&mut self, screen: Screen) -> Viewport {
        self.saved.pop().unwrap_or_else(|| Viewport::new(screen))
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn clear(&mut self) {
        self.saved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> Viewport {
        Viewport::new(Screen::FeedList)
    }

    #[test]
    fn test_clamp_short_grid() {
        let mut vp = list();
        vp.cursor_row = 7;
        vp.clamp(3, 10);
        assert_eq!((vp.window_start, vp.window_end, vp.cursor_row), (0, 2, 3));
    }

    #[test]
    fn test_clamp_empty_grid() {
        let mut vp = list();
        vp.window_start = 4;
        vp.clamp(0, 10);
        assert_eq!((vp.window_start, vp.window_end, vp.cursor_row), (0, 0, 1));
        assert_eq!(vp.visible_rows(0), 0);
    }

    #[test]
    fn test_move_down_moves_cursor_then_slides() {
        let mut vp = list();
        for _ in 0..2 {
            vp.move_down(10, 3);
        }
        assert_eq!((vp.cursor_row, vp.window_start), (3, 0));

        vp.move_down(10, 3);
        assert_eq!((vp.cursor_row, vp.window_start, vp.window_end), (3, 1, 3));
        assert_eq!(vp.absolute_row(), 3);
    }

    #[test]
    fn test_move_down_stops_at_last_row() {
        let mut vp = list();
        for _ in 0..20 {
            vp.move_down(5, 3);
        }
        assert_eq!(vp.absolute_row(), 4);
        assert_eq!((vp.window_start, vp.window_end), (2, 4));
    }

    #[test]
    fn test_move_up_slides_at_top_edge() {
        let mut vp = list();
        vp.window_start = 4;
        vp.move_up(10, 3);
        assert_eq!((vp.cursor_row, vp.window_start), (1, 3));
        vp.window_start = 0;
        vp.move_up(10, 3);
        assert_eq!((vp.cursor_row, vp.window_start), (1, 0));
    }

    #[test]
    fn test_text_screen_always_slides() {
        let mut vp = Viewport::new(Screen::ArticleText);
        vp.move_down(10, 3);
        assert_eq!((vp.cursor_row, vp.window_start), (1, 1));
        vp.move_up(10, 3);
        assert_eq!((vp.cursor_row, vp.window_start), (1, 0));

        for _ in 0..20 {
            vp.move_down(10, 3);
        }
        assert_eq!((vp.window_start, vp.window_end), (7, 9));
    }

    #[test]
    fn test_page_down_and_up() {
        let mut vp = list();
        vp.page_down(10, 4);
        assert_eq!((vp.window_start, vp.window_end, vp.cursor_row), (4, 7, 4));

        vp.page_down(10, 4);
        assert_eq!((vp.window_start, vp.window_end, vp.cursor_row), (6, 9, 4));
        assert_eq!(vp.absolute_row(), 9);

        vp.page_up(10, 4);
        assert_eq!((vp.window_start, vp.cursor_row), (2, 1));
        vp.page_up(10, 4);
        assert_eq!((vp.window_start, vp.cursor_row), (0, 1));
    }

    #[test]
    fn test_page_down_on_short_grid_selects_last() {
        let mut vp = list();
        vp.page_down(3, 10);
        assert_eq!((vp.window_start, vp.cursor_row), (0, 3));
    }

    #[test]
    fn test_jump_start_and_end() {
        let mut vp = list();
        vp.jump_end(10, 4);
        assert_eq!((vp.window_start, vp.absolute_row()), (6, 9));
        vp.jump_start(10, 4);
        assert_eq!((vp.window_start, vp.absolute_row()), (0, 0));
    }

    #[test]
    fn test_resize_keeps_window_start() {
        let mut vp = list();
        vp.window_start = 5;
        vp.cursor_row = 6;
        vp.clamp(20, 8);
        assert_eq!(vp.window_end, 12);

        vp.resize(20, 3);
        assert_eq!((vp.window_start, vp.window_end, vp.cursor_row), (5, 7, 3));
    }

    #[test]
    fn test_select_scrolls_into_view() {
        let mut vp = list();
        vp.select(8, 10, 4);
        assert_eq!(vp.absolute_row(), 8);
        assert!(vp.window_start <= 8 && 8 <= vp.window_end);

        vp.select(1, 10, 4);
        assert_eq!(vp.absolute_row(), 1);
        assert_eq!(vp.window_start, 1);
    }

    #[test]
    fn test_stack_pop_restores_saved() {
        let mut stack = PositionStack::new();
        let mut vp = list();
        vp.window_start = 3;
        vp.cursor_row = 2;
        stack.push(vp.clone());

        assert_eq!(stack.pop_or_default(Screen::FeedList), vp);
        assert_eq!(
            stack.pop_or_default(Screen::FeedList),
            Viewport::new(Screen::FeedList)
        );
    }
}
