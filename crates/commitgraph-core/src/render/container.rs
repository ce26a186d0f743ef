/// Vertical placement of one row inside the scrollable list content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowBounds {
    pub top: f32,
    pub height: f32,
}

impl RowBounds {
    pub fn center(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// The commit list the graph is drawn next to.
///
/// Positions are in content coordinates: row 0 starts at 0 regardless of
/// scrolling. `row_bounds` may fail for rows that are not mounted; the
/// renderer then falls back to a fixed row height.
pub trait RowContainer {
    fn row_bounds(&self, row: usize) -> Option<RowBounds>;
    fn scroll_top(&self) -> f32;
    fn viewport_height(&self) -> f32;
    fn set_scroll_top(&mut self, scroll_top: f32);
}

/// Uniform rows, every row resolvable.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedRowContainer {
    row_height: f32,
    row_count: usize,
    scroll_top: f32,
    viewport_height: f32,
}

impl FixedRowContainer {
    pub fn new(row_height: f32, row_count: usize, viewport_height: f32) -> Self {
        Self {
            row_height,
            row_count,
            scroll_top: 0.0,
            viewport_height,
        }
    }

    pub fn set_row_count(&mut self, row_count: usize) {
        self.row_count = row_count;
        self.set_scroll_top(self.scroll_top);
    }

    pub fn set_viewport_height(&mut self, viewport_height: f32) {
        self.viewport_height = viewport_height;
        self.set_scroll_top(self.scroll_top);
    }

    pub fn content_height(&self) -> f32 {
        self.row_count as f32 * self.row_height
    }

    /// Scroll so that `row` is the first visible row.
    pub fn scroll_to_row(&mut self, row: usize) {
        self.set_scroll_top(row as f32 * self.row_height);
    }
}

impl RowContainer for FixedRowContainer {
    fn row_bounds(&self, row: usize) -> Option<RowBounds> {
        (row < self.row_count).then(|| RowBounds {
            top: row as f32 * self.row_height,
            height: self.row_height,
        })
    }

    fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    fn set_scroll_top(&mut self, scroll_top: f32) {
        let max = (self.content_height() - self.viewport_height).max(0.0);
        self.scroll_top = scroll_top.clamp(0.0, max);
    }
}
