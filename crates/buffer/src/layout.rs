//! Line layout: the measurement service the line tree delegates to.
//!
//! The tree never measures text itself. It asks a [`TextLayout`] for the size
//! of each line and combines child sizes into group sizes with
//! [`TextLayout::add_metrics`]. [`MonospaceLayout`] is a fixed-cell
//! implementation good enough for terminals and tests.

use std::borrow::Cow;
use std::ops::Range;

use unicode_width::UnicodeWidthChar;

use crate::grapheme;
use crate::text_buffer::TextBuffer;

/// Pixel extent of a line or of a group of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };

    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Measures lines and maps points back to offsets.
///
/// `start..end` is the text of one line without its terminator, in buffer
/// offsets. Coordinates passed to [`find_offset_by_xy`](Self::find_offset_by_xy)
/// are relative to the line's top-left corner.
pub trait TextLayout {
    /// Computes the size of the line `start..end`.
    fn layout_line(&self, buffer: &TextBuffer, start: usize, end: usize) -> Size;

    /// Returns the offset within `start..end` (relative to `start`, in
    /// `[0, end - start]`) closest to the point `(x, y)`.
    fn find_offset_by_xy(
        &self,
        buffer: &TextBuffer,
        start: usize,
        end: usize,
        x: i32,
        y: i32,
    ) -> usize;

    /// Folds a child's size into its parent's accumulated size.
    ///
    /// Lines stack vertically, so the default takes the widest width and sums
    /// heights.
    fn add_metrics(&self, parent: Size, child: Size) -> Size {
        Size {
            width: parent.width.max(child.width),
            height: parent.height + child.height,
        }
    }
}

impl<T: TextLayout + ?Sized> TextLayout for Box<T> {
    fn layout_line(&self, buffer: &TextBuffer, start: usize, end: usize) -> Size {
        (**self).layout_line(buffer, start, end)
    }

    fn find_offset_by_xy(
        &self,
        buffer: &TextBuffer,
        start: usize,
        end: usize,
        x: i32,
        y: i32,
    ) -> usize {
        (**self).find_offset_by_xy(buffer, start, end, x, y)
    }

    fn add_metrics(&self, parent: Size, child: Size) -> Size {
        (**self).add_metrics(parent, child)
    }
}

/// One grapheme cluster placed on the cell grid.
#[derive(Debug, Clone)]
struct Cell {
    chars: Range<usize>,
    row: usize,
    col: usize,
    width: usize,
}

/// Fixed-cell layout with tab stops and optional soft wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonospaceLayout {
    cell_width: i32,
    line_height: i32,
    tab_width: usize,
    wrap_columns: Option<usize>,
}

impl MonospaceLayout {
    /// Creates a layout with the given cell size in pixels.
    pub fn new(cell_width: i32, line_height: i32) -> Self {
        Self {
            cell_width: cell_width.max(1),
            line_height: line_height.max(1),
            tab_width: 4,
            wrap_columns: None,
        }
    }

    /// Sets the distance between tab stops, in cells.
    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width.max(1);
        self
    }

    /// Wraps lines longer than `columns` cells onto further rows.
    pub fn with_wrap_columns(mut self, columns: usize) -> Self {
        self.wrap_columns = Some(columns.max(1));
        self
    }

    pub fn cell_width(&self) -> i32 {
        self.cell_width
    }

    pub fn line_height(&self) -> i32 {
        self.line_height
    }

    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    pub fn wrap_columns(&self) -> Option<usize> {
        self.wrap_columns
    }

    fn cluster_width(&self, chars: &[char], col: usize) -> usize {
        match chars.first() {
            Some('\t') => self.tab_width - col % self.tab_width,
            Some(&c) => UnicodeWidthChar::width(c).unwrap_or(1),
            None => 0,
        }
    }

    /// Places every cluster of `chars` on the grid.
    fn place(&self, chars: &[char]) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(chars.len());
        let (mut row, mut col) = (0, 0);
        for range in grapheme::clusters(chars) {
            let mut width = self.cluster_width(&chars[range.clone()], col);
            if let Some(limit) = self.wrap_columns {
                if col > 0 && col + width > limit {
                    row += 1;
                    col = 0;
                    width = self.cluster_width(&chars[range.clone()], col);
                }
            }
            cells.push(Cell {
                chars: range,
                row,
                col,
                width,
            });
            col += width;
        }
        cells
    }

    fn line_chars(buffer: &TextBuffer, start: usize, end: usize) -> Cow<'_, [char]> {
        debug_assert!(start <= end, "inverted line range {start}..{end}");
        buffer
            .slice(start, end.saturating_sub(start))
            .unwrap_or_default()
    }
}

impl Default for MonospaceLayout {
    /// 8x16 pixel cells, tab stops every 4 cells, no wrapping.
    fn default() -> Self {
        Self::new(8, 16)
    }
}

impl TextLayout for MonospaceLayout {
    fn layout_line(&self, buffer: &TextBuffer, start: usize, end: usize) -> Size {
        let chars = Self::line_chars(buffer, start, end);
        let cells = self.place(&chars);
        let columns = cells.iter().map(|c| c.col + c.width).max().unwrap_or(0);
        let rows = cells.last().map_or(1, |c| c.row + 1);
        Size {
            width: columns as i32 * self.cell_width,
            height: rows as i32 * self.line_height,
        }
    }

    fn find_offset_by_xy(
        &self,
        buffer: &TextBuffer,
        start: usize,
        end: usize,
        x: i32,
        y: i32,
    ) -> usize {
        let chars = Self::line_chars(buffer, start, end);
        let cells = self.place(&chars);
        let Some(last) = cells.last() else {
            return 0;
        };
        let row = usize::try_from(y.max(0) / self.line_height)
            .unwrap_or(0)
            .min(last.row);

        let mut row_end = 0;
        for cell in cells.iter().filter(|c| c.row == row) {
            // left half of a cell puts the caret before it
            let middle = (2 * cell.col + cell.width) as i32 * self.cell_width / 2;
            if x < middle {
                return cell.chars.start;
            }
            row_end = cell.chars.end;
        }
        row_end
    }
}
