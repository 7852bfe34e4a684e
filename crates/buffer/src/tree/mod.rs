//! TextTree indexes a [`TextBuffer`] by line.
//!
//! Lines are the leaves of a balanced multiway tree. Every group holds between
//! [`MIN_CHILDREN`] and [`MAX_CHILDREN`] children (the root may hold fewer) and
//! caches the character count, line count and layout size of its subtree, so
//! lookups by offset, line number or vertical position descend from the root
//! in O(log n).
//!
//! Edits go through [`TextTree::insert`] and [`TextTree::remove`], which change
//! the buffer and then patch the affected lines: newlines in inserted text
//! split a line, removals that cross terminators join lines. Callers that edit
//! [`TextTree::buffer_mut`] directly report the edit with
//! [`TextTree::insertion_update`] or [`TextTree::removal_update`].
//!
//! # Example
//!
//! ```
//! use textbox_buffer::{MonospaceLayout, TextTree};
//!
//! let mut tree = TextTree::new(MonospaceLayout::default());
//! tree.insert(0, "ab\r\ncd\nef").unwrap();
//! assert_eq!(tree.line_count(), 3);
//! assert_eq!(tree.char_count(), 8);
//!
//! let (line, start) = tree.line_by_offset(4).unwrap();
//! assert_eq!(start, 3);
//! assert_eq!(tree.line_text(line).unwrap(), "cd");
//! ```

mod group;
mod line;
mod node;

pub use node::{LineId, MAX_CHILDREN, MIN_CHILDREN};

use crate::arena::Arena;
use crate::error::{Result, TextError};
use crate::grapheme;
use crate::layout::{MonospaceLayout, Size, TextLayout};
use crate::marks::{Gravity, MarkId};
use crate::text_buffer::TextBuffer;
use crate::types::Position;

use node::{Node, NodeId, NodeKind};

/// A text buffer together with its line index, layout and selection.
#[derive(Debug)]
pub struct TextTree<L = MonospaceLayout> {
    buffer: TextBuffer,
    layout: L,
    nodes: Arena<Node>,
    root: NodeId,
    /// Where the caret is; the moving end of the selection.
    caret: MarkId,
    /// The fixed end of the selection.
    anchor: MarkId,
    /// Mutations so far; invariants are checked at powers of two (debug
    /// builds only).
    #[cfg(debug_assertions)]
    debug_mutation_count: u64,
}

impl<L: TextLayout> TextTree<L> {
    /// Creates an empty document: one empty line.
    pub fn new(layout: L) -> Self {
        let mut buffer = TextBuffer::new();
        let start = buffer.mark_at(0, Gravity::Left);
        let end = buffer.mark_at(0, Gravity::Right);
        let caret = buffer.mark_at(0, Gravity::Right);
        let anchor = buffer.mark_at(0, Gravity::Right);

        let mut nodes = Arena::new();
        let line = nodes.insert(Node::line(start, end, 1));
        let root = nodes.insert(Node::group(1));

        let mut tree = TextTree {
            buffer,
            layout,
            nodes,
            root,
            caret,
            anchor,
            #[cfg(debug_assertions)]
            debug_mutation_count: 0,
        };
        tree.insert_children(root, 0, &[line]);
        tree.update_metrics(true);
        tree
    }

    /// Creates a document holding `text`, with the caret at the start.
    pub fn with_text(layout: L, text: &str) -> Self {
        let mut tree = Self::new(layout);
        let inserted = tree.buffer.insert(0, text).unwrap_or_default();
        tree.apply_insertion(0, inserted);
        tree.update_metrics(false);
        tree.select(0, 0);
        tree
    }

    // ==================== Accessors ====================

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Direct buffer access. Edits made here must be reported with
    /// [`insertion_update`](Self::insertion_update) or
    /// [`removal_update`](Self::removal_update) before the next query.
    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    /// Replaces the layout and measures every line again.
    pub fn set_layout(&mut self, layout: L) {
        self.layout = layout;
        self.update_metrics(true);
    }

    /// Characters in the document, not counting the sentinel terminator.
    pub fn char_count(&self) -> usize {
        self.nodes[self.root].char_count - 1
    }

    /// Lines in the document; at least 1.
    pub fn line_count(&self) -> usize {
        self.nodes[self.root].line_count
    }

    /// Size of the whole document as of the last metrics update.
    pub fn total_size(&self) -> Size {
        self.nodes[self.root].size
    }

    /// The whole document as a string.
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    // ==================== Mutations ====================

    /// Inserts `text` at `offset` and returns the number of characters
    /// inserted after newline normalization.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<usize> {
        let inserted = self.buffer.insert(offset, text)?;
        self.apply_insertion(offset, inserted);
        self.finish_edit();
        Ok(inserted)
    }

    /// Inserts one character at `offset`.
    pub fn insert_char(&mut self, offset: usize, ch: char) -> Result<()> {
        self.buffer.insert_char(offset, ch)?;
        self.apply_insertion(offset, 1);
        self.finish_edit();
        Ok(())
    }

    /// Removes `length` characters at `offset`.
    pub fn remove(&mut self, offset: usize, length: usize) -> Result<()> {
        self.buffer.remove(offset, length)?;
        self.apply_removal(offset, length);
        self.finish_edit();
        Ok(())
    }

    /// Removes all text, leaving one empty line.
    pub fn clear(&mut self) {
        let count = self.char_count();
        self.buffer
            .remove(0, count)
            .expect("whole-document range is always valid");
        self.apply_removal(0, count);
        self.finish_edit();
    }

    /// Replaces all text.
    pub fn set_text(&mut self, text: &str) {
        self.clear();
        let inserted = self.buffer.insert(0, text).unwrap_or_default();
        self.apply_insertion(0, inserted);
        self.finish_edit();
    }

    /// Reports that `length` characters were inserted into the buffer at
    /// `offset` through [`buffer_mut`](Self::buffer_mut).
    pub fn insertion_update(&mut self, offset: usize, length: usize) -> Result<()> {
        let known = self.char_count();
        if offset > known {
            return Err(TextError::OffsetOutOfRange {
                offset,
                limit: known,
            });
        }
        if known.checked_add(length) != Some(self.buffer.char_count()) {
            return Err(TextError::LengthOutOfRange {
                offset,
                length,
                limit: self.buffer.char_count(),
            });
        }
        self.apply_insertion(offset, length);
        self.finish_edit();
        Ok(())
    }

    /// Reports that `length` characters were removed from the buffer at
    /// `offset` through [`buffer_mut`](Self::buffer_mut).
    pub fn removal_update(&mut self, offset: usize, length: usize) -> Result<()> {
        let known = self.char_count();
        match offset.checked_add(length) {
            Some(end) if end <= known && known - length == self.buffer.char_count() => {}
            _ => {
                return Err(TextError::LengthOutOfRange {
                    offset,
                    length,
                    limit: known,
                })
            }
        }
        self.apply_removal(offset, length);
        self.finish_edit();
        Ok(())
    }

    /// Registers a mark in the underlying buffer.
    pub fn mark_position(&mut self, offset: usize, gravity: Gravity) -> Result<MarkId> {
        self.buffer.mark_position(offset, gravity)
    }

    fn finish_edit(&mut self) {
        self.update_metrics(false);
        self.debug_check();
    }

    #[cfg(debug_assertions)]
    fn debug_check(&mut self) {
        self.debug_mutation_count += 1;
        if !self.debug_mutation_count.is_power_of_two() {
            return;
        }
        if let Err(err) = self.check_invariants() {
            panic!("after mutation {}: {err}", self.debug_mutation_count);
        }
    }

    #[cfg(not(debug_assertions))]
    fn debug_check(&mut self) {}

    // ==================== Queries ====================

    /// Returns the line containing `offset` and the offset that line starts
    /// at. `offset` may equal [`char_count`](Self::char_count).
    pub fn line_by_offset(&self, offset: usize) -> Result<(LineId, usize)> {
        let limit = self.char_count();
        if offset > limit {
            return Err(TextError::OffsetOutOfRange { offset, limit });
        }
        let (line, start) = self.locate(offset);
        Ok((LineId(line), start))
    }

    /// Returns line number `number` (0-indexed).
    pub fn line_by_number(&self, number: usize) -> Result<LineId> {
        let count = self.line_count();
        if number >= count {
            return Err(TextError::LineOutOfRange {
                line: number,
                count,
            });
        }
        Ok(LineId(self.locate_number(number)))
    }

    /// Returns the line at vertical position `y` and that line's top.
    ///
    /// Positions above the document resolve to the first line, positions
    /// below it to the last.
    pub fn line_by_y(&self, y: i32) -> (LineId, i32) {
        let (line, top) = self.locate_y(y);
        (LineId(line), top)
    }

    /// Returns the offset closest to the point `(x, y)`.
    ///
    /// Points above the document map to 0 and points below it to
    /// [`char_count`](Self::char_count).
    pub fn offset_by_xy(&self, x: i32, y: i32) -> usize {
        if y < 0 {
            return 0;
        }
        if y >= self.total_size().height {
            return self.char_count();
        }
        let (line, top) = self.locate_y(y);
        let (start, end) = self.line_span(line);
        let within = self
            .layout
            .find_offset_by_xy(&self.buffer, start, end, x, y - top);
        start + within.min(end - start)
    }

    // ==================== Lines ====================

    pub fn first_line(&self) -> LineId {
        LineId(self.first_leaf())
    }

    pub fn last_line(&self) -> LineId {
        LineId(self.last_leaf())
    }

    /// Iterates over all lines in document order.
    pub fn lines(&self) -> Lines<'_, L> {
        Lines {
            tree: self,
            next: Some(self.first_leaf()),
        }
    }

    pub fn next_line(&self, line: LineId) -> Result<Option<LineId>> {
        self.line_node(line)?;
        Ok(self.next_leaf(line.0).map(LineId))
    }

    pub fn prev_line(&self, line: LineId) -> Result<Option<LineId>> {
        self.line_node(line)?;
        Ok(self.prev_leaf(line.0).map(LineId))
    }

    /// 0-indexed number of `line`.
    pub fn line_number(&self, line: LineId) -> Result<usize> {
        self.line_node(line)?;
        Ok(self.sum_before(line.0, |node| node.line_count))
    }

    /// Offset of the first character of `line`.
    pub fn line_start(&self, line: LineId) -> Result<usize> {
        self.line_node(line)?;
        Ok(self.line_span(line.0).0)
    }

    /// Offset of the terminator of `line`.
    pub fn line_end(&self, line: LineId) -> Result<usize> {
        self.line_node(line)?;
        Ok(self.line_span(line.0).1)
    }

    /// Characters in `line`, terminator excluded.
    pub fn line_len(&self, line: LineId) -> Result<usize> {
        self.line_node(line)?;
        let (start, end) = self.line_span(line.0);
        Ok(end - start)
    }

    /// Top of `line` in document coordinates.
    pub fn line_y(&self, line: LineId) -> Result<i32> {
        self.line_node(line)?;
        Ok(self.sum_before(line.0, |node| node.size.height))
    }

    pub fn line_size(&self, line: LineId) -> Result<Size> {
        Ok(self.line_node(line)?.size)
    }

    /// Text of `line` without its terminator.
    pub fn line_text(&self, line: LineId) -> Result<String> {
        self.line_node(line)?;
        let (start, end) = self.line_span(line.0);
        self.buffer.text(start, end - start)
    }

    // ==================== Positions ====================

    /// Converts an offset to (line, column).
    pub fn position_of(&self, offset: usize) -> Result<Position> {
        let (line, start) = self.line_by_offset(offset)?;
        Ok(Position::new(self.line_number(line)?, offset - start))
    }

    /// Converts (line, column) to an offset, clamping the column to the line.
    pub fn offset_of(&self, position: Position) -> Result<usize> {
        let line = self.line_by_number(position.line)?;
        let (start, end) = self.line_span(line.0);
        Ok(start + position.col.min(end - start))
    }

    /// The caret stop before `offset`. Stays out of grapheme clusters; from the
    /// start of a line it steps onto the previous line's terminator.
    pub fn prev_grapheme_boundary(&self, offset: usize) -> Result<usize> {
        let (line, start) = self.line_by_offset(offset)?;
        if offset == start {
            return Ok(offset.saturating_sub(1));
        }
        let chars = self.buffer.slice(start, self.line_len(line)?)?;
        Ok(start + grapheme::grapheme_boundary_left(&chars, offset - start))
    }

    /// The caret stop after `offset`. Stays out of grapheme clusters; from the
    /// end of a line it steps over the terminator to the next line.
    pub fn next_grapheme_boundary(&self, offset: usize) -> Result<usize> {
        let (line, start) = self.line_by_offset(offset)?;
        let len = self.line_len(line)?;
        if offset - start >= len {
            return Ok((offset + 1).min(self.char_count()));
        }
        let chars = self.buffer.slice(start, len)?;
        Ok(start + grapheme::grapheme_boundary_right(&chars, offset - start))
    }

    // ==================== Selection ====================

    /// Offset of the caret.
    pub fn caret(&self) -> usize {
        self.buffer.live_offset(self.caret)
    }

    /// Offset of the fixed end of the selection.
    pub fn selection_anchor(&self) -> usize {
        self.buffer.live_offset(self.anchor)
    }

    pub fn selection_start(&self) -> usize {
        self.caret().min(self.selection_anchor())
    }

    pub fn selection_length(&self) -> usize {
        self.caret().abs_diff(self.selection_anchor())
    }

    /// Moves the caret, extending the selection from the anchor.
    pub fn set_caret(&mut self, offset: usize) -> Result<()> {
        self.buffer.move_mark(self.caret, offset)
    }

    /// Selects `length` characters from `start`, clamped to the document.
    /// The caret ends up at the end of the selection.
    pub fn select(&mut self, start: usize, length: usize) {
        let count = self.char_count();
        let start = start.min(count);
        let end = start.saturating_add(length).min(count);
        self.buffer.place_mark(self.anchor, start);
        self.buffer.place_mark(self.caret, end);
    }

    /// Moves the selection to start at `start`, keeping its length where the
    /// document allows.
    pub fn set_selection_start(&mut self, start: usize) {
        self.select(start, self.selection_length());
    }

    pub fn set_selection_length(&mut self, length: usize) {
        self.select(self.selection_start(), length);
    }

    pub fn selected_text(&self) -> String {
        self.buffer
            .text(self.selection_start(), self.selection_length())
            .unwrap_or_default()
    }

    // ==================== Validation ====================

    /// Verifies the structural invariants of the tree against the buffer.
    pub fn check_invariants(&self) -> Result<()> {
        let root = self
            .nodes
            .get(self.root)
            .ok_or_else(|| corrupted("root is dangling"))?;
        if root.parent.is_some() {
            return Err(corrupted("root has a parent"));
        }
        if root.is_line() {
            return Err(corrupted("root is a line"));
        }
        let fan_out = root.children().len();
        if fan_out == 0 || fan_out > MAX_CHILDREN {
            return Err(corrupted(format!("root has {fan_out} children")));
        }

        let mut next_start = 0;
        self.check_node(self.root, true, &mut next_start)?;

        let expected = self.buffer.char_count() + 1;
        if next_start != expected || root.char_count != expected {
            return Err(corrupted(format!(
                "lines cover {next_start} chars and root counts {}, buffer holds {expected}",
                root.char_count
            )));
        }
        if !self.buffer.marks_consistent() {
            return Err(corrupted("mark lists out of order"));
        }
        if self.buffer.is_mark_deleted(self.caret) || self.buffer.is_mark_deleted(self.anchor) {
            return Err(corrupted("selection mark deleted"));
        }
        Ok(())
    }

    fn check_node(&self, id: NodeId, is_root: bool, next_start: &mut usize) -> Result<()> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| corrupted("dangling child"))?;
        match &node.kind {
            NodeKind::Line { start, end } => {
                let start = self.buffer.mark_offset(*start)?;
                let end = self.buffer.mark_offset(*end)?;
                if start != *next_start || end < start {
                    return Err(corrupted(format!(
                        "line {start}..={end} does not follow {next_start}"
                    )));
                }
                if node.char_count != end - start + 1 || node.line_count != 1 {
                    return Err(corrupted(format!(
                        "line {start}..={end} counts {} chars",
                        node.char_count
                    )));
                }
                if self.buffer.char_at(end) != Some('\n') {
                    return Err(corrupted(format!("line ending at {end} has no terminator")));
                }
                if (start..end).any(|p| self.buffer.char_at(p) == Some('\n')) {
                    return Err(corrupted(format!("line {start}..={end} holds a newline")));
                }
                *next_start = end + 1;
            }
            NodeKind::Group { children } => {
                if !is_root && !(MIN_CHILDREN..=MAX_CHILDREN).contains(&children.len()) {
                    return Err(corrupted(format!(
                        "group at level {} has {} children",
                        node.level,
                        children.len()
                    )));
                }
                let (mut chars, mut lines) = (0, 0);
                for &child_id in children {
                    let child = self
                        .nodes
                        .get(child_id)
                        .ok_or_else(|| corrupted("dangling child"))?;
                    if child.parent != Some(id) {
                        return Err(corrupted("child does not point back to its parent"));
                    }
                    if child.level + 1 != node.level {
                        return Err(corrupted(format!(
                            "level {} child under level {} group",
                            child.level, node.level
                        )));
                    }
                    if node.valid && !child.valid {
                        return Err(corrupted("valid group has an invalid child"));
                    }
                    chars += child.char_count;
                    lines += child.line_count;
                    self.check_node(child_id, false, next_start)?;
                }
                if chars != node.char_count || lines != node.line_count {
                    return Err(corrupted(format!(
                        "group counts {}/{} but children sum to {chars}/{lines}",
                        node.char_count, node.line_count
                    )));
                }
            }
        }
        Ok(())
    }

    /// Depth of the tree, counting the line level. Exposed for diagnostics.
    pub fn height(&self) -> u32 {
        self.nodes[self.root].level + 1
    }

    /// Number of children of the root group.
    pub fn root_fan_out(&self) -> usize {
        self.nodes[self.root].children().len()
    }
}

fn corrupted(message: impl Into<String>) -> TextError {
    TextError::Corrupted(message.into())
}

impl<L: TextLayout + Default> Default for TextTree<L> {
    fn default() -> Self {
        Self::new(L::default())
    }
}

/// Iterator over the lines of a [`TextTree`], in document order.
pub struct Lines<'a, L> {
    tree: &'a TextTree<L>,
    next: Option<NodeId>,
}

impl<L: TextLayout> Iterator for Lines<'_, L> {
    type Item = LineId;

    fn next(&mut self) -> Option<LineId> {
        let id = self.next?;
        self.next = self.tree.next_leaf(id);
        Some(LineId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree(text: &str) -> TextTree {
        TextTree::with_text(MonospaceLayout::default(), text)
    }

    fn line_texts(tree: &TextTree) -> Vec<String> {
        tree.lines().map(|l| tree.line_text(l).unwrap()).collect()
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_empty_tree_has_one_line() {
        let t = TextTree::new(MonospaceLayout::default());
        assert_eq!(t.char_count(), 0);
        assert_eq!(t.line_count(), 1);
        assert_eq!(t.total_size(), Size::new(0, 16));
        assert_eq!(t.height(), 2);
        t.check_invariants().unwrap();
    }

    #[test]
    fn test_with_text() {
        let t = tree("one\ntwo\r\nthree");
        assert_eq!(line_texts(&t), vec!["one", "two", "three"]);
        assert_eq!(t.char_count(), 13);
        assert_eq!(t.caret(), 0);
        t.check_invariants().unwrap();
    }

    // ==================== Insertion Tests ====================

    #[test]
    fn test_insert_without_newline_grows_line() {
        let mut t = tree("ab\ncd");
        t.insert(4, "XY").unwrap();
        assert_eq!(line_texts(&t), vec!["ab", "cXYd"]);
        assert_eq!(t.total_size(), Size::new(32, 32));
        t.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_at_line_start_stays_in_line() {
        let mut t = tree("ab\ncd");
        t.insert(3, "x").unwrap();
        assert_eq!(line_texts(&t), vec!["ab", "xcd"]);
        t.insert(2, "y").unwrap();
        assert_eq!(line_texts(&t), vec!["aby", "xcd"]);
        t.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_newline_at_end_creates_empty_line() {
        let mut t = tree("ab");
        t.insert(2, "\n").unwrap();
        assert_eq!(line_texts(&t), vec!["ab", ""]);
        assert_eq!(t.line_count(), 2);
        t.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_many_lines_splits_groups() {
        let mut t = TextTree::new(MonospaceLayout::default());
        let text: String = (0..200).map(|i| format!("{i}\n")).collect();
        t.insert(0, &text).unwrap();
        assert_eq!(t.line_count(), 201);
        assert!(t.height() >= 3);
        assert!(t.root_fan_out() <= MAX_CHILDREN);
        t.check_invariants().unwrap();
        for k in [0, 57, 199] {
            let line = t.line_by_number(k).unwrap();
            assert_eq!(t.line_text(line).unwrap(), k.to_string());
        }
    }

    // ==================== Removal Tests ====================

    #[test]
    fn test_remove_within_line() {
        let mut t = tree("hello\nworld");
        t.remove(1, 3).unwrap();
        assert_eq!(line_texts(&t), vec!["ho", "world"]);
        t.check_invariants().unwrap();
    }

    #[test]
    fn test_remove_across_many_lines() {
        let text: String = (0..100).map(|i| format!("line{i}\n")).collect();
        let mut t = tree(&text);
        let start = t.offset_of(Position::new(3, 2)).unwrap();
        let end = t.offset_of(Position::new(90, 1)).unwrap();
        t.remove(start, end - start).unwrap();
        assert_eq!(t.line_count(), 101 - 87);
        let line = t.line_by_number(3).unwrap();
        assert_eq!(t.line_text(line).unwrap(), "liine90");
        t.check_invariants().unwrap();
    }

    #[test]
    fn test_remove_everything_collapses_tree() {
        let text: String = (0..500).map(|i| format!("{i}\n")).collect();
        let mut t = tree(&text);
        assert!(t.height() >= 3);
        t.clear();
        assert_eq!(t.char_count(), 0);
        assert_eq!(t.line_count(), 1);
        assert_eq!(t.height(), 2);
        t.check_invariants().unwrap();
    }

    #[test]
    fn test_removed_line_handle_goes_stale() {
        let mut t = tree("a\nb\nc");
        let second = t.line_by_number(1).unwrap();
        t.remove(1, 1).unwrap();
        assert_eq!(t.line_text(second), Err(TextError::StaleLine));
        assert_eq!(t.line_count(), 2);
    }

    // ==================== Query Tests ====================

    #[test]
    fn test_line_by_offset_boundaries() {
        let t = tree("ab\ncd");
        let (first, start) = t.line_by_offset(2).unwrap();
        assert_eq!((t.line_number(first).unwrap(), start), (0, 0));
        let (second, start) = t.line_by_offset(3).unwrap();
        assert_eq!((t.line_number(second).unwrap(), start), (1, 3));
        let (last, _) = t.line_by_offset(5).unwrap();
        assert_eq!(last, second);
        assert!(t.line_by_offset(6).is_err());
    }

    #[test]
    fn test_line_by_y_clamps() {
        let t = tree("a\nb\nc");
        assert_eq!(t.line_by_y(-10), (t.first_line(), 0));
        assert_eq!(t.line_by_y(20).1, 16);
        assert_eq!(t.line_by_y(1000), (t.last_line(), 32));
    }

    #[test]
    fn test_offset_by_xy() {
        let t = tree("hello\nworld");
        assert_eq!(t.offset_by_xy(0, -1), 0);
        assert_eq!(t.offset_by_xy(17, 20), 8);
        assert_eq!(t.offset_by_xy(1000, 0), 5);
        assert_eq!(t.offset_by_xy(0, 32), 11);
    }

    #[test]
    fn test_line_y_and_size() {
        let t = tree("a\nbbbb\nc");
        let second = t.line_by_number(1).unwrap();
        assert_eq!(t.line_y(second), Ok(16));
        assert_eq!(t.line_size(second), Ok(Size::new(32, 16)));
        assert_eq!(t.total_size(), Size::new(32, 48));
    }

    #[test]
    fn test_next_and_prev_line() {
        let t = tree("a\nb");
        let first = t.first_line();
        let second = t.next_line(first).unwrap().unwrap();
        assert_eq!(t.next_line(second), Ok(None));
        assert_eq!(t.prev_line(second), Ok(Some(first)));
        assert_eq!(t.prev_line(first), Ok(None));
    }

    #[test]
    fn test_position_round_trip() {
        let t = tree("ab\ncde\n");
        assert_eq!(t.position_of(4), Ok(Position::new(1, 1)));
        assert_eq!(t.position_of(7), Ok(Position::new(2, 0)));
        assert_eq!(t.offset_of(Position::new(1, 99)), Ok(6));
        assert!(t.offset_of(Position::new(3, 0)).is_err());
    }

    // ==================== Layout Tests ====================

    #[test]
    fn test_set_layout_remeasures() {
        let mut t = tree("abc\nde");
        t.set_layout(MonospaceLayout::new(10, 20));
        assert_eq!(t.total_size(), Size::new(30, 40));
    }

    // ==================== Selection Tests ====================

    #[test]
    fn test_selection_clamps() {
        let mut t = tree("hello world");
        t.select(6, 100);
        assert_eq!(t.selection_start(), 6);
        assert_eq!(t.selection_length(), 5);
        assert_eq!(t.selected_text(), "world");

        t.set_selection_start(20);
        assert_eq!((t.selection_start(), t.selection_length()), (11, 0));

        t.set_selection_start(2);
        t.set_selection_length(3);
        assert_eq!(t.selected_text(), "llo");
    }

    #[test]
    fn test_selection_follows_edits() {
        let mut t = tree("hello world");
        t.select(6, 5);
        t.insert(0, ">> ").unwrap();
        assert_eq!(t.selected_text(), "world");
        t.remove(0, 9).unwrap();
        assert_eq!(t.selection_start(), 0);
        assert_eq!(t.selected_text(), "world");
    }

    #[test]
    fn test_set_caret_extends_selection() {
        let mut t = tree("abcdef");
        t.select(1, 0);
        t.set_caret(4).unwrap();
        assert_eq!(t.selected_text(), "bcd");
        t.set_caret(0).unwrap();
        assert_eq!(t.selected_text(), "a");
        assert!(t.set_caret(7).is_err());
    }

    // ==================== Caret Movement Tests ====================

    #[test]
    fn test_grapheme_caret_steps() {
        let t = tree("ae\u{0301}\nb");
        assert_eq!(t.next_grapheme_boundary(1), Ok(3));
        assert_eq!(t.next_grapheme_boundary(3), Ok(4));
        assert_eq!(t.prev_grapheme_boundary(3), Ok(1));
        assert_eq!(t.prev_grapheme_boundary(4), Ok(3));
        assert_eq!(t.prev_grapheme_boundary(0), Ok(0));
        assert_eq!(t.next_grapheme_boundary(5), Ok(5));
    }

    // ==================== Buffer Update Tests ====================

    #[test]
    fn test_external_edit_reporting() {
        let mut t = tree("ab");
        t.buffer_mut().insert(1, "x\ny").unwrap();
        t.insertion_update(1, 3).unwrap();
        assert_eq!(line_texts(&t), vec!["ax", "yb"]);

        t.buffer_mut().remove(1, 2).unwrap();
        t.removal_update(1, 2).unwrap();
        assert_eq!(line_texts(&t), vec!["ayb"]);
        t.check_invariants().unwrap();
    }

    #[test]
    fn test_mismatched_update_is_rejected() {
        let mut t = tree("ab");
        assert!(t.insertion_update(0, 5).is_err());
        assert!(t.removal_update(1, 1).is_err());
        assert_eq!(t.text(), "ab");
        t.check_invariants().unwrap();
    }
}
