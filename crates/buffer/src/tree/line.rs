//! Line leaves: keeping them in step with buffer edits, and locating them.
//!
//! A line is a pair of marks. The start mark has left gravity and sits on the
//! line's first character; the end mark has right gravity and sits on its
//! terminating newline. Text typed at the very start of a line therefore stays
//! in that line, and text typed before a terminator extends the line.

use tracing::{debug, trace};

use super::node::{LineId, Node, NodeId};
use super::TextTree;
use crate::error::{Result, TextError};
use crate::layout::TextLayout;
use crate::marks::Gravity;

impl<L: TextLayout> TextTree<L> {
    /// Resolves a line handle, failing if its line was removed.
    pub(super) fn line_node(&self, line: LineId) -> Result<&Node> {
        match self.nodes.get(line.0) {
            Some(node) if node.is_line() => Ok(node),
            _ => Err(TextError::StaleLine),
        }
    }

    /// `(start, end)` offsets of a line; `end` is its terminator.
    pub(super) fn line_span(&self, id: NodeId) -> (usize, usize) {
        let (start, end) = self.nodes[id].marks();
        (self.buffer.live_offset(start), self.buffer.live_offset(end))
    }

    /// Characters in a line according to its marks, terminator included.
    fn measure_line(&self, id: NodeId) -> usize {
        let (start, end) = self.line_span(id);
        end - start + 1
    }

    // ==================== Lookup ====================

    /// Finds the line containing `offset` and the offset it starts at.
    ///
    /// Uses the node counts rather than the marks, so while an edit is being
    /// applied this still answers for the text as it was before the edit.
    pub(super) fn locate(&self, offset: usize) -> (NodeId, usize) {
        let mut id = self.root;
        let mut start = 0;
        while !self.nodes[id].is_line() {
            let mut next = None;
            for &child in self.nodes[id].children() {
                let count = self.nodes[child].char_count;
                if offset < start + count {
                    next = Some(child);
                    break;
                }
                start += count;
            }
            id = next.expect("offset beyond the end of the tree");
        }
        (id, start)
    }

    /// Finds line number `number`, which must be below the line count.
    pub(super) fn locate_number(&self, number: usize) -> NodeId {
        let mut id = self.root;
        let mut before = 0;
        while !self.nodes[id].is_line() {
            let mut next = None;
            for &child in self.nodes[id].children() {
                let count = self.nodes[child].line_count;
                if number < before + count {
                    next = Some(child);
                    break;
                }
                before += count;
            }
            id = next.expect("line number beyond the end of the tree");
        }
        id
    }

    /// Finds the line covering `y`, clamping to the first and last lines.
    /// Returns the line and its top.
    pub(super) fn locate_y(&self, y: i32) -> (NodeId, i32) {
        let mut id = self.root;
        let mut top = 0;
        while !self.nodes[id].is_line() {
            let children = self.nodes[id].children();
            let (last, init) = children.split_last().expect("empty group");
            let mut next = *last;
            for &child in init {
                let height = self.nodes[child].size.height;
                if y < top + height {
                    next = child;
                    break;
                }
                top += height;
            }
            id = next;
        }
        (id, top)
    }

    pub(super) fn first_leaf(&self) -> NodeId {
        let mut id = self.root;
        while let Some(&first) = self.nodes[id].children().first() {
            id = first;
        }
        id
    }

    pub(super) fn last_leaf(&self) -> NodeId {
        let mut id = self.root;
        while let Some(&last) = self.nodes[id].children().last() {
            id = last;
        }
        id
    }

    /// The line after `id` in document order.
    pub(super) fn next_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.nodes[current].parent?;
            let siblings = self.nodes[parent].children();
            let index = self.child_index(parent, current);
            if let Some(&next) = siblings.get(index + 1) {
                let mut node = next;
                while let Some(&first) = self.nodes[node].children().first() {
                    node = first;
                }
                return Some(node);
            }
            current = parent;
        }
    }

    /// The line before `id` in document order.
    pub(super) fn prev_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.nodes[current].parent?;
            let index = self.child_index(parent, current);
            if index > 0 {
                let mut node = self.nodes[parent].children()[index - 1];
                while let Some(&last) = self.nodes[node].children().last() {
                    node = last;
                }
                return Some(node);
            }
            current = parent;
        }
    }

    /// Sums `measure` over everything before `id` in document order.
    pub(super) fn sum_before<T>(&self, id: NodeId, measure: impl Fn(&Node) -> T) -> T
    where
        T: Default + std::ops::AddAssign,
    {
        let mut total = T::default();
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            let index = self.child_index(parent, current);
            for &sibling in &self.nodes[parent].children()[..index] {
                total += measure(&self.nodes[sibling]);
            }
            current = parent;
        }
        total
    }

    // ==================== Edit updates ====================

    /// Brings the lines up to date after `length` characters were inserted at
    /// `offset`.
    pub(super) fn apply_insertion(&mut self, offset: usize, length: usize) {
        if length == 0 {
            return;
        }
        let (line, _) = self.locate(offset);
        let breaks: Vec<usize> = (offset..offset + length)
            .filter(|&p| self.buffer.char_at(p) == Some('\n'))
            .collect();

        let Some((&first_break, _)) = breaks.split_first() else {
            self.add_counts(line, length as isize, 0);
            self.invalidate(line);
            trace!(offset, length, "extended line");
            return;
        };

        let old_count = self.nodes[line].char_count;
        let (_, old_end) = self.nodes[line].marks();
        let end = self.buffer.mark_at(first_break, Gravity::Right);
        self.nodes[line].set_end_mark(end);

        let mut new_lines = Vec::with_capacity(breaks.len());
        for pair in breaks.windows(2) {
            let start = self.buffer.mark_at(pair[0] + 1, Gravity::Left);
            let end = self.buffer.mark_at(pair[1], Gravity::Right);
            new_lines.push(self.nodes.insert(Node::line(start, end, pair[1] - pair[0])));
        }
        let last_break = breaks[breaks.len() - 1];
        let tail_start = self.buffer.mark_at(last_break + 1, Gravity::Left);
        let tail_count = self.buffer.live_offset(old_end) - last_break;
        new_lines.push(self.nodes.insert(Node::line(tail_start, old_end, tail_count)));

        let new_count = self.measure_line(line);
        self.add_counts(line, new_count as isize - old_count as isize, 0);
        self.invalidate(line);

        let parent = self.nodes[line].parent.expect("line without a parent");
        let index = self.child_index(parent, line);
        self.insert_children(parent, index + 1, &new_lines);
        self.rebalance(parent);
        debug!(offset, length, added = new_lines.len(), "split line");
    }

    /// Brings the lines up to date after `length` characters were removed at
    /// `offset`.
    pub(super) fn apply_removal(&mut self, offset: usize, length: usize) {
        if length == 0 {
            return;
        }
        let (first, _) = self.locate(offset);
        let (last, _) = self.locate(offset + length);

        if first == last {
            self.add_counts(first, -(length as isize), 0);
            self.invalidate(first);
            trace!(offset, length, "shortened line");
            return;
        }

        let mut doomed = Vec::new();
        let mut cursor = first;
        while cursor != last {
            cursor = self.next_leaf(cursor).expect("removal end precedes its start");
            doomed.push(cursor);
        }

        // the first line now runs to the last line's terminator
        let (_, first_end) = self.nodes[first].marks();
        let (_, last_end) = self.nodes[last].marks();
        self.buffer.release_mark(first_end);
        self.nodes[first].set_end_mark(last_end);

        let mut touched = Vec::new();
        for &line in &doomed {
            let (start, end) = self.nodes[line].marks();
            self.buffer.release_mark(start);
            if line != last {
                self.buffer.release_mark(end);
            }
            self.unlink_line(line, &mut touched);
        }

        let old_count = self.nodes[first].char_count;
        let new_count = self.measure_line(first);
        self.add_counts(first, new_count as isize - old_count as isize, 0);
        self.invalidate(first);

        for group in touched {
            if self.nodes.contains(group) {
                self.rebalance(group);
            }
        }
        debug!(offset, length, removed = doomed.len(), "joined lines");
    }

    /// Unlinks and frees a line, along with any groups it leaves empty. The
    /// surviving group that lost a child is recorded in `touched`.
    fn unlink_line(&mut self, line: NodeId, touched: &mut Vec<NodeId>) {
        let mut id = line;
        loop {
            let parent = self.nodes[id].parent.expect("unlinking a detached node");
            let index = self.child_index(parent, id);
            self.remove_child(parent, index);
            self.nodes.remove(id);

            let parent_node = &self.nodes[parent];
            if parent_node.children().is_empty() && parent_node.parent.is_some() {
                id = parent;
                continue;
            }
            touched.push(parent);
            return;
        }
    }
}
