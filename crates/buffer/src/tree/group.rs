//! Group maintenance: linking children, count propagation, rebalancing and
//! cached metrics.
//!
//! Every structural change funnels through [`TextTree::insert_children`] and
//! [`TextTree::remove_child`], which keep the aggregate counts of all ancestors
//! exact and clear the cached sizes along the way. Rebalancing then restores
//! the fan-out bounds bottom-up.

use std::ops::Range;

use tracing::debug;

use super::node::{Children, Node, NodeId, NodeKind, MAX_CHILDREN, MIN_CHILDREN};
use super::TextTree;
use crate::layout::{Size, TextLayout};

impl<L: TextLayout> TextTree<L> {
    // ==================== Counts ====================

    /// Adds signed deltas to the counts of `from` and every ancestor.
    pub(super) fn add_counts(&mut self, from: NodeId, chars: isize, lines: isize) {
        if chars == 0 && lines == 0 {
            return;
        }
        let mut current = Some(from);
        while let Some(id) = current {
            let node = &mut self.nodes[id];
            node.char_count = node
                .char_count
                .checked_add_signed(chars)
                .expect("char count underflow");
            node.line_count = node
                .line_count
                .checked_add_signed(lines)
                .expect("line count underflow");
            current = node.parent;
        }
    }

    /// Clears the cached size of `from` and its ancestors.
    ///
    /// Stops at the first node that is already invalid; its ancestors are too.
    pub(super) fn invalidate(&mut self, from: NodeId) {
        let mut current = Some(from);
        while let Some(id) = current {
            let node = &mut self.nodes[id];
            if !node.valid {
                break;
            }
            node.valid = false;
            current = node.parent;
        }
    }

    fn sum_counts(&self, ids: &[NodeId]) -> (usize, usize) {
        ids.iter().fold((0, 0), |(chars, lines), &id| {
            let node = &self.nodes[id];
            (chars + node.char_count, lines + node.line_count)
        })
    }

    // ==================== Linking ====================

    pub(super) fn child_index(&self, parent: NodeId, child: NodeId) -> usize {
        self.nodes[parent]
            .children()
            .iter()
            .position(|&c| c == child)
            .expect("node missing from its parent's children")
    }

    /// Links the detached nodes `ids` into `parent` starting at `index`.
    pub(super) fn insert_children(&mut self, parent: NodeId, index: usize, ids: &[NodeId]) {
        for &id in ids {
            let child = &mut self.nodes[id];
            debug_assert!(child.parent.is_none(), "child is still linked");
            child.parent = Some(parent);
        }
        let (chars, lines) = self.sum_counts(ids);
        self.nodes[parent]
            .children_mut()
            .insert_many(index, ids.iter().copied());
        self.add_counts(parent, chars as isize, lines as isize);
        self.invalidate(parent);
    }

    /// Unlinks the child at `index` of `parent` and returns it.
    pub(super) fn remove_child(&mut self, parent: NodeId, index: usize) -> NodeId {
        let id = self.nodes[parent].children_mut().remove(index);
        let child = &mut self.nodes[id];
        child.parent = None;
        let (chars, lines) = (child.char_count, child.line_count);
        self.add_counts(parent, -(chars as isize), -(lines as isize));
        self.invalidate(parent);
        id
    }

    /// Moves `range` of `from`'s children into `to` at `at`.
    ///
    /// `from` and `to` must be siblings, so no ancestor count changes.
    fn move_children(&mut self, from: NodeId, range: Range<usize>, to: NodeId, at: usize) {
        debug_assert_eq!(self.nodes[from].parent, self.nodes[to].parent);
        let moved: Children = self.nodes[from].children_mut().drain(range).collect();
        for &id in &moved {
            self.nodes[id].parent = Some(to);
        }
        let (chars, lines) = self.sum_counts(&moved);
        self.nodes[to].children_mut().insert_many(at, moved);

        let source = &mut self.nodes[from];
        source.char_count -= chars;
        source.line_count -= lines;
        let target = &mut self.nodes[to];
        target.char_count += chars;
        target.line_count += lines;

        self.invalidate(from);
        self.invalidate(to);
    }

    // ==================== Rebalancing ====================

    /// Restores the fan-out bounds from `id` up to the root.
    pub(super) fn rebalance(&mut self, mut id: NodeId) {
        loop {
            let count = self.nodes[id].children().len();
            if count > MAX_CHILDREN {
                id = self.split(id);
                continue;
            }

            let Some(parent) = self.nodes[id].parent else {
                self.collapse_root();
                return;
            };

            if count < MIN_CHILDREN {
                if self.nodes[parent].children().len() < 2 {
                    if self.nodes[parent].parent.is_none() {
                        // sole child of the root takes its place
                        self.collapse_root();
                        return;
                    }
                    // no sibling to pair with until the parent is fixed
                    self.rebalance(parent);
                    continue;
                }
                if let Some(short) = self.merge_or_redistribute(id, parent) {
                    id = short;
                    continue;
                }
            }

            id = parent;
        }
    }

    /// Splits an overflowing group into evenly sized siblings and returns
    /// their parent, growing a new root first if needed.
    fn split(&mut self, id: NodeId) -> NodeId {
        let parent = match self.nodes[id].parent {
            Some(parent) => parent,
            None => self.grow_root(id),
        };

        let level = self.nodes[id].level;
        let count = self.nodes[id].children().len();
        let groups = count.div_ceil(MAX_CHILDREN);
        let base = count / groups;
        let extra = count % groups;

        let keep = base + usize::from(extra > 0);
        let tail: Children = self.nodes[id].children_mut().drain(keep..).collect();
        for &child in &tail {
            self.nodes[child].parent = None;
        }
        let (chars, lines) = self.sum_counts(&tail);
        self.add_counts(id, -(chars as isize), -(lines as isize));
        self.invalidate(id);

        let mut siblings = Vec::with_capacity(groups - 1);
        let mut rest = &tail[..];
        for i in 1..groups {
            let (chunk, remaining) = rest.split_at(base + usize::from(i < extra));
            rest = remaining;
            let group = self.nodes.insert(Node::group(level));
            self.insert_children(group, 0, chunk);
            siblings.push(group);
        }
        debug_assert!(rest.is_empty());

        let index = self.child_index(parent, id);
        self.insert_children(parent, index + 1, &siblings);
        debug!(level, count, groups, "split overflowing group");
        parent
    }

    /// Wraps the current root in a new root one level up.
    fn grow_root(&mut self, old_root: NodeId) -> NodeId {
        let level = self.nodes[old_root].level + 1;
        let root = self.nodes.insert(Node::group(level));
        self.insert_children(root, 0, &[old_root]);
        self.root = root;
        debug!(level, "grew tree height");
        root
    }

    /// Replaces the root by its only child while that child is a group.
    fn collapse_root(&mut self) {
        loop {
            let root = &self.nodes[self.root];
            if root.level <= 1 || root.children().len() != 1 {
                return;
            }
            let child = root.children()[0];
            self.nodes.remove(self.root);
            self.nodes[child].parent = None;
            self.root = child;
            debug!(level = self.nodes[child].level, "collapsed root");
        }
    }

    /// Pairs an underfull group with a sibling. Merges the two when their
    /// children fit in one group, otherwise splits the children evenly.
    ///
    /// Returns the merged group if it is still below the minimum.
    fn merge_or_redistribute(&mut self, id: NodeId, parent: NodeId) -> Option<NodeId> {
        let index = self.child_index(parent, id);
        let siblings = self.nodes[parent].children();
        let (left, right) = if index + 1 < siblings.len() {
            (id, siblings[index + 1])
        } else {
            (siblings[index - 1], id)
        };

        let level = self.nodes[id].level;
        let left_count = self.nodes[left].children().len();
        let right_count = self.nodes[right].children().len();
        let combined = left_count + right_count;

        if combined <= MAX_CHILDREN {
            self.move_children(right, 0..right_count, left, left_count);
            let right_index = self.child_index(parent, right);
            self.remove_child(parent, right_index);
            self.nodes.remove(right);
            debug!(level, combined, "merged groups");
            return (combined < MIN_CHILDREN).then_some(left);
        }

        let half = combined / 2;
        if left_count < half {
            self.move_children(right, 0..half - left_count, left, left_count);
        } else {
            self.move_children(left, half..left_count, right, 0);
        }
        debug!(level, combined, "redistributed children");
        None
    }

    // ==================== Metrics ====================

    /// Recomputes cached sizes bottom-up.
    ///
    /// Only invalid nodes are measured unless `force` is set, in which case
    /// every line is laid out again.
    pub fn update_metrics(&mut self, force: bool) {
        self.refresh(self.root, force);
    }

    fn refresh(&mut self, id: NodeId, force: bool) -> Size {
        let node = &self.nodes[id];
        if node.valid && !force {
            return node.size;
        }
        let size = match &node.kind {
            NodeKind::Line { start, end } => {
                let start = self.buffer.live_offset(*start);
                let end = self.buffer.live_offset(*end);
                self.layout.layout_line(&self.buffer, start, end)
            }
            NodeKind::Group { children } => {
                let children = children.clone();
                children.into_iter().fold(Size::ZERO, |acc, child| {
                    let child_size = self.refresh(child, force);
                    self.layout.add_metrics(acc, child_size)
                })
            }
        };
        let node = &mut self.nodes[id];
        node.size = size;
        node.valid = true;
        size
    }
}
