//! Tree nodes and the handles that refer to them.

use smallvec::SmallVec;

use crate::arena::Key;
use crate::layout::Size;
use crate::marks::MarkId;

/// Fewest children a non-root group may hold.
pub const MIN_CHILDREN: usize = 6;

/// Most children any group may hold once rebalancing finishes.
pub const MAX_CHILDREN: usize = 12;

pub(crate) type NodeId = Key;

/// Child list of a group. One extra inline slot covers the transient overflow
/// between an insertion and the split that follows it.
pub(crate) type Children = SmallVec<[NodeId; MAX_CHILDREN + 1]>;

/// Handle to one line of a [`TextTree`](crate::TextTree).
///
/// A handle stays valid until its line is merged into the line before it.
/// After that, line queries on it return
/// [`TextError::StaleLine`](crate::TextError::StaleLine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(pub(crate) NodeId);

#[derive(Debug)]
pub(crate) enum NodeKind {
    /// `start` sits on the first character, `end` on the terminating newline.
    Line { start: MarkId, end: MarkId },
    Group { children: Children },
}

#[derive(Debug)]
pub(crate) struct Node {
    pub parent: Option<NodeId>,
    /// 0 for lines, one more than the children's level for groups.
    pub level: u32,
    /// Characters covered, terminators included.
    pub char_count: usize,
    pub line_count: usize,
    /// Cached layout size; trustworthy only while `valid` is set.
    pub size: Size,
    pub valid: bool,
    pub kind: NodeKind,
}

impl Node {
    pub fn line(start: MarkId, end: MarkId, char_count: usize) -> Self {
        Node {
            parent: None,
            level: 0,
            char_count,
            line_count: 1,
            size: Size::ZERO,
            valid: false,
            kind: NodeKind::Line { start, end },
        }
    }

    pub fn group(level: u32) -> Self {
        debug_assert!(level > 0, "groups sit above the line level");
        Node {
            parent: None,
            level,
            char_count: 0,
            line_count: 0,
            size: Size::ZERO,
            valid: false,
            kind: NodeKind::Group {
                children: Children::new(),
            },
        }
    }

    pub fn is_line(&self) -> bool {
        matches!(self.kind, NodeKind::Line { .. })
    }

    /// Child list; empty for lines.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Group { children } => children.as_slice(),
            NodeKind::Line { .. } => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut Children {
        match &mut self.kind {
            NodeKind::Group { children } => children,
            NodeKind::Line { .. } => panic!("line nodes have no children"),
        }
    }

    /// `(start, end)` marks of a line node.
    pub fn marks(&self) -> (MarkId, MarkId) {
        match self.kind {
            NodeKind::Line { start, end } => (start, end),
            NodeKind::Group { .. } => panic!("group nodes have no marks"),
        }
    }

    pub fn set_end_mark(&mut self, mark: MarkId) {
        match &mut self.kind {
            NodeKind::Line { end, .. } => *end = mark,
            NodeKind::Group { .. } => panic!("group nodes have no marks"),
        }
    }
}
