//! Position marks that track offsets across edits.
//!
//! A mark stores a *physical* index into the text buffer's gap vector rather
//! than a logical offset, so edits far from a mark never touch it. Only marks
//! the gap sweeps over when it moves, grows or swallows text need adjusting.
//! Left and right marks live in separate lists, each sorted by physical index,
//! so every adjustment is a contiguous run found by binary search.
//!
//! Placement at the gap boundary decides gravity: a left mark whose offset
//! equals the gap start is stored at `gap_start` (text inserted there lands
//! after it), while a right mark with that offset is stored at `gap_end` (text
//! inserted there lands before it).

use std::ops::{Bound, RangeBounds};

use crate::arena::{Arena, Key};
use crate::error::{Result, TextError};
use crate::gap_vector::GapVector;

/// Initial capacity of each sorted mark list.
pub const MARK_CAPACITY: usize = 8;

/// Which side of an insertion at its own offset a mark ends up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gravity {
    /// Stays before text inserted at the mark.
    Left,
    /// Moves after text inserted at the mark.
    Right,
}

/// Handle to a mark registered with a [`TextBuffer`](crate::TextBuffer).
///
/// Handles are cheap to copy. Once the mark is deleted, every operation on the
/// handle fails with [`TextError::DeletedMark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkId(pub(crate) Key);

#[derive(Debug, Clone, Copy)]
struct MarkEntry {
    physical: usize,
    gravity: Gravity,
}

/// Mark storage plus the two physically sorted lists.
#[derive(Debug)]
pub(crate) struct MarkIndex {
    marks: Arena<MarkEntry>,
    left: GapVector<Key>,
    right: GapVector<Key>,
}

/// Applies `f` to the physical index of every mark in `list` whose index lies
/// in `range`.
fn adjust(
    marks: &mut Arena<MarkEntry>,
    list: &GapVector<Key>,
    range: impl RangeBounds<usize>,
    f: impl Fn(usize) -> usize,
) {
    let mut i = match range.start_bound() {
        Bound::Included(&lo) => list.partition_point(|k| marks[*k].physical < lo),
        Bound::Excluded(&lo) => list.partition_point(|k| marks[*k].physical <= lo),
        Bound::Unbounded => 0,
    };
    while let Some(key) = list.get(i) {
        let entry = &mut marks[key];
        if !range.contains(&entry.physical) {
            break;
        }
        entry.physical = f(entry.physical);
        i += 1;
    }
}

impl MarkIndex {
    pub fn new() -> Self {
        MarkIndex {
            marks: Arena::with_capacity(MARK_CAPACITY * 2),
            left: GapVector::with_capacity(MARK_CAPACITY),
            right: GapVector::with_capacity(MARK_CAPACITY),
        }
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    fn entry(&self, mark: MarkId) -> Result<MarkEntry> {
        self.marks.get(mark.0).copied().ok_or(TextError::DeletedMark)
    }

    pub fn contains(&self, mark: MarkId) -> bool {
        self.marks.contains(mark.0)
    }

    pub fn gravity(&self, mark: MarkId) -> Result<Gravity> {
        Ok(self.entry(mark)?.gravity)
    }

    /// Physical index a mark at `offset` is stored at.
    pub fn physical_for(
        offset: usize,
        gravity: Gravity,
        gap_start: usize,
        gap_len: usize,
    ) -> usize {
        let before = match gravity {
            Gravity::Left => offset <= gap_start,
            Gravity::Right => offset < gap_start,
        };
        if before {
            offset
        } else {
            offset + gap_len
        }
    }

    /// Logical offset of `mark` given the current gap geometry.
    pub fn offset(&self, mark: MarkId, gap_start: usize, gap_len: usize) -> Result<usize> {
        let entry = self.entry(mark)?;
        let before = match entry.gravity {
            Gravity::Left => entry.physical <= gap_start,
            Gravity::Right => entry.physical < gap_start,
        };
        Ok(if before {
            entry.physical
        } else {
            entry.physical - gap_len
        })
    }

    fn list_mut(&mut self, gravity: Gravity) -> (&mut Arena<MarkEntry>, &mut GapVector<Key>) {
        match gravity {
            Gravity::Left => (&mut self.marks, &mut self.left),
            Gravity::Right => (&mut self.marks, &mut self.right),
        }
    }

    fn link(&mut self, key: Key, entry: MarkEntry) {
        let (marks, list) = self.list_mut(entry.gravity);
        // after any marks already at the same index
        let at = list.partition_point(|k| marks[*k].physical <= entry.physical);
        list.insert(at, key);
    }

    fn unlink(&mut self, key: Key, entry: MarkEntry) {
        let (marks, list) = self.list_mut(entry.gravity);
        let mut at = list.partition_point(|k| marks[*k].physical < entry.physical);
        while let Some(k) = list.get(at) {
            if k == key {
                list.remove(at, 1);
                return;
            }
            debug_assert_eq!(marks[k].physical, entry.physical, "mark list out of order");
            at += 1;
        }
        unreachable!("live mark missing from its list");
    }

    /// Registers a mark at `physical`.
    pub fn create(&mut self, physical: usize, gravity: Gravity) -> MarkId {
        let entry = MarkEntry { physical, gravity };
        let key = self.marks.insert(entry);
        self.link(key, entry);
        MarkId(key)
    }

    /// Moves an existing mark to a new physical index, keeping its list sorted.
    pub fn relocate(&mut self, mark: MarkId, physical: usize) -> Result<()> {
        let entry = self.entry(mark)?;
        self.unlink(mark.0, entry);
        let moved = MarkEntry { physical, ..entry };
        self.marks[mark.0] = moved;
        self.link(mark.0, moved);
        Ok(())
    }

    pub fn delete(&mut self, mark: MarkId) -> Result<()> {
        let entry = self.entry(mark)?;
        self.unlink(mark.0, entry);
        self.marks.remove(mark.0);
        Ok(())
    }

    /// The gap is about to move left from `gap_start` to `pos`.
    pub fn gap_moved_left(&mut self, pos: usize, gap_start: usize, gap_len: usize) {
        adjust(
            &mut self.marks,
            &self.left,
            (Bound::Excluded(pos), Bound::Included(gap_start)),
            |p| p + gap_len,
        );
        adjust(&mut self.marks, &self.right, pos..gap_start, |p| p + gap_len);
    }

    /// The gap is about to move right by `distance`.
    pub fn gap_moved_right(&mut self, gap_end: usize, distance: usize, gap_len: usize) {
        adjust(&mut self.marks, &self.left, gap_end..=gap_end + distance, |p| p - gap_len);
        adjust(&mut self.marks, &self.right, gap_end..gap_end + distance, |p| p - gap_len);
    }

    /// The post-gap content moved from `old_gap_end` by `delta` slots.
    pub fn gap_expanded(&mut self, old_gap_end: usize, delta: usize) {
        adjust(
            &mut self.marks,
            &self.left,
            (Bound::Excluded(old_gap_end), Bound::Unbounded),
            |p| p + delta,
        );
        adjust(&mut self.marks, &self.right, old_gap_end.., |p| p + delta);
    }

    /// `count` elements following the gap are about to be absorbed into it.
    pub fn removed_after_gap(&mut self, gap_start: usize, gap_end: usize, count: usize) {
        let new_gap_end = gap_end + count;
        adjust(&mut self.marks, &self.left, gap_end..=new_gap_end, |_| gap_start);
        adjust(&mut self.marks, &self.right, gap_end..new_gap_end, |_| new_gap_end);
    }

    /// Checks that both lists are sorted and cover every live mark.
    pub fn is_consistent(&self) -> bool {
        let sorted = |list: &GapVector<Key>, gravity: Gravity| {
            let mut prev = 0;
            list.iter().all(|k| match self.marks.get(k) {
                Some(entry) if entry.gravity == gravity && entry.physical >= prev => {
                    prev = entry.physical;
                    true
                }
                _ => false,
            })
        };
        sorted(&self.left, Gravity::Left)
            && sorted(&self.right, Gravity::Right)
            && self.left.len() + self.right.len() == self.marks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_for_boundary() {
        // gap [4, 10)
        assert_eq!(MarkIndex::physical_for(4, Gravity::Left, 4, 6), 4);
        assert_eq!(MarkIndex::physical_for(4, Gravity::Right, 4, 6), 10);
        assert_eq!(MarkIndex::physical_for(3, Gravity::Right, 4, 6), 3);
        assert_eq!(MarkIndex::physical_for(5, Gravity::Left, 4, 6), 11);
    }

    #[test]
    fn test_offset_roundtrip() {
        let mut index = MarkIndex::new();
        for offset in 0..8 {
            for gravity in [Gravity::Left, Gravity::Right] {
                let p = MarkIndex::physical_for(offset, gravity, 4, 6);
                let m = index.create(p, gravity);
                assert_eq!(index.offset(m, 4, 6), Ok(offset));
            }
        }
        assert!(index.is_consistent());
    }

    #[test]
    fn test_delete_among_equal_positions() {
        let mut index = MarkIndex::new();
        let a = index.create(3, Gravity::Left);
        let b = index.create(3, Gravity::Left);
        let c = index.create(3, Gravity::Left);
        index.delete(b).unwrap();
        assert!(index.contains(a));
        assert!(!index.contains(b));
        assert!(index.contains(c));
        assert_eq!(index.delete(b), Err(TextError::DeletedMark));
        assert_eq!(index.len(), 2);
        assert!(index.is_consistent());
    }

    #[test]
    fn test_relocate_keeps_order() {
        let mut index = MarkIndex::new();
        let a = index.create(1, Gravity::Right);
        let _b = index.create(5, Gravity::Right);
        index.relocate(a, 9).unwrap();
        assert!(index.is_consistent());
        assert_eq!(index.offset(a, 0, 0), Ok(9));
    }

    #[test]
    fn test_gap_moved_left_respects_gravity() {
        // gap [6, 10), moving to 2: content [2, 6) shifts to [6, 10)
        let mut index = MarkIndex::new();
        let left_at_pos = index.create(2, Gravity::Left);
        let right_at_pos = index.create(2, Gravity::Right);
        let left_at_gap = index.create(6, Gravity::Left);
        index.gap_moved_left(2, 6, 4);
        // new gap [2, 6)
        assert_eq!(index.offset(left_at_pos, 2, 4), Ok(2));
        assert_eq!(index.offset(right_at_pos, 2, 4), Ok(2));
        assert_eq!(index.offset(left_at_gap, 2, 4), Ok(6));
        assert!(index.is_consistent());
    }

    #[test]
    fn test_removed_after_gap_collapses() {
        // gap [2, 4), removing 3 elements after it
        let mut index = MarkIndex::new();
        let left = index.create(5, Gravity::Left);
        let right = index.create(5, Gravity::Right);
        let after = index.create(8, Gravity::Left);
        index.removed_after_gap(2, 4, 3);
        // new gap [2, 7)
        assert_eq!(index.offset(left, 2, 5), Ok(2));
        assert_eq!(index.offset(right, 2, 5), Ok(2));
        assert_eq!(index.offset(after, 2, 5), Ok(3));
        assert!(index.is_consistent());
    }
}
