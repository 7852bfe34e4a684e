//! Gap vector: a growable array with a movable gap.
//!
//! Storage is laid out as `[pre-gap | gap | post-gap]`. Insertions and removals
//! at the gap are O(1); moving the gap is O(distance), which amortizes well for
//! localized editing. The text buffer stores characters in one of these, and the
//! mark index keeps its sorted mark lists in two more.

/// Rounds `n` up to the next multiple of 32.
fn round_up_32(n: usize) -> usize {
    (n + 31) & !31
}

/// A gap buffer over `Copy` elements.
#[derive(Debug, Clone)]
pub struct GapVector<T> {
    /// `[pre-gap content | gap | post-gap content]`
    data: Vec<T>,
    /// First unused slot.
    gap_start: usize,
    /// First used slot after the gap.
    gap_end: usize,
}

impl<T: Copy + Default> GapVector<T> {
    /// Creates an empty vector whose gap spans `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity],
            gap_start: 0,
            gap_end: capacity,
        }
    }

    /// Logical length (excluding the gap).
    pub fn len(&self) -> usize {
        self.data.len() - self.gap_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physical size of the backing store.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn gap_start(&self) -> usize {
        self.gap_start
    }

    pub fn gap_end(&self) -> usize {
        self.gap_end
    }

    pub fn gap_len(&self) -> usize {
        self.gap_end - self.gap_start
    }

    /// Maps a logical position to its physical slot.
    pub fn physical(&self, pos: usize) -> usize {
        if pos < self.gap_start {
            pos
        } else {
            pos + self.gap_len()
        }
    }

    /// Maps a physical slot outside the gap back to its logical position.
    pub fn logical(&self, physical: usize) -> usize {
        if physical < self.gap_start {
            physical
        } else {
            physical - self.gap_len()
        }
    }

    /// Returns the element at logical position `pos`.
    pub fn get(&self, pos: usize) -> Option<T> {
        if pos >= self.len() {
            return None;
        }
        Some(self.data[self.physical(pos)])
    }

    /// Overwrites the element at logical position `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len()`.
    pub fn set(&mut self, pos: usize, value: T) {
        assert!(pos < self.len(), "position {pos} out of range");
        let physical = self.physical(pos);
        self.data[physical] = value;
    }

    /// Grows the backing store so the gap holds at least `min_size` slots.
    ///
    /// The new capacity is the larger of twice the old capacity and the
    /// required capacity rounded up to a multiple of 32. The gap start stays
    /// put; the post-gap content moves to the end of the new store. Returns the
    /// number of slots the post-gap content moved by (zero when the gap was
    /// already large enough).
    pub fn expand_gap(&mut self, min_size: usize) -> usize {
        let gap_len = self.gap_len();
        if gap_len >= min_size {
            return 0;
        }

        let old_capacity = self.data.len();
        let deficit = min_size - gap_len;
        let new_capacity = (old_capacity * 2).max(round_up_32(old_capacity + deficit));
        let post_gap_len = old_capacity - self.gap_end;

        self.data.resize(new_capacity, T::default());
        let new_gap_end = new_capacity - post_gap_len;
        if post_gap_len > 0 {
            self.data.copy_within(self.gap_end..old_capacity, new_gap_end);
        }

        let delta = new_gap_end - self.gap_end;
        self.gap_end = new_gap_end;
        delta
    }

    /// Moves the gap so it starts at logical position `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos > len()`.
    pub fn move_gap_to(&mut self, pos: usize) {
        assert!(pos <= self.len(), "gap position {pos} out of range");

        if pos < self.gap_start {
            let shift = self.gap_start - pos;
            self.data.copy_within(pos..self.gap_start, self.gap_end - shift);
            self.gap_start = pos;
            self.gap_end -= shift;
        } else if pos > self.gap_start {
            let shift = pos - self.gap_start;
            self.data
                .copy_within(self.gap_end..self.gap_end + shift, self.gap_start);
            self.gap_start += shift;
            self.gap_end += shift;
        }
    }

    /// Moves the gap by a signed number of positions.
    pub fn shift_gap(&mut self, delta: isize) {
        let target = self
            .gap_start
            .checked_add_signed(delta)
            .expect("gap shifted before the start");
        self.move_gap_to(target);
    }

    /// Writes `items` into the gap at its current position.
    ///
    /// The gap must already be large enough; see [`expand_gap`](Self::expand_gap).
    pub fn fill_gap(&mut self, items: &[T]) {
        assert!(items.len() <= self.gap_len(), "gap too small for insertion");
        self.data[self.gap_start..self.gap_start + items.len()].copy_from_slice(items);
        self.gap_start += items.len();
    }

    /// Absorbs the `count` elements that follow the gap into it.
    pub fn delete_after_gap(&mut self, count: usize) {
        assert!(
            self.gap_end + count <= self.data.len(),
            "deletion past the end"
        );
        self.gap_end += count;
    }

    /// Inserts `items` at logical position `pos`.
    pub fn insert_slice(&mut self, pos: usize, items: &[T]) {
        self.expand_gap(items.len());
        self.move_gap_to(pos);
        self.fill_gap(items);
    }

    /// Inserts one element at logical position `pos`.
    pub fn insert(&mut self, pos: usize, item: T) {
        self.insert_slice(pos, &[item]);
    }

    /// Removes `count` elements starting at logical position `pos`.
    pub fn remove(&mut self, pos: usize, count: usize) {
        assert!(pos + count <= self.len(), "removal out of range");
        self.move_gap_to(pos);
        self.delete_after_gap(count);
    }

    /// Drops all content, keeping the allocation.
    pub fn clear(&mut self) {
        self.gap_start = 0;
        self.gap_end = self.data.len();
    }

    /// The pre-gap and post-gap content, in logical order.
    pub fn as_slices(&self) -> (&[T], &[T]) {
        (&self.data[..self.gap_start], &self.data[self.gap_end..])
    }

    /// Returns `[start, start + len)` as one slice if it does not straddle the gap.
    pub fn contiguous(&self, start: usize, len: usize) -> Option<&[T]> {
        let end = start + len;
        if end > self.len() {
            return None;
        }
        if end <= self.gap_start {
            Some(&self.data[start..end])
        } else if start >= self.gap_start {
            let offset = self.gap_len();
            Some(&self.data[start + offset..end + offset])
        } else {
            None
        }
    }

    /// Appends `[start, start + len)` to `out`.
    pub fn extend_into(&self, start: usize, len: usize, out: &mut Vec<T>) {
        let end = start + len;
        assert!(end <= self.len(), "range out of bounds");
        if start < self.gap_start {
            out.extend_from_slice(&self.data[start..end.min(self.gap_start)]);
        }
        if end > self.gap_start {
            let from = start.max(self.gap_start) + self.gap_len();
            out.extend_from_slice(&self.data[from..end + self.gap_len()]);
        }
    }

    /// Iterates over the content in logical order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = T> + '_ {
        let (pre, post) = self.as_slices();
        pre.iter().chain(post.iter()).copied()
    }

    /// Returns the first logical index for which `pred` is false, assuming the
    /// content is partitioned (all `true` elements precede all `false` ones).
    pub fn partition_point(&self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let (pre, post) = self.as_slices();
        let split = pre.partition_point(&mut pred);
        if split < pre.len() {
            split
        } else {
            pre.len() + post.partition_point(pred)
        }
    }
}

impl<T: Copy + Default> Default for GapVector<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl std::fmt::Display for GapVector<char> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for ch in self.iter() {
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}
