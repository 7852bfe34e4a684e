//! TextBuffer stores the characters of a document and the marks that point
//! into it.
//!
//! Content lives in a [`GapVector<char>`] followed by one permanent `'\n'`
//! sentinel, so every document (even an empty one) ends in a line terminator.
//! Line terminators are normalized on the way in: `\r\n`, a bare `\r` and `\n`
//! are all stored as a single `'\n'`.
//!
//! Every mutation relocates the registered marks before it returns, so a mark's
//! offset always agrees with the content.

use std::borrow::Cow;

use tracing::trace;

use crate::error::{Result, TextError};
use crate::gap_vector::GapVector;
use crate::marks::{Gravity, MarkId, MarkIndex};

/// Initial character capacity of a new buffer.
pub const INITIAL_CAPACITY: usize = 256;

/// Gap-buffered character storage with position marks.
#[derive(Debug)]
pub struct TextBuffer {
    text: GapVector<char>,
    marks: MarkIndex,
}

/// Converts line terminators to `'\n'`.
fn normalize_newlines(text: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(ch);
        }
    }
    out
}

impl TextBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Creates an empty buffer with room for `capacity` characters.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut text = GapVector::with_capacity(capacity.max(1));
        text.fill_gap(&['\n']);
        Self {
            text,
            marks: MarkIndex::new(),
        }
    }

    /// Creates a buffer holding `content` (after newline normalization).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Self {
        let chars = normalize_newlines(content);
        let mut buffer = Self::with_capacity(chars.len() + INITIAL_CAPACITY);
        buffer.text.move_gap_to(0);
        buffer.text.fill_gap(&chars);
        buffer
    }

    // ==================== Accessors ====================

    /// Number of characters, excluding the sentinel.
    pub fn char_count(&self) -> usize {
        self.text.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.char_count() == 0
    }

    /// Returns the character at `position`.
    ///
    /// `position == char_count()` yields the sentinel `'\n'`.
    pub fn char_at(&self, position: usize) -> Option<char> {
        self.text.get(position)
    }

    /// Iterates over the content, excluding the sentinel.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.text.iter().take(self.char_count())
    }

    /// Returns `length` characters starting at `position`.
    ///
    /// Borrows from the buffer when the range lies entirely on one side of the
    /// gap and copies otherwise.
    pub fn slice(&self, position: usize, length: usize) -> Result<Cow<'_, [char]>> {
        self.check_range(position, length)?;
        Ok(match self.text.contiguous(position, length) {
            Some(chars) => Cow::Borrowed(chars),
            None => {
                let mut owned = Vec::with_capacity(length);
                self.text.extend_into(position, length, &mut owned);
                Cow::Owned(owned)
            }
        })
    }

    /// Appends `length` characters starting at `position` to `out`.
    pub fn append_to(&self, position: usize, length: usize, out: &mut String) -> Result<()> {
        let chars = self.slice(position, length)?;
        out.extend(chars.iter());
        Ok(())
    }

    /// Returns `length` characters starting at `position` as a `String`.
    pub fn text(&self, position: usize, length: usize) -> Result<String> {
        let mut out = String::with_capacity(length);
        self.append_to(position, length, &mut out)?;
        Ok(out)
    }

    // ==================== Validation ====================

    fn check_offset(&self, position: usize) -> Result<()> {
        let limit = self.char_count();
        if position > limit {
            return Err(TextError::OffsetOutOfRange {
                offset: position,
                limit,
            });
        }
        Ok(())
    }

    fn check_range(&self, position: usize, length: usize) -> Result<()> {
        self.check_offset(position)?;
        let limit = self.char_count();
        match position.checked_add(length) {
            Some(end) if end <= limit => Ok(()),
            _ => Err(TextError::LengthOutOfRange {
                offset: position,
                length,
                limit,
            }),
        }
    }

    /// Returns `false` if the mark lists are out of order or incomplete.
    pub(crate) fn marks_consistent(&self) -> bool {
        self.marks.is_consistent()
    }

    // ==================== Mutations ====================

    /// Moves the gap to `position`, adjusting the marks it sweeps over.
    fn move_gap(&mut self, position: usize) {
        let gap_start = self.text.gap_start();
        let gap_len = self.text.gap_len();
        if position < gap_start {
            self.marks.gap_moved_left(position, gap_start, gap_len);
        } else if position > gap_start {
            self.marks
                .gap_moved_right(self.text.gap_end(), position - gap_start, gap_len);
        }
        self.text.move_gap_to(position);
    }

    /// Grows the gap to at least `size`, adjusting marks after it.
    fn reserve_gap(&mut self, size: usize) {
        let old_gap_end = self.text.gap_end();
        let delta = self.text.expand_gap(size);
        if delta > 0 {
            trace!(
                capacity = self.text.capacity(),
                delta,
                "expanded text gap"
            );
            self.marks.gap_expanded(old_gap_end, delta);
        }
    }

    /// Inserts `text` at `position` and returns the number of characters
    /// inserted after newline normalization.
    ///
    /// Marks after `position` move right. Marks at `position` move right only
    /// if they have [`Gravity::Right`].
    pub fn insert(&mut self, position: usize, text: &str) -> Result<usize> {
        self.check_offset(position)?;
        let chars = normalize_newlines(text);
        self.insert_chars(position, &chars);
        Ok(chars.len())
    }

    /// Inserts a single character. A `'\r'` is stored as `'\n'`.
    pub fn insert_char(&mut self, position: usize, ch: char) -> Result<()> {
        self.check_offset(position)?;
        let ch = if ch == '\r' { '\n' } else { ch };
        self.insert_chars(position, &[ch]);
        Ok(())
    }

    fn insert_chars(&mut self, position: usize, chars: &[char]) {
        if chars.is_empty() {
            return;
        }
        self.reserve_gap(chars.len());
        self.move_gap(position);
        self.text.fill_gap(chars);
    }

    /// Removes `length` characters starting at `position`.
    ///
    /// Marks inside the range collapse to `position`; marks after it move left
    /// by `length`. Removing zero characters does nothing.
    pub fn remove(&mut self, position: usize, length: usize) -> Result<()> {
        self.check_range(position, length)?;
        if length == 0 {
            return Ok(());
        }
        self.move_gap(position);
        self.marks
            .removed_after_gap(self.text.gap_start(), self.text.gap_end(), length);
        self.text.delete_after_gap(length);
        Ok(())
    }

    // ==================== Marks ====================

    /// Registers a mark at `position`.
    pub fn mark_position(&mut self, position: usize, gravity: Gravity) -> Result<MarkId> {
        self.check_offset(position)?;
        Ok(self.mark_at(position, gravity))
    }

    /// Registers a mark at an offset the caller knows to be in range.
    pub(crate) fn mark_at(&mut self, position: usize, gravity: Gravity) -> MarkId {
        assert!(position <= self.char_count(), "mark position {position} out of range");
        let physical =
            MarkIndex::physical_for(position, gravity, self.text.gap_start(), self.text.gap_len());
        self.marks.create(physical, gravity)
    }

    /// Offset of a mark the caller owns and never deletes behind its back.
    pub(crate) fn live_offset(&self, mark: MarkId) -> usize {
        self.marks
            .offset(mark, self.text.gap_start(), self.text.gap_len())
            .expect("internal mark was deleted")
    }

    /// Moves a mark the caller owns to an offset known to be in range.
    pub(crate) fn place_mark(&mut self, mark: MarkId, position: usize) {
        self.move_mark(mark, position)
            .expect("internal mark was deleted or misplaced");
    }

    /// Deletes a mark the caller owns.
    pub(crate) fn release_mark(&mut self, mark: MarkId) {
        self.marks.delete(mark).expect("internal mark was already deleted");
    }

    /// Current offset of `mark`.
    pub fn mark_offset(&self, mark: MarkId) -> Result<usize> {
        self.marks
            .offset(mark, self.text.gap_start(), self.text.gap_len())
    }

    pub fn mark_gravity(&self, mark: MarkId) -> Result<Gravity> {
        self.marks.gravity(mark)
    }

    pub fn is_mark_deleted(&self, mark: MarkId) -> bool {
        !self.marks.contains(mark)
    }

    /// Moves `mark` to `position`.
    pub fn move_mark(&mut self, mark: MarkId, position: usize) -> Result<()> {
        self.check_offset(position)?;
        let gravity = self.marks.gravity(mark)?;
        let physical =
            MarkIndex::physical_for(position, gravity, self.text.gap_start(), self.text.gap_len());
        self.marks.relocate(mark, physical)
    }

    /// Unregisters `mark`. Later use of the handle fails with
    /// [`TextError::DeletedMark`].
    pub fn delete_mark(&mut self, mark: MarkId) -> Result<()> {
        self.marks.delete(mark)
    }

    /// Number of live marks.
    pub fn mark_count(&self) -> usize {
        self.marks.len()
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for ch in self.chars() {
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}
