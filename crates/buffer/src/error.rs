//! Error types for buffer and tree operations.

use thiserror::Error;

/// Errors returned by [`TextBuffer`](crate::TextBuffer) and
/// [`TextTree`](crate::TextTree).
///
/// Range errors are always reported before any state is modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    /// A character offset lies outside `[0, limit]`.
    #[error("offset {offset} is out of range (limit {limit})")]
    OffsetOutOfRange { offset: usize, limit: usize },

    /// `offset + length` runs past the end of the text.
    #[error("range {offset}+{length} is out of range (limit {limit})")]
    LengthOutOfRange {
        offset: usize,
        length: usize,
        limit: usize,
    },

    /// A line number is not smaller than the line count.
    #[error("line {line} is out of range ({count} lines)")]
    LineOutOfRange { line: usize, count: usize },

    /// The mark handle was deleted.
    #[error("mark has been deleted")]
    DeletedMark,

    /// The line handle no longer refers to a live line.
    #[error("line handle is stale")]
    StaleLine,

    /// An internal invariant check failed.
    #[error("text tree is corrupted: {0}")]
    Corrupted(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TextError>;
