//! textbox-buffer: text storage for an editable text box.
//!
//! The crate is built in three layers:
//!
//! - [`GapVector`]: a gap buffer over `Copy` elements, with cheap edits near
//!   the last edit point.
//! - [`TextBuffer`]: characters in a gap vector plus position marks that
//!   follow edits. Each mark has a [`Gravity`] deciding which side of an
//!   insertion at its offset it ends up on.
//! - [`TextTree`]: a balanced tree of lines over a `TextBuffer`. It answers
//!   offset, line number and coordinate queries in logarithmic time and
//!   caches line sizes computed by a [`TextLayout`].
//!
//! # Example
//!
//! ```
//! use textbox_buffer::{MonospaceLayout, Position, TextTree};
//!
//! let mut tree = TextTree::new(MonospaceLayout::default());
//! tree.insert(0, "Hello,\nworld!").unwrap();
//! assert_eq!(tree.line_count(), 2);
//!
//! let line = tree.line_by_number(1).unwrap();
//! assert_eq!(tree.line_text(line).unwrap(), "world!");
//! assert_eq!(tree.position_of(9).unwrap(), Position::new(1, 2));
//!
//! // the selection follows edits made before it
//! tree.select(7, 5);
//! tree.insert(0, ">> ").unwrap();
//! assert_eq!(tree.selected_text(), "world");
//! ```
//!
//! # Newlines
//!
//! `\r\n` and lone `\r` are stored as `\n`. The buffer always ends with a
//! newline that is not part of the text; it terminates the last line, so
//! every line has a terminator and the document has at least one line.

mod arena;
mod error;
mod gap_vector;
pub mod grapheme;
mod layout;
mod marks;
mod text_buffer;
mod tree;
mod types;

pub use error::{Result, TextError};
pub use gap_vector::GapVector;
pub use layout::{MonospaceLayout, Size, TextLayout};
pub use marks::{Gravity, MarkId, MARK_CAPACITY};
pub use text_buffer::{TextBuffer, INITIAL_CAPACITY};
pub use tree::{LineId, Lines, TextTree, MAX_CHILDREN, MIN_CHILDREN};
pub use types::Position;
