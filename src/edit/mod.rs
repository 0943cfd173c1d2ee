//! Text splicing
//!
//! Edits are positioned against the original source: insertions at an
//! offset keep the order they were requested in, removals drop original
//! bytes, and rendering produces the new text plus a source map back to the
//! original.

pub mod editor;
pub mod source_map;

pub use editor::{Editor, MapOptions};
pub use source_map::SourceMap;

use crate::syntax::Span;

/// One positional change to the original source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Drop the original text in this range
    Remove(Span),
    /// Insert text before the original character at `offset`
    Insert { offset: usize, text: String },
}

impl Edit {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Edit::Insert { offset, text: text.into() }
    }

    pub fn remove(start: usize, end: usize) -> Self {
        Edit::Remove(Span::new(start, end))
    }
}
