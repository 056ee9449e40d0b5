//! Editor coordinates.
//!
//! Zero-based line and column, in the same shape the LSP wire format uses
//! (`{ "line": .., "character": .. }`). Columns count UTF-16 code units.

use serde::{Deserialize, Serialize};

/// A cursor position in a document.
///
/// Ordering is lexicographic on `(line, character)`, which is the order
/// scope containment checks rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open span between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether `pos` lies strictly between `start` and `end`.
    ///
    /// Both boundaries are excluded: a cursor sitting exactly on the opening
    /// or closing position is outside the range.
    #[must_use]
    pub fn strictly_contains(&self, pos: Position) -> bool {
        self.start < pos && pos < self.end
    }
}
