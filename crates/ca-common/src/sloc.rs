//! Source locations.
//!
//! CA diagnostics are line/column based (`line: L, col: C: ...`), so
//! locations carry row and column rather than byte offsets. A `Span`
//! is the begin/end pair every AST node records.

use serde::Serialize;

/// A single source position (1-based row, 0-based column).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Sloc {
    pub row: u32,
    pub col: u32,
}

impl Sloc {
    #[inline]
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Sloc { row, col }
    }

    /// Location for synthetic nodes (mock `main`, builtin prototypes).
    #[inline]
    #[must_use]
    pub const fn synthetic() -> Self {
        Sloc { row: 0, col: 0 }
    }
}

impl std::fmt::Display for Sloc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line: {}, col: {}", self.row, self.col)
    }
}

/// The begin/end location pair of a code unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub beg: Sloc,
    pub end: Sloc,
}

impl Span {
    #[inline]
    #[must_use]
    pub const fn new(beg: Sloc, end: Sloc) -> Self {
        Span { beg, end }
    }

    #[inline]
    #[must_use]
    pub const fn at(loc: Sloc) -> Self {
        Span { beg: loc, end: loc }
    }

    /// Merge two spans to create a span covering both.
    #[must_use]
    pub fn merge(&self, other: Span) -> Span {
        let beg = if (other.beg.row, other.beg.col) < (self.beg.row, self.beg.col) {
            other.beg
        } else {
            self.beg
        };
        let end = if (other.end.row, other.end.col) > (self.end.row, self.end.col) {
            other.end
        } else {
            self.end
        };
        Span { beg, end }
    }
}
