//! Source positions for diagnostics and line tracking.

use std::fmt;

/// Start position of a token or node in the source text.
///
/// Lines and columns are 1-indexed; columns count bytes. `len` is the byte
/// length of the covered text when it is known, zero otherwise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// A zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Extend `self` so that it also covers `other`.
    ///
    /// Spans on different lines keep the start of `self`; only same-line
    /// merges compute an exact length.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        if self.line != other.line {
            return self;
        }
        let start = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Span::new(self.line, start, end - start)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_line_colon_col() {
        assert_eq!(Span::new(3, 15, 5).to_string(), "3:15");
    }

    #[test]
    fn merge_on_same_line_covers_both() {
        let merged = Span::new(1, 10, 3).merge(Span::new(1, 5, 3));
        assert_eq!(merged, Span::new(1, 5, 8));
    }

    #[test]
    fn merge_across_lines_keeps_start() {
        let first = Span::new(1, 5, 10);
        assert_eq!(first.merge(Span::new(3, 1, 4)), first);
    }

    #[test]
    fn point_is_empty() {
        assert!(Span::point(2, 2).is_empty());
        assert!(!Span::new(2, 2, 1).is_empty());
    }
}
