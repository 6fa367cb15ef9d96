//! Source locations.
//!
//! [`Span`] is a byte range inside one document; [`SourceRange`] pairs it
//! with the document's filename so diagnostics can point at a file.

use std::{
    fmt,
    ops::Range,
    path::{Path, PathBuf},
};

/// A byte range in a source document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    /// Create a new span from a byte range.
    pub fn new(range: Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }

    /// Get the start offset of the span
    pub fn start(&self) -> usize {
        self.start
    }

    /// Get the end offset of the span
    pub fn end(&self) -> usize {
        self.end
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Create a union of two spans (encompassing both)
    pub fn union(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A span within a named file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRange {
    filename: PathBuf,
    span: Span,
}

impl SourceRange {
    pub fn new(filename: impl Into<PathBuf>, span: Span) -> Self {
        Self {
            filename: filename.into(),
            span,
        }
    }

    /// A range that names a file without pointing into it.
    pub fn file(filename: impl Into<PathBuf>) -> Self {
        Self::new(filename, Span::default())
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.is_empty() {
            write!(f, "{}", self.filename.display())
        } else {
            write!(
                f,
                "{}:{}..{}",
                self.filename.display(),
                self.span.start,
                self.span.end
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_basic_functionality() {
        let span = Span::new(5..10);
        assert_eq!(span.start(), 5);
        assert_eq!(span.end(), 10);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
    }

    #[test]
    fn test_span_union() {
        let union = Span::new(5..10).union(Span::new(15..20));
        assert_eq!(union, Span::new(5..20));
    }

    #[test]
    fn test_source_range_display() {
        assert_eq!(
            SourceRange::new("main.tf", Span::new(3..9)).to_string(),
            "main.tf:3..9"
        );
        assert_eq!(SourceRange::file("main.tf").to_string(), "main.tf");
    }
}
