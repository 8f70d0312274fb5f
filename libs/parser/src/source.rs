//! # Source Map
//!
//! Retains the input buffer for the lifetime of the pipeline and resolves
//! spans to file/line/column locations. Tokens are span handles into this
//! buffer, so one immutable copy serves both the parser and diagnostics
//! rendering.

use serde::{Deserialize, Serialize};

use crate::span::Span;

// =============================================================================
// LOCATION
// =============================================================================

/// A resolved source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loc {
    /// 1-based line number.
    pub line: usize,
    /// 1-based byte column within the line.
    pub column: usize,
    /// Absolute byte offset.
    pub byte: usize,
}

// =============================================================================
// SOURCE MAP
// =============================================================================

/// The retained source buffer plus a line-start index for span resolution.
///
/// ## Example
///
/// ```rust
/// use scad_parser::{SourceMap, Span};
///
/// let map = SourceMap::new("f.scad", "cube(1);\nsphere(2);".to_string());
/// let loc = map.resolve(Span::new(9, 15));
/// assert_eq!(loc.line, 2);
/// assert_eq!(loc.column, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMap {
    name: String,
    source: String,
    /// Byte offset of the first character of each line.
    line_starts: Vec<usize>,
}

impl SourceMap {
    /// Retain a source buffer and index its lines.
    pub fn new(name: &str, source: String) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { name: name.to_string(), source, line_starts }
    }

    /// The file name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full retained buffer.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Text of a span. Clamped to the buffer.
    pub fn text(&self, span: Span) -> &str {
        let start = span.start().min(self.source.len());
        let end = span.end().min(self.source.len());
        &self.source[start..end]
    }

    /// Resolve the start of a span to line and column.
    pub fn resolve(&self, span: Span) -> Loc {
        let byte = span.start().min(self.source.len());
        let line_idx = self.line_starts.partition_point(|&s| s <= byte) - 1;
        Loc {
            line: line_idx + 1,
            column: byte - self.line_starts[line_idx] + 1,
            byte,
        }
    }

    /// The full text of the line containing `loc`, without its newline.
    pub fn line_text(&self, loc: Loc) -> &str {
        let start = self.line_starts[loc.line - 1];
        let end = self
            .line_starts
            .get(loc.line)
            .map(|&e| e)
            .unwrap_or(self.source.len());
        self.source[start..end].trim_end_matches(['\n', '\r'])
    }

    /// Render a caret excerpt for an error location.
    ///
    /// Produces the `<pre>` part of the user-visible error format: the
    /// offending line prefixed by `name:line:`, with a `^` caret under the
    /// offending column.
    ///
    /// ```text
    /// f.scad:1: cube(10)garbage;
    ///                   ^
    /// ```
    pub fn excerpt(&self, span: Span) -> String {
        self.excerpt_with(span, '^')
    }

    /// Caret excerpt with a custom marker (the secondary location of a
    /// two-location diagnostic uses `~`).
    pub fn excerpt_with(&self, span: Span, marker: char) -> String {
        let loc = self.resolve(span);
        let prefix = format!("{}:{}: ", self.name, loc.line);
        let line = self.line_text(loc);
        let pad = " ".repeat(prefix.len() + loc.column - 1);
        format!("{prefix}{line}\n{pad}{marker}\n")
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_first_line() {
        let map = SourceMap::new("t", "cube(1);".to_string());
        let loc = map.resolve(Span::new(5, 6));
        assert_eq!(loc.line, 1);
        assert_eq!(loc.column, 6);
    }

    #[test]
    fn test_resolve_later_line() {
        let map = SourceMap::new("t", "a();\nb();\nc();".to_string());
        let loc = map.resolve(Span::new(10, 11));
        assert_eq!(loc.line, 3);
        assert_eq!(loc.column, 1);
    }

    #[test]
    fn test_resolve_end_of_buffer() {
        let map = SourceMap::new("t", "a();".to_string());
        let loc = map.resolve(Span::at(4));
        assert_eq!(loc.line, 1);
        assert_eq!(loc.column, 5);
    }

    #[test]
    fn test_excerpt_caret_alignment() {
        let map = SourceMap::new("f.scad", "cube(10)garbage;".to_string());
        let excerpt = map.excerpt(Span::new(8, 15));
        let lines: Vec<&str> = excerpt.lines().collect();
        assert_eq!(lines[0], "f.scad:1: cube(10)garbage;");
        assert_eq!(lines[1].len(), "f.scad:1: ".len() + 8 + 1);
        assert!(lines[1].ends_with('^'));
    }
}
