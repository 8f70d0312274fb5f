//! # Parse Errors
//!
//! Error type shared by the lexer and the parser. Parsing stops at the first
//! error; the offending token's span travels with the error so the pipeline
//! can render a caret excerpt from the retained buffer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Span;

// =============================================================================
// PARSE ERROR
// =============================================================================

/// A lex or parse error with location information.
///
/// ## Example
///
/// ```rust
/// use scad_parser::parse;
///
/// let err = parse("t", "cube(10)".to_string()).unwrap_err();
/// assert!(err.to_string().contains("expected"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseError {
    /// Error kind with details.
    pub kind: ParseErrorKind,
    /// Primary source location.
    pub span: Span,
    /// Optional secondary location (e.g. the opening quote of an
    /// unterminated string).
    pub span2: Option<Span>,
}

impl ParseError {
    /// Create a parse error at a location.
    pub const fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span, span2: None }
    }

    /// Attach a secondary location.
    pub fn with_span2(mut self, span2: Span) -> Self {
        self.span2 = Some(span2);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.kind, self.span.start())
    }
}

impl std::error::Error for ParseError {}

// =============================================================================
// PARSE ERROR KIND
// =============================================================================

/// Kinds of lex and parse errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParseErrorKind {
    /// A byte outside the language's alphabet.
    UnexpectedByte { byte: char },

    /// String literal still open at end of file.
    UnterminatedString,

    /// Block comment still open at end of file.
    UnterminatedComment,

    /// A number token directly abutting the previous multi-character token.
    AdjacentNumber,

    /// An identifier token directly abutting the previous multi-character
    /// token (`9.9foo`).
    AdjacentIdent,

    /// A string token directly abutting the previous multi-character token.
    AdjacentString,

    /// Number literal that failed numeric conversion.
    InvalidNumber { text: String },

    /// Found something other than what the grammar requires.
    Expected { expected: String, found: String },

    /// A value was required (argument or array element).
    ExpectedValue { found: String },

    /// Residual input after the top-level body.
    TrailingInput,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedByte { byte } => {
                write!(f, "unexpected character '{}'", byte.escape_default())
            }
            Self::UnterminatedString => write!(f, "end of file inside string"),
            Self::UnterminatedComment => write!(f, "file ends inside comment"),
            Self::AdjacentNumber => write!(f, "expected no number here"),
            Self::AdjacentIdent => write!(f, "expected no identifier here"),
            Self::AdjacentString => write!(f, "expected no string here"),
            Self::InvalidNumber { text } => write!(f, "invalid number '{text}'"),
            Self::Expected { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::ExpectedValue { found } => {
                write!(f, "expected int, float, string or identifier, found {found}")
            }
            Self::TrailingInput => write!(f, "operator or object functor expected"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_display() {
        let err = ParseError::new(
            ParseErrorKind::Expected {
                expected: "';'".to_string(),
                found: "end of file".to_string(),
            },
            Span::at(8),
        );
        let msg = err.to_string();
        assert!(msg.contains("expected ';'"));
        assert!(msg.contains("byte 8"));
    }

    #[test]
    fn test_unterminated_string_display() {
        let err = ParseError::new(ParseErrorKind::UnterminatedString, Span::at(0));
        assert!(err.to_string().contains("end of file inside string"));
    }

    #[test]
    fn test_secondary_span() {
        let err = ParseError::new(ParseErrorKind::UnterminatedComment, Span::at(10))
            .with_span2(Span::at(2));
        assert_eq!(err.span2, Some(Span::at(2)));
    }
}
