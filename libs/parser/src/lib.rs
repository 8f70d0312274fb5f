//! # SCAD Parser
//!
//! Lexer and recursive descent parser for the SCAD modelling language subset:
//! functor calls with positional/keyword arguments, nestable bodies, number,
//! string, identifier, range and array literals, `//` and `/* */` comments,
//! and the `*`, `%`, `!`, `#` modifier prefixes. No user-defined modules,
//! control flow or expressions.
//!
//! ## Architecture
//!
//! ```text
//! Source Text → Lexer → Tokens → Parser → SYN tree
//! ```
//!
//! The SYN tree is the untyped front of the pipeline:
//!
//! ```text
//! scad-parser → scad-ast → csg3 → csg2
//! ```
//!
//! ## Example
//!
//! ```rust
//! use scad_parser::parse;
//!
//! let tree = parse("example.scad", "cube(10);".to_string()).unwrap();
//! assert_eq!(tree.body.len(), 1);
//! assert_eq!(tree.body[0].functor, "cube");
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod source;
pub mod span;
pub mod syn;

pub use error::{ParseError, ParseErrorKind};
pub use source::{Loc, SourceMap};
pub use span::{Span, Spanned};
pub use syn::{Modifiers, SynArg, SynNode, SynTree, SynValue, SynValueKind};

/// Parse SCAD source into a SYN tree.
///
/// The source buffer is retained inside the returned tree's [`SourceMap`] so
/// that spans stay resolvable for diagnostics until the end of the pipeline.
///
/// Stops at the first lex or parse error.
///
/// ## Example
///
/// ```rust
/// use scad_parser::parse;
///
/// let tree = parse("t.scad", "translate([1,2,3]) cube(10);".to_string()).unwrap();
/// assert_eq!(tree.body[0].functor, "translate");
/// assert_eq!(tree.body[0].body[0].functor, "cube");
/// ```
pub fn parse(name: &str, source: String) -> Result<SynTree, ParseError> {
    let map = SourceMap::new(name, source);
    let tokens = lexer::Lexer::new(map.source()).tokenize()?;
    let body = parser::Parser::new(map.source(), &tokens).parse()?;
    Ok(SynTree { map, body })
}

// =============================================================================
// TESTS
// =============================================================================
