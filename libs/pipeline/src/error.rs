//! # Pipeline Errors
//!
//! One error type over all stages, with the user-visible rendering: a caret
//! excerpt from the retained source, the message, and an optional secondary
//! excerpt.

use thiserror::Error;

use config::OptError;
use csg2::Csg2Error;
use csg3::GeomError;
use scad_ast::ScadError;
use scad_parser::{ParseError, SourceMap, Span};

/// Any fatal pipeline error.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Lex or parse failure.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Functor resolution or argument binding failure.
    #[error("{0}")]
    Scad(#[from] ScadError),

    /// Degenerate or unsupported geometry.
    #[error("{0}")]
    Geom(#[from] GeomError),

    /// Per-layer slicing, boolean or triangulation failure.
    #[error("{0}")]
    Layer(#[from] Csg2Error),

    /// Invalid option values.
    #[error("{0}")]
    Options(#[from] OptError),

    /// I/O failure surfaced by a collaborator.
    #[error("{0}")]
    Io(String),
}

impl Error {
    /// Primary and optional secondary source locations.
    pub fn spans(&self) -> (Option<Span>, Option<Span>) {
        match self {
            Error::Parse(e) => (Some(e.span), e.span2),
            Error::Scad(e) => (Some(e.span()), None),
            Error::Geom(e) => (Some(e.span()), None),
            Error::Layer(e) => (Some(e.span()), None),
            Error::Options(_) | Error::Io(_) => (None, None),
        }
    }

    /// User-visible rendering: `<pre>Error: <message>\n<post>`, where the
    /// pre/post parts are caret excerpts from the retained source buffer.
    pub fn render(&self, map: &SourceMap) -> String {
        let (primary, secondary) = self.spans();
        let pre = primary.map(|s| map.excerpt(s)).unwrap_or_default();
        let post = secondary
            .map(|s| map.excerpt_with(s, '~'))
            .unwrap_or_default();
        format!("{pre}Error: {self}\n{post}")
    }
}

// =============================================================================
// TESTS
// =============================================================================
