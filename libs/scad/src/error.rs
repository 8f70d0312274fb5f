//! # SCAD Lowering Errors
//!
//! Errors raised while resolving functors and binding arguments.

use scad_parser::Span;
use thiserror::Error;

/// Errors from the SYN → SCAD lowering.
///
/// Every variant carries the span of the offending token or value so the
/// pipeline can render a source excerpt.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScadError {
    /// A functor name outside the recognized set.
    #[error("unknown functor '{name}'")]
    UnknownFunctor { name: String, span: Span },

    /// More positional arguments than the functor's signature has parameters.
    #[error("too many arguments for '{functor}'")]
    TooManyArgs { functor: &'static str, span: Span },

    /// A keyword argument the functor does not know.
    #[error("unknown parameter '{name}' for '{functor}'")]
    UnknownParam {
        functor: &'static str,
        name: String,
        span: Span,
    },

    /// A required argument is missing.
    #[error("missing argument '{name}' for '{functor}'")]
    MissingArg {
        functor: &'static str,
        name: &'static str,
        span: Span,
    },

    /// An argument value of the wrong shape or type.
    #[error("bad argument '{name}' for '{functor}': expected {expected}")]
    BadArg {
        functor: &'static str,
        name: &'static str,
        expected: &'static str,
        span: Span,
    },

    /// Two mutually exclusive arguments were both given (e.g. `r` and `d`).
    #[error("conflicting arguments '{a}' and '{b}' for '{functor}'")]
    ConflictingArgs {
        functor: &'static str,
        a: &'static str,
        b: &'static str,
        span: Span,
    },
}

impl ScadError {
    /// The primary source location of the error.
    pub fn span(&self) -> Span {
        match self {
            Self::UnknownFunctor { span, .. }
            | Self::TooManyArgs { span, .. }
            | Self::UnknownParam { span, .. }
            | Self::MissingArg { span, .. }
            | Self::BadArg { span, .. }
            | Self::ConflictingArgs { span, .. } => *span,
        }
    }
}
