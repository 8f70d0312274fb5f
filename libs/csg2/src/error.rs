//! # Layer Errors
//!
//! Failures of the per-layer geometry: slicing, boolean evaluation and
//! triangulation.

use scad_parser::Span;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while producing a layer.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum Csg2Error {
    /// A face cross-section could not be stitched into closed loops within
    /// the eq epsilon.
    #[error("cross-section does not close into loops")]
    OpenLoop { span: Span },

    /// The boolean evaluator could not resolve an intersection robustly
    /// within the configured epsilons.
    #[error("cannot resolve polygon intersection robustly")]
    Unresolved { span: Span },

    /// A face produced an odd number of plane crossings (numerically
    /// inconsistent input).
    #[error("inconsistent face crossing count")]
    OddCrossings { span: Span },

    /// A polygon could not be triangulated (remaining region has no ear).
    #[error("polygon cannot be triangulated")]
    NoEar { span: Span },
}

impl Csg2Error {
    /// The primary source location of the error.
    pub fn span(&self) -> Span {
        match self {
            Self::OpenLoop { span }
            | Self::Unresolved { span }
            | Self::OddCrossings { span }
            | Self::NoEar { span } => *span,
        }
    }
}
