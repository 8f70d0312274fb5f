//! # Geometry Errors
//!
//! Degenerate-geometry conditions found while building the solid tree.
//! The first four kinds are downgradable to warnings (or silence) by the
//! user's policies; the rest are always fatal.

use scad_parser::Span;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Degenerate or unsupported geometry.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum GeomError {
    /// Primitive with zero size/radius/height at source.
    #[error("object is empty")]
    Empty { span: Span },

    /// A transform with a singular matrix collapsed the geometry.
    #[error("transform collapses object")]
    Collapse { span: Span },

    /// 2D primitive outside an extrusion context.
    #[error("2D object in 3D context")]
    FlatInSolid { span: Span },

    /// 3D primitive inside an extrusion context.
    #[error("3D object in 2D context")]
    SolidInFlat { span: Span },

    /// Polyhedron face with fewer than 3 distinct points or zero area.
    #[error("degenerate polyhedron face")]
    DegenerateFace { span: Span },

    /// Polyhedron face whose points leave its plane beyond the eq epsilon.
    #[error("non-planar polyhedron face")]
    NonPlanarFace { span: Span },

    /// Face or path index outside the point array.
    #[error("index {index} outside point array of {count}")]
    BadIndex { index: usize, count: usize, span: Span },

    /// `linear_extrude` under a transform that tilts the extrusion axis off
    /// the world z axis.
    #[error("extrusion axis must stay on the z axis")]
    NonAxialExtrude { span: Span },
}

impl GeomError {
    /// The primary source location of the error.
    pub fn span(&self) -> Span {
        match self {
            Self::Empty { span }
            | Self::Collapse { span }
            | Self::FlatInSolid { span }
            | Self::SolidInFlat { span }
            | Self::DegenerateFace { span }
            | Self::NonPlanarFace { span }
            | Self::BadIndex { span, .. }
            | Self::NonAxialExtrude { span } => *span,
        }
    }
}
