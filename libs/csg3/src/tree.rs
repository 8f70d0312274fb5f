//! # Solid Tree Types
//!
//! The closed sum over 3D combinators and primitives. Invariant: no
//! transform nodes remain; primitives either carry their accumulated matrix
//! (`Sphere`, `Cyl`) or are already in world coordinates (`Poly`,
//! `Extrude`).

use glam::{DMat4, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use scad_parser::{Span, Spanned};

use crate::error::GeomError;

// =============================================================================
// TREE
// =============================================================================

/// The built solid tree plus warnings from downgraded degeneracies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Csg3Tree {
    /// Root combinator; `None` when everything was elided.
    pub root: Option<Csg3>,
    /// Degeneracies downgraded to warnings by policy.
    pub warnings: Vec<GeomError>,
}

// =============================================================================
// NODES
// =============================================================================

/// A 2D profile: points plus index paths, outer rings counter-clockwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poly2 {
    pub points: Vec<DVec2>,
    pub paths: Vec<Vec<usize>>,
}

/// One node of the solid tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Csg3 {
    // ----------------------------------------------------------- combinators --
    /// Union of the children.
    Add { children: Vec<Csg3>, span: Span },
    /// The union of `add` minus the union of `sub`.
    Sub {
        add: Vec<Csg3>,
        sub: Vec<Csg3>,
        span: Span,
    },
    /// Intersection of the children.
    Cut { children: Vec<Csg3>, span: Span },

    // ------------------------------------------------------------ primitives --
    /// Sphere of radius `r` about the local origin, transformed by `mat`.
    /// `inv` caches `mat.inverse()` for plane pullback during slicing.
    Sphere {
        mat: DMat4,
        inv: DMat4,
        r: f64,
        segments: u32,
        span: Span,
    },
    /// Cylinder/cone along the local z axis from `z0` to `z1`, radius
    /// interpolating `r1` at `z0` to `r2` at `z1`. The matrix is
    /// z-preserving (a tilted cylinder is tessellated into a `Poly`
    /// instead).
    Cyl {
        mat: DMat4,
        z0: f64,
        z1: f64,
        r1: f64,
        r2: f64,
        segments: u32,
        span: Span,
    },
    /// Generic polyhedron in world coordinates; faces are outward
    /// counter-clockwise index rings into `points`.
    Poly {
        points: Vec<DVec3>,
        faces: Vec<Vec<usize>>,
        span: Span,
    },
    /// Axis-aligned extrusion of a 2D profile over `z0..z1`, world
    /// coordinates.
    Extrude {
        profile: Poly2,
        z0: f64,
        z1: f64,
        span: Span,
    },
}

impl Csg3 {
    /// True for primitive leaves.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Csg3::Add { .. } | Csg3::Sub { .. } | Csg3::Cut { .. })
    }

    /// Combinator children; empty for primitives.
    pub fn children(&self) -> &[Csg3] {
        match self {
            Csg3::Add { children, .. } | Csg3::Cut { children, .. } => children,
            Csg3::Sub { add, .. } => add,
            _ => &[],
        }
    }

    /// Count primitive leaves below (and including) this node.
    pub fn count_primitives(&self) -> usize {
        match self {
            Csg3::Add { children, .. } | Csg3::Cut { children, .. } => {
                children.iter().map(Csg3::count_primitives).sum()
            }
            Csg3::Sub { add, sub, .. } => {
                add.iter().map(Csg3::count_primitives).sum::<usize>()
                    + sub.iter().map(Csg3::count_primitives).sum::<usize>()
            }
            _ => 1,
        }
    }
}

impl Spanned for Csg3 {
    fn span(&self) -> Span {
        match self {
            Csg3::Add { span, .. }
            | Csg3::Sub { span, .. }
            | Csg3::Cut { span, .. }
            | Csg3::Sphere { span, .. }
            | Csg3::Cyl { span, .. }
            | Csg3::Poly { span, .. }
            | Csg3::Extrude { span, .. } => *span,
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
    fn test_count_primitives() {
        let leaf = Csg3::Poly { points: vec![], faces: vec![], span: Span::at(0) };
        let tree = Csg3::Sub {
            add: vec![leaf.clone()],
            sub: vec![leaf.clone(), leaf],
            span: Span::at(0),
        };
        assert_eq!(tree.count_primitives(), 3);
    }
}
