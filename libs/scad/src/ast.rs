//! # Typed SCAD Tree
//!
//! Node types for the typed call tree. Each variant carries the resolved
//! numeric/geometric attributes of one recognized functor; children stay in
//! source order.

use glam::{DMat4, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use scad_parser::{Modifiers, Span, Spanned};

// =============================================================================
// TREE
// =============================================================================

/// The typed call tree. The top level is an implicit group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScadTree {
    /// Top-level nodes.
    pub root: Vec<Scad>,
}

impl ScadTree {
    /// Structural equality ignoring spans.
    pub fn same_shape(&self, other: &ScadTree) -> bool {
        self.root.len() == other.root.len()
            && self.root.iter().zip(&other.root).all(|(a, b)| a.same_shape(b))
    }
}

// =============================================================================
// NODE
// =============================================================================

/// One typed call with its modifier flags and source span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scad {
    /// The resolved functor and its attributes.
    pub kind: ScadKind,
    /// Modifier prefix flags from the source.
    pub modifiers: Modifiers,
    /// Span of the originating functor token.
    pub span: Span,
}

impl Spanned for Scad {
    fn span(&self) -> Span {
        self.span
    }
}

/// Effective resolution parameters baked into a round primitive.
///
/// `fn_ = 0` means unset: the fragment count derives from `fa`/`fs`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub fn_: f64,
    pub fa: f64,
    pub fs: f64,
}

/// The two source forms of `rotate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RotateSpec {
    /// `rotate([x, y, z])` or `rotate(a)` (scalar = z rotation):
    /// Euler angles in degrees, applied in Z·Y·X order.
    Euler(DVec3),
    /// `rotate(a, v)`: angle in degrees around an axis.
    AxisAngle { a: f64, v: DVec3 },
}

/// The recognized functor set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScadKind {
    // ------------------------------------------------------------------ 3D --
    /// `cube(size, center)`
    Cube { size: DVec3, center: bool },
    /// `sphere(r)` with baked resolution.
    Sphere { r: f64, res: Resolution },
    /// `cylinder(h, r1, r2, center)` with baked resolution.
    Cylinder {
        h: f64,
        r1: f64,
        r2: f64,
        center: bool,
        res: Resolution,
    },
    /// `polyhedron(points, faces)`.
    Polyhedron {
        points: Vec<DVec3>,
        faces: Vec<Vec<usize>>,
    },

    // ------------------------------------------------------------------ 2D --
    /// `square(size, center)`
    Square { size: DVec2, center: bool },
    /// `circle(r)` with baked resolution.
    Circle { r: f64, res: Resolution },
    /// `polygon(points, paths)`; `paths = None` means the single implicit
    /// path over all points.
    Polygon {
        points: Vec<DVec2>,
        paths: Option<Vec<Vec<usize>>>,
    },

    // ----------------------------------------------------------- operators --
    Union(Vec<Scad>),
    Difference(Vec<Scad>),
    Intersection(Vec<Scad>),
    /// `group()` and brace groups; combines like union.
    Group(Vec<Scad>),

    // ---------------------------------------------------------- transforms --
    Translate { v: DVec3, children: Vec<Scad> },
    Rotate { spec: RotateSpec, children: Vec<Scad> },
    Scale { v: DVec3, children: Vec<Scad> },
    Mirror { v: DVec3, children: Vec<Scad> },
    Multmatrix { m: DMat4, children: Vec<Scad> },
    /// `linear_extrude(height, center)` over 2D children.
    LinearExtrude {
        height: f64,
        center: bool,
        children: Vec<Scad>,
    },
}

impl Scad {
    /// Child nodes of operators and transforms; empty for primitives.
    pub fn children(&self) -> &[Scad] {
        match &self.kind {
            ScadKind::Union(c)
            | ScadKind::Difference(c)
            | ScadKind::Intersection(c)
            | ScadKind::Group(c) => c,
            ScadKind::Translate { children, .. }
            | ScadKind::Rotate { children, .. }
            | ScadKind::Scale { children, .. }
            | ScadKind::Mirror { children, .. }
            | ScadKind::Multmatrix { children, .. }
            | ScadKind::LinearExtrude { children, .. } => children,
            _ => &[],
        }
    }

    /// Structural equality ignoring spans.
    pub fn same_shape(&self, other: &Scad) -> bool {
        use ScadKind::*;
        if self.modifiers != other.modifiers {
            return false;
        }
        let children_match = |a: &[Scad], b: &[Scad]| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_shape(y))
        };
        match (&self.kind, &other.kind) {
            (Cube { size: a, center: ca }, Cube { size: b, center: cb }) => {
                a == b && ca == cb
            }
            (Sphere { r: a, res: ra }, Sphere { r: b, res: rb }) => a == b && ra == rb,
            (
                Cylinder { h: h1, r1: a1, r2: b1, center: c1, res: e1 },
                Cylinder { h: h2, r1: a2, r2: b2, center: c2, res: e2 },
            ) => h1 == h2 && a1 == a2 && b1 == b2 && c1 == c2 && e1 == e2,
            (
                Polyhedron { points: p1, faces: f1 },
                Polyhedron { points: p2, faces: f2 },
            ) => p1 == p2 && f1 == f2,
            (Square { size: a, center: ca }, Square { size: b, center: cb }) => {
                a == b && ca == cb
            }
            (Circle { r: a, res: ra }, Circle { r: b, res: rb }) => a == b && ra == rb,
            (
                Polygon { points: p1, paths: q1 },
                Polygon { points: p2, paths: q2 },
            ) => p1 == p2 && q1 == q2,
            (Union(a), Union(b))
            | (Difference(a), Difference(b))
            | (Intersection(a), Intersection(b))
            | (Group(a), Group(b)) => children_match(a, b),
            (
                Translate { v: v1, children: c1 },
                Translate { v: v2, children: c2 },
            ) => v1 == v2 && children_match(c1, c2),
            (
                Rotate { spec: s1, children: c1 },
                Rotate { spec: s2, children: c2 },
            ) => s1 == s2 && children_match(c1, c2),
            (Scale { v: v1, children: c1 }, Scale { v: v2, children: c2 }) => {
                v1 == v2 && children_match(c1, c2)
            }
            (Mirror { v: v1, children: c1 }, Mirror { v: v2, children: c2 }) => {
                v1 == v2 && children_match(c1, c2)
            }
            (
                Multmatrix { m: m1, children: c1 },
                Multmatrix { m: m2, children: c2 },
            ) => m1 == m2 && children_match(c1, c2),
            (
                LinearExtrude { height: h1, center: z1, children: c1 },
                LinearExtrude { height: h2, center: z2, children: c2 },
            ) => h1 == h2 && z1 == z2 && children_match(c1, c2),
            _ => false,
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
    fn test_children_of_primitive_is_empty() {
        let node = Scad {
            kind: ScadKind::Sphere {
                r: 1.0,
                res: Resolution { fn_: 0.0, fa: 12.0, fs: 2.0 },
            },
            modifiers: Modifiers::default(),
            span: Span::at(0),
        };
        assert!(node.children().is_empty());
    }

    #[test]
    fn test_same_shape_ignores_span() {
        let a = Scad {
            kind: ScadKind::Cube { size: DVec3::splat(1.0), center: false },
            modifiers: Modifiers::default(),
            span: Span::at(0),
        };
        let mut b = a.clone();
        b.span = Span::at(99);
        assert!(a.same_shape(&b));
    }
}
