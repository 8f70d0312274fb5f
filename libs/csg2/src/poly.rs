//! # Polygon Sets
//!
//! The 2D payload of a layer: a vertex array plus index paths. Rings are
//! implicitly closed; outer rings run counter-clockwise, holes clockwise.
//! Every vertex keeps the span of the geometry that generated it.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use scad_parser::Span;

// =============================================================================
// VERTEX
// =============================================================================

/// A 2D vertex with the source span of its generating geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex2 {
    pub coord: DVec2,
    pub span: Span,
}

// =============================================================================
// POLYGON SET
// =============================================================================

/// A set of closed index paths over a shared vertex array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonSet {
    /// Shared vertex array.
    pub points: Vec<Vertex2>,
    /// Closed rings of indices into `points`.
    pub paths: Vec<Vec<usize>>,
}

impl PolygonSet {
    /// A set with no paths.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no ring survives.
    pub fn is_empty(&self) -> bool {
        self.paths.iter().all(|p| p.len() < 3)
    }

    /// Append one ring given by coordinates, all tagged with `span`.
    pub fn push_ring(&mut self, coords: impl IntoIterator<Item = DVec2>, span: Span) {
        let first = self.points.len();
        self.points
            .extend(coords.into_iter().map(|coord| Vertex2 { coord, span }));
        if self.points.len() - first >= 3 {
            self.paths.push((first..self.points.len()).collect());
        } else {
            self.points.truncate(first);
        }
    }

    /// Signed area of one path (positive = counter-clockwise).
    pub fn path_area(&self, path: &[usize]) -> f64 {
        let mut area = 0.0;
        for k in 0..path.len() {
            let a = self.points[path[k]].coord;
            let b = self.points[path[(k + 1) % path.len()]].coord;
            area += a.x * b.y - b.x * a.y;
        }
        area / 2.0
    }

    /// Sum of signed path areas: the enclosed area when holes run clockwise.
    pub fn area(&self) -> f64 {
        self.paths.iter().map(|p| self.path_area(p)).sum()
    }

    /// Nonzero-rule winding number of a point.
    pub fn winding(&self, p: DVec2) -> i32 {
        let mut wn = 0;
        for path in &self.paths {
            for k in 0..path.len() {
                let a = self.points[path[k]].coord;
                let b = self.points[path[(k + 1) % path.len()]].coord;
                if a.y <= p.y {
                    if b.y > p.y && cross(b - a, p - a) > 0.0 {
                        wn += 1;
                    }
                } else if b.y <= p.y && cross(b - a, p - a) < 0.0 {
                    wn -= 1;
                }
            }
        }
        wn
    }

    /// Nonzero-rule insideness.
    pub fn contains(&self, p: DVec2) -> bool {
        self.winding(p) != 0
    }
}

/// 2D cross product (z of the 3D cross).
#[inline]
pub fn cross(a: DVec2, b: DVec2) -> f64 {
    a.x * b.y - a.y * b.x
}

// =============================================================================
// TESTS
// =============================================================================
