//! # Bounding Boxes
//!
//! 3D bounds of a solid tree, in two modes: counting subtracted geometry
//! (the "max" box, for output scaling) or ignoring it (the box the layer
//! range derives from).

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::tree::{Csg3, Csg3Tree};

/// An axis-aligned box; starts inverted-empty and grows by updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bb3 {
    pub min: DVec3,
    pub max: DVec3,
}

impl Bb3 {
    /// The empty box (any update replaces it).
    pub const EMPTY: Bb3 = Bb3 {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// True until a point has been added.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Grow to include a point.
    pub fn add(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow to include another box.
    pub fn union(&mut self, other: &Bb3) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }
}

impl Default for Bb3 {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Bounds of the whole tree. `with_sub` counts subtracted geometry too.
pub fn tree_bb(tree: &Csg3Tree, with_sub: bool) -> Bb3 {
    let mut bb = Bb3::EMPTY;
    if let Some(root) = &tree.root {
        node_bb(root, with_sub, &mut bb);
    }
    bb
}

fn node_bb(node: &Csg3, with_sub: bool, bb: &mut Bb3) {
    match node {
        Csg3::Add { children, .. } | Csg3::Cut { children, .. } => {
            for child in children {
                node_bb(child, with_sub, bb);
            }
        }
        Csg3::Sub { add, sub, .. } => {
            for child in add {
                node_bb(child, with_sub, bb);
            }
            if with_sub {
                for child in sub {
                    node_bb(child, with_sub, bb);
                }
            }
        }
        Csg3::Sphere { mat, r, .. } => {
            // exact ellipsoid bounds: half-extent per axis is r times the
            // norm of the matrix row
            let c = mat.transform_point3(DVec3::ZERO);
            let h = DVec3::new(
                DVec3::new(mat.x_axis.x, mat.y_axis.x, mat.z_axis.x).length(),
                DVec3::new(mat.x_axis.y, mat.y_axis.y, mat.z_axis.y).length(),
                DVec3::new(mat.x_axis.z, mat.y_axis.z, mat.z_axis.z).length(),
            ) * *r;
            bb.add(c - h);
            bb.add(c + h);
        }
        Csg3::Cyl { mat, z0, z1, r1, r2, .. } => {
            let r = r1.max(*r2);
            for &x in &[-r, r] {
                for &y in &[-r, r] {
                    for &z in &[*z0, *z1] {
                        bb.add(mat.transform_point3(DVec3::new(x, y, z)));
                    }
                }
            }
        }
        Csg3::Poly { points, .. } => {
            for p in points {
                bb.add(*p);
            }
        }
        Csg3::Extrude { profile, z0, z1, .. } => {
            for p in &profile.points {
                bb.add(DVec3::new(p.x, p.y, *z0));
                bb.add(DVec3::new(p.x, p.y, *z1));
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
