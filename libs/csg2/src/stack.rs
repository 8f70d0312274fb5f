//! # Layer Stack Driver
//!
//! Builds every layer of the stack: slice, evaluate, triangulate, and
//! optionally the layer-difference pass. Layers are independent, so this is
//! the pipeline's one data-parallel region: a rayon map over layer indices
//! with per-worker scratch, writing into an index-ordered vector so the
//! output order is deterministic regardless of scheduling. The first error
//! latches and remaining workers skip their layers.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use config::CsgOpt;

use crate::boolean::{flatten_layer, Scratch};
use crate::diff::diff_layers;
use crate::error::Csg2Error;
use crate::poly::PolygonSet;
use crate::range::Range;
use crate::tree::Csg2Tree;
use crate::triangle::triangulate_set;

// =============================================================================
// TYPES
// =============================================================================

/// One evaluated layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// The cutting plane.
    pub z: f64,
    /// Flat polygon set after boolean evaluation.
    pub polys: PolygonSet,
    /// Triangulation (empty when not requested).
    pub triangles: Vec<[usize; 3]>,
}

/// Which optional passes to run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StackOptions {
    /// Triangulate each layer.
    pub triangulate: bool,
    /// Run the layer-difference pass (WebGL output).
    pub diff: bool,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self { triangulate: true, diff: false }
    }
}

/// The evaluated stack, layers in ascending z order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    pub range: Range,
    pub layers: Vec<Layer>,
}

/// Summary of the schedule, for verbose reporting by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StackStats {
    pub cnt: usize,
    pub z_min: f64,
    pub z_step: f64,
    pub z_max: f64,
}

// =============================================================================
// BUILD
// =============================================================================

impl Stack {
    /// Evaluate every layer of `range` over the operand tree.
    pub fn build(
        tree: &Csg2Tree,
        range: Range,
        opt: &CsgOpt,
        options: &StackOptions,
    ) -> Result<Self, Csg2Error> {
        let failed = AtomicBool::new(false);

        let results: Vec<Option<Result<Layer, Csg2Error>>> = (0..range.cnt)
            .into_par_iter()
            .map_init(Scratch::default, |scratch, i| {
                if failed.load(Ordering::Relaxed) {
                    return None;
                }
                let result = Self::build_layer(tree, range.z(i), opt, options, scratch);
                if result.is_err() {
                    failed.store(true, Ordering::Relaxed);
                }
                Some(result)
            })
            .collect();

        if failed.load(Ordering::Relaxed) {
            let err = results
                .into_iter()
                .flatten()
                .find_map(|r| r.err())
                .expect("a failed build latches an error");
            return Err(err);
        }

        let layers = results
            .into_iter()
            .map(|r| r.expect("no layer skipped without an error").expect("checked"))
            .collect();
        let mut stack = Stack { range, layers };

        if options.diff {
            diff_layers(&mut stack, opt)?;
            if options.triangulate {
                let tris: Vec<Result<_, Csg2Error>> = stack.layers[1..]
                    .par_iter()
                    .map(|layer| triangulate_set(&layer.polys, &opt.tol))
                    .collect();
                for (i, t) in tris.into_iter().enumerate() {
                    stack.layers[i + 1].triangles = t?;
                }
            }
        }
        Ok(stack)
    }

    fn build_layer(
        tree: &Csg2Tree,
        z: f64,
        opt: &CsgOpt,
        options: &StackOptions,
        scratch: &mut Scratch,
    ) -> Result<Layer, Csg2Error> {
        let polys = flatten_layer(tree, z, opt, scratch)?;
        let triangles = if options.triangulate {
            triangulate_set(&polys, &opt.tol)?
        } else {
            Vec::new()
        };
        Ok(Layer { z, polys, triangles })
    }

    /// Schedule summary.
    pub fn stats(&self) -> StackStats {
        StackStats {
            cnt: self.range.cnt,
            z_min: self.range.min,
            z_step: self.range.step,
            z_max: self.range.z_max(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use scad_ast::lower;
    use scad_parser::parse;

    fn stack_of(src: &str, range: Range, options: &StackOptions) -> Stack {
        let scad = lower(&parse("t", src.to_string()).unwrap()).unwrap();
        let c3 = csg3::build(&scad, &CsgOpt::default()).unwrap();
        let tree = Csg2Tree::from_csg3(&c3);
        Stack::build(&tree, range, &CsgOpt::default(), options).unwrap()
    }

    #[test]
    fn test_layer_count_and_z_values() {
        let stack = stack_of(
            "cube(10);",
            Range::from_extent(0.0, 10.0, 5.0),
            &StackOptions::default(),
        );
        assert_eq!(stack.layers.len(), 2);
        assert_eq!(stack.layers[0].z, 2.5);
        assert_eq!(stack.layers[1].z, 7.5);
    }

    #[test]
    fn test_cube_layers_are_squares() {
        let stack = stack_of(
            "cube(10);",
            Range::from_extent(0.0, 10.0, 5.0),
            &StackOptions::default(),
        );
        for layer in &stack.layers {
            assert!((layer.polys.area() - 100.0).abs() < 1e-6);
            assert!(!layer.triangles.is_empty());
        }
    }

    #[test]
    fn test_triangle_area_matches_polygon_area() {
        let stack = stack_of(
            "difference() { cube(10); translate([2,2,0]) cube([6,6,20]); }",
            Range::from_extent(0.0, 10.0, 5.0),
            &StackOptions::default(),
        );
        for layer in &stack.layers {
            let tri_area: f64 = layer
                .triangles
                .iter()
                .map(|t| {
                    let a = layer.polys.points[t[0]].coord;
                    let b = layer.polys.points[t[1]].coord;
                    let c = layer.polys.points[t[2]].coord;
                    crate::poly::cross(b - a, c - a) / 2.0
                })
                .sum();
            assert!((tri_area - layer.polys.area()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_union_idempotence_across_stack() {
        let single = stack_of(
            "cube(10);",
            Range::from_extent(0.0, 10.0, 5.0),
            &StackOptions::default(),
        );
        let doubled = stack_of(
            "union() { cube(10); cube(10); }",
            Range::from_extent(0.0, 10.0, 5.0),
            &StackOptions::default(),
        );
        for (a, b) in single.layers.iter().zip(&doubled.layers) {
            assert!((a.polys.area() - b.polys.area()).abs() < 1e-9);
            assert_eq!(a.polys.paths.len(), b.polys.paths.len());
        }
    }

    #[test]
    fn test_stats() {
        let stack = stack_of(
            "cube(10);",
            Range::from_extent(0.0, 10.0, 5.0),
            &StackOptions::default(),
        );
        let stats = stack.stats();
        assert_eq!(stats.cnt, 2);
        assert_eq!(stats.z_min, 2.5);
        assert_eq!(stats.z_max, 7.5);
    }

    #[test]
    fn test_no_triangulation_option() {
        let stack = stack_of(
            "cube(10);",
            Range::from_extent(0.0, 10.0, 5.0),
            &StackOptions { triangulate: false, diff: false },
        );
        assert!(stack.layers.iter().all(|l| l.triangles.is_empty()));
    }
}
