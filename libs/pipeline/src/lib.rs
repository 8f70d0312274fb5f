//! # Pipeline Driver
//!
//! Runs one source file through the refinement passes:
//!
//! ```text
//! source → SYN → SCAD → CSG3 → (range + CSG2 operand tree)
//!        → evaluated layers → triangulated layers → layer diffs
//! ```
//!
//! Each pass owns its IR; [`Pipeline`] owns them all and exposes each for
//! writers and dump outputs. `run_until` performs the missing transitions in
//! order and stops at the requested [`Stage`], which is how "dump after
//! stage X" requests short-circuit the rest. Any transition error is fatal
//! and renders with a source excerpt via [`Error::render`].
//!
//! ## Example
//!
//! ```rust
//! use slicer_pipeline::{Pipeline, PipelineOptions, Stage};
//!
//! let mut options = PipelineOptions::default();
//! options.z_step = 5.0;
//! let mut pipeline = Pipeline::parse("demo.scad", "cube(10);".to_string(), options).unwrap();
//! pipeline.run_until(Stage::Triangulated).unwrap();
//! assert_eq!(pipeline.stack().layers.len(), 2);
//! ```

pub mod error;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use config::CsgOpt;
use csg2::{Csg2Tree, Range, Stack, StackOptions};
use csg3::{Csg3Tree, GeomError};
use scad_ast::ScadTree;
use scad_parser::{SourceMap, SynTree};

pub use error::Error;

// =============================================================================
// OPTIONS
// =============================================================================

/// Configuration honoured by the pipeline; set once by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Geometry options (tolerances, policies, evaluator limits).
    pub csg: CsgOpt,
    /// Override the first cutting plane (default: bb bottom + step/2).
    pub z_min: Option<f64>,
    /// Override the top of the schedule (default: bb top).
    pub z_max: Option<f64>,
    /// Layer spacing.
    pub z_step: f64,
    /// Triangulate layers.
    pub triangulate: bool,
    /// Run the layer-difference pass (WebGL output).
    pub diff: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            csg: CsgOpt::default(),
            z_min: None,
            z_max: None,
            z_step: 0.2,
            triangulate: true,
            diff: false,
        }
    }
}

// =============================================================================
// STAGE
// =============================================================================

/// The per-file state machine. Stages are strictly ordered; a pipeline only
/// moves forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Stage {
    /// SYN tree built.
    Parsed,
    /// Typed SCAD tree built.
    Scadded,
    /// Solid tree built, transforms folded.
    Csg3Built,
    /// Schedule and operand tree ready.
    Sliced,
    /// Booleans evaluated, flat polygon set per layer.
    Evaluated,
    /// Layers triangulated (a no-op when triangulation is off).
    Triangulated,
    /// Layer differences computed (a no-op when diff is off).
    Diffed,
    /// Caller has written its output.
    Emitted,
}

// =============================================================================
// PIPELINE
// =============================================================================

/// One source file moving through the pipeline.
#[derive(Debug)]
pub struct Pipeline {
    options: PipelineOptions,
    /// Untouched copy of the source for diagnostics rendering.
    map: SourceMap,
    stage: Stage,
    syn: SynTree,
    scad: Option<ScadTree>,
    csg3: Option<Csg3Tree>,
    csg2: Option<Csg2Tree>,
    range: Option<Range>,
    stack: Option<Stack>,
}

impl Pipeline {
    /// Validate options and parse the source (reaching [`Stage::Parsed`]).
    pub fn parse(
        name: &str,
        source: String,
        options: PipelineOptions,
    ) -> Result<Self, Error> {
        options.csg.validate()?;
        let map = SourceMap::new(name, source.clone());
        let syn = scad_parser::parse(name, source)?;
        Ok(Self {
            options,
            map,
            stage: Stage::Parsed,
            syn,
            scad: None,
            csg3: None,
            csg2: None,
            range: None,
            stack: None,
        })
    }

    /// Advance to `target`, performing all missing transitions in order.
    pub fn run_until(&mut self, target: Stage) -> Result<(), Error> {
        while self.stage < target {
            self.step()?;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), Error> {
        match self.stage {
            Stage::Parsed => {
                self.scad = Some(scad_ast::lower(&self.syn)?);
                self.stage = Stage::Scadded;
            }
            Stage::Scadded => {
                let scad = self.scad.as_ref().expect("scadded stage has a tree");
                self.csg3 = Some(csg3::build(scad, &self.options.csg)?);
                self.stage = Stage::Csg3Built;
            }
            Stage::Csg3Built => {
                let tree = self.csg3.as_ref().expect("built stage has a tree");
                let bb = csg3::bb::tree_bb(tree, false);
                let (bb_min, bb_max) = if bb.is_empty() {
                    (0.0, 0.0)
                } else {
                    (bb.min.z, bb.max.z)
                };
                let step = self.options.z_step;
                let z_max = self.options.z_max.unwrap_or(bb_max);
                let range = match self.options.z_min {
                    Some(z_min) => Range::new(z_min, z_max, step),
                    None => Range::from_extent(bb_min, z_max, step),
                };
                self.range = Some(range);
                self.csg2 = Some(Csg2Tree::from_csg3(tree));
                self.stage = Stage::Sliced;
            }
            Stage::Sliced => {
                let tree = self.csg2.as_ref().expect("sliced stage has a tree");
                let range = self.range.expect("sliced stage has a range");
                // triangulation and diff are separate transitions
                let options = StackOptions { triangulate: false, diff: false };
                self.stack = Some(Stack::build(tree, range, &self.options.csg, &options)?);
                self.stage = Stage::Evaluated;
            }
            Stage::Evaluated => {
                if self.options.triangulate {
                    let tol = self.options.csg.tol;
                    let stack = self.stack.as_mut().expect("evaluated stage has a stack");
                    let tris: Vec<_> = stack
                        .layers
                        .par_iter()
                        .map(|layer| csg2::triangle::triangulate_set(&layer.polys, &tol))
                        .collect();
                    for (layer, t) in stack.layers.iter_mut().zip(tris) {
                        layer.triangles = t?;
                    }
                }
                self.stage = Stage::Triangulated;
            }
            Stage::Triangulated => {
                if self.options.diff {
                    let tol = self.options.csg.tol;
                    let stack = self.stack.as_mut().expect("triangulated stage has a stack");
                    csg2::diff::diff_layers(stack, &self.options.csg)?;
                    if self.options.triangulate {
                        let tris: Vec<_> = stack.layers[1..]
                            .par_iter()
                            .map(|layer| csg2::triangle::triangulate_set(&layer.polys, &tol))
                            .collect();
                        for (i, t) in tris.into_iter().enumerate() {
                            stack.layers[i + 1].triangles = t?;
                        }
                    }
                }
                self.stage = Stage::Diffed;
            }
            Stage::Diffed => {
                self.stage = Stage::Emitted;
            }
            Stage::Emitted => {}
        }
        Ok(())
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The retained source and line index, for rendering diagnostics.
    pub fn map(&self) -> &SourceMap {
        &self.map
    }

    /// The untyped syntax tree.
    pub fn syn(&self) -> &SynTree {
        &self.syn
    }

    /// The typed call tree; available from [`Stage::Scadded`].
    pub fn scad(&self) -> &ScadTree {
        self.scad.as_ref().expect("run_until(Stage::Scadded) first")
    }

    /// The solid tree; available from [`Stage::Csg3Built`].
    pub fn csg3(&self) -> &Csg3Tree {
        self.csg3.as_ref().expect("run_until(Stage::Csg3Built) first")
    }

    /// The layer operand tree; available from [`Stage::Sliced`].
    pub fn csg2(&self) -> &Csg2Tree {
        self.csg2.as_ref().expect("run_until(Stage::Sliced) first")
    }

    /// The layer schedule; available from [`Stage::Sliced`].
    pub fn range(&self) -> Range {
        self.range.expect("run_until(Stage::Sliced) first")
    }

    /// The evaluated stack; available from [`Stage::Evaluated`].
    pub fn stack(&self) -> &Stack {
        self.stack.as_ref().expect("run_until(Stage::Evaluated) first")
    }

    /// Warnings collected from policy-downgraded degeneracies.
    pub fn warnings(&self) -> &[GeomError] {
        self.csg3.as_ref().map(|t| t.warnings.as_slice()).unwrap_or(&[])
    }

    /// Render a pipeline error against this file's source.
    pub fn render_error(&self, err: &Error) -> String {
        err.render(&self.map)
    }
}

// =============================================================================
// TESTS
// =============================================================================
