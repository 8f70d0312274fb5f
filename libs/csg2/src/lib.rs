//! # CSG2 — Layers and 2D Booleans
//!
//! The per-layer half of the pipeline. A [`Range`] chooses the horizontal
//! cutting planes; each CSG3 primitive is sliced into 2D polygon operands at
//! a plane; the boolean evaluator flattens the operand tree to one polygon
//! set per layer; optionally each layer is triangulated and adjacent layers
//! are XOR-ed for rendering.
//!
//! Layers are independent: [`Stack::build`] runs them through a data-parallel
//! region with deterministic, ascending-order results.
//!
//! ## Pipeline Integration
//!
//! ```text
//! scad-parser → scad-ast → csg3 → csg2
//! ```

pub mod boolean;
pub mod diff;
pub mod error;
pub mod poly;
pub mod range;
pub mod slice;
pub mod stack;
pub mod tree;
pub mod triangle;

pub use boolean::{combine, flatten_layer, Scratch};
pub use error::Csg2Error;
pub use poly::{PolygonSet, Vertex2};
pub use range::Range;
pub use stack::{Layer, Stack, StackOptions, StackStats};
pub use tree::{Csg2Node, Csg2Tree};
