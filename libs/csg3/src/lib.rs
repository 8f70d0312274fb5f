//! # CSG3 — 3D Solid Tree
//!
//! Lowers the typed SCAD tree to a 3D solid tree: boolean combinators
//! (ADD = union, SUB = difference, CUT = intersection) over primitive leaves.
//! Transform nodes are folded away — every primitive carries the accumulated
//! affine matrix of its path, or its points already transformed to world
//! coordinates.
//!
//! ## Pipeline Integration
//!
//! ```text
//! scad-parser → scad-ast → csg3 → csg2
//! ```
//!
//! ## Example
//!
//! ```rust
//! use scad_parser::parse;
//! use scad_ast::lower;
//! use csg3::{build, Csg3};
//! use config::CsgOpt;
//!
//! let syn = parse("t", "translate([0,0,5]) sphere(r=2, $fn=8);".to_string()).unwrap();
//! let scad = lower(&syn).unwrap();
//! let tree = build(&scad, &CsgOpt::default()).unwrap();
//! match tree.root.as_ref().unwrap() {
//!     Csg3::Add { children, .. } => {
//!         assert!(matches!(children[0], Csg3::Sphere { .. }));
//!     }
//!     other => panic!("unexpected root {other:?}"),
//! }
//! ```

pub mod bb;
pub mod error;
mod from_scad;
pub mod tree;

pub use bb::Bb3;
pub use error::GeomError;
pub use from_scad::build;
pub use tree::{Csg3, Csg3Tree, Poly2};
