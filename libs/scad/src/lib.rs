//! # SCAD AST
//!
//! The typed form of the SYN tree: every call is resolved to a known functor
//! with coerced, constant-folded attributes. Unknown functors, malformed
//! argument lists and type mismatches are fatal here, so later stages can
//! assume a well-formed tree.
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
//! use scad_ast::{lower, ScadKind};
//!
//! let syn = parse("t", "sphere(r=10, $fn=8);".to_string()).unwrap();
//! let scad = lower(&syn).unwrap();
//! match &scad.root[0].kind {
//!     ScadKind::Sphere { r, res } => {
//!         assert_eq!(*r, 10.0);
//!         assert_eq!(res.fn_, 8.0);
//!     }
//!     other => panic!("unexpected node {other:?}"),
//! }
//! ```

pub mod ast;
mod bind;
mod env;
pub mod error;
mod lower;
mod print;

pub use ast::{Resolution, RotateSpec, Scad, ScadKind, ScadTree};
pub use env::SpecialEnv;
pub use error::ScadError;
pub use lower::lower;
pub use print::put_scad;
