//! # Layer Operand Tree
//!
//! Isomorphic to the CSG3 combinator tree, with each former primitive as a
//! leaf whose polygon set is materialised on demand for the current layer by
//! the slicer.

use serde::{Deserialize, Serialize};

use csg3::{Csg3, Csg3Tree};
use scad_parser::{Span, Spanned};

/// The per-layer operand tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Csg2Tree {
    pub root: Option<Csg2Node>,
}

/// One node of the operand tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Csg2Node {
    /// Union of the children.
    Add { children: Vec<Csg2Node>, span: Span },
    /// Union of `add` minus the union of `sub`.
    Sub {
        add: Vec<Csg2Node>,
        sub: Vec<Csg2Node>,
        span: Span,
    },
    /// Intersection of the children.
    Cut { children: Vec<Csg2Node>, span: Span },
    /// A sliceable primitive.
    Leaf { prim: Csg3, span: Span },
}

impl Csg2Tree {
    /// Mirror the combinator structure of a solid tree.
    pub fn from_csg3(tree: &Csg3Tree) -> Self {
        Self { root: tree.root.as_ref().map(node_from_csg3) }
    }
}

fn node_from_csg3(node: &Csg3) -> Csg2Node {
    let span = node.span();
    match node {
        Csg3::Add { children, .. } => Csg2Node::Add {
            children: children.iter().map(node_from_csg3).collect(),
            span,
        },
        Csg3::Sub { add, sub, .. } => Csg2Node::Sub {
            add: add.iter().map(node_from_csg3).collect(),
            sub: sub.iter().map(node_from_csg3).collect(),
            span,
        },
        Csg3::Cut { children, .. } => Csg2Node::Cut {
            children: children.iter().map(node_from_csg3).collect(),
            span,
        },
        primitive => Csg2Node::Leaf { prim: primitive.clone(), span },
    }
}

impl Spanned for Csg2Node {
    fn span(&self) -> Span {
        match self {
            Csg2Node::Add { span, .. }
            | Csg2Node::Sub { span, .. }
            | Csg2Node::Cut { span, .. }
            | Csg2Node::Leaf { span, .. } => *span,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
