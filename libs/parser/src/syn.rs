//! # SYN Tree
//!
//! The untyped syntax tree: functor calls with argument lists and child
//! bodies, plus literal values. Functor names are not interpreted here —
//! that is the job of the typed SCAD stage.
//!
//! ## Example
//!
//! ```rust
//! use scad_parser::parse;
//!
//! let tree = parse("t", "union() { cube(10); }".to_string()).unwrap();
//! assert_eq!(tree.body[0].functor, "union");
//! assert_eq!(tree.body[0].body.len(), 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::source::SourceMap;
use crate::span::{Span, Spanned};

// =============================================================================
// TREE
// =============================================================================

/// A parsed source file: the retained source plus the top-level body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynTree {
    /// Retained source buffer and line index.
    pub map: SourceMap,
    /// Top-level calls.
    pub body: Vec<SynNode>,
}

impl SynTree {
    /// Re-emit the tree as SCAD source.
    ///
    /// Reparsing the output yields a structurally equal tree
    /// (see [`SynNode::same_shape`]).
    pub fn put_scad(&self) -> String {
        let mut out = String::new();
        for node in &self.body {
            node.write(&mut out, 0);
        }
        out
    }

    /// Structural equality of two trees, ignoring spans.
    pub fn same_shape(&self, other: &SynTree) -> bool {
        self.body.len() == other.body.len()
            && self
                .body
                .iter()
                .zip(&other.body)
                .all(|(a, b)| a.same_shape(b))
    }
}

// =============================================================================
// CALL NODE
// =============================================================================

/// Modifier prefix flags (`*`, `%`, `!`, `#`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    /// `*`: drop this subtree.
    pub disable: bool,
    /// `%`: background; dropped from geometry like `*`.
    pub background: bool,
    /// `!`: use this subtree as the root.
    pub root: bool,
    /// `#`: highlight; no geometric effect.
    pub highlight: bool,
}

impl Modifiers {
    /// True if no modifier is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A call: functor name, modifiers, arguments and child body.
///
/// A brace group `{ ... }` is represented as a call with functor `"{"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynNode {
    /// Functor name (`cube`, `translate`, ... or `"{"`).
    pub functor: String,
    /// Modifier prefix flags.
    pub modifiers: Modifiers,
    /// Ordered argument list.
    pub args: Vec<SynArg>,
    /// Child calls.
    pub body: Vec<SynNode>,
    /// Span of the functor token.
    pub span: Span,
}

impl SynNode {
    /// True for brace groups.
    pub fn is_group(&self) -> bool {
        self.functor == "{"
    }

    /// Structural equality ignoring spans.
    pub fn same_shape(&self, other: &SynNode) -> bool {
        self.functor == other.functor
            && self.modifiers == other.modifiers
            && self.args.len() == other.args.len()
            && self
                .args
                .iter()
                .zip(&other.args)
                .all(|(a, b)| a.key == b.key && a.value.same_shape(&b.value))
            && self.body.len() == other.body.len()
            && self
                .body
                .iter()
                .zip(&other.body)
                .all(|(a, b)| a.same_shape(b))
    }

    fn write(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        out.push_str(&pad);
        for (flag, c) in [
            (self.modifiers.disable, '*'),
            (self.modifiers.background, '%'),
            (self.modifiers.root, '!'),
            (self.modifiers.highlight, '#'),
        ] {
            if flag {
                out.push(c);
            }
        }
        if self.is_group() {
            out.push('{');
        } else {
            out.push_str(&self.functor);
            out.push('(');
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if let Some(key) = &arg.key {
                    out.push_str(key);
                    out.push('=');
                }
                arg.value.write(out);
            }
            out.push(')');
        }
        if self.body.is_empty() {
            if self.is_group() {
                out.push_str("}\n");
            } else {
                out.push_str(";\n");
            }
        } else {
            if !self.is_group() {
                out.push_str(" {");
            }
            out.push('\n');
            for child in &self.body {
                child.write(out, indent + 1);
            }
            out.push_str(&pad);
            out.push_str("}\n");
        }
    }
}

impl Spanned for SynNode {
    fn span(&self) -> Span {
        self.span
    }
}

/// One argument of a call: positional or `key=value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynArg {
    /// Keyword, if the argument was written `key=value`.
    pub key: Option<String>,
    /// The argument value.
    pub value: SynValue,
}

// =============================================================================
// VALUES
// =============================================================================

/// A literal value with its source span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynValue {
    /// The value itself.
    pub kind: SynValueKind,
    /// Source span of the value's first token.
    pub span: Span,
}

/// Kinds of literal values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SynValueKind {
    /// Integer literal.
    Int(i64),
    /// Floating-point literal.
    Float(f64),
    /// String literal (raw content, escapes not interpreted).
    Str(String),
    /// Identifier reference (`true`, `$fn`, ...).
    Ident(String),
    /// Range `[start:end]` or `[start:inc:end]`.
    Range {
        start: Box<SynValue>,
        inc: Option<Box<SynValue>>,
        end: Box<SynValue>,
    },
    /// Array `[a, b, c]`.
    Array(Vec<SynValue>),
}

impl SynValue {
    /// Structural equality ignoring spans.
    pub fn same_shape(&self, other: &SynValue) -> bool {
        use SynValueKind::*;
        match (&self.kind, &other.kind) {
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Ident(a), Ident(b)) => a == b,
            (
                Range { start: s1, inc: i1, end: e1 },
                Range { start: s2, inc: i2, end: e2 },
            ) => {
                s1.same_shape(s2)
                    && e1.same_shape(e2)
                    && match (i1, i2) {
                        (None, None) => true,
                        (Some(a), Some(b)) => a.same_shape(b),
                        _ => false,
                    }
            }
            (Array(a), Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_shape(y))
            }
            _ => false,
        }
    }

    fn write(&self, out: &mut String) {
        match &self.kind {
            SynValueKind::Int(v) => out.push_str(&v.to_string()),
            SynValueKind::Float(v) => {
                // Keep a decimal point so the literal reparses as a float.
                if v.fract() == 0.0 && v.is_finite() {
                    out.push_str(&format!("{v:.1}"));
                } else {
                    out.push_str(&v.to_string());
                }
            }
            SynValueKind::Str(s) => {
                out.push('"');
                out.push_str(s);
                out.push('"');
            }
            SynValueKind::Ident(name) => out.push_str(name),
            SynValueKind::Range { start, inc, end } => {
                out.push('[');
                start.write(out);
                out.push(':');
                if let Some(inc) = inc {
                    inc.write(out);
                    out.push(':');
                }
                end.write(out);
                out.push(']');
            }
            SynValueKind::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write(out);
                }
                out.push(']');
            }
        }
    }
}

impl Spanned for SynValue {
    fn span(&self) -> Span {
        self.span
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::parse;

    #[test]
    fn test_roundtrip_simple() {
        let tree = parse("t", "cube(10);".to_string()).unwrap();
        let printed = tree.put_scad();
        let again = parse("t", printed).unwrap();
        assert!(tree.same_shape(&again));
    }

    #[test]
    fn test_roundtrip_nested() {
        let src = "difference() { cube([10, 20, 30], center=true); \
                   translate([5, 0, 0]) cylinder(h=9, r1=2, r2=0.5, $fn=12); }";
        let tree = parse("t", src.to_string()).unwrap();
        let again = parse("t", tree.put_scad()).unwrap();
        assert!(tree.same_shape(&again));
    }

    #[test]
    fn test_roundtrip_modifiers_and_group() {
        let src = "!translate([1, 2, 3]) { *cube(1); #sphere(r=2.5); }";
        let tree = parse("t", src.to_string()).unwrap();
        let again = parse("t", tree.put_scad()).unwrap();
        assert!(tree.same_shape(&again));
    }

    #[test]
    fn test_roundtrip_range_and_floats() {
        let src = "polygon(points=[[0.0, 0.0], [1.0, 0.0], [0.5, 2.0]], r=[0:0.5:2]);";
        let tree = parse("t", src.to_string()).unwrap();
        let again = parse("t", tree.put_scad()).unwrap();
        assert!(tree.same_shape(&again));
    }

    #[test]
    fn test_float_keeps_decimal_point() {
        let tree = parse("t", "sphere(2.0);".to_string()).unwrap();
        assert!(tree.put_scad().contains("2.0"));
    }
}
