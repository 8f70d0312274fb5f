//! # SCAD Pretty Printer
//!
//! Re-emits a typed SCAD tree as source text with every argument in keyword
//! form and effective `$fn`/`$fa`/`$fs` values spelled out. Lowering the
//! output reproduces the tree (see the round-trip tests).

use glam::{DMat4, DVec2, DVec3};

use crate::ast::{Resolution, RotateSpec, Scad, ScadKind, ScadTree};

/// Print a SCAD tree as source text.
pub fn put_scad(tree: &ScadTree) -> String {
    let mut out = String::new();
    for node in &tree.root {
        write_node(&mut out, node, 0);
    }
    out
}

fn write_node(out: &mut String, node: &Scad, indent: usize) {
    let pad = "  ".repeat(indent);
    out.push_str(&pad);
    for (flag, c) in [
        (node.modifiers.disable, '*'),
        (node.modifiers.background, '%'),
        (node.modifiers.root, '!'),
        (node.modifiers.highlight, '#'),
    ] {
        if flag {
            out.push(c);
        }
    }

    match &node.kind {
        ScadKind::Cube { size, center } => {
            out.push_str(&format!(
                "cube(size={}, center={center});\n",
                vec3(*size)
            ));
        }
        ScadKind::Sphere { r, res } => {
            out.push_str(&format!("sphere(r={}{});\n", f(*r), res_args(res)));
        }
        ScadKind::Cylinder { h, r1, r2, center, res } => {
            out.push_str(&format!(
                "cylinder(h={}, r1={}, r2={}, center={center}{});\n",
                f(*h),
                f(*r1),
                f(*r2),
                res_args(res)
            ));
        }
        ScadKind::Polyhedron { points, faces } => {
            out.push_str(&format!(
                "polyhedron(points=[{}], faces=[{}]);\n",
                join(points.iter().map(|p| vec3(*p))),
                join(faces.iter().map(|face| indices(face)))
            ));
        }
        ScadKind::Square { size, center } => {
            out.push_str(&format!(
                "square(size={}, center={center});\n",
                vec2(*size)
            ));
        }
        ScadKind::Circle { r, res } => {
            out.push_str(&format!("circle(r={}{});\n", f(*r), res_args(res)));
        }
        ScadKind::Polygon { points, paths } => {
            out.push_str(&format!(
                "polygon(points=[{}]",
                join(points.iter().map(|p| vec2(*p)))
            ));
            if let Some(paths) = paths {
                out.push_str(&format!(
                    ", paths=[{}]",
                    join(paths.iter().map(|p| indices(p)))
                ));
            }
            out.push_str(");\n");
        }

        ScadKind::Union(children) => write_op(out, "union()", children, indent, &pad),
        ScadKind::Difference(children) => {
            write_op(out, "difference()", children, indent, &pad)
        }
        ScadKind::Intersection(children) => {
            write_op(out, "intersection()", children, indent, &pad)
        }
        ScadKind::Group(children) => write_op(out, "group()", children, indent, &pad),

        ScadKind::Translate { v, children } => {
            write_op(out, &format!("translate(v={})", vec3(*v)), children, indent, &pad)
        }
        ScadKind::Rotate { spec, children } => {
            let head = match spec {
                RotateSpec::Euler(v) => format!("rotate(a={})", vec3(*v)),
                RotateSpec::AxisAngle { a, v } => {
                    format!("rotate(a={}, v={})", f(*a), vec3(*v))
                }
            };
            write_op(out, &head, children, indent, &pad)
        }
        ScadKind::Scale { v, children } => {
            write_op(out, &format!("scale(v={})", vec3(*v)), children, indent, &pad)
        }
        ScadKind::Mirror { v, children } => {
            write_op(out, &format!("mirror(v={})", vec3(*v)), children, indent, &pad)
        }
        ScadKind::Multmatrix { m, children } => {
            write_op(out, &format!("multmatrix(m={})", mat4(*m)), children, indent, &pad)
        }
        ScadKind::LinearExtrude { height, center, children } => write_op(
            out,
            &format!("linear_extrude(height={}, center={center})", f(*height)),
            children,
            indent,
            &pad,
        ),
    }
}

fn write_op(out: &mut String, head: &str, children: &[Scad], indent: usize, pad: &str) {
    out.push_str(head);
    if children.is_empty() {
        out.push_str(";\n");
        return;
    }
    out.push_str(" {\n");
    for child in children {
        write_node(out, child, indent + 1);
    }
    out.push_str(pad);
    out.push_str("}\n");
}

/// Floats keep a decimal point so they reparse as floats.
fn f(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

fn vec2(v: DVec2) -> String {
    format!("[{}, {}]", f(v.x), f(v.y))
}

fn vec3(v: DVec3) -> String {
    format!("[{}, {}, {}]", f(v.x), f(v.y), f(v.z))
}

fn mat4(m: DMat4) -> String {
    // Printed row-major; glam stores column-major.
    let rows: Vec<String> = (0..4)
        .map(|i| {
            let r: Vec<String> = (0..4).map(|j| f(m.col(j)[i])).collect();
            format!("[{}]", r.join(", "))
        })
        .collect();
    format!("[{}]", rows.join(", "))
}

fn indices(indices: &[usize]) -> String {
    let items: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
    format!("[{}]", items.join(", "))
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

fn res_args(res: &Resolution) -> String {
    format!(", $fn={}, $fa={}, $fs={}", f(res.fn_), f(res.fa), f(res.fs))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower;
    use scad_parser::parse;

    fn roundtrip(src: &str) {
        let scad = lower(&parse("t", src.to_string()).unwrap()).unwrap();
        let printed = put_scad(&scad);
        let again = lower(&parse("t", printed.clone()).unwrap())
            .unwrap_or_else(|e| panic!("reprint failed to lower: {e}\n{printed}"));
        assert!(scad.same_shape(&again), "round-trip changed tree:\n{printed}");
    }

    #[test]
    fn test_roundtrip_primitives() {
        roundtrip("cube(10); sphere(r=2.5, $fn=7); cylinder(h=4, r1=1, r2=0.5);");
    }

    #[test]
    fn test_roundtrip_operators() {
        roundtrip("difference() { cube(10); translate([5,0,0]) cube(10); }");
    }

    #[test]
    fn test_roundtrip_transforms() {
        roundtrip(
            "rotate(45) scale([1,2,3]) mirror([1,0,0]) \
             multmatrix([[1,0,0,1],[0,1,0,2],[0,0,1,3],[0,0,0,1]]) cube(1);",
        );
    }

    #[test]
    fn test_roundtrip_2d_and_extrude() {
        roundtrip(
            "linear_extrude(height=4, center=true) { \
             polygon(points=[[0,0],[2,0],[1,2]]); circle(r=1, $fa=6); \
             square([2, 3], center=true); }",
        );
    }

    #[test]
    fn test_roundtrip_modifiers() {
        roundtrip("!union() { *cube(1); #sphere(2); %cylinder(h=1); }");
    }

    #[test]
    fn test_roundtrip_polyhedron() {
        roundtrip(
            "polyhedron(points=[[0,0,0],[1,0,0],[0,1,0],[0,0,1]], \
             faces=[[0,2,1],[0,1,3],[1,2,3],[0,3,2]]);",
        );
    }
}
