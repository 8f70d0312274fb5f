//! # SYN → SCAD Lowering
//!
//! Resolves functor names against the recognized set, binds arguments and
//! folds constants. `$fn`/`$fa`/`$fs` bindings flow down the walk as a
//! lexically scoped environment and are baked into round primitives.

use glam::{DVec2, DVec3};

use scad_parser::{SynNode, SynTree};

use crate::ast::{Resolution, RotateSpec, Scad, ScadKind, ScadTree};
use crate::bind::{bind, Bound};
use crate::env::SpecialEnv;
use crate::error::ScadError;

/// Lower a parsed SYN tree to the typed SCAD tree.
///
/// ## Example
///
/// ```rust
/// use scad_parser::parse;
/// use scad_ast::{lower, ScadKind};
///
/// let syn = parse("t", "cube(10);".to_string()).unwrap();
/// let scad = lower(&syn).unwrap();
/// assert!(matches!(scad.root[0].kind, ScadKind::Cube { .. }));
/// ```
pub fn lower(tree: &SynTree) -> Result<ScadTree, ScadError> {
    let env = SpecialEnv::default();
    Ok(ScadTree { root: lower_body(&tree.body, &env)? })
}

fn lower_body(nodes: &[SynNode], env: &SpecialEnv) -> Result<Vec<Scad>, ScadError> {
    nodes.iter().map(|node| lower_node(node, env)).collect()
}

fn lower_node(node: &SynNode, env: &SpecialEnv) -> Result<Scad, ScadError> {
    let kind = match node.functor.as_str() {
        "{" | "group" => {
            let bound = bind(node, "group", &[], &[])?;
            let env = env.overridden(&bound.specials);
            ScadKind::Group(lower_body(&node.body, &env)?)
        }
        "union" => {
            let bound = bind(node, "union", &[], &[])?;
            let env = env.overridden(&bound.specials);
            ScadKind::Union(lower_body(&node.body, &env)?)
        }
        "difference" => {
            let bound = bind(node, "difference", &[], &[])?;
            let env = env.overridden(&bound.specials);
            ScadKind::Difference(lower_body(&node.body, &env)?)
        }
        "intersection" => {
            let bound = bind(node, "intersection", &[], &[])?;
            let env = env.overridden(&bound.specials);
            ScadKind::Intersection(lower_body(&node.body, &env)?)
        }

        "cube" => {
            let bound = bind(node, "cube", &["size", "center"], &[])?;
            ScadKind::Cube {
                size: bound.vec3_or_scalar("size", DVec3::ONE)?,
                center: bound.bool_or("center", false)?,
            }
        }
        "sphere" => {
            let bound = bind(node, "sphere", &["r"], &["d"])?;
            ScadKind::Sphere {
                r: radius(&bound, 1.0)?,
                res: resolution(&bound, env),
            }
        }
        "cylinder" => {
            let bound = bind(
                node,
                "cylinder",
                &["h", "r1", "r2"],
                &["r", "d", "d1", "d2", "center"],
            )?;
            bound.exclusive("r", "r1")?;
            bound.exclusive("r", "d")?;
            bound.exclusive("d", "d1")?;
            let r = bound.num_opt("r")?;
            let d = bound.num_opt("d")?.map(|d| d / 2.0);
            let fallback = r.or(d).unwrap_or(1.0);
            let r1 = match (bound.num_opt("r1")?, bound.num_opt("d1")?) {
                (Some(r1), _) => r1,
                (None, Some(d1)) => d1 / 2.0,
                (None, None) => fallback,
            };
            let r2 = match (bound.num_opt("r2")?, bound.num_opt("d2")?) {
                (Some(r2), _) => r2,
                (None, Some(d2)) => d2 / 2.0,
                (None, None) => fallback,
            };
            ScadKind::Cylinder {
                h: bound.num_or("h", 1.0)?,
                r1,
                r2,
                center: bound.bool_or("center", false)?,
                res: resolution(&bound, env),
            }
        }
        "polyhedron" => {
            let bound = bind(
                node,
                "polyhedron",
                &["points", "faces"],
                &["triangles", "convexity"],
            )?;
            let faces = match bound.get("faces").or_else(|| bound.get("triangles")) {
                Some(v) => bound.index_lists("faces", v)?,
                None => {
                    return Err(ScadError::MissingArg {
                        functor: "polyhedron",
                        name: "faces",
                        span: node.span,
                    });
                }
            };
            ScadKind::Polyhedron { points: bound.points3("points")?, faces }
        }

        "square" => {
            let bound = bind(node, "square", &["size", "center"], &[])?;
            ScadKind::Square {
                size: bound.vec2_or_scalar("size", DVec2::ONE)?,
                center: bound.bool_or("center", false)?,
            }
        }
        "circle" => {
            let bound = bind(node, "circle", &["r"], &["d"])?;
            ScadKind::Circle {
                r: radius(&bound, 1.0)?,
                res: resolution(&bound, env),
            }
        }
        "polygon" => {
            let bound = bind(node, "polygon", &["points", "paths"], &["convexity"])?;
            let paths = match bound.get("paths") {
                None => None,
                Some(v) if is_undef(v) => None,
                Some(v) => Some(bound.index_lists("paths", v)?),
            };
            ScadKind::Polygon { points: bound.points2("points")?, paths }
        }

        "translate" => {
            let bound = bind(node, "translate", &["v"], &[])?;
            let env = env.overridden(&bound.specials);
            ScadKind::Translate {
                v: bound.vec3("v", DVec3::ZERO, Some(0.0))?,
                children: lower_body(&node.body, &env)?,
            }
        }
        "rotate" => {
            let bound = bind(node, "rotate", &["a", "v"], &[])?;
            let env = env.overridden(&bound.specials);
            let spec = match bound.get("v") {
                // `rotate(a, v)`: axis-angle; only meaningful with scalar a.
                Some(_) => RotateSpec::AxisAngle {
                    a: bound.num_or("a", 0.0)?,
                    v: bound.vec3("v", DVec3::Z, None)?,
                },
                None => match bound.get("a").map(|v| &v.kind) {
                    Some(scad_parser::SynValueKind::Array(_)) => {
                        RotateSpec::Euler(bound.vec3("a", DVec3::ZERO, Some(0.0))?)
                    }
                    // scalar rotates about z
                    _ => RotateSpec::Euler(DVec3::new(0.0, 0.0, bound.num_or("a", 0.0)?)),
                },
            };
            ScadKind::Rotate { spec, children: lower_body(&node.body, &env)? }
        }
        "scale" => {
            let bound = bind(node, "scale", &["v"], &[])?;
            let env = env.overridden(&bound.specials);
            ScadKind::Scale {
                v: bound.vec3_or_scalar("v", DVec3::ONE)?,
                children: lower_body(&node.body, &env)?,
            }
        }
        "mirror" => {
            let bound = bind(node, "mirror", &["v"], &[])?;
            let env = env.overridden(&bound.specials);
            ScadKind::Mirror {
                v: bound.vec3("v", DVec3::X, Some(0.0))?,
                children: lower_body(&node.body, &env)?,
            }
        }
        "multmatrix" => {
            let bound = bind(node, "multmatrix", &["m"], &[])?;
            let env = env.overridden(&bound.specials);
            ScadKind::Multmatrix {
                m: bound.mat4("m")?,
                children: lower_body(&node.body, &env)?,
            }
        }
        "linear_extrude" => {
            let bound = bind(
                node,
                "linear_extrude",
                &["height"],
                &["center", "convexity"],
            )?;
            let env = env.overridden(&bound.specials);
            ScadKind::LinearExtrude {
                height: bound.num_or("height", 100.0)?,
                center: bound.bool_or("center", false)?,
                children: lower_body(&node.body, &env)?,
            }
        }

        other => {
            return Err(ScadError::UnknownFunctor {
                name: other.to_string(),
                span: node.span,
            });
        }
    };

    Ok(Scad { kind, modifiers: node.modifiers, span: node.span })
}

/// `r` wins over `d`; both given is a conflict.
fn radius(bound: &Bound<'_>, default: f64) -> Result<f64, ScadError> {
    bound.exclusive("r", "d")?;
    match (bound.num_opt("r")?, bound.num_opt("d")?) {
        (Some(r), _) => Ok(r),
        (None, Some(d)) => Ok(d / 2.0),
        (None, None) => Ok(default),
    }
}

/// Bake the effective resolution for a round primitive.
fn resolution(bound: &Bound<'_>, env: &SpecialEnv) -> Resolution {
    let env = env.overridden(&bound.specials);
    Resolution { fn_: env.fn_, fa: env.fa, fs: env.fs }
}

fn is_undef(v: &scad_parser::SynValue) -> bool {
    matches!(&v.kind, scad_parser::SynValueKind::Ident(s) if s == "undef")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use scad_parser::parse;

    fn lower_src(src: &str) -> Result<ScadTree, ScadError> {
        lower(&parse("t", src.to_string()).unwrap())
    }

    #[test]
    fn test_lower_cube_scalar_size() {
        let tree = lower_src("cube(10);").unwrap();
        match &tree.root[0].kind {
            ScadKind::Cube { size, center } => {
                assert_eq!(*size, DVec3::splat(10.0));
                assert!(!center);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_lower_sphere_diameter() {
        let tree = lower_src("sphere(d=20);").unwrap();
        match &tree.root[0].kind {
            ScadKind::Sphere { r, .. } => assert_eq!(*r, 10.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_lower_sphere_r_d_conflict() {
        let err = lower_src("sphere(r=1, d=4);").unwrap_err();
        assert!(matches!(err, ScadError::ConflictingArgs { .. }));
    }

    #[test]
    fn test_lower_cylinder_radii() {
        let tree = lower_src("cylinder(h=10, d1=4, r2=3);").unwrap();
        match &tree.root[0].kind {
            ScadKind::Cylinder { h, r1, r2, .. } => {
                assert_eq!(*h, 10.0);
                assert_eq!(*r1, 2.0);
                assert_eq!(*r2, 3.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_lower_unknown_functor() {
        let err = lower_src("pyramid(10);").unwrap_err();
        assert!(matches!(err, ScadError::UnknownFunctor { ref name, .. } if name == "pyramid"));
    }

    #[test]
    fn test_fn_propagates_lexically() {
        let tree = lower_src("union($fn=16) { sphere(1); sphere(1, $fn=8); }").unwrap();
        let children = tree.root[0].children();
        match (&children[0].kind, &children[1].kind) {
            (ScadKind::Sphere { res: a, .. }, ScadKind::Sphere { res: b, .. }) => {
                assert_eq!(a.fn_, 16.0);
                assert_eq!(b.fn_, 8.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_fn_zero_keeps_parent() {
        let tree = lower_src("union($fn=16) sphere(1, $fn=0);").unwrap();
        match &tree.root[0].children()[0].kind {
            ScadKind::Sphere { res, .. } => assert_eq!(res.fn_, 16.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rotate_forms() {
        let tree = lower_src("rotate(45) cube(1); rotate([90,0,0]) cube(1); \
                              rotate(30, [0,0,1]) cube(1);")
            .unwrap();
        assert!(matches!(
            tree.root[0].kind,
            ScadKind::Rotate { spec: RotateSpec::Euler(v), .. } if v.z == 45.0
        ));
        assert!(matches!(
            tree.root[1].kind,
            ScadKind::Rotate { spec: RotateSpec::Euler(v), .. } if v.x == 90.0
        ));
        assert!(matches!(
            tree.root[2].kind,
            ScadKind::Rotate { spec: RotateSpec::AxisAngle { a, .. }, .. } if a == 30.0
        ));
    }

    #[test]
    fn test_polygon_undef_paths() {
        let tree = lower_src("polygon(points=[[0,0],[1,0],[0,1]], paths=undef);").unwrap();
        match &tree.root[0].kind {
            ScadKind::Polygon { paths, points } => {
                assert!(paths.is_none());
                assert_eq!(points.len(), 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_modifiers_preserved() {
        let tree = lower_src("!cube(1);").unwrap();
        assert!(tree.root[0].modifiers.root);
    }
}
