//! Lowering behaviour across the recognized functor set.

use scad_ast::{lower, put_scad, ScadError, ScadKind};
use scad_parser::parse;

fn lower_src(src: &str) -> Result<scad_ast::ScadTree, ScadError> {
    lower(&parse("t", src.to_string()).unwrap())
}

#[test]
fn recognizes_the_whole_functor_set() {
    let src = "
        union() { cube(1); sphere(1); cylinder(h=1); polyhedron(
            points=[[0,0,0],[1,0,0],[0,1,0],[0,0,1]],
            faces=[[0,2,1],[0,1,3],[1,2,3],[0,3,2]]); }
        difference() { cube(2); cube(1); }
        intersection() { cube(2); sphere(2); }
        group() cube(1);
        translate([1,0,0]) rotate(45) scale(2) mirror([1,0,0])
            multmatrix([[1,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]]) cube(1);
        linear_extrude(height=2) { square(1); circle(1); polygon(points=[[0,0],[1,0],[0,1]]); }
    ";
    let tree = lower_src(src).unwrap();
    assert_eq!(tree.root.len(), 6);
}

#[test]
fn keyword_overrides_positional() {
    let tree = lower_src("cube(1, size=[2,3,4]);").unwrap();
    match &tree.root[0].kind {
        ScadKind::Cube { size, .. } => assert_eq!(size.x, 2.0),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_required_argument_is_fatal() {
    let err = lower_src("polygon(paths=[[0,1,2]]);").unwrap_err();
    assert!(matches!(
        err,
        ScadError::MissingArg { name: "points", .. }
    ));
}

#[test]
fn unknown_functor_is_fatal() {
    let err = lower_src("hull() cube(1);").unwrap_err();
    assert!(matches!(err, ScadError::UnknownFunctor { ref name, .. } if name == "hull"));
}

#[test]
fn dollar_variables_scope_lexically_not_dynamically() {
    let tree = lower_src(
        "union($fa=6, $fs=0.5) { sphere(10); } sphere(10);",
    )
    .unwrap();
    let inner = &tree.root[0].children()[0];
    match (&inner.kind, &tree.root[1].kind) {
        (ScadKind::Sphere { res: scoped, .. }, ScadKind::Sphere { res: outer, .. }) => {
            assert_eq!(scoped.fa, 6.0);
            assert_eq!(scoped.fs, 0.5);
            assert_eq!(outer.fa, 12.0);
            assert_eq!(outer.fs, 2.0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn triangles_alias_binds_faces() {
    let tree = lower_src(
        "polyhedron(points=[[0,0,0],[1,0,0],[0,1,0],[0,0,1]], \
         triangles=[[0,2,1],[0,1,3],[1,2,3],[0,3,2]]);",
    )
    .unwrap();
    match &tree.root[0].kind {
        ScadKind::Polyhedron { faces, .. } => assert_eq!(faces.len(), 4),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn print_then_lower_fixed_point() {
    let src = "difference() { cylinder(h=10, d=8, $fn=24); \
               translate([0,0,-1]) cylinder(h=12, d=4, $fn=24); }";
    let once = lower_src(src).unwrap();
    let twice = lower_src(&put_scad(&once)).unwrap();
    assert!(once.same_shape(&twice));
}
