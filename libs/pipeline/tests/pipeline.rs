//! End-to-end scenarios through the whole pipeline.

use glam::DVec2;
use slicer_pipeline::{Error, Pipeline, PipelineOptions, Stage};

fn options(z_step: f64) -> PipelineOptions {
    PipelineOptions { z_step, ..PipelineOptions::default() }
}

fn run(src: &str, opts: PipelineOptions) -> Pipeline {
    let mut p = Pipeline::parse("test.scad", src.to_string(), opts).unwrap();
    p.run_until(Stage::Triangulated).unwrap();
    p
}

#[test]
fn cube_slices_into_two_square_layers() {
    let p = run("cube(10);", options(5.0));
    let stack = p.stack();
    assert_eq!(stack.layers.len(), 2);
    assert_eq!(stack.layers[0].z, 2.5);
    assert_eq!(stack.layers[1].z, 7.5);
    for layer in &stack.layers {
        assert_eq!(layer.polys.paths.len(), 1);
        assert!((layer.polys.area() - 100.0).abs() < 1e-6);
    }
}

#[test]
fn difference_of_shifted_cubes_leaves_half() {
    let mut opts = options(5.0);
    opts.z_min = Some(2.5);
    let p = run(
        "difference() { cube(10); translate([5,0,0]) cube(10); }",
        opts,
    );
    let stack = p.stack();
    assert_eq!(stack.layers.len(), 2);
    for layer in &stack.layers {
        assert!((layer.polys.area() - 50.0).abs() < 1e-6);
        for v in &layer.polys.points {
            assert!(v.coord.x <= 5.0 + 1e-9);
        }
    }
}

#[test]
fn sphere_layers_shrink_with_z() {
    let p = run("sphere(r=10, $fn=8);", options(5.0));
    let stack = p.stack();
    assert_eq!(stack.layers.len(), 4);
    let zs: Vec<f64> = stack.layers.iter().map(|l| l.z).collect();
    assert_eq!(zs, vec![-7.5, -2.5, 2.5, 7.5]);
    for layer in &stack.layers {
        assert_eq!(layer.polys.points.len(), 8, "regular 8-gon per layer");
        let r = (100.0f64 - layer.z * layer.z).sqrt();
        for v in &layer.polys.points {
            assert!((v.coord.length() - r).abs() < 1e-4);
        }
    }
}

#[test]
fn sphere_tangent_layers_are_empty() {
    let mut opts = options(5.0);
    opts.z_min = Some(-10.0);
    opts.z_max = Some(10.0);
    let p = run("sphere(r=10, $fn=8);", opts);
    let stack = p.stack();
    assert_eq!(stack.layers.len(), 5);
    assert!(stack.layers[0].polys.is_empty(), "z = -10 grazes the sphere");
    assert!(stack.layers[4].polys.is_empty(), "z = +10 grazes the sphere");
    assert!(!stack.layers[2].polys.is_empty());
}

#[test]
fn empty_cube_aborts_at_csg3_build() {
    let mut p =
        Pipeline::parse("test.scad", "cube(0);".to_string(), options(5.0)).unwrap();
    let err = p.run_until(Stage::Emitted).unwrap_err();
    assert!(matches!(err, Error::Geom(csg3::GeomError::Empty { .. })));
    // the pipeline stopped where the error happened
    assert_eq!(p.stage(), Stage::Scadded);
}

#[test]
fn union_with_self_is_idempotent() {
    let single = run("cube(10);", options(5.0));
    let doubled = run("union() { cube(10); cube(10); }", options(5.0));
    for (a, b) in single.stack().layers.iter().zip(&doubled.stack().layers) {
        assert_eq!(a.z, b.z);
        assert!((a.polys.area() - b.polys.area()).abs() < 1e-9);
        assert_eq!(a.polys.paths.len(), b.polys.paths.len());
        assert_eq!(a.polys.paths[0].len(), b.polys.paths[0].len());
    }
}

#[test]
fn abutting_tokens_never_reach_the_scad_stage() {
    let err =
        Pipeline::parse("test.scad", "9.9foo".to_string(), options(5.0)).unwrap_err();
    match &err {
        Error::Parse(parse) => {
            // error points at the first byte of `foo`
            assert_eq!(parse.span.start(), 3);
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn error_rendering_carries_a_caret() {
    let mut p = Pipeline::parse(
        "test.scad",
        "cube(10);\npyramid(3);".to_string(),
        options(5.0),
    )
    .unwrap();
    let err = p.run_until(Stage::Emitted).unwrap_err();
    let rendered = p.render_error(&err);
    assert!(rendered.contains("test.scad:2: pyramid(3);"));
    assert!(rendered.contains("Error: unknown functor 'pyramid'"));
    let caret = rendered.lines().nth(1).unwrap();
    assert_eq!(caret.chars().last(), Some('^'));
}

#[test]
fn intersection_of_offset_cubes() {
    let p = run(
        "intersection() { cube(10); translate([4,4,0]) cube(10); }",
        options(5.0),
    );
    for layer in &p.stack().layers {
        assert!((layer.polys.area() - 36.0).abs() < 1e-6);
    }
}

#[test]
fn hole_survives_through_triangulation() {
    let p = run(
        "difference() { cube(10); translate([3,3,-1]) cube([4,4,12]); }",
        options(5.0),
    );
    for layer in &p.stack().layers {
        assert_eq!(layer.polys.paths.len(), 2, "outer ring plus hole");
        assert!((layer.polys.area() - 84.0).abs() < 1e-6);
        let tri_area: f64 = layer
            .triangles
            .iter()
            .map(|t| {
                let a = layer.polys.points[t[0]].coord;
                let b = layer.polys.points[t[1]].coord;
                let c = layer.polys.points[t[2]].coord;
                (b - a).perp_dot(c - a) / 2.0
            })
            .sum();
        assert!((tri_area - 84.0).abs() < 1e-6);
    }
}

#[test]
fn linear_extrude_of_2d_booleans() {
    let p = run(
        "linear_extrude(height=10) difference() { \
         circle(r=4, $fn=16); circle(r=2, $fn=16); }",
        options(5.0),
    );
    let stack = p.stack();
    assert_eq!(stack.layers.len(), 2);
    for layer in &stack.layers {
        assert_eq!(layer.polys.paths.len(), 2);
        assert!(layer.polys.area() > 0.0);
        assert!(!layer.polys.contains(DVec2::ZERO), "hole is empty at centre");
    }
}

#[test]
fn layer_diff_pass_empties_identical_layers() {
    let mut opts = options(2.5);
    opts.diff = true;
    let mut p = Pipeline::parse("test.scad", "cube(10);".to_string(), opts).unwrap();
    p.run_until(Stage::Diffed).unwrap();
    let stack = p.stack();
    assert!(!stack.layers[0].polys.is_empty(), "layer 0 unchanged");
    for layer in &stack.layers[1..] {
        assert!(
            layer.polys.is_empty(),
            "identical cube layers cancel at z = {}",
            layer.z
        );
    }
}

#[test]
fn warnings_do_not_stop_the_pipeline() {
    let mut opts = options(5.0);
    opts.csg.policies.empty = config::Policy::Warn;
    let mut p = Pipeline::parse(
        "test.scad",
        "union() { cube(0); cube(10); }".to_string(),
        opts,
    )
    .unwrap();
    p.run_until(Stage::Triangulated).unwrap();
    assert_eq!(p.warnings().len(), 1);
    assert_eq!(p.stack().layers.len(), 2);
}
