//! # Primitive Slicer
//!
//! Intersects one CSG3 primitive with a horizontal plane and returns the
//! cross-section as a polygon set in world xy coordinates.
//!
//! - Spheres pull the plane back through their matrix and cut the local
//!   sphere in a circle.
//! - Axis-aligned cylinders emit a regular n-gon at the interpolated radius.
//! - Polyhedra walk their faces, collect the chords where each face crosses
//!   the plane, and stitch the chords into closed loops.
//! - Extrusions emit their profile whenever the plane is inside the range.

use std::collections::HashMap;
use std::f64::consts::PI;

use glam::{DVec2, DVec3};

use config::Tolerances;
use csg3::{Csg3, Poly2};
use scad_parser::{Span, Spanned};

use crate::error::Csg2Error;
use crate::poly::PolygonSet;

/// Cross-section of a primitive at the plane `z`.
///
/// Combinator nodes are rejected by debug assertion; the operand tree only
/// hands primitives in.
pub fn slice(prim: &Csg3, z: f64, tol: &Tolerances) -> Result<PolygonSet, Csg2Error> {
    let span = prim.span();
    match prim {
        Csg3::Sphere { mat, r, segments, .. } => {
            Ok(slice_sphere(*mat, *r, *segments, z, tol, span))
        }
        Csg3::Cyl { mat, z0, z1, r1, r2, segments, .. } => {
            Ok(slice_cyl(*mat, *z0, *z1, *r1, *r2, *segments, z, tol, span))
        }
        Csg3::Poly { points, faces, .. } => slice_poly(points, faces, z, tol, span),
        Csg3::Extrude { profile, z0, z1, .. } => {
            Ok(slice_extrude(profile, *z0, *z1, z, tol, span))
        }
        _ => {
            debug_assert!(false, "combinator handed to the primitive slicer");
            Ok(PolygonSet::empty())
        }
    }
}

// =============================================================================
// SPHERE
// =============================================================================

fn slice_sphere(
    mat: glam::DMat4,
    r: f64,
    segments: u32,
    z: f64,
    tol: &Tolerances,
    span: Span,
) -> PolygonSet {
    // Pull the world plane w.z = z back to local coordinates:
    // (M p).z = n . p + t.z with n = the matrix's third row.
    let n = DVec3::new(mat.x_axis.z, mat.y_axis.z, mat.z_axis.z);
    let len = n.length();
    if len <= f64::MIN_POSITIVE {
        return PolygonSet::empty();
    }
    let n_hat = n / len;
    let dist = (z - mat.w_axis.z) / len;
    let rl_sq = r * r - dist * dist;
    if rl_sq <= tol.sqr {
        // tangent or missing the sphere entirely
        return PolygonSet::empty();
    }
    let rl = rl_sq.sqrt();
    let center = n_hat * dist;
    let u = n_hat.any_orthonormal_vector();
    let v = n_hat.cross(u);

    let coords = (0..segments).map(|i| {
        let a = (2.0 * i as f64 + 1.0) * PI / segments as f64;
        let p = center + rl * (a.cos() * u + a.sin() * v);
        mat.transform_point3(p).truncate()
    });
    ring_set(coords.collect(), span)
}

// =============================================================================
// CYLINDER
// =============================================================================

fn slice_cyl(
    mat: glam::DMat4,
    z0: f64,
    z1: f64,
    r1: f64,
    r2: f64,
    segments: u32,
    z: f64,
    tol: &Tolerances,
    span: Span,
) -> PolygonSet {
    let m22 = mat.z_axis.z;
    if m22.abs() <= tol.eq {
        return PolygonSet::empty();
    }
    let zl = (z - mat.w_axis.z) / m22;
    if zl < z0 - tol.eq || zl > z1 + tol.eq {
        return PolygonSet::empty();
    }
    let zl = zl.clamp(z0, z1);
    let rl = r1 + (r2 - r1) * (zl - z0) / (z1 - z0);
    if rl <= tol.eq {
        // apex of a cone
        return PolygonSet::empty();
    }

    let coords = (0..segments).map(|i| {
        let a = (2.0 * i as f64 + 1.0) * PI / segments as f64;
        mat.transform_point3(DVec3::new(rl * a.cos(), rl * a.sin(), zl))
            .truncate()
    });
    ring_set(coords.collect(), span)
}

/// Build a one-ring set, restoring counter-clockwise orientation if the
/// primitive's matrix mirrored it.
fn ring_set(mut coords: Vec<DVec2>, span: Span) -> PolygonSet {
    let mut area = 0.0;
    for k in 0..coords.len() {
        let a = coords[k];
        let b = coords[(k + 1) % coords.len()];
        area += a.x * b.y - b.x * a.y;
    }
    if area < 0.0 {
        coords.reverse();
    }
    let mut set = PolygonSet::empty();
    set.push_ring(coords, span);
    set
}

// =============================================================================
// POLYHEDRON
// =============================================================================

fn slice_poly(
    points: &[DVec3],
    faces: &[Vec<usize>],
    z: f64,
    tol: &Tolerances,
    span: Span,
) -> Result<PolygonSet, Csg2Error> {
    // Epsilon-bias the plane off any coplanar vertices so every edge either
    // misses or strictly crosses it.
    let mut zc = z;
    for _ in 0..16 {
        if points.iter().any(|p| (p.z - zc).abs() <= tol.eq) {
            zc += 2.0 * tol.eq;
        } else {
            break;
        }
    }

    let mut segs: Vec<(DVec2, DVec2)> = Vec::new();
    for face in faces {
        let mut crossings: Vec<DVec2> = Vec::new();
        for k in 0..face.len() {
            let a = points[face[k]];
            let b = points[face[(k + 1) % face.len()]];
            let sa = a.z - zc;
            let sb = b.z - zc;
            if (sa < 0.0) != (sb < 0.0) {
                let t = sa / (sa - sb);
                let p = a + (b - a) * t;
                crossings.push(p.truncate());
            }
        }
        if crossings.is_empty() {
            continue;
        }
        if crossings.len() % 2 != 0 {
            return Err(Csg2Error::OddCrossings { span });
        }

        // Chords pair consecutive crossings sorted along z-cross-normal, so
        // the face interior lies between each pair and the boundary runs
        // with the solid's interior on its left.
        let n = newell_normal(face, points);
        let dir = DVec2::new(-n.y, n.x);
        if dir.length_squared() <= f64::MIN_POSITIVE {
            continue;
        }
        let dir = dir.normalize();
        crossings.sort_by(|a, b| {
            a.dot(dir)
                .partial_cmp(&b.dot(dir))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for pair in crossings.chunks(2) {
            if (pair[1] - pair[0]).length_squared() > tol.sqr {
                segs.push((pair[0], pair[1]));
            }
        }
    }

    stitch(segs, tol, span)
}

fn newell_normal(face: &[usize], points: &[DVec3]) -> DVec3 {
    let mut n = DVec3::ZERO;
    for k in 0..face.len() {
        let a = points[face[k]];
        let b = points[face[(k + 1) % face.len()]];
        n += DVec3::new(
            (a.y - b.y) * (a.z + b.z),
            (a.z - b.z) * (a.x + b.x),
            (a.x - b.x) * (a.y + b.y),
        );
    }
    n * 0.5
}

/// Chain chords into closed loops by endpoint matching within eq.
fn stitch(
    segs: Vec<(DVec2, DVec2)>,
    tol: &Tolerances,
    span: Span,
) -> Result<PolygonSet, Csg2Error> {
    let cell = tol.eq.max(f64::MIN_POSITIVE);
    let key = |p: DVec2| -> (i64, i64) {
        ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64)
    };

    let mut starts: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, seg) in segs.iter().enumerate() {
        starts.entry(key(seg.0)).or_default().push(i);
    }

    let mut used = vec![false; segs.len()];
    let mut set = PolygonSet::empty();

    for i in 0..segs.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut ring = vec![segs[i].0];
        let mut end = segs[i].1;
        let first = segs[i].0;

        for _guard in 0..=segs.len() {
            if (end - first).length() <= tol.eq {
                break;
            }
            // nearest unused chord starting within eq of the open end
            let (kx, ky) = key(end);
            let mut best: Option<(usize, f64)> = None;
            for dx in -1..=1 {
                for dy in -1..=1 {
                    if let Some(cands) = starts.get(&(kx + dx, ky + dy)) {
                        for &j in cands {
                            if used[j] {
                                continue;
                            }
                            let d = (segs[j].0 - end).length();
                            if d <= tol.eq && best.map_or(true, |(_, bd)| d < bd) {
                                best = Some((j, d));
                            }
                        }
                    }
                }
            }
            let (j, _) = best.ok_or(Csg2Error::OpenLoop { span })?;
            used[j] = true;
            ring.push(segs[j].0);
            end = segs[j].1;
        }

        if (end - first).length() > tol.eq {
            return Err(Csg2Error::OpenLoop { span });
        }
        if ring.len() >= 3 {
            set.push_ring(ring, span);
        }
    }
    Ok(set)
}

// =============================================================================
// EXTRUSION
// =============================================================================

fn slice_extrude(
    profile: &Poly2,
    z0: f64,
    z1: f64,
    z: f64,
    tol: &Tolerances,
    span: Span,
) -> PolygonSet {
    if z < z0 - tol.eq || z > z1 + tol.eq {
        return PolygonSet::empty();
    }
    let mut set = PolygonSet::empty();
    set.points = profile
        .points
        .iter()
        .map(|&coord| crate::poly::Vertex2 { coord, span })
        .collect();
    set.paths = profile.paths.clone();
    set
}

// =============================================================================
// TESTS
// =============================================================================
