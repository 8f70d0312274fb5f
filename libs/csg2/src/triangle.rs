//! # Triangulation
//!
//! Ear clipping over polygons with holes. Holes are joined to their outer
//! ring through bridge diagonals between existing vertices, so every
//! triangle corner is a vertex of the input set. Degenerate ears (area
//! within the sqr epsilon) are dropped, never emitted.

use glam::DVec2;

use config::Tolerances;

use crate::error::Csg2Error;
use crate::poly::{cross, PolygonSet};

/// Triangulate every polygon (outer ring plus its holes) of a flat layer.
///
/// Returns index triples into `set.points`, counter-clockwise.
///
/// ## Example
///
/// ```rust
/// use csg2::{PolygonSet, triangle::triangulate_set};
/// use config::Tolerances;
/// use glam::DVec2;
/// use scad_parser::Span;
///
/// let mut set = PolygonSet::empty();
/// set.push_ring(
///     [DVec2::new(0.0, 0.0), DVec2::new(2.0, 0.0), DVec2::new(1.0, 2.0)],
///     Span::at(0),
/// );
/// let tris = triangulate_set(&set, &Tolerances::default()).unwrap();
/// assert_eq!(tris.len(), 1);
/// ```
pub fn triangulate_set(
    set: &PolygonSet,
    tol: &Tolerances,
) -> Result<Vec<[usize; 3]>, Csg2Error> {
    let at = |i: usize| set.points[i].coord;

    // partition rings into outers (ccw) and holes (cw)
    let mut outers: Vec<(usize, f64)> = Vec::new();
    let mut holes: Vec<usize> = Vec::new();
    for (pi, path) in set.paths.iter().enumerate() {
        if path.len() < 3 {
            continue;
        }
        let area = set.path_area(path);
        if area > 0.0 {
            outers.push((pi, area));
        } else if area < 0.0 {
            holes.push(pi);
        }
    }

    // each hole belongs to the smallest outer containing it
    let mut hole_of: Vec<Vec<usize>> = vec![Vec::new(); outers.len()];
    for &hi in &holes {
        let sample = at(set.paths[hi][0]);
        let mut best: Option<(usize, f64)> = None;
        for (oi, &(pi, area)) in outers.iter().enumerate() {
            if ring_contains(set, &set.paths[pi], sample)
                && best.map_or(true, |(_, ba)| area < ba)
            {
                best = Some((oi, area));
            }
        }
        if let Some((oi, _)) = best {
            hole_of[oi].push(hi);
        }
    }

    let mut triangles = Vec::new();
    for (oi, &(pi, _)) in outers.iter().enumerate() {
        let mut ring: Vec<usize> = set.paths[pi].clone();
        // bridge holes in, rightmost first for stable nesting
        let mut pending: Vec<usize> = hole_of[oi].clone();
        pending.sort_by(|&a, &b| {
            let ax = max_x_vertex(set, &set.paths[a]).1.x;
            let bx = max_x_vertex(set, &set.paths[b]).1.x;
            bx.partial_cmp(&ax).unwrap_or(std::cmp::Ordering::Equal)
        });
        for hi in pending {
            ring = bridge_hole(set, ring, &set.paths[hi], tol)?;
        }
        ear_clip(set, ring, tol, &mut triangles)?;
    }
    Ok(triangles)
}

/// Nonzero winding test against one ring.
fn ring_contains(set: &PolygonSet, path: &[usize], p: DVec2) -> bool {
    let mut wn = 0;
    for k in 0..path.len() {
        let a = set.points[path[k]].coord;
        let b = set.points[path[(k + 1) % path.len()]].coord;
        if a.y <= p.y {
            if b.y > p.y && cross(b - a, p - a) > 0.0 {
                wn += 1;
            }
        } else if b.y <= p.y && cross(b - a, p - a) < 0.0 {
            wn -= 1;
        }
    }
    wn != 0
}

fn max_x_vertex(set: &PolygonSet, path: &[usize]) -> (usize, DVec2) {
    let mut best = 0;
    for k in 1..path.len() {
        if set.points[path[k]].coord.x > set.points[path[best]].coord.x {
            best = k;
        }
    }
    (best, set.points[path[best]].coord)
}

/// Join a hole into the outer ring with a two-way bridge diagonal.
///
/// The bridge endpoint on the outer ring is the visible vertex hit by a
/// rightward ray from the hole's rightmost vertex (David Eberly's method,
/// with the reflex-in-triangle refinement).
fn bridge_hole(
    set: &PolygonSet,
    outer: Vec<usize>,
    hole: &[usize],
    tol: &Tolerances,
) -> Result<Vec<usize>, Csg2Error> {
    let at = |i: usize| set.points[i].coord;
    let (mk, m) = max_x_vertex(set, hole);

    // closest outer edge crossed by the ray from m towards +x
    let mut best: Option<(f64, usize)> = None; // (x of crossing, outer pos)
    for k in 0..outer.len() {
        let a = at(outer[k]);
        let b = at(outer[(k + 1) % outer.len()]);
        if (a.y - m.y).abs() <= tol.eq && a.x >= m.x - tol.eq {
            // ray hits a vertex directly
            if best.map_or(true, |(bx, _)| a.x < bx) {
                best = Some((a.x, k));
            }
            continue;
        }
        if (a.y > m.y) == (b.y > m.y) {
            continue;
        }
        let x = a.x + (m.y - a.y) / (b.y - a.y) * (b.x - a.x);
        if x >= m.x - tol.eq {
            // take the edge endpoint with the larger x as candidate
            let pos = if at(outer[k]).x > at(outer[(k + 1) % outer.len()]).x {
                k
            } else {
                (k + 1) % outer.len()
            };
            if best.map_or(true, |(bx, _)| x < bx) {
                best = Some((x, pos));
            }
        }
    }
    let (_, mut opos) = best.ok_or(Csg2Error::NoEar {
        span: set.points[hole[mk]].span,
    })?;

    // refinement: a reflex outer vertex inside the triangle (m, crossing,
    // candidate) would make the bridge cross the boundary; take the one
    // closest in angle to the ray instead
    let p = at(outer[opos]);
    let mut best_alt: Option<(f64, usize)> = None;
    for k in 0..outer.len() {
        if k == opos {
            continue;
        }
        let q = at(outer[k]);
        if q.x < m.x || (q - p).length_squared() <= tol.sqr {
            continue;
        }
        if in_triangle(m, DVec2::new(p.x.max(m.x), m.y), p, q, tol) {
            let tan = ((q.y - m.y) / (q.x - m.x).max(tol.eq)).abs();
            if best_alt.map_or(true, |(bt, _)| tan < bt) {
                best_alt = Some((tan, k));
            }
        }
    }
    if let Some((_, k)) = best_alt {
        opos = k;
    }

    // splice: outer[..=opos], hole from mk around (cw), back to mk, back to
    // outer[opos], rest of outer
    let mut merged = Vec::with_capacity(outer.len() + hole.len() + 2);
    merged.extend_from_slice(&outer[..=opos]);
    for k in 0..=hole.len() {
        merged.push(hole[(mk + k) % hole.len()]);
    }
    merged.push(outer[opos]);
    merged.extend_from_slice(&outer[opos + 1..]);
    Ok(merged)
}

fn in_triangle(a: DVec2, b: DVec2, c: DVec2, p: DVec2, tol: &Tolerances) -> bool {
    let d1 = cross(b - a, p - a);
    let d2 = cross(c - b, p - b);
    let d3 = cross(a - c, p - c);
    let has_neg = d1 < -tol.sqr || d2 < -tol.sqr || d3 < -tol.sqr;
    let has_pos = d1 > tol.sqr || d2 > tol.sqr || d3 > tol.sqr;
    !(has_neg && has_pos)
}

/// Clip ears off a counter-clockwise ring, lowest index first.
fn ear_clip(
    set: &PolygonSet,
    mut ring: Vec<usize>,
    tol: &Tolerances,
    out: &mut Vec<[usize; 3]>,
) -> Result<(), Csg2Error> {
    let at = |i: usize| set.points[i].coord;

    while ring.len() > 3 {
        let n = ring.len();
        let mut clipped = false;
        for i in 0..n {
            let pi = ring[(i + n - 1) % n];
            let ci = ring[i];
            let ni = ring[(i + 1) % n];
            let p = at(pi);
            let c = at(ci);
            let q = at(ni);
            let a2 = cross(c - p, q - c);

            // collapsed corner: remove without emitting
            if a2.abs() <= tol.sqr && (c - p).dot(q - c) >= 0.0 {
                ring.remove(i);
                clipped = true;
                break;
            }
            if a2 <= 0.0 {
                continue; // reflex
            }
            // no other ring vertex may lie inside the candidate ear
            let mut blocked = false;
            for &ri in &ring {
                let r = at(ri);
                if r == p || r == c || r == q {
                    continue;
                }
                if in_triangle(p, c, q, r, tol) {
                    blocked = true;
                    break;
                }
            }
            if blocked {
                continue;
            }
            if a2 / 2.0 > tol.sqr {
                out.push([pi, ci, ni]);
            }
            ring.remove(i);
            clipped = true;
            break;
        }
        if !clipped {
            return Err(Csg2Error::NoEar {
                span: set.points[ring[0]].span,
            });
        }
    }
    if ring.len() == 3 {
        let a2 = cross(at(ring[1]) - at(ring[0]), at(ring[2]) - at(ring[1]));
        if a2 / 2.0 > tol.sqr {
            out.push([ring[0], ring[1], ring[2]]);
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use scad_parser::Span;

    fn tol() -> Tolerances {
        Tolerances::default()
    }

    fn ring_set(coords: &[(f64, f64)]) -> PolygonSet {
        let mut set = PolygonSet::empty();
        set.push_ring(
            coords.iter().map(|&(x, y)| DVec2::new(x, y)),
            Span::at(0),
        );
        set
    }

    fn tri_area(set: &PolygonSet, tris: &[[usize; 3]]) -> f64 {
        tris.iter()
            .map(|t| {
                let a = set.points[t[0]].coord;
                let b = set.points[t[1]].coord;
                let c = set.points[t[2]].coord;
                cross(b - a, c - a) / 2.0
            })
            .sum()
    }

    #[test]
    fn test_triangle_passthrough() {
        let set = ring_set(&[(0.0, 0.0), (2.0, 0.0), (1.0, 2.0)]);
        let tris = triangulate_set(&set, &tol()).unwrap();
        assert_eq!(tris.len(), 1);
        assert!((tri_area(&set, &tris) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_square_two_triangles() {
        let set = ring_set(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let tris = triangulate_set(&set, &tol()).unwrap();
        assert_eq!(tris.len(), 2);
        assert!((tri_area(&set, &tris) - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_concave_polygon() {
        // an L shape
        let set = ring_set(&[
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 2.0),
            (2.0, 2.0),
            (2.0, 4.0),
            (0.0, 4.0),
        ]);
        let tris = triangulate_set(&set, &tol()).unwrap();
        assert_eq!(tris.len(), 4);
        assert!((tri_area(&set, &tris) - 12.0).abs() < 1e-12);
        // all triangles counter-clockwise
        for t in &tris {
            let a = set.points[t[0]].coord;
            let b = set.points[t[1]].coord;
            let c = set.points[t[2]].coord;
            assert!(cross(b - a, c - a) > 0.0);
        }
    }

    #[test]
    fn test_square_with_hole() {
        let mut set = ring_set(&[(0.0, 0.0), (6.0, 0.0), (6.0, 6.0), (0.0, 6.0)]);
        // clockwise hole
        set.push_ring(
            [
                DVec2::new(2.0, 2.0),
                DVec2::new(2.0, 4.0),
                DVec2::new(4.0, 4.0),
                DVec2::new(4.0, 2.0),
            ],
            Span::at(0),
        );
        let tris = triangulate_set(&set, &tol()).unwrap();
        assert!((tri_area(&set, &tris) - 32.0).abs() < 1e-9);
        // no Steiner points: all indices reference input vertices
        for t in &tris {
            for &i in t {
                assert!(i < set.points.len());
            }
        }
    }

    #[test]
    fn test_two_disjoint_outers() {
        let mut set = ring_set(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        set.push_ring(
            [
                DVec2::new(5.0, 0.0),
                DVec2::new(6.0, 0.0),
                DVec2::new(6.0, 1.0),
                DVec2::new(5.0, 1.0),
            ],
            Span::at(0),
        );
        let tris = triangulate_set(&set, &tol()).unwrap();
        assert_eq!(tris.len(), 4);
        assert!((tri_area(&set, &tris) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_set() {
        let set = PolygonSet::empty();
        assert!(triangulate_set(&set, &tol()).unwrap().is_empty());
    }
}
