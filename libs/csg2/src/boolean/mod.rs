//! # Boolean Evaluator
//!
//! Flattens a layer's operand tree to one polygon set. The core `combine`
//! pass works on any number of operands at once under a membership function
//! (union = any, difference = first and not rest, intersection = all,
//! xor = odd count); tree nodes with more children than `max_simultaneous`
//! are evaluated in stages.
//!
//! The algorithm is a classification sweep:
//!
//! 1. snap all operand vertices to the `pt` grid,
//! 2. split every edge where it meets any other edge (crossings and
//!    collinear overlaps),
//! 3. keep each sub-edge iff the membership function differs between the
//!    two sides of its midpoint, oriented with the result's interior on the
//!    left,
//! 4. drop coincident duplicates and stitch the survivors into closed
//!    loops, taking the first-clockwise continuation at junctions.
//!
//! Coincident edges need no special casing: equal orientation collapses in
//! step 4's dedup, opposite orientation already fails step 3's two-sided
//! test.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use glam::DVec2;

use config::constants::MAX_LAZY;
use config::{CsgOpt, Tolerances};
use scad_parser::Span;

use crate::error::Csg2Error;
use crate::poly::{cross, PolygonSet, Vertex2};
use crate::slice::slice;
use crate::tree::{Csg2Node, Csg2Tree};

// =============================================================================
// SCRATCH
// =============================================================================

/// Per-worker scratch buffers, reused across layers with bulk-clear
/// semantics. Anything that must outlive a layer is moved into the layer's
/// own result.
#[derive(Debug, Default)]
pub struct Scratch {
    memb_l: Vec<bool>,
    memb_r: Vec<bool>,
    ts: Vec<f64>,
}

// =============================================================================
// TREE EVALUATION
// =============================================================================

/// Evaluate the operand tree at one z plane to a flat polygon set.
pub fn flatten_layer(
    tree: &Csg2Tree,
    z: f64,
    opt: &CsgOpt,
    scratch: &mut Scratch,
) -> Result<PolygonSet, Csg2Error> {
    match &tree.root {
        None => Ok(PolygonSet::empty()),
        Some(node) => {
            let set = eval_node(node, z, opt, scratch)?;
            match node {
                // a bare primitive still gets normalised onto the grid
                Csg2Node::Leaf { .. } => combine(&[set], &|m| m[0], opt, scratch),
                _ => Ok(set),
            }
        }
    }
}

fn eval_node(
    node: &Csg2Node,
    z: f64,
    opt: &CsgOpt,
    scratch: &mut Scratch,
) -> Result<PolygonSet, Csg2Error> {
    match node {
        Csg2Node::Leaf { prim, .. } => slice(prim, z, &opt.tol),
        Csg2Node::Add { children, .. } => {
            let ops = eval_children(children, z, opt, scratch)?;
            union_staged(ops, opt, scratch)
        }
        Csg2Node::Cut { children, .. } => {
            let ops = eval_children(children, z, opt, scratch)?;
            intersect_staged(ops, opt, scratch)
        }
        Csg2Node::Sub { add, sub, .. } => {
            let minuend = union_staged(eval_children(add, z, opt, scratch)?, opt, scratch)?;
            if minuend.is_empty() {
                return Ok(minuend);
            }
            let subs = eval_children(sub, z, opt, scratch)?;
            subtract_staged(minuend, subs, opt, scratch)
        }
    }
}

fn eval_children(
    children: &[Csg2Node],
    z: f64,
    opt: &CsgOpt,
    scratch: &mut Scratch,
) -> Result<Vec<PolygonSet>, Csg2Error> {
    children
        .iter()
        .map(|c| eval_node(c, z, opt, scratch))
        .collect()
}

fn cap(opt: &CsgOpt) -> usize {
    opt.max_simultaneous.clamp(2, MAX_LAZY)
}

/// Union in stages of at most `max_simultaneous` operands.
pub fn union_staged(
    mut ops: Vec<PolygonSet>,
    opt: &CsgOpt,
    scratch: &mut Scratch,
) -> Result<PolygonSet, Csg2Error> {
    if opt.optimise.skip_empty {
        ops.retain(|s| !s.is_empty());
    }
    if ops.is_empty() {
        return Ok(PolygonSet::empty());
    }
    let cap = cap(opt);
    loop {
        let take = cap.min(ops.len());
        let chunk: Vec<PolygonSet> = ops.drain(..take).collect();
        let merged = combine(&chunk, &|m| m.iter().any(|&x| x), opt, scratch)?;
        if ops.is_empty() {
            return Ok(merged);
        }
        ops.insert(0, merged);
    }
}

/// Intersection in stages; an empty operand empties the result.
fn intersect_staged(
    ops: Vec<PolygonSet>,
    opt: &CsgOpt,
    scratch: &mut Scratch,
) -> Result<PolygonSet, Csg2Error> {
    if ops.is_empty() || ops.iter().any(|s| s.is_empty()) {
        return Ok(PolygonSet::empty());
    }
    let cap = cap(opt);
    let mut ops = ops;
    loop {
        let take = cap.min(ops.len());
        let chunk: Vec<PolygonSet> = ops.drain(..take).collect();
        let merged = combine(&chunk, &|m| m.iter().all(|&x| x), opt, scratch)?;
        if ops.is_empty() || merged.is_empty() {
            return Ok(merged);
        }
        ops.insert(0, merged);
    }
}

/// Subtract the operands from `minuend`, `max_simultaneous - 1` at a time.
fn subtract_staged(
    minuend: PolygonSet,
    mut subs: Vec<PolygonSet>,
    opt: &CsgOpt,
    scratch: &mut Scratch,
) -> Result<PolygonSet, Csg2Error> {
    if opt.optimise.skip_empty {
        subs.retain(|s| !s.is_empty());
    }
    if subs.is_empty() {
        // still normalise onto the grid
        return combine(&[minuend], &|m| m[0], opt, scratch);
    }
    let cap = cap(opt);
    let mut acc = minuend;
    while !subs.is_empty() {
        let take = (cap - 1).min(subs.len());
        let mut ops = vec![acc];
        ops.extend(subs.drain(..take));
        acc = combine(&ops, &|m| m[0] && !m[1..].iter().any(|&x| x), opt, scratch)?;
        if acc.is_empty() {
            break;
        }
    }
    Ok(acc)
}

/// Symmetric difference of two layers (used by the layer-diff pass).
pub fn xor(
    a: &PolygonSet,
    b: &PolygonSet,
    opt: &CsgOpt,
    scratch: &mut Scratch,
) -> Result<PolygonSet, Csg2Error> {
    combine(
        &[a.clone(), b.clone()],
        &|m| m.iter().filter(|&&x| x).count() % 2 == 1,
        opt,
        scratch,
    )
}

// =============================================================================
// COMBINE
// =============================================================================

#[derive(Clone, Copy)]
struct Edge {
    a: DVec2,
    b: DVec2,
    span: Span,
}

/// Combine any number of operands under a membership function.
///
/// The function maps per-operand insideness to result insideness; the
/// output boundary is exactly where it changes value.
pub fn combine(
    operands: &[PolygonSet],
    membership: &dyn Fn(&[bool]) -> bool,
    opt: &CsgOpt,
    scratch: &mut Scratch,
) -> Result<PolygonSet, Csg2Error> {
    let tol = &opt.tol;
    let snapped: Vec<PolygonSet> = operands.iter().map(|s| snap_set(s, tol)).collect();

    // gather operand boundary edges
    let mut edges: Vec<Edge> = Vec::new();
    for set in &snapped {
        for path in &set.paths {
            for k in 0..path.len() {
                let va = set.points[path[k]];
                let vb = set.points[path[(k + 1) % path.len()]];
                if va.coord != vb.coord {
                    edges.push(Edge { a: va.coord, b: vb.coord, span: va.span });
                }
            }
        }
    }

    // split at crossings, foreign vertices and collinear overlaps
    let mut pieces: Vec<Edge> = Vec::new();
    for (i, e) in edges.iter().enumerate() {
        let ts = &mut scratch.ts;
        ts.clear();
        for (j, o) in edges.iter().enumerate() {
            if i != j {
                split_params(e, o, tol, ts);
            }
        }
        ts.retain(|t| *t > 1e-12 && *t < 1.0 - 1e-12);
        ts.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
        ts.dedup_by(|x, y| (*x - *y).abs() < 1e-12);

        let mut prev = e.a;
        for &t in ts.iter() {
            let p = snap2(e.a + (e.b - e.a) * t, tol);
            if p != prev {
                pieces.push(Edge { a: prev, b: p, span: e.span });
                prev = p;
            }
        }
        if e.b != prev {
            pieces.push(Edge { a: prev, b: e.b, span: e.span });
        }
    }

    // two-sided classification of every piece
    let delta = tol.pt * 0.25;
    let mut kept: BTreeMap<(i64, i64, i64, i64), Edge> = BTreeMap::new();
    let memb_l = &mut scratch.memb_l;
    let memb_r = &mut scratch.memb_r;
    memb_l.clear();
    memb_r.clear();
    memb_l.resize(snapped.len(), false);
    memb_r.resize(snapped.len(), false);
    for piece in &pieces {
        let d = piece.b - piece.a;
        let len = d.length();
        if len <= f64::MIN_POSITIVE {
            continue;
        }
        let normal = DVec2::new(-d.y, d.x) / len;
        let mid = (piece.a + piece.b) * 0.5;
        let l = mid + normal * delta;
        let r = mid - normal * delta;
        for (k, set) in snapped.iter().enumerate() {
            memb_l[k] = set.contains(l);
            memb_r[k] = set.contains(r);
        }
        let fl = membership(memb_l);
        let fr = membership(memb_r);
        if fl == fr {
            continue;
        }
        // interior on the left
        let e = if fl {
            *piece
        } else {
            Edge { a: piece.b, b: piece.a, span: piece.span }
        };
        let key = (
            tol.grid(e.a.x),
            tol.grid(e.a.y),
            tol.grid(e.b.x),
            tol.grid(e.b.y),
        );
        kept.entry(key).or_insert(e);
    }

    stitch_loops(kept, opt)
}

/// Snap a polygon set onto the pt grid, fusing vertices that land on the
/// same cell and dropping rings that collapse.
fn snap_set(set: &PolygonSet, tol: &Tolerances) -> PolygonSet {
    let mut out = PolygonSet::empty();
    let mut index: BTreeMap<(i64, i64), usize> = BTreeMap::new();
    for path in &set.paths {
        let mut ring: Vec<usize> = Vec::new();
        for &i in path {
            let v = set.points[i];
            let c = snap2(v.coord, tol);
            let key = (tol.grid(c.x), tol.grid(c.y));
            let idx = *index.entry(key).or_insert_with(|| {
                out.points.push(Vertex2 { coord: c, span: v.span });
                out.points.len() - 1
            });
            if ring.last() != Some(&idx) {
                ring.push(idx);
            }
        }
        while ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() >= 3 {
            out.paths.push(ring);
        }
    }
    out
}

#[inline]
fn snap2(p: DVec2, tol: &Tolerances) -> DVec2 {
    DVec2::new(tol.snap(p.x), tol.snap(p.y))
}

/// Split parameters on `e` contributed by `o`: a proper crossing, an
/// endpoint of `o` on `e`, or the overlap ends of a collinear pair.
fn split_params(e: &Edge, o: &Edge, tol: &Tolerances, ts: &mut Vec<f64>) {
    let d1 = e.b - e.a;
    let d2 = o.b - o.a;
    let w = o.a - e.a;
    let denom = cross(d1, d2);
    let scale = d1.length() * d2.length();

    if denom.abs() > 1e-12 * scale.max(f64::MIN_POSITIVE) {
        let t = cross(w, d2) / denom;
        let s = cross(w, d1) / denom;
        if (-1e-9..=1.0 + 1e-9).contains(&s) {
            ts.push(t);
        }
        return;
    }

    // parallel: only a collinear pair splits
    let dist = cross(w, d1).abs() / d1.length();
    if dist > tol.eq {
        return;
    }
    let len_sq = d1.length_squared();
    ts.push((o.a - e.a).dot(d1) / len_sq);
    ts.push((o.b - e.a).dot(d1) / len_sq);
}

/// Stitch oriented boundary edges into closed rings. At a junction the
/// walk continues with the first edge clockwise from the reversed incoming
/// direction, which traces each face with its interior on the left.
fn stitch_loops(
    kept: BTreeMap<(i64, i64, i64, i64), Edge>,
    opt: &CsgOpt,
) -> Result<PolygonSet, Csg2Error> {
    let tol = &opt.tol;
    let edges: Vec<Edge> = kept.into_values().collect();
    let gridpt = |p: DVec2| (tol.grid(p.x), tol.grid(p.y));

    let mut outgoing: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
    for (idx, e) in edges.iter().enumerate() {
        outgoing.entry(gridpt(e.a)).or_default().push(idx);
    }

    let mut used = vec![false; edges.len()];
    let mut result = PolygonSet::empty();
    let mut vert_index: BTreeMap<(i64, i64), usize> = BTreeMap::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let start_key = gridpt(edges[start].a);
        let mut ring: Vec<(DVec2, Span)> = vec![(edges[start].a, edges[start].span)];
        let mut cur = start;

        for _guard in 0..=edges.len() {
            let end = edges[cur].b;
            let end_key = gridpt(end);
            if end_key == start_key {
                break;
            }
            ring.push((end, edges[cur].span));

            let back = edges[cur].a - edges[cur].b;
            let base = back.y.atan2(back.x);
            let cands = outgoing
                .get(&end_key)
                .ok_or(Csg2Error::Unresolved { span: edges[cur].span })?;
            let mut best: Option<(f64, usize)> = None;
            for &j in cands {
                if used[j] {
                    continue;
                }
                let d = edges[j].b - edges[j].a;
                let mut diff = base - d.y.atan2(d.x);
                while diff <= 0.0 {
                    diff += TAU;
                }
                while diff > TAU {
                    diff -= TAU;
                }
                if best.map_or(true, |(bd, _)| diff < bd) {
                    best = Some((diff, j));
                }
            }
            let (_, j) = best.ok_or(Csg2Error::Unresolved { span: edges[cur].span })?;
            used[j] = true;
            cur = j;
        }

        if gridpt(edges[cur].b) != gridpt(edges[start].a) {
            return Err(Csg2Error::Unresolved { span: edges[start].span });
        }
        emit_ring(&mut result, &mut vert_index, ring, opt);
    }
    Ok(result)
}

/// Clean one ring and append it to the result set.
fn emit_ring(
    result: &mut PolygonSet,
    vert_index: &mut BTreeMap<(i64, i64), usize>,
    mut ring: Vec<(DVec2, Span)>,
    opt: &CsgOpt,
) {
    let tol = &opt.tol;

    if opt.optimise.drop_collinear {
        loop {
            let n = ring.len();
            if n < 3 {
                break;
            }
            let mut keep: Vec<(DVec2, Span)> = Vec::with_capacity(n);
            for i in 0..n {
                let p0 = ring[(i + n - 1) % n].0;
                let p1 = ring[i].0;
                let p2 = ring[(i + 1) % n].0;
                let c = cross(p1 - p0, p2 - p1);
                if c.abs() <= tol.sqr && (p1 - p0).dot(p2 - p1) > 0.0 {
                    continue;
                }
                keep.push(ring[i]);
            }
            let stable = keep.len() == ring.len();
            ring = keep;
            if stable {
                break;
            }
        }
    }
    if ring.len() < 3 {
        return;
    }

    let mut area = 0.0;
    for i in 0..ring.len() {
        let a = ring[i].0;
        let b = ring[(i + 1) % ring.len()].0;
        area += a.x * b.y - b.x * a.y;
    }
    if area.abs() / 2.0 <= tol.sqr {
        return;
    }

    let mut path: Vec<usize> = Vec::with_capacity(ring.len());
    for (c, vspan) in ring {
        let key = (tol.grid(c.x), tol.grid(c.y));
        let idx = *vert_index.entry(key).or_insert_with(|| {
            result.points.push(Vertex2 { coord: c, span: vspan });
            result.points.len() - 1
        });
        if path.last() != Some(&idx) {
            path.push(idx);
        }
    }
    while path.len() > 1 && path.first() == path.last() {
        path.pop();
    }
    if path.len() >= 3 {
        result.paths.push(path);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> PolygonSet {
        let mut set = PolygonSet::empty();
        set.push_ring(
            [
                DVec2::new(x0, y0),
                DVec2::new(x1, y0),
                DVec2::new(x1, y1),
                DVec2::new(x0, y1),
            ],
            Span::at(0),
        );
        set
    }

    fn opt() -> CsgOpt {
        CsgOpt::default()
    }

    fn union2(a: &PolygonSet, b: &PolygonSet) -> PolygonSet {
        let mut scratch = Scratch::default();
        combine(
            &[a.clone(), b.clone()],
            &|m| m.iter().any(|&x| x),
            &opt(),
            &mut scratch,
        )
        .unwrap()
    }

    fn intersect2(a: &PolygonSet, b: &PolygonSet) -> PolygonSet {
        let mut scratch = Scratch::default();
        combine(
            &[a.clone(), b.clone()],
            &|m| m.iter().all(|&x| x),
            &opt(),
            &mut scratch,
        )
        .unwrap()
    }

    fn diff2(a: &PolygonSet, b: &PolygonSet) -> PolygonSet {
        let mut scratch = Scratch::default();
        combine(
            &[a.clone(), b.clone()],
            &|m| m[0] && !m[1],
            &opt(),
            &mut scratch,
        )
        .unwrap()
    }

    #[test]
    fn test_union_disjoint() {
        let out = union2(&square(0.0, 0.0, 1.0, 1.0), &square(5.0, 0.0, 6.0, 1.0));
        assert_eq!(out.paths.len(), 2);
        assert!((out.area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_union_overlapping() {
        let out = union2(&square(0.0, 0.0, 2.0, 2.0), &square(1.0, 0.0, 3.0, 2.0));
        assert_eq!(out.paths.len(), 1);
        assert!((out.area() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_union_idempotent() {
        let a = square(0.0, 0.0, 2.0, 2.0);
        let out = union2(&a, &a.clone());
        assert_eq!(out.paths.len(), 1);
        assert!((out.area() - 4.0).abs() < 1e-9);
        assert_eq!(out.paths[0].len(), 4);
    }

    #[test]
    fn test_intersection_overlap() {
        let out =
            intersect2(&square(0.0, 0.0, 2.0, 2.0), &square(1.0, 1.0, 3.0, 3.0));
        assert_eq!(out.paths.len(), 1);
        assert!((out.area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_intersection_commutes() {
        let a = square(0.0, 0.0, 2.0, 2.0);
        let b = square(1.0, 1.0, 3.0, 3.0);
        let ab = intersect2(&a, &b);
        let ba = intersect2(&b, &a);
        assert_eq!(ab.paths.len(), ba.paths.len());
        assert!((ab.area() - ba.area()).abs() < 1e-12);
        // canonical vertex order: same grid points in both results
        let mut pa: Vec<_> = ab.points.iter().map(|v| (v.coord.x as i64, v.coord.y as i64)).collect();
        let mut pb: Vec<_> = ba.points.iter().map(|v| (v.coord.x as i64, v.coord.y as i64)).collect();
        pa.sort();
        pb.sort();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_difference_bite() {
        // the half-overlapping bite from the boundary scenarios
        let a = square(-5.0, -5.0, 5.0, 5.0);
        let b = square(0.0, -5.0, 10.0, 5.0);
        let out = diff2(&a, &b);
        assert_eq!(out.paths.len(), 1);
        assert!((out.area() - 50.0).abs() < 1e-9);
        for v in &out.points {
            assert!(v.coord.x <= 0.0 + 1e-9);
        }
    }

    #[test]
    fn test_difference_is_subset_of_minuend() {
        let a = square(0.0, 0.0, 4.0, 4.0);
        let b = square(1.0, 1.0, 3.0, 3.0);
        let out = diff2(&a, &b);
        // hole ring appears clockwise
        assert_eq!(out.paths.len(), 2);
        assert!((out.area() - 12.0).abs() < 1e-9);
        let areas: Vec<f64> = out.paths.iter().map(|p| out.path_area(p)).collect();
        assert!(areas.iter().any(|&a| a > 0.0));
        assert!(areas.iter().any(|&a| a < 0.0));
    }

    #[test]
    fn test_difference_disjoint_keeps_minuend() {
        let a = square(0.0, 0.0, 1.0, 1.0);
        let b = square(5.0, 5.0, 6.0, 6.0);
        let out = diff2(&a, &b);
        assert!((out.area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_difference_total_is_empty() {
        let a = square(1.0, 1.0, 2.0, 2.0);
        let b = square(0.0, 0.0, 3.0, 3.0);
        assert!(diff2(&a, &b).is_empty());
    }

    #[test]
    fn test_xor_of_identical_is_empty() {
        let a = square(0.0, 0.0, 2.0, 2.0);
        let out = xor(&a, &a.clone(), &opt(), &mut Scratch::default()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_xor_of_nested_is_ring() {
        let a = square(0.0, 0.0, 4.0, 4.0);
        let b = square(1.0, 1.0, 3.0, 3.0);
        let out = xor(&a, &b, &opt(), &mut Scratch::default()).unwrap();
        assert_eq!(out.paths.len(), 2);
        assert!((out.area() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_union_staged_beyond_cap() {
        // more operands than max_simultaneous forces staging
        let mut opt = opt();
        opt.max_simultaneous = 2;
        let ops: Vec<PolygonSet> = (0..5)
            .map(|i| square(i as f64 * 10.0, 0.0, i as f64 * 10.0 + 1.0, 1.0))
            .collect();
        let out = union_staged(ops, &opt, &mut Scratch::default()).unwrap();
        assert_eq!(out.paths.len(), 5);
        assert!((out.area() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_output_on_grid() {
        let out = union2(
            &square(0.100000037, 0.0, 1.0, 1.0),
            &square(0.5, 0.5, 1.5, 1.5),
        );
        let tol = Tolerances::default();
        for v in &out.points {
            assert!((v.coord.x - tol.snap(v.coord.x)).abs() < 1e-15);
            assert!((v.coord.y - tol.snap(v.coord.y)).abs() < 1e-15);
        }
    }

    #[test]
    fn test_collinear_vertices_dropped() {
        // two side-by-side squares union into one rectangle without a
        // leftover vertex in the middle of the shared edge
        let out = union2(&square(0.0, 0.0, 1.0, 1.0), &square(1.0, 0.0, 2.0, 1.0));
        assert_eq!(out.paths.len(), 1);
        assert!((out.area() - 2.0).abs() < 1e-9);
        assert_eq!(out.paths[0].len(), 4, "collinear mid-edge vertices remain");
    }

    #[test]
    fn test_coincident_opposite_edges_cancel() {
        // union of two squares sharing an edge: the shared edge vanishes
        let out = union2(&square(0.0, 0.0, 1.0, 1.0), &square(1.0, 0.0, 2.0, 1.0));
        for path in &out.paths {
            for w in 0..path.len() {
                let a = out.points[path[w]].coord;
                let b = out.points[path[(w + 1) % path.len()]].coord;
                // no edge runs along x = 1
                assert!(!(a.x == 1.0 && b.x == 1.0));
            }
        }
    }
}
