//! # SCAD → CSG3 Lowering
//!
//! Collapses the typed call tree to the solid tree. Transform nodes multiply
//! into a current-transform register on the way down; primitives capture the
//! register where they appear and become leaves. Operators keep their
//! children. `linear_extrude` switches the walk into a 2D context whose
//! primitives become `Extrude` leaves, so booleans of 2D shapes stay
//! booleans of their extrusions.

use std::f64::consts::PI;

use glam::{DMat4, DVec2, DVec3};

use config::constants::compute_fragments;
use config::{CsgOpt, Policy};
use scad_ast::{Resolution, RotateSpec, Scad, ScadKind, ScadTree};
use scad_parser::Span;

use crate::error::GeomError;
use crate::tree::{Csg3, Csg3Tree, Poly2};

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Build the solid tree from a SCAD tree.
///
/// A `!`-marked call makes its subtree the root (keeping the transforms on
/// its path); `*` and `%` drop their subtrees. Degenerate geometry follows
/// the configured policies.
pub fn build(scad: &ScadTree, opt: &CsgOpt) -> Result<Csg3Tree, GeomError> {
    let mut builder = Builder { opt, warnings: Vec::new() };

    let children = match find_root(&scad.root) {
        Some((node, mat)) => builder.build_one(node, mat, Ctx::Solid)?,
        None => builder.build_body(&scad.root, DMat4::IDENTITY, Ctx::Solid)?,
    };

    let span = scad.root.first().map(|n| n.span).unwrap_or_default();
    let root = if children.is_empty() {
        None
    } else {
        Some(Csg3::Add { children, span })
    };
    Ok(Csg3Tree { root, warnings: builder.warnings })
}

/// Depth-first search for the first `!`-marked node, accumulating the
/// transforms on its path.
fn find_root(nodes: &[Scad]) -> Option<(&Scad, DMat4)> {
    fn walk(nodes: &[Scad], mat: DMat4) -> Option<(&Scad, DMat4)> {
        for node in nodes {
            if node.modifiers.root {
                return Some((node, mat));
            }
            if let Some(found) = walk(node.children(), mat * node_transform(node)) {
                return Some(found);
            }
        }
        None
    }
    walk(nodes, DMat4::IDENTITY)
}

fn node_transform(node: &Scad) -> DMat4 {
    match &node.kind {
        ScadKind::Translate { v, .. } => DMat4::from_translation(*v),
        ScadKind::Rotate { spec, .. } => rotate_mat(*spec),
        ScadKind::Scale { v, .. } => DMat4::from_scale(*v),
        ScadKind::Mirror { v, .. } => mirror_mat(*v),
        ScadKind::Multmatrix { m, .. } => *m,
        _ => DMat4::IDENTITY,
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// 3D context, or the 2D context inside `linear_extrude` with the local
/// extrusion range.
#[derive(Clone, Copy)]
enum Ctx {
    Solid,
    Flat { z0: f64, z1: f64 },
}

struct Builder<'a> {
    opt: &'a CsgOpt,
    warnings: Vec<GeomError>,
}

impl Builder<'_> {
    /// Apply a degeneracy policy: error, warn-and-elide, or elide.
    fn degenerate(&mut self, policy: Policy, err: GeomError) -> Result<(), GeomError> {
        match policy {
            Policy::Error => Err(err),
            Policy::Warn => {
                self.warnings.push(err);
                Ok(())
            }
            Policy::Ignore => Ok(()),
        }
    }

    fn build_body(
        &mut self,
        nodes: &[Scad],
        mat: DMat4,
        ctx: Ctx,
    ) -> Result<Vec<Csg3>, GeomError> {
        let mut out = Vec::new();
        for node in nodes {
            out.extend(self.build_one(node, mat, ctx)?);
        }
        Ok(out)
    }

    /// Build one node; an elided node yields an empty vector.
    fn build_one(
        &mut self,
        node: &Scad,
        mat: DMat4,
        ctx: Ctx,
    ) -> Result<Vec<Csg3>, GeomError> {
        Ok(self.build_node(node, mat, ctx)?.into_iter().collect())
    }

    fn build_node(
        &mut self,
        node: &Scad,
        mat: DMat4,
        ctx: Ctx,
    ) -> Result<Option<Csg3>, GeomError> {
        if node.modifiers.disable || node.modifiers.background {
            return Ok(None);
        }
        let span = node.span;

        match &node.kind {
            // --------------------------------------------------- operators --
            ScadKind::Union(children) | ScadKind::Group(children) => {
                let built = self.build_body(children, mat, ctx)?;
                Ok(if built.is_empty() {
                    None
                } else {
                    Some(Csg3::Add { children: built, span })
                })
            }
            ScadKind::Difference(children) => {
                let mut active = children
                    .iter()
                    .filter(|c| !c.modifiers.disable && !c.modifiers.background);
                let minuend = match active.next() {
                    Some(first) => match self.build_node(first, mat, ctx)? {
                        Some(built) => built,
                        // empty minuend: the whole difference is empty
                        None => return Ok(None),
                    },
                    None => return Ok(None),
                };
                let mut sub = Vec::new();
                for child in active {
                    sub.extend(self.build_node(child, mat, ctx)?);
                }
                Ok(if sub.is_empty() {
                    Some(minuend)
                } else {
                    Some(Csg3::Sub { add: vec![minuend], sub, span })
                })
            }
            ScadKind::Intersection(children) => {
                let mut built = Vec::new();
                for child in children {
                    if child.modifiers.disable || child.modifiers.background {
                        continue;
                    }
                    match self.build_node(child, mat, ctx)? {
                        Some(c) => built.push(c),
                        // intersecting with nothing empties the result
                        None => return Ok(None),
                    }
                }
                Ok(if built.is_empty() {
                    None
                } else {
                    Some(Csg3::Cut { children: built, span })
                })
            }

            // -------------------------------------------------- transforms --
            ScadKind::Translate { children, .. }
            | ScadKind::Rotate { children, .. }
            | ScadKind::Scale { children, .. }
            | ScadKind::Mirror { children, .. }
            | ScadKind::Multmatrix { children, .. } => {
                let built =
                    self.build_body(children, mat * node_transform(node), ctx)?;
                Ok(match built.len() {
                    0 => None,
                    1 => Some(built.into_iter().next().unwrap()),
                    _ => Some(Csg3::Add { children: built, span }),
                })
            }
            ScadKind::LinearExtrude { height, center, children } => {
                if let Ctx::Flat { .. } = ctx {
                    self.degenerate(
                        self.opt.policies.solid_in_flat,
                        GeomError::SolidInFlat { span },
                    )?;
                    return Ok(None);
                }
                if *height <= 0.0 {
                    self.degenerate(
                        self.opt.policies.empty,
                        GeomError::Empty { span },
                    )?;
                    return Ok(None);
                }
                let (z0, z1) = if *center {
                    (-height / 2.0, height / 2.0)
                } else {
                    (0.0, *height)
                };
                let built = self.build_body(children, mat, Ctx::Flat { z0, z1 })?;
                Ok(match built.len() {
                    0 => None,
                    1 => Some(built.into_iter().next().unwrap()),
                    _ => Some(Csg3::Add { children: built, span }),
                })
            }

            // ----------------------------------------------- 3D primitives --
            ScadKind::Cube { size, center } => {
                if let Ctx::Flat { .. } = ctx {
                    return self.solid_in_flat(span);
                }
                if size.min_element() <= 0.0 {
                    return self.empty(span);
                }
                if self.collapsed_3d(mat) {
                    return self.collapse(span);
                }
                let base = if *center { -*size / 2.0 } else { DVec3::ZERO };
                Ok(Some(self.cube_poly(base, *size, mat, span)))
            }
            ScadKind::Sphere { r, res } => {
                if let Ctx::Flat { .. } = ctx {
                    return self.solid_in_flat(span);
                }
                if *r <= 0.0 {
                    return self.empty(span);
                }
                if self.collapsed_3d(mat) {
                    return self.collapse(span);
                }
                Ok(Some(Csg3::Sphere {
                    mat,
                    inv: mat.inverse(),
                    r: *r,
                    segments: self.fragments(*r, res),
                    span,
                }))
            }
            ScadKind::Cylinder { h, r1, r2, center, res } => {
                if let Ctx::Flat { .. } = ctx {
                    return self.solid_in_flat(span);
                }
                if *h <= 0.0 || *r1 < 0.0 || *r2 < 0.0 || (*r1 <= 0.0 && *r2 <= 0.0) {
                    return self.empty(span);
                }
                if self.collapsed_3d(mat) {
                    return self.collapse(span);
                }
                let (z0, z1) = if *center { (-h / 2.0, h / 2.0) } else { (0.0, *h) };
                let segments = self.fragments(r1.max(*r2), res);
                if self.z_preserving(mat) {
                    Ok(Some(Csg3::Cyl {
                        mat,
                        z0,
                        z1,
                        r1: *r1,
                        r2: *r2,
                        segments,
                        span,
                    }))
                } else {
                    // tilted: tessellate and slice generically
                    Ok(Some(self.cyl_poly(mat, z0, z1, *r1, *r2, segments, span)))
                }
            }
            ScadKind::Polyhedron { points, faces } => {
                if let Ctx::Flat { .. } = ctx {
                    return self.solid_in_flat(span);
                }
                if points.len() < 3 || faces.is_empty() {
                    return self.empty(span);
                }
                if self.collapsed_3d(mat) {
                    return self.collapse(span);
                }
                self.polyhedron_poly(points, faces, mat, span).map(Some)
            }

            // ----------------------------------------------- 2D primitives --
            ScadKind::Circle { r, res } => {
                let (z0, z1) = match self.flat_ctx(ctx, span)? {
                    Some(range) => range,
                    None => return Ok(None),
                };
                if *r <= 0.0 {
                    return self.empty(span);
                }
                let n = self.fragments(*r, res);
                let points = circle_points(*r, n);
                let paths = vec![(0..points.len()).collect()];
                self.extrude(points, paths, mat, z0, z1, span)
            }
            ScadKind::Square { size, center } => {
                let (z0, z1) = match self.flat_ctx(ctx, span)? {
                    Some(range) => range,
                    None => return Ok(None),
                };
                if size.min_element() <= 0.0 {
                    return self.empty(span);
                }
                let base = if *center { -*size / 2.0 } else { DVec2::ZERO };
                let points = vec![
                    base,
                    base + DVec2::new(size.x, 0.0),
                    base + *size,
                    base + DVec2::new(0.0, size.y),
                ];
                self.extrude(points, vec![vec![0, 1, 2, 3]], mat, z0, z1, span)
            }
            ScadKind::Polygon { points, paths } => {
                let (z0, z1) = match self.flat_ctx(ctx, span)? {
                    Some(range) => range,
                    None => return Ok(None),
                };
                if points.len() < 3 {
                    return self.empty(span);
                }
                let paths = match paths {
                    Some(paths) => {
                        for path in paths {
                            for &i in path {
                                if i >= points.len() {
                                    return Err(GeomError::BadIndex {
                                        index: i,
                                        count: points.len(),
                                        span,
                                    });
                                }
                            }
                        }
                        // paths of fewer than 3 points contribute nothing
                        let paths: Vec<Vec<usize>> =
                            paths.iter().filter(|p| p.len() >= 3).cloned().collect();
                        if paths.is_empty() {
                            return self.empty(span);
                        }
                        orient_paths(points, paths)
                    }
                    None => vec![(0..points.len()).collect()],
                };
                self.extrude(points.clone(), paths, mat, z0, z1, span)
            }
        }
    }

    // =========================================================================
    // PRIMITIVE HELPERS
    // =========================================================================

    fn fragments(&self, r: f64, res: &Resolution) -> u32 {
        compute_fragments(r, res.fn_, res.fa, res.fs, self.opt.max_fn)
    }

    fn empty(&mut self, span: Span) -> Result<Option<Csg3>, GeomError> {
        self.degenerate(self.opt.policies.empty, GeomError::Empty { span })?;
        Ok(None)
    }

    fn collapse(&mut self, span: Span) -> Result<Option<Csg3>, GeomError> {
        self.degenerate(self.opt.policies.collapse, GeomError::Collapse { span })?;
        Ok(None)
    }

    fn solid_in_flat(&mut self, span: Span) -> Result<Option<Csg3>, GeomError> {
        self.degenerate(
            self.opt.policies.solid_in_flat,
            GeomError::SolidInFlat { span },
        )?;
        Ok(None)
    }

    /// The extrusion range of a 2D context; applies the `flat_in_solid`
    /// policy outside one.
    fn flat_ctx(&mut self, ctx: Ctx, span: Span) -> Result<Option<(f64, f64)>, GeomError> {
        match ctx {
            Ctx::Flat { z0, z1 } => Ok(Some((z0, z1))),
            Ctx::Solid => {
                self.degenerate(
                    self.opt.policies.flat_in_solid,
                    GeomError::FlatInSolid { span },
                )?;
                Ok(None)
            }
        }
    }

    fn collapsed_3d(&self, mat: DMat4) -> bool {
        mat.determinant().abs() <= self.opt.tol.sqr
    }

    /// Local z planes must map to world z planes for the n-gon fast path
    /// (and for extrusions at all).
    fn z_preserving(&self, mat: DMat4) -> bool {
        let eq = self.opt.tol.eq;
        mat.x_axis.z.abs() <= eq && mat.y_axis.z.abs() <= eq
    }

    /// Additionally, the local z axis must stay vertical (no shear of the
    /// extrusion direction).
    fn z_axial(&self, mat: DMat4) -> bool {
        let eq = self.opt.tol.eq;
        self.z_preserving(mat) && mat.z_axis.x.abs() <= eq && mat.z_axis.y.abs() <= eq
    }

    fn cube_poly(&self, base: DVec3, size: DVec3, mat: DMat4, span: Span) -> Csg3 {
        let corner = |i: usize| {
            let p = base
                + DVec3::new(
                    if i & 1 != 0 { size.x } else { 0.0 },
                    if i & 2 != 0 { size.y } else { 0.0 },
                    if i & 4 != 0 { size.z } else { 0.0 },
                );
            mat.transform_point3(p)
        };
        let points: Vec<DVec3> = (0..8).map(corner).collect();
        let faces: Vec<Vec<usize>> = vec![
            vec![0, 2, 3, 1], // bottom, normal -z
            vec![4, 5, 7, 6], // top, normal +z
            vec![0, 1, 5, 4], // front, normal -y
            vec![2, 6, 7, 3], // back, normal +y
            vec![0, 4, 6, 2], // left, normal -x
            vec![1, 3, 7, 5], // right, normal +x
        ];
        make_poly(points, faces, mat.determinant() < 0.0, span)
    }

    fn cyl_poly(
        &self,
        mat: DMat4,
        z0: f64,
        z1: f64,
        r1: f64,
        r2: f64,
        segments: u32,
        span: Span,
    ) -> Csg3 {
        let n = segments as usize;
        let mut points = Vec::new();
        let mut faces = Vec::new();

        let ring = |points: &mut Vec<DVec3>, r: f64, z: f64| -> Vec<usize> {
            if r <= 0.0 {
                points.push(mat.transform_point3(DVec3::new(0.0, 0.0, z)));
                return vec![points.len() - 1];
            }
            let first = points.len();
            for p in circle_points(r, segments) {
                points.push(mat.transform_point3(DVec3::new(p.x, p.y, z)));
            }
            (first..first + n).collect()
        };

        let bottom = ring(&mut points, r1, z0);
        let top = ring(&mut points, r2, z1);

        // caps (apexes need none)
        if bottom.len() > 1 {
            faces.push(bottom.iter().rev().copied().collect());
        }
        if top.len() > 1 {
            faces.push(top.clone());
        }
        // flanks
        for i in 0..n {
            let j = (i + 1) % n;
            match (bottom.len() > 1, top.len() > 1) {
                (true, true) => faces.push(vec![bottom[i], bottom[j], top[j], top[i]]),
                (true, false) => faces.push(vec![bottom[i], bottom[j], top[0]]),
                (false, true) => faces.push(vec![bottom[0], top[j], top[i]]),
                (false, false) => {}
            }
        }
        make_poly(points, faces, mat.determinant() < 0.0, span)
    }

    fn polyhedron_poly(
        &self,
        points: &[DVec3],
        faces: &[Vec<usize>],
        mat: DMat4,
        span: Span,
    ) -> Result<Csg3, GeomError> {
        let world: Vec<DVec3> = points.iter().map(|p| mat.transform_point3(*p)).collect();
        let mut out_faces = Vec::with_capacity(faces.len());
        for face in faces {
            for &i in face {
                if i >= world.len() {
                    return Err(GeomError::BadIndex { index: i, count: world.len(), span });
                }
            }
            if face.len() < 3 {
                return Err(GeomError::DegenerateFace { span });
            }
            // Source faces are clockwise seen from outside; flip to the
            // internal outward counter-clockwise convention.
            let face: Vec<usize> = face.iter().rev().copied().collect();

            let normal = newell_normal(&face, &world);
            if normal.length() <= self.opt.tol.sqr {
                return Err(GeomError::DegenerateFace { span });
            }
            let n = normal.normalize();
            let p0 = world[face[0]];
            for &i in &face {
                if (world[i] - p0).dot(n).abs() > self.opt.tol.eq {
                    return Err(GeomError::NonPlanarFace { span });
                }
            }
            out_faces.push(face);
        }
        Ok(make_poly(world, out_faces, mat.determinant() < 0.0, span))
    }

    /// Emit one extrusion leaf from a 2D profile in local coordinates.
    fn extrude(
        &mut self,
        points: Vec<DVec2>,
        paths: Vec<Vec<usize>>,
        mat: DMat4,
        z0: f64,
        z1: f64,
        span: Span,
    ) -> Result<Option<Csg3>, GeomError> {
        if !self.z_axial(mat) {
            return Err(GeomError::NonAxialExtrude { span });
        }
        let d2 = mat.x_axis.x * mat.y_axis.y - mat.x_axis.y * mat.y_axis.x;
        if d2.abs() <= self.opt.tol.sqr || (z1 - z0).abs() * mat.z_axis.z.abs() <= self.opt.tol.eq {
            return self.collapse(span);
        }

        let world: Vec<DVec2> = points
            .iter()
            .map(|p| mat.transform_point3(DVec3::new(p.x, p.y, 0.0)).truncate())
            .collect();
        let paths = if d2 < 0.0 {
            paths
                .into_iter()
                .map(|p| p.into_iter().rev().collect())
                .collect()
        } else {
            paths
        };

        let za = mat.transform_point3(DVec3::new(0.0, 0.0, z0)).z;
        let zb = mat.transform_point3(DVec3::new(0.0, 0.0, z1)).z;
        Ok(Some(Csg3::Extrude {
            profile: Poly2 { points: world, paths },
            z0: za.min(zb),
            z1: za.max(zb),
            span,
        }))
    }
}

// =============================================================================
// GEOMETRY HELPERS
// =============================================================================

/// Euler form applies Z·Y·X; the axis-angle form falls back to identity for
/// a zero axis.
fn rotate_mat(spec: RotateSpec) -> DMat4 {
    match spec {
        RotateSpec::Euler(deg) => {
            DMat4::from_rotation_z(deg.z.to_radians())
                * DMat4::from_rotation_y(deg.y.to_radians())
                * DMat4::from_rotation_x(deg.x.to_radians())
        }
        RotateSpec::AxisAngle { a, v } => {
            if v.length_squared() <= f64::EPSILON {
                DMat4::IDENTITY
            } else {
                DMat4::from_axis_angle(v.normalize(), a.to_radians())
            }
        }
    }
}

/// Householder reflection across the plane with normal `v`.
fn mirror_mat(v: DVec3) -> DMat4 {
    if v.length_squared() <= f64::EPSILON {
        return DMat4::IDENTITY;
    }
    let n = v.normalize();
    let col = |e: DVec3, i: usize| {
        let r = e - 2.0 * n[i] * n;
        glam::DVec4::new(r.x, r.y, r.z, 0.0)
    };
    DMat4::from_cols(
        col(DVec3::X, 0),
        col(DVec3::Y, 1),
        col(DVec3::Z, 2),
        glam::DVec4::W,
    )
}

/// Counter-clockwise n-gon, first vertex at angle pi/n so one flat side
/// faces +x.
fn circle_points(r: f64, segments: u32) -> Vec<DVec2> {
    let n = segments as usize;
    (0..n)
        .map(|i| {
            let a = (2.0 * i as f64 + 1.0) * PI / n as f64;
            DVec2::new(r * a.cos(), r * a.sin())
        })
        .collect()
}

/// Newell's method; robust for arbitrary planar polygons.
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

fn make_poly(points: Vec<DVec3>, faces: Vec<Vec<usize>>, flip: bool, span: Span) -> Csg3 {
    let faces = if flip {
        faces
            .into_iter()
            .map(|f| f.into_iter().rev().collect())
            .collect()
    } else {
        faces
    };
    Csg3::Poly { points, faces, span }
}

/// Normalize path orientation by nesting depth: outer rings
/// counter-clockwise, holes clockwise.
fn orient_paths(points: &[DVec2], mut paths: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    let n = paths.len();
    let mut depth = vec![0usize; n];
    for i in 0..n {
        let sample = points[paths[i][0]];
        for j in 0..n {
            if i != j && inside_even_odd(sample, &paths[j], points) {
                depth[i] += 1;
            }
        }
    }
    for (i, path) in paths.iter_mut().enumerate() {
        let want_ccw = depth[i] % 2 == 0;
        if (path_area(path, points) > 0.0) != want_ccw {
            path.reverse();
        }
    }
    paths
}

fn path_area(path: &[usize], points: &[DVec2]) -> f64 {
    let mut area = 0.0;
    for k in 0..path.len() {
        let a = points[path[k]];
        let b = points[path[(k + 1) % path.len()]];
        area += a.x * b.y - b.x * a.y;
    }
    area / 2.0
}

/// Even-odd ray cast towards +x.
fn inside_even_odd(p: DVec2, path: &[usize], points: &[DVec2]) -> bool {
    let mut hit = false;
    for k in 0..path.len() {
        let a = points[path[k]];
        let b = points[path[(k + 1) % path.len()]];
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if x > p.x {
                hit = !hit;
            }
        }
    }
    hit
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use config::Policies;
    use scad_ast::lower;
    use scad_parser::parse;

    fn build_src(src: &str) -> Result<Csg3Tree, GeomError> {
        build_src_opt(src, &CsgOpt::default())
    }

    fn build_src_opt(src: &str, opt: &CsgOpt) -> Result<Csg3Tree, GeomError> {
        let scad = lower(&parse("t", src.to_string()).unwrap()).unwrap();
        build(&scad, opt)
    }

    fn single(tree: &Csg3Tree) -> &Csg3 {
        match tree.root.as_ref().unwrap() {
            Csg3::Add { children, .. } => {
                assert_eq!(children.len(), 1);
                &children[0]
            }
            other => other,
        }
    }

    #[test]
    fn test_cube_becomes_poly() {
        let tree = build_src("cube(10);").unwrap();
        match single(&tree) {
            Csg3::Poly { points, faces, .. } => {
                assert_eq!(points.len(), 8);
                assert_eq!(faces.len(), 6);
                // uncentered: positive octant
                assert!(points.iter().all(|p| p.min_element() >= 0.0));
                assert!(points.iter().any(|p| p.z == 10.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_translate_folds_into_points() {
        let tree = build_src("translate([1,2,3]) cube(1);").unwrap();
        match single(&tree) {
            Csg3::Poly { points, .. } => {
                let min = points.iter().fold(DVec3::splat(f64::MAX), |m, p| m.min(*p));
                assert!((min - DVec3::new(1.0, 2.0, 3.0)).length() < 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_sphere_keeps_matrix_and_fn() {
        let tree = build_src("translate([0,0,4]) sphere(r=2, $fn=8);").unwrap();
        match single(&tree) {
            Csg3::Sphere { mat, r, segments, .. } => {
                assert_eq!(*r, 2.0);
                assert_eq!(*segments, 8);
                assert_eq!(mat.transform_point3(DVec3::ZERO).z, 4.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_difference_structure() {
        let tree =
            build_src("difference() { cube(10); translate([5,0,0]) cube(10); }").unwrap();
        match single(&tree) {
            Csg3::Sub { add, sub, .. } => {
                assert_eq!(add.len(), 1);
                assert_eq!(sub.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_cube_is_fatal_by_default() {
        let err = build_src("cube(0);").unwrap_err();
        assert!(matches!(err, GeomError::Empty { .. }));
    }

    #[test]
    fn test_empty_cube_ignored_by_policy() {
        let mut opt = CsgOpt::default();
        opt.policies = Policies { empty: Policy::Ignore, ..Policies::default() };
        let tree = build_src_opt("cube(0);", &opt).unwrap();
        assert!(tree.root.is_none());
        assert!(tree.warnings.is_empty());
    }

    #[test]
    fn test_empty_cube_warn_collects() {
        let mut opt = CsgOpt::default();
        opt.policies = Policies { empty: Policy::Warn, ..Policies::default() };
        let tree = build_src_opt("union() { cube(0); cube(1); }", &opt).unwrap();
        assert_eq!(tree.warnings.len(), 1);
        assert!(tree.root.is_some());
    }

    #[test]
    fn test_scale_zero_collapses() {
        let err = build_src("scale(0) cube(1);").unwrap_err();
        assert!(matches!(err, GeomError::Collapse { .. }));
    }

    #[test]
    fn test_tilted_cylinder_tessellates() {
        let tree = build_src("rotate([90,0,0]) cylinder(h=4, r=1, $fn=8);").unwrap();
        assert!(matches!(single(&tree), Csg3::Poly { .. }));
    }

    #[test]
    fn test_upright_cylinder_stays_cyl() {
        let tree = build_src("translate([1,1,1]) cylinder(h=4, r=1);").unwrap();
        match single(&tree) {
            Csg3::Cyl { z0, z1, .. } => {
                assert_eq!(*z0, 0.0);
                assert_eq!(*z1, 4.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_linear_extrude_circle() {
        let tree =
            build_src("linear_extrude(height=6, center=true) circle(r=2, $fn=6);").unwrap();
        match single(&tree) {
            Csg3::Extrude { profile, z0, z1, .. } => {
                assert_eq!(profile.points.len(), 6);
                assert_eq!((*z0, *z1), (-3.0, 3.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_extrude_of_difference_keeps_booleans() {
        let tree = build_src(
            "linear_extrude(height=2) difference() { circle(r=3, $fn=8); circle(r=1, $fn=8); }",
        )
        .unwrap();
        match single(&tree) {
            Csg3::Sub { add, sub, .. } => {
                assert!(matches!(add[0], Csg3::Extrude { .. }));
                assert!(matches!(sub[0], Csg3::Extrude { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_circle_outside_extrude_is_flat_in_solid() {
        let err = build_src("circle(5);").unwrap_err();
        assert!(matches!(err, GeomError::FlatInSolid { .. }));
    }

    #[test]
    fn test_cube_inside_extrude_is_solid_in_flat() {
        let err = build_src("linear_extrude(height=2) cube(1);").unwrap_err();
        assert!(matches!(err, GeomError::SolidInFlat { .. }));
    }

    #[test]
    fn test_disable_modifier_drops_subtree() {
        let tree = build_src("union() { *cube(1); cube(2); }").unwrap();
        match tree.root.as_ref().unwrap() {
            Csg3::Add { children, .. } => match &children[0] {
                Csg3::Add { children, .. } => assert_eq!(children.len(), 1),
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_root_modifier_keeps_path_transform() {
        let tree =
            build_src("cube(50); translate([0,0,7]) !sphere(1);").unwrap();
        match single(&tree) {
            Csg3::Sphere { mat, .. } => {
                assert_eq!(mat.transform_point3(DVec3::ZERO).z, 7.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_polygon_hole_oriented_clockwise() {
        let tree = build_src(
            "linear_extrude(height=1) polygon( \
             points=[[0,0],[4,0],[4,4],[0,4],[1,1],[3,1],[3,3],[1,3]], \
             paths=[[0,1,2,3],[4,5,6,7]]);",
        )
        .unwrap();
        match single(&tree) {
            Csg3::Extrude { profile, .. } => {
                assert!(path_area(&profile.paths[0], &profile.points) > 0.0);
                assert!(path_area(&profile.paths[1], &profile.points) < 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_mirror_flips_winding_consistently() {
        // A mirrored cube must still have outward faces (flipped back).
        let tree = build_src("mirror([1,0,0]) cube(2);").unwrap();
        match single(&tree) {
            Csg3::Poly { points, faces, .. } => {
                // signed volume via divergence theorem stays positive
                let mut vol = 0.0;
                for face in faces {
                    let p0 = points[face[0]];
                    for k in 1..face.len() - 1 {
                        let p1 = points[face[k]];
                        let p2 = points[face[k + 1]];
                        vol += p0.dot(p1.cross(p2)) / 6.0;
                    }
                }
                assert!(vol > 7.9, "expected volume 8, got {vol}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
