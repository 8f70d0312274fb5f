//! # Argument Binding
//!
//! Binds a call's positional and keyword arguments to the parameter names of
//! a functor signature, then coerces values to their semantic types.
//! Keyword arguments override positionals; unknown keywords are fatal.
//! `$fn`/`$fa`/`$fs` are accepted on every call and collected separately.

use glam::{DMat4, DVec2, DVec3};

use scad_parser::{Span, SynNode, SynValue, SynValueKind};

use crate::env::SpecialSet;
use crate::error::ScadError;

// =============================================================================
// BOUND ARGUMENTS
// =============================================================================

/// The result of binding one call's arguments against a signature.
#[derive(Debug)]
pub struct Bound<'a> {
    functor: &'static str,
    call_span: Span,
    /// name → value; keyword bindings replace positional ones.
    slots: Vec<(&'static str, &'a SynValue)>,
    /// `$fn`/`$fa`/`$fs` bindings on this call.
    pub specials: SpecialSet,
}

/// Bind `node`'s arguments.
///
/// `positional` lists parameter names in positional order; `named` lists
/// extra keyword-only parameters. Every positional name is implicitly also a
/// keyword.
pub fn bind<'a>(
    node: &'a SynNode,
    functor: &'static str,
    positional: &[&'static str],
    named: &[&'static str],
) -> Result<Bound<'a>, ScadError> {
    let mut bound = Bound {
        functor,
        call_span: node.span,
        slots: Vec::new(),
        specials: SpecialSet::default(),
    };
    let mut next_positional = 0usize;

    for arg in &node.args {
        match &arg.key {
            None => {
                if next_positional >= positional.len() {
                    return Err(ScadError::TooManyArgs { functor, span: arg.value.span });
                }
                bound.set(positional[next_positional], &arg.value);
                next_positional += 1;
            }
            Some(key) => match key.as_str() {
                "$fn" => bound.specials.fn_ = Some(num(&arg.value, functor, "$fn")?),
                "$fa" => bound.specials.fa = Some(num(&arg.value, functor, "$fa")?),
                "$fs" => bound.specials.fs = Some(num(&arg.value, functor, "$fs")?),
                _ => {
                    let name = positional
                        .iter()
                        .chain(named)
                        .find(|&&n| n == key.as_str());
                    match name {
                        Some(&name) => bound.set(name, &arg.value),
                        None => {
                            return Err(ScadError::UnknownParam {
                                functor,
                                name: key.clone(),
                                span: arg.value.span,
                            });
                        }
                    }
                }
            },
        }
    }
    Ok(bound)
}

impl<'a> Bound<'a> {
    fn set(&mut self, name: &'static str, value: &'a SynValue) {
        if let Some(slot) = self.slots.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.slots.push((name, value));
        }
    }

    /// Raw value of a parameter, if bound.
    pub fn get(&self, name: &str) -> Option<&'a SynValue> {
        self.slots.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    fn bad(&self, name: &'static str, expected: &'static str, span: Span) -> ScadError {
        ScadError::BadArg { functor: self.functor, name, expected, span }
    }

    /// Reject a parameter pair bound at the same time.
    pub fn exclusive(&self, a: &'static str, b: &'static str) -> Result<(), ScadError> {
        if let (Some(_), Some(v)) = (self.get(a), self.get(b)) {
            return Err(ScadError::ConflictingArgs {
                functor: self.functor,
                a,
                b,
                span: v.span,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------- scalars --

    /// Required number.
    pub fn num(&self, name: &'static str) -> Result<f64, ScadError> {
        match self.get(name) {
            Some(v) => num(v, self.functor, name),
            None => Err(ScadError::MissingArg {
                functor: self.functor,
                name,
                span: self.call_span,
            }),
        }
    }

    /// Number with default.
    pub fn num_or(&self, name: &'static str, default: f64) -> Result<f64, ScadError> {
        match self.get(name) {
            Some(v) => num(v, self.functor, name),
            None => Ok(default),
        }
    }

    /// Optional number.
    pub fn num_opt(&self, name: &'static str) -> Result<Option<f64>, ScadError> {
        self.get(name).map(|v| num(v, self.functor, name)).transpose()
    }

    /// Boolean with default (`true`/`false` identifiers).
    pub fn bool_or(&self, name: &'static str, default: bool) -> Result<bool, ScadError> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => match &v.kind {
                SynValueKind::Ident(s) if s == "true" => Ok(true),
                SynValueKind::Ident(s) if s == "false" => Ok(false),
                _ => Err(self.bad(name, "'true' or 'false'", v.span)),
            },
        }
    }

    // ------------------------------------------------------------- vectors --

    /// 3-vector, or a scalar broadcast to all three components.
    pub fn vec3_or_scalar(
        &self,
        name: &'static str,
        default: DVec3,
    ) -> Result<DVec3, ScadError> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => match &v.kind {
                SynValueKind::Int(_) | SynValueKind::Float(_) => {
                    Ok(DVec3::splat(num(v, self.functor, name)?))
                }
                SynValueKind::Array(items) => {
                    self.vec3_from_items(name, items, v.span, None)
                }
                _ => Err(self.bad(name, "number or 3-vector", v.span)),
            },
        }
    }

    /// 3-vector; a 2-vector is padded with `pad_z` (used by `translate` and
    /// `scale`, where a 2D vector is common in the wild).
    pub fn vec3(
        &self,
        name: &'static str,
        default: DVec3,
        pad_z: Option<f64>,
    ) -> Result<DVec3, ScadError> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => match &v.kind {
                SynValueKind::Array(items) => {
                    self.vec3_from_items(name, items, v.span, pad_z)
                }
                _ => Err(self.bad(name, "3-vector", v.span)),
            },
        }
    }

    fn vec3_from_items(
        &self,
        name: &'static str,
        items: &[SynValue],
        span: Span,
        pad_z: Option<f64>,
    ) -> Result<DVec3, ScadError> {
        let z = match (items.len(), pad_z) {
            (3, _) => num(&items[2], self.functor, name)?,
            (2, Some(z)) => z,
            _ => return Err(self.bad(name, "3-vector", span)),
        };
        Ok(DVec3::new(
            num(&items[0], self.functor, name)?,
            num(&items[1], self.functor, name)?,
            z,
        ))
    }

    /// 2-vector, or a scalar broadcast to both components.
    pub fn vec2_or_scalar(
        &self,
        name: &'static str,
        default: DVec2,
    ) -> Result<DVec2, ScadError> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => match &v.kind {
                SynValueKind::Int(_) | SynValueKind::Float(_) => {
                    Ok(DVec2::splat(num(v, self.functor, name)?))
                }
                SynValueKind::Array(items) if items.len() == 2 => Ok(DVec2::new(
                    num(&items[0], self.functor, name)?,
                    num(&items[1], self.functor, name)?,
                )),
                _ => Err(self.bad(name, "number or 2-vector", v.span)),
            },
        }
    }

    // ------------------------------------------------- points and indices --

    /// Required array of 3D points.
    pub fn points3(&self, name: &'static str) -> Result<Vec<DVec3>, ScadError> {
        let v = self.require(name)?;
        let items = self.array(name, v)?;
        items
            .iter()
            .map(|item| match &item.kind {
                SynValueKind::Array(coords) if coords.len() == 3 => Ok(DVec3::new(
                    num(&coords[0], self.functor, name)?,
                    num(&coords[1], self.functor, name)?,
                    num(&coords[2], self.functor, name)?,
                )),
                _ => Err(self.bad(name, "array of 3D points", item.span)),
            })
            .collect()
    }

    /// Required array of 2D points.
    pub fn points2(&self, name: &'static str) -> Result<Vec<DVec2>, ScadError> {
        let v = self.require(name)?;
        let items = self.array(name, v)?;
        items
            .iter()
            .map(|item| match &item.kind {
                SynValueKind::Array(coords) if coords.len() == 2 => Ok(DVec2::new(
                    num(&coords[0], self.functor, name)?,
                    num(&coords[1], self.functor, name)?,
                )),
                _ => Err(self.bad(name, "array of 2D points", item.span)),
            })
            .collect()
    }

    /// Array of index lists (faces or paths) from a bound value.
    pub fn index_lists(&self, name: &'static str, v: &SynValue) -> Result<Vec<Vec<usize>>, ScadError> {
        let items = self.array(name, v)?;
        items
            .iter()
            .map(|item| {
                let indices = self.array(name, item)?;
                indices
                    .iter()
                    .map(|idx| match idx.kind {
                        SynValueKind::Int(i) if i >= 0 => Ok(i as usize),
                        _ => Err(self.bad(name, "array of non-negative indices", idx.span)),
                    })
                    .collect()
            })
            .collect()
    }

    /// 4×4 affine matrix from 4 (or 3, implying `0 0 0 1`) rows of 4 numbers.
    pub fn mat4(&self, name: &'static str) -> Result<DMat4, ScadError> {
        let v = self.require(name)?;
        let rows_syn = self.array(name, v)?;
        if rows_syn.len() != 3 && rows_syn.len() != 4 {
            return Err(self.bad(name, "matrix of 3 or 4 rows", v.span));
        }
        let mut rows = [[0.0f64; 4]; 4];
        rows[3] = [0.0, 0.0, 0.0, 1.0];
        for (i, row_syn) in rows_syn.iter().enumerate() {
            let row = self.array(name, row_syn)?;
            if row.len() != 4 {
                return Err(self.bad(name, "matrix rows of 4 numbers", row_syn.span));
            }
            for (j, item) in row.iter().enumerate() {
                rows[i][j] = num(item, self.functor, name)?;
            }
        }
        // glam matrices are column-major.
        let mut cols = [[0.0f64; 4]; 4];
        for (i, row) in rows.iter().enumerate() {
            for (j, x) in row.iter().enumerate() {
                cols[j][i] = *x;
            }
        }
        Ok(DMat4::from_cols_array_2d(&cols))
    }

    // ------------------------------------------------------------- helpers --

    fn require(&self, name: &'static str) -> Result<&'a SynValue, ScadError> {
        self.get(name).ok_or(ScadError::MissingArg {
            functor: self.functor,
            name,
            span: self.call_span,
        })
    }

    fn array<'v>(
        &self,
        name: &'static str,
        v: &'v SynValue,
    ) -> Result<&'v [SynValue], ScadError> {
        match &v.kind {
            SynValueKind::Array(items) => Ok(items),
            _ => Err(self.bad(name, "array", v.span)),
        }
    }
}

/// Numeric coercion: int and float literals only.
fn num(v: &SynValue, functor: &'static str, name: &'static str) -> Result<f64, ScadError> {
    match v.kind {
        SynValueKind::Int(i) => Ok(i as f64),
        SynValueKind::Float(f) => Ok(f),
        _ => Err(ScadError::BadArg { functor, name, expected: "number", span: v.span }),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use scad_parser::parse;

    fn first_node(src: &str) -> SynNode {
        let mut tree = parse("t", src.to_string()).unwrap();
        tree.body.remove(0)
    }

    #[test]
    fn test_positional_then_keyword() {
        let node = first_node("cube(10, center=true);");
        let bound = bind(&node, "cube", &["size", "center"], &[]).unwrap();
        assert!(bound.get("size").is_some());
        assert!(bound.bool_or("center", false).unwrap());
    }

    #[test]
    fn test_keyword_overrides_positional() {
        let node = first_node("cylinder(3, h=10);");
        let bound = bind(&node, "cylinder", &["h", "r1", "r2"], &[]).unwrap();
        assert_eq!(bound.num("h").unwrap(), 10.0);
    }

    #[test]
    fn test_unknown_keyword() {
        let node = first_node("cube(10, centre=true);");
        let err = bind(&node, "cube", &["size", "center"], &[]).unwrap_err();
        assert!(matches!(err, ScadError::UnknownParam { ref name, .. } if name == "centre"));
    }

    #[test]
    fn test_too_many_positional() {
        let node = first_node("sphere(1, 2);");
        let err = bind(&node, "sphere", &["r"], &["d"]).unwrap_err();
        assert!(matches!(err, ScadError::TooManyArgs { .. }));
    }

    #[test]
    fn test_specials_collected() {
        let node = first_node("sphere(2, $fn=16);");
        let bound = bind(&node, "sphere", &["r"], &["d"]).unwrap();
        assert_eq!(bound.specials.fn_, Some(16.0));
        assert_eq!(bound.specials.fa, None);
    }

    #[test]
    fn test_vec3_broadcast() {
        let node = first_node("cube(5);");
        let bound = bind(&node, "cube", &["size", "center"], &[]).unwrap();
        let size = bound.vec3_or_scalar("size", DVec3::ONE).unwrap();
        assert_eq!(size, DVec3::splat(5.0));
    }

    #[test]
    fn test_mat4_three_rows() {
        let node =
            first_node("multmatrix([[1,0,0,5],[0,1,0,6],[0,0,1,7]]) cube(1);");
        let bound = bind(&node, "multmatrix", &["m"], &[]).unwrap();
        let m = bound.mat4("m").unwrap();
        let p = m.transform_point3(glam::DVec3::ZERO);
        assert_eq!(p, glam::DVec3::new(5.0, 6.0, 7.0));
    }
}
