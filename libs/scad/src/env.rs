//! # Special-Variable Environment
//!
//! `$fn`, `$fa` and `$fs` propagate down the call tree as a lexically scoped
//! environment: a child call inherits the nearest enclosing values unless it
//! binds its own. The lowering resolves them eagerly, baking the effective
//! values into each round primitive.

use serde::{Deserialize, Serialize};

use config::constants::{DEFAULT_FA, DEFAULT_FN, DEFAULT_FS};

/// Bindings a single call contributes (already coerced to numbers).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpecialSet {
    pub fn_: Option<f64>,
    pub fa: Option<f64>,
    pub fs: Option<f64>,
}

/// The effective `$fn`/`$fa`/`$fs` values at one point of the tree.
///
/// `$fn = 0` counts as unset and does not shadow an enclosing non-zero
/// binding.
///
/// ## Example
///
/// ```rust
/// use scad_ast::SpecialEnv;
///
/// let env = SpecialEnv::default();
/// assert_eq!(env.fn_, 0.0);
/// assert_eq!(env.fa, 12.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecialEnv {
    pub fn_: f64,
    pub fa: f64,
    pub fs: f64,
}

impl SpecialEnv {
    /// The environment for a child scope given this call's own bindings.
    pub(crate) fn overridden(&self, set: &SpecialSet) -> SpecialEnv {
        SpecialEnv {
            fn_: match set.fn_ {
                Some(v) if v > 0.0 => v,
                _ => self.fn_,
            },
            fa: set.fa.unwrap_or(self.fa),
            fs: set.fs.unwrap_or(self.fs),
        }
    }
}

impl Default for SpecialEnv {
    fn default() -> Self {
        Self { fn_: DEFAULT_FN, fa: DEFAULT_FA, fs: DEFAULT_FS }
    }
}
