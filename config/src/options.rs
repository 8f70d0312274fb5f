//! # CSG Options
//!
//! The user-configurable surface honoured by the geometry stages: diagnostics
//! policies, boolean-evaluator limits and output tweaks.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_MAX_FN, MAX_LAZY};
use crate::Tolerances;

// =============================================================================
// POLICIES
// =============================================================================

/// How to react to a degenerate-geometry condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Policy {
    /// Abort the pipeline with an error.
    #[default]
    Error,
    /// Record a warning, elide the offending node, continue.
    Warn,
    /// Elide the offending node silently.
    Ignore,
}

/// The four independently configurable degeneracy policies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Policies {
    /// Primitive with zero size/radius/height at source.
    pub empty: Policy,
    /// Geometry collapsed by a singular transform.
    pub collapse: Policy,
    /// 2D primitive used in a 3D context.
    pub flat_in_solid: Policy,
    /// 3D primitive used in a 2D context.
    pub solid_in_flat: Policy,
}

// =============================================================================
// OPTIMISATION FLAGS
// =============================================================================

/// Independently toggleable boolean-evaluator optimisations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OptFlags {
    /// Skip empty paths in evaluator output.
    pub skip_empty: bool,
    /// Drop collinear vertices from output rings.
    pub drop_collinear: bool,
}

impl Default for OptFlags {
    fn default() -> Self {
        Self { skip_empty: true, drop_collinear: true }
    }
}

// =============================================================================
// CSG OPTIONS
// =============================================================================

/// Options honoured by the CSG3 builder and the per-layer evaluator.
///
/// ## Example
///
/// ```rust
/// use config::CsgOpt;
///
/// let opt = CsgOpt::default();
/// assert_eq!(opt.max_fn, 100);
/// assert!(opt.max_simultaneous >= 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsgOpt {
    /// Cap on polygon approximation count for round primitives.
    pub max_fn: u32,
    /// Gap inserted between layers by some writers. -1 selects the writer's
    /// own default (0.01 for STL, 0 for SCAD/JS).
    pub layer_gap: f64,
    /// Operands combined in one boolean evaluation stage (2..=MAX_LAZY).
    pub max_simultaneous: usize,
    /// Evaluator optimisation toggles.
    pub optimise: OptFlags,
    /// Degeneracy policies.
    pub policies: Policies,
    /// Seed for randomised colors in the JS output.
    pub color_rand: u8,
    /// The numeric regime. Set once, immutable afterwards.
    pub tol: Tolerances,
}

impl CsgOpt {
    /// Validate option ranges.
    ///
    /// `max_simultaneous` outside `2..=MAX_LAZY` and negative `layer_gap`
    /// values other than the -1 sentinel are rejected.
    pub fn validate(&self) -> Result<(), OptError> {
        if self.max_simultaneous < 2 || self.max_simultaneous > MAX_LAZY {
            return Err(OptError::MaxSimultaneous { got: self.max_simultaneous });
        }
        if self.layer_gap < 0.0 && self.layer_gap != -1.0 {
            return Err(OptError::LayerGap { got: self.layer_gap });
        }
        Ok(())
    }
}

impl Default for CsgOpt {
    fn default() -> Self {
        Self {
            max_fn: DEFAULT_MAX_FN,
            layer_gap: -1.0,
            max_simultaneous: MAX_LAZY,
            optimise: OptFlags::default(),
            policies: Policies::default(),
            color_rand: 0,
            tol: Tolerances::default(),
        }
    }
}

/// Errors raised by [`CsgOpt::validate`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OptError {
    /// max_simultaneous outside the supported range.
    #[error("max_simultaneous must be in 2..={max}, got {got}", max = MAX_LAZY)]
    MaxSimultaneous { got: usize },
    /// Negative layer gap other than the -1 sentinel.
    #[error("layer_gap must be >= 0 or the -1 sentinel, got {got}")]
    LayerGap { got: f64 },
}
