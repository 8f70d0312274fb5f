//! # Layer Range
//!
//! The stack of horizontal cutting planes: a minimum z, a step, and a count.

use serde::{Deserialize, Serialize};

/// The z-plane schedule. Layer `i` cuts at `min + i * step`.
///
/// ## Example
///
/// ```rust
/// use csg2::Range;
///
/// let range = Range::new(2.5, 10.0, 5.0);
/// assert_eq!(range.cnt, 2);
/// assert_eq!(range.z(1), 7.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    /// First cutting plane.
    pub min: f64,
    /// Distance between planes.
    pub step: f64,
    /// Number of layers, at least 1.
    pub cnt: usize,
}

impl Range {
    /// Schedule planes from `min` to `max` inclusive at `step` spacing.
    ///
    /// `cnt = max(1, floor((max - min) / step) + 1)`; a degenerate input
    /// still yields one layer.
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        let step = if step > 0.0 { step } else { 1.0 };
        let cnt = if max >= min {
            ((max - min) / step).floor() as usize + 1
        } else {
            1
        };
        Self { min, step, cnt: cnt.max(1) }
    }

    /// Derive the schedule from a z extent, sampling at layer centres:
    /// the first plane sits half a step above the bottom.
    pub fn from_extent(z_min: f64, z_max: f64, step: f64) -> Self {
        Self::new(z_min + step / 2.0, z_max, step)
    }

    /// The z of layer `i`.
    #[inline]
    pub fn z(&self, i: usize) -> f64 {
        self.min + self.step * i as f64
    }

    /// The z of the last layer.
    pub fn z_max(&self) -> f64 {
        self.z(self.cnt - 1)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_inclusive_count() {
        let range = Range::new(0.0, 10.0, 5.0);
        assert_eq!(range.cnt, 3);
        assert_eq!(range.z(2), 10.0);
    }

    #[test]
    fn test_range_centres() {
        // A 0..10 extent at step 5 samples at 2.5 and 7.5.
        let range = Range::from_extent(0.0, 10.0, 5.0);
        assert_eq!(range.cnt, 2);
        assert_eq!(range.z(0), 2.5);
        assert_eq!(range.z(1), 7.5);
    }

    #[test]
    fn test_degenerate_range_clamps_to_one() {
        let range = Range::new(5.0, 1.0, 0.2);
        assert_eq!(range.cnt, 1);
    }
}
