//! # Layer Differences
//!
//! Replaces each layer's polygons with the symmetric difference against the
//! layer below, walking from the top down so every XOR reads the original
//! polygons. Layer 0 is unchanged. Only the WebGL writer consumes this; it
//! suppresses faces coincident between adjacent layers.

use rayon::prelude::*;

use config::CsgOpt;

use crate::boolean::{xor, Scratch};
use crate::error::Csg2Error;
use crate::stack::Stack;

/// Apply the layer-difference pass to an evaluated stack.
pub fn diff_layers(stack: &mut Stack, opt: &CsgOpt) -> Result<(), Csg2Error> {
    if stack.layers.len() < 2 {
        return Ok(());
    }

    // XOR against the pre-pass polygons, not already-diffed ones.
    let results: Vec<Result<_, Csg2Error>> = (1..stack.layers.len())
        .into_par_iter()
        .map_init(Scratch::default, |scratch, i| {
            xor(
                &stack.layers[i].polys,
                &stack.layers[i - 1].polys,
                opt,
                scratch,
            )
        })
        .collect();

    for (i, result) in results.into_iter().enumerate() {
        stack.layers[i + 1].polys = result?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
