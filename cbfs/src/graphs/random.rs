/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Random graphs for tests and benchmarks.

use super::CsrGraph;
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Creates a random graph with `n` nodes in which every node has exactly
/// `out_degree` successors drawn uniformly at random, given a seed for the
/// [pseudorandom number generator](SmallRng).
///
/// Self-loops and parallel arcs may occur; both are harmless to traversals.
pub fn uniform(n: usize, out_degree: usize, seed: u64) -> CsrGraph {
    assert!(n > 0, "The graph must have at least one node");
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut dcf = Vec::with_capacity(n + 1);
    let mut successors = Vec::with_capacity(n * out_degree);
    dcf.push(0);
    for _ in 0..n {
        for _ in 0..out_degree {
            successors.push(rng.random_range(0..n));
        }
        dcf.push(successors.len());
    }
    unsafe { CsrGraph::from_parts(dcf, successors) }
}
