/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Seed-batch selection.
//!
//! Batches are fixed-width: slot 0 is a centre of sufficient degree, the
//! remaining slots are drawn from the centre's neighbourhood, and missing
//! slots are padded by repeating the centre, which the traversal recognises
//! and truncates. Candidate centres and neighbourhood fill order follow a
//! single random permutation of the nodes drawn from a seeded generator, so
//! selection is reproducible and no node is systematically favoured.

use crate::graphs::CsrGraph;
use crate::visits::MAX_SEEDS;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

/// Builds up to `num_batches` batches of `batch_size` seeds whose centres
/// have outdegree at least `batch_size`, filling the remaining slots from
/// the centres' out-neighbours.
///
/// Fewer batches are returned when the graph has too few centres of
/// sufficient degree.
pub fn one_hop_star(
    graph: &CsrGraph,
    num_batches: usize,
    batch_size: usize,
    seed: u64,
) -> Vec<Vec<usize>> {
    star_batches(graph, num_batches, batch_size, seed, batch_size, |graph, centre| {
        graph.successors(centre).to_vec()
    })
}

/// Builds up to `num_batches` batches of `batch_size` seeds whose centres
/// have outdegree at least `log2(batch_size)`, filling the remaining slots
/// from the centres' 1- and 2-hop out-neighbourhoods.
pub fn two_hop_star(
    graph: &CsrGraph,
    num_batches: usize,
    batch_size: usize,
    seed: u64,
) -> Vec<Vec<usize>> {
    let min_degree = batch_size.ilog2() as usize;
    star_batches(graph, num_batches, batch_size, seed, min_degree, |graph, centre| {
        let mut pool = HashSet::new();
        for &hop1 in graph.successors(centre) {
            pool.insert(hop1);
            for &hop2 in graph.successors(hop1) {
                pool.insert(hop2);
            }
        }
        pool.into_iter().collect()
    })
}

/// Builds up to `num_batches` batches of `batch_size` seeds whose centres
/// have outdegree at least `log2(batch_size)`, filling the remaining slots
/// from the centres' 3-hop out-neighbourhoods.
pub fn three_hop_star(
    graph: &CsrGraph,
    num_batches: usize,
    batch_size: usize,
    seed: u64,
) -> Vec<Vec<usize>> {
    let min_degree = batch_size.ilog2() as usize;
    star_batches(graph, num_batches, batch_size, seed, min_degree, |graph, centre| {
        let mut visited = vec![false; graph.num_nodes()];
        visited[centre] = true;
        let mut frontier = vec![centre];
        let mut pool = Vec::new();
        for _ in 0..3 {
            let mut next = Vec::new();
            for &node in &frontier {
                for &succ in graph.successors(node) {
                    if !visited[succ] {
                        visited[succ] = true;
                        pool.push(succ);
                        next.push(succ);
                    }
                }
            }
            frontier = next;
        }
        pool
    })
}

/// The shared batch builder: permutes the nodes, keeps the centres of
/// sufficient degree in permutation order, and fills each batch from the
/// centre's candidate pool ordered by permutation rank.
fn star_batches(
    graph: &CsrGraph,
    num_batches: usize,
    batch_size: usize,
    seed: u64,
    min_degree: usize,
    pool: impl Fn(&CsrGraph, usize) -> Vec<usize>,
) -> Vec<Vec<usize>> {
    assert!(
        (1..=MAX_SEEDS).contains(&batch_size),
        "The batch size must be in [1, {}]",
        MAX_SEEDS
    );
    let num_nodes = graph.num_nodes();
    let mut order: Vec<usize> = (0..num_nodes).collect();
    order.shuffle(&mut SmallRng::seed_from_u64(seed));
    let mut rank = vec![0; num_nodes];
    for (position, &node) in order.iter().enumerate() {
        rank[node] = position;
    }

    let mut batches = Vec::with_capacity(num_batches);
    for &centre in order.iter() {
        if batches.len() == num_batches {
            break;
        }
        if graph.outdegree(centre) < min_degree {
            continue;
        }
        let mut candidates = pool(graph, centre);
        candidates.sort_by_key(|&node| rank[node]);
        let mut batch = Vec::with_capacity(batch_size);
        batch.push(centre);
        for candidate in candidates {
            if batch.len() == batch_size {
                break;
            }
            if candidate == centre || batch.contains(&candidate) {
                continue;
            }
            batch.push(candidate);
        }
        // Pad with the centre; the traversal truncates at the first repeat.
        batch.resize(batch_size, centre);
        batches.push(batch);
    }
    batches
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphs::random;
    use crate::visits::effective_seeds;

    #[test]
    fn test_one_hop_star() {
        let graph = random::uniform(100, 10, 0);
        let batches = one_hop_star(&graph, 3, 8, 0);
        assert_eq!(batches.len(), 3);
        for batch in &batches {
            assert_eq!(batch.len(), 8);
            assert!(graph.outdegree(batch[0]) >= 8);
            assert!(batch.iter().all(|&seed| seed < 100));
            let effective = effective_seeds(batch);
            let mut distinct = effective.to_vec();
            distinct.sort();
            distinct.dedup();
            assert_eq!(distinct.len(), effective.len());
        }
        // Same seed, same selection.
        assert_eq!(batches, one_hop_star(&graph, 3, 8, 0));
    }

    #[test]
    fn test_one_hop_star_pads_with_centre() {
        // The centre has degree 5 but only three distinct other neighbours.
        let graph =
            CsrGraph::from_arcs([(0, 0), (0, 1), (0, 1), (0, 2), (0, 3), (1, 0)]);
        let batches = one_hop_star(&graph, 1, 5, 0);
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch[0], 0);
        assert_eq!(batch[4], 0);
        assert_eq!(effective_seeds(batch).len(), 4);
    }

    #[test]
    fn test_two_hop_star() {
        let graph = random::uniform(100, 5, 1);
        let batches = two_hop_star(&graph, 2, 16, 1);
        assert_eq!(batches.len(), 2);
        for batch in &batches {
            assert_eq!(batch.len(), 16);
            assert!(graph.outdegree(batch[0]) >= 4);
        }
    }

    #[test]
    fn test_three_hop_star() {
        let graph = random::uniform(100, 5, 2);
        let batches = three_hop_star(&graph, 2, 16, 2);
        assert_eq!(batches.len(), 2);
        for batch in &batches {
            assert_eq!(batch.len(), 16);
            let effective = effective_seeds(batch);
            let mut distinct = effective.to_vec();
            distinct.sort();
            distinct.dedup();
            assert_eq!(distinct.len(), effective.len());
        }
    }
}
