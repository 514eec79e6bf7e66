/*
 * SPDX-FileCopyrightText: 2024 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Sequential reference searches.
//!
//! [`multi_source_bfs`] is the naive counterpart of the bit-parallel engine:
//! it explores every (node, seed) pair with a plain queue and records every
//! improving arrival, without any radius bound. It is slow and is meant as a
//! test oracle and as a baseline.
//!
//! [`single_source_distances`] is the classical search backing
//! [`verify`](super::ClusterBfs::verify).

use super::UNREACHED;
use crate::graphs::CsrGraph;
use std::collections::VecDeque;

/// The distance reported by [`single_source_distances`] for nodes the root
/// does not reach.
pub const UNREACHABLE: u64 = (1 << 31) - 1;

/// A recorded arrival of a seed at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    /// The index of the seed in the batch.
    pub seed: usize,
    /// The round the seed reached the node.
    pub round: u64,
}

/// Runs a naive multi-source breadth-first search, returning the first-touch
/// round of every node and, per node, every improving arrival as a (seed,
/// round) pair.
///
/// First-touch rounds match the bit-parallel engine exactly; arrivals are
/// unbounded rather than windowed. Nodes no seed reaches get [`UNREACHED`].
pub fn multi_source_bfs(graph: &CsrGraph, seeds: &[usize]) -> (Vec<u64>, Vec<Vec<Arrival>>) {
    let num_nodes = graph.num_nodes();
    let mut first_round = vec![UNREACHED; num_nodes];
    let mut arrivals: Vec<Vec<Arrival>> = vec![Vec::new(); num_nodes];
    // best[i][v] is the shortest distance found so far from seed i to v.
    let mut best = vec![vec![UNREACHED; num_nodes]; seeds.len()];
    let mut queue = VecDeque::new();

    for (i, &seed) in seeds.iter().enumerate() {
        if best[i][seed] != 0 {
            best[i][seed] = 0;
            first_round[seed] = 0;
            arrivals[seed].push(Arrival { seed: i, round: 0 });
            queue.push_back((seed, i, 0));
        }
    }

    while let Some((node, i, distance)) = queue.pop_front() {
        let next = distance + 1;
        for &succ in graph.successors(node) {
            if next < best[i][succ] {
                best[i][succ] = next;
                first_round[succ] = first_round[succ].min(next);
                arrivals[succ].push(Arrival {
                    seed: i,
                    round: next,
                });
                queue.push_back((succ, i, next));
            }
        }
    }

    (first_round, arrivals)
}

/// Runs a classical breadth-first search from `root`, returning per-node
/// distances with [`UNREACHABLE`] for the nodes `root` does not reach.
pub fn single_source_distances(graph: &CsrGraph, root: usize) -> Vec<u64> {
    let mut distances = vec![UNREACHABLE; graph.num_nodes()];
    let mut queue = VecDeque::new();
    distances[root] = 0;
    queue.push_back(root);
    while let Some(node) = queue.pop_front() {
        for &succ in graph.successors(node) {
            if distances[succ] == UNREACHABLE {
                distances[succ] = distances[node] + 1;
                queue.push_back(succ);
            }
        }
    }
    distances
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_multi_source_bfs() {
        let graph = CsrGraph::from_arcs([(0, 1), (1, 2), (2, 3)]);
        let (first_round, arrivals) = multi_source_bfs(&graph, &[0, 3]);
        assert_eq!(first_round, [0, 1, 2, 0]);
        assert_eq!(arrivals[0], [Arrival { seed: 0, round: 0 }]);
        assert_eq!(arrivals[2], [Arrival { seed: 0, round: 2 }]);
        assert_eq!(arrivals[3], [Arrival { seed: 1, round: 0 }]);
    }

    #[test]
    fn test_multi_source_bfs_records_later_seeds() {
        // Both seeds reach node 2, at rounds 1 and 2.
        let graph = CsrGraph::from_arcs([(0, 1), (1, 2), (3, 2), (2, 4)]);
        let (first_round, arrivals) = multi_source_bfs(&graph, &[0, 3]);
        assert_eq!(first_round, [0, 1, 1, 0, 2]);
        assert_eq!(
            arrivals[2],
            [
                Arrival { seed: 1, round: 1 },
                Arrival { seed: 0, round: 2 }
            ]
        );
    }

    #[test]
    fn test_single_source_distances() {
        let graph = CsrGraph::from_arcs([(0, 1), (1, 2), (2, 3)]);
        assert_eq!(
            single_source_distances(&graph, 1),
            [UNREACHABLE, 0, 1, 2]
        );
    }
}
