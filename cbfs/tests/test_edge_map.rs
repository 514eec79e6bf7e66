/*
 * SPDX-FileCopyrightText: 2024 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use cluster_bfs::prelude::*;
use cluster_bfs::thread_pool;
use std::sync::atomic::Ordering;
use sux::prelude::*;

/// A plain reachability relaxation: each destination is claimed once
/// through an atomic bitmap.
struct Reach {
    seen: AtomicBitVec,
}

impl Reach {
    fn new(num_nodes: usize, roots: &[usize]) -> Self {
        let seen = AtomicBitVec::new(num_nodes);
        for &root in roots {
            seen.set(root, true, Ordering::Relaxed);
        }
        Self { seen }
    }
}

impl EdgeOp for Reach {
    fn relax(&self, _src: usize, dst: usize, _backwards: bool) -> bool {
        !self.seen.swap(dst, true, Ordering::Relaxed)
    }

    fn admits(&self, dst: usize) -> bool {
        !self.seen.get(dst, Ordering::Relaxed)
    }
}

#[test]
fn test_empty_frontier_yields_empty_sparse() {
    let graph = CsrGraph::from_arcs([(0, 1), (1, 2)]);
    let transpose = graph.transposed();
    let edge_map = EdgeMap::new(&graph, &transpose);
    let thread_pool = thread_pool![];
    let reach = Reach::new(graph.num_nodes(), &[]);
    let next = edge_map.run(&reach, &VertexSubset::new(), false, &thread_pool);
    assert!(next.is_empty());
    assert!(matches!(&next, VertexSubset::Sparse(_)));
}

#[test]
fn test_forced_paths_reach_the_same_nodes() {
    let graph = random::uniform(2_000, 4, 5);
    let transpose = graph.transposed();
    let thread_pool = thread_pool![];

    let mut frontiers = Vec::new();
    for (sparse_limit, dense_limit) in [(usize::MAX, usize::MAX), (0, 0)] {
        let edge_map =
            EdgeMap::new(&graph, &transpose).with_limits(sparse_limit, dense_limit);
        let reach = Reach::new(graph.num_nodes(), &[0]);
        let mut frontier = VertexSubset::singleton(0);
        let mut reached = Vec::new();
        while !frontier.is_empty() {
            frontier = edge_map.run(&reach, &frontier, false, &thread_pool);
            let mut members = frontier.to_vec(&thread_pool);
            members.sort();
            reached.push(members);
        }
        frontiers.push(reached);
    }
    assert_eq!(frontiers[0], frontiers[1]);
}

#[test]
fn test_exit_early_yields_the_same_frontier() {
    // Node 3 is reachable through two frontier members; stopping at the
    // first live in-edge must not change the output set.
    let graph = CsrGraph::from_arcs([(0, 1), (0, 2), (1, 3), (2, 3)]);
    let transpose = graph.transposed();
    let thread_pool = thread_pool![];
    // Zero limits force the pull path, the only one exit_early affects.
    let edge_map = EdgeMap::new(&graph, &transpose).with_limits(0, 0);

    let mut results = Vec::new();
    for exit_early in [false, true] {
        let reach = Reach::new(graph.num_nodes(), &[1, 2]);
        let next = edge_map.run(
            &reach,
            &VertexSubset::from_vertices(vec![1, 2]),
            exit_early,
            &thread_pool,
        );
        let mut members = next.to_vec(&thread_pool);
        members.sort();
        results.push(members);
    }
    assert_eq!(results[0], [3]);
    assert_eq!(results[0], results[1]);
}

#[test]
fn test_engine_results_do_not_depend_on_direction() -> Result<()> {
    // A scaled-down version of the million-node switch test: the same batch
    // traversed with the automatic crossover, with the push path forced and
    // with the pull path forced must settle identical state.
    let graph = random::uniform(20_000, 8, 3);
    let transpose = graph.transposed();
    let thread_pool = thread_pool![];
    let batch: Vec<usize> = (0..64).map(|i| i * 271 % 20_000).collect();

    let mut snapshots = Vec::new();
    for limits in [None, Some((usize::MAX, usize::MAX)), Some((0, 0))] {
        let mut bfs = ClusterBfs::new(&graph, &transpose, 4)?;
        if let Some((sparse_limit, dense_limit)) = limits {
            bfs = bfs.with_limits(sparse_limit, dense_limit);
        }
        let seeds = bfs.init(&batch, &thread_pool)?;
        bfs.run(&seeds, &thread_pool);
        let state: Vec<(u64, Vec<u64>, u64)> = (0..graph.num_nodes())
            .map(|node| {
                (
                    bfs.first_rounds()[node],
                    bfs.arrivals(node).to_vec(),
                    bfs.reached_mask(node),
                )
            })
            .collect();
        snapshots.push((bfs.rounds(), state));
    }
    assert_eq!(snapshots[0], snapshots[1]);
    assert_eq!(snapshots[0], snapshots[2]);
    Ok(())
}

#[test]
fn test_crossover_switches_to_pull_on_wide_frontiers() {
    // A tiny sparse limit converts the very first sparse frontier.
    let graph = CsrGraph::from_arcs([(0, 1), (0, 2), (1, 2), (2, 0)]);
    let transpose = graph.transposed();
    let thread_pool = thread_pool![];
    let edge_map = EdgeMap::new(&graph, &transpose).with_limits(0, usize::MAX);
    let reach = Reach::new(graph.num_nodes(), &[0]);
    let next = edge_map.run(&reach, &VertexSubset::singleton(0), false, &thread_pool);
    assert!(matches!(&next, VertexSubset::Dense { .. }));
    let mut members = next.to_vec(&thread_pool);
    members.sort();
    assert_eq!(members, [1, 2]);
}

#[test]
fn test_crossover_keeps_narrow_frontiers_sparse() {
    let graph = CsrGraph::from_arcs([(0, 1), (0, 2), (1, 2), (2, 0)]);
    let transpose = graph.transposed();
    let thread_pool = thread_pool![];
    let edge_map = EdgeMap::new(&graph, &transpose).with_limits(usize::MAX, usize::MAX);
    let reach = Reach::new(graph.num_nodes(), &[0]);
    let next = edge_map.run(&reach, &VertexSubset::singleton(0), false, &thread_pool);
    assert!(matches!(&next, VertexSubset::Sparse(_)));
    let mut members = next.to_vec(&thread_pool);
    members.sort();
    assert_eq!(members, [1, 2]);
}
