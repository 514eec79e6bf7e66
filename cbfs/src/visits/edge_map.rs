/*
 * SPDX-FileCopyrightText: 2024 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::VertexSubset;
use crate::graphs::CsrGraph;
use parallel_frontier::Frontier;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::atomic::Ordering;
use sux::prelude::*;

/// An edge relaxation: the algorithm-specific part of an [`EdgeMap`]
/// traversal.
///
/// The engine knows nothing about the semantics of a traversal; it only
/// calls [`admits`](Self::admits) to prune destinations and
/// [`relax`](Self::relax) to process a single edge. Both are invoked
/// concurrently from many threads.
pub trait EdgeOp {
    /// Processes the edge from `src` to `dst`, returning true if `dst` must
    /// join the next frontier.
    ///
    /// The engine may present the same destination through several edges in
    /// one sweep, possibly concurrently; at most one of those calls may
    /// return true, or the next frontier will list the destination more than
    /// once. `backwards` tells whether the edge was found scanning the
    /// transpose; `src` and `dst` always name the endpoints of the original
    /// edge.
    fn relax(&self, src: usize, dst: usize, backwards: bool) -> bool;

    /// Returns true if `dst` may still join a frontier; edges into other
    /// nodes are not relaxed.
    fn admits(&self, dst: usize) -> bool;
}

/// A direction-optimising edge-relaxation engine.
///
/// [`run`](Self::run) consumes a frontier and produces the next one by
/// relaxing, through an [`EdgeOp`], every edge leaving the frontier. Per
/// invocation it chooses between a *push* (scan the out-edges of the
/// frontier, producing a sparse output) and a *pull* (scan the in-edges of
/// every admissible node via the transpose, producing a dense output),
/// using the classical cost crossover: a sparse frontier is pushed unless
/// its size plus outgoing degree exceeds a tenth of the arcs, a dense one
/// is pulled unless its population drops below a twentieth of the nodes.
///
/// # Examples
///
/// A plain reachability step: claim each destination once through an atomic
/// bitmap, ignoring edge directions and admitting every unseen node.
///
/// ```
/// use cluster_bfs::prelude::*;
/// use std::sync::atomic::Ordering;
/// use sux::prelude::*;
///
/// struct Reach {
///     seen: AtomicBitVec,
/// }
///
/// impl EdgeOp for Reach {
///     fn relax(&self, _src: usize, dst: usize, _backwards: bool) -> bool {
///         !self.seen.swap(dst, true, Ordering::Relaxed)
///     }
///     fn admits(&self, dst: usize) -> bool {
///         !self.seen.get(dst, Ordering::Relaxed)
///     }
/// }
///
/// let graph = CsrGraph::from_arcs([(0, 1), (0, 2), (1, 3)]);
/// let transpose = graph.transposed();
/// let edge_map = EdgeMap::new(&graph, &transpose);
/// let thread_pool = thread_pool![];
///
/// let reach = Reach { seen: AtomicBitVec::new(graph.num_nodes()) };
/// reach.seen.set(0, true, Ordering::Relaxed);
///
/// let frontier = edge_map.run(&reach, &VertexSubset::singleton(0), false, &thread_pool);
/// let mut next = frontier.to_vec(&thread_pool);
/// next.sort();
/// assert_eq!(next, [1, 2]);
/// ```
pub struct EdgeMap<'a> {
    graph: &'a CsrGraph,
    transpose: &'a CsrGraph,
    granularity: usize,
    sparse_limit: usize,
    dense_limit: usize,
}

impl<'a> EdgeMap<'a> {
    /// Nodes per parallel task; high granularity reduces overhead, but may
    /// unbalance threads on skewed outdegree distributions.
    pub const DEFAULT_GRANULARITY: usize = 128;

    /// Creates an engine over a graph and its transpose.
    ///
    /// # Panics
    /// Panics if `transpose` does not have the same number of nodes and arcs
    /// as `graph`.
    pub fn new(graph: &'a CsrGraph, transpose: &'a CsrGraph) -> Self {
        assert_eq!(
            graph.num_nodes(),
            transpose.num_nodes(),
            "The transpose must have the same number of nodes"
        );
        assert_eq!(
            graph.num_arcs(),
            transpose.num_arcs(),
            "The transpose must have the same number of arcs"
        );
        Self {
            graph,
            transpose,
            granularity: Self::DEFAULT_GRANULARITY,
            sparse_limit: (graph.num_arcs() / 10) as usize,
            dense_limit: graph.num_nodes() / 20,
        }
    }

    /// Sets the number of nodes per parallel task.
    pub fn with_granularity(mut self, granularity: usize) -> Self {
        assert!(granularity > 0, "The granularity must be positive");
        self.granularity = granularity;
        self
    }

    /// Replaces the push/pull crossover thresholds.
    ///
    /// A sparse frontier switches to the pull path when its size plus its
    /// outgoing degree exceeds `sparse_limit`; a dense frontier keeps the
    /// pull path while its population exceeds `dense_limit`. The defaults
    /// are a tenth of the arcs and a twentieth of the nodes; `usize::MAX`
    /// for both forces the push path, zero for both forces the pull path.
    pub fn with_limits(mut self, sparse_limit: usize, dense_limit: usize) -> Self {
        self.sparse_limit = sparse_limit;
        self.dense_limit = dense_limit;
        self
    }

    /// Relaxes every edge leaving `frontier` and returns the next frontier.
    ///
    /// With `exit_early`, the pull path stops scanning the in-edges of a
    /// node at the first relaxation returning true; otherwise every in-edge
    /// from a frontier member is relaxed and the returns are ORed, so both
    /// paths relax exactly the same edge set.
    ///
    /// The set of nodes in the result is deterministic; the order of a
    /// sparse result is not.
    pub fn run<O: EdgeOp + Sync>(
        &self,
        op: &O,
        frontier: &VertexSubset,
        exit_early: bool,
        thread_pool: &ThreadPool,
    ) -> VertexSubset {
        match frontier {
            VertexSubset::Sparse(members) => {
                let outgoing: usize = thread_pool.install(|| {
                    members
                        .par_iter()
                        .with_min_len(self.granularity)
                        .map(|&src| self.graph.outdegree(src))
                        .sum()
                });
                if members.len() + outgoing > self.sparse_limit {
                    let bits = AtomicBitVec::new(self.graph.num_nodes());
                    thread_pool.install(|| {
                        members
                            .par_iter()
                            .for_each(|&src| bits.set(src, true, Ordering::Relaxed))
                    });
                    self.pull(op, &bits, exit_early, thread_pool)
                } else {
                    self.push(op, members, thread_pool)
                }
            }
            VertexSubset::Dense { bits, ones } => {
                if *ones > self.dense_limit {
                    self.pull(op, bits, exit_early, thread_pool)
                } else {
                    self.push(op, &frontier.to_vec(thread_pool), thread_pool)
                }
            }
        }
    }

    /// Scans the out-edges of the frontier members, collecting the
    /// destinations whose relaxation returned true into a sparse subset.
    fn push<O: EdgeOp + Sync>(
        &self,
        op: &O,
        members: &[usize],
        thread_pool: &ThreadPool,
    ) -> VertexSubset {
        let next = Frontier::with_threads(thread_pool, None);
        thread_pool.install(|| {
            members
                .par_iter()
                .chunks(self.granularity)
                .for_each(|chunk| {
                    for &src in chunk {
                        for &dst in self.graph.successors(src) {
                            if op.admits(dst) && op.relax(src, dst, false) {
                                next.push(dst);
                            }
                        }
                    }
                })
        });
        let members = thread_pool.install(|| next.par_iter().copied().collect());
        VertexSubset::Sparse(members)
    }

    /// Scans the in-edges of every admissible node through the transpose,
    /// recording in a dense subset the nodes with a relaxation returning
    /// true.
    fn pull<O: EdgeOp + Sync>(
        &self,
        op: &O,
        frontier: &AtomicBitVec,
        exit_early: bool,
        thread_pool: &ThreadPool,
    ) -> VertexSubset {
        let num_nodes = self.graph.num_nodes();
        let bits = AtomicBitVec::new(num_nodes);
        let ones = thread_pool.install(|| {
            (0..num_nodes)
                .into_par_iter()
                .with_min_len(self.granularity)
                .map(|dst| {
                    if !op.admits(dst) {
                        return 0;
                    }
                    let mut live = false;
                    for &src in self.transpose.successors(dst) {
                        if frontier.get(src, Ordering::Relaxed) && op.relax(src, dst, true) {
                            live = true;
                            if exit_early {
                                break;
                            }
                        }
                    }
                    if live {
                        bits.set(dst, true, Ordering::Relaxed);
                        1
                    } else {
                        0
                    }
                })
                .sum()
        });
        VertexSubset::Dense { bits, ones }
    }
}
