/*
 * SPDX-FileCopyrightText: 2024 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{seq, EdgeMap, EdgeOp, VertexSubset, UNREACHED};
use crate::graphs::CsrGraph;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::atomic::{AtomicU64, Ordering};
use sync_cell_slice::SyncSlice;
use thiserror::Error;

/// The largest number of seeds a batch can carry: one bit per seed in a
/// 64-bit mask.
pub const MAX_SEEDS: usize = u64::BITS as usize;

#[derive(Error, Debug)]
/// The graphs handed to [`ClusterBfs::new`] cannot be traversed.
pub enum GraphError {
    #[error("The graph has no nodes")]
    Empty,
    #[error("The radius must be at least 1")]
    ZeroRadius,
    #[error("The transpose has {transpose} nodes, the graph {graph}")]
    NodeMismatch { graph: usize, transpose: usize },
    #[error("The transpose has {transpose} arcs, the graph {graph}")]
    ArcMismatch { graph: u64, transpose: u64 },
}

#[derive(Error, Debug)]
/// A seed batch violates the batch preconditions.
pub enum BatchError {
    #[error("The seed batch is empty")]
    Empty,
    #[error("The seed batch has {0} entries, more than the {MAX_SEEDS}-seed limit")]
    TooLarge(usize),
    #[error("Seed {0} is not a node")]
    OutOfRange(usize),
    #[error("Seed {0} appears twice in the batch")]
    Duplicate(usize),
}

#[derive(Error, Debug)]
/// A discrepancy between a traversal and the per-seed reference search.
pub enum VerifyError {
    #[error(
        "Seed {seed} at node {node}: the reference distance is {reference}, the recorded arrival gives {computed}"
    )]
    Mismatch {
        seed: usize,
        node: usize,
        reference: u64,
        computed: u64,
    },
    #[error(
        "Seed {seed} at node {node}: the reference distance {reference} exceeds the discovery round {first_round} by more than {slack}"
    )]
    OutOfTolerance {
        seed: usize,
        node: usize,
        reference: u64,
        first_round: u64,
        slack: u64,
    },
    #[error("Seed {seed} reaches node {node} at distance {reference}, but no traversal did")]
    Unreached {
        seed: usize,
        node: usize,
        reference: u64,
    },
}

/// Truncates a padded seed batch: the effective seeds are the prefix before
/// the first repetition of the leading seed.
///
/// Fixed-width batches are padded by repeating their first entry, so
/// `[7, 2, 7, 7]` carries the effective seeds `[7, 2]`.
pub fn effective_seeds(batch: &[usize]) -> &[usize] {
    for (i, &seed) in batch.iter().enumerate() {
        if i != 0 && seed == batch[0] {
            return &batch[..i];
        }
    }
    batch
}

/// A bit-parallel approximate multi-source breadth-first search.
///
/// A batch of up to [`MAX_SEEDS`] seeds is traversed simultaneously: seed `i`
/// of a batch owns bit `i` of every per-node 64-bit mask. Each round has two
/// phases. The *commit* phase folds the mask bits that arrived at each
/// frontier node into its settled mask, records them at the node's current
/// relative round, and stamps the node's discovery round on first touch. The
/// *relax* phase then pushes the settled masks across every edge leaving the
/// frontier: an atomic fetch-or accumulates arrivals, and a compare-and-swap
/// on a per-node round tag elects exactly one claimer per node and round, so
/// the next frontier lists each node once.
///
/// A node stops being relaxed into once its relative round reaches the
/// radius: seeds arriving later are not recorded, which is what makes the
/// search approximate. Discovery rounds are exact.
///
/// The instance owns its per-node arrays and may be re-initialised for
/// successive batches over the same graphs; the graphs themselves are shared
/// and never mutated.
///
/// # Examples
///
/// Two seeds on a directed path:
///
/// ```
/// use cluster_bfs::prelude::*;
///
/// let graph = CsrGraph::from_arcs([(0, 1), (1, 2), (2, 3), (3, 4)]);
/// let transpose = graph.transposed();
/// let mut bfs = ClusterBfs::new(&graph, &transpose, 2).unwrap();
/// let thread_pool = thread_pool![];
///
/// let seeds = bfs.init(&[0, 4], &thread_pool).unwrap();
/// bfs.run(&seeds, &thread_pool);
///
/// assert_eq!(bfs.first_rounds(), &[0, 1, 2, 3, 0]);
/// // Node 2 was discovered by seed 0 (bit 0) at its discovery round.
/// assert_eq!(bfs.arrivals(2), &[1, 0]);
/// // Node 4 is seed 1 (bit 1).
/// assert_eq!(bfs.arrivals(4), &[2, 0]);
/// ```
pub struct ClusterBfs<'a> {
    graph: &'a CsrGraph,
    edge_map: EdgeMap<'a>,
    radius: usize,
    round: u64,
    /// Per node, the seeds settled in some committed round.
    reached: Vec<AtomicU64>,
    /// Per node, the seeds that arrived in any round so far, including
    /// in-flight ones. Never cleared: the commit phase subtracts the settled
    /// mask instead.
    arriving: Vec<AtomicU64>,
    /// Per node, the last round the node was claimed for a frontier.
    claim_round: Vec<AtomicU64>,
    /// Per node, the round of its first commit.
    first_round: Vec<u64>,
    /// Per node, `radius` mask words: the seeds whose first arrival fell at
    /// each relative round. Flattened row-major.
    arrivals: Vec<u64>,
}

impl<'a> ClusterBfs<'a> {
    /// Creates a traversal over a graph and its transpose, recording
    /// `radius` relative rounds per node.
    ///
    /// All per-node arrays are allocated here, once; [`init`](Self::init)
    /// only resets them.
    pub fn new(
        graph: &'a CsrGraph,
        transpose: &'a CsrGraph,
        radius: usize,
    ) -> Result<Self, GraphError> {
        let num_nodes = graph.num_nodes();
        if num_nodes == 0 {
            return Err(GraphError::Empty);
        }
        if radius == 0 {
            return Err(GraphError::ZeroRadius);
        }
        if transpose.num_nodes() != num_nodes {
            return Err(GraphError::NodeMismatch {
                graph: num_nodes,
                transpose: transpose.num_nodes(),
            });
        }
        if transpose.num_arcs() != graph.num_arcs() {
            return Err(GraphError::ArcMismatch {
                graph: graph.num_arcs(),
                transpose: transpose.num_arcs(),
            });
        }
        Ok(Self {
            graph,
            edge_map: EdgeMap::new(graph, transpose),
            radius,
            round: 0,
            reached: (0..num_nodes).map(|_| AtomicU64::new(0)).collect(),
            arriving: (0..num_nodes).map(|_| AtomicU64::new(0)).collect(),
            claim_round: (0..num_nodes).map(|_| AtomicU64::new(UNREACHED)).collect(),
            first_round: vec![UNREACHED; num_nodes],
            arrivals: vec![0; num_nodes * radius],
        })
    }

    /// Replaces the push/pull crossover thresholds of the underlying
    /// [`EdgeMap`]; see [`EdgeMap::with_limits`].
    pub fn with_limits(mut self, sparse_limit: usize, dense_limit: usize) -> Self {
        self.edge_map = self.edge_map.with_limits(sparse_limit, dense_limit);
        self
    }

    /// Resets the per-node state and seeds a new batch, returning the
    /// effective seeds.
    ///
    /// The batch is truncated at the first repetition of its leading seed
    /// (see [`effective_seeds`]); seed `i` of the result owns bit `i`. A
    /// duplicate *within* the effective seeds is an error, as are an empty
    /// batch, a batch wider than [`MAX_SEEDS`] and a seed that is not a
    /// node.
    ///
    /// On error the per-node state is unspecified and the instance must be
    /// re-initialised before running.
    pub fn init(
        &mut self,
        batch: &[usize],
        thread_pool: &ThreadPool,
    ) -> Result<Vec<usize>, BatchError> {
        if batch.is_empty() {
            return Err(BatchError::Empty);
        }
        if batch.len() > MAX_SEEDS {
            return Err(BatchError::TooLarge(batch.len()));
        }
        let num_nodes = self.graph.num_nodes();
        self.round = 0;
        thread_pool.install(|| {
            self.reached
                .par_iter()
                .for_each(|mask| mask.store(0, Ordering::Relaxed));
            self.arriving
                .par_iter()
                .for_each(|mask| mask.store(0, Ordering::Relaxed));
            self.claim_round
                .par_iter()
                .for_each(|tag| tag.store(UNREACHED, Ordering::Relaxed));
            self.first_round
                .par_iter_mut()
                .for_each(|round| *round = UNREACHED);
            self.arrivals.par_iter_mut().for_each(|mask| *mask = 0);
        });

        let effective = effective_seeds(batch);
        let mut seeds = Vec::with_capacity(effective.len());
        for (i, &seed) in effective.iter().enumerate() {
            if seed >= num_nodes {
                return Err(BatchError::OutOfRange(seed));
            }
            if seeds.contains(&seed) {
                return Err(BatchError::Duplicate(seed));
            }
            self.arriving[seed].store(1_u64 << i, Ordering::Relaxed);
            seeds.push(seed);
        }
        Ok(seeds)
    }

    /// Runs the traversal from the effective seeds returned by
    /// [`init`](Self::init), until the frontier empties.
    pub fn run(&mut self, seeds: &[usize], thread_pool: &ThreadPool) {
        let mut frontier = VertexSubset::from_vertices(seeds.to_vec());
        while !frontier.is_empty() {
            self.commit(&frontier, thread_pool);
            self.round += 1;
            let op = MaskRelax {
                reached: &self.reached,
                arriving: &self.arriving,
                claim_round: &self.claim_round,
                first_round: &self.first_round,
                round: self.round,
                radius: self.radius as u64,
            };
            frontier = self.edge_map.run(&op, &frontier, false, thread_pool);
        }
        log::debug!("Traversal settled after {} rounds", self.round);
    }

    /// Commits the arrivals gathered for the frontier during the previous
    /// relax phase: records the fresh seeds at each member's relative round,
    /// stamps discovery rounds on first touch, and settles the fresh seeds
    /// into the reached masks.
    fn commit(&mut self, frontier: &VertexSubset, thread_pool: &ThreadPool) {
        let round = self.round;
        let radius = self.radius;
        let reached = &self.reached;
        let arriving = &self.arriving;
        let first_round = self.first_round.as_sync_slice();
        let arrivals = self.arrivals.as_sync_slice();
        frontier.for_each(thread_pool, |node| {
            let fresh =
                arriving[node].load(Ordering::Acquire) & !reached[node].load(Ordering::Acquire);
            // SAFETY: a frontier lists each node at most once, so this
            // invocation is the only writer of the node's cells.
            let first = unsafe { first_round[node].get() };
            let first = if first == UNREACHED {
                unsafe { first_round[node].set(round) };
                round
            } else {
                first
            };
            let offset = (round - first) as usize;
            assert!(
                offset < radius,
                "Node {} committed at relative round {} with radius {}",
                node,
                offset,
                radius
            );
            unsafe { arrivals[node * radius + offset].set(fresh) };
            reached[node].fetch_or(fresh, Ordering::Release);
        });
    }

    /// Checks every effective seed against a single-source reference search.
    ///
    /// For a seed whose bit shows up within the recorded relative rounds of
    /// a node, the reconstructed distance must match the reference exactly;
    /// for a seed that never shows up, the reference distance may exceed the
    /// node's discovery round by at most `((radius + 1) / 2) * 2`.
    pub fn verify(&self, seeds: &[usize]) -> Result<(), VerifyError> {
        let radius = self.radius;
        let slack = (radius as u64 + 1) / 2 * 2;
        for (i, &seed) in effective_seeds(seeds).iter().enumerate() {
            let reference = seq::single_source_distances(self.graph, seed);
            for node in 0..self.graph.num_nodes() {
                let true_distance = reference[node];
                if true_distance == seq::UNREACHABLE {
                    continue;
                }
                let first = self.first_round[node];
                if first == UNREACHED {
                    return Err(VerifyError::Unreached {
                        seed,
                        node,
                        reference: true_distance,
                    });
                }
                // Roll the arrival rows forward until the seed's bit shows up.
                let mut rolling = 0_u64;
                let mut computed = None;
                for offset in 0..radius {
                    rolling |= self.arrivals[node * radius + offset];
                    if rolling & (1 << i) != 0 {
                        computed = Some(first + offset as u64);
                        break;
                    }
                }
                match computed {
                    Some(distance) => {
                        if distance != true_distance {
                            return Err(VerifyError::Mismatch {
                                seed,
                                node,
                                reference: true_distance,
                                computed: distance,
                            });
                        }
                    }
                    None => {
                        if true_distance.saturating_sub(first) > slack {
                            return Err(VerifyError::OutOfTolerance {
                                seed,
                                node,
                                reference: true_distance,
                                first_round: first,
                                slack,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the number of relative rounds recorded per node.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Returns the round counter after the last run: the number of rounds
    /// the traversal took.
    pub fn rounds(&self) -> u64 {
        self.round
    }

    /// Returns the discovery round of every node; [`UNREACHED`] marks nodes
    /// no seed reached.
    pub fn first_rounds(&self) -> &[u64] {
        &self.first_round
    }

    /// Returns the arrival rows of a node: word `r` holds the seeds whose
    /// first arrival fell exactly `r` rounds after the node's discovery.
    pub fn arrivals(&self, node: usize) -> &[u64] {
        &self.arrivals[node * self.radius..(node + 1) * self.radius]
    }

    /// Returns the mask of seeds settled at a node.
    pub fn reached_mask(&self, node: usize) -> u64 {
        self.reached[node].load(Ordering::Relaxed)
    }
}

/// The multi-source relaxation: pushes the seeds settled at the source into
/// the destination's arrival mask, and claims the destination for the
/// current round at most once across all concurrent relaxations.
struct MaskRelax<'a> {
    reached: &'a [AtomicU64],
    arriving: &'a [AtomicU64],
    claim_round: &'a [AtomicU64],
    first_round: &'a [u64],
    round: u64,
    radius: u64,
}

impl EdgeOp for MaskRelax<'_> {
    fn relax(&self, src: usize, dst: usize, _backwards: bool) -> bool {
        let src_mask = self.reached[src].load(Ordering::Acquire);
        let dst_mask = self.arriving[dst].load(Ordering::Acquire);
        if (src_mask | dst_mask) == dst_mask {
            // Nothing new for the destination; a self-loop always lands here.
            return false;
        }
        self.arriving[dst].fetch_or(src_mask, Ordering::Release);
        let claimed = self.claim_round[dst].load(Ordering::Acquire);
        claimed != self.round
            && self.claim_round[dst]
                .compare_exchange(claimed, self.round, Ordering::Release, Ordering::Relaxed)
                .is_ok()
    }

    fn admits(&self, dst: usize) -> bool {
        let first = self.first_round[dst];
        first == UNREACHED || self.round - first < self.radius
    }
}
