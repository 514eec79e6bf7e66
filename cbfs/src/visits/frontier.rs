/*
 * SPDX-FileCopyrightText: 2024 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::atomic::Ordering;
use sux::prelude::*;

/// Nodes per parallel task when sweeping a frontier.
const GRANULARITY: usize = 128;

/// An unordered set of nodes with two physical forms: a sparse list of node
/// identifiers, or a dense bitmap over all nodes.
///
/// Exactly one form is materialised at any moment; conversions are performed
/// by the [`EdgeMap`](super::EdgeMap) when its cost model calls for them,
/// never implicitly.
///
/// Callers must not insert a node twice: the size bookkeeping of
/// [`add`](Self::add) and the one-invocation-per-member contract of
/// [`for_each`](Self::for_each) both rely on it.
pub enum VertexSubset {
    /// A list of node identifiers.
    Sparse(Vec<usize>),
    /// A bitmap over all nodes, with its number of set bits.
    Dense {
        /// Membership bits, indexed by node.
        bits: AtomicBitVec,
        /// The number of bits set.
        ones: usize,
    },
}

impl core::default::Default for VertexSubset {
    fn default() -> Self {
        Self::Sparse(vec![])
    }
}

impl VertexSubset {
    /// Creates an empty sparse subset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sparse subset from a list of nodes.
    pub fn from_vertices(vertices: Vec<usize>) -> Self {
        Self::Sparse(vertices)
    }

    /// Creates a sparse subset holding a single node.
    pub fn singleton(vertex: usize) -> Self {
        Self::Sparse(vec![vertex])
    }

    /// Creates a dense subset from a bitmap, counting its set bits.
    pub fn from_bits(bits: AtomicBitVec) -> Self {
        let ones = (0..bits.len())
            .filter(|&node| bits.get(node, Ordering::Relaxed))
            .count();
        Self::Dense { bits, ones }
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        match self {
            Self::Sparse(members) => members.len(),
            Self::Dense { ones, .. } => *ones,
        }
    }

    /// Returns true if the subset has no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds nodes to the subset, which must not already contain them.
    pub fn add(&mut self, vertices: &[usize]) {
        match self {
            Self::Sparse(members) => members.extend_from_slice(vertices),
            Self::Dense { bits, ones } => {
                for &vertex in vertices {
                    bits.set(vertex, true, Ordering::Relaxed);
                }
                *ones += vertices.len();
            }
        }
    }

    /// Returns the members as a list, in unspecified order.
    pub fn to_vec(&self, thread_pool: &ThreadPool) -> Vec<usize> {
        match self {
            Self::Sparse(members) => members.clone(),
            Self::Dense { bits, .. } => thread_pool.install(|| {
                (0..bits.len())
                    .into_par_iter()
                    .filter(|&node| bits.get(node, Ordering::Relaxed))
                    .collect()
            }),
        }
    }

    /// Invokes `f` once per member.
    ///
    /// Members are visited concurrently, so `f` must be safe for concurrent
    /// invocation across distinct members; each member is passed to exactly
    /// one invocation.
    pub fn for_each<F: Fn(usize) + Sync>(&self, thread_pool: &ThreadPool, f: F) {
        match self {
            Self::Sparse(members) => thread_pool.install(|| {
                members
                    .par_iter()
                    .with_min_len(GRANULARITY)
                    .for_each(|&vertex| f(vertex))
            }),
            Self::Dense { bits, .. } => thread_pool.install(|| {
                (0..bits.len())
                    .into_par_iter()
                    .with_min_len(GRANULARITY)
                    .for_each(|node| {
                        if bits.get(node, Ordering::Relaxed) {
                            f(node)
                        }
                    })
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_sparse() {
        let thread_pool = crate::thread_pool![2];
        let mut subset = VertexSubset::new();
        assert!(subset.is_empty());
        subset.add(&[3, 1, 4]);
        assert_eq!(subset.len(), 3);
        let mut members = subset.to_vec(&thread_pool);
        members.sort();
        assert_eq!(members, [1, 3, 4]);
    }

    #[test]
    fn test_dense() {
        let thread_pool = crate::thread_pool![2];
        let bits = AtomicBitVec::new(10);
        bits.set(2, true, Ordering::Relaxed);
        bits.set(7, true, Ordering::Relaxed);
        let mut subset = VertexSubset::from_bits(bits);
        assert_eq!(subset.len(), 2);
        subset.add(&[5]);
        assert_eq!(subset.len(), 3);
        let mut members = subset.to_vec(&thread_pool);
        members.sort();
        assert_eq!(members, [2, 5, 7]);
    }

    #[test]
    fn test_for_each_visits_each_member_once() {
        let thread_pool = crate::thread_pool![2];
        let subset = VertexSubset::from_vertices((0..1000).collect());
        let visits: Vec<AtomicUsize> = (0..1000).map(|_| AtomicUsize::new(0)).collect();
        subset.for_each(&thread_pool, |vertex| {
            visits[vertex].fetch_add(1, Ordering::Relaxed);
        });
        assert!(visits
            .iter()
            .all(|count| count.load(Ordering::Relaxed) == 1));
    }
}
