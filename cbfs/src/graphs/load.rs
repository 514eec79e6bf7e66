/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Loaders for on-disk graph formats.
//!
//! All loaders validate their input completely before returning: a malformed
//! file never produces a partial graph.

use super::CsrGraph;
use anyhow::{ensure, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// The bytes taken by the three header words of the [binary CSR
/// record](read_binary).
const HEADER_BYTES: u64 = 3 * 8;

/// Reads a graph from a little-endian binary CSR record.
///
/// The record layout is `n: u64, m: u64, sizes: u64, offsets: u64[n + 1],
/// edges: u32[m]`, where `sizes` must be the total byte length of the record;
/// a mismatch, a short read, non-monotone offsets, or an edge endpoint
/// outside `[0, n)` are fatal errors.
pub fn read_binary(path: impl AsRef<Path>) -> Result<CsrGraph> {
    let path = path.as_ref();
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("Cannot open {}", path.display()))?,
    );

    let num_nodes = read_u64(&mut reader).context("Cannot read the number of nodes")?;
    let num_arcs = read_u64(&mut reader).context("Cannot read the number of arcs")?;
    let sizes = read_u64(&mut reader).context("Cannot read the record size")?;
    log::debug!("Header: n = {num_nodes}, m = {num_arcs}, sizes = {sizes}");

    let expected = (u128::from(num_nodes) + 1) * 8 + u128::from(num_arcs) * 4
        + u128::from(HEADER_BYTES);
    ensure!(
        u128::from(sizes) == expected,
        "Size mismatch in {}: the header declares {} bytes but the record layout requires {}",
        path.display(),
        sizes,
        expected
    );

    let num_nodes = usize::try_from(num_nodes).context("Too many nodes for this platform")?;
    let num_arcs = usize::try_from(num_arcs).context("Too many arcs for this platform")?;

    let offsets = read_u64_vec(&mut reader, num_nodes + 1).context("Cannot read the offsets")?;
    ensure!(
        offsets[0] == 0 && *offsets.last().unwrap() == num_arcs as u64,
        "The offsets of {} do not delimit {} arcs",
        path.display(),
        num_arcs
    );
    ensure!(
        offsets.windows(2).all(|pair| pair[0] <= pair[1]),
        "The offsets of {} are not monotone",
        path.display()
    );

    let edges = read_u32_vec(&mut reader, num_arcs).context("Cannot read the edges")?;
    ensure!(
        edges.iter().all(|&dst| (dst as usize) < num_nodes),
        "{} contains an edge endpoint outside [0, {})",
        path.display(),
        num_nodes
    );

    let dcf = offsets.into_iter().map(|offset| offset as usize).collect();
    let successors = edges.into_iter().map(|dst| dst as usize).collect();
    Ok(unsafe { CsrGraph::from_parts(dcf, successors) })
}

/// Reads a graph from a degree-prefixed little-endian binary record.
///
/// The record layout is `n: u64, m: u64, degree: u64[n], edges: u64[m]`;
/// offsets are rebuilt by a prefix sum over the degrees, which must add up
/// to `m`.
pub fn read_degree_binary(path: impl AsRef<Path>) -> Result<CsrGraph> {
    let path = path.as_ref();
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("Cannot open {}", path.display()))?,
    );

    let num_nodes = read_u64(&mut reader).context("Cannot read the number of nodes")?;
    let num_arcs = read_u64(&mut reader).context("Cannot read the number of arcs")?;
    let num_nodes = usize::try_from(num_nodes).context("Too many nodes for this platform")?;
    let num_arcs = usize::try_from(num_arcs).context("Too many arcs for this platform")?;

    let degrees = read_u64_vec(&mut reader, num_nodes).context("Cannot read the degrees")?;
    let mut dcf = Vec::with_capacity(num_nodes + 1);
    let mut total = 0_usize;
    dcf.push(0);
    for &degree in &degrees {
        total += usize::try_from(degree).context("Degree overflow")?;
        dcf.push(total);
    }
    ensure!(
        total == num_arcs,
        "The degrees of {} add up to {} arcs, the header declares {}",
        path.display(),
        total,
        num_arcs
    );

    let edges = read_u64_vec(&mut reader, num_arcs).context("Cannot read the edges")?;
    ensure!(
        edges.iter().all(|&dst| (dst as usize) < num_nodes),
        "{} contains an edge endpoint outside [0, {})",
        path.display(),
        num_nodes
    );

    let successors = edges.into_iter().map(|dst| dst as usize).collect();
    Ok(unsafe { CsrGraph::from_parts(dcf, successors) })
}

/// Reads a graph from a whitespace-separated adjacency-list text file.
///
/// The first token of each line is a source node, the remaining tokens are
/// its successors; blank lines are ignored and sources may be listed out of
/// order or skipped entirely (skipped nodes get an empty adjacency).
pub fn read_adjacency(path: impl AsRef<Path>) -> Result<CsrGraph> {
    let path = path.as_ref();
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("Cannot open {}", path.display()))?,
    );

    let mut adjacency: Vec<Vec<usize>> = Vec::new();
    let mut max_target = 0;
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Cannot read line {}", line_number + 1))?;
        let mut tokens = line.split_whitespace();
        let Some(src) = tokens.next() else {
            continue;
        };
        let src = src
            .parse::<usize>()
            .with_context(|| format!("Invalid source on line {}", line_number + 1))?;
        if adjacency.len() <= src {
            adjacency.resize_with(src + 1, Vec::new);
        }
        for token in tokens {
            let dst = token
                .parse::<usize>()
                .with_context(|| format!("Invalid successor on line {}", line_number + 1))?;
            max_target = max_target.max(dst + 1);
            adjacency[src].push(dst);
        }
    }
    if adjacency.len() < max_target {
        adjacency.resize_with(max_target, Vec::new);
    }
    Ok(CsrGraph::from_adjacency(&adjacency))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0_u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_u64_vec<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u64>> {
    let mut buf = vec![0_u8; len * 8];
    reader.read_exact(&mut buf).context("Short read")?;
    Ok(buf
        .chunks_exact(8)
        .map(|chunk| u64::from_le_bytes(chunk.try_into().unwrap()))
        .collect())
}

fn read_u32_vec<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u32>> {
    let mut buf = vec![0_u8; len * 4];
    reader.read_exact(&mut buf).context("Short read")?;
    Ok(buf
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
        .collect())
}
