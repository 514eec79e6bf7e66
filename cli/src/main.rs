/*
 * SPDX-FileCopyrightText: 2025 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{ensure, Result};
use clap::Parser;
use cluster_bfs::prelude::*;
use cluster_bfs::thread_pool;
use dsi_progress_logger::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "cbfs",
    about = "Runs bit-parallel approximate multi-source breadth-first searches.",
    long_about = None,
    version
)]
struct Args {
    /// The binary CSR graph to load.
    #[arg(short, long)]
    file: PathBuf,

    /// Number of timed iterations over all batches.
    #[arg(short = 't', long, default_value_t = 1)]
    repeats: usize,

    /// Number of seed batches.
    #[arg(long = "ns", default_value_t = 1)]
    num_batches: usize,

    /// Seeds per batch (at most 64).
    #[arg(short = 'k', long, default_value_t = 8)]
    batch_size: usize,

    /// Relative rounds recorded per node.
    #[arg(short, long, default_value_t = 4)]
    radius: usize,

    /// Seed-selection strategy: how many hops around each centre to draw
    /// seeds from.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    hops: u8,

    /// Verify every batch against a per-seed reference search.
    #[arg(short, long)]
    verify: bool,

    /// Run the naive sequential multi-source search instead of the
    /// bit-parallel engine.
    #[arg(long)]
    seq: bool,

    /// Number of worker threads; defaults to one per logical CPU.
    #[arg(short = 'c', long)]
    threads: Option<usize>,

    /// Seed of the pseudorandom permutation behind batch selection.
    #[arg(long, default_value_t = 0)]
    random_seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init()?;
    let args = Args::parse();
    ensure!(args.radius >= 1, "The radius must be at least 1");
    ensure!(
        (1..=MAX_SEEDS).contains(&args.batch_size),
        "The batch size must be in [1, {}]",
        MAX_SEEDS
    );

    let graph = load::read_binary(&args.file)?;
    log::info!(
        "Loaded {} nodes and {} arcs from {}",
        graph.num_nodes(),
        graph.num_arcs(),
        args.file.display()
    );
    let start = Instant::now();
    let transpose = graph.transposed();
    log::info!(
        "Built the transpose in {:.3} s",
        start.elapsed().as_secs_f64()
    );

    let batches = match args.hops {
        1 => one_hop_star(&graph, args.num_batches, args.batch_size, args.random_seed),
        2 => two_hop_star(&graph, args.num_batches, args.batch_size, args.random_seed),
        3 => three_hop_star(&graph, args.num_batches, args.batch_size, args.random_seed),
        _ => unreachable!(),
    };
    ensure!(
        !batches.is_empty(),
        "No node has enough neighbours to centre a batch of {} seeds",
        args.batch_size
    );
    if batches.len() < args.num_batches {
        log::warn!(
            "Only {} of the requested {} batches could be selected",
            batches.len(),
            args.num_batches
        );
    }

    let thread_pool = match args.threads {
        Some(threads) => thread_pool![threads],
        None => thread_pool![],
    };
    log::info!("Using {} threads", thread_pool.current_num_threads());

    if args.seq {
        run_sequential(&graph, &batches, args.repeats)
    } else {
        run_engine(&graph, &transpose, &batches, &args, &thread_pool)
    }
}

fn run_engine(
    graph: &CsrGraph,
    transpose: &CsrGraph,
    batches: &[Vec<usize>],
    args: &Args,
    thread_pool: &rayon::ThreadPool,
) -> Result<()> {
    let mut bfs = ClusterBfs::new(graph, transpose, args.radius)?;
    for repeat in 0..args.repeats {
        let mut pl = ProgressLogger::default();
        pl.item_name("batch").expected_updates(Some(batches.len()));
        pl.start(format!("Iteration {}...", repeat));
        let start = Instant::now();
        for batch in batches {
            let seeds = bfs.init(batch, thread_pool)?;
            bfs.run(&seeds, thread_pool);
            if args.verify {
                bfs.verify(&seeds)?;
            }
            pl.update();
        }
        pl.done();
        log::info!(
            "Iteration {}: {} batches in {:.3} s",
            repeat,
            batches.len(),
            start.elapsed().as_secs_f64()
        );
    }
    if args.verify {
        log::info!("All batches verified against the reference search");
    }
    Ok(())
}

fn run_sequential(graph: &CsrGraph, batches: &[Vec<usize>], repeats: usize) -> Result<()> {
    for repeat in 0..repeats {
        let start = Instant::now();
        for batch in batches {
            let seeds = effective_seeds(batch);
            let (first_rounds, _) = seq::multi_source_bfs(graph, seeds);
            let settled = first_rounds
                .iter()
                .filter(|&&round| round != UNREACHED)
                .count();
            log::info!(
                "Sequential search from {} seeds settled {} nodes",
                seeds.len(),
                settled
            );
        }
        log::info!(
            "Iteration {}: {} batches in {:.3} s",
            repeat,
            batches.len(),
            start.elapsed().as_secs_f64()
        );
    }
    Ok(())
}
