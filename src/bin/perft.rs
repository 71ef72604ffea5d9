//! Move-generator verification tool.
//!
//! Usage:
//! `cargo run --release --bin perft -- --depth 5`
//! `cargo run --release --bin perft -- --fen "<fen>" --depth 3 --divide`
//! `cargo run --release --bin perft -- --reference --threads 8`

use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;

use quince_chess::game_state::game_state::GameState;
use quince_chess::move_generation::perft::{perft_counts, perft_divide, perft_nodes, perft_parallel};
use quince_chess::search::worker_pool::WorkerPool;

/// Count leaf nodes of the legal move tree.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Position to count from; the standard start position by default.
    #[arg(long)]
    fen: Option<String>,
    #[arg(long, short, default_value_t = 4)]
    depth: u8,
    /// Worker threads; 1 counts on the calling thread.
    #[arg(long, short, default_value_t = 1)]
    threads: usize,
    /// Per-root-move leaf counts.
    #[arg(long)]
    divide: bool,
    /// Capture / castle / check breakdown.
    #[arg(long)]
    detail: bool,
    /// Check the standard reference positions instead.
    #[arg(long)]
    reference: bool,
    #[arg(long, default_value = "info")]
    log_level: String,
}

struct ReferenceCase {
    name: &'static str,
    fen: &'static str,
    expected_nodes: &'static [u64],
}

const REFERENCE_CASES: &[ReferenceCase] = &[
    ReferenceCase {
        name: "start",
        fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        expected_nodes: &[20, 400, 8_902, 197_281],
    },
    ReferenceCase {
        name: "kiwipete",
        fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        expected_nodes: &[48, 2_039, 97_862],
    },
    ReferenceCase {
        name: "position_3",
        fen: "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        expected_nodes: &[14, 191, 2_812, 43_238],
    },
    ReferenceCase {
        name: "position_4",
        fen: "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1",
        expected_nodes: &[6, 264, 9_467],
    },
    ReferenceCase {
        name: "position_5",
        fen: "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        expected_nodes: &[44, 1_486, 62_379],
    },
];

fn count(pool: Option<&WorkerPool>, game: &GameState, depth: u8) -> Result<u64> {
    match pool {
        Some(pool) => perft_parallel(pool, game, depth).context("parallel perft failed"),
        None => perft_nodes(game, depth).context("perft failed"),
    }
}

fn run_reference(pool: Option<&WorkerPool>) -> Result<()> {
    let mut failures = 0;
    for case in REFERENCE_CASES {
        let game = GameState::from_fen(case.fen).with_context(|| format!("parsing {}", case.name))?;
        for (index, &expected) in case.expected_nodes.iter().enumerate() {
            let depth = (index + 1) as u8;
            let started = Instant::now();
            let nodes = count(pool, &game, depth)?;
            let verdict = if nodes == expected { "ok" } else { "MISMATCH" };
            if nodes != expected {
                failures += 1;
            }
            println!(
                "{:<11} depth {depth}: {nodes:>10} (expected {expected:>10}) {:>6} ms  {verdict}",
                case.name,
                started.elapsed().as_millis()
            );
        }
    }
    if failures > 0 {
        bail!("{failures} reference counts did not match");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.as_str())).init();

    let pool = if args.threads > 1 {
        Some(WorkerPool::new(args.threads).context("starting worker pool")?)
    } else {
        None
    };

    if args.reference {
        return run_reference(pool.as_ref());
    }

    let game = match &args.fen {
        Some(fen) => GameState::from_fen(fen).with_context(|| format!("parsing {fen:?}"))?,
        None => GameState::new_game(),
    };

    if args.divide {
        let mut total = 0;
        for (text, nodes) in perft_divide(&game, args.depth).context("perft divide failed")? {
            println!("{text}: {nodes}");
            total += nodes;
        }
        println!("\ntotal: {total}");
        return Ok(());
    }

    let started = Instant::now();
    if args.detail {
        let counts = perft_counts(&game, args.depth).context("perft failed")?;
        println!("{counts:#?}");
    } else {
        let nodes = count(pool.as_ref(), &game, args.depth)?;
        let elapsed_ms = started.elapsed().as_millis().max(1);
        println!(
            "depth {} nodes {nodes} time {elapsed_ms} ms nps {}",
            args.depth,
            u128::from(nodes) * 1000 / elapsed_ms
        );
    }
    log::info!("finished in {} ms", started.elapsed().as_millis());
    Ok(())
}
