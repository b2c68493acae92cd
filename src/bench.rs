//! `bench` and `perft` CLI sub-commands. Both are out-of-scope
//! collaborators per spec.md §1 (standalone diagnostics, not part of the
//! engine core's eight components) and are implemented here as thin
//! drivers over it, grounded on the teacher's `perft.rs` perft driver
//! and spec.md §8's literal `bench` end-to-end scenario.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::movegen;
use crate::position::Position;
use crate::search::SearchWorker;
use crate::sync::Handshake;
use crate::tt::TranspositionTable;

const BENCH_DEPTH: u32 = 8;
const BENCH_HASH_MB: usize = 16;

/// Fixed positions the `bench` driver searches, chosen to exercise quiet
/// middlegames, open tactics and castling rights together: the standard
/// starting position, kiwipete (castling + en passant heavy), a king-
/// and-pawn endgame, a trivial mate-in-one position, and a developed Ruy
/// Lopez-style middlegame.
const BENCH_POSITIONS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2k1p3/3pP3/3P2K1/8/8/8/8 w - - 0 1",
    "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1",
    "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
];

/// Runs a fixed search workload and reports the total node count and
/// nodes-per-second on stderr, then exits cleanly (spec.md §8: `bench`
/// "emits a total node count and a nodes-per-second summary on stderr").
pub fn run() {
    let start = Instant::now();
    let mut total_nodes = 0u64;

    for fen in BENCH_POSITIONS {
        let pos = match Position::from_fen(fen) {
            Ok(pos) => pos,
            Err(e) => {
                eprintln!("bench: skipping malformed fixture {fen:?}: {e}");
                continue;
            }
        };

        let tt = Arc::new(Mutex::new(TranspositionTable::new_mb(BENCH_HASH_MB)));
        let handshake = Handshake::new();
        let mut worker = SearchWorker::new(pos, tt, handshake, None);
        let outcome = worker.iterative_deepening(BENCH_DEPTH, |_report| {});
        total_nodes += outcome.nodes;
    }

    let elapsed = start.elapsed();
    let nps = if elapsed.as_secs_f64() > 0.0 {
        (total_nodes as f64 / elapsed.as_secs_f64()) as u64
    } else {
        0
    };
    eprintln!("{total_nodes} nodes {nps} nps");
}

/// Runs perft from the standard starting position to `depth` and prints
/// the node count and elapsed time.
pub fn run_perft(depth: usize) {
    let mut pos = Position::startpos();
    let start = Instant::now();
    let nodes = movegen::perft(&mut pos, depth as u32);
    let elapsed = start.elapsed();
    println!("{nodes} nodes in {elapsed:?}");
}
