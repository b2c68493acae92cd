//! The UCI front end: reads line-oriented commands from stdin, drives a
//! [`SearchController`], and prints `info`/`bestmove` text to stdout.
//! Generalizes the teacher's `uci.rs::run_uci_loop` (one thread spawned
//! per `go`) into a front end over the persistent-worker
//! `SearchController`: this module's only job is tokenizing/formatting
//! the wire protocol, never search logic itself.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::engine::{compute_time_budget, SearchController, SearchLimits};
use crate::error::UciError;
use crate::options::{self, OptionEffect, UciOptions};
use crate::position::{self, Position};
use crate::tablebase::{NoTablebase, TablebaseOracle};
use crate::tt::TranspositionTable;
use crate::types::Color;
use crate::uci_info::{self, UciEvent};

const ENGINE_NAME: &str = "goldfish-rs";
const ENGINE_AUTHOR: &str = "goldfish-rs contributors";

/// Raw `go` arguments, before they are turned into [`SearchLimits`] (the
/// wtime/btime pair needs the position's side to move to pick the right
/// clock).
#[derive(Default)]
struct GoArgs {
    depth: Option<u32>,
    nodes: Option<u64>,
    movetime: Option<Duration>,
    infinite: bool,
    ponder: bool,
    wtime: Option<Duration>,
    btime: Option<Duration>,
    winc: Duration,
    binc: Duration,
    movestogo: Option<u32>,
}

fn parse_u64_arg(parts: &[&str], i: usize, name: &str) -> Result<u64, UciError> {
    parts
        .get(i + 1)
        .ok_or_else(|| UciError::BadGoArgument(format!("{name} requires a value")))?
        .parse()
        .map_err(|_| UciError::BadGoArgument(format!("{name} value is not a number")))
}

fn parse_go(parts: &[&str]) -> Result<GoArgs, UciError> {
    let mut args = GoArgs::default();
    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                args.depth = Some(parse_u64_arg(parts, i, "depth")? as u32);
                i += 2;
            }
            "nodes" => {
                args.nodes = Some(parse_u64_arg(parts, i, "nodes")?);
                i += 2;
            }
            "movetime" => {
                args.movetime = Some(Duration::from_millis(parse_u64_arg(parts, i, "movetime")?));
                i += 2;
            }
            "wtime" => {
                args.wtime = Some(Duration::from_millis(parse_u64_arg(parts, i, "wtime")?));
                i += 2;
            }
            "btime" => {
                args.btime = Some(Duration::from_millis(parse_u64_arg(parts, i, "btime")?));
                i += 2;
            }
            "winc" => {
                args.winc = Duration::from_millis(parse_u64_arg(parts, i, "winc")?);
                i += 2;
            }
            "binc" => {
                args.binc = Duration::from_millis(parse_u64_arg(parts, i, "binc")?);
                i += 2;
            }
            "movestogo" => {
                args.movestogo = Some(parse_u64_arg(parts, i, "movestogo")? as u32);
                i += 2;
            }
            "infinite" => {
                args.infinite = true;
                i += 1;
            }
            "ponder" => {
                args.ponder = true;
                i += 1;
            }
            "mate" => {
                // Mate search is not a separate search mode here: treated
                // as a depth bound deep enough to find short mates, since
                // this engine has no dedicated mate-search driver.
                args.depth = Some(parse_u64_arg(parts, i, "mate")? as u32 * 2);
                i += 2;
            }
            other => return Err(UciError::BadGoArgument(other.to_string())),
        }
    }
    Ok(args)
}

/// Turns parsed `go` arguments plus the position's side to move into
/// [`SearchLimits`], applying spec.md §4.G's time-budget formula when a
/// clock was given and no fixed depth/nodes/movetime/infinite/ponder
/// request overrides it.
fn build_limits(args: &GoArgs, pos: &Position) -> SearchLimits {
    if let Some(depth) = args.depth {
        return SearchLimits {
            max_depth: Some(depth),
            max_nodes: args.nodes,
            budget: None,
            manage_time: false,
        };
    }
    if let Some(nodes) = args.nodes {
        return SearchLimits {
            max_depth: None,
            max_nodes: Some(nodes),
            budget: None,
            manage_time: false,
        };
    }
    if let Some(movetime) = args.movetime {
        return SearchLimits {
            max_depth: None,
            max_nodes: None,
            budget: Some(movetime),
            manage_time: false,
        };
    }
    if args.infinite || args.ponder {
        return SearchLimits {
            max_depth: None,
            max_nodes: None,
            budget: None,
            manage_time: false,
        };
    }

    let (time_left, inc) = match pos.side_to_move() {
        Color::White => (args.wtime, args.winc),
        Color::Black => (args.btime, args.binc),
    };
    if let Some(time_left) = time_left {
        let moves_to_go = args.movestogo.unwrap_or(30);
        let budget = compute_time_budget(time_left, inc, moves_to_go);
        return SearchLimits {
            max_depth: None,
            max_nodes: None,
            budget: Some(budget),
            manage_time: true,
        };
    }

    // No depth/nodes/movetime/clock given at all: search to a bounded
    // depth rather than spinning forever, so manual testing without a
    // `stop` still terminates.
    SearchLimits {
        max_depth: Some(crate::constants::MAX_PLY as u32),
        max_nodes: None,
        budget: None,
        manage_time: false,
    }
}

/// Applies a `position [startpos|fen <fen>] [moves <m1> <m2> ...]`
/// command. A bad base FEN leaves `position` untouched. An illegal move
/// partway through the `moves` list is a diagnostic, not a hard failure:
/// per spec.md §7, the position is left exactly as it was after the last
/// legal move in the list (i.e. "as it was before the bad move").
fn apply_position(position: &mut Position, parts: &[&str]) -> Result<(), UciError> {
    let mut i = 1;
    let mut next = match parts.get(i) {
        Some(&"startpos") => {
            i += 1;
            Position::startpos()
        }
        Some(&"fen") => {
            i += 1;
            let fen_start = i;
            while i < parts.len() && parts[i] != "moves" {
                i += 1;
            }
            let fen = parts[fen_start..i].join(" ");
            Position::from_fen(&fen)?
        }
        _ => {
            return Err(UciError::BadGoArgument(
                "position requires 'startpos' or 'fen <fen>'".to_string(),
            ))
        }
    };

    if parts.get(i) == Some(&"moves") {
        i += 1;
        while i < parts.len() {
            match position::fen::parse_move(&next, parts[i]) {
                Ok(mv) => next.make_move(mv),
                Err(_) => {
                    *position = next;
                    return Err(UciError::BadGoArgument(format!(
                        "illegal move in position command, stopping at: {}",
                        parts[i]
                    )));
                }
            }
            i += 1;
        }
    }

    *position = next;
    Ok(())
}

/// Reads UCI commands from stdin until `quit` (or end of input) and
/// drives the engine, matching spec.md §6's command table.
pub fn run() {
    let stdin = io::stdin();

    let mut position = Position::startpos();
    let mut options = UciOptions::new();
    let tt = Arc::new(Mutex::new(TranspositionTable::new_mb(options.hash_mb)));
    let mut tablebase: Box<dyn TablebaseOracle> = Box::new(NoTablebase::default());

    let (event_tx, event_rx) = uci_info::channel();
    let searching = Arc::new(AtomicBool::new(false));
    let printer_searching = searching.clone();
    let printer = thread::spawn(move || {
        let stdout = io::stdout();
        while let Ok(event) = event_rx.recv() {
            match event {
                UciEvent::Progress(info) => {
                    let mut lock = stdout.lock();
                    let _ = writeln!(lock, "{}", info.to_uci_line());
                    let _ = lock.flush();
                }
                UciEvent::BestMove { best, ponder } => {
                    let mut line = format!("bestmove {}", best.to_long_algebraic());
                    if let Some(ponder) = ponder {
                        line.push_str(&format!(" ponder {}", ponder.to_long_algebraic()));
                    }
                    let mut lock = stdout.lock();
                    let _ = writeln!(lock, "{line}");
                    let _ = lock.flush();
                    printer_searching.store(false, Ordering::SeqCst);
                }
            }
        }
    });

    let mut controller = SearchController::new(tt.clone(), event_tx);

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else { continue };

        match command {
            "uci" => {
                println!("id name {ENGINE_NAME}");
                println!("id author {ENGINE_AUTHOR}");
                options.print_advertisements();
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "ucinewgame" => {
                if searching.load(Ordering::SeqCst) {
                    controller.stop();
                    searching.store(false, Ordering::SeqCst);
                }
                position = Position::startpos();
                tt.lock().resize(options.hash_mb * 1024 * 1024);
            }
            "position" => {
                if let Err(e) = apply_position(&mut position, &parts) {
                    eprintln!("info string {e}");
                }
            }
            "go" => {
                if searching.load(Ordering::SeqCst) {
                    eprintln!("info string go received while a search is already running; ignored");
                    continue;
                }
                match parse_go(&parts) {
                    Ok(args) => {
                        let limits = build_limits(&args, &position);
                        controller.new_search(position.clone(), limits);
                        controller.start();
                        searching.store(true, Ordering::SeqCst);
                    }
                    Err(e) => eprintln!("info string {e}"),
                }
            }
            "stop" => {
                controller.stop();
                searching.store(false, Ordering::SeqCst);
            }
            "ponderhit" => controller.ponderhit(),
            "setoption" => match options::parse_setoption(&parts) {
                Some((name, value)) => match options.apply(&name, value.as_deref()) {
                    Ok(OptionEffect::ResizeHash(mb)) => {
                        if searching.load(Ordering::SeqCst) {
                            eprintln!("info string Hash change ignored while a search is running");
                        } else {
                            tt.lock().resize(mb * 1024 * 1024);
                        }
                    }
                    Ok(OptionEffect::SyzygyPath(path)) => tablebase.set_path(&path),
                    Ok(OptionEffect::None) => {}
                    Err(e) => eprintln!("info string {e}"),
                },
                None => eprintln!("info string malformed setoption command"),
            },
            "bench" => crate::bench::run(),
            "quit" => {
                if searching.load(Ordering::SeqCst) {
                    controller.stop();
                }
                break;
            }
            _ => {}
        }

        let _ = io::stdout().flush();
    }

    // Runs whether the loop ended via `quit` or stdin simply closing
    // (a GUI killing the pipe without sending `quit`): joins the worker
    // thread, which drops its `Sender<UciEvent>` on its way out and lets
    // the printer thread's `recv()` loop end on its own.
    controller.quit();
    let _ = printer.join();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_go_depth() {
        let parts: Vec<&str> = "go depth 6".split_whitespace().collect();
        let args = parse_go(&parts).unwrap();
        assert_eq!(args.depth, Some(6));
    }

    #[test]
    fn parse_go_clocks() {
        let parts: Vec<&str> = "go wtime 60000 btime 60000 winc 1000 binc 1000 movestogo 20"
            .split_whitespace()
            .collect();
        let args = parse_go(&parts).unwrap();
        assert_eq!(args.wtime, Some(Duration::from_millis(60000)));
        assert_eq!(args.movestogo, Some(20));
    }

    #[test]
    fn parse_go_rejects_unknown_token() {
        let parts: Vec<&str> = "go bogus".split_whitespace().collect();
        assert!(parse_go(&parts).is_err());
    }

    #[test]
    fn build_limits_prefers_depth_over_clock() {
        let args = GoArgs {
            depth: Some(3),
            wtime: Some(Duration::from_secs(60)),
            ..GoArgs::default()
        };
        let limits = build_limits(&args, &Position::startpos());
        assert_eq!(limits.max_depth, Some(3));
        assert!(limits.budget.is_none());
    }

    #[test]
    fn build_limits_from_clock_enables_time_management() {
        let args = GoArgs {
            wtime: Some(Duration::from_secs(60)),
            winc: Duration::from_millis(500),
            ..GoArgs::default()
        };
        let limits = build_limits(&args, &Position::startpos());
        assert!(limits.manage_time);
        assert!(limits.budget.is_some());
    }

    #[test]
    fn apply_position_startpos_then_moves() {
        let mut pos = Position::startpos();
        let parts: Vec<&str> = "position startpos moves e2e4 e7e5".split_whitespace().collect();
        apply_position(&mut pos, &parts).unwrap();
        assert_eq!(pos.side_to_move(), Color::White);
    }

    #[test]
    fn apply_position_stops_at_illegal_move_but_keeps_valid_prefix() {
        let mut pos = Position::startpos();
        let parts: Vec<&str> = "position startpos moves e2e4 e2e4".split_whitespace().collect();
        let err = apply_position(&mut pos, &parts);
        assert!(err.is_err());
        // e2e4 (the first, legal move) was still applied.
        assert_eq!(pos.side_to_move(), Color::Black);
    }

    #[test]
    fn apply_position_bad_fen_leaves_position_untouched() {
        let mut pos = Position::startpos();
        let before = pos.to_fen();
        let parts: Vec<&str> = "position fen not a fen at all".split_whitespace().collect();
        assert!(apply_position(&mut pos, &parts).is_err());
        assert_eq!(pos.to_fen(), before);
    }
}
