use std::env;

use chess_engine::bench;
use chess_engine::uci;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("bench") => bench::run(),
        Some("perft") => {
            let depth: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(5);
            bench::run_perft(depth);
        }
        _ => uci::run(),
    }
}
