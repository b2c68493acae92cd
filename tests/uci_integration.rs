use std::io::Write;
use std::process::{Command, Stdio};

use chess_engine::movegen::legal_moves;
use chess_engine::position::fen::parse_move;
use chess_engine::position::Position;

#[test]
fn uci_smoke_test_returns_legal_move() {
    let exe = env!("CARGO_BIN_EXE_chess_engine");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn engine binary");

    let input = b"uci\nisready\nposition startpos moves e2e4\ngo movetime 50\nquit\n";
    child.stdin.as_mut().unwrap().write_all(input).unwrap();

    let output = child.wait_with_output().expect("failed to read output");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("uciok"));
    assert!(stdout.contains("readyok"));

    let bestmove_line = stdout
        .lines()
        .filter(|line| line.starts_with("bestmove"))
        .last()
        .expect("no bestmove found");
    let parts: Vec<&str> = bestmove_line.split_whitespace().collect();
    assert!(parts.len() >= 2, "bestmove missing move: {bestmove_line}");
    let mv_text = parts[1];
    assert_ne!(mv_text, "0000", "engine returned null move");

    let mut pos = Position::startpos();
    let e2e4 = parse_move(&pos, "e2e4").unwrap();
    pos.make_move(e2e4);

    let mv = parse_move(&pos, mv_text).expect("bestmove should parse as a move in this position");
    assert!(
        legal_moves(&pos).iter().any(|(m, _)| *m == mv),
        "bestmove not legal in position: {mv_text}"
    );
}

#[test]
fn uci_reports_correct_perft_via_bench_subcommand() {
    let exe = env!("CARGO_BIN_EXE_chess_engine");
    let output = Command::new(exe)
        .arg("perft")
        .arg("4")
        .output()
        .expect("failed to run perft subcommand");
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(
        combined.contains("197281"),
        "expected perft(4) node count 197281 in output, got: {combined}"
    );
}
