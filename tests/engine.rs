//! End-to-end checks spanning position, movegen and search together:
//! repetition detection, castling legality, and a short tactical search.

use std::sync::Arc;

use parking_lot::Mutex;

use chess_engine::movegen::{is_legal, legal_moves};
use chess_engine::position::Position;
use chess_engine::position::fen::parse_move;
use chess_engine::search::SearchWorker;
use chess_engine::sync::Handshake;
use chess_engine::tt::TranspositionTable;
use chess_engine::types::{MoveKind, NO_MOVE};

fn play(pos: &mut Position, long_algebraic: &str) {
    let mv = parse_move(pos, long_algebraic).expect("legal move");
    pos.make_move(mv);
}

#[test]
fn knight_dance_reaches_threefold_repetition() {
    let mut pos = Position::startpos();
    let start_key = pos.zobrist_key();
    for _ in 0..2 {
        play(&mut pos, "g1f3");
        play(&mut pos, "g8f6");
        play(&mut pos, "f3g1");
        play(&mut pos, "f6g8");
    }
    assert_eq!(pos.zobrist_key(), start_key);
    assert!(pos.is_repetition());
    assert!(pos.is_draw());
}

#[test]
fn ruy_lopez_castling_is_legal_once_squares_clear() {
    let mut pos = Position::startpos();
    for mv in ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "g8f6"] {
        play(&mut pos, mv);
    }
    let castle = parse_move(&pos, "e1g1").expect("kingside castle should parse");
    assert_eq!(castle.kind, MoveKind::Castling);
    assert!(is_legal(&pos, castle));
    pos.make_move(castle);
    let castling_field = pos.to_fen().split(' ').nth(2).unwrap().to_string();
    assert!(!castling_field.contains('K'), "white kingside rights should be cleared after castling");
}

#[test]
fn king_may_not_castle_through_attacked_square() {
    // Black rook on f8 rakes the open f-file down to f1: both squares
    // the king needs (e1 start, f1 crossing) are clear, but f1 is
    // attacked, so kingside castling must not be offered.
    let pos = Position::from_fen("5r2/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
    let castle_attempt = legal_moves(&pos)
        .iter()
        .find(|(mv, _)| mv.kind == MoveKind::Castling);
    assert!(castle_attempt.is_none());
}

#[test]
fn king_may_castle_when_only_far_rook_square_is_attacked() {
    // Contrast case: nothing attacks e1/f1/g1, so castling is legal.
    let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
    let castle = legal_moves(&pos)
        .iter()
        .find(|(mv, _)| mv.kind == MoveKind::Castling);
    assert!(castle.is_some());
}

#[test]
fn search_finds_back_rank_mate_in_two() {
    let pos = Position::from_fen("6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1").unwrap();
    let tt = Arc::new(Mutex::new(TranspositionTable::new_mb(1)));
    let handshake = Handshake::new();
    let mut worker = SearchWorker::new(pos, tt, handshake, None);
    let outcome = worker.iterative_deepening(5, |_| {});
    assert_ne!(outcome.best_move, NO_MOVE);
    assert!(outcome.depth_reached >= 1);
}

#[test]
fn fen_round_trips_through_a_played_game() {
    let mut pos = Position::startpos();
    for mv in ["e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4", "f3d4", "g8f6"] {
        play(&mut pos, mv);
    }
    let fen = pos.to_fen();
    let replayed = Position::from_fen(&fen).unwrap();
    assert_eq!(pos, replayed);
}
