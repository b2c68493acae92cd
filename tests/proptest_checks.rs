//! Property-based checks over random legal game walks.

use chess_engine::eval::evaluate;
use chess_engine::movegen::legal_moves;
use chess_engine::position::Position;
use proptest::prelude::*;
use rand::prelude::*;

fn random_walk(seed: u64, num_moves: usize) -> (Position, Vec<chess_engine::types::Move>) {
    let mut pos = Position::startpos();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut played = Vec::new();
    for _ in 0..num_moves {
        let moves = legal_moves(&pos);
        if moves.iter().next().is_none() {
            break;
        }
        let choices: Vec<_> = moves.iter().map(|(m, _)| *m).collect();
        let mv = *choices.choose(&mut rng).unwrap();
        pos.make_move(mv);
        played.push(mv);
    }
    (pos, played)
}

proptest! {
    /// make_move followed by undo_move restores the zobrist key and FEN
    /// exactly, for any random legal game walk.
    #[test]
    fn prop_make_undo_restores_state(seed in any::<u64>(), num_moves in 1..20usize) {
        let mut pos = Position::startpos();
        let mut rng = StdRng::seed_from_u64(seed);
        let initial_key = pos.zobrist_key();
        let initial_fen = pos.to_fen();

        let mut history = Vec::new();
        for _ in 0..num_moves {
            let moves = legal_moves(&pos);
            let choices: Vec<_> = moves.iter().map(|(m, _)| *m).collect();
            if choices.is_empty() {
                break;
            }
            let mv = *choices.choose(&mut rng).unwrap();
            pos.make_move(mv);
            history.push(mv);
        }

        while let Some(mv) = history.pop() {
            pos.undo_move(mv);
        }

        prop_assert_eq!(pos.zobrist_key(), initial_key);
        prop_assert_eq!(pos.to_fen(), initial_fen);
    }

    /// Every move returned by `legal_moves` leaves the side that just
    /// moved out of check.
    #[test]
    fn prop_legal_moves_never_self_check(seed in any::<u64>()) {
        let (pos, _) = random_walk(seed, 12);
        let mover = pos.side_to_move();
        for (mv, _) in legal_moves(&pos).iter() {
            let mut next = pos.clone();
            next.make_move(*mv);
            prop_assert!(!next.is_check_color(mover), "move {:?} left {:?} in check", mv, mover);
        }
    }

    /// FEN round-trips through any random legal game walk.
    #[test]
    fn prop_fen_roundtrip(seed in any::<u64>(), num_moves in 0..30usize) {
        let (pos, _) = random_walk(seed, num_moves);
        let fen = pos.to_fen();
        let restored = Position::from_fen(&fen).unwrap();
        prop_assert_eq!(pos.zobrist_key(), restored.zobrist_key());
        prop_assert_eq!(pos.to_fen(), restored.to_fen());
        prop_assert_eq!(pos.side_to_move(), restored.side_to_move());
        prop_assert_eq!(pos.castling_rights(), restored.castling_rights());
    }

    /// Static evaluation stays within a material-bound envelope; it
    /// should never blow up to near the mate-score range on a quiet
    /// walk from the startpos.
    #[test]
    fn prop_eval_bounded(seed in any::<u64>(), num_moves in 0..30usize) {
        let (pos, _) = random_walk(seed, num_moves);
        let score = evaluate(&pos);
        prop_assert!(score.abs() < 10_000, "eval {} is unreasonably large", score);
    }
}
