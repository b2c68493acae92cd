//! Position: board state, zobrist hashing, make/undo (castling, en
//! passant, promotion, null move), attack detection and draw detection.

mod state;

pub mod fen;

use crate::constants::MAX_PLY;
use crate::types::{
    self, Bitboard, CastlingRights, Color, Move, MoveKind, PieceType, Square, BISHOP_DIRECTIONS,
    BLACK_KINGSIDE, BLACK_QUEENSIDE, KNIGHT_DIRECTIONS, NO_SQUARE, QUEEN_DIRECTIONS,
    ROOK_DIRECTIONS, WHITE_KINGSIDE, WHITE_QUEENSIDE,
};
use crate::zobrist;

pub use fen::ParseError;

use state::State;

/// Mailbox + bitboard + incremental-hash position, cloned by value when
/// handed to the search worker so the controller thread can keep accepting
/// commands while a search runs.
#[derive(Clone)]
pub struct Position {
    mailbox: [Option<(Color, PieceType)>; 64],
    pieces: [[Bitboard; 6]; 2],
    occ: [Bitboard; 2],
    material: [i32; 2],
    castling: CastlingRights,
    ep_square: Square,
    side_to_move: Color,
    halfmove_clock: u32,
    fullmove_number: u32,
    zobrist: u64,
    history: Vec<State>,
}

impl Position {
    #[must_use]
    pub fn startpos() -> Position {
        fen::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("startpos FEN is valid")
    }

    #[must_use]
    pub fn from_fen(text: &str) -> Result<Position, ParseError> {
        fen::from_fen(text)
    }

    #[must_use]
    pub fn to_fen(&self) -> String {
        fen::to_fen(self)
    }

    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[must_use]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    #[must_use]
    pub fn en_passant_square(&self) -> Square {
        self.ep_square
    }

    #[must_use]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[must_use]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    #[must_use]
    pub fn zobrist_key(&self) -> u64 {
        self.zobrist
    }

    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, PieceType)> {
        self.mailbox[sq.as_usize()]
    }

    #[must_use]
    pub fn pieces(&self, color: Color, kind: PieceType) -> Bitboard {
        self.pieces[color.index()][kind.index()]
    }

    #[must_use]
    pub fn occupancy(&self, color: Color) -> Bitboard {
        self.occ[color.index()]
    }

    #[must_use]
    pub fn occupied(&self) -> Bitboard {
        Bitboard(self.occ[0].0 | self.occ[1].0)
    }

    #[must_use]
    pub fn material(&self, color: Color) -> i32 {
        self.material[color.index()]
    }

    #[must_use]
    pub fn king_square(&self, color: Color) -> Square {
        self.pieces[color.index()][PieceType::King.index()]
            .lsb()
            .expect("exactly one king per color")
    }

    fn empty() -> Position {
        Position {
            mailbox: [None; 64],
            pieces: [[Bitboard::EMPTY; 6]; 2],
            occ: [Bitboard::EMPTY; 2],
            material: [0; 2],
            castling: CastlingRights::NONE,
            ep_square: NO_SQUARE,
            side_to_move: Color::White,
            halfmove_clock: 0,
            fullmove_number: 1,
            zobrist: 0,
            history: Vec::with_capacity(MAX_PLY + 16),
        }
    }

    fn place(&mut self, sq: Square, color: Color, kind: PieceType) {
        debug_assert!(self.mailbox[sq.as_usize()].is_none());
        self.mailbox[sq.as_usize()] = Some((color, kind));
        self.pieces[color.index()][kind.index()].set(sq);
        self.occ[color.index()].set(sq);
        self.material[color.index()] += crate::types::piece::material_value(kind);
    }

    fn remove(&mut self, sq: Square) -> (Color, PieceType) {
        let (color, kind) = self.mailbox[sq.as_usize()].take().expect("square occupied");
        self.pieces[color.index()][kind.index()].clear(sq);
        self.occ[color.index()].clear(sq);
        self.material[color.index()] -= crate::types::piece::material_value(kind);
        (color, kind)
    }

    fn recompute_zobrist(&self) -> u64 {
        let mut hash = 0u64;
        for sq_idx in 0..64u8 {
            if let Some((color, kind)) = self.mailbox[sq_idx as usize] {
                hash ^= zobrist::piece_key(color, kind, Square(sq_idx));
            }
        }
        if self.side_to_move == Color::Black {
            hash ^= zobrist::side_to_move_key();
        }
        hash ^= zobrist::castling_key(self.castling.0);
        if self.ep_square.is_valid() {
            hash ^= zobrist::en_passant_key(types::file_of(self.ep_square));
        }
        hash
    }

    // ---- attack detection -------------------------------------------------

    /// True if the king of `color` (default: side to move when called via
    /// `is_check`) is attacked by the opponent.
    #[must_use]
    pub fn is_check_color(&self, color: Color) -> bool {
        self.is_attacked(self.king_square(color), color.opponent())
    }

    #[must_use]
    pub fn is_check(&self) -> bool {
        self.is_check_color(self.side_to_move)
    }

    /// True if `sq` is attacked by any piece of `by_color`, walking each
    /// enemy piece type's movement rules from `sq` outward (pawn attacks
    /// only ever consider the two diagonal squares, never pushes).
    #[must_use]
    pub fn is_attacked(&self, sq: Square, by_color: Color) -> bool {
        let occ = self.occupied();

        // Pawns: a pawn of `by_color` attacks `sq` iff it sits on one of the
        // two squares diagonally behind `sq` from that color's perspective.
        let pawn_dr: i8 = if by_color == Color::White { -1 } else { 1 };
        for df in [-1i8, 1i8] {
            if let Some(from) = types::try_step(sq, df, pawn_dr) {
                if self.pieces(by_color, PieceType::Pawn).contains(from) {
                    return true;
                }
            }
        }

        for (df, dr) in KNIGHT_DIRECTIONS {
            if let Some(from) = types::try_step(sq, df, dr) {
                if self.pieces(by_color, PieceType::Knight).contains(from) {
                    return true;
                }
            }
        }

        for dir in QUEEN_DIRECTIONS {
            if let Some(from) = types::try_step(sq, dir.df, dir.dr) {
                if self.pieces(by_color, PieceType::King).contains(from) {
                    return true;
                }
            }
        }

        for dir in ROOK_DIRECTIONS {
            if self.slider_attacks_from(sq, dir, occ, by_color, &[PieceType::Rook, PieceType::Queen]) {
                return true;
            }
        }
        for dir in BISHOP_DIRECTIONS {
            if self.slider_attacks_from(sq, dir, occ, by_color, &[PieceType::Bishop, PieceType::Queen]) {
                return true;
            }
        }

        false
    }

    fn slider_attacks_from(
        &self,
        sq: Square,
        dir: types::Direction,
        occ: Bitboard,
        by_color: Color,
        kinds: &[PieceType],
    ) -> bool {
        let mut cur = sq;
        loop {
            match types::try_step(cur, dir.df, dir.dr) {
                Some(next) => {
                    cur = next;
                    if let Some((color, kind)) = self.mailbox[cur.as_usize()] {
                        return color == by_color && kinds.contains(&kind);
                    }
                    if occ.contains(cur) {
                        return false;
                    }
                }
                None => return false,
            }
        }
    }

    // ---- draw detection ----------------------------------------------------

    /// Scans the state stack backwards for an earlier position with the
    /// same zobrist key, walking back at most `halfmove_clock` plies (a
    /// capture or pawn move resets the clock, so it bounds repetition
    /// lookback for free).
    #[must_use]
    pub fn is_repetition(&self) -> bool {
        let limit = self.halfmove_clock as usize;
        let len = self.history.len();
        let mut i = len;
        let mut step = 0;
        while step < limit && i > 0 {
            i -= 1;
            step += 1;
            if self.history[i].zobrist == self.zobrist {
                return true;
            }
        }
        false
    }

    #[must_use]
    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// K vs K, K+(B|N) vs K, K+B vs K+B are treated as draws regardless of
    /// bishop square colors, per spec.md's deliberate approximation.
    #[must_use]
    pub fn has_insufficient_material(&self) -> bool {
        let minor_count = |color: Color| {
            self.pieces(color, PieceType::Knight).count_ones()
                + self.pieces(color, PieceType::Bishop).count_ones()
        };
        let has_major_or_pawn = |color: Color| {
            !self.pieces(color, PieceType::Pawn).is_empty()
                || !self.pieces(color, PieceType::Rook).is_empty()
                || !self.pieces(color, PieceType::Queen).is_empty()
        };
        if has_major_or_pawn(Color::White) || has_major_or_pawn(Color::Black) {
            return false;
        }
        let white_minors = minor_count(Color::White);
        let black_minors = minor_count(Color::Black);
        match (white_minors, black_minors) {
            (0, 0) => true,
            (1, 0) | (0, 1) => true,
            (1, 1) => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_draw(&self) -> bool {
        self.is_fifty_move_draw() || self.has_insufficient_material() || self.is_repetition()
    }

    // ---- castling rights maintenance ---------------------------------------

    fn update_castling_rights_on_touch(&mut self, sq: Square) {
        match sq.0 {
            0 => self.castling.remove(WHITE_QUEENSIDE),
            7 => self.castling.remove(WHITE_KINGSIDE),
            56 => self.castling.remove(BLACK_QUEENSIDE),
            63 => self.castling.remove(BLACK_KINGSIDE),
            4 => self.castling.clear_color(Color::White),
            60 => self.castling.clear_color(Color::Black),
            _ => {}
        }
    }

    fn castling_rook_squares(color: Color, kingside: bool) -> (Square, Square) {
        match (color, kingside) {
            (Color::White, true) => (Square(7), Square(5)),
            (Color::White, false) => (Square(0), Square(3)),
            (Color::Black, true) => (Square(63), Square(61)),
            (Color::Black, false) => (Square(56), Square(59)),
        }
    }

    // ---- make / undo --------------------------------------------------------

    /// Applies `m`, which must have been produced by the move generator for
    /// this position. Pushes a `State` record so `undo_move` can restore
    /// the position bit-for-bit.
    pub fn make_move(&mut self, m: Move) {
        let mover_color = self.side_to_move;
        let prev_state = State {
            zobrist: self.zobrist,
            castling: self.castling,
            ep_square: self.ep_square,
            halfmove_clock: self.halfmove_clock,
            captured: m.captured,
        };

        let mut hash = self.zobrist;
        hash ^= zobrist::castling_key(self.castling.0);
        if self.ep_square.is_valid() {
            hash ^= zobrist::en_passant_key(types::file_of(self.ep_square));
        }

        let is_pawn_move = m.piece == PieceType::Pawn;
        let is_capture = m.captured.is_some();

        match m.kind {
            MoveKind::Normal | MoveKind::PawnDouble => {
                if let Some(victim) = m.captured {
                    let (_, removed) = self.remove(m.to);
                    debug_assert_eq!(removed, victim);
                    hash ^= zobrist::piece_key(mover_color.opponent(), victim, m.to);
                    self.update_castling_rights_on_touch(m.to);
                }
                self.remove(m.from);
                hash ^= zobrist::piece_key(mover_color, m.piece, m.from);
                self.place(m.to, mover_color, m.piece);
                hash ^= zobrist::piece_key(mover_color, m.piece, m.to);
                self.update_castling_rights_on_touch(m.from);
            }
            MoveKind::PawnPromotion => {
                if let Some(victim) = m.captured {
                    let (_, removed) = self.remove(m.to);
                    debug_assert_eq!(removed, victim);
                    hash ^= zobrist::piece_key(mover_color.opponent(), victim, m.to);
                    self.update_castling_rights_on_touch(m.to);
                }
                self.remove(m.from);
                hash ^= zobrist::piece_key(mover_color, PieceType::Pawn, m.from);
                let promo = m.promotion.expect("promotion move carries a promotion piece");
                self.place(m.to, mover_color, promo);
                hash ^= zobrist::piece_key(mover_color, promo, m.to);
            }
            MoveKind::EnPassant => {
                let captured_sq = types::try_step(
                    m.to,
                    0,
                    if mover_color == Color::White { -1 } else { 1 },
                )
                .expect("en passant capture square is always on-board");
                let (_, removed) = self.remove(captured_sq);
                debug_assert_eq!(removed, PieceType::Pawn);
                hash ^= zobrist::piece_key(mover_color.opponent(), PieceType::Pawn, captured_sq);
                self.remove(m.from);
                hash ^= zobrist::piece_key(mover_color, PieceType::Pawn, m.from);
                self.place(m.to, mover_color, PieceType::Pawn);
                hash ^= zobrist::piece_key(mover_color, PieceType::Pawn, m.to);
            }
            MoveKind::Castling => {
                self.remove(m.from);
                hash ^= zobrist::piece_key(mover_color, PieceType::King, m.from);
                self.place(m.to, mover_color, PieceType::King);
                hash ^= zobrist::piece_key(mover_color, PieceType::King, m.to);

                let kingside = types::file_of(m.to) == 6;
                let (rook_from, rook_to) = Self::castling_rook_squares(mover_color, kingside);
                self.remove(rook_from);
                hash ^= zobrist::piece_key(mover_color, PieceType::Rook, rook_from);
                self.place(rook_to, mover_color, PieceType::Rook);
                hash ^= zobrist::piece_key(mover_color, PieceType::Rook, rook_to);

                self.castling.clear_color(mover_color);
            }
        }

        self.ep_square = if m.kind == MoveKind::PawnDouble {
            types::try_step(
                m.from,
                0,
                if mover_color == Color::White { 1 } else { -1 },
            )
            .expect("double push always has a valid midpoint")
        } else {
            NO_SQUARE
        };

        self.halfmove_clock = if is_capture || is_pawn_move {
            0
        } else {
            self.halfmove_clock + 1
        };

        if mover_color == Color::Black {
            self.fullmove_number += 1;
        }

        hash ^= zobrist::castling_key(self.castling.0);
        if self.ep_square.is_valid() {
            hash ^= zobrist::en_passant_key(types::file_of(self.ep_square));
        }
        hash ^= zobrist::side_to_move_key();

        self.side_to_move = mover_color.opponent();
        self.zobrist = hash;
        self.history.push(prev_state);
    }

    /// Reverses `make_move(m)`. Precondition: `m` was the most recent move
    /// made (the caller must undo moves in LIFO order).
    pub fn undo_move(&mut self, m: Move) {
        let prev = self.history.pop().expect("undo without matching make");
        let mover_color = self.side_to_move.opponent();

        match m.kind {
            MoveKind::Normal | MoveKind::PawnDouble => {
                self.remove(m.to);
                self.place(m.from, mover_color, m.piece);
                if let Some(victim) = m.captured {
                    self.place(m.to, mover_color.opponent(), victim);
                }
            }
            MoveKind::PawnPromotion => {
                self.remove(m.to);
                self.place(m.from, mover_color, PieceType::Pawn);
                if let Some(victim) = m.captured {
                    self.place(m.to, mover_color.opponent(), victim);
                }
            }
            MoveKind::EnPassant => {
                self.remove(m.to);
                self.place(m.from, mover_color, PieceType::Pawn);
                let captured_sq = types::try_step(
                    m.to,
                    0,
                    if mover_color == Color::White { -1 } else { 1 },
                )
                .expect("en passant capture square is always on-board");
                self.place(captured_sq, mover_color.opponent(), PieceType::Pawn);
            }
            MoveKind::Castling => {
                self.remove(m.to);
                self.place(m.from, mover_color, PieceType::King);
                let kingside = types::file_of(m.to) == 6;
                let (rook_from, rook_to) = Self::castling_rook_squares(mover_color, kingside);
                self.remove(rook_to);
                self.place(rook_from, mover_color, PieceType::Rook);
            }
        }

        if mover_color == Color::Black {
            self.fullmove_number -= 1;
        }

        self.castling = prev.castling;
        self.ep_square = prev.ep_square;
        self.halfmove_clock = prev.halfmove_clock;
        self.zobrist = prev.zobrist;
        self.side_to_move = mover_color;
    }

    /// Flips side to move, clears the en-passant square and bumps the
    /// halfmove clock. Pushes a `State` so `undo_null_move` is symmetric
    /// with `undo_move`. The search layer is responsible for never making
    /// two consecutive null moves.
    pub fn make_null_move(&mut self) {
        let prev_state = State {
            zobrist: self.zobrist,
            castling: self.castling,
            ep_square: self.ep_square,
            halfmove_clock: self.halfmove_clock,
            captured: None,
        };
        let mut hash = self.zobrist;
        if self.ep_square.is_valid() {
            hash ^= zobrist::en_passant_key(types::file_of(self.ep_square));
        }
        hash ^= zobrist::side_to_move_key();
        self.ep_square = NO_SQUARE;
        self.halfmove_clock += 1;
        self.side_to_move = self.side_to_move.opponent();
        self.zobrist = hash;
        self.history.push(prev_state);
    }

    pub fn undo_null_move(&mut self) {
        let prev = self.history.pop().expect("undo_null_move without matching make");
        self.castling = prev.castling;
        self.ep_square = prev.ep_square;
        self.halfmove_clock = prev.halfmove_clock;
        self.zobrist = prev.zobrist;
        self.side_to_move = self.side_to_move.opponent();
    }
}

impl PartialEq for Position {
    /// Bit-for-bit comparison of every field except the history stack
    /// (whose length and contents differ between "explored but unmade" and
    /// "at rest" positions) — used by make/undo round-trip tests.
    fn eq(&self, other: &Self) -> bool {
        self.mailbox == other.mailbox
            && self.pieces == other.pieces
            && self.occ == other.occ
            && self.material == other.material
            && self.castling == other.castling
            && self.ep_square == other.ep_square
            && self.side_to_move == other.side_to_move
            && self.halfmove_clock == other.halfmove_clock
            && self.fullmove_number == other.fullmove_number
            && self.zobrist == other.zobrist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_zobrist_matches_recompute() {
        let pos = Position::startpos();
        assert_eq!(pos.zobrist_key(), pos.recompute_zobrist());
    }

    #[test]
    fn startpos_has_one_king_each() {
        let pos = Position::startpos();
        assert_eq!(pos.pieces(Color::White, PieceType::King).count_ones(), 1);
        assert_eq!(pos.pieces(Color::Black, PieceType::King).count_ones(), 1);
    }

    #[test]
    fn null_move_round_trip_restores_key() {
        let mut pos = Position::startpos();
        let before = pos.clone();
        pos.make_null_move();
        pos.undo_null_move();
        assert!(pos == before);
    }

    #[test]
    fn simple_pawn_push_make_undo_round_trip() {
        let mut pos = Position::startpos();
        let before = pos.clone();
        let m = Move {
            kind: MoveKind::PawnDouble,
            from: Square(12), // e2
            to: Square(28),   // e4
            piece: PieceType::Pawn,
            captured: None,
            promotion: None,
        };
        pos.make_move(m);
        assert_ne!(pos.zobrist_key(), before.zobrist_key());
        pos.undo_move(m);
        assert!(pos == before);
    }

    #[test]
    fn insufficient_material_kk() {
        let pos = Position::from_fen("8/8/8/4k3/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(pos.has_insufficient_material());
    }

    #[test]
    fn sufficient_material_with_rook() {
        let pos = Position::from_fen("8/8/8/4k3/8/8/8/R3K3 w - - 0 1").unwrap();
        assert!(!pos.has_insufficient_material());
    }
}
