//! Forsyth-Edwards Notation parsing and formatting.

use std::fmt;

use crate::types::{
    self, CastlingRights, Color, PieceType, BLACK_KINGSIDE, BLACK_QUEENSIDE, NO_SQUARE,
    WHITE_KINGSIDE, WHITE_QUEENSIDE,
};

use super::Position;

/// Everything that can go wrong turning attacker-controlled text into a
/// [`Position`] or a [`crate::types::Move`] — never a panic, always a typed
/// variant the UCI front end can report back as an error line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    WrongFieldCount { expected: usize, found: usize },
    BadBoard(String),
    BadSideToMove(String),
    BadCastling(String),
    BadEnPassant(String),
    BadHalfmoveClock(String),
    BadFullmoveNumber(String),
    BadSquare(String),
    BadMoveText(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::WrongFieldCount { expected, found } => write!(
                f,
                "expected {expected} whitespace-separated FEN fields, found {found}"
            ),
            ParseError::BadBoard(s) => write!(f, "invalid FEN board field: {s}"),
            ParseError::BadSideToMove(s) => write!(f, "invalid FEN side-to-move field: {s}"),
            ParseError::BadCastling(s) => write!(f, "invalid FEN castling field: {s}"),
            ParseError::BadEnPassant(s) => write!(f, "invalid FEN en-passant field: {s}"),
            ParseError::BadHalfmoveClock(s) => write!(f, "invalid FEN halfmove clock: {s}"),
            ParseError::BadFullmoveNumber(s) => write!(f, "invalid FEN fullmove number: {s}"),
            ParseError::BadSquare(s) => write!(f, "invalid square text: {s}"),
            ParseError::BadMoveText(s) => write!(f, "invalid move text: {s}"),
        }
    }
}

impl std::error::Error for ParseError {}

pub fn from_fen(text: &str) -> Result<Position, ParseError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(ParseError::WrongFieldCount {
            expected: 6,
            found: fields.len(),
        });
    }

    let mut pos = Position::empty();

    let ranks: Vec<&str> = fields[0].split('/').collect();
    if ranks.len() != 8 {
        return Err(ParseError::BadBoard(fields[0].to_string()));
    }
    for (rank_from_top, rank_text) in ranks.iter().enumerate() {
        let rank = 7 - rank_from_top as u8;
        let mut file = 0u8;
        for ch in rank_text.chars() {
            if let Some(skip) = ch.to_digit(10) {
                file += skip as u8;
                if file > 8 {
                    return Err(ParseError::BadBoard(fields[0].to_string()));
                }
            } else {
                if file >= 8 {
                    return Err(ParseError::BadBoard(fields[0].to_string()));
                }
                let (color, kind) = PieceType::from_char(ch)
                    .ok_or_else(|| ParseError::BadBoard(fields[0].to_string()))?;
                pos.place(types::square_of(file, rank), color, kind);
                file += 1;
            }
        }
        if file != 8 {
            return Err(ParseError::BadBoard(fields[0].to_string()));
        }
    }

    pos.side_to_move = match fields[1] {
        "w" => Color::White,
        "b" => Color::Black,
        other => return Err(ParseError::BadSideToMove(other.to_string())),
    };

    pos.castling = parse_castling(fields[2])?;

    pos.ep_square = match fields[3] {
        "-" => NO_SQUARE,
        s => {
            let sq = types::from_algebraic(s).ok_or_else(|| ParseError::BadEnPassant(s.to_string()))?;
            let expected_rank = match pos.side_to_move {
                Color::White => 5,
                Color::Black => 2,
            };
            if types::rank_of(sq) != expected_rank {
                return Err(ParseError::BadEnPassant(s.to_string()));
            }
            sq
        }
    };

    pos.halfmove_clock = if fields.len() > 4 {
        fields[4]
            .parse()
            .map_err(|_| ParseError::BadHalfmoveClock(fields[4].to_string()))?
    } else {
        0
    };

    pos.fullmove_number = if fields.len() > 5 {
        fields[5]
            .parse()
            .map_err(|_| ParseError::BadFullmoveNumber(fields[5].to_string()))?
    } else {
        1
    };

    pos.zobrist = pos.recompute_zobrist();

    Ok(pos)
}

fn parse_castling(text: &str) -> Result<CastlingRights, ParseError> {
    if text == "-" {
        return Ok(CastlingRights::NONE);
    }
    let mut rights = CastlingRights::NONE;
    for ch in text.chars() {
        match ch {
            'K' => rights.set(WHITE_KINGSIDE),
            'Q' => rights.set(WHITE_QUEENSIDE),
            'k' => rights.set(BLACK_KINGSIDE),
            'q' => rights.set(BLACK_QUEENSIDE),
            _ => return Err(ParseError::BadCastling(text.to_string())),
        }
    }
    Ok(rights)
}

pub fn to_fen(pos: &Position) -> String {
    let mut board = String::new();
    for rank_from_top in 0..8u8 {
        let rank = 7 - rank_from_top;
        let mut empty_run = 0u8;
        for file in 0..8u8 {
            match pos.piece_at(types::square_of(file, rank)) {
                None => empty_run += 1,
                Some((color, kind)) => {
                    if empty_run > 0 {
                        board.push_str(&empty_run.to_string());
                        empty_run = 0;
                    }
                    board.push(kind.to_char(color));
                }
            }
        }
        if empty_run > 0 {
            board.push_str(&empty_run.to_string());
        }
        if rank_from_top != 7 {
            board.push('/');
        }
    }

    let stm = if pos.side_to_move == Color::White { "w" } else { "b" };
    let castling = pos.castling.to_fen_field();
    let ep = if pos.ep_square.is_valid() {
        types::to_algebraic(pos.ep_square)
    } else {
        "-".to_string()
    };

    format!(
        "{board} {stm} {castling} {ep} {} {}",
        pos.halfmove_clock, pos.fullmove_number
    )
}

/// Parses long-algebraic text (`e2e4`, `e7e8q`) against the legal moves of
/// `pos`, returning the matching [`crate::types::Move`] (with its captured
/// piece and move kind filled in by the generator) rather than trusting the
/// text's shape — this is the only way a promotion flag or en-passant flag
/// can be attached correctly.
pub fn parse_move(pos: &Position, text: &str) -> Result<types::Move, ParseError> {
    if text.len() < 4 || text.len() > 5 {
        return Err(ParseError::BadMoveText(text.to_string()));
    }
    let from = types::from_algebraic(&text[0..2])
        .ok_or_else(|| ParseError::BadSquare(text[0..2].to_string()))?;
    let to = types::from_algebraic(&text[2..4])
        .ok_or_else(|| ParseError::BadSquare(text[2..4].to_string()))?;
    let promotion = if text.len() == 5 {
        Some(
            PieceType::from_promotion_char(text.as_bytes()[4] as char)
                .ok_or_else(|| ParseError::BadMoveText(text.to_string()))?,
        )
    } else {
        None
    };

    let legal = crate::movegen::legal_moves(pos);
    legal
        .iter()
        .map(|(m, _)| *m)
        .find(|m| m.from == from && m.to == to && m.promotion == promotion)
        .ok_or_else(|| ParseError::BadMoveText(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_fen_round_trips() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let pos = from_fen(fen).unwrap();
        assert_eq!(to_fen(&pos), fen);
    }

    #[test]
    fn kiwipete_fen_round_trips() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let pos = from_fen(fen).unwrap();
        assert_eq!(to_fen(&pos), fen);
    }

    #[test]
    fn rejects_malformed_board_field() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKB w KQkq - 0 1";
        assert!(from_fen(fen).is_err());
    }

    #[test]
    fn rejects_bad_side_to_move() {
        let fen = "8/8/8/4k3/8/8/8/4K3 x - - 0 1";
        assert!(from_fen(fen).is_err());
    }

    #[test]
    fn accepts_en_passant_square_consistent_with_side_to_move() {
        let fen = "1k6/8/8/5pP1/4K1P1/8/8/8 w - f6 0 1";
        assert!(from_fen(fen).is_ok());
    }

    #[test]
    fn rejects_en_passant_square_inconsistent_with_side_to_move() {
        // f6 is a rank-6 target, valid only when white is to move.
        let fen = "1k6/8/8/5pP1/4K1P1/8/8/8 b - f6 0 1";
        assert!(matches!(from_fen(fen), Err(ParseError::BadEnPassant(_))));
    }
}
