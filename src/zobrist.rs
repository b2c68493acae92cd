//! Zobrist hashing for chess positions: an incrementally maintained 64-bit
//! hash covering piece placement, castling rights, the en-passant square
//! and side to move.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Color, PieceType, Square};

struct ZobristKeys {
    piece_keys: [[[u64; 64]; 6]; 2],
    side_to_move: u64,
    castling: [u64; 16],
    en_passant_file: [u64; 8],
}

impl ZobristKeys {
    fn new() -> Self {
        // Fixed seed: Zobrist keys only need to be stable within one
        // process, and a fixed seed keeps runs reproducible for testing.
        let mut rng = StdRng::seed_from_u64(0x9E37_79B9_7F4A_7C15);
        let mut piece_keys = [[[0u64; 64]; 6]; 2];
        for color in &mut piece_keys {
            for piece in color.iter_mut() {
                for key in piece.iter_mut() {
                    *key = rng.gen();
                }
            }
        }
        let side_to_move = rng.gen();
        let mut castling = [0u64; 16];
        for key in &mut castling {
            *key = rng.gen();
        }
        let mut en_passant_file = [0u64; 8];
        for key in &mut en_passant_file {
            *key = rng.gen();
        }
        ZobristKeys {
            piece_keys,
            side_to_move,
            castling,
            en_passant_file,
        }
    }
}

static KEYS: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);

#[inline]
#[must_use]
pub fn piece_key(color: Color, kind: PieceType, sq: Square) -> u64 {
    KEYS.piece_keys[color.index()][kind.index()][sq.as_usize()]
}

#[inline]
#[must_use]
pub fn side_to_move_key() -> u64 {
    KEYS.side_to_move
}

#[inline]
#[must_use]
pub fn castling_key(rights: u8) -> u64 {
    KEYS.castling[(rights & 0xF) as usize]
}

/// Only the file of the en-passant target square participates in the hash
/// (the rank is implied by side to move), matching spec.md's invariant
/// that the square only ever appears right after a double pawn push.
#[inline]
#[must_use]
pub fn en_passant_key(file: u8) -> u64 {
    KEYS.en_passant_file[(file & 7) as usize]
}
