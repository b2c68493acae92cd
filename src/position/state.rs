use crate::types::{CastlingRights, PieceType, Square};

/// Captures everything `make_move`/`make_null_move` cannot recompute on
/// undo: the pre-move zobrist key, castling rights, en-passant square and
/// halfmove clock, plus the captured piece type (if any) so the mailbox and
/// bitboards can be restored. Pushed on every `make_move`/`make_null_move`,
/// popped on the matching undo — an array-backed stack instead of the
/// pointer-chained history records of the original implementation, sized
/// once for `MAX_PLY + slack` so make/undo never allocates.
#[derive(Clone, Copy, Debug)]
pub(crate) struct State {
    pub zobrist: u64,
    pub castling: CastlingRights,
    pub ep_square: Square,
    pub halfmove_clock: u32,
    pub captured: Option<PieceType>,
}
