//! Iterative-deepening alpha-beta search: PVS, null-move pruning,
//! internal iterative deepening, mate-distance pruning, killer-move
//! ordering and quiescence search, grounded on the teacher's
//! `negamax`/`quiesce`/`iterative_deepening_with_sink` shape but
//! generalized to spec.md's exact numbers and move-ordering rules.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::constants::{
    CHECKMATE, CHECKMATE_THRESHOLD, DRAW, IID_DEPTH_THRESHOLD, IID_REDUCTION, INFINITE, MAX_PLY,
    NULL_MOVE_REDUCTION,
};
use crate::eval::evaluate;
use crate::movegen;
use crate::position::Position;
use crate::sync::Handshake;
use crate::tt::{self, Bound, TranspositionTable};
use crate::types::{Move, PieceType, RootMoveList, NO_MOVE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

impl Score {
    #[must_use]
    pub fn from_raw(value: i32) -> Score {
        if value >= CHECKMATE_THRESHOLD {
            Score::Mate(((CHECKMATE - value + 1) / 2).max(1))
        } else if value <= -CHECKMATE_THRESHOLD {
            Score::Mate(-((CHECKMATE + value + 1) / 2).max(1))
        } else {
            Score::Centipawns(value)
        }
    }
}

/// A snapshot handed to the progress-reporting callback; `uci_info`
/// formats this into `info ...` wire text.
#[derive(Clone)]
pub struct SearchReport {
    pub depth: u32,
    pub seldepth: u32,
    pub nodes: u64,
    pub elapsed: std::time::Duration,
    pub score: Score,
    pub pv: Vec<Move>,
    pub currmove: Option<Move>,
    pub currmovenumber: Option<u32>,
}

pub struct SearchOutcome {
    pub best_move: Move,
    pub ponder_move: Option<Move>,
    pub depth_reached: u32,
    pub nodes: u64,
}

/// Everything a single search invocation needs beyond the position:
/// a shared transposition table and the cooperative abort flag.
pub struct SearchWorker {
    pos: Position,
    tt: Arc<Mutex<TranspositionTable>>,
    handshake: Arc<Handshake>,
    nodes: u64,
    seldepth: u32,
    killers: Vec<[Move; 2]>,
    pv_table: Vec<Vec<Move>>,
    pv_len: Vec<usize>,
    start_time: Instant,
    node_limit: Option<u64>,
}

impl SearchWorker {
    #[must_use]
    pub fn new(pos: Position, tt: Arc<Mutex<TranspositionTable>>, handshake: Arc<Handshake>, node_limit: Option<u64>) -> Self {
        SearchWorker {
            pos,
            tt,
            handshake,
            nodes: 0,
            seldepth: 0,
            killers: vec![[NO_MOVE; 2]; MAX_PLY + 1],
            pv_table: vec![Vec::new(); MAX_PLY + 1],
            pv_len: vec![0; MAX_PLY + 1],
            start_time: Instant::now(),
            node_limit,
        }
    }

    fn aborted(&self) -> bool {
        if self.handshake.is_aborted() {
            return true;
        }
        if let Some(limit) = self.node_limit {
            if self.nodes >= limit {
                return true;
            }
        }
        false
    }

    /// Runs iterative deepening up to `max_depth`, calling `on_progress`
    /// after each completed iteration (and, for the first move of each
    /// iteration, with a `currmove` update). Returns the best move found
    /// so far even if the search was aborted mid-iteration.
    pub fn iterative_deepening(
        &mut self,
        max_depth: u32,
        mut on_progress: impl FnMut(&SearchReport),
    ) -> SearchOutcome {
        self.start_time = Instant::now();
        let is_check = self.pos.is_check();
        let root_list = movegen::legal_moves(&self.pos);
        let mut root_moves = RootMoveList::from_moves(&root_list);

        if root_moves.is_empty() {
            return SearchOutcome {
                best_move: NO_MOVE,
                ponder_move: None,
                depth_reached: 0,
                nodes: 0,
            };
        }

        let single_legal_move = root_moves.len() == 1;
        let _ = is_check;

        let mut depth_reached = 0u32;
        for depth in 1..=max_depth.max(1) {
            if self.aborted() {
                break;
            }
            let score = self.search_root(
                &mut root_moves,
                depth as i32,
                &mut |currmove, number, nodes, seldepth, elapsed| {
                    on_progress(&SearchReport {
                        depth,
                        seldepth,
                        nodes,
                        elapsed,
                        score: Score::Centipawns(0),
                        pv: Vec::new(),
                        currmove: Some(currmove),
                        currmovenumber: Some(number),
                    });
                },
            );

            if self.handshake.is_aborted() && depth > 1 {
                break;
            }

            root_moves.sort_by_score_desc();
            depth_reached = depth;

            let best = root_moves.get(0);
            on_progress(&SearchReport {
                depth,
                seldepth: self.seldepth,
                nodes: self.nodes,
                elapsed: self.start_time.elapsed(),
                score: Score::from_raw(score),
                pv: best.pv_slice().to_vec(),
                currmove: None,
                currmovenumber: None,
            });

            if single_legal_move {
                break;
            }
            if crate::constants::is_checkmate_score(score) {
                break;
            }
            if let Some(limit) = self.node_limit {
                if self.nodes >= limit {
                    break;
                }
            }
        }

        let best = root_moves.get(0);
        let ponder_move = best.pv_slice().get(1).copied();
        SearchOutcome {
            best_move: best.mv,
            ponder_move,
            depth_reached,
            nodes: self.nodes,
        }
    }

    /// Iterates the pre-sorted root move list, updating each entry's
    /// score and PV on improvement. `on_currmove` is invoked before each
    /// move is searched so the caller can emit `currmove`/`currmovenumber`.
    fn search_root(
        &mut self,
        root_moves: &mut RootMoveList,
        depth: i32,
        on_currmove: &mut impl FnMut(Move, u32, u64, u32, std::time::Duration),
    ) -> i32 {
        let alpha_orig = -INFINITE;
        let mut alpha = alpha_orig;
        let beta = INFINITE;
        let mut best_value = -INFINITE;

        let count = root_moves.len();
        let moves: Vec<Move> = root_moves.iter().map(|e| e.mv).collect();

        for (i, mv) in moves.iter().enumerate() {
            if self.aborted() {
                break;
            }
            on_currmove(
                *mv,
                (i + 1) as u32,
                self.nodes,
                self.seldepth,
                self.start_time.elapsed(),
            );

            self.pos.make_move(*mv);
            let v = if i == 0 {
                -self.search(depth - 1, -beta, -alpha, 1, true)
            } else {
                let scout = -self.search(depth - 1, -alpha - 1, -alpha, 1, true);
                if scout > alpha && !self.aborted() {
                    -self.search(depth - 1, -beta, -alpha, 1, true)
                } else {
                    scout
                }
            };
            self.pos.undo_move(*mv);

            if self.aborted() && i > 0 {
                break;
            }

            let entry = root_moves_find_mut(root_moves, *mv);
            if v > entry.score || entry.pv_len == 0 {
                entry.score = v;
                let child_pv = self.pv_table[1][..self.pv_len[1]].to_vec();
                entry.set_pv(*mv, &child_pv);
            }

            if v > best_value {
                best_value = v;
            }
            if v > alpha {
                alpha = v;
                let child_len = self.pv_len[1];
                let (head, tail) = self.pv_table.split_at_mut(1);
                head[0].clear();
                head[0].push(*mv);
                head[0].extend_from_slice(&tail[0][..child_len]);
                self.pv_len[0] = 1 + child_len.min(MAX_PLY - 1);
            }
        }

        let _ = count;
        best_value
    }

    /// Main negamax recursion with fail-soft alpha-beta, PVS, null-move
    /// pruning, internal iterative deepening, mate-distance pruning and
    /// killer-move ordering, per spec.md §4.F.
    fn search(&mut self, mut depth: i32, mut alpha: i32, mut beta: i32, ply: u32, null_ok: bool) -> i32 {
        if ply as usize >= MAX_PLY {
            return evaluate(&self.pos);
        }
        self.pv_len[ply as usize] = 0;
        let alpha_orig = alpha;
        let key = self.pos.zobrist_key();

        let tt_entry = self.tt.lock().probe(key);
        let mut tt_move = NO_MOVE;
        if let Some(entry) = tt_entry {
            tt_move = entry.mv;
            if entry.depth as i32 >= depth {
                let v = tt::denormalize_mate(entry.value, ply);
                match entry.bound {
                    Bound::Exact => return v,
                    Bound::Lower => {
                        if v > alpha {
                            alpha = v;
                        }
                    }
                    Bound::Upper => {
                        if v < beta {
                            beta = v;
                        }
                    }
                }
                if alpha >= beta {
                    return v;
                }
            }
        }

        if depth <= 0 {
            return self.quiescent(alpha, beta, ply);
        }

        self.nodes += 1;
        if ply > self.seldepth {
            self.seldepth = ply;
        }
        if self.aborted() {
            return evaluate(&self.pos);
        }

        if ply > 0 && self.pos.is_draw() {
            return DRAW;
        }

        alpha = alpha.max(-CHECKMATE + ply as i32);
        beta = beta.min(CHECKMATE - ply as i32 - 1);
        if alpha >= beta {
            return alpha;
        }

        let in_check = self.pos.is_check();

        if null_ok
            && !in_check
            && beta < CHECKMATE_THRESHOLD
            && has_non_pawn_material(&self.pos)
            && evaluate(&self.pos) >= beta
        {
            self.pos.make_null_move();
            let r = NULL_MOVE_REDUCTION as i32;
            let v = -self.search(depth - r, -beta, -beta + 1, ply + 1, false);
            self.pos.undo_null_move();
            if v >= beta {
                self.tt.lock().store(
                    key,
                    tt::normalize_mate(v.min(beta), ply),
                    Bound::Lower,
                    (depth - r + 1).max(0) as u32,
                    NO_MOVE,
                );
                return v;
            }
        }

        if in_check {
            depth += 1;
        }

        if depth > IID_DEPTH_THRESHOLD as i32 && tt_move.is_none() {
            let iid_depth = depth - IID_REDUCTION as i32;
            if iid_depth > 0 {
                self.search(iid_depth, alpha, beta, ply, true);
                if let Some(entry) = self.tt.lock().probe(key) {
                    tt_move = entry.mv;
                }
            }
        }

        let mut moves = movegen::pseudo_legal_moves(&self.pos);
        moves.rate_mvv_lva();
        moves.sort_by_score_desc();
        if !tt_move.is_none() {
            moves.bring_to_front_matching(tt_move.from, tt_move.to, tt_move.promotion);
        } else {
            let killers = self.killers[ply as usize];
            for killer in killers {
                if !killer.is_none() {
                    moves.bring_to_front_matching(killer.from, killer.to, killer.promotion);
                }
            }
        }

        let mut best_value = -INFINITE;
        let mut best_move = NO_MOVE;
        let mut searched_moves = 0u32;

        for i in 0..moves.len() {
            let mv = moves.get_move(i);
            self.pos.make_move(mv);
            if movegen_king_in_check_after(&self.pos, mv) {
                self.pos.undo_move(mv);
                continue;
            }

            let v = if searched_moves > 0 && depth > 1 {
                let scout = -self.search(depth - 1, -alpha - 1, -alpha, ply + 1, true);
                if scout > alpha && scout < beta {
                    -self.search(depth - 1, -beta, -alpha, ply + 1, true)
                } else {
                    scout
                }
            } else {
                -self.search(depth - 1, -beta, -alpha, ply + 1, true)
            };
            self.pos.undo_move(mv);
            searched_moves += 1;

            if v > best_value {
                best_value = v;
                best_move = mv;
            }
            if v > alpha {
                alpha = v;
                let (head, tail) = self.pv_table.split_at_mut(ply as usize + 1);
                let parent = &mut head[ply as usize];
                parent.clear();
                parent.push(mv);
                let child_len = self.pv_len[ply as usize + 1];
                if !tail.is_empty() {
                    parent.extend_from_slice(&tail[0][..child_len]);
                }
                self.pv_len[ply as usize] = 1 + child_len.min(MAX_PLY - 1 - ply as usize);
            }
            if alpha >= beta {
                if mv.captured.is_none() && mv.promotion.is_none() {
                    let slot = &mut self.killers[ply as usize];
                    if slot[0] != mv {
                        slot[1] = slot[0];
                        slot[0] = mv;
                    }
                }
                break;
            }
        }

        if searched_moves == 0 {
            let value = if in_check { -CHECKMATE + ply as i32 } else { DRAW };
            self.tt.lock().store(key, value, Bound::Exact, depth.max(0) as u32, NO_MOVE);
            return value;
        }

        let bound = if best_value <= alpha_orig {
            Bound::Upper
        } else if best_value >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.tt.lock().store(
            key,
            tt::normalize_mate(best_value, ply),
            bound,
            depth.max(0) as u32,
            best_move,
        );

        best_value
    }

    /// Capture-only (or full-evasion, when in check) leaf search with
    /// stand-pat and delta pruning.
    fn quiescent(&mut self, mut alpha: i32, beta: i32, ply: u32) -> i32 {
        if ply as usize >= MAX_PLY {
            return evaluate(&self.pos);
        }
        self.pv_len[ply as usize] = 0;
        self.nodes += 1;
        if ply > self.seldepth {
            self.seldepth = ply;
        }
        if self.aborted() {
            return evaluate(&self.pos);
        }
        if self.pos.is_draw() {
            return DRAW;
        }

        let in_check = self.pos.is_check();
        let mut best;
        if in_check {
            best = -INFINITE;
        } else {
            best = evaluate(&self.pos);
            if best >= beta {
                return best;
            }
            if best > alpha {
                alpha = best;
            }
            const QUEEN_VALUE: i32 = 900;
            const PAWN_VALUE: i32 = 100;
            if best + (2 * QUEEN_VALUE - PAWN_VALUE) < alpha {
                return best;
            }
        }

        let moves = movegen::legal_moves_for_quiescence(&self.pos);
        let mut any_tried = false;
        for (mv, _) in moves.iter() {
            self.pos.make_move(*mv);
            any_tried = true;
            let v = -self.quiescent(-beta, -alpha, ply + 1);
            self.pos.undo_move(*mv);

            if v > best {
                best = v;
            }
            if v > alpha {
                alpha = v;
                let (head, tail) = self.pv_table.split_at_mut(ply as usize + 1);
                let parent = &mut head[ply as usize];
                parent.clear();
                parent.push(*mv);
                let child_len = self.pv_len[ply as usize + 1];
                if !tail.is_empty() {
                    parent.extend_from_slice(&tail[0][..child_len]);
                }
                self.pv_len[ply as usize] = 1 + child_len.min(MAX_PLY - 1 - ply as usize);
            }
            if alpha >= beta {
                break;
            }
        }

        if in_check && !any_tried {
            return -CHECKMATE + ply as i32;
        }

        best
    }
}

/// After `mv` has been made, checks whether the side that just moved left
/// its own king in check (the piece now sitting on `mv.to` belongs to the
/// mover, so its color identifies whose king to check).
fn movegen_king_in_check_after(pos: &Position, mv: Move) -> bool {
    match pos.piece_at(mv.to) {
        Some((color, _)) => pos.is_attacked(pos.king_square(color), color.opponent()),
        None => false,
    }
}

fn has_non_pawn_material(pos: &Position) -> bool {
    let us = pos.side_to_move();
    pos.pieces(us, PieceType::Knight).count_ones()
        + pos.pieces(us, PieceType::Bishop).count_ones()
        + pos.pieces(us, PieceType::Rook).count_ones()
        + pos.pieces(us, PieceType::Queen).count_ones()
        > 0
}

fn root_moves_find_mut<'a>(root_moves: &'a mut RootMoveList, mv: Move) -> &'a mut crate::types::RootMoveEntry {
    root_moves
        .iter_mut()
        .find(|e| e.mv == mv)
        .expect("root move list contains every searched move")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    fn fresh_worker(pos: Position) -> SearchWorker {
        let tt = Arc::new(Mutex::new(TranspositionTable::new_mb(1)));
        let hs = Handshake::new();
        SearchWorker::new(pos, tt, hs, None)
    }

    #[test]
    fn finds_mate_in_one() {
        let pos = Position::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        let mut worker = fresh_worker(pos);
        let outcome = worker.iterative_deepening(3, |_| {});
        assert_eq!(outcome.best_move.to_long_algebraic(), "a1a8");
    }

    #[test]
    fn single_legal_move_short_circuits() {
        let pos = Position::from_fen("k7/8/1K6/8/8/8/8/7Q b - - 0 1").unwrap();
        let mut worker = fresh_worker(pos);
        let outcome = worker.iterative_deepening(20, |_| {});
        assert!(outcome.depth_reached <= 2);
    }

    #[test]
    fn stop_flag_halts_search_quickly() {
        let pos = Position::startpos();
        let tt = Arc::new(Mutex::new(TranspositionTable::new_mb(1)));
        let hs = Handshake::new();
        hs.abort.store(true, std::sync::atomic::Ordering::SeqCst);
        let mut worker = SearchWorker::new(pos, tt, hs, None);
        let outcome = worker.iterative_deepening(10, |_| {});
        assert_eq!(outcome.depth_reached, 0);
    }
}
