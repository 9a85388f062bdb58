//! Iterative deepening alpha-beta search (spec.md §4.G): full-window root
//! search per depth, TT-backed cutoffs, PVS null-window re-search from
//! depth 4, quiescence at the frontier, and cooperative cancellation via a
//! shared atomic flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::board::{Board, Status};
use crate::moves::movegen::{apply_move, generate, terminal_status, GenMode};
use crate::moves::Move;

use super::context::{SearchContext, MAX_PLY};
use super::eval::evaluate;
use super::ordering::order_moves;
use super::tt::{Bound, TranspositionTable};

const MATE_VALUE: i32 = 30_000;
const MATE_THRESHOLD: i32 = MATE_VALUE - 1000;
const NODE_CHECK_INTERVAL: u64 = 1024;

/// Deadline + cancellation flag for one `go` (spec.md §5).
pub struct SearchLimits {
    pub deadline: Instant,
    pub stop: Arc<AtomicBool>,
}

impl SearchLimits {
    pub fn infinite(stop: Arc<AtomicBool>) -> Self {
        SearchLimits {
            deadline: Instant::now() + std::time::Duration::from_secs(365 * 24 * 3600),
            stop,
        }
    }
}

#[derive(Default, Clone)]
pub struct SearchInfo {
    pub depth: u8,
    pub score_cp: i32,
    pub mate: Option<i32>,
    pub nodes: u64,
    pub time_ms: u64,
    pub nps: u64,
    pub hashfull: u32,
    pub pv: Vec<Move>,
}

/// Per-`go` search driver. One instance per call; all mutable search state
/// (TT excepted, which persists across `go`s) lives here.
pub struct Searcher<'a> {
    limits: &'a SearchLimits,
    context: SearchContext,
    tt: &'a mut TranspositionTable,
    nodes: u64,
    start: Instant,
    pv_table: Vec<Vec<Move>>,
    aborted: bool,
}

impl<'a> Searcher<'a> {
    pub fn new(limits: &'a SearchLimits, tt: &'a mut TranspositionTable) -> Self {
        Searcher {
            limits,
            context: SearchContext::new(),
            tt,
            nodes: 0,
            start: Instant::now(),
            pv_table: vec![Vec::new(); MAX_PLY],
            aborted: false,
        }
    }

    #[inline]
    fn should_stop(&self) -> bool {
        if self.limits.stop.load(Ordering::Relaxed) {
            return true;
        }
        self.nodes % NODE_CHECK_INTERVAL == 0 && Instant::now() >= self.limits.deadline
    }

    /// Iterative deepening from depth 1 until cancelled (spec.md §4.G).
    /// Returns the info for the last fully completed iteration; the caller
    /// emits `info`/`bestmove` from it.
    pub fn run(&mut self, root: &Board, max_depth: u8, mut on_depth: impl FnMut(&SearchInfo)) -> SearchInfo {
        let mut best = SearchInfo::default();

        for depth in 1..=max_depth {
            self.aborted = false;
            self.pv_table = vec![Vec::new(); MAX_PLY];
            let score = self.negamax(root, depth, 0, -MATE_VALUE - 1, MATE_VALUE + 1);

            if self.aborted {
                break;
            }

            let elapsed = self.start.elapsed();
            let pv = self.pv_table[0].clone();
            let mate = mate_distance_in_moves(score);
            let time_ms = elapsed.as_millis() as u64;
            let nps = if elapsed.as_secs_f64() > 0.0 {
                (self.nodes as f64 / elapsed.as_secs_f64()) as u64
            } else {
                0
            };
            best = SearchInfo {
                depth,
                score_cp: score,
                mate,
                nodes: self.nodes,
                time_ms,
                nps,
                hashfull: self.tt.hashfull(),
                pv,
            };
            on_depth(&best);

            if self.limits.stop.load(Ordering::Relaxed) || Instant::now() >= self.limits.deadline {
                break;
            }
        }

        best
    }

    fn negamax(&mut self, board: &Board, depth: u8, ply: usize, mut alpha: i32, beta: i32) -> i32 {
        self.nodes += 1;
        if self.should_stop() {
            self.aborted = true;
            return 0;
        }

        if depth == 0 {
            return self.quiescence(board, ply, alpha, beta);
        }

        let key = board.zobrist;
        let mut tt_move = None;
        if let Some(entry) = self.tt.probe(key) {
            tt_move = entry.best_move;
            if entry.depth >= depth {
                match entry.bound {
                    Bound::Exact => return entry.value,
                    Bound::Lower if entry.value >= beta => return entry.value,
                    Bound::Upper if entry.value <= alpha => return entry.value,
                    _ => {}
                }
            }
        }

        let mut moves = Vec::new();
        generate(board, GenMode::Legal, &mut moves);
        if moves.is_empty() {
            return terminal_leaf_value(board, &[], ply);
        }
        let ply_idx = ply.min(MAX_PLY - 1);
        order_moves(board, &mut moves, tt_move, &self.context, ply_idx);

        let mut best_score = -MATE_VALUE - 1;
        let mut best_move = None;
        let original_alpha = alpha;

        for (i, mv) in moves.iter().enumerate() {
            let child = apply_move(board, mv);

            let score = if i == 0 {
                -self.negamax(&child, depth - 1, ply + 1, -beta, -alpha)
            } else if depth >= 4 {
                let null_window = -self.negamax(&child, depth - 1, ply + 1, -alpha - 1, -alpha);
                if null_window > alpha && null_window < beta {
                    -self.negamax(&child, depth - 1, ply + 1, -beta, -alpha)
                } else {
                    null_window
                }
            } else {
                -self.negamax(&child, depth - 1, ply + 1, -beta, -alpha)
            };

            if self.aborted {
                return 0;
            }

            if score > best_score {
                best_score = score;
                best_move = Some(*mv);
            }
            if score > alpha {
                alpha = score;
                self.update_pv(ply, *mv);
            }
            if alpha >= beta {
                if mv.is_quiet() {
                    self.context.record_killer(ply_idx, *mv);
                    self.context.record_history(mv.from.index(), mv.to.index(), depth);
                }
                self.tt.store(key, depth, Bound::Lower, best_score, best_move);
                return best_score;
            }
        }

        let bound = if alpha > original_alpha { Bound::Exact } else { Bound::Upper };
        self.tt.store(key, depth, bound, best_score, best_move);
        best_score
    }

    fn quiescence(&mut self, board: &Board, ply: usize, mut alpha: i32, beta: i32) -> i32 {
        self.nodes += 1;
        if self.should_stop() {
            self.aborted = true;
            return 0;
        }

        let stand_pat = evaluate(board);
        if stand_pat >= beta {
            return stand_pat;
        }
        alpha = alpha.max(stand_pat);

        let mut moves = Vec::new();
        generate(board, GenMode::CapturesOnly, &mut moves);
        order_moves(board, &mut moves, None, &self.context, ply.min(MAX_PLY - 1));

        let mut best = stand_pat;
        for mv in &moves {
            let child = apply_move(board, mv);
            let score = -self.quiescence(&child, ply + 1, -beta, -alpha);
            if self.aborted {
                return 0;
            }
            if score > best {
                best = score;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                break;
            }
        }
        best
    }

    fn update_pv(&mut self, ply: usize, mv: Move) {
        if ply >= self.pv_table.len() {
            return;
        }
        let mut line = vec![mv];
        if ply + 1 < self.pv_table.len() {
            line.extend(self.pv_table[ply + 1].clone());
        }
        self.pv_table[ply] = line;
    }
}

/// Terminal value at a node with no legal moves: mate or stalemate, scored
/// ply-indexed so shorter mates dominate (spec.md §4.E / §4.G).
fn terminal_leaf_value(board: &Board, legal_moves: &[Move], ply: usize) -> i32 {
    match terminal_status(board, legal_moves) {
        Status::Stalemate => 0,
        Status::WhiteMates | Status::BlackMates => -(MATE_VALUE - ply as i32),
        Status::Unknown => unreachable!("terminal_leaf_value called with legal moves available"),
    }
}

fn mate_distance_in_moves(score: i32) -> Option<i32> {
    if score.abs() <= MATE_THRESHOLD {
        return None;
    }
    let plies = MATE_VALUE - score.abs();
    let moves = (plies + 1) / 2;
    Some(if score > 0 { moves } else { -moves })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tt::TranspositionTable;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn finds_mate_in_one() {
        // White to move, mate in one: Qh5-f7#
        let b: Board = "rnbqkbnr/pppp1ppp/8/4p2Q/4P3/8/PPPP1PPP/RNB1KBNR w KQkq - 2 3"
            .parse()
            .unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let limits = SearchLimits::infinite(stop);
        let mut tt = TranspositionTable::new(1);
        let mut searcher = Searcher::new(&limits, &mut tt);
        let info = searcher.run(&b, 3, |_| {});
        assert_eq!(info.mate, Some(1));
    }

    #[test]
    fn prefers_capturing_a_hanging_queen() {
        let b: Board = "4k3/8/8/q7/8/8/8/R3K3 w - - 0 1".parse().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let limits = SearchLimits::infinite(stop);
        let mut tt = TranspositionTable::new(1);
        let mut searcher = Searcher::new(&limits, &mut tt);
        let info = searcher.run(&b, 2, |_| {});
        assert!(info.score_cp > 500);
    }
}
