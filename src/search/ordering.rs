//! Move ordering (spec.md §4.G step 5): TT move first, then MVV-LVA
//! captures, then killers, then history-ordered quiets.

use crate::board::Board;
use crate::moves::Move;

use super::context::SearchContext;

/// Higher is searched first. Captures always outrank quiets.
fn mvv_lva_score(board: &Board, mv: &Move) -> i32 {
    if let Some((_, victim)) = board.piece_at(mv.to) {
        victim.value() * 16 - mv.piece.attacker_value()
    } else if mv.is_en_passant() {
        crate::board::Piece::Pawn.value() * 16 - mv.piece.attacker_value()
    } else {
        0
    }
}

pub fn order_moves(
    board: &Board,
    moves: &mut [Move],
    tt_move: Option<Move>,
    context: &SearchContext,
    ply: usize,
) {
    let killers = context.killers(ply);
    moves.sort_by_cached_key(|mv| {
        let mv = *mv;
        if Some(mv) == tt_move {
            return i64::MIN;
        }
        if mv.is_capture() || mv.is_en_passant() {
            return -(1_000_000 + mvv_lva_score(board, &mv) as i64);
        }
        if mv.is_promotion() {
            return -500_000;
        }
        if Some(mv) == killers[0] {
            return -400_001;
        }
        if Some(mv) == killers[1] {
            return -400_000;
        }
        -(context.history_score(mv.from.index(), mv.to.index()) as i64)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::moves::movegen::{generate, GenMode};

    #[test]
    fn captures_are_ordered_before_quiets() {
        let b: Board = "4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1".parse().unwrap();
        let mut moves = Vec::new();
        generate(&b, GenMode::Legal, &mut moves);
        let ctx = SearchContext::new();
        order_moves(&b, &mut moves, None, &ctx, 0);
        let first_capture = moves.iter().position(|m| m.is_capture()).unwrap();
        assert_eq!(first_capture, 0);
    }
}
