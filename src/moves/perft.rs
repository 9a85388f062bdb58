//! Move-count enumeration used to validate the generator against known
//! node counts (spec.md §8 "perft exactness"). Copy-make means there's no
//! undo step — each recursive call just hands the child down.

use tracing::debug;

use crate::board::Board;

use super::movegen::{apply_move, generate, GenMode};
use super::types::Move;

pub fn perft(board: &Board, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut moves = Vec::new();
    generate(board, GenMode::Legal, &mut moves);

    if depth == 1 {
        return moves.len() as u64;
    }

    moves
        .iter()
        .map(|mv| perft(&apply_move(board, mv), depth - 1))
        .sum()
}

/// Per-root-move breakdown, the `go perft`/`d` debug aid UCI engines
/// commonly expose alongside the aggregate count.
pub fn perft_divide(board: &Board, depth: u8) -> Vec<(Move, u64)> {
    let mut moves = Vec::new();
    generate(board, GenMode::Legal, &mut moves);
    debug!(depth, moves = moves.len(), "divide: root legal moves");

    let divided: Vec<(Move, u64)> = moves
        .into_iter()
        .map(|mv| {
            let count = if depth == 0 {
                1
            } else {
                perft(&apply_move(board, &mv), depth - 1)
            };
            (mv, count)
        })
        .collect();

    let total: u64 = divided.iter().map(|(_, c)| c).sum();
    debug!(depth, total, "divide: total");
    divided
}
