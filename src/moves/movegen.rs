//! Legal move generation and copy-make application (spec.md §4.D).
//!
//! Generation produces pseudo-legal candidates per piece type, then filters
//! each through the legality shortcut: skip the full post-move king-safety
//! scan when the mover isn't the king, isn't pinned, isn't an en-passant
//! capture, and the position wasn't already in check. Otherwise fall back
//! to a real attack scan on the resulting position.

use crate::bitboard::BitboardExt;
use crate::board::{Board, Color, Piece, Status, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ};
use crate::hash::zobrist::{ep_file_to_hash, xor_castling_rights_delta, zobrist_keys};
use crate::search::eval::piece_contribution;
use crate::square::Square;

use super::king::king_attacks;
use super::knight::knight_attacks;
use super::magic::magic_tables;
use super::pawn::pawn_attacks;
use super::square_control::{any_square_attacked, is_square_attacked};
use super::types::{
    Move, MoveBuffer, CAPTURE, DOUBLE_PAWN_PUSH, EN_PASSANT, KINGSIDE_CASTLE, PROMOTION,
    PROMOTION_CAPTURE, QUEENSIDE_CASTLE, QUIET_MOVE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenMode {
    /// Every legal move.
    Legal,
    /// Captures, en-passant captures, and queen promotions only — the
    /// quiescence search's move set (spec.md §4.G step 4).
    CapturesOnly,
}

const PROMO_PIECES: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

/// Bitboard of `color`'s pieces pinned to their own king, via the classic
/// x-ray technique: find sliders that would attack the king if one own
/// blocker were removed from the ray.
pub fn compute_pin_mask(board: &Board, color: Color) -> u64 {
    let king_sq = board.king_square(color).index();
    let occ = board.occupied();
    let own = board.occupancy(color);
    let enemy = color.opposite();
    let tables = magic_tables();

    let mut pinned = 0u64;

    let rook_like = board.pieces(Piece::Rook, enemy) | board.pieces(Piece::Queen, enemy);
    let king_rook_view = tables.rook_attacks(king_sq, occ);
    let rook_blockers = king_rook_view & own;
    let xray_rook = tables.rook_attacks(king_sq, occ & !rook_blockers);
    let mut rook_pinners = xray_rook & rook_like & !king_rook_view;
    while rook_pinners != 0 {
        let pinner = rook_pinners.pop_lsb();
        pinned |= between_mask(king_sq, pinner) & own;
    }

    let bishop_like = board.pieces(Piece::Bishop, enemy) | board.pieces(Piece::Queen, enemy);
    let king_bishop_view = tables.bishop_attacks(king_sq, occ);
    let bishop_blockers = king_bishop_view & own;
    let xray_bishop = tables.bishop_attacks(king_sq, occ & !bishop_blockers);
    let mut bishop_pinners = xray_bishop & bishop_like & !king_bishop_view;
    while bishop_pinners != 0 {
        let pinner = bishop_pinners.pop_lsb();
        pinned |= between_mask(king_sq, pinner) & own;
    }

    pinned
}

/// Squares strictly between `a` and `b` along a shared rank, file, or
/// diagonal. Empty if the two squares aren't aligned. Bounded at 8 steps —
/// the board has no longer ray.
fn between_mask(a: u8, b: u8) -> u64 {
    let (ar, af) = (a as i8 / 8, a as i8 % 8);
    let (br, bf) = (b as i8 / 8, b as i8 % 8);
    let dr = (br - ar).signum();
    let df = (bf - af).signum();
    let aligned = ar == br || af == bf || (ar - br).abs() == (af - bf).abs();
    if !aligned || (dr == 0 && df == 0) {
        return 0;
    }

    let mut bb = 0u64;
    let mut r = ar + dr;
    let mut f = af + df;
    let mut steps = 0;
    while (r, f) != (br, bf) && steps < 8 {
        bb |= 1u64 << (r * 8 + f) as u8;
        r += dr;
        f += df;
        steps += 1;
    }
    bb
}

/// Generate every legal move for `board.side_to_move` into `out`.
pub fn generate(board: &Board, mode: GenMode, out: &mut impl MoveBuffer) {
    out.clear_moves();
    let color = board.side_to_move;
    let pin_mask = compute_pin_mask(board, color);
    let mut candidates: Vec<Move> = Vec::with_capacity(64);

    generate_pawn_moves(board, color, mode, &mut candidates);
    generate_knight_moves(board, color, mode, &mut candidates);
    generate_slider_moves(board, color, Piece::Bishop, mode, &mut candidates);
    generate_slider_moves(board, color, Piece::Rook, mode, &mut candidates);
    generate_slider_moves(board, color, Piece::Queen, mode, &mut candidates);
    generate_king_moves(board, color, mode, &mut candidates);
    if mode == GenMode::Legal {
        generate_castling_moves(board, color, &mut candidates);
    }

    for mv in candidates {
        if is_legal(board, &mv, color, pin_mask) {
            out.push_move(mv);
        }
    }
}

/// The legality shortcut (spec.md §4.D step 5): skip the full post-move
/// scan when it provably cannot matter.
fn is_legal(board: &Board, mv: &Move, color: Color, pin_mask: u64) -> bool {
    let needs_full_scan = board.in_check
        || mv.piece == Piece::King
        || mv.is_en_passant()
        || pin_mask.has(mv.from.index());

    if !needs_full_scan {
        return true;
    }

    let child = apply_move(board, mv);
    !is_square_attacked(&child, child.king_square(color), color.opposite())
}

fn generate_pawn_moves(board: &Board, color: Color, mode: GenMode, out: &mut Vec<Move>) {
    let pawns = board.pieces(Piece::Pawn, color);
    let occ = board.occupied();
    let opp_occ = board.occupancy(color.opposite());
    let promo_rank: u8 = if color == Color::White { 0 } else { 7 };
    let (push, double_from_rank): (i16, u8) = match color {
        Color::White => (-8, 6),
        Color::Black => (8, 1),
    };

    let mut bb = pawns;
    while bb != 0 {
        let from = bb.pop_lsb();
        let from_sq = Square::from_index(from);
        let target = from as i16 + push;

        if mode == GenMode::Legal && (0..64).contains(&target) {
            let target = target as u8;
            if !occ.has(target) {
                push_pawn_moves(out, from_sq, Square::from_index(target), promo_rank, QUIET_MOVE, None);

                if from_sq.rank() == double_from_rank {
                    let double_target = (target as i16 + push) as u8;
                    if !occ.has(double_target) {
                        out.push(Move::new(
                            from_sq,
                            Square::from_index(double_target),
                            Piece::Pawn,
                            None,
                            DOUBLE_PAWN_PUSH,
                        ));
                    }
                }
            }
        }

        let attacks = pawn_attacks(from, color);
        let mut capture_targets = attacks & opp_occ;
        while capture_targets != 0 {
            let to = capture_targets.pop_lsb();
            push_pawn_moves(
                out,
                from_sq,
                Square::from_index(to),
                promo_rank,
                CAPTURE,
                PROMOTION_CAPTURE.into(),
            );
        }

        if let Some(ep) = board.en_passant {
            if attacks.has(ep.index()) {
                out.push(Move::new(from_sq, ep, Piece::Pawn, None, EN_PASSANT));
            }
        }
    }
}

fn push_pawn_moves(
    out: &mut Vec<Move>,
    from: Square,
    to: Square,
    promo_rank: u8,
    plain_flag: u8,
    promo_capture_flag: Option<u8>,
) {
    if to.rank() == promo_rank {
        let flag = promo_capture_flag.unwrap_or(PROMOTION);
        for &p in &PROMO_PIECES {
            out.push(Move::new(from, to, Piece::Pawn, Some(p), flag));
        }
    } else {
        out.push(Move::new(from, to, Piece::Pawn, None, plain_flag));
    }
}

fn generate_knight_moves(board: &Board, color: Color, mode: GenMode, out: &mut Vec<Move>) {
    let own = board.occupancy(color);
    let opp = board.occupancy(color.opposite());
    let mut bb = board.pieces(Piece::Knight, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        let from_sq = Square::from_index(from);
        let mut targets = knight_attacks(from) & !own;
        if mode == GenMode::CapturesOnly {
            targets &= opp;
        }
        emit_piece_moves(out, from_sq, Piece::Knight, targets, opp);
    }
}

fn generate_king_moves(board: &Board, color: Color, mode: GenMode, out: &mut Vec<Move>) {
    let own = board.occupancy(color);
    let opp = board.occupancy(color.opposite());
    let from = board.king_square(color).index();
    let from_sq = Square::from_index(from);
    let mut targets = king_attacks(from) & !own;
    if mode == GenMode::CapturesOnly {
        targets &= opp;
    }
    emit_piece_moves(out, from_sq, Piece::King, targets, opp);
}

fn generate_slider_moves(
    board: &Board,
    color: Color,
    piece: Piece,
    mode: GenMode,
    out: &mut Vec<Move>,
) {
    let own = board.occupancy(color);
    let opp = board.occupancy(color.opposite());
    let occ = board.occupied();
    let tables = magic_tables();

    let mut bb = board.pieces(piece, color);
    while bb != 0 {
        let from = bb.pop_lsb();
        let from_sq = Square::from_index(from);
        let mut targets = match piece {
            Piece::Bishop => tables.bishop_attacks(from, occ),
            Piece::Rook => tables.rook_attacks(from, occ),
            Piece::Queen => tables.queen_attacks(from, occ),
            _ => unreachable!("generate_slider_moves called with non-slider {piece:?}"),
        } & !own;
        if mode == GenMode::CapturesOnly {
            targets &= opp;
        }
        emit_piece_moves(out, from_sq, piece, targets, opp);
    }
}

fn emit_piece_moves(out: &mut Vec<Move>, from: Square, piece: Piece, targets: u64, opp_occ: u64) {
    let mut bb = targets;
    while bb != 0 {
        let to = bb.pop_lsb();
        let flag = if opp_occ.has(to) { CAPTURE } else { QUIET_MOVE };
        out.push(Move::new(from, Square::from_index(to), piece, None, flag));
    }
}

fn generate_castling_moves(board: &Board, color: Color, out: &mut Vec<Move>) {
    if board.in_check {
        return;
    }
    let occ = board.occupied();
    let opp = color.opposite();

    match color {
        Color::White => {
            if board.has_castling(CASTLE_WK)
                && !occ.has(61)
                && !occ.has(62)
                && !any_square_attacked(board, &[Square::from_index(60), Square::from_index(61), Square::from_index(62)], opp)
            {
                out.push(Move::new(
                    Square::from_index(60),
                    Square::from_index(62),
                    Piece::King,
                    None,
                    KINGSIDE_CASTLE,
                ));
            }
            if board.has_castling(CASTLE_WQ)
                && !occ.has(59)
                && !occ.has(58)
                && !occ.has(57)
                && !any_square_attacked(board, &[Square::from_index(60), Square::from_index(59), Square::from_index(58)], opp)
            {
                out.push(Move::new(
                    Square::from_index(60),
                    Square::from_index(58),
                    Piece::King,
                    None,
                    QUEENSIDE_CASTLE,
                ));
            }
        }
        Color::Black => {
            if board.has_castling(CASTLE_BK)
                && !occ.has(5)
                && !occ.has(6)
                && !any_square_attacked(board, &[Square::from_index(4), Square::from_index(5), Square::from_index(6)], opp)
            {
                out.push(Move::new(
                    Square::from_index(4),
                    Square::from_index(6),
                    Piece::King,
                    None,
                    KINGSIDE_CASTLE,
                ));
            }
            if board.has_castling(CASTLE_BQ)
                && !occ.has(3)
                && !occ.has(2)
                && !occ.has(1)
                && !any_square_attacked(board, &[Square::from_index(4), Square::from_index(3), Square::from_index(2)], opp)
            {
                out.push(Move::new(
                    Square::from_index(4),
                    Square::from_index(2),
                    Piece::King,
                    None,
                    QUEENSIDE_CASTLE,
                ));
            }
        }
    }
}

/// Apply `mv` to `board`, returning a brand-new child position. Every
/// derived field — bitboards, mailbox, zobrist, material/PSQ, phase,
/// in-check — is recomputed incrementally from `board`'s own values
/// (spec.md §4.C). There is no undo: each child is independent.
pub fn apply_move(board: &Board, mv: &Move) -> Board {
    let mut child = board.clone();
    let color = board.side_to_move;
    let opp = color.opposite();
    let keys = zobrist_keys();

    let old_castling = child.castling_rights;
    let old_ep_file = ep_file_to_hash(board);

    let moving_piece = mv.piece;
    let from_bb = child.bb(color, moving_piece);
    child.set_bb(color, moving_piece, from_bb.without(mv.from.index()));
    child.zobrist ^= keys.piece[color as usize][moving_piece as usize][mv.from.index() as usize];
    let (mg, eg) = piece_contribution(color, moving_piece, mv.from.index());
    child.mg_eval -= mg;
    child.eg_eval -= eg;

    if mv.is_en_passant() {
        let captured_sq = match color {
            Color::White => mv.to.index() + 8,
            Color::Black => mv.to.index() - 8,
        };
        let captured_bb = child.bb(opp, Piece::Pawn);
        child.set_bb(opp, Piece::Pawn, captured_bb.without(captured_sq));
        child.zobrist ^= keys.piece[opp as usize][Piece::Pawn as usize][captured_sq as usize];
        let (cmg, ceg) = piece_contribution(opp, Piece::Pawn, captured_sq);
        child.mg_eval -= cmg;
        child.eg_eval -= ceg;
    } else if mv.is_capture() {
        if let Some((_, captured_piece)) = board.piece_at(mv.to) {
            let captured_bb = child.bb(opp, captured_piece);
            child.set_bb(opp, captured_piece, captured_bb.without(mv.to.index()));
            child.zobrist ^= keys.piece[opp as usize][captured_piece as usize][mv.to.index() as usize];
            let (cmg, ceg) = piece_contribution(opp, captured_piece, mv.to.index());
            child.mg_eval -= cmg;
            child.eg_eval -= ceg;
            child.phase = child.phase.saturating_sub(captured_piece.phase_weight());

            revoke_castling_on_rook_capture(&mut child, mv.to.index());
        }
    }

    let placed_piece = mv.promotion.unwrap_or(moving_piece);
    let to_bb = child.bb(color, placed_piece);
    child.set_bb(color, placed_piece, to_bb.with(mv.to.index()));
    child.zobrist ^= keys.piece[color as usize][placed_piece as usize][mv.to.index() as usize];
    let (mg2, eg2) = piece_contribution(color, placed_piece, mv.to.index());
    child.mg_eval += mg2;
    child.eg_eval += eg2;

    if mv.is_castling() {
        let (rook_from, rook_to) = castling_rook_squares(color, mv.is_kingside_castle());
        let rook_bb = child.bb(color, Piece::Rook);
        child.set_bb(
            color,
            Piece::Rook,
            rook_bb.without(rook_from).with(rook_to),
        );
        child.zobrist ^= keys.piece[color as usize][Piece::Rook as usize][rook_from as usize];
        child.zobrist ^= keys.piece[color as usize][Piece::Rook as usize][rook_to as usize];
        let (rmg1, reg1) = piece_contribution(color, Piece::Rook, rook_from);
        let (rmg2, reg2) = piece_contribution(color, Piece::Rook, rook_to);
        child.mg_eval += rmg2 - rmg1;
        child.eg_eval += reg2 - reg1;
    }

    revoke_castling_on_move(&mut child, color, moving_piece, mv.from.index());

    xor_castling_rights_delta(&mut child.zobrist, &keys, old_castling, child.castling_rights);

    child.halfmove_clock = if moving_piece == Piece::Pawn || mv.is_capture() || mv.is_en_passant() {
        0
    } else {
        board.halfmove_clock + 1
    };

    // Flip side to move before computing the new en-passant hash
    // contribution: `ep_file_to_hash` asks "can side-to-move capture here?"
    // and that question is now about the opponent, not the mover.
    child.side_to_move = opp;
    child.zobrist ^= keys.side_to_move;

    child.en_passant = if mv.is_double_pawn_push() {
        Some(Square::from_index(match color {
            Color::White => mv.to.index() + 8,
            Color::Black => mv.to.index() - 8,
        }))
    } else {
        None
    };
    if let Some(new_ep_file) = ep_file_to_hash(&child) {
        child.zobrist ^= keys.ep_file[new_ep_file as usize];
    }
    if let Some(old_file) = old_ep_file {
        child.zobrist ^= keys.ep_file[old_file as usize];
    }

    child.last_move = Some(*mv);
    child.status = Status::Unknown;
    child.in_check = is_square_attacked(&child, child.king_square(opp), color);

    child
}

fn castling_rook_squares(color: Color, kingside: bool) -> (u8, u8) {
    match (color, kingside) {
        (Color::White, true) => (63, 61),
        (Color::White, false) => (56, 59),
        (Color::Black, true) => (7, 5),
        (Color::Black, false) => (0, 3),
    }
}

fn revoke_castling_on_move(board: &mut Board, color: Color, piece: Piece, from: u8) {
    match (color, piece) {
        (Color::White, Piece::King) => board.castling_rights &= !(CASTLE_WK | CASTLE_WQ),
        (Color::Black, Piece::King) => board.castling_rights &= !(CASTLE_BK | CASTLE_BQ),
        (Color::White, Piece::Rook) if from == 63 => board.castling_rights &= !CASTLE_WK,
        (Color::White, Piece::Rook) if from == 56 => board.castling_rights &= !CASTLE_WQ,
        (Color::Black, Piece::Rook) if from == 7 => board.castling_rights &= !CASTLE_BK,
        (Color::Black, Piece::Rook) if from == 0 => board.castling_rights &= !CASTLE_BQ,
        _ => {}
    }
}

fn revoke_castling_on_rook_capture(board: &mut Board, captured_sq: u8) {
    match captured_sq {
        63 => board.castling_rights &= !CASTLE_WK,
        56 => board.castling_rights &= !CASTLE_WQ,
        7 => board.castling_rights &= !CASTLE_BK,
        0 => board.castling_rights &= !CASTLE_BQ,
        _ => {}
    }
}

/// Terminal status at a position given its already-generated legal move
/// list (spec.md §4.D / §3 `Status`). Non-goal draws (repetition, fifty
/// move, insufficient material) are never claimed here.
pub fn terminal_status(board: &Board, legal_moves: &[Move]) -> Status {
    if !legal_moves.is_empty() {
        return Status::Unknown;
    }
    if board.in_check {
        match board.side_to_move {
            Color::White => Status::BlackMates,
            Color::Black => Status::WhiteMates,
        }
    } else {
        Status::Stalemate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_has_twenty_legal_moves() {
        let b = Board::new();
        let mut moves = Vec::new();
        generate(&b, GenMode::Legal, &mut moves);
        assert_eq!(moves.len(), 20);
    }

    #[test]
    fn pinned_rook_cannot_move_off_the_pin_ray() {
        let b: Board = "4k3/8/8/8/8/4r3/4R3/4K3 w - - 0 1".parse().unwrap();
        let mut moves = Vec::new();
        generate(&b, GenMode::Legal, &mut moves);
        // the white rook on e2 is pinned by the black rook on e3; it may
        // only move along the e-file, never sideways.
        let sideways = moves
            .iter()
            .any(|m| m.piece == Piece::Rook && m.from.file() == 4 && m.to.file() != 4);
        assert!(!sideways);
    }

    #[test]
    fn king_in_check_must_respond() {
        let b: Board = "4k3/8/8/8/8/8/4r3/4K3 w - - 0 1".parse().unwrap();
        assert!(b.in_check);
        let mut moves = Vec::new();
        generate(&b, GenMode::Legal, &mut moves);
        assert!(!moves.is_empty());
        for mv in &moves {
            let child = apply_move(&b, mv);
            assert!(!is_square_attacked(&child, child.king_square(Color::White), Color::Black));
        }
    }

    #[test]
    fn checkmate_position_has_no_legal_moves() {
        // fool's mate
        let b: Board = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3"
            .parse()
            .unwrap();
        let mut moves = Vec::new();
        generate(&b, GenMode::Legal, &mut moves);
        assert_eq!(terminal_status(&b, &moves), Status::BlackMates);
    }

    #[test]
    fn white_can_castle_kingside_when_path_is_clear() {
        let b: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let mut moves = Vec::new();
        generate(&b, GenMode::Legal, &mut moves);
        assert!(moves.iter().any(|m| m.is_kingside_castle()));
    }

    #[test]
    fn castling_through_check_is_illegal() {
        let b: Board = "r3k2r/b7/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let mut moves = Vec::new();
        generate(&b, GenMode::Legal, &mut moves);
        // the bishop on a7 covers g1 via the long diagonal, the king's
        // kingside transit square
        assert!(!moves.iter().any(|m| m.is_kingside_castle()));
    }

    #[test]
    fn en_passant_capture_is_generated() {
        let b: Board = "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1".parse().unwrap();
        let mut moves = Vec::new();
        generate(&b, GenMode::Legal, &mut moves);
        assert!(moves.iter().any(|m| m.is_en_passant()));
    }

    #[test]
    fn quiescence_mode_only_yields_captures_and_promotions() {
        let b: Board = "4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1".parse().unwrap();
        let mut moves = Vec::new();
        generate(&b, GenMode::CapturesOnly, &mut moves);
        assert!(moves.iter().all(|m| m.is_capture() || m.is_promotion() || m.is_en_passant()));
        assert!(!moves.is_empty());
    }
}
