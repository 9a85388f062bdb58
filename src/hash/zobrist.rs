//! Zobrist key domain per spec.md §3: a deterministic RNG (fixed seed)
//! produces 12x64 piece-square keys, one side-to-move key, 8 en-passant
//! file keys, and 4 castling-right keys.

use crate::bitboard::BitboardExt;
use crate::board::castle_bits::*;
use crate::board::{Board, Color, Piece};
use once_cell::sync::OnceCell;
use rand::{RngCore, SeedableRng, rngs::StdRng};

/// Fixed so repeated runs (and the determinism property, spec.md §8 #6) hash
/// identically across process invocations.
const ZOBRIST_SEED: u64 = 0x9E37_79B9_AAAC_5C87;

pub struct ZobristKeys {
    /// `[color][piece][square]`, color White=0/Black=1, piece Pawn=0..King=5.
    pub piece: [[[u64; 64]; 6]; 2],
    pub side_to_move: u64,
    /// Bit order K, Q, k, q (matches `castle_bits`).
    pub castling: [u64; 4],
    pub ep_file: [u64; 8],
}

#[inline]
pub fn xor_castling_rights_delta(hash: &mut u64, keys: &ZobristKeys, old: u8, new: u8) {
    let changed = old ^ new;
    if changed & CASTLE_WK != 0 {
        *hash ^= keys.castling[0];
    }
    if changed & CASTLE_WQ != 0 {
        *hash ^= keys.castling[1];
    }
    if changed & CASTLE_BK != 0 {
        *hash ^= keys.castling[2];
    }
    if changed & CASTLE_BQ != 0 {
        *hash ^= keys.castling[3];
    }
}

/// `Some(file)` iff en passant should contribute to the hash this ply: the
/// en-passant target is set AND side-to-move actually has a pawn that could
/// capture onto it (spec.md §3 invariant 5 / §4.C step 6).
pub fn ep_file_to_hash(board: &Board) -> Option<u8> {
    let ep = board.en_passant?;
    let s = ep.index();
    let rank = s / 8;
    // rank 2 (pseudo-row) = chess rank 6, reachable by White capturing;
    // rank 5 (pseudo-row) = chess rank 3, reachable by Black capturing.
    if rank != 2 && rank != 5 {
        return None;
    }
    let file = s % 8;
    let has_capturer = match board.side_to_move {
        Color::White => {
            let pawns = board.bb(Color::White, Piece::Pawn);
            (file != 7 && pawns.has(s + 9)) || (file != 0 && pawns.has(s + 7))
        }
        Color::Black => {
            let pawns = board.bb(Color::Black, Piece::Pawn);
            (file != 0 && pawns.has(s - 9)) || (file != 7 && pawns.has(s - 7))
        }
    };
    has_capturer.then_some(file)
}

pub fn zobrist_keys() -> &'static ZobristKeys {
    static KEYS: OnceCell<ZobristKeys> = OnceCell::new();
    KEYS.get_or_init(|| generate_zobrist_keys(StdRng::seed_from_u64(ZOBRIST_SEED)))
}

fn generate_zobrist_keys(mut rng: StdRng) -> ZobristKeys {
    #[inline]
    fn non_zero(rng: &mut StdRng) -> u64 {
        loop {
            let v = rng.next_u64();
            if v != 0 {
                return v;
            }
        }
    }

    let mut keys = ZobristKeys {
        piece: [[[0u64; 64]; 6]; 2],
        side_to_move: 0,
        castling: [0u64; 4],
        ep_file: [0u64; 8],
    };

    for c in 0..2 {
        for p in 0..6 {
            for sq in 0..64 {
                keys.piece[c][p][sq] = non_zero(&mut rng);
            }
        }
    }
    for i in 0..4 {
        keys.castling[i] = non_zero(&mut rng);
    }
    for f in 0..8 {
        keys.ep_file[f] = non_zero(&mut rng);
    }
    keys.side_to_move = non_zero(&mut rng);
    keys
}
