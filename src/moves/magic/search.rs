//! Deterministic magic-number search. Fixed-seed so the tables built at
//! process startup are identical across runs (spec.md §4.A).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use super::attacks::{bishop_attacks_per_square, rook_attacks_per_square};

fn random_sparse_u64(rng: &mut StdRng) -> u64 {
    rng.random::<u64>() & rng.random::<u64>() & rng.random::<u64>()
}

/// Enumerate every blocker subset of `mask` via the Carry-Rippler trick.
pub fn subsets_of(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1usize << mask.count_ones().min(20));
    let mut subset = 0u64;
    loop {
        subsets.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }
    subsets
}

fn is_magic_candidate_valid(
    mask: u64,
    magic: u64,
    shift: u8,
    subsets: &[u64],
    is_rook: bool,
    sq: u8,
) -> bool {
    let mut seen: HashMap<u64, u64> = HashMap::with_capacity(subsets.len());
    for &occ in subsets {
        let attacks = if is_rook {
            rook_attacks_per_square(sq, occ)
        } else {
            bishop_attacks_per_square(sq, occ)
        };
        let index = occ.wrapping_mul(magic) >> shift;
        match seen.get(&index) {
            Some(&existing) if existing != attacks => return false,
            _ => {
                seen.insert(index, attacks);
            }
        }
    }
    true
}

/// Random sparse-multiplier search for a collision-free magic, bounded at
/// a million attempts per square (spec.md §4.A — tables built at startup,
/// never loaded from disk).
pub fn find_magic_number_for_square(sq: u8, mask: u64, is_rook: bool, seed: u64) -> u64 {
    let bits = mask.count_ones() as u8;
    let shift = 64 - bits;
    let subsets = subsets_of(mask);
    let mut rng = StdRng::seed_from_u64(seed ^ (sq as u64).wrapping_mul(0x9E37_79B9));

    for _ in 0..1_000_000 {
        let candidate = random_sparse_u64(&mut rng);
        if (mask.wrapping_mul(candidate) & 0xFF00_0000_0000_0000).count_ones() < 6 {
            continue;
        }
        if is_magic_candidate_valid(mask, candidate, shift, &subsets, is_rook, sq) {
            return candidate;
        }
    }
    panic!("failed to find magic number for square {sq} (rook={is_rook})");
}
