//! Ground-truth sliding-attack generators. Pure rank/file arithmetic, so
//! these serve both as the magic-search oracle and as the table-building
//! step (spec.md §4.A).

const ROOK_DIRS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, 1), (0, -1)];
const BISHOP_DIRS: [(i8, i8); 4] = [(-1, 1), (-1, -1), (1, 1), (1, -1)];

/// Cast a ray from `sq` in direction `(dr, df)`, stopping at and including
/// the first occupied square.
fn scan_ray(sq: u8, dr: i8, df: i8, occ: u64) -> u64 {
    let mut bb = 0u64;
    let mut rank = (sq / 8) as i8 + dr;
    let mut file = (sq % 8) as i8 + df;
    while (0..8).contains(&rank) && (0..8).contains(&file) {
        let idx = (rank * 8 + file) as u8;
        bb |= 1u64 << idx;
        if occ & (1u64 << idx) != 0 {
            break;
        }
        rank += dr;
        file += df;
    }
    bb
}

/// Same ray cast, but excludes the final square in the direction — board
/// edges never add further blocking information, so they're dropped from
/// the magic's relevant-occupancy mask.
fn scan_ray_relevant(sq: u8, dr: i8, df: i8) -> u64 {
    let mut bb = 0u64;
    let mut rank = (sq / 8) as i8 + dr;
    let mut file = (sq % 8) as i8 + df;
    while (0..8).contains(&rank) && (0..8).contains(&file) {
        let next_rank = rank + dr;
        let next_file = file + df;
        if !(0..8).contains(&next_rank) || !(0..8).contains(&next_file) {
            break;
        }
        let idx = (rank * 8 + file) as u8;
        bb |= 1u64 << idx;
        rank = next_rank;
        file = next_file;
    }
    bb
}

pub fn rook_attacks_per_square(sq: u8, occ: u64) -> u64 {
    ROOK_DIRS.iter().fold(0u64, |acc, &(dr, df)| acc | scan_ray(sq, dr, df, occ))
}

pub fn bishop_attacks_per_square(sq: u8, occ: u64) -> u64 {
    BISHOP_DIRS.iter().fold(0u64, |acc, &(dr, df)| acc | scan_ray(sq, dr, df, occ))
}

pub fn rook_relevant_mask(sq: u8) -> u64 {
    ROOK_DIRS.iter().fold(0u64, |acc, &(dr, df)| acc | scan_ray_relevant(sq, dr, df))
}

pub fn bishop_relevant_mask(sq: u8) -> u64 {
    BISHOP_DIRS.iter().fold(0u64, |acc, &(dr, df)| acc | scan_ray_relevant(sq, dr, df))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rook_on_empty_board_attacks_whole_cross() {
        // d4 in our convention: file 3, chess rank 4 -> pseudo-row 4 -> idx 4*8+3=35
        let attacks = rook_attacks_per_square(35, 0);
        assert_eq!(attacks.count_ones(), 14);
    }

    #[test]
    fn rook_relevant_mask_excludes_edges() {
        let mask = rook_relevant_mask(35);
        // none of the board-edge squares on d-file/rank-4 should appear
        assert_eq!(mask & (1u64 << 3), 0); // d8
        assert_eq!(mask & (1u64 << 59), 0); // d1
        assert_eq!(mask & (1u64 << 32), 0); // a4 (rank-4 row start, idx 4*8+0=32)
        assert_eq!(mask & (1u64 << 39), 0); // h4
    }

    #[test]
    fn bishop_attacks_stop_at_blocker() {
        let h1 = 63u8; // only the a8-h1 diagonal is on-board from here
        let e4 = 36u8;
        let attacks = bishop_attacks_per_square(h1, 1u64 << e4);
        assert_eq!(attacks.count_ones(), 3); // g2, f3, e4 — stops at the blocker
        assert_eq!(attacks & (1u64 << e4), 1u64 << e4);
    }
}
