use super::attacks::{
    bishop_attacks_per_square, bishop_relevant_mask, rook_attacks_per_square, rook_relevant_mask,
};
use super::search::{find_magic_number_for_square, subsets_of};
use super::structs::{MagicEntry, MagicTables};

const MAGIC_SEED: u64 = 0x5EED_1234_ABCD_EF01;

fn build_table(is_rook: bool) -> ([MagicEntry; 64], Vec<u64>) {
    let mut entries = [MagicEntry {
        mask: 0,
        magic: 0,
        shift: 0,
        offset: 0,
    }; 64];
    let mut table = Vec::new();

    for sq in 0..64u8 {
        let mask = if is_rook {
            rook_relevant_mask(sq)
        } else {
            bishop_relevant_mask(sq)
        };
        let bits = mask.count_ones() as u8;
        let shift = 64 - bits;
        let magic = find_magic_number_for_square(sq, mask, is_rook, MAGIC_SEED);

        let offset = table.len() as u32;
        table.resize(table.len() + (1usize << bits), 0u64);

        for occ in subsets_of(mask) {
            let attacks = if is_rook {
                rook_attacks_per_square(sq, occ)
            } else {
                bishop_attacks_per_square(sq, occ)
            };
            let index = offset as usize + ((occ.wrapping_mul(magic)) >> shift) as usize;
            table[index] = attacks;
        }

        entries[sq as usize] = MagicEntry {
            mask,
            magic,
            shift,
            offset,
        };
    }

    (entries, table)
}

/// Build the full rook+bishop magic tables at startup (spec.md §4.A).
pub fn generate_magic_tables() -> MagicTables {
    let (rook_entries, rook_table) = build_table(true);
    let (bishop_entries, bishop_table) = build_table(false);
    MagicTables {
        rook_entries,
        bishop_entries,
        rook_table,
        bishop_table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tables_match_on_the_fly_attacks_for_every_square() {
        let tables = generate_magic_tables();
        for sq in 0..64u8 {
            let mask = rook_relevant_mask(sq);
            for occ in subsets_of(mask) {
                assert_eq!(
                    tables.rook_attacks(sq, occ),
                    rook_attacks_per_square(sq, occ),
                    "rook mismatch at square {sq}"
                );
            }
        }
    }
}
