pub mod attacks;
pub mod precompute;
pub mod search;
pub mod structs;

pub use structs::MagicTables;

use once_cell::sync::Lazy;

static TABLES: Lazy<MagicTables> = Lazy::new(precompute::generate_magic_tables);

/// Global, lazily-built magic bitboard tables (spec.md §4.A). Built once on
/// first use and shared across the whole process.
pub fn magic_tables() -> &'static MagicTables {
    &TABLES
}
