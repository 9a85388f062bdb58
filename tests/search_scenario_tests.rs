//! End-to-end UCI scenarios driven directly against `Searcher`/`TranspositionTable`
//! rather than a subprocess, the same way the search surface is exercised
//! elsewhere in this crate (spec.md §8 "End-to-end UCI scenarios" 2-5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use corvid::board::Board;
use corvid::moves::movegen::{generate, GenMode};
use corvid::search::tt::TranspositionTable;
use corvid::search::{SearchLimits, Searcher};

fn infinite_limits() -> (Arc<AtomicBool>, SearchLimits) {
    let stop = Arc::new(AtomicBool::new(false));
    let limits = SearchLimits::infinite(stop.clone());
    (stop, limits)
}

/// Scenario 2: forced mate in 1, back-rank.
#[test]
fn scenario_2_finds_forced_mate_in_one() {
    let b: Board = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1".parse().unwrap();
    let (_stop, limits) = infinite_limits();
    let mut tt = TranspositionTable::new(1);
    let mut searcher = Searcher::new(&limits, &mut tt);
    let info = searcher.run(&b, 3, |_| {});

    assert_eq!(info.mate, Some(1));
    let best = info.pv.first().expect("a move was found");
    assert_eq!(best.to_uci(), "a1a8");
}

/// Scenario 3: stalemate must be recognized, not crash, and yield no move.
#[test]
fn scenario_3_stalemate_yields_no_bestmove() {
    let b: Board = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1".parse().unwrap();
    let mut moves = Vec::new();
    generate(&b, GenMode::Legal, &mut moves);
    assert!(moves.is_empty());

    let (_stop, limits) = infinite_limits();
    let mut tt = TranspositionTable::new(1);
    let mut searcher = Searcher::new(&limits, &mut tt);
    let info = searcher.run(&b, 1, |_| {});

    assert_eq!(info.score_cp, 0);
    assert!(info.pv.is_empty(), "no legal moves means no bestmove sentinel");
}

/// Scenario 4: an infinite search stopped mid-flight must still hand back
/// the best move of its last fully completed iteration, promptly.
#[test]
fn scenario_4_stop_returns_promptly_with_a_legal_move() {
    let b = Board::new();
    let stop = Arc::new(AtomicBool::new(false));
    let limits = SearchLimits::infinite(stop.clone());
    let mut tt = TranspositionTable::new(1);
    let mut searcher = Searcher::new(&limits, &mut tt);

    let stop_clone = stop.clone();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        stop_clone.store(true, Ordering::SeqCst);
    });

    let start = Instant::now();
    let info = searcher.run(&b, u8::MAX, |_| {});
    let elapsed = start.elapsed();

    stopper.join().unwrap();
    assert!(!info.pv.is_empty(), "expected a legal move from a completed iteration");
    assert!(elapsed < Duration::from_millis(500), "stop took too long: {elapsed:?}");
}

/// Scenario 5: after startpos + e2e4 e7e5 g1f3 b8c6, the root move list must
/// contain the Ruy Lopez bishop move and exclude the already-played e2e4.
#[test]
fn scenario_5_move_list_after_ruy_lopez_setup() {
    use corvid::moves::movegen::apply_move;
    use std::str::FromStr;

    let mut board = Board::from_str("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
    for uci in ["e2e4", "e7e5", "g1f3", "b8c6"] {
        let mut moves = Vec::new();
        generate(&board, GenMode::Legal, &mut moves);
        let mv = moves.iter().find(|m| m.to_uci() == uci).expect("move is legal");
        board = apply_move(&board, mv);
    }

    let mut root_moves = Vec::new();
    generate(&board, GenMode::Legal, &mut root_moves);
    let ucis: Vec<String> = root_moves.iter().map(|m| m.to_uci()).collect();

    assert!(ucis.contains(&"f1b5".to_string()));
    assert!(!ucis.contains(&"e2e4".to_string()));
}
