//! UCI control loop (spec.md §4.H/§5): a foreground thread that reads stdin
//! and parses commands, and a background worker that owns the search. The
//! two communicate through a shared `EngineState` behind a `Mutex`, woken by
//! a `Condvar`, with cancellation carried separately by an `Arc<AtomicBool>`
//! so `stop` never has to wait on the lock a running search is busy with.

mod time_control;

use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::board::Board;
use crate::moves::movegen::{apply_move, generate, GenMode};
use crate::moves::Move;
use crate::search::{SearchLimits, Searcher};
use crate::search::tt::TranspositionTable;

use time_control::{allocate, GoTimes};

const DEFAULT_TT_MB: usize = 64;
const NAME: &str = "corvid";
const AUTHOR: &str = "corvid contributors";

/// Request handed from the input thread to the search worker.
enum Job {
    Go { board: Board, max_depth: u8, deadline: Instant },
    SetHash(usize),
}

/// State shared between the two threads, guarded by one mutex.
struct Shared {
    job: Option<Job>,
    quit: bool,
    busy: bool,
}

struct Engine {
    shared: Mutex<Shared>,
    cv: Condvar,
    stop: Arc<AtomicBool>,
}

/// Top-level two-thread controller: spawns the worker, then runs the
/// stdin-reading loop on the calling thread until `quit`.
pub struct UciController {
    engine: Arc<Engine>,
}

impl UciController {
    pub fn new() -> Self {
        UciController {
            engine: Arc::new(Engine {
                shared: Mutex::new(Shared { job: None, quit: false, busy: false }),
                cv: Condvar::new(),
                stop: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    pub fn run(self) {
        let worker_engine = self.engine.clone();
        let worker = thread::spawn(move || search_worker(worker_engine));

        let stdin = io::stdin();
        let mut board = Board::new();
        let mut out = io::stdout();

        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();

            match parts[0] {
                "uci" => {
                    writeln!(out, "id name {}", NAME).ok();
                    writeln!(out, "id author {}", AUTHOR).ok();
                    writeln!(out, "uciok").ok();
                    out.flush().ok();
                }
                "isready" => {
                    writeln!(out, "readyok").ok();
                    out.flush().ok();
                }
                "ucinewgame" => {
                    self.stop_and_wait();
                    board = Board::new();
                }
                "position" => {
                    self.stop_and_wait();
                    if let Some(b) = parse_position(&parts) {
                        board = b;
                    }
                }
                "go" => {
                    self.start_go(&parts, &board);
                }
                "setoption" => {
                    self.handle_setoption(&parts);
                }
                "stop" => {
                    self.engine.stop.store(true, Ordering::SeqCst);
                }
                "d" => {
                    writeln!(out, "{}", board).ok();
                    out.flush().ok();
                }
                "perft" => {
                    if let Some(depth) = parts.get(1).and_then(|s| s.parse::<u8>().ok()) {
                        run_perft_divide(&board, depth, &mut out);
                    }
                }
                "quit" => {
                    self.stop_and_wait();
                    let mut shared = self.engine.shared.lock().unwrap();
                    shared.quit = true;
                    self.engine.cv.notify_all();
                    break;
                }
                _ => {}
            }
        }

        worker.join().ok();
    }

    /// Block until any in-flight search has acknowledged `stop` and gone
    /// idle. Must precede any mutation of `board` or a fresh `go`, per
    /// the UCI contract that `position`/`go` never race an active search.
    fn stop_and_wait(&self) {
        self.engine.stop.store(true, Ordering::SeqCst);
        let shared = self.engine.shared.lock().unwrap();
        let _shared = self
            .engine
            .cv
            .wait_while(shared, |s| s.busy)
            .unwrap();
        self.engine.stop.store(false, Ordering::SeqCst);
    }

    fn start_go(&self, parts: &[&str], board: &Board) {
        self.stop_and_wait();

        let times = GoTimes::parse(parts);
        let (max_depth, deadline) = if let Some(d) = times.depth {
            (d, Instant::now() + Duration::from_secs(3600))
        } else if times.infinite {
            (u8::MAX, Instant::now() + Duration::from_secs(365 * 24 * 3600))
        } else {
            let ms = allocate(&times, board.side_to_move);
            (u8::MAX, Instant::now() + Duration::from_millis(ms))
        };

        let mut shared = self.engine.shared.lock().unwrap();
        shared.job = Some(Job::Go {
            board: board.clone(),
            max_depth,
            deadline,
        });
        self.engine.cv.notify_all();
    }

    /// `setoption name Hash value <MB>` resizes the transposition table;
    /// every other option is accepted and ignored per spec.md §6.
    fn handle_setoption(&self, parts: &[&str]) {
        let name_idx = parts.iter().position(|&p| p == "name");
        let value_idx = parts.iter().position(|&p| p == "value");
        let (Some(name_idx), Some(value_idx)) = (name_idx, value_idx) else {
            return;
        };
        let name = parts[name_idx + 1..value_idx].join(" ");
        if !name.eq_ignore_ascii_case("Hash") {
            return;
        }
        let Some(mb) = parts.get(value_idx + 1).and_then(|s| s.parse::<usize>().ok()) else {
            return;
        };

        self.stop_and_wait();
        let mut shared = self.engine.shared.lock().unwrap();
        shared.job = Some(Job::SetHash(mb));
        self.engine.cv.notify_all();
    }
}

fn search_worker(engine: Arc<Engine>) {
    let mut tt = TranspositionTable::new(DEFAULT_TT_MB);
    let mut out = io::stdout();

    loop {
        let job = {
            let mut shared = engine.shared.lock().unwrap();
            loop {
                if shared.quit {
                    return;
                }
                if let Some(job) = shared.job.take() {
                    shared.busy = true;
                    break job;
                }
                shared = engine.cv.wait(shared).unwrap();
            }
        };

        let (board, max_depth, deadline) = match job {
            Job::Go { board, max_depth, deadline } => (board, max_depth, deadline),
            Job::SetHash(mb) => {
                tt = TranspositionTable::new(mb);
                let mut shared = engine.shared.lock().unwrap();
                shared.busy = false;
                engine.cv.notify_all();
                continue;
            }
        };

        engine.stop.store(false, Ordering::SeqCst);

        let limits = SearchLimits { deadline, stop: engine.stop.clone() };
        let mut searcher = Searcher::new(&limits, &mut tt);
        let info = searcher.run(&board, max_depth, |info| {
            let pv: Vec<String> = info.pv.iter().map(|m| m.to_uci()).collect();
            let score_str = match info.mate {
                Some(m) => format!("mate {}", m),
                None => format!("cp {}", info.score_cp),
            };
            write!(
                out,
                "info depth {} score {} nodes {} nps {} time {} hashfull {} pv",
                info.depth, score_str, info.nodes, info.nps, info.time_ms, info.hashfull
            )
            .ok();
            for mv in &pv {
                write!(out, " {}", mv).ok();
            }
            writeln!(out).ok();
            out.flush().ok();
        });

        let best = info.pv.first().copied();
        match best {
            Some(mv) => writeln!(out, "bestmove {}", mv.to_uci()).ok(),
            None => writeln!(out, "bestmove 0000").ok(),
        };
        out.flush().ok();

        let mut shared = engine.shared.lock().unwrap();
        shared.busy = false;
        engine.cv.notify_all();
    }
}

fn parse_position(parts: &[&str]) -> Option<Board> {
    if parts.len() < 2 {
        return None;
    }
    let mut idx = 1;
    let mut board = if parts[1] == "startpos" {
        idx = 2;
        Board::new()
    } else if parts[1] == "fen" {
        let fen_start = 2;
        let mut fen_end = parts.len();
        for (i, &p) in parts.iter().enumerate().skip(fen_start) {
            if p == "moves" {
                fen_end = i;
                break;
            }
        }
        idx = fen_end;
        let fen = parts[fen_start..fen_end].join(" ");
        match Board::from_str(&fen) {
            Ok(b) => b,
            Err(e) => {
                warn!(fen, error = %e, "invalid FEN in position command, leaving root unchanged");
                return None;
            }
        }
    } else {
        warn!(command = parts[1], "unrecognized position subcommand");
        return None;
    };

    if idx < parts.len() && parts[idx] == "moves" {
        for tok in &parts[idx + 1..] {
            match find_move_by_uci(&board, tok) {
                Some(mv) => board = apply_move(&board, &mv),
                None => warn!(mv = tok, "illegal move in position command, skipping"),
            }
        }
    }

    Some(board)
}

fn find_move_by_uci(board: &Board, uci: &str) -> Option<Move> {
    let mut moves = Vec::new();
    generate(board, GenMode::Legal, &mut moves);
    moves.into_iter().find(|m| m.to_uci() == uci)
}

/// `perft <depth>` debug aid: per-root-move counts plus the aggregate,
/// the same shape engines commonly expose alongside `d`.
fn run_perft_divide(board: &Board, depth: u8, out: &mut impl Write) {
    let divided = crate::moves::perft::perft_divide(board, depth);
    let mut total = 0u64;
    for (mv, count) in &divided {
        writeln!(out, "{}: {}", mv.to_uci(), count).ok();
        total += count;
    }
    writeln!(out, "\nNodes searched: {}", total).ok();
    out.flush().ok();
}
