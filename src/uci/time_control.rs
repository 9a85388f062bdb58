//! `go` time-control parsing and the per-move budget formula (spec.md §4.H).

use crate::board::Color;

#[derive(Default)]
pub struct GoTimes {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: u64,
    pub binc: u64,
    pub movetime: Option<u64>,
    pub depth: Option<u8>,
    pub infinite: bool,
}

impl GoTimes {
    pub fn parse(parts: &[&str]) -> Self {
        let mut g = GoTimes::default();
        let mut i = 1;
        while i < parts.len() {
            match parts[i] {
                "wtime" => {
                    g.wtime = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "btime" => {
                    g.btime = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "winc" => {
                    g.winc = parts.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(0);
                    i += 2;
                }
                "binc" => {
                    g.binc = parts.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(0);
                    i += 2;
                }
                "movetime" => {
                    g.movetime = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "depth" => {
                    g.depth = parts.get(i + 1).and_then(|s| s.parse().ok());
                    i += 2;
                }
                "infinite" => {
                    g.infinite = true;
                    i += 1;
                }
                _ => i += 1,
            }
        }
        g
    }
}

/// Milliseconds to allocate to the current move, per the fixed formula:
/// reserve the increment, spend 1/25th of what's left plus the increment
/// back, clamped to at least a second and at most half the clock.
pub fn allocate(times: &GoTimes, side: Color) -> u64 {
    if let Some(ms) = times.movetime {
        return ms;
    }

    let (my_time, inc) = match side {
        Color::White => (times.wtime, times.winc),
        Color::Black => (times.btime, times.binc),
    };

    let mut t = match my_time {
        Some(t) => t,
        None => return 1000,
    };

    if t > inc {
        t -= inc;
    }
    let alloc = t / 25 + inc;

    alloc.clamp(1000, (t / 2).max(1000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movetime_is_exact() {
        let times = GoTimes {
            movetime: Some(2500),
            ..Default::default()
        };
        assert_eq!(allocate(&times, Color::White), 2500);
    }

    #[test]
    fn clamps_to_minimum_one_second() {
        let times = GoTimes {
            wtime: Some(500),
            winc: 0,
            ..Default::default()
        };
        assert_eq!(allocate(&times, Color::White), 1000);
    }

    #[test]
    fn never_spends_more_than_half_the_clock() {
        let times = GoTimes {
            wtime: Some(100_000),
            winc: 0,
            ..Default::default()
        };
        let alloc = allocate(&times, Color::White);
        assert!(alloc <= 50_000);
    }

    #[test]
    fn uses_black_clock_for_black_to_move() {
        let times = GoTimes {
            wtime: Some(60_000),
            btime: Some(10_000),
            winc: 0,
            binc: 0,
            ..Default::default()
        };
        let alloc = allocate(&times, Color::Black);
        assert!(alloc < 10_000);
    }
}
