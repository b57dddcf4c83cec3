//! # Stats — Phase Timing and Size Report
//!
//! Each phase of a run (sieve, split, reduce, div/sqrt, mul) gets a
//! [`PhaseTimer`]. Rayon tasks add their own elapsed time to the timer's busy
//! counter through an atomic, so the timer can be shared by reference across
//! workers without a lock. When the phase ends the busy total is compared
//! with the wall-clock span: their ratio is the effective parallel speedup.
//!
//! ```text
//!   split     busy =     41.20s  wall =     5.31s  factor =   7.8
//! ```
//!
//! [`RunStats`] collects the finished phases plus the size of the final P and
//! Q, and is serializable for `--json-stats`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Busy/wall accumulator for one phase.
pub struct PhaseTimer {
    busy_nanos: AtomicU64,
    start: Instant,
}

impl PhaseTimer {
    pub fn start() -> Self {
        PhaseTimer {
            busy_nanos: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    /// Add one task's elapsed time to the busy total.
    pub fn record(&self, elapsed: Duration) {
        self.busy_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Run `f`, recording its duration.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.record(started.elapsed());
        out
    }

    pub fn finish(self, name: &'static str) -> PhaseStats {
        let wall_secs = self.start.elapsed().as_secs_f64();
        let busy_secs = self.busy_nanos.load(Ordering::Relaxed) as f64 / 1e9;
        PhaseStats {
            name,
            // A phase with no recorded tasks ran on one thread the whole time.
            busy_secs: busy_secs.max(wall_secs),
            wall_secs,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PhaseStats {
    pub name: &'static str,
    pub busy_secs: f64,
    pub wall_secs: f64,
}

impl PhaseStats {
    /// Busy time over wall time; 1.0 for phases too short to measure.
    pub fn factor(&self) -> f64 {
        if self.wall_secs > 0.0 && self.busy_secs > 0.0 {
            self.busy_secs / self.wall_secs
        } else {
            1.0
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RunStats {
    pub digits: u64,
    pub terms: u64,
    pub shards: usize,
    pub workers: usize,
    pub precision_bits: u32,
    pub sieve_limit: u32,
    pub sieve_bytes: usize,
    pub p_digits: u64,
    pub q_digits: u64,
    pub phases: Vec<PhaseStats>,
}

impl RunStats {
    pub fn push(&mut self, phase: PhaseStats) {
        self.phases.push(phase);
    }

    pub fn total_busy_secs(&self) -> f64 {
        self.phases.iter().map(|p| p.busy_secs).sum()
    }

    pub fn total_wall_secs(&self) -> f64 {
        self.phases.iter().map(|p| p.wall_secs).sum()
    }

    /// Log every phase, the totals, and the P/Q size ratios.
    pub fn log(&self) {
        for phase in &self.phases {
            info!(
                phase = phase.name,
                busy = format_args!("{:.2}s", phase.busy_secs),
                wall = format_args!("{:.2}s", phase.wall_secs),
                factor = format_args!("{:.1}", phase.factor()),
                "phase complete"
            );
        }
        let (busy, wall) = (self.total_busy_secs(), self.total_wall_secs());
        info!(
            busy = format_args!("{:.2}s", busy),
            wall = format_args!("{:.2}s", wall),
            busy_min = format_args!("{:.2}m", busy / 60.0),
            wall_min = format_args!("{:.2}m", wall / 60.0),
            "total"
        );
        let digits = self.digits.max(1) as f64;
        info!(
            p_digits = self.p_digits,
            p_ratio = format_args!("{:.6}", self.p_digits as f64 / digits),
            q_digits = self.q_digits,
            q_ratio = format_args!("{:.6}", self.q_digits as f64 / digits),
            "final P/Q sizes"
        );
    }
}

#[cfg(test)]
mod tests {
    //! Timer accumulation is exercised from many threads at once to confirm
    //! the atomic busy counter never loses an update.

    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn busy_time_accumulates_across_threads() {
        let timer = Arc::new(PhaseTimer::start());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let t = Arc::clone(&timer);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        t.record(Duration::from_micros(1));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let timer = Arc::try_unwrap(timer).ok().unwrap();
        assert_eq!(timer.busy_nanos.load(Ordering::Relaxed), 8_000_000);
    }

    #[test]
    fn finished_phase_never_reports_busy_below_wall() {
        let timer = PhaseTimer::start();
        thread::sleep(Duration::from_millis(5));
        let phase = timer.finish("sieve");
        assert!(phase.wall_secs >= 0.005);
        assert!(phase.busy_secs >= phase.wall_secs);
        assert!(phase.factor() >= 1.0);
    }

    #[test]
    fn time_records_closure_duration() {
        let timer = PhaseTimer::start();
        let v = timer.time(|| {
            thread::sleep(Duration::from_millis(2));
            42
        });
        assert_eq!(v, 42);
        assert!(timer.busy_nanos.load(Ordering::Relaxed) >= 2_000_000);
    }

    #[test]
    fn zero_wall_time_has_unit_factor() {
        let phase = PhaseStats {
            name: "sum",
            busy_secs: 0.0,
            wall_secs: 0.0,
        };
        assert_eq!(phase.factor(), 1.0);
    }

    #[test]
    fn totals_sum_phases_and_serialize() {
        let mut stats = RunStats {
            digits: 1000,
            ..RunStats::default()
        };
        stats.push(PhaseStats {
            name: "split",
            busy_secs: 4.0,
            wall_secs: 1.0,
        });
        stats.push(PhaseStats {
            name: "reduce",
            busy_secs: 1.0,
            wall_secs: 0.5,
        });
        assert_eq!(stats.total_busy_secs(), 5.0);
        assert_eq!(stats.total_wall_secs(), 1.5);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["digits"], 1000);
        assert_eq!(json["phases"][0]["name"], "split");
        stats.log();
    }
}
