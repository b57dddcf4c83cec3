//! # Plan — Resolving a Run Request
//!
//! Turns the raw command-line request (digits, thread count or `auto`) into
//! the concrete numbers every later phase uses: series terms, shard count,
//! worker count and floating precision. Out-of-range requests are clamped
//! rather than rejected; each clamp is logged and returned as an
//! [`Adjustment`] so callers and tests can see what changed.
//!
//! Thread requests resolve as
//!
//! ```text
//!   applied = clamp(requested, 1, cores)      then
//!   applied = 1                   if terms == 0
//!   applied = min(applied, terms) otherwise
//! ```
//!
//! so no shard is ever empty. The resolved plan uses one shard per worker.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::{precision_bits, terms_for_digits};

/// Largest digit count whose working precision still fits a `u32` bit count.
pub const MAX_DIGITS: u64 = 600_000_000;

/// Requested worker count as given on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadRequest {
    /// Every logical core.
    Auto,
    /// Raw count; zero and negative values are clamped by [`Plan::resolve`].
    Count(i64),
}

impl FromStr for ThreadRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(ThreadRequest::Auto);
        }
        s.parse::<i64>()
            .map(ThreadRequest::Count)
            .map_err(|_| format!("invalid thread count '{}': expected a number or 'auto'", s))
    }
}

impl fmt::Display for ThreadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadRequest::Auto => f.write_str("auto"),
            ThreadRequest::Count(n) => write!(f, "{}", n),
        }
    }
}

/// A request value that was clamped during resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Adjustment {
    Digits { requested: u64, applied: u64 },
    Threads { requested: i64, applied: usize },
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjustment::Digits { requested, applied } => {
                write!(f, "Number of digits reset from {} to {}", requested, applied)
            }
            Adjustment::Threads { requested, applied } => {
                write!(f, "Number of threads reset from {} to {}", requested, applied)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub digits: u64,
    pub terms: u64,
    /// Contiguous term ranges split independently before the reduction.
    pub shards: usize,
    /// Size of the rayon pool the run executes on.
    pub workers: usize,
    /// Floating working precision in bits.
    pub precision: u32,
}

impl Plan {
    /// Resolve a request against `cores` logical cores.
    pub fn resolve(digits: u64, threads: ThreadRequest, cores: usize) -> (Plan, Vec<Adjustment>) {
        let mut adjustments = Vec::new();
        let cores = cores.max(1);

        let applied_digits = digits.min(MAX_DIGITS);
        if applied_digits != digits {
            adjustments.push(Adjustment::Digits {
                requested: digits,
                applied: applied_digits,
            });
        }
        let terms = terms_for_digits(applied_digits);

        let requested = match threads {
            ThreadRequest::Auto => cores as i64,
            ThreadRequest::Count(n) => n,
        };
        let mut workers = requested.clamp(1, cores as i64) as usize;
        if terms == 0 {
            workers = 1;
        } else if (workers as u64) > terms {
            workers = terms as usize;
        }
        if workers as i64 != requested {
            adjustments.push(Adjustment::Threads {
                requested,
                applied: workers,
            });
        }

        for adjustment in &adjustments {
            warn!("{}", adjustment);
        }

        let plan = Plan {
            digits: applied_digits,
            terms,
            shards: workers,
            workers,
            precision: precision_bits(applied_digits),
        };
        (plan, adjustments)
    }

    /// Plan with an explicit shard/worker split. Only the digit count is
    /// clamped (to [`MAX_DIGITS`]); shards and workers are taken as given.
    pub fn with_layout(digits: u64, shards: usize, workers: usize) -> Plan {
        let digits = digits.min(MAX_DIGITS);
        Plan {
            digits,
            terms: terms_for_digits(digits),
            shards: shards.max(1),
            workers: workers.max(1),
            precision: precision_bits(digits),
        }
    }

    /// Half-open term ranges `[start, end)` for each shard. The last shard
    /// absorbs the remainder; empty when there are no terms.
    pub fn shard_ranges(&self) -> Vec<(u64, u64)> {
        if self.terms == 0 {
            return Vec::new();
        }
        let shards = (self.shards as u64).min(self.terms);
        let width = self.terms / shards;
        (0..shards)
            .map(|i| {
                let end = if i + 1 == shards { self.terms } else { (i + 1) * width };
                (i * width, end)
            })
            .collect()
    }

    /// Recursion depth at which each shard's split starts.
    pub fn shard_depth(&self) -> u32 {
        crate::ceil_log2(self.shards as u64)
    }
}
