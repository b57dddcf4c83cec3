//! # Reduce — Tournament Combine of Shard Triples
//!
//! Shards arrive as triples over contiguous, increasing term ranges. They are
//! folded pairwise in ⌈log2(n)⌉ rounds:
//!
//! ```text
//!   stride 1:  0←1   2←3   4←5   6←7
//!   stride 2:  0←2         4←6
//!   stride 4:  0←4
//! ```
//!
//! Round `stride` merges slot `i` with slot `i + stride` for every
//! `i ≡ 0 (mod 2·stride)`. The pattern depends only on the shard count, so the
//! result is bit-identical however many rayon workers execute it. Merges inside
//! a round are independent and run in parallel; each merge itself fans out its
//! three products through [`Triple::absorb_parallel`]. A merge keeps G only if
//! a later round still consumes this slot as a left operand.

use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

use crate::stats::PhaseTimer;
use crate::triple::Triple;

/// Reduce the shard triples to the triple of the whole term range.
///
/// Returns [`Triple::base`] for an empty input.
pub fn reduce(shards: Vec<Triple>) -> Triple {
    reduce_timed(shards, None)
}

/// [`reduce`], recording per-merge busy time into `timer`.
pub fn reduce_timed(mut slots: Vec<Triple>, timer: Option<&PhaseTimer>) -> Triple {
    let n = slots.len();
    if n == 0 {
        return Triple::base();
    }

    debug!(shards = n, rounds = rounds(n), "reduction starting");
    let mut stride = 1;
    while stride < n {
        let pairs: Vec<(usize, Triple, Triple, bool)> = (0..n)
            .step_by(2 * stride)
            .filter(|&i| i + stride < n)
            .map(|i| {
                let left = std::mem::take(&mut slots[i]);
                let right = std::mem::take(&mut slots[i + stride]);
                (i, left, right, i + 2 * stride < n)
            })
            .collect();
        debug!(stride, merges = pairs.len(), "reduction round");

        let merged: Vec<(usize, Triple)> = pairs
            .into_par_iter()
            .map(|(i, mut left, right, keep_g)| {
                let started = Instant::now();
                left.absorb_parallel(right, keep_g);
                if let Some(t) = timer {
                    t.record(started.elapsed());
                }
                (i, left)
            })
            .collect();

        for (i, triple) in merged {
            slots[i] = triple;
        }
        stride *= 2;
    }

    std::mem::take(&mut slots[0])
}

/// Number of rounds the tournament takes for `n` shards.
pub fn rounds(n: usize) -> u32 {
    crate::ceil_log2(n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sieve::{sieve_limit_for_terms, FactorSieve};
    use crate::split::{SplitTuning, Splitter};

    fn shard_triples(splitter: &Splitter<'_>, bounds: &[u64]) -> Vec<Triple> {
        bounds
            .windows(2)
            .map(|w| splitter.split(w[0], w[1], 0))
            .collect()
    }

    #[test]
    fn single_shard_is_returned_unchanged() {
        let sieve = FactorSieve::build(sieve_limit_for_terms(20));
        let splitter = Splitter::new(&sieve, 20);
        let whole = splitter.split(0, 20, 0);
        assert_eq!(reduce(vec![whole.clone()]), whole);
    }

    #[test]
    fn empty_input_is_base_triple() {
        assert_eq!(reduce(Vec::new()), Triple::base());
    }

    #[test]
    fn tournament_matches_sequential_fold() {
        let terms = 400;
        let sieve = FactorSieve::build(sieve_limit_for_terms(terms));
        let splitter = Splitter::new(&sieve, terms);
        // Seven uneven shards exercise the odd-count tail of every round.
        let bounds = [0, 30, 95, 120, 200, 260, 333, 400];

        let shards = shard_triples(&splitter, &bounds);
        let mut fold = shards[0].clone();
        for (k, shard) in shards.iter().enumerate().skip(1) {
            fold.absorb(&mut shard.clone(), k + 1 < shards.len());
        }

        let reduced = reduce(shards);
        assert_eq!((&reduced.p, &reduced.q), (&fold.p, &fold.q));
        assert!(reduced.g_dropped());
    }

    #[test]
    fn uncancelled_shards_reduce_to_single_split() {
        let terms = 256;
        let sieve = FactorSieve::build(sieve_limit_for_terms(terms));
        let splitter = Splitter::with_tuning(&sieve, terms, SplitTuning::without_cancellation());
        let bounds = [0, 64, 128, 192, 256];

        let reduced = reduce(shard_triples(&splitter, &bounds));
        let whole = splitter.split(0, terms, 0);
        assert_eq!((reduced.p, reduced.q), (whole.p, whole.q));
    }

    #[test]
    fn same_result_on_one_and_many_workers() {
        let terms = 300;
        let sieve = FactorSieve::build(sieve_limit_for_terms(terms));
        let splitter = Splitter::new(&sieve, terms);
        let bounds = [0, 37, 75, 112, 150, 187, 225, 262, 300];

        let run = |threads: usize| {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap();
            pool.install(|| reduce(shard_triples(&splitter, &bounds)))
        };
        assert_eq!(run(1), run(4));
    }

    #[test]
    fn round_count() {
        assert_eq!(rounds(1), 0);
        assert_eq!(rounds(2), 1);
        assert_eq!(rounds(5), 3);
        assert_eq!(rounds(8), 3);
    }
}
