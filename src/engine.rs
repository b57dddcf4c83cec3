//! # Engine — Phase Orchestration
//!
//! Runs one resolved [`Plan`] end to end on a dedicated rayon pool:
//!
//! ```text
//!   sieve ──▶ split (one task per shard) ──▶ reduce ──▶ div/sqrt ──▶ mul
//! ```
//!
//! Every shard is split starting at depth ⌈log2(shards)⌉ so the cancellation
//! threshold is measured against the depth of the whole tree, not the shard's
//! own. The sieve is only needed by the leaves and is dropped before the
//! reduction starts. Each phase is timed into [`RunStats`].
//!
//! If the pool cannot be created the run continues on the calling thread.

use rayon::prelude::*;
use rug::Float;
use tracing::{debug, info, warn};

use crate::convert::pi_from_pq;
use crate::estimate_digits;
use crate::plan::Plan;
use crate::reduce::reduce_timed;
use crate::sieve::{sieve_limit_for_terms, FactorSieve};
use crate::split::Splitter;
use crate::stats::{PhaseTimer, RunStats};
use crate::triple::Triple;

/// Finished run: the approximation and how it was obtained.
pub struct Computation {
    pub pi: Float,
    pub stats: RunStats,
}

/// Compute pi for `plan`.
pub fn run(plan: &Plan) -> Computation {
    on_pool(plan.workers, || {
        let mut stats = RunStats {
            digits: plan.digits,
            terms: plan.terms,
            shards: plan.shards,
            workers: plan.workers,
            precision_bits: plan.precision,
            ..RunStats::default()
        };
        info!(
            digits = plan.digits,
            terms = plan.terms,
            shards = plan.shards,
            workers = plan.workers,
            precision = plan.precision,
            "computation starting"
        );

        let triple = series_triple(plan, &mut stats);
        stats.p_digits = estimate_digits(&triple.p);
        stats.q_digits = estimate_digits(&triple.q);

        let Triple { p, q, .. } = triple;
        let pi = pi_from_pq(p, q, plan.precision, Some(&mut stats));
        Computation { pi, stats }
    })
}

/// The exact (P, Q, G) of the plan's whole term range, computed on the
/// plan's pool.
pub fn compute_triple(plan: &Plan) -> Triple {
    on_pool(plan.workers, || series_triple(plan, &mut RunStats::default()))
}

/// Sieve, split every shard in parallel, then reduce. Runs on the current
/// rayon pool.
fn series_triple(plan: &Plan, stats: &mut RunStats) -> Triple {
    if plan.terms == 0 {
        debug!("no series terms, using base triple");
        return Triple::base();
    }

    let timer = PhaseTimer::start();
    let sieve = FactorSieve::build(sieve_limit_for_terms(plan.terms));
    stats.sieve_limit = sieve.limit();
    stats.sieve_bytes = sieve.memory_bytes();
    stats.push(timer.finish("sieve"));
    debug!(
        limit = stats.sieve_limit,
        bytes = stats.sieve_bytes,
        "sieve built"
    );

    let depth = plan.shard_depth();
    let timer = PhaseTimer::start();
    let shards: Vec<Triple> = {
        let splitter = Splitter::new(&sieve, plan.terms);
        plan.shard_ranges()
            .into_par_iter()
            .map(|(a, b)| timer.time(|| splitter.split(a, b, depth)))
            .collect()
    };
    stats.push(timer.finish("split"));
    drop(sieve);

    let timer = PhaseTimer::start();
    let triple = reduce_timed(shards, Some(&timer));
    stats.push(timer.finish("reduce"));
    triple
}

/// Run `f` inside a pool of `workers` threads, or inline if the pool cannot
/// be built.
fn on_pool<T, F>(workers: usize, f: F) -> T
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("chudnovsky-{}", i))
        .build()
    {
        Ok(pool) => pool.install(f),
        Err(e) => {
            warn!(error = %e, workers, "could not build thread pool, running on the calling thread");
            f()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::decimal_expansion;

    #[test]
    fn zero_terms_yield_base_triple() {
        let plan = Plan::with_layout(10, 1, 1);
        assert_eq!(plan.terms, 0);
        assert_eq!(compute_triple(&plan), Triple::base());
    }

    #[test]
    fn run_records_every_phase() {
        let plan = Plan::with_layout(2000, 4, 2);
        let done = run(&plan);
        let names: Vec<_> = done.stats.phases.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["sieve", "split", "reduce", "div/sqrt", "mul"]);
        assert_eq!(done.stats.shards, 4);
        assert_eq!(done.stats.workers, 2);
        assert!(done.stats.sieve_limit >= crate::sieve::MIN_SIEVE_LIMIT);
        assert!(done.stats.p_digits > 0 && done.stats.q_digits > 0);
        assert_eq!(done.pi.prec(), plan.precision);
    }

    #[test]
    fn small_run_produces_pi() {
        let done = run(&Plan::with_layout(300, 3, 3));
        let digits = decimal_expansion(&done.pi, 300);
        assert!(digits.starts_with("3.14159265358979323846264338327950288419716939937510"));
        assert!(digits.ends_with("0249141273")); // decimals 291..=300
    }

    #[test]
    fn worker_count_does_not_change_the_triple() {
        let one = compute_triple(&Plan::with_layout(5000, 6, 1));
        let many = compute_triple(&Plan::with_layout(5000, 6, 4));
        assert_eq!(one, many);
    }
}
