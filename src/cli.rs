//! # CLI Execution
//!
//! Kept apart from `main.rs` so the entry point stays slim: resolves the run
//! plan, drives the engine, reports statistics and writes the digits.

use anyhow::Result;
use chudnovsky::engine;
use chudnovsky::format::{decimal_expansion, OutputMode};
use chudnovsky::plan::{Adjustment, Plan};
use chudnovsky::stats::RunStats;
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use tracing::info;

use super::Cli;

/// The `--json-stats` line.
#[derive(Serialize)]
struct Report<'a> {
    plan: &'a Plan,
    adjustments: &'a [Adjustment],
    stats: &'a RunStats,
}

pub fn run(cli: &Cli) -> Result<()> {
    let mode = cli.output;
    let cores = rayon::current_num_threads();
    let (plan, adjustments) = Plan::resolve(cli.digits, cli.threads, cores);
    info!(
        terms = plan.terms,
        depth = chudnovsky::ceil_log2(plan.terms) + 1,
        threads = plan.workers,
        cores,
        "chudnovsky starting"
    );

    let done = engine::run(&plan);
    done.stats.log();

    if cli.json_stats {
        let report = Report {
            plan: &plan,
            adjustments: &adjustments,
            stats: &done.stats,
        };
        let mut err = io::stderr().lock();
        serde_json::to_writer(&mut err, &report)?;
        writeln!(err)?;
    }

    if mode != OutputMode::Silent {
        let expansion = decimal_expansion(&done.pi, plan.digits as usize);
        drop(done);
        let mut out = BufWriter::new(io::stdout().lock());
        mode.write(&mut out, &expansion)?;
    }
    Ok(())
}
