//! # Main — CLI Entry Point
//!
//! Parses the command line, initialises logging and hands off to
//! [`cli::run`].
//!
//! ## Usage
//!
//! ```text
//! chudnovsky <DIGITS> [OUTPUT] [THREADS] [--json-stats]
//! ```
//!
//! - `OUTPUT`: 0 just run (default), 1 digits only, N digits in N columns
//!   (2..=14).
//! - `THREADS`: worker count (default 1), or `auto` for every logical core.
//!   Falls back to `CHUDNOVSKY_THREADS` (also read from `.env`).
//! - `--json-stats`: also emit the run statistics as one JSON line on stderr.
//!
//! Diagnostics and timing always go to stderr, so stdout carries nothing but
//! digits. `LOG_FORMAT=json` switches the log output to JSON; `RUST_LOG`
//! filters it.

mod cli;

use anyhow::Result;
use chudnovsky::format::OutputMode;
use chudnovsky::plan::ThreadRequest;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "chudnovsky",
    version,
    about = "Compute decimal digits of pi with the Chudnovsky series",
    after_help = "EXAMPLES:\n    chudnovsky 10000000 1 auto | md5sum\n    chudnovsky 100000000 5 auto > pi.txt"
)]
struct Cli {
    /// Digits of pi to compute
    digits: u64,

    /// 0 = just run, 1 = output digits only, N = output digits in N columns (max 14)
    #[arg(default_value = "0")]
    output: OutputMode,

    /// Number of threads, or 'auto' to run on all cores
    #[arg(default_value = "1", env = "CHUDNOVSKY_THREADS", allow_negative_numbers = true)]
    threads: ThreadRequest,

    /// Write run statistics as one JSON line on stderr
    #[arg(long)]
    json_stats: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Structured logging on stderr: LOG_FORMAT=json for machine consumption,
    // human-readable otherwise.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    cli::run(&cli)
}
