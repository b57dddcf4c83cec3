//! # Convert — Newton Division and Square Root
//!
//! Turns the final exact P and Q into
//!
//! ```text
//!          P · (C/D) · √C
//!   pi ≈ ─────────────────
//!            Q + A·P
//! ```
//!
//! at a fixed working precision.
//!
//! ## Doubling-Precision Newton
//!
//! Both the reciprocal and the inverse square root are seeded from native
//! `f64` precision and refined by Newton steps whose working precision
//! doubles each time. The schedule comes from halving the target (rounding
//! up) until it fits in 53 bits, then walking back up:
//!
//! ```text
//!   target 1000 → 500 → 250 → 125 → 63 → 32
//!   schedule    32, 63, 125, 250, 500, 1000
//! ```
//!
//! Each intermediate rung computes the residual at the rung's precision and
//! the correction at half of it, since the residual is already small. The
//! last rung does not produce the reciprocal at full precision: it folds the
//! numerator in directly (Karp–Markstein), so the full-precision quotient
//! costs one full×half product instead of a full reciprocal plus a full
//! multiply.
//!
//! Division and square root are independent and run as a `rayon::join` pair.

use rug::{Float, Integer};

use crate::stats::{PhaseTimer, RunStats};
use crate::{A, C, D};

/// Mantissa bits of an `f64`; Newton seeds are computed at this precision.
pub const DOUBLE_PREC: u32 = 53;

/// Working precisions from seed (≤ 53 bits) up to `target`, each at most
/// double the previous one.
pub fn precision_ladder(target: u32) -> Vec<u32> {
    let mut ladder = vec![target];
    let mut prec = target;
    while prec > DOUBLE_PREC {
        prec = prec.div_ceil(2);
        ladder.push(prec);
    }
    ladder.reverse();
    ladder
}

/// `y / x` to `prec` bits.
pub fn divide(y: &Float, x: &Float, prec: u32) -> Float {
    let ladder = precision_ladder(prec);
    if ladder.len() == 1 {
        return Float::with_val(prec, y / x);
    }

    let mut t = Float::with_val(ladder[0], x.recip_ref());
    for &rung in &ladder[1..ladder.len() - 1] {
        // t += t·(1 - x·t)
        let mut residual = Float::with_val(rung, x * &t);
        residual -= 1u32;
        let correction = Float::with_val(rung / 2, &residual * &t);
        t.set_prec(rung);
        t -= &correction;
    }

    // r = y·t;  r += t·(y - x·r)
    let half = prec / 2;
    let quotient = Float::with_val(half, y * &t);
    let mut residual = Float::with_val(prec, x * &quotient);
    residual -= y;
    let correction = Float::with_val(half, &t * &residual);
    Float::with_val(prec, &quotient - &correction)
}

/// `√x` to `prec` bits.
pub fn sqrt_u32(x: u32, prec: u32) -> Float {
    let ladder = precision_ladder(prec);
    if ladder.len() == 1 {
        return Float::with_val(prec, x).sqrt();
    }

    let mut t = Float::with_val(ladder[0], (x as f64).sqrt().recip());
    for &rung in &ladder[1..ladder.len() - 1] {
        // t += t·(1 - x·t²)/2
        let mut residual = Float::with_val(rung, t.square_ref());
        residual *= x;
        residual -= 1u32;
        let mut correction = Float::with_val(rung / 2, &residual * &t);
        correction /= 2u32;
        t.set_prec(rung);
        t -= &correction;
    }

    // s = x·t;  s += t·(x - s²)/2
    let half = prec / 2;
    let root = Float::with_val(half, &t * x);
    let mut residual = Float::with_val(prec, root.square_ref());
    residual -= x;
    let mut correction = Float::with_val(half, &t * &residual);
    correction /= 2u32;
    Float::with_val(prec, &root - &correction)
}

/// Pi from the final P and Q at `prec` bits, recording the "div/sqrt" and
/// "mul" phases into `stats` when given.
pub fn pi_from_pq(mut p: Integer, mut q: Integer, prec: u32, stats: Option<&mut RunStats>) -> Float {
    q += Integer::from(&p * A);
    p *= C / D;

    let numerator = Float::with_val(prec, &p);
    drop(p);
    let denominator = Float::with_val(prec, &q);
    drop(q);

    let timer = PhaseTimer::start();
    let (quotient, root) = rayon::join(
        || timer.time(|| divide(&numerator, &denominator, prec)),
        || timer.time(|| sqrt_u32(C, prec)),
    );
    let div_phase = timer.finish("div/sqrt");
    drop(numerator);
    drop(denominator);

    let timer = PhaseTimer::start();
    let pi = Float::with_val(prec, &quotient * &root);
    let mul_phase = timer.finish("mul");

    if let Some(stats) = stats {
        stats.push(div_phase);
        stats.push(mul_phase);
    }
    pi
}
