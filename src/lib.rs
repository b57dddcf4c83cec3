//! # Chudnovsky — Parallel Binary-Splitting Pi Engine
//!
//! Computes decimal digits of pi from the Chudnovsky series
//!
//! ```text
//!   1/pi = 12 · Σ (-1)^k (6k)! (A + Bk) / ((3k)! (k!)^3 C^(3k+3/2))
//! ```
//!
//! by binary splitting. The pipeline, leaves first:
//!
//! 1. [`sieve`]: smallest-factor table over odd integers, so every per-term
//!    constant can be factored in logarithmic time.
//! 2. [`factored`]: sparse prime-power integers used to cancel common factors
//!    between P and G before the expensive big multiplications.
//! 3. [`split`]: recursive (P,Q,G) evaluation of a term range.
//! 4. [`reduce`]: tournament combine of per-shard triples on the rayon pool.
//! 5. [`convert`]: Newton division and square root turning the final P, Q
//!    into a floating approximation of pi.
//!
//! [`engine`] wires the phases together for a resolved [`plan::Plan`], and
//! [`format`] renders the digits.

pub mod convert;
pub mod engine;
pub mod factored;
pub mod format;
pub mod plan;
pub mod reduce;
pub mod sieve;
pub mod split;
pub mod stats;
pub mod triple;

use rug::Integer;

/// Chudnovsky series constant A.
pub const A: u32 = 13_591_409;
/// Chudnovsky series constant B.
pub const B: u32 = 545_140_134;
/// Chudnovsky series constant C.
pub const C: u32 = 640_320;
/// Chudnovsky series constant D.
pub const D: u32 = 12;

/// log2(10).
pub const BITS_PER_DIGIT: f64 = 3.321_928_094_887_362_347_87;
/// log10(53360^3): decimal digits contributed by each series term.
pub const DIGITS_PER_TERM: f64 = 14.181_647_462_725_477_655_5;
/// Working-precision bits beyond the requested digits.
pub const GUARD_BITS: u64 = 16;

/// Number of series terms needed for `digits` decimal digits.
pub fn terms_for_digits(digits: u64) -> u64 {
    (digits as f64 / DIGITS_PER_TERM) as u64
}

/// Floating working precision in bits for `digits` decimal digits,
/// saturating at `u32::MAX`.
pub fn precision_bits(digits: u64) -> u32 {
    let bits = ((digits as f64 * BITS_PER_DIGIT) as u64).saturating_add(GUARD_BITS);
    u32::try_from(bits).unwrap_or(u32::MAX)
}

/// Smallest `k` with `2^k >= n` (0 for n <= 1).
pub fn ceil_log2(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        64 - (n - 1).leading_zeros()
    }
}

/// Estimate decimal digit count from bit length, avoiding expensive to_string conversion.
pub fn estimate_digits(n: &Integer) -> u64 {
    let bits = n.significant_bits();
    if bits == 0 {
        return 1;
    }
    (bits as f64 * std::f64::consts::LOG10_2) as u64 + 1
}
