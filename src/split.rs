//! # Split — Recursive Binary Splitting of a Term Range
//!
//! Evaluates the (P, Q, G) [`Triple`] of a half-open term range [a, b).
//!
//! ## Leaves
//!
//! The leaf for [b-1, b) uses closed forms in b:
//!
//! ```text
//!   p(b) = b³ · C³ / 24
//!   g(b) = (2b-1)(6b-1)(6b-5)
//!   q(b) = (-1)^b · g(b) · (A + B·b)
//! ```
//!
//! P and G also get factored twins from the [`FactorSieve`]. G is odd, so the
//! twin of P only tracks the odd part: odd(b)³ · 3²·5³·23³·29³.
//!
//! ## Recursion
//!
//! The range splits at `a + ⌊(b-a)·ratio⌋` with `ratio = 0.54`; the right
//! half's products grow faster, so giving it fewer terms balances the work.
//! Deep in the tree (depth ≥ `cancel_depth`) the right P and left G are
//! reduced by their common factors before merging; near the root the GCD
//! search costs more than it saves.
//!
//! ## Scratch
//!
//! The left child writes straight into the caller's frame. The right child
//! needs its own frame, taken from a [`ScratchArena`] indexed by how many
//! right turns lead to it. Frames are acquired on the way down and released
//! on the way back up, so their big-integer buffers are reused by every later
//! sibling instead of being allocated per node.

use rug::ops::NegAssign;
use rug::{Assign, Integer};

use crate::factored::{remove_common_factors, FactoredInt};
use crate::sieve::FactorSieve;
use crate::triple::Triple;
use crate::{A, B, C};

/// Fraction of a range assigned to the left child.
pub const SPLIT_RATIO: f64 = 0.54;
/// Recursion depth from which common factors are cancelled.
pub const CANCEL_DEPTH: u32 = 4;

/// Odd part of C³/24 = 2^15 · 3² · 5³ · 23³ · 29³.
const P_CONSTANT_ODD: [(u32, u32); 4] = [(3, 2), (5, 3), (23, 3), (29, 3)];

/// Tunable knobs of the recursion. Neither affects the value of Q/P.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitTuning {
    pub ratio: f64,
    pub cancel_depth: u32,
}

impl Default for SplitTuning {
    fn default() -> Self {
        SplitTuning {
            ratio: SPLIT_RATIO,
            cancel_depth: CANCEL_DEPTH,
        }
    }
}

impl SplitTuning {
    /// Never cancel common factors; P, Q, G stay the raw products.
    pub fn without_cancellation() -> Self {
        SplitTuning {
            cancel_depth: u32::MAX,
            ..SplitTuning::default()
        }
    }
}

/// A triple plus the factored twins of P and G.
#[derive(Default)]
struct Frame {
    triple: Triple,
    fp: FactoredInt,
    fg: FactoredInt,
}

/// Per-split scratch: one frame per right-descent level and the temporaries
/// used by factored merges and GCD cancellation.
pub struct ScratchArena {
    frames: Vec<Frame>,
    gcd: Integer,
    common: FactoredInt,
    merged: FactoredInt,
    term: FactoredInt,
}

impl ScratchArena {
    /// Arena pre-sized for a range of `len` terms.
    pub fn for_range(len: u64) -> Self {
        let levels = crate::ceil_log2(len) as usize + 1;
        ScratchArena {
            frames: (0..levels).map(|_| Frame::default()).collect(),
            gcd: Integer::new(),
            common: FactoredInt::new(),
            merged: FactoredInt::new(),
            term: FactoredInt::new(),
        }
    }

    /// Number of frames currently held.
    pub fn levels(&self) -> usize {
        self.frames.len()
    }

    fn acquire(&mut self, level: usize) -> Frame {
        if level >= self.frames.len() {
            self.frames.resize_with(level + 1, Frame::default);
        }
        std::mem::take(&mut self.frames[level])
    }

    fn release(&mut self, level: usize, frame: Frame) {
        self.frames[level] = frame;
    }
}

/// Binary splitter over a shared, read-only sieve.
pub struct Splitter<'s> {
    sieve: &'s FactorSieve,
    terms: u64,
    tuning: SplitTuning,
    p_constant: FactoredInt,
}

impl<'s> Splitter<'s> {
    /// Splitter for a run of `terms` terms. The sieve must cover `6·terms`.
    pub fn new(sieve: &'s FactorSieve, terms: u64) -> Self {
        Splitter::with_tuning(sieve, terms, SplitTuning::default())
    }

    pub fn with_tuning(sieve: &'s FactorSieve, terms: u64, tuning: SplitTuning) -> Self {
        debug_assert!(
            terms.saturating_mul(6) <= sieve.limit() as u64,
            "sieve limit {} too small for {} terms",
            sieve.limit(),
            terms
        );
        Splitter {
            sieve,
            terms,
            tuning,
            p_constant: FactoredInt::from_pairs(&P_CONSTANT_ODD),
        }
    }

    /// Evaluate the triple of [a, b). `depth` is the depth of this range in
    /// the global splitting tree (shards start below the reduction tree).
    ///
    /// Panics if `a >= b` or `b` exceeds the run's term count.
    pub fn split(&self, a: u64, b: u64, depth: u32) -> Triple {
        assert!(a < b, "empty term range [{}, {})", a, b);
        assert!(b <= self.terms, "range end {} beyond {} terms", b, self.terms);

        let mut arena = ScratchArena::for_range(b - a);
        let mut out = Frame::default();
        self.split_into(a, b, depth, 0, &mut out, &mut arena);
        out.triple
    }

    fn split_into(
        &self,
        a: u64,
        b: u64,
        depth: u32,
        level: usize,
        out: &mut Frame,
        arena: &mut ScratchArena,
    ) {
        if b - a == 1 {
            self.leaf(b, out, arena);
            return;
        }

        let mid = (a + ((b - a) as f64 * self.tuning.ratio) as u64).clamp(a + 1, b - 1);
        self.split_into(a, mid, depth + 1, level, out, arena);

        let mut right = arena.acquire(level);
        self.split_into(mid, b, depth + 1, level + 1, &mut right, arena);

        if depth >= self.tuning.cancel_depth {
            remove_common_factors(
                &mut right.triple.p,
                &mut right.fp,
                &mut out.triple.g,
                &mut out.fg,
                &mut arena.gcd,
                &mut arena.common,
            );
        }

        let keep_g = b < self.terms;
        out.fp.mul_assign(&right.fp, &mut arena.merged);
        if keep_g {
            out.fg.mul_assign(&right.fg, &mut arena.merged);
        } else {
            out.fg.clear();
        }
        out.triple.absorb(&mut right.triple, keep_g);

        arena.release(level, right);
    }

    fn leaf(&self, b: u64, out: &mut Frame, arena: &mut ScratchArena) {
        let t = &mut out.triple;

        t.p.assign(b);
        t.p *= b;
        t.p *= b;
        t.p *= (C / 24) * (C / 24);
        t.p *= C * 24;

        t.g.assign(2 * b - 1);
        t.g *= 6 * b - 1;
        t.g *= 6 * b - 5;

        t.q.assign(b);
        t.q *= B;
        t.q += A;
        t.q *= &t.g;
        if b % 2 == 1 {
            t.q.neg_assign();
        }

        let odd_b = (b >> b.trailing_zeros()) as u32;
        out.fp.set_prime_power(self.sieve, odd_b, 3);
        out.fp.mul_assign(&self.p_constant, &mut arena.merged);

        out.fg.set_prime_power(self.sieve, (2 * b - 1) as u32, 1);
        arena.term.set_prime_power(self.sieve, (6 * b - 1) as u32, 1);
        out.fg.mul_assign(&arena.term, &mut arena.merged);
        arena.term.set_prime_power(self.sieve, (6 * b - 5) as u32, 1);
        out.fg.mul_assign(&arena.term, &mut arena.merged);
    }
}
