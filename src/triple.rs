//! # Triple — The (P, Q, G) Accumulator
//!
//! For a term range [a, b) binary splitting maintains
//!
//! ```text
//!   P(a,b) = p(a+1) · ... · p(b)
//!   G(a,b) = g(a+1) · ... · g(b)
//!   Q(a,b) = Σ_{a<k≤b} G(a,k-1) · q(k) · P(k,b)
//! ```
//!
//! and two adjacent ranges [a, m) and [m, b) combine as
//!
//! ```text
//!   P = P1 · P2
//!   Q = Q1 · P2 + Q2 · G1
//!   G = G1 · G2
//! ```
//!
//! The merge is exact integer arithmetic and associative, which is what makes
//! the shard-then-reduce strategy produce the same rational as one big split.
//! G is only ever consumed as the *left* operand, so a range that ends at the
//! last term never needs its G; callers pass `keep_g = false` there and the
//! product is skipped and its memory released.

use rug::Integer;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Triple {
    pub p: Integer,
    pub q: Integer,
    /// Zero once the range reaches the last term and G was dropped.
    pub g: Integer,
}

impl Triple {
    /// The empty-range triple: P = 1, Q = 0, G = 1.
    pub fn base() -> Self {
        Triple {
            p: Integer::from(1u32),
            q: Integer::new(),
            g: Integer::from(1u32),
        }
    }

    /// Fold the adjacent range `right` into `self` on the current thread.
    ///
    /// `right.q` is used as scratch for `Q2 · G1`.
    pub fn absorb(&mut self, right: &mut Triple, keep_g: bool) {
        right.q *= &self.g;
        if keep_g {
            self.g *= &right.g;
        } else {
            self.g = Integer::new();
        }
        self.q *= &right.p;
        self.q += &right.q;
        self.p *= &right.p;
    }

    /// Fold `right` into `self`, running the three independent products
    /// `P1·P2`, `Q1·P2` and `Q2·G1` as rayon tasks joined before the sum.
    pub fn absorb_parallel(&mut self, right: Triple, keep_g: bool) {
        let Triple { p, q, g } = self;
        let Triple {
            p: p2,
            q: mut q2,
            g: g2,
        } = right;

        rayon::join(
            || *p *= &p2,
            || rayon::join(|| *q *= &p2, || q2 *= &*g),
        );
        *q += &q2;
        if keep_g {
            *g *= &g2;
        } else {
            *g = Integer::new();
        }
    }

    /// True once G has been dropped (or was never needed).
    pub fn g_dropped(&self) -> bool {
        self.g == 0
    }

    /// Q·P2 == Q2·P, i.e. both triples describe the same rational Q/P.
    pub fn same_ratio(&self, other: &Triple) -> bool {
        Integer::from(&self.q * &other.p) == Integer::from(&other.q * &self.p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(p: i64, q: i64, g: i64) -> Triple {
        Triple {
            p: Integer::from(p),
            q: Integer::from(q),
            g: Integer::from(g),
        }
    }

    #[test]
    fn absorb_applies_merge_formula() {
        let mut left = sample(6, -35, 7);
        let mut right = sample(10, 11, 13);
        left.absorb(&mut right, true);
        assert_eq!(left.p, 60);
        assert_eq!(left.q, -35 * 10 + 11 * 7);
        assert_eq!(left.g, 91);
    }

    #[test]
    fn parallel_absorb_matches_serial() {
        let mut serial = sample(123_456_789, -987_654_321, 555_555);
        let mut parallel = serial.clone();
        let right = sample(1_000_003, 77_777_777, -31);

        serial.absorb(&mut right.clone(), true);
        parallel.absorb_parallel(right, true);
        assert_eq!(serial, parallel);
    }

    #[test]
    fn dropping_g_keeps_p_and_q() {
        let mut kept = sample(2, 3, 5);
        let mut dropped = kept.clone();
        kept.absorb(&mut sample(7, 11, 13), true);
        dropped.absorb(&mut sample(7, 11, 13), false);
        assert_eq!((&kept.p, &kept.q), (&dropped.p, &dropped.q));
        assert!(dropped.g_dropped());
        assert!(!kept.g_dropped());
    }

    #[test]
    fn base_is_merge_identity_on_the_left() {
        let mut acc = Triple::base();
        let right = sample(17, 19, 23);
        acc.absorb_parallel(right.clone(), true);
        assert_eq!(acc, right);
    }

    #[test]
    fn same_ratio_detects_scaled_triples() {
        let t = sample(12, 18, 5);
        assert!(t.same_ratio(&sample(2, 3, 1)));
        assert!(!t.same_ratio(&sample(2, 5, 1)));
    }
}
