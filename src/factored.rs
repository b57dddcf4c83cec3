//! # Factored — Sparse Prime-Power Integers
//!
//! Binary splitting multiplies P and G values that are products of many small
//! per-term constants, so they share a large number of small primes. Keeping a
//! factored twin next to each exact integer lets the splitter find the GCD of
//! a right-hand P and a left-hand G by a linear merge over two sorted lists,
//! and divide it out before the quadratic-or-worse big multiplication.
//!
//! A [`FactoredInt`] is a list of `(prime, exponent)` pairs with strictly
//! increasing primes and positive exponents. All operations are linear in the
//! list lengths; the only big-integer work is [`FactoredInt::evaluate`], which
//! uses a balanced product tree so the multiply depth is logarithmic.

use rug::Integer;

use crate::sieve::FactorSieve;

/// Product-tree leaves multiply at most this many prime powers directly.
const PRODUCT_LEAF: usize = 32;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FactoredInt {
    factors: Vec<(u32, u32)>,
}

impl FactoredInt {
    pub fn new() -> Self {
        FactoredInt::default()
    }

    /// Build from `(prime, exponent)` pairs already in increasing prime order.
    pub fn from_pairs(pairs: &[(u32, u32)]) -> Self {
        debug_assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
        FactoredInt {
            factors: pairs.iter().copied().filter(|&(_, e)| e > 0).collect(),
        }
    }

    /// `base^exponent` for odd `base` covered by `sieve`.
    pub fn from_prime_power(sieve: &FactorSieve, base: u32, exponent: u32) -> Self {
        let mut f = FactoredInt::new();
        f.set_prime_power(sieve, base, exponent);
        f
    }

    /// Overwrite with `base^exponent`, reusing the existing buffer.
    pub fn set_prime_power(&mut self, sieve: &FactorSieve, base: u32, exponent: u32) {
        self.factors.clear();
        self.factors
            .extend(sieve.factorize(base).map(|(p, m)| (p, m * exponent)));
    }

    pub fn factors(&self) -> &[(u32, u32)] {
        &self.factors
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn clear(&mut self) {
        self.factors.clear();
    }

    /// Exponent of `prime`, 0 if absent.
    pub fn exponent_of(&self, prime: u32) -> u32 {
        self.factors
            .binary_search_by_key(&prime, |&(p, _)| p)
            .map(|i| self.factors[i].1)
            .unwrap_or(0)
    }

    /// Write `self · other` into `out` (previous contents discarded).
    pub fn mul_into(&self, other: &FactoredInt, out: &mut FactoredInt) {
        let (f, g) = (&self.factors, &other.factors);
        let r = &mut out.factors;
        r.clear();
        r.reserve(f.len() + g.len());

        let (mut i, mut j) = (0, 0);
        while i < f.len() && j < g.len() {
            let ((fp, fe), (gp, ge)) = (f[i], g[j]);
            if fp == gp {
                r.push((fp, fe + ge));
                i += 1;
                j += 1;
            } else if fp < gp {
                r.push((fp, fe));
                i += 1;
            } else {
                r.push((gp, ge));
                j += 1;
            }
        }
        r.extend_from_slice(&f[i..]);
        r.extend_from_slice(&g[j..]);
    }

    /// `self *= other`, merging through `scratch` and swapping buffers so
    /// neither side reallocates in steady state.
    pub fn mul_assign(&mut self, other: &FactoredInt, scratch: &mut FactoredInt) {
        self.mul_into(other, scratch);
        std::mem::swap(self, scratch);
    }

    /// Drop zero-exponent entries, preserving order.
    pub fn compact(&mut self) {
        self.factors.retain(|&(_, e)| e > 0);
    }

    /// Exact integer value.
    pub fn evaluate(&self) -> Integer {
        let mut out = Integer::new();
        self.evaluate_into(&mut out);
        out
    }

    /// Exact integer value written into `out`.
    pub fn evaluate_into(&self, out: &mut Integer) {
        *out = product_tree(&self.factors);
    }
}

/// Merge-multiply two factored integers.
pub fn multiply(f: &FactoredInt, g: &FactoredInt) -> FactoredInt {
    let mut out = FactoredInt::new();
    f.mul_into(g, &mut out);
    out
}

fn product_tree(factors: &[(u32, u32)]) -> Integer {
    if factors.len() <= PRODUCT_LEAF {
        let mut acc = Integer::from(1u32);
        for &(prime, exp) in factors {
            match exp {
                0 => {}
                1 => acc *= prime,
                _ => acc *= Integer::from(Integer::u_pow_u(prime, exp)),
            }
        }
        acc
    } else {
        let mid = factors.len() / 2;
        let mut left = product_tree(&factors[..mid]);
        left *= product_tree(&factors[mid..]);
        left
    }
}

/// Cancel `gcd(p, g)` as seen through the factored twins `fp` and `fg`.
///
/// The common part (elementwise minimum exponent) is subtracted from both
/// twins, evaluated into `gcd`, and divided exactly out of `p` and `g`. The
/// twins are compacted afterwards so they share no prime. `common` is scratch.
/// Returns `true` if anything was cancelled.
///
/// `fp` may describe only part of `p` (the splitter keeps the odd part); the
/// division stays exact as long as `fp` divides `p` and `fg` divides `g`.
pub fn remove_common_factors(
    p: &mut Integer,
    fp: &mut FactoredInt,
    g: &mut Integer,
    fg: &mut FactoredInt,
    gcd: &mut Integer,
    common: &mut FactoredInt,
) -> bool {
    common.clear();
    let (mut i, mut j) = (0, 0);
    while i < fp.factors.len() && j < fg.factors.len() {
        let (pp, pe) = fp.factors[i];
        let (gp, ge) = fg.factors[j];
        if pp == gp {
            let c = pe.min(ge);
            fp.factors[i].1 -= c;
            fg.factors[j].1 -= c;
            common.factors.push((pp, c));
            i += 1;
            j += 1;
        } else if pp < gp {
            i += 1;
        } else {
            j += 1;
        }
    }

    if common.is_empty() {
        return false;
    }
    common.evaluate_into(gcd);
    p.div_exact_mut(gcd);
    g.div_exact_mut(gcd);
    fp.compact();
    fg.compact();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rug::ops::Pow;

    fn sieve() -> FactorSieve {
        FactorSieve::build(100_001)
    }

    #[test]
    fn prime_power_scales_multiplicities() {
        let s = sieve();
        let f = FactoredInt::from_prime_power(&s, 675, 3);
        assert_eq!(f.factors(), &[(3, 9), (5, 6)]);
        assert_eq!(f.evaluate(), Integer::from(675u32).pow(3));
        assert!(FactoredInt::from_prime_power(&s, 1, 5).is_empty());
    }

    #[test]
    fn merge_sums_shared_exponents() {
        let f = FactoredInt::from_pairs(&[(3, 2), (7, 1), (11, 4)]);
        let g = FactoredInt::from_pairs(&[(5, 1), (7, 2), (13, 1)]);
        let fg = multiply(&f, &g);
        assert_eq!(fg.factors(), &[(3, 2), (5, 1), (7, 3), (11, 4), (13, 1)]);
        assert_eq!(multiply(&g, &f), fg);
        assert_eq!(fg.evaluate(), f.evaluate() * g.evaluate());
    }

    #[test]
    fn mul_assign_swaps_through_scratch() {
        let mut f = FactoredInt::from_pairs(&[(3, 1)]);
        let mut scratch = FactoredInt::new();
        f.mul_assign(&FactoredInt::from_pairs(&[(3, 2), (5, 1)]), &mut scratch);
        assert_eq!(f.factors(), &[(3, 3), (5, 1)]);
        assert_eq!(scratch.factors(), &[(3, 1)]);
    }

    #[test]
    fn empty_evaluates_to_one() {
        assert_eq!(FactoredInt::new().evaluate(), 1);
    }

    #[test]
    fn compact_keeps_order() {
        let mut f = FactoredInt {
            factors: vec![(3, 0), (5, 2), (7, 0), (11, 1)],
        };
        f.compact();
        assert_eq!(f.factors(), &[(5, 2), (11, 1)]);
        assert_eq!(f.exponent_of(5), 2);
        assert_eq!(f.exponent_of(7), 0);
    }

    #[test]
    fn product_tree_matches_linear_product() {
        // Enough entries to force several levels of the tree.
        let s = sieve();
        let mut f = FactoredInt::new();
        let mut scratch = FactoredInt::new();
        let mut expected = Integer::from(1u32);
        for v in (3..400u32).step_by(2) {
            f.mul_assign(&FactoredInt::from_prime_power(&s, v, 2), &mut scratch);
            expected *= v * v;
        }
        assert!(f.len() > PRODUCT_LEAF * 2);
        assert_eq!(f.evaluate(), expected);
    }

    #[test]
    fn remove_common_factors_cancels_gcd() {
        let mut fp = FactoredInt::from_pairs(&[(3, 4), (5, 1), (11, 2)]);
        let mut fg = FactoredInt::from_pairs(&[(3, 1), (7, 1), (11, 3)]);
        // Exact twins carry an extra power of two on p, like the splitter's P.
        let mut p = fp.evaluate() * 8u32;
        let mut g = fg.evaluate();
        let (p0, g0) = (p.clone(), g.clone());

        let mut gcd = Integer::new();
        let mut common = FactoredInt::new();
        assert!(remove_common_factors(
            &mut p, &mut fp, &mut g, &mut fg, &mut gcd, &mut common
        ));

        assert_eq!(gcd, 3 * 11 * 11);
        assert_eq!(fp.factors(), &[(3, 3), (5, 1)]);
        assert_eq!(fg.factors(), &[(7, 1), (11, 1)]);
        assert_eq!(p, fp.evaluate() * 8u32);
        assert_eq!(g, fg.evaluate());
        assert_eq!(Integer::from(&p * &g0), Integer::from(&g * &p0));
    }

    #[test]
    fn remove_common_factors_disjoint_is_noop() {
        let mut fp = FactoredInt::from_pairs(&[(3, 1)]);
        let mut fg = FactoredInt::from_pairs(&[(5, 1)]);
        let mut p = Integer::from(3u32);
        let mut g = Integer::from(5u32);
        let mut gcd = Integer::new();
        let mut common = FactoredInt::new();
        assert!(!remove_common_factors(
            &mut p, &mut fp, &mut g, &mut fg, &mut gcd, &mut common
        ));
        assert_eq!((p, g), (Integer::from(3u32), Integer::from(5u32)));
    }
}
