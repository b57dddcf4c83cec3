//! # Sieve — Smallest-Factor Table for Odd Integers
//!
//! Every leaf of the binary splitting needs the factorization of a handful of
//! per-term constants: the odd part of `b` and the three factors
//! `2b-1`, `6b-1`, `6b-5` of G. All of them are odd and bounded by `6·terms`,
//! so a single table built up front turns each factorization into a short
//! chain walk instead of trial division.
//!
//! ## Layout
//!
//! Only odd integers are stored; `v` lives at index `v / 2`. Each entry
//! records the smallest prime factor `p` of `v`, its multiplicity `e`, and
//! the index of `v / p^e`. Following `next` links until index 0 (the entry
//! for 1) yields the full factorization in increasing prime order.
//!
//! ```text
//!   v = 675 = 3^3 · 5^2
//!   [337] = (3, 3, next = 12)   // 675 / 27 = 25
//!   [ 12] = (5, 2, next =  0)   // 25 / 25 = 1
//! ```
//!
//! ## Algorithm
//!
//! Eratosthenes over odd integers. Marking for prime `p` starts at `p²`;
//! smaller odd multiples already carry a smaller prime. When marking
//! `j = p·k`, the cofactor `k` has either been marked with `p` already (so the
//! multiplicity continues from it) or its smallest factor exceeds `p` (so the
//! chain links to `k`). O(n log log n) time, 12 bytes per odd integer.

/// Floor on the table size so tiny runs still cover 3·5·23·29 = 10005.
pub const MIN_SIEVE_LIMIT: u32 = 3 * 5 * 23 * 29 + 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Entry {
    factor: u32,
    multiplicity: u32,
    next: u32,
}

/// Smallest-factor table over the odd integers `1..=limit`.
pub struct FactorSieve {
    limit: u32,
    entries: Vec<Entry>,
}

/// Sieve bound needed to factor every per-term constant of a `terms`-term run.
pub fn sieve_limit_for_terms(terms: u64) -> u32 {
    terms
        .saturating_mul(6)
        .clamp(MIN_SIEVE_LIMIT as u64, u32::MAX as u64) as u32
}

impl FactorSieve {
    /// Build the table for all odd integers up to and including `limit`.
    pub fn build(limit: u32) -> Self {
        let mut entries = vec![Entry::default(); limit as usize / 2 + 1];
        entries[0] = Entry {
            factor: 1,
            multiplicity: 1,
            next: 0,
        };

        let limit64 = limit as u64;
        let sqrt_limit = (limit as f64).sqrt() as u64;
        for i in (3..=limit64).step_by(2) {
            if entries[(i / 2) as usize].factor != 0 {
                continue;
            }
            entries[(i / 2) as usize] = Entry {
                factor: i as u32,
                multiplicity: 1,
                next: 0,
            };
            if i > sqrt_limit {
                continue;
            }
            // j = i·(2k+1), walking odd multiples from i² with cofactor index k.
            let mut j = i * i;
            let mut k = (i / 2) as usize;
            while j <= limit64 {
                let slot = (j / 2) as usize;
                if entries[slot].factor == 0 {
                    let cofactor = entries[k];
                    entries[slot] = if cofactor.factor == i as u32 {
                        Entry {
                            factor: i as u32,
                            multiplicity: cofactor.multiplicity + 1,
                            next: cofactor.next,
                        }
                    } else {
                        Entry {
                            factor: i as u32,
                            multiplicity: 1,
                            next: k as u32,
                        }
                    };
                }
                j += 2 * i;
                k += 1;
            }
        }

        FactorSieve { limit, entries }
    }

    /// Largest odd integer (or the bound itself) this table can factor.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Approximate heap footprint of the table in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.entries.len() * std::mem::size_of::<Entry>()
    }

    /// Smallest prime factor of odd `v` (1 for v = 1).
    pub fn smallest_factor(&self, v: u32) -> u32 {
        debug_assert!(v & 1 == 1 && v <= self.limit, "{} outside odd sieve range", v);
        self.entries[(v / 2) as usize].factor
    }

    /// Walk the factor chain of odd `v`, yielding `(prime, multiplicity)` pairs
    /// in increasing prime order. Yields nothing for v = 1.
    pub fn factorize(&self, v: u32) -> Factors<'_> {
        debug_assert!(v & 1 == 1 && v <= self.limit, "{} outside odd sieve range", v);
        Factors {
            entries: &self.entries,
            index: (v / 2) as usize,
        }
    }
}

/// Iterator over the factor chain of one odd integer.
pub struct Factors<'a> {
    entries: &'a [Entry],
    index: usize,
}

impl Iterator for Factors<'_> {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index == 0 {
            return None;
        }
        let entry = self.entries[self.index];
        self.index = entry.next as usize;
        Some((entry.factor, entry.multiplicity))
    }
}
