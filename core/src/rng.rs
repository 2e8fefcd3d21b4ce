//! Deterministic random number generation for demo data.
//!
//! RULE: The demo seeder never calls a platform RNG.
//! All randomness flows through DemoRng streams derived from one seed.
//!
//! Each kind of generated record draws from its own stream, seeded from
//! (seed XOR stream index). Adding a stream never shifts the others.

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct DemoRng {
    pub stream: DemoStream,
    inner: Pcg64Mcg,
}

impl DemoRng {
    pub fn new(seed: u64, stream: DemoStream) -> Self {
        let derived = seed ^ (stream as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            stream,
            inner: Pcg64Mcg::seed_from_u64(derived),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Roll an index in [0, n). `n` must be non-zero.
    pub fn below(&mut self, n: usize) -> usize {
        self.inner.gen_range(0..n)
    }

    /// Roll an integer in the inclusive range.
    pub fn between(&mut self, lo: i64, hi: i64) -> i64 {
        self.inner.gen_range(lo..=hi)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Bernoulli trial: true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one element of a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len())]
    }

    /// An amount in [lo, hi) rounded to a multiple of `step`.
    pub fn amount(&mut self, lo: f64, hi: f64, step: f64) -> f64 {
        let raw = lo + self.next_f64() * (hi - lo);
        ((raw / step).round() * step).max(step)
    }
}

/// Stable stream assignments.
/// NEVER reorder or remove entries. Only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum DemoStream {
    Clients = 0,
    Cheques = 1,
    Cash = 2,
    Invoices = 3,
}
