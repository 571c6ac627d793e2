//! Injected randomness for generation, plus deterministic seed mixing.
//!
//! Every draw made by the grammar and layout stages goes through a
//! [`RandomSource`] handed in by the caller. Nothing in this crate touches a
//! global generator, so a fixed seed always reproduces the same dungeon.

use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};

/// Capability used by generation code to draw random numbers.
///
/// Implementors only provide [`next_u64`](RandomSource::next_u64); the other
/// draws are derived from it so that every implementation consumes its
/// stream in the same way.
pub trait RandomSource {
    fn next_u64(&mut self) -> u64;

    /// Uniform integer in `0..bound`. Returns 0 without drawing when `bound` is 0.
    fn next_int(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        (self.next_u64() % u64::from(bound)) as u32
    }

    /// Uniform float in `[0, 1)`.
    fn next_float(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1_u64 << 24) as f32
    }

    /// Picks an index with probability proportional to its weight.
    /// Returns `None` when every weight is zero.
    fn weighted_pick(&mut self, weights: &[u32]) -> Option<usize> {
        let total: u64 = weights.iter().map(|&weight| u64::from(weight)).sum();
        if total == 0 {
            return None;
        }
        let mut roll = self.next_u64() % total;
        for (index, &weight) in weights.iter().enumerate() {
            let weight = u64::from(weight);
            if roll < weight {
                return Some(index);
            }
            roll -= weight;
        }
        None
    }

    /// Uniform integer in `min..=max`. Returns `min` without drawing when the range is empty.
    fn range_inclusive(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = max.abs_diff(min).saturating_add(1);
        (i64::from(min) + i64::from(self.next_int(span))) as i32
    }

    /// True with probability `chance`.
    fn roll(&mut self, chance: f32) -> bool {
        if chance >= 1.0 {
            return true;
        }
        if chance <= 0.0 {
            return false;
        }
        self.next_float() < chance
    }
}

/// Fisher-Yates shuffle driven by `rng`.
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for index in (1..items.len()).rev() {
        let other = rng.next_int(index as u32 + 1) as usize;
        items.swap(index, other);
    }
}

/// ChaCha8-backed [`RandomSource`].
#[derive(Clone, Debug)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl RandomSource for SeededRandom {
    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

/// Seed for regeneration attempt `attempt` of a run. Attempt 0 uses the run seed unchanged.
pub fn derive_attempt_seed(run_seed: u64, attempt: u32) -> u64 {
    if attempt == 0 {
        return run_seed;
    }
    let mut mixed = run_seed ^ 0x9E37_79B9_7F4A_7C15;
    mixed ^= u64::from(attempt).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    mixed ^= mixed >> 30;
    mixed = mixed.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    mixed ^= mixed >> 27;
    mixed = mixed.wrapping_mul(0x94D0_49BB_1331_11EB);
    mixed ^ (mixed >> 31)
}
