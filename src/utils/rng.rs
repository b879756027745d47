//! Seeded random number generator for weight initialization.
//!
//! A lightweight xorshift PRNG. The generator is seeded once by whoever owns
//! the training run and then passed by reference to every allocation, so two
//! layers allocated back to back draw from one stream instead of sharing a
//! clock-derived seed.

use crate::utils::precision::Accum;

const FALLBACK_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Explicitly seeded xorshift generator.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { FALLBACK_SEED } else { seed };
        Self { state }
    }

    /// Basic xorshift to generate u32.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Convert to [0, 1].
    pub fn next_unit(&mut self) -> Accum {
        Accum::from(self.next_u32()) / Accum::from(u32::MAX)
    }

    /// Uniform sample in [low, high].
    pub fn gen_range(&mut self, low: Accum, high: Accum) -> Accum {
        low + (high - low) * self.next_unit()
    }
}
