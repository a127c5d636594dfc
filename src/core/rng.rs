//! Deterministic Random Number Generator
//!
//! Linear congruential generator (Numerical Recipes constants) used by the
//! spawner and by every behavioural coin flip. Given the same seed the
//! sequence is identical on every platform, which is what makes a world
//! reproducible from its seed.

use serde::{Serialize, Deserialize};
use std::f32::consts::TAU;

/// LCG multiplier.
pub const LCG_MULTIPLIER: u32 = 1_664_525;

/// LCG increment.
pub const LCG_INCREMENT: u32 = 1_013_904_223;

/// Seeded LCG over `u32` (modulus 2^32 via wrapping arithmetic).
///
/// # Example
///
/// ```
/// use ecosim::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(7);
/// let mut b = DeterministicRng::new(7);
/// assert_eq!(a.next_u32(), b.next_u32());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    seed: u32,
    state: u32,
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new generator from a 32-bit seed.
    pub fn new(seed: u32) -> Self {
        Self { seed, state: seed }
    }

    /// The seed this generator was created with.
    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Current internal state (for snapshotting).
    #[inline]
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Restore internal state.
    #[inline]
    pub fn set_state(&mut self, state: u32) {
        self.state = state;
    }

    /// Advance and return the raw 32-bit state.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        self.state
    }

    /// Uniform float in `[0, 1)`.
    ///
    /// Uses the top 24 bits so the result is exactly representable and
    /// never rounds up to 1.0.
    #[inline]
    pub fn random(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform integer in `[min, max]` (both inclusive).
    #[inline]
    pub fn random_int(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        let span = (max - min + 1) as f32;
        let value = (self.random() * span).floor() as i32 + min;
        value.min(max)
    }

    /// Uniform float in `[min, max)`.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random() * (max - min)
    }

    /// Uniform heading in `[0, 2π)`.
    #[inline]
    pub fn random_angle(&mut self) -> f32 {
        self.random() * TAU
    }

    /// Bernoulli trial: true with probability `p`.
    #[inline]
    pub fn chance(&mut self, p: f32) -> bool {
        self.random() < p
    }
}

// =============================================================================
// TESTS
// =============================================================================
