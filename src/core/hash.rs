//! World State Hashing
//!
//! SHA-256 digest over the live world. Two runs from the same seed fed the
//! same tick timestamps must end with equal digests.
//!
//! Layout fed to the hasher:
//!
//! ```text
//! "ecosim/world/1" | tick u64 | seed u32 | entity* (caller defined)
//! ```
//!
//! Floats are hashed by bit pattern, so `0.0` and `-0.0` differ.

use sha2::{Digest, Sha256};

use super::vec2::Vec2;

/// 32-byte digest.
pub type StateHash = [u8; 32];

const DOMAIN: &[u8] = b"ecosim/world/1";

/// Incremental little-endian hasher. Field order is part of the digest.
pub struct StateHasher {
    inner: Sha256,
    fields: u64,
}

impl StateHasher {
    fn new() -> Self {
        let mut inner = Sha256::new();
        inner.update(DOMAIN);
        Self { inner, fields: 0 }
    }

    /// Feed one byte.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.inner.update([value]);
        self.fields += 1;
    }

    /// Feed a `u32`.
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.inner.update(value.to_le_bytes());
        self.fields += 1;
    }

    /// Feed a `u64`.
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.inner.update(value.to_le_bytes());
        self.fields += 1;
    }

    /// Feed an `f32` by bit pattern.
    #[inline]
    pub fn update_f32(&mut self, value: f32) {
        self.update_u32(value.to_bits());
    }

    /// Feed `x` then `y`.
    #[inline]
    pub fn update_vec2(&mut self, value: Vec2) {
        self.update_f32(value.x);
        self.update_f32(value.y);
    }

    /// Number of fields fed so far.
    pub fn fields(&self) -> u64 {
        self.fields
    }

    fn finish(mut self) -> StateHash {
        // Field count terminates the stream
        self.inner.update(self.fields.to_le_bytes());
        self.inner.finalize().into()
    }
}

/// Digest `tick` and `seed`, then whatever `add_state` feeds.
pub fn compute_state_hash<F>(tick: u64, seed: u32, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::new();
    hasher.update_u64(tick);
    hasher.update_u32(seed);
    add_state(&mut hasher);
    hasher.finish()
}

// =============================================================================
// TESTS
// =============================================================================
