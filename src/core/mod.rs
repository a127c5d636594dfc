//! Core deterministic primitives.
//!
//! Geometry, the seeded generator, id allocation and hashing. Nothing in
//! here knows about species or the game loop.

pub mod vec2;
pub mod angle;
pub mod rng;
pub mod ids;
pub mod bitset;
pub mod polygon;
pub mod hash;

// Re-export core types
pub use vec2::Vec2;
pub use rng::DeterministicRng;
pub use ids::{EntityId, IdAllocator};
pub use bitset::BitSet;
pub use polygon::{Bounds, Polygon};
pub use hash::{compute_state_hash, StateHash};
