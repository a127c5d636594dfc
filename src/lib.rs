//! # Ecosim
//!
//! Tick-driven ecological simulation: plants, herbivores and carnivores
//! move, collide, feed, reproduce and die inside a bounded 2D world. Each
//! tick the world is published as a compact binary frame into a
//! lock-guarded shared buffer read by a presentation side.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          ECOSIM                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── vec2.rs     - 2D vector                                 │
//! │  ├── rng.rs      - Seeded LCG spawner                        │
//! │  ├── polygon.rs  - Biomes, convex hull, area sampling        │
//! │  ├── ids.rs      - Id allocation                             │
//! │  ├── bitset.rs   - Pair de-duplication set                   │
//! │  └── hash.rs     - World state hashing                       │
//! │                                                              │
//! │  game/           - Simulation                                │
//! │  ├── grid.rs     - Spatial hash grids                        │
//! │  ├── collider.rs - Contact detection and impulses            │
//! │  ├── animal.rs   - Behaviour state machine                   │
//! │  ├── plant.rs    - Rooted producers                          │
//! │  ├── world.rs    - Simulation context                        │
//! │  └── game_loop.rs- Fixed-tick driver                         │
//! │                                                              │
//! │  channel/        - Producer/consumer frames                  │
//! │  ├── shared.rs   - Lock word + payload                       │
//! │  ├── writer.rs   - Little-endian and bit packing             │
//! │  └── frame.rs    - Publish / poll                            │
//! │                                                              │
//! │  worker.rs       - Simulation thread and command handling    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! The world is reproducible from its seed and the sequence of tick
//! timestamps:
//! - Entities live in a `BTreeMap` and are visited in id order
//! - All randomness comes from the world's seeded LCG
//! - Nothing inside `game/` reads the system clock
//!
//! [`World::compute_hash`] condenses the state into a SHA-256 digest.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod channel;
pub mod config;
pub mod error;
pub mod worker;

// Re-export commonly used types
pub use core::vec2::Vec2;
pub use core::rng::DeterministicRng;
pub use core::ids::EntityId;
pub use config::{PopulationConfig, SimConfig};
pub use error::{SimError, SimResult};
pub use game::{GameLoop, Species, TickMode, TickOutcome, World};
pub use channel::{Command, FrameConsumer, Snapshot, StatsReport};
pub use worker::SimulationHandle;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
