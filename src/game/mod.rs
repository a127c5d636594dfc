//! Simulation Module
//!
//! Everything that advances the world. Deterministic for a given seed and
//! sequence of tick timestamps.
//!
//! ## Module Structure
//!
//! - `species`: Species tags and the static registry
//! - `body`: Transform and motion integration
//! - `collider`: Shape dispatch and impulse resolution
//! - `grid`: Spatial hash grids
//! - `entity`: Entity record (body + collider + component)
//! - `behavior`: Per-species hooks
//! - `animal`: Behaviour state machine, bites, reproduction
//! - `plant`: Rooted producers and replication
//! - `map`: Biomes, world outline and bounds
//! - `timer`: Scheduled tasks
//! - `world`: The simulation context
//! - `spawn`: Initial population
//! - `game_loop`: Fixed-tick driver

pub mod species;
pub mod body;
pub mod collider;
pub mod grid;
pub mod entity;
pub mod behavior;
pub mod animal;
pub mod plant;
pub mod map;
pub mod timer;
pub mod world;
pub mod spawn;
pub mod game_loop;

// Re-export key types
pub use species::{Species, SpeciesProfile};
pub use entity::{Entity, EntityKind};
pub use animal::{Animal, BehaviorState};
pub use plant::Plant;
pub use world::{Census, IdSpan, World};
pub use game_loop::{GameLoop, TickMode, TickOutcome};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::SimConfig;
    use crate::core::vec2::Vec2;
    use crate::game::world::World;

    /// A point well inside the default world.
    pub const CENTER: Vec2 = Vec2::new(2500.0, 2000.0);

    /// Default-configured world with no entities.
    pub fn empty_world(seed: u32) -> World {
        World::new(&SimConfig::default(), seed).unwrap()
    }
}
