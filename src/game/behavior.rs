//! Species Behaviour
//!
//! Hooks the world calls for each capability a species has. The registry
//! row decides whether an entity is updated and whether it collides; the
//! hooks decide what it does.

use crate::core::ids::EntityId;
use crate::error::SimResult;
use crate::game::world::World;

/// Per-species behaviour hooks.
pub trait SpeciesBehavior: Sync {
    /// Advance one entity by `dt`.
    fn update(&self, world: &mut World, id: EntityId, dt: f32) -> SimResult<()>;

    /// React to another entity sharing a dynamic grid cell. `overlapping`
    /// is the contact result of this tick's collision pass for the pair.
    fn dynamic_interaction(
        &self,
        _world: &mut World,
        _id: EntityId,
        _other: EntityId,
        _overlapping: bool,
    ) -> SimResult<()> {
        Ok(())
    }

    /// Interact with nearby entities of the static grid.
    fn static_interaction(&self, _world: &mut World, _id: EntityId) -> SimResult<()> {
        Ok(())
    }

    /// Called after surviving a bite from `biter`.
    fn bite_reaction(&self, _world: &mut World, _id: EntityId, _biter: EntityId) {}
}

/// Rooted producer: springs back to its root.
pub struct PlantBehavior;

impl SpeciesBehavior for PlantBehavior {
    fn update(&self, world: &mut World, id: EntityId, dt: f32) -> SimResult<()> {
        world.update_plant(id, dt);
        Ok(())
    }
}

/// Grazer: eats plants, flees carnivores.
pub struct HerbivoreBehavior;

impl SpeciesBehavior for HerbivoreBehavior {
    fn update(&self, world: &mut World, id: EntityId, dt: f32) -> SimResult<()> {
        world.update_animal(id, dt)
    }

    fn dynamic_interaction(
        &self,
        world: &mut World,
        id: EntityId,
        other: EntityId,
        overlapping: bool,
    ) -> SimResult<()> {
        world.notice_predator(id, other);
        world.find_partner(id, other, overlapping);
        Ok(())
    }

    fn static_interaction(&self, world: &mut World, id: EntityId) -> SimResult<()> {
        world.graze(id)
    }

    fn bite_reaction(&self, world: &mut World, id: EntityId, biter: EntityId) {
        world.flee_from(id, biter);
    }
}

/// Hunter: bites herbivores, pushes through plants.
pub struct CarnivoreBehavior;

impl SpeciesBehavior for CarnivoreBehavior {
    fn update(&self, world: &mut World, id: EntityId, dt: f32) -> SimResult<()> {
        world.update_animal(id, dt)
    }

    fn dynamic_interaction(
        &self,
        world: &mut World,
        id: EntityId,
        other: EntityId,
        overlapping: bool,
    ) -> SimResult<()> {
        world.attack(id, other, overlapping);
        world.find_partner(id, other, overlapping);
        Ok(())
    }

    fn static_interaction(&self, world: &mut World, id: EntityId) -> SimResult<()> {
        world.push_through_plants(id)
    }
}
