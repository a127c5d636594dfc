//! Entity Record
//!
//! One tagged record per simulated object, composed of a body, a collider
//! and a species-specific component. The world table owns every record;
//! everything else refers to entities by id.

use crate::core::ids::EntityId;
use crate::game::animal::Animal;
use crate::game::body::Body;
use crate::game::collider::Collider;
use crate::game::grid::{CellKeys, GridId, GRID_COUNT};
use crate::game::plant::Plant;
use crate::game::species::{Species, SpeciesProfile};

/// Species-specific component.
#[derive(Clone, Debug)]
pub enum EntityKind {
    /// Rooted producer
    Plant(Plant),
    /// Behaving agent
    Animal(Animal),
}

/// A simulated object.
#[derive(Clone, Debug)]
pub struct Entity {
    /// Identifier (may be reused after the quarantine delay)
    pub id: EntityId,
    /// Species tag
    pub species: Species,
    /// Cleared on destroy, before the record leaves the table
    pub spawned: bool,
    /// Unique per spawn, distinguishes two holders of a reused id
    pub serial: u64,
    /// Transform and motion
    pub body: Body,
    /// Contact shape and physical properties
    pub collider: Collider,
    /// Hit points; at or below zero the entity dies
    pub health: f32,
    /// Plant or animal state
    pub kind: EntityKind,
    pub(crate) cells: [CellKeys; GRID_COUNT],
    pub(crate) last_query: u32,
}

impl Entity {
    /// Build a live record.
    pub fn new(
        id: EntityId,
        species: Species,
        serial: u64,
        body: Body,
        collider: Collider,
        health: f32,
        kind: EntityKind,
    ) -> Self {
        Self {
            id,
            species,
            spawned: true,
            serial,
            body,
            collider,
            health,
            kind,
            cells: Default::default(),
            last_query: 0,
        }
    }

    /// Registry row for this entity's species.
    #[inline]
    pub fn profile(&self) -> &'static SpeciesProfile {
        self.species.profile()
    }

    /// Collider mass.
    #[inline]
    pub fn mass(&self) -> f32 {
        self.collider.mass
    }

    /// Animal component, if any.
    pub fn animal(&self) -> Option<&Animal> {
        match &self.kind {
            EntityKind::Animal(animal) => Some(animal),
            EntityKind::Plant(_) => None,
        }
    }

    /// Mutable animal component, if any.
    pub fn animal_mut(&mut self) -> Option<&mut Animal> {
        match &mut self.kind {
            EntityKind::Animal(animal) => Some(animal),
            EntityKind::Plant(_) => None,
        }
    }

    /// Plant component, if any.
    pub fn plant(&self) -> Option<&Plant> {
        match &self.kind {
            EntityKind::Plant(plant) => Some(plant),
            EntityKind::Animal(_) => None,
        }
    }

    /// Cell keys recorded for one grid.
    #[inline]
    pub fn cell_keys(&self, grid: GridId) -> &CellKeys {
        &self.cells[grid.slot()]
    }
}
