//! World State
//!
//! The simulation context: the authoritative entity table plus every
//! subsystem that refers into it (grids, scheduler, generator, map).
//! Constructed once per run and passed explicitly; there is no global
//! instance.
//!
//! ## Ownership
//!
//! Entities live only in `entities`. Grid cells, animal targets and
//! scheduled tasks hold ids. A destroyed entity is first marked
//! `spawned = false` so interactions later in the same tick see a dead
//! record instead of a missing one, then leaves the table at the end of
//! the tick. Its id returns to the allocator after a quarantine delay.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::config::SimConfig;
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::ids::{EntityId, IdAllocator};
use crate::core::polygon::Bounds;
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::error::SimResult;
use crate::game::body::Body;
use crate::game::collider::{collide, Collider};
use crate::game::entity::{Entity, EntityKind};
use crate::game::grid::{BySpecies, GridId, HashGrid, Untyped};
use crate::game::map::GameMap;
use crate::game::species::Species;
use crate::game::timer::{Scheduler, TaskKind};

/// Delay before a destroyed entity's id may be reused.
pub const ID_QUARANTINE_MS: u64 = 1000;

/// Live id range of the entities filed in the dynamic grid this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdSpan {
    /// Smallest id
    pub min: EntityId,
    /// Largest id
    pub max: EntityId,
}

impl IdSpan {
    fn include(span: &mut Option<IdSpan>, id: EntityId) {
        match span {
            Some(s) => {
                s.min = s.min.min(id);
                s.max = s.max.max(id);
            }
            None => *span = Some(IdSpan { min: id, max: id }),
        }
    }
}

/// Live population per species.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Census {
    /// Plants
    pub plants: u32,
    /// Herbivores
    pub herbivores: u32,
    /// Carnivores
    pub carnivores: u32,
}

/// The simulation context.
pub struct World {
    pub(crate) entities: BTreeMap<EntityId, Entity>,
    ids: IdAllocator,
    pub(crate) rng: DeterministicRng,
    pub(crate) map: GameMap,
    pub(crate) dynamic_grid: HashGrid<Untyped>,
    pub(crate) static_grid: HashGrid<BySpecies>,
    scheduler: Scheduler,
    pending_removal: Vec<EntityId>,
    pub(crate) now: u64,
    pub(crate) speed: f32,
    tick: u64,
    next_serial: u64,
    pair_buffer: Vec<(EntityId, EntityId)>,
}

impl World {
    /// Empty world built from configuration.
    pub fn new(config: &SimConfig, seed: u32) -> SimResult<Self> {
        config.validate()?;
        let map = GameMap::from_config(&config.map)?;
        let extent = map.bounds().max;

        Ok(Self {
            entities: BTreeMap::new(),
            ids: IdAllocator::new(),
            rng: DeterministicRng::new(seed),
            dynamic_grid: HashGrid::new(GridId::Dynamic, config.grids.dynamic_cell, extent, false),
            static_grid: HashGrid::new(GridId::Static, config.grids.static_cell, extent, true),
            map,
            scheduler: Scheduler::new(),
            pending_removal: Vec::new(),
            now: 0,
            speed: 1.0,
            tick: 0,
            next_serial: 0,
            pair_buffer: Vec::new(),
        })
    }

    /// Seed the world was created with.
    pub fn seed(&self) -> u32 {
        self.rng.seed()
    }

    /// Clock of the current tick in milliseconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulation speed multiplier.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Set the speed multiplier (cooldowns are divided by it).
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// World geometry.
    pub fn map(&self) -> &GameMap {
        &self.map
    }

    /// World bounds.
    pub fn bounds(&self) -> Bounds {
        self.map.bounds()
    }

    /// Live entity by id.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id).filter(|e| e.spawned)
    }

    /// Mutable live entity by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id).filter(|e| e.spawned)
    }

    /// True if `id` names a live entity.
    #[inline]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Live entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| e.spawned)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities().count()
    }

    /// True if no entity is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live entities of one species.
    pub fn count(&self, species: Species) -> usize {
        self.entities().filter(|e| e.species == species).count()
    }

    /// Live population per species.
    pub fn census(&self) -> Census {
        let mut census = Census::default();
        for entity in self.entities() {
            match entity.species {
                Species::Plant => census.plants += 1,
                Species::Herbivore => census.herbivores += 1,
                Species::Carnivore => census.carnivores += 1,
            }
        }
        census
    }

    /// Spawn one entity of `species` at `position`.
    pub fn spawn(&mut self, species: Species, position: Vec2) -> EntityId {
        match species {
            Species::Plant => self.place_plant(position),
            Species::Herbivore | Species::Carnivore => self.spawn_animal(species, position),
        }
    }

    /// Allocate an id and add a record to the table.
    pub(crate) fn insert_entity(
        &mut self,
        species: Species,
        body: Body,
        collider: Collider,
        health: f32,
        kind: EntityKind,
    ) -> EntityId {
        let id = self.ids.allocate();
        self.next_serial += 1;
        let entity = Entity::new(id, species, self.next_serial, body, collider, health, kind);
        self.entities.insert(id, entity);
        id
    }

    /// Mark an entity dead, pull it from the static grid and quarantine
    /// its id. Returns false if it was not alive.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        if !entity.spawned {
            return false;
        }
        entity.spawned = false;

        let species = entity.species;
        if !species.profile().dynamic {
            self.static_grid
                .remove(id, species, &mut entity.cells[GridId::Static.slot()]);
        }

        let remains = entity
            .animal()
            .map(|animal| (entity.body.position, entity.body.size.x, animal.energy <= 0.0));

        self.pending_removal.push(id);
        self.scheduler
            .schedule(self.now + ID_QUARANTINE_MS, TaskKind::ReleaseId(id));
        trace!(id, %species, "entity destroyed");

        if let Some((position, size, starved)) = remains {
            self.drop_remains(species, position, size, starved);
        }
        true
    }

    /// Drag override: place an entity at `position` (clamped into bounds).
    pub fn move_entity(&mut self, id: EntityId, position: Vec2) -> bool {
        let position = self.map.constrain(position);
        let Some(entity) = self.entities.get_mut(&id).filter(|e| e.spawned) else {
            return false;
        };
        entity.body.position = position;
        entity.body.previous_position = position;
        entity.body.velocity = Vec2::ZERO;
        if let EntityKind::Plant(plant) = &mut entity.kind {
            plant.root = position;
        }
        if !entity.species.profile().dynamic {
            self.refile_static(id);
        }
        true
    }

    pub(crate) fn schedule_in(&mut self, delay_ms: u64, kind: TaskKind) {
        self.scheduler.schedule(self.now + delay_ms, kind);
    }

    /// Set the clock for the coming tick.
    pub fn advance_clock(&mut self, now: u64) {
        self.now = now;
    }

    /// Run every task due at the current clock. Returns how many ran.
    pub fn run_due_tasks(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.scheduler.pop_due(self.now) {
            match task {
                TaskKind::Reaim { id, serial } => self.reaim(id, serial),
                TaskKind::ReleaseId(id) => {
                    self.ids.release(id);
                }
            }
            ran += 1;
        }
        ran
    }

    /// Update every updatable entity and rebuild the dynamic grid.
    ///
    /// Returns the id span of the entities filed in the dynamic grid.
    pub fn update_entities(&mut self, dt: f32) -> SimResult<Option<IdSpan>> {
        let ids: Vec<EntityId> = self
            .entities()
            .filter(|e| e.profile().updatable)
            .map(|e| e.id)
            .collect();

        let mut span = None;
        for id in ids {
            let Some(entity) = self.get(id) else {
                continue;
            };
            let profile = entity.profile();
            profile.behavior.update(self, id, dt)?;
            if profile.dynamic && self.is_live(id) {
                IdSpan::include(&mut span, id);
            }
        }
        Ok(span)
    }

    /// Dispatch every de-duplicated pair of the dynamic grid.
    pub fn resolve_pairs(&mut self, span: IdSpan) -> SimResult<usize> {
        let mut pairs = std::mem::take(&mut self.pair_buffer);
        pairs.clear();
        self.dynamic_grid
            .pairwise_combination(span.min, span.max, true, |a, b| pairs.push((a, b)));

        let mut dispatched = 0;
        for &(a, b) in &pairs {
            if self.is_live(a) && self.is_live(b) {
                self.interact(a, b)?;
                dispatched += 1;
            }
        }

        self.pair_buffer = pairs;
        Ok(dispatched)
    }

    fn interact(&mut self, a: EntityId, b: EntityId) -> SimResult<()> {
        let (Some(first), Some(second)) = (self.get(a), self.get(b)) else {
            return Ok(());
        };
        let (pa, pb) = (first.profile(), second.profile());

        let overlapping = if pa.collidable && pb.collidable {
            self.collide_pair(a, b)?
        } else {
            false
        };

        pa.behavior.dynamic_interaction(self, a, b, overlapping)?;
        if self.is_live(a) && self.is_live(b) {
            pb.behavior.dynamic_interaction(self, b, a, overlapping)?;
        }
        Ok(())
    }

    /// Resolve contact between two live entities.
    pub(crate) fn collide_pair(&mut self, a: EntityId, b: EntityId) -> SimResult<bool> {
        if a == b || !self.is_live(a) {
            return Ok(false);
        }
        let Some(mut first) = self.entities.remove(&a) else {
            return Ok(false);
        };
        let result = match self.entities.get_mut(&b).filter(|e| e.spawned) {
            Some(second) => {
                let touched = collide(
                    &mut first.body,
                    &first.collider,
                    &mut second.body,
                    &second.collider,
                );
                if matches!(touched, Ok(true)) {
                    second.body.position = self.map.constrain(second.body.position);
                    first.body.position = self.map.constrain(first.body.position);
                }
                touched
            }
            None => Ok(false),
        };
        self.entities.insert(a, first);
        result
    }

    /// Drop records destroyed this tick from the table.
    pub fn flush_removals(&mut self) -> usize {
        let count = self.pending_removal.len();
        for id in self.pending_removal.drain(..) {
            if self.entities.get(&id).is_some_and(|e| !e.spawned) {
                self.entities.remove(&id);
            }
        }
        count
    }

    /// Close the tick: the dynamic grid is rebuilt next tick.
    pub fn end_tick(&mut self) {
        self.dynamic_grid.clear();
        self.tick += 1;
    }

    /// Run one full tick at `now` with step `dt`, without publishing.
    pub fn step(&mut self, now: u64, dt: f32) -> SimResult<()> {
        self.advance_clock(now);
        self.run_due_tasks();
        if let Some(span) = self.update_entities(dt)? {
            self.resolve_pairs(span)?;
        }
        self.flush_removals();
        self.end_tick();
        Ok(())
    }

    /// SHA-256 over tick, seed and every live entity.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.seed(), |hasher| {
            for entity in self.entities() {
                hasher.update_u32(entity.id);
                hasher.update_u8(entity.species.tag());
                hasher.update_vec2(entity.body.position);
                hasher.update_f32(entity.body.angle);
                hasher.update_vec2(entity.body.size);
                hasher.update_f32(entity.health);
                if let Some(animal) = entity.animal() {
                    hasher.update_u8(animal.state as u8);
                    hasher.update_f32(animal.energy);
                }
            }
        })
    }

    pub(crate) fn log_population(&self) {
        let census = self.census();
        debug!(
            plants = census.plants,
            herbivores = census.herbivores,
            carnivores = census.carnivores,
            "population"
        );
    }
}

/// True once `cooldown_ms` (scaled by `speed`) has passed since `last_ms`.
#[inline]
pub(crate) fn cooldown_elapsed(last_ms: Option<u64>, cooldown_ms: u64, now: u64, speed: f32) -> bool {
    match last_ms {
        None => true,
        Some(last) => {
            let speed = if speed > 0.0 { f64::from(speed) } else { 1.0 };
            last as f64 + cooldown_ms as f64 / speed <= now as f64
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
