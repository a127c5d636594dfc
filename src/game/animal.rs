//! Animal Behaviour
//!
//! Finite-state behaviour shared by herbivores and carnivores.
//!
//! ```text
//!            energy <= threshold
//!   ┌──────┐ ───────────────────▶ ┌───────────┐  candidate in view  ┌─────────┐
//!   │ Idle │                      │ Searching │ ──────────────────▶ │ Hunting │
//!   └──────┘ ◀─────────────────── └───────────┘                     └─────────┘
//!      ▲  ▲      target lost             │ predator within 2×view        │
//!      │  │                              ▼                               │
//!      │  │   predator lost        ┌──────────┐ ◀────────────────────────┘
//!      │  └─────────────────────── │ Escaping │
//!      │                           └──────────┘
//!      │ offspring born        ┌─────────────┐
//!      └────────────────────── │ Reproducing │ ◀── energy high, cooldown over
//!                              └─────────────┘
//! ```
//!
//! The state is re-evaluated every update; headings are re-aimed by a
//! scheduled task on a short cadence while chasing or fleeing and on a
//! slow cadence while wandering.

use std::f32::consts::{FRAC_PI_2, PI};
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::core::angle::angle_distance;
use crate::core::ids::EntityId;
use crate::core::vec2::Vec2;
use crate::error::SimResult;
use crate::game::body::Body;
use crate::game::collider::Collider;
use crate::game::entity::EntityKind;
use crate::game::species::Species;
use crate::game::timer::TaskKind;
use crate::game::world::{cooldown_elapsed, World};

/// Energy ceiling and spawn energy.
pub const MAX_ENERGY: f32 = 100.0;

/// Facing-cone half-angle inside which a bite lands.
pub const BITE_CONE: f32 = FRAC_PI_2;

/// Minimum time between two bites.
pub const BITE_COOLDOWN_MS: u64 = 1000;

/// Minimum time between two litters.
pub const REPRODUCTION_COOLDOWN_MS: u64 = 10_000;

/// Probability per update of entering `Reproducing` once eligible.
pub const REPRODUCTION_CHANCE: f32 = 0.55;

/// Probability of switching to a closer candidate target.
pub const TARGET_SWITCH_CHANCE: f32 = 0.25;

/// View distance per unit of size.
pub const VIEW_PER_SIZE: f32 = 7.0;

/// Energy gained per bite of a plant.
pub const PLANT_GRAZE_ENERGY: f32 = 5.0;

/// Size factor applied to a grazed plant.
pub const PLANT_GRAZE_SHRINK: f32 = 0.8;

/// Energy gained per non-lethal bite of an animal.
pub const PREY_BITE_ENERGY: f32 = 3.0;

/// Energy gained per unit of mass of a killed herbivore.
pub const KILL_ENERGY_PER_MASS: f32 = 1.0;

/// Probability that a death leaves plant matter behind.
pub const REMAINS_CHANCE: f32 = 0.65;

/// Body size converted into one plant replication.
pub const REMAINS_SIZE_UNIT: f32 = 40.0;

/// Re-aim delay while wandering (ms, inclusive).
pub const IDLE_REAIM_MS: (i32, i32) = (1000, 2000);

/// Re-aim delay while chasing or fleeing (ms, inclusive).
pub const ACTIVE_REAIM_MS: (i32, i32) = (50, 300);

/// Total heading jitter applied on re-aim.
pub const AIM_JITTER: f32 = PI / 5.0;

/// Behaviour state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorState {
    /// Wandering
    #[default]
    Idle,
    /// Looking for food
    Searching,
    /// Chasing a target
    Hunting,
    /// Running from a predator
    Escaping,
    /// Looking for a mate
    Reproducing,
}

/// Animal component.
#[derive(Clone, Debug, PartialEq)]
pub struct Animal {
    /// Current behaviour
    pub state: BehaviorState,
    /// Depletes with movement, replenished by feeding
    pub energy: f32,
    /// Prey or mate being pursued
    pub target: Option<EntityId>,
    /// Threat being escaped
    pub predator: Option<EntityId>,
    /// Health removed per landed bite
    pub damage: f32,
    /// Sight range
    pub view_distance: f32,
    /// Facing-cone half-angle for bites
    pub bite_radius: f32,
    /// Clock of the last landed bite
    pub last_bite_ms: Option<u64>,
    /// Time between bites
    pub bite_cooldown_ms: u64,
    /// Clock of the last litter (spawn time for newborns)
    pub last_reproduction_ms: Option<u64>,
    /// Time between litters
    pub reproduction_cooldown_ms: u64,
}

impl Animal {
    fn reset(&mut self, state: BehaviorState) {
        self.state = state;
        self.target = None;
        self.predator = None;
    }
}

impl World {
    /// Spawn an animal with freshly sampled genetics.
    pub(crate) fn spawn_animal(&mut self, species: Species, position: Vec2) -> EntityId {
        let profile = species.profile();
        let position = self.map.constrain(position);

        let (min_size, max_size) = profile.size_range;
        let size = self.rng.random_int(min_size, max_size) as f32;
        let mass = (size / 40.0).powi(2);
        let damage = 5.0 + size / 15.0 * (3.0 + 2.0 * self.rng.random());
        let rotation_speed = 0.15 / mass.cbrt() * (0.8 + 0.4 * self.rng.random());
        let move_speed = profile.base_move_speed / mass.sqrt() * (0.7 + 0.6 * self.rng.random());
        let angle = self.rng.random_angle();

        let mut body = Body::new(position, Vec2::splat(size), angle);
        body.move_speed = move_speed;
        body.rotation_speed = rotation_speed;

        let animal = Animal {
            state: BehaviorState::Idle,
            energy: MAX_ENERGY,
            target: None,
            predator: None,
            damage,
            view_distance: VIEW_PER_SIZE * size,
            bite_radius: BITE_CONE,
            last_bite_ms: None,
            bite_cooldown_ms: BITE_COOLDOWN_MS,
            last_reproduction_ms: Some(self.now),
            reproduction_cooldown_ms: REPRODUCTION_COOLDOWN_MS,
        };

        let id = self.insert_entity(
            species,
            body,
            Collider::circle(mass),
            2.0 * size,
            EntityKind::Animal(animal),
        );

        if let Some(serial) = self.get(id).map(|e| e.serial) {
            let delay = self.rng.random_int(IDLE_REAIM_MS.0, IDLE_REAIM_MS.1);
            self.schedule_in(delay as u64, TaskKind::Reaim { id, serial });
        }
        id
    }

    /// Behaviour, integration, energy and grid filing for one animal.
    pub(crate) fn update_animal(&mut self, id: EntityId, dt: f32) -> SimResult<()> {
        let now = self.now;
        let speed = self.speed;
        let bounds = self.map.bounds();

        let reproduce_roll = self.rng.random();
        let Some(entity) = self.get_mut(id) else {
            return Ok(());
        };
        let profile = entity.profile();
        let Some(animal) = entity.animal_mut() else {
            return Ok(());
        };

        let hunting_fed =
            animal.state == BehaviorState::Hunting && animal.energy > profile.energy_threshold;
        if animal.state != BehaviorState::Escaping && !hunting_fed {
            if animal.energy <= profile.energy_threshold {
                if animal.state != BehaviorState::Searching && animal.state != BehaviorState::Hunting
                {
                    animal.reset(BehaviorState::Searching);
                }
            } else if animal.state != BehaviorState::Reproducing
                && cooldown_elapsed(
                    animal.last_reproduction_ms,
                    animal.reproduction_cooldown_ms,
                    now,
                    speed,
                )
                && reproduce_roll < REPRODUCTION_CHANCE
            {
                animal.reset(BehaviorState::Reproducing);
            }
        }

        entity.body.integrate(dt, &bounds);

        let drain = entity.body.move_speed * dt * profile.energy_drain;
        let position = entity.body.position;
        let Some(animal) = entity.animal_mut() else {
            return Ok(());
        };
        animal.energy -= drain;
        if animal.energy <= 0.0 {
            animal.energy = 0.0;
            self.destroy(id);
            return Ok(());
        }
        let range = Vec2::splat(2.0 * animal.view_distance);

        self.dynamic_grid
            .insert(id, profile.species, position, range, None);
        profile.behavior.static_interaction(self, id)
    }

    /// Scheduled heading update.
    pub(crate) fn reaim(&mut self, id: EntityId, serial: u64) {
        let Some(entity) = self.get(id).filter(|e| e.serial == serial) else {
            return;
        };
        let Some(animal) = entity.animal() else {
            return;
        };
        let position = entity.body.position;
        let view = animal.view_distance;
        let predator = animal.predator;
        let target = animal.target;

        let predator_at = predator.and_then(|p| self.get(p)).map(|p| p.body.position);
        let target_at = target.and_then(|t| self.get(t)).map(|t| t.body.position);

        let mut heading = None;
        let mut active = false;
        let mut lost = false;

        if predator.is_some() {
            match predator_at.filter(|at| at.distance(position) <= 2.0 * view) {
                Some(at) => {
                    heading = Some(position.angle_to(at) + PI + self.aim_jitter());
                    active = true;
                }
                None => lost = true,
            }
        } else if target.is_some() {
            match target_at.filter(|at| at.distance(position) <= view) {
                Some(at) => {
                    heading = Some(position.angle_to(at) + self.aim_jitter());
                    active = true;
                }
                None => lost = true,
            }
        }
        if heading.is_none() {
            heading = Some(self.rng.random_angle());
        }

        let (lo, hi) = if active { ACTIVE_REAIM_MS } else { IDLE_REAIM_MS };
        let delay = self.rng.random_int(lo, hi) as u64;

        if let Some(entity) = self.get_mut(id) {
            if let Some(angle) = heading {
                entity.body.steer(angle);
            }
            if lost {
                if let Some(animal) = entity.animal_mut() {
                    animal.reset(BehaviorState::Idle);
                }
            }
        }
        self.schedule_in(delay, TaskKind::Reaim { id, serial });
    }

    fn aim_jitter(&mut self) -> f32 {
        self.rng.random_range(-AIM_JITTER / 2.0, AIM_JITTER / 2.0)
    }

    /// Attempt a bite. Returns true if it landed.
    pub fn bite(&mut self, attacker: EntityId, target: EntityId, overlapping: bool) -> bool {
        if attacker == target || !overlapping {
            return false;
        }
        let (now, speed) = (self.now, self.speed);
        let Some(victim) = self.get(target) else {
            return false;
        };
        let (victim_at, victim_species, victim_mass) =
            (victim.body.position, victim.species, victim.mass());

        let Some(biter) = self.get(attacker) else {
            return false;
        };
        let Some(animal) = biter.animal() else {
            return false;
        };
        if !cooldown_elapsed(animal.last_bite_ms, animal.bite_cooldown_ms, now, speed) {
            return false;
        }
        let facing = biter.body.position.angle_to(victim_at);
        if angle_distance(biter.body.angle, facing) > animal.bite_radius {
            return false;
        }
        let damage = animal.damage;

        let mut reward = 0.0;
        let lethal = {
            let Some(victim) = self.get_mut(target) else {
                return false;
            };
            victim.health -= damage;
            match victim_species {
                Species::Plant => {
                    victim.body.size = victim.body.size.scale(PLANT_GRAZE_SHRINK);
                    reward += PLANT_GRAZE_ENERGY;
                }
                Species::Herbivore => reward += PREY_BITE_ENERGY,
                Species::Carnivore => {}
            }
            victim.health <= 0.0
        };

        if lethal {
            if victim_species == Species::Herbivore {
                reward += victim_mass * KILL_ENERGY_PER_MASS;
            }
            self.destroy(target);
        }

        if let Some(animal) = self.get_mut(attacker).and_then(|e| e.animal_mut()) {
            animal.energy = (animal.energy + reward).min(MAX_ENERGY);
            animal.last_bite_ms = Some(now);
        }

        if !lethal {
            victim_species.profile().behavior.bite_reaction(self, target, attacker);
            if victim_species == Species::Plant {
                self.refile_static(target);
            }
        }
        true
    }

    /// Carnivore contact with another dynamic entity.
    pub(crate) fn attack(&mut self, hunter: EntityId, prey: EntityId, overlapping: bool) {
        let (Some(h), Some(p)) = (self.get(hunter), self.get(prey)) else {
            return;
        };
        if h.profile().diet != Some(p.species) {
            return;
        }
        self.bite(hunter, prey, overlapping);
        if self.is_live(prey) {
            self.find_target(hunter, prey);
        }
    }

    /// Consider `candidate` as the hunter's target.
    pub fn find_target(&mut self, hunter: EntityId, candidate: EntityId) -> bool {
        if hunter == candidate {
            return false;
        }
        let Some(candidate_at) = self.get(candidate).map(|c| c.body.position) else {
            return false;
        };
        let Some(entity) = self.get(hunter) else {
            return false;
        };
        let Some(animal) = entity.animal() else {
            return false;
        };
        let eligible = match animal.state {
            BehaviorState::Searching | BehaviorState::Hunting => true,
            BehaviorState::Idle => entity.profile().hunts_when_idle,
            BehaviorState::Escaping | BehaviorState::Reproducing => false,
        };
        let position = entity.body.position;
        let distance = position.distance(candidate_at);
        if !eligible || distance > animal.view_distance || animal.target == Some(candidate) {
            return false;
        }

        let current = animal.target.and_then(|t| self.get(t)).map(|t| t.body.position);
        let acquire = match current {
            None => true,
            Some(at) => {
                distance < position.distance(at) && self.rng.chance(TARGET_SWITCH_CHANCE)
            }
        };
        if !acquire {
            return false;
        }

        let Some(entity) = self.get_mut(hunter) else {
            return false;
        };
        entity.body.steer(position.angle_to(candidate_at));
        if let Some(animal) = entity.animal_mut() {
            animal.state = BehaviorState::Hunting;
            animal.target = Some(candidate);
        }
        true
    }

    /// Switch `prey` to `Escaping` if `other` is its predator and in range.
    pub(crate) fn notice_predator(&mut self, prey: EntityId, other: EntityId) {
        let (Some(p), Some(o)) = (self.get(prey), self.get(other)) else {
            return;
        };
        if p.profile().threat != Some(o.species) {
            return;
        }
        let Some(animal) = p.animal() else {
            return;
        };
        let watchful = matches!(
            animal.state,
            BehaviorState::Searching | BehaviorState::Hunting
        );
        if watchful && p.body.position.distance(o.body.position) <= 2.0 * animal.view_distance {
            self.flee_from(prey, other);
        }
    }

    /// Record `predator` and run directly away from it.
    pub(crate) fn flee_from(&mut self, id: EntityId, predator: EntityId) {
        let Some(threat_at) = self.get(predator).map(|p| p.body.position) else {
            return;
        };
        let Some(entity) = self.get_mut(id) else {
            return;
        };
        let away = entity.body.position.angle_to(threat_at) + PI;
        entity.body.steer(away);
        if let Some(animal) = entity.animal_mut() {
            animal.reset(BehaviorState::Escaping);
            animal.predator = Some(predator);
        }
    }

    /// Pair two reproducing animals of one species.
    pub(crate) fn find_partner(&mut self, a: EntityId, b: EntityId, overlapping: bool) {
        let (Some(first), Some(second)) = (self.get(a), self.get(b)) else {
            return;
        };
        if first.species != second.species {
            return;
        }
        let ready = |state: Option<BehaviorState>| state == Some(BehaviorState::Reproducing);
        if !ready(first.animal().map(|x| x.state)) || !ready(second.animal().map(|x| x.state)) {
            return;
        }

        if let Some(animal) = self.get_mut(a).and_then(|e| e.animal_mut()) {
            animal.target.get_or_insert(b);
        }
        if overlapping {
            self.replicate(a, b);
        }
    }

    /// Produce one offspring between `a` and `b`.
    pub fn replicate(&mut self, a: EntityId, b: EntityId) -> Option<EntityId> {
        if a == b {
            return None;
        }
        let (now, speed) = (self.now, self.speed);
        let (first, second) = (self.get(a)?, self.get(b)?);
        if first.species != second.species {
            return None;
        }
        let ready = |animal: &Animal| {
            cooldown_elapsed(
                animal.last_reproduction_ms,
                animal.reproduction_cooldown_ms,
                now,
                speed,
            )
        };
        if !ready(first.animal()?) || !ready(second.animal()?) {
            return None;
        }

        let species = first.species;
        let (pa, pb) = (first.body.position, second.body.position);
        let offset = Vec2::from_polar(pa.angle_to(pb) + FRAC_PI_2, pa.distance(pb) / 2.0);
        let child_at = self.map.constrain(pa + offset);

        for parent in [a, b] {
            if let Some(animal) = self.get_mut(parent).and_then(|e| e.animal_mut()) {
                animal.last_reproduction_ms = Some(now);
                animal.reset(BehaviorState::Idle);
            }
        }
        Some(self.spawn_animal(species, child_at))
    }

    /// Convert part of a dead animal into plant matter.
    pub(crate) fn drop_remains(&mut self, species: Species, position: Vec2, size: f32, starved: bool) {
        if species == Species::Plant || (species == Species::Herbivore && starved) {
            return;
        }
        if !self.rng.chance(REMAINS_CHANCE) {
            return;
        }
        let units = (size / REMAINS_SIZE_UNIT).floor() as i32;
        let replications = units * self.rng.random_int(1, 3);
        self.spawn_plant(position, replications.max(0) as u32);
    }

    /// Herbivore feeding on plants from the static grid.
    pub(crate) fn graze(&mut self, id: EntityId) -> SimResult<()> {
        let Some((position, range)) = self
            .get(id)
            .and_then(|e| Some((e.body.position, Vec2::splat(2.0 * e.animal()?.view_distance))))
        else {
            return Ok(());
        };

        let plants = self.nearby_plants(position, range);
        for plant in plants {
            if !self.is_live(id) {
                break;
            }
            if !self.is_live(plant) {
                continue;
            }
            let overlapping = self.collide_pair(id, plant)?;
            self.bite(id, plant, overlapping);
            if self.is_live(plant) {
                self.find_target(id, plant);
            }
        }
        Ok(())
    }

    /// Carnivores shove plants aside without eating them.
    pub(crate) fn push_through_plants(&mut self, id: EntityId) -> SimResult<()> {
        let Some((position, range)) = self.get(id).map(|e| (e.body.position, e.body.size)) else {
            return Ok(());
        };
        for plant in self.nearby_plants(position, range) {
            if self.collide_pair(id, plant)? {
                self.refile_static(plant);
            }
        }
        Ok(())
    }

    /// Live plant ids in the static cells covering the footprint, each once.
    fn nearby_plants(&mut self, position: Vec2, range: Vec2) -> Vec<EntityId> {
        let mut found = Vec::new();
        let entities = &mut self.entities;
        self.static_grid.query(position, range, |cell, query_id| {
            for &plant in cell.of(Species::Plant) {
                if let Some(entity) = entities.get_mut(&plant).filter(|e| e.spawned) {
                    if entity.last_query != query_id {
                        entity.last_query = query_id;
                        found.push(plant);
                    }
                }
            }
            ControlFlow::Continue(())
        });
        found
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::GridId;
    use crate::game::test_support::{empty_world, CENTER};

    fn animal(world: &World, id: EntityId) -> &Animal {
        world.get(id).unwrap().animal().unwrap()
    }

    #[test]
    fn test_genetics_within_ranges() {
        let mut world = empty_world(11);
        for _ in 0..50 {
            let id = world.spawn(Species::Herbivore, CENTER);
            let entity = world.get(id).unwrap();
            let size = entity.body.size.x;
            assert!((40.0..=75.0).contains(&size));
            assert_eq!(entity.health, 2.0 * size);
            assert!((entity.mass() - (size / 40.0).powi(2)).abs() < 1e-5);

            let a = entity.animal().unwrap();
            assert_eq!(a.energy, MAX_ENERGY);
            assert_eq!(a.view_distance, 7.0 * size);
            assert!(a.damage >= 5.0 + size / 15.0 * 3.0 - 1e-4);
            assert!(a.damage <= 5.0 + size / 15.0 * 5.0 + 1e-4);
        }
    }

    #[test]
    fn test_starved_animal_destroyed_same_tick() {
        let mut world = empty_world(12);
        let id = world.spawn(Species::Herbivore, CENTER);
        world.get_mut(id).unwrap().animal_mut().unwrap().energy = 0.0;

        world.update_animal(id, 1.0).unwrap();
        assert!(!world.is_live(id));
    }

    #[test]
    fn test_hungry_animal_searches() {
        let mut world = empty_world(13);
        let id = world.spawn(Species::Herbivore, CENTER);
        world.get_mut(id).unwrap().animal_mut().unwrap().energy = 40.0;

        world.update_animal(id, 1.0).unwrap();
        assert_eq!(animal(&world, id).state, BehaviorState::Searching);
    }

    #[test]
    fn test_carnivore_hunts_herbivore_in_view() {
        let mut world = empty_world(14);
        world.advance_clock(1_000);
        let carnivore = world.spawn(Species::Carnivore, CENTER);
        let herbivore = world.spawn(Species::Herbivore, CENTER + Vec2::new(100.0, 0.0));
        assert!(100.0 < animal(&world, carnivore).view_distance);

        world.step(1_016, 1.6).unwrap();

        let hunter = animal(&world, carnivore);
        assert_eq!(hunter.state, BehaviorState::Hunting);
        assert_eq!(hunter.target, Some(herbivore));
    }

    #[test]
    fn test_never_targets_self() {
        let mut world = empty_world(15);
        let id = world.spawn(Species::Carnivore, CENTER);
        assert!(!world.find_target(id, id));
        assert_eq!(animal(&world, id).target, None);
    }

    #[test]
    fn test_bite_requires_contact_and_facing() {
        let mut world = empty_world(16);
        let carnivore = world.spawn(Species::Carnivore, CENTER);
        let herbivore = world.spawn(Species::Herbivore, CENTER + Vec2::new(30.0, 0.0));
        world.get_mut(carnivore).unwrap().body.angle = PI;

        assert!(!world.bite(carnivore, herbivore, false));
        assert!(!world.bite(carnivore, herbivore, true));

        world.get_mut(carnivore).unwrap().body.angle = 0.0;
        let before = world.get(herbivore).unwrap().health;
        assert!(world.bite(carnivore, herbivore, true));
        assert!(world.get(herbivore).unwrap().health < before);

        // Cooldown
        assert!(!world.bite(carnivore, herbivore, true));
    }

    #[test]
    fn test_bitten_herbivore_escapes() {
        let mut world = empty_world(17);
        let carnivore = world.spawn(Species::Carnivore, CENTER);
        let herbivore = world.spawn(Species::Herbivore, CENTER + Vec2::new(30.0, 0.0));
        world.get_mut(carnivore).unwrap().body.angle = 0.0;
        world.get_mut(herbivore).unwrap().health = 1_000.0;

        assert!(world.bite(carnivore, herbivore, true));
        let prey = animal(&world, herbivore);
        assert_eq!(prey.state, BehaviorState::Escaping);
        assert_eq!(prey.predator, Some(carnivore));
    }

    #[test]
    fn test_lethal_bite_rewards_energy() {
        let mut world = empty_world(18);
        let carnivore = world.spawn(Species::Carnivore, CENTER);
        let herbivore = world.spawn(Species::Herbivore, CENTER + Vec2::new(30.0, 0.0));
        {
            let c = world.get_mut(carnivore).unwrap();
            c.body.angle = 0.0;
            c.animal_mut().unwrap().energy = 10.0;
        }
        world.get_mut(herbivore).unwrap().health = 0.5;
        let mass = world.get(herbivore).unwrap().mass();

        assert!(world.bite(carnivore, herbivore, true));
        assert!(!world.is_live(herbivore));
        let expected = 10.0 + PREY_BITE_ENERGY + mass * KILL_ENERGY_PER_MASS;
        assert!((animal(&world, carnivore).energy - expected).abs() < 1e-4);
    }

    #[test]
    fn test_killed_plant_gives_no_kill_bonus() {
        let mut world = empty_world(24);
        let herbivore = world.spawn(Species::Herbivore, CENTER);
        let plant = world.place_plant(CENTER + Vec2::new(20.0, 0.0));
        {
            let h = world.get_mut(herbivore).unwrap();
            h.body.angle = 0.0;
            h.animal_mut().unwrap().energy = 20.0;
        }
        world.get_mut(plant).unwrap().health = 0.5;

        assert!(world.bite(herbivore, plant, true));
        assert!(!world.is_live(plant));
        assert_eq!(animal(&world, herbivore).energy, 20.0 + PLANT_GRAZE_ENERGY);
    }

    fn filed_in_static_grid(world: &mut World, id: EntityId) -> bool {
        let at = world.get(id).unwrap().body.position;
        let mut found = false;
        world.static_grid.query(at, Vec2::splat(1.0), |cell, _| {
            found |= cell.of(Species::Plant).contains(&id);
            ControlFlow::Continue(())
        });
        found
    }

    #[test]
    fn test_killed_herbivore_leaves_remains() {
        let mut dropped = 0;
        for seed in 0..64 {
            let mut world = empty_world(1_000 + seed);
            let carnivore = world.spawn(Species::Carnivore, CENTER);
            let herbivore = world.spawn(Species::Herbivore, CENTER + Vec2::new(30.0, 0.0));
            world.get_mut(carnivore).unwrap().body.angle = 0.0;
            world.get_mut(herbivore).unwrap().health = 0.5;
            let (death_at, size) = {
                let h = world.get(herbivore).unwrap();
                (h.body.position, h.body.size.x)
            };

            assert!(world.bite(carnivore, herbivore, true));
            assert!(!world.is_live(herbivore));

            let plants: Vec<EntityId> = world
                .entities()
                .filter(|e| e.species == Species::Plant)
                .map(|e| e.id)
                .collect();
            if plants.is_empty() {
                continue;
            }
            dropped += 1;

            // One seed plant plus floor(size / 40) × [1, 3] siblings
            let units = (size / REMAINS_SIZE_UNIT).floor() as usize;
            let siblings = plants.len() - 1;
            assert!(siblings >= units && siblings <= 3 * units && siblings % units == 0);

            let first = world.get(plants[0]).unwrap();
            assert_eq!(first.plant().unwrap().root, death_at);
            for id in plants {
                assert!(!world.get(id).unwrap().cell_keys(GridId::Static).is_empty());
                assert!(filed_in_static_grid(&mut world, id));
            }
        }
        assert!(dropped > 0);
    }

    #[test]
    fn test_starved_carnivore_leaves_remains() {
        let mut dropped = 0;
        for seed in 0..64 {
            let mut world = empty_world(2_000 + seed);
            let carnivore = world.spawn(Species::Carnivore, CENTER);
            world.get_mut(carnivore).unwrap().animal_mut().unwrap().energy = 0.0;

            world.update_animal(carnivore, 1.0).unwrap();
            assert!(!world.is_live(carnivore));
            if world.count(Species::Plant) > 0 {
                dropped += 1;
                assert!(world.count(Species::Plant) >= 2);
            }
        }
        assert!(dropped > 0);
    }

    #[test]
    fn test_grazing_shrinks_plant() {
        let mut world = empty_world(19);
        let herbivore = world.spawn(Species::Herbivore, CENTER);
        let plant = world.place_plant(CENTER + Vec2::new(20.0, 0.0));
        {
            let h = world.get_mut(herbivore).unwrap();
            h.body.angle = 0.0;
            h.animal_mut().unwrap().energy = 20.0;
        }
        world.get_mut(plant).unwrap().health = 1_000.0;
        let size = world.get(plant).unwrap().body.size.x;

        assert!(world.bite(herbivore, plant, true));
        assert!((world.get(plant).unwrap().body.size.x - size * PLANT_GRAZE_SHRINK).abs() < 1e-3);
        assert_eq!(animal(&world, herbivore).energy, 20.0 + PLANT_GRAZE_ENERGY);
    }

    #[test]
    fn test_herbivore_notices_predator() {
        let mut world = empty_world(20);
        let herbivore = world.spawn(Species::Herbivore, CENTER);
        let carnivore = world.spawn(Species::Carnivore, CENTER + Vec2::new(200.0, 0.0));

        // Idle herbivores ignore threats
        world.notice_predator(herbivore, carnivore);
        assert_eq!(animal(&world, herbivore).state, BehaviorState::Idle);

        world.get_mut(herbivore).unwrap().animal_mut().unwrap().state = BehaviorState::Searching;
        world.notice_predator(herbivore, carnivore);
        let prey = animal(&world, herbivore);
        assert_eq!(prey.state, BehaviorState::Escaping);
        assert_eq!(prey.predator, Some(carnivore));
        assert_eq!(world.get(herbivore).unwrap().body.moving_direction, Some(PI));
    }

    #[test]
    fn test_replicate_respects_cooldown() {
        let mut world = empty_world(21);
        let a = world.spawn(Species::Herbivore, CENTER);
        let b = world.spawn(Species::Herbivore, CENTER + Vec2::new(50.0, 0.0));
        assert_eq!(world.replicate(a, b), None);

        world.advance_clock(REPRODUCTION_COOLDOWN_MS);
        let child = world.replicate(a, b).unwrap();
        let at = world.get(child).unwrap().body.position;
        assert!((at - Vec2::new(CENTER.x, CENTER.y + 25.0)).length() < 1e-2);
        assert_eq!(world.get(child).unwrap().species, Species::Herbivore);

        assert_eq!(animal(&world, a).last_reproduction_ms, Some(REPRODUCTION_COOLDOWN_MS));
        assert_eq!(world.replicate(a, b), None);
    }

    #[test]
    fn test_reaim_loses_distant_target() {
        let mut world = empty_world(22);
        let carnivore = world.spawn(Species::Carnivore, CENTER);
        let far = world.spawn(Species::Herbivore, CENTER + Vec2::new(1500.0, 0.0));
        {
            let a = world.get_mut(carnivore).unwrap().animal_mut().unwrap();
            a.state = BehaviorState::Hunting;
            a.target = Some(far);
        }
        let serial = world.get(carnivore).unwrap().serial;
        world.reaim(carnivore, serial);

        let hunter = animal(&world, carnivore);
        assert_eq!(hunter.state, BehaviorState::Idle);
        assert_eq!(hunter.target, None);
    }

    #[test]
    fn test_starved_herbivore_leaves_no_remains() {
        let mut world = empty_world(23);
        for _ in 0..20 {
            world.drop_remains(Species::Herbivore, CENTER, 75.0, true);
        }
        assert_eq!(world.count(Species::Plant), 0);
    }
}
