//! Plants
//!
//! Rooted producers. A plant is filed once in the static grid and is only
//! re-filed when it has drifted or been resized. When grazed or pushed it
//! springs back toward its root.

use tracing::debug;

use crate::core::ids::EntityId;
use crate::core::vec2::Vec2;
use crate::game::body::Body;
use crate::game::collider::Collider;
use crate::game::entity::EntityKind;
use crate::game::grid::GridId;
use crate::game::species::Species;
use crate::game::world::World;

/// Inclusive distance range between a plant and the sibling it seeds.
pub const PLANT_SPAWN_DISTANCE: (i32, i32) = (25, 350);

/// Fraction of the distance to the root recovered per unit of dt.
pub const ROOT_SPRING: f32 = 0.035;

/// Drift beyond which the static grid entry is moved.
pub const REFILE_DISTANCE: f32 = 10.0;

/// Attempts at finding an in-world spot for a sibling.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 32;

/// Plant component.
#[derive(Clone, Debug, PartialEq)]
pub struct Plant {
    /// Rest position
    pub root: Vec2,
    /// Position of the static grid entry
    pub filed_position: Vec2,
    /// Size of the static grid entry
    pub filed_size: Vec2,
}

impl World {
    /// Create a plant at `position` followed by a chain of `replications`
    /// siblings, each seeded around the one before it.
    ///
    /// Returns every plant created, parent first. The chain stops early if
    /// no in-world spot is found for a sibling.
    pub fn spawn_plant(&mut self, position: Vec2, replications: u32) -> Vec<EntityId> {
        let mut created = Vec::with_capacity(replications as usize + 1);
        let mut parent = self.place_plant(position);
        created.push(parent);

        for remaining in (0..replications).rev() {
            let Some(origin) = self.get(parent).map(|p| p.body.position) else {
                break;
            };
            let Some(spot) = self.sibling_spot(origin) else {
                debug!(remaining, "no room for plant sibling");
                break;
            };
            parent = self.place_plant(spot);
            created.push(parent);
        }
        created
    }

    fn sibling_spot(&mut self, origin: Vec2) -> Option<Vec2> {
        let (near, far) = PLANT_SPAWN_DISTANCE;
        (0..MAX_PLACEMENT_ATTEMPTS).find_map(|_| {
            let angle = self.rng.random_angle();
            let distance = self.rng.random_int(near, far) as f32;
            let spot = origin + Vec2::from_polar(angle, distance);
            self.map.contains(spot).then_some(spot)
        })
    }

    /// Create a single plant and file it in the static grid.
    pub(crate) fn place_plant(&mut self, position: Vec2) -> EntityId {
        let (min_size, max_size) = Species::Plant.profile().size_range;
        let size = Vec2::splat(self.rng.random_int(min_size, max_size) as f32);
        let angle = self.rng.random_angle();
        let position = self.map.constrain(position);

        let mut body = Body::new(position, size, angle);
        body.move_speed = 0.0;

        let plant = Plant {
            root: position,
            filed_position: position,
            filed_size: size,
        };
        let id = self.insert_entity(
            Species::Plant,
            body,
            Collider::circle(1.0),
            2.0 * size.x,
            EntityKind::Plant(plant),
        );

        if let Some(entity) = self.entities.get_mut(&id) {
            self.static_grid.insert(
                id,
                Species::Plant,
                position,
                size,
                Some(&mut entity.cells[GridId::Static.slot()]),
            );
        }
        id
    }

    /// Spring a plant back toward its root.
    pub(crate) fn update_plant(&mut self, id: EntityId, dt: f32) {
        let bounds = self.map.bounds();
        let Some(entity) = self.get_mut(id) else {
            return;
        };
        let EntityKind::Plant(plant) = &entity.kind else {
            return;
        };
        let root = plant.root;

        let body = &mut entity.body;
        body.previous_position = body.position;
        let pull = (ROOT_SPRING * dt).min(1.0);
        body.position = bounds.constrain(body.position.lerp(root, pull));
        body.velocity = Vec2::ZERO;
        body.angular_velocity = 0.0;

        self.refile_static(id);
    }

    /// Move the static grid entry of a plant that drifted or changed size.
    pub(crate) fn refile_static(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(&id).filter(|e| e.spawned) else {
            return;
        };
        let position = entity.body.position;
        let size = entity.body.size;
        let EntityKind::Plant(plant) = &mut entity.kind else {
            return;
        };
        if plant.filed_position.distance(position) <= REFILE_DISTANCE && plant.filed_size == size {
            return;
        }
        plant.filed_position = position;
        plant.filed_size = size;

        self.static_grid.move_to(
            id,
            Species::Plant,
            position,
            size,
            &mut entity.cells[GridId::Static.slot()],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_support::{empty_world, CENTER};

    #[test]
    fn test_replications_chain() {
        let mut world = empty_world(31);
        let plants = world.spawn_plant(CENTER, 3);

        assert_eq!(plants.len(), 4);
        assert_eq!(world.count(Species::Plant), 4);
        for pair in plants.windows(2) {
            let parent = world.get(pair[0]).unwrap().body.position;
            let child = world.get(pair[1]).unwrap().body.position;
            let distance = parent.distance(child);
            assert!((25.0 - 1e-2..=350.0 + 1e-2).contains(&distance), "{distance}");
        }
    }

    #[test]
    fn test_plant_properties() {
        let mut world = empty_world(32);
        let id = world.place_plant(CENTER);
        let plant = world.get(id).unwrap();

        assert!((50.0..=150.0).contains(&plant.body.size.x));
        assert_eq!(plant.mass(), 1.0);
        assert_eq!(plant.health, 2.0 * plant.body.size.x);
        assert_eq!(plant.plant().unwrap().root, CENTER);
    }

    #[test]
    fn test_springs_back_to_root() {
        let mut world = empty_world(33);
        let id = world.place_plant(CENTER);
        world.get_mut(id).unwrap().body.position = CENTER + Vec2::new(100.0, 0.0);

        for _ in 0..200 {
            world.update_plant(id, 1.0);
        }
        assert!(world.get(id).unwrap().body.position.distance(CENTER) < 1.0);
    }

    #[test]
    fn test_refiled_after_drift() {
        let mut world = empty_world(34);
        let id = world.place_plant(CENTER);
        let before = world.get(id).unwrap().cell_keys(GridId::Static).clone();
        let far = CENTER + Vec2::new(1_200.0, 0.0);

        world.get_mut(id).unwrap().body.position = far;
        world.refile_static(id);

        let entity = world.get(id).unwrap();
        assert_eq!(entity.plant().unwrap().filed_position, far);
        let after = entity.cell_keys(GridId::Static);
        for key in after.as_slice() {
            assert!(!before.as_slice().contains(key));
            assert_eq!(world.static_grid.occupants(*key), 1);
        }
        for key in before.as_slice() {
            assert_eq!(world.static_grid.occupants(*key), 0);
        }
    }

    #[test]
    fn test_small_drift_keeps_entry() {
        let mut world = empty_world(35);
        let id = world.place_plant(CENTER);
        world.get_mut(id).unwrap().body.position = CENTER + Vec2::new(5.0, 0.0);
        world.refile_static(id);
        assert_eq!(world.get(id).unwrap().plant().unwrap().filed_position, CENTER);
    }
}
