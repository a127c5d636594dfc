//! Initial population.
//!
//! Plants are seeded as clusters: a handful of spots scattered over the
//! world shape, each the head of a replication chain. Animals are placed
//! one by one in the biome their species prefers.

use tracing::info;

use crate::config::PopulationConfig;
use crate::game::species::Species;
use crate::game::world::World;

/// Share of the plant population placed as cluster heads.
pub const PLANT_SPOT_RATIO: f32 = 0.015;

impl World {
    /// Spawn the configured population. Plant counts scale with the square
    /// of the map scale.
    pub fn populate(&mut self, population: &PopulationConfig) {
        let scale = self.map.scale();
        let plants = (population.plant as f32 * scale * scale).round().max(0.0) as u32;
        let spots = (plants as f32 * PLANT_SPOT_RATIO).ceil() as u32;
        let per_spot = ((1.0 - PLANT_SPOT_RATIO) / PLANT_SPOT_RATIO).floor() as u32;

        for _ in 0..spots {
            let placed = self.count(Species::Plant) as u32;
            let replications = per_spot.min(plants.saturating_sub(placed)).saturating_sub(1);
            let at = self.map.shape().random_point(&mut self.rng);
            self.spawn_plant(at, replications);
        }

        for (species, count) in [
            (Species::Herbivore, population.herbivore),
            (Species::Carnivore, population.carnivore),
        ] {
            let area = self.map.spawn_area(species.profile().spawn_biome).clone();
            for _ in 0..count {
                let at = area.random_point(&mut self.rng);
                self.spawn(species, at);
            }
        }

        let census = self.census();
        info!(
            seed = self.seed(),
            plants = census.plants,
            herbivores = census.herbivores,
            carnivores = census.carnivores,
            "world populated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_support::empty_world;

    #[test]
    fn test_population_counts() {
        let mut world = empty_world(41);
        world.populate(&PopulationConfig {
            plant: 200,
            herbivore: 12,
            carnivore: 5,
        });

        let census = world.census();
        assert_eq!(census.herbivores, 12);
        assert_eq!(census.carnivores, 5);
        // 3 spots; the chain can stop early if the world edge is hit
        assert!(census.plants >= 3);
        assert!(census.plants <= 200);
    }

    #[test]
    fn test_animals_spawn_in_their_biome() {
        let mut world = empty_world(42);
        world.populate(&PopulationConfig {
            plant: 0,
            herbivore: 20,
            carnivore: 20,
        });

        for entity in world.entities() {
            let biome = entity.profile().spawn_biome.unwrap();
            let area = world.map().biome(biome).unwrap();
            let bounds = area.bounds();
            let at = entity.body.position;
            assert!(at.x >= bounds.min.x - 1.0 && at.x <= bounds.max.x + 1.0, "{}", entity.species);
            assert!(at.y >= bounds.min.y - 1.0 && at.y <= bounds.max.y + 1.0, "{}", entity.species);
        }
    }
}
