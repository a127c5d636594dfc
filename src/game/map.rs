//! World Map
//!
//! Named biome polygons, the convex world shape enclosing them, and the
//! bounds every position is clamped into.

use std::collections::BTreeMap;

use crate::config::{BiomeConfig, MapConfig};
use crate::core::polygon::{Bounds, Polygon};
use crate::core::vec2::Vec2;
use crate::error::{SimError, SimResult};

/// Biomes, world outline and bounds.
#[derive(Clone, Debug)]
pub struct GameMap {
    biomes: BTreeMap<String, Polygon>,
    shape: Polygon,
    bounds: Bounds,
    scale: f32,
}

impl GameMap {
    /// Build the map from configuration.
    pub fn from_config(config: &MapConfig) -> SimResult<Self> {
        let biomes: BTreeMap<String, Polygon> = config
            .biomes
            .iter()
            .map(|(name, biome)| (name.clone(), biome_polygon(biome, config.offset, config.scale)))
            .collect();

        let shape = Polygon::convex_hull(biomes.values());
        if shape.points().len() < 3 {
            return Err(SimError::Config("world shape is degenerate".into()));
        }
        let bounds = shape.bounds();
        // Frames quantize over [0, max] and grid keys start at the origin
        if !(bounds.min.x >= 0.0 && bounds.min.y >= 0.0) {
            return Err(SimError::Config(format!(
                "world reaches negative coordinates ({}, {}); raise map.offset",
                bounds.min.x, bounds.min.y
            )));
        }

        Ok(Self {
            biomes,
            shape,
            bounds,
            scale: config.scale,
        })
    }

    /// Axis-aligned world bounds.
    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Convex world outline.
    #[inline]
    pub fn shape(&self) -> &Polygon {
        &self.shape
    }

    /// Map scale factor.
    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Biome polygon by name.
    pub fn biome(&self, name: &str) -> Option<&Polygon> {
        self.biomes.get(name)
    }

    /// Name of the first biome containing `point`.
    pub fn biome_at(&self, point: Vec2) -> Option<&str> {
        self.biomes
            .iter()
            .find(|(_, polygon)| polygon.contains(point))
            .map(|(name, _)| name.as_str())
    }

    /// Area to spawn in: the named biome, or the whole world.
    pub fn spawn_area(&self, biome: Option<&str>) -> &Polygon {
        biome.and_then(|name| self.biome(name)).unwrap_or(&self.shape)
    }

    /// True if `point` lies inside the world outline.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        self.shape.contains(point)
    }

    /// Clamp a position into the world bounds.
    #[inline]
    pub fn constrain(&self, point: Vec2) -> Vec2 {
        self.bounds.constrain(point)
    }
}

fn biome_polygon(biome: &BiomeConfig, offset: f32, scale: f32) -> Polygon {
    match biome {
        BiomeConfig::Rect { x, y, width, height } => Polygon::from_rect(
            x.unwrap_or(width / 2.0),
            y.unwrap_or(height / 2.0),
            *width,
            *height,
            offset,
            scale,
        ),
        BiomeConfig::Shape { shape } => {
            let points: Vec<Vec2> = shape.iter().map(|[x, y]| Vec2::new(*x, *y)).collect();
            Polygon::from_points(&points, offset, scale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map_bounds() {
        let map = GameMap::from_config(&MapConfig::default()).unwrap();
        let bounds = map.bounds();
        assert_eq!(bounds.min, Vec2::new(500.0, 500.0));
        assert_eq!(bounds.max, Vec2::new(4500.0, 3500.0));
    }

    #[test]
    fn test_biome_lookup() {
        let map = GameMap::from_config(&MapConfig::default()).unwrap();
        assert_eq!(map.biome_at(Vec2::new(1000.0, 1000.0)), Some("meadow"));
        assert_eq!(map.biome_at(Vec2::new(4000.0, 1000.0)), Some("forest"));
        assert_eq!(map.biome_at(Vec2::new(10.0, 10.0)), None);
        assert!(map.biome("meadow").is_some());
    }

    #[test]
    fn test_spawn_area_falls_back_to_world() {
        let map = GameMap::from_config(&MapConfig::default()).unwrap();
        assert_eq!(map.spawn_area(Some("swamp")), map.shape());
        assert_eq!(map.spawn_area(None), map.shape());
    }

    #[test]
    fn test_constrain_and_contains() {
        let map = GameMap::from_config(&MapConfig::default()).unwrap();
        assert_eq!(map.constrain(Vec2::new(0.0, 9000.0)), Vec2::new(500.0, 3500.0));
        assert!(map.contains(Vec2::new(2500.0, 2000.0)));
        assert!(!map.contains(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn test_scaled_shape_biome() {
        let mut config = MapConfig::default();
        config.biomes.clear();
        config.biomes.insert(
            "island".into(),
            BiomeConfig::Shape { shape: vec![[0.0, 0.0], [100.0, 0.0], [0.0, 100.0]] },
        );
        config.scale = 2.0;
        let map = GameMap::from_config(&config).unwrap();
        assert_eq!(map.bounds().max, Vec2::new(700.0, 700.0));
    }

    #[test]
    fn test_negative_world_rejected() {
        let mut config = MapConfig::default();
        config.biomes.clear();
        config.biomes.insert(
            "plain".into(),
            BiomeConfig::Shape {
                shape: vec![[-2000.0, -2000.0], [2000.0, -2000.0], [2000.0, 2000.0], [-2000.0, 2000.0]],
            },
        );
        config.offset = 0.0;
        assert!(matches!(GameMap::from_config(&config), Err(SimError::Config(_))));

        config.offset = 2000.0;
        let map = GameMap::from_config(&config).unwrap();
        assert_eq!(map.bounds().min, Vec2::ZERO);
    }
}
