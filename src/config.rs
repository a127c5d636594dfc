//! Simulation configuration.
//!
//! Loaded once at start from an optional JSON file. Every field has a
//! default, so a partial file only overrides what it names.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Deserialize};

use crate::error::{SimError, SimResult};
use crate::game::map::GameMap;

/// Default ticks per second.
pub const DEFAULT_TPS: u32 = 60;

/// Top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// World seed. A time-derived seed is used when absent.
    pub seed: Option<u32>,
    /// Target ticks per second (0 = uncapped)
    pub tps: u32,
    /// Re-arm the loop without sleeping
    pub turbo: bool,
    /// Initial population targets
    pub population: PopulationConfig,
    /// World geometry
    pub map: MapConfig,
    /// Spatial grid cell sizes
    pub grids: GridConfig,
    /// Length of the stats window in milliseconds
    pub stats_window_ms: u64,
    /// Longest the producer polls for the channel lock before skipping a publish
    pub publish_timeout_ms: u64,
    /// Stop the binary after this many seconds
    pub run_seconds: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tps: DEFAULT_TPS,
            turbo: false,
            population: PopulationConfig::default(),
            map: MapConfig::default(),
            grids: GridConfig::default(),
            stats_window_ms: 1000,
            publish_timeout_ms: 2,
            run_seconds: None,
        }
    }
}

impl SimConfig {
    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        if !(self.grids.dynamic_cell > 0.0) || !(self.grids.static_cell > 0.0) {
            return Err(SimError::Config("grid cell sizes must be positive".into()));
        }
        if !self.map.scale.is_finite() || self.map.scale <= 0.0 {
            return Err(SimError::Config(format!("map scale {} is not usable", self.map.scale)));
        }
        if self.map.biomes.is_empty() {
            return Err(SimError::Config("map has no biomes".into()));
        }
        for (name, biome) in &self.map.biomes {
            if let BiomeConfig::Shape { shape } = biome {
                if shape.len() < 3 {
                    return Err(SimError::Config(format!("biome {name} needs at least 3 points")));
                }
            }
        }
        GameMap::from_config(&self.map)?;
        Ok(())
    }

    /// Seed to run with.
    pub fn resolve_seed(&self) -> u32 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
                .unwrap_or(0)
        })
    }
}

/// Initial population targets per species.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Plants at map scale 1 (multiplied by scale²)
    pub plant: u32,
    /// Herbivores
    pub herbivore: u32,
    /// Carnivores
    pub carnivore: u32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            plant: 600,
            herbivore: 80,
            carnivore: 20,
        }
    }
}

/// World geometry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Added to every biome coordinate so quantized positions stay positive
    pub offset: f32,
    /// Multiplier applied to biome coordinates before the offset
    pub scale: f32,
    /// Named biome outlines
    pub biomes: BTreeMap<String, BiomeConfig>,
}

impl Default for MapConfig {
    fn default() -> Self {
        let mut biomes = BTreeMap::new();
        biomes.insert(
            "meadow".to_string(),
            BiomeConfig::Rect { x: Some(1250.0), y: Some(1500.0), width: 2500.0, height: 3000.0 },
        );
        biomes.insert(
            "forest".to_string(),
            BiomeConfig::Rect { x: Some(3250.0), y: Some(1500.0), width: 1500.0, height: 3000.0 },
        );
        Self {
            offset: 500.0,
            scale: 1.0,
            biomes,
        }
    }
}

/// One biome outline, either a rectangle or an explicit point list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BiomeConfig {
    /// Rectangle centered at `(x, y)`; the center defaults to half the size
    Rect {
        /// Center x
        #[serde(default)]
        x: Option<f32>,
        /// Center y
        #[serde(default)]
        y: Option<f32>,
        /// Width
        width: f32,
        /// Height
        height: f32,
    },
    /// Explicit polygon
    Shape {
        /// Vertices as `[x, y]`
        shape: Vec<[f32; 2]>,
    },
}

/// Spatial grid cell sizes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cell size of the per-tick grid for moving agents
    pub dynamic_cell: f32,
    /// Cell size of the persistent grid for plants
    pub static_cell: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            dynamic_cell: 150.0,
            static_cell: 500.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tps, DEFAULT_TPS);
        assert_eq!(config.grids.dynamic_cell, 150.0);
        assert_eq!(config.grids.static_cell, 500.0);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = SimConfig::from_json(
            r#"{ "seed": 7, "tps": 0, "population": { "herbivore": 3 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.tps, 0);
        assert_eq!(config.population.herbivore, 3);
        assert_eq!(config.population.plant, PopulationConfig::default().plant);
        assert_eq!(config.resolve_seed(), 7);
    }

    #[test]
    fn test_biome_shapes_parse() {
        let config = SimConfig::from_json(
            r#"{ "map": { "biomes": {
                "lake": { "shape": [[0, 0], [100, 0], [50, 80]] },
                "field": { "width": 200, "height": 100 }
            } } }"#,
        )
        .unwrap();
        assert!(matches!(config.map.biomes["lake"], BiomeConfig::Shape { .. }));
        assert!(matches!(
            config.map.biomes["field"],
            BiomeConfig::Rect { x: None, width, .. } if width == 200.0
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = SimConfig::from_json(r#"{ "grids": { "dynamic_cell": 0 } }"#);
        assert!(matches!(err, Err(SimError::Config(_))));

        let err = SimConfig::from_json(r#"{ "map": { "biomes": {} } }"#);
        assert!(matches!(err, Err(SimError::Config(_))));

        let err = SimConfig::from_json(
            r#"{ "map": { "offset": 0, "biomes": {
                "plain": { "shape": [[-2000, -2000], [2000, -2000], [2000, 2000], [-2000, 2000]] }
            } } }"#,
        );
        assert!(matches!(err, Err(SimError::Config(_))));

        let err = SimConfig::from_json("{ not json");
        assert!(matches!(err, Err(SimError::Json(_))));
    }
}
