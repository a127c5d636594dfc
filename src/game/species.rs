//! Species Registry
//!
//! Static table mapping each species tag to its capability flags and
//! behaviour constants. Code that varies by species looks the row up by
//! tag instead of branching on a type.
//!
//! ```text
//! ┌────────────┬─────────┬───────────┬────────────┬───────────┬──────────┐
//! │ species    │ dynamic │ updatable │ collidable │ threshold │ diet     │
//! ├────────────┼─────────┼───────────┼────────────┼───────────┼──────────┤
//! │ plant      │   no    │    yes    │    yes     │     -     │    -     │
//! │ herbivore  │   yes   │    yes    │    yes     │    50     │ plant    │
//! │ carnivore  │   yes   │    yes    │    yes     │    85     │ herbivore│
//! └────────────┴─────────┴───────────┴────────────┴───────────┴──────────┘
//! ```

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::error::{SimError, SimResult};
use crate::game::behavior::{CarnivoreBehavior, HerbivoreBehavior, PlantBehavior, SpeciesBehavior};

/// Species tag. The discriminant is the wire type tag.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    /// Static producer
    Plant = 0,
    /// Grazer
    Herbivore = 1,
    /// Hunter
    Carnivore = 2,
}

impl Species {
    /// Every species in tag order.
    pub const ALL: [Species; 3] = [Species::Plant, Species::Herbivore, Species::Carnivore];

    /// Number of registered species.
    pub const COUNT: usize = 3;

    /// Wire type tag.
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Look a species up by wire tag.
    pub fn from_tag(tag: u8) -> SimResult<Self> {
        match tag {
            0 => Ok(Species::Plant),
            1 => Ok(Species::Herbivore),
            2 => Ok(Species::Carnivore),
            other => Err(SimError::UnknownSpecies(other)),
        }
    }

    /// Registry row for this species.
    #[inline]
    pub fn profile(self) -> &'static SpeciesProfile {
        &REGISTRY[self as usize]
    }

    /// Index into per-species arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}

/// Per-species configuration row.
pub struct SpeciesProfile {
    /// Species this row describes
    pub species: Species,
    /// Human-readable name
    pub name: &'static str,
    /// Moves every tick and lives in the dynamic grid
    pub dynamic: bool,
    /// Receives a per-tick update
    pub updatable: bool,
    /// Takes part in contact resolution
    pub collidable: bool,
    /// Inclusive spawn size range
    pub size_range: (i32, i32),
    /// Base of the genetic move-speed formula
    pub base_move_speed: f32,
    /// Energy at or below which the animal starts searching for food
    pub energy_threshold: f32,
    /// Energy spent per unit of move speed per dt
    pub energy_drain: f32,
    /// Picks up targets while idle, not only when hungry
    pub hunts_when_idle: bool,
    /// Species this one bites for food
    pub diet: Option<Species>,
    /// Species that hunts this one
    pub threat: Option<Species>,
    /// Biome new individuals are placed in (whole world if absent)
    pub spawn_biome: Option<&'static str>,
    /// Behaviour hooks
    pub behavior: &'static dyn SpeciesBehavior,
}

impl fmt::Debug for SpeciesProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeciesProfile")
            .field("species", &self.species)
            .field("dynamic", &self.dynamic)
            .field("energy_threshold", &self.energy_threshold)
            .finish_non_exhaustive()
    }
}

static REGISTRY: [SpeciesProfile; Species::COUNT] = [
    SpeciesProfile {
        species: Species::Plant,
        name: "plant",
        dynamic: false,
        updatable: true,
        collidable: true,
        size_range: (50, 150),
        base_move_speed: 0.0,
        energy_threshold: 0.0,
        energy_drain: 0.0,
        hunts_when_idle: false,
        diet: None,
        threat: Some(Species::Herbivore),
        spawn_biome: None,
        behavior: &PlantBehavior,
    },
    SpeciesProfile {
        species: Species::Herbivore,
        name: "herbivore",
        dynamic: true,
        updatable: true,
        collidable: true,
        size_range: (40, 75),
        base_move_speed: 0.85,
        energy_threshold: 50.0,
        energy_drain: 0.1,
        hunts_when_idle: false,
        diet: Some(Species::Plant),
        threat: Some(Species::Carnivore),
        spawn_biome: Some("meadow"),
        behavior: &HerbivoreBehavior,
    },
    SpeciesProfile {
        species: Species::Carnivore,
        name: "carnivore",
        dynamic: true,
        updatable: true,
        collidable: true,
        size_range: (40, 75),
        base_move_speed: 0.65,
        energy_threshold: 85.0,
        energy_drain: 0.2,
        hunts_when_idle: true,
        diet: Some(Species::Herbivore),
        threat: None,
        spawn_biome: Some("forest"),
        behavior: &CarnivoreBehavior,
    },
];
