mod seed;

pub use self::seed::Seed;

use crate::Meter;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Configuration that defines a world build. Two worlds built with the same
/// config and the same terrain oracle will always be identical.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WorldConfig {
    /// RNG seed to use for all randomized processes during the build. See
    /// [Seed] for the accepted input formats.
    pub seed: Seed,

    /// Subdivision level of the base geodesic mesh. Level 0 is the bare
    /// icosahedron (12 vertices), and each level roughly quadruples the
    /// vertex count. Level 6 is ~41k vertices, level 8 is ~655k.
    #[validate(range(min = 0, max = 8))]
    pub mesh_level: u8,

    /// Number of settlements to found. Must not exceed the number of
    /// eligible (dry) vertices, otherwise the build fails.
    #[validate(range(min = 1, max = 10000))]
    pub city_count: usize,

    /// Multiplier on the terrain-roughness penalty for road edges. 0 means
    /// roads follow the geodesically shortest route; larger values push
    /// roads around rugged terrain at the expense of extra distance.
    #[validate(range(min = 0.0))]
    pub terrain_weight: f64,

    /// Number of segments each edge is cut into when deriving its terrain
    /// roughness. The oracle is sampled at every segment boundary, both
    /// endpoints included.
    #[validate(range(min = 1, max = 64))]
    pub edge_samples: usize,

    /// Config for iterative local refinement around roads
    #[validate]
    pub refine: RefineConfig,

    /// Config for the lazy per-tile cache
    #[validate]
    pub tiles: TileCacheConfig,

    /// Upper bound on one terrain oracle round trip through the host
    /// dispatcher, in milliseconds. A stuck host fails the build instead of
    /// hanging it forever.
    #[validate(range(min = 1))]
    pub oracle_timeout_ms: u64,
}

/// Configuration for refining the mesh along roads after the first road
/// pass. Each pass subdivides the triangles around every road vertex, then
/// recomputes zones and roads at the new resolution.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RefineConfig {
    /// Number of refinement passes. 0 disables refinement entirely.
    #[validate(range(min = 0, max = 4))]
    pub passes: u8,

    /// How many subdivision levels each pass adds on top of the level the
    /// road vertex's triangles are currently at.
    #[validate(range(min = 1, max = 4))]
    pub level_step: u8,
}

/// Configuration for the staged per-tile computation. See
/// [TileCache](crate::TileCache).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TileCacheConfig {
    /// Maximum number of tile states to hold at once. Tiles pinned by an
    /// in-progress border search can push the cache over this temporarily.
    #[validate(range(min = 1))]
    pub capacity: usize,

    /// Resolution of the sample grid inside each tile polygon. A tile with
    /// `n` corners gets `1 + n * r * (r - 1) / 2` samples.
    #[validate(range(min = 2, max = 16))]
    pub grid_resolution: usize,

    /// A tile's desirability roll must exceed this to host a city
    #[validate(range(min = 0.0, max = 1.0))]
    pub city_threshold: f64,

    /// Maximum number of tiles a single border search may settle before
    /// giving up with an error.
    #[validate(range(min = 1))]
    pub max_border_tiles: usize,
}

/// Configuration for [NoiseTerrain](crate::NoiseTerrain), the procedural
/// terrain oracle. This isn't part of [WorldConfig] because the oracle is
/// owned by the host, not the world.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NoiseTerrainConfig {
    /// Seed for the noise functions
    pub seed: u32,

    /// Physical radius of the planet
    pub radius: Meter,

    /// Lowest possible terrain height (deepest ocean floor)
    pub min_height: Meter,

    /// Highest possible terrain height
    pub max_height: Meter,

    /// Config for the noise function used to generate heights
    #[validate]
    pub height: NoiseFnConfig,
}

/// Config for a multi-fractal noise function. We use
/// https://crates.io/crates/noise for noise generation.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, Validate)]
pub struct NoiseFnConfig {
    /// Number of different frequencies to add together. We can use multiple
    /// octaves to build a set of curves, then add them together to get our
    /// final function.
    #[validate(range(min = 1, max = 16))]
    pub octaves: usize,

    /// The frequency of the first (lowest) octave, in cycles per planet
    /// radius.
    #[validate(range(min = 0.0))]
    pub frequency: f64,

    /// Frequency multiplier between successive octaves
    pub lacunarity: f64,

    /// Amplitude multiplier between successive octaves. The first amplitude
    /// is always 1.0.
    pub persistence: f64,

    /// Exponent to apply to normalized ([0,1]) composite values after
    /// generation. Values <1 bias upwards, >1 bias downwards.
    #[validate(range(min = 0.0))]
    pub exponent: f64,
}

impl WorldConfig {
    /// [Self::oracle_timeout_ms] as a duration, for
    /// [OracleHost::new](crate::OracleHost::new)
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    /// Would this config build the same world as another, given the same
    /// oracle? Tile cache and oracle timeout settings don't affect the
    /// build, so they're ignored.
    pub fn builds_same_world(&self, other: &Self) -> bool {
        self.seed == other.seed
            && self.mesh_level == other.mesh_level
            && self.city_count == other.city_count
            && self.terrain_weight == other.terrain_weight
            && self.edge_samples == other.edge_samples
            && self.refine == other.refine
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: Seed::Int(0),
            mesh_level: 5,
            city_count: 50,
            terrain_weight: 1.0,
            edge_samples: 4,
            refine: RefineConfig::default(),
            tiles: TileCacheConfig::default(),
            oracle_timeout_ms: 30_000,
        }
    }
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            passes: 0,
            level_step: 1,
        }
    }
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            grid_resolution: 4,
            city_threshold: 0.5,
            max_border_tiles: 4096,
        }
    }
}

impl Default for NoiseTerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            radius: Meter(600_000.0),
            min_height: Meter(-6000.0),
            max_height: Meter(6000.0),
            height: NoiseFnConfig {
                octaves: 5,
                frequency: 1.5,
                lacunarity: 2.0,
                persistence: 0.5,
                exponent: 1.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        WorldConfig::default().validate().unwrap();
        NoiseTerrainConfig::default().validate().unwrap();
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_partial_json() {
        // Everything not given falls back to the defaults
        let config: WorldConfig =
            serde_json::from_str(r#"{"seed": "potato", "city_count": 3}"#)
                .unwrap();
        assert_eq!(config.seed, Seed::Text("potato".into()));
        assert_eq!(config.city_count, 3);
        assert_eq!(config.mesh_level, 5);
        assert_eq!(config.tiles.capacity, 256);
    }

    #[test]
    fn test_builds_same_world() {
        let config = WorldConfig::default();
        let tweaked = WorldConfig {
            tiles: TileCacheConfig {
                capacity: 1,
                ..Default::default()
            },
            oracle_timeout_ms: 5,
            ..WorldConfig::default()
        };
        assert!(config.builds_same_world(&tweaked));

        let reseeded = WorldConfig {
            seed: Seed::Int(1),
            ..WorldConfig::default()
        };
        assert!(!config.builds_same_world(&reseeded));
        let refined = WorldConfig {
            refine: RefineConfig {
                passes: 1,
                ..Default::default()
            },
            ..WorldConfig::default()
        };
        assert!(!config.builds_same_world(&refined));
    }
}
