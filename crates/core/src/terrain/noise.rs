use crate::{
    config::{NoiseFnConfig, NoiseTerrainConfig},
    geo::Coordinates,
    terrain::{Biome, TerrainOracle, TerrainSample},
    Meter,
};
use anyhow::Context;
use noise::{Fbm, MultiFractal, NoiseFn, Seedable};
use std::fmt;
use validator::Validate;

/// Biome table for [NoiseTerrain]. Indexes are referenced by
/// [NoiseTerrain::classify].
const BIOME_NAMES: [&str; 6] = [
    "Water",
    "Ice Caps",
    "Deserts",
    "Grasslands",
    "Forests",
    "Mountains",
];
const WATER: usize = 0;
const ICE_CAPS: usize = 1;
const DESERTS: usize = 2;
const GRASSLANDS: usize = 3;
const FORESTS: usize = 4;
const MOUNTAINS: usize = 5;

/// Above this absolute latitude (radians, ~69°), land is always ice
const POLAR_LATITUDE: f64 = 1.2;
/// Above this fraction of max height, land is mountains
const MOUNTAIN_FRACTION: f64 = 0.6;

/// A procedural terrain oracle, built from multi-fractal noise sampled on
/// the unit sphere. Heights come from one noise function and biomes from
/// height, latitude, and a second (moisture) function. This exists so the
/// core can be used and tested without a host engine; hosts with real
/// terrain provide their own [TerrainOracle].
pub struct NoiseTerrain {
    config: NoiseTerrainConfig,
    height_fn: Fbm,
    moisture_fn: Fbm,
    biomes: Vec<Biome>,
}

impl NoiseTerrain {
    /// Output range of the underlying noise functions. Values can stray
    /// slightly outside it, so they get clamped.
    const NOISE_RANGE: (f64, f64) = (-1.0, 1.0);

    pub fn new(config: NoiseTerrainConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid terrain config")?;
        anyhow::ensure!(
            config.min_height < Meter::SEA_LEVEL
                && config.max_height > Meter::SEA_LEVEL,
            "terrain height range [{}, {}] must straddle sea level",
            config.min_height,
            config.max_height
        );

        let moisture = NoiseFnConfig {
            octaves: 3,
            frequency: 2.0,
            ..config.height
        };
        Ok(Self {
            height_fn: make_noise_fn(&config.height, config.seed),
            moisture_fn: make_noise_fn(&moisture, config.seed.wrapping_add(1)),
            biomes: BIOME_NAMES.iter().map(|&name| Biome::named(name)).collect(),
            config,
        })
    }

    pub fn config(&self) -> &NoiseTerrainConfig {
        &self.config
    }

    /// Terrain height at a point
    pub fn height(&self, point: &Coordinates) -> Meter {
        let (min, max) = Self::NOISE_RANGE;
        let raw = self.height_fn.get([point.x(), point.y(), point.z()]);
        // Map to [0,1] so we can apply the exponent
        let normalized = ((raw - min) / (max - min))
            .clamp(0.0, 1.0)
            .powf(self.config.height.exponent);
        self.config.min_height
            + (self.config.max_height - self.config.min_height) * normalized
    }

    /// Pick the biome for a point with a known height
    pub fn classify(&self, point: &Coordinates, height: Meter) -> usize {
        if height.is_underwater() {
            return WATER;
        }
        if point.latitude().abs() > POLAR_LATITUDE {
            return ICE_CAPS;
        }
        if height > self.config.max_height * MOUNTAIN_FRACTION {
            return MOUNTAINS;
        }
        let moisture = self.moisture_fn.get([point.x(), point.y(), point.z()]);
        if moisture < -0.25 {
            DESERTS
        } else if moisture > 0.2 {
            FORESTS
        } else {
            GRASSLANDS
        }
    }
}

fn make_noise_fn(config: &NoiseFnConfig, seed: u32) -> Fbm {
    Fbm::default()
        .set_seed(seed)
        .set_octaves(config.octaves)
        .set_frequency(config.frequency)
        .set_lacunarity(config.lacunarity)
        .set_persistence(config.persistence)
}

impl TerrainOracle for NoiseTerrain {
    fn sample(
        &self,
        points: &[Coordinates],
    ) -> anyhow::Result<Vec<TerrainSample>> {
        Ok(points
            .iter()
            .map(|point| {
                let height = self.height(point);
                TerrainSample {
                    height,
                    biome: Some(self.classify(point, height)),
                }
            })
            .collect())
    }

    fn biomes(&self) -> &[Biome] {
        &self.biomes
    }

    fn radius(&self) -> Meter {
        self.config.radius
    }
}

impl fmt::Debug for NoiseTerrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoiseTerrain")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = NoiseTerrain::new(NoiseTerrainConfig::default()).unwrap();
        let b = NoiseTerrain::new(NoiseTerrainConfig::default()).unwrap();
        let points = [
            Coordinates::new(0.2, 0.5, -0.3),
            Coordinates::new(-0.9, 0.1, 0.4),
        ];
        assert_eq!(a.sample(&points).unwrap(), b.sample(&points).unwrap());
    }

    #[test]
    fn test_heights_in_range() {
        let config = NoiseTerrainConfig::default();
        let terrain = NoiseTerrain::new(config).unwrap();
        let mesh = crate::mesh::GeodesicMesh::new(3).unwrap();
        let points: Vec<Coordinates> = mesh.positions().collect();
        let samples = terrain.sample(&points).unwrap();
        for (point, sample) in points.iter().zip(&samples) {
            assert!(sample.height >= config.min_height);
            assert!(sample.height <= config.max_height);
            let biome = sample.biome.unwrap();
            assert_eq!(biome == WATER, sample.height.is_underwater());
            if biome == ICE_CAPS {
                assert!(point.latitude().abs() > POLAR_LATITUDE);
            }
        }
        // Some land, some water
        assert!(samples.iter().any(|s| s.height.is_underwater()));
        assert!(samples.iter().any(|s| !s.height.is_underwater()));
    }

    #[test]
    fn test_invalid_config() {
        let config = NoiseTerrainConfig {
            min_height: Meter(10.0),
            ..Default::default()
        };
        assert!(NoiseTerrain::new(config).is_err());
    }
}
