//! The terrain oracle: the outside source of truth for terrain height and
//! biome at any point on the planet. The core never computes terrain
//! itself, it only consumes the oracle's answers.

mod host;
mod noise;

pub use self::{
    host::{OracleHost, OracleProxy},
    noise::NoiseTerrain,
};

use crate::{geo::Coordinates, Meter};
use serde::{Deserialize, Serialize};

/// Terrain at a single point
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainSample {
    /// Height relative to sea level. Negative is underwater.
    pub height: Meter,
    /// Index into the oracle's [biome table](TerrainOracle::biomes), if the
    /// point has a biome at all
    pub biome: Option<usize>,
}

/// A biome, as defined by the oracle's biome table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Biome {
    pub name: String,
    /// Relative weight for founding cities in this biome. 0 means cities
    /// are never founded here.
    pub desirability: f64,
}

impl Biome {
    pub fn new(name: impl Into<String>, desirability: f64) -> Self {
        Self {
            name: name.into(),
            desirability,
        }
    }

    /// Create a biome with the standard desirability for its name: nobody
    /// settles in water or on ice caps, deserts are a last resort, and
    /// everything else is equally good.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let desirability = match name.as_str() {
            "Water" | "Ice Caps" => 0.0,
            "Deserts" => 0.1,
            _ => 1.0,
        };
        Self { name, desirability }
    }
}

/// A source of terrain data. Implementations are expected to be expensive
/// per call but cheap per point, so callers always batch as many points as
/// they can into one [TerrainOracle::sample] call.
pub trait TerrainOracle {
    /// Sample terrain at every given point. The output must have one sample
    /// per input point, in the same order. Any error aborts whatever
    /// operation requested the samples.
    fn sample(&self, points: &[Coordinates])
        -> anyhow::Result<Vec<TerrainSample>>;

    /// Every biome that [TerrainSample::biome] can refer to
    fn biomes(&self) -> &[Biome];

    /// Physical radius of the planet, for converting angles into distances
    fn radius(&self) -> Meter;
}

impl<T: TerrainOracle + ?Sized> TerrainOracle for &T {
    fn sample(
        &self,
        points: &[Coordinates],
    ) -> anyhow::Result<Vec<TerrainSample>> {
        (**self).sample(points)
    }

    fn biomes(&self) -> &[Biome] {
        (**self).biomes()
    }

    fn radius(&self) -> Meter {
        (**self).radius()
    }
}

impl<T: TerrainOracle + ?Sized> TerrainOracle for Box<T> {
    fn sample(
        &self,
        points: &[Coordinates],
    ) -> anyhow::Result<Vec<TerrainSample>> {
        (**self).sample(points)
    }

    fn biomes(&self) -> &[Biome] {
        (**self).biomes()
    }

    fn radius(&self) -> Meter {
        (**self).radius()
    }
}

/// Sample a batch of points and check that the oracle held up its end of
/// the contract
pub(crate) fn sample_checked<O: TerrainOracle + ?Sized>(
    oracle: &O,
    points: &[Coordinates],
) -> anyhow::Result<Vec<TerrainSample>> {
    let samples = oracle.sample(points)?;
    anyhow::ensure!(
        samples.len() == points.len(),
        "terrain oracle returned {} samples for {} points",
        samples.len(),
        points.len()
    );
    let biome_count = oracle.biomes().len();
    if let Some(sample) = samples
        .iter()
        .find(|sample| matches!(sample.biome, Some(biome) if biome >= biome_count))
    {
        anyhow::bail!(
            "terrain oracle returned unknown biome {:?} (table has {})",
            sample.biome,
            biome_count
        );
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_desirability() {
        assert_eq!(Biome::named("Water").desirability, 0.0);
        assert_eq!(Biome::named("Ice Caps").desirability, 0.0);
        assert_eq!(Biome::named("Deserts").desirability, 0.1);
        assert_eq!(Biome::named("Forests").desirability, 1.0);
    }

    /// Answers with a biome that doesn't exist, and drops `short` samples
    /// off the end
    struct Liar {
        short: usize,
    }

    impl TerrainOracle for Liar {
        fn sample(
            &self,
            points: &[Coordinates],
        ) -> anyhow::Result<Vec<TerrainSample>> {
            Ok(points
                .iter()
                .skip(self.short)
                .map(|_| TerrainSample {
                    height: Meter(1.0),
                    biome: Some(3),
                })
                .collect())
        }

        fn biomes(&self) -> &[Biome] {
            &[]
        }

        fn radius(&self) -> Meter {
            Meter(1.0)
        }
    }

    #[test]
    fn test_sample_checked() {
        let point = Coordinates::new(1.0, 0.0, 0.0);
        let err = sample_checked(&Liar { short: 0 }, &[point, point])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "terrain oracle returned unknown biome Some(3) (table has 0)"
        );
        // Count is checked before biomes
        let err = sample_checked(&Liar { short: 1 }, &[point, point])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "terrain oracle returned 1 samples for 2 points"
        );
    }
}
