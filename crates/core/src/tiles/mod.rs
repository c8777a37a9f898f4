//! Lazy, staged computation over the tiles of a dual tiling. For meshes too
//! large to build a whole [World](crate::World) eagerly, each tile is only
//! computed as far as someone asks for it, and the results live in a
//! bounded LRU cache.

mod lru;

pub use self::lru::{CacheStats, LruCache};

use crate::{
    config::{Seed, TileCacheConfig},
    mesh::Tiling,
    path::{HeapOpenSet, OpenSet},
    terrain::{self, TerrainOracle, TerrainSample},
    unwrap_or_bail, Meter, WorldConfig,
};
use anyhow::{bail, ensure, Context};
use fnv::{FnvHashMap, FnvHashSet};
use log::{debug, trace};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, IntoEnumIterator};
use validator::Validate;

/// How far a tile's computation has advanced. Levels are strictly ordered,
/// and each one requires the one before it.
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum TileLevel {
    /// Not computed at all
    Nothing,
    /// Terrain grid sampled and desirability rolled
    TerrainSampled,
    /// Decided whether this tile hosts a city. Requires every neighbor to be
    /// [Self::TerrainSampled].
    CitiesPlaced,
    /// Found the nearest city by searching outward over neighboring tiles
    CityBorderFound,
}

impl TileLevel {
    /// The level after this one, if any
    pub fn next(self) -> Option<Self> {
        Self::iter().find(|level| *level > self)
    }
}

/// Everything computed for one tile so far. Fields belonging to levels the
/// tile hasn't reached yet hold their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileState {
    level: TileLevel,
    samples: Vec<TerrainSample>,
    roll: f64,
    has_city: bool,
    nearest_city: Option<usize>,
    distance: Option<Meter>,
}

impl TileState {
    pub fn level(&self) -> TileLevel {
        self.level
    }

    /// Terrain on the tile's sample grid. The first sample is the center.
    pub fn samples(&self) -> &[TerrainSample] {
        &self.samples
    }

    /// Is the tile's center above sea level?
    pub fn is_land(&self) -> bool {
        self.samples
            .first()
            .map_or(false, |sample| !sample.height.is_underwater())
    }

    /// Random draw in `[0, 1)`, scaled by the tile's mean desirability
    pub fn roll(&self) -> f64 {
        self.roll
    }

    pub fn has_city(&self) -> bool {
        self.has_city
    }

    /// The tile hosting the nearest city, if any city is reachable over
    /// land
    pub fn nearest_city(&self) -> Option<usize> {
        self.nearest_city
    }

    /// Distance between tile centers along the path to the nearest city
    pub fn distance(&self) -> Option<Meter> {
        self.distance
    }
}

/// Per-tile staged state for a [Tiling], computed on demand and held in a
/// bounded LRU cache. Every level is a deterministic function of the seed,
/// the tile ID and the oracle, so a tile that gets evicted and requested
/// again comes back exactly the same, just at the cost of recomputing it.
pub struct TileCache<O> {
    tiling: Tiling,
    oracle: O,
    seed: Seed,
    config: TileCacheConfig,
    radius: Meter,
    states: LruCache<usize, TileState>,
}

impl<O: TerrainOracle> TileCache<O> {
    pub fn new(
        tiling: Tiling,
        oracle: O,
        seed: Seed,
        config: TileCacheConfig,
    ) -> anyhow::Result<Self> {
        config.validate().context("invalid tile cache config")?;
        let radius = oracle.radius();
        Ok(Self {
            tiling,
            oracle,
            seed,
            config,
            radius,
            states: LruCache::new(config.capacity),
        })
    }

    /// Create a cache for a planet, using the planet's seed and the tile
    /// settings from its world config
    pub fn from_world_config(
        tiling: Tiling,
        oracle: O,
        config: &WorldConfig,
    ) -> anyhow::Result<Self> {
        Self::new(tiling, oracle, config.seed.clone(), config.tiles)
    }

    pub fn tiling(&self) -> &Tiling {
        &self.tiling
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Number of tile states currently cached
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.states.stats()
    }

    /// Current level of a tile, without computing anything. An evicted tile
    /// is back to [TileLevel::Nothing].
    pub fn level(&self, tile: usize) -> TileLevel {
        self.states
            .peek(&tile)
            .map_or(TileLevel::Nothing, TileState::level)
    }

    /// Look at a tile's cached state without computing anything or marking
    /// it as used
    pub fn peek(&self, tile: usize) -> Option<&TileState> {
        self.states.peek(&tile)
    }

    /// Compute a tile up to at least the given level, along with whatever
    /// neighbors that level depends on. Returns an error if the tile ID is
    /// out of range, the level is [TileLevel::Nothing], the oracle fails,
    /// or a border search gives up.
    pub fn advance(
        &mut self,
        tile: usize,
        level: TileLevel,
    ) -> anyhow::Result<&TileState> {
        ensure!(
            tile < self.tiling.len(),
            "tile {} out of range for tiling with {} tiles",
            tile,
            self.tiling.len()
        );
        // Nothing has no state to return
        ensure!(
            level > TileLevel::Nothing,
            "cannot advance tile {} to {}",
            tile,
            level
        );
        self.promote(tile, level).with_context(|| {
            format!("error advancing tile {} to {}", tile, level)
        })?;
        Ok(unwrap_or_bail!(
            self.states.get(&tile),
            "tile {} missing after promotion",
            tile
        ))
    }

    /// Step a tile through each level until it reaches `target`. The tile is
    /// pinned while each step runs, so computing its dependencies can't
    /// evict it.
    fn promote(
        &mut self,
        tile: usize,
        target: TileLevel,
    ) -> anyhow::Result<()> {
        loop {
            let current = self.level(tile);
            let next = match current.next() {
                Some(next) if current < target => next,
                _ => return Ok(()),
            };

            self.states.pin(tile);
            let result = match next {
                TileLevel::Nothing => Ok(()),
                TileLevel::TerrainSampled => self.sample_terrain(tile),
                TileLevel::CitiesPlaced => self.place_city(tile),
                TileLevel::CityBorderFound => self.find_border(tile),
            };
            self.states.unpin(&tile);
            result?;
            trace!("Promoted tile {} to {}", tile, next);
        }
    }

    fn state_mut(&mut self, tile: usize) -> anyhow::Result<&mut TileState> {
        Ok(unwrap_or_bail!(
            self.states.get_mut(&tile),
            "tile {} not cached",
            tile
        ))
    }

    /// Sample the tile's grid, then roll its desirability. The roll comes
    /// from an RNG seeded for this tile alone, so it doesn't depend on the
    /// order tiles are visited in.
    fn sample_terrain(&mut self, tile: usize) -> anyhow::Result<()> {
        let points = self.tiling.tile(tile).grid(self.config.grid_resolution);
        let samples = terrain::sample_checked(&self.oracle, &points)?;

        let biomes = self.oracle.biomes();
        let total_desirability: f64 = samples
            .iter()
            .filter(|sample| !sample.height.is_underwater())
            .filter_map(|sample| sample.biome)
            .map(|biome| biomes[biome].desirability)
            .sum();
        let mean_desirability = total_desirability / samples.len() as f64;
        let mut rng = Pcg64::seed_from_u64(self.seed.derive(tile as u64));
        let roll = rng.gen::<f64>() * mean_desirability;

        self.states.insert(
            tile,
            TileState {
                level: TileLevel::TerrainSampled,
                samples,
                roll,
                has_city: false,
                nearest_city: None,
                distance: None,
            },
        );
        Ok(())
    }

    /// A tile hosts a city if its center is on land, and its roll beats the
    /// threshold and is strictly the highest among its neighbors. Two
    /// neighboring tiles can never both host one.
    fn place_city(&mut self, tile: usize) -> anyhow::Result<()> {
        let neighbors = self.tiling.tile(tile).neighbors().to_vec();
        let mut best_neighbor = f64::NEG_INFINITY;
        for neighbor in neighbors {
            self.promote(neighbor, TileLevel::TerrainSampled)?;
            // Read the roll right away, since promoting the next neighbor
            // could evict this one
            let roll = unwrap_or_bail!(
                self.states.peek(&neighbor),
                "tile {} not cached",
                neighbor
            )
            .roll;
            best_neighbor = best_neighbor.max(roll);
        }

        let threshold = self.config.city_threshold;
        let state = self.state_mut(tile)?;
        state.has_city = state.is_land()
            && state.roll > threshold
            && state.roll > best_neighbor;
        state.level = TileLevel::CitiesPlaced;
        if state.has_city {
            debug!("Tile {} hosts a city (roll {:.3})", tile, state.roll);
        }
        Ok(())
    }

    /// Search outward from the tile until the nearest city is confirmed.
    /// This is Dijkstra over tile centers, so the first city tile to be
    /// settled is the nearest one, and every tile still on the frontier is
    /// at least as far away. Tiles are promoted to
    /// [TileLevel::CitiesPlaced] as the search reaches them. Water tiles
    /// are settled but never expanded, so the search follows land only.
    ///
    /// Every tile the search touches stays pinned until it finishes.
    fn find_border(&mut self, tile: usize) -> anyhow::Result<()> {
        let mut pinned = Vec::new();
        let result = self.search_nearest_city(tile, &mut pinned);
        for id in &pinned {
            self.states.unpin(id);
        }
        let nearest = result?;

        let state = self.state_mut(tile)?;
        state.nearest_city = nearest.map(|(city, _)| city);
        state.distance = nearest.map(|(_, distance)| distance);
        state.level = TileLevel::CityBorderFound;
        Ok(())
    }

    fn search_nearest_city(
        &mut self,
        origin: usize,
        pinned: &mut Vec<usize>,
    ) -> anyhow::Result<Option<(usize, Meter)>> {
        let mut open = HeapOpenSet::default();
        let mut costs: FnvHashMap<usize, f64> = FnvHashMap::default();
        let mut settled: FnvHashSet<usize> = FnvHashSet::default();
        open.push(origin, 0.0);
        costs.insert(origin, 0.0);

        while let Some((current, cost)) = open.pop() {
            settled.insert(current);
            if settled.len() > self.config.max_border_tiles {
                bail!(
                    "no city confirmed within {} tiles",
                    self.config.max_border_tiles
                );
            }

            self.promote(current, TileLevel::CitiesPlaced)?;
            self.states.pin(current);
            pinned.push(current);
            let state = unwrap_or_bail!(
                self.states.peek(&current),
                "tile {} not cached",
                current
            );
            if state.has_city {
                return Ok(Some((current, Meter(cost))));
            }
            if current != origin && !state.is_land() {
                continue;
            }

            let geometry = self.tiling.tile(current);
            for &neighbor in geometry.neighbors() {
                if settled.contains(&neighbor) {
                    continue;
                }
                let neighbor_center = self.tiling.tile(neighbor).center();
                let step =
                    geometry.center().distance_to(&neighbor_center, self.radius);
                let neighbor_cost = cost + step.0;
                if costs
                    .get(&neighbor)
                    .map_or(true, |&known| neighbor_cost < known)
                {
                    costs.insert(neighbor, neighbor_cost);
                    open.push(neighbor, neighbor_cost);
                }
            }
        }

        // Ran out of reachable land without finding a city
        Ok(None)
    }
}

impl<O: fmt::Debug> fmt::Debug for TileCache<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileCache")
            .field("tiles", &self.tiling.len())
            .field("oracle", &self.oracle)
            .field("seed", &self.seed)
            .field("config", &self.config)
            .field("cached", &self.states.len())
            .finish()
    }
}
