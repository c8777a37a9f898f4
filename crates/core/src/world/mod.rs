mod curve;
mod generate;
mod graph;

pub use self::{
    curve::{BezierCurve, Rasterize},
    graph::{EdgeCosts, TerrainGraph},
};

use crate::{
    geo::Coordinates,
    mesh::Adjacency,
    path::ShortestPaths,
    terrain::{Biome, TerrainOracle},
    timed, unwrap_or_bail,
    world::generate::WorldBuilder,
    Meter, WorldConfig,
};
use anyhow::{ensure, Context};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// A single mesh vertex, with everything the build learned about it
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    position: Coordinates,
    height: Meter,
    biome: Option<usize>,
    score: f64,
    nearest_city: Option<usize>,
}

impl Vertex {
    pub fn position(&self) -> Coordinates {
        self.position
    }

    /// Terrain height, relative to sea level
    pub fn height(&self) -> Meter {
        self.height
    }

    /// Index into the world's biome table
    pub fn biome(&self) -> Option<usize> {
        self.biome
    }

    /// City desirability of this vertex. 0 for anything that can't host a
    /// city.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// The city whose zone this vertex falls in, if any city can reach it
    /// over land
    pub fn nearest_city(&self) -> Option<usize> {
        self.nearest_city
    }

    /// Can roads and zones cross this vertex?
    pub fn is_land(&self) -> bool {
        !self.height.is_underwater()
    }
}

/// A road between cities and/or junctions. Roads are vertex chains with no
/// repeated vertex. Each end is a city or a junction of three or more
/// roads, and every vertex in between belongs to this road only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Road {
    vertices: Vec<usize>,
}

impl Road {
    pub fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    /// First and last vertices
    pub fn endpoints(&self) -> (usize, usize) {
        // Roads are built from at least one segment, so never empty
        (self.vertices[0], self.vertices[self.vertices.len() - 1])
    }

    /// Smooth this road into a curve, with its vertices as control points
    pub fn curve(&self, world: &World) -> anyhow::Result<BezierCurve> {
        BezierCurve::new(
            self.vertices
                .iter()
                .map(|&vertex| world.vertices[vertex].position)
                .collect(),
        )
    }
}

/// Whether a world was generated from scratch or loaded from a snapshot
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildKind {
    Fresh,
    Restored,
}

/// A fully built world: the mesh with terrain, the cities and their zones,
/// and the roads between them.
///
/// ## Serialization
/// A world can be saved as a snapshot and reloaded later to skip the build.
/// The snapshot holds everything below, including both search trees. Two
/// formats are available behind features: JSON (`json`, [World::to_json])
/// and binary (`bin`, [World::to_bin]). The binary format is
/// [CBOR](https://cbor.io/), but that is subject to change, so don't rely
/// on it from other programs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct World {
    /// The config used to build this world. Building is deterministic based
    /// on config and oracle, so this plus the oracle defines the world.
    config: WorldConfig,
    radius: Meter,
    vertices: Vec<Vertex>,
    adjacency: Adjacency,
    edge_costs: EdgeCosts,
    biomes: Vec<Biome>,
    /// City vertex IDs, in founding order
    cities: Vec<usize>,
    roads: Vec<Road>,
    /// Multi-source search from every ocean vertex
    water_distance: ShortestPaths,
    /// Multi-source search from every city
    city_zones: ShortestPaths,
}

impl World {
    /// Build a new world. This runs the whole pipeline and could take
    /// several seconds, most of it spent waiting on the oracle for large
    /// meshes. Returns an error if the config is invalid or the oracle
    /// fails. Panics only on internal bugs in the build algorithms.
    pub fn generate(
        config: WorldConfig,
        oracle: &impl TerrainOracle,
    ) -> anyhow::Result<Self> {
        info!("Generating world with config {:#?}", config);
        config.validate().context("invalid config")?;
        timed!(
            "World generation",
            log::Level::Info,
            WorldBuilder::new(&config, oracle).generate_world()
        )
    }

    /// Get a reference to the config that defines this world
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Planet radius, copied from the oracle
    pub fn radius(&self) -> Meter {
        self.radius
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex(&self, id: usize) -> &Vertex {
        &self.vertices[id]
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    /// Terrain roughness of the edge between two vertices, if both are land
    /// and adjacent
    pub fn edge_cost(&self, a: usize, b: usize) -> Option<Meter> {
        self.edge_costs.get(a, b)
    }

    pub fn biomes(&self) -> &[Biome] {
        &self.biomes
    }

    /// Biome of a vertex, looked up in the biome table
    pub fn biome_of(&self, vertex: usize) -> Option<&Biome> {
        self.vertices[vertex].biome.map(|biome| &self.biomes[biome])
    }

    /// City vertex IDs, in the order they were founded
    pub fn cities(&self) -> &[usize] {
        &self.cities
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    /// Shortest paths from every land vertex to the nearest ocean vertex
    pub fn water_distance(&self) -> &ShortestPaths {
        &self.water_distance
    }

    /// Shortest paths from every land vertex to the nearest city
    pub fn city_zones(&self) -> &ShortestPaths {
        &self.city_zones
    }

    /// This world as a search graph, with the same costs that were used to
    /// build its roads
    pub fn graph(&self) -> TerrainGraph<'_> {
        TerrainGraph {
            vertices: &self.vertices,
            adjacency: &self.adjacency,
            edge_costs: &self.edge_costs,
            radius: self.radius,
            terrain_weight: self.config.terrain_weight,
        }
    }

    /// Deserialize a world from JSON. A world can be serialized into JSON
    /// with [World::to_json]. Will fail if the input is malformed.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("error deserializing world")
    }

    /// Deserialize a world from binary format. A world can be serialized into
    /// binary with [World::to_bin]. Will fail if the input is malformed.
    #[cfg(feature = "bin")]
    pub fn from_bin(read: impl std::io::Read) -> anyhow::Result<Self> {
        serde_cbor::from_reader(read).context("error deserializing world")
    }

    /// Serializes this world into JSON. This is a recoverable format, which
    /// can be loaded back into a [World] with [World::from_json].
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> String {
        // Panic here indicates an internal bug in the data format
        serde_json::to_string(self).expect("error serializing world")
    }

    /// Serializes this world into a binary format. This is a recoverable
    /// format, which can be loaded back into a [World] with
    /// [World::from_bin].
    #[cfg(feature = "bin")]
    pub fn to_bin(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        // Panic here indicates an internal bug in the data format
        serde_cbor::to_writer(&mut buffer, self)
            .expect("error serializing world");
        buffer
    }
}

type CompletionHook = Box<dyn FnMut(&World, BuildKind) + Send>;

/// A planet: a world config plus the oracle that supplies its terrain, and
/// the world once it's been built. The build runs at most once per planet.
/// Every later [Planet::build] call just returns the existing world.
pub struct Planet<O> {
    config: WorldConfig,
    oracle: O,
    world: Option<World>,
    on_complete: Option<CompletionHook>,
}

impl<O: TerrainOracle> Planet<O> {
    /// Create a planet. Fails immediately if the config is invalid, so a bad
    /// config never gets as far as the build.
    pub fn new(config: WorldConfig, oracle: O) -> anyhow::Result<Self> {
        config.validate().context("invalid config")?;
        Ok(Self {
            config,
            oracle,
            world: None,
            on_complete: None,
        })
    }

    /// Set a callback to run whenever a world is installed, either by a
    /// fresh build or by [Planet::restore]. Replaces any previous callback.
    pub fn on_complete(
        &mut self,
        hook: impl FnMut(&World, BuildKind) + Send + 'static,
    ) {
        self.on_complete = Some(Box::new(hook));
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// The built world, if there is one yet
    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn is_built(&self) -> bool {
        self.world.is_some()
    }

    /// Build the world, if it isn't built already. The build is all or
    /// nothing: if any step fails, the planet is left exactly as it was and
    /// the build can be retried.
    pub fn build(&mut self) -> anyhow::Result<&World> {
        if self.world.is_some() {
            debug!("World already built, skipping");
        } else {
            let world = World::generate(self.config.clone(), &self.oracle)?;
            self.install(world, BuildKind::Fresh);
        }
        Ok(unwrap_or_bail!(self.world.as_ref(), "world missing after build"))
    }

    /// Install a world from a snapshot instead of building it. The snapshot
    /// must have been built from a config that builds the same world (see
    /// [WorldConfig::builds_same_world]) and an oracle with the same radius.
    /// Replaces any existing world.
    pub fn restore(&mut self, world: World) -> anyhow::Result<&World> {
        ensure!(
            world.config.builds_same_world(&self.config),
            "snapshot config does not match planet config"
        );
        ensure!(
            world.radius == self.oracle.radius(),
            "snapshot radius {} does not match oracle radius {}",
            world.radius,
            self.oracle.radius()
        );
        Ok(self.install(world, BuildKind::Restored))
    }

    fn install(&mut self, world: World, kind: BuildKind) -> &World {
        info!(
            "World ready ({:?}): {} vertices, {} cities, {} roads",
            kind,
            world.vertices.len(),
            world.cities.len(),
            world.roads.len()
        );
        let world = self.world.insert(world);
        if let Some(hook) = self.on_complete.as_mut() {
            hook(world, kind);
        }
        world
    }
}

impl<O: fmt::Debug> fmt::Debug for Planet<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Planet")
            .field("config", &self.config)
            .field("oracle", &self.oracle)
            .field("built", &self.world.is_some())
            .finish()
    }
}
