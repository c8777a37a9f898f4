mod city;
mod cost;
mod mesh;
mod refine;
mod road;
mod terrain;
mod water;
mod zone;

use crate::{
    mesh::{Adjacency, GeodesicMesh},
    path::ShortestPaths,
    terrain::{Biome, TerrainOracle},
    timed, unwrap_or_bail,
    world::{
        generate::{
            city::CityGenerator, cost::EdgeCostGenerator, mesh::MeshGenerator,
            refine::RefineGenerator, road::RoadGenerator,
            terrain::TerrainGenerator, water::WaterDistanceGenerator,
            zone::ZoneGenerator,
        },
        EdgeCosts, Road, TerrainGraph, Vertex, World,
    },
    Meter, WorldConfig,
};
use anyhow::{ensure, Context};
use log::info;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use std::fmt::Debug;

/// A container for building a new world. This applies a series of
/// generators in sequence, each one filling in more of the world. The fields
/// are public to allow for disjoint borrowing of multiple fields at once.
///
/// Anything that a later step depends on is an `Option` until the step that
/// produces it has run, and the getters return an error if it's still
/// missing. This makes it easy to catch steps that run out of order.
pub struct WorldBuilder<'a> {
    /// This config deterministically controls the build. Please **do not
    /// mutate it**.
    pub config: &'a WorldConfig,

    /// The only source of terrain. Every call is potentially a round trip
    /// to another context, so steps should batch their queries.
    pub oracle: &'a dyn TerrainOracle,

    /// RNG provider, seeded from the config
    pub rng: Pcg64,

    pub radius: Meter,
    pub biomes: Vec<Biome>,

    /// Mesh geometry. Refinement mutates this in place; vertex IDs are
    /// stable because the mesh only ever appends vertices.
    pub mesh: Option<GeodesicMesh>,

    /// Adjacency of the current mesh. Rebuilt whenever the mesh changes.
    pub adjacency: Option<Adjacency>,

    /// One entry per mesh vertex whose terrain has been sampled. After the
    /// terrain step this is always as long as the mesh's vertex list.
    pub vertices: Vec<Vertex>,

    pub edge_costs: EdgeCosts,
    pub cities: Vec<usize>,
    pub water_distance: Option<ShortestPaths>,
    pub city_zones: Option<ShortestPaths>,
    pub roads: Vec<Road>,
}

impl<'a> WorldBuilder<'a> {
    pub fn new(config: &'a WorldConfig, oracle: &'a dyn TerrainOracle) -> Self {
        Self {
            config,
            oracle,
            rng: Pcg64::seed_from_u64(config.seed.to_u64()),
            radius: oracle.radius(),
            biomes: oracle.biomes().to_vec(),
            mesh: None,
            adjacency: None,
            vertices: Vec::new(),
            edge_costs: EdgeCosts::default(),
            cities: Vec::new(),
            water_distance: None,
            city_zones: None,
            roads: Vec::new(),
        }
    }

    /// Build a world by running a series of generation steps sequentially.
    /// Must be run from a blank slate.
    pub fn generate_world(mut self) -> anyhow::Result<World> {
        // Run each generation step. The order is very important!
        self.apply_generator(MeshGenerator)?;
        self.apply_generator(TerrainGenerator)?;
        self.apply_generator(EdgeCostGenerator)?;
        self.apply_generator(WaterDistanceGenerator)?;
        self.apply_generator(CityGenerator)?;
        self.apply_generator(ZoneGenerator)?;
        self.apply_generator(RoadGenerator)?;

        // Each pass adds detail around the roads, then re-routes them at the
        // new resolution. Cities stay put, since vertex IDs are stable.
        let passes = self.config.refine.passes;
        for pass in 1..=passes {
            info!("Refinement pass {}/{}", pass, passes);
            self.apply_generator(RefineGenerator)?;
            self.apply_generator(TerrainGenerator)?;
            self.apply_generator(EdgeCostGenerator)?;
            self.apply_generator(WaterDistanceGenerator)?;
            self.apply_generator(ZoneGenerator)?;
            self.apply_generator(RoadGenerator)?;
        }

        self.build()
    }

    /// A helper to run a generation step on this builder.
    fn apply_generator(
        &mut self,
        generator: impl Debug + Generate,
    ) -> anyhow::Result<()> {
        timed!(&format!("{:?}", generator), generator.generate(self))
            .with_context(|| format!("error in {:?}", generator))
    }

    /// Finalize the builder into a [World]. Returns an error if any step
    /// hasn't run.
    fn build(self) -> anyhow::Result<World> {
        let mesh = self.mesh()?;
        ensure!(
            self.vertices.len() == mesh.vertex_count(),
            "terrain sampled for {} of {} vertices",
            self.vertices.len(),
            mesh.vertex_count()
        );
        Ok(World {
            config: self.config.clone(),
            radius: self.radius,
            adjacency: unwrap_or_bail!(self.adjacency, "adjacency not built"),
            water_distance: unwrap_or_bail!(
                self.water_distance,
                "water distance not computed"
            ),
            city_zones: unwrap_or_bail!(
                self.city_zones,
                "city zones not computed"
            ),
            vertices: self.vertices,
            edge_costs: self.edge_costs,
            biomes: self.biomes,
            cities: self.cities,
            roads: self.roads,
        })
    }

    /// Get the mesh. Returns an error if it hasn't been built yet.
    pub fn mesh(&self) -> anyhow::Result<&GeodesicMesh> {
        Ok(unwrap_or_bail!(self.mesh.as_ref(), "mesh not built"))
    }

    /// Get the adjacency table. Returns an error if it hasn't been built
    /// yet.
    pub fn adjacency(&self) -> anyhow::Result<&Adjacency> {
        Ok(unwrap_or_bail!(self.adjacency.as_ref(), "adjacency not built"))
    }

    /// View the current state as a search graph. Returns an error if terrain
    /// hasn't been sampled for every vertex.
    pub fn graph(&self) -> anyhow::Result<TerrainGraph<'_>> {
        let adjacency = self.adjacency()?;
        ensure!(
            adjacency.len() == self.vertices.len(),
            "terrain sampled for {} of {} vertices",
            self.vertices.len(),
            adjacency.len()
        );
        Ok(TerrainGraph {
            vertices: &self.vertices,
            adjacency,
            edge_costs: &self.edge_costs,
            radius: self.radius,
            terrain_weight: self.config.terrain_weight,
        })
    }
}

/// A type that generates some sort of data for the world. Generators are
/// chained together, each one adding more data until the world is complete.
trait Generate {
    /// Apply some generation step to the given world. Errors from the oracle
    /// are expected and abort the build; any other error means a step ran
    /// out of order, which is a bug.
    fn generate(&self, world: &mut WorldBuilder) -> anyhow::Result<()>;
}
