//! Polis builds settlements and roads on a procedurally generated planet.
//! The planet's surface is a geodesic mesh (a subdivided icosahedron), the
//! terrain comes from an outside oracle, and cities and the roads between
//! them are placed with terrain-aware shortest path searches. Presentation
//! and persistence are left to the host.
//!
//! ```no_run
//! use polis::{NoiseTerrain, NoiseTerrainConfig, Planet, WorldConfig};
//!
//! let oracle = NoiseTerrain::new(NoiseTerrainConfig::default())?;
//! let mut planet = Planet::new(WorldConfig::default(), oracle)?;
//! let world = planet.build()?;
//! println!("{} cities, {} roads", world.cities().len(), world.roads().len());
//! // From here you can display/use the world however you like.
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! See [WorldConfig] for details on how the build can be customized. For
//! meshes too large to build eagerly, see [TileCache].

mod config;
pub mod geo;
pub mod mesh;
pub mod path;
pub mod terrain;
pub mod tiles;
mod util;
mod world;

pub use crate::{
    config::{
        NoiseFnConfig, NoiseTerrainConfig, RefineConfig, Seed, TileCacheConfig,
        WorldConfig,
    },
    geo::Coordinates,
    mesh::{GeodesicMesh, Tiling},
    path::ShortestPaths,
    terrain::{
        Biome, NoiseTerrain, OracleHost, OracleProxy, TerrainOracle,
        TerrainSample,
    },
    tiles::{TileCache, TileLevel, TileState},
    util::unit::Meter,
    world::{
        BezierCurve, BuildKind, EdgeCosts, Planet, Rasterize, Road,
        TerrainGraph, Vertex, World,
    },
};
