use crate::{
    geo::Coordinates,
    terrain::{self, TerrainSample},
    world::{
        generate::{Generate, WorldBuilder},
        Vertex,
    },
};
use log::debug;

/// Sample terrain for every vertex that doesn't have it yet. The first run
/// covers the whole base mesh; after a refinement pass, only the new vertices
/// are sampled. Either way it's a single oracle call.
#[derive(Debug)]
pub struct TerrainGenerator;

impl Generate for TerrainGenerator {
    fn generate(&self, world: &mut WorldBuilder) -> anyhow::Result<()> {
        let mesh = world.mesh()?;
        let first_new = world.vertices.len();
        let points: Vec<Coordinates> =
            mesh.positions().skip(first_new).collect();
        if points.is_empty() {
            return Ok(());
        }

        let samples = terrain::sample_checked(world.oracle, &points)?;
        debug!("Sampled terrain for {} vertices", samples.len());

        let biomes = &world.biomes;
        world.vertices.extend(points.into_iter().zip(samples).map(
            |(position, TerrainSample { height, biome })| {
                let mut vertex = Vertex {
                    position,
                    height,
                    biome,
                    score: 0.0,
                    nearest_city: None,
                };
                // Only land can host a city, however nice the biome
                if vertex.is_land() {
                    vertex.score =
                        biome.map_or(0.0, |biome| biomes[biome].desirability);
                }
                vertex
            },
        ));
        Ok(())
    }
}
