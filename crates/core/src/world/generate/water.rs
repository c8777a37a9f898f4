use crate::{
    path::ShortestPaths,
    world::generate::{Generate, WorldBuilder},
};
use log::debug;

/// Search outward from every ocean vertex at once, so each land vertex knows
/// its distance to the nearest water and the way there.
#[derive(Debug)]
pub struct WaterDistanceGenerator;

impl Generate for WaterDistanceGenerator {
    fn generate(&self, world: &mut WorldBuilder) -> anyhow::Result<()> {
        let graph = world.graph()?;
        let sources = world
            .vertices
            .iter()
            .enumerate()
            .filter(|(_, vertex)| !vertex.is_land())
            .map(|(id, _)| id);
        let search = ShortestPaths::multi_source(&graph, sources);
        debug!(
            "{} vertices within reach of water",
            (0..search.len()).filter(|&id| search.is_reached(id)).count()
        );
        world.water_distance = Some(search);
        Ok(())
    }
}
