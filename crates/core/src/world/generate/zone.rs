use crate::{
    path::ShortestPaths,
    world::generate::{Generate, WorldBuilder},
};
use log::debug;

/// Split the land into one zone per city, with a single search from every
/// city at once. Each vertex joins the zone of the city its shortest path
/// leads back to. Vertices no city can reach over land stay unclaimed.
#[derive(Debug)]
pub struct ZoneGenerator;

impl Generate for ZoneGenerator {
    fn generate(&self, world: &mut WorldBuilder) -> anyhow::Result<()> {
        let graph = world.graph()?;
        let zones =
            ShortestPaths::multi_source(&graph, world.cities.iter().copied());
        let roots: Vec<Option<usize>> =
            (0..zones.len()).map(|id| zones.root(id)).collect();

        let mut claimed = 0;
        for (vertex, root) in world.vertices.iter_mut().zip(roots) {
            vertex.nearest_city = root;
            if root.is_some() {
                claimed += 1;
            }
        }
        debug!(
            "{} of {} vertices claimed by {} cities",
            claimed,
            world.vertices.len(),
            world.cities.len()
        );
        world.city_zones = Some(zones);
        Ok(())
    }
}
