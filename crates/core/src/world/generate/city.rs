use crate::world::generate::{Generate, WorldBuilder};
use anyhow::ensure;
use fnv::FnvHashSet;
use log::info;
use rand::Rng;

/// Found cities by roulette: each land vertex is picked with probability
/// proportional to its score (its biome's desirability). A roll that lands
/// on a vertex that already has a city is simply rolled again, so the
/// result is always `city_count` distinct vertices.
#[derive(Debug)]
pub struct CityGenerator;

impl Generate for CityGenerator {
    fn generate(&self, world: &mut WorldBuilder) -> anyhow::Result<()> {
        ensure!(world.cities.is_empty(), "cities already founded");
        let city_count = world.config.city_count as usize;

        // Running total of scores, so a roll maps to a vertex by binary
        // search
        let mut candidates = Vec::new();
        let mut cumulative = Vec::new();
        let mut total = 0.0;
        for (id, vertex) in world.vertices.iter().enumerate() {
            if vertex.score > 0.0 {
                total += vertex.score;
                candidates.push(id);
                cumulative.push(total);
            }
        }
        ensure!(
            candidates.len() >= city_count,
            "only {} vertices can host a city, but {} cities were requested",
            candidates.len(),
            city_count
        );

        let mut founded = FnvHashSet::default();
        while world.cities.len() < city_count {
            let roll = world.rng.gen::<f64>() * total;
            let index = cumulative
                .partition_point(|&running| running <= roll)
                .min(candidates.len() - 1);
            let vertex = candidates[index];
            if !founded.insert(vertex) {
                continue;
            }

            let v = &world.vertices[vertex];
            let biome = v
                .biome
                .map_or("no biome", |biome| world.biomes[biome].name.as_str());
            info!(
                "Founded city {} at vertex {} ({}), {} at {}",
                world.cities.len(),
                vertex,
                v.position,
                biome,
                v.height
            );
            world.cities.push(vertex);
        }
        Ok(())
    }
}
