use crate::{
    geo::Coordinates,
    terrain,
    unwrap_or_bail,
    world::generate::{Generate, WorldBuilder},
    Meter,
};
use log::debug;

/// Measure the terrain roughness of every land edge that doesn't have a cost
/// yet. Each edge is sampled at evenly spaced interior points, and its
/// roughness is the total climb and descent along the way. All edges are
/// sampled in one oracle call.
///
/// After refinement, edges that were split no longer exist, so their costs
/// are dropped here too.
#[derive(Debug)]
pub struct EdgeCostGenerator;

impl Generate for EdgeCostGenerator {
    fn generate(&self, world: &mut WorldBuilder) -> anyhow::Result<()> {
        let adjacency =
            unwrap_or_bail!(world.adjacency.as_ref(), "adjacency not built");
        let vertices = &world.vertices;
        world
            .edge_costs
            .retain(|a, b| adjacency.contains(a, b));

        let edges: Vec<(usize, usize)> = adjacency
            .edges()
            .filter(|&(a, b)| {
                vertices[a].is_land()
                    && vertices[b].is_land()
                    && !world.edge_costs.contains(a, b)
            })
            .collect();
        if edges.is_empty() {
            return Ok(());
        }

        // Interior sample points for every edge, back to back. An edge with
        // n samples per edge has n-1 interior points.
        let samples_per_edge = world.config.edge_samples as usize;
        let interior = samples_per_edge - 1;
        let mut points = Vec::with_capacity(edges.len() * interior);
        for &(a, b) in &edges {
            let start = vertices[a].position;
            let end = vertices[b].position;
            for i in 1..samples_per_edge {
                let t = i as f64 / samples_per_edge as f64;
                points.push(Coordinates::linear_combination(&[
                    (1.0 - t, start),
                    (t, end),
                ]));
            }
        }
        let samples = if points.is_empty() {
            Vec::new()
        } else {
            terrain::sample_checked(world.oracle, &points)?
        };

        for (i, &(a, b)) in edges.iter().enumerate() {
            let interior_heights = samples[i * interior..(i + 1) * interior]
                .iter()
                .map(|sample| sample.height);
            let heights = std::iter::once(vertices[a].height)
                .chain(interior_heights)
                .chain(std::iter::once(vertices[b].height));
            let roughness: Meter = heights
                .clone()
                .zip(heights.skip(1))
                .map(|(h1, h2)| (h2 - h1).abs())
                .sum();
            world.edge_costs.insert(a, b, roughness);
        }
        debug!(
            "Measured {} new edges ({} total)",
            edges.len(),
            world.edge_costs.len()
        );
        Ok(())
    }
}
