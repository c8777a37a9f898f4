use crate::{
    mesh::GeodesicMesh,
    unwrap_or_bail,
    world::generate::{Generate, WorldBuilder},
};
use fnv::FnvBuildHasher;
use indexmap::IndexMap;
use log::info;

/// Subdivide the mesh around every road vertex, so the next routing pass
/// can follow the terrain more closely where it matters. Each road vertex
/// is refined `level_step` levels deeper than its finest incident triangle.
/// Targets are fixed before any splitting, so refining one vertex doesn't
/// push its neighbors deeper than their own step.
///
/// Vertex IDs are stable across refinement, so cities and the terrain of
/// existing vertices carry over. The new vertices are sampled by the next
/// terrain step.
#[derive(Debug)]
pub struct RefineGenerator;

impl Generate for RefineGenerator {
    fn generate(&self, world: &mut WorldBuilder) -> anyhow::Result<()> {
        let level_step = world.config.refine.level_step;
        let mesh = unwrap_or_bail!(world.mesh.as_mut(), "mesh not built");

        let mut targets: IndexMap<usize, u8, FnvBuildHasher> =
            IndexMap::default();
        for road in &world.roads {
            for &vertex in road.vertices() {
                targets.entry(vertex).or_insert_with(|| {
                    let finest = mesh
                        .incident_triangles(vertex)
                        .iter()
                        .map(|&triangle| mesh.triangle(triangle).level())
                        .max()
                        .unwrap_or(0);
                    finest
                        .saturating_add(level_step)
                        .min(GeodesicMesh::MAX_LEVEL)
                });
            }
        }

        let vertices_before = mesh.vertex_count();
        let mut splits = 0;
        for (&vertex, &target) in &targets {
            splits += mesh.local_refine(vertex, target)?;
        }
        info!(
            "Refined around {} road vertices: {} triangles split, {} new \
             vertices",
            targets.len(),
            splits,
            mesh.vertex_count() - vertices_before
        );

        world.adjacency = Some(mesh.adjacency());
        Ok(())
    }
}
