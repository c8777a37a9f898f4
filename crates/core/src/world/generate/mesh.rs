use crate::{
    mesh::GeodesicMesh,
    world::generate::{Generate, WorldBuilder},
};
use anyhow::ensure;

/// Build the uniform base mesh and its adjacency table. Everything else in
/// the build hangs off the vertex IDs assigned here.
#[derive(Debug)]
pub struct MeshGenerator;

impl Generate for MeshGenerator {
    fn generate(&self, world: &mut WorldBuilder) -> anyhow::Result<()> {
        ensure!(world.mesh.is_none(), "mesh already built");
        let mesh = GeodesicMesh::new(world.config.mesh_level)?;
        world.adjacency = Some(mesh.adjacency());
        world.mesh = Some(mesh);
        Ok(())
    }
}
