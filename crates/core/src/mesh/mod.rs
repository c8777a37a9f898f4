//! The geodesic mesh: a sphere approximated by recursively subdividing the
//! faces of an icosahedron. The mesh can be subdivided uniformly (every face
//! to the same level) or locally (only around one vertex), and its dual is a
//! tiling of mostly-hexagonal polygons, one per vertex.

mod adjacency;
mod dual;

pub use self::{
    adjacency::{Adjacency, Neighbors},
    dual::{TileGeometry, Tiling},
};

use crate::{geo::Coordinates, timed, util};
use anyhow::ensure;
use fnv::FnvHashMap;
use log::debug;

/// Golden ratio, which defines the proportions of the base icosahedron
const PHI: f64 = 1.618_033_988_749_895;

/// The 12 vertices of the base icosahedron, before projection onto the
/// sphere
const ICOSAHEDRON_VERTICES: [[f64; 3]; 12] = [
    [-1.0, PHI, 0.0],
    [1.0, PHI, 0.0],
    [-1.0, -PHI, 0.0],
    [1.0, -PHI, 0.0],
    [0.0, -1.0, PHI],
    [0.0, 1.0, PHI],
    [0.0, -1.0, -PHI],
    [0.0, 1.0, -PHI],
    [PHI, 0.0, -1.0],
    [PHI, 0.0, 1.0],
    [-PHI, 0.0, -1.0],
    [-PHI, 0.0, 1.0],
];

/// The 20 faces of the base icosahedron, as indexes into
/// [ICOSAHEDRON_VERTICES]
const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// A triangular face of the mesh. Triangles are only ever split, never
/// removed, so a triangle with children is no longer part of the surface.
/// Only *leaf* triangles (no children) make up the current mesh.
#[derive(Copy, Clone, Debug)]
pub struct Triangle {
    vertices: [usize; 3],
    level: u8,
    children: Option<[usize; 4]>,
}

impl Triangle {
    /// IDs of the three corner vertices
    pub fn vertices(&self) -> [usize; 3] {
        self.vertices
    }

    /// Subdivision level. The base icosahedron's faces are level 0.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Is this triangle part of the current surface?
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// IDs of the four child triangles, if this one has been split
    pub fn children(&self) -> Option<[usize; 4]> {
        self.children
    }
}

#[derive(Clone, Debug)]
struct MeshVertex {
    position: Coordinates,
    /// Leaf triangles that have this vertex as a corner
    triangles: Vec<usize>,
    /// Midpoints between this vertex and higher-ID vertices, keyed by the
    /// other vertex's ID. Each edge's midpoint is only cached on its
    /// lower-ID end, so there's exactly one place to look.
    midpoints: FnvHashMap<usize, usize>,
}

/// A subdivided icosahedron. The vertex set is append-only: subdivision adds
/// vertices but never moves or removes one, so vertex IDs stay stable across
/// any amount of refinement.
#[derive(Clone, Debug)]
pub struct GeodesicMesh {
    vertices: Vec<MeshVertex>,
    triangles: Vec<Triangle>,
}

impl GeodesicMesh {
    /// Highest uniform subdivision level we'll build. Level 10 is already
    /// over 10 million vertices.
    pub const MAX_UNIFORM_LEVEL: u8 = 10;
    /// Highest level that local refinement can reach
    pub const MAX_LEVEL: u8 = 24;

    /// Build the base icosahedron and subdivide every face `level` times.
    /// The result always has exactly `10 * 4^level + 2` vertices.
    pub fn new(level: u8) -> anyhow::Result<Self> {
        ensure!(
            level <= Self::MAX_UNIFORM_LEVEL,
            "mesh level {} exceeds maximum of {}",
            level,
            Self::MAX_UNIFORM_LEVEL
        );

        let mut mesh = Self::icosahedron();
        timed!("Mesh subdivision", {
            for _ in 0..level {
                let leaves: Vec<usize> = mesh.leaf_triangle_ids().collect();
                for triangle in leaves {
                    mesh.split(triangle);
                }
            }
        });

        debug_assert_eq!(
            mesh.vertex_count(),
            util::icosphere_len(level),
            "expected 10*4^L+2 vertices"
        );
        debug!(
            "Built level {} mesh with {} vertices and {} faces",
            level,
            mesh.vertex_count(),
            mesh.leaf_triangle_ids().count()
        );
        Ok(mesh)
    }

    fn icosahedron() -> Self {
        let vertices = ICOSAHEDRON_VERTICES
            .iter()
            .map(|&[x, y, z]| MeshVertex {
                position: Coordinates::new(x, y, z),
                triangles: Vec::with_capacity(6),
                midpoints: FnvHashMap::default(),
            })
            .collect();
        let mut mesh = Self {
            vertices,
            triangles: Vec::new(),
        };
        for face in ICOSAHEDRON_FACES.iter() {
            mesh.add_triangle(*face, 0);
        }
        mesh
    }

    /// Number of vertices in the mesh
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Position of a vertex. Panics if the ID is out of range.
    pub fn position(&self, vertex: usize) -> Coordinates {
        self.vertices[vertex].position
    }

    /// Positions of every vertex, in ID order
    pub fn positions(&self) -> impl Iterator<Item = Coordinates> + '_ {
        self.vertices.iter().map(|vertex| vertex.position)
    }

    /// Number of triangles ever created, including split ones
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Get a triangle by ID. Includes non-leaf triangles.
    pub fn triangle(&self, id: usize) -> &Triangle {
        &self.triangles[id]
    }

    /// IDs of all triangles that make up the current surface
    pub fn leaf_triangle_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .filter(|(_, triangle)| triangle.is_leaf())
            .map(|(id, _)| id)
    }

    /// All triangles that make up the current surface
    pub fn leaf_triangles(&self) -> impl Iterator<Item = &Triangle> + '_ {
        self.triangles.iter().filter(|triangle| triangle.is_leaf())
    }

    /// IDs of the leaf triangles that have the given vertex as a corner
    pub fn incident_triangles(&self, vertex: usize) -> &[usize] {
        &self.vertices[vertex].triangles
    }

    /// The vertices that share a leaf triangle with the given one. Order is
    /// stable for a given mesh but otherwise arbitrary.
    pub fn neighbors(&self, vertex: usize) -> Vec<usize> {
        let mut neighbors = Vec::with_capacity(6);
        for &triangle in &self.vertices[vertex].triangles {
            for &other in &self.triangles[triangle].vertices {
                if other != vertex && !neighbors.contains(&other) {
                    neighbors.push(other);
                }
            }
        }
        neighbors
    }

    /// Is every leaf triangle at the same level?
    pub fn is_uniform(&self) -> bool {
        let mut levels = self.leaf_triangles().map(Triangle::level);
        match levels.next() {
            Some(first) => levels.all(|level| level == first),
            None => true,
        }
    }

    /// Get the ID of the vertex halfway between `a` and `b`, creating it if
    /// necessary. The same unordered pair always yields the same vertex.
    pub fn midpoint(&mut self, a: usize, b: usize) -> usize {
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        if let Some(&mid) = self.vertices[low].midpoints.get(&high) {
            return mid;
        }

        let position =
            self.vertices[low].position.midpoint(&self.vertices[high].position);
        let mid = self.vertices.len();
        self.vertices.push(MeshVertex {
            position,
            triangles: Vec::with_capacity(6),
            midpoints: FnvHashMap::default(),
        });
        self.vertices[low].midpoints.insert(high, mid);
        mid
    }

    /// Subdivide the triangles around one vertex until every leaf triangle
    /// touching it is at `target_level` or deeper. The rest of the mesh is
    /// left alone, which leaves T-junctions along the border of the refined
    /// patch. Returns the number of triangles that were split.
    pub fn local_refine(
        &mut self,
        vertex: usize,
        target_level: u8,
    ) -> anyhow::Result<usize> {
        ensure!(
            vertex < self.vertices.len(),
            "vertex {} out of range for mesh with {} vertices",
            vertex,
            self.vertices.len()
        );
        ensure!(
            target_level <= Self::MAX_LEVEL,
            "refinement level {} exceeds maximum of {}",
            target_level,
            Self::MAX_LEVEL
        );

        let mut splits = 0;
        // Splitting a triangle leaves exactly one child on this vertex, so
        // keep going until none of its triangles are too coarse
        loop {
            let coarse = self.vertices[vertex]
                .triangles
                .iter()
                .copied()
                .find(|&t| self.triangles[t].level < target_level);
            match coarse {
                Some(triangle) => {
                    self.split(triangle);
                    splits += 1;
                }
                None => break,
            }
        }
        Ok(splits)
    }

    /// Split a leaf triangle into four, via its edge midpoints
    fn split(&mut self, id: usize) {
        let Triangle {
            vertices: [a, b, c],
            level,
            children,
        } = self.triangles[id];
        assert!(children.is_none(), "triangle {} is already split", id);

        let ab = self.midpoint(a, b);
        let bc = self.midpoint(b, c);
        let ac = self.midpoint(a, c);

        for vertex in [a, b, c].iter() {
            self.vertices[*vertex].triangles.retain(|&t| t != id);
        }
        let children = [
            self.add_triangle([a, ab, ac], level + 1),
            self.add_triangle([b, bc, ab], level + 1),
            self.add_triangle([c, ac, bc], level + 1),
            self.add_triangle([ab, bc, ac], level + 1),
        ];
        self.triangles[id].children = Some(children);
    }

    fn add_triangle(&mut self, vertices: [usize; 3], level: u8) -> usize {
        let id = self.triangles.len();
        self.triangles.push(Triangle {
            vertices,
            level,
            children: None,
        });
        for vertex in vertices.iter() {
            self.vertices[*vertex].triangles.push(id);
        }
        id
    }

    /// Build the fixed-width adjacency table for the current surface
    pub fn adjacency(&self) -> Adjacency {
        Adjacency::from_mesh(self)
    }

    /// Build the dual tiling of this mesh. Only supported for uniformly
    /// subdivided meshes, since local refinement leaves vertices on
    /// T-junctions that don't have a closed fan of triangles.
    pub fn dual(&self) -> anyhow::Result<Tiling> {
        ensure!(
            self.is_uniform(),
            "cannot build dual tiling of a locally refined mesh"
        );
        Ok(timed!("Dual tiling", Tiling::from_mesh(self)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_vertex_counts() {
        for level in 0..=4 {
            let mesh = GeodesicMesh::new(level).unwrap();
            assert_eq!(mesh.vertex_count(), util::icosphere_len(level));
            assert_eq!(
                mesh.leaf_triangles().count(),
                20 * 4usize.pow(level as u32)
            );
            assert!(mesh.is_uniform());
        }
        assert!(GeodesicMesh::new(11).is_err());
    }

    #[test]
    fn test_unit_sphere() {
        let mesh = GeodesicMesh::new(3).unwrap();
        for position in mesh.positions() {
            assert_approx_eq!(position.vector().norm(), 1.0);
        }
    }

    #[test]
    fn test_distinct_triangle_vertices() {
        let mesh = GeodesicMesh::new(3).unwrap();
        for triangle in mesh.leaf_triangles() {
            let [a, b, c] = triangle.vertices();
            assert!(a != b && b != c && a != c, "{:?}", triangle);
        }
    }

    #[test]
    fn test_midpoint_cached() {
        let mut mesh = GeodesicMesh::new(0).unwrap();
        let mid = mesh.midpoint(0, 11);
        assert_eq!(mid, 12);
        assert_eq!(mesh.midpoint(11, 0), mid);
        assert_eq!(mesh.midpoint(0, 11), mid);
        assert_eq!(mesh.vertex_count(), 13);
        assert_eq!(
            mesh.position(mid),
            mesh.position(0).midpoint(&mesh.position(11))
        );
    }

    #[test]
    fn test_uniform_degrees() {
        let mesh = GeodesicMesh::new(2).unwrap();
        // The original icosahedron vertices keep degree 5
        for vertex in 0..mesh.vertex_count() {
            let expected = if vertex < 12 { 5 } else { 6 };
            assert_eq!(mesh.neighbors(vertex).len(), expected);
        }
    }

    #[test]
    fn test_local_refine() {
        let mut mesh = GeodesicMesh::new(1).unwrap();
        let before = mesh.vertex_count();
        let splits = mesh.local_refine(0, 3).unwrap();
        // 5 triangles at level 1 -> 2 -> 3
        assert_eq!(splits, 10);
        assert!(mesh.vertex_count() > before);
        assert!(!mesh.is_uniform());
        for &triangle in mesh.incident_triangles(0) {
            assert_eq!(mesh.triangle(triangle).level(), 3);
        }
        // Vertex 1 wasn't touched by the refinement
        assert!(mesh
            .incident_triangles(1)
            .iter()
            .any(|&t| mesh.triangle(t).level() == 1));

        // Already refined, so this is a no-op
        assert_eq!(mesh.local_refine(0, 2).unwrap(), 0);
        assert!(mesh.local_refine(0, GeodesicMesh::MAX_LEVEL + 1).is_err());
        assert!(mesh.local_refine(mesh.vertex_count(), 2).is_err());
        assert!(mesh.dual().is_err());
    }

    #[test]
    fn test_local_refine_degree_bound() {
        let mut mesh = GeodesicMesh::new(1).unwrap();
        // Refine a chain of vertices to different depths, like a road would
        for (vertex, level) in [(0, 3), (11, 4), (5, 2), (13, 5)].iter() {
            mesh.local_refine(*vertex, *level).unwrap();
        }
        // Panics if any vertex overflows
        let adjacency = mesh.adjacency();
        for vertex in 0..mesh.vertex_count() {
            assert!(adjacency.degree(vertex) <= Adjacency::MAX_DEGREE);
        }
    }
}
