use crate::mesh::GeodesicMesh;
use serde::{Deserialize, Serialize};

/// Fixed-width neighbor table for every vertex in a mesh. Each vertex gets
/// [Adjacency::MAX_DEGREE] slots, with `None` marking an empty slot. Slots
/// fill from the front, so the first `None` ends the list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Adjacency {
    slots: Vec<[Option<usize>; Adjacency::MAX_DEGREE]>,
}

impl Adjacency {
    /// Highest degree any vertex can reach. A uniform mesh has degree 5 or 6
    /// everywhere, but local refinement leaves vertices next to a
    /// subdivision boundary with up to two neighbors per incident face.
    pub const MAX_DEGREE: usize = 12;

    /// Create a table for `len` vertices, with no edges
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: vec![[None; Self::MAX_DEGREE]; len],
        }
    }

    /// Build the table from the leaf triangles of a mesh
    pub fn from_mesh(mesh: &GeodesicMesh) -> Self {
        let mut adjacency = Self::with_len(mesh.vertex_count());
        for triangle in mesh.leaf_triangles() {
            let [a, b, c] = triangle.vertices();
            adjacency.insert(a, b);
            adjacency.insert(b, c);
            adjacency.insert(c, a);
        }
        adjacency
    }

    /// Number of vertices in the table
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Add an undirected edge. Inserting an edge that already exists is a
    /// no-op, and insertion order never affects the resulting neighbor sets.
    ///
    /// Panics if either vertex is already at [Self::MAX_DEGREE], which can
    /// only happen if the mesh was built incorrectly.
    pub fn insert(&mut self, a: usize, b: usize) {
        assert_ne!(a, b, "cannot connect vertex {} to itself", a);
        self.insert_directed(a, b);
        self.insert_directed(b, a);
    }

    fn insert_directed(&mut self, from: usize, to: usize) {
        let slots = &mut self.slots[from];
        for slot in slots.iter_mut() {
            match slot {
                Some(existing) if *existing == to => return,
                Some(_) => {}
                None => {
                    *slot = Some(to);
                    return;
                }
            }
        }
        unreachable!(
            "vertex {} has more than {} neighbors",
            from,
            Self::MAX_DEGREE
        );
    }

    /// All neighbors of a vertex, in insertion order
    pub fn neighbors(&self, vertex: usize) -> Neighbors<'_> {
        Neighbors(self.slots[vertex].iter())
    }

    pub fn degree(&self, vertex: usize) -> usize {
        self.neighbors(vertex).count()
    }

    pub fn contains(&self, a: usize, b: usize) -> bool {
        self.neighbors(a).any(|neighbor| neighbor == b)
    }

    /// Every undirected edge exactly once, as `(low, high)` pairs
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.slots.len()).flat_map(move |a| {
            self.neighbors(a).filter(move |&b| a < b).map(move |b| (a, b))
        })
    }
}

/// Iterator over the occupied slots of one vertex. See
/// [Adjacency::neighbors].
#[derive(Clone, Debug)]
pub struct Neighbors<'a>(std::slice::Iter<'a, Option<usize>>);

impl<'a> Iterator for Neighbors<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        // Occupied slots are contiguous, so the first empty one ends it
        self.0.next().copied().flatten()
    }
}
