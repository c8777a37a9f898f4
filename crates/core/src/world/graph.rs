use crate::{
    mesh::{Adjacency, Neighbors},
    path::SearchGraph,
    world::Vertex,
    Meter,
};
use fnv::FnvHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Terrain roughness of each traversable edge, keyed by the unordered vertex
/// pair. Looking up `(a, b)` and `(b, a)` always hits the same entry, so
/// edge costs are symmetric by construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeCosts(FnvHashMap<(usize, usize), Meter>);

impl EdgeCosts {
    fn key(a: usize, b: usize) -> (usize, usize) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn get(&self, a: usize, b: usize) -> Option<Meter> {
        self.0.get(&Self::key(a, b)).copied()
    }

    pub fn insert(&mut self, a: usize, b: usize, roughness: Meter) {
        self.0.insert(Self::key(a, b), roughness);
    }

    pub fn contains(&self, a: usize, b: usize) -> bool {
        self.0.contains_key(&Self::key(a, b))
    }

    /// Drop every edge that no longer satisfies the predicate
    pub fn retain(&mut self, mut keep: impl FnMut(usize, usize) -> bool) {
        self.0.retain(|&(a, b), _| keep(a, b));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Tuple keys aren't valid JSON keys, so serialize as a list of
// `(low, high, roughness)`, sorted so output is stable
impl Serialize for EdgeCosts {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut edges: Vec<(usize, usize, Meter)> =
            self.0.iter().map(|(&(a, b), &cost)| (a, b, cost)).collect();
        edges.sort_unstable_by_key(|&(a, b, _)| (a, b));
        edges.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EdgeCosts {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let edges: Vec<(usize, usize, Meter)> = Vec::deserialize(deserializer)?;
        let mut costs = Self::default();
        for (a, b, cost) in edges {
            costs.insert(a, b, cost);
        }
        Ok(costs)
    }
}

/// A world's vertices viewed as a search graph. Only land vertices are
/// traversable. Stepping along an edge costs its great-circle length plus
/// its terrain roughness scaled by `terrain_weight`; the heuristic is the
/// great-circle distance alone, which never overestimates because
/// roughness is never negative.
#[derive(Copy, Clone, Debug)]
pub struct TerrainGraph<'a> {
    pub vertices: &'a [Vertex],
    pub adjacency: &'a Adjacency,
    pub edge_costs: &'a EdgeCosts,
    pub radius: Meter,
    pub terrain_weight: f64,
}

impl<'a> TerrainGraph<'a> {
    /// Great-circle distance between two vertices
    pub fn distance(&self, a: usize, b: usize) -> Meter {
        self.vertices[a]
            .position()
            .distance_to(&self.vertices[b].position(), self.radius)
    }
}

impl<'a> SearchGraph for TerrainGraph<'a> {
    type Neighbors<'b> = Neighbors<'b> where Self: 'b;

    fn node_count(&self) -> usize {
        self.vertices.len()
    }

    fn neighbors(&self, id: usize) -> Self::Neighbors<'_> {
        self.adjacency.neighbors(id)
    }

    fn cost(&self, a: usize, b: usize) -> f64 {
        // Edges touching water have no roughness, they're only ever walked
        // out of a water source onto land
        let roughness = self.edge_costs.get(a, b).unwrap_or_default();
        (self.distance(a, b) + roughness * self.terrain_weight).0
    }

    fn heuristic(&self, id: usize, target: usize) -> f64 {
        self.distance(id, target).0
    }

    fn is_traversable(&self, id: usize) -> bool {
        self.vertices[id].is_land()
    }
}
