//! Generic shortest-path search over any graph with integer node IDs.
//! [ShortestPaths] covers both multi-source Dijkstra (distance fields and
//! nearest-source partitions) and single-pair A* (roads).

mod queue;

pub use self::queue::{HeapOpenSet, OpenSet, SortedOpenSet};

use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;

/// A graph that can be searched. Node IDs are `0..node_count()`.
pub trait SearchGraph {
    type Neighbors<'a>: Iterator<Item = usize>
    where
        Self: 'a;

    fn node_count(&self) -> usize;

    /// All nodes directly connected to the given one
    fn neighbors(&self, id: usize) -> Self::Neighbors<'_>;

    /// Cost of traversing the edge between two adjacent nodes. Must be
    /// non-negative and symmetric: `cost(a, b) == cost(b, a)`.
    fn cost(&self, a: usize, b: usize) -> f64;

    /// Lower bound on the cost of any path from `id` to `target`. Must be
    /// consistent for A* to return optimal paths, i.e. never greater than
    /// `cost(id, n) + heuristic(n, target)` for any neighbor `n`.
    fn heuristic(&self, id: usize, target: usize) -> f64;

    /// Can a search step onto this node? Untraversable nodes are never
    /// relaxed, though one may still be a search source.
    fn is_traversable(&self, id: usize) -> bool;
}

/// Per-node state of a search. A node whose predecessor is itself is the
/// root of its path, i.e. a source.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    predecessor: Option<usize>,
    #[serde(with = "serde_cost")]
    cost: f64,
    #[serde(with = "serde_cost")]
    estimate: f64,
    visited: bool,
}

impl PathNode {
    const UNREACHED: Self = Self {
        predecessor: None,
        cost: f64::INFINITY,
        estimate: f64::INFINITY,
        visited: false,
    };

    /// The next node along the path back toward the source
    pub fn predecessor(&self) -> Option<usize> {
        self.predecessor
    }

    /// Cost of the best known path from the source. Infinite if no path
    /// has been found yet.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Cost so far plus the heuristic estimate of the remaining cost
    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    /// Has the node been popped from the open set? Only a visited node's
    /// cost is final.
    pub fn visited(&self) -> bool {
        self.visited
    }
}

/// Result of a best-first search: a shortest-path tree rooted at the
/// search's sources.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShortestPaths {
    nodes: Vec<PathNode>,
}

impl ShortestPaths {
    /// Dijkstra from several sources at once. Every reachable node ends up
    /// with its distance to the nearest source, and a predecessor that
    /// leads toward that source.
    pub fn multi_source<G: SearchGraph>(
        graph: &G,
        sources: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self::multi_source_with::<HeapOpenSet, G>(graph, sources)
    }

    /// [Self::multi_source] with a specific open set implementation
    pub fn multi_source_with<Q: OpenSet, G: SearchGraph>(
        graph: &G,
        sources: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self::search::<Q, G>(graph, sources, None)
    }

    /// A* search from `target` toward `origin`. Searching backwards means
    /// the path from `origin` (see [Self::path]) comes out in travel order,
    /// ending at `target`. The search ends as soon as `origin` is popped;
    /// check [Self::is_reached] before using the path.
    pub fn a_star<G: SearchGraph>(graph: &G, target: usize, origin: usize) -> Self {
        Self::a_star_with::<HeapOpenSet, G>(graph, target, origin)
    }

    /// [Self::a_star] with a specific open set implementation
    pub fn a_star_with<Q: OpenSet, G: SearchGraph>(
        graph: &G,
        target: usize,
        origin: usize,
    ) -> Self {
        Self::search::<Q, G>(graph, Some(target), Some(origin))
    }

    fn search<Q: OpenSet, G: SearchGraph>(
        graph: &G,
        sources: impl IntoIterator<Item = usize>,
        goal: Option<usize>,
    ) -> Self {
        let heuristic = |id| goal.map_or(0.0, |goal| graph.heuristic(id, goal));
        let mut nodes = vec![PathNode::UNREACHED; graph.node_count()];
        let mut open = Q::default();

        for source in sources {
            let estimate = heuristic(source);
            nodes[source] = PathNode {
                predecessor: Some(source),
                cost: 0.0,
                estimate,
                visited: false,
            };
            open.push(source, estimate);
        }

        while let Some((id, _)) = open.pop() {
            let node = &mut nodes[id];
            assert!(!node.visited, "node {} was visited twice", id);
            node.visited = true;
            if goal == Some(id) {
                break;
            }

            let base = node.cost;
            for neighbor in graph.neighbors(id) {
                if nodes[neighbor].visited || !graph.is_traversable(neighbor) {
                    continue;
                }
                let cost = base + graph.cost(id, neighbor);
                if cost < nodes[neighbor].cost {
                    let estimate = cost + heuristic(neighbor);
                    nodes[neighbor] = PathNode {
                        predecessor: Some(id),
                        cost,
                        estimate,
                        visited: false,
                    };
                    open.push(neighbor, estimate);
                }
            }
        }

        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the search state of a node. Panics if the ID is out of range.
    pub fn node(&self, id: usize) -> &PathNode {
        &self.nodes[id]
    }

    /// Was the node settled by the search?
    pub fn is_reached(&self, id: usize) -> bool {
        self.nodes[id].visited
    }

    /// Final distance from the nearest source, or infinity if the node was
    /// never settled
    pub fn distance(&self, id: usize) -> f64 {
        let node = &self.nodes[id];
        if node.visited {
            node.cost
        } else {
            f64::INFINITY
        }
    }

    /// The source at the end of a node's path, i.e. the nearest source for
    /// a multi-source search. `None` if the node wasn't reached.
    pub fn root(&self, id: usize) -> Option<usize> {
        if self.is_reached(id) {
            self.path(id).last()
        } else {
            None
        }
    }

    /// Walk the path from a node back to its source, following
    /// predecessors. The first item is `from` and the last is the source.
    /// Yields nothing if the node has no predecessor. Each call starts a
    /// fresh walk, so the same path can be replayed any number of times.
    pub fn path(&self, from: usize) -> PathIter<'_> {
        PathIter {
            nodes: &self.nodes,
            next: self.nodes[from].predecessor.map(|_| from),
            remaining: self.nodes.len(),
        }
    }
}

/// Iterator over a path in a [ShortestPaths] tree. See
/// [ShortestPaths::path].
#[derive(Clone, Debug)]
pub struct PathIter<'a> {
    nodes: &'a [PathNode],
    next: Option<usize>,
    /// A path can't be longer than the node count, so this bounds the walk
    /// even if the tree were somehow corrupt
    remaining: usize,
}

impl<'a> Iterator for PathIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        assert!(self.remaining > 0, "cycle in shortest path tree");
        self.remaining -= 1;
        self.next = match self.nodes[current].predecessor {
            Some(predecessor) if predecessor != current => Some(predecessor),
            _ => None,
        };
        Some(current)
    }
}

impl<'a> FusedIterator for PathIter<'a> {}

/// Infinite costs mark unreached nodes, but JSON has no infinity, so
/// serialize those as null
mod serde_cost {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        cost: &f64,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let value = if cost.is_finite() { Some(*cost) } else { None };
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    /// A `width`x`height` grid with 4-connectivity. Edge costs vary by
    /// position so there's a unique-ish best path; the heuristic is
    /// Manhattan distance times the cheapest possible edge.
    struct Grid {
        width: usize,
        height: usize,
        walls: Vec<usize>,
    }

    impl Grid {
        fn new(width: usize, height: usize) -> Self {
            Self {
                width,
                height,
                walls: Vec::new(),
            }
        }

        fn xy(&self, id: usize) -> (i64, i64) {
            ((id % self.width) as i64, (id / self.width) as i64)
        }
    }

    impl SearchGraph for Grid {
        type Neighbors<'a> = std::vec::IntoIter<usize>;

        fn node_count(&self) -> usize {
            self.width * self.height
        }

        fn neighbors(&self, id: usize) -> Self::Neighbors<'_> {
            let (x, y) = self.xy(id);
            let mut neighbors = Vec::with_capacity(4);
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)].iter() {
                let (nx, ny) = (x + dx, y + dy);
                if nx >= 0
                    && ny >= 0
                    && (nx as usize) < self.width
                    && (ny as usize) < self.height
                {
                    neighbors.push(ny as usize * self.width + nx as usize);
                }
            }
            neighbors.into_iter()
        }

        fn cost(&self, a: usize, b: usize) -> f64 {
            // Symmetric, always >= 1
            1.0 + ((a * 7 + b * 7) % 5) as f64 * 0.5
        }

        fn heuristic(&self, id: usize, target: usize) -> f64 {
            let (x1, y1) = self.xy(id);
            let (x2, y2) = self.xy(target);
            ((x1 - x2).abs() + (y1 - y2).abs()) as f64
        }

        fn is_traversable(&self, id: usize) -> bool {
            !self.walls.contains(&id)
        }
    }

    #[test]
    fn test_dijkstra_tree() {
        let grid = Grid::new(8, 6);
        let paths = ShortestPaths::multi_source(&grid, vec![0, 47]);
        assert_eq!(paths.distance(0), 0.0);
        assert_eq!(paths.distance(47), 0.0);
        assert_eq!(paths.root(0), Some(0));
        for id in 0..grid.node_count() {
            assert!(paths.is_reached(id));
            let node = paths.node(id);
            let predecessor = node.predecessor().unwrap();
            if predecessor != id {
                assert_approx_eq!(
                    paths.distance(id),
                    paths.distance(predecessor) + grid.cost(predecessor, id)
                );
            }
            let root = paths.root(id).unwrap();
            assert!(root == 0 || root == 47);
        }
    }

    #[test]
    fn test_untraversable() {
        let mut grid = Grid::new(5, 1);
        grid.walls = vec![2];
        let paths = ShortestPaths::multi_source(&grid, Some(0));
        assert!(paths.is_reached(1));
        assert!(!paths.is_reached(2));
        assert!(!paths.is_reached(4));
        assert_eq!(paths.distance(4), f64::INFINITY);
        assert_eq!(paths.node(4).predecessor(), None);
        assert_eq!(paths.path(4).count(), 0);
        assert_eq!(paths.root(4), None);

        // An untraversable source is still expanded
        let paths = ShortestPaths::multi_source(&grid, Some(2));
        assert!(paths.is_reached(1) && paths.is_reached(3));
    }

    #[test]
    fn test_a_star_matches_dijkstra() {
        let grid = Grid::new(12, 9);
        let dijkstra = ShortestPaths::multi_source(&grid, Some(5));
        for &origin in &[0, 30, 64, 107] {
            let a_star = ShortestPaths::a_star(&grid, 5, origin);
            assert!(a_star.is_reached(origin));
            assert_approx_eq!(a_star.distance(origin), dijkstra.distance(origin));

            let path: Vec<usize> = a_star.path(origin).collect();
            assert_eq!(path.first(), Some(&origin));
            assert_eq!(path.last(), Some(&5));
            let cost: f64 = path.windows(2).map(|w| grid.cost(w[0], w[1])).sum();
            assert_approx_eq!(cost, dijkstra.distance(origin));
        }
    }

    #[test]
    fn test_open_sets_agree() {
        let grid = Grid::new(10, 10);
        let sorted =
            ShortestPaths::multi_source_with::<SortedOpenSet, _>(&grid, vec![3, 77]);
        let heap =
            ShortestPaths::multi_source_with::<HeapOpenSet, _>(&grid, vec![3, 77]);
        // Ties resolve by ID in both, so the trees are identical
        assert_eq!(sorted, heap);
    }

    #[test]
    fn test_path_replayable() {
        let grid = Grid::new(4, 4);
        let paths = ShortestPaths::multi_source(&grid, Some(0));
        let mut first = paths.path(15);
        first.next();
        first.next();
        let full: Vec<usize> = paths.path(15).collect();
        assert_eq!(full.len(), 7);
        assert_eq!(full.first(), Some(&15));
        assert_eq!(full.last(), Some(&0));
    }
}
