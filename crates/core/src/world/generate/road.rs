use crate::{
    path::ShortestPaths,
    world::{
        generate::{Generate, WorldBuilder},
        Road,
    },
};
use fnv::{FnvBuildHasher, FnvHashSet};
use indexmap::{IndexMap, IndexSet};
use log::debug;

type VertexIndexSet = IndexSet<usize, FnvBuildHasher>;
type VertexIndexMap<T> = IndexMap<usize, T, FnvBuildHasher>;
type VertexPairSet = IndexSet<(usize, usize), FnvBuildHasher>;

/// Connect neighboring cities with roads. Two cities are neighbors if their
/// zones touch somewhere on land. For each such pair we find the cheapest
/// path between them, and keep it only if it stays inside the two cities'
/// zones; a path that cuts through a third city's zone would be better
/// served by two shorter roads through that city.
///
/// The kept paths overlap wherever they share a stretch, so the final step
/// merges them into a road network and splits it at every junction.
#[derive(Debug)]
pub struct RoadGenerator;

impl Generate for RoadGenerator {
    fn generate(&self, world: &mut WorldBuilder) -> anyhow::Result<()> {
        let graph = world.graph()?;
        let vertices = &world.vertices;

        // Every adjacent pair of land vertices in different zones marks a
        // border between those two zones. Stored low-high, in edge order.
        let mut candidate_pairs = VertexPairSet::default();
        for (a, b) in world.adjacency()?.edges() {
            if !(vertices[a].is_land() && vertices[b].is_land()) {
                continue;
            }
            if let (Some(city_a), Some(city_b)) =
                (vertices[a].nearest_city, vertices[b].nearest_city)
            {
                if city_a != city_b {
                    candidate_pairs
                        .insert((city_a.min(city_b), city_a.max(city_b)));
                }
            }
        }

        let mut paths = Vec::new();
        let mut rejected = 0;
        for &(city_a, city_b) in &candidate_pairs {
            let search = ShortestPaths::a_star(&graph, city_a, city_b);
            if !search.is_reached(city_b) {
                rejected += 1;
                continue;
            }
            let path: Vec<usize> = search.path(city_b).collect();
            let in_zones = path.iter().all(|&vertex| {
                matches!(
                    vertices[vertex].nearest_city,
                    Some(city) if city == city_a || city == city_b
                )
            });
            if in_zones {
                paths.push(path);
            } else {
                rejected += 1;
            }
        }
        debug!(
            "{} city pairs share a border: kept {} paths, rejected {}",
            candidate_pairs.len(),
            paths.len(),
            rejected
        );

        let roads = extract_roads(&paths, &world.cities);
        debug!("Merged paths into {} roads", roads.len());
        world.roads = roads;
        Ok(())
    }
}

/// Merge overlapping paths into a set of roads. Every edge used by any path
/// ends up in exactly one road. Roads end at cities and at any vertex where
/// the network doesn't simply continue in a line (a dead end or a junction
/// of three or more segments), so every vertex inside a road has exactly
/// two neighbors in the network.
///
/// Panics if a road would visit the same vertex twice. That only happens
/// if the paths form a loop with no city or junction on it, which shortest
/// paths between cities never do.
fn extract_roads(paths: &[Vec<usize>], cities: &[usize]) -> Vec<Road> {
    let mut segments: VertexIndexMap<VertexIndexSet> =
        VertexIndexMap::default();
    for path in paths {
        for pair in path.windows(2) {
            segments.entry(pair[0]).or_default().insert(pair[1]);
            segments.entry(pair[1]).or_default().insert(pair[0]);
        }
    }

    let cities: FnvHashSet<usize> = cities.iter().copied().collect();
    let is_endpoint = |vertex: usize| {
        cities.contains(&vertex) || segments[&vertex].len() != 2
    };
    let edge_key = |a: usize, b: usize| (a.min(b), a.max(b));

    let mut roads = Vec::new();
    let mut used: FnvHashSet<(usize, usize)> = FnvHashSet::default();
    for (&start, neighbors) in &segments {
        if !is_endpoint(start) {
            continue;
        }
        for &first in neighbors {
            if used.contains(&edge_key(start, first)) {
                continue;
            }

            let mut road = vec![start];
            let mut seen: FnvHashSet<usize> = FnvHashSet::default();
            seen.insert(start);
            let (mut previous, mut current) = (start, first);
            loop {
                used.insert(edge_key(previous, current));
                assert!(
                    seen.insert(current),
                    "road visits vertex {} twice",
                    current
                );
                road.push(current);
                if is_endpoint(current) {
                    break;
                }
                // Not an endpoint, so there's exactly one way onward
                let next = segments[&current]
                    .iter()
                    .copied()
                    .find(|&neighbor| neighbor != previous);
                match next {
                    Some(next) => {
                        previous = current;
                        current = next;
                    }
                    None => break,
                }
            }
            roads.push(Road { vertices: road });
        }
    }
    roads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road_vertices(roads: &[Road]) -> Vec<Vec<usize>> {
        roads.iter().map(|road| road.vertices().to_vec()).collect()
    }

    #[test]
    fn test_single_path() {
        let roads = extract_roads(&[vec![0, 1, 2, 3, 4]], &[0, 4]);
        assert_eq!(road_vertices(&roads), vec![vec![0, 1, 2, 3, 4]]);
    }

    #[test]
    fn test_overlapping_paths() {
        // Both paths run through 1-2 (the second one backwards), then split
        let paths = [vec![0, 1, 2, 3, 4], vec![6, 5, 2, 1, 0]];
        let roads = extract_roads(&paths, &[0, 4, 6]);
        assert_eq!(
            road_vertices(&roads),
            vec![vec![0, 1, 2], vec![2, 3, 4], vec![2, 5, 6]]
        );
    }

    #[test]
    fn test_split_at_city() {
        let roads = extract_roads(&[vec![0, 1, 2], vec![2, 3, 4]], &[0, 2, 4]);
        assert_eq!(road_vertices(&roads), vec![vec![0, 1, 2], vec![2, 3, 4]]);
    }

    #[test]
    fn test_adjacent_cities() {
        let roads = extract_roads(&[vec![7, 3]], &[3, 7]);
        assert_eq!(road_vertices(&roads), vec![vec![7, 3]]);
        assert_eq!(roads[0].endpoints(), (7, 3));
    }

    #[test]
    fn test_no_paths() {
        assert!(extract_roads(&[], &[1, 2]).is_empty());
    }
}
