use crate::{geo::Coordinates, mesh::GeodesicMesh};
#[cfg(feature = "bin")]
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// One polygon in the dual of a geodesic mesh. There's one tile per mesh
/// vertex, sharing its ID. The corners are the centroids of the vertex's
/// triangles, wound counter-clockwise when viewed from outside the sphere.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileGeometry {
    center: Coordinates,
    boundary: Vec<Coordinates>,
    /// `neighbors[i]` is the tile across the edge from `boundary[i]` to
    /// `boundary[i + 1]`
    neighbors: Vec<usize>,
}

impl TileGeometry {
    /// Center of the tile, which is also the position of its mesh vertex
    pub fn center(&self) -> Coordinates {
        self.center
    }

    /// Corners of the polygon, in counter-clockwise order
    pub fn boundary(&self) -> &[Coordinates] {
        &self.boundary
    }

    /// Adjacent tiles, parallel to [Self::boundary]
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    /// Is this one of the 12 pentagons?
    pub fn is_pentagon(&self) -> bool {
        self.boundary.len() == 5
    }

    /// Pairs of consecutive corners, wrapping around at the end
    fn edges(&self) -> impl Iterator<Item = (&Coordinates, &Coordinates)> {
        let n = self.boundary.len();
        (0..n).map(move |i| (&self.boundary[i], &self.boundary[(i + 1) % n]))
    }

    /// Does the polygon contain the given point? Points exactly on an edge
    /// count as inside, so they may be contained by two tiles.
    pub fn contains(&self, point: &Coordinates) -> bool {
        self.edges().all(|(a, b)| {
            a.vector().cross(b.vector()).dot(point.vector()) >= -1e-12
        })
    }

    /// Area of the polygon on the unit sphere, in steradians. Multiply by
    /// radius² for a physical area.
    pub fn area(&self) -> f64 {
        self.edges()
            .map(|(a, b)| spherical_excess(&self.center, a, b))
            .sum()
    }

    /// An evenly spaced grid of points covering the polygon, for sampling
    /// terrain across the whole tile. The first point is always the
    /// center. Each triangular sector between the center and one edge gets
    /// `r * (r - 1) / 2` points, for `1 + n * r * (r - 1) / 2` in total.
    /// Points on a sector's shared edge are only generated by one of the two
    /// sectors, so there are no duplicates.
    pub fn grid(&self, resolution: usize) -> Vec<Coordinates> {
        let r = resolution.max(1);
        let n = self.boundary.len();
        let mut points = Vec::with_capacity(1 + n * r * (r - 1) / 2);
        points.push(self.center);
        for (u, v) in self.edges() {
            for k in 1..r {
                for l in 0..k {
                    points.push(Coordinates::linear_combination(&[
                        (l as f64, *u),
                        ((k - l) as f64, *v),
                        ((r - 1 - k) as f64, self.center),
                    ]));
                }
            }
        }
        points
    }
}

/// Area of the spherical triangle `abc` on the unit sphere
fn spherical_excess(a: &Coordinates, b: &Coordinates, c: &Coordinates) -> f64 {
    let (a, b, c) = (a.vector(), b.vector(), c.vector());
    let numerator = a.dot(&b.cross(c)).abs();
    let denominator = 1.0 + a.dot(b) + b.dot(c) + c.dot(a);
    2.0 * numerator.atan2(denominator)
}

/// The dual of a uniformly subdivided geodesic mesh: 12 pentagons at the
/// original icosahedron vertices, and hexagons everywhere else. Depends
/// only on the subdivision level, so one tiling can be shared (and cached)
/// across any number of worlds with the same level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tiling {
    level: u8,
    tiles: Vec<TileGeometry>,
}

impl Tiling {
    /// Build the dual. The mesh must be uniform, see [GeodesicMesh::dual].
    pub(super) fn from_mesh(mesh: &GeodesicMesh) -> Self {
        let level = mesh.leaf_triangles().next().map_or(0, |t| t.level());

        // One corner per leaf triangle
        let mut centroids = vec![None; mesh.triangle_count()];
        for id in mesh.leaf_triangle_ids() {
            let [a, b, c] = mesh.triangle(id).vertices();
            centroids[id] = Some(Coordinates::linear_combination(&[
                (1.0, mesh.position(a)),
                (1.0, mesh.position(b)),
                (1.0, mesh.position(c)),
            ]));
        }
        let centroid = |id: usize| match centroids[id] {
            Some(centroid) => centroid,
            None => unreachable!("triangle {} is not a leaf", id),
        };

        let tiles = (0..mesh.vertex_count())
            .map(|vertex| {
                let center = mesh.position(vertex);
                let incident = mesh.incident_triangles(vertex);
                let n = incident.len();
                assert!(
                    n == 5 || n == 6,
                    "vertex {} has {} triangles, expected 5 or 6",
                    vertex,
                    n
                );

                // Sort triangles by angle around the vertex normal, measured
                // from an arbitrary first corner
                let reference = centroid(incident[0]);
                let mut ring: Vec<(f64, usize)> = incident
                    .iter()
                    .map(|&t| {
                        (reference.angle_around(&centroid(t), &center), t)
                    })
                    .collect();
                ring.sort_by(|a, b| a.0.total_cmp(&b.0));

                // Consecutive triangles share an edge out from the center,
                // and the far end of that edge is the neighbor tile
                let neighbors = (0..n)
                    .map(|i| {
                        let next = mesh.triangle(ring[(i + 1) % n].1).vertices();
                        mesh.triangle(ring[i].1)
                            .vertices()
                            .iter()
                            .copied()
                            .find(|&v| v != vertex && next.contains(&v))
                            .unwrap_or_else(|| {
                                panic!(
                                    "tile {} has non-adjacent corners {} and {}",
                                    vertex,
                                    i,
                                    (i + 1) % n
                                )
                            })
                    })
                    .collect();

                TileGeometry {
                    center,
                    boundary: ring.iter().map(|&(_, t)| centroid(t)).collect(),
                    neighbors,
                }
            })
            .collect();

        Self { level, tiles }
    }

    /// Subdivision level of the mesh this was built from
    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Get a tile by ID. Panics if out of range.
    pub fn tile(&self, id: usize) -> &TileGeometry {
        &self.tiles[id]
    }

    pub fn tiles(&self) -> &[TileGeometry] {
        &self.tiles
    }

    /// Find the tile containing a point. Walks greedily from tile 0 toward
    /// the point, always stepping to the neighbor whose center is closest,
    /// then settles on whichever of the final tile and its neighbors
    /// actually contains the point.
    pub fn locate(&self, point: &Coordinates) -> usize {
        let mut current = 0;
        let mut best = self.tiles[current].center.angle_to(point);
        loop {
            let closer = self.tiles[current]
                .neighbors
                .iter()
                .map(|&id| (id, self.tiles[id].center.angle_to(point)))
                .min_by(|a, b| a.1.total_cmp(&b.1));
            match closer {
                Some((id, distance)) if distance < best => {
                    current = id;
                    best = distance;
                }
                _ => break,
            }
        }

        if self.tiles[current].contains(point) {
            return current;
        }
        self.tiles[current]
            .neighbors
            .iter()
            .copied()
            .find(|&id| self.tiles[id].contains(point))
            .unwrap_or(current)
    }

    /// Deserialize a tiling from binary. See [Tiling::to_bin].
    #[cfg(feature = "bin")]
    pub fn from_bin(read: impl std::io::Read) -> anyhow::Result<Self> {
        serde_cbor::from_reader(read).context("error deserializing tiling")
    }

    /// Serialize this tiling into binary (CBOR), so it can be reused for
    /// other worlds at the same level without rebuilding the mesh
    #[cfg(feature = "bin")]
    pub fn to_bin(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        // Panic here indicates an internal bug in the data format
        serde_cbor::to_writer(&mut buffer, self)
            .expect("error serializing tiling");
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::PI;

    fn tiling(level: u8) -> Tiling {
        GeodesicMesh::new(level).unwrap().dual().unwrap()
    }

    #[test]
    fn test_tile_sizes() {
        for level in 0..=3 {
            let tiling = tiling(level);
            assert_eq!(tiling.level(), level);
            let pentagons =
                tiling.tiles().iter().filter(|t| t.is_pentagon()).count();
            assert_eq!(pentagons, 12);
            for (id, tile) in tiling.tiles().iter().enumerate() {
                let expected = if id < 12 { 5 } else { 6 };
                assert_eq!(tile.boundary().len(), expected);
                assert_eq!(tile.neighbors().len(), tile.boundary().len());
            }
        }
    }

    #[test]
    fn test_neighbors_symmetric() {
        let tiling = tiling(2);
        for (id, tile) in tiling.tiles().iter().enumerate() {
            for &neighbor in tile.neighbors() {
                assert!(
                    tiling.tile(neighbor).neighbors().contains(&id),
                    "{} -> {} is one-way",
                    id,
                    neighbor
                );
            }
        }
    }

    #[test]
    fn test_winding_and_area() {
        let tiling = tiling(2);
        let total: f64 = tiling.tiles().iter().map(TileGeometry::area).sum();
        assert_approx_eq!(total, 4.0 * PI, 1e-9);
        for tile in tiling.tiles() {
            assert!(tile.contains(&tile.center()));
        }
    }

    #[test]
    fn test_grid() {
        let tiling = tiling(1);
        let hexagon = tiling.tile(20);
        let pentagon = tiling.tile(0);
        assert_eq!(hexagon.grid(1).len(), 1);
        assert_eq!(hexagon.grid(4).len(), 1 + 6 * 4 * 3 / 2);
        assert_eq!(pentagon.grid(4).len(), 1 + 5 * 4 * 3 / 2);
        let grid = hexagon.grid(3);
        assert_eq!(grid[0], hexagon.center());
        for point in &grid {
            assert!(hexagon.contains(point));
        }
    }

    #[test]
    fn test_locate() {
        let tiling = tiling(3);
        for (id, tile) in tiling.tiles().iter().enumerate() {
            assert_eq!(tiling.locate(&tile.center()), id);
        }
        let point = Coordinates::new(0.3, -0.7, 0.2);
        let id = tiling.locate(&point);
        assert!(tiling.tile(id).contains(&point));
    }

    #[cfg(feature = "bin")]
    #[test]
    fn test_bin_round_trip() {
        let tiling = tiling(2);
        let bytes = tiling.to_bin();
        assert_eq!(Tiling::from_bin(bytes.as_slice()).unwrap(), tiling);
        assert!(Tiling::from_bin(&bytes[..bytes.len() / 2]).is_err());
    }
}
