//! Dijkstra search with seed offsets, custom costs, a distance cap and an
//! optional target.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::mesh::{HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

use super::GeodesicResult;

/// Options for the Dijkstra searches.
#[derive(Debug, Clone, Default)]
pub struct DijkstraOptions {
    /// Keep the shortest-path tree so [`GeodesicResult::path_to`] works.
    pub store_predecessors: bool,
    /// Vertices farther than this are not expanded.
    pub max_distance: Option<f64>,
    /// Stop as soon as this vertex index is settled.
    pub target: Option<usize>,
}

impl DijkstraOptions {
    /// Set whether the shortest-path tree is kept.
    pub fn with_predecessors(mut self, store: bool) -> Self {
        self.store_predecessors = store;
        self
    }

    /// Cap the search distance.
    pub fn with_max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    /// Stop once vertex index `target` is settled.
    pub fn with_target(mut self, target: usize) -> Self {
        self.target = Some(target);
        self
    }
}

/// Min-heap entry.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    vertex: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Edge-length distances from the nearest of `sources`.
pub fn dijkstra_multiple<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    sources: &[VertexId<I>],
    options: &DijkstraOptions,
) -> GeodesicResult<I> {
    let seeds: Vec<(VertexId<I>, f64)> = sources.iter().map(|&v| (v, 0.0)).collect();
    dijkstra_weighted(mesh, &seeds, options, |he| mesh.halfedge_length(he))
}

/// Dijkstra with seed offsets and a custom edge weight.
///
/// Each seed starts at its own initial distance. `weight` is called with the
/// half-edge being relaxed; negative costs count as zero and non-finite
/// costs block the half-edge.
///
/// # Example
///
/// ```
/// use morsel_uv::prelude::*;
/// use morsel_uv::algo::geodesic::{dijkstra_weighted, DijkstraOptions};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
///
/// // Every edge costs 1 regardless of its length.
/// let result = dijkstra_weighted(
///     &mesh,
///     &[(VertexId::new(0), 0.0)],
///     &DijkstraOptions::default(),
///     |_| 1.0,
/// );
/// assert_eq!(result.distance(VertexId::new(2)), 1.0);
/// ```
pub fn dijkstra_weighted<I, F>(
    mesh: &HalfEdgeMesh<I>,
    seeds: &[(VertexId<I>, f64)],
    options: &DijkstraOptions,
    weight: F,
) -> GeodesicResult<I>
where
    I: MeshIndex,
    F: Fn(HalfEdgeId<I>) -> f64,
{
    let n = mesh.num_vertices();
    let mut distances = vec![f64::INFINITY; n];
    let mut parents = options.store_predecessors.then(|| vec![None; n]);
    let mut heap = BinaryHeap::new();

    for &(seed, offset) in seeds {
        let i = seed.index();
        if i < n && offset < distances[i] {
            distances[i] = offset;
            heap.push(Candidate { distance: offset, vertex: i });
        }
    }

    let cap = options.max_distance.unwrap_or(f64::INFINITY);
    while let Some(Candidate { distance, vertex }) = heap.pop() {
        if distance > distances[vertex] {
            continue;
        }
        if options.target == Some(vertex) {
            break;
        }
        if distance > cap {
            continue;
        }

        for he in mesh.vertex_halfedges(VertexId::<I>::new(vertex)) {
            let cost = weight(he);
            if !cost.is_finite() {
                continue;
            }
            let next = mesh.dest(he).index();
            let candidate = distance + cost.max(0.0);
            if candidate < distances[next] {
                distances[next] = candidate;
                if let Some(parents) = parents.as_mut() {
                    parents[next] = Some(vertex);
                }
                heap.push(Candidate { distance: candidate, vertex: next });
            }
        }
    }

    GeodesicResult::new(distances, parents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::grid_mesh;

    fn from_corner(n: usize, options: &DijkstraOptions) -> GeodesicResult {
        dijkstra_multiple(&grid_mesh(n), &[VertexId::new(0)], options)
    }

    #[test]
    fn test_grid_distances_follow_diagonals() {
        let result = from_corner(2, &DijkstraOptions::default());
        assert_eq!(result.distance(VertexId::new(0)), 0.0);
        assert!((result.distance(VertexId::new(1)) - 0.5).abs() < 1e-12);
        assert!((result.distance(VertexId::new(8)) - 2.0_f64.sqrt()).abs() < 1e-12);

        let (far, d) = result.farthest_vertex().unwrap();
        assert_eq!(far, VertexId::new(8));
        assert!((d - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_max_distance_stops_expansion() {
        let result = from_corner(3, &DijkstraOptions::default().with_max_distance(0.5));
        assert!(result.is_reachable(VertexId::new(1)));
        assert!(result.is_reachable(VertexId::new(4)));
        assert!(!result.is_reachable(VertexId::new(15)));
    }

    #[test]
    fn test_path_to_target_runs_source_first() {
        let options = DijkstraOptions::default().with_predecessors(true).with_target(3);
        let result = from_corner(3, &options);
        let path = result.path_to(VertexId::new(3)).unwrap();
        assert_eq!(path, (0..4).map(VertexId::new).collect::<Vec<_>>());
        assert_eq!(result.path_to(VertexId::new(0)), Some(vec![VertexId::new(0)]));

        let without_tree = from_corner(3, &DijkstraOptions::default());
        assert!(without_tree.path_to(VertexId::new(3)).is_none());
    }

    #[test]
    fn test_multiple_sources_and_no_sources() {
        let mesh = grid_mesh(2);
        let both = dijkstra_multiple(&mesh, &[VertexId::new(0), VertexId::new(8)], &DijkstraOptions::default());
        assert_eq!(both.distance(VertexId::new(8)), 0.0);
        assert!((both.distance(VertexId::new(4)) - 0.5 * 2.0_f64.sqrt()).abs() < 1e-12);

        let none = dijkstra_multiple(&mesh, &[], &DijkstraOptions::default());
        assert!(mesh.vertex_ids().all(|v| !none.is_reachable(v)));
        assert!(none.farthest_vertex().is_none());
    }

    #[test]
    fn test_weighted_seeds_and_blocked_edges() {
        let mesh = grid_mesh(2);
        let seeds = [(VertexId::new(0), 0.0), (VertexId::new(2), 0.25)];
        let center = VertexId::new(4);
        let result = dijkstra_weighted(&mesh, &seeds, &DijkstraOptions::default(), |he| {
            if mesh.origin(he) == center || mesh.dest(he) == center {
                f64::INFINITY
            } else {
                mesh.halfedge_length(he)
            }
        });
        assert!(!result.is_reachable(center));
        assert!((result.distance(VertexId::new(2)) - 0.25).abs() < 1e-12);
        assert!((result.distance(VertexId::new(1)) - 0.5).abs() < 1e-12);
    }
}
