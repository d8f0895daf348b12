//! Shortest paths over the edge graph of a mesh.
//!
//! The UV code uses these searches in two places: the exponential map unwrap
//! seeds a distance field from the boundary of a face set to find its
//! geodesic center, and UV transfer traces destination edge paths between
//! the images of a source seam edge.
//!
//! - [`dijkstra_multiple`]: edge-length distances from a set of sources
//! - [`dijkstra_weighted`]: seeds with initial offsets and a caller-supplied
//!   half-edge cost

mod dijkstra;

use std::marker::PhantomData;

pub use dijkstra::{dijkstra_multiple, dijkstra_weighted, DijkstraOptions};

use crate::mesh::{MeshIndex, VertexId};

/// Distances, and optionally a shortest-path tree, from a Dijkstra search.
///
/// Unreached vertices have an infinite distance. A search stopped early by
/// a target or a distance cap leaves the vertices it never settled with
/// whatever tentative distance they had.
#[derive(Debug, Clone)]
pub struct GeodesicResult<I: MeshIndex = u32> {
    distances: Vec<f64>,
    parents: Option<Vec<Option<usize>>>,
    _marker: PhantomData<I>,
}

impl<I: MeshIndex> GeodesicResult<I> {
    pub(crate) fn new(distances: Vec<f64>, parents: Option<Vec<Option<usize>>>) -> Self {
        Self {
            distances,
            parents,
            _marker: PhantomData,
        }
    }

    /// Distance to `v`, infinite when unreached.
    #[inline]
    pub fn distance(&self, v: VertexId<I>) -> f64 {
        self.distances[v.index()]
    }

    /// Check whether the search reached `v`.
    #[inline]
    pub fn is_reachable(&self, v: VertexId<I>) -> bool {
        self.distances[v.index()].is_finite()
    }

    /// The reached vertex with the largest distance.
    pub fn farthest_vertex(&self) -> Option<(VertexId<I>, f64)> {
        self.distances
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, &d)| (VertexId::new(i), d))
    }

    /// Vertices on the shortest path to `target`, starting at its source and
    /// ending at `target`.
    ///
    /// `None` when the search kept no parents or never reached `target`.
    pub fn path_to(&self, target: VertexId<I>) -> Option<Vec<VertexId<I>>> {
        let parents = self.parents.as_ref()?;
        if !self.is_reachable(target) {
            return None;
        }

        let mut path = vec![target];
        let mut at = target.index();
        while let Some(parent) = parents[at] {
            if path.len() > parents.len() {
                return None;
            }
            path.push(VertexId::new(parent));
            at = parent;
        }
        path.reverse();
        Some(path)
    }
}
