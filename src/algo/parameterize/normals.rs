//! Per-vertex normals with optional Laplacian smoothing.

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::mesh::{HalfEdgeMesh, MeshIndex, VertexId};

/// Area-weighted vertex normals, smoothed for `rounds` iterations.
///
/// Each round replaces every normal with `(1 - alpha) * n + alpha * avg`,
/// where `avg` is the mean of the neighbouring normals, then renormalizes.
/// Isolated vertices keep a zero normal.
pub fn smoothed_vertex_normals<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    rounds: usize,
    alpha: f64,
) -> Vec<Vector3<f64>> {
    let n = mesh.num_vertices();
    let mut normals: Vec<Vector3<f64>> = (0..n)
        .into_par_iter()
        .map(|i| mesh.vertex_normal(VertexId::new(i)))
        .collect();

    let alpha = alpha.clamp(0.0, 1.0);
    if alpha == 0.0 {
        return normals;
    }

    for _ in 0..rounds {
        normals = (0..n)
            .into_par_iter()
            .map(|i| {
                let v = VertexId::new(i);
                let mut sum = Vector3::zeros();
                let mut count = 0usize;
                for nb in mesh.vertex_neighbors(v) {
                    sum += normals[nb.index()];
                    count += 1;
                }
                if count == 0 {
                    return normals[i];
                }
                let blended = normals[i] * (1.0 - alpha) + sum * (alpha / count as f64);
                blended.try_normalize(f64::EPSILON).unwrap_or(normals[i])
            })
            .collect();
    }

    normals
}
