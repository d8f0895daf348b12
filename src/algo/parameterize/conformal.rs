//! Conformal parameterization: natural (pinned least squares) and spectral.
//!
//! Both solvers minimize the least squares conformal energy
//!
//! ```text
//! E(u, v) = Σ_t A_t |∇u - R90 ∇v|²
//! ```
//!
//! over a triangle mesh with boundary. The natural variant fixes the gauge
//! with at least two pinned vertices and leaves the rest of the boundary free.
//! The spectral variant needs no pins: it takes the minimizer under a
//! boundary mass normalization with translations projected out, which is the
//! smallest non-trivial generalized eigenvector of the energy.
//!
//! # References
//!
//! - Lévy, B., Petitjean, S., Ray, N., & Maillot, J. (2002). "Least squares
//!   conformal maps for automatic texture atlas generation." ACM SIGGRAPH.
//! - Mullen, P., Tong, Y., Alliez, P., & Desbrun, M. (2008). "Spectral
//!   conformal parameterization." Computer Graphics Forum.

use nalgebra::{DVector, Point2, Point3};

use crate::error::{MeshError, Result};
use crate::mesh::{to_face_vertex, HalfEdgeMesh, MeshIndex};

use super::sparse::{conjugate_gradient, CsrMatrix, SolverOptions};
use super::uv::UVMap;

/// A vertex whose UV position is fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinnedVertex {
    /// Vertex index.
    pub vertex: usize,
    /// Target U coordinate.
    pub u: f64,
    /// Target V coordinate.
    pub v: f64,
}

impl PinnedVertex {
    /// Create a new pinned vertex.
    pub fn new(vertex: usize, u: f64, v: f64) -> Self {
        Self { vertex, u, v }
    }
}

/// Which conformal solver to run.
#[derive(Debug, Clone)]
pub enum ConformalSolver {
    /// Least squares conformal map with hard position constraints.
    Natural {
        /// Pinned vertices; at least two are required.
        pins: Vec<PinnedVertex>,
    },
    /// Spectral conformal map. Only the boundary vertex indices are used.
    Spectral {
        /// Boundary vertices carrying the normalization mass.
        boundary: Vec<usize>,
        /// Weight boundary vertices by their adjacent boundary edge lengths
        /// instead of equally.
        preserve_irregularity: bool,
    },
}

impl ConformalSolver {
    /// Solve for a UV position per vertex of `mesh`.
    ///
    /// The spectral solution has arbitrary scale and rotation; callers
    /// normally rescale it afterwards.
    pub fn solve<I: MeshIndex>(
        &self,
        mesh: &HalfEdgeMesh<I>,
        options: &SolverOptions,
    ) -> Result<UVMap<I>> {
        let n = mesh.num_vertices();
        if n == 0 || mesh.num_faces() == 0 {
            return Err(MeshError::EmptyMesh);
        }
        let (vertices, faces) = to_face_vertex(mesh);
        let energy = conformal_energy_triplets(&vertices, &faces, n);

        match self {
            ConformalSolver::Natural { pins } => solve_natural(n, energy, pins, options),
            ConformalSolver::Spectral {
                boundary,
                preserve_irregularity,
            } => solve_spectral(
                &vertices,
                n,
                energy,
                boundary,
                *preserve_irregularity,
                options,
            ),
        }
    }
}

/// The pair of vertices in `candidates` with the largest Euclidean distance.
///
/// Returns `None` when no two distinct positions exist.
pub fn farthest_pair(positions: &[Point3<f64>], candidates: &[usize]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for (i, &a) in candidates.iter().enumerate() {
        for &b in &candidates[i + 1..] {
            let d = (positions[b] - positions[a]).norm_squared();
            if d > best.map_or(0.0, |(_, _, bd)| bd) {
                best = Some((a, b, d));
            }
        }
    }
    best.map(|(a, b, _)| (a, b))
}

/// Assemble the conformal energy as a symmetric `2n x 2n` matrix.
///
/// Unknowns are ordered `[u_0..u_n, v_0..v_n]`. Degenerate triangles
/// contribute nothing.
fn conformal_energy_triplets(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
    n: usize,
) -> Vec<(usize, usize, f64)> {
    let mut triplets = Vec::with_capacity(faces.len() * 36);

    for &[i, j, k] in faces {
        let e1 = vertices[j] - vertices[i];
        let e2 = vertices[k] - vertices[i];

        let e1_len = e1.norm();
        let normal = e1.cross(&e2);
        let area = normal.norm() * 0.5;
        if e1_len < 1e-12 || area < 1e-16 {
            continue;
        }

        // Local frame: i at the origin, x along e1.
        let x_axis = e1 / e1_len;
        let y_axis = normal.cross(&e1).normalize();
        let (qjx, qjy) = (e1_len, 0.0);
        let (qkx, qky) = (e2.dot(&x_axis), e2.dot(&y_axis));

        let inv_2a = 1.0 / (2.0 * area);
        let verts = [
            (i, (qjy - qky) * inv_2a, (qkx - qjx) * inv_2a),
            (j, qky * inv_2a, -qkx * inv_2a),
            (k, -qjy * inv_2a, qjx * inv_2a),
        ];

        for &(vi, ax_i, ay_i) in &verts {
            for &(vj, ax_j, ay_j) in &verts {
                let uu = (ax_i * ax_j + ay_i * ay_j) * area;
                let uv = (ay_i * ax_j - ax_i * ay_j) * area;
                triplets.push((vi, vj, uu));
                triplets.push((n + vi, n + vj, uu));
                triplets.push((vi, n + vj, uv));
                triplets.push((n + vi, vj, -uv));
            }
        }
    }

    triplets
}

fn solve_natural<I: MeshIndex>(
    n: usize,
    energy: Vec<(usize, usize, f64)>,
    pins: &[PinnedVertex],
    options: &SolverOptions,
) -> Result<UVMap<I>> {
    let mut fixed: Vec<Option<f64>> = vec![None; 2 * n];
    for pin in pins {
        if pin.vertex >= n {
            return Err(MeshError::invalid_param("pin", pin.vertex, "vertex out of range"));
        }
        fixed[pin.vertex] = Some(pin.u);
        fixed[n + pin.vertex] = Some(pin.v);
    }
    let pinned_count = fixed[..n].iter().filter(|f| f.is_some()).count();
    if pinned_count < 2 {
        return Err(MeshError::invalid_param(
            "pins",
            pinned_count,
            "natural conformal map needs at least two pinned vertices",
        ));
    }

    // Eliminate pinned unknowns.
    let mut free_index = vec![usize::MAX; 2 * n];
    let mut num_free = 0;
    for (idx, f) in fixed.iter().enumerate() {
        if f.is_none() {
            free_index[idx] = num_free;
            num_free += 1;
        }
    }

    let mut x = DVector::zeros(2 * n);
    for (idx, f) in fixed.iter().enumerate() {
        if let Some(value) = f {
            x[idx] = *value;
        }
    }

    if num_free > 0 {
        let mut rhs = DVector::zeros(num_free);
        let mut triplets = Vec::with_capacity(energy.len());
        for (r, c, val) in energy {
            let fr = free_index[r];
            if fr == usize::MAX {
                continue;
            }
            match fixed[c] {
                None => triplets.push((fr, free_index[c], val)),
                Some(value) => rhs[fr] -= val * value,
            }
        }
        let matrix = CsrMatrix::from_triplets(num_free, triplets);
        let solution = conjugate_gradient(&matrix, &rhs, None, options)?;
        for idx in 0..2 * n {
            if free_index[idx] != usize::MAX {
                x[idx] = solution[free_index[idx]];
            }
        }
    }

    Ok(UVMap::new(
        (0..n).map(|i| Point2::new(x[i], x[n + i])).collect(),
    ))
}

fn solve_spectral<I: MeshIndex>(
    vertices: &[Point3<f64>],
    n: usize,
    energy: Vec<(usize, usize, f64)>,
    boundary: &[usize],
    preserve_irregularity: bool,
    options: &SolverOptions,
) -> Result<UVMap<I>> {
    const MAX_INVERSE_ITERATIONS: usize = 100;

    if boundary.len() < 2 {
        return Err(MeshError::NoBoundary);
    }

    // Lumped boundary mass.
    let mut mass = vec![0.0; n];
    for (k, &b) in boundary.iter().enumerate() {
        if b >= n {
            return Err(MeshError::invalid_param("boundary", b, "vertex out of range"));
        }
        mass[b] = if preserve_irregularity {
            let prev = boundary[(k + boundary.len() - 1) % boundary.len()];
            let next = boundary[(k + 1) % boundary.len()];
            0.5 * ((vertices[b] - vertices[prev]).norm() + (vertices[next] - vertices[b]).norm())
        } else {
            1.0
        };
    }
    let total_mass: f64 = mass.iter().sum();
    if total_mass <= f64::EPSILON {
        return Err(MeshError::DegenerateGeometry("boundary has no length"));
    }

    // Small shift makes the energy positive definite for the inner solves.
    let trace: f64 = energy
        .iter()
        .filter(|(r, c, _)| r == c)
        .map(|(_, _, v)| v)
        .sum();
    let shift = 1e-8 * (trace / (2 * n) as f64).max(f64::EPSILON);
    let mut triplets = energy;
    triplets.extend((0..2 * n).map(|i| (i, i, shift)));
    let matrix = CsrMatrix::from_triplets(2 * n, triplets);

    let project = |x: &mut DVector<f64>| -> bool {
        for block in 0..2 {
            let mean: f64 = (0..n).map(|i| mass[i] * x[block * n + i]).sum::<f64>() / total_mass;
            for i in 0..n {
                x[block * n + i] -= mean;
            }
        }
        let norm = (0..n)
            .map(|i| mass[i] * (x[i] * x[i] + x[n + i] * x[n + i]))
            .sum::<f64>()
            .sqrt();
        if norm <= f64::EPSILON || !norm.is_finite() {
            return false;
        }
        *x /= norm;
        true
    };

    // Start from the positions seen along the two longest bounding box axes.
    let (min, max) = vertices
        .iter()
        .fold((vertices[0], vertices[0]), |(lo, hi), p| (lo.inf(p), hi.sup(p)));
    let extent = max - min;
    let mut axes = [0usize, 1, 2];
    axes.sort_by(|&a, &b| extent[b].total_cmp(&extent[a]));
    let mut x = DVector::zeros(2 * n);
    for i in 0..n {
        x[i] = vertices[i][axes[0]];
        x[n + i] = vertices[i][axes[1]];
    }
    if !project(&mut x) {
        return Err(MeshError::DegenerateGeometry("boundary is a single point"));
    }

    for _ in 0..MAX_INVERSE_ITERATIONS {
        let mut bx = DVector::zeros(2 * n);
        for i in 0..n {
            bx[i] = mass[i] * x[i];
            bx[n + i] = mass[i] * x[n + i];
        }
        let mut y = conjugate_gradient(&matrix, &bx, Some(&x), options)?;
        if !project(&mut y) {
            return Err(MeshError::DegenerateGeometry("spectral iteration collapsed"));
        }
        let change = (&y - &x).norm();
        x = y;
        if change < 1e-9 {
            break;
        }
    }

    Ok(UVMap::new(
        (0..n).map(|i| Point2::new(x[i], x[n + i])).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{HalfEdgeMesh, VertexId};
    use crate::test_meshes::{bump_mesh, grid_mesh};

    /// Check that `uv` is a similarity transform of the xy coordinates.
    fn assert_similar(mesh: &HalfEdgeMesh, uv: &UVMap) {
        let ids: Vec<VertexId> = mesh.vertex_ids().collect();
        let a = ids[0];
        let b = *ids.last().unwrap();
        let scale = (uv.get(b) - uv.get(a)).norm() / (mesh.position(b) - mesh.position(a)).norm();
        assert!(scale > 1e-6);
        for &p in &ids {
            for &q in &ids {
                let d3 = (mesh.position(q) - mesh.position(p)).norm();
                let d2 = (uv.get(q) - uv.get(p)).norm();
                assert!((d2 - scale * d3).abs() < 1e-5 * scale.max(1.0), "{} vs {}", d2, scale * d3);
            }
        }
    }

    #[test]
    fn test_natural_reproduces_planar_grid() {
        let mesh = grid_mesh(4);
        let solver = ConformalSolver::Natural {
            pins: vec![PinnedVertex::new(0, 0.0, 0.5), PinnedVertex::new(24, 1.0, 0.5)],
        };
        let uv = solver.solve(&mesh, &SolverOptions::default()).unwrap();
        assert_similar(&mesh, &uv);
        assert!((uv.get(VertexId::new(0)) - Point2::new(0.0, 0.5)).norm() < 1e-12);
        assert!((uv.get(VertexId::new(24)) - Point2::new(1.0, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn test_natural_needs_two_pins() {
        let mesh = grid_mesh(2);
        let solver = ConformalSolver::Natural {
            pins: vec![PinnedVertex::new(0, 0.0, 0.0)],
        };
        assert!(matches!(
            solver.solve(&mesh, &SolverOptions::default()),
            Err(MeshError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_spectral_reproduces_planar_grid() {
        let mesh = grid_mesh(4);
        let boundary: Vec<usize> = mesh.boundary_loops()[0].iter().map(|v| v.index()).collect();
        for preserve_irregularity in [false, true] {
            let solver = ConformalSolver::Spectral {
                boundary: boundary.clone(),
                preserve_irregularity,
            };
            let uv = solver.solve(&mesh, &SolverOptions::default()).unwrap();
            assert_similar(&mesh, &uv);
        }
    }

    #[test]
    fn test_bump_is_orientation_preserving() {
        let mesh = bump_mesh(6);
        let (a, b) = farthest_pair(
            &crate::mesh::to_face_vertex(&mesh).0,
            &mesh.boundary_loops()[0].iter().map(|v| v.index()).collect::<Vec<_>>(),
        )
        .unwrap();
        let solver = ConformalSolver::Natural {
            pins: vec![PinnedVertex::new(a, 0.0, 0.5), PinnedVertex::new(b, 1.0, 0.5)],
        };
        let uv = solver.solve(&mesh, &SolverOptions::default()).unwrap();
        for f in mesh.face_ids() {
            let [p0, p1, p2] = mesh.face_triangle(f).map(|v| uv.get(v));
            assert!((p1 - p0).perp(&(p2 - p0)) > 0.0);
        }
    }

    #[test]
    fn test_farthest_pair() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ];
        assert_eq!(farthest_pair(&pts, &[0, 1, 2]), Some((0, 2)));
        assert_eq!(farthest_pair(&pts, &[1]), None);
        assert_eq!(farthest_pair(&[pts[0], pts[0]], &[0, 1]), None);
    }
}
