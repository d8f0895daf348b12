//! Mesh construction utilities.
//!
//! This module provides functions for building half-edge meshes from
//! face-vertex lists as commonly found in mesh file formats.

use std::collections::HashMap;

use nalgebra::Point3;

use super::halfedge::{Face, HalfEdge, HalfEdgeMesh};
use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// Build a half-edge mesh from vertices and triangle faces.
///
/// Face half-edges get ids `3f`, `3f + 1`, `3f + 2`; boundary half-edges are
/// appended after them. Edge ids follow the order in which face half-edges
/// first touch an edge.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of triangle faces, each as [v0, v1, v2] indices
///
/// # Returns
/// A half-edge mesh, or an error if the input is invalid.
///
/// # Example
/// ```
/// use morsel_uv::mesh::{build_from_triangles, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// assert_eq!(mesh.num_edges(), 3);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh<I>> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    let mut mesh = HalfEdgeMesh::with_capacity(vertices.len(), faces.len());

    let vertex_ids: Vec<VertexId<I>> = vertices
        .iter()
        .map(|&pos| mesh.add_vertex(pos))
        .collect();

    // Directed edge (v0, v1) -> half-edge
    let mut edge_map: HashMap<(usize, usize), HalfEdgeId<I>> = HashMap::new();
    let mut directed: Vec<(usize, usize)> = Vec::with_capacity(faces.len() * 3);

    // First pass: face half-edges
    for face in faces {
        let base = mesh.num_halfedges();
        let face_id = FaceId::<I>::new(mesh.num_faces());
        mesh.faces.push(Face {
            halfedge: HalfEdgeId::new(base),
        });

        for k in 0..3 {
            let he = HalfEdgeId::<I>::new(base + k);
            mesh.halfedges.push(HalfEdge {
                origin: vertex_ids[face[k]],
                twin: HalfEdgeId::invalid(),
                next: HalfEdgeId::new(base + (k + 1) % 3),
                prev: HalfEdgeId::new(base + (k + 2) % 3),
                face: face_id,
            });
            // Overwritten for shared vertices; fixed up for boundary ones below.
            mesh.vertex_mut(vertex_ids[face[k]]).halfedge = he;

            let key = (face[k], face[(k + 1) % 3]);
            edge_map.insert(key, he);
            directed.push(key);
        }
    }

    // Second pass: twins, in face order so boundary ids are deterministic
    for (i, &(v0, v1)) in directed.iter().enumerate() {
        let he = HalfEdgeId::<I>::new(i);
        if mesh.twin(he).is_valid() {
            continue;
        }
        match edge_map.get(&(v1, v0)) {
            Some(&twin) if !mesh.twin(twin).is_valid() => {
                mesh.halfedge_mut(he).twin = twin;
                mesh.halfedge_mut(twin).twin = he;
            }
            _ => {
                let boundary_he = HalfEdgeId::<I>::new(mesh.num_halfedges());
                mesh.halfedges.push(HalfEdge {
                    origin: vertex_ids[v1],
                    twin: he,
                    ..HalfEdge::new()
                });
                mesh.halfedge_mut(he).twin = boundary_he;
            }
        }
    }

    link_boundary_loops(&mut mesh);
    fix_boundary_vertex_halfedges(&mut mesh);
    build_edge_table(&mut mesh);

    Ok(mesh)
}

/// Link boundary half-edges into loops.
fn link_boundary_loops<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    let boundary_hes: Vec<HalfEdgeId<I>> = mesh
        .halfedge_ids()
        .filter(|&he| mesh.is_boundary_halfedge(he))
        .collect();

    let mut outgoing: HashMap<usize, HalfEdgeId<I>> = HashMap::new();
    for &he in &boundary_hes {
        outgoing.entry(mesh.origin(he).index()).or_insert(he);
    }

    for &he in &boundary_hes {
        let dest = mesh.dest(he).index();
        if let Some(&next_he) = outgoing.get(&dest) {
            mesh.halfedge_mut(he).next = next_he;
            mesh.halfedge_mut(next_he).prev = he;
        }
    }
}

/// Ensure boundary vertices point to a boundary half-edge.
fn fix_boundary_vertex_halfedges<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    for vid in mesh.vertex_ids().collect::<Vec<_>>() {
        let boundary = mesh
            .vertex_halfedges(vid)
            .find(|&he| mesh.is_boundary_halfedge(he));
        if let Some(he) = boundary {
            mesh.vertex_mut(vid).halfedge = he;
        }
    }
}

/// Assign a full edge to every half-edge pair.
fn build_edge_table<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    mesh.halfedge_edges = vec![EdgeId::invalid(); mesh.num_halfedges()];
    mesh.edges.clear();

    // Face half-edges come first, so each edge's canonical half-edge is interior.
    for i in 0..mesh.num_halfedges() {
        if mesh.halfedge_edges[i].is_valid() {
            continue;
        }
        let he = HalfEdgeId::<I>::new(i);
        let edge = EdgeId::<I>::new(mesh.edges.len());
        mesh.edges.push(he);
        mesh.halfedge_edges[i] = edge;
        let twin = mesh.twin(he);
        if twin.is_valid() {
            mesh.halfedge_edges[twin.index()] = edge;
        }
    }
}

/// Convert a half-edge mesh back to a face-vertex representation.
///
/// Returns (vertices, faces) tuple.
pub fn to_face_vertex<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let vertices: Vec<Point3<f64>> = mesh.vertex_ids().map(|v| *mesh.position(v)).collect();

    let faces: Vec<[usize; 3]> = mesh
        .face_ids()
        .map(|f| {
            let [v0, v1, v2] = mesh.face_triangle(f);
            [v0.index(), v1.index(), v2.index()]
        })
        .collect();

    (vertices, faces)
}
