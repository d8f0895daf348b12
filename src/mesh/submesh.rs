//! Isolated, re-indexed copies of a face subset.

use std::collections::HashMap;

use super::builder::build_from_triangles;
use super::halfedge::HalfEdgeMesh;
use super::index::{ElementId, FaceId, MeshIndex, VertexId};
use super::overlay::UvOverlay;
use crate::error::{MeshError, Result};

/// A standalone mesh built from some faces of a base mesh.
///
/// Submesh vertex `i` comes from `base_vertices[i]`; submesh face `j` comes
/// from `base_faces[j]`. When the submesh was built from UV topology, each
/// submesh vertex also corresponds to one overlay element, so UV seams of the
/// base become boundaries of the submesh.
#[derive(Debug, Clone)]
pub struct Submesh<I: MeshIndex = u32> {
    /// The extracted mesh.
    pub mesh: HalfEdgeMesh<I>,
    /// Base vertex of each submesh vertex.
    pub base_vertices: Vec<VertexId<I>>,
    /// Base face of each submesh face.
    pub base_faces: Vec<FaceId<I>>,
    /// Overlay element of each submesh vertex, for submeshes built from UVs.
    pub base_elements: Option<Vec<ElementId<I>>>,
}

impl<I: MeshIndex> Submesh<I> {
    /// Extract `faces` with one submesh vertex per distinct base vertex.
    pub fn from_faces(base: &HalfEdgeMesh<I>, faces: &[FaceId<I>]) -> Result<Self> {
        if faces.is_empty() {
            return Err(MeshError::EmptySelection);
        }

        let mut vertex_map: HashMap<VertexId<I>, usize> = HashMap::new();
        let mut base_vertices = Vec::new();
        let mut positions = Vec::new();
        let mut triangles = Vec::with_capacity(faces.len());

        for &f in faces {
            let tri = base.face_triangle(f).map(|v| {
                *vertex_map.entry(v).or_insert_with(|| {
                    base_vertices.push(v);
                    positions.push(*base.position(v));
                    base_vertices.len() - 1
                })
            });
            triangles.push(tri);
        }

        Ok(Self {
            mesh: build_from_triangles(&positions, &triangles)?,
            base_vertices,
            base_faces: faces.to_vec(),
            base_elements: None,
        })
    }

    /// Extract the faces of `faces` that have UVs, with one submesh vertex per element.
    pub fn from_overlay(
        base: &HalfEdgeMesh<I>,
        overlay: &UvOverlay<I>,
        faces: &[FaceId<I>],
    ) -> Result<Self> {
        let mut element_map: HashMap<ElementId<I>, usize> = HashMap::new();
        let mut base_vertices = Vec::new();
        let mut base_elements = Vec::new();
        let mut base_faces = Vec::new();
        let mut positions = Vec::new();
        let mut triangles = Vec::new();

        for &f in faces {
            let Some(elements) = overlay.triangle(f) else {
                continue;
            };
            let tri = elements.map(|e| {
                *element_map.entry(e).or_insert_with(|| {
                    let v = overlay.parent_vertex(e);
                    base_vertices.push(v);
                    base_elements.push(e);
                    positions.push(*base.position(v));
                    base_elements.len() - 1
                })
            });
            triangles.push(tri);
            base_faces.push(f);
        }

        if triangles.is_empty() {
            return Err(MeshError::EmptySelection);
        }

        Ok(Self {
            mesh: build_from_triangles(&positions, &triangles)?,
            base_vertices,
            base_faces,
            base_elements: Some(base_elements),
        })
    }

    /// Base vertex of a submesh vertex.
    #[inline]
    pub fn base_vertex(&self, v: VertexId<I>) -> VertexId<I> {
        self.base_vertices[v.index()]
    }

    /// Base face of a submesh face.
    #[inline]
    pub fn base_face(&self, f: FaceId<I>) -> FaceId<I> {
        self.base_faces[f.index()]
    }

    /// The boundary loop with the most vertices, if any.
    pub fn longest_boundary_loop(&self) -> Option<Vec<VertexId<I>>> {
        self.mesh
            .boundary_loops()
            .into_iter()
            .max_by_key(|l| l.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::grid_mesh;
    use nalgebra::Point2;

    #[test]
    fn test_from_faces_reindexes() {
        let mesh = grid_mesh(3);
        let faces: Vec<FaceId> = (0..4).map(FaceId::new).collect();
        let sub = Submesh::from_faces(&mesh, &faces).unwrap();
        assert_eq!(sub.mesh.num_faces(), 4);
        for f in sub.mesh.face_ids() {
            let base_tri = mesh.face_triangle(sub.base_face(f));
            let tri = sub.mesh.face_triangle(f).map(|v| sub.base_vertex(v));
            assert_eq!(tri, base_tri);
        }
        assert!(sub.longest_boundary_loop().is_some());
    }

    #[test]
    fn test_from_overlay_follows_elements() {
        let mesh = grid_mesh(1);
        let mut overlay = UvOverlay::new(mesh.num_faces());
        // Two faces with independent elements: the diagonal becomes a boundary.
        for f in mesh.face_ids() {
            let tri = mesh
                .face_triangle(f)
                .map(|v| overlay.append_element(Point2::origin(), v));
            overlay.set_triangle(&mesh, f, tri);
        }
        let faces: Vec<FaceId> = mesh.face_ids().collect();
        let sub = Submesh::from_overlay(&mesh, &overlay, &faces).unwrap();
        assert_eq!(sub.mesh.num_vertices(), 6);
        assert_eq!(sub.mesh.boundary_loops().len(), 2);
        assert_eq!(sub.base_elements.as_ref().map(|e| e.len()), Some(6));
    }

    #[test]
    fn test_empty_selection() {
        let mesh = grid_mesh(1);
        let overlay = UvOverlay::new(mesh.num_faces());
        let faces: Vec<FaceId> = mesh.face_ids().collect();
        assert!(matches!(
            Submesh::from_overlay(&mesh, &overlay, &faces),
            Err(MeshError::EmptySelection)
        ));
        assert!(matches!(
            Submesh::from_faces(&mesh, &[]),
            Err(MeshError::EmptySelection)
        ));
    }
}
