//! UV overlay: a pool of 2D elements attached to the faces of a mesh.
//!
//! An overlay stores, per face, an optional triple of [`ElementId`]s. Each
//! element carries a UV value and exactly one parent vertex. When two faces
//! that share an edge reference the same elements at the edge's endpoints the
//! edge is smooth in UV space; when they reference different elements the
//! edge is a *seam*.
//!
//! Elements are reference counted by the faces that use them. An element whose
//! last face reference goes away is freed; freshly appended elements live until
//! they are first used and then released. Freed ids are not reused until
//! [`UvOverlay::clear_elements`] starts over.

use nalgebra::Point2;

use super::halfedge::HalfEdgeMesh;
use super::index::{EdgeId, ElementId, FaceId, MeshIndex, VertexId};
use super::topology::UnionFind;

/// Per-face UV elements for one UV layer of a mesh.
#[derive(Debug, Clone)]
pub struct UvOverlay<I: MeshIndex = u32> {
    values: Vec<Point2<f64>>,
    parents: Vec<VertexId<I>>,
    alive: Vec<bool>,
    ref_counts: Vec<u32>,
    triangles: Vec<Option<[ElementId<I>; 3]>>,
}

impl<I: MeshIndex> UvOverlay<I> {
    /// Create an overlay for a mesh with `num_faces` faces, all unset.
    pub fn new(num_faces: usize) -> Self {
        Self {
            values: Vec::new(),
            parents: Vec::new(),
            alive: Vec::new(),
            ref_counts: Vec::new(),
            triangles: vec![None; num_faces],
        }
    }

    /// Number of faces this overlay covers.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.triangles.len()
    }

    // ==================== Elements ====================

    /// Append a new element and return its id.
    pub fn append_element(&mut self, uv: Point2<f64>, parent: VertexId<I>) -> ElementId<I> {
        let id = ElementId::new(self.values.len());
        self.values.push(uv);
        self.parents.push(parent);
        self.alive.push(true);
        self.ref_counts.push(0);
        id
    }

    /// Check whether `e` names a live element.
    #[inline]
    pub fn is_element(&self, e: ElementId<I>) -> bool {
        e.is_valid() && e.index() < self.alive.len() && self.alive[e.index()]
    }

    /// UV value of an element.
    #[inline]
    pub fn uv(&self, e: ElementId<I>) -> Point2<f64> {
        self.values[e.index()]
    }

    /// Overwrite the UV value of an element.
    #[inline]
    pub fn set_uv(&mut self, e: ElementId<I>, uv: Point2<f64>) {
        self.values[e.index()] = uv;
    }

    /// Parent vertex of an element.
    #[inline]
    pub fn parent_vertex(&self, e: ElementId<I>) -> VertexId<I> {
        self.parents[e.index()]
    }

    /// Number of faces referencing an element.
    #[inline]
    pub fn ref_count(&self, e: ElementId<I>) -> usize {
        self.ref_counts[e.index()] as usize
    }

    /// Iterate over live element ids.
    pub fn element_ids(&self) -> impl Iterator<Item = ElementId<I>> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, &alive)| alive)
            .map(|(i, _)| ElementId::new(i))
    }

    /// Number of live elements.
    pub fn element_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// One past the largest element id ever handed out in this generation.
    #[inline]
    pub fn max_element_id(&self) -> usize {
        self.values.len()
    }

    // ==================== Faces ====================

    /// Element triple of a face, `None` when the face has no UVs.
    #[inline]
    pub fn triangle(&self, f: FaceId<I>) -> Option<[ElementId<I>; 3]> {
        self.triangles[f.index()]
    }

    /// Check whether a face has UVs assigned.
    #[inline]
    pub fn is_set_triangle(&self, f: FaceId<I>) -> bool {
        self.triangles[f.index()].is_some()
    }

    /// Iterate over the faces that have UVs assigned.
    pub fn set_triangle_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_some())
            .map(|(i, _)| FaceId::new(i))
    }

    /// Assign an element triple to a face.
    ///
    /// Element `k` must have the face's corner `k` as its parent vertex.
    /// Previously referenced elements that lose their last face are freed.
    pub fn set_triangle(&mut self, mesh: &HalfEdgeMesh<I>, f: FaceId<I>, tri: [ElementId<I>; 3]) {
        debug_assert!(tri.iter().all(|&e| self.is_element(e)));
        debug_assert_eq!(
            tri.map(|e| self.parent_vertex(e)),
            mesh.face_triangle(f),
            "element parents must match face corners"
        );

        for e in tri {
            self.ref_counts[e.index()] += 1;
        }
        if let Some(old) = self.triangles[f.index()].replace(tri) {
            self.release(old);
        }
    }

    /// Remove the UV assignment of a face.
    pub fn unset_triangle(&mut self, f: FaceId<I>) {
        if let Some(old) = self.triangles[f.index()].take() {
            self.release(old);
        }
    }

    /// Remove the UV assignment of every face in `faces`.
    pub fn clear_triangles(&mut self, faces: impl IntoIterator<Item = FaceId<I>>) {
        for f in faces {
            self.unset_triangle(f);
        }
    }

    /// Drop every element and every face assignment.
    pub fn clear_elements(&mut self) {
        self.values.clear();
        self.parents.clear();
        self.alive.clear();
        self.ref_counts.clear();
        self.triangles.iter_mut().for_each(|t| *t = None);
    }

    fn release(&mut self, tri: [ElementId<I>; 3]) {
        for e in tri {
            let count = &mut self.ref_counts[e.index()];
            *count -= 1;
            if *count == 0 {
                self.alive[e.index()] = false;
            }
        }
    }

    // ==================== Queries ====================

    /// Element used by face `f` at mesh vertex `v`.
    pub fn element_at(
        &self,
        mesh: &HalfEdgeMesh<I>,
        f: FaceId<I>,
        v: VertexId<I>,
    ) -> Option<ElementId<I>> {
        let tri = self.triangle(f)?;
        mesh.face_corner(f, v).map(|k| tri[k])
    }

    /// Distinct elements used around a vertex, in rotational order of first use.
    pub fn vertex_elements(&self, mesh: &HalfEdgeMesh<I>, v: VertexId<I>) -> Vec<ElementId<I>> {
        let mut elements = Vec::new();
        for f in mesh.vertex_faces(v) {
            if let Some(e) = self.element_at(mesh, f, v) {
                if !elements.contains(&e) {
                    elements.push(e);
                }
            }
        }
        elements
    }

    /// Faces that reference an element.
    pub fn element_triangles(&self, mesh: &HalfEdgeMesh<I>, e: ElementId<I>) -> Vec<FaceId<I>> {
        let v = self.parent_vertex(e);
        mesh.vertex_faces(v)
            .filter(|&f| self.element_at(mesh, f, v) == Some(e))
            .collect()
    }

    /// Elements used at both ends of edge `e` on face `f`, ordered like the edge's vertices.
    pub fn edge_elements(
        &self,
        mesh: &HalfEdgeMesh<I>,
        e: EdgeId<I>,
        f: FaceId<I>,
    ) -> Option<[ElementId<I>; 2]> {
        let [a, b] = mesh.edge_vertices(e);
        Some([self.element_at(mesh, f, a)?, self.element_at(mesh, f, b)?])
    }

    /// Check whether an edge is a UV seam.
    ///
    /// Mesh boundary edges are never seams. An interior edge is a seam when
    /// exactly one side has UVs, or when the two sides use different elements
    /// at either endpoint.
    pub fn is_seam_edge(&self, mesh: &HalfEdgeMesh<I>, e: EdgeId<I>) -> bool {
        let [f0, f1] = mesh.edge_faces(e);
        if !f0.is_valid() || !f1.is_valid() {
            return false;
        }
        match (
            self.edge_elements(mesh, e, f0),
            self.edge_elements(mesh, e, f1),
        ) {
            (Some(a), Some(b)) => a != b,
            (None, None) => false,
            _ => true,
        }
    }

    /// Check whether two faces sharing edge `e` are joined in UV space.
    pub fn is_uv_connected(&self, mesh: &HalfEdgeMesh<I>, e: EdgeId<I>) -> bool {
        let [f0, f1] = mesh.edge_faces(e);
        if !f0.is_valid() || !f1.is_valid() {
            return false;
        }
        match (
            self.edge_elements(mesh, e, f0),
            self.edge_elements(mesh, e, f1),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    // ==================== Editing ====================

    /// Join the two sides of a seam edge by merging elements at both endpoints.
    ///
    /// Faces on the second side of the edge are rewritten to use the first
    /// side's elements. Returns `false` if the edge is not an interior edge
    /// with UVs on both sides.
    pub fn merge_elements_at_edge(&mut self, mesh: &HalfEdgeMesh<I>, e: EdgeId<I>) -> bool {
        let [f0, f1] = mesh.edge_faces(e);
        if !f0.is_valid() || !f1.is_valid() {
            return false;
        }
        let (Some(keep), Some(merge)) = (
            self.edge_elements(mesh, e, f0),
            self.edge_elements(mesh, e, f1),
        ) else {
            return false;
        };

        for k in 0..2 {
            if keep[k] != merge[k] && self.is_element(merge[k]) {
                self.replace_element(mesh, merge[k], keep[k]);
            }
        }
        true
    }

    /// Rewrite every face that uses `from` so that it uses `to` instead.
    pub fn replace_element(&mut self, mesh: &HalfEdgeMesh<I>, from: ElementId<I>, to: ElementId<I>) {
        debug_assert_eq!(self.parent_vertex(from), self.parent_vertex(to));
        for f in self.element_triangles(mesh, from) {
            if let Some(mut tri) = self.triangle(f) {
                for e in tri.iter_mut() {
                    if *e == from {
                        *e = to;
                    }
                }
                self.set_triangle(mesh, f, tri);
            }
        }
    }

    /// Group the faces using element `e` into fans.
    ///
    /// Two faces around the parent vertex belong to the same fan when they are
    /// joined in UV space across a spoke edge.
    pub fn element_fans(&self, mesh: &HalfEdgeMesh<I>, e: ElementId<I>) -> Vec<Vec<FaceId<I>>> {
        let v = self.parent_vertex(e);
        let faces = self.element_triangles(mesh, e);
        if faces.len() < 2 {
            return vec![faces];
        }

        let mut sets = UnionFind::new(faces.len());
        for he in mesh.vertex_halfedges(v) {
            if !self.is_uv_connected(mesh, mesh.halfedge_edge(he)) {
                continue;
            }
            let a = mesh.face_of(he);
            let b = mesh.face_of(mesh.twin(he));
            let (Some(ia), Some(ib)) = (
                faces.iter().position(|&f| f == a),
                faces.iter().position(|&f| f == b),
            ) else {
                continue;
            };
            sets.union(ia, ib);
        }

        sets.groups()
            .into_iter()
            .map(|group| group.into_iter().map(|i| faces[i]).collect())
            .collect()
    }

    /// Check whether an element is used by more than one fan of faces.
    pub fn is_bowtie(&self, mesh: &HalfEdgeMesh<I>, e: ElementId<I>) -> bool {
        self.element_fans(mesh, e).len() > 1
    }

    /// Split every bowtie element so that each fan gets its own element.
    ///
    /// New elements are appended to `new_elements` when given.
    pub fn split_bowties(
        &mut self,
        mesh: &HalfEdgeMesh<I>,
        new_elements: Option<&mut Vec<ElementId<I>>>,
    ) -> usize {
        let elements: Vec<ElementId<I>> = self.element_ids().collect();
        self.split_bowtie_elements(mesh, &elements, new_elements)
    }

    /// Split bowtie elements around the given vertices only.
    pub fn split_bowties_at_vertices(
        &mut self,
        mesh: &HalfEdgeMesh<I>,
        vertices: &[VertexId<I>],
        new_elements: Option<&mut Vec<ElementId<I>>>,
    ) -> usize {
        let mut elements = Vec::new();
        for &v in vertices {
            for e in self.vertex_elements(mesh, v) {
                if !elements.contains(&e) {
                    elements.push(e);
                }
            }
        }
        self.split_bowtie_elements(mesh, &elements, new_elements)
    }

    fn split_bowtie_elements(
        &mut self,
        mesh: &HalfEdgeMesh<I>,
        elements: &[ElementId<I>],
        mut new_elements: Option<&mut Vec<ElementId<I>>>,
    ) -> usize {
        let mut created = 0;
        for &e in elements {
            if !self.is_element(e) {
                continue;
            }
            let fans = self.element_fans(mesh, e);
            for fan in fans.into_iter().skip(1) {
                let copy = self.append_element(self.uv(e), self.parent_vertex(e));
                for f in fan {
                    if let Some(mut tri) = self.triangle(f) {
                        tri.iter_mut().filter(|x| **x == e).for_each(|x| *x = copy);
                        self.set_triangle(mesh, f, tri);
                    }
                }
                if let Some(list) = new_elements.as_deref_mut() {
                    list.push(copy);
                }
                created += 1;
            }
        }
        created
    }

    /// Check the parent-vertex and reference-count invariants.
    pub fn is_valid(&self, mesh: &HalfEdgeMesh<I>) -> bool {
        if self.triangles.len() != mesh.num_faces() {
            return false;
        }
        let mut counts = vec![0u32; self.values.len()];
        for f in mesh.face_ids() {
            if let Some(tri) = self.triangle(f) {
                if tri.iter().any(|&e| !self.is_element(e)) {
                    return false;
                }
                if tri.map(|e| self.parent_vertex(e)) != mesh.face_triangle(f) {
                    return false;
                }
                for e in tri {
                    counts[e.index()] += 1;
                }
            }
        }
        counts == self.ref_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::{grid_mesh, square_mesh};

    fn per_vertex(mesh: &HalfEdgeMesh) -> UvOverlay {
        let mut overlay = UvOverlay::new(mesh.num_faces());
        for v in mesh.vertex_ids() {
            let p = mesh.position(v);
            overlay.append_element(Point2::new(p.x, p.y), v);
        }
        for f in mesh.face_ids() {
            let tri = mesh.face_triangle(f).map(|v| ElementId::new(v.index()));
            overlay.set_triangle(mesh, f, tri);
        }
        overlay
    }

    #[test]
    fn test_ref_counting_frees_elements() {
        let mesh = square_mesh();
        let mut overlay = per_vertex(&mesh);
        assert_eq!(overlay.element_count(), 4);
        assert_eq!(overlay.ref_count(ElementId::new(0)), 2);
        assert!(overlay.is_valid(&mesh));

        overlay.unset_triangle(FaceId::new(0));
        assert_eq!(overlay.ref_count(ElementId::new(0)), 1);
        // Vertex 1 is only used by face 0.
        assert!(!overlay.is_element(ElementId::new(1)));
        assert_eq!(overlay.element_count(), 3);
        assert_eq!(overlay.max_element_id(), 4);
        assert!(overlay.is_valid(&mesh));

        overlay.clear_elements();
        assert_eq!(overlay.element_count(), 0);
        assert_eq!(overlay.set_triangle_ids().count(), 0);
    }

    #[test]
    fn test_seam_detection_and_merge() {
        let mesh = square_mesh();
        let mut overlay = per_vertex(&mesh);
        let diagonal = mesh.find_edge(VertexId::new(0), VertexId::new(2)).unwrap();
        assert!(!overlay.is_seam_edge(&mesh, diagonal));

        // Give face 1 its own copy of vertex 0.
        let f1 = FaceId::new(1);
        let copy = overlay.append_element(Point2::new(5.0, 5.0), VertexId::new(0));
        let mut tri = overlay.triangle(f1).unwrap();
        tri[0] = copy;
        overlay.set_triangle(&mesh, f1, tri);
        assert!(overlay.is_seam_edge(&mesh, diagonal));
        assert_eq!(overlay.vertex_elements(&mesh, VertexId::new(0)).len(), 2);

        // Boundary edges are never seams.
        let boundary = mesh.find_edge(VertexId::new(0), VertexId::new(1)).unwrap();
        assert!(!overlay.is_seam_edge(&mesh, boundary));

        assert!(overlay.merge_elements_at_edge(&mesh, diagonal));
        assert!(!overlay.is_seam_edge(&mesh, diagonal));
        assert!(!overlay.is_element(copy));
        assert!(overlay.is_valid(&mesh));
    }

    #[test]
    fn test_half_set_edge_is_seam() {
        let mesh = square_mesh();
        let mut overlay = per_vertex(&mesh);
        overlay.unset_triangle(FaceId::new(1));
        let diagonal = mesh.find_edge(VertexId::new(0), VertexId::new(2)).unwrap();
        assert!(overlay.is_seam_edge(&mesh, diagonal));
        assert!(!overlay.is_uv_connected(&mesh, diagonal));
    }

    #[test]
    fn test_split_bowties() {
        // 3x3 grid, centre vertex 5 of the 4x4 vertex lattice is interior.
        let mesh = grid_mesh(3);
        let mut overlay = per_vertex(&mesh);
        let center = VertexId::new(5);

        let faces: Vec<FaceId> = mesh.vertex_faces(center).collect();
        assert_eq!(faces.len(), 6);
        let shared = overlay.element_at(&mesh, faces[0], center).unwrap();

        // Give every face fresh elements away from the centre.
        for &f in &faces {
            let tri = mesh.face_triangle(f);
            let mut elements = overlay.triangle(f).unwrap();
            for k in 0..3 {
                if tri[k] != center {
                    elements[k] = overlay.append_element(Point2::origin(), tri[k]);
                }
            }
            overlay.set_triangle(&mesh, f, elements);
        }
        // Every spoke is now a seam while the centre element is still shared.
        assert!(overlay.is_bowtie(&mesh, shared));

        let mut created = Vec::new();
        let n = overlay.split_bowties(&mesh, Some(&mut created));
        assert_eq!(n, 5);
        assert_eq!(created.len(), 5);
        assert!(!overlay.is_bowtie(&mesh, shared));
        assert_eq!(overlay.vertex_elements(&mesh, center).len(), 6);
        assert!(overlay.is_valid(&mesh));
    }
}
