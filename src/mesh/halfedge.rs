//! Half-edge mesh data structure.
//!
//! This module provides a half-edge (doubly-connected edge list) representation
//! for triangle meshes, extended with a full-edge table so that edges have
//! stable ids of their own.
//!
//! # Structure
//!
//! - Each edge is split into two **half-edges** pointing in opposite directions
//! - Each half-edge knows its **twin**, **next**, **prev**, **origin vertex** and
//!   **incident face**
//! - Each vertex stores one outgoing half-edge (a boundary one if it has any)
//! - Each face stores the half-edge leaving its first corner
//! - Each full edge stores one canonical half-edge, interior whenever possible
//!
//! # Boundary Handling
//!
//! Boundary half-edges have an invalid face id. They are linked into loops with
//! their `next`/`prev` pointers, which is what [`HalfEdgeMesh::boundary_loops`]
//! walks.
//!
//! Ids are dense and never recycled: nothing in this crate deletes vertices,
//! edges or faces, so an id stays valid for the lifetime of the mesh.

use nalgebra::{Point3, Vector3};

use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// One outgoing half-edge, invalid for isolated vertices.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create a new, not yet connected vertex.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            halfedge: HalfEdgeId::invalid(),
        }
    }
}

/// A half-edge in the mesh.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// The vertex this half-edge originates from.
    pub origin: VertexId<I>,
    /// The opposite half-edge.
    pub twin: HalfEdgeId<I>,
    /// The next half-edge around the face (or boundary loop).
    pub next: HalfEdgeId<I>,
    /// The previous half-edge around the face (or boundary loop).
    pub prev: HalfEdgeId<I>,
    /// The face this half-edge belongs to, invalid on the boundary.
    pub face: FaceId<I>,
}

impl<I: MeshIndex> HalfEdge<I> {
    /// Create a new unlinked half-edge.
    pub fn new() -> Self {
        Self {
            origin: VertexId::invalid(),
            twin: HalfEdgeId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
        }
    }

    /// Check if this half-edge is on the boundary.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        !self.face.is_valid()
    }
}

impl<I: MeshIndex> Default for HalfEdge<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// A triangular face.
#[derive(Debug, Clone, Copy)]
pub struct Face<I: MeshIndex = u32> {
    /// The half-edge leaving the face's first corner.
    pub halfedge: HalfEdgeId<I>,
}

/// A half-edge triangle mesh with stable vertex, edge and face ids.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex<I>>,
    pub(crate) halfedges: Vec<HalfEdge<I>>,
    pub(crate) faces: Vec<Face<I>>,
    /// Canonical half-edge of every full edge.
    pub(crate) edges: Vec<HalfEdgeId<I>>,
    /// Full edge of every half-edge.
    pub(crate) halfedge_edges: Vec<EdgeId<I>>,
}

impl<I: MeshIndex> Default for HalfEdgeMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Closed meshes have 3F half-edges; leave some room for boundary ones.
        let num_halfedges = num_faces * 3 + num_faces / 2;

        Self {
            vertices: Vec::with_capacity(num_vertices),
            halfedges: Vec::with_capacity(num_halfedges),
            faces: Vec::with_capacity(num_faces),
            edges: Vec::with_capacity(num_halfedges / 2),
            halfedge_edges: Vec::with_capacity(num_halfedges),
        }
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of full edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    #[inline]
    pub(crate) fn vertex_mut(&mut self, id: VertexId<I>) -> &mut Vertex<I> {
        &mut self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    #[inline]
    pub(crate) fn halfedge_mut(&mut self, id: HalfEdgeId<I>) -> &mut HalfEdge<I> {
        &mut self.halfedges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Check whether `v` is a vertex of this mesh.
    #[inline]
    pub fn is_vertex(&self, v: VertexId<I>) -> bool {
        v.is_valid() && v.index() < self.vertices.len()
    }

    /// Check whether `f` is a face of this mesh.
    #[inline]
    pub fn is_face(&self, f: FaceId<I>) -> bool {
        f.is_valid() && f.index() < self.faces.len()
    }

    /// Check whether `e` is an edge of this mesh.
    #[inline]
    pub fn is_edge(&self, e: EdgeId<I>) -> bool {
        e.is_valid() && e.index() < self.edges.len()
    }

    // ==================== Half-edge Topology ====================

    /// Get the twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).twin
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Get the previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).prev
    }

    /// Get the origin vertex of a half-edge.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).origin
    }

    /// Get the destination vertex of a half-edge.
    #[inline]
    pub fn dest(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.origin(self.twin(he))
    }

    /// Get the face of a half-edge.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedge(he).face
    }

    /// Check if a half-edge is on the boundary.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        self.halfedge(he).is_boundary()
    }

    /// Check if a vertex is on the boundary. Isolated vertices count as boundary.
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        let start = self.vertex(v).halfedge;
        if !start.is_valid() {
            return true;
        }
        self.vertex_halfedges(v)
            .any(|he| self.is_boundary_halfedge(he))
    }

    /// Find the half-edge going from `a` to `b`, if the two vertices are adjacent.
    pub fn find_halfedge(&self, a: VertexId<I>, b: VertexId<I>) -> Option<HalfEdgeId<I>> {
        self.vertex_halfedges(a).find(|&he| self.dest(he) == b)
    }

    // ==================== Full Edges ====================

    /// Get the full edge a half-edge belongs to.
    #[inline]
    pub fn halfedge_edge(&self, he: HalfEdgeId<I>) -> EdgeId<I> {
        self.halfedge_edges[he.index()]
    }

    /// Get the canonical half-edge of an edge (interior unless the edge has no face at all).
    #[inline]
    pub fn edge_halfedge(&self, e: EdgeId<I>) -> HalfEdgeId<I> {
        self.edges[e.index()]
    }

    /// Get the two vertices of an edge, oriented like its canonical half-edge.
    #[inline]
    pub fn edge_vertices(&self, e: EdgeId<I>) -> [VertexId<I>; 2] {
        let he = self.edge_halfedge(e);
        [self.origin(he), self.dest(he)]
    }

    /// Get the faces on both sides of an edge. The second is invalid on the boundary.
    #[inline]
    pub fn edge_faces(&self, e: EdgeId<I>) -> [FaceId<I>; 2] {
        let he = self.edge_halfedge(e);
        [self.face_of(he), self.face_of(self.twin(he))]
    }

    /// Check if an edge lies on the mesh boundary.
    #[inline]
    pub fn edge_is_boundary(&self, e: EdgeId<I>) -> bool {
        let he = self.edge_halfedge(e);
        self.is_boundary_halfedge(he) || self.is_boundary_halfedge(self.twin(he))
    }

    /// Find the edge joining `a` and `b`.
    pub fn find_edge(&self, a: VertexId<I>, b: VertexId<I>) -> Option<EdgeId<I>> {
        self.find_halfedge(a, b).map(|he| self.halfedge_edge(he))
    }

    /// Get the face across edge `e` from face `f`, invalid on the boundary.
    pub fn opposite_face(&self, e: EdgeId<I>, f: FaceId<I>) -> FaceId<I> {
        let [a, b] = self.edge_faces(e);
        if a == f {
            b
        } else if b == f {
            a
        } else {
            FaceId::invalid()
        }
    }

    /// Compute the length of a full edge.
    pub fn edge_length(&self, e: EdgeId<I>) -> f64 {
        self.halfedge_length(self.edge_halfedge(e))
    }

    /// Compute the length of a half-edge.
    pub fn halfedge_length(&self, he: HalfEdgeId<I>) -> f64 {
        let p0 = self.position(self.origin(he));
        let p1 = self.position(self.dest(he));
        (p1 - p0).norm()
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all half-edge IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        (0..self.halfedges.len()).map(HalfEdgeId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over all edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId<I>> + '_ {
        (0..self.edges.len()).map(EdgeId::new)
    }

    /// Iterate over outgoing half-edges around a vertex, in rotational order.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, v)
    }

    /// Iterate over vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertexId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| self.dest(he))
    }

    /// Iterate over faces adjacent to a vertex.
    pub fn vertex_faces(&self, v: VertexId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.vertex_halfedges(v)
            .map(|he| self.face_of(he))
            .filter(|f| f.is_valid())
    }

    /// Iterate over edges incident to a vertex.
    pub fn vertex_edges(&self, v: VertexId<I>) -> impl Iterator<Item = EdgeId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| self.halfedge_edge(he))
    }

    /// Iterate over half-edges around a face.
    pub fn face_halfedges(&self, f: FaceId<I>) -> FaceHalfEdgeIter<'_, I> {
        FaceHalfEdgeIter::new(self, f)
    }

    /// Get the three vertices of a triangular face.
    pub fn face_triangle(&self, f: FaceId<I>) -> [VertexId<I>; 3] {
        let he0 = self.face(f).halfedge;
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [self.origin(he0), self.origin(he1), self.origin(he2)]
    }

    /// Get the three edges of a face. Edge `k` joins corners `k` and `k + 1`.
    pub fn face_edges(&self, f: FaceId<I>) -> [EdgeId<I>; 3] {
        let he0 = self.face(f).halfedge;
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [
            self.halfedge_edge(he0),
            self.halfedge_edge(he1),
            self.halfedge_edge(he2),
        ]
    }

    /// Get the corner index (0, 1 or 2) of vertex `v` in face `f`.
    pub fn face_corner(&self, f: FaceId<I>, v: VertexId<I>) -> Option<usize> {
        self.face_triangle(f).iter().position(|&c| c == v)
    }

    /// Get the positions of the three vertices of a triangular face.
    pub fn face_positions(&self, f: FaceId<I>) -> [Point3<f64>; 3] {
        let [v0, v1, v2] = self.face_triangle(f);
        [*self.position(v0), *self.position(v1), *self.position(v2)]
    }

    // ==================== Geometry ====================

    /// Compute the unit normal of a face (zero for degenerate faces).
    pub fn face_normal(&self, f: FaceId<I>) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        (p1 - p0)
            .cross(&(p2 - p0))
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Compute the area of a face.
    pub fn face_area(&self, f: FaceId<I>) -> f64 {
        let [p0, p1, p2] = self.face_positions(f);
        0.5 * (p1 - p0).cross(&(p2 - p0)).norm()
    }

    /// Compute the centroid of a face.
    pub fn face_centroid(&self, f: FaceId<I>) -> Point3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        Point3::from((p0.coords + p1.coords + p2.coords) / 3.0)
    }

    /// Compute the area-weighted unit normal at a vertex (zero when isolated).
    pub fn vertex_normal(&self, v: VertexId<I>) -> Vector3<f64> {
        let mut normal = Vector3::zeros();
        for f in self.vertex_faces(v) {
            let [p0, p1, p2] = self.face_positions(f);
            normal += (p1 - p0).cross(&(p2 - p0));
        }
        normal
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?.position;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices {
            min = min.inf(&v.position);
            max = max.sup(&v.position);
        }
        Some((min, max))
    }

    /// Length of the bounding box diagonal, zero for an empty mesh.
    pub fn diagonal_length(&self) -> f64 {
        self.bounding_box()
            .map(|(min, max)| (max - min).norm())
            .unwrap_or(0.0)
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    /// Extract every boundary loop as an ordered list of vertices.
    ///
    /// Each loop follows the boundary half-edges, so the mesh interior lies to
    /// the right of the walk.
    pub fn boundary_loops(&self) -> Vec<Vec<VertexId<I>>> {
        let mut visited = vec![false; self.halfedges.len()];
        let mut loops = Vec::new();

        for start in self.halfedge_ids() {
            if visited[start.index()] || !self.is_boundary_halfedge(start) {
                continue;
            }

            let mut boundary = Vec::new();
            let mut he = start;
            loop {
                visited[he.index()] = true;
                boundary.push(self.origin(he));
                he = self.next(he);
                // A broken link means non-manifold input; keep what we walked.
                if !he.is_valid() || he == start || visited[he.index()] {
                    break;
                }
            }
            loops.push(boundary);
        }

        loops
    }

    // ==================== Construction ====================

    /// Add a new unconnected vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        id
    }

    // ==================== Validation ====================

    /// Check if the mesh connectivity is consistent.
    pub fn is_valid(&self) -> bool {
        let vertices_ok = self.vertices.iter().enumerate().all(|(i, v)| {
            !v.halfedge.is_valid() || self.halfedge(v.halfedge).origin.index() == i
        });

        let halfedges_ok = self.halfedge_ids().all(|id| {
            let he = self.halfedge(id);
            (!he.twin.is_valid() || self.twin(he.twin) == id)
                && (!he.next.is_valid() || self.prev(he.next) == id)
                && (!he.prev.is_valid() || self.next(he.prev) == id)
        });

        let edges_ok = self.halfedge_ids().all(|he| {
            let e = self.halfedge_edge(he);
            e.is_valid() && self.halfedge_edge(self.twin(he)) == e
        });

        vertices_ok
            && halfedges_ok
            && edges_ok
            && self.faces.iter().all(|f| f.halfedge.is_valid())
    }
}

/// Iterator over outgoing half-edges around a vertex.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
    // Guards against malformed (non-manifold) rings.
    remaining: usize,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, v: VertexId<I>) -> Self {
        let start = mesh.vertex(v).halfedge;
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
            remaining: mesh.halfedges.len(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let result = self.current;

        // twin(he) comes back into v; the half-edge after it leaves v again.
        self.current = self.mesh.next(self.mesh.twin(self.current));
        if !self.current.is_valid() || self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}

/// Iterator over half-edges around a face.
pub struct FaceHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> FaceHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, f: FaceId<I>) -> Self {
        let start = mesh.face(f).halfedge;
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for FaceHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;
        self.current = self.mesh.next(self.current);
        if self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;
    use crate::test_meshes::{grid_mesh, square_mesh};

    #[test]
    fn test_empty_mesh() {
        let mesh = HalfEdgeMesh::<u32>::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_edges(), 0);
        assert!(mesh.is_valid());
        assert!(mesh.bounding_box().is_none());
    }

    #[test]
    fn test_edge_table() {
        let mesh = square_mesh();
        // Two triangles sharing the diagonal: 4 boundary edges + 1 interior.
        assert_eq!(mesh.num_edges(), 5);
        assert!(mesh.is_valid());

        let diagonal = mesh
            .find_edge(VertexId::new(0), VertexId::new(2))
            .unwrap();
        assert!(mesh.is_edge(diagonal));
        assert!(!mesh.edge_is_boundary(diagonal));
        assert!((mesh.edge_length(diagonal) - 2.0_f64.sqrt()).abs() < 1e-12);
        let [fa, fb] = mesh.edge_faces(diagonal);
        assert!(mesh.is_face(fa) && mesh.is_face(fb));
        assert_eq!(mesh.face_halfedges(fa).count(), 3);
        assert!(mesh.is_vertex(VertexId::new(3)));
        assert!(!mesh.is_vertex(VertexId::new(4)));
        assert_eq!(mesh.opposite_face(diagonal, fa), fb);

        let boundary = mesh
            .find_edge(VertexId::new(0), VertexId::new(1))
            .unwrap();
        assert!(mesh.edge_is_boundary(boundary));
        assert!(!mesh.edge_faces(boundary)[1].is_valid());
    }

    #[test]
    fn test_face_edges_follow_corners() {
        let mesh = grid_mesh(2);
        for f in mesh.face_ids() {
            let tri = mesh.face_triangle(f);
            let edges = mesh.face_edges(f);
            for k in 0..3 {
                let [a, b] = mesh.edge_vertices(edges[k]);
                let expected = [tri[k], tri[(k + 1) % 3]];
                assert!(
                    (a == expected[0] && b == expected[1])
                        || (a == expected[1] && b == expected[0])
                );
            }
        }
    }

    #[test]
    fn test_boundary_loops() {
        let mesh = grid_mesh(3);
        let loops = mesh.boundary_loops();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 12);
    }

    #[test]
    fn test_isolated_vertex() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(5.0, 5.0, 5.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 3]]).unwrap();
        assert!(mesh.is_boundary_vertex(VertexId::new(2)));
        assert_eq!(mesh.vertex_faces(VertexId::new(2)).count(), 0);
        assert_eq!(mesh.vertex_normal(VertexId::new(2)), Vector3::zeros());
    }
}
