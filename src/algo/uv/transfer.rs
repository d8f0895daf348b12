//! Seam and UV transfer from a simplified mesh onto a denser one.
//!
//! The two meshes must share vertex positions: every vertex of the source
//! mesh is expected to have a destination vertex within the search radius.
//! Source seams are mapped onto shortest destination edge paths, source UV
//! values are copied onto the matching destination elements, and each
//! destination island is then relaxed with a conformal solve that keeps the
//! copied values pinned.
//!
//! # Example
//!
//! ```
//! use morsel_uv::prelude::*;
//! use morsel_uv::algo::uv::{TransferOptions, UvTransfer};
//! use nalgebra::Point3;
//!
//! let corners = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = [[0, 1, 2], [0, 2, 3]];
//! let mut source: UvMesh = UvMesh::new(build_from_triangles(&corners, &faces).unwrap());
//! UvEditor::new(&mut source, 0, false)
//!     .unwrap()
//!     .set_per_triangle_uvs(None, 1.0, None)
//!     .unwrap();
//!
//! let mut destination: UvMesh = UvMesh::new(build_from_triangles(&corners, &faces).unwrap());
//! let mut transfer =
//!     UvTransfer::new(&source, 0, &mut destination, 0, TransferOptions::default()).unwrap();
//! transfer.transfer_seams().unwrap();
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use nalgebra::{Point3, Vector3};

use super::editor::{ConformalOptions, UvEditor};
use super::util::face_elements;
use crate::algo::cancel::Cancellation;
use crate::algo::geodesic::{dijkstra_weighted, DijkstraOptions};
use crate::error::{MeshError, Result};
use crate::geom::PointHashGrid;
use crate::mesh::{
    uv_islands, EdgeId, ElementId, FaceId, HalfEdgeMesh, MeshIndex, UvMesh, VertexId,
};

/// Faces or edges handled between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 256;

/// Options for a [`UvTransfer`] session.
#[derive(Debug, Clone)]
pub struct TransferOptions<I: MeshIndex = u32> {
    /// Largest distance between a source vertex and its destination vertex.
    pub vertex_search_radius: f64,
    /// Hash grid cell size as a multiple of the search radius.
    pub grid_cell_factor: f64,
    /// Seam paths may be this many times longer than the source edge.
    pub path_length_tolerance: f64,
    /// Weight of the penalty for paths that stray from the source edge's
    /// line; 0 uses plain edge lengths.
    pub path_similarity_weight: f64,
    /// Lower bound on the seam path search distance.
    pub min_path_search_distance: f64,
    /// Strip the destination's existing seams before transferring.
    pub clear_existing_destination_seams: bool,
    /// Source faces to transfer from; `None` uses every face with UVs.
    pub source_faces: Option<Vec<FaceId<I>>>,
    /// Destination faces to transfer onto; `None` uses every face.
    pub destination_faces: Option<Vec<FaceId<I>>>,
}

impl<I: MeshIndex> Default for TransferOptions<I> {
    fn default() -> Self {
        Self {
            vertex_search_radius: 1e-5,
            grid_cell_factor: 3.0,
            path_length_tolerance: 1.5,
            path_similarity_weight: 0.0,
            min_path_search_distance: 1e-4,
            clear_existing_destination_seams: true,
            source_faces: None,
            destination_faces: None,
        }
    }
}

impl<I: MeshIndex> TransferOptions<I> {
    /// Set the vertex search radius.
    pub fn with_vertex_search_radius(mut self, radius: f64) -> Self {
        self.vertex_search_radius = radius;
        self
    }

    /// Set the hash grid cell size factor.
    pub fn with_grid_cell_factor(mut self, factor: f64) -> Self {
        self.grid_cell_factor = factor;
        self
    }

    /// Set the path length tolerance multiplier.
    pub fn with_path_length_tolerance(mut self, tolerance: f64) -> Self {
        self.path_length_tolerance = tolerance;
        self
    }

    /// Set the path similarity weight.
    pub fn with_path_similarity_weight(mut self, weight: f64) -> Self {
        self.path_similarity_weight = weight;
        self
    }

    /// Set the minimum path search distance.
    pub fn with_min_path_search_distance(mut self, distance: f64) -> Self {
        self.min_path_search_distance = distance;
        self
    }

    /// Set whether existing destination seams are stripped first.
    pub fn with_clear_existing_destination_seams(mut self, clear: bool) -> Self {
        self.clear_existing_destination_seams = clear;
        self
    }

    /// Restrict the transfer to these source faces.
    pub fn with_source_faces(mut self, faces: Vec<FaceId<I>>) -> Self {
        self.source_faces = Some(faces);
        self
    }

    /// Restrict the transfer to these destination faces.
    pub fn with_destination_faces(mut self, faces: Vec<FaceId<I>>) -> Self {
        self.destination_faces = Some(faces);
        self
    }

    fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.vertex_search_radius) {
            return Err(MeshError::invalid_param(
                "vertex_search_radius",
                self.vertex_search_radius,
                "must be positive",
            ));
        }
        if !positive(self.grid_cell_factor) {
            return Err(MeshError::invalid_param(
                "grid_cell_factor",
                self.grid_cell_factor,
                "must be positive",
            ));
        }
        if !positive(self.path_length_tolerance) {
            return Err(MeshError::invalid_param(
                "path_length_tolerance",
                self.path_length_tolerance,
                "must be positive",
            ));
        }
        if !self.path_similarity_weight.is_finite() || self.path_similarity_weight < 0.0 {
            return Err(MeshError::invalid_param(
                "path_similarity_weight",
                self.path_similarity_weight,
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Progress of a [`UvTransfer`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransferState {
    /// Nothing has run yet.
    Unconfigured,
    /// Destination vertices are indexed for correspondence lookups.
    HashGridBuilt,
    /// Seams have been transferred.
    SeamsTransferred,
    /// UV values have been transferred and relaxed.
    ElementsTransferred,
}

/// Destination path produced for one source seam edge.
#[derive(Debug, Clone, Copy)]
struct SeamPath<I: MeshIndex> {
    source_edge: EdgeId<I>,
    /// Source endpoints, in the order the path was searched.
    source_vertices: [VertexId<I>; 2],
    /// First and last path edges as (from, to) in path order.
    end_edges: [(VertexId<I>, VertexId<I>); 2],
}

impl<I: MeshIndex> SeamPath<I> {
    fn destination_vertex(&self, end: usize) -> VertexId<I> {
        if end == 0 {
            self.end_edges[0].0
        } else {
            self.end_edges[1].1
        }
    }
}

/// One transfer of seams, and optionally UVs, between two meshes.
///
/// The source layer is read only; the destination layer is rewritten. The
/// session remembers destination vertex lookups and the seam paths it found
/// so [`transfer_seams_and_uvs`](Self::transfer_seams_and_uvs) can reuse them.
pub struct UvTransfer<'s, 'd, I: MeshIndex = u32> {
    source: &'s UvMesh<I>,
    source_layer: usize,
    destination: &'d mut UvMesh<I>,
    layer: usize,
    options: TransferOptions<I>,
    cancel: Cancellation,
    state: TransferState,
    grid: Option<PointHashGrid<VertexId<I>>>,
    correspondence: HashMap<VertexId<I>, Option<VertexId<I>>>,
    seam_paths: Vec<SeamPath<I>>,
    boundary_elements: HashSet<ElementId<I>>,
}

impl<'s, 'd, I: MeshIndex> UvTransfer<'s, 'd, I> {
    /// Start a session transferring `source_layer` of `source` onto `layer`
    /// of `destination`.
    pub fn new(
        source: &'s UvMesh<I>,
        source_layer: usize,
        destination: &'d mut UvMesh<I>,
        layer: usize,
        options: TransferOptions<I>,
    ) -> Result<Self> {
        source.check_layer(source_layer)?;
        destination.check_layer(layer)?;
        options.validate()?;
        Ok(Self {
            source,
            source_layer,
            destination,
            layer,
            options,
            cancel: Cancellation::new(),
            state: TransferState::Unconfigured,
            grid: None,
            correspondence: HashMap::new(),
            seam_paths: Vec::new(),
            boundary_elements: HashSet::new(),
        })
    }

    /// Poll `cancel` during the transfer.
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current progress.
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Rebuild the source seams on the destination layer.
    ///
    /// Seams on the source mesh boundary are not transferred. A source edge
    /// fails when an endpoint has no destination vertex or no path is found
    /// within the search distance; the other edges are still cut and the
    /// failures are reported as [`MeshError::IncompleteCoverage`].
    pub fn transfer_seams(&mut self) -> Result<()> {
        self.cancel.check()?;
        if self.grid.is_none() {
            self.build_grid();
        }
        if self.options.clear_existing_destination_seams {
            self.reset_destination_seams()?;
        }

        self.seam_paths.clear();
        self.boundary_elements.clear();

        let source = self.source;
        let smesh = source.mesh();
        let soverlay = source.layer(self.source_layer);
        let source_faces: Vec<FaceId<I>> = match &self.options.source_faces {
            Some(faces) => faces.clone(),
            None => soverlay.set_triangle_ids().collect(),
        };
        let destination_selection: Option<HashSet<FaceId<I>>> = self
            .options
            .destination_faces
            .as_ref()
            .map(|faces| faces.iter().copied().collect());
        let diagonal = self.destination.mesh().diagonal_length().max(f64::EPSILON);

        let mut visited = HashSet::new();
        let mut to_cut = Vec::new();
        let mut attempted = 0;
        let mut failed = 0;
        for (count, &f) in source_faces.iter().enumerate() {
            if count % CANCEL_CHECK_INTERVAL == 0 {
                self.cancel.check()?;
            }
            for e in smesh.face_edges(f) {
                if !visited.insert(e) {
                    continue;
                }
                if smesh.edge_is_boundary(e) {
                    if let Some([ea, eb]) = soverlay.edge_elements(smesh, e, f) {
                        self.boundary_elements.insert(ea);
                        self.boundary_elements.insert(eb);
                    }
                    continue;
                }
                if !soverlay.is_seam_edge(smesh, e) {
                    continue;
                }

                attempted += 1;
                let [a, b] = smesh.edge_vertices(e);
                let (Some(da), Some(db)) = (self.destination_vertex(a), self.destination_vertex(b))
                else {
                    log::warn!("seam transfer: no destination vertex for an end of edge {:?}", e);
                    failed += 1;
                    continue;
                };

                let dmesh = self.destination.mesh();
                let Some(path) = seam_path(
                    dmesh,
                    [smesh.position(a), smesh.position(b)],
                    [da, db],
                    &self.options,
                    diagonal,
                ) else {
                    log::warn!("seam transfer: no destination path for edge {:?}", e);
                    failed += 1;
                    continue;
                };

                for pair in path.windows(2) {
                    let Some(de) = dmesh.find_edge(pair[0], pair[1]) else {
                        continue;
                    };
                    if let Some(selection) = &destination_selection {
                        let [f0, f1] = dmesh.edge_faces(de);
                        if !selection.contains(&f0) && !selection.contains(&f1) {
                            continue;
                        }
                    }
                    to_cut.push(de);
                }
                let n = path.len();
                self.seam_paths.push(SeamPath {
                    source_edge: e,
                    source_vertices: [a, b],
                    end_edges: [(path[0], path[1]), (path[n - 2], path[n - 1])],
                });
            }
        }

        if !to_cut.is_empty() {
            UvEditor::new(&mut *self.destination, self.layer, false)?
                .create_seams_at_edges(&to_cut, None)?;
        }
        self.state = TransferState::SeamsTransferred;
        log::debug!(
            "seam transfer: {} seam edges, {} failed, {} destination edges cut",
            attempted,
            failed,
            to_cut.len()
        );
        MeshError::check_coverage(failed, attempted)
    }

    /// Transfer seams, then UV values, then relax every destination island.
    ///
    /// The value transfer runs even when some seams failed; the call only
    /// succeeds when both phases do. Cancellation stops it at once.
    pub fn transfer_seams_and_uvs(&mut self) -> Result<()> {
        let seams = self.transfer_seams();
        if let Err(MeshError::Cancelled) = seams {
            return seams;
        }
        let elements = self.transfer_elements();
        seams.and(elements)
    }

    fn build_grid(&mut self) {
        let radius = self.options.vertex_search_radius;
        let mut grid = PointHashGrid::new(radius * self.options.grid_cell_factor);
        let dmesh = self.destination.mesh();
        for v in dmesh.vertex_ids() {
            grid.insert(*dmesh.position(v), v);
        }
        log::debug!("seam transfer: indexed {} destination vertices", grid.len());
        self.grid = Some(grid);
        self.state = TransferState::HashGridBuilt;
    }

    /// Nearest destination vertex to a source vertex, memoized.
    fn destination_vertex(&mut self, v: VertexId<I>) -> Option<VertexId<I>> {
        if let Some(&found) = self.correspondence.get(&v) {
            return found;
        }
        let p = self.source.mesh().position(v);
        let found = self
            .grid
            .as_ref()
            .and_then(|grid| grid.find_nearest_in_radius(p, self.options.vertex_search_radius))
            .map(|(d, _)| d);
        self.correspondence.insert(v, found);
        found
    }

    /// Give every destination vertex in the region a single element.
    fn reset_destination_seams(&mut self) -> Result<()> {
        let faces: Vec<FaceId<I>> = match &self.options.destination_faces {
            Some(faces) => faces.clone(),
            None => self.destination.mesh().face_ids().collect(),
        };
        let (mesh, overlay) = self.destination.layer_parts_mut(self.layer);
        let mut first: HashMap<VertexId<I>, ElementId<I>> = HashMap::new();
        for (count, &f) in faces.iter().enumerate() {
            if count % CANCEL_CHECK_INTERVAL == 0 {
                self.cancel.check()?;
            }
            let Some(tri) = overlay.triangle(f) else {
                continue;
            };
            let corners = mesh.face_triangle(f);
            let mut merged = tri;
            for k in 0..3 {
                merged[k] = *first.entry(corners[k]).or_insert(tri[k]);
            }
            if merged != tri {
                overlay.set_triangle(mesh, f, merged);
            }
        }
        Ok(())
    }

    /// Copy source values onto destination elements, then relax each island.
    fn transfer_elements(&mut self) -> Result<()> {
        self.cancel.check()?;
        if self.grid.is_none() {
            self.build_grid();
        }

        let source = self.source;
        let smesh = source.mesh();
        let soverlay = source.layer(self.source_layer);

        let mut mappings: BTreeMap<(ElementId<I>, ElementId<I>), usize> = BTreeMap::new();
        let mut walked: HashSet<ElementId<I>> = HashSet::new();
        {
            let dmesh = self.destination.mesh();
            let doverlay = self.destination.layer(self.layer);
            for (count, path) in self.seam_paths.iter().enumerate() {
                if count % CANCEL_CHECK_INTERVAL == 0 {
                    self.cancel.check()?;
                }
                let [a, b] = path.source_vertices;
                for sf in smesh.edge_faces(path.source_edge) {
                    if !sf.is_valid() {
                        continue;
                    }
                    let forward = runs_forward(smesh, sf, a, b);
                    for end in 0..2 {
                        let sv = path.source_vertices[end];
                        let (from, to) = path.end_edges[end];
                        let Some(de) = dmesh.find_edge(from, to) else {
                            continue;
                        };
                        let Some(df) = dmesh
                            .edge_faces(de)
                            .into_iter()
                            .find(|&df| df.is_valid() && runs_forward(dmesh, df, from, to) == forward)
                        else {
                            continue;
                        };
                        let (Some(se), Some(de)) = (
                            soverlay.element_at(smesh, sf, sv),
                            doverlay.element_at(dmesh, df, path.destination_vertex(end)),
                        ) else {
                            continue;
                        };
                        *mappings.entry((de, se)).or_insert(0) += 1;
                        walked.insert(se);
                    }
                }
            }
        }

        let mut pinned: HashSet<ElementId<I>> = HashSet::new();
        let mut rejected = 0;
        {
            let (_, doverlay) = self.destination.layer_parts_mut(self.layer);
            for (&(de, se), &count) in &mappings {
                if count >= 2 || self.boundary_elements.contains(&se) {
                    doverlay.set_uv(de, soverlay.uv(se));
                    pinned.insert(de);
                } else {
                    rejected += 1;
                }
            }
        }

        let source_faces: Vec<FaceId<I>> = match &self.options.source_faces {
            Some(faces) => faces.clone(),
            None => soverlay.set_triangle_ids().collect(),
        };
        let interior: Vec<(ElementId<I>, VertexId<I>)> = face_elements(soverlay, &source_faces)
            .into_iter()
            .filter(|e| !walked.contains(e))
            .filter_map(|e| {
                self.destination_vertex(soverlay.parent_vertex(e))
                    .map(|dv| (e, dv))
            })
            .collect();
        let mut ambiguous = 0;
        {
            let (dmesh, doverlay) = self.destination.layer_parts_mut(self.layer);
            for (se, dv) in interior {
                let elements = doverlay.vertex_elements(dmesh, dv);
                match elements.as_slice() {
                    [de] => {
                        doverlay.set_uv(*de, soverlay.uv(se));
                        pinned.insert(*de);
                    }
                    [] => {}
                    _ => ambiguous += 1,
                }
            }
        }

        self.cancel.check()?;
        let islands = {
            let dmesh = self.destination.mesh();
            let doverlay = self.destination.layer(self.layer);
            uv_islands(dmesh, doverlay, self.options.destination_faces.as_deref())
        };
        let options = ConformalOptions::default()
            .with_reuse_existing_topology(true)
            .with_pinned_elements(pinned);
        let mut editor = UvEditor::new(&mut *self.destination, self.layer, false)?;
        let mut failed = 0;
        for island in &islands {
            if let Err(err) = editor.set_triangle_uvs_from_conformal(island, &options, None) {
                log::warn!("uv transfer: island of {} faces not relaxed: {}", island.len(), err);
                failed += 1;
            }
        }

        self.state = TransferState::ElementsTransferred;
        log::debug!(
            "uv transfer: {} mappings ({} rejected), {} ambiguous vertices, {} islands",
            mappings.len(),
            rejected,
            ambiguous,
            islands.len()
        );
        MeshError::check_coverage(failed, islands.len())
    }
}

/// Whether face `f` traverses its edge `a`-`b` in the direction `a -> b`.
fn runs_forward<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, f: FaceId<I>, a: VertexId<I>, b: VertexId<I>) -> bool {
    mesh.face_corner(f, a)
        .map(|k| mesh.face_triangle(f)[(k + 1) % 3] == b)
        .unwrap_or(false)
}

/// Shortest destination vertex path between the images of a source edge.
///
/// With a similarity weight, each half-edge also pays the integral of its
/// squared distance to the source edge's line, scaled by the squared
/// destination diagonal.
fn seam_path<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    line: [&Point3<f64>; 2],
    ends: [VertexId<I>; 2],
    options: &TransferOptions<I>,
    diagonal: f64,
) -> Option<Vec<VertexId<I>>> {
    let [pa, pb] = line;
    let length = (pb - pa).norm();
    let weight = options.path_similarity_weight;
    let max_distance =
        (length * options.path_length_tolerance * (1.0 + weight)).max(options.min_path_search_distance);

    let direction = if length > f64::EPSILON {
        (pb - pa) / length
    } else {
        Vector3::zeros()
    };
    let offset = |p: &Point3<f64>| {
        let d = p - pa;
        d - direction * d.dot(&direction)
    };
    let scale = diagonal * diagonal;

    let search = DijkstraOptions::default()
        .with_predecessors(true)
        .with_max_distance(max_distance)
        .with_target(ends[1].index());
    let result = dijkstra_weighted(mesh, &[(ends[0], 0.0)], &search, |he| {
        let l = mesh.halfedge_length(he);
        if weight <= 0.0 {
            return l;
        }
        let d0 = offset(mesh.position(mesh.origin(he)));
        let d1 = offset(mesh.position(mesh.dest(he)));
        l + weight * l * (d0.norm_squared() + d0.dot(&d1) + d1.norm_squared()) / (3.0 * scale)
    });

    let path = result.path_to(ends[1])?;
    (path.len() >= 2).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;
    use crate::test_meshes::{grid_mesh, square_mesh};

    fn seam_count(mesh: &UvMesh) -> usize {
        let overlay = mesh.uv_layer(0).unwrap();
        mesh.mesh()
            .edge_ids()
            .filter(|&e| overlay.is_seam_edge(mesh.mesh(), e))
            .count()
    }

    fn per_triangle_source(mesh: HalfEdgeMesh) -> UvMesh {
        let mut source = UvMesh::new(mesh);
        UvEditor::new(&mut source, 0, false)
            .unwrap()
            .set_per_triangle_uvs(None, 1.0, None)
            .unwrap();
        source
    }

    fn per_vertex_destination(mesh: HalfEdgeMesh) -> UvMesh {
        let mut destination = UvMesh::new(mesh);
        UvEditor::new(&mut destination, 0, false)
            .unwrap()
            .set_per_vertex_uvs(None);
        destination
    }

    #[test]
    fn test_diagonal_seam_transferred() {
        let source = per_triangle_source(square_mesh());
        let mut destination = per_vertex_destination(square_mesh());
        {
            let mut transfer =
                UvTransfer::new(&source, 0, &mut destination, 0, TransferOptions::default()).unwrap();
            transfer.transfer_seams().unwrap();
            assert_eq!(transfer.state(), TransferState::SeamsTransferred);
        }

        let mesh = destination.mesh();
        let overlay = destination.uv_layer(0).unwrap();
        let diagonal = mesh.find_edge(VertexId::new(0), VertexId::new(2)).unwrap();
        assert!(overlay.is_seam_edge(mesh, diagonal));
        assert_eq!(seam_count(&destination), 1);
        assert_eq!(uv_islands(mesh, overlay, None).len(), 2);
        for (v, expected) in [(0, 2), (1, 1), (2, 2), (3, 1)] {
            assert_eq!(overlay.vertex_elements(mesh, VertexId::new(v)).len(), expected);
        }
    }

    fn is_seam(mesh: &UvMesh, a: usize, b: usize) -> bool {
        let e = mesh.mesh().find_edge(VertexId::new(a), VertexId::new(b)).unwrap();
        mesh.uv_layer(0).unwrap().is_seam_edge(mesh.mesh(), e)
    }

    #[test]
    fn test_destination_selection_limits_cut_edges() {
        // The source diagonal maps onto the path 0-5-10-15 of a 3x3 grid.
        let source = per_triangle_source(grid_mesh(1));

        let mut everywhere = per_vertex_destination(grid_mesh(3));
        UvTransfer::new(&source, 0, &mut everywhere, 0, TransferOptions::default())
            .unwrap()
            .transfer_seams()
            .unwrap();
        assert!(is_seam(&everywhere, 0, 5));
        assert!(is_seam(&everywhere, 10, 15));

        let mut corner = per_vertex_destination(grid_mesh(3));
        let options = TransferOptions::default().with_destination_faces(vec![FaceId::new(0), FaceId::new(1)]);
        UvTransfer::new(&source, 0, &mut corner, 0, options)
            .unwrap()
            .transfer_seams()
            .unwrap();
        assert!(is_seam(&corner, 0, 5));
        assert!(!is_seam(&corner, 10, 15));
        let mesh = corner.mesh();
        let overlay = corner.uv_layer(0).unwrap();
        assert!(overlay.is_valid(mesh));
        for v in mesh.vertex_ids() {
            for e in overlay.vertex_elements(mesh, v) {
                assert!(!overlay.is_bowtie(mesh, e));
            }
        }
    }

    #[test]
    fn test_source_selection_limits_transferred_seams() {
        let source = per_triangle_source(grid_mesh(2));
        let mut destination = per_vertex_destination(grid_mesh(2));
        let options = TransferOptions::default().with_source_faces(vec![FaceId::new(0), FaceId::new(1)]);
        UvTransfer::new(&source, 0, &mut destination, 0, options)
            .unwrap()
            .transfer_seams()
            .unwrap();

        // Only the three interior edges of the first cell are cut.
        assert_eq!(seam_count(&destination), 3);
        for (a, b) in [(1, 4), (0, 4), (3, 4)] {
            assert!(is_seam(&destination, a, b));
        }
        let mesh = destination.mesh();
        assert_eq!(uv_islands(mesh, destination.uv_layer(0).unwrap(), None).len(), 3);
    }

    #[test]
    fn test_seam_reset_respects_destination_selection() {
        let source = per_vertex_destination(grid_mesh(2));

        let mut whole = per_triangle_source(grid_mesh(2));
        UvTransfer::new(&source, 0, &mut whole, 0, TransferOptions::default())
            .unwrap()
            .transfer_seams()
            .unwrap();
        assert_eq!(seam_count(&whole), 0);
        assert_eq!(uv_islands(whole.mesh(), whole.uv_layer(0).unwrap(), None).len(), 1);

        let mut partial = per_triangle_source(grid_mesh(2));
        let options = TransferOptions::default().with_destination_faces(vec![FaceId::new(0), FaceId::new(1)]);
        UvTransfer::new(&source, 0, &mut partial, 0, options)
            .unwrap()
            .transfer_seams()
            .unwrap();
        // The two selected triangles merge; the other six stay separate.
        let mesh = partial.mesh();
        let overlay = partial.uv_layer(0).unwrap();
        assert!(overlay.is_valid(mesh));
        assert_eq!(uv_islands(mesh, overlay, None).len(), 7);
        assert!(!is_seam(&partial, 0, 4));
    }

    #[test]
    fn test_cancelled_before_start_leaves_destination() {
        let source = per_triangle_source(square_mesh());
        let mut destination = per_triangle_source(square_mesh());
        let before = destination.clone();

        let cancel = Cancellation::new();
        cancel.cancel();
        {
            let mut transfer =
                UvTransfer::new(&source, 0, &mut destination, 0, TransferOptions::default())
                    .unwrap()
                    .with_cancellation(cancel.clone());
            assert!(matches!(transfer.transfer_seams(), Err(MeshError::Cancelled)));
            assert!(matches!(transfer.transfer_seams_and_uvs(), Err(MeshError::Cancelled)));
            assert_eq!(transfer.state(), TransferState::Unconfigured);
        }

        let old = before.uv_layer(0).unwrap();
        let new = destination.uv_layer(0).unwrap();
        assert_eq!(old.element_count(), new.element_count());
        for f in destination.mesh().face_ids() {
            assert_eq!(old.triangle(f), new.triangle(f));
        }
        for e in old.element_ids() {
            assert_eq!(old.uv(e), new.uv(e));
        }
    }

    #[test]
    fn test_unmatched_vertices_reported() {
        let shifted: Vec<Point3<f64>> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(x, y)| Point3::new(x + 5.0, y, 0.0))
            .collect();
        let source = per_triangle_source(build_from_triangles(&shifted, &[[0, 1, 2], [0, 2, 3]]).unwrap());
        let mut destination = per_vertex_destination(square_mesh());

        let mut transfer =
            UvTransfer::new(&source, 0, &mut destination, 0, TransferOptions::default()).unwrap();
        let err = transfer.transfer_seams().unwrap_err();
        assert!(matches!(err, MeshError::IncompleteCoverage { failed: 1, total: 1 }));
        drop(transfer);
        assert_eq!(seam_count(&destination), 0);
    }

    #[test]
    fn test_seams_and_uvs_onto_denser_grid() {
        let source = per_triangle_source(grid_mesh(1));
        let mut destination = per_vertex_destination(grid_mesh(2));
        {
            let options = TransferOptions::default().with_path_similarity_weight(1.0);
            let mut transfer = UvTransfer::new(&source, 0, &mut destination, 0, options).unwrap();
            transfer.transfer_seams_and_uvs().unwrap();
            assert_eq!(transfer.state(), TransferState::ElementsTransferred);
        }

        assert_eq!(seam_count(&destination), 2);
        let mesh = destination.mesh();
        let overlay = destination.uv_layer(0).unwrap();
        assert_eq!(uv_islands(mesh, overlay, None).len(), 2);

        for f in mesh.face_ids() {
            let tri = overlay.triangle(f).unwrap();
            let p = mesh.face_positions(f);
            for k in 0..3 {
                let uv_len = (overlay.uv(tri[k]) - overlay.uv(tri[(k + 1) % 3])).norm();
                let len = (p[k] - p[(k + 1) % 3]).norm();
                assert!((uv_len - len).abs() < 1e-6, "face {:?}: {} vs {}", f, uv_len, len);
            }
        }

        let smesh = source.mesh();
        let soverlay = source.uv_layer(0).unwrap();
        let corner = VertexId::new(0);
        for sf in smesh.vertex_faces(corner) {
            let expected = soverlay.uv(soverlay.element_at(smesh, sf, corner).unwrap());
            let lower = smesh.face_centroid(sf).x > smesh.face_centroid(sf).y;
            let df = mesh
                .vertex_faces(corner)
                .find(|&df| (mesh.face_centroid(df).x > mesh.face_centroid(df).y) == lower)
                .unwrap();
            let got = overlay.uv(overlay.element_at(mesh, df, corner).unwrap());
            assert!((got - expected).norm() < 1e-6);
        }
    }
}
