//! Seam editing: cutting, joining, islands and bowties.

use std::collections::HashSet;

use super::{note, UvEditResult, UvEditor};
use crate::error::{MeshError, Result};
use crate::mesh::{EdgeId, ElementId, FaceId, MeshIndex, UnionFind, VertexId};

impl<I: MeshIndex> UvEditor<'_, I> {
    /// Cut the UVs along `edges` so that each becomes a seam.
    ///
    /// An interior vertex whose only break would be a single cut spoke is
    /// also cut along its most opposite spoke. These extra spokes are chosen
    /// for every endpoint before anything is split. Around every endpoint the
    /// faces are then regrouped into fans separated by cut spokes and
    /// existing seams, and each fan that shares its element with an earlier
    /// fan gets a copy. Mesh boundary edges are skipped.
    pub fn create_seams_at_edges(
        &mut self,
        edges: &[EdgeId<I>],
        mut result: Option<&mut UvEditResult<I>>,
    ) -> Result<()> {
        let mesh = self.mesh();
        let requested: HashSet<EdgeId<I>> = edges
            .iter()
            .copied()
            .filter(|&e| !mesh.edge_is_boundary(e))
            .collect();
        let mut endpoints: Vec<VertexId<I>> = requested.iter().flat_map(|&e| mesh.edge_vertices(e)).collect();
        endpoints.sort_unstable();
        endpoints.dedup();

        let pivots: Vec<EdgeId<I>> = endpoints
            .iter()
            .filter_map(|&v| self.pivot_spoke(v, &requested))
            .collect();
        let mut cut = requested;
        cut.extend(pivots.iter().copied());

        let mesh = self.mesh();
        let mut vertices: Vec<VertexId<I>> = cut.iter().flat_map(|&e| mesh.edge_vertices(e)).collect();
        vertices.sort_unstable();
        vertices.dedup();

        let mut created = 0;
        for &v in &vertices {
            created += self.split_vertex_fans(v, &cut, &mut result);
        }

        let (mesh, overlay) = self.parts_mut();
        let mut leftover = Vec::new();
        let repaired = overlay.split_bowties_at_vertices(mesh, &vertices, Some(&mut leftover));
        for e in leftover {
            note(&mut result, e);
        }
        log::debug!(
            "created seams at {} edges ({} extra spokes), {} new elements",
            cut.len(),
            pivots.len(),
            created + repaired
        );
        Ok(())
    }

    /// The spoke opposite the single cut spoke at an interior vertex whose
    /// ring is otherwise connected in UV space.
    fn pivot_spoke(&self, v: VertexId<I>, cut: &HashSet<EdgeId<I>>) -> Option<EdgeId<I>> {
        let (mesh, overlay) = (self.mesh(), self.overlay());
        if mesh.is_boundary_vertex(v) {
            return None;
        }
        let spokes: Vec<EdgeId<I>> = mesh.vertex_edges(v).collect();
        let mut cut_spokes = spokes.iter().copied().filter(|e| cut.contains(e));
        let only = cut_spokes.next()?;
        if cut_spokes.next().is_some()
            || !spokes
                .iter()
                .all(|&s| s == only || overlay.is_uv_connected(mesh, s))
        {
            return None;
        }

        let direction = |s: EdgeId<I>| {
            let [a, b] = mesh.edge_vertices(s);
            let other = if a == v { b } else { a };
            (mesh.position(other) - mesh.position(v)).normalize()
        };
        let d0 = direction(only);
        spokes
            .iter()
            .copied()
            .filter(|&s| s != only)
            .min_by(|&a, &b| d0.dot(&direction(a)).total_cmp(&d0.dot(&direction(b))))
    }

    fn split_vertex_fans(
        &mut self,
        v: VertexId<I>,
        cut: &HashSet<EdgeId<I>>,
        result: &mut Option<&mut UvEditResult<I>>,
    ) -> usize {
        let (mesh, overlay) = self.parts_mut();
        let faces: Vec<FaceId<I>> = mesh
            .vertex_faces(v)
            .filter(|&f| overlay.is_set_triangle(f))
            .collect();
        if faces.len() < 2 {
            return 0;
        }

        let spokes: Vec<EdgeId<I>> = mesh.vertex_edges(v).collect();
        let mut fans = UnionFind::new(faces.len());
        for &s in &spokes {
            if cut.contains(&s) || !overlay.is_uv_connected(mesh, s) {
                continue;
            }
            let [f0, f1] = mesh.edge_faces(s);
            if let (Some(i), Some(j)) = (
                faces.iter().position(|&f| f == f0),
                faces.iter().position(|&f| f == f1),
            ) {
                fans.union(i, j);
            }
        }

        let mut owned: HashSet<ElementId<I>> = HashSet::new();
        let mut created = 0;
        for group in fans.groups() {
            let Some(e) = overlay.element_at(mesh, faces[group[0]], v) else {
                continue;
            };
            if owned.insert(e) {
                continue;
            }
            let copy = overlay.append_element(overlay.uv(e), v);
            note(result, copy);
            created += 1;
            for i in group {
                let f = faces[i];
                if let (Some(mut tri), Some(k)) = (overlay.triangle(f), mesh.face_corner(f, v)) {
                    tri[k] = copy;
                    overlay.set_triangle(mesh, f, tri);
                }
            }
        }
        created
    }

    /// Join the UVs across `edges` wherever they are currently seams.
    pub fn remove_seams_at_edges(&mut self, edges: &[EdgeId<I>]) -> Result<()> {
        let (mesh, overlay) = self.parts_mut();
        let mut merged = 0;
        for &e in edges {
            if overlay.is_seam_edge(mesh, e) && overlay.merge_elements_at_edge(mesh, e) {
                merged += 1;
            }
        }
        log::debug!("removed seams at {} of {} edges", merged, edges.len());
        Ok(())
    }

    /// Turn `faces` into standalone UV islands.
    ///
    /// Unset faces first get zero UVs. Edges leading out of the set are cut
    /// and seams inside it are joined, cuts first. Elements created by the
    /// cuts and freed by the joins are left out of `result`. Faces around
    /// every reclassified edge are appended to `changed`; nothing is appended
    /// when no edge needed reclassification.
    pub fn make_island(
        &mut self,
        faces: &[FaceId<I>],
        mut result: Option<&mut UvEditResult<I>>,
        changed: Option<&mut Vec<FaceId<I>>>,
    ) -> Result<()> {
        if faces.is_empty() {
            return Err(MeshError::EmptySelection);
        }
        self.ensure_uvs_set(faces, result.as_deref_mut(), None)?;

        let (to_cut, to_join) = {
            let (mesh, overlay) = (self.mesh(), self.overlay());
            let in_set: HashSet<FaceId<I>> = faces.iter().copied().collect();
            let mut processed: HashSet<EdgeId<I>> = HashSet::new();
            let (mut to_cut, mut to_join) = (Vec::new(), Vec::new());
            for &f in faces {
                for e in mesh.face_edges(f) {
                    if !processed.insert(e) {
                        continue;
                    }
                    let g = mesh.opposite_face(e, f);
                    if !g.is_valid() {
                        continue;
                    }
                    let seam = overlay.is_seam_edge(mesh, e);
                    if !in_set.contains(&g) && !seam {
                        to_cut.push(e);
                    } else if in_set.contains(&g) && seam {
                        to_join.push(e);
                    }
                }
            }
            (to_cut, to_join)
        };
        if to_cut.is_empty() && to_join.is_empty() {
            return Ok(());
        }

        if let Some(changed) = changed {
            let mesh = self.mesh();
            let mut touched: HashSet<FaceId<I>> = HashSet::new();
            for &e in to_cut.iter().chain(&to_join) {
                for v in mesh.edge_vertices(e) {
                    touched.extend(mesh.vertex_faces(v));
                }
            }
            let mut touched: Vec<FaceId<I>> = touched.into_iter().collect();
            touched.sort_unstable();
            changed.extend(touched);
        }

        let mut created = UvEditResult::new();
        let outcome = self
            .create_seams_at_edges(&to_cut, Some(&mut created))
            .and_then(|()| self.remove_seams_at_edges(&to_join));

        let overlay = self.overlay();
        created.new_elements.retain(|&e| overlay.is_element(e));
        for e in created.new_elements {
            note(&mut result, e);
        }
        outcome
    }

    /// Split every bowtie element of the active layer. Returns the number of
    /// elements created.
    pub fn split_bowties(&mut self, mut result: Option<&mut UvEditResult<I>>) -> usize {
        let (mesh, overlay) = self.parts_mut();
        let mut created = Vec::new();
        let count = overlay.split_bowties(mesh, Some(&mut created));
        for e in created {
            note(&mut result, e);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{uv_islands, UvMesh};
    use crate::test_meshes::grid_mesh;

    fn vertex(n: usize, i: usize, j: usize) -> VertexId {
        VertexId::new(j * (n + 1) + i)
    }

    fn no_bowties_around(editor: &UvEditor<'_>, vertices: &[VertexId]) -> bool {
        let (mesh, overlay) = (editor.mesh(), editor.overlay());
        vertices.iter().all(|&v| {
            overlay
                .vertex_elements(mesh, v)
                .into_iter()
                .all(|e| !overlay.is_bowtie(mesh, e))
        })
    }

    #[test]
    fn test_single_interior_edge_becomes_seam_without_bowtie() {
        let n = 4;
        let mut uv_mesh = UvMesh::new(grid_mesh(n));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        editor.set_per_vertex_uvs(None);

        let (a, b) = (vertex(n, 1, 2), vertex(n, 2, 2));
        let edge = editor.mesh().find_edge(a, b).unwrap();
        let mut result = UvEditResult::new();
        editor.create_seams_at_edges(&[edge], Some(&mut result)).unwrap();

        assert!(editor.overlay().is_seam_edge(editor.mesh(), edge));
        assert!(!result.new_elements.is_empty());
        assert!(no_bowties_around(&editor, &[a, b]));
        assert!(editor.overlay().is_valid(editor.mesh()));
    }

    fn cut_and_check(n: usize, cut: &[(usize, usize)]) {
        let mut uv_mesh = UvMesh::new(grid_mesh(n));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        editor.set_per_vertex_uvs(None);
        let edges: Vec<EdgeId> = cut
            .iter()
            .map(|&(a, b)| editor.mesh().find_edge(VertexId::new(a), VertexId::new(b)).unwrap())
            .collect();
        editor.create_seams_at_edges(&edges, None).unwrap();

        let (mesh, overlay) = (editor.mesh(), editor.overlay());
        assert!(overlay.is_valid(mesh));
        for &e in &edges {
            assert!(overlay.is_seam_edge(mesh, e), "{:?} not a seam after cutting {:?}", e, cut);
        }
        for e in overlay.element_ids() {
            assert!(!overlay.is_bowtie(mesh, e), "bowtie at {:?} after cutting {:?}", e, cut);
        }
    }

    #[test]
    fn test_nearby_cuts_leave_no_bowties() {
        cut_and_check(6, &[(33, 40), (36, 43), (38, 37)]);

        let mesh = grid_mesh(4);
        let interior: Vec<(usize, usize)> = mesh
            .edge_ids()
            .filter(|&e| !mesh.edge_is_boundary(e))
            .map(|e| {
                let [a, b] = mesh.edge_vertices(e);
                (a.index(), b.index())
            })
            .collect();
        for (i, &first) in interior.iter().enumerate() {
            for &second in &interior[i + 1..] {
                cut_and_check(4, &[first, second]);
            }
        }
        for window in interior.windows(3) {
            cut_and_check(4, window);
        }
    }

    #[test]
    fn test_cut_path_across_grid() {
        let n = 4;
        let mut uv_mesh = UvMesh::new(grid_mesh(n));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        editor.set_per_vertex_uvs(None);

        let path: Vec<VertexId> = (0..=n).map(|j| vertex(n, 2, j)).collect();
        let edges: Vec<EdgeId> = path
            .windows(2)
            .map(|w| editor.mesh().find_edge(w[0], w[1]).unwrap())
            .collect();
        editor.create_seams_at_edges(&edges, None).unwrap();

        let (mesh, overlay) = (editor.mesh(), editor.overlay());
        assert!(edges.iter().all(|&e| overlay.is_seam_edge(mesh, e)));
        assert_eq!(uv_islands(mesh, overlay, None).len(), 2);
        assert!(no_bowties_around(&editor, &path));
    }

    #[test]
    fn test_remove_seams_joins_triangles() {
        let mut uv_mesh = UvMesh::new(grid_mesh(3));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        editor.set_per_triangle_uvs(None, 1.0, None).unwrap();
        let interior: Vec<EdgeId> = editor
            .mesh()
            .edge_ids()
            .filter(|&e| !editor.mesh().edge_is_boundary(e))
            .collect();
        editor.remove_seams_at_edges(&interior).unwrap();

        let (mesh, overlay) = (editor.mesh(), editor.overlay());
        assert_eq!(uv_islands(mesh, overlay, None).len(), 1);
        assert_eq!(overlay.element_count(), mesh.num_vertices());
    }

    #[test]
    fn test_make_island_is_idempotent() {
        let n = 4;
        let mut uv_mesh = UvMesh::new(grid_mesh(n));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        editor.set_per_vertex_uvs(None);
        let left: Vec<FaceId> = editor
            .mesh()
            .face_ids()
            .filter(|&f| editor.mesh().face_centroid(f).x < 0.5)
            .collect();

        let mut changed = Vec::new();
        let mut result = UvEditResult::new();
        editor.make_island(&left, Some(&mut result), Some(&mut changed)).unwrap();
        assert!(!changed.is_empty());
        assert!(result.new_elements.iter().all(|&e| editor.overlay().is_element(e)));
        assert_eq!(uv_islands(editor.mesh(), editor.overlay(), None).len(), 2);

        let mut changed_again = Vec::new();
        editor.make_island(&left, None, Some(&mut changed_again)).unwrap();
        assert!(changed_again.is_empty());
    }

    #[test]
    fn test_make_island_joins_per_triangle_faces() {
        let mut uv_mesh = UvMesh::new(grid_mesh(3));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        editor.set_per_triangle_uvs(None, 1.0, None).unwrap();
        let bottom: Vec<FaceId> = editor
            .mesh()
            .face_ids()
            .filter(|&f| editor.mesh().face_centroid(f).y < 1.0 / 3.0)
            .collect();
        editor.make_island(&bottom, None, None).unwrap();

        let islands = uv_islands(editor.mesh(), editor.overlay(), None);
        assert_eq!(islands.len(), 1 + (18 - bottom.len()));
        assert!(islands.iter().any(|island| island.len() == bottom.len()));
        assert!(matches!(editor.make_island(&[], None, None), Err(MeshError::EmptySelection)));
    }

    #[test]
    fn test_split_bowties() {
        let mut uv_mesh = UvMesh::new(grid_mesh(2));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        editor.set_per_vertex_uvs(None);
        let center = VertexId::new(4);
        let around: Vec<FaceId> = editor.mesh().vertex_faces(center).collect();
        assert_eq!(around.len(), 6);
        // Keep two opposite faces of the ring; they share only the centre.
        let kept = [around[0], around[3]];
        let cleared: Vec<FaceId> = editor
            .mesh()
            .face_ids()
            .filter(|f| !kept.contains(f))
            .collect();
        editor.reset_uvs_for(&cleared);
        assert!(editor.overlay().is_bowtie(editor.mesh(), ElementId::new(4)));

        let mut result = UvEditResult::new();
        assert_eq!(editor.split_bowties(Some(&mut result)), 1);
        assert_eq!(result.new_elements.len(), 1);
        assert!(!editor.overlay().is_bowtie(editor.mesh(), ElementId::new(4)));
        assert_eq!(editor.split_bowties(None), 0);
    }
}
