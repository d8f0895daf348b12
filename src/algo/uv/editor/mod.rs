//! The UV editor: every UV generating and editing operation on one layer.
//!
//! A [`UvEditor`] borrows a [`UvMesh`] and edits one of its layers, the
//! *active* layer. Operations are grouped by concern:
//!
//! - this module: binding, layer management, resets, copies, per-vertex and
//!   per-triangle UVs
//! - [`projection`](self#projections): planar, box and cylinder projections
//!   and projection from another mesh
//! - exponential map and conformal unwraps
//! - seam editing and island creation
//! - area scaling, fitting, orientation and packing
//!
//! Fallible operations return [`Result`]. When an operation fails part way,
//! whatever it already wrote to the overlay stays there.

mod layout;
mod parameterize;
mod projection;
mod seams;

use std::collections::HashMap;

use nalgebra::Point2;

use crate::error::{MeshError, Result};
use crate::geom::Frame3;
use crate::mesh::{
    ElementId, FaceId, HalfEdgeMesh, MeshIndex, UvLayerHandle, UvMesh, UvOverlay, VertexId,
    MAX_UV_LAYERS,
};

pub use parameterize::{ConformalOptions, ExpMapOptions};
pub use projection::ProjectionTransferOptions;

/// Elements created by an editing operation.
///
/// Operations append to `new_elements` as they go, so a failed operation
/// still lists whatever it created before failing.
#[derive(Debug, Clone, Default)]
pub struct UvEditResult<I: MeshIndex = u32> {
    /// Newly created (or, for conformal maps on existing topology, rewritten) elements.
    pub new_elements: Vec<ElementId<I>>,
}

impl<I: MeshIndex> UvEditResult<I> {
    /// Create an empty result.
    pub fn new() -> Self {
        Self {
            new_elements: Vec::new(),
        }
    }
}

fn note<I: MeshIndex>(result: &mut Option<&mut UvEditResult<I>>, e: ElementId<I>) {
    if let Some(r) = result.as_deref_mut() {
        r.new_elements.push(e);
    }
}

/// Editor bound to one UV layer of a [`UvMesh`].
///
/// # Example
///
/// ```
/// use morsel_uv::prelude::*;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
/// let mut uv_mesh = UvMesh::new(mesh);
///
/// let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
/// let mut result = UvEditResult::new();
/// assert!(editor.set_per_vertex_uvs(Some(&mut result)));
/// assert_eq!(result.new_elements.len(), 4);
/// ```
#[derive(Debug)]
pub struct UvEditor<'a, I: MeshIndex = u32> {
    uv_mesh: &'a mut UvMesh<I>,
    layer: usize,
}

impl<'a, I: MeshIndex> UvEditor<'a, I> {
    /// Bind to `layer` of `uv_mesh`.
    ///
    /// Missing layers are created when `create_if_missing` is set, up to
    /// [`MAX_UV_LAYERS`].
    pub fn new(uv_mesh: &'a mut UvMesh<I>, layer: usize, create_if_missing: bool) -> Result<Self> {
        if layer >= uv_mesh.num_uv_layers() {
            if !create_if_missing || layer >= MAX_UV_LAYERS {
                return Err(MeshError::InvalidUvLayer {
                    layer,
                    count: uv_mesh.num_uv_layers(),
                    max: MAX_UV_LAYERS,
                });
            }
            uv_mesh.set_num_uv_layers(layer + 1)?;
        }
        Ok(Self { uv_mesh, layer })
    }

    /// Bind to the layer a handle names; handles from other meshes are rejected.
    pub fn from_handle(uv_mesh: &'a mut UvMesh<I>, handle: UvLayerHandle) -> Result<Self> {
        let layer = uv_mesh.resolve_handle(handle)?;
        Ok(Self { uv_mesh, layer })
    }

    /// The mesh being edited.
    #[inline]
    pub fn mesh(&self) -> &HalfEdgeMesh<I> {
        self.uv_mesh.mesh()
    }

    /// The active UV layer.
    #[inline]
    pub fn overlay(&self) -> &UvOverlay<I> {
        self.uv_mesh.layer(self.layer)
    }

    /// Index of the active UV layer.
    #[inline]
    pub fn active_layer(&self) -> usize {
        self.layer
    }

    #[inline]
    fn parts_mut(&mut self) -> (&HalfEdgeMesh<I>, &mut UvOverlay<I>) {
        self.uv_mesh.layer_parts_mut(self.layer)
    }

    fn all_faces(&self) -> Vec<FaceId<I>> {
        self.mesh().face_ids().collect()
    }

    // ==================== Layers ====================

    /// Make another existing layer the active one.
    pub fn switch_active_layer(&mut self, layer: usize) -> Result<()> {
        self.uv_mesh.check_layer(layer)?;
        self.layer = layer;
        Ok(())
    }

    /// Append a layer filled with per-triangle UVs and return its index.
    ///
    /// The active layer does not change.
    pub fn add_uv_layer(&mut self) -> Result<usize> {
        let added = self.uv_mesh.add_uv_layer()?;
        let active = self.layer;
        self.layer = added;
        let filled = self.set_per_triangle_uvs(None, 1.0, None);
        self.layer = active;
        filled?;
        Ok(added)
    }

    /// Remove the active layer.
    ///
    /// Later layers shift down by one. Afterwards the active layer is the one
    /// that moved into the removed slot, or the new last layer.
    pub fn remove_uv_layer(&mut self) -> Result<()> {
        self.uv_mesh.remove_uv_layer(self.layer)?;
        self.layer = self.layer.min(self.uv_mesh.num_uv_layers() - 1);
        Ok(())
    }

    // ==================== Reset and copy ====================

    /// Remove every element and every UV assignment of the active layer.
    pub fn reset_uvs(&mut self) {
        let (_, overlay) = self.parts_mut();
        overlay.clear_elements();
    }

    /// Remove the UV assignment of `faces`. Their elements are freed once unused.
    pub fn reset_uvs_for(&mut self, faces: &[FaceId<I>]) {
        let (_, overlay) = self.parts_mut();
        overlay.clear_triangles(faces.iter().copied());
    }

    /// Replace the active layer with a copy of layer `source`.
    ///
    /// Copying a layer onto itself does nothing.
    pub fn copy_from_layer(&mut self, source: usize) -> Result<()> {
        if source == self.layer {
            return Ok(());
        }
        self.uv_mesh.check_layer(source)?;
        let Some((mesh, target, source)) = self.uv_mesh.split_uv_layer_pair_mut(self.layer, source)
        else {
            return Err(MeshError::InvalidUvLayer {
                layer: source,
                count: self.uv_mesh.num_uv_layers(),
                max: MAX_UV_LAYERS,
            });
        };

        target.clear_elements();
        let mut map: HashMap<ElementId<I>, ElementId<I>> = HashMap::new();
        for e in source.element_ids() {
            map.insert(e, target.append_element(source.uv(e), source.parent_vertex(e)));
        }
        for f in mesh.face_ids() {
            if let Some(tri) = source.triangle(f) {
                target.set_triangle(mesh, f, tri.map(|e| map[&e]));
            }
        }
        Ok(())
    }

    // ==================== Default UVs ====================

    /// Give every vertex exactly one element at the origin and assign all faces.
    ///
    /// Returns `true` when element ids end up identical to vertex ids.
    pub fn set_per_vertex_uvs(&mut self, mut result: Option<&mut UvEditResult<I>>) -> bool {
        let (mesh, overlay) = self.parts_mut();
        overlay.clear_elements();

        let mut identical = true;
        let mut vertex_elements = Vec::with_capacity(mesh.num_vertices());
        for v in mesh.vertex_ids() {
            let e = overlay.append_element(Point2::origin(), v);
            identical &= e.index() == v.index();
            vertex_elements.push(e);
            note(&mut result, e);
        }
        for f in mesh.face_ids() {
            let tri = mesh.face_triangle(f).map(|v| vertex_elements[v.index()]);
            overlay.set_triangle(mesh, f, tri);
        }

        log::debug!(
            "per-vertex UVs: {} elements, identical ids: {}",
            vertex_elements.len(),
            identical
        );
        identical
    }

    /// Make every face its own island, projected onto the face's plane.
    ///
    /// `faces = None` rebuilds the whole layer. Coordinates are multiplied by
    /// `scale`.
    pub fn set_per_triangle_uvs(
        &mut self,
        faces: Option<&[FaceId<I>]>,
        scale: f64,
        mut result: Option<&mut UvEditResult<I>>,
    ) -> Result<()> {
        let faces: Vec<FaceId<I>> = match faces {
            Some(faces) => faces.to_vec(),
            None => {
                self.reset_uvs();
                self.all_faces()
            }
        };
        if faces.is_empty() {
            return Err(MeshError::EmptySelection);
        }

        let (mesh, overlay) = self.parts_mut();
        overlay.clear_triangles(faces.iter().copied());
        for &f in &faces {
            let frame = Frame3::from_normal(mesh.face_centroid(f), mesh.face_normal(f));
            let tri = mesh.face_triangle(f).map(|v| {
                let uv = frame.to_plane_uv(mesh.position(v)) * scale;
                let e = overlay.append_element(uv, v);
                note(&mut result, e);
                e
            });
            overlay.set_triangle(mesh, f, tri);
        }
        Ok(())
    }

    /// Give unset faces in `faces` zero-valued UVs, leaving set faces alone.
    ///
    /// Vertices are shared among the newly assigned faces only. Changed faces
    /// are appended to `changed` when given.
    pub fn ensure_uvs_set(
        &mut self,
        faces: &[FaceId<I>],
        mut result: Option<&mut UvEditResult<I>>,
        mut changed: Option<&mut Vec<FaceId<I>>>,
    ) -> Result<()> {
        if faces.is_empty() {
            return Err(MeshError::EmptySelection);
        }
        let (mesh, overlay) = self.parts_mut();
        let mut vertex_map: HashMap<VertexId<I>, ElementId<I>> = HashMap::new();
        for &f in faces {
            if overlay.is_set_triangle(f) {
                continue;
            }
            let tri = mesh.face_triangle(f).map(|v| {
                *vertex_map.entry(v).or_insert_with(|| {
                    let e = overlay.append_element(Point2::origin(), v);
                    note(&mut result, e);
                    e
                })
            });
            overlay.set_triangle(mesh, f, tri);
            if let Some(list) = changed.as_deref_mut() {
                list.push(f);
            }
        }
        Ok(())
    }
}
