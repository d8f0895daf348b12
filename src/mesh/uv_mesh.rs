//! A mesh together with its UV layers.

use std::sync::atomic::{AtomicU64, Ordering};

use super::halfedge::HalfEdgeMesh;
use super::index::MeshIndex;
use super::overlay::UvOverlay;
use crate::error::{MeshError, Result};

/// Maximum number of UV layers a [`UvMesh`] can carry.
pub const MAX_UV_LAYERS: usize = 8;

static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

fn next_tag() -> u64 {
    NEXT_TAG.fetch_add(1, Ordering::Relaxed)
}

/// Identifies one UV layer of one particular [`UvMesh`].
///
/// Handles are how callers bind to an overlay object directly; a handle taken
/// from one mesh is rejected by every other mesh, including clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UvLayerHandle {
    tag: u64,
    layer: usize,
}

impl UvLayerHandle {
    /// Layer index this handle refers to.
    pub fn layer(&self) -> usize {
        self.layer
    }
}

/// A half-edge mesh owning between one and [`MAX_UV_LAYERS`] UV overlays.
///
/// Mesh connectivity is fixed once the `UvMesh` is built; only the overlays
/// change.
///
/// # Example
///
/// ```
/// use morsel_uv::mesh::{build_from_triangles, HalfEdgeMesh, UvMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
/// let mut uv_mesh = UvMesh::new(mesh);
/// assert_eq!(uv_mesh.num_uv_layers(), 1);
/// assert_eq!(uv_mesh.add_uv_layer().unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct UvMesh<I: MeshIndex = u32> {
    mesh: HalfEdgeMesh<I>,
    layers: Vec<UvOverlay<I>>,
    tag: u64,
}

impl<I: MeshIndex> Clone for UvMesh<I> {
    fn clone(&self) -> Self {
        Self {
            mesh: self.mesh.clone(),
            layers: self.layers.clone(),
            tag: next_tag(),
        }
    }
}

impl<I: MeshIndex> UvMesh<I> {
    /// Wrap a mesh with a single, empty UV layer.
    pub fn new(mesh: HalfEdgeMesh<I>) -> Self {
        let layers = vec![UvOverlay::new(mesh.num_faces())];
        Self {
            mesh,
            layers,
            tag: next_tag(),
        }
    }

    /// The underlying mesh.
    #[inline]
    pub fn mesh(&self) -> &HalfEdgeMesh<I> {
        &self.mesh
    }

    /// Give up the UV layers and return the mesh.
    pub fn into_mesh(self) -> HalfEdgeMesh<I> {
        self.mesh
    }

    /// Number of UV layers.
    #[inline]
    pub fn num_uv_layers(&self) -> usize {
        self.layers.len()
    }

    /// A UV layer by index.
    pub fn uv_layer(&self, layer: usize) -> Option<&UvOverlay<I>> {
        self.layers.get(layer)
    }

    /// A UV layer by index, mutably.
    pub fn uv_layer_mut(&mut self, layer: usize) -> Option<&mut UvOverlay<I>> {
        self.layers.get_mut(layer)
    }

    /// Borrow the mesh and one UV layer at the same time.
    pub fn split_uv_layer_mut(
        &mut self,
        layer: usize,
    ) -> Option<(&HalfEdgeMesh<I>, &mut UvOverlay<I>)> {
        let Self { mesh, layers, .. } = self;
        layers.get_mut(layer).map(|overlay| (&*mesh, overlay))
    }

    /// Layer `layer`; the index must be valid.
    #[inline]
    pub(crate) fn layer(&self, layer: usize) -> &UvOverlay<I> {
        &self.layers[layer]
    }

    /// The mesh and layer `layer` mutably; the index must be valid.
    #[inline]
    pub(crate) fn layer_parts_mut(&mut self, layer: usize) -> (&HalfEdgeMesh<I>, &mut UvOverlay<I>) {
        (&self.mesh, &mut self.layers[layer])
    }

    /// Borrow the mesh, one layer mutably and another layer immutably.
    pub(crate) fn split_uv_layer_pair_mut(
        &mut self,
        layer: usize,
        other: usize,
    ) -> Option<(&HalfEdgeMesh<I>, &mut UvOverlay<I>, &UvOverlay<I>)> {
        if layer == other || layer >= self.layers.len() || other >= self.layers.len() {
            return None;
        }
        let Self { mesh, layers, .. } = self;
        let (target, source) = if layer < other {
            let (head, tail) = layers.split_at_mut(other);
            (&mut head[layer], &tail[0])
        } else {
            let (head, tail) = layers.split_at_mut(layer);
            (&mut tail[0], &head[other])
        };
        Some((&*mesh, target, source))
    }

    /// A handle naming one of this mesh's layers.
    pub fn layer_handle(&self, layer: usize) -> Option<UvLayerHandle> {
        (layer < self.layers.len()).then_some(UvLayerHandle {
            tag: self.tag,
            layer,
        })
    }

    /// Resolve a handle to a layer index, rejecting handles from other meshes.
    pub fn resolve_handle(&self, handle: UvLayerHandle) -> Result<usize> {
        if handle.tag != self.tag {
            return Err(MeshError::ForeignOverlay);
        }
        self.check_layer(handle.layer)?;
        Ok(handle.layer)
    }

    /// Append an empty UV layer and return its index.
    pub fn add_uv_layer(&mut self) -> Result<usize> {
        if self.layers.len() >= MAX_UV_LAYERS {
            return Err(MeshError::UvLayerLimit { max: MAX_UV_LAYERS });
        }
        self.layers.push(UvOverlay::new(self.mesh.num_faces()));
        Ok(self.layers.len() - 1)
    }

    /// Grow or shrink to exactly `count` layers.
    pub fn set_num_uv_layers(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(MeshError::LastUvLayer);
        }
        if count > MAX_UV_LAYERS {
            return Err(MeshError::UvLayerLimit { max: MAX_UV_LAYERS });
        }
        let num_faces = self.mesh.num_faces();
        self.layers.resize_with(count, || UvOverlay::new(num_faces));
        Ok(())
    }

    /// Remove a layer; later layers shift down by one.
    pub fn remove_uv_layer(&mut self, layer: usize) -> Result<()> {
        self.check_layer(layer)?;
        if self.layers.len() == 1 {
            return Err(MeshError::LastUvLayer);
        }
        self.layers.remove(layer);
        Ok(())
    }

    /// Check that `layer` exists.
    pub fn check_layer(&self, layer: usize) -> Result<()> {
        if layer < self.layers.len() {
            Ok(())
        } else {
            Err(MeshError::InvalidUvLayer {
                layer,
                count: self.layers.len(),
                max: MAX_UV_LAYERS,
            })
        }
    }
}
