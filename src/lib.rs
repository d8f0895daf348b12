//! # Morsel UV
//!
//! UV parameterization, seam editing, packing and cross-mesh UV transfer for
//! half-edge triangle meshes.
//!
//! A [`UvMesh`](mesh::UvMesh) pairs a [`HalfEdgeMesh`](mesh::HalfEdgeMesh)
//! with up to eight UV layers. Each layer is a [`UvOverlay`](mesh::UvOverlay):
//! a pool of UV elements referenced by the corners of each face, so a mesh
//! vertex on a seam has one element per side.
//!
//! ## Features
//!
//! - **Generation**: per-triangle, per-vertex, planar, box and cylinder
//!   projections, projection from another mesh, exponential map and
//!   conformal unwraps
//! - **Seams**: cut, join and rebuild islands
//! - **Layout**: area matching, box fitting, orientation, packing into the
//!   unit square or a UDIM tile, and stacking
//! - **Transfer**: rebuild seams and UVs of a dense mesh from a simplified one
//!
//! ## Quick Start
//!
//! ```
//! use morsel_uv::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
//! let mut uv_mesh = UvMesh::new(mesh);
//!
//! let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
//! let faces: Vec<FaceId> = editor.mesh().face_ids().collect();
//! editor
//!     .set_triangle_uvs_from_conformal(&faces, &ConformalOptions::default(), None)
//!     .unwrap();
//! editor.quick_pack(512, 2.0).unwrap();
//!
//! let overlay = uv_mesh.uv_layer(0).unwrap();
//! assert!(overlay.is_set_triangle(FaceId::new(0)));
//! ```
//!
//! ## Loading and Saving
//!
//! ```no_run
//! use morsel_uv::prelude::*;
//!
//! let mut uv_mesh: UvMesh = morsel_uv::io::load_uv("model.obj").unwrap();
//! UvEditor::new(&mut uv_mesh, 0, false).unwrap().quick_pack(1024, 2.0).unwrap();
//! morsel_uv::io::save_uv(&uv_mesh, 0, "packed.obj").unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod geom;
pub mod io;
pub mod mesh;

#[cfg(test)]
mod test_meshes;

/// Prelude module for convenient imports.
///
/// ```
/// use morsel_uv::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::uv::{
        ConformalOptions, ExpMapOptions, PackOptions, UvEditResult, UvEditor, UvPacker,
    };
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_triangles, to_face_vertex, EdgeId, ElementId, FaceId, HalfEdgeId, HalfEdgeMesh,
        MeshIndex, UvLayerHandle, UvMesh, UvOverlay, VertexId, MAX_UV_LAYERS,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
