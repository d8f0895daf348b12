//! Core mesh data structures.
//!
//! This module provides the half-edge mesh representation, the UV overlay
//! attached to it, and the topology helpers the UV algorithms build on.
//!
//! # Overview
//!
//! The primary type is [`HalfEdgeMesh`], which represents a triangle mesh using
//! a half-edge (doubly-connected edge list) data structure. This representation
//! provides O(1) adjacency queries, making it efficient for geometry processing
//! algorithms.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//! - [`EdgeId`] - Identifies a full edge
//! - [`ElementId`] - Identifies a UV element of a [`UvOverlay`]
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on mesh size.
//!
//! # Construction
//!
//! Meshes are typically constructed from file I/O or from face-vertex lists,
//! then wrapped in a [`UvMesh`] to carry UV layers:
//!
//! ```
//! use morsel_uv::mesh::{HalfEdgeMesh, build_from_triangles};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! ```

mod builder;
mod halfedge;
mod index;
mod overlay;
mod submesh;
mod topology;
mod uv_mesh;

pub use builder::{build_from_triangles, to_face_vertex};
pub use halfedge::{Face, FaceHalfEdgeIter, HalfEdge, HalfEdgeMesh, Vertex, VertexHalfEdgeIter};
pub use index::{EdgeId, ElementId, FaceId, HalfEdgeId, MeshIndex, VertexId};
pub use overlay::UvOverlay;
pub use submesh::Submesh;
pub use topology::{face_components, mesh_components, uv_islands, UnionFind};
pub use uv_mesh::{UvLayerHandle, UvMesh, MAX_UV_LAYERS};
