//! Parameterization solvers.
//!
//! These work on a standalone [`HalfEdgeMesh`](crate::mesh::HalfEdgeMesh),
//! usually a [`Submesh`](crate::mesh::Submesh) extracted by the UV editor, and
//! return one UV per vertex:
//!
//! - [`ConformalSolver`]: natural (pinned) or spectral conformal maps
//! - [`exp_map`]: discrete exponential map from a seed vertex
//! - [`smoothed_vertex_normals`]: the normals the exponential map flattens against
//!
//! # Example
//!
//! ```
//! use morsel_uv::prelude::*;
//! use morsel_uv::algo::parameterize::{ConformalSolver, PinnedVertex, SolverOptions};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.2),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
//!
//! let solver = ConformalSolver::Natural {
//!     pins: vec![PinnedVertex::new(0, 0.0, 0.5), PinnedVertex::new(2, 1.0, 0.5)],
//! };
//! let uv = solver.solve(&mesh, &SolverOptions::default()).unwrap();
//! assert_eq!(uv.len(), 4);
//! ```

mod conformal;
mod expmap;
mod normals;
mod sparse;
mod uv;

pub use conformal::{farthest_pair, ConformalSolver, PinnedVertex};
pub use expmap::exp_map;
pub use normals::smoothed_vertex_normals;
pub use sparse::{conjugate_gradient, CsrMatrix, SolverOptions};
pub use uv::UVMap;
