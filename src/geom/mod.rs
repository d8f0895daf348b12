//! Geometric primitives used by the UV algorithms.
//!
//! - [`Frame3`]: projection frames
//! - [`convex_hull`] and [`min_area_rect`]: 2D hull and minimum-area box
//! - [`PointHashGrid`]: radius queries over 3D points
//! - [`MeshBvh`]: ray casts against mesh faces

mod bvh;
mod frame;
mod hash_grid;
mod hull;

pub use bvh::{intersect_triangle, MeshBvh, Ray, RayHit};
pub use frame::Frame3;
pub use hash_grid::PointHashGrid;
pub use hull::{convex_hull, min_area_rect, turn_kind, OrientedRect, TurnKind};
