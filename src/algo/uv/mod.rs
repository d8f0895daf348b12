//! UV generation, editing, packing and transfer.
//!
//! - [`UvEditor`]: every operation that writes UVs on one layer of a [`UvMesh`](crate::mesh::UvMesh)
//! - [`UvPacker`]: lays existing islands out in the unit square, or stacks them
//! - [`UvTransfer`]: rebuilds the seams and UVs of a dense mesh from a
//!   simplified one sharing its vertex positions
//! - [`util`]: areas, bounds and bulk transforms over face sets

mod editor;
mod packer;
mod transfer;
pub mod util;

pub use editor::{
    ConformalOptions, ExpMapOptions, ProjectionTransferOptions, UvEditResult, UvEditor,
};
pub use packer::{PackOptions, UvPacker};
pub use transfer::{TransferOptions, TransferState, UvTransfer};
