//! Mesh processing algorithms.
//!
//! - **Geodesics**: Dijkstra over the edge graph, with custom edge weights
//! - **Parameterization**: conformal solvers, the discrete exponential map
//!   and the sparse linear algebra behind them
//! - **UV**: the editor, packer and transfer built on the above
//! - **Cancellation**: cooperative cancellation tokens for long operations

pub mod cancel;
pub mod geodesic;
pub mod parameterize;
pub mod uv;
