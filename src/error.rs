//! Error types for morsel-uv.
//!
//! This module defines all error types used throughout the library. UV
//! operations that partially succeed still leave their committed work in the
//! overlay; the error only reports that the operation as a whole failed.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh and UV operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// The operation was given an empty triangle, edge or element set.
    #[error("operation requires a non-empty selection")]
    EmptySelection,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices (degenerate triangle).
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// The mesh (or the submesh being parameterized) has no boundary loop.
    #[error("mesh has no boundary loop")]
    NoBoundary,

    /// The requested UV layer does not exist.
    #[error("UV layer {layer} does not exist (mesh has {count} layers, maximum {max})")]
    InvalidUvLayer {
        /// The requested layer.
        layer: usize,
        /// Number of layers the mesh currently has.
        count: usize,
        /// Maximum number of layers a mesh can carry.
        max: usize,
    },

    /// No further UV layer can be added.
    #[error("mesh already has the maximum of {max} UV layers")]
    UvLayerLimit {
        /// Maximum number of layers a mesh can carry.
        max: usize,
    },

    /// The last remaining UV layer cannot be removed.
    #[error("cannot remove the last UV layer")]
    LastUvLayer,

    /// A UV layer handle or overlay does not belong to the mesh it was used with.
    #[error("UV overlay does not belong to this mesh")]
    ForeignOverlay,

    /// Geometry is degenerate for the requested operation.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),

    /// Some triangles or vertices could not be assigned UVs.
    ///
    /// Everything that did succeed has been committed to the overlay.
    #[error("{failed} of {total} items could not be assigned UVs")]
    IncompleteCoverage {
        /// Number of items that failed.
        failed: usize,
        /// Number of items processed.
        total: usize,
    },

    /// The operation was cancelled through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Algorithm failed to converge.
    #[error("algorithm failed to converge after {iterations} iterations")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an incomplete coverage error, or `Ok` when nothing failed.
    pub fn check_coverage(failed: usize, total: usize) -> Result<()> {
        if failed == 0 {
            Ok(())
        } else {
            Err(MeshError::IncompleteCoverage { failed, total })
        }
    }
}
