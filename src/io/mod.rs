//! Mesh file I/O.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | `vt` coordinates map to UV layer 0 |
//!
//! # Usage
//!
//! ```no_run
//! use morsel_uv::io::{load_uv, save_uv};
//! use morsel_uv::mesh::UvMesh;
//!
//! let uv_mesh: UvMesh = load_uv("model.obj").unwrap();
//! save_uv(&uv_mesh, 0, "output.obj").unwrap();
//! ```

pub mod obj;

use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeMesh, MeshIndex, UvMesh};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load the geometry of a mesh file, detecting the format from the extension.
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<HalfEdgeMesh<I>> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::load(path),
    }
}

/// Load a mesh file together with its texture coordinates.
pub fn load_uv<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<UvMesh<I>> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::load_uv(path),
    }
}

/// Save the geometry of a mesh, detecting the format from the extension.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &HalfEdgeMesh<I>, path: P) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::save(mesh, path),
    }
}

/// Save a mesh with UV layer `layer` as its texture coordinates.
pub fn save_uv<P: AsRef<Path>, I: MeshIndex>(uv_mesh: &UvMesh<I>, layer: usize, path: P) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::save_uv(uv_mesh, layer, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/model.OBJ"), Some(Format::Obj));
        assert_eq!(Format::from_path("model.stl"), None);
        let err = load::<_, u32>("model.ply").unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedFormat { extension } if extension == "ply"));
    }
}
