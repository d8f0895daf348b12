//! Small procedural meshes shared by the unit tests.

use std::f64::consts::PI;

use nalgebra::Point3;

use crate::mesh::{build_from_triangles, HalfEdgeMesh};

/// Unit square split along the (0,0)-(1,1) diagonal.
///
/// Vertices 0..4 are the corners in counter-clockwise order starting at the
/// origin; faces are `[0, 1, 2]` and `[0, 2, 3]`.
pub fn square_mesh() -> HalfEdgeMesh {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap()
}

/// Planar `n` x `n` grid over the unit square in the z = 0 plane.
///
/// Vertex `(i, j)` has index `j * (n + 1) + i`. Every cell is split along
/// its rising diagonal.
pub fn grid_mesh(n: usize) -> HalfEdgeMesh {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(i as f64 / n as f64, j as f64 / n as f64, 0.0));
        }
    }

    let mut faces = Vec::with_capacity(2 * n * n);
    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + n + 1;
            let v11 = v01 + 1;
            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    build_from_triangles(&vertices, &faces).unwrap()
}

/// Grid bent into a gentle bump, for tests that need a non-planar disk.
pub fn bump_mesh(n: usize) -> HalfEdgeMesh {
    let flat = grid_mesh(n);
    let (vertices, faces) = crate::mesh::to_face_vertex(&flat);
    let vertices: Vec<Point3<f64>> = vertices
        .into_iter()
        .map(|p| Point3::new(p.x, p.y, 0.2 * (PI * p.x).sin() * (PI * p.y).sin()))
        .collect();
    build_from_triangles(&vertices, &faces).unwrap()
}

/// Closed unit cube with corners at 0 and 1, two triangles per side.
pub fn cube_mesh() -> HalfEdgeMesh {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];
    let faces = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [3, 7, 6],
        [3, 6, 2],
        [0, 4, 7],
        [0, 7, 3],
        [1, 2, 6],
        [1, 6, 5],
    ];
    build_from_triangles(&vertices, &faces).unwrap()
}

/// Closed cylinder of radius 1 around the z axis, from z = 0 to z = 1.
///
/// Ring vertices come first (bottom ring, then top ring), followed by the
/// bottom and top cap centres.
pub fn cylinder_mesh(segments: usize) -> HalfEdgeMesh {
    let mut vertices = Vec::with_capacity(2 * segments + 2);
    for z in [0.0, 1.0] {
        for i in 0..segments {
            let angle = 2.0 * PI * i as f64 / segments as f64;
            vertices.push(Point3::new(angle.cos(), angle.sin(), z));
        }
    }
    vertices.push(Point3::new(0.0, 0.0, 0.0));
    vertices.push(Point3::new(0.0, 0.0, 1.0));

    let bottom_center = 2 * segments;
    let top_center = bottom_center + 1;
    let mut faces = Vec::with_capacity(4 * segments);
    for i in 0..segments {
        let j = (i + 1) % segments;
        let (b0, b1, t0, t1) = (i, j, segments + i, segments + j);
        faces.push([b0, b1, t1]);
        faces.push([b0, t1, t0]);
        faces.push([bottom_center, b1, b0]);
        faces.push([top_center, t0, t1]);
    }

    build_from_triangles(&vertices, &faces).unwrap()
}
