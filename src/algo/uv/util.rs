//! Measurements and bulk transforms over the UVs of a face set.

use std::collections::HashSet;

use nalgebra::Point2;

use crate::mesh::{ElementId, FaceId, HalfEdgeMesh, MeshIndex, UvOverlay};

/// Total UV-space area of `faces`.
///
/// Each set triangle contributes the magnitude of its signed area, so
/// mirrored islands do not cancel out. Unset faces are skipped.
pub fn uv_area<I: MeshIndex>(overlay: &UvOverlay<I>, faces: &[FaceId<I>]) -> f64 {
    faces
        .iter()
        .filter_map(|&f| overlay.triangle(f))
        .map(|tri| {
            let [a, b, c] = tri.map(|e| overlay.uv(e));
            0.5 * (b - a).perp(&(c - a)).abs()
        })
        .sum()
}

/// Total 3D area of `faces`.
pub fn surface_area<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, faces: &[FaceId<I>]) -> f64 {
    faces.iter().map(|&f| mesh.face_area(f)).sum()
}

/// UV bounding box of the set triangles in `faces`.
pub fn uv_bounds<I: MeshIndex>(
    overlay: &UvOverlay<I>,
    faces: &[FaceId<I>],
) -> Option<(Point2<f64>, Point2<f64>)> {
    faces
        .iter()
        .filter_map(|&f| overlay.triangle(f))
        .flatten()
        .map(|e| overlay.uv(e))
        .fold(None, |acc, p| match acc {
            None => Some((p, p)),
            Some((lo, hi)) => Some((lo.inf(&p), hi.sup(&p))),
        })
}

/// Distinct elements referenced by `faces`, in order of first use.
pub fn face_elements<I: MeshIndex>(overlay: &UvOverlay<I>, faces: &[FaceId<I>]) -> Vec<ElementId<I>> {
    let mut seen = HashSet::new();
    faces
        .iter()
        .filter_map(|&f| overlay.triangle(f))
        .flatten()
        .filter(|&e| seen.insert(e))
        .collect()
}

/// Apply `transform` to the value of every listed element.
pub fn transform_elements<I, F>(overlay: &mut UvOverlay<I>, elements: &[ElementId<I>], mut transform: F)
where
    I: MeshIndex,
    F: FnMut(Point2<f64>) -> Point2<f64>,
{
    for &e in elements {
        if overlay.is_element(e) {
            overlay.set_uv(e, transform(overlay.uv(e)));
        }
    }
}

/// Apply `transform` once to every element referenced by `faces`.
pub fn transform_face_elements<I, F>(overlay: &mut UvOverlay<I>, faces: &[FaceId<I>], transform: F)
where
    I: MeshIndex,
    F: FnMut(Point2<f64>) -> Point2<f64>,
{
    let elements = face_elements(overlay, faces);
    transform_elements(overlay, &elements, transform);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::VertexId;
    use crate::test_meshes::square_mesh;

    fn square_overlay(mesh: &HalfEdgeMesh) -> UvOverlay {
        let mut overlay = UvOverlay::new(mesh.num_faces());
        for v in mesh.vertex_ids() {
            let p = mesh.position(v);
            overlay.append_element(Point2::new(2.0 * p.x, p.y), v);
        }
        for f in mesh.face_ids() {
            let tri = mesh.face_triangle(f).map(|v: VertexId| ElementId::new(v.index()));
            overlay.set_triangle(mesh, f, tri);
        }
        overlay
    }

    #[test]
    fn test_area_and_bounds() {
        let mesh = square_mesh();
        let overlay = square_overlay(&mesh);
        let faces: Vec<FaceId> = mesh.face_ids().collect();
        assert!((uv_area(&overlay, &faces) - 2.0).abs() < 1e-12);
        assert!((surface_area(&mesh, &faces) - 1.0).abs() < 1e-12);
        assert_eq!(
            uv_bounds(&overlay, &faces),
            Some((Point2::new(0.0, 0.0), Point2::new(2.0, 1.0)))
        );
        assert_eq!(uv_bounds(&UvOverlay::<u32>::new(2), &faces), None);
    }

    #[test]
    fn test_shared_elements_transformed_once() {
        let mesh = square_mesh();
        let mut overlay = square_overlay(&mesh);
        let faces: Vec<FaceId> = mesh.face_ids().collect();
        assert_eq!(face_elements(&overlay, &faces).len(), 4);

        transform_face_elements(&mut overlay, &faces, |p| p + nalgebra::Vector2::new(1.0, 0.0));
        assert_eq!(overlay.uv(ElementId::new(2)), Point2::new(3.0, 1.0));
    }
}
