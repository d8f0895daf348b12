//! Area matching, fitting, orientation and packing of UV islands.

use nalgebra::{Point2, Rotation2, Vector2};

use super::UvEditor;
use crate::algo::uv::packer::{PackOptions, UvPacker};
use crate::algo::uv::util::{face_elements, surface_area, transform_face_elements, uv_area, uv_bounds};
use crate::error::{MeshError, Result};
use crate::geom::{convex_hull, min_area_rect};
use crate::mesh::{FaceId, MeshIndex};

const AREA_EPSILON: f64 = 1e-12;

impl<I: MeshIndex> UvEditor<'_, I> {
    /// Uniformly rescale the UVs of `faces` so their UV area equals their 3D area.
    ///
    /// The scale is anchored at the UV bounding box center, which moves to the
    /// origin when `recenter_at_origin` is set.
    pub fn scale_uv_area_to_3d_area(&mut self, faces: &[FaceId<I>], recenter_at_origin: bool) -> Result<()> {
        let area_uv = uv_area(self.overlay(), faces);
        let area_3d = surface_area(self.mesh(), faces);
        if !area_uv.is_finite() || !area_3d.is_finite() || area_uv < AREA_EPSILON || area_3d < AREA_EPSILON {
            log::warn!("area matching: degenerate areas (uv {}, 3d {})", area_uv, area_3d);
            return Err(MeshError::DegenerateGeometry("zero or non-finite area"));
        }
        let Some((lo, hi)) = uv_bounds(self.overlay(), faces) else {
            return Err(MeshError::EmptySelection);
        };

        let scale = area_3d.sqrt() / area_uv.sqrt();
        let center = nalgebra::center(&lo, &hi);
        let anchor = if recenter_at_origin { Point2::origin() } else { center };
        let (_, overlay) = self.parts_mut();
        transform_face_elements(overlay, faces, |p| anchor + (p - center) * scale);
        Ok(())
    }

    /// Fit the UVs of `faces` into the box `[box_min, box_max]`.
    ///
    /// With `preserve_aspect` both axes use the smaller of the two scales.
    /// The result is centered on the target box when `center_in_target` is
    /// set, and on the current UV center otherwise.
    pub fn scale_uvs_to_box(
        &mut self,
        faces: &[FaceId<I>],
        box_min: Point2<f64>,
        box_max: Point2<f64>,
        preserve_aspect: bool,
        center_in_target: bool,
    ) -> Result<()> {
        let Some((lo, hi)) = uv_bounds(self.overlay(), faces) else {
            return Err(MeshError::EmptySelection);
        };
        let size = hi - lo;
        let target = box_max - box_min;
        let ratio = |t: f64, s: f64| if s.abs() < AREA_EPSILON { 1.0 } else { t / s };
        let mut scale = Vector2::new(ratio(target.x, size.x), ratio(target.y, size.y));
        if preserve_aspect {
            scale = Vector2::repeat(scale.x.min(scale.y));
        }

        let center = nalgebra::center(&lo, &hi);
        let anchor = if center_in_target {
            nalgebra::center(&box_min, &box_max)
        } else {
            center
        };
        let (_, overlay) = self.parts_mut();
        transform_face_elements(overlay, faces, |p| anchor + (p - center).component_mul(&scale));
        Ok(())
    }

    /// Rotate the UVs of `faces` about their bounding box center so that the
    /// axis-aligned bounding box is as small as possible.
    ///
    /// Leaves the UVs alone when no rotation improves on the current box.
    pub fn auto_orient(&mut self, faces: &[FaceId<I>]) -> Result<()> {
        let overlay = self.overlay();
        let elements = face_elements(overlay, faces);
        if elements.is_empty() {
            return Err(MeshError::EmptySelection);
        }
        let points: Vec<Point2<f64>> = elements.iter().map(|&e| overlay.uv(e)).collect();
        let Some((lo, hi)) = uv_bounds(overlay, faces) else {
            return Err(MeshError::EmptySelection);
        };
        let current = (hi.x - lo.x) * (hi.y - lo.y);

        let hull = convex_hull(&points);
        let Some(rect) = min_area_rect(&hull) else {
            return Ok(());
        };
        if rect.area() >= current * (1.0 - 1e-9) {
            return Ok(());
        }

        let rotation = Rotation2::new(-rect.angle);
        let center = nalgebra::center(&lo, &hi);
        let (_, overlay) = self.parts_mut();
        transform_face_elements(overlay, faces, |p| center + rotation * (p - center));
        log::debug!(
            "auto-orient: rotated by {:.4} rad, box area {:.6} -> {:.6}",
            -rect.angle,
            current,
            rect.area()
        );
        Ok(())
    }

    /// Split bowties, then pack every island into the unit square.
    pub fn quick_pack(&mut self, resolution: usize, gutter: f64) -> Result<()> {
        self.split_bowties(None);
        let packer = UvPacker::new(pack_options(resolution, gutter));
        let (mesh, overlay) = self.parts_mut();
        packer.standard_pack(mesh, overlay, None)
    }

    /// Split bowties, pack, and move the result into UDIM tile `tile`.
    ///
    /// The overlay's V axis points the other way from the tile numbering, so
    /// the packed square is offset by `(u, -v)` and tile `(u, v)` covers
    /// `[u, u + 1) x [-v, 1 - v)`. `faces` restricts the pack; `None` packs
    /// every face with UVs.
    pub fn udim_pack(
        &mut self,
        tile: (i32, i32),
        resolution: usize,
        gutter: f64,
        faces: Option<&[FaceId<I>]>,
    ) -> Result<()> {
        self.split_bowties(None);
        let packer = UvPacker::new(pack_options(resolution, gutter));
        let (mesh, overlay) = self.parts_mut();
        packer.standard_pack(mesh, overlay, faces)?;

        let targets: Vec<FaceId<I>> = match faces {
            Some(faces) => faces.to_vec(),
            None => overlay.set_triangle_ids().collect(),
        };
        let offset = Vector2::new(f64::from(tile.0), -f64::from(tile.1));
        transform_face_elements(overlay, &targets, |p| p + offset);
        Ok(())
    }

    /// Split bowties, then stack every island at the origin.
    pub fn stack_pack(&mut self, faces: Option<&[FaceId<I>]>) -> Result<()> {
        self.split_bowties(None);
        let (mesh, overlay) = self.parts_mut();
        UvPacker::default().stack_pack(mesh, overlay, faces)
    }
}

fn pack_options(resolution: usize, gutter: f64) -> PackOptions {
    PackOptions::default()
        .with_resolution(resolution)
        .with_gutter(gutter)
        .with_allow_flips(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::uv::UvEditResult;
    use crate::mesh::{uv_islands, UvMesh};
    use crate::test_meshes::{cube_mesh, grid_mesh};

    #[test]
    fn test_area_matching_keeps_center() {
        let mut uv_mesh = UvMesh::new(grid_mesh(3));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        let faces: Vec<FaceId> = editor.mesh().face_ids().collect();
        editor.set_per_triangle_uvs(None, 0.1, None).unwrap();
        editor.scale_uvs_to_box(&faces, Point2::new(2.0, 3.0), Point2::new(2.5, 3.2), false, true).unwrap();

        let before = uv_bounds(editor.overlay(), &faces).unwrap();
        editor.scale_uv_area_to_3d_area(&faces, false).unwrap();
        let after = uv_bounds(editor.overlay(), &faces).unwrap();

        let area = uv_area(editor.overlay(), &faces);
        assert!((area - surface_area(editor.mesh(), &faces)).abs() < 1e-9);
        let shift = nalgebra::center(&before.0, &before.1) - nalgebra::center(&after.0, &after.1);
        assert!(shift.norm() < 1e-9);

        editor.scale_uv_area_to_3d_area(&faces, true).unwrap();
        let (lo, hi) = uv_bounds(editor.overlay(), &faces).unwrap();
        assert!(nalgebra::center(&lo, &hi).coords.norm() < 1e-9);
    }

    #[test]
    fn test_scale_to_box() {
        let mut uv_mesh = UvMesh::new(grid_mesh(2));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        let faces: Vec<FaceId> = editor.mesh().face_ids().collect();
        editor.set_per_vertex_uvs(None);
        let (mesh, overlay) = editor.parts_mut();
        for e in overlay.element_ids().collect::<Vec<_>>() {
            let p = mesh.position(overlay.parent_vertex(e));
            overlay.set_uv(e, Point2::new(p.x, 2.0 * p.y));
        }

        editor.scale_uvs_to_box(&faces, Point2::new(0.0, 0.0), Point2::new(4.0, 4.0), true, true).unwrap();
        let (lo, hi) = uv_bounds(editor.overlay(), &faces).unwrap();
        assert!((lo - Point2::new(1.0, 0.0)).norm() < 1e-12);
        assert!((hi - Point2::new(3.0, 4.0)).norm() < 1e-12);

        editor.scale_uvs_to_box(&faces, Point2::new(0.0, 0.0), Point2::new(4.0, 4.0), false, false).unwrap();
        let (lo, hi) = uv_bounds(editor.overlay(), &faces).unwrap();
        assert!((hi - lo - Vector2::new(4.0, 4.0)).norm() < 1e-12);
    }

    #[test]
    fn test_auto_orient_shrinks_rotated_square() {
        let mut uv_mesh = UvMesh::new(grid_mesh(2));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        let faces: Vec<FaceId> = editor.mesh().face_ids().collect();
        editor.set_per_vertex_uvs(None);
        let rotation = Rotation2::new(0.5);
        let (mesh, overlay) = editor.parts_mut();
        for e in overlay.element_ids().collect::<Vec<_>>() {
            let p = mesh.position(overlay.parent_vertex(e));
            overlay.set_uv(e, rotation * Point2::new(p.x, p.y));
        }

        editor.auto_orient(&faces).unwrap();
        let (lo, hi) = uv_bounds(editor.overlay(), &faces).unwrap();
        assert!(((hi.x - lo.x) * (hi.y - lo.y) - 1.0).abs() < 1e-9);

        let before: Vec<Point2<f64>> = editor.overlay().element_ids().map(|e| editor.overlay().uv(e)).collect();
        editor.auto_orient(&faces).unwrap();
        let after: Vec<Point2<f64>> = editor.overlay().element_ids().map(|e| editor.overlay().uv(e)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_udim_pack_lands_in_tile() {
        let mut uv_mesh = UvMesh::new(cube_mesh());
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        editor.set_per_triangle_uvs(None, 1.0, None).unwrap();
        editor.udim_pack((2, 3), 256, 2.0, None).unwrap();

        let overlay = editor.overlay();
        for e in overlay.element_ids() {
            let uv = overlay.uv(e);
            assert!((2.0..3.0).contains(&uv.x), "u = {}", uv.x);
            assert!((-3.0..-2.0).contains(&uv.y), "v = {}", uv.y);
        }
    }

    #[test]
    fn test_quick_and_stack_pack() {
        let mut uv_mesh = UvMesh::new(cube_mesh());
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        let mut result = UvEditResult::new();
        editor.set_per_triangle_uvs(None, 3.0, Some(&mut result)).unwrap();
        editor.quick_pack(512, 1.0).unwrap();
        for e in editor.overlay().element_ids() {
            let uv = editor.overlay().uv(e);
            assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
        }

        editor.stack_pack(None).unwrap();
        let islands = uv_islands(editor.mesh(), editor.overlay(), None);
        for island in islands {
            let (lo, _) = uv_bounds(editor.overlay(), &island).unwrap();
            assert!(lo.coords.norm() < 1e-12);
        }
    }
}
