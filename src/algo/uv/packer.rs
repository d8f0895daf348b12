//! Repacking UV islands into the unit square.
//!
//! Islands are found through UV element adjacency, so two faces that are
//! neighbours on the mesh but separated by a seam land in different islands.
//! Each island then gets one rigid transform: an optional rotation (and
//! mirror), a uniform scale and a translation.

use nalgebra::{Point2, Vector2};

use crate::error::{MeshError, Result};
use crate::geom::{convex_hull, min_area_rect};
use crate::mesh::{uv_islands, ElementId, FaceId, HalfEdgeMesh, MeshIndex, UvOverlay};

use super::util::face_elements;

/// Options for [`UvPacker`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Target texture resolution in texels, used to convert the gutter.
    pub resolution: usize,
    /// Padding around each island in texels.
    pub gutter: f64,
    /// Allow islands to be mirrored across their diagonal. Ignored when
    /// rotation is preserved.
    pub allow_flips: bool,
    /// Keep the islands' current scale instead of growing them to fill the square.
    pub preserve_scale: bool,
    /// Keep the islands' current orientation.
    pub preserve_rotation: bool,
    /// Rescale islands relative to each other so texel density in 3D is uniform.
    pub match_world_texel_density: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            resolution: 512,
            gutter: 1.0,
            allow_flips: false,
            preserve_scale: false,
            preserve_rotation: false,
            match_world_texel_density: true,
        }
    }
}

impl PackOptions {
    /// Set the texture resolution.
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the gutter in texels.
    pub fn with_gutter(mut self, gutter: f64) -> Self {
        self.gutter = gutter;
        self
    }

    /// Allow or forbid mirroring.
    pub fn with_allow_flips(mut self, allow: bool) -> Self {
        self.allow_flips = allow;
        self
    }

    /// Keep the current island scale.
    pub fn with_preserve_scale(mut self, preserve: bool) -> Self {
        self.preserve_scale = preserve;
        self
    }

    /// Keep the current island orientation.
    pub fn with_preserve_rotation(mut self, preserve: bool) -> Self {
        self.preserve_rotation = preserve;
        self
    }

    /// Enable or disable world-space texel density matching.
    pub fn with_match_world_texel_density(mut self, enabled: bool) -> Self {
        self.match_world_texel_density = enabled;
        self
    }

    fn gutter_uv(&self) -> f64 {
        if self.resolution == 0 {
            0.0
        } else {
            self.gutter.max(0.0) / self.resolution as f64
        }
    }
}

/// Rigid part of an island's transform, applied before scaling.
#[derive(Debug, Clone, Copy)]
struct IslandFrame {
    density: f64,
    cos: f64,
    sin: f64,
    mirror: bool,
}

impl IslandFrame {
    fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let q = p * self.density;
        let r = Point2::new(self.cos * q.x - self.sin * q.y, self.sin * q.x + self.cos * q.y);
        if self.mirror {
            Point2::new(r.y, r.x)
        } else {
            r
        }
    }
}

#[derive(Debug)]
struct Island<I: MeshIndex> {
    elements: Vec<ElementId<I>>,
    frame: IslandFrame,
    min: Point2<f64>,
    size: Vector2<f64>,
}

/// Packs the UV islands of one overlay.
///
/// # Example
///
/// ```
/// use morsel_uv::prelude::*;
/// use morsel_uv::algo::uv::{PackOptions, UvEditor, UvPacker};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
/// let mut uv_mesh = UvMesh::new(mesh);
/// UvEditor::new(&mut uv_mesh, 0, false)
///     .unwrap()
///     .set_per_triangle_uvs(None, 1.0, None)
///     .unwrap();
///
/// let (mesh, overlay) = uv_mesh.split_uv_layer_mut(0).unwrap();
/// UvPacker::new(PackOptions::default()).standard_pack(mesh, overlay, None).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct UvPacker {
    options: PackOptions,
}

impl UvPacker {
    /// Create a packer.
    pub fn new(options: PackOptions) -> Self {
        Self { options }
    }

    /// The options in use.
    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    /// Pack islands without overlap into `[0, 1]^2`, leaving a gutter around each.
    ///
    /// `faces` restricts packing to the islands formed by those faces; `None`
    /// packs every face with UVs.
    pub fn standard_pack<I: MeshIndex>(
        &self,
        mesh: &HalfEdgeMesh<I>,
        overlay: &mut UvOverlay<I>,
        faces: Option<&[FaceId<I>]>,
    ) -> Result<()> {
        let allow_rotation = !self.options.preserve_rotation;
        let islands = self.collect_islands(mesh, overlay, faces, allow_rotation)?;
        let gutter = self.options.gutter_uv();

        let scale = if self.options.preserve_scale {
            if shelf_layout(&islands, 1.0, gutter).is_none() {
                return Err(MeshError::invalid_param(
                    "preserve_scale",
                    true,
                    "islands do not fit in the unit square at their current scale",
                ));
            }
            1.0
        } else {
            fit_scale(&islands, gutter)?
        };

        let Some(offsets) = shelf_layout(&islands, scale, gutter) else {
            return Err(MeshError::DegenerateGeometry("islands cannot be packed"));
        };

        for (island, offset) in islands.iter().zip(offsets) {
            let origin = offset + Vector2::repeat(0.5 * gutter);
            for &e in &island.elements {
                let local = island.frame.apply(overlay.uv(e)) - island.min;
                overlay.set_uv(e, origin + local * scale);
            }
        }

        log::debug!(
            "packed {} islands at scale {:.4} with gutter {:.5}",
            islands.len(),
            scale,
            gutter
        );
        Ok(())
    }

    /// Stack all islands at the origin, scaled by one shared factor so the
    /// largest fills the unit square. Islands overlap by design.
    pub fn stack_pack<I: MeshIndex>(
        &self,
        mesh: &HalfEdgeMesh<I>,
        overlay: &mut UvOverlay<I>,
        faces: Option<&[FaceId<I>]>,
    ) -> Result<()> {
        let islands = self.collect_islands(mesh, overlay, faces, false)?;
        let largest = islands
            .iter()
            .map(|island| island.size.x.max(island.size.y))
            .fold(0.0, f64::max);
        let scale = if self.options.preserve_scale { 1.0 } else { 1.0 / largest };

        for island in &islands {
            for &e in &island.elements {
                let local = island.frame.apply(overlay.uv(e)) - island.min;
                overlay.set_uv(e, Point2::from(local * scale));
            }
        }

        log::debug!("stacked {} islands at scale {:.4}", islands.len(), scale);
        Ok(())
    }

    fn collect_islands<I: MeshIndex>(
        &self,
        mesh: &HalfEdgeMesh<I>,
        overlay: &UvOverlay<I>,
        faces: Option<&[FaceId<I>]>,
        allow_rotation: bool,
    ) -> Result<Vec<Island<I>>> {
        let components = uv_islands(mesh, overlay, faces);
        if components.is_empty() {
            return Err(MeshError::EmptySelection);
        }

        let mut islands = Vec::with_capacity(components.len());
        for component in components {
            let elements = face_elements(overlay, &component);

            let density = if self.options.match_world_texel_density {
                world_density(mesh, overlay, &component)?
            } else {
                1.0
            };

            let mut frame = IslandFrame {
                density,
                cos: 1.0,
                sin: 0.0,
                mirror: false,
            };
            if allow_rotation {
                let points: Vec<Point2<f64>> =
                    elements.iter().map(|&e| overlay.uv(e) * density).collect();
                if let Some(rect) = min_area_rect(&convex_hull(&points)) {
                    frame.cos = rect.angle.cos();
                    frame.sin = -rect.angle.sin();
                }
            }

            let (mut min, mut max) = bounds(elements.iter().map(|&e| frame.apply(overlay.uv(e))));
            if allow_rotation && self.options.allow_flips && max.y - min.y > max.x - min.x {
                frame.mirror = true;
                (min, max) = (Point2::new(min.y, min.x), Point2::new(max.y, max.x));
            }

            let size = max - min;
            if !(size.x > 1e-12 && size.y > 1e-12) || !size.x.is_finite() || !size.y.is_finite() {
                return Err(MeshError::DegenerateGeometry("island has zero UV area"));
            }
            islands.push(Island {
                elements,
                frame,
                min,
                size,
            });
        }
        Ok(islands)
    }
}

/// Ratio of 3D to UV edge length over the triangles of one island.
fn world_density<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    overlay: &UvOverlay<I>,
    faces: &[FaceId<I>],
) -> Result<f64> {
    let mut length_3d = 0.0;
    let mut length_uv = 0.0;
    for &f in faces {
        let Some(tri) = overlay.triangle(f) else {
            continue;
        };
        let positions = mesh.face_positions(f);
        for k in 0..3 {
            let j = (k + 1) % 3;
            length_3d += (positions[j] - positions[k]).norm();
            length_uv += (overlay.uv(tri[j]) - overlay.uv(tri[k])).norm();
        }
    }
    if length_uv <= f64::EPSILON || !length_3d.is_finite() {
        return Err(MeshError::DegenerateGeometry("island has zero UV extent"));
    }
    Ok(length_3d / length_uv)
}

fn bounds(points: impl Iterator<Item = Point2<f64>>) -> (Point2<f64>, Point2<f64>) {
    points.fold(
        (
            Point2::new(f64::INFINITY, f64::INFINITY),
            Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        ),
        |(lo, hi), p| (lo.inf(&p), hi.sup(&p)),
    )
}

/// Shelf placement of the padded island rectangles in the unit square.
///
/// Returns the lower-left corner of each padded rectangle, or `None` when
/// they do not fit.
fn shelf_layout<I: MeshIndex>(
    islands: &[Island<I>],
    scale: f64,
    gutter: f64,
) -> Option<Vec<Point2<f64>>> {
    const LIMIT: f64 = 1.0 - 1e-9;

    let mut order: Vec<usize> = (0..islands.len()).collect();
    order.sort_by(|&a, &b| islands[b].size.y.total_cmp(&islands[a].size.y));

    let mut offsets = vec![Point2::origin(); islands.len()];
    let (mut x, mut y, mut shelf_height) = (0.0, 0.0, 0.0f64);
    for i in order {
        let w = islands[i].size.x * scale + gutter;
        let h = islands[i].size.y * scale + gutter;
        if w > LIMIT {
            return None;
        }
        if x + w > LIMIT {
            y += shelf_height;
            x = 0.0;
            shelf_height = 0.0;
        }
        if y + h > LIMIT {
            return None;
        }
        offsets[i] = Point2::new(x, y);
        x += w;
        shelf_height = shelf_height.max(h);
    }
    Some(offsets)
}

/// Largest uniform scale at which the shelf layout still fits.
fn fit_scale<I: MeshIndex>(islands: &[Island<I>], gutter: f64) -> Result<f64> {
    let largest = islands
        .iter()
        .map(|island| island.size.x.max(island.size.y))
        .fold(0.0, f64::max);
    let mut hi = (1.0 - gutter) / largest;
    let mut lo = 0.0;
    if hi <= 0.0 || shelf_layout(islands, 0.0, gutter).is_none() {
        return Err(MeshError::DegenerateGeometry("gutter leaves no room for the islands"));
    }
    if shelf_layout(islands, hi, gutter).is_some() {
        return Ok(hi);
    }
    for _ in 0..48 {
        let mid = 0.5 * (lo + hi);
        if shelf_layout(islands, mid, gutter).is_some() {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    if lo <= 0.0 {
        return Err(MeshError::DegenerateGeometry("islands cannot be packed"));
    }
    Ok(lo)
}
