//! Projections: planar, box, cylinder, and projection from another mesh.

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{Point2, Point3, Vector2, Vector3};
use rayon::prelude::*;

use super::{note, UvEditResult, UvEditor};
use crate::error::{MeshError, Result};
use crate::geom::{Frame3, MeshBvh, Ray};
use crate::mesh::{face_components, ElementId, FaceId, MeshIndex, UvOverlay, VertexId};

const MIN_DIMENSION: f64 = 1e-12;

fn safe_dimension(d: f64) -> f64 {
    if d.abs() < MIN_DIMENSION {
        1.0
    } else {
        d
    }
}

/// Options for [`UvEditor::transfer_uvs_via_projection`].
pub struct ProjectionTransferOptions<'f, I: MeshIndex = u32> {
    /// Lowest accepted signed distance along the projection direction.
    pub min_signed_distance: f64,
    /// Highest accepted signed distance along the projection direction.
    pub max_signed_distance: f64,
    /// Clear every target face first, so unmatched faces end up unset.
    pub reset_unmatched: bool,
    /// Only source faces accepted by this predicate can be hit.
    pub source_filter: Option<Box<dyn Fn(FaceId<I>) -> bool + 'f>>,
}

impl<I: MeshIndex> Default for ProjectionTransferOptions<'_, I> {
    fn default() -> Self {
        Self {
            min_signed_distance: f64::NEG_INFINITY,
            max_signed_distance: f64::INFINITY,
            reset_unmatched: false,
            source_filter: None,
        }
    }
}

impl<'f, I: MeshIndex> ProjectionTransferOptions<'f, I> {
    /// Restrict hits to signed distances in `[min, max]`.
    pub fn with_signed_distance_range(mut self, min: f64, max: f64) -> Self {
        self.min_signed_distance = min;
        self.max_signed_distance = max;
        self
    }

    /// Set whether target faces are cleared before matching.
    pub fn with_reset_unmatched(mut self, reset: bool) -> Self {
        self.reset_unmatched = reset;
        self
    }

    /// Only accept hits on source faces for which `filter` returns `true`.
    pub fn with_source_filter(mut self, filter: impl Fn(FaceId<I>) -> bool + 'f) -> Self {
        self.source_filter = Some(Box::new(filter));
        self
    }
}

/// Dominant-axis bucket of a box projection: `2 * axis + (negative as usize)`.
fn box_bucket(n: &Vector3<f64>) -> usize {
    let axis = n.iamax();
    2 * axis + usize::from(n[axis] < 0.0)
}

/// Signed component of `n` along the outward axis of a box bucket.
fn bucket_alignment(bucket: usize, n: &Vector3<f64>) -> f64 {
    let along = n[bucket / 2];
    if bucket % 2 == 0 {
        along
    } else {
        -along
    }
}

/// Coordinates on the two minor axes of a box bucket, wound so that faces
/// pointing out of the box keep their orientation.
fn box_plane_uv(bucket: usize, p: &Vector3<f64>) -> Point2<f64> {
    match bucket {
        0 => Point2::new(p.y, p.z),
        1 => Point2::new(-p.y, p.z),
        2 => Point2::new(-p.x, p.z),
        3 => Point2::new(p.x, p.z),
        4 => Point2::new(p.x, p.y),
        _ => Point2::new(-p.x, p.y),
    }
}

const CAP_POSITIVE: usize = 4;
const CAP_NEGATIVE: usize = 5;
const SIDE_UPPER: usize = 0;
const SIDE_LOWER: usize = 1;

impl<I: MeshIndex> UvEditor<'_, I> {
    /// Project `faces` onto the plane of `frame`.
    ///
    /// Positions pass through `transform` first. Plane coordinates are divided
    /// by `dimension`; near-zero components count as 1. Vertices are shared
    /// inside the set, so only the set's outer boundary becomes a seam.
    pub fn set_triangle_uvs_from_projection<F>(
        &mut self,
        faces: &[FaceId<I>],
        transform: F,
        frame: &Frame3,
        dimension: Vector2<f64>,
        mut result: Option<&mut UvEditResult<I>>,
    ) -> Result<()>
    where
        F: Fn(&Point3<f64>) -> Point3<f64>,
    {
        if faces.is_empty() {
            return Err(MeshError::EmptySelection);
        }
        let scale = Vector2::new(safe_dimension(dimension.x), safe_dimension(dimension.y));

        let (mesh, overlay) = self.parts_mut();
        overlay.clear_triangles(faces.iter().copied());
        let mut vertex_map: HashMap<VertexId<I>, ElementId<I>> = HashMap::new();
        for &f in faces {
            let tri = mesh.face_triangle(f).map(|v| {
                *vertex_map.entry(v).or_insert_with(|| {
                    let uv = frame.to_plane_uv(&transform(mesh.position(v)));
                    let e = overlay.append_element(Point2::from(uv.coords.component_div(&scale)), v);
                    note(&mut result, e);
                    e
                })
            });
            overlay.set_triangle(mesh, f, tri);
        }
        Ok(())
    }

    /// Copy UVs from a source mesh by casting rays along `direction`.
    ///
    /// Each target vertex (after `transform`) looks for the nearest source hit
    /// whose signed distance lies in the options' window, searching both ways
    /// when the window straddles zero. The hit's UV is interpolated from the
    /// source face. A face is rewritten only when all three of its vertices
    /// hit a source face with UVs; the number of other faces is reported as
    /// [`MeshError::IncompleteCoverage`].
    #[allow(clippy::too_many_arguments)]
    pub fn transfer_uvs_via_projection<F>(
        &mut self,
        faces: &[FaceId<I>],
        source: &MeshBvh<'_, I>,
        source_overlay: &UvOverlay<I>,
        transform: F,
        direction: Vector3<f64>,
        options: &ProjectionTransferOptions<'_, I>,
        mut result: Option<&mut UvEditResult<I>>,
    ) -> Result<()>
    where
        F: Fn(&Point3<f64>) -> Point3<f64>,
    {
        if faces.is_empty() {
            return Err(MeshError::EmptySelection);
        }
        let Some(dir) = direction.try_normalize(f64::EPSILON) else {
            return Err(MeshError::DegenerateGeometry("zero projection direction"));
        };
        let (lo, hi) = (options.min_signed_distance, options.max_signed_distance);
        if lo.is_nan() || hi.is_nan() || lo > hi {
            return Err(MeshError::invalid_param(
                "max_signed_distance",
                hi,
                "must not be below min_signed_distance",
            ));
        }

        let accept = |f: FaceId<I>| {
            source_overlay.is_set_triangle(f)
                && options.source_filter.as_ref().map_or(true, |filter| filter(f))
        };
        let sample = |p: Point3<f64>| -> Option<Point2<f64>> {
            let mut best: Option<(f64, FaceId<I>, Vector3<f64>)> = None;
            if hi >= 0.0 {
                let start = lo.max(0.0);
                let ray = Ray::new(p + dir * start, dir);
                if let Some(hit) = source.cast_ray(&ray, hi - start, accept) {
                    best = Some((start + hit.distance, hit.face, hit.barycentric));
                }
            }
            if lo < 0.0 {
                let start = hi.min(0.0);
                let ray = Ray::new(p + dir * start, -dir);
                if let Some(hit) = source.cast_ray(&ray, start - lo, accept) {
                    let signed = start - hit.distance;
                    if best.map_or(true, |(s, _, _)| signed.abs() < s.abs()) {
                        best = Some((signed, hit.face, hit.barycentric));
                    }
                }
            }
            let (_, face, bary) = best?;
            let [a, b, c] = source_overlay.triangle(face)?.map(|e| source_overlay.uv(e));
            Some(Point2::from(a.coords * bary.x + b.coords * bary.y + c.coords * bary.z))
        };

        let (mesh, overlay) = self.parts_mut();
        if options.reset_unmatched {
            overlay.clear_triangles(faces.iter().copied());
        }

        let mut samples: HashMap<VertexId<I>, Option<Point2<f64>>> = HashMap::new();
        let mut vertex_map: HashMap<VertexId<I>, ElementId<I>> = HashMap::new();
        let mut failed = 0;
        for &f in faces {
            let verts = mesh.face_triangle(f);
            let uvs = verts.map(|v| {
                *samples
                    .entry(v)
                    .or_insert_with(|| sample(transform(mesh.position(v))))
            });
            let [Some(a), Some(b), Some(c)] = uvs else {
                failed += 1;
                continue;
            };
            let values = [a, b, c];
            let mut tri = [ElementId::invalid(); 3];
            for k in 0..3 {
                tri[k] = *vertex_map.entry(verts[k]).or_insert_with(|| {
                    let e = overlay.append_element(values[k], verts[k]);
                    note(&mut result, e);
                    e
                });
            }
            overlay.set_triangle(mesh, f, tri);
        }

        if failed > 0 {
            log::warn!(
                "projection transfer: {} of {} faces found no source UVs",
                failed,
                faces.len()
            );
        }
        MeshError::check_coverage(failed, faces.len())
    }

    /// Box projection onto the six sides of `frame` scaled by `dimensions`.
    ///
    /// Every face goes to the side its normal points at most strongly. With
    /// `min_island_tri_count > 1`, same-side regions smaller than that are
    /// absorbed by their largest neighbouring region, and single faces that
    /// jut into another side along a region border are handed over to it.
    /// UVs are shared per vertex and side; bowties left behind are split.
    pub fn set_triangle_uvs_from_box_projection<F>(
        &mut self,
        faces: &[FaceId<I>],
        transform: F,
        frame: &Frame3,
        dimensions: Vector3<f64>,
        min_island_tri_count: usize,
        mut result: Option<&mut UvEditResult<I>>,
    ) -> Result<()>
    where
        F: Fn(&Point3<f64>) -> Point3<f64> + Sync,
    {
        if faces.is_empty() {
            return Err(MeshError::EmptySelection);
        }
        let dims = dimensions.map(safe_dimension);
        let mesh = self.mesh();
        let local = |v: VertexId<I>| frame.to_local(&transform(mesh.position(v))).component_div(&dims);

        let normals: Vec<Vector3<f64>> = faces
            .par_iter()
            .map(|&f| {
                let [a, b, c] = mesh.face_triangle(f).map(|v| frame.to_local(&transform(mesh.position(v))));
                (b - a).cross(&(c - a)).component_div(&dims)
            })
            .collect();
        let mut buckets: Vec<usize> = normals.iter().map(box_bucket).collect();
        if min_island_tri_count > 1 {
            self.merge_small_regions(faces, &mut buckets, min_island_tri_count);
            self.swap_border_faces(faces, &normals, &mut buckets);
        }

        let mesh = self.mesh();
        let coords: Vec<[Point2<f64>; 3]> = faces
            .iter()
            .zip(&buckets)
            .map(|(&f, &bucket)| {
                mesh.face_triangle(f)
                    .map(|v| box_plane_uv(bucket, &local(v)))
            })
            .collect();
        self.write_bucketed(faces, &buckets, &coords, &mut result);
        Ok(())
    }

    /// Cylinder projection around the `z` axis of `frame`.
    ///
    /// Faces whose normal is within `cap_angle_deg` of the axis become end
    /// caps, projected like box sides. Other faces are split into two half
    /// cylinders at azimuth zero and unrolled to `(azimuth / π, -height)`.
    pub fn set_triangle_uvs_from_cylinder_projection<F>(
        &mut self,
        faces: &[FaceId<I>],
        transform: F,
        frame: &Frame3,
        dimensions: Vector3<f64>,
        cap_angle_deg: f64,
        mut result: Option<&mut UvEditResult<I>>,
    ) -> Result<()>
    where
        F: Fn(&Point3<f64>) -> Point3<f64> + Sync,
    {
        if faces.is_empty() {
            return Err(MeshError::EmptySelection);
        }
        let dims = dimensions.map(safe_dimension);
        let cap_cos = cap_angle_deg.to_radians().cos();
        let mesh = self.mesh();
        let local = |v: VertexId<I>| frame.to_local(&transform(mesh.position(v))).component_div(&dims);

        let buckets: Vec<usize> = faces
            .par_iter()
            .map(|&f| {
                let [a, b, c] = mesh.face_triangle(f).map(|v| frame.to_local(&transform(mesh.position(v))));
                let n = (b - a).cross(&(c - a)).component_div(&dims);
                let n = n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros);
                if n.z >= cap_cos {
                    CAP_POSITIVE
                } else if n.z <= -cap_cos {
                    CAP_NEGATIVE
                } else if (a + b + c).y >= 0.0 {
                    SIDE_UPPER
                } else {
                    SIDE_LOWER
                }
            })
            .collect();

        let coords: Vec<[Point2<f64>; 3]> = faces
            .iter()
            .zip(&buckets)
            .map(|(&f, &bucket)| {
                mesh.face_triangle(f).map(|v| {
                    let p = local(v);
                    match bucket {
                        SIDE_UPPER | SIDE_LOWER => {
                            let mut azimuth = p.y.atan2(p.x);
                            if bucket == SIDE_UPPER && azimuth < -FRAC_PI_2 {
                                azimuth += 2.0 * PI;
                            } else if bucket == SIDE_LOWER && azimuth > FRAC_PI_2 {
                                azimuth -= 2.0 * PI;
                            }
                            Point2::new(azimuth / PI, -p.z)
                        }
                        cap => box_plane_uv(cap, &p),
                    }
                })
            })
            .collect();
        self.write_bucketed(faces, &buckets, &coords, &mut result);
        Ok(())
    }

    /// Replace the UVs of `faces`, sharing one element per (vertex, bucket),
    /// then split the bowties that sharing can leave behind.
    fn write_bucketed(
        &mut self,
        faces: &[FaceId<I>],
        buckets: &[usize],
        coords: &[[Point2<f64>; 3]],
        result: &mut Option<&mut UvEditResult<I>>,
    ) {
        let (mesh, overlay) = self.parts_mut();
        overlay.clear_triangles(faces.iter().copied());

        let mut shared: HashMap<(VertexId<I>, usize), ElementId<I>> = HashMap::new();
        let mut touched = Vec::new();
        for (i, &f) in faces.iter().enumerate() {
            let verts = mesh.face_triangle(f);
            let mut tri = [ElementId::invalid(); 3];
            for k in 0..3 {
                tri[k] = *shared.entry((verts[k], buckets[i])).or_insert_with(|| {
                    let e = overlay.append_element(coords[i][k], verts[k]);
                    note(result, e);
                    touched.push(verts[k]);
                    e
                });
            }
            overlay.set_triangle(mesh, f, tri);
        }

        touched.sort_unstable();
        touched.dedup();
        let mut split = Vec::new();
        let count = overlay.split_bowties_at_vertices(mesh, &touched, Some(&mut split));
        for e in split {
            note(result, e);
        }
        log::debug!(
            "bucketed projection: {} faces, {} elements, {} bowties split",
            faces.len(),
            shared.len(),
            count
        );
    }

    /// Relabel same-bucket regions smaller than `min_count` with the bucket of
    /// their largest neighbouring region.
    fn merge_small_regions(&self, faces: &[FaceId<I>], buckets: &mut [usize], min_count: usize) {
        const MAX_PASSES: usize = 4;
        let mesh = self.mesh();
        let index: HashMap<FaceId<I>, usize> = faces.iter().enumerate().map(|(i, &f)| (f, i)).collect();

        for _ in 0..MAX_PASSES {
            let regions = face_components(mesh, faces, |_, f0, f1| {
                buckets[index[&f0]] == buckets[index[&f1]]
            });
            let mut region_of = vec![0usize; faces.len()];
            for (r, region) in regions.iter().enumerate() {
                for f in region {
                    region_of[index[f]] = r;
                }
            }

            let mut size: Vec<usize> = regions.iter().map(Vec::len).collect();
            let mut order: Vec<usize> = (0..regions.len()).collect();
            order.sort_by_key(|&r| size[r]);
            let mut changed = false;
            for r in order {
                if size[r] == 0 || size[r] >= min_count {
                    continue;
                }
                let mut best: Option<usize> = None;
                for &f in &regions[r] {
                    for e in mesh.face_edges(f) {
                        let g = mesh.opposite_face(e, f);
                        let Some(&gi) = index.get(&g) else {
                            continue;
                        };
                        let rg = region_of[gi];
                        if rg != region_of[index[&f]] && best.map_or(true, |b| size[rg] > size[b]) {
                            best = Some(rg);
                        }
                    }
                }
                let Some(target) = best else {
                    continue;
                };
                let label = buckets[index[&regions[target][0]]];
                let from = region_of[index[&regions[r][0]]];
                for (i, slot) in region_of.iter_mut().enumerate() {
                    if *slot == from {
                        *slot = target;
                        buckets[i] = label;
                    }
                }
                size[target] += size[from];
                size[from] = 0;
                changed = true;
            }
            if !changed {
                break;
            }
        }
    }

    /// Hand faces that jut across a region border to the bucket of their
    /// neighbours.
    ///
    /// A face moves when at least two of its neighbours share another bucket
    /// and its normal still points that way at least half as strongly as it
    /// points at its own side. Returns the number of faces moved.
    fn swap_border_faces(&self, faces: &[FaceId<I>], normals: &[Vector3<f64>], buckets: &mut [usize]) -> usize {
        const MAX_PASSES: usize = 4;
        const MIN_ALIGNMENT_RATIO: f64 = 0.5;
        let mesh = self.mesh();
        let index: HashMap<FaceId<I>, usize> = faces.iter().enumerate().map(|(i, &f)| (f, i)).collect();

        let mut moved = 0;
        for _ in 0..MAX_PASSES {
            let snapshot = buckets.to_vec();
            let mut changed = false;
            for (i, &f) in faces.iter().enumerate() {
                let own = snapshot[i];
                let mut others: Vec<usize> = mesh
                    .face_edges(f)
                    .into_iter()
                    .filter_map(|e| index.get(&mesh.opposite_face(e, f)))
                    .map(|&g| snapshot[g])
                    .filter(|&b| b != own)
                    .collect();
                others.sort_unstable();
                let Some(candidate) = others.windows(2).find(|w| w[0] == w[1]).map(|w| w[0]) else {
                    continue;
                };
                let toward = bucket_alignment(candidate, &normals[i]);
                if toward > 0.0 && toward >= MIN_ALIGNMENT_RATIO * bucket_alignment(own, &normals[i]) {
                    buckets[i] = candidate;
                    moved += 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        if moved > 0 {
            log::debug!("box projection: moved {} border faces", moved);
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::MeshBvh;
    use crate::mesh::{uv_islands, UvMesh};
    use crate::test_meshes::{cube_mesh, cylinder_mesh, grid_mesh};

    fn identity(p: &Point3<f64>) -> Point3<f64> {
        *p
    }

    #[test]
    fn test_planar_projection_shares_interior() {
        let mut uv_mesh = UvMesh::new(grid_mesh(4));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        let faces: Vec<FaceId> = editor.mesh().face_ids().collect();
        let frame = Frame3::new(Point3::origin());
        editor
            .set_triangle_uvs_from_projection(&faces, identity, &frame, Vector2::new(2.0, 0.0), None)
            .unwrap();

        let (mesh, overlay) = (editor.mesh(), editor.overlay());
        assert_eq!(overlay.element_count(), mesh.num_vertices());
        assert_eq!(uv_islands(mesh, overlay, None).len(), 1);
        for e in overlay.element_ids() {
            let p = mesh.position(overlay.parent_vertex(e));
            let uv = overlay.uv(e);
            assert!((uv.x - p.x / 2.0).abs() < 1e-12);
            assert!((uv.y - p.y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_box_projection_gives_one_island_per_side() {
        let mut uv_mesh = UvMesh::new(cube_mesh());
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        let faces: Vec<FaceId> = editor.mesh().face_ids().collect();
        let frame = Frame3::new(Point3::new(0.5, 0.5, 0.5));
        editor
            .set_triangle_uvs_from_box_projection(&faces, identity, &frame, Vector3::repeat(1.0), 1, None)
            .unwrap();

        let (mesh, overlay) = (editor.mesh(), editor.overlay());
        let islands = uv_islands(mesh, overlay, None);
        assert_eq!(islands.len(), 6);
        for island in &islands {
            assert_eq!(island.len(), 2);
            let shared = crate::algo::uv::util::face_elements(overlay, island);
            assert_eq!(shared.len(), 4);
        }
        for f in mesh.face_ids() {
            let [a, b, c] = overlay.triangle(f).unwrap().map(|e| overlay.uv(e));
            assert!((b - a).perp(&(c - a)) > 0.0);
        }
        assert!(overlay.is_valid(mesh));
    }

    #[test]
    fn test_box_projection_absorbs_small_regions() {
        let mut uv_mesh = UvMesh::new(cube_mesh());
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        let faces: Vec<FaceId> = editor.mesh().face_ids().collect();
        let frame = Frame3::new(Point3::new(0.5, 0.5, 0.5));
        editor
            .set_triangle_uvs_from_box_projection(&faces, identity, &frame, Vector3::repeat(1.0), 3, None)
            .unwrap();
        let islands = uv_islands(editor.mesh(), editor.overlay(), None);
        assert!(islands.len() < 6);
        assert!(editor.overlay().is_valid(editor.mesh()));
    }

    #[test]
    fn test_box_projection_swaps_jutting_border_faces() {
        let mut uv_mesh = UvMesh::new(grid_mesh(4));
        let editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        let faces: Vec<FaceId> = editor.mesh().face_ids().collect();
        // Columns 0 and 1 face +x, columns 2 and 3 face +z, and the upper
        // triangle of cell (2, 1) juts from the +x side into the +z side.
        let tooth = 2 * (4 + 2) + 1;
        let labels: Vec<usize> = (0..faces.len())
            .map(|k| if (k / 2) % 4 < 2 || k == tooth { 0 } else { 4 })
            .collect();

        let diagonal = vec![Vector3::new(1.0, 0.0, 1.0); faces.len()];
        let mut buckets = labels.clone();
        assert_eq!(editor.swap_border_faces(&faces, &diagonal, &mut buckets), 1);
        assert_eq!(buckets[tooth], 4);
        for k in (0..faces.len()).filter(|&k| k != tooth) {
            assert_eq!(buckets[k], labels[k]);
        }

        // A face that barely points at the other side stays put.
        let steep = vec![Vector3::new(1.0, 0.0, 0.2); faces.len()];
        let mut buckets = labels.clone();
        assert_eq!(editor.swap_border_faces(&faces, &steep, &mut buckets), 0);
        assert_eq!(buckets, labels);
    }

    #[test]
    fn test_cylinder_projection_islands() {
        let mut uv_mesh = UvMesh::new(cylinder_mesh(8));
        let mut editor = UvEditor::new(&mut uv_mesh, 0, false).unwrap();
        let faces: Vec<FaceId> = editor.mesh().face_ids().collect();
        editor
            .set_triangle_uvs_from_cylinder_projection(
                &faces,
                identity,
                &Frame3::default(),
                Vector3::repeat(1.0),
                45.0,
                None,
            )
            .unwrap();

        let (mesh, overlay) = (editor.mesh(), editor.overlay());
        assert_eq!(uv_islands(mesh, overlay, None).len(), 4);
        for f in mesh.face_ids() {
            for e in overlay.triangle(f).unwrap() {
                let uv = overlay.uv(e);
                assert!(uv.x.abs() <= 1.0 + 1e-9, "azimuth out of range: {}", uv.x);
            }
        }
    }

    #[test]
    fn test_transfer_via_projection() {
        let source_mesh = grid_mesh(2);
        let mut source = UvMesh::new(source_mesh);
        let faces: Vec<FaceId> = source.mesh().face_ids().collect();
        UvEditor::new(&mut source, 0, false)
            .unwrap()
            .set_triangle_uvs_from_projection(&faces, identity, &Frame3::default(), Vector2::new(1.0, 1.0), None)
            .unwrap();
        let bvh = MeshBvh::new(source.mesh());

        let mut target = UvMesh::new(grid_mesh(3));
        let mut editor = UvEditor::new(&mut target, 0, false).unwrap();
        let target_faces: Vec<FaceId> = editor.mesh().face_ids().collect();
        let lifted = |p: &Point3<f64>| Point3::new(p.x, p.y, 0.5);
        let options = ProjectionTransferOptions::default().with_signed_distance_range(-1.0, 1.0);
        editor
            .transfer_uvs_via_projection(
                &target_faces,
                &bvh,
                source.uv_layer(0).unwrap(),
                lifted,
                Vector3::z(),
                &options,
                None,
            )
            .unwrap();

        let (mesh, overlay) = (editor.mesh(), editor.overlay());
        for e in overlay.element_ids() {
            let p = mesh.position(overlay.parent_vertex(e));
            assert!((overlay.uv(e) - Point2::new(p.x, p.y)).norm() < 1e-9);
        }
    }

    #[test]
    fn test_transfer_via_projection_source_filter() {
        let mut source = UvMesh::new(grid_mesh(1));
        let faces: Vec<FaceId> = source.mesh().face_ids().collect();
        UvEditor::new(&mut source, 0, false)
            .unwrap()
            .set_triangle_uvs_from_projection(&faces, identity, &Frame3::default(), Vector2::new(1.0, 1.0), None)
            .unwrap();
        let bvh = MeshBvh::new(source.mesh());

        // Only the lower-right source triangle (x >= y) may be hit.
        let mut target = UvMesh::new(grid_mesh(2));
        let mut editor = UvEditor::new(&mut target, 0, false).unwrap();
        let target_faces: Vec<FaceId> = editor.mesh().face_ids().collect();
        let lifted = |p: &Point3<f64>| Point3::new(p.x, p.y, 0.5);
        let options = ProjectionTransferOptions::default()
            .with_signed_distance_range(-1.0, 1.0)
            .with_reset_unmatched(true)
            .with_source_filter(|f: FaceId| f == FaceId::new(0));
        let outcome = editor.transfer_uvs_via_projection(
            &target_faces,
            &bvh,
            source.uv_layer(0).unwrap(),
            lifted,
            Vector3::z(),
            &options,
            None,
        );
        assert!(matches!(outcome, Err(MeshError::IncompleteCoverage { total: 8, .. })));

        let (mesh, overlay) = (editor.mesh(), editor.overlay());
        let below = overlay.triangle(FaceId::new(2)).unwrap();
        for (e, v) in below.into_iter().zip(mesh.face_triangle(FaceId::new(2))) {
            let p = mesh.position(v);
            assert!((overlay.uv(e) - Point2::new(p.x, p.y)).norm() < 1e-9);
        }
        assert!(!overlay.is_set_triangle(FaceId::new(5)));
    }

    #[test]
    fn test_transfer_via_projection_reports_misses() {
        let mut source = UvMesh::new(grid_mesh(1));
        UvEditor::new(&mut source, 0, false).unwrap().set_per_vertex_uvs(None);
        let bvh = MeshBvh::new(source.mesh());

        let mut target = UvMesh::new(grid_mesh(2));
        let mut editor = UvEditor::new(&mut target, 0, false).unwrap();
        let faces: Vec<FaceId> = editor.mesh().face_ids().collect();
        let shifted = |p: &Point3<f64>| Point3::new(p.x + 0.4, p.y, 0.0);
        let options = ProjectionTransferOptions::default()
            .with_signed_distance_range(-0.1, 0.1)
            .with_reset_unmatched(true);
        let outcome = editor.transfer_uvs_via_projection(
            &faces,
            &bvh,
            source.uv_layer(0).unwrap(),
            shifted,
            Vector3::z(),
            &options,
            None,
        );
        assert!(matches!(outcome, Err(MeshError::IncompleteCoverage { total: 8, .. })));
        assert_eq!(editor.overlay().set_triangle_ids().count(), 4);
    }
}
