//! Exponential map and conformal unwraps of a face set.

use std::collections::HashSet;

use nalgebra::{Point2, Point3, Vector2, Vector3};

use super::{note, UvEditResult, UvEditor};
use crate::algo::geodesic::{dijkstra_multiple, DijkstraOptions};
use crate::algo::parameterize::{
    exp_map, farthest_pair, smoothed_vertex_normals, ConformalSolver, PinnedVertex, SolverOptions,
    UVMap,
};
use crate::error::{MeshError, Result};
use crate::geom::Frame3;
use crate::mesh::{ElementId, FaceId, HalfEdgeMesh, MeshIndex, Submesh, UvOverlay, VertexId};

/// Options for the exponential map unwraps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpMapOptions {
    /// Rounds of Laplacian normal smoothing; 0 disables smoothing.
    pub normal_smoothing_rounds: usize,
    /// Blend weight of each smoothing round, in `[0, 1]`.
    pub normal_smoothing_alpha: f64,
}

impl Default for ExpMapOptions {
    fn default() -> Self {
        Self {
            normal_smoothing_rounds: 0,
            normal_smoothing_alpha: 0.25,
        }
    }
}

impl ExpMapOptions {
    /// Set the number of smoothing rounds.
    pub fn with_normal_smoothing_rounds(mut self, rounds: usize) -> Self {
        self.normal_smoothing_rounds = rounds;
        self
    }

    /// Set the smoothing blend weight.
    pub fn with_normal_smoothing_alpha(mut self, alpha: f64) -> Self {
        self.normal_smoothing_alpha = alpha;
        self
    }
}

/// Options for [`UvEditor::set_triangle_uvs_from_conformal`].
#[derive(Debug, Clone)]
pub struct ConformalOptions<I: MeshIndex = u32> {
    /// Solve on the existing UV topology, keeping interior seams, instead of
    /// building one element per vertex.
    pub reuse_existing_topology: bool,
    /// Use the spectral solver instead of the pinned natural one.
    pub use_spectral: bool,
    /// Spectral only: weight boundary vertices by boundary edge length.
    pub preserve_irregularity: bool,
    /// Elements held at their current UV. Only used with existing topology
    /// and the natural solver.
    pub pinned_elements: Option<HashSet<ElementId<I>>>,
    /// Linear solver settings.
    pub solver: SolverOptions,
}

impl<I: MeshIndex> Default for ConformalOptions<I> {
    fn default() -> Self {
        Self {
            reuse_existing_topology: false,
            use_spectral: false,
            preserve_irregularity: true,
            pinned_elements: None,
            solver: SolverOptions::default(),
        }
    }
}

impl<I: MeshIndex> ConformalOptions<I> {
    /// Set whether the existing UV topology is kept.
    pub fn with_reuse_existing_topology(mut self, reuse: bool) -> Self {
        self.reuse_existing_topology = reuse;
        self
    }

    /// Set whether the spectral solver is used.
    pub fn with_spectral(mut self, spectral: bool) -> Self {
        self.use_spectral = spectral;
        self
    }

    /// Set the spectral boundary weighting.
    pub fn with_preserve_irregularity(mut self, preserve: bool) -> Self {
        self.preserve_irregularity = preserve;
        self
    }

    /// Hold these elements at their current UVs.
    pub fn with_pinned_elements(mut self, pinned: HashSet<ElementId<I>>) -> Self {
        self.pinned_elements = Some(pinned);
        self
    }

    /// Set the linear solver settings.
    pub fn with_solver(mut self, solver: SolverOptions) -> Self {
        self.solver = solver;
        self
    }
}

/// The vertex farthest from the longest boundary loop, or `None` without a boundary.
fn geodesic_center<I: MeshIndex>(sub: &Submesh<I>) -> Option<VertexId<I>> {
    let boundary = sub.longest_boundary_loop()?;
    let field = dijkstra_multiple(&sub.mesh, &boundary, &DijkstraOptions::default());
    field.farthest_vertex().map(|(v, _)| v)
}

/// Write per-submesh-vertex UVs as fresh elements; faces with a missing
/// value stay unset. Returns the number of such faces.
fn write_submesh_uvs<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    overlay: &mut UvOverlay<I>,
    sub: &Submesh<I>,
    values: &[Option<Point2<f64>>],
    result: &mut Option<&mut UvEditResult<I>>,
) -> usize {
    overlay.clear_triangles(sub.base_faces.iter().copied());

    let mut elements: Vec<Option<ElementId<I>>> = vec![None; values.len()];
    let mut failed = 0;
    for f in sub.mesh.face_ids() {
        let verts = sub.mesh.face_triangle(f);
        if verts.iter().any(|v| values[v.index()].is_none()) {
            failed += 1;
            continue;
        }
        let mut tri = [ElementId::invalid(); 3];
        for (k, v) in verts.into_iter().enumerate() {
            let i = v.index();
            tri[k] = match elements[i] {
                Some(e) => e,
                None => {
                    let uv = values[i].unwrap_or_else(Point2::origin);
                    let e = overlay.append_element(uv, sub.base_vertex(v));
                    note(result, e);
                    elements[i] = Some(e);
                    e
                }
            };
        }
        overlay.set_triangle(mesh, sub.base_face(f), tri);
    }
    failed
}

impl<I: MeshIndex> UvEditor<'_, I> {
    /// Unwrap a connected face set with a discrete exponential map.
    ///
    /// The map is seeded at the vertex farthest from the set's longest
    /// boundary loop. A closed set still gets UVs, seeded at its first
    /// vertex, but the call reports [`MeshError::NoBoundary`]. Faces with a
    /// vertex the map did not reach stay unset and are reported as
    /// [`MeshError::IncompleteCoverage`].
    pub fn set_triangle_uvs_from_exp_map(
        &mut self,
        faces: &[FaceId<I>],
        options: &ExpMapOptions,
        mut result: Option<&mut UvEditResult<I>>,
    ) -> Result<()> {
        let sub = Submesh::from_faces(self.mesh(), faces)?;
        let normals = smoothed_vertex_normals(
            &sub.mesh,
            options.normal_smoothing_rounds,
            options.normal_smoothing_alpha,
        );
        let center = geodesic_center(&sub);
        let seed = center.unwrap_or_else(|| VertexId::new(0));
        let frame = Frame3::from_normal(*sub.mesh.position(seed), normals[seed.index()]);

        let values = exp_map(&sub.mesh, &normals, seed, &frame);
        let (mesh, overlay) = self.parts_mut();
        let failed = write_submesh_uvs(mesh, overlay, &sub, &values, &mut result);
        finish_exp_map(center.is_some(), failed, sub.mesh.num_faces())
    }

    /// Exponential map anchored to a fixed frame.
    ///
    /// Vertex normals are blended toward `frame.z` by `normal_blend` before
    /// propagation, and the seed's UV is the projection of its transformed
    /// position onto `frame`. All UVs are divided by `dimension`.
    #[allow(clippy::too_many_arguments)]
    pub fn set_triangle_uvs_from_exp_map_with_frame<F>(
        &mut self,
        faces: &[FaceId<I>],
        options: &ExpMapOptions,
        frame: &Frame3,
        transform: F,
        dimension: Vector2<f64>,
        normal_blend: f64,
        mut result: Option<&mut UvEditResult<I>>,
    ) -> Result<()>
    where
        F: Fn(&Point3<f64>) -> Point3<f64>,
    {
        let sub = Submesh::from_faces(self.mesh(), faces)?;
        let blend = normal_blend.clamp(0.0, 1.0);
        let normals: Vec<Vector3<f64>> = smoothed_vertex_normals(
            &sub.mesh,
            options.normal_smoothing_rounds,
            options.normal_smoothing_alpha,
        )
        .into_iter()
        .map(|n| {
            let mixed = n * (1.0 - blend) + frame.z * blend;
            mixed.try_normalize(f64::EPSILON).unwrap_or(frame.z)
        })
        .collect();

        let center = geodesic_center(&sub);
        let seed = center.unwrap_or_else(|| VertexId::new(0));
        let seed_position = *sub.mesh.position(seed);
        let seed_frame = Frame3 {
            origin: seed_position,
            ..*frame
        };
        let anchor = frame.to_plane_uv(&transform(&seed_position)).coords;
        let scale = Vector2::new(
            if dimension.x.abs() < 1e-12 { 1.0 } else { dimension.x },
            if dimension.y.abs() < 1e-12 { 1.0 } else { dimension.y },
        );

        let values: Vec<Option<Point2<f64>>> = exp_map(&sub.mesh, &normals, seed, &seed_frame)
            .into_iter()
            .map(|uv| uv.map(|uv| Point2::from((uv.coords + anchor).component_div(&scale))))
            .collect();
        let (mesh, overlay) = self.parts_mut();
        let failed = write_submesh_uvs(mesh, overlay, &sub, &values, &mut result);
        finish_exp_map(center.is_some(), failed, sub.mesh.num_faces())
    }

    /// Conformal unwrap of a disk-like face set.
    ///
    /// Without existing topology every vertex gets one new element. With it,
    /// only faces that already have UVs take part, seams are kept, and the
    /// solved values are written onto the existing elements, which are then
    /// reported as new.
    ///
    /// The natural solver uses the pinned elements when at least two are
    /// given. Otherwise it pins the two farthest-apart vertices of the longest
    /// boundary loop to `(0, 0.5)` and `(1, 0.5)`; a single given pin is
    /// restored afterwards by translating the whole result.
    pub fn set_triangle_uvs_from_conformal(
        &mut self,
        faces: &[FaceId<I>],
        options: &ConformalOptions<I>,
        mut result: Option<&mut UvEditResult<I>>,
    ) -> Result<()> {
        let sub = if options.reuse_existing_topology {
            Submesh::from_overlay(self.mesh(), self.overlay(), faces)?
        } else {
            Submesh::from_faces(self.mesh(), faces)?
        };
        let Some(boundary) = sub.longest_boundary_loop() else {
            log::warn!("conformal unwrap: {} faces have no boundary", faces.len());
            return Err(MeshError::NoBoundary);
        };
        let boundary: Vec<usize> = boundary.iter().map(|v| v.index()).collect();

        let mut single_pin = None;
        let solver = if options.use_spectral {
            ConformalSolver::Spectral {
                boundary,
                preserve_irregularity: options.preserve_irregularity,
            }
        } else {
            let overlay = self.overlay();
            let mut pins = Vec::new();
            if let (Some(pinned), Some(elements)) = (&options.pinned_elements, &sub.base_elements) {
                for (i, e) in elements.iter().enumerate() {
                    if pinned.contains(e) {
                        let uv = overlay.uv(*e);
                        pins.push(PinnedVertex::new(i, uv.x, uv.y));
                    }
                }
            }
            if pins.len() == 1 {
                single_pin = Some(pins[0]);
            }
            if pins.len() < 2 {
                let positions: Vec<Point3<f64>> =
                    sub.mesh.vertex_ids().map(|v| *sub.mesh.position(v)).collect();
                let (a, b) = farthest_pair(&positions, &boundary).ok_or(
                    MeshError::DegenerateGeometry("boundary has no two distinct vertices"),
                )?;
                pins = vec![PinnedVertex::new(a, 0.0, 0.5), PinnedVertex::new(b, 1.0, 0.5)];
            }
            ConformalSolver::Natural { pins }
        };

        let mut uvs: UVMap<I> = solver.solve(&sub.mesh, &options.solver)?;
        if let Some(pin) = single_pin {
            let at = uvs.get(VertexId::new(pin.vertex));
            uvs.translate(Vector2::new(pin.u - at.x, pin.v - at.y));
        }

        let (mesh, overlay) = self.parts_mut();
        match &sub.base_elements {
            Some(elements) => {
                for (i, &e) in elements.iter().enumerate() {
                    overlay.set_uv(e, uvs.get(VertexId::new(i)));
                    note(&mut result, e);
                }
            }
            None => {
                let values: Vec<Option<Point2<f64>>> = uvs.iter().map(|(_, uv)| Some(uv)).collect();
                let failed = write_submesh_uvs(mesh, overlay, &sub, &values, &mut result);
                MeshError::check_coverage(failed, sub.mesh.num_faces())?;
            }
        }
        log::debug!(
            "conformal unwrap: {} vertices, {} faces, spectral: {}",
            sub.mesh.num_vertices(),
            sub.mesh.num_faces(),
            options.use_spectral
        );
        Ok(())
    }
}

fn finish_exp_map(centered: bool, failed: usize, total: usize) -> Result<()> {
    if !centered {
        log::warn!("exponential map: face set has no boundary loop");
        return Err(MeshError::NoBoundary);
    }
    if failed > 0 {
        log::warn!("exponential map: {} of {} faces unreached", failed, total);
    }
    MeshError::check_coverage(failed, total)
}
