//! Discrete exponential map.
//!
//! Tangent-plane coordinates are propagated outward from a seed vertex in
//! order of graph distance. Each vertex takes the weighted average of the
//! predictions made by its already-finalized neighbours: a neighbour `u`
//! predicts `U(u) + F(u)(p_v - p_u)` where `F(u)` is `u`'s tangent frame and
//! the offset is flattened into that frame while keeping its length. Frames
//! are carried along with minimal rotations between vertex normals.
//!
//! # References
//!
//! - Schmidt, R., Grimm, C., & Wyvill, B. (2006). "Interactive decal
//!   compositing with discrete exponential maps." ACM SIGGRAPH.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nalgebra::{Point2, Vector2, Vector3};

use crate::geom::Frame3;
use crate::mesh::{HalfEdgeMesh, MeshIndex, VertexId};

#[derive(Debug, Clone, Copy)]
struct Front {
    distance: f64,
    vertex: usize,
}

impl PartialEq for Front {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for Front {}

impl PartialOrd for Front {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Front {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on distance.
        other.distance.total_cmp(&self.distance)
    }
}

/// Compute exponential map coordinates for every vertex reachable from `seed`.
///
/// `normals` holds one normal per vertex. The seed's value is the origin and
/// its frame is `seed_frame` rotated onto the seed normal. Vertices that are
/// unreachable or whose value is not finite come back as `None`.
pub fn exp_map<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    normals: &[Vector3<f64>],
    seed: VertexId<I>,
    seed_frame: &Frame3,
) -> Vec<Option<Point2<f64>>> {
    let n = mesh.num_vertices();
    let mut values: Vec<Option<Point2<f64>>> = vec![None; n];
    if seed.index() >= n {
        return values;
    }

    let mut frames: Vec<Option<Frame3>> = vec![None; n];
    let mut distance = vec![f64::INFINITY; n];
    let mut done = vec![false; n];
    let mut heap = BinaryHeap::new();

    distance[seed.index()] = 0.0;
    heap.push(Front {
        distance: 0.0,
        vertex: seed.index(),
    });

    while let Some(Front { distance: d, vertex }) = heap.pop() {
        if done[vertex] {
            continue;
        }
        let v = VertexId::new(vertex);
        let p_v = *mesh.position(v);

        if v == seed {
            let mut frame = seed_frame.align_z(&normals[vertex]);
            frame.origin = p_v;
            values[vertex] = Some(Point2::origin());
            frames[vertex] = Some(frame);
        } else {
            let mut sum = Vector2::zeros();
            let mut total_weight = 0.0;
            let mut best: Option<(f64, Frame3)> = None;

            for u in mesh.vertex_neighbors(v) {
                let (Some(value_u), Some(frame_u)) = (values[u.index()], frames[u.index()]) else {
                    continue;
                };
                let offset = p_v - frame_u.origin;
                let len_sq = offset.norm_squared();
                let mut tangent = offset - frame_u.z * frame_u.z.dot(&offset);
                let tangent_len = tangent.norm();
                if tangent_len > f64::EPSILON {
                    tangent *= len_sq.sqrt() / tangent_len;
                }
                let prediction =
                    value_u.coords + Vector2::new(tangent.dot(&frame_u.x), tangent.dot(&frame_u.y));

                let weight = 1.0 / len_sq.max(1e-24);
                sum += prediction * weight;
                total_weight += weight;
                if best.map_or(true, |(w, _)| weight > w) {
                    best = Some((weight, frame_u));
                }
            }

            if let Some((_, frame_u)) = best {
                let value = sum / total_weight;
                if value.x.is_finite() && value.y.is_finite() {
                    values[vertex] = Some(Point2::from(value));
                    let mut frame = frame_u.align_z(&normals[vertex]);
                    frame.origin = p_v;
                    frames[vertex] = Some(frame);
                }
            }
        }

        done[vertex] = true;
        if frames[vertex].is_none() {
            // Nothing can be propagated through a vertex without a value.
            continue;
        }
        for he in mesh.vertex_halfedges(v) {
            let u = mesh.dest(he).index();
            let nd = d + mesh.halfedge_length(he);
            if !done[u] && nd < distance[u] {
                distance[u] = nd;
                heap.push(Front {
                    distance: nd,
                    vertex: u,
                });
            }
        }
    }

    values
}
