//! Bounding volume hierarchy over the faces of a mesh, for ray casts.
//!
//! Nodes split at the midpoint of their largest axis; leaves hold at most a
//! handful of faces.

use nalgebra::{Point3, Vector3};

use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex};

const LEAF_SIZE: usize = 4;

/// A ray with an origin and a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray origin.
    pub origin: Point3<f64>,
    /// Unit direction.
    pub direction: Vector3<f64>,
}

impl Ray {
    /// Create a ray; the direction is normalized.
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            origin,
            direction: direction
                .try_normalize(f64::EPSILON)
                .unwrap_or_else(Vector3::z),
        }
    }

    /// Point at parameter `t`.
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }
}

/// Result of a ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit<I: MeshIndex = u32> {
    /// Face that was hit.
    pub face: FaceId<I>,
    /// Distance along the ray.
    pub distance: f64,
    /// Barycentric coordinates of the hit point with respect to the face corners.
    pub barycentric: Vector3<f64>,
}

/// Ray/triangle intersection (Möller–Trumbore), double sided.
///
/// Returns `(t, u, v)` with the hit at `p0 + u (p1 - p0) + v (p2 - p0)`.
pub fn intersect_triangle(tri: &[Point3<f64>; 3], ray: &Ray) -> Option<(f64, f64, f64)> {
    const EPS: f64 = 1e-12;
    let [p0, p1, p2] = tri;
    let e0 = p1 - p0;
    let e1 = p2 - p0;
    let h = ray.direction.cross(&e1);
    let a = e0.dot(&h);
    if a.abs() < EPS {
        return None;
    }
    let f = 1.0 / a;
    let s = ray.origin - p0;
    let u = f * s.dot(&h);
    if !(-EPS..=1.0 + EPS).contains(&u) {
        return None;
    }
    let q = s.cross(&e0);
    let v = f * ray.direction.dot(&q);
    if v < -EPS || u + v > 1.0 + EPS {
        return None;
    }
    let t = f * e1.dot(&q);
    (t >= 0.0).then_some((t, u, v))
}

#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Point3<f64>,
    max: Point3<f64>,
}

impl Aabb {
    fn empty() -> Self {
        Self {
            min: Point3::from(Vector3::repeat(f64::INFINITY)),
            max: Point3::from(Vector3::repeat(f64::NEG_INFINITY)),
        }
    }

    fn add_point(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    fn largest_dimension(&self) -> usize {
        let d = self.max - self.min;
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Slab test; true when the ray enters the box before `max_t`.
    fn hit(&self, ray: &Ray, max_t: f64) -> bool {
        let mut tmin: f64 = 0.0;
        let mut tmax = max_t;
        for i in 0..3 {
            let inv = 1.0 / ray.direction[i];
            let mut t0 = (self.min[i] - ray.origin[i]) * inv;
            let mut t1 = (self.max[i] - ray.origin[i]) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // NaN from 0 * inf keeps the previous bound.
            if t0 > tmin {
                tmin = t0;
            }
            if t1 < tmax {
                tmax = t1;
            }
            if tmax < tmin {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
struct BvhNode {
    aabb: Aabb,
    /// First face (leaf) or left child (internal).
    start: usize,
    /// Number of faces; zero for internal nodes whose children are `start` and `start + 1`.
    count: usize,
}

/// A BVH over all faces of a mesh.
#[derive(Debug)]
pub struct MeshBvh<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    nodes: Vec<BvhNode>,
    faces: Vec<FaceId<I>>,
}

impl<'a, I: MeshIndex> MeshBvh<'a, I> {
    /// Build the hierarchy.
    pub fn new(mesh: &'a HalfEdgeMesh<I>) -> Self {
        let faces: Vec<FaceId<I>> = mesh.face_ids().collect();
        let centroids: Vec<Point3<f64>> = faces.iter().map(|&f| mesh.face_centroid(f)).collect();

        let mut bvh = Self {
            mesh,
            nodes: Vec::with_capacity(2 * faces.len().max(1)),
            faces,
        };
        let mut order: Vec<usize> = (0..bvh.faces.len()).collect();
        bvh.nodes.push(BvhNode {
            aabb: Aabb::empty(),
            start: 0,
            count: order.len(),
        });
        bvh.update_bounds(0, &order);
        bvh.subdivide(0, &mut order, &centroids);
        bvh.faces = order.iter().map(|&i| FaceId::new(i)).collect();
        bvh
    }

    fn update_bounds(&mut self, idx: usize, order: &[usize]) {
        let node = &self.nodes[idx];
        let mut aabb = Aabb::empty();
        for &i in &order[node.start..node.start + node.count] {
            for p in self.mesh.face_positions(FaceId::new(i)) {
                aabb.add_point(&p);
            }
        }
        self.nodes[idx].aabb = aabb;
    }

    fn subdivide(&mut self, idx: usize, order: &mut [usize], centroids: &[Point3<f64>]) {
        let BvhNode { aabb, start, count } = self.nodes[idx].clone();
        if count <= LEAF_SIZE {
            return;
        }

        let axis = aabb.largest_dimension();
        let split = 0.5 * (aabb.min[axis] + aabb.max[axis]);

        let slice = &mut order[start..start + count];
        let mut i = 0;
        let mut j = slice.len();
        while i < j {
            if centroids[slice[i]][axis] < split {
                i += 1;
            } else {
                j -= 1;
                slice.swap(i, j);
            }
        }

        let mut left_count = i;
        if left_count == 0 || left_count == count {
            // All centroids on one side: fall back to a median split.
            slice.sort_by(|&a, &b| centroids[a][axis].total_cmp(&centroids[b][axis]));
            left_count = count / 2;
        }

        let left = self.nodes.len();
        self.nodes.push(BvhNode {
            aabb: Aabb::empty(),
            start,
            count: left_count,
        });
        self.nodes.push(BvhNode {
            aabb: Aabb::empty(),
            start: start + left_count,
            count: count - left_count,
        });
        self.nodes[idx].start = left;
        self.nodes[idx].count = 0;

        self.update_bounds(left, order);
        self.update_bounds(left + 1, order);
        self.subdivide(left, order, centroids);
        self.subdivide(left + 1, order, centroids);
    }

    /// Nearest hit along `ray` within `max_distance`, skipping faces rejected by `filter`.
    pub fn cast_ray<F>(&self, ray: &Ray, max_distance: f64, filter: F) -> Option<RayHit<I>>
    where
        F: Fn(FaceId<I>) -> bool,
    {
        if self.faces.is_empty() {
            return None;
        }

        let mut best: Option<RayHit<I>> = None;
        let mut limit = max_distance;
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.aabb.hit(ray, limit) {
                continue;
            }
            if node.count == 0 {
                stack.push(node.start);
                stack.push(node.start + 1);
                continue;
            }
            for &f in &self.faces[node.start..node.start + node.count] {
                if !filter(f) {
                    continue;
                }
                let tri = self.mesh.face_positions(f);
                if let Some((t, u, v)) = intersect_triangle(&tri, ray) {
                    if t <= limit {
                        limit = t;
                        best = Some(RayHit {
                            face: f,
                            distance: t,
                            barycentric: Vector3::new(1.0 - u - v, u, v),
                        });
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::{cube_mesh, grid_mesh};

    #[test]
    fn test_ray_hits_grid() {
        let mesh = grid_mesh(8);
        let bvh = MeshBvh::new(&mesh);
        let ray = Ray::new(Point3::new(0.3, 0.6, 1.0), -Vector3::z());
        let hit = bvh.cast_ray(&ray, 10.0, |_| true).unwrap();
        assert!((hit.distance - 1.0).abs() < 1e-12);

        let [p0, p1, p2] = mesh.face_positions(hit.face);
        let b = hit.barycentric;
        let p = p0.coords * b.x + p1.coords * b.y + p2.coords * b.z;
        assert!((p - Vector3::new(0.3, 0.6, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_max_distance_and_filter() {
        let mesh = grid_mesh(4);
        let bvh = MeshBvh::new(&mesh);
        let ray = Ray::new(Point3::new(0.3, 0.6, 1.0), -Vector3::z());
        assert!(bvh.cast_ray(&ray, 0.5, |_| true).is_none());
        assert!(bvh.cast_ray(&ray, 2.0, |_| false).is_none());
    }

    #[test]
    fn test_nearest_of_two_hits() {
        let mesh = cube_mesh();
        let bvh = MeshBvh::new(&mesh);
        let ray = Ray::new(Point3::new(0.5, 0.5, -1.0), Vector3::z());
        let hit = bvh.cast_ray(&ray, 10.0, |_| true).unwrap();
        assert!((hit.distance - 1.0).abs() < 1e-12);
        assert!(mesh.face_normal(hit.face).z < 0.0);
    }
}
