//! Orthonormal 3D frames used as projection planes.

use nalgebra::{Point2, Point3, Rotation3, Vector3};

/// An origin plus a right-handed orthonormal basis.
///
/// The `z` axis is the frame normal; `x` and `y` span the tangent plane that
/// planar projections map onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame3 {
    /// Frame origin.
    pub origin: Point3<f64>,
    /// First tangent axis.
    pub x: Vector3<f64>,
    /// Second tangent axis.
    pub y: Vector3<f64>,
    /// Normal axis.
    pub z: Vector3<f64>,
}

impl Default for Frame3 {
    fn default() -> Self {
        Self::new(Point3::origin())
    }
}

impl Frame3 {
    /// World-aligned frame at `origin`.
    pub fn new(origin: Point3<f64>) -> Self {
        Self {
            origin,
            x: Vector3::x(),
            y: Vector3::y(),
            z: Vector3::z(),
        }
    }

    /// Frame with the given normal.
    ///
    /// The tangent axis is the world axis least aligned with `normal`, made
    /// orthogonal to it, so the result only depends on the normal. A zero
    /// normal yields the world frame.
    pub fn from_normal(origin: Point3<f64>, normal: Vector3<f64>) -> Self {
        let Some(z) = normal.try_normalize(f64::EPSILON) else {
            return Self::new(origin);
        };

        let axes = [Vector3::x(), Vector3::y(), Vector3::z()];
        let mut least = axes[0];
        for axis in axes {
            if axis.dot(&z).abs() < least.dot(&z).abs() {
                least = axis;
            }
        }

        let x = (least - z * least.dot(&z)).normalize();
        let y = z.cross(&x);
        Self { origin, x, y, z }
    }

    /// Axis `k` (0 = x, 1 = y, 2 = z).
    pub fn axis(&self, k: usize) -> Vector3<f64> {
        match k {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Coordinates of `p` in this frame.
    pub fn to_local(&self, p: &Point3<f64>) -> Vector3<f64> {
        let d = p - self.origin;
        Vector3::new(d.dot(&self.x), d.dot(&self.y), d.dot(&self.z))
    }

    /// World position of local coordinates.
    pub fn from_local(&self, local: &Vector3<f64>) -> Point3<f64> {
        self.origin + self.x * local.x + self.y * local.y + self.z * local.z
    }

    /// Project `p` onto the tangent plane and return its 2D coordinates.
    pub fn to_plane_uv(&self, p: &Point3<f64>) -> Point2<f64> {
        let d = p - self.origin;
        Point2::new(d.dot(&self.x), d.dot(&self.y))
    }

    /// Rotate the frame by the minimal rotation taking `z` onto `normal`.
    pub fn align_z(&self, normal: &Vector3<f64>) -> Self {
        let Some(n) = normal.try_normalize(f64::EPSILON) else {
            return *self;
        };
        match Rotation3::rotation_between(&self.z, &n) {
            Some(rot) => Self {
                origin: self.origin,
                x: rot * self.x,
                y: rot * self.y,
                z: n,
            },
            // Antiparallel: flip around the x axis.
            None => Self {
                origin: self.origin,
                x: self.x,
                y: -self.y,
                z: -self.z,
            },
        }
    }
}
