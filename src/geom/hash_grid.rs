//! Uniform hash grid over 3D points.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

/// Points bucketed into cubic cells for radius queries.
#[derive(Debug, Clone)]
pub struct PointHashGrid<T> {
    cell_size: f64,
    cells: HashMap<[i64; 3], Vec<(Point3<f64>, T)>>,
    len: usize,
}

impl<T: Copy> PointHashGrid<T> {
    /// Create an empty grid. Non-positive cell sizes fall back to 1.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    /// Cell edge length.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check whether the grid is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn cell_of(&self, p: &Point3<f64>) -> [i64; 3] {
        [
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        ]
    }

    /// Insert a point with its payload.
    pub fn insert(&mut self, p: Point3<f64>, value: T) {
        let key = self.cell_of(&p);
        self.cells.entry(key).or_default().push((p, value));
        self.len += 1;
    }

    /// Nearest stored point within `radius` of `p`, with its distance.
    pub fn find_nearest_in_radius(&self, p: &Point3<f64>, radius: f64) -> Option<(T, f64)> {
        let lo = self.cell_of(&(p - Vector3::repeat(radius)));
        let hi = self.cell_of(&(p + Vector3::repeat(radius)));

        let mut best: Option<(T, f64)> = None;
        for x in lo[0]..=hi[0] {
            for y in lo[1]..=hi[1] {
                for z in lo[2]..=hi[2] {
                    let Some(cell) = self.cells.get(&[x, y, z]) else {
                        continue;
                    };
                    for (q, value) in cell {
                        let d = (q - p).norm();
                        if d > radius {
                            continue;
                        }
                        let better = match &best {
                            None => true,
                            Some((_, bd)) => d < *bd,
                        };
                        if better {
                            best = Some((*value, d));
                        }
                    }
                }
            }
        }
        best
    }
}
