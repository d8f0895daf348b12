//! Per-vertex solver output.

use std::marker::PhantomData;

use nalgebra::{Point2, Vector2};

use crate::mesh::{MeshIndex, VertexId};

/// One UV position per vertex of the mesh a solver ran on.
///
/// This is the solver-side representation; the editor copies it into a
/// [`UvOverlay`](crate::mesh::UvOverlay) afterwards.
///
/// # Example
///
/// ```
/// use morsel_uv::algo::parameterize::UVMap;
/// use morsel_uv::mesh::VertexId;
/// use nalgebra::{Point2, Vector2};
///
/// let mut uv: UVMap = UVMap::new(vec![Point2::new(0.0, 0.0), Point2::new(2.0, 1.0)]);
/// uv.translate(Vector2::new(1.0, 1.0));
/// assert_eq!(uv.get(VertexId::new(1)), Point2::new(3.0, 2.0));
/// ```
#[derive(Debug, Clone)]
pub struct UVMap<I: MeshIndex = u32> {
    coords: Vec<Point2<f64>>,
    _marker: PhantomData<I>,
}

impl<I: MeshIndex> UVMap<I> {
    /// Wrap coordinates indexed by vertex id.
    pub fn new(coords: Vec<Point2<f64>>) -> Self {
        Self {
            coords,
            _marker: PhantomData,
        }
    }

    /// UV of a vertex.
    #[inline]
    pub fn get(&self, v: VertexId<I>) -> Point2<f64> {
        self.coords[v.index()]
    }

    /// Overwrite the UV of a vertex.
    #[inline]
    pub fn set(&mut self, v: VertexId<I>, uv: Point2<f64>) {
        self.coords[v.index()] = uv;
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Iterate over `(vertex, uv)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId<I>, Point2<f64>)> + '_ {
        self.coords
            .iter()
            .enumerate()
            .map(|(i, &uv)| (VertexId::new(i), uv))
    }

    /// Shift every coordinate by `offset`.
    pub fn translate(&mut self, offset: Vector2<f64>) {
        for uv in &mut self.coords {
            *uv += offset;
        }
    }

    /// Axis-aligned bounds, or `None` when empty.
    pub fn bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = *self.coords.first()?;
        Some(
            self.coords
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.inf(p), hi.sup(p))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_and_translate() {
        let mut uv: UVMap = UVMap::new(vec![
            Point2::new(-1.0, 0.5),
            Point2::new(2.0, -0.5),
            Point2::new(0.5, 3.0),
        ]);
        assert_eq!(uv.len(), 3);
        assert_eq!(
            uv.bounding_box(),
            Some((Point2::new(-1.0, -0.5), Point2::new(2.0, 3.0)))
        );

        uv.translate(Vector2::new(1.0, 0.5));
        assert_eq!(uv.get(VertexId::new(0)), Point2::new(0.0, 1.0));
        assert!(UVMap::<u32>::new(Vec::new()).bounding_box().is_none());
    }
}
