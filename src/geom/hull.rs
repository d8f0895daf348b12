//! 2D convex hull and minimum-area enclosing rectangle.

use std::cmp::Ordering;

use nalgebra::{Point2, Vector2};

/// Orientation of the turn a -> b -> c.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TurnKind {
    /// The three points are collinear.
    Collinear,
    /// Clockwise turn.
    Right,
    /// Counter-clockwise turn.
    Left,
}

/// Classify the turn a -> b -> c.
pub fn turn_kind(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> TurnKind {
    match cross(a, b, c).partial_cmp(&0.0) {
        Some(Ordering::Greater) => TurnKind::Left,
        Some(Ordering::Less) => TurnKind::Right,
        _ => TurnKind::Collinear,
    }
}

fn cross(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b - a).perp(&(c - a))
}

/// Convex hull of a point set in counter-clockwise order (monotone chain).
///
/// Collinear points on hull edges are dropped. Fewer than three distinct
/// input points are returned as-is (deduplicated).
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point2<f64>> = Vec::with_capacity(pts.len() * 2);
    for pass in 0..2 {
        let start = hull.len();
        let iter: Box<dyn Iterator<Item = &Point2<f64>>> = if pass == 0 {
            Box::new(pts.iter())
        } else {
            Box::new(pts.iter().rev())
        };
        for p in iter {
            while hull.len() >= start + 2
                && turn_kind(&hull[hull.len() - 2], &hull[hull.len() - 1], p) != TurnKind::Left
            {
                hull.pop();
            }
            hull.push(*p);
        }
        // The last point of each chain starts the next one.
        hull.pop();
    }
    hull
}

/// A rectangle aligned with a rotated frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedRect {
    /// Rotation of the rectangle's first axis from +x, in radians.
    pub angle: f64,
    /// Extent along the first axis.
    pub width: f64,
    /// Extent along the second axis.
    pub height: f64,
}

impl OrientedRect {
    /// Rectangle area.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Smallest-area enclosing rectangle of a convex polygon.
///
/// Every hull edge is tried as the rectangle's first axis. The perpendicular
/// extent is accumulated point by point and a candidate is abandoned as soon
/// as its partial area exceeds the best found so far.
pub fn min_area_rect(hull: &[Point2<f64>]) -> Option<OrientedRect> {
    if hull.len() < 3 {
        return None;
    }

    let mut best: Option<OrientedRect> = None;
    for i in 0..hull.len() {
        let edge = hull[(i + 1) % hull.len()] - hull[i];
        let Some(axis) = edge.try_normalize(f64::EPSILON) else {
            continue;
        };
        let perp = Vector2::new(-axis.y, axis.x);

        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in hull {
            let t = p.coords.dot(&axis);
            lo = lo.min(t);
            hi = hi.max(t);
        }
        let width = hi - lo;

        let base = hull[i].coords.dot(&perp);
        let mut height: f64 = 0.0;
        let mut abandoned = false;
        for p in hull {
            // Interior lies to the left of every counter-clockwise edge.
            height = height.max(p.coords.dot(&perp) - base);
            if let Some(b) = &best {
                if width * height >= b.area() {
                    abandoned = true;
                    break;
                }
            }
        }
        if abandoned {
            continue;
        }

        best = Some(OrientedRect {
            angle: axis.y.atan2(axis.x),
            width,
            height,
        });
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_hull_drops_interior_and_collinear() {
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.5, 0.5),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        for k in 0..4 {
            let turn = turn_kind(&hull[k], &hull[(k + 1) % 4], &hull[(k + 2) % 4]);
            assert_eq!(turn, TurnKind::Left);
        }
    }

    #[test]
    fn test_min_area_rect_of_rotated_square() {
        let angle: f64 = 0.4;
        let (s, c) = angle.sin_cos();
        let pts: Vec<Point2<f64>> = [(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(x, y)| Point2::new(c * x - s * y, s * x + c * y))
            .collect();
        let rect = min_area_rect(&convex_hull(&pts)).unwrap();
        assert!((rect.area() - 2.0).abs() < 1e-9);
        // The axis is one of the rectangle's edge directions.
        let rem = (rect.angle - angle).rem_euclid(std::f64::consts::FRAC_PI_2);
        assert!(rem < 1e-9 || (std::f64::consts::FRAC_PI_2 - rem) < 1e-9);
    }

    #[test]
    fn test_degenerate_input() {
        assert!(min_area_rect(&convex_hull(&[Point2::new(1.0, 1.0)])).is_none());
        assert_eq!(convex_hull(&[]).len(), 0);
    }
}
