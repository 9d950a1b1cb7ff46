//! Arena geometry: camera pixel offsets to ground offsets, triangle tests.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Convert a pixel offset into a ground-plane offset in metres.
///
/// Linear pinhole approximation: `d = offset * altitude / calibration`,
/// where `calibration` is pixels-per-metre at unit altitude for the rig.
#[inline]
pub fn scale_pixel_offset(offset: Vector2<f32>, altitude: f32, calibration: f32) -> Vector2<f32> {
    offset * altitude / calibration
}

/// Ground offset of a pixel relative to the optical centre of the frame.
///
/// Returns a zero vector when `pixel_center == frame_center`.
pub fn project_pixel_offset(
    pixel_center: Point2<f32>,
    frame_center: Point2<f32>,
    altitude: f32,
    calibration: f32,
) -> Vector2<f32> {
    scale_pixel_offset(pixel_center - frame_center, altitude, calibration)
}

/// Arithmetic mean of polygon vertices. `None` for an empty polygon.
pub fn polygon_centroid(points: &[Point2<f32>]) -> Option<Point2<f32>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector2::zeros(), |acc: Vector2<f32>, p| acc + p.coords);
    Some(Point2::from(sum / points.len() as f32))
}

#[inline]
fn edge_sign(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    (p.x - b.x) * (a.y - b.y) - (a.x - b.x) * (p.y - b.y)
}

#[inline]
fn orient(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    (p.x - b.x) * (a.y - b.y) - (a.x - b.x) * (p.y - b.y)
}

#[inline]
fn widen(p: Point2<f32>) -> Point2<f64> {
    Point2::new(f64::from(p.x), f64::from(p.y))
}

/// Boundary-inclusive point-in-triangle test.
///
/// A zero edge sign counts as neither side, so points on an edge or a
/// vertex are inside. Degenerate (zero-area) triangles contain nothing.
/// The answer does not depend on the order the vertices are given in.
pub fn point_in_triangle(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> bool {
    // Evaluate on lexicographically sorted vertices so every permutation
    // runs the exact same float operations.
    let mut v = [widen(a), widen(b), widen(c)];
    v.sort_by(|l, r| l.x.total_cmp(&r.x).then(l.y.total_cmp(&r.y)));
    let [a, b, c] = v;
    let p = widen(p);

    if orient(c, a, b) == 0.0 {
        return false;
    }

    let d1 = orient(p, a, b);
    let d2 = orient(p, b, c);
    let d3 = orient(p, c, a);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;

    !(has_neg && has_pos)
}

/// Triangular region of interest on the arena floor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f32; 2]; 3]", into = "[[f32; 2]; 3]")]
pub struct Triangle {
    pub a: Point2<f32>,
    pub b: Point2<f32>,
    pub c: Point2<f32>,
}

impl Triangle {
    pub fn new(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> Self {
        Self { a, b, c }
    }

    #[inline]
    pub fn contains(&self, p: Point2<f32>) -> bool {
        point_in_triangle(p, self.a, self.b, self.c)
    }

    /// Twice the signed area; zero for collinear vertices.
    pub fn doubled_area(&self) -> f32 {
        edge_sign(self.c, self.a, self.b)
    }

    pub fn is_finite(&self) -> bool {
        [self.a, self.b, self.c]
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite())
    }
}

impl From<[[f32; 2]; 3]> for Triangle {
    fn from(v: [[f32; 2]; 3]) -> Self {
        Self::new(
            Point2::new(v[0][0], v[0][1]),
            Point2::new(v[1][0], v[1][1]),
            Point2::new(v[2][0], v[2][1]),
        )
    }
}

impl From<Triangle> for [[f32; 2]; 3] {
    fn from(t: Triangle) -> Self {
        [[t.a.x, t.a.y], [t.b.x, t.b.y], [t.c.x, t.c.y]]
    }
}
