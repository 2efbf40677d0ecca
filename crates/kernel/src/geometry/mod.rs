//! Points, planes and bounding boxes shared by the faceted modeller.

pub mod bounds;
pub mod plane;

pub use bounds::BoundingBox;
pub use plane::{Plane, PolygonSplit};

/// Cartesian point in model space (millimetres).
pub type Point3 = nalgebra::Point3<f64>;
/// Cartesian vector in model space.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Distance below which a point is treated as lying on a plane.
pub const EPSILON: f64 = 1e-5;

/// Newell normal of a closed loop. Its length is twice the enclosed area.
pub fn newell_normal(points: &[Point3]) -> Vector3 {
    let mut normal = Vector3::zeros();
    for (i, current) in points.iter().enumerate() {
        let next = &points[(i + 1) % points.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    normal
}

/// Angle between two vectors in radians, clamped against rounding.
pub fn angle_between(a: &Vector3, b: &Vector3) -> f64 {
    let denom = a.norm() * b.norm();
    if denom <= f64::MIN_POSITIVE {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}
