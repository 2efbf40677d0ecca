use super::{EPSILON, Point3, Vector3, newell_normal};
use crate::mesh::Polygon;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// Oriented plane `normal · p = w` with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3,
    pub w: f64,
}

/// Where a polygon lies relative to a plane.
#[derive(Debug, Clone)]
pub enum PolygonSplit {
    CoplanarFront,
    CoplanarBack,
    Front,
    Back,
    /// The polygon crosses the plane. Either half may vanish when it collapses
    /// below three vertices.
    Spanning {
        front: Option<Polygon>,
        back: Option<Polygon>,
    },
}

impl Plane {
    pub fn from_normal_and_point(normal: Vector3, point: &Point3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            w: normal.dot(&point.coords),
        }
    }

    /// Best-fit plane of a loop, `None` for a degenerate loop.
    pub fn from_points(points: &[Point3]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let n = newell_normal(points);
        let len = n.norm();
        if len < 1e-12 {
            return None;
        }
        let normal = n / len;
        let centroid = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / points.len() as f64;
        Some(Self {
            normal,
            w: normal.dot(&centroid),
        })
    }

    pub fn signed_distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.coords) - self.w
    }

    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            w: -self.w,
        }
    }

    /// Same orientation and offset within `tolerance`.
    pub fn is_coplanar_with(&self, other: &Plane, tolerance: f64) -> bool {
        self.normal.dot(&other.normal) > 1.0 - 1e-9 && (self.w - other.w).abs() <= tolerance
    }

    pub fn translated(&self, offset: &Vector3) -> Self {
        Self {
            normal: self.normal,
            w: self.w + self.normal.dot(offset),
        }
    }

    fn classify_point(&self, p: &Point3) -> u8 {
        let t = self.signed_distance(p);
        if t < -EPSILON {
            BACK
        } else if t > EPSILON {
            FRONT
        } else {
            COPLANAR
        }
    }

    /// Bitmask of the sides a polygon touches; used when scoring splitters.
    pub(crate) fn classify_polygon(&self, polygon: &Polygon) -> u8 {
        polygon
            .vertices
            .iter()
            .fold(COPLANAR, |acc, v| acc | self.classify_point(v))
    }

    pub(crate) fn is_spanning(mask: u8) -> bool {
        mask == SPANNING
    }

    pub(crate) fn side_of(mask: u8) -> i32 {
        match mask {
            FRONT => 1,
            BACK => -1,
            _ => 0,
        }
    }

    /// Classify `polygon` against this plane, cutting it in two when it spans.
    pub fn split_polygon(&self, polygon: &Polygon) -> PolygonSplit {
        let types: Vec<u8> = polygon
            .vertices
            .iter()
            .map(|v| self.classify_point(v))
            .collect();
        let mask = types.iter().fold(COPLANAR, |acc, t| acc | t);

        match mask {
            COPLANAR => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    PolygonSplit::CoplanarFront
                } else {
                    PolygonSplit::CoplanarBack
                }
            }
            FRONT => PolygonSplit::Front,
            BACK => PolygonSplit::Back,
            _ => {
                let n = polygon.vertices.len();
                let mut front = Vec::with_capacity(n + 1);
                let mut back = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (ti, tj) = (types[i], types[j]);
                    let vi = polygon.vertices[i];
                    let vj = polygon.vertices[j];
                    if ti != BACK {
                        front.push(vi);
                    }
                    if ti != FRONT {
                        back.push(vi);
                    }
                    if (ti | tj) == SPANNING {
                        let denom = self.normal.dot(&(vj - vi));
                        let t = (self.w - self.normal.dot(&vi.coords)) / denom;
                        let v = vi + (vj - vi) * t;
                        front.push(v);
                        back.push(v);
                    }
                }
                PolygonSplit::Spanning {
                    front: (front.len() >= 3).then(|| polygon.with_vertices(front)),
                    back: (back.len() >= 3).then(|| polygon.with_vertices(back)),
                }
            }
        }
    }
}
