use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Plane, Point3, Vector3, newell_normal};

/// Kind of the surface a facet approximates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SurfaceKind {
    Planar,
    Cylindrical,
    Blend,
}

/// Identity of a generating surface. Facets sharing an id belong to one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Surface {
    pub id: u32,
    pub kind: SurfaceKind,
}

/// Convex planar polygon wound counter-clockwise about its plane normal.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub vertices: Vec<Point3>,
    pub plane: Plane,
    pub surface: Surface,
}

impl Polygon {
    /// Returns `None` when the vertices do not span a plane.
    pub fn new(vertices: Vec<Point3>, surface: Surface) -> Option<Self> {
        let plane = Plane::from_points(&vertices)?;
        Some(Self {
            vertices,
            plane,
            surface,
        })
    }

    pub fn with_plane(vertices: Vec<Point3>, plane: Plane, surface: Surface) -> Self {
        Self {
            vertices,
            plane,
            surface,
        }
    }

    /// Fragment of this polygon: same plane and surface, new outline.
    pub(crate) fn with_vertices(&self, vertices: Vec<Point3>) -> Self {
        Self {
            vertices,
            plane: self.plane,
            surface: self.surface,
        }
    }

    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane = self.plane.flipped();
    }

    pub fn translate(&mut self, offset: &Vector3) {
        for v in &mut self.vertices {
            *v += *offset;
        }
        self.plane = self.plane.translated(offset);
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }

    pub fn area(&self) -> f64 {
        newell_normal(&self.vertices).norm() * 0.5
    }

    /// Fan triangles anchored at the first vertex.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        (1..self.vertices.len().saturating_sub(1))
            .map(move |i| [self.vertices[0], self.vertices[i], self.vertices[i + 1]])
    }
}
