use tracing::debug;

use super::{Polygon, Surface, SurfaceKind};
use crate::geometry::{BoundingBox, Vector3};

/// Closed polygon soup with outward-facing windings.
#[derive(Debug, Clone, Default)]
pub struct FacetedSolid {
    pub polygons: Vec<Polygon>,
}

impl FacetedSolid {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn translated(&self, offset: &Vector3) -> Self {
        let mut polygons = self.polygons.clone();
        for p in &mut polygons {
            p.translate(offset);
        }
        debug!(offset = ?[offset.x, offset.y, offset.z], polygons = polygons.len(), "translated solid");
        Self { polygons }
    }

    /// Complement of the solid: every polygon flipped.
    pub fn inverted(&self) -> Self {
        let mut polygons = self.polygons.clone();
        for p in &mut polygons {
            p.flip();
        }
        Self { polygons }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.polygons.iter().flat_map(|p| p.vertices.iter()))
    }

    /// Enclosed volume by the divergence theorem. Negative for inside-out soups.
    pub fn volume(&self) -> f64 {
        self.polygons
            .iter()
            .flat_map(|p| p.triangles())
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)))
            .sum::<f64>()
            / 6.0
    }

    pub fn surface_area(&self) -> f64 {
        self.polygons.iter().map(Polygon::area).sum()
    }
}

/// Hands out fresh surface ids. One allocator serves every solid that may be
/// combined, so ids never collide across operands.
#[derive(Debug, Clone, Default)]
pub struct SurfaceAllocator {
    next: u32,
}

impl SurfaceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, kind: SurfaceKind) -> Surface {
        let id = self.next;
        self.next += 1;
        Surface { id, kind }
    }
}
