//! Box, cylinder and regular-prism primitives centred on the Z axis.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::geometry::{Plane, Point3, Vector3};
use crate::mesh::{FacetedSolid, Polygon, SurfaceAllocator, SurfaceKind};
use crate::operations::OperationError;

/// Vertical placement of a primitive relative to Z = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Anchor {
    /// Top face at Z = 0, body below.
    Top,
    /// Bottom face at Z = 0, body above.
    Bottom,
    #[default]
    Center,
}

impl Anchor {
    /// Z extent of a body of the given height.
    pub fn z_range(self, height: f64) -> (f64, f64) {
        match self {
            Anchor::Top => (-height, 0.0),
            Anchor::Bottom => (0.0, height),
            Anchor::Center => (-height / 2.0, height / 2.0),
        }
    }
}

fn check_dimension(parameter: &'static str, value: f64) -> Result<(), OperationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(OperationError::InvalidPrimitive { parameter, value })
    }
}

/// Axis-aligned box of `size = [x, y, z]`.
#[instrument(skip(surfaces))]
pub fn make_box(
    surfaces: &mut SurfaceAllocator,
    size: [f64; 3],
    anchor: Anchor,
) -> Result<FacetedSolid, OperationError> {
    check_dimension("length", size[0])?;
    check_dimension("width", size[1])?;
    check_dimension("height", size[2])?;

    let (x0, x1) = (-size[0] / 2.0, size[0] / 2.0);
    let (y0, y1) = (-size[1] / 2.0, size[1] / 2.0);
    let (z0, z1) = anchor.z_range(size[2]);
    info!(min = ?[x0, y0, z0], max = ?[x1, y1, z1], "creating box primitive");

    let v = [
        Point3::new(x0, y0, z0),
        Point3::new(x1, y0, z0),
        Point3::new(x1, y1, z0),
        Point3::new(x0, y1, z0),
        Point3::new(x0, y0, z1),
        Point3::new(x1, y0, z1),
        Point3::new(x1, y1, z1),
        Point3::new(x0, y1, z1),
    ];
    // Counter-clockwise seen from outside.
    let faces: [([usize; 4], Vector3); 6] = [
        ([0, 3, 2, 1], -Vector3::z()),
        ([4, 5, 6, 7], Vector3::z()),
        ([0, 1, 5, 4], -Vector3::y()),
        ([3, 7, 6, 2], Vector3::y()),
        ([0, 4, 7, 3], -Vector3::x()),
        ([1, 2, 6, 5], Vector3::x()),
    ];

    let polygons = faces
        .iter()
        .map(|(idx, normal)| {
            let vertices: Vec<Point3> = idx.iter().map(|&i| v[i]).collect();
            let plane = Plane::from_normal_and_point(*normal, &vertices[0]);
            Polygon::with_plane(vertices, plane, surfaces.allocate(SurfaceKind::Planar))
        })
        .collect();
    Ok(FacetedSolid::new(polygons))
}

/// Faceted cylinder. The first vertex of each cap sits on +X and all side
/// facets share one cylindrical surface.
#[instrument(skip(surfaces))]
pub fn make_cylinder(
    surfaces: &mut SurfaceAllocator,
    radius: f64,
    height: f64,
    segments: u32,
    anchor: Anchor,
) -> Result<FacetedSolid, OperationError> {
    check_dimension("radius", radius)?;
    check_dimension("height", height)?;
    if segments < 3 {
        return Err(OperationError::InvalidPrimitive {
            parameter: "segments",
            value: f64::from(segments),
        });
    }
    info!(radius, height, segments, ?anchor, "creating cylinder primitive");
    let side = surfaces.allocate(SurfaceKind::Cylindrical);
    Ok(extrude_regular(surfaces, segments, radius, anchor.z_range(height), |_| side))
}

/// Regular prism with `sides` planar side faces and its first corner on +X.
#[instrument(skip(surfaces))]
pub fn make_prism(
    surfaces: &mut SurfaceAllocator,
    sides: u32,
    circumradius: f64,
    height: f64,
    anchor: Anchor,
) -> Result<FacetedSolid, OperationError> {
    if sides < 3 {
        return Err(OperationError::InvalidPrimitive {
            parameter: "sides",
            value: f64::from(sides),
        });
    }
    check_dimension("circumradius", circumradius)?;
    check_dimension("height", height)?;
    info!(sides, circumradius, height, ?anchor, "creating prism primitive");
    Ok(extrude_regular(
        surfaces,
        sides,
        circumradius,
        anchor.z_range(height),
        |s| s.allocate(SurfaceKind::Planar),
    ))
}

fn extrude_regular(
    surfaces: &mut SurfaceAllocator,
    sides: u32,
    radius: f64,
    (z0, z1): (f64, f64),
    mut side_surface: impl FnMut(&mut SurfaceAllocator) -> crate::mesh::Surface,
) -> FacetedSolid {
    let n = sides as usize;
    let ring: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let angle = TAU * i as f64 / n as f64;
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect();

    let mut polygons = Vec::with_capacity(n + 2);

    let bottom: Vec<Point3> = ring.iter().rev().map(|&(x, y)| Point3::new(x, y, z0)).collect();
    let plane = Plane::from_normal_and_point(-Vector3::z(), &bottom[0]);
    polygons.push(Polygon::with_plane(bottom, plane, surfaces.allocate(SurfaceKind::Planar)));

    let top: Vec<Point3> = ring.iter().map(|&(x, y)| Point3::new(x, y, z1)).collect();
    let plane = Plane::from_normal_and_point(Vector3::z(), &top[0]);
    polygons.push(Polygon::with_plane(top, plane, surfaces.allocate(SurfaceKind::Planar)));

    for i in 0..n {
        let (xa, ya) = ring[i];
        let (xb, yb) = ring[(i + 1) % n];
        let mid = TAU * (i as f64 + 0.5) / n as f64;
        let vertices = vec![
            Point3::new(xa, ya, z0),
            Point3::new(xb, yb, z0),
            Point3::new(xb, yb, z1),
            Point3::new(xa, ya, z1),
        ];
        let plane = Plane::from_normal_and_point(Vector3::new(mid.cos(), mid.sin(), 0.0), &vertices[0]);
        polygons.push(Polygon::with_plane(vertices, plane, side_surface(surfaces)));
    }
    FacetedSolid::new(polygons)
}
