//! Triangle meshes from a recovered topology.

use std::ops::Range;

use crate::geometry::{Point3, Vector3};
use crate::topology::{FaceId, Topology};

/// Triangles below this area are dropped.
const DEGENERATE_TRIANGLE: f64 = 1e-14;

/// Indexed triangle mesh grouped by face.
#[derive(Debug, Clone, Default)]
pub struct Tessellation {
    pub positions: Vec<Point3>,
    pub triangles: Vec<[u32; 3]>,
    /// Plane normal of the loop each triangle came from.
    pub normals: Vec<Vector3>,
    /// Triangle index range of every face, in face order.
    pub face_ranges: Vec<(FaceId, Range<usize>)>,
}

impl Tessellation {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| self.positions[i as usize]);
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }
}

/// Triangulate every loop. Triangles keep to the welded vertices and loops with
/// more than three points fan out from an added centroid, so shared loop edges
/// stay shared in the mesh.
pub fn tessellate(topology: &Topology) -> Tessellation {
    let mut mesh = Tessellation {
        positions: topology.points.clone(),
        ..Tessellation::default()
    };
    for (face_id, face) in &topology.faces {
        let first = mesh.triangles.len();
        for &li in &face.loops {
            let l = &topology.loops[li];
            let normal = l.plane.normal;
            if l.points.len() == 3 {
                push_triangle(&mut mesh, [l.points[0], l.points[1], l.points[2]], normal);
                continue;
            }
            let centroid = topology
                .loop_points(li)
                .fold(Vector3::zeros(), |acc, p| acc + p.coords)
                / l.points.len() as f64;
            let center = mesh.positions.len() as u32;
            mesh.positions.push(Point3::from(centroid));
            let n = l.points.len();
            for i in 0..n {
                push_triangle(&mut mesh, [center, l.points[i], l.points[(i + 1) % n]], normal);
            }
        }
        mesh.face_ranges.push((face_id, first..mesh.triangles.len()));
    }
    mesh
}

fn push_triangle(mesh: &mut Tessellation, tri: [u32; 3], normal: Vector3) {
    let [a, b, c] = tri.map(|i| mesh.positions[i as usize]);
    if (b - a).cross(&(c - a)).norm() * 0.5 > DEGENERATE_TRIANGLE {
        mesh.triangles.push(tri);
        mesh.normals.push(normal);
    }
}
