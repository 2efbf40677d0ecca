//! Faces, edges and vertices recovered from a faceted solid.
//!
//! Booleans and fillets only ever produce polygon soups. [`Topology::build`]
//! welds the soup into an indexed boundary, groups facets into faces and
//! chains the creases between faces into edges, which is what edge selection
//! and the exporters work on.

mod edges;
mod weld;

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use tracing::{debug, instrument};

use crate::config::KernelConfig;
use crate::geometry::{BoundingBox, Plane, Point3, Vector3, newell_normal};
use crate::mesh::{FacetedSolid, Surface};

pub use edges::{Convexity, EdgeSegment};

// ─── Entity Keys ───

new_key_type! {
    pub struct FaceId;
    pub struct EdgeId;
    pub struct VertexId;
}

/// Loops whose area falls below this are collinear leftovers.
const DEGENERATE_AREA: f64 = 1e-12;
/// Enclosed volume below which a boundary counts as a bare surface.
const MIN_SOLID_VOLUME: f64 = 1e-9;
/// Share of unpaired boundary length above which a boundary is a sheet, not a
/// solid with a stray seam.
const MAX_OPEN_FRACTION: f64 = 0.1;

/// Coarse classification of a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Empty,
    Shell,
    Solid,
    Compound,
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ShapeKind::Empty => "empty",
            ShapeKind::Shell => "shell",
            ShapeKind::Solid => "solid",
            ShapeKind::Compound => "compound",
        };
        f.write_str(name)
    }
}

// ─── Entities ───

/// A cleaned polygon over welded point indices.
#[derive(Debug, Clone)]
pub struct Loop {
    /// Index of the source polygon in the solid.
    pub polygon: usize,
    pub points: Vec<u32>,
    pub plane: Plane,
    pub surface: Surface,
    pub face: FaceId,
}

#[derive(Debug, Clone)]
pub struct Face {
    pub surface: Surface,
    pub loops: Vec<usize>,
    pub area: f64,
    pub centroid: Point3,
    /// Area-weighted mean normal.
    pub normal: Vector3,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone)]
pub struct Edge {
    /// Lower face first; segments run along that face's loops.
    pub faces: [FaceId; 2],
    pub segments: Vec<EdgeSegment>,
    pub closed: bool,
    pub length: f64,
    /// Point at half arc length from the first segment's start.
    pub center: Point3,
    /// Length-weighted mean of the segment midpoints.
    pub centroid: Point3,
    pub convexity: Convexity,
    /// Mean angle between the face normals across the edge (radians).
    pub dihedral: f64,
    pub bbox: BoundingBox,
    /// End vertices of an open edge.
    pub vertices: Option<[VertexId; 2]>,
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub point: Point3,
    pub index: u32,
}

/// Indexed boundary of one faceted solid.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub points: Vec<Point3>,
    pub loops: Vec<Loop>,
    pub faces: SlotMap<FaceId, Face>,
    pub edges: SlotMap<EdgeId, Edge>,
    pub vertices: SlotMap<VertexId, Vertex>,
    shells: usize,
    open_half_edges: usize,
    open_fraction: f64,
    volume: f64,
}

/// Union-find with path halving; the smaller index always becomes the root.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

impl Topology {
    #[instrument(skip_all, fields(polygons = solid.polygons.len()))]
    pub fn build(solid: &FacetedSolid, config: &KernelConfig) -> Self {
        // Weld and clean.
        let mut welder = weld::Welder::new(config.weld_tolerance);
        let mut raw: Vec<(usize, Vec<u32>)> = Vec::with_capacity(solid.polygons.len());
        for (index, polygon) in solid.polygons.iter().enumerate() {
            let mut indices: Vec<u32> = polygon.vertices.iter().map(|v| welder.insert(v)).collect();
            if weld::clean_loop(&mut indices) {
                raw.push((index, indices));
            }
        }
        let points = welder.into_points();
        raw.retain(|(_, indices)| weld::loop_area(&points, indices) > DEGENERATE_AREA);

        let mut indices: Vec<Vec<u32>> = raw.iter().map(|(_, l)| l.clone()).collect();
        let inserted = weld::repair_t_junctions(&points, &mut indices, config.weld_tolerance);

        let mut loops: Vec<Loop> = Vec::with_capacity(indices.len());
        for ((polygon, _), mut pts) in raw.into_iter().zip(indices) {
            if !weld::clean_loop(&mut pts) {
                continue;
            }
            let source = &solid.polygons[polygon];
            loops.push(Loop {
                polygon,
                points: pts,
                plane: source.plane,
                surface: source.surface,
                face: FaceId::default(),
            });
        }

        // Pair half-edges.
        let twins = edges::pair_half_edges(&loops);
        let open_half_edges = twins.iter().flatten().filter(|t| t.is_none()).count();
        let (mut open_length, mut total_length) = (0.0, 0.0);
        for (l, loop_twins) in loops.iter().zip(&twins) {
            let n = l.points.len();
            for (i, twin) in loop_twins.iter().enumerate() {
                let len = (points[l.points[(i + 1) % n] as usize] - points[l.points[i] as usize]).norm();
                total_length += len;
                if twin.is_none() {
                    open_length += len;
                }
            }
        }
        let open_fraction = if total_length > 0.0 { open_length / total_length } else { 0.0 };

        // Faces: smooth neighbours joined; shells: any neighbours joined.
        let mut face_sets = DisjointSet::new(loops.len());
        let mut shell_sets = DisjointSet::new(loops.len());
        for (li, loop_twins) in twins.iter().enumerate() {
            for &(lj, _) in loop_twins.iter().flatten() {
                if lj <= li {
                    continue;
                }
                shell_sets.union(li, lj);
                let (a, b) = (&loops[li], &loops[lj]);
                if a.surface.id == b.surface.id || a.plane.is_coplanar_with(&b.plane, config.coplanar_tolerance) {
                    face_sets.union(li, lj);
                }
            }
        }

        let mut faces: SlotMap<FaceId, Face> = SlotMap::with_key();
        let mut face_of_root: Vec<Option<FaceId>> = vec![None; loops.len()];
        let mut face_order: Vec<FaceId> = Vec::new();
        for li in 0..loops.len() {
            let root = face_sets.find(li);
            let face_id = match face_of_root[root] {
                Some(id) => id,
                None => {
                    let id = faces.insert(Face {
                        surface: loops[li].surface,
                        loops: Vec::new(),
                        area: 0.0,
                        centroid: Point3::origin(),
                        normal: Vector3::zeros(),
                        bbox: BoundingBox::empty(),
                    });
                    face_of_root[root] = Some(id);
                    face_order.push(id);
                    id
                }
            };
            loops[li].face = face_id;
            faces[face_id].loops.push(li);
        }
        for face in faces.values_mut() {
            fill_face_properties(face, &loops, &points);
        }

        let mut shell_roots: Vec<usize> = (0..loops.len()).map(|li| shell_sets.find(li)).collect();
        shell_roots.sort_unstable();
        shell_roots.dedup();

        let volume = loops
            .iter()
            .map(|l| {
                let p0 = points[l.points[0] as usize].coords;
                l.points[1..]
                    .windows(2)
                    .map(|w| p0.dot(&points[w[0] as usize].coords.cross(&points[w[1] as usize].coords)))
                    .sum::<f64>()
            })
            .sum::<f64>()
            / 6.0;

        let mut topology = Topology {
            points,
            loops,
            faces,
            edges: SlotMap::with_key(),
            vertices: SlotMap::with_key(),
            shells: shell_roots.len(),
            open_half_edges,
            open_fraction,
            volume,
        };
        edges::build_edges(&mut topology, &twins, &face_order, config);

        debug!(
            points = topology.points.len(),
            loops = topology.loops.len(),
            faces = topology.faces.len(),
            edges = topology.edges.len(),
            vertices = topology.vertices.len(),
            t_junctions = inserted,
            open_half_edges,
            "topology built"
        );
        topology
    }

    /// True when every half-edge has a partner.
    pub fn is_closed(&self) -> bool {
        !self.loops.is_empty() && self.open_half_edges == 0
    }

    pub fn open_half_edges(&self) -> usize {
        self.open_half_edges
    }

    pub fn shell_count(&self) -> usize {
        self.shells
    }

    /// Signed volume of the welded boundary.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn shape_kind(&self) -> ShapeKind {
        if self.loops.is_empty() {
            ShapeKind::Empty
        } else if self.volume <= MIN_SOLID_VOLUME || self.open_fraction > MAX_OPEN_FRACTION {
            ShapeKind::Shell
        } else if self.shells == 1 {
            ShapeKind::Solid
        } else {
            ShapeKind::Compound
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    pub fn loop_points(&self, index: usize) -> impl Iterator<Item = Point3> + '_ {
        self.loops[index].points.iter().map(|&i| self.points[i as usize])
    }
}

fn fill_face_properties(face: &mut Face, loops: &[Loop], points: &[Point3]) {
    let mut area = 0.0;
    let mut weighted = Vector3::zeros();
    let mut normal = Vector3::zeros();
    let mut bbox = BoundingBox::empty();
    for &li in &face.loops {
        let pts: Vec<Point3> = loops[li].points.iter().map(|&i| points[i as usize]).collect();
        for p in &pts {
            bbox.expand_to_include(p);
        }
        normal += newell_normal(&pts);
        for i in 1..pts.len() - 1 {
            let tri_area = (pts[i] - pts[0]).cross(&(pts[i + 1] - pts[0])).norm() * 0.5;
            area += tri_area;
            weighted += (pts[0].coords + pts[i].coords + pts[i + 1].coords) / 3.0 * tri_area;
        }
    }
    face.area = area;
    face.centroid = if area > 0.0 {
        Point3::from(weighted / area)
    } else {
        bbox.center()
    };
    face.normal = normal.try_normalize(1e-15).unwrap_or_else(Vector3::zeros);
    face.bbox = bbox;
}
