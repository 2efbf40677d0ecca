//! MockKernel: deterministic test double implementing Kernel + KernelIntrospect.
//!
//! Solids are axis-aligned boxes carrying synthetic topology with predictable
//! entity counts and signatures. Used by modeling-ops and tap-handle for unit testing.

use std::collections::BTreeMap;
use std::f64::consts::{PI, TAU};

use crate::traits::{Kernel, KernelIntrospect};
use crate::types::*;

/// Placeholder id, replaced when a solid is stored.
const UNASSIGNED: KernelId = KernelId(0);

#[derive(Debug, Clone)]
struct MockVertex {
    id: KernelId,
    position: [f64; 3],
}

/// A synthetic edge; `faces` index into the owning solid's face list.
#[derive(Debug, Clone)]
struct MockEdge {
    id: KernelId,
    center: [f64; 3],
    centroid: [f64; 3],
    length: f64,
    faces: [usize; 2],
    convexity: Convexity,
}

#[derive(Debug, Clone)]
struct MockFace {
    id: KernelId,
    normal: [f64; 3],
    centroid: [f64; 3],
    area: f64,
    surface_type: &'static str,
}

#[derive(Debug, Clone)]
struct MockSolid {
    bounds: [f64; 6],
    volume: f64,
    vertices: Vec<MockVertex>,
    edges: Vec<MockEdge>,
    faces: Vec<MockFace>,
}

impl MockSolid {
    fn empty() -> Self {
        Self {
            bounds: [0.0; 6],
            volume: 0.0,
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    fn translate(&mut self, offset: [f64; 3]) {
        let shift = |p: &mut [f64; 3]| {
            for k in 0..3 {
                p[k] += offset[k];
            }
        };
        for k in 0..3 {
            self.bounds[k] += offset[k];
            self.bounds[k + 3] += offset[k];
        }
        for v in &mut self.vertices {
            shift(&mut v.position);
        }
        for e in &mut self.edges {
            shift(&mut e.center);
            shift(&mut e.centroid);
        }
        for f in &mut self.faces {
            shift(&mut f.centroid);
        }
    }

    fn bounds_center(&self) -> [f64; 3] {
        let b = self.bounds;
        [(b[0] + b[3]) / 2.0, (b[1] + b[4]) / 2.0, (b[2] + b[5]) / 2.0]
    }
}

/// A call made against the mock, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    MakeBox { size: [f64; 3], anchor: Anchor },
    MakeCylinder { radius: f64, height: f64, anchor: Anchor },
    MakePrism { sides: u32, circumradius: f64, height: f64, anchor: Anchor },
    Translate { solid: u64, offset: [f64; 3] },
    Union { a: u64, b: u64 },
    Subtract { a: u64, b: u64 },
    Intersect { a: u64, b: u64 },
    Fillet { solid: u64, edges: usize, radius: f64 },
    Tessellate { solid: u64 },
}

impl MockCall {
    /// Name of the trait method that produced this call.
    pub fn operation(&self) -> &'static str {
        match self {
            MockCall::MakeBox { .. } => "make_box",
            MockCall::MakeCylinder { .. } => "make_cylinder",
            MockCall::MakePrism { .. } => "make_prism",
            MockCall::Translate { .. } => "translate",
            MockCall::Union { .. } => "boolean_union",
            MockCall::Subtract { .. } => "boolean_subtract",
            MockCall::Intersect { .. } => "boolean_intersect",
            MockCall::Fillet { .. } => "fillet_edges",
            MockCall::Tessellate { .. } => "tessellate",
        }
    }
}

/// Deterministic test double for the geometry kernel.
/// Implements both Kernel and KernelIntrospect.
pub struct MockKernel {
    next_id: u64,
    next_handle: u64,
    solids: BTreeMap<u64, MockSolid>,
    calls: Vec<MockCall>,
    failing: Vec<&'static str>,
    forced_kind: Option<ShapeKind>,
    forced_open: bool,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_handle: 1,
            solids: BTreeMap::new(),
            calls: Vec::new(),
            failing: Vec::new(),
            forced_kind: None,
            forced_open: false,
        }
    }

    /// Make every call to `operation` (a trait method name) fail.
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing.push(operation);
        self
    }

    /// Report `kind` for every solid regardless of its contents.
    pub fn force_shape_kind(&mut self, kind: ShapeKind) {
        self.forced_kind = Some(kind);
    }

    /// Report every solid as having an open boundary.
    pub fn force_open_shells(&mut self) {
        self.forced_open = true;
    }

    /// Every call made so far.
    pub fn operations(&self) -> &[MockCall] {
        &self.calls
    }

    fn record(&mut self, call: MockCall) -> Result<(), KernelError> {
        let operation = call.operation();
        self.calls.push(call);
        if self.failing.contains(&operation) {
            return Err(KernelError::Other {
                message: format!("injected failure in {operation}"),
            });
        }
        Ok(())
    }

    fn alloc_id(&mut self) -> KernelId {
        let id = KernelId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Store a solid under fresh ids for all of its entities.
    fn insert(&mut self, mut solid: MockSolid) -> KernelSolidHandle {
        for f in &mut solid.faces {
            f.id = self.alloc_id();
        }
        for e in &mut solid.edges {
            e.id = self.alloc_id();
        }
        for v in &mut solid.vertices {
            v.id = self.alloc_id();
        }
        let handle = KernelSolidHandle(self.next_handle);
        self.next_handle += 1;
        self.solids.insert(handle.id(), solid);
        handle
    }

    fn get(&self, handle: &KernelSolidHandle) -> Result<&MockSolid, KernelError> {
        self.solids.get(&handle.id()).ok_or(KernelError::EntityNotFound {
            id: KernelId(handle.id()),
        })
    }

    fn find_edge(&self, id: KernelId) -> Option<(&MockSolid, &MockEdge)> {
        self.solids
            .values()
            .find_map(|s| s.edges.iter().find(|e| e.id == id).map(|e| (s, e)))
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), KernelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(KernelError::InvalidPrimitive {
            reason: format!("{name} must be positive, got {value}"),
        })
    }
}

fn midpoint(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0, (a[2] + b[2]) / 2.0]
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

fn line_edge(a: [f64; 3], b: [f64; 3], faces: [usize; 2]) -> MockEdge {
    let mid = midpoint(a, b);
    MockEdge {
        id: UNASSIGNED,
        center: mid,
        centroid: mid,
        length: distance(a, b),
        faces,
        convexity: Convexity::Convex,
    }
}

fn planar_face(normal: [f64; 3], centroid: [f64; 3], area: f64) -> MockFace {
    MockFace {
        id: UNASSIGNED,
        normal,
        centroid,
        area,
        surface_type: "planar",
    }
}

fn bounds_volume(b: &[f64; 6]) -> f64 {
    (b[3] - b[0]) * (b[4] - b[1]) * (b[5] - b[2])
}

/// Overlap of two bounds with positive volume.
fn overlap(a: &[f64; 6], b: &[f64; 6]) -> Option<[f64; 6]> {
    let o = [
        a[0].max(b[0]),
        a[1].max(b[1]),
        a[2].max(b[2]),
        a[3].min(b[3]),
        a[4].min(b[4]),
        a[5].min(b[5]),
    ];
    (o[3] > o[0] && o[4] > o[1] && o[5] > o[2]).then_some(o)
}

/// The eight corners of `b`, bottom ring then top ring.
fn corners(b: &[f64; 6]) -> [[f64; 3]; 8] {
    [
        [b[0], b[1], b[2]],
        [b[3], b[1], b[2]],
        [b[3], b[4], b[2]],
        [b[0], b[4], b[2]],
        [b[0], b[1], b[5]],
        [b[3], b[1], b[5]],
        [b[3], b[4], b[5]],
        [b[0], b[4], b[5]],
    ]
}

/// Outward quads over `corners`, in -Z, +Z, -Y, +Y, -X, +X order.
const BOX_QUADS: [[u32; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [2, 3, 7, 6],
    [0, 4, 7, 3],
    [1, 2, 6, 5],
];

const BOX_NORMALS: [[f64; 3]; 6] = [
    [0.0, 0.0, -1.0],
    [0.0, 0.0, 1.0],
    [0.0, -1.0, 0.0],
    [0.0, 1.0, 0.0],
    [-1.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
];

/// A box solid with 8 vertices, 12 edges and 6 faces filling `b`.
fn box_solid(b: [f64; 6]) -> MockSolid {
    let pts = corners(&b);
    let size = [b[3] - b[0], b[4] - b[1], b[5] - b[2]];
    let faces = BOX_QUADS
        .iter()
        .zip(BOX_NORMALS)
        .map(|(quad, normal)| {
            let c = quad
                .iter()
                .fold([0.0; 3], |acc, &i| {
                    let p = pts[i as usize];
                    [acc[0] + p[0] / 4.0, acc[1] + p[1] / 4.0, acc[2] + p[2] / 4.0]
                });
            let axis = normal.iter().position(|n| *n != 0.0).unwrap_or(0);
            let area = size[(axis + 1) % 3] * size[(axis + 2) % 3];
            planar_face(normal, c, area)
        })
        .collect();

    // Bottom ring, top ring, verticals; faces are indices into BOX_QUADS.
    let ring = [(0, 1, 2), (1, 2, 5), (2, 3, 3), (3, 0, 4)];
    let mut edges = Vec::with_capacity(12);
    for &(i, j, side) in &ring {
        edges.push(line_edge(pts[i], pts[j], [0, side]));
    }
    for &(i, j, side) in &ring {
        edges.push(line_edge(pts[i + 4], pts[j + 4], [1, side]));
    }
    let vertical_sides = [[2, 4], [2, 5], [3, 5], [3, 4]];
    for (i, faces) in vertical_sides.into_iter().enumerate() {
        edges.push(line_edge(pts[i], pts[i + 4], faces));
    }

    MockSolid {
        bounds: b,
        volume: bounds_volume(&b),
        vertices: pts
            .iter()
            .map(|&position| MockVertex {
                id: UNASSIGNED,
                position,
            })
            .collect(),
        edges,
        faces,
    }
}

impl Kernel for MockKernel {
    fn make_box(&mut self, size: [f64; 3], anchor: Anchor) -> Result<KernelSolidHandle, KernelError> {
        self.record(MockCall::MakeBox { size, anchor })?;
        check_positive("length", size[0])?;
        check_positive("width", size[1])?;
        check_positive("height", size[2])?;
        let (z0, z1) = anchor.z_range(size[2]);
        let b = [-size[0] / 2.0, -size[1] / 2.0, z0, size[0] / 2.0, size[1] / 2.0, z1];
        Ok(self.insert(box_solid(b)))
    }

    fn make_cylinder(
        &mut self,
        radius: f64,
        height: f64,
        anchor: Anchor,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.record(MockCall::MakeCylinder {
            radius,
            height,
            anchor,
        })?;
        check_positive("radius", radius)?;
        check_positive("height", height)?;
        let (z0, z1) = anchor.z_range(height);
        let disk = PI * radius * radius;
        let rim = |z: f64, faces: [usize; 2]| MockEdge {
            id: UNASSIGNED,
            center: [-radius, 0.0, z],
            centroid: [0.0, 0.0, z],
            length: TAU * radius,
            faces,
            convexity: Convexity::Convex,
        };
        let solid = MockSolid {
            bounds: [-radius, -radius, z0, radius, radius, z1],
            volume: disk * height,
            vertices: Vec::new(),
            edges: vec![rim(z0, [0, 2]), rim(z1, [1, 2])],
            faces: vec![
                planar_face([0.0, 0.0, -1.0], [0.0, 0.0, z0], disk),
                planar_face([0.0, 0.0, 1.0], [0.0, 0.0, z1], disk),
                MockFace {
                    id: UNASSIGNED,
                    normal: [0.0, 0.0, 0.0],
                    centroid: [0.0, 0.0, (z0 + z1) / 2.0],
                    area: TAU * radius * height,
                    surface_type: "cylindrical",
                },
            ],
        };
        Ok(self.insert(solid))
    }

    fn make_prism(
        &mut self,
        sides: u32,
        circumradius: f64,
        height: f64,
        anchor: Anchor,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.record(MockCall::MakePrism {
            sides,
            circumradius,
            height,
            anchor,
        })?;
        if sides < 3 {
            return Err(KernelError::InvalidPrimitive {
                reason: format!("a prism needs at least 3 sides, got {sides}"),
            });
        }
        check_positive("circumradius", circumradius)?;
        check_positive("height", height)?;

        let (z0, z1) = anchor.z_range(height);
        let n = sides as usize;
        let ring: Vec<[f64; 2]> = (0..n)
            .map(|i| {
                let a = TAU * i as f64 / n as f64;
                [circumradius * a.cos(), circumradius * a.sin()]
            })
            .collect();
        let section = 0.5 * n as f64 * circumradius * circumradius * (TAU / n as f64).sin();

        let mut bounds = [f64::MAX, f64::MAX, z0, f64::MIN, f64::MIN, z1];
        for p in &ring {
            bounds[0] = bounds[0].min(p[0]);
            bounds[1] = bounds[1].min(p[1]);
            bounds[3] = bounds[3].max(p[0]);
            bounds[4] = bounds[4].max(p[1]);
        }

        let mut faces = vec![
            planar_face([0.0, 0.0, -1.0], [0.0, 0.0, z0], section),
            planar_face([0.0, 0.0, 1.0], [0.0, 0.0, z1], section),
        ];
        let mut edges = Vec::with_capacity(3 * n);
        let mut vertices = Vec::with_capacity(2 * n);
        for i in 0..n {
            let (p, q) = (ring[i], ring[(i + 1) % n]);
            let mid = midpoint([p[0], p[1], 0.0], [q[0], q[1], 0.0]);
            let len = (q[0] - p[0]).hypot(q[1] - p[1]);
            let out = mid[0].hypot(mid[1]);
            faces.push(planar_face(
                [mid[0] / out, mid[1] / out, 0.0],
                [mid[0], mid[1], (z0 + z1) / 2.0],
                len * height,
            ));
            let side = 2 + i;
            let prev_side = 2 + (i + n - 1) % n;
            edges.push(line_edge([p[0], p[1], z0], [q[0], q[1], z0], [0, side]));
            edges.push(line_edge([p[0], p[1], z1], [q[0], q[1], z1], [1, side]));
            edges.push(line_edge([p[0], p[1], z0], [p[0], p[1], z1], [prev_side, side]));
            for z in [z0, z1] {
                vertices.push(MockVertex {
                    id: UNASSIGNED,
                    position: [p[0], p[1], z],
                });
            }
        }

        let solid = MockSolid {
            bounds,
            volume: section * height,
            vertices,
            edges,
            faces,
        };
        Ok(self.insert(solid))
    }

    fn translate(
        &mut self,
        solid: &KernelSolidHandle,
        offset: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError> {
        self.record(MockCall::Translate {
            solid: solid.id(),
            offset,
        })?;
        let mut moved = self.get(solid)?.clone();
        moved.translate(offset);
        Ok(self.insert(moved))
    }

    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.record(MockCall::Union { a: a.id(), b: b.id() })?;
        let mut merged = self.get(a)?.clone();
        let other = self.get(b)?.clone();
        if merged.is_empty() {
            return Ok(self.insert(other));
        }
        if other.is_empty() {
            return Ok(self.insert(merged));
        }

        let seam = overlap(&merged.bounds, &other.bounds);
        let offset = merged.faces.len();
        let shared = seam.as_ref().map_or(0.0, bounds_volume);
        for k in 0..3 {
            merged.bounds[k] = merged.bounds[k].min(other.bounds[k]);
            merged.bounds[k + 3] = merged.bounds[k + 3].max(other.bounds[k + 3]);
        }
        merged.volume += other.volume - shared.min(other.volume);
        merged.faces.extend(other.faces);
        merged.vertices.extend(other.vertices);
        merged.edges.extend(other.edges.into_iter().map(|mut e| {
            e.faces = [e.faces[0] + offset, e.faces[1] + offset];
            e
        }));

        // One concave intersection edge on the +X side of the overlap, at its top.
        if let Some(o) = seam {
            let mut edge = line_edge([o[3], o[1], o[5]], [o[3], o[4], o[5]], [0, offset]);
            edge.convexity = Convexity::Concave;
            merged.edges.push(edge);
        }
        Ok(self.insert(merged))
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.record(MockCall::Subtract { a: a.id(), b: b.id() })?;
        let mut kept = self.get(a)?.clone();
        let cutter = self.get(b)?;
        let removed = overlap(&kept.bounds, &cutter.bounds)
            .map_or(0.0, |o| bounds_volume(&o).min(cutter.volume));
        kept.volume = (kept.volume - removed).max(0.0);
        Ok(self.insert(kept))
    }

    fn boolean_intersect(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.record(MockCall::Intersect { a: a.id(), b: b.id() })?;
        let common = overlap(&self.get(a)?.bounds, &self.get(b)?.bounds);
        let solid = common.map_or_else(MockSolid::empty, box_solid);
        Ok(self.insert(solid))
    }

    fn fillet_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        radius: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.record(MockCall::Fillet {
            solid: solid.id(),
            edges: edges.len(),
            radius,
        })?;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(KernelError::FilletFailed {
                reason: "radius must be positive".to_string(),
            });
        }
        let mut rounded = self.get(solid)?.clone();
        let center = rounded.bounds_center();
        let original = rounded.edges.len();

        for &id in edges {
            let edge = rounded.edges[..original]
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or(KernelError::EntityNotFound { id })?;

            // The blend edge sits `radius` in from the rounded edge.
            let toward = [
                center[0] - edge.center[0],
                center[1] - edge.center[1],
                center[2] - edge.center[2],
            ];
            let norm = distance(toward, [0.0; 3]).max(f64::EPSILON);
            let step = |p: [f64; 3]| {
                [
                    p[0] + toward[0] / norm * radius,
                    p[1] + toward[1] / norm * radius,
                    p[2] + toward[2] / norm * radius,
                ]
            };
            rounded.faces.push(MockFace {
                id: UNASSIGNED,
                normal: [0.0, 0.0, 0.0],
                centroid: step(edge.centroid),
                area: edge.length * radius * PI / 2.0,
                surface_type: "blend",
            });
            rounded.edges.push(MockEdge {
                id: UNASSIGNED,
                center: step(edge.center),
                centroid: step(edge.centroid),
                length: edge.length,
                faces: [edge.faces[0], rounded.faces.len() - 1],
                convexity: Convexity::Tangent,
            });
        }
        Ok(self.insert(rounded))
    }

    fn tessellate(
        &mut self,
        solid: &KernelSolidHandle,
        _tolerance: f64,
    ) -> Result<RenderMesh, KernelError> {
        self.record(MockCall::Tessellate { solid: solid.id() })?;
        let source = self.get(solid)?;
        if source.is_empty() {
            return Err(KernelError::TessellationFailed {
                reason: "solid has no faces".to_string(),
            });
        }

        // Two triangles per side of the bounding box.
        let pts = corners(&source.bounds);
        let mut mesh = RenderMesh::default();
        for (side, (quad, n)) in BOX_QUADS.iter().zip(BOX_NORMALS).enumerate() {
            let base = (mesh.vertices.len() / 3) as u32;
            for &i in quad {
                let p = pts[i as usize];
                mesh.vertices.extend_from_slice(&[p[0] as f32, p[1] as f32, p[2] as f32]);
                mesh.normals.extend_from_slice(&[n[0] as f32, n[1] as f32, n[2] as f32]);
            }
            let start_index = mesh.indices.len() as u32;
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            if let Some(face) = source.faces.get(side) {
                mesh.face_ranges.push(FaceRange {
                    face_id: face.id,
                    start_index,
                    end_index: mesh.indices.len() as u32,
                });
            }
        }
        Ok(mesh)
    }
}

impl KernelIntrospect for MockKernel {
    fn list_faces(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.get(solid)
            .map(|s| s.faces.iter().map(|f| f.id).collect())
            .unwrap_or_default()
    }

    fn list_edges(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.get(solid)
            .map(|s| s.edges.iter().map(|e| e.id).collect())
            .unwrap_or_default()
    }

    fn list_vertices(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.get(solid)
            .map(|s| s.vertices.iter().map(|v| v.id).collect())
            .unwrap_or_default()
    }

    fn edge_faces(&self, edge: KernelId) -> Vec<KernelId> {
        self.find_edge(edge)
            .map(|(s, e)| e.faces.iter().map(|&i| s.faces[i].id).collect())
            .unwrap_or_default()
    }

    fn edge_center(&self, edge: KernelId) -> Option<[f64; 3]> {
        self.find_edge(edge).map(|(_, e)| e.center)
    }

    fn edge_convexity(&self, edge: KernelId) -> Option<Convexity> {
        self.find_edge(edge).map(|(_, e)| e.convexity)
    }

    fn compute_signature(&self, entity: KernelId, kind: TopoKind) -> TopoSignature {
        for solid in self.solids.values() {
            match kind {
                TopoKind::Face => {
                    if let Some(f) = solid.faces.iter().find(|f| f.id == entity) {
                        return TopoSignature {
                            surface_type: Some(f.surface_type.to_string()),
                            area: Some(f.area),
                            centroid: Some(f.centroid),
                            normal: Some(f.normal),
                            ..TopoSignature::empty()
                        };
                    }
                }
                TopoKind::Edge => {
                    if let Some(e) = solid.edges.iter().find(|e| e.id == entity) {
                        return TopoSignature {
                            centroid: Some(e.centroid),
                            length: Some(e.length),
                            ..TopoSignature::empty()
                        };
                    }
                }
                TopoKind::Vertex => {
                    if let Some(v) = solid.vertices.iter().find(|v| v.id == entity) {
                        return TopoSignature {
                            centroid: Some(v.position),
                            ..TopoSignature::empty()
                        };
                    }
                }
            }
        }
        TopoSignature::empty()
    }

    fn compute_all_signatures(
        &self,
        solid: &KernelSolidHandle,
        kind: TopoKind,
    ) -> Vec<(KernelId, TopoSignature)> {
        let ids = match kind {
            TopoKind::Face => self.list_faces(solid),
            TopoKind::Edge => self.list_edges(solid),
            TopoKind::Vertex => self.list_vertices(solid),
        };
        ids.into_iter()
            .map(|id| (id, self.compute_signature(id, kind)))
            .collect()
    }

    fn shape_kind(&self, solid: &KernelSolidHandle) -> Result<ShapeKind, KernelError> {
        let s = self.get(solid)?;
        Ok(match self.forced_kind {
            Some(kind) => kind,
            None if s.is_empty() => ShapeKind::Empty,
            None => ShapeKind::Solid,
        })
    }

    fn is_closed(&self, solid: &KernelSolidHandle) -> Result<bool, KernelError> {
        Ok(!self.forced_open && !self.get(solid)?.is_empty())
    }

    fn volume(&self, solid: &KernelSolidHandle) -> Result<f64, KernelError> {
        Ok(self.get(solid)?.volume)
    }

    fn bounding_box(&self, solid: &KernelSolidHandle) -> Result<[f64; 6], KernelError> {
        Ok(self.get(solid)?.bounds)
    }

    fn boundary(&self, solid: &KernelSolidHandle) -> Result<FacetedShell, KernelError> {
        let s = self.get(solid)?;
        if s.is_empty() {
            return Ok(FacetedShell::default());
        }
        Ok(FacetedShell {
            points: corners(&s.bounds).to_vec(),
            polygons: BOX_QUADS.iter().map(|q| q.to_vec()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_topology() {
        let mut kernel = MockKernel::new();
        let handle = kernel.make_box([2.0, 3.0, 5.0], Anchor::Bottom).unwrap();

        assert_eq!(kernel.list_vertices(&handle).len(), 8, "Box should have 8 vertices");
        assert_eq!(kernel.list_edges(&handle).len(), 12, "Box should have 12 edges");
        assert_eq!(kernel.list_faces(&handle).len(), 6, "Box should have 6 faces");
        assert_eq!(kernel.bounding_box(&handle).unwrap(), [-1.0, -1.5, 0.0, 1.0, 1.5, 5.0]);
        assert!((kernel.volume(&handle).unwrap() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_euler_formula_box() {
        let mut kernel = MockKernel::new();
        let handle = kernel.make_box([1.0, 1.0, 1.0], Anchor::Center).unwrap();
        let v = kernel.list_vertices(&handle).len() as i64;
        let e = kernel.list_edges(&handle).len() as i64;
        let f = kernel.list_faces(&handle).len() as i64;
        assert_eq!(v - e + f, 2, "Euler formula V-E+F=2 should hold");
    }

    #[test]
    fn test_box_edges_separate_distinct_faces() {
        let mut kernel = MockKernel::new();
        let handle = kernel.make_box([1.0, 2.0, 3.0], Anchor::Center).unwrap();
        for edge in kernel.list_edges(&handle) {
            let faces = kernel.edge_faces(edge);
            assert_eq!(faces.len(), 2);
            assert_ne!(faces[0], faces[1]);
        }
        let total: f64 = kernel
            .compute_all_signatures(&handle, TopoKind::Edge)
            .iter()
            .filter_map(|(_, s)| s.length)
            .sum();
        assert!((total - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_cylinder_rims() {
        let mut kernel = MockKernel::new();
        let handle = kernel.make_cylinder(2.0, 4.0, Anchor::Top).unwrap();
        let edges = kernel.list_edges(&handle);
        assert_eq!(edges.len(), 2);
        assert_eq!(kernel.edge_center(edges[0]), Some([-2.0, 0.0, -4.0]));
        assert_eq!(kernel.edge_center(edges[1]), Some([-2.0, 0.0, 0.0]));
        let sig = kernel.compute_signature(edges[1], TopoKind::Edge);
        assert!((sig.length.unwrap() - TAU * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_hex_prism_topology() {
        let mut kernel = MockKernel::new();
        let handle = kernel.make_prism(6, 1.0, 2.0, Anchor::Bottom).unwrap();
        assert_eq!(kernel.list_faces(&handle).len(), 8);
        assert_eq!(kernel.list_edges(&handle).len(), 18);
        assert_eq!(kernel.list_vertices(&handle).len(), 12);
        let b = kernel.bounding_box(&handle).unwrap();
        assert!((b[3] - 1.0).abs() < 1e-12, "first corner on +X");
    }

    #[test]
    fn test_deterministic_ids() {
        let mut k1 = MockKernel::new();
        let mut k2 = MockKernel::new();
        let h1 = k1.make_box([1.0, 2.0, 3.0], Anchor::Center).unwrap();
        let h2 = k2.make_box([1.0, 2.0, 3.0], Anchor::Center).unwrap();
        assert_eq!(k1.list_edges(&h1), k2.list_edges(&h2));
        assert_eq!(k1.list_faces(&h1)[0], KernelId(1));
    }

    #[test]
    fn test_union_adds_seam_when_overlapping() {
        let mut kernel = MockKernel::new();
        let a = kernel.make_box([4.0, 4.0, 1.0], Anchor::Top).unwrap();
        let b = kernel.make_cylinder(1.0, 5.0, Anchor::Bottom).unwrap();
        let b = kernel.translate(&b, [0.0, 0.0, -0.5]).unwrap();
        let u = kernel.boolean_union(&a, &b).unwrap();

        let edges = kernel.list_edges(&u);
        assert_eq!(edges.len(), 12 + 2 + 1);
        let seam = kernel.edge_center(*edges.last().unwrap()).unwrap();
        assert_eq!(seam, [1.0, 0.0, 0.0]);
        assert_eq!(kernel.bounding_box(&u).unwrap(), [-2.0, -2.0, -1.0, 2.0, 2.0, 4.5]);
    }

    #[test]
    fn test_union_of_disjoint_solids_has_no_seam() {
        let mut kernel = MockKernel::new();
        let a = kernel.make_box([1.0, 1.0, 1.0], Anchor::Center).unwrap();
        let b = kernel.make_box([1.0, 1.0, 1.0], Anchor::Center).unwrap();
        let b = kernel.translate(&b, [3.0, 0.0, 0.0]).unwrap();
        let u = kernel.boolean_union(&a, &b).unwrap();
        assert_eq!(kernel.list_edges(&u).len(), 24);
        assert!((kernel.volume(&u).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_subtract_keeps_first_operand() {
        let mut kernel = MockKernel::new();
        let a = kernel.make_box([2.0, 2.0, 2.0], Anchor::Center).unwrap();
        let b = kernel.make_box([1.0, 1.0, 4.0], Anchor::Center).unwrap();
        let d = kernel.boolean_subtract(&a, &b).unwrap();
        assert_eq!(kernel.list_edges(&d).len(), 12);
        assert_ne!(kernel.list_edges(&d), kernel.list_edges(&a));
        let v = kernel.volume(&d).unwrap();
        assert!(v < 8.0 && v > 0.0);
    }

    #[test]
    fn test_intersect_is_overlap_box() {
        let mut kernel = MockKernel::new();
        let a = kernel.make_box([2.0, 2.0, 2.0], Anchor::Bottom).unwrap();
        let b = kernel.make_box([2.0, 2.0, 2.0], Anchor::Top).unwrap();
        let b = kernel.translate(&b, [1.0, 0.0, 1.0]).unwrap();
        let i = kernel.boolean_intersect(&a, &b).unwrap();
        assert_eq!(kernel.bounding_box(&i).unwrap(), [0.0, -1.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(kernel.shape_kind(&i).unwrap(), ShapeKind::Solid);

        let far = kernel.translate(&b, [10.0, 0.0, 0.0]).unwrap();
        let none = kernel.boolean_intersect(&a, &far).unwrap();
        assert_eq!(kernel.shape_kind(&none).unwrap(), ShapeKind::Empty);
        assert!(kernel.tessellate(&none, 0.1).is_err());
    }

    #[test]
    fn test_fillet_adds_blend_edges() {
        let mut kernel = MockKernel::new();
        let handle = kernel.make_box([2.0, 2.0, 2.0], Anchor::Center).unwrap();
        let edges = kernel.list_edges(&handle);
        let rounded = kernel.fillet_edges(&handle, &edges[..2], 0.5).unwrap();

        assert_eq!(kernel.list_edges(&rounded).len(), 14);
        let blends = kernel
            .compute_all_signatures(&rounded, TopoKind::Face)
            .into_iter()
            .filter(|(_, s)| s.surface_type.as_deref() == Some("blend"))
            .count();
        assert_eq!(blends, 2);
        // Every id is fresh.
        assert!(kernel
            .list_edges(&rounded)
            .iter()
            .all(|id| !edges.contains(id)));
    }

    #[test]
    fn test_fillet_invalid_radius() {
        let mut kernel = MockKernel::new();
        let handle = kernel.make_box([1.0, 1.0, 1.0], Anchor::Center).unwrap();
        let edges = kernel.list_edges(&handle);
        let result = kernel.fillet_edges(&handle, &edges[..1], -1.0);
        assert!(matches!(result, Err(KernelError::FilletFailed { .. })));
    }

    #[test]
    fn test_fillet_invalid_edge() {
        let mut kernel = MockKernel::new();
        let handle = kernel.make_box([1.0, 1.0, 1.0], Anchor::Center).unwrap();
        let result = kernel.fillet_edges(&handle, &[KernelId(9999)], 0.1);
        assert!(matches!(
            result,
            Err(KernelError::EntityNotFound { id: KernelId(9999) })
        ));
    }

    #[test]
    fn test_records_calls_and_injects_failures() {
        let mut kernel = MockKernel::new().failing_on("boolean_subtract");
        let a = kernel.make_box([1.0, 1.0, 1.0], Anchor::Center).unwrap();
        let b = kernel.make_cylinder(0.2, 2.0, Anchor::Center).unwrap();
        assert!(kernel.boolean_union(&a, &b).is_ok());
        let err = kernel.boolean_subtract(&a, &b).unwrap_err();
        assert!(err.to_string().contains("boolean_subtract"));

        let names: Vec<&str> = kernel.operations().iter().map(MockCall::operation).collect();
        assert_eq!(
            names,
            ["make_box", "make_cylinder", "boolean_union", "boolean_subtract"]
        );
    }

    #[test]
    fn test_forced_shape_kind() {
        let mut kernel = MockKernel::new();
        let handle = kernel.make_box([1.0, 1.0, 1.0], Anchor::Center).unwrap();
        kernel.force_shape_kind(ShapeKind::Shell);
        assert_eq!(kernel.shape_kind(&handle).unwrap(), ShapeKind::Shell);
    }

    #[test]
    fn test_tessellate_box() {
        let mut kernel = MockKernel::new();
        let handle = kernel.make_box([1.0, 1.0, 1.0], Anchor::Center).unwrap();
        let mesh = kernel.tessellate(&handle, 0.1).unwrap();
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.face_ranges.len(), 6);
        assert!((kernel.boundary(&handle).unwrap().volume() - 1.0).abs() < 1e-12);
    }
}
