//! FacetKernel: kernel session over the `cad-kernel` faceted modeller.

use std::collections::{BTreeMap, HashMap};

use cad_kernel::operations::fillet;
use cad_kernel::primitives;
use cad_kernel::topology::Topology;
use cad_kernel::{
    BoolOp, BooleanEngine, BspBooleanEngine, EdgeId, FaceId, FacetedSolid, SurfaceAllocator,
    SurfaceKind, Vector3, VertexId,
};
use slotmap::SecondaryMap;
use tracing::debug;

use crate::traits::{Kernel, KernelIntrospect};
use crate::types::*;

/// Kernel-side entity behind a `KernelId`.
#[derive(Debug, Clone, Copy)]
enum EntityRef {
    Face(FaceId),
    Edge(EdgeId),
    Vertex(VertexId),
}

/// A stored solid with its recovered topology and the ids handed out for it.
struct SolidEntry {
    solid: FacetedSolid,
    topology: Topology,
    faces: Vec<KernelId>,
    edges: Vec<KernelId>,
    vertices: Vec<KernelId>,
    face_ids: SecondaryMap<FaceId, KernelId>,
}

/// Kernel session backed by BSP booleans and rolling-ball sweeps.
pub struct FacetKernel {
    config: KernelConfig,
    surfaces: SurfaceAllocator,
    next_handle: u64,
    next_id: u64,
    solids: BTreeMap<u64, SolidEntry>,
    /// Lookup only; never iterated.
    entities: HashMap<KernelId, (u64, EntityRef)>,
}

impl FacetKernel {
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        Self {
            config,
            surfaces: SurfaceAllocator::new(),
            next_handle: 1,
            next_id: 1,
            solids: BTreeMap::new(),
            entities: HashMap::new(),
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Number of solids alive in the session.
    pub fn solid_count(&self) -> usize {
        self.solids.len()
    }

    fn alloc_id(&mut self) -> KernelId {
        let id = KernelId(self.next_id);
        self.next_id += 1;
        id
    }

    fn store_solid(&mut self, solid: FacetedSolid) -> KernelSolidHandle {
        let handle = KernelSolidHandle(self.next_handle);
        self.next_handle += 1;

        let topology = Topology::build(&solid, &self.config);
        let mut entry = SolidEntry {
            solid,
            topology,
            faces: Vec::new(),
            edges: Vec::new(),
            vertices: Vec::new(),
            face_ids: SecondaryMap::new(),
        };

        // Slot maps iterate in insertion order here, so ids follow build order.
        let face_keys: Vec<FaceId> = entry.topology.faces.keys().collect();
        for key in face_keys {
            let id = self.alloc_id();
            entry.faces.push(id);
            entry.face_ids.insert(key, id);
            self.entities.insert(id, (handle.id(), EntityRef::Face(key)));
        }
        let edge_keys: Vec<EdgeId> = entry.topology.edges.keys().collect();
        for key in edge_keys {
            let id = self.alloc_id();
            entry.edges.push(id);
            self.entities.insert(id, (handle.id(), EntityRef::Edge(key)));
        }
        let vertex_keys: Vec<VertexId> = entry.topology.vertices.keys().collect();
        for key in vertex_keys {
            let id = self.alloc_id();
            entry.vertices.push(id);
            self.entities.insert(id, (handle.id(), EntityRef::Vertex(key)));
        }

        debug!(
            handle = handle.id(),
            faces = entry.faces.len(),
            edges = entry.edges.len(),
            vertices = entry.vertices.len(),
            closed = entry.topology.is_closed(),
            "stored solid"
        );
        self.solids.insert(handle.id(), entry);
        handle
    }

    fn entry(&self, handle: &KernelSolidHandle) -> Result<&SolidEntry, KernelError> {
        self.solids.get(&handle.id()).ok_or(KernelError::EntityNotFound {
            id: KernelId(handle.id()),
        })
    }

    fn boolean(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
        op: BoolOp,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid_a = &self.entry(a)?.solid;
        let solid_b = &self.entry(b)?.solid;
        let engine = BspBooleanEngine::new(self.config);
        let result = match op {
            BoolOp::Union => engine.union(solid_a, solid_b),
            BoolOp::Difference => engine.subtract(solid_a, solid_b),
            BoolOp::Intersection => engine.intersect(solid_a, solid_b),
        };
        if result.is_empty() && op == BoolOp::Union {
            return Err(KernelError::BooleanFailed {
                reason: "union of two solids produced no polygons".to_string(),
            });
        }
        Ok(self.store_solid(result))
    }

    fn lookup(&self, id: KernelId) -> Option<(&SolidEntry, EntityRef)> {
        let (solid, entity) = self.entities.get(&id)?;
        Some((self.solids.get(solid)?, *entity))
    }
}

impl Default for FacetKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn surface_name(kind: SurfaceKind) -> &'static str {
    match kind {
        SurfaceKind::Planar => "planar",
        SurfaceKind::Cylindrical => "cylindrical",
        SurfaceKind::Blend => "blend",
    }
}

fn to_array(p: &cad_kernel::Point3) -> [f64; 3] {
    [p.x, p.y, p.z]
}

fn signature(entry: &SolidEntry, entity: EntityRef) -> TopoSignature {
    let topology = &entry.topology;
    match entity {
        EntityRef::Face(key) => {
            let face = &topology.faces[key];
            TopoSignature {
                surface_type: Some(surface_name(face.surface.kind).to_string()),
                area: Some(face.area),
                centroid: Some(to_array(&face.centroid)),
                normal: Some([face.normal.x, face.normal.y, face.normal.z]),
                bbox: Some(face.bbox.to_array()),
                length: None,
            }
        }
        EntityRef::Edge(key) => {
            let edge = &topology.edges[key];
            TopoSignature {
                centroid: Some(to_array(&edge.centroid)),
                bbox: Some(edge.bbox.to_array()),
                length: Some(edge.length),
                ..TopoSignature::empty()
            }
        }
        EntityRef::Vertex(key) => TopoSignature {
            centroid: Some(to_array(&topology.vertices[key].point)),
            ..TopoSignature::empty()
        },
    }
}

impl Kernel for FacetKernel {
    fn make_box(&mut self, size: [f64; 3], anchor: Anchor) -> Result<KernelSolidHandle, KernelError> {
        let solid = primitives::make_box(&mut self.surfaces, size, anchor)?;
        Ok(self.store_solid(solid))
    }

    fn make_cylinder(
        &mut self,
        radius: f64,
        height: f64,
        anchor: Anchor,
    ) -> Result<KernelSolidHandle, KernelError> {
        let segments = self.config.circle_segments;
        let solid = primitives::make_cylinder(&mut self.surfaces, radius, height, segments, anchor)?;
        Ok(self.store_solid(solid))
    }

    fn make_prism(
        &mut self,
        sides: u32,
        circumradius: f64,
        height: f64,
        anchor: Anchor,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid = primitives::make_prism(&mut self.surfaces, sides, circumradius, height, anchor)?;
        Ok(self.store_solid(solid))
    }

    fn translate(
        &mut self,
        solid: &KernelSolidHandle,
        offset: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError> {
        if offset.iter().any(|c| !c.is_finite()) {
            return Err(KernelError::Other {
                message: format!("translation must be finite, got {offset:?}"),
            });
        }
        let moved = self
            .entry(solid)?
            .solid
            .translated(&Vector3::new(offset[0], offset[1], offset[2]));
        Ok(self.store_solid(moved))
    }

    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.boolean(a, b, BoolOp::Union)
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.boolean(a, b, BoolOp::Difference)
    }

    fn boolean_intersect(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.boolean(a, b, BoolOp::Intersection)
    }

    fn fillet_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        radius: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let entry = self.solids.get(&solid.id()).ok_or(KernelError::EntityNotFound {
            id: KernelId(solid.id()),
        })?;

        let mut keys = Vec::with_capacity(edges.len());
        for &id in edges {
            match self.entities.get(&id) {
                Some(&(owner, EntityRef::Edge(key))) if owner == solid.id() => keys.push(key),
                _ => return Err(KernelError::EntityNotFound { id }),
            }
        }

        let rounded = fillet::fillet_edges(
            &entry.solid,
            &entry.topology,
            &keys,
            radius,
            &self.config,
            &mut self.surfaces,
        )?;
        Ok(self.store_solid(rounded))
    }

    fn tessellate(
        &mut self,
        solid: &KernelSolidHandle,
        tolerance: f64,
    ) -> Result<RenderMesh, KernelError> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(KernelError::TessellationFailed {
                reason: format!("tolerance must be positive, got {tolerance}"),
            });
        }
        let entry = self.entry(solid)?;
        let tess = cad_kernel::tessellate(&entry.topology);

        // Flat shading: every triangle gets its own three corners.
        let mut mesh = RenderMesh::default();
        for (index, tri) in tess.triangles.iter().enumerate() {
            let n = tess.normals[index];
            for &corner in tri {
                let p = tess.positions[corner as usize];
                mesh.vertices.extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
                mesh.normals.extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
                mesh.indices.push(mesh.indices.len() as u32);
            }
        }
        for (face, range) in &tess.face_ranges {
            if range.is_empty() {
                continue;
            }
            let face_id = entry.face_ids.get(*face).copied().ok_or_else(|| {
                KernelError::TessellationFailed {
                    reason: "triangle range refers to an unknown face".to_string(),
                }
            })?;
            mesh.face_ranges.push(FaceRange {
                face_id,
                start_index: (range.start * 3) as u32,
                end_index: (range.end * 3) as u32,
            });
        }
        debug!(handle = solid.id(), triangles = mesh.triangle_count(), "tessellated solid");
        Ok(mesh)
    }
}

impl KernelIntrospect for FacetKernel {
    fn list_faces(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.entry(solid).map(|e| e.faces.clone()).unwrap_or_default()
    }

    fn list_edges(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.entry(solid).map(|e| e.edges.clone()).unwrap_or_default()
    }

    fn list_vertices(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.entry(solid).map(|e| e.vertices.clone()).unwrap_or_default()
    }

    fn edge_faces(&self, edge: KernelId) -> Vec<KernelId> {
        match self.lookup(edge) {
            Some((entry, EntityRef::Edge(key))) => entry.topology.edges[key]
                .faces
                .iter()
                .filter_map(|f| entry.face_ids.get(*f).copied())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn edge_center(&self, edge: KernelId) -> Option<[f64; 3]> {
        match self.lookup(edge)? {
            (entry, EntityRef::Edge(key)) => Some(to_array(&entry.topology.edges[key].center)),
            _ => None,
        }
    }

    fn edge_convexity(&self, edge: KernelId) -> Option<Convexity> {
        match self.lookup(edge)? {
            (entry, EntityRef::Edge(key)) => Some(entry.topology.edges[key].convexity),
            _ => None,
        }
    }

    fn compute_signature(&self, entity: KernelId, kind: TopoKind) -> TopoSignature {
        match self.lookup(entity) {
            Some((entry, e @ EntityRef::Face(_))) if kind == TopoKind::Face => signature(entry, e),
            Some((entry, e @ EntityRef::Edge(_))) if kind == TopoKind::Edge => signature(entry, e),
            Some((entry, e @ EntityRef::Vertex(_))) if kind == TopoKind::Vertex => {
                signature(entry, e)
            }
            _ => TopoSignature::empty(),
        }
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
        Ok(self.entry(solid)?.topology.shape_kind())
    }

    fn is_closed(&self, solid: &KernelSolidHandle) -> Result<bool, KernelError> {
        Ok(self.entry(solid)?.topology.is_closed())
    }

    fn volume(&self, solid: &KernelSolidHandle) -> Result<f64, KernelError> {
        Ok(self.entry(solid)?.solid.volume())
    }

    fn bounding_box(&self, solid: &KernelSolidHandle) -> Result<[f64; 6], KernelError> {
        let bbox = self.entry(solid)?.solid.bounding_box();
        if bbox.is_empty() {
            return Err(KernelError::Other {
                message: format!("{solid} has no geometry"),
            });
        }
        Ok(bbox.to_array())
    }

    fn boundary(&self, solid: &KernelSolidHandle) -> Result<FacetedShell, KernelError> {
        let topology = &self.entry(solid)?.topology;
        let mut remap: Vec<Option<u32>> = vec![None; topology.points.len()];
        let mut shell = FacetedShell::default();
        for l in &topology.loops {
            let polygon = l
                .points
                .iter()
                .map(|&i| {
                    *remap[i as usize].get_or_insert_with(|| {
                        shell.points.push(to_array(&topology.points[i as usize]));
                        (shell.points.len() - 1) as u32
                    })
                })
                .collect();
            shell.polygons.push(polygon);
        }
        Ok(shell)
    }
}
