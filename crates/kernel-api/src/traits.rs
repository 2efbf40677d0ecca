use crate::types::*;

/// Core geometry kernel trait. Provides all shape construction and modification operations.
/// Implemented by FacetKernel (faceted modeller) and MockKernel (deterministic test double).
pub trait Kernel {
    /// Axis-aligned box centred on the Z axis, `size` = [x, y, z].
    fn make_box(&mut self, size: [f64; 3], anchor: Anchor) -> Result<KernelSolidHandle, KernelError>;

    /// Cylinder along Z, centred on the Z axis.
    fn make_cylinder(
        &mut self,
        radius: f64,
        height: f64,
        anchor: Anchor,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Regular prism along Z with its first corner on +X.
    fn make_prism(
        &mut self,
        sides: u32,
        circumradius: f64,
        height: f64,
        anchor: Anchor,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Translated copy of a solid.
    fn translate(
        &mut self,
        solid: &KernelSolidHandle,
        offset: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Boolean union of two solids.
    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Boolean subtraction: a minus b.
    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Boolean intersection of two solids.
    fn boolean_intersect(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Fillet (round) the specified edges with the given radius.
    fn fillet_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        radius: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Tessellate a solid to a triangle mesh.
    ///
    /// `tolerance` is the requested chordal deviation. Faceted kernels mesh
    /// their stored facets as they are and ignore it.
    fn tessellate(
        &mut self,
        solid: &KernelSolidHandle,
        tolerance: f64,
    ) -> Result<RenderMesh, KernelError>;
}

/// Topology introspection trait. Provides read-only queries on kernel geometry.
pub trait KernelIntrospect {
    /// List all faces of a solid.
    fn list_faces(&self, solid: &KernelSolidHandle) -> Vec<KernelId>;

    /// List all edges of a solid.
    fn list_edges(&self, solid: &KernelSolidHandle) -> Vec<KernelId>;

    /// List all vertices of a solid.
    fn list_vertices(&self, solid: &KernelSolidHandle) -> Vec<KernelId>;

    /// Get the faces adjacent to an edge.
    fn edge_faces(&self, edge: KernelId) -> Vec<KernelId>;

    /// Point at half the arc length of an edge.
    fn edge_center(&self, edge: KernelId) -> Option<[f64; 3]>;

    /// Whether the material angle across an edge is below (convex) or above
    /// (concave) a half turn.
    fn edge_convexity(&self, edge: KernelId) -> Option<Convexity>;

    /// Compute the geometric signature of a single entity.
    fn compute_signature(&self, entity: KernelId, kind: TopoKind) -> TopoSignature;

    /// Compute signatures for all entities of a given kind in a solid.
    fn compute_all_signatures(
        &self,
        solid: &KernelSolidHandle,
        kind: TopoKind,
    ) -> Vec<(KernelId, TopoSignature)>;

    fn shape_kind(&self, solid: &KernelSolidHandle) -> Result<ShapeKind, KernelError>;

    /// True when the boundary has no unpaired edges.
    fn is_closed(&self, solid: &KernelSolidHandle) -> Result<bool, KernelError>;

    /// Enclosed volume in cubic millimetres.
    fn volume(&self, solid: &KernelSolidHandle) -> Result<f64, KernelError>;

    /// [min_x, min_y, min_z, max_x, max_y, max_z]
    fn bounding_box(&self, solid: &KernelSolidHandle) -> Result<[f64; 6], KernelError>;

    /// Planar facets of the solid's boundary.
    fn boundary(&self, solid: &KernelSolidHandle) -> Result<FacetedShell, KernelError>;
}
